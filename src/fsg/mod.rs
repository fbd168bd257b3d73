//! Forward star generation: for every text position, the set of
//! maximal copy edges that dominate every shorter alternative in their
//! cost class.
//!
//! A generator produces, per position and distance class, the longest
//! match against the class's window. The protocol layer turns those
//! matches into the maximal-edge mesh by walking the (distance, length)
//! class ladder with a running maximum.

pub mod avl;
pub mod cache;
pub mod length;
pub mod rsa;
pub mod scan;
pub mod subseq;

use crate::error::{Error, Result};
use crate::model::{bits, CostModel, Edge};
use crate::text::Text;
use length::MaximalLength;
use rsa::{cost_classes, normalize_dst, GenericRsa, SameRsa};
use std::rc::Rc;

/// Names of the registered generators, in listing order.
pub static GENERATORS: &[&str] = &["fsg", "fast_fsg", "gen_fast_fsg", "same_fsg", "fixed_fsg"];

/// Shape of a distance ladder, deciding which generators can serve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceKind {
    /// No structure assumed.
    Generic,
    /// All classes have the same size.
    AllSame,
    /// Each class size is a proper multiple of the previous one.
    Multiple,
}

impl DistanceKind {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceKind::Generic => "GENERIC",
            DistanceKind::AllSame => "ALL_SAME",
            DistanceKind::Multiple => "MULTIPLE",
        }
    }
}

/// Classify a distance ladder.
pub fn get_kind(dst: &[u32]) -> Result<DistanceKind> {
    let mut dst = dst.to_vec();
    if dst.is_empty() {
        return Err(Error::InvalidInput("empty distance ladder".into()));
    }
    if dst.len() == 1 {
        return Ok(DistanceKind::AllSame);
    }
    if *dst.last().expect("non-empty") == u32::MAX {
        dst.pop();
    }
    if dst.contains(&0) {
        return Err(Error::InvalidInput("zero distance class".into()));
    }
    let mut sizes = dst.clone();
    for i in 1..dst.len() {
        if dst[i] < dst[i - 1] {
            return Err(Error::InvalidInput("non-monotone distance ladder".into()));
        }
        sizes[i] = dst[i] - dst[i - 1];
    }

    let mut multiple = true;
    let mut first_time = true;
    for i in 0..sizes.len() - 1 {
        if sizes[i + 1] < sizes[i] || sizes[i + 1] % sizes[i] != 0 {
            return Ok(DistanceKind::Generic);
        }
        if sizes[i + 1] / sizes[i] == 1 && !first_time {
            multiple = false;
            break;
        }
        first_time = false;
    }
    if multiple {
        return Ok(DistanceKind::Multiple);
    }
    for i in 0..sizes.len() - 1 {
        if sizes[i + 1] != sizes[i] {
            return Ok(DistanceKind::Generic);
        }
    }
    Ok(DistanceKind::AllSame)
}

/// Whether a generator built for `gen_kind` can serve a `cm_kind` ladder.
pub fn compatible(cm_kind: DistanceKind, gen_kind: DistanceKind) -> bool {
    gen_kind == DistanceKind::Generic || cm_kind == gen_kind
}

/// The generator best suited to a ladder kind.
pub fn suggest_gen(kind: DistanceKind) -> &'static str {
    match kind {
        DistanceKind::Generic => "gen_fast_fsg",
        DistanceKind::AllSame => "same_fsg",
        DistanceKind::Multiple => "fast_fsg",
    }
}

/// Ladder-derived figures shared by the RSA-based generators.
#[derive(Debug, Clone)]
pub struct Stats {
    dst: Vec<u32>,
    t_len: usize,
}

impl Stats {
    /// Stats for a distance ladder over a text of `t_len` bytes.
    pub fn new(dst: &[u32], t_len: usize) -> Self {
        Stats {
            dst: dst.to_vec(),
            t_len,
        }
    }

    /// The ladder truncated at the text length.
    pub fn dst(&self) -> Vec<u32> {
        normalize_dst(&self.dst, self.t_len)
    }

    /// Block size of each class.
    pub fn cost_class(&self) -> Vec<u32> {
        cost_classes(&self.dst(), self.t_len)
    }

    /// Grid origin of each class (the previous threshold).
    pub fn thresholds(&self) -> Vec<u32> {
        let mut out = self.dst();
        out.insert(0, 0);
        out
    }
}

/// Stats for the generalized generator: the working ladder is reduced
/// to the storage-optimal subsequence, and original classes borrow
/// their father's blocks.
#[derive(Debug, Clone)]
pub struct GenStats {
    dst: Vec<u32>,
    opt: Vec<u32>,
    opt_father: Vec<usize>,
}

impl GenStats {
    /// Reduce the ladder of `dst` over a text of `t_len` bytes.
    pub fn new(dst: &[u32], t_len: usize) -> Self {
        let dst = normalize_dst(dst, t_len);
        let opt = subseq::get_seq(&dst);
        let opt_father = subseq::get_opt_father(&dst, &opt);
        GenStats {
            dst,
            opt,
            opt_father,
        }
    }

    /// The normalized original ladder.
    pub fn dst(&self) -> &[u32] {
        &self.dst
    }

    /// The reduced ladder.
    pub fn opt_dst(&self) -> &[u32] {
        &self.opt
    }

    /// Block size serving each original class.
    pub fn cost_class(&self) -> Vec<u32> {
        subseq::get_costs(&self.dst, &self.opt, &self.opt_father)
    }

    /// Grid origin serving each original class.
    pub fn thresholds(&self) -> Vec<u32> {
        subseq::get_thresholds(&self.dst, &self.opt, &self.opt_father)
    }

    /// Reduced-ladder level serving an original level.
    pub fn map_opt(&self, level: usize) -> usize {
        self.opt_father[level]
    }
}

/// Walks the (distance, length) class ladder while edges are emitted,
/// handing out the packed cost id of every mesh entry.
#[derive(Debug)]
pub struct MeshCost {
    len: Vec<u32>,
    dst_count: usize,
    cur_len: u32,
    prev_len: u32,
    dst_idx: usize,
    len_idx: usize,
    max_len: u32,
    len_bits: u32,
    cost_id: u32,
}

impl MeshCost {
    /// Build for the given ladders.
    pub fn new(dst: &[u32], len: &[u32]) -> Self {
        MeshCost {
            dst_count: dst.len(),
            max_len: *len.last().expect("non-empty length ladder"),
            len_bits: bits(len.len() - 1),
            len: len.to_vec(),
            cur_len: 0,
            prev_len: 0,
            dst_idx: 0,
            len_idx: 0,
            cost_id: 0,
        }
    }

    /// Start a new position.
    pub fn reset(&mut self) {
        self.cur_len = 0;
        self.prev_len = 0;
        self.dst_idx = 0;
        self.len_idx = 0;
        self.cost_id = 0;
    }

    /// Announce the maximal length of the current distance class.
    #[inline]
    pub fn set_len(&mut self, len: u32) {
        self.cur_len = len.min(self.max_len);
    }

    /// Next (length, cost_id) step up the length ladder, until the
    /// announced length is covered.
    #[inline]
    pub fn up(&mut self) -> Option<(u32, u32)> {
        if self.prev_len >= self.cur_len {
            return None;
        }
        let id = self.cost_id;
        let len = if self.cur_len >= self.len[self.len_idx] {
            let l = self.len[self.len_idx];
            self.len_idx += 1;
            self.cost_id += 1;
            l
        } else {
            self.cur_len
        };
        self.prev_len = len;
        Some((len, id))
    }

    /// Move to the next distance class. False when past the ladder.
    #[inline]
    pub fn right(&mut self) -> bool {
        self.dst_idx += 1;
        if self.dst_idx >= self.dst_count {
            return false;
        }
        if self.len_idx < self.len.len() && self.cur_len == self.len[self.len_idx] {
            self.len_idx += 1;
        }
        self.cost_id = ((self.dst_idx as u32) << self.len_bits) | self.len_idx as u32;
        true
    }
}

/// A per-position source of maximal matches, one per distance class.
pub trait Generator {
    /// Longest match of the current position within class `level`'s
    /// window, as `(d, ell)`; `(0, 0)` when the window has no match.
    fn max_match(&mut self, level: usize) -> (u32, u32);

    /// Number of distance classes active at the current position.
    fn levels(&mut self) -> usize;

    /// Called before edge generation at the current position.
    fn pre_gen(&mut self);

    /// Called after edge generation; advances the position.
    fn post_gen(&mut self);

    /// The current text position.
    fn text_pos(&self) -> u32;
}

/// A forward star generator: streams the maximal-edge mesh position by
/// position.
pub trait Fsg {
    /// Produce the mesh of the current position and advance, or `None`
    /// past the end of the text.
    fn gen_next(&mut self) -> Option<&[Edge]>;

    /// Length of the underlying text.
    fn text_len(&self) -> usize;
}

/// The standard mesh-building protocol over any [`Generator`].
#[derive(Debug)]
pub struct Protocol<G> {
    gen: G,
    t_len: usize,
    maxedges: Vec<Edge>,
    mc: MeshCost,
    max_len: u32,
}

impl<G: Generator> Protocol<G> {
    /// Wrap a generator for the given cost-model ladders.
    pub fn new(gen: G, t_len: usize, dst: &[u32], len: &[u32]) -> Self {
        Protocol {
            gen,
            t_len,
            maxedges: vec![Edge::INVALID; dst.len() + len.len() + 2],
            mc: MeshCost::new(dst, len),
            max_len: *len.last().expect("non-empty length ladder"),
        }
    }

    fn generate_edges(&mut self) -> usize {
        let mut maxlen = 0u32;
        let mut p = 0usize;
        self.mc.reset();
        let levels = self.gen.levels();
        for i in 0..levels {
            let (d, ell) = self.gen.max_match(i);
            debug_assert!(self.gen.text_pos() + ell <= self.t_len as u32);
            debug_assert!(ell == 0 || d <= self.gen.text_pos());
            if ell > maxlen {
                maxlen = ell;
                self.mc.set_len(ell);
                while let Some((len, cost_id)) = self.mc.up() {
                    self.maxedges[p].set(d, len, cost_id);
                    p += 1;
                }
            }
            if ell >= self.max_len {
                break;
            }
            self.mc.right();
        }
        p
    }
}

impl<G: Generator> Fsg for Protocol<G> {
    fn gen_next(&mut self) -> Option<&[Edge]> {
        if self.gen.text_pos() >= self.t_len as u32 {
            return None;
        }
        self.gen.pre_gen();
        let generated = self.generate_edges();
        self.gen.post_gen();
        Some(&self.maxedges[..generated])
    }

    fn text_len(&self) -> usize {
        self.t_len
    }
}

/// The rightmost protocol: emits only the single maximum-length edge,
/// then suppresses the mesh for the next `ell - 1` dominated positions.
#[derive(Debug)]
pub struct RmProtocol<G> {
    inner: Protocol<G>,
    max_edge: [Edge; 1],
    next: i64,
}

impl<G: Generator> RmProtocol<G> {
    /// Wrap a generator like [`Protocol::new`].
    pub fn new(gen: G, t_len: usize, dst: &[u32], len: &[u32]) -> Self {
        RmProtocol {
            inner: Protocol::new(gen, t_len, dst, len),
            max_edge: [Edge::INVALID],
            next: 1,
        }
    }
}

impl<G: Generator> Fsg for RmProtocol<G> {
    fn gen_next(&mut self) -> Option<&[Edge]> {
        let longest = {
            let edges = self.inner.gen_next()?;
            self.next -= 1;
            if self.next > 0 || edges.is_empty() {
                self.next = self.next.max(0);
                return Some(&[]);
            }
            let mut longest = Edge::literal(0);
            for e in edges {
                if e.ell > longest.ell {
                    longest = *e;
                }
            }
            longest
        };
        debug_assert!(!longest.is_invalid());
        self.next = longest.ell as i64;
        self.max_edge[0] = longest;
        Some(&self.max_edge)
    }

    fn text_len(&self) -> usize {
        self.inner.text_len()
    }
}

/// Window sources for the RSA-driven generator.
pub trait RsaProvider {
    /// The merged RSA of the block of `level` starting at `pos`.
    fn get_rsa(&mut self, level: usize, pos: u32) -> &[u32];

    /// Advance the sliding grids to `pos`.
    fn notify(&mut self, pos: u32);
}

impl RsaProvider for GenericRsa {
    fn get_rsa(&mut self, level: usize, pos: u32) -> &[u32] {
        GenericRsa::get_rsa(self, level, pos)
    }

    fn notify(&mut self, pos: u32) {
        GenericRsa::notify(self, pos)
    }
}

impl RsaProvider for SameRsa {
    fn get_rsa(&mut self, level: usize, pos: u32) -> &[u32] {
        SameRsa::get_rsa(self, level, pos)
    }

    fn notify(&mut self, pos: u32) {
        SameRsa::notify(self, pos)
    }
}

/// RSA source for the generalized generator: original levels are
/// remapped onto the reduced ladder.
#[derive(Debug)]
pub struct GeneralizedRsa {
    father: Vec<usize>,
    inner: GenericRsa,
}

impl GeneralizedRsa {
    /// Build over the reduced ladder of `stats`.
    pub fn new(stats: &GenStats, sa: Rc<Vec<i32>>) -> Self {
        GeneralizedRsa {
            father: (0..stats.dst().len()).map(|l| stats.map_opt(l)).collect(),
            inner: GenericRsa::new(stats.opt_dst().to_vec(), sa),
        }
    }
}

impl RsaProvider for GeneralizedRsa {
    fn get_rsa(&mut self, level: usize, pos: u32) -> &[u32] {
        self.inner.get_rsa(self.father[level], pos)
    }

    fn notify(&mut self, pos: u32) {
        self.inner.notify(pos)
    }
}

/// Pred/succ scan to run on RSA refills.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// One deque; blocks never span more than one window.
    Smart,
    /// Zoned deques for blocks larger than the window.
    Split,
}

#[derive(Debug)]
struct BufLevel {
    ring: Vec<(u32, u32)>,
    idx: usize,
    boundary: i64,
}

/// Per-level ring of resolved (d, ell) matches covering one block of
/// positions.
#[derive(Debug)]
struct MaximalBuffer {
    levels: Vec<BufLevel>,
}

impl MaximalBuffer {
    fn new(cost_class: &[u32]) -> Self {
        MaximalBuffer {
            levels: cost_class
                .iter()
                .map(|&q| {
                    debug_assert!(q > 0);
                    BufLevel {
                        ring: vec![(0, 0); q as usize],
                        idx: q as usize - 1,
                        boundary: -(q as i64),
                    }
                })
                .collect(),
        }
    }

    fn empty(&self, level: usize) -> bool {
        let l = &self.levels[level];
        l.idx == l.ring.len()
    }

    fn head(&self, level: usize) -> (u32, u32) {
        debug_assert!(!self.empty(level));
        let l = &self.levels[level];
        l.ring[l.idx]
    }

    fn skip(&mut self, level: usize, position: u32) {
        let l = &mut self.levels[level];
        debug_assert!(position as i64 >= l.boundary);
        l.idx = l.ring.len().min((position as i64 - l.boundary) as usize);
    }

    fn reset(&mut self, level: usize, boundary: u32) -> &mut [(u32, u32)] {
        let l = &mut self.levels[level];
        l.idx = 0;
        l.boundary = boundary as i64;
        &mut l.ring
    }
}

/// The RSA-driven generator: block-buffered pred/succ scans plus
/// incremental match extension.
#[derive(Debug)]
pub struct FastGen<R> {
    t_len: usize,
    dst: Vec<u32>,
    cst: Vec<u32>,
    thresholds: Vec<u32>,
    lengths: Vec<MaximalLength>,
    t_pos: u32,
    rsa: R,
    mbuf: MaximalBuffer,
    matcher: Matcher,
}

impl<R: RsaProvider> FastGen<R> {
    /// Build over a window source and ladder figures.
    ///
    /// `dst` is the normalized ladder; `cst` and `thresholds` give the
    /// block size and grid origin serving each level.
    pub fn new(
        text: &Text,
        rsa: R,
        dst: Vec<u32>,
        cst: Vec<u32>,
        thresholds: Vec<u32>,
        matcher: Matcher,
    ) -> Self {
        let t_len = text.len();
        FastGen {
            t_len,
            lengths: dst.iter().map(|_| MaximalLength::new(text.clone())).collect(),
            mbuf: MaximalBuffer::new(&cst),
            dst,
            cst,
            thresholds,
            t_pos: 0,
            rsa,
            matcher,
        }
    }
}

impl<R: RsaProvider> Generator for FastGen<R> {
    fn max_match(&mut self, level: usize) -> (u32, u32) {
        self.mbuf.skip(level, self.t_pos);
        if self.mbuf.empty(level) {
            // The current position may not be on a block boundary:
            // refill from the closest one at or below it.
            let q = self.cst[level];
            let th = self.thresholds[level];
            let boundary = ((self.t_pos - th) / q) * q + th;
            let rsa = self.rsa.get_rsa(level, boundary);
            let buf = self.mbuf.reset(level, boundary);
            match self.matcher {
                Matcher::Smart => scan::smart_find(rsa, boundary, self.dst[level], buf),
                Matcher::Split => scan::split_find(rsa, boundary, self.dst[level], buf),
            }
            // Resolve (pred, succ) pairs into (d, ell) matches. The
            // matcher restarts its counters on non-consecutive blocks.
            let mut scanned = boundary;
            for entry in buf.iter_mut() {
                let (pred, succ) = *entry;
                *entry = self.lengths[level].match_at(pred, succ, scanned);
                // Ring slots past the text end are never read back.
                debug_assert!(
                    scanned >= self.t_len as u32 || entry.1 == 0 || entry.0 <= self.dst[level]
                );
                scanned += 1;
            }
            self.mbuf.skip(level, self.t_pos);
        }
        self.mbuf.head(level)
    }

    fn levels(&mut self) -> usize {
        if self.t_pos > *self.dst.last().expect("non-empty ladder") {
            return self.dst.len();
        }
        1 + self.dst.partition_point(|&d| d < self.t_pos)
    }

    fn pre_gen(&mut self) {
        self.rsa.notify(self.t_pos);
    }

    fn post_gen(&mut self) {
        self.t_pos += 1;
    }

    fn text_pos(&self) -> u32 {
        self.t_pos
    }
}

/// A generator wrapper that restarts the inner generator per text
/// bucket, bounding matches (and memory) to the bucket.
pub struct BucketFsg {
    text: Text,
    bucket_size: usize,
    bucket_idx: usize,
    cm: CostModel,
    gen_name: &'static str,
    cur: Box<dyn Fsg>,
    maxedges: Vec<Edge>,
}

impl BucketFsg {
    /// Split `text` into `bucket_size`-byte buckets parsed by the named
    /// generator.
    pub fn new(text: Text, bucket_size: usize, cm: &CostModel, gen_name: &'static str) -> Result<Self> {
        debug_assert!(bucket_size > 0);
        let first = Self::build_bucket(&text, 0, bucket_size, cm, gen_name)?;
        Ok(BucketFsg {
            text,
            bucket_size,
            bucket_idx: 1,
            cm: cm.clone(),
            gen_name,
            maxedges: Vec::new(),
            cur: first,
        })
    }

    fn build_bucket(
        text: &Text,
        idx: usize,
        bucket_size: usize,
        cm: &CostModel,
        gen_name: &'static str,
    ) -> Result<Box<dyn Fsg>> {
        let start = idx * bucket_size;
        let len = bucket_size.min(text.len() - start);
        let view = text.slice(start, len);
        instantiate(gen_name, &view, cm)
    }

    fn next_gen(&mut self) -> Result<bool> {
        if self.bucket_idx * self.bucket_size >= self.text.len() {
            return Ok(false);
        }
        self.cur = Self::build_bucket(
            &self.text,
            self.bucket_idx,
            self.bucket_size,
            &self.cm,
            self.gen_name,
        )?;
        self.bucket_idx += 1;
        Ok(true)
    }
}

impl Fsg for BucketFsg {
    fn gen_next(&mut self) -> Option<&[Edge]> {
        loop {
            // Copy out of the inner generator so the borrow ends
            // before a possible bucket switch.
            let copied = match self.cur.gen_next() {
                Some(edges) => {
                    self.maxedges.clear();
                    self.maxedges.extend_from_slice(edges);
                    true
                }
                None => false,
            };
            if copied {
                return Some(&self.maxedges);
            }
            match self.next_gen() {
                Ok(true) => continue,
                _ => return None,
            }
        }
    }

    fn text_len(&self) -> usize {
        self.text.len()
    }
}

fn check_kind(cm: &CostModel, gen_kind: DistanceKind) -> Result<()> {
    let cm_kind = get_kind(cm.dst())?;
    if !compatible(cm_kind, gen_kind) {
        return Err(Error::GeneratorMismatch {
            expected: gen_kind.name(),
            actual: cm_kind.name(),
            suggested: suggest_gen(cm_kind),
        });
    }
    Ok(())
}

/// Build the `fast_fsg` generator (MULTIPLE ladders).
pub fn fast_fsg(text: &Text, sa: Rc<Vec<i32>>, cm: &CostModel) -> Result<Protocol<FastGen<GenericRsa>>> {
    check_kind(cm, DistanceKind::Multiple)?;
    let stats = Stats::new(cm.dst(), text.len());
    let dst = stats.dst();
    let rsa = GenericRsa::new(dst.clone(), sa);
    let gen = FastGen::new(
        text,
        rsa,
        dst.clone(),
        stats.cost_class(),
        stats.thresholds(),
        Matcher::Smart,
    );
    Ok(Protocol::new(gen, text.len(), &dst, cm.len()))
}

/// Build the `gen_fast_fsg` generator (any ladder, reduced sub-ladder).
pub fn gen_fast_fsg(
    text: &Text,
    sa: Rc<Vec<i32>>,
    cm: &CostModel,
) -> Result<Protocol<FastGen<GeneralizedRsa>>> {
    let stats = GenStats::new(cm.dst(), text.len());
    let dst = stats.dst().to_vec();
    let rsa = GeneralizedRsa::new(&stats, sa);
    let gen = FastGen::new(
        text,
        rsa,
        dst.clone(),
        stats.cost_class(),
        stats.thresholds(),
        Matcher::Split,
    );
    Ok(Protocol::new(gen, text.len(), &dst, cm.len()))
}

/// Build the `same_fsg` generator (ALL_SAME ladders).
pub fn same_fsg(text: &Text, sa: Rc<Vec<i32>>, cm: &CostModel) -> Result<Protocol<FastGen<SameRsa>>> {
    check_kind(cm, DistanceKind::AllSame)?;
    let stats = Stats::new(cm.dst(), text.len());
    let dst = stats.dst();
    let rsa = SameRsa::new(dst[0], sa);
    let gen = FastGen::new(
        text,
        rsa,
        dst.clone(),
        stats.cost_class(),
        stats.thresholds(),
        Matcher::Smart,
    );
    Ok(Protocol::new(gen, text.len(), &dst, cm.len()))
}

/// Build the `fixed_fsg` generator (rightmost protocol).
pub fn fixed_fsg(
    text: &Text,
    sa: Rc<Vec<i32>>,
    cm: &CostModel,
) -> Result<RmProtocol<FastGen<GenericRsa>>> {
    check_kind(cm, DistanceKind::Multiple)?;
    let stats = Stats::new(cm.dst(), text.len());
    let dst = stats.dst();
    let rsa = GenericRsa::new(dst.clone(), sa);
    let gen = FastGen::new(
        text,
        rsa,
        dst.clone(),
        stats.cost_class(),
        stats.thresholds(),
        Matcher::Smart,
    );
    Ok(RmProtocol::new(gen, text.len(), &dst, cm.len()))
}

/// Build the `fsg` generator (tree-based, any ladder).
pub fn avl_fsg(text: &Text, sa: Rc<Vec<i32>>, cm: &CostModel) -> Result<Protocol<avl::AvlGen>> {
    let dst = normalize_dst(cm.dst(), text.len());
    let gen = avl::AvlGen::new(text.clone(), sa, dst.clone());
    Ok(Protocol::new(gen, text.len(), &dst, cm.len()))
}

/// Instantiate a generator by registry name, boxed.
pub fn instantiate(name: &str, text: &Text, cm: &CostModel) -> Result<Box<dyn Fsg>> {
    let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
    instantiate_with(name, text, sa, cm)
}

/// Instantiate a generator by registry name over a prebuilt SA.
pub fn instantiate_with(
    name: &str,
    text: &Text,
    sa: Rc<Vec<i32>>,
    cm: &CostModel,
) -> Result<Box<dyn Fsg>> {
    match name {
        "fsg" => Ok(Box::new(avl_fsg(text, sa, cm)?)),
        "fast_fsg" => Ok(Box::new(fast_fsg(text, sa, cm)?)),
        "gen_fast_fsg" => Ok(Box::new(gen_fast_fsg(text, sa, cm)?)),
        "same_fsg" => Ok(Box::new(same_fsg(text, sa, cm)?)),
        "fixed_fsg" => Ok(Box::new(fixed_fsg(text, sa, cm)?)),
        other => Err(Error::InvalidInput(format!(
            "no generator named \"{}\"",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassInfo;

    fn toy_cm(dst: Vec<u32>, len: Vec<u32>) -> CostModel {
        let dc = dst.iter().map(|_| 1.0).collect();
        let lc = len.iter().map(|_| 1.0).collect();
        CostModel::from_classes(ClassInfo::new(dst, dc), ClassInfo::new(len, lc), 9.0, 8.0, 0.0)
    }

    #[test]
    fn test_get_kind() {
        assert_eq!(get_kind(&[8]).unwrap(), DistanceKind::AllSame);
        assert_eq!(get_kind(&[8, 16, 24]).unwrap(), DistanceKind::AllSame);
        assert_eq!(get_kind(&[8, 24, 72]).unwrap(), DistanceKind::Multiple);
        assert_eq!(get_kind(&[8, 24, 30]).unwrap(), DistanceKind::Generic);
        assert!(get_kind(&[]).is_err());
        assert!(get_kind(&[8, 4]).is_err());
    }

    #[test]
    fn test_compatible_and_suggest() {
        assert!(compatible(DistanceKind::AllSame, DistanceKind::Generic));
        assert!(compatible(DistanceKind::Multiple, DistanceKind::Multiple));
        assert!(!compatible(DistanceKind::AllSame, DistanceKind::Multiple));
        assert_eq!(suggest_gen(DistanceKind::Multiple), "fast_fsg");
        assert_eq!(suggest_gen(DistanceKind::AllSame), "same_fsg");
    }

    #[test]
    fn test_mesh_cost_walk() {
        // dst classes bound 4, 16; len classes bound 4, 8.
        let mut mc = MeshCost::new(&[4, 16], &[4, 8]);
        mc.reset();
        // Level 0 reports a match of length 6: emit (4, id(0,0)) and
        // (6, id(0,1)).
        mc.set_len(6);
        assert_eq!(mc.up(), Some((4, 0b00)));
        assert_eq!(mc.up(), Some((6, 0b01)));
        assert_eq!(mc.up(), None);
        // Level 1 reports 8: emit the remaining step (8, id(1,1)).
        assert!(mc.right());
        mc.set_len(8);
        assert_eq!(mc.up(), Some((8, 0b11)));
        assert_eq!(mc.up(), None);
        assert!(!mc.right());
    }

    #[test]
    fn test_mesh_cost_shorter_later_class() {
        let mut mc = MeshCost::new(&[4, 16], &[4, 8]);
        mc.reset();
        mc.set_len(8);
        assert_eq!(mc.up(), Some((4, 0b00)));
        assert_eq!(mc.up(), Some((8, 0b01)));
        assert_eq!(mc.up(), None);
        // A longer class reporting a shorter length adds nothing.
        assert!(mc.right());
        assert_eq!(mc.up(), None);
    }

    /// Reference mesh: brute-force maximal matches per class window.
    fn reference_mesh(text: &[u8], pos: usize, dst: &[u32], len_back: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        for (k, &bound) in dst.iter().enumerate() {
            let lo = if k == 0 { 0 } else { dst[k - 1] };
            let mut best = (0u32, 0u32);
            for d in (lo + 1)..=bound.min(pos as u32) {
                let src = pos - d as usize;
                let mut l = 0usize;
                while pos + l < text.len() && text[src + l] == text[pos + l] {
                    l += 1;
                }
                let l = (l as u32).min(len_back);
                if l > best.1 {
                    best = (d, l);
                }
            }
            out.push(best);
        }
        out
    }

    fn mesh_of(edges: &[Edge]) -> Vec<(u32, u32)> {
        edges.iter().map(|e| (e.d, e.ell)).collect()
    }

    fn collect_meshes(mut fsg: Box<dyn Fsg>) -> Vec<Vec<(u32, u32)>> {
        let mut out = Vec::new();
        while let Some(edges) = fsg.gen_next() {
            out.push(mesh_of(edges));
        }
        out
    }

    #[test]
    fn test_fsg_variants_agree() {
        // FSG equivalence: every variant yields the same mesh.
        let data: Vec<u8> = (0..300usize)
            .map(|i| ((i * 11 + i / 7) % 4) as u8 + b'a')
            .collect();
        let text = Text::new(data);
        let cm = toy_cm(vec![4, 12, 36], vec![4, 16, 64]);
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));

        let fast = collect_meshes(Box::new(fast_fsg(&text, sa.clone(), &cm).unwrap()));
        let gen = collect_meshes(Box::new(gen_fast_fsg(&text, sa.clone(), &cm).unwrap()));
        let tree = collect_meshes(Box::new(avl_fsg(&text, sa.clone(), &cm).unwrap()));

        assert_eq!(fast.len(), text.len());
        assert_eq!(fast, gen, "fast_fsg vs gen_fast_fsg");
        assert_eq!(fast, tree, "fast_fsg vs fsg");
    }

    #[test]
    fn test_fsg_variants_agree_unbounded_ladder() {
        // A ladder whose last class spans the whole text exercises the
        // whole-suffix-array window path.
        let data: Vec<u8> = (0..220usize)
            .map(|i| ((i * 5 + i / 9) % 3) as u8 + b'p')
            .collect();
        let text = Text::new(data);
        let cm = toy_cm(vec![4, 12, 1 << 20], vec![4, 16, 64]);
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));

        let gen = collect_meshes(Box::new(gen_fast_fsg(&text, sa.clone(), &cm).unwrap()));
        let tree = collect_meshes(Box::new(avl_fsg(&text, sa.clone(), &cm).unwrap()));
        assert_eq!(gen, tree, "gen_fast_fsg vs fsg");
    }

    #[test]
    fn test_fsg_mesh_edges_are_valid_and_maximal() {
        let data: Vec<u8> = (0..200usize)
            .map(|i| ((i * 13 + i / 5) % 3) as u8 + b'x')
            .collect();
        let text = Text::new(data);
        let cm = toy_cm(vec![4, 12, 1 << 20], vec![4, 16, 64]);
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
        let mut fsg = gen_fast_fsg(&text, sa, &cm).unwrap();

        let t = text.as_slice();
        for pos in 0..t.len() {
            let edges = fsg.gen_next().expect("in range");
            // Every emitted copy edge is a valid LZ77 phrase.
            for e in edges {
                assert!(e.d as usize <= pos, "pos {} edge {:?}", pos, e);
                let src = pos - e.d as usize;
                for k in 0..e.ell as usize {
                    assert_eq!(t[src + k], t[pos + k], "pos {} edge {:?}", pos, e);
                }
            }
            // The longest emitted edge matches the brute-force longest.
            let brute = reference_mesh(t, pos, cm.dst(), *cm.len().last().unwrap());
            let best_brute = brute.iter().map(|&(_, l)| l).max().unwrap_or(0);
            let best_mesh = edges.iter().map(|e| e.ell).max().unwrap_or(0);
            assert_eq!(best_mesh, best_brute, "pos {}", pos);
        }
        assert!(fsg.gen_next().is_none());
    }

    #[test]
    fn test_rightmost_suppresses_dominated_positions() {
        let data = b"abcabcabcabcabcabc".to_vec();
        let text = Text::new(data);
        let cm = toy_cm(vec![4, 12, 36], vec![4, 16, 64]);
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
        let mut fsg = fixed_fsg(&text, sa, &cm).unwrap();

        let mut emitted = Vec::new();
        let mut pos = 0usize;
        while let Some(edges) = fsg.gen_next() {
            if !edges.is_empty() {
                assert_eq!(edges.len(), 1);
                emitted.push((pos, edges[0]));
            }
            pos += 1;
        }
        // After a long edge at p, positions p+1..p+ell-1 emit nothing.
        for w in emitted.windows(2) {
            let (p0, e0) = w[0];
            let (p1, _) = w[1];
            assert!(p1 >= p0 + e0.ell.max(1) as usize);
        }
    }

    #[test]
    fn test_same_fsg_on_uniform_ladder() {
        let data: Vec<u8> = (0..160usize).map(|i| (i % 5) as u8 + b'a').collect();
        let text = Text::new(data);
        let cm = toy_cm(vec![16, 32, 48, 1 << 20], vec![4, 16, 64]);
        // The ladder normalizes to {16, 32, 48, 160}: not uniform, so
        // same_fsg refuses it.
        assert!(matches!(
            same_fsg(&text, Rc::new(crate::suffix::suffix_array(text.as_slice())), &cm),
            Err(Error::GeneratorMismatch { .. })
        ));

        let cm = toy_cm(vec![16, 32, 48, 64], vec![4, 16, 64]);
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
        let same = collect_meshes(Box::new(same_fsg(&text, sa.clone(), &cm).unwrap()));
        let tree = collect_meshes(Box::new(avl_fsg(&text, sa, &cm).unwrap()));
        assert_eq!(same, tree);
    }

    #[test]
    fn test_bucket_fsg_restricts_matches() {
        let data: Vec<u8> = b"zxyzxyzxyzxyzxyzxyzxyzxyzxyzxyzx".to_vec();
        let text = Text::new(data);
        let cm = toy_cm(vec![4, 12, 1 << 20], vec![4, 16, 64]);
        let mut fsg = BucketFsg::new(text.clone(), 16, &cm, "gen_fast_fsg").unwrap();
        let mut pos = 0usize;
        while let Some(edges) = fsg.gen_next() {
            for e in edges {
                // Copies never cross the bucket boundary.
                assert!(e.d as usize <= pos % 16);
            }
            pos += 1;
        }
        assert_eq!(pos, text.len());
    }

    #[test]
    fn test_generator_mismatch_error_suggests() {
        let data: Vec<u8> = (0..64u8).collect();
        let text = Text::new(data);
        let cm = toy_cm(vec![16, 32, 48, 64], vec![4, 64]);
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
        match fast_fsg(&text, sa, &cm) {
            Err(Error::GeneratorMismatch { suggested, .. }) => {
                assert_eq!(suggested, "same_fsg");
            }
            other => panic!("expected mismatch, got {:?}", other.is_ok()),
        }
    }
}

//! Cost models: per-edge bit costs (or decode times) quantized over
//! distance and length cost classes.
//!
//! A cost model is a pair of strictly ascending threshold ladders `dst`
//! and `len`, a `|dst| x |len|` cost matrix, and a linear literal cost
//! `lit_fixed + ell * lit_var` (plus an optional per-character charge).
//! Copy edges carry an opaque `cost_id` packing their (distance class,
//! length class) pair, so the parser can price an edge without searching
//! the ladders again.

mod target;

pub use target::{get_weight_model, read_model, wm_serialize, wm_unserialize};

use crate::error::Error;
use sha1::{Digest, Sha1};

/// An LZ77 phrase: a copy `<d, ell>` when `d > 0`, a literal run of
/// `ell` bytes when `d == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Copy distance in bytes; 0 marks a literal run.
    pub d: u32,
    /// Phrase length in bytes.
    pub ell: u32,
    /// Index into the cost map of the model that produced this edge.
    pub cost_id: u32,
}

impl Edge {
    /// Sentinel for unreached positions.
    pub const INVALID: Edge = Edge {
        d: u32::MAX,
        ell: u32::MAX,
        cost_id: u32::MAX,
    };

    /// A literal run of `ell` bytes.
    pub fn literal(ell: u32) -> Self {
        Edge {
            d: 0,
            ell,
            cost_id: 0,
        }
    }

    /// A copy edge.
    pub fn copy(d: u32, ell: u32, cost_id: u32) -> Self {
        Edge { d, ell, cost_id }
    }

    /// Whether this edge is a literal run.
    #[inline]
    pub fn is_literal(&self) -> bool {
        self.d == 0
    }

    /// Whether this edge is the unreached sentinel.
    #[inline]
    pub fn is_invalid(&self) -> bool {
        self.d == u32::MAX
    }

    #[inline]
    pub(crate) fn set(&mut self, d: u32, ell: u32, cost_id: u32) {
        self.d = d;
        self.ell = ell;
        self.cost_id = cost_id;
    }
}

/// Number of bits needed to represent `x`.
#[inline]
pub(crate) fn bits(x: usize) -> u32 {
    usize::BITS - x.leading_zeros()
}

/// Packs a (length class, distance class) pair into one injective id.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdMap {
    len_bits: u32,
    len_mask: u32,
}

impl IdMap {
    /// Build a map for `lens` length classes.
    pub fn new(lens: usize) -> Self {
        let len_bits = bits(lens - 1);
        IdMap {
            len_bits,
            len_mask: (1 << len_bits) - 1,
        }
    }

    /// Serialize (len_idx, dst_idx) into an id.
    #[inline]
    pub fn wrap(&self, len_idx: u32, dst_idx: u32) -> u32 {
        (dst_idx << self.len_bits) | len_idx
    }

    /// Recover (dst_idx, len_idx) from an id.
    #[inline]
    pub fn unwrap(&self, id: u32) -> (u32, u32) {
        (id >> self.len_bits, id & self.len_mask)
    }
}

/// One quantization axis: ascending thresholds plus the cost of each class.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    /// Ascending upper bounds, one per class (inclusive).
    pub win: Vec<u32>,
    /// Cost of encoding a value in the matching class.
    pub costs: Vec<f64>,
}

impl ClassInfo {
    /// Pair thresholds with costs.
    pub fn new(win: Vec<u32>, costs: Vec<f64>) -> Self {
        debug_assert_eq!(win.len(), costs.len());
        ClassInfo { win, costs }
    }

    /// Largest encodable value.
    pub fn extent(&self) -> u32 {
        *self.win.last().expect("non-empty class info")
    }
}

/// Dense `dsts x lens` matrix of edge costs.
#[derive(Debug, Clone, Default)]
pub struct CostMatrix {
    data: Vec<f64>,
    dsts: usize,
    lens: usize,
}

impl CostMatrix {
    /// An uninitialized (zero) matrix.
    pub fn new(dsts: usize, lens: usize) -> Self {
        CostMatrix {
            data: vec![0.0; dsts * lens],
            dsts,
            lens,
        }
    }

    /// Matrix whose entries are the sum of the axis costs.
    pub fn from_classes(dst: &ClassInfo, len: &ClassInfo) -> Self {
        let mut m = CostMatrix::new(dst.costs.len(), len.costs.len());
        for (dst_idx, &dc) in dst.costs.iter().enumerate() {
            for (len_idx, &lc) in len.costs.iter().enumerate() {
                m.set(dst_idx, len_idx, dc + lc);
            }
        }
        m
    }

    /// Entry for (distance class, length class).
    #[inline]
    pub fn get(&self, dst_idx: usize, len_idx: usize) -> f64 {
        self.data[dst_idx * self.lens + len_idx]
    }

    /// Set one entry.
    #[inline]
    pub fn set(&mut self, dst_idx: usize, len_idx: usize, value: f64) {
        self.data[dst_idx * self.lens + len_idx] = value;
    }

    /// Number of distance classes.
    pub fn dsts(&self) -> usize {
        self.dsts
    }

    /// Number of length classes.
    pub fn lens(&self) -> usize {
        self.lens
    }
}

/// A complete cost model over (distance, length) classes plus literals.
#[derive(Debug, Clone, Default)]
pub struct CostModel {
    dst: Vec<u32>,
    len: Vec<u32>,
    lit_fixed: f64,
    lit_var: f64,
    map: IdMap,
    cost_map: Vec<f64>,
    cost_per_char: f64,
}

impl CostModel {
    /// Build a model from ladders and an explicit cost matrix.
    pub fn new(
        dst: Vec<u32>,
        len: Vec<u32>,
        costs: &CostMatrix,
        lit_fixed: f64,
        lit_var: f64,
        cost_per_char: f64,
    ) -> Self {
        let map = IdMap::new(len.len());
        let max_id = map.wrap(len.len() as u32 - 1, dst.len() as u32 - 1);
        let mut cost_map = vec![0.0; max_id as usize + 1];
        for len_idx in 0..costs.lens() {
            for dst_idx in 0..costs.dsts() {
                let id = map.wrap(len_idx as u32, dst_idx as u32);
                cost_map[id as usize] = costs.get(dst_idx, len_idx);
            }
        }
        CostModel {
            dst,
            len,
            lit_fixed,
            lit_var,
            map,
            cost_map,
            cost_per_char,
        }
    }

    /// Build a model from per-axis class infos; matrix entries are sums.
    pub fn from_classes(
        dst: ClassInfo,
        len: ClassInfo,
        lit_fixed: f64,
        lit_var: f64,
        cost_per_char: f64,
    ) -> Self {
        let matrix = CostMatrix::from_classes(&dst, &len);
        CostModel::new(dst.win, len.win, &matrix, lit_fixed, lit_var, cost_per_char)
    }

    /// Distance thresholds (ascending, inclusive upper bounds).
    pub fn dst(&self) -> &[u32] {
        &self.dst
    }

    /// Length thresholds (ascending, inclusive upper bounds).
    pub fn len(&self) -> &[u32] {
        &self.len
    }

    /// Cost of a literal run of `len` bytes.
    #[inline]
    pub fn lit_cost(&self, len: u32) -> f64 {
        self.lit_fixed + len as f64 * self.lit_var
    }

    /// Per-character additive cost (nanoseconds per copied byte for
    /// weight models, zero for space models).
    pub fn cost_per_char(&self) -> f64 {
        self.cost_per_char
    }

    /// The id packing map.
    pub fn map(&self) -> IdMap {
        self.map
    }

    /// First class indices whose thresholds are `>= d` and `>= ell`.
    #[inline]
    pub fn get_idx(&self, d: u32, ell: u32) -> (u32, u32) {
        debug_assert!(d <= *self.dst.last().expect("non-empty ladder"));
        debug_assert!(ell <= *self.len.last().expect("non-empty ladder"));
        (
            self.dst.partition_point(|&x| x < d) as u32,
            self.len.partition_point(|&x| x < ell) as u32,
        )
    }

    /// Packed cost id of the edge `<d, ell>`.
    #[inline]
    pub fn get_id(&self, d: u32, ell: u32) -> u32 {
        let (dst_idx, len_idx) = self.get_idx(d, ell);
        self.map.wrap(len_idx, dst_idx)
    }

    /// Cost of the (distance class, length class) pair.
    #[inline]
    pub fn get_cost(&self, dst_idx: u32, len_idx: u32) -> f64 {
        self.cost_map[self.map.wrap(len_idx, dst_idx) as usize]
    }

    /// Cost of a previously packed id.
    #[inline]
    pub fn cost_by_id(&self, cost_id: u32) -> f64 {
        self.cost_map[cost_id as usize]
    }

    /// Cost of an arbitrary edge under this model.
    #[inline]
    pub fn edge_cost(&self, edge: &Edge) -> f64 {
        if edge.is_literal() {
            self.lit_cost(edge.ell)
        } else {
            self.cost_by_id(edge.cost_id)
        }
    }

    /// Build an edge labeled with this model's cost id.
    pub fn get_edge(&self, d: u32, ell: u32) -> Edge {
        if d == 0 {
            Edge::literal(ell)
        } else {
            Edge::copy(d, ell, self.get_id(d, ell))
        }
    }

    /// The cost matrix in (dst, len) layout.
    pub fn matrix(&self) -> CostMatrix {
        let mut m = CostMatrix::new(self.dst.len(), self.len.len());
        for dst_idx in 0..self.dst.len() {
            for len_idx in 0..self.len.len() {
                m.set(dst_idx, len_idx, self.get_cost(dst_idx as u32, len_idx as u32));
            }
        }
        m
    }

    /// True for a default-constructed model with no classes.
    pub fn is_empty(&self) -> bool {
        self.cost_map.is_empty()
    }

    /// 40-hex-char identity: SHA-1 over the canonical serialization of
    /// (dst, len, matrix) as little-endian integers and f64 rows.
    pub fn id(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut hasher = Sha1::new();
        for &d in &self.dst {
            hasher.update(d.to_le_bytes());
        }
        for &l in &self.len {
            hasher.update(l.to_le_bytes());
        }
        for dst_idx in 0..self.dst.len() {
            for len_idx in 0..self.len.len() {
                hasher.update(self.get_cost(dst_idx as u32, len_idx as u32).to_le_bytes());
            }
        }
        use std::fmt::Write;
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(40);
        for byte in digest {
            write!(hex, "{:02x}", byte).expect("writing to String");
        }
        hex
    }
}

/// Merge two ascending ladders into their sorted union.
fn fuse_ladders(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out: Vec<u32> = a.iter().chain(b.iter()).copied().collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Combine two models over their union ladder as `c1 + lambda * c2`.
pub fn fuse(c1: &CostModel, c2: &CostModel, lambda: f64) -> CostModel {
    let distances = fuse_ladders(c1.dst(), c2.dst());
    let lengths = fuse_ladders(c1.len(), c2.len());

    let mut matrix = CostMatrix::new(distances.len(), lengths.len());
    for (dst_idx, &d) in distances.iter().enumerate() {
        for (len_idx, &l) in lengths.iter().enumerate() {
            let (d1, l1) = c1.get_idx(d, l);
            let (d2, l2) = c2.get_idx(d, l);
            let cost = c1.get_cost(d1, l1) + lambda * c2.get_cost(d2, l2);
            matrix.set(dst_idx, len_idx, cost);
        }
    }

    let lit_fixed = c1.lit_cost(0) + lambda * c2.lit_cost(0);
    let lit_var = c1.lit_cost(1) + lambda * c2.lit_cost(1) - lit_fixed;
    let cost_per_char = c1.cost_per_char() + lambda * c2.cost_per_char();

    CostModel::new(distances, lengths, &matrix, lit_fixed, lit_var, cost_per_char)
}

/// Produces the lexicographic variants of a fused (cost, weight) pair.
///
/// Both returned models live on the union ladder, so a parsing priced
/// under one can be re-priced under the other edge-for-edge.
#[derive(Debug, Clone, Default)]
pub struct CmFactory {
    cost: CostModel,
    weight: CostModel,
}

impl CmFactory {
    /// Fuse `cost` and `weight` over their union ladder.
    pub fn new(cost: &CostModel, weight: &CostModel) -> Self {
        CmFactory {
            cost: fuse(cost, weight, 0.0),
            weight: fuse(weight, cost, 0.0),
        }
    }

    /// The cost model on the union ladder.
    pub fn cost(&self) -> &CostModel {
        &self.cost
    }

    /// The weight model on the union ladder.
    pub fn weight(&self) -> &CostModel {
        &self.weight
    }

    /// The combined model `cost + lambda * weight`.
    pub fn lambda(&self, lambda: f64) -> CostModel {
        fuse(&self.cost, &self.weight, lambda)
    }
}

/// Parse error helper shared by the serializers in this module.
pub(crate) fn parse_err(what: &str) -> Error {
    Error::InvalidInput(what.to_string())
}

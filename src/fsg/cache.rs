//! Caching and replaying the forward star graph.
//!
//! The first full parse of a text records, per distance level, the
//! stream of maximal match lengths (delta-encoded against the previous
//! position). Later parses over the same text and cost model replay
//! the streams instead of touching the suffix array.

use super::{Generator, Protocol};
use crate::bits::{BitReader, BitWriter};
use crate::encoders::gamma::{self, NIBBLE};
use crate::model::CostModel;
use crate::text::Text;

/// Longest run expressible by the one-byte unary fast path.
const MAX_UNARY: u32 = 7;

/// Upper bound, in bytes per position, of one encoded level stream.
fn gamma_budget() -> f64 {
    1.0 + NIBBLE.binary_width[0] as f64 / 9.0
}

/// Per-level encoded length streams of one (text, cost model) pair.
#[derive(Debug, Default, Clone)]
pub struct CachedGraph {
    data: Vec<u8>,
    stride: usize,
}

impl CachedGraph {
    /// An empty (cold) cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of recorded levels.
    pub fn levels(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    /// Size of each level's stream, in bytes.
    pub fn level_size(&self) -> usize {
        self.stride
    }

    /// Allocate zeroed storage for `levels` streams of `level_size`
    /// bytes each.
    pub fn set(&mut self, level_size: usize, levels: usize) {
        self.stride = level_size;
        self.data = vec![0u8; level_size * levels];
    }

    fn level_chunks(&mut self) -> Vec<&mut [u8]> {
        self.data.chunks_mut(self.stride).collect()
    }

    fn level(&self, idx: usize) -> &[u8] {
        &self.data[idx * self.stride..(idx + 1) * self.stride]
    }
}

/// Writes one level's length stream: small values in unary within a
/// single byte, larger ones escaped to a γ-like code.
#[derive(Debug)]
pub struct StreamEncoder<'a> {
    writer: BitWriter<'a>,
}

impl<'a> StreamEncoder<'a> {
    fn new(storage: &'a mut [u8]) -> Self {
        StreamEncoder {
            writer: BitWriter::new(storage),
        }
    }

    /// Encode one length (or delta).
    pub fn encode(&mut self, value: u32) {
        if value <= MAX_UNARY {
            self.writer.write(1u64 << value, value + 1);
        } else {
            self.writer.write(0, 8);
            gamma::encode(value - MAX_UNARY, &NIBBLE, &mut self.writer);
        }
    }
}

/// Reads back a level's length stream.
#[derive(Debug)]
pub struct StreamDecoder<'a> {
    reader: BitReader<'a>,
}

impl<'a> StreamDecoder<'a> {
    fn new(storage: &'a [u8]) -> Self {
        StreamDecoder {
            reader: BitReader::new(storage),
        }
    }

    /// Decode one length (or delta).
    pub fn decode(&mut self) -> u32 {
        let byte = self.reader.peek(8) as u8;
        if byte == 0 {
            self.reader.skip_bytes(1);
            MAX_UNARY + gamma::decode(&NIBBLE, &mut self.reader)
        } else {
            let value = byte.trailing_zeros();
            self.reader.skip_bits(value + 1);
            value
        }
    }
}

/// Generator wrapper recording every produced length into the cache.
#[derive(Debug)]
pub struct CachingGen<'a, G> {
    gen: G,
    encoders: Vec<StreamEncoder<'a>>,
    prev_len: Vec<u32>,
    prev_pos: Vec<i64>,
}

impl<'a, G: Generator> CachingGen<'a, G> {
    /// Wrap `gen`, sizing the cache for `levels` levels over a text of
    /// `t_len` bytes.
    pub fn new(gen: G, graph: &'a mut CachedGraph, levels: usize, t_len: usize) -> Self {
        let max_size = (gamma_budget() * t_len as f64 * 2.0).ceil() as usize;
        graph.set(max_size, levels);
        let encoders = graph
            .level_chunks()
            .into_iter()
            .map(StreamEncoder::new)
            .collect();
        CachingGen {
            gen,
            encoders,
            prev_len: vec![1; levels],
            prev_pos: vec![-1; levels],
        }
    }
}

impl<G: Generator> Generator for CachingGen<'_, G> {
    fn max_match(&mut self, level: usize) -> (u32, u32) {
        let (d, ell) = self.gen.max_match(level);
        let p_len = &mut self.prev_len[level];
        let p_pos = &mut self.prev_pos[level];
        *p_len = p_len.saturating_sub(1);
        let here = self.gen.text_pos() as i64;
        debug_assert!(*p_pos < here - 1 || (*p_pos == here - 1 && ell >= *p_len));
        if *p_pos == here - 1 {
            // Consecutive positions: lengths shrink by at most one, so
            // the delta is non-negative.
            self.encoders[level].encode(ell - *p_len);
        } else {
            self.encoders[level].encode(ell);
        }
        *p_len = ell;
        *p_pos = here;
        (d, ell)
    }

    fn levels(&mut self) -> usize {
        self.gen.levels()
    }

    fn pre_gen(&mut self) {
        self.gen.pre_gen();
    }

    fn post_gen(&mut self) {
        self.gen.post_gen();
    }

    fn text_pos(&self) -> u32 {
        self.gen.text_pos()
    }
}

/// Generator replaying recorded length streams.
#[derive(Debug)]
pub struct CachedGen<'a> {
    decoders: Vec<StreamDecoder<'a>>,
    dsts: Vec<u32>,
    class_dst: Vec<u32>,
    t_pos: u32,
    t_len: usize,
    cur_dst_idx: usize,
    prev_len: Vec<u32>,
    prev_pos: Vec<i64>,
}

impl<'a> CachedGen<'a> {
    /// Replay `graph` for the ladder of `dsts` over `t_len` bytes.
    pub fn new(graph: &'a CachedGraph, dsts: Vec<u32>, t_len: usize) -> Self {
        let levels = graph.levels();
        let decoders = (0..levels).map(|i| StreamDecoder::new(graph.level(i))).collect();
        // Representative distance per class: one past the previous
        // class's bound. Costs only depend on the class, and the edges
        // are re-labeled during integration anyway.
        let mut class_dst: Vec<u32> = Vec::with_capacity(dsts.len());
        class_dst.push(1);
        class_dst.extend(dsts.iter().take(dsts.len() - 1).map(|&d| d + 1));
        CachedGen {
            decoders,
            dsts,
            class_dst,
            t_pos: 0,
            t_len,
            cur_dst_idx: 0,
            prev_len: vec![1; levels],
            prev_pos: vec![-1; levels],
        }
    }
}

impl Generator for CachedGen<'_> {
    fn max_match(&mut self, level: usize) -> (u32, u32) {
        let mut ell = self.decoders[level].decode();
        let p_len = &mut self.prev_len[level];
        let p_pos = &mut self.prev_pos[level];
        *p_len = p_len.saturating_sub(1);
        if *p_pos == self.t_pos as i64 - 1 {
            ell += *p_len;
        }
        *p_len = ell;
        *p_pos = self.t_pos as i64;
        (self.class_dst[level], ell)
    }

    fn levels(&mut self) -> usize {
        if self.cur_dst_idx < self.dsts.len() - 1 && self.dsts[self.cur_dst_idx] < self.t_pos {
            self.cur_dst_idx += 1;
        }
        1 + self.cur_dst_idx
    }

    fn pre_gen(&mut self) {}

    fn post_gen(&mut self) {
        self.t_pos += 1;
    }

    fn text_pos(&self) -> u32 {
        self.t_pos
    }
}

/// Number of levels worth caching for a ladder over `t_len` bytes.
pub fn cache_levels(dst: &[u32], t_len: usize) -> usize {
    1 + dst.partition_point(|&d| (d as usize) < t_len)
}

/// Build a recording FSG around the generalized generator.
pub fn caching_fsg<'a>(
    text: &Text,
    sa: std::rc::Rc<Vec<i32>>,
    cm: &CostModel,
    graph: &'a mut CachedGraph,
) -> crate::error::Result<Protocol<CachingGen<'a, super::FastGen<super::GeneralizedRsa>>>> {
    let stats = super::GenStats::new(cm.dst(), text.len());
    let dst = stats.dst().to_vec();
    let rsa = super::GeneralizedRsa::new(&stats, sa);
    let inner = super::FastGen::new(
        text,
        rsa,
        dst.clone(),
        stats.cost_class(),
        stats.thresholds(),
        super::Matcher::Split,
    );
    let levels = cache_levels(cm.dst(), text.len()).min(dst.len());
    let gen = CachingGen::new(inner, graph, levels, text.len());
    Ok(Protocol::new(gen, text.len(), &dst, cm.len()))
}

/// Build a replaying FSG from a warm cache.
pub fn cached_fsg<'a>(
    text: &Text,
    cm: &CostModel,
    graph: &'a CachedGraph,
) -> crate::error::Result<Protocol<CachedGen<'a>>> {
    let dst = super::rsa::normalize_dst(cm.dst(), text.len());
    let gen = CachedGen::new(graph, dst.clone(), text.len());
    Ok(Protocol::new(gen, text.len(), &dst, cm.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_round_trip_small_values() {
        let mut storage = vec![0u8; 256];
        let values: Vec<u32> = vec![0, 1, 7, 3, 0, 0, 5, 2];
        {
            let mut enc = StreamEncoder::new(&mut storage);
            for &v in &values {
                enc.encode(v);
            }
        }
        let mut dec = StreamDecoder::new(&storage);
        for &v in &values {
            assert_eq!(dec.decode(), v);
        }
    }

    #[test]
    fn test_stream_round_trip_escaped_values() {
        let mut storage = vec![0u8; 1024];
        let values: Vec<u32> = vec![8, 100, 7, 0, 5000, 1, 1_000_000, 9];
        {
            let mut enc = StreamEncoder::new(&mut storage);
            for &v in &values {
                enc.encode(v);
            }
        }
        let mut dec = StreamDecoder::new(&storage);
        for &v in &values {
            assert_eq!(dec.decode(), v, "value {}", v);
        }
    }

    #[test]
    fn test_zero_after_long_run() {
        // A stream may drop to zero right after a long match (the
        // delta path only applies to consecutive positions).
        let mut storage = vec![0u8; 256];
        {
            let mut enc = StreamEncoder::new(&mut storage);
            enc.encode(500);
            enc.encode(0);
            enc.encode(0);
            enc.encode(12);
        }
        let mut dec = StreamDecoder::new(&storage);
        assert_eq!(dec.decode(), 500);
        assert_eq!(dec.decode(), 0);
        assert_eq!(dec.decode(), 0);
        assert_eq!(dec.decode(), 12);
    }

    #[test]
    fn test_cached_graph_layout() {
        let mut cg = CachedGraph::new();
        assert!(cg.is_empty());
        cg.set(128, 3);
        assert!(!cg.is_empty());
        assert_eq!(cg.levels(), 3);
        assert_eq!(cg.level_size(), 128);
        assert_eq!(cg.level(2).len(), 128);
    }

    #[test]
    fn test_cache_levels() {
        assert_eq!(cache_levels(&[8, 64, 1 << 20], 1000), 3);
        assert_eq!(cache_levels(&[8, 64, 512], 1000), 4);
    }
}

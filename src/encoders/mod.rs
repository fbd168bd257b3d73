//! The closed registry of integer encoders.
//!
//! Each encoder couples a copy codec (hybrid or a γ-like family) with a
//! literal-run sub-encoder, and publishes the cost model that prices its
//! output bit-exactly. Dispatch is by tagged variant; the hot encode and
//! decode paths match once per phrase.

pub mod gamma;
pub mod hybrid;

use crate::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::model::{ClassInfo, CostModel};
use gamma::{CostClassTable, NIBBLE, SODA09_DST, SODA09_LEN};

/// Copy-codec family of an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Byte-aligned tagged binary codes.
    Hybrid,
    /// γ-like code with soda09 class tables.
    Soda09,
    /// γ-like code with nibble4 class tables.
    Nibble4,
}

/// Literal-run sub-encoder of an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    /// Single character, byte-aligned: `[char][next:u32]`.
    ByteChar,
    /// Byte-aligned run: `[len-1 : bytes][raw][next:u32]`.
    BytePrefix {
        /// Width of the length prefix in bytes (1, 2 or 4).
        bytes: u8,
    },
    /// Single character in the bit stream: `[next:u32][char]`.
    BitChar,
    /// Bit-stream run: `[next:u32][len-start : bytes][raw]`.
    BitPrefix {
        /// Width of the length prefix in bytes (1 or 2).
        bytes: u8,
        /// Offset subtracted from the run length before encoding.
        start: u32,
    },
}

impl LitKind {
    /// Longest literal run this sub-encoder can represent.
    fn max_length(&self) -> u64 {
        match *self {
            LitKind::ByteChar | LitKind::BitChar => 1,
            LitKind::BytePrefix { bytes } => 1u64 << (8 * bytes),
            LitKind::BitPrefix { bytes, start } => {
                ((1u64 << (8 * bytes)) - 1) + start as u64
            }
        }
    }

    /// (fixed, variable) literal cost in bits.
    fn costs(&self) -> (f64, f64) {
        match *self {
            LitKind::ByteChar => (40.0, 0.0),
            LitKind::BytePrefix { bytes } => (8.0 * bytes as f64 + 32.0, 8.0),
            LitKind::BitChar => (32.0, 8.0),
            LitKind::BitPrefix { bytes, .. } => ((bytes as f64 + 4.0) * 8.0, 8.0),
        }
    }
}

/// A registered encoder: its name plus the codec pairing.
#[derive(Debug, Clone, Copy)]
pub struct EncoderInfo {
    /// External name, part of the compressed-file header contract.
    pub name: &'static str,
    family: Family,
    lit: LitKind,
}

/// Every known encoder, in listing order.
pub static ENCODERS: &[EncoderInfo] = &[
    EncoderInfo {
        name: "hybrid",
        family: Family::Hybrid,
        lit: LitKind::ByteChar,
    },
    EncoderInfo {
        name: "hybrid-8",
        family: Family::Hybrid,
        lit: LitKind::BytePrefix { bytes: 1 },
    },
    EncoderInfo {
        name: "hybrid-16",
        family: Family::Hybrid,
        lit: LitKind::BytePrefix { bytes: 2 },
    },
    EncoderInfo {
        name: "hybrid-32",
        family: Family::Hybrid,
        lit: LitKind::BytePrefix { bytes: 4 },
    },
    EncoderInfo {
        name: "soda09",
        family: Family::Soda09,
        lit: LitKind::BitChar,
    },
    EncoderInfo {
        name: "soda09_8",
        family: Family::Soda09,
        lit: LitKind::BitPrefix { bytes: 1, start: 0 },
    },
    EncoderInfo {
        name: "soda09_16",
        family: Family::Soda09,
        lit: LitKind::BitPrefix { bytes: 2, start: 0 },
    },
    EncoderInfo {
        name: "soda09_8U",
        family: Family::Soda09,
        lit: LitKind::BitPrefix { bytes: 1, start: 1 },
    },
    EncoderInfo {
        name: "soda09_16U",
        family: Family::Soda09,
        lit: LitKind::BitPrefix { bytes: 2, start: 1 },
    },
    EncoderInfo {
        name: "nibble4",
        family: Family::Nibble4,
        lit: LitKind::BitChar,
    },
    EncoderInfo {
        name: "nibble4_8",
        family: Family::Nibble4,
        lit: LitKind::BitPrefix { bytes: 1, start: 0 },
    },
    EncoderInfo {
        name: "nibble4_16",
        family: Family::Nibble4,
        lit: LitKind::BitPrefix { bytes: 2, start: 0 },
    },
    EncoderInfo {
        name: "nibble4_8U",
        family: Family::Nibble4,
        lit: LitKind::BitPrefix { bytes: 1, start: 1 },
    },
    EncoderInfo {
        name: "nibble4_16U",
        family: Family::Nibble4,
        lit: LitKind::BitPrefix { bytes: 2, start: 1 },
    },
];

/// Look an encoder up by its external name.
pub fn lookup(name: &str) -> Result<EncoderInfo> {
    ENCODERS
        .iter()
        .find(|e| e.name == name)
        .copied()
        .ok_or_else(|| Error::InvalidInput(format!("no encoder named \"{}\"", name)))
}

/// Names of all registered encoders.
pub fn names() -> Vec<&'static str> {
    ENCODERS.iter().map(|e| e.name).collect()
}

fn gamma_class_info(table: &CostClassTable) -> ClassInfo {
    let win = table.cost_classes[1..].to_vec();
    let costs = table
        .binary_width
        .iter()
        .enumerate()
        .map(|(i, &w)| (w + i as u32 + 1) as f64)
        .collect();
    ClassInfo::new(win, costs)
}

impl EncoderInfo {
    fn tables(&self) -> Option<(&'static CostClassTable, &'static CostClassTable)> {
        match self.family {
            Family::Hybrid => None,
            Family::Soda09 => Some((&SODA09_DST, &SODA09_LEN)),
            Family::Nibble4 => Some((&NIBBLE, &NIBBLE)),
        }
    }

    /// The cost model pricing this encoder's output, in bits.
    pub fn cost_model(&self) -> CostModel {
        let (fixed, var) = self.lit.costs();
        let (dst, len) = match self.tables() {
            None => (
                ClassInfo::new(
                    vec![1 << 6, 1 << 14, 1 << 22, 1 << 30],
                    vec![8.0, 16.0, 24.0, 32.0],
                ),
                ClassInfo::new(vec![1 << 7, 1 << 15], vec![8.0, 16.0]),
            ),
            Some((d, l)) => (gamma_class_info(d), gamma_class_info(l)),
        };
        CostModel::from_classes(dst, len, fixed, var, 0.0)
    }

    /// Longest literal run this encoder can emit.
    pub fn literal_window(&self) -> u64 {
        self.lit.max_length()
    }

    /// Bytes needed to hold a parsing of `bits` bits, padding included.
    pub fn data_len(&self, bits: usize) -> usize {
        bits.div_ceil(8) + 8
    }

    /// Bytes a decoder may read past the parsing end.
    pub fn extra_read(&self) -> usize {
        8
    }

    /// Start encoding phrases into a zeroed buffer.
    pub fn encoder<'a>(&self, data: &'a mut [u8]) -> Encoder<'a> {
        Encoder {
            writer: BitWriter::new(data),
            family: self.family,
            lit: self.lit,
        }
    }

    /// Start decoding phrases from a buffer.
    pub fn decoder<'a>(&self, data: &'a [u8]) -> Decoder<'a> {
        Decoder {
            reader: BitReader::new(data),
            family: self.family,
            lit: self.lit,
        }
    }
}

/// Streams phrases of one parsing into a byte buffer.
#[derive(Debug)]
pub struct Encoder<'a> {
    writer: BitWriter<'a>,
    family: Family,
    lit: LitKind,
}

impl Encoder<'_> {
    /// Encode a copy phrase `<d, ell>`.
    #[inline]
    pub fn encode_copy(&mut self, d: u32, ell: u32) {
        match self.family {
            Family::Hybrid => {
                hybrid::dst_encode(d, &mut self.writer);
                hybrid::len_encode(ell, &mut self.writer);
            }
            Family::Soda09 => {
                gamma::encode(d, &SODA09_DST, &mut self.writer);
                gamma::encode(ell, &SODA09_LEN, &mut self.writer);
            }
            Family::Nibble4 => {
                gamma::encode(d, &NIBBLE, &mut self.writer);
                gamma::encode(ell, &NIBBLE, &mut self.writer);
            }
        }
    }

    /// Encode a literal run followed by its `nextliteral` counter.
    pub fn encode_literal_run(&mut self, run: &[u8], next: u32) {
        debug_assert!(!run.is_empty());
        debug_assert!(run.len() as u64 <= self.lit.max_length());
        match self.lit {
            LitKind::ByteChar => {
                self.writer.write(run[0] as u64, 8);
                self.writer.write_u32(next);
            }
            LitKind::BytePrefix { bytes } => {
                self.writer
                    .write((run.len() - 1) as u64, 8 * bytes as u32);
                self.writer.write_bytes(run);
                self.writer.write_u32(next);
            }
            LitKind::BitChar => {
                self.writer.write_u32(next);
                self.writer.write(run[0] as u64, 8);
            }
            LitKind::BitPrefix { bytes, start } => {
                self.writer.write_u32(next);
                self.writer
                    .write(run.len() as u64 - start as u64, 8 * bytes as u32);
                // Split the first character so the rest copies byte-aligned.
                let first_width = self.writer.offset();
                let second_width = 8 - first_width;
                let first_part = (run[0] as u16 >> second_width) as u8;
                let second_part = run[0] & ((1u16 << second_width) - 1) as u8;
                self.writer.write(second_part as u64, second_width);
                self.writer.write_bytes(&run[1..]);
                self.writer.write(first_part as u64, first_width);
            }
        }
    }

    /// Byte position of the writing head.
    pub fn head(&self) -> usize {
        self.writer.head()
    }
}

/// Streams phrases of one parsing out of a byte buffer.
#[derive(Debug)]
pub struct Decoder<'a> {
    reader: BitReader<'a>,
    family: Family,
    lit: LitKind,
}

impl Decoder<'_> {
    /// Decode a copy phrase, returning `(d, ell)`.
    #[inline]
    pub fn decode_copy(&mut self) -> (u32, u32) {
        match self.family {
            Family::Hybrid => (
                hybrid::dst_decode(&mut self.reader),
                hybrid::len_decode(&mut self.reader),
            ),
            Family::Soda09 => (
                gamma::decode(&SODA09_DST, &mut self.reader),
                gamma::decode(&SODA09_LEN, &mut self.reader),
            ),
            Family::Nibble4 => (
                gamma::decode(&NIBBLE, &mut self.reader),
                gamma::decode(&NIBBLE, &mut self.reader),
            ),
        }
    }

    /// Decode a literal run into `dest`, returning `(ell, nextliteral)`.
    pub fn decode_literal_run(&mut self, dest: &mut [u8]) -> (u32, u32) {
        match self.lit {
            LitKind::ByteChar => {
                dest[0] = self.reader.read(8) as u8;
                let next = self.reader.read_u32();
                (1, next)
            }
            LitKind::BytePrefix { bytes } => {
                let len = self.reader.read(8 * bytes as u32) as u32 + 1;
                self.reader.read_bytes(dest, len as usize);
                let next = self.reader.read_u32();
                (len, next)
            }
            LitKind::BitChar => {
                let next = self.reader.read_u32();
                dest[0] = self.reader.read(8) as u8;
                (1, next)
            }
            LitKind::BitPrefix { bytes, start } => {
                let next = self.reader.read_u32();
                let len = self.reader.read(8 * bytes as u32) as u32 + start;
                let first_width = self.reader.offset();
                let second_width = 8 - first_width;
                let second_part = self.reader.read(second_width) as u8;
                let (first, rest) = dest.split_at_mut(1);
                self.reader.read_bytes(rest, len as usize - 1);
                let first_part = self.reader.read(first_width) as u16;
                first[0] = ((first_part << second_width) as u8) | second_part;
                (len, next)
            }
        }
    }

    /// Byte position of the reading head.
    pub fn head(&self) -> usize {
        self.reader.head()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_unique() {
        let names = names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
        assert!(names.contains(&"hybrid"));
        assert!(names.contains(&"soda09"));
        assert!(names.contains(&"nibble4_16U"));
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(lookup("definitely-not-an-encoder").is_err());
    }

    #[test]
    fn test_literal_windows() {
        assert_eq!(lookup("hybrid").unwrap().literal_window(), 1);
        assert_eq!(lookup("hybrid-8").unwrap().literal_window(), 256);
        assert_eq!(lookup("hybrid-32").unwrap().literal_window(), 1 << 32);
        assert_eq!(lookup("soda09").unwrap().literal_window(), 1);
        assert_eq!(lookup("soda09_8").unwrap().literal_window(), 255);
        assert_eq!(lookup("soda09_8U").unwrap().literal_window(), 256);
        assert_eq!(lookup("nibble4_16U").unwrap().literal_window(), 65536);
    }

    #[test]
    fn test_cost_model_ladders() {
        let cm = lookup("hybrid").unwrap().cost_model();
        assert_eq!(cm.dst(), &[1 << 6, 1 << 14, 1 << 22, 1 << 30]);
        assert_eq!(cm.len(), &[1 << 7, 1 << 15]);
        assert_eq!(cm.get_cost(0, 0), 16.0);
        assert_eq!(cm.get_cost(3, 1), 48.0);

        let cm = lookup("soda09").unwrap().cost_model();
        assert_eq!(cm.dst().len(), 6);
        assert_eq!(cm.len().len(), 15);
        // First distance class: 14 remainder bits + 1 unary bit.
        assert_eq!(cm.get_cost(0, 0), 15.0 + 4.0);
    }

    #[test]
    fn test_data_len_padding() {
        let enc = lookup("hybrid").unwrap();
        assert_eq!(enc.data_len(0), 8);
        assert_eq!(enc.data_len(1), 9);
        assert_eq!(enc.data_len(8), 9);
        assert_eq!(enc.data_len(9), 10);
        assert_eq!(enc.extra_read(), 8);
    }

    fn phrase_round_trip(name: &str) {
        let info = lookup(name).unwrap();
        let phrases: &[(u32, u32)] = &[(1, 1), (5, 3), (63, 127), (1000, 9), (20000, 300)];
        let run1 = b"a";
        let run2 = b"x";
        let mut buf = vec![0u8; 256];
        {
            let mut enc = info.encoder(&mut buf);
            enc.encode_literal_run(run1, phrases.len() as u32);
            for &(d, l) in phrases {
                enc.encode_copy(d, l);
            }
            enc.encode_literal_run(run2, 0);
        }
        let mut dec = info.decoder(&buf);
        let mut dest = vec![0u8; 16];
        let (ell, next) = dec.decode_literal_run(&mut dest);
        assert_eq!((ell, next), (1, phrases.len() as u32));
        assert_eq!(dest[0], b'a');
        for &(d, l) in phrases {
            assert_eq!(dec.decode_copy(), (d, l), "{}", name);
        }
        let (ell, next) = dec.decode_literal_run(&mut dest);
        assert_eq!((ell, next), (1, 0));
        assert_eq!(dest[0], b'x');
    }

    #[test]
    fn test_phrase_round_trip_all_single_char_encoders() {
        for name in ["hybrid", "soda09", "nibble4"] {
            phrase_round_trip(name);
        }
    }

    fn run_round_trip(name: &str, run: &[u8]) {
        let info = lookup(name).unwrap();
        let mut buf = vec![0u8; run.len() + 64];
        {
            let mut enc = info.encoder(&mut buf);
            enc.encode_copy(17, 4);
            enc.encode_literal_run(run, 7);
            enc.encode_copy(2, 9);
        }
        let mut dec = info.decoder(&buf);
        assert_eq!(dec.decode_copy(), (17, 4));
        let mut dest = vec![0u8; run.len() + 8];
        let (ell, next) = dec.decode_literal_run(&mut dest);
        assert_eq!(ell as usize, run.len(), "{}", name);
        assert_eq!(next, 7);
        assert_eq!(&dest[..run.len()], run);
        assert_eq!(dec.decode_copy(), (2, 9));
    }

    #[test]
    fn test_literal_run_round_trip_prefix_encoders() {
        let run: Vec<u8> = (0..=200u8).collect();
        for name in [
            "hybrid-8",
            "hybrid-16",
            "hybrid-32",
            "soda09_8",
            "soda09_16",
            "soda09_8U",
            "soda09_16U",
            "nibble4_8",
            "nibble4_16",
            "nibble4_8U",
            "nibble4_16U",
        ] {
            run_round_trip(name, &run);
            run_round_trip(name, b"z");
        }
    }

    #[test]
    fn test_cost_model_matches_hybrid_encoding_width() {
        // The model must price exactly what the codec writes.
        let info = lookup("hybrid-8").unwrap();
        let cm = info.cost_model();
        let cases = [(1u32, 1u32), (64, 127), (65, 128), (1 << 22, 1 << 15)];
        for &(d, l) in &cases {
            let mut buf = vec![0u8; 64];
            let bits;
            {
                let mut enc = info.encoder(&mut buf);
                enc.encode_copy(d, l);
                bits = enc.head() * 8;
            }
            let edge = cm.get_edge(d, l);
            assert_eq!(cm.edge_cost(&edge), bits as f64, "({}, {})", d, l);
        }
    }

    #[test]
    fn test_cost_model_matches_gamma_encoding_width() {
        let info = lookup("soda09").unwrap();
        let cm = info.cost_model();
        for &(d, l) in &[(1u32, 1u32), (16384, 8), (16385, 9), (278528, 4144)] {
            let mut buf = vec![0u8; 64];
            let bits;
            {
                let mut w = BitWriter::new(&mut buf);
                gamma::encode(d, &SODA09_DST, &mut w);
                gamma::encode(l, &SODA09_LEN, &mut w);
                bits = w.head() * 8 + w.offset() as usize;
            }
            let edge = cm.get_edge(d, l);
            assert_eq!(cm.edge_cost(&edge), bits as f64, "({}, {})", d, l);
        }
    }
}

//! Serialized parsings: header format, phrase writer and reader.
//!
//! A compressed file is `<encoder name NUL> <uncompressed size: u32 LE>
//! <body>`. The body starts with a literal phrase; every literal run is
//! followed by a 32-bit counter of the copy phrases separating it from
//! the next literal (one extra when the parsing ends without another
//! literal). Bodies carry eight trailing zero bytes so unaligned peeks
//! stay in bounds.

use crate::encoders::{Decoder, EncoderInfo};
use crate::error::{Error, Result};
use crate::model::{CostModel, Edge};
use crate::text::Text;

/// A fully encoded parsing, header included.
#[derive(Debug, Clone)]
pub struct CompressedFile {
    /// Header plus body plus padding.
    pub data: Vec<u8>,
    /// Bytes of `data` that belong to the file (padding excluded).
    pub total_size: usize,
    /// Bytes of the encoded parsing alone.
    pub parsing_size: usize,
}

impl CompressedFile {
    /// The body (encoded parsing) of this file.
    pub fn body(&self) -> Result<&[u8]> {
        let (_, _, offset) = unpack(&self.data)?;
        Ok(&self.data[offset..])
    }

    /// The uncompressed length recorded in the header.
    pub fn uncompressed_size(&self) -> Result<usize> {
        let (_, size, _) = unpack(&self.data)?;
        Ok(size as usize)
    }
}

/// Build a header and reserve zeroed space for `comp_len` body bytes
/// (plus safety padding). Returns the buffer and the file length.
pub fn pack(enc_name: &str, orig_len: u32, comp_len: usize) -> (Vec<u8>, usize) {
    let data_len = comp_len + std::mem::size_of::<u32>() + enc_name.len() + 1;
    let mut data = vec![0u8; data_len + 8];
    data[..enc_name.len()].copy_from_slice(enc_name.as_bytes());
    // NUL terminator is already zero.
    let size_off = enc_name.len() + 1;
    data[size_off..size_off + 4].copy_from_slice(&orig_len.to_le_bytes());
    (data, data_len)
}

/// Parse a header: (encoder name, uncompressed size, body offset).
pub fn unpack(data: &[u8]) -> Result<(&str, u32, usize)> {
    let nul = data
        .iter()
        .take(64)
        .position(|&b| b == 0)
        .ok_or_else(|| Error::CorruptedData("unterminated encoder name".into()))?;
    let name = std::str::from_utf8(&data[..nul])
        .map_err(|_| Error::CorruptedData("bad encoder name".into()))?;
    let size_off = nul + 1;
    if data.len() < size_off + 4 {
        return Err(Error::CorruptedData("truncated header".into()));
    }
    let size = u32::from_le_bytes(
        data[size_off..size_off + 4]
            .try_into()
            .expect("four bytes"),
    );
    Ok((name, size, size_off + 4))
}

/// Total encoded size of a parsing under `cm`, in the model's unit
/// (bits for space models, nanoseconds for weight models).
pub fn parsing_length(sol: &[Edge], cm: &CostModel) -> f64 {
    let mut size = 0.0;
    let mut length = 0u64;
    let mut it = 0usize;
    let end = sol.len() - 1;
    while it < end {
        let edge = &sol[it];
        size += cm.edge_cost(edge);
        length += edge.ell as u64;
        it += edge.ell as usize;
    }
    size + length as f64 * cm.cost_per_char()
}

/// Encode `sol` into `output` (zeroed, sized by the encoder's
/// `data_len`).
pub fn write_body(sol: &[Edge], text: &Text, enc: &EncoderInfo, output: &mut [u8]) {
    let bytes = text.as_slice();
    let length = bytes.len();
    let mut encoder = enc.encoder(output);
    let mut i = 0usize;
    while i < length {
        let edge = &sol[i];
        debug_assert!(!edge.is_invalid());
        if edge.is_literal() {
            // Count the copy phrases up to the next literal; one extra
            // when this is the last literal of the parsing.
            let mut nextliteral = 0u32;
            let mut j = i + edge.ell as usize;
            while j < length {
                if sol[j].is_literal() {
                    break;
                }
                j += sol[j].ell as usize;
                nextliteral += 1;
            }
            if j >= length {
                nextliteral += 1;
            }
            encoder.encode_literal_run(&bytes[i..i + edge.ell as usize], nextliteral);
        } else {
            encoder.encode_copy(edge.d, edge.ell);
        }
        i += edge.ell as usize;
    }
}

/// Encode a parsing with a trusted bit length into a full file.
pub fn write_parsing_sized(
    sol: &[Edge],
    text: &Text,
    enc: &EncoderInfo,
    parsing_bits: usize,
) -> CompressedFile {
    let byte_len = enc.data_len(parsing_bits);
    let (mut data, total_size) = pack(enc.name, text.len() as u32, byte_len);
    let body_off = unpack(&data).expect("fresh header").2;
    write_body(sol, text, enc, &mut data[body_off..]);
    CompressedFile {
        data,
        total_size,
        parsing_size: byte_len,
    }
}

/// Encode a parsing, computing its length under the encoder's model.
pub fn write_parsing(sol: &[Edge], text: &Text, enc: &EncoderInfo) -> CompressedFile {
    let bits = parsing_length(sol, &enc.cost_model()).ceil() as usize;
    write_parsing_sized(sol, text, enc, bits)
}

/// Streams the phrases of an encoded parsing.
pub struct PhraseReader<'a> {
    text_len: usize,
    dec: Decoder<'a>,
    text_pos: u32,
    next_literal: u32,
    buffer: Vec<u8>,
}

impl<'a> PhraseReader<'a> {
    /// Read phrases of `enc` from `data`, an encoded parsing of
    /// `text_len` uncompressed bytes.
    pub fn new(enc: &EncoderInfo, data: &'a [u8], text_len: usize) -> Self {
        PhraseReader {
            text_len,
            dec: enc.decoder(data),
            text_pos: 0,
            next_literal: 0,
            buffer: vec![0u8; enc.literal_window().min(1 << 24) as usize + 8],
        }
    }

    /// Decode the next phrase as `(d, ell)`; `d == 0` marks a literal
    /// run whose bytes land in [`PhraseReader::buffer`].
    pub fn next(&mut self) -> (u32, u32) {
        let (d, ell) = if self.next_literal > 0 {
            self.next_literal -= 1;
            self.dec.decode_copy()
        } else {
            let (ell, next) = self.dec.decode_literal_run(&mut self.buffer);
            self.next_literal = next;
            (0, ell)
        };
        self.text_pos += ell;
        (d, ell)
    }

    /// Whether every phrase has been read.
    pub fn end(&self) -> bool {
        self.text_pos as usize >= self.text_len
    }

    /// Bytes of the literal run read last.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// The pending copy count.
    pub fn next_literal(&self) -> u32 {
        self.next_literal
    }

    /// Override the pending copy count (used when patching parsings
    /// with externally supplied counters).
    pub fn set_next_literal(&mut self, next: u32) {
        self.next_literal = next;
    }
}

/// Rewrite `parsing`'s `nextliteral` fields from `lits`, preserving
/// every `(d, ell)` pair and literal byte. `output` must be zeroed and
/// at least as large as `parsing`.
pub fn fix_parsing(
    enc: &EncoderInfo,
    parsing: &[u8],
    uncomp_len: usize,
    output: &mut [u8],
    mut lits: impl Iterator<Item = u32>,
) -> Result<()> {
    let mut reader = PhraseReader::new(enc, parsing, uncomp_len);
    let mut encoder = enc.encoder(output);
    while !reader.end() {
        let (d, ell) = reader.next();
        if d > 0 {
            encoder.encode_copy(d, ell);
        } else {
            let next = lits
                .next()
                .ok_or_else(|| Error::InvalidInput("nextliteral list too short".into()))?;
            reader.set_next_literal(next);
            let run = reader.buffer()[..ell as usize].to_vec();
            encoder.encode_literal_run(&run, next);
        }
    }
    Ok(())
}

/// Verify that a parsing reproduces `text`; reports the first bad edge.
pub fn check_correctness(sol: &[Edge], text: &[u8]) -> Result<()> {
    let n = text.len();
    let mut pos = 0usize;
    while pos < n {
        let edge = &sol[pos];
        let bad = edge.is_invalid()
            || edge.ell == 0
            || pos + edge.ell as usize > n
            || (!edge.is_literal()
                && ((edge.d as usize) > pos
                    || (0..edge.ell as usize)
                        .any(|k| text[pos - edge.d as usize + k] != text[pos + k])));
        if bad {
            return Err(Error::CorrectnessCheck {
                position: pos,
                d: edge.d,
                ell: edge.ell,
            });
        }
        pos += edge.ell as usize;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoders::lookup;
    use crate::meter::Silent;
    use std::rc::Rc;

    fn parse_text(data: &[u8], enc: &EncoderInfo) -> (Text, Vec<Edge>) {
        let text = Text::new(data.to_vec());
        let cm = enc.cost_model();
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
        let mut fsg = crate::fsg::gen_fast_fsg(&text, sa, &cm).unwrap();
        let (sol, _) =
            crate::parser::parse(&mut fsg, enc.literal_window() as usize, &cm, &mut Silent);
        (text, sol)
    }

    #[test]
    fn test_pack_unpack() {
        let (data, total) = pack("soda09", 12345, 100);
        assert_eq!(data.len(), total + 8);
        let (name, size, off) = unpack(&data).unwrap();
        assert_eq!(name, "soda09");
        assert_eq!(size, 12345);
        assert_eq!(off, "soda09".len() + 1 + 4);
    }

    #[test]
    fn test_unpack_rejects_garbage() {
        let data = vec![0xFFu8; 80];
        assert!(unpack(&data).is_err());
    }

    #[test]
    fn test_write_then_read_phrases() {
        let data = b"mississippibananamississippi";
        let enc = lookup("soda09").unwrap();
        let (text, sol) = parse_text(data, &enc);
        let comp = write_parsing(&sol, &text, &enc);

        // Re-read the phrases and compare against the edge sequence.
        let body = comp.body().unwrap();
        let mut reader = PhraseReader::new(&enc, body, data.len());
        let mut pos = 0usize;
        while pos < data.len() {
            let e = sol[pos];
            let (d, ell) = reader.next();
            assert_eq!((d, ell), (e.d, e.ell), "at {}", pos);
            if d == 0 {
                assert_eq!(&reader.buffer()[..ell as usize], &data[pos..pos + ell as usize]);
            }
            pos += ell as usize;
        }
        assert!(reader.end());
    }

    #[test]
    fn test_parsing_length_counts_all_edges() {
        let enc = lookup("hybrid-8").unwrap();
        let cm = enc.cost_model();
        let data = b"aaaaabbbbbaaaaabbbbb";
        let (text, sol) = parse_text(data, &enc);
        let bits = parsing_length(&sol, &cm);
        // The encoded body (padding aside) matches the computed bits.
        let comp = write_parsing(&sol, &text, &enc);
        assert_eq!(comp.parsing_size, enc.data_len(bits.ceil() as usize));
    }

    #[test]
    fn test_check_correctness_accepts_and_rejects() {
        let data = b"abcabcabc";
        let enc = lookup("soda09").unwrap();
        let (_, mut sol) = parse_text(data, &enc);
        assert!(check_correctness(&sol, data).is_ok());

        // Corrupt one copy edge.
        let pos = (0..data.len())
            .find(|&p| !sol[p].is_invalid() && sol[p].d > 0)
            .expect("some copy");
        sol[pos].d += 1;
        match check_correctness(&sol, data) {
            Err(Error::CorrectnessCheck { position, .. }) => assert_eq!(position, pos),
            other => panic!("expected failure, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_fix_parsing_round_trip() {
        let data = b"abcXabcXabcXzzzzQRSabcX";
        let enc = lookup("soda09_8").unwrap();
        let (text, sol) = parse_text(data, &enc);
        let comp = write_parsing(&sol, &text, &enc);
        let body = comp.body().unwrap();

        // Collect the true nextliteral values.
        let mut lits = Vec::new();
        let mut reader = PhraseReader::new(&enc, body, data.len());
        while !reader.end() {
            let (d, _) = reader.next();
            if d == 0 {
                lits.push(reader.next_literal());
            }
        }

        // Re-encode with the correct values: byte-identical body.
        let mut fixed = vec![0u8; body.len()];
        fix_parsing(&enc, body, data.len(), &mut fixed, lits.iter().copied()).unwrap();
        assert_eq!(&fixed[..], body);
    }
}

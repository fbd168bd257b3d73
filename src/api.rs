//! Programmatic compression surface.
//!
//! A compressed file is HEADER + BODY: the header names the encoder and
//! records the uncompressed length, the body is the encoded parsing
//! plus a few padding bytes that keep unaligned reads in bounds.
//! `compress`/`decompress` handle full files; the `_buffer` variants
//! handle bare bodies (useful when gluing parsings of text blocks, see
//! [`fix_parsing`]).

use crate::bicriteria::{BicriteriaCompressor, Bound, BicriteriaOutput};
use crate::encoders::{lookup, EncoderInfo};
use crate::error::Result;
use crate::fsg::{get_kind, instantiate, suggest_gen};
use crate::meter::Silent;
use crate::model::CostModel;
use crate::parser;
use crate::parsing::{self, unpack, write_parsing_sized};
use crate::text::Text;

/// Bytes to allocate for a buffer holding a `compressed_length`-byte
/// parsing so that both encoding and decoding stay in bounds.
pub fn safe_buffer_size(encoder_name: &str, compressed_length: usize) -> Result<usize> {
    let enc = lookup(encoder_name)?;
    Ok(enc
        .data_len(compressed_length * 8)
        .max(compressed_length + enc.extra_read()))
}

fn require_non_empty(data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(crate::error::Error::InvalidInput(
            "cannot compress an empty buffer".into(),
        ));
    }
    Ok(())
}

fn bit_optimal_parse(
    enc: &EncoderInfo,
    cm: &CostModel,
    text: &Text,
) -> Result<Vec<crate::model::Edge>> {
    let generator = suggest_gen(get_kind(cm.dst())?);
    let mut fsg = instantiate(generator, text, cm)?;
    let lit_win = enc.literal_window().min(1 << 24) as usize;
    let (sol, _) = parser::parse(fsg.as_mut(), lit_win, cm, &mut Silent);
    Ok(sol)
}

/// Compress `data` into a full file (header + body).
pub fn compress(encoder_name: &str, data: &[u8]) -> Result<Vec<u8>> {
    require_non_empty(data)?;
    let enc = lookup(encoder_name)?;
    let cm = enc.cost_model();
    let text = Text::new(data.to_vec());
    let sol = bit_optimal_parse(&enc, &cm, &text)?;
    let bits = parsing::parsing_length(&sol, &cm).ceil() as usize;
    let file = write_parsing_sized(&sol, &text, &enc, bits);
    let mut out = file.data;
    out.truncate(file.total_size);
    Ok(out)
}

/// Compress `data` into a bare body (no header).
pub fn compress_buffer(encoder_name: &str, data: &[u8]) -> Result<Vec<u8>> {
    require_non_empty(data)?;
    let enc = lookup(encoder_name)?;
    let cm = enc.cost_model();
    let text = Text::new(data.to_vec());
    let sol = bit_optimal_parse(&enc, &cm, &text)?;
    let bits = parsing::parsing_length(&sol, &cm).ceil() as usize;
    let mut body = vec![0u8; enc.data_len(bits)];
    parsing::write_body(&sol, &text, &enc, &mut body);
    Ok(body)
}

/// Decompress a full file; returns the decoded bytes.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let (_, out) = crate::decompress::decompress_file(data)?;
    Ok(out)
}

/// Decompress a bare body of known uncompressed size.
pub fn decompress_buffer(
    encoder_name: &str,
    body: &[u8],
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    let enc = lookup(encoder_name)?;
    crate::decompress::decompress_body(&enc, body, uncompressed_size)
}

/// Split a full file into (encoder name, uncompressed size, body).
pub fn extract_header(data: &[u8]) -> Result<(&str, u32, &[u8])> {
    let (name, size, off) = unpack(data)?;
    Ok((name, size, &data[off..]))
}

/// Build the header to place in front of a bare body.
pub fn create_header(encoder_name: &str, file_size: u32) -> Vec<u8> {
    let (mut data, data_len) = parsing::pack(encoder_name, file_size, 0);
    data.truncate(data_len);
    data
}

/// Rewrite a glued parsing's `nextliteral` fields from `next_literals`,
/// preserving every phrase. See [`parsing::fix_parsing`].
pub fn fix_parsing(
    encoder_name: &str,
    parsing: &[u8],
    uncomp_len: usize,
    output: &mut [u8],
    next_literals: impl Iterator<Item = u32>,
) -> Result<()> {
    let enc = lookup(encoder_name)?;
    parsing::fix_parsing(&enc, parsing, uncomp_len, output, next_literals)
}

/// Run a bicriteria compression of `data` under `bound`.
pub fn bicriteria_compress(
    encoder_name: &str,
    data: &[u8],
    time_cm: &CostModel,
    bound: &Bound,
    check: bool,
    use_meter: bool,
) -> Result<BicriteriaOutput> {
    require_non_empty(data)?;
    let enc = lookup(encoder_name)?;
    let space_cm = enc.cost_model();
    let text = Text::new(data.to_vec());
    let mut compressor =
        BicriteriaCompressor::new(text, enc, &space_cm, time_cm, use_meter);
    compressor.run(bound, check)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_buffer_size() {
        // data_len(8C) = C + 8 dominates C + extra_read (both 8).
        assert_eq!(safe_buffer_size("hybrid", 100).unwrap(), 108);
        assert!(safe_buffer_size("nope", 1).is_err());
    }

    #[test]
    fn test_compress_decompress_round_trip() {
        let data = b"the quick brown fox jumps over the lazy dog; the quick brown fox";
        let comp = compress("soda09", data).unwrap();
        let out = decompress(&comp).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_buffer_variants_and_header() {
        let data = b"abcabcabcabcabcABCabc";
        let body = compress_buffer("hybrid-8", data).unwrap();
        let out = decompress_buffer("hybrid-8", &body, data.len()).unwrap();
        assert_eq!(out, data);

        // Header + body equals a full file.
        let mut file = create_header("hybrid-8", data.len() as u32);
        file.extend_from_slice(&body);
        let (name, size, body_back) = extract_header(&file).unwrap();
        assert_eq!(name, "hybrid-8");
        assert_eq!(size as usize, data.len());
        assert_eq!(body_back, &body[..]);
        assert_eq!(decompress(&file).unwrap(), data);
    }

    #[test]
    fn test_header_only() {
        let header = create_header("nibble4", 42);
        let (name, size, body) = extract_header(&header).unwrap();
        assert_eq!(name, "nibble4");
        assert_eq!(size, 42);
        assert!(body.is_empty());
    }
}

//! Decompression: stream-decode phrases and apply overlap-safe copies.

use crate::encoders::{lookup, EncoderInfo};
use crate::error::{Error, Result};
use crate::parsing::unpack;

/// Forward copy of `len` bytes from `head - d`, correct for any
/// overlap. Writes eight bytes at a time; when `d < 8` the first
/// iterations naturally turn the source into a repeating pattern of
/// `d` bytes. The buffer must have eight bytes of slack past the copy.
#[inline]
pub fn overlap_copy(buf: &mut [u8], mut head: usize, d: usize, len: usize) {
    let mut src = head - d;
    let mut remaining = len as isize;
    while head - src < 8 {
        let chunk: [u8; 8] = buf[src..src + 8].try_into().expect("slack");
        buf[head..head + 8].copy_from_slice(&chunk);
        remaining -= (head - src) as isize;
        head += head - src;
    }
    while remaining > 0 {
        let chunk: [u8; 8] = buf[src..src + 8].try_into().expect("slack");
        buf[head..head + 8].copy_from_slice(&chunk);
        src += 8;
        head += 8;
        remaining -= 8;
    }
}

/// Decode an encoded parsing body into `uncompressed_size` bytes.
///
/// `body` must include the encoder's safety padding (see
/// `safe_buffer_size`).
pub fn decompress_body(
    enc: &EncoderInfo,
    body: &[u8],
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    // Slack at the tail keeps the eight-byte copy chunks in bounds.
    let mut out = vec![0u8; uncompressed_size + 8 + 8];
    let mut dec = enc.decoder(body);

    let corrupt = |head: usize| Error::BoundaryViolation { position: head };

    // By format convention the parsing opens with a literal run.
    let (len, mut nextliteral) = dec.decode_literal_run(&mut out);
    let mut head = len as usize;
    if head > uncompressed_size {
        return Err(corrupt(0));
    }

    while head < uncompressed_size {
        if nextliteral > 0 {
            let (d, len) = dec.decode_copy();
            let (d, len) = (d as usize, len as usize);
            if d == 0 || d > head || head + len > uncompressed_size {
                return Err(corrupt(head));
            }
            overlap_copy(&mut out, head, d, len);
            head += len;
            nextliteral -= 1;
        } else {
            let (len, next) = {
                let (before, dest) = out.split_at_mut(head);
                debug_assert_eq!(before.len(), head);
                dec.decode_literal_run(dest)
            };
            if len == 0 || head + len as usize > uncompressed_size {
                return Err(corrupt(head));
            }
            head += len as usize;
            nextliteral = next;
        }
    }

    out.truncate(uncompressed_size);
    Ok(out)
}

/// Decode a full compressed file (header plus body).
///
/// Returns the encoder name and the decoded bytes.
pub fn decompress_file(data: &[u8]) -> Result<(String, Vec<u8>)> {
    let (name, size, body_off) = unpack(data)?;
    let enc = lookup(name)?;
    let body = &data[body_off..];
    let out = decompress_body(&enc, body, size as usize)?;
    Ok((name.to_string(), out))
}

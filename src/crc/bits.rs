//! Bit/byte packing and input classification.
//!
//! Everything here is MSB-first within each byte: the first bit of a byte
//! is its most significant bit. When a bit sequence does not fill the last
//! byte, the trailing group is right-padded with zero bits.

use crate::error::{LinkError, Result};

/// Expand bytes into individual bits, MSB first.
pub fn bits_from_bytes(data: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(data.len() * 8);
    for b in data {
        for i in (0..8).rev() {
            bits.push((b >> i) & 1);
        }
    }
    bits
}

/// Pack a bit sequence into bytes, MSB first.
///
/// A partial trailing group is shifted left so the padding zeros land at
/// the end of the final byte.
pub fn bytes_from_bits(bits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len().div_ceil(8));
    for chunk in bits.chunks(8) {
        let mut v: u8 = 0;
        for bit in chunk {
            v = (v << 1) | (bit & 1);
        }
        v <<= (8 - chunk.len()) % 8;
        out.push(v);
    }
    out
}

/// Decide whether an input string is a raw bit sequence.
///
/// True iff, after removing spaces, the string is non-empty and consists
/// solely of `'0'` and `'1'`. Anything else is treated as UTF-8 text by
/// the callers.
pub fn is_bitstring(s: &str) -> bool {
    let mut seen = false;
    for c in s.chars() {
        match c {
            ' ' => continue,
            '0' | '1' => seen = true,
            _ => return false,
        }
    }
    seen
}

/// Parse a bit string such as `"1010 111"` into packed bytes.
///
/// Spaces are ignored; callers are expected to have classified the input
/// with [`is_bitstring`] first, so unknown characters are simply skipped.
pub fn parse_bitstring(s: &str) -> Vec<u8> {
    let bits: Vec<u8> = s
        .chars()
        .filter(|c| *c == '0' || *c == '1')
        .map(|c| u8::from(c == '1'))
        .collect();
    bytes_from_bits(&bits)
}

/// Expand a hex string (optional `0x` prefix, spaces ignored) into a bit
/// string, four bits per hex digit.
pub fn bits_from_hex(s: &str) -> Result<String> {
    let h = s.trim().replace(' ', "").to_lowercase();
    let h = h.strip_prefix("0x").unwrap_or(&h);
    if h.is_empty() {
        return Err(LinkError::config("empty hex input"));
    }
    let mut bits = String::with_capacity(h.len() * 4);
    for c in h.chars() {
        let v = c
            .to_digit(16)
            .ok_or_else(|| LinkError::config(format!("invalid hex digit {:?}", c)))?;
        bits.push_str(&format!("{:04b}", v));
    }
    Ok(bits)
}

/// Render bytes as a `"0101..."` string for display.
pub fn bit_string(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 8);
    for b in data {
        for i in (0..8).rev() {
            s.push(if (b >> i) & 1 == 1 { '1' } else { '0' });
        }
    }
    s
}

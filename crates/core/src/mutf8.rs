//! Modified UTF-8 as used by `CONSTANT_Utf8` entries.
//!
//! Differs from standard UTF-8 in two ways: U+0000 is written as the two-byte sequence
//! `C0 80`, and supplementary characters are written as a surrogate pair with each half
//! encoded as a three-byte sequence.

use crate::result::{Error, Result};

/// Decodes a modified UTF-8 byte string.
pub fn decode(bytes: &[u8]) -> Result<String> {
    decode_lenient(bytes)?.ok_or(Error::MalformedUtf8(bytes.len()))
}

/// Like [`decode`], but a well-formed string holding an unpaired surrogate yields `None`
/// instead of an error.
///
/// Such strings are legal in class files and show up in obfuscated string constants, but
/// have no `String` form.
pub fn decode_lenient(bytes: &[u8]) -> Result<Option<String>> {
    if bytes.iter().all(|&b| b != 0 && b < 0x80) {
        // plain ASCII covers nearly every class file string
        return Ok(Some(bytes.iter().map(|&b| b as char).collect()));
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let unit = if b & 0x80 == 0 {
            if b == 0 {
                return Err(Error::MalformedUtf8(i));
            }
            i += 1;
            b as u16
        } else if b & 0xE0 == 0xC0 {
            let b2 = continuation(bytes, i + 1)?;
            i += 2;
            (((b & 0x1F) as u16) << 6) | b2
        } else if b & 0xF0 == 0xE0 {
            let b2 = continuation(bytes, i + 1)?;
            let b3 = continuation(bytes, i + 2)?;
            i += 3;
            (((b & 0x0F) as u16) << 12) | (b2 << 6) | b3
        } else {
            return Err(Error::MalformedUtf8(i));
        };
        units.push(unit);
    }

    Ok(String::from_utf16(&units).ok())
}

fn continuation(bytes: &[u8], at: usize) -> Result<u16> {
    match bytes.get(at) {
        Some(&b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        _ => Err(Error::MalformedUtf8(at)),
    }
}

/// Encodes a string as modified UTF-8.
pub fn encode(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut buf = [0u16; 2];
    for ch in value.chars() {
        for &unit in ch.encode_utf16(&mut buf).iter() {
            match unit {
                0x0001..=0x007F => out.push(unit as u8),
                0x0000 | 0x0080..=0x07FF => {
                    out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                    out.push(0x80 | (unit & 0x3F) as u8);
                }
                _ => {
                    out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                    out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                    out.push(0x80 | (unit & 0x3F) as u8);
                }
            }
        }
    }
    out
}

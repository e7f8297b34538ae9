//! Script number encoding
//!
//! Numbers on the script stack are little-endian byte strings with the sign
//! carried in the high bit of the last byte. The canonical form is the
//! shortest one: zero is the empty string, and a trailing `0x00`/`0x80` byte
//! appears only when the magnitude's top byte already uses the high bit.
//! Comparison opcodes only accept canonical operands, so decoding here
//! refuses anything else.

use crate::error::{Result, VaultError};
use crate::types::*;

/// SerializeScriptNum: ℤ → 𝕊
///
/// Minimal signed little-endian encoding of `n`.
pub fn serialize_script_num(n: i64) -> ByteString {
    if n == 0 {
        return vec![];
    }

    let negative = n < 0;
    let mut magnitude = n.unsigned_abs();
    let mut result = Vec::with_capacity(9);
    while magnitude > 0 {
        result.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    let last = result.len() - 1;
    if result[last] & 0x80 != 0 {
        result.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        result[last] |= 0x80;
    }

    result
}

/// Encode a lock height operand.
///
/// Lock heights are strictly positive; zero and negative values are refused.
pub fn encode(n: i64) -> Result<ByteString> {
    if n <= 0 {
        return Err(VaultError::InvalidParameter(format!(
            "script number {} is not a positive lock height",
            n
        )));
    }
    Ok(serialize_script_num(n))
}

/// Reject encodings carrying a redundant most-significant byte.
///
/// The last byte may only be `0x00` or `0x80` when the byte before it has its
/// high bit set, otherwise the sign could have lived in the shorter form.
pub fn check_minimal_encoding(bytes: &[u8]) -> Result<()> {
    if let Some(&last) = bytes.last() {
        if last & 0x7f == 0 && (bytes.len() == 1 || bytes[bytes.len() - 2] & 0x80 == 0) {
            return Err(VaultError::Encoding(format!(
                "non-minimally encoded script number {}",
                hex::encode(bytes)
            )));
        }
    }
    Ok(())
}

/// DecodeScriptNum: 𝕊 × ℕ → ℤ
///
/// Parses a canonical operand of at most `max_len` bytes.
pub fn decode(bytes: &[u8], max_len: usize) -> Result<i64> {
    if bytes.len() > max_len {
        return Err(VaultError::Encoding(format!(
            "script number is {} bytes, limit is {}",
            bytes.len(),
            max_len
        )));
    }
    if bytes.len() > 8 {
        return Err(VaultError::Encoding(format!(
            "script number of {} bytes does not fit in 64 bits",
            bytes.len()
        )));
    }
    check_minimal_encoding(bytes)?;

    if bytes.is_empty() {
        return Ok(0);
    }

    let mut magnitude: u64 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        magnitude |= (b as u64) << (8 * i);
    }

    let sign_bit = 0x80u64 << (8 * (bytes.len() - 1));
    if magnitude & sign_bit != 0 {
        let abs = magnitude & !sign_bit;
        Ok(-(abs as i64))
    } else {
        i64::try_from(magnitude).map_err(|_| {
            VaultError::Encoding("script number exceeds the 64-bit range".to_string())
        })
    }
}

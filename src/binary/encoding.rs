// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Binary encoding primitives: varints, length-prefixed bytes, front coding.
//!
//! Everything in a `.pst` file is built from these. Integers that are usually
//! small (doc deltas, freqs, position deltas) are LEB128 varints. Sorted terms
//! are front coded against their predecessor inside a block.
//!
//! # References
//!
//! - **Varint (LEB128)**: DWARF4 §7.6 "Variable Length Data"; Protocol Buffers
//!   encoding: <https://protobuf.dev/programming-guides/encoding/>
//! - **Front coding**: Witten, Moffat, Bell (1999), "Managing Gigabytes", §3.3.

use std::io;

use super::header::{MAX_TERM_LEN, MAX_VARINT_BYTES};

// ============================================================================
// VARINT ENCODING
// ============================================================================

/// Encode a varint to bytes
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// Decode a varint from bytes, returning (value, bytes_consumed).
///
/// Fails on an empty buffer, a buffer that ends mid-varint, and varints
/// longer than `MAX_VARINT_BYTES`.
pub fn decode_varint(bytes: &[u8]) -> io::Result<(u64, usize)> {
    if bytes.is_empty() {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Empty buffer for varint"));
    }

    let mut result: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in bytes.iter().take(MAX_VARINT_BYTES).enumerate() {
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
    }

    if bytes.len() >= MAX_VARINT_BYTES {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Varint exceeds maximum length (possible corruption)",
        ))
    } else {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Incomplete varint"))
    }
}

/// Optional count stored as `value + 1`, zero meaning absent.
pub fn encode_optional(value: Option<u64>, buf: &mut Vec<u8>) {
    encode_varint(value.map_or(0, |v| v + 1), buf);
}

/// `[len: varint][bytes]`
pub fn encode_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    encode_varint(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

// ============================================================================
// FRONT CODING
// ============================================================================

/// Calculate the common prefix length between two byte slices.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Append `term` front coded against `prev`.
///
/// Format: `[shared_prefix_len: varint][suffix_len: varint][suffix]`
///
/// - "hello" after ""      -> [0][5]["hello"]
/// - "help"  after "hello" -> [3][1]["p"]
pub fn encode_front_coded(prev: &[u8], term: &[u8], out: &mut Vec<u8>) {
    let shared = common_prefix_len(prev, term);
    let suffix = &term[shared..];
    encode_varint(shared as u64, out);
    encode_bytes(suffix, out);
}

// ============================================================================
// BYTE READER
// ============================================================================

/// Bounds-checked cursor over a byte slice.
///
/// Every read either succeeds or returns an `io::Error` naming what was
/// being read, never panics on malformed input.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn read_varint(&mut self, what: &str) -> io::Result<u64> {
        let rest = self.bytes.get(self.pos..).unwrap_or_default();
        let (value, consumed) = decode_varint(rest)
            .map_err(|e| io::Error::new(e.kind(), format!("Truncated {}: {}", what, e)))?;
        self.pos += consumed;
        Ok(value)
    }

    /// Varint that must fit in a `u32`.
    pub fn read_u32_varint(&mut self, what: &str) -> io::Result<u32> {
        let value = self.read_varint(what)?;
        u32::try_from(value).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, format!("{} {} exceeds u32", what, value))
        })
    }

    /// Inverse of [`encode_optional`].
    pub fn read_optional(&mut self, what: &str) -> io::Result<Option<u64>> {
        Ok(self.read_varint(what)?.checked_sub(1))
    }

    pub fn read_u8(&mut self, what: &str) -> io::Result<u8> {
        let byte = *self.bytes.get(self.pos).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, format!("Truncated {}", what))
        })?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_slice(&mut self, len: usize, what: &str) -> io::Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("{} length {} causes overflow", what, len))
        })?;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Truncated {} (expected {} bytes)", what, len),
            )
        })?;
        self.pos = end;
        Ok(slice)
    }

    /// Inverse of [`encode_bytes`].
    pub fn read_bytes(&mut self, what: &str) -> io::Result<&'a [u8]> {
        let len = self.read_varint(what)? as usize;
        self.read_slice(len, what)
    }

    pub fn skip(&mut self, len: usize, what: &str) -> io::Result<()> {
        self.read_slice(len, what).map(|_| ())
    }

    /// Inverse of [`encode_front_coded`]: rebuild the term into `term`, which
    /// holds the previous term on entry.
    pub fn read_front_coded(&mut self, term: &mut Vec<u8>) -> io::Result<()> {
        let shared = self.read_varint("term prefix length")? as usize;
        if shared > term.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid shared prefix length {} (prev term len {})", shared, term.len()),
            ));
        }
        let suffix = self.read_bytes("term suffix")?;
        if shared + suffix.len() > MAX_TERM_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Term of {} bytes exceeds max {}", shared + suffix.len(), MAX_TERM_LEN),
            ));
        }
        term.truncate(shared);
        term.extend_from_slice(suffix);
        Ok(())
    }
}

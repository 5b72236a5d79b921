// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Segment header and footer.
//!
//! The header is 28 bytes of fixed-size fields, parsed before anything else.
//! It carries every section length, so [`SectionOffsets`] can compute where
//! each section lives without scanning.
//!
//! The footer is 8 bytes: a CRC32 over everything before it, plus the header
//! magic reversed. A bad footer means the file was truncated or corrupted and
//! nothing in it is trusted.
//!
//! `SectionOffsets` is the single source of truth for the file layout. The
//! writer and the reader both go through it.

use std::io::{self, Read, Write};

use crc32fast::Hasher as Crc32Hasher;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Magic bytes: "SPST" in ASCII (header)
pub const MAGIC: [u8; 4] = [0x53, 0x50, 0x53, 0x54];

/// Footer magic: "TSPS" (reversed, marks valid file end)
pub const FOOTER_MAGIC: [u8; 4] = [0x54, 0x53, 0x50, 0x53];

pub const VERSION: u8 = 1;

/// Terms per front-coded dictionary block
pub const TERM_BLOCK_SIZE: usize = 32;

/// Minimum docs in a posting list before it gets skip data
pub const SKIP_LIST_THRESHOLD: u32 = 128;

/// Docs between two skip entries
pub const SKIP_INTERVAL: u32 = 32;

// ============================================================================
// SECURITY LIMITS (prevent resource exhaustion from malformed input)
// ============================================================================

/// Maximum file size: 1 GiB
pub const MAX_FILE_SIZE: usize = 1 << 30;

pub const MAX_FIELD_COUNT: u32 = 4096;

/// Maximum term length in bytes
pub const MAX_TERM_LEN: usize = 32 * 1024;

/// Maximum posting list size per term
pub const MAX_POSTING_SIZE: u32 = 10_000_000;

/// Maximum varint bytes (u64 needs at most 10 bytes)
pub const MAX_VARINT_BYTES: usize = 10;

// ============================================================================
// FLAGS
// ============================================================================

/// Segment-wide feature bits, the union over all fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatFlags(pub(crate) u8);

impl FormatFlags {
    pub const HAS_SKIP_LISTS: u8 = 0b0000_0001;
    pub const HAS_POSITIONS: u8 = 0b0000_0010;
    pub const HAS_PAYLOADS: u8 = 0b0000_0100;
    pub const HAS_OFFSETS: u8 = 0b0000_1000;

    const KNOWN: u8 = Self::HAS_SKIP_LISTS | Self::HAS_POSITIONS | Self::HAS_PAYLOADS | Self::HAS_OFFSETS;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn with(mut self, bit: u8, on: bool) -> Self {
        if on {
            self.0 |= bit;
        }
        self
    }

    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn has_skip_lists(self) -> bool {
        self.contains(Self::HAS_SKIP_LISTS)
    }
}

// ============================================================================
// HEADER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    pub version: u8,
    pub flags: FormatFlags,
    pub max_doc: u32,
    pub field_count: u32,
    pub fields_len: u32,
    pub dictionary_len: u32,
    pub postings_len: u32,
}

impl SegmentHeader {
    // 4 (magic) + 1 (version) + 1 (flags) + 2 (reserved) + 5*4 (u32s) = 28
    pub const SIZE: usize = 28;

    pub fn section_offsets(&self) -> SectionOffsets {
        SectionOffsets::from_header(self)
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&MAGIC)?;
        w.write_all(&[self.version, self.flags.0])?;
        w.write_all(&[0u8; 2])?; // reserved
        w.write_all(&self.max_doc.to_le_bytes())?;
        w.write_all(&self.field_count.to_le_bytes())?;
        w.write_all(&self.fields_len.to_le_bytes())?;
        w.write_all(&self.dictionary_len.to_le_bytes())?;
        w.write_all(&self.postings_len.to_le_bytes())?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid magic: expected SPST, got {:?}", magic),
            ));
        }

        let mut buf = [0u8; Self::SIZE - 4];
        r.read_exact(&mut buf)?;
        let u32_at = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);

        let header = Self {
            version: buf[0],
            flags: FormatFlags(buf[1]),
            // buf[2..4] is reserved
            max_doc: u32_at(4),
            field_count: u32_at(8),
            fields_len: u32_at(12),
            dictionary_len: u32_at(16),
            postings_len: u32_at(20),
        };

        if header.version != VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported version: {} (expected {})", header.version, VERSION),
            ));
        }
        if header.flags.0 & !FormatFlags::KNOWN != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown format flags {:#010b}", header.flags.0),
            ));
        }
        if header.field_count > MAX_FIELD_COUNT {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Too many fields: {} (max {})", header.field_count, MAX_FIELD_COUNT),
            ));
        }
        Ok(header)
    }
}

// ============================================================================
// SECTION OFFSETS
// ============================================================================

/// Byte ranges of every section, `(start, end)`.
///
/// Layout:
/// 1. HEADER      [28B]
/// 2. FIELDS      [fields_len]      - per-field metadata and block index
/// 3. DICTIONARY  [dictionary_len]  - front-coded term blocks
/// 4. POSTINGS    [postings_len]    - per-term skip data and postings
/// 5. FOOTER      [8B]              - CRC32 validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOffsets {
    pub fields: (usize, usize),
    pub dictionary: (usize, usize),
    pub postings: (usize, usize),
    pub footer: (usize, usize),
}

impl SectionOffsets {
    pub fn from_header(h: &SegmentHeader) -> Self {
        let mut pos = SegmentHeader::SIZE;

        let fields_start = pos;
        pos += h.fields_len as usize;
        let fields_end = pos;

        let dictionary_start = pos;
        pos += h.dictionary_len as usize;
        let dictionary_end = pos;

        let postings_start = pos;
        pos += h.postings_len as usize;
        let postings_end = pos;

        Self {
            fields: (fields_start, fields_end),
            dictionary: (dictionary_start, dictionary_end),
            postings: (postings_start, postings_end),
            footer: (pos, pos + SegmentFooter::SIZE),
        }
    }

    /// Expected content size (everything before footer)
    pub fn content_size(&self) -> usize {
        self.footer.0
    }

    /// Total file size including footer
    pub fn total_size(&self) -> usize {
        self.footer.1
    }

    #[inline]
    pub fn slice<'a>(&self, bytes: &'a [u8], section: (usize, usize)) -> Option<&'a [u8]> {
        bytes.get(section.0..section.1)
    }
}

// ============================================================================
// FOOTER (8 bytes)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentFooter {
    /// CRC32 of header + all sections (everything before the footer)
    pub crc32: u32,
}

impl SegmentFooter {
    pub const SIZE: usize = 8; // 4 bytes CRC32 + 4 bytes magic

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.crc32.to_le_bytes())?;
        w.write_all(&FOOTER_MAGIC)?;
        Ok(())
    }

    pub fn read(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "File too short for footer"));
        }

        let footer_start = bytes.len() - Self::SIZE;
        let magic = &bytes[footer_start + 4..];
        if magic != FOOTER_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid footer magic: expected TSPS, got {:?}", magic),
            ));
        }

        let crc32 = u32::from_le_bytes([
            bytes[footer_start],
            bytes[footer_start + 1],
            bytes[footer_start + 2],
            bytes[footer_start + 3],
        ]);
        Ok(Self { crc32 })
    }

    pub fn compute_crc32(data: &[u8]) -> u32 {
        let mut hasher = Crc32Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The block postings format: one `.pst` file per segment.
//!
//! The layout is designed to be opened with a single read and a single
//! checksum pass, then decoded lazily. Term dictionaries are front coded in
//! blocks of 32 terms so a seek decodes one block, not the whole field.
//! Long posting lists carry skip data so `advance` does not walk every doc.
//!
//! # Security Considerations
//!
//! A segment is parsed as untrusted input:
//! - All size fields are validated against the MAX_* constants
//! - Every read is bounds checked and returns an error instead of panicking
//! - The CRC32 footer detects corruption and truncation
//! - The varint decoder stops after `MAX_VARINT_BYTES`
//!
//! # Format Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ HEADER (28 bytes)                                          │
//! │   magic: [u8; 4] = "SPST"                                  │
//! │   version: u8 = 1                                          │
//! │   flags: u8                                                │
//! │   reserved: [u8; 2]                                        │
//! │   max_doc: u32, field_count: u32                           │
//! │   fields_len: u32, dictionary_len: u32, postings_len: u32  │
//! ├────────────────────────────────────────────────────────────┤
//! │ FIELDS (name order)                                        │
//! │   name, number, options, payload flag, term count, stats   │
//! │   block index: [first_term, offset, len] per block         │
//! ├────────────────────────────────────────────────────────────┤
//! │ DICTIONARY                                                 │
//! │   per block: count, then per term                          │
//! │   [front-coded term][doc_freq][ttf+1][offset][len]         │
//! ├────────────────────────────────────────────────────────────┤
//! │ POSTINGS                                                   │
//! │   per term: doc count, skip list, then per doc             │
//! │   [doc delta][freq]([pos delta][payload][offsets])*        │
//! ├────────────────────────────────────────────────────────────┤
//! │ FOOTER (8 bytes)                                           │
//! │   crc32: u32, magic: "TSPS"                                │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod encoding;
pub mod header;
pub mod postings;
mod reader;
mod writer;

use std::fs;

pub use header::{FormatFlags, SegmentFooter, SegmentHeader, SectionOffsets};
pub use postings::BlockPostingsEnum;
pub use reader::{open_segment, BlockFields, BlockTermState, BlockTerms, BlockTermsEnum, TermMeta};
pub use writer::{BlockFieldsConsumer, POSTINGS_EXTENSION};

use crate::error::{corrupt, Result};
use crate::postings::{FormatCapabilities, PostingsFormat, SegmentInfo};
use crate::types::{FieldInfos, IndexOptions};

/// Reference on-disk postings format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPostingsFormat {
    store_offsets: bool,
    max_term_postings: u32,
}

impl Default for BlockPostingsFormat {
    fn default() -> Self {
        Self {
            store_offsets: true,
            max_term_postings: header::MAX_POSTING_SIZE,
        }
    }
}

impl BlockPostingsFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the format at positions, like formats that never stored offsets.
    pub fn without_offsets(mut self) -> Self {
        self.store_offsets = false;
        self
    }

    /// Refuse terms with more than `limit` docs.
    pub fn with_max_term_postings(mut self, limit: u32) -> Self {
        self.max_term_postings = limit.min(header::MAX_POSTING_SIZE);
        self
    }
}

impl PostingsFormat for BlockPostingsFormat {
    type Consumer = BlockFieldsConsumer;
    type Producer = BlockFields;

    fn name(&self) -> &str {
        if self.store_offsets {
            "Block"
        } else {
            "BlockNoOffsets"
        }
    }

    fn capabilities(&self) -> FormatCapabilities {
        FormatCapabilities {
            max_index_options: if self.store_offsets {
                IndexOptions::DocsAndFreqsAndPositionsAndOffsets
            } else {
                IndexOptions::DocsAndFreqsAndPositions
            },
            supports_payloads: true,
            accepts_large_values: self.max_term_postings >= 100_000,
        }
    }

    fn fields_consumer(&self, segment: &SegmentInfo, _field_infos: &FieldInfos) -> Result<BlockFieldsConsumer> {
        Ok(BlockFieldsConsumer::new(
            segment,
            self.name(),
            self.capabilities(),
            self.max_term_postings,
        ))
    }

    fn fields_producer(&self, segment: &SegmentInfo, field_infos: &FieldInfos) -> Result<BlockFields> {
        let path = segment.file_path(POSTINGS_EXTENSION);
        let fields = open_segment(fs::read(&path)?)?;
        if fields.max_doc() != segment.max_doc {
            return Err(corrupt(format!(
                "{} has max_doc {}, segment says {}",
                path.display(),
                fields.max_doc(),
                segment.max_doc
            )));
        }
        for info in field_infos.iter() {
            let Some(stored) = fields.field_info(&info.name) else {
                continue;
            };
            if stored.index_options != info.index_options || stored.has_payloads != info.has_payloads {
                return Err(corrupt(format!(
                    "Field {} stored as {} (payloads {}), schema says {} (payloads {})",
                    info.name, stored.index_options, stored.has_payloads, info.index_options, info.has_payloads
                )));
            }
        }
        Ok(fields)
    }
}

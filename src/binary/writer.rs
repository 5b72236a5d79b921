// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Streaming writer for a `.pst` segment.
//!
//! Postings go straight into the postings section as each term finishes.
//! Term metadata is held per field until `finish_field`, then packed into
//! front-coded blocks of `TERM_BLOCK_SIZE` terms. Nothing touches disk until
//! `close`, which writes header, sections and footer in one pass.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use super::encoding::{encode_bytes, encode_front_coded, encode_optional, encode_varint};
use super::header::{FormatFlags, SegmentFooter, SegmentHeader, MAX_FIELD_COUNT, MAX_TERM_LEN, TERM_BLOCK_SIZE, VERSION};
use super::postings::PostingsEncoder;
use super::reader::TermMeta;
use crate::error::{ConformanceError, Result};
use crate::postings::{FieldsConsumer, FormatCapabilities, SegmentInfo};
use crate::types::{term_display, DocId, FieldInfo, FieldStats, TermStats};

/// Extension of the segment's postings file.
pub const POSTINGS_EXTENSION: &str = "pst";

fn invalid_input(msg: impl Into<String>) -> ConformanceError {
    io::Error::new(io::ErrorKind::InvalidInput, msg.into()).into()
}

fn section_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| invalid_input(format!("{} section of {} bytes exceeds u32", what, len)))
}

#[derive(Debug)]
struct OpenField {
    info: FieldInfo,
    encoder: PostingsEncoder,
    terms: Vec<(Vec<u8>, TermMeta)>,
}

/// Writes one segment through the streaming [`FieldsConsumer`] protocol.
#[derive(Debug)]
pub struct BlockFieldsConsumer {
    path: PathBuf,
    format: String,
    capabilities: FormatCapabilities,
    max_term_postings: u32,
    max_doc: u32,
    flags: FormatFlags,
    field_count: u32,
    field_table: Vec<u8>,
    dictionary: Vec<u8>,
    postings: Vec<u8>,
    field: Option<OpenField>,
}

impl BlockFieldsConsumer {
    pub fn new(
        segment: &SegmentInfo,
        format: impl Into<String>,
        capabilities: FormatCapabilities,
        max_term_postings: u32,
    ) -> Self {
        Self {
            path: segment.file_path(POSTINGS_EXTENSION),
            format: format.into(),
            capabilities,
            max_term_postings,
            max_doc: segment.max_doc,
            flags: FormatFlags::new(),
            field_count: 0,
            field_table: Vec::new(),
            dictionary: Vec::new(),
            postings: Vec::new(),
            field: None,
        }
    }

    fn open_field(&mut self, call: &'static str) -> Result<&mut OpenField> {
        self.field
            .as_mut()
            .ok_or_else(|| ConformanceError::violation(call, "NO_FIELD", "no field is open"))
    }

    fn write_block(&mut self, terms: &[(Vec<u8>, TermMeta)]) {
        encode_varint(terms.len() as u64, &mut self.dictionary);
        let mut prev: &[u8] = &[];
        for (term, meta) in terms {
            encode_front_coded(prev, term, &mut self.dictionary);
            encode_varint(u64::from(meta.doc_freq), &mut self.dictionary);
            encode_optional(meta.total_term_freq, &mut self.dictionary);
            encode_varint(meta.postings_offset, &mut self.dictionary);
            encode_varint(meta.postings_len, &mut self.dictionary);
            prev = term;
        }
    }
}

impl FieldsConsumer for BlockFieldsConsumer {
    fn start_field(&mut self, field: &FieldInfo) -> Result<()> {
        if self.field.is_some() {
            return Err(ConformanceError::violation("start_field", "IN_FIELD", "previous field not finished"));
        }
        let payloads_unsupported = field.has_payloads && !self.capabilities.supports_payloads;
        if field.index_options > self.capabilities.max_index_options || payloads_unsupported {
            return Err(ConformanceError::UnsupportedOption {
                format: self.format.clone(),
                requested: field.index_options,
            });
        }
        if self.field_count >= MAX_FIELD_COUNT {
            return Err(invalid_input(format!("More than {} fields", MAX_FIELD_COUNT)));
        }

        let options = field.index_options;
        self.flags = self
            .flags
            .with(FormatFlags::HAS_POSITIONS, options.has_positions())
            .with(FormatFlags::HAS_OFFSETS, options.has_offsets())
            .with(FormatFlags::HAS_PAYLOADS, field.has_payloads && options.has_positions());
        self.field = Some(OpenField {
            info: field.clone(),
            encoder: PostingsEncoder::new(options, field.has_payloads),
            terms: Vec::new(),
        });
        Ok(())
    }

    fn start_term(&mut self, text: &[u8]) -> Result<()> {
        if text.len() > MAX_TERM_LEN {
            return Err(invalid_input(format!("Term of {} bytes exceeds max {}", text.len(), MAX_TERM_LEN)));
        }
        let field = self.open_field("start_term")?;
        if field.terms.last().is_some_and(|(prev, _)| prev.as_slice() >= text) {
            return Err(invalid_input(format!("Term {} out of order", term_display(text))));
        }
        field.encoder.reset();
        Ok(())
    }

    fn start_doc(&mut self, doc: DocId, freq: Option<u32>) -> Result<()> {
        let max_doc = self.max_doc;
        if doc < 0 || doc as u32 >= max_doc {
            return Err(invalid_input(format!("Doc {} outside [0, {})", doc, max_doc)));
        }
        self.open_field("start_doc")?.encoder.start_doc(doc, freq)?;
        Ok(())
    }

    fn add_position(&mut self, position: i32, payload: Option<&[u8]>, start_offset: i32, end_offset: i32) -> Result<()> {
        self.open_field("add_position")?
            .encoder
            .add_position(position, payload, start_offset, end_offset)?;
        Ok(())
    }

    fn finish_doc(&mut self) -> Result<()> {
        self.open_field("finish_doc")?.encoder.finish_doc();
        Ok(())
    }

    fn finish_term(&mut self, text: &[u8], stats: TermStats) -> Result<()> {
        let max_term_postings = self.max_term_postings;
        let field = self
            .field
            .as_mut()
            .ok_or_else(|| ConformanceError::violation("finish_term", "NO_FIELD", "no field is open"))?;

        let doc_freq = field.encoder.doc_count();
        if doc_freq == 0 || doc_freq != stats.doc_freq {
            return Err(invalid_input(format!(
                "Term {} streamed {} docs, stats say {}",
                term_display(text),
                doc_freq,
                stats.doc_freq
            )));
        }
        if doc_freq > max_term_postings {
            return Err(invalid_input(format!(
                "Term {} has {} docs, format limit is {}",
                term_display(text),
                doc_freq,
                max_term_postings
            )));
        }

        let postings_offset = self.postings.len() as u64;
        let postings_len = field.encoder.finish(&mut self.postings) as u64;
        if field.encoder.has_skips() {
            self.flags = self.flags.with(FormatFlags::HAS_SKIP_LISTS, true);
        }
        let total_term_freq = if field.info.index_options.has_freqs() {
            stats.total_term_freq
        } else {
            None
        };
        field.terms.push((
            text.to_vec(),
            TermMeta {
                doc_freq,
                total_term_freq,
                postings_offset,
                postings_len,
            },
        ));
        Ok(())
    }

    fn finish_field(&mut self, stats: FieldStats) -> Result<()> {
        let field = self
            .field
            .take()
            .ok_or_else(|| ConformanceError::violation("finish_field", "NO_FIELD", "no field is open"))?;

        let mut block_index = Vec::new();
        for chunk in field.terms.chunks(TERM_BLOCK_SIZE) {
            let offset = self.dictionary.len();
            self.write_block(chunk);
            block_index.push((chunk[0].0.as_slice(), offset, self.dictionary.len() - offset));
        }

        let info = &field.info;
        let table = &mut self.field_table;
        encode_bytes(info.name.as_bytes(), table);
        encode_varint(u64::from(info.number), table);
        table.push(info.index_options.ordinal() as u8);
        table.push(u8::from(info.has_payloads));
        encode_varint(field.terms.len() as u64, table);
        let sum_total_term_freq = if info.index_options.has_freqs() {
            stats.sum_total_term_freq
        } else {
            None
        };
        encode_optional(sum_total_term_freq, table);
        encode_varint(stats.sum_doc_freq, table);
        encode_varint(u64::from(stats.doc_count), table);
        encode_varint(block_index.len() as u64, table);
        for (first_term, offset, len) in block_index {
            encode_bytes(first_term, table);
            encode_varint(offset as u64, table);
            encode_varint(len as u64, table);
        }

        tracing::trace!(field = %info.name, terms = field.terms.len(), "finished field");
        self.field_count += 1;
        Ok(())
    }

    fn close(self) -> Result<()> {
        if let Some(field) = &self.field {
            return Err(ConformanceError::violation(
                "close",
                "IN_FIELD",
                format!("field {} not finished", field.info.name),
            ));
        }

        let header = SegmentHeader {
            version: VERSION,
            flags: self.flags,
            max_doc: self.max_doc,
            field_count: self.field_count,
            fields_len: section_len(self.field_table.len(), "Fields")?,
            dictionary_len: section_len(self.dictionary.len(), "Dictionary")?,
            postings_len: section_len(self.postings.len(), "Postings")?,
        };

        let offsets = header.section_offsets();
        let mut content = Vec::with_capacity(offsets.total_size());
        header.write(&mut content)?;
        content.extend_from_slice(&self.field_table);
        content.extend_from_slice(&self.dictionary);
        content.extend_from_slice(&self.postings);
        let footer = SegmentFooter {
            crc32: SegmentFooter::compute_crc32(&content),
        };

        let mut w = BufWriter::new(File::create(&self.path)?);
        w.write_all(&content)?;
        footer.write(&mut w)?;
        w.flush()?;

        tracing::debug!(
            path = %self.path.display(),
            fields = self.field_count,
            bytes = offsets.total_size(),
            "wrote block postings segment"
        );
        Ok(())
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Read side of a `.pst` segment.
//!
//! Opening a segment validates the footer checksum and decodes the header
//! and field table eagerly. Term blocks are decoded on first touch and cached
//! behind a `RwLock`, so every clone of [`BlockFields`] (one per worker
//! thread) shares one decoded dictionary.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use parking_lot::RwLock;

use super::encoding::ByteReader;
use super::header::{SectionOffsets, SegmentFooter, SegmentHeader, MAX_FILE_SIZE, TERM_BLOCK_SIZE};
use super::postings::{BlockPostingsEnum, PostingsLayout};
use crate::error::{corrupt, ConformanceError, Result};
use crate::postings::{Fields, Terms, TermsEnum};
use crate::types::{
    term_display, DocsFlags, FieldInfo, FieldStats, IndexOptions, PositionsFlags, SeekStatus,
};
use crate::util::LiveDocs;

// ============================================================================
// DECODED STRUCTURES
// ============================================================================

/// Dictionary entry of one term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermMeta {
    pub doc_freq: u32,
    pub total_term_freq: Option<u64>,
    /// Relative to the start of the postings section.
    pub postings_offset: u64,
    pub postings_len: u64,
}

#[derive(Debug)]
struct TermBlock {
    terms: Vec<Vec<u8>>,
    metas: Vec<TermMeta>,
}

#[derive(Debug)]
struct BlockRef {
    first_term: Vec<u8>,
    /// Absolute byte range in the file.
    start: usize,
    end: usize,
    first_ord: u64,
}

#[derive(Debug)]
struct FieldData {
    info: FieldInfo,
    term_count: u64,
    stats: FieldStats,
    blocks: Vec<BlockRef>,
    cache: Vec<RwLock<Option<Arc<TermBlock>>>>,
}

#[derive(Debug)]
struct SegmentData {
    bytes: Arc<[u8]>,
    header: SegmentHeader,
    offsets: SectionOffsets,
    fields: BTreeMap<String, Arc<FieldData>>,
}

impl SegmentData {
    /// Decoded block `idx` of `field`, from the cache when possible.
    fn block(&self, field: &FieldData, idx: usize) -> Result<Arc<TermBlock>> {
        let slot = field
            .cache
            .get(idx)
            .ok_or_else(|| corrupt(format!("Block {} out of range for field {}", idx, field.info.name)))?;
        if let Some(block) = slot.read().as_ref() {
            return Ok(Arc::clone(block));
        }

        let block = Arc::new(self.decode_block(field, idx)?);
        let mut guard = slot.write();
        // Another reader may have won the race; keep its copy.
        let cached = guard.get_or_insert_with(|| Arc::clone(&block));
        tracing::trace!(field = %field.info.name, block = idx, terms = cached.terms.len(), "decoded term block");
        Ok(Arc::clone(cached))
    }

    fn decode_block(&self, field: &FieldData, idx: usize) -> io::Result<TermBlock> {
        let block_ref = &field.blocks[idx];
        let expected = (field.term_count - block_ref.first_ord).min(TERM_BLOCK_SIZE as u64) as usize;
        let mut r = ByteReader::at(&self.bytes[..block_ref.end], block_ref.start);

        let count = r.read_varint("block term count")? as usize;
        if count != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Block {} of {} holds {} terms, expected {}", idx, field.info.name, count, expected),
            ));
        }

        let has_freqs = field.info.index_options.has_freqs();
        let (postings_start, postings_end) = self.offsets.postings;
        let postings_size = (postings_end - postings_start) as u64;
        let mut terms: Vec<Vec<u8>> = Vec::with_capacity(count);
        let mut metas = Vec::with_capacity(count);
        let mut term = Vec::new();
        for i in 0..count {
            r.read_front_coded(&mut term)?;
            if terms.last().is_some_and(|prev| prev.as_slice() >= term.as_slice()) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Terms out of order at {} in block {}", term_display(&term), idx),
                ));
            }
            if i == 0 && term != block_ref.first_term {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Block {} starts at {}, index says {}", idx, term_display(&term), term_display(&block_ref.first_term)),
                ));
            }
            let meta = TermMeta {
                doc_freq: r.read_u32_varint("doc freq")?,
                total_term_freq: r.read_optional("total term freq")?,
                postings_offset: r.read_varint("postings offset")?,
                postings_len: r.read_varint("postings length")?,
            };
            let valid = meta.doc_freq > 0
                && meta.doc_freq <= self.header.max_doc
                && meta.total_term_freq.is_some() == has_freqs
                && meta.total_term_freq.map_or(true, |ttf| ttf >= u64::from(meta.doc_freq))
                && meta
                    .postings_offset
                    .checked_add(meta.postings_len)
                    .is_some_and(|end| end <= postings_size);
            if !valid {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid metadata for term {}: {:?}", term_display(&term), meta),
                ));
            }
            terms.push(term.clone());
            metas.push(meta);
        }
        if r.position() != block_ref.end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Trailing bytes in block {} of {}", idx, field.info.name),
            ));
        }
        Ok(TermBlock { terms, metas })
    }
}

// ============================================================================
// OPENING
// ============================================================================

/// Parse and validate a whole segment file.
pub fn open_segment(bytes: Vec<u8>) -> Result<BlockFields> {
    if bytes.len() > MAX_FILE_SIZE {
        return Err(corrupt(format!("File too large: {} bytes (max {})", bytes.len(), MAX_FILE_SIZE)));
    }
    if bytes.len() < SegmentHeader::SIZE + SegmentFooter::SIZE {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "File too short for header and footer").into());
    }
    let header = SegmentHeader::read(&mut &bytes[..])?;
    let offsets = header.section_offsets();
    if offsets.total_size() != bytes.len() {
        return Err(corrupt(format!(
            "Sections cover {} bytes, file has {}",
            offsets.total_size(),
            bytes.len()
        )));
    }
    let footer = SegmentFooter::read(&bytes)?;
    let actual = SegmentFooter::compute_crc32(&bytes[..offsets.content_size()]);
    if actual != footer.crc32 {
        return Err(corrupt(format!(
            "CRC32 mismatch: footer {:#010x}, content {:#010x}",
            footer.crc32, actual
        )));
    }

    let fields = decode_field_table(&bytes, &header, &offsets)?;
    let flags = header.flags;
    tracing::debug!(
        max_doc = header.max_doc,
        fields = fields.len(),
        bytes = bytes.len(),
        skips = flags.has_skip_lists(),
        "opened block postings segment"
    );
    Ok(BlockFields {
        segment: Arc::new(SegmentData {
            bytes: Arc::from(bytes),
            header,
            offsets,
            fields,
        }),
    })
}

fn decode_field_table(
    bytes: &[u8],
    header: &SegmentHeader,
    offsets: &SectionOffsets,
) -> io::Result<BTreeMap<String, Arc<FieldData>>> {
    let (start, end) = offsets.fields;
    let (dict_start, dict_end) = offsets.dictionary;
    let mut r = ByteReader::at(&bytes[..end], start);
    let mut fields = BTreeMap::new();
    let mut last_name: Option<String> = None;

    for _ in 0..header.field_count {
        let name = String::from_utf8(r.read_bytes("field name")?.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8 in field name: {}", e)))?;
        if last_name.as_deref().is_some_and(|last| last >= name.as_str()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Fields out of order at {}", name),
            ));
        }
        let number = r.read_u32_varint("field number")?;
        let options = IndexOptions::from_ordinal(r.read_u8("index options")? as usize)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("Bad index options for {}", name)))?;
        let has_payloads = r.read_u8("payload flag")? != 0;
        let term_count = r.read_varint("term count")?;
        let stats = FieldStats {
            sum_total_term_freq: r.read_optional("sum total term freq")?,
            sum_doc_freq: r.read_varint("sum doc freq")?,
            doc_count: r.read_u32_varint("doc count")?,
        };
        if stats.doc_count > header.max_doc || stats.sum_total_term_freq.is_some() != options.has_freqs() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid stats for field {}: {:?}", name, stats),
            ));
        }

        let block_count = r.read_varint("block count")?;
        if block_count != term_count.div_ceil(TERM_BLOCK_SIZE as u64) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Field {} has {} terms in {} blocks", name, term_count, block_count),
            ));
        }
        // Each block ref takes at least 3 bytes.
        if block_count > r.remaining() as u64 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Truncated block index"));
        }
        let mut blocks = Vec::with_capacity(block_count as usize);
        for i in 0..block_count {
            let first_term = r.read_bytes("block first term")?.to_vec();
            let offset = r.read_varint("block offset")? as usize;
            let len = r.read_varint("block length")? as usize;
            let block_start = dict_start.checked_add(offset);
            let block_end = block_start.and_then(|s| s.checked_add(len));
            let (Some(block_start), Some(block_end)) = (block_start, block_end) else {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "Block range overflows"));
            };
            if block_end > dict_end {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Block {} of {} ends past the dictionary", i, name),
                ));
            }
            blocks.push(BlockRef {
                first_term,
                start: block_start,
                end: block_end,
                first_ord: i * TERM_BLOCK_SIZE as u64,
            });
        }

        let cache = blocks.iter().map(|_| RwLock::new(None)).collect();
        let info = FieldInfo::new(name.clone(), number, options).with_payloads(has_payloads);
        fields.insert(
            name.clone(),
            Arc::new(FieldData {
                info,
                term_count,
                stats,
                blocks,
                cache,
            }),
        );
        last_name = Some(name);
    }

    if r.position() != end {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "Trailing bytes in field table"));
    }
    Ok(fields)
}

// ============================================================================
// FIELDS / TERMS
// ============================================================================

/// Read handle for a whole segment. Clones share the decoded dictionary.
#[derive(Debug, Clone)]
pub struct BlockFields {
    segment: Arc<SegmentData>,
}

impl BlockFields {
    pub fn max_doc(&self) -> u32 {
        self.segment.header.max_doc
    }

    /// Schema as stored in the file.
    pub fn field_info(&self, field: &str) -> Option<&FieldInfo> {
        self.segment.fields.get(field).map(|f| &f.info)
    }

    /// Term blocks decoded so far, over all fields.
    pub fn cached_blocks(&self) -> usize {
        self.segment
            .fields
            .values()
            .flat_map(|f| f.cache.iter())
            .filter(|slot| slot.read().is_some())
            .count()
    }
}

impl Fields for BlockFields {
    type Terms = BlockTerms;

    fn field_names(&self) -> Vec<String> {
        self.segment.fields.keys().cloned().collect()
    }

    fn terms(&self, field: &str) -> Result<Option<BlockTerms>> {
        Ok(self.segment.fields.get(field).map(|data| BlockTerms {
            segment: Arc::clone(&self.segment),
            field: Arc::clone(data),
        }))
    }

    fn size(&self) -> usize {
        self.segment.fields.len()
    }
}

#[derive(Debug, Clone)]
pub struct BlockTerms {
    segment: Arc<SegmentData>,
    field: Arc<FieldData>,
}

impl Terms for BlockTerms {
    type Iter = BlockTermsEnum;

    fn iterator(&self) -> Result<BlockTermsEnum> {
        Ok(BlockTermsEnum {
            segment: Arc::clone(&self.segment),
            field: Arc::clone(&self.field),
            current: None,
            next_ord: Some(0),
            term: Vec::new(),
            block: None,
        })
    }

    fn size(&self) -> Option<u64> {
        Some(self.field.term_count)
    }

    fn sum_total_term_freq(&self) -> Option<u64> {
        self.field.stats.sum_total_term_freq
    }

    fn sum_doc_freq(&self) -> u64 {
        self.field.stats.sum_doc_freq
    }

    fn doc_count(&self) -> u32 {
        self.field.stats.doc_count
    }

    fn index_options(&self) -> IndexOptions {
        self.field.info.index_options
    }

    fn has_payloads(&self) -> bool {
        self.field.info.has_payloads
    }
}

// ============================================================================
// TERMS ENUM
// ============================================================================

/// Resume token: enough to open postings without touching the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTermState {
    field_number: u32,
    ord: u64,
    meta: TermMeta,
}

#[derive(Debug, Clone, Copy)]
struct Current {
    ord: u64,
    meta: TermMeta,
}

#[derive(Debug)]
pub struct BlockTermsEnum {
    segment: Arc<SegmentData>,
    field: Arc<FieldData>,
    current: Option<Current>,
    /// Ord `next` moves to; `None` once the end was reported.
    next_ord: Option<u64>,
    term: Vec<u8>,
    block: Option<(usize, Arc<TermBlock>)>,
}

impl BlockTermsEnum {
    fn load_block(&mut self, idx: usize) -> Result<Arc<TermBlock>> {
        match &self.block {
            Some((cached, block)) if *cached == idx => Ok(Arc::clone(block)),
            _ => {
                let block = self.segment.block(&self.field, idx)?;
                self.block = Some((idx, Arc::clone(&block)));
                Ok(block)
            }
        }
    }

    fn position_at(&mut self, ord: u64) -> Result<()> {
        let idx = (ord / TERM_BLOCK_SIZE as u64) as usize;
        let block = self.load_block(idx)?;
        let within = (ord % TERM_BLOCK_SIZE as u64) as usize;
        let (term, meta) = block
            .terms
            .get(within)
            .zip(block.metas.get(within))
            .ok_or_else(|| corrupt(format!("Ord {} missing from block {}", ord, idx)))?;
        self.term.clear();
        self.term.extend_from_slice(term);
        self.current = Some(Current { ord, meta: *meta });
        self.next_ord = Some(ord + 1);
        Ok(())
    }

    fn unposition(&mut self, next_ord: Option<u64>) {
        self.current = None;
        self.next_ord = next_ord;
    }

    /// Ord of the smallest term `>= text` and whether it is an exact hit.
    fn find_ceil(&mut self, text: &[u8]) -> Result<(u64, bool)> {
        let idx = self.field.blocks.partition_point(|b| b.first_term.as_slice() <= text);
        if idx == 0 {
            return Ok((0, false));
        }
        let block = self.load_block(idx - 1)?;
        let first_ord = self.field.blocks[idx - 1].first_ord;
        Ok(match block.terms.binary_search_by(|t| t.as_slice().cmp(text)) {
            Ok(i) => (first_ord + i as u64, true),
            Err(i) => (first_ord + i as u64, false),
        })
    }

    fn require_current(&self, call: &'static str) -> Result<Current> {
        self.current
            .ok_or_else(|| ConformanceError::violation(call, "UNPOSITIONED", "terms enum is not positioned"))
    }

    fn layout(&self, meta: TermMeta) -> PostingsLayout {
        let start = self.segment.offsets.postings.0 + meta.postings_offset as usize;
        PostingsLayout {
            start,
            end: start + meta.postings_len as usize,
            doc_freq: meta.doc_freq,
            options: self.field.info.index_options,
            has_payloads: self.field.info.has_payloads,
        }
    }
}

impl TermsEnum for BlockTermsEnum {
    type State = BlockTermState;
    type Docs = BlockPostingsEnum;
    type Positions = BlockPostingsEnum;

    fn next(&mut self) -> Result<Option<&[u8]>> {
        match self.next_ord {
            Some(ord) if ord < self.field.term_count => {
                self.position_at(ord)?;
                Ok(Some(&self.term))
            }
            _ => {
                self.unposition(None);
                Ok(None)
            }
        }
    }

    fn seek_ceil(&mut self, text: &[u8]) -> Result<SeekStatus> {
        let (ord, found) = self.find_ceil(text)?;
        if ord >= self.field.term_count {
            self.unposition(None);
            return Ok(SeekStatus::End);
        }
        self.position_at(ord)?;
        Ok(if found { SeekStatus::Found } else { SeekStatus::NotFound })
    }

    fn seek_exact(&mut self, text: &[u8]) -> Result<bool> {
        let (ord, found) = self.find_ceil(text)?;
        if found {
            self.position_at(ord)?;
        } else {
            self.unposition(Some(ord));
        }
        Ok(found)
    }

    fn seek_exact_ord(&mut self, ord: u64) -> Result<()> {
        if ord >= self.field.term_count {
            return Err(ConformanceError::violation(
                "seek_exact_ord",
                "OPEN",
                format!("ord {} >= term count {}", ord, self.field.term_count),
            ));
        }
        self.position_at(ord)
    }

    fn seek_exact_state(&mut self, text: &[u8], state: &BlockTermState) -> Result<()> {
        if state.field_number != self.field.info.number || state.ord >= self.field.term_count {
            return Err(ConformanceError::violation(
                "seek_exact_state",
                "OPEN",
                format!("state {:?} does not belong to field {}", state, self.field.info.name),
            ));
        }
        self.term.clear();
        self.term.extend_from_slice(text);
        self.current = Some(Current {
            ord: state.ord,
            meta: state.meta,
        });
        self.next_ord = Some(state.ord + 1);
        Ok(())
    }

    fn term(&self) -> Result<&[u8]> {
        self.require_current("term")?;
        Ok(&self.term)
    }

    fn ord(&self) -> Result<u64> {
        Ok(self.require_current("ord")?.ord)
    }

    fn doc_freq(&self) -> Result<u32> {
        Ok(self.require_current("doc_freq")?.meta.doc_freq)
    }

    fn total_term_freq(&self) -> Result<Option<u64>> {
        Ok(self.require_current("total_term_freq")?.meta.total_term_freq)
    }

    fn term_state(&self) -> Result<BlockTermState> {
        let current = self.require_current("term_state")?;
        Ok(BlockTermState {
            field_number: self.field.info.number,
            ord: current.ord,
            meta: current.meta,
        })
    }

    fn docs(
        &self,
        live_docs: Option<&LiveDocs>,
        reuse: Option<BlockPostingsEnum>,
        _flags: DocsFlags,
    ) -> Result<BlockPostingsEnum> {
        let layout = self.layout(self.require_current("docs")?.meta);
        match reuse {
            Some(cursor) => cursor.reset(&self.segment.bytes, layout, live_docs, false),
            None => BlockPostingsEnum::open(Arc::clone(&self.segment.bytes), layout, live_docs, false),
        }
    }

    fn docs_and_positions(
        &self,
        live_docs: Option<&LiveDocs>,
        reuse: Option<BlockPostingsEnum>,
        _flags: PositionsFlags,
    ) -> Result<Option<BlockPostingsEnum>> {
        let layout = self.layout(self.require_current("docs_and_positions")?.meta);
        if !layout.options.has_positions() {
            return Ok(None);
        }
        let cursor = match reuse {
            Some(cursor) => cursor.reset(&self.segment.bytes, layout, live_docs, true)?,
            None => BlockPostingsEnum::open(Arc::clone(&self.segment.bytes), layout, live_docs, true)?,
        };
        Ok(Some(cursor))
    }
}

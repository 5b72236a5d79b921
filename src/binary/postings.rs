// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Per-term postings: encoding, skip lists, and the decoding cursor.
//!
//! Doc ids are delta encoded: docs 100, 102, 105 are stored as [100, 2, 3].
//! Detail for each doc is interleaved right after its delta, so a cursor
//! reads one doc at a time and never materialises the whole list.
//!
//! ```text
//! [doc_freq: varint]
//! [skip_count: varint] [skip entries ...]
//! per doc:
//!   [doc_delta: varint]
//!   [freq: varint]                      if freqs are stored
//!   per position (freq times):          if positions are stored
//!     [position_delta: varint]
//!     [payload_len: varint][payload]    if the field has payloads
//!     [start_delta: varint][length: varint]   if offsets are stored
//! ```
//!
//! Long lists get a single-level skip list: every `SKIP_INTERVAL` docs, the
//! last doc id, the number of docs behind it, and the byte offset right after
//! it. `advance` jumps to the last entry below its target and scans from there.
//!
//! # References
//!
//! - **Delta encoding for postings**: Zobel & Moffat (2006), "Inverted Files
//!   for Text Search Engines", ACM Computing Surveys.
//! - **Skip lists**: Pugh (1990), "Skip Lists: A Probabilistic Alternative to
//!   Balanced Trees", CACM 33(6).

use std::io;
use std::sync::Arc;

use super::encoding::{encode_varint, ByteReader};
use super::header::{MAX_POSTING_SIZE, SKIP_INTERVAL, SKIP_LIST_THRESHOLD};
use crate::error::{ConformanceError, Result};
use crate::postings::{DocsAndPositionsEnum, DocsEnum};
use crate::types::{DocId, IndexOptions, DOC_BEFORE_START, NO_MORE_DOCS};
use crate::util::LiveDocs;

fn invalid_input(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

// ============================================================================
// SKIP LIST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipEntry {
    /// Doc id of the `doc_upto`-th doc.
    pub last_doc: u32,
    /// Docs decoded once the cursor lands here.
    pub doc_upto: u32,
    /// Offset into the doc data right after `last_doc`.
    pub byte_offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    pub entries: Vec<SkipEntry>,
}

impl SkipList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries are delta encoded against their predecessor.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        encode_varint(self.entries.len() as u64, buf);
        let mut prev = SkipEntry {
            last_doc: 0,
            doc_upto: 0,
            byte_offset: 0,
        };
        for entry in &self.entries {
            encode_varint(u64::from(entry.last_doc - prev.last_doc), buf);
            encode_varint(u64::from(entry.doc_upto - prev.doc_upto), buf);
            encode_varint(u64::from(entry.byte_offset - prev.byte_offset), buf);
            prev = *entry;
        }
    }

    /// Decode into `self`, reusing its allocation.
    pub fn decode_into(&mut self, r: &mut ByteReader<'_>, doc_freq: u32) -> io::Result<()> {
        self.entries.clear();
        let count = r.read_u32_varint("skip count")?;
        if count > doc_freq / SKIP_INTERVAL {
            return Err(invalid_data(format!(
                "Skip list of {} entries for {} docs",
                count, doc_freq
            )));
        }
        let mut prev = SkipEntry {
            last_doc: 0,
            doc_upto: 0,
            byte_offset: 0,
        };
        for _ in 0..count {
            let last_doc = r.read_u32_varint("skip doc")?;
            let doc_upto = r.read_u32_varint("skip doc count")?;
            let byte_offset = r.read_u32_varint("skip offset")?;
            let entry = SkipEntry {
                last_doc: prev.last_doc.checked_add(last_doc).ok_or_else(|| invalid_data("Skip doc overflow".into()))?,
                doc_upto: prev.doc_upto.checked_add(doc_upto).ok_or_else(|| invalid_data("Skip count overflow".into()))?,
                byte_offset: prev
                    .byte_offset
                    .checked_add(byte_offset)
                    .ok_or_else(|| invalid_data("Skip offset overflow".into()))?,
            };
            if entry.doc_upto > doc_freq || (doc_upto == 0 && !self.entries.is_empty()) {
                return Err(invalid_data(format!("Invalid skip entry {:?}", entry)));
            }
            self.entries.push(entry);
            prev = entry;
        }
        Ok(())
    }

    /// Last entry strictly below `target` that is still ahead of a cursor
    /// which has decoded `upto` docs.
    pub fn skip_to(&self, target: DocId, upto: u32) -> Option<SkipEntry> {
        let idx = self.entries.partition_point(|e| i64::from(e.last_doc) < i64::from(target));
        let entry = *self.entries.get(idx.checked_sub(1)?)?;
        (entry.doc_upto > upto).then_some(entry)
    }
}

// ============================================================================
// ENCODER
// ============================================================================

/// Buffers one term's postings while it is streamed in.
#[derive(Debug)]
pub struct PostingsEncoder {
    options: IndexOptions,
    has_payloads: bool,
    data: Vec<u8>,
    skips: SkipList,
    doc_count: u32,
    prev_doc: u32,
    last_position: i32,
    last_start_offset: i32,
}

impl PostingsEncoder {
    pub fn new(options: IndexOptions, has_payloads: bool) -> Self {
        Self {
            options,
            has_payloads: has_payloads && options.has_positions(),
            data: Vec::new(),
            skips: SkipList::default(),
            doc_count: 0,
            prev_doc: 0,
            last_position: 0,
            last_start_offset: 0,
        }
    }

    /// Clear for the next term, keeping allocations.
    pub fn reset(&mut self) {
        self.data.clear();
        self.skips.entries.clear();
        self.doc_count = 0;
        self.prev_doc = 0;
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn start_doc(&mut self, doc: DocId, freq: Option<u32>) -> io::Result<()> {
        let doc = u32::try_from(doc).map_err(|_| invalid_input(format!("Negative doc id {}", doc)))?;
        if self.doc_count > 0 && doc <= self.prev_doc {
            return Err(invalid_input(format!("Doc {} after {}", doc, self.prev_doc)));
        }
        if self.doc_count >= MAX_POSTING_SIZE {
            return Err(invalid_input(format!("Posting list exceeds {} docs", MAX_POSTING_SIZE)));
        }
        encode_varint(u64::from(doc - self.prev_doc), &mut self.data);
        if self.options.has_freqs() {
            let freq = freq.filter(|&f| f > 0).ok_or_else(|| invalid_input(format!("Missing freq at doc {}", doc)))?;
            encode_varint(u64::from(freq), &mut self.data);
        }
        self.prev_doc = doc;
        self.last_position = 0;
        self.last_start_offset = 0;
        Ok(())
    }

    pub fn add_position(&mut self, position: i32, payload: Option<&[u8]>, start_offset: i32, end_offset: i32) -> io::Result<()> {
        if !self.options.has_positions() {
            return Ok(());
        }
        if position < self.last_position {
            return Err(invalid_input(format!("Position {} after {}", position, self.last_position)));
        }
        encode_varint((position - self.last_position) as u64, &mut self.data);
        self.last_position = position;

        if self.has_payloads {
            let payload = payload.unwrap_or_default();
            encode_varint(payload.len() as u64, &mut self.data);
            self.data.extend_from_slice(payload);
        }
        if self.options.has_offsets() {
            if start_offset < self.last_start_offset || end_offset < start_offset {
                return Err(invalid_input(format!(
                    "Offsets [{}, {}) after start {}",
                    start_offset, end_offset, self.last_start_offset
                )));
            }
            encode_varint((start_offset - self.last_start_offset) as u64, &mut self.data);
            encode_varint((end_offset - start_offset) as u64, &mut self.data);
            self.last_start_offset = start_offset;
        }
        Ok(())
    }

    pub fn finish_doc(&mut self) {
        self.doc_count += 1;
        if self.doc_count % SKIP_INTERVAL == 0 {
            self.skips.entries.push(SkipEntry {
                last_doc: self.prev_doc,
                doc_upto: self.doc_count,
                byte_offset: self.data.len() as u32,
            });
        }
    }

    /// Append the finished term to `out`; returns its byte length.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> usize {
        let start = out.len();
        encode_varint(u64::from(self.doc_count), out);
        if self.doc_count >= SKIP_LIST_THRESHOLD {
            self.skips.encode(out);
        } else {
            encode_varint(0, out);
        }
        out.extend_from_slice(&self.data);
        out.len() - start
    }

    pub fn has_skips(&self) -> bool {
        self.doc_count >= SKIP_LIST_THRESHOLD && !self.skips.is_empty()
    }
}

// ============================================================================
// CURSOR
// ============================================================================

/// Where a term's postings live and how they were written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingsLayout {
    /// Absolute byte range in the segment file.
    pub start: usize,
    pub end: usize,
    pub doc_freq: u32,
    pub options: IndexOptions,
    pub has_payloads: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct StoredPosition {
    position: i32,
    start_offset: i32,
    end_offset: i32,
    /// Absolute byte range of a non-empty payload.
    payload: Option<(usize, usize)>,
}

/// Doc and position cursor over one term's postings.
///
/// Serves both `docs` and `docs_and_positions`: positions are decoded into a
/// per-doc buffer only when the cursor was opened for them.
#[derive(Debug)]
pub struct BlockPostingsEnum {
    data: Arc<[u8]>,
    layout: PostingsLayout,
    doc_start: usize,
    skips: SkipList,
    live_docs: Option<LiveDocs>,
    keep_positions: bool,
    pos: usize,
    upto: u32,
    prev_doc: u32,
    doc: DocId,
    freq: u32,
    positions: Vec<StoredPosition>,
    position_upto: usize,
}

impl BlockPostingsEnum {
    pub fn open(
        data: Arc<[u8]>,
        layout: PostingsLayout,
        live_docs: Option<&LiveDocs>,
        keep_positions: bool,
    ) -> Result<Self> {
        let mut cursor = Self {
            data,
            layout,
            doc_start: 0,
            skips: SkipList::default(),
            live_docs: None,
            keep_positions,
            pos: 0,
            upto: 0,
            prev_doc: 0,
            doc: DOC_BEFORE_START,
            freq: 0,
            positions: Vec::new(),
            position_upto: 0,
        };
        cursor.reset_to(layout, live_docs, keep_positions)?;
        Ok(cursor)
    }

    /// Reuse this cursor for another term of the same segment.
    pub fn reset(
        mut self,
        data: &Arc<[u8]>,
        layout: PostingsLayout,
        live_docs: Option<&LiveDocs>,
        keep_positions: bool,
    ) -> Result<Self> {
        if !Arc::ptr_eq(&self.data, data) {
            self.data = Arc::clone(data);
        }
        self.reset_to(layout, live_docs, keep_positions)?;
        Ok(self)
    }

    fn reset_to(&mut self, layout: PostingsLayout, live_docs: Option<&LiveDocs>, keep_positions: bool) -> Result<()> {
        if layout.end > self.data.len() || layout.start > layout.end {
            return Err(invalid_data(format!(
                "Postings range {}..{} outside file of {} bytes",
                layout.start,
                layout.end,
                self.data.len()
            ))
            .into());
        }
        let mut r = ByteReader::at(&self.data[..layout.end], layout.start);
        let doc_freq = r.read_u32_varint("posting count")?;
        if doc_freq != layout.doc_freq {
            return Err(invalid_data(format!(
                "Posting list holds {} docs, dictionary says {}",
                doc_freq, layout.doc_freq
            ))
            .into());
        }
        self.skips.decode_into(&mut r, doc_freq)?;

        self.layout = layout;
        self.doc_start = r.position();
        self.live_docs = live_docs.cloned();
        self.keep_positions = keep_positions && layout.options.has_positions();
        self.pos = self.doc_start;
        self.upto = 0;
        self.prev_doc = 0;
        self.doc = DOC_BEFORE_START;
        self.freq = 0;
        self.positions.clear();
        self.position_upto = 0;
        Ok(())
    }

    /// Decode the next stored doc, live or not.
    fn read_doc(&mut self) -> io::Result<u32> {
        let mut r = ByteReader::at(&self.data[..self.layout.end], self.pos);
        let delta = r.read_u32_varint("doc delta")?;
        if self.upto > 0 && delta == 0 {
            return Err(invalid_data(format!("Repeated doc {}", self.prev_doc)));
        }
        let doc = self
            .prev_doc
            .checked_add(delta)
            .filter(|&d| d < NO_MORE_DOCS as u32)
            .ok_or_else(|| invalid_data(format!("Doc delta {} overflows", delta)))?;

        let options = self.layout.options;
        let freq = if options.has_freqs() {
            let freq = r.read_u32_varint("freq")?;
            if freq == 0 {
                return Err(invalid_data(format!("Zero freq at doc {}", doc)));
            }
            freq
        } else {
            1
        };

        self.positions.clear();
        self.position_upto = 0;
        if options.has_positions() {
            let mut position = 0i64;
            let mut start_offset = 0i64;
            for _ in 0..freq {
                position += r.read_varint("position delta")? as i64;
                let payload = if self.layout.has_payloads {
                    let len = r.read_varint("payload length")? as usize;
                    let at = r.position();
                    r.skip(len, "payload")?;
                    (len > 0).then_some((at, at + len))
                } else {
                    None
                };
                let (start, end) = if options.has_offsets() {
                    start_offset += r.read_varint("start offset delta")? as i64;
                    let end = start_offset + r.read_varint("offset length")? as i64;
                    (start_offset, end)
                } else {
                    (-1, -1)
                };
                if position > i64::from(i32::MAX) || end > i64::from(i32::MAX) {
                    return Err(invalid_data(format!("Position data overflows at doc {}", doc)));
                }
                if self.keep_positions {
                    self.positions.push(StoredPosition {
                        position: position as i32,
                        start_offset: start as i32,
                        end_offset: end as i32,
                        payload,
                    });
                }
            }
        }

        self.pos = r.position();
        self.upto += 1;
        self.prev_doc = doc;
        self.freq = freq;
        Ok(doc)
    }

    fn finish(&mut self) -> Result<DocId> {
        if self.pos != self.layout.end {
            return Err(invalid_data(format!(
                "{} trailing bytes after {} docs",
                self.layout.end - self.pos,
                self.upto
            ))
            .into());
        }
        self.doc = NO_MORE_DOCS;
        self.freq = 0;
        self.positions.clear();
        self.position_upto = 0;
        Ok(NO_MORE_DOCS)
    }

    fn current_position(&self, call: &'static str) -> Result<&StoredPosition> {
        self.position_upto
            .checked_sub(1)
            .and_then(|i| self.positions.get(i))
            .ok_or_else(|| ConformanceError::violation(call, "ITERATING", "no current position"))
    }
}

impl DocsEnum for BlockPostingsEnum {
    fn doc_id(&self) -> DocId {
        self.doc
    }

    fn freq(&self) -> Result<u32> {
        Ok(self.freq)
    }

    fn next_doc(&mut self) -> Result<DocId> {
        loop {
            if self.doc == NO_MORE_DOCS {
                return Ok(NO_MORE_DOCS);
            }
            if self.upto >= self.layout.doc_freq {
                return self.finish();
            }
            let doc = self.read_doc()?;
            if self.live_docs.as_ref().map_or(true, |live| live.get(doc as DocId)) {
                self.doc = doc as DocId;
                return Ok(self.doc);
            }
        }
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        if let Some(entry) = self.skips.skip_to(target, self.upto) {
            tracing::trace!(target, from = self.upto, to = entry.doc_upto, "skip");
            self.pos = self.doc_start + entry.byte_offset as usize;
            self.upto = entry.doc_upto;
            self.prev_doc = entry.last_doc;
            self.positions.clear();
            self.position_upto = 0;
        }
        loop {
            let doc = self.next_doc()?;
            if doc >= target {
                return Ok(doc);
            }
        }
    }

    fn cost(&self) -> u64 {
        u64::from(self.layout.doc_freq)
    }
}

impl DocsAndPositionsEnum for BlockPostingsEnum {
    fn next_position(&mut self) -> Result<i32> {
        if !self.keep_positions {
            return Err(ConformanceError::violation(
                "next_position",
                "ITERATING",
                "cursor was not opened for positions",
            ));
        }
        let position = self
            .positions
            .get(self.position_upto)
            .ok_or_else(|| {
                ConformanceError::violation("next_position", "ITERATING", format!("called more than freq ({}) times", self.freq))
            })?
            .position;
        self.position_upto += 1;
        Ok(position)
    }

    fn start_offset(&self) -> Result<i32> {
        Ok(self.current_position("start_offset")?.start_offset)
    }

    fn end_offset(&self) -> Result<i32> {
        Ok(self.current_position("end_offset")?.end_offset)
    }

    fn payload(&self) -> Result<Option<&[u8]>> {
        Ok(self
            .current_position("payload")?
            .payload
            .and_then(|(start, end)| self.data.get(start..end)))
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Test utilities shared across unit and integration tests.
//!
//! This module is always compiled but hidden from documentation. It provides
//! a small in-memory postings store built from literal specs, a reader with
//! doc values, and a postings format whose cursors can be broken on purpose
//! so that tests can watch the verifier catch them.

#![doc(hidden)]

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConformanceError, Result};
use crate::postings::{
    BinaryDocValues, DocsAndPositionsEnum, DocsEnum, Fields, FieldsConsumer, FormatCapabilities, IndexReader,
    NumericDocValues, PostingsFormat, SegmentInfo, SortedDocValues, SortedSetDocValues, Terms, TermsEnum,
};
use crate::types::{
    DocId, DocsFlags, FieldInfo, FieldInfos, FieldStats, IndexOptions, PositionEntry, PositionsFlags, Posting,
    SeekStatus, TermStats, DOC_BEFORE_START, NO_MORE_DOCS, NO_MORE_ORDS,
};
use crate::util::LiveDocs;

// ============================================================================
// TERM SPECS
// ============================================================================

/// A term and its postings, written out by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSpec {
    pub text: Vec<u8>,
    pub postings: Vec<Posting>,
}

impl TermSpec {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.as_bytes().to_vec(),
            postings: Vec::new(),
        }
    }

    /// Add a doc with the given positions. Offsets are derived from the
    /// position (`4 * pos .. 4 * pos + 3`); an empty list means freq 1 with
    /// no recorded position.
    pub fn doc(mut self, doc: DocId, positions: &[i32]) -> Self {
        let entries: Vec<PositionEntry> = positions
            .iter()
            .map(|&position| PositionEntry {
                position,
                start_offset: position * 4,
                end_offset: position * 4 + 3,
                payload: None,
            })
            .collect();
        self.postings.push(Posting {
            doc_id: doc,
            freq: entries.len().max(1) as u32,
            positions: entries,
        });
        self
    }

    /// Attach `payload` to every position added so far.
    pub fn payload(mut self, payload: &[u8]) -> Self {
        for entry in self.postings.iter_mut().flat_map(|p| p.positions.iter_mut()) {
            entry.payload = Some(payload.to_vec());
        }
        self
    }
}

// ============================================================================
// FAULTS
// ============================================================================

/// A deliberate bug in [`MemoryPostingsFormat`] cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    /// The last doc of every term is never returned.
    SkipLastDoc,
    /// Every position is reported one too high.
    OffByOnePosition,
    /// Deleted docs are returned anyway.
    IgnoreLiveDocs,
    /// A reused cursor is not rewound.
    StaleReuse,
    /// Past its first doc, `next_doc` steps back one posting.
    BackwardsDoc,
    /// `advance` lands one doc past the first match.
    AdvanceOvershoot,
    /// The last byte of every payload is flipped.
    CorruptPayload,
}

// ============================================================================
// FIELDS
// ============================================================================

#[derive(Debug)]
struct MemoryTerm {
    text: Vec<u8>,
    postings: Arc<Vec<Posting>>,
}

#[derive(Debug)]
struct MemoryField {
    options: IndexOptions,
    has_payloads: bool,
    terms: Vec<MemoryTerm>,
    stats: FieldStats,
}

impl MemoryField {
    fn new(options: IndexOptions, specs: &[TermSpec], stored: Option<(bool, FieldStats)>) -> Self {
        let mut specs = specs.to_vec();
        specs.sort_by(|a, b| a.text.cmp(&b.text));
        let (has_payloads, stats) = stored.unwrap_or_else(|| {
            let has_payloads = specs
                .iter()
                .flat_map(|s| s.postings.iter())
                .flat_map(|p| p.positions.iter())
                .any(|e| e.payload.is_some());
            (has_payloads, field_stats(options, &specs))
        });
        Self {
            options,
            has_payloads,
            terms: specs
                .into_iter()
                .map(|s| MemoryTerm {
                    text: s.text,
                    postings: Arc::new(s.postings),
                })
                .collect(),
            stats,
        }
    }
}

fn field_stats(options: IndexOptions, specs: &[TermSpec]) -> FieldStats {
    let mut docs: Vec<DocId> = specs.iter().flat_map(|s| s.postings.iter().map(|p| p.doc_id)).collect();
    docs.sort_unstable();
    docs.dedup();
    let postings = specs.iter().flat_map(|s| s.postings.iter());
    FieldStats {
        sum_total_term_freq: options
            .has_freqs()
            .then(|| postings.clone().map(|p| u64::from(p.freq)).sum()),
        sum_doc_freq: postings.count() as u64,
        doc_count: docs.len() as u32,
    }
}

/// In-memory `Fields`, cheap to clone.
#[derive(Debug, Clone)]
pub struct MemoryFields {
    fields: Arc<BTreeMap<String, Arc<MemoryField>>>,
    fault: Fault,
}

/// One field named `body` holding `specs`.
pub fn memory_fields(options: IndexOptions, specs: &[TermSpec]) -> MemoryFields {
    MemoryFields::default().with_field("body", options, specs)
}

impl Default for MemoryFields {
    fn default() -> Self {
        Self {
            fields: Arc::new(BTreeMap::new()),
            fault: Fault::None,
        }
    }
}

impl MemoryFields {
    pub fn with_field(self, name: &str, options: IndexOptions, specs: &[TermSpec]) -> Self {
        let mut fields = (*self.fields).clone();
        fields.insert(name.to_string(), Arc::new(MemoryField::new(options, specs, None)));
        Self {
            fields: Arc::new(fields),
            fault: self.fault,
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }
}

impl Fields for MemoryFields {
    type Terms = MemoryTerms;

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn terms(&self, field: &str) -> Result<Option<MemoryTerms>> {
        Ok(self.fields.get(field).map(|f| MemoryTerms {
            field: Arc::clone(f),
            stats: f.stats,
            fault: self.fault,
        }))
    }

    fn size(&self) -> usize {
        self.fields.len()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTerms {
    field: Arc<MemoryField>,
    stats: FieldStats,
    fault: Fault,
}

impl MemoryTerms {
    /// Override the statistics this field reports.
    pub fn set_stats(&mut self, stats: FieldStats) {
        self.stats = stats;
    }
}

impl Terms for MemoryTerms {
    type Iter = MemoryTermsEnum;

    fn iterator(&self) -> Result<MemoryTermsEnum> {
        Ok(MemoryTermsEnum {
            field: Arc::clone(&self.field),
            current: None,
            next_ord: 0,
            fault: self.fault,
        })
    }

    fn size(&self) -> Option<u64> {
        Some(self.field.terms.len() as u64)
    }

    fn sum_total_term_freq(&self) -> Option<u64> {
        self.stats.sum_total_term_freq
    }

    fn sum_doc_freq(&self) -> u64 {
        self.stats.sum_doc_freq
    }

    fn doc_count(&self) -> u32 {
        self.stats.doc_count
    }

    fn index_options(&self) -> IndexOptions {
        self.field.options
    }

    fn has_payloads(&self) -> bool {
        self.field.has_payloads
    }
}

// ============================================================================
// TERM CURSOR
// ============================================================================

#[derive(Debug)]
pub struct MemoryTermsEnum {
    field: Arc<MemoryField>,
    current: Option<usize>,
    /// Where `next()` continues from.
    next_ord: usize,
    fault: Fault,
}

impl MemoryTermsEnum {
    fn current(&self, call: &'static str) -> Result<&MemoryTerm> {
        self.current
            .map(|i| &self.field.terms[i])
            .ok_or_else(|| ConformanceError::violation(call, "UNPOSITIONED", "memory cursor is not on a term"))
    }

    fn position(&mut self, ord: Option<usize>, next_ord: usize) {
        self.current = ord;
        self.next_ord = next_ord;
    }

    fn open(&self, live_docs: Option<&LiveDocs>, reuse: Option<MemoryDocsEnum>) -> Result<MemoryDocsEnum> {
        let term = self.current("docs")?;
        let live_docs = match self.fault {
            Fault::IgnoreLiveDocs => None,
            _ => live_docs.cloned(),
        };
        let mut docs = match reuse {
            Some(docs) => docs,
            None => MemoryDocsEnum::new(self.fault),
        };
        docs.reset(Arc::clone(&term.postings), live_docs, self.field.options, self.field.has_payloads);
        Ok(docs)
    }
}

impl TermsEnum for MemoryTermsEnum {
    type State = u64;
    type Docs = MemoryDocsEnum;
    type Positions = MemoryDocsEnum;

    fn next(&mut self) -> Result<Option<&[u8]>> {
        let ord = self.next_ord;
        if ord >= self.field.terms.len() {
            self.position(None, ord);
            return Ok(None);
        }
        self.position(Some(ord), ord + 1);
        Ok(Some(&self.field.terms[ord].text))
    }

    fn seek_ceil(&mut self, text: &[u8]) -> Result<SeekStatus> {
        match self.field.terms.binary_search_by(|t| t.text.as_slice().cmp(text)) {
            Ok(i) => {
                self.position(Some(i), i + 1);
                Ok(SeekStatus::Found)
            }
            Err(i) if i < self.field.terms.len() => {
                self.position(Some(i), i + 1);
                Ok(SeekStatus::NotFound)
            }
            Err(i) => {
                self.position(None, i);
                Ok(SeekStatus::End)
            }
        }
    }

    fn seek_exact(&mut self, text: &[u8]) -> Result<bool> {
        match self.field.terms.binary_search_by(|t| t.text.as_slice().cmp(text)) {
            Ok(i) => {
                self.position(Some(i), i + 1);
                Ok(true)
            }
            Err(i) => {
                self.position(None, i);
                Ok(false)
            }
        }
    }

    fn seek_exact_ord(&mut self, ord: u64) -> Result<()> {
        let i = ord as usize;
        if i >= self.field.terms.len() {
            return Err(ConformanceError::violation(
                "seek_exact_ord",
                "ANY",
                format!("ord {} out of range 0..{}", ord, self.field.terms.len()),
            ));
        }
        self.position(Some(i), i + 1);
        Ok(())
    }

    fn seek_exact_state(&mut self, text: &[u8], state: &u64) -> Result<()> {
        self.seek_exact_ord(*state)?;
        if self.field.terms[*state as usize].text != text {
            return Err(ConformanceError::violation(
                "seek_exact_state",
                "ANY",
                "term state belongs to a different term",
            ));
        }
        Ok(())
    }

    fn term(&self) -> Result<&[u8]> {
        Ok(&self.current("term")?.text)
    }

    fn ord(&self) -> Result<u64> {
        match self.current {
            Some(i) => Ok(i as u64),
            None => Err(ConformanceError::violation("ord", "UNPOSITIONED", "memory cursor is not on a term")),
        }
    }

    fn doc_freq(&self) -> Result<u32> {
        Ok(self.current("doc_freq")?.postings.len() as u32)
    }

    fn total_term_freq(&self) -> Result<Option<u64>> {
        let term = self.current("total_term_freq")?;
        Ok(self
            .field
            .options
            .has_freqs()
            .then(|| term.postings.iter().map(|p| u64::from(p.freq)).sum()))
    }

    fn term_state(&self) -> Result<u64> {
        self.ord()
    }

    fn docs(&self, live_docs: Option<&LiveDocs>, reuse: Option<MemoryDocsEnum>, _flags: DocsFlags) -> Result<MemoryDocsEnum> {
        self.open(live_docs, reuse)
    }

    fn docs_and_positions(
        &self,
        live_docs: Option<&LiveDocs>,
        reuse: Option<MemoryDocsEnum>,
        _flags: PositionsFlags,
    ) -> Result<Option<MemoryDocsEnum>> {
        if !self.field.options.has_positions() {
            return Ok(None);
        }
        self.open(live_docs, reuse).map(Some)
    }
}

// ============================================================================
// DOC CURSOR
// ============================================================================

/// Docs and positions over one term's literal postings.
#[derive(Debug)]
pub struct MemoryDocsEnum {
    postings: Arc<Vec<Posting>>,
    live_docs: Option<LiveDocs>,
    options: IndexOptions,
    has_payloads: bool,
    /// Index of the current posting.
    upto: Option<usize>,
    doc: DocId,
    pos_upto: usize,
    /// Corrupted copy of the current payload.
    scratch: Vec<u8>,
    fault: Fault,
}

impl MemoryDocsEnum {
    fn new(fault: Fault) -> Self {
        Self {
            postings: Arc::new(Vec::new()),
            live_docs: None,
            options: IndexOptions::DocsOnly,
            has_payloads: false,
            upto: None,
            doc: DOC_BEFORE_START,
            pos_upto: 0,
            scratch: Vec::new(),
            fault,
        }
    }

    fn reset(&mut self, postings: Arc<Vec<Posting>>, live_docs: Option<LiveDocs>, options: IndexOptions, has_payloads: bool) {
        self.postings = postings;
        self.live_docs = live_docs;
        self.options = options;
        self.has_payloads = has_payloads;
        if self.fault != Fault::StaleReuse {
            self.upto = None;
            self.doc = DOC_BEFORE_START;
        }
        self.pos_upto = 0;
    }

    fn posting(&self, call: &'static str) -> Result<&Posting> {
        self.upto
            .and_then(|i| self.postings.get(i))
            .ok_or_else(|| ConformanceError::violation(call, "NOT ITERATING", "memory cursor is not on a doc"))
    }

    fn entry(&self, call: &'static str) -> Result<&PositionEntry> {
        let posting = self.posting(call)?;
        self.pos_upto
            .checked_sub(1)
            .and_then(|i| posting.positions.get(i))
            .ok_or_else(|| ConformanceError::violation(call, "NO POSITION", "no current position"))
    }

    fn visible_len(&self) -> usize {
        match self.fault {
            Fault::SkipLastDoc => self.postings.len().saturating_sub(1),
            _ => self.postings.len(),
        }
    }

    /// Move to the next live posting.
    fn step(&mut self) -> DocId {
        let mut i = self.upto.map_or(0, |u| u + 1);
        while i < self.visible_len() {
            let doc = self.postings[i].doc_id;
            if self.live_docs.as_ref().map_or(true, |live| live.get(doc)) {
                self.upto = Some(i);
                self.doc = doc;
                self.pos_upto = 0;
                return doc;
            }
            i += 1;
        }
        self.upto = Some(self.postings.len());
        self.doc = NO_MORE_DOCS;
        NO_MORE_DOCS
    }
}

impl DocsEnum for MemoryDocsEnum {
    fn doc_id(&self) -> DocId {
        self.doc
    }

    fn freq(&self) -> Result<u32> {
        if !self.options.has_freqs() {
            return Ok(1);
        }
        Ok(self.posting("freq")?.freq)
    }

    fn next_doc(&mut self) -> Result<DocId> {
        if self.fault == Fault::BackwardsDoc {
            if let Some(u) = self.upto.filter(|&u| u > 0 && u < self.postings.len()) {
                self.upto = Some(u - 1);
                self.doc = self.postings[u - 1].doc_id;
                self.pos_upto = 0;
                return Ok(self.doc);
            }
        }
        Ok(self.step())
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        let mut doc = self.step();
        while doc < target {
            doc = self.step();
        }
        if self.fault == Fault::AdvanceOvershoot && doc != NO_MORE_DOCS {
            doc = self.step();
        }
        Ok(doc)
    }

    fn cost(&self) -> u64 {
        self.postings.len() as u64
    }
}

impl DocsAndPositionsEnum for MemoryDocsEnum {
    fn next_position(&mut self) -> Result<i32> {
        let posting = self.posting("next_position")?;
        let Some(entry) = posting.positions.get(self.pos_upto) else {
            return Err(ConformanceError::violation(
                "next_position",
                "ITERATING",
                format!("doc {} has only {} positions", posting.doc_id, posting.positions.len()),
            ));
        };
        let position = entry.position + i32::from(self.fault == Fault::OffByOnePosition);
        let corrupted = entry.payload.clone().filter(|_| self.fault == Fault::CorruptPayload);
        if let Some(mut bytes) = corrupted {
            if let Some(last) = bytes.last_mut() {
                *last ^= 0xff;
            }
            self.scratch = bytes;
        }
        self.pos_upto += 1;
        Ok(position)
    }

    fn start_offset(&self) -> Result<i32> {
        if !self.options.has_offsets() {
            return Ok(-1);
        }
        Ok(self.entry("start_offset")?.start_offset)
    }

    fn end_offset(&self) -> Result<i32> {
        if !self.options.has_offsets() {
            return Ok(-1);
        }
        Ok(self.entry("end_offset")?.end_offset)
    }

    fn payload(&self) -> Result<Option<&[u8]>> {
        if !self.has_payloads {
            return Ok(None);
        }
        let payload = self.entry("payload")?.payload.as_deref();
        if self.fault == Fault::CorruptPayload && payload.is_some() {
            return Ok(Some(&self.scratch));
        }
        Ok(payload)
    }
}

// ============================================================================
// READER
// ============================================================================

#[derive(Debug, Clone)]
struct SortedValues {
    values: Arc<Vec<Vec<u8>>>,
    ords: Arc<Vec<i64>>,
}

#[derive(Debug, Clone)]
struct SortedSetValues {
    values: Arc<Vec<Vec<u8>>>,
    ords: Arc<Vec<Vec<u64>>>,
}

/// An `IndexReader` over [`MemoryFields`] plus literal doc values.
///
/// Nothing is validated here: inconsistent readers are how the reader
/// decorator gets tested.
pub struct MemoryReader {
    max_doc: u32,
    live_docs: Option<LiveDocs>,
    fields: MemoryFields,
    field_infos: FieldInfos,
    numeric: BTreeMap<String, Arc<Vec<i64>>>,
    binary: BTreeMap<String, Arc<Vec<Vec<u8>>>>,
    sorted: BTreeMap<String, SortedValues>,
    sorted_set: BTreeMap<String, SortedSetValues>,
}

impl MemoryReader {
    pub fn new(max_doc: u32, live_docs: Option<LiveDocs>, fields: MemoryFields, field_infos: FieldInfos) -> Self {
        Self {
            max_doc,
            live_docs,
            fields,
            field_infos,
            numeric: BTreeMap::new(),
            binary: BTreeMap::new(),
            sorted: BTreeMap::new(),
            sorted_set: BTreeMap::new(),
        }
    }

    pub fn with_numeric(mut self, field: &str, values: Vec<i64>) -> Self {
        self.numeric.insert(field.to_string(), Arc::new(values));
        self
    }

    /// One value per doc.
    pub fn with_binary(mut self, field: &str, values: Vec<Vec<u8>>) -> Self {
        self.binary.insert(field.to_string(), Arc::new(values));
        self
    }

    /// `values` sorted; `ords[doc]` indexes into them, `-1` for no value.
    pub fn with_sorted(mut self, field: &str, values: Vec<Vec<u8>>, ords: Vec<i64>) -> Self {
        self.sorted.insert(
            field.to_string(),
            SortedValues {
                values: Arc::new(values),
                ords: Arc::new(ords),
            },
        );
        self
    }

    pub fn with_sorted_set(mut self, field: &str, values: Vec<Vec<u8>>, ords: Vec<Vec<u64>>) -> Self {
        self.sorted_set.insert(
            field.to_string(),
            SortedSetValues {
                values: Arc::new(values),
                ords: Arc::new(ords),
            },
        );
        self
    }
}

impl IndexReader for MemoryReader {
    type Fields = MemoryFields;

    fn max_doc(&self) -> u32 {
        self.max_doc
    }

    fn num_docs(&self) -> u32 {
        self.live_docs.as_ref().map_or(self.max_doc, LiveDocs::count)
    }

    fn live_docs(&self) -> Option<&LiveDocs> {
        self.live_docs.as_ref()
    }

    fn fields(&self) -> MemoryFields {
        self.fields.clone()
    }

    fn field_infos(&self) -> &FieldInfos {
        &self.field_infos
    }

    fn numeric_doc_values(&self, field: &str) -> Result<Option<Box<dyn NumericDocValues>>> {
        Ok(self
            .numeric
            .get(field)
            .map(|v| Box::new(MemoryNumeric(Arc::clone(v))) as Box<dyn NumericDocValues>))
    }

    fn binary_doc_values(&self, field: &str) -> Result<Option<Box<dyn BinaryDocValues>>> {
        Ok(self
            .binary
            .get(field)
            .map(|v| Box::new(MemoryBinary(Arc::clone(v))) as Box<dyn BinaryDocValues>))
    }

    fn sorted_doc_values(&self, field: &str) -> Result<Option<Box<dyn SortedDocValues>>> {
        Ok(self
            .sorted
            .get(field)
            .map(|v| Box::new(v.clone()) as Box<dyn SortedDocValues>))
    }

    fn sorted_set_doc_values(&self, field: &str) -> Result<Option<Box<dyn SortedSetDocValues>>> {
        Ok(self.sorted_set.get(field).map(|v| {
            Box::new(MemorySortedSet {
                data: v.clone(),
                current: Vec::new(),
                upto: 0,
            }) as Box<dyn SortedSetDocValues>
        }))
    }
}

fn doc_index(doc: DocId, len: usize) -> Result<usize> {
    usize::try_from(doc)
        .ok()
        .filter(|&d| d < len)
        .ok_or_else(|| crate::error::corrupt(format!("doc {} has no value slot (len {})", doc, len)))
}

/// `-(insertion point) - 1` on a miss.
fn lookup_term(values: &[Vec<u8>], key: &[u8]) -> i64 {
    match values.binary_search_by(|v| v.as_slice().cmp(key)) {
        Ok(i) => i as i64,
        Err(i) => -(i as i64) - 1,
    }
}

fn max_length(values: &[Vec<u8>]) -> usize {
    values.iter().map(Vec::len).max().unwrap_or(0)
}

struct MemoryNumeric(Arc<Vec<i64>>);

impl NumericDocValues for MemoryNumeric {
    fn get(&self, doc: DocId) -> Result<i64> {
        Ok(self.0[doc_index(doc, self.0.len())?])
    }
}

struct MemoryBinary(Arc<Vec<Vec<u8>>>);

impl BinaryDocValues for MemoryBinary {
    fn get(&self, doc: DocId, out: &mut Vec<u8>) -> Result<()> {
        let value = &self.0[doc_index(doc, self.0.len())?];
        out.clear();
        out.extend_from_slice(value);
        Ok(())
    }

    fn max_length(&self) -> usize {
        max_length(&self.0)
    }
}

impl SortedDocValues for SortedValues {
    fn ord(&self, doc: DocId) -> Result<i64> {
        Ok(self.ords[doc_index(doc, self.ords.len())?])
    }

    fn lookup_ord(&self, ord: i64, out: &mut Vec<u8>) -> Result<()> {
        let value = usize::try_from(ord)
            .ok()
            .and_then(|o| self.values.get(o))
            .ok_or_else(|| crate::error::corrupt(format!("ord {} out of range", ord)))?;
        out.clear();
        out.extend_from_slice(value);
        Ok(())
    }

    fn value_count(&self) -> u64 {
        self.values.len() as u64
    }

    fn lookup_term(&self, key: &[u8]) -> Result<i64> {
        Ok(lookup_term(&self.values, key))
    }

    fn max_length(&self) -> usize {
        max_length(&self.values)
    }
}

struct MemorySortedSet {
    data: SortedSetValues,
    current: Vec<u64>,
    upto: usize,
}

impl SortedSetDocValues for MemorySortedSet {
    fn set_document(&mut self, doc: DocId) -> Result<()> {
        self.current = self.data.ords[doc_index(doc, self.data.ords.len())?].clone();
        self.upto = 0;
        Ok(())
    }

    fn next_ord(&mut self) -> Result<u64> {
        let ord = self.current.get(self.upto).copied().unwrap_or(NO_MORE_ORDS);
        self.upto += 1;
        Ok(ord)
    }

    fn lookup_ord(&self, ord: u64, out: &mut Vec<u8>) -> Result<()> {
        let value = self
            .data
            .values
            .get(ord as usize)
            .ok_or_else(|| crate::error::corrupt(format!("ord {} out of range", ord)))?;
        out.clear();
        out.extend_from_slice(value);
        Ok(())
    }

    fn value_count(&self) -> u64 {
        self.data.values.len() as u64
    }

    fn lookup_term(&self, key: &[u8]) -> Result<i64> {
        Ok(lookup_term(&self.data.values, key))
    }

    fn max_length(&self) -> usize {
        max_length(&self.data.values)
    }
}

// ============================================================================
// FORMAT
// ============================================================================

/// Extension of the JSON file [`MemoryPostingsFormat`] writes.
pub const MEMORY_EXTENSION: &str = "mem.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredField {
    options: IndexOptions,
    has_payloads: bool,
    terms: Vec<TermSpec>,
    stats: FieldStats,
}

/// A postings format that keeps everything as JSON and serves it from
/// [`MemoryFields`]. With a [`Fault`] its cursors misbehave on purpose.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryPostingsFormat {
    pub fault: Fault,
}

impl MemoryPostingsFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(fault: Fault) -> Self {
        Self { fault }
    }
}

impl PostingsFormat for MemoryPostingsFormat {
    type Consumer = MemoryFieldsConsumer;
    type Producer = MemoryFields;

    fn name(&self) -> &str {
        "Memory"
    }

    fn capabilities(&self) -> FormatCapabilities {
        FormatCapabilities {
            max_index_options: IndexOptions::DocsAndFreqsAndPositionsAndOffsets,
            supports_payloads: true,
            accepts_large_values: true,
        }
    }

    fn fields_consumer(&self, segment: &SegmentInfo, _field_infos: &FieldInfos) -> Result<MemoryFieldsConsumer> {
        Ok(MemoryFieldsConsumer {
            path: segment.file_path(MEMORY_EXTENSION),
            fields: BTreeMap::new(),
            field: None,
            term: None,
        })
    }

    fn fields_producer(&self, segment: &SegmentInfo, _field_infos: &FieldInfos) -> Result<MemoryFields> {
        let json = fs::read_to_string(segment.file_path(MEMORY_EXTENSION))?;
        let stored: BTreeMap<String, StoredField> = serde_json::from_str(&json)?;
        let fields = stored
            .into_iter()
            .map(|(name, f)| (name, Arc::new(MemoryField::new(f.options, &f.terms, Some((f.has_payloads, f.stats))))))
            .collect();
        Ok(MemoryFields {
            fields: Arc::new(fields),
            fault: self.fault,
        })
    }
}

/// Collects the stream and writes it as one JSON document on `close`.
pub struct MemoryFieldsConsumer {
    path: std::path::PathBuf,
    fields: BTreeMap<String, StoredField>,
    field: Option<(String, StoredField)>,
    term: Option<TermSpec>,
}

impl MemoryFieldsConsumer {
    fn field(&mut self) -> Result<&mut StoredField> {
        self.field
            .as_mut()
            .map(|(_, f)| f)
            .ok_or_else(|| ConformanceError::violation("write", "NO FIELD", "no field started"))
    }

    fn term(&mut self) -> Result<&mut TermSpec> {
        self.term
            .as_mut()
            .ok_or_else(|| ConformanceError::violation("write", "NO TERM", "no term started"))
    }
}

impl FieldsConsumer for MemoryFieldsConsumer {
    fn start_field(&mut self, field: &FieldInfo) -> Result<()> {
        self.field = Some((
            field.name.clone(),
            StoredField {
                options: field.index_options,
                has_payloads: field.has_payloads,
                terms: Vec::new(),
                stats: FieldStats::default(),
            },
        ));
        Ok(())
    }

    fn start_term(&mut self, text: &[u8]) -> Result<()> {
        self.term = Some(TermSpec {
            text: text.to_vec(),
            postings: Vec::new(),
        });
        Ok(())
    }

    fn start_doc(&mut self, doc: DocId, freq: Option<u32>) -> Result<()> {
        self.term()?.postings.push(Posting {
            doc_id: doc,
            freq: freq.unwrap_or(1),
            positions: Vec::new(),
        });
        Ok(())
    }

    fn add_position(&mut self, position: i32, payload: Option<&[u8]>, start_offset: i32, end_offset: i32) -> Result<()> {
        let posting = self
            .term()?
            .postings
            .last_mut()
            .ok_or_else(|| ConformanceError::violation("add_position", "NO DOC", "no doc started"))?;
        posting.positions.push(PositionEntry {
            position,
            start_offset,
            end_offset,
            payload: payload.map(<[u8]>::to_vec),
        });
        Ok(())
    }

    fn finish_doc(&mut self) -> Result<()> {
        Ok(())
    }

    fn finish_term(&mut self, _text: &[u8], _stats: TermStats) -> Result<()> {
        let term = self
            .term
            .take()
            .ok_or_else(|| ConformanceError::violation("finish_term", "NO TERM", "no term started"))?;
        self.field()?.terms.push(term);
        Ok(())
    }

    fn finish_field(&mut self, stats: FieldStats) -> Result<()> {
        let (name, mut field) = self
            .field
            .take()
            .ok_or_else(|| ConformanceError::violation("finish_field", "NO FIELD", "no field started"))?;
        field.stats = stats;
        self.fields.insert(name, field);
        Ok(())
    }

    fn close(self) -> Result<()> {
        fs::write(&self.path, serde_json::to_vec(&self.fields)?)?;
        Ok(())
    }
}

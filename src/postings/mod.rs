// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The postings API every storage format implements.
//!
//! Read side, outermost first:
//!
//! ```text
//! Fields ──terms(field)──▶ Terms ──iterator()──▶ TermsEnum
//!                                                  │ docs(...)
//!                                                  ▼
//!                                   DocsEnum / DocsAndPositionsEnum
//! ```
//!
//! Write side is a single streaming consumer: fields in name order, terms in
//! byte order, docs in id order, positions in document order.
//!
//! Every call returns `Result` so that a contract-checking wrapper can report
//! a violation at the exact call that caused it.
//!
//! Cursor reuse is typed: a `TermsEnum` names its own cursor types, so a
//! cursor handed back through `reuse` is always one the enum produced (or a
//! wrapper that can be unwrapped statically). Nothing inspects types at runtime.

mod reader;

use std::fmt;
use std::path::PathBuf;

pub use reader::{
    live_docs_path, read_live_docs, write_live_docs, BinaryDocValues, IndexReader, NumericDocValues,
    SegmentReader, SortedDocValues, SortedSetDocValues,
};

use crate::error::Result;
use crate::types::{
    DocId, DocsFlags, FieldInfo, FieldInfos, FieldStats, IndexOptions, PositionsFlags, SeekStatus, TermStats,
};
use crate::util::LiveDocs;

// ============================================================================
// DOC CURSORS
// ============================================================================

/// Cursor over the documents of one term.
///
/// `doc_id()` is `-1` before the first `next_doc`/`advance` and
/// `NO_MORE_DOCS` once exhausted.
pub trait DocsEnum: Send {
    fn doc_id(&self) -> DocId;

    /// Term frequency in the current document. Only meaningful after a
    /// successful `next_doc`/`advance`.
    fn freq(&self) -> Result<u32>;

    fn next_doc(&mut self) -> Result<DocId>;

    /// First doc `>= target`, or `NO_MORE_DOCS`. `target` must be greater
    /// than the current doc.
    fn advance(&mut self, target: DocId) -> Result<DocId>;

    /// Upper bound on the number of docs this cursor can return.
    fn cost(&self) -> u64;
}

/// Docs cursor that can also walk positions, offsets and payloads.
pub trait DocsAndPositionsEnum: DocsEnum {
    /// Next position in the current document. Callable at most `freq()` times
    /// per document.
    fn next_position(&mut self) -> Result<i32>;

    /// `-1` when offsets are not indexed.
    fn start_offset(&self) -> Result<i32>;

    /// `-1` when offsets are not indexed.
    fn end_offset(&self) -> Result<i32>;

    /// Payload at the current position. `None` rather than an empty slice.
    fn payload(&self) -> Result<Option<&[u8]>>;
}

/// Linear `advance`: step with `next_doc` until reaching `target`.
///
/// Useful for implementations without skip data and as ground truth.
pub fn slow_advance<D: DocsEnum + ?Sized>(docs: &mut D, target: DocId) -> Result<DocId> {
    let mut doc = docs.doc_id();
    while doc < target {
        doc = docs.next_doc()?;
    }
    Ok(doc)
}

// ============================================================================
// TERM CURSORS
// ============================================================================

/// Cursor over the sorted terms of one field.
pub trait TermsEnum: Send {
    /// Opaque resume token captured by `term_state`.
    type State: Clone + Send + Sync + fmt::Debug;
    type Docs: DocsEnum;
    type Positions: DocsAndPositionsEnum;

    /// Advance to the next term; `None` at the end.
    fn next(&mut self) -> Result<Option<&[u8]>>;

    /// Position on the smallest term `>= text`.
    fn seek_ceil(&mut self, text: &[u8]) -> Result<SeekStatus>;

    /// Position on `text` if present.
    fn seek_exact(&mut self, text: &[u8]) -> Result<bool>;

    /// Position on the term with ordinal `ord`, which must exist.
    fn seek_exact_ord(&mut self, ord: u64) -> Result<()>;

    /// Position on `text` using a state captured earlier on the same field.
    fn seek_exact_state(&mut self, text: &[u8], state: &Self::State) -> Result<()>;

    fn term(&self) -> Result<&[u8]>;

    fn ord(&self) -> Result<u64>;

    fn doc_freq(&self) -> Result<u32>;

    /// `None` when the field does not store freqs.
    fn total_term_freq(&self) -> Result<Option<u64>>;

    fn term_state(&self) -> Result<Self::State>;

    /// Docs cursor for the current term, optionally recycling `reuse`.
    fn docs(&self, live_docs: Option<&LiveDocs>, reuse: Option<Self::Docs>, flags: DocsFlags) -> Result<Self::Docs>;

    /// Positions cursor for the current term, or `None` when the field does
    /// not index positions.
    fn docs_and_positions(
        &self,
        live_docs: Option<&LiveDocs>,
        reuse: Option<Self::Positions>,
        flags: PositionsFlags,
    ) -> Result<Option<Self::Positions>>;
}

/// Term dictionary of one field.
pub trait Terms: Send + Sync {
    type Iter: TermsEnum;

    fn iterator(&self) -> Result<Self::Iter>;

    /// Number of terms, if known.
    fn size(&self) -> Option<u64>;

    /// `None` when the field does not store freqs.
    fn sum_total_term_freq(&self) -> Option<u64>;

    fn sum_doc_freq(&self) -> u64;

    /// Number of docs with at least one term in this field.
    fn doc_count(&self) -> u32;

    fn index_options(&self) -> IndexOptions;

    fn has_payloads(&self) -> bool;
}

/// All indexed fields of a segment.
pub trait Fields: Send + Sync {
    type Terms: Terms;

    /// Field names in ascending order.
    fn field_names(&self) -> Vec<String>;

    fn terms(&self, field: &str) -> Result<Option<Self::Terms>>;

    fn size(&self) -> usize;
}

/// Shorthand for the term cursor type reachable from a `Fields`.
pub type FieldsTermsEnum<F> = <<F as Fields>::Terms as Terms>::Iter;

// ============================================================================
// WRITE SIDE
// ============================================================================

/// Streaming postings writer.
///
/// Call order per segment:
///
/// ```text
/// ( start_field
///     ( start_term ( start_doc add_position* finish_doc )+ finish_term )*
///   finish_field )*
/// close
/// ```
pub trait FieldsConsumer {
    fn start_field(&mut self, field: &FieldInfo) -> Result<()>;

    fn start_term(&mut self, text: &[u8]) -> Result<()>;

    /// `freq` is `None` when the field does not store freqs.
    fn start_doc(&mut self, doc: DocId, freq: Option<u32>) -> Result<()>;

    /// Offsets are `-1` when the field does not store them.
    fn add_position(&mut self, position: i32, payload: Option<&[u8]>, start_offset: i32, end_offset: i32)
        -> Result<()>;

    fn finish_doc(&mut self) -> Result<()>;

    fn finish_term(&mut self, text: &[u8], stats: TermStats) -> Result<()>;

    fn finish_field(&mut self, stats: FieldStats) -> Result<()>;

    /// Flush everything to the segment's directory.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

// ============================================================================
// FORMATS
// ============================================================================

/// Segment identity handed to a format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub name: String,
    pub max_doc: u32,
    pub dir: PathBuf,
}

impl SegmentInfo {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>, max_doc: u32) -> Self {
        Self {
            name: name.into(),
            max_doc,
            dir: dir.into(),
        }
    }

    /// `<dir>/<name>.<extension>`
    pub fn file_path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.name, extension))
    }
}

/// What a format can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatCapabilities {
    /// Highest level the format can represent.
    pub max_index_options: IndexOptions,
    pub supports_payloads: bool,
    /// Whether posting lists with tens of thousands of docs are in scope.
    pub accepts_large_values: bool,
}

impl FormatCapabilities {
    /// Lower `requested` to what the format can store.
    pub fn clamp(&self, requested: IndexOptions) -> IndexOptions {
        requested.min(self.max_index_options)
    }
}

/// A postings storage format: a writer and a reader for the same files.
pub trait PostingsFormat: Send + Sync {
    type Consumer: FieldsConsumer;
    type Producer: Fields + Clone;

    fn name(&self) -> &str;

    fn capabilities(&self) -> FormatCapabilities;

    fn fields_consumer(&self, segment: &SegmentInfo, field_infos: &FieldInfos) -> Result<Self::Consumer>;

    fn fields_producer(&self, segment: &SegmentInfo, field_infos: &FieldInfos) -> Result<Self::Producer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_the_ceiling() {
        let caps = FormatCapabilities {
            max_index_options: IndexOptions::DocsAndFreqsAndPositions,
            supports_payloads: true,
            accepts_large_values: false,
        };
        assert_eq!(
            caps.clamp(IndexOptions::DocsAndFreqsAndPositionsAndOffsets),
            IndexOptions::DocsAndFreqsAndPositions
        );
        assert_eq!(caps.clamp(IndexOptions::DocsOnly), IndexOptions::DocsOnly);
    }

    #[test]
    fn segment_files_live_in_the_segment_dir() {
        let seg = SegmentInfo::new("/tmp/run", "_0", 10);
        assert_eq!(seg.file_path("pst"), PathBuf::from("/tmp/run/_0.pst"));
    }
}

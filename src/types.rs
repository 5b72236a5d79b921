// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Core data types shared by the model, the store and the verifier.
//!
//! Doc ids are `i32` so that the "not started" position (`-1`) and the
//! exhaustion sentinel (`NO_MORE_DOCS`) live in the same domain as real ids.
//! Every valid doc id is strictly between the two.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Document identifier inside one segment.
pub type DocId = i32;

/// Doc id reported by a cursor before its first `next_doc`/`advance`.
pub const DOC_BEFORE_START: DocId = -1;

/// Returned by `next_doc`/`advance` once a cursor is exhausted.
pub const NO_MORE_DOCS: DocId = i32::MAX;

/// Terminates the ordinal stream of a sorted-set doc values cursor.
pub const NO_MORE_ORDS: u64 = u64::MAX;

// ============================================================================
// INDEX OPTIONS
// ============================================================================

/// How much per-posting detail a field stores.
///
/// Variants are declared in capability order, so the derived `Ord` is the
/// ceiling comparison used everywhere (`a <= b` means `a` stores no more than `b`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexOptions {
    DocsOnly,
    DocsAndFreqs,
    DocsAndFreqsAndPositions,
    DocsAndFreqsAndPositionsAndOffsets,
}

impl IndexOptions {
    /// Every level, lowest first. Position in this array is the ordinal.
    pub const ALL: [IndexOptions; 4] = [
        IndexOptions::DocsOnly,
        IndexOptions::DocsAndFreqs,
        IndexOptions::DocsAndFreqsAndPositions,
        IndexOptions::DocsAndFreqsAndPositionsAndOffsets,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    pub fn has_freqs(self) -> bool {
        self >= IndexOptions::DocsAndFreqs
    }

    pub fn has_positions(self) -> bool {
        self >= IndexOptions::DocsAndFreqsAndPositions
    }

    pub fn has_offsets(self) -> bool {
        self >= IndexOptions::DocsAndFreqsAndPositionsAndOffsets
    }

    /// Levels from `DocsOnly` up to and including `self`.
    pub fn up_to(self) -> &'static [IndexOptions] {
        &Self::ALL[..=self.ordinal()]
    }
}

impl fmt::Display for IndexOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexOptions::DocsOnly => "DOCS_ONLY",
            IndexOptions::DocsAndFreqs => "DOCS_AND_FREQS",
            IndexOptions::DocsAndFreqsAndPositions => "DOCS_AND_FREQS_AND_POSITIONS",
            IndexOptions::DocsAndFreqsAndPositionsAndOffsets => {
                "DOCS_AND_FREQS_AND_POSITIONS_AND_OFFSETS"
            }
        };
        f.write_str(name)
    }
}

// ============================================================================
// FIELD METADATA
// ============================================================================

/// Doc values kind declared for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DocValuesType {
    #[default]
    None,
    Numeric,
    Binary,
    Sorted,
    SortedSet,
}

/// Per-field schema as written into a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub number: u32,
    pub index_options: IndexOptions,
    pub has_payloads: bool,
    pub doc_values: DocValuesType,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, number: u32, index_options: IndexOptions) -> Self {
        Self {
            name: name.into(),
            number,
            index_options,
            has_payloads: false,
            doc_values: DocValuesType::None,
        }
    }

    pub fn with_payloads(mut self, has_payloads: bool) -> Self {
        self.has_payloads = has_payloads && self.index_options.has_positions();
        self
    }

    pub fn with_doc_values(mut self, doc_values: DocValuesType) -> Self {
        self.doc_values = doc_values;
        self
    }
}

/// Field schemas keyed by name, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfos {
    by_name: BTreeMap<String, FieldInfo>,
}

impl FieldInfos {
    pub fn new(infos: impl IntoIterator<Item = FieldInfo>) -> Self {
        Self {
            by_name: infos.into_iter().map(|fi| (fi.name.clone(), fi)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldInfo> {
        self.by_name.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Per-term statistics handed to `finish_term`.
///
/// `total_term_freq` is `None` when the field does not store freqs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    pub doc_freq: u32,
    pub total_term_freq: Option<u64>,
}

/// Per-field statistics handed to `finish_field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldStats {
    pub sum_total_term_freq: Option<u64>,
    pub sum_doc_freq: u64,
    pub doc_count: u32,
}

// ============================================================================
// CURSOR FLAGS
// ============================================================================

/// Result of `seek_ceil`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekStatus {
    Found,
    NotFound,
    End,
}

/// What a caller intends to read from a docs cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocsFlags(pub(crate) u8);

impl DocsFlags {
    pub const NONE: DocsFlags = DocsFlags(0);
    pub const FREQS: DocsFlags = DocsFlags(0b0000_0001);

    pub fn wants_freqs(self) -> bool {
        self.0 & Self::FREQS.0 != 0
    }
}

/// What a caller intends to read from a positions cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionsFlags(pub(crate) u8);

impl PositionsFlags {
    pub const NONE: PositionsFlags = PositionsFlags(0);
    pub const OFFSETS: PositionsFlags = PositionsFlags(0b0000_0001);
    pub const PAYLOADS: PositionsFlags = PositionsFlags(0b0000_0010);

    pub fn with(self, other: PositionsFlags) -> Self {
        PositionsFlags(self.0 | other.0)
    }

    pub fn wants_offsets(self) -> bool {
        self.0 & Self::OFFSETS.0 != 0
    }

    pub fn wants_payloads(self) -> bool {
        self.0 & Self::PAYLOADS.0 != 0
    }
}

impl fmt::Display for PositionsFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.wants_offsets(), self.wants_payloads()) {
            (true, true) => f.write_str("OFFSETS|PAYLOADS"),
            (true, false) => f.write_str("OFFSETS"),
            (false, true) => f.write_str("PAYLOADS"),
            (false, false) => f.write_str("NONE"),
        }
    }
}

// ============================================================================
// MATERIALISED POSTINGS
// ============================================================================

/// One position of a term inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub position: i32,
    pub start_offset: i32,
    pub end_offset: i32,
    pub payload: Option<Vec<u8>>,
}

/// A term's occurrence in one document.
///
/// `positions.len() == freq` whenever positions are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub freq: u32,
    pub positions: Vec<PositionEntry>,
}

/// Render term bytes for messages: UTF-8 when possible, escaped otherwise.
pub fn term_display(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.escape_ascii().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_options_form_a_total_order() {
        for window in IndexOptions::ALL.windows(2) {
            assert!(window[0] < window[1]);
        }
        assert_eq!(IndexOptions::DocsOnly.min(IndexOptions::DocsAndFreqs), IndexOptions::DocsOnly);
    }

    #[test]
    fn ordinals_round_trip_through_the_constant_list() {
        for (i, opt) in IndexOptions::ALL.iter().enumerate() {
            assert_eq!(opt.ordinal(), i);
            assert_eq!(IndexOptions::from_ordinal(i), Some(*opt));
        }
        assert_eq!(IndexOptions::from_ordinal(4), None);
    }

    #[test]
    fn capability_predicates() {
        assert!(!IndexOptions::DocsOnly.has_freqs());
        assert!(IndexOptions::DocsAndFreqs.has_freqs());
        assert!(!IndexOptions::DocsAndFreqs.has_positions());
        assert!(IndexOptions::DocsAndFreqsAndPositions.has_positions());
        assert!(!IndexOptions::DocsAndFreqsAndPositions.has_offsets());
        assert!(IndexOptions::DocsAndFreqsAndPositionsAndOffsets.has_offsets());
        assert_eq!(IndexOptions::DocsAndFreqs.up_to().len(), 2);
    }

    #[test]
    fn payloads_require_positions() {
        let fi = FieldInfo::new("body", 0, IndexOptions::DocsAndFreqs).with_payloads(true);
        assert!(!fi.has_payloads);
        let fi = FieldInfo::new("body", 0, IndexOptions::DocsAndFreqsAndPositions).with_payloads(true);
        assert!(fi.has_payloads);
    }

    #[test]
    fn sentinels_bracket_valid_ids() {
        assert!(DOC_BEFORE_START < 0);
        assert!(NO_MORE_DOCS > 1_000_000_000);
    }

    #[test]
    fn term_display_escapes_non_utf8() {
        assert_eq!(term_display(b"beer"), "beer");
        assert_eq!(term_display(&[0xff, b'a']), "\\xffa");
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use sorex_conformance::binary::encoding::{decode_varint, encode_varint};
use sorex_conformance::binary::{open_segment, POSTINGS_EXTENSION};
use sorex_conformance::testing::TermSpec;
use sorex_conformance::{
    BlockPostingsFormat, DocsAndPositionsEnum, DocsEnum, DocsFlags, FieldInfo, Fields, IndexOptions, IndexReader,
    PositionsFlags, SegmentInfo, Terms, TermsEnum, NO_MORE_DOCS,
};

use crate::common::write_segment;

// ============================================================================
// STRATEGIES
// ============================================================================

/// Term text -> doc -> sorted, distinct positions.
type Layout = BTreeMap<String, BTreeMap<i32, BTreeSet<i32>>>;

fn layout_strategy() -> impl Strategy<Value = Layout> {
    let positions = prop::collection::btree_set(0i32..200, 1..6);
    let docs = prop::collection::btree_map(0i32..300, positions, 1..40);
    prop::collection::btree_map("[a-z]{1,8}", docs, 1..12)
}

fn specs_from(layout: &Layout, payload: Option<&[u8]>) -> Vec<TermSpec> {
    layout
        .iter()
        .map(|(text, docs)| {
            let spec = docs.iter().fold(TermSpec::new(text), |spec, (&doc, positions)| {
                spec.doc(doc, &positions.iter().copied().collect::<Vec<_>>())
            });
            match payload {
                Some(bytes) => spec.payload(bytes),
                None => spec,
            }
        })
        .collect()
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever goes in through the consumer comes back out of the reader.
    #[test]
    fn prop_block_segment_reads_back_what_was_written(
        layout in layout_strategy(),
        payload in prop::option::of(prop::collection::vec(any::<u8>(), 1..8)),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let level = IndexOptions::DocsAndFreqsAndPositionsAndOffsets;
        let info = FieldInfo::new("body", 0, level).with_payloads(payload.is_some());
        let specs = specs_from(&layout, payload.as_deref());
        let reader = write_segment(&BlockPostingsFormat::new(), dir.path(), 300, &info, &specs, None);

        let fields = reader.fields();
        let terms = fields.terms("body").unwrap().unwrap();
        prop_assert_eq!(terms.size(), Some(layout.len() as u64));

        let mut te = terms.iterator().unwrap();
        let flags = PositionsFlags::OFFSETS.with(PositionsFlags::PAYLOADS);
        for (ord, (text, docs)) in layout.iter().enumerate() {
            prop_assert!(te.next().unwrap().is_some());
            prop_assert_eq!(te.term().unwrap(), text.as_bytes());
            prop_assert_eq!(te.ord().unwrap(), ord as u64);
            prop_assert_eq!(te.doc_freq().unwrap(), docs.len() as u32);

            let mut p = te.docs_and_positions(None, None, flags).unwrap().unwrap();
            for (&doc, positions) in docs {
                prop_assert_eq!(p.next_doc().unwrap(), doc);
                prop_assert_eq!(p.freq().unwrap(), positions.len() as u32);
                for &pos in positions {
                    prop_assert_eq!(p.next_position().unwrap(), pos);
                    prop_assert_eq!(p.start_offset().unwrap(), pos * 4);
                    prop_assert_eq!(p.end_offset().unwrap(), pos * 4 + 3);
                    prop_assert_eq!(p.payload().unwrap(), payload.as_deref());
                }
            }
            prop_assert_eq!(p.next_doc().unwrap(), NO_MORE_DOCS);
        }
        prop_assert!(te.next().unwrap().is_none());
    }

    /// Docs-only cursors see the same ids regardless of what else is stored.
    #[test]
    fn prop_docs_cursor_ignores_positions(layout in layout_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let info = FieldInfo::new("body", 0, IndexOptions::DocsAndFreqsAndPositions);
        let reader = write_segment(&BlockPostingsFormat::new(), dir.path(), 300, &info, &specs_from(&layout, None), None);
        let fields = reader.fields();
        let terms = fields.terms("body").unwrap().unwrap();
        let mut te = terms.iterator().unwrap();

        for (text, docs) in &layout {
            prop_assert!(te.seek_exact(text.as_bytes()).unwrap());
            let mut cursor = te.docs(None, None, DocsFlags::NONE).unwrap();
            let mut seen = Vec::new();
            loop {
                let doc = cursor.next_doc().unwrap();
                if doc == NO_MORE_DOCS {
                    break;
                }
                seen.push(doc);
            }
            prop_assert_eq!(seen, docs.keys().copied().collect::<Vec<_>>());
        }
    }

    #[test]
    fn prop_varint_round_trip(value: u64, trailing in prop::collection::vec(any::<u8>(), 0..4)) {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        let len = buf.len();
        buf.extend_from_slice(&trailing);
        prop_assert_eq!(decode_varint(&buf).unwrap(), (value, len));
    }

    #[test]
    fn prop_decode_varint_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..16)) {
        let _ = decode_varint(&bytes);
    }

    #[test]
    fn prop_open_segment_never_panics_on_garbage(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = open_segment(bytes);
    }

    /// Flipping any byte of a valid segment is rejected or still readable,
    /// never a panic.
    #[test]
    fn prop_open_segment_survives_bit_flips(layout in layout_strategy(), at in any::<prop::sample::Index>(), bit in 0u8..8) {
        let dir = tempfile::tempdir().unwrap();
        let info = FieldInfo::new("body", 0, IndexOptions::DocsAndFreqs);
        write_segment(&BlockPostingsFormat::new(), dir.path(), 300, &info, &specs_from(&layout, None), None);

        let path = SegmentInfo::new(dir.path(), "_0", 300).file_path(POSTINGS_EXTENSION);
        let mut bytes = std::fs::read(path).unwrap();
        let i = at.index(bytes.len());
        bytes[i] ^= 1 << bit;
        prop_assert!(open_segment(bytes).is_err());
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use sorex_conformance::testing::TermSpec;
use sorex_conformance::verify::{AssertingFields, DocsEnumState};
use sorex_conformance::{
    BlockPostingsFormat, DocsEnum, DocsFlags, Fields, IndexOptions, IndexReader, Terms, TermsEnum, NO_MORE_DOCS,
};

use crate::common::{body, greeting_terms, write_segment};

#[test]
fn raw_cursor_stays_exhausted_after_advancing_past_the_end() {
    let dir = tempfile::tempdir().unwrap();
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        8,
        &body(IndexOptions::DocsAndFreqs),
        &greeting_terms(),
        None,
    );
    // No wrapper: the store itself must keep answering the sentinel.
    let fields = reader.fields();
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    te.seek_exact(b"hello").unwrap();
    let mut docs = te.docs(None, None, DocsFlags::FREQS).unwrap();
    assert_eq!(docs.advance(8).unwrap(), NO_MORE_DOCS);
    assert_eq!(docs.doc_id(), NO_MORE_DOCS);
    assert_eq!(docs.next_doc().unwrap(), NO_MORE_DOCS);
    assert_eq!(docs.next_doc().unwrap(), NO_MORE_DOCS);
}

#[test]
fn wrapped_cursor_rejects_calls_after_finishing() {
    let dir = tempfile::tempdir().unwrap();
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        8,
        &body(IndexOptions::DocsAndFreqs),
        &greeting_terms(),
        None,
    );
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    te.seek_exact(b"hello").unwrap();
    let mut docs = te.docs(None, None, DocsFlags::FREQS).unwrap();
    assert_eq!(docs.advance(NO_MORE_DOCS).unwrap(), NO_MORE_DOCS);
    assert_eq!(docs.state(), DocsEnumState::Finished);
    assert!(docs.freq().unwrap_err().is_contract_violation());
    assert!(docs.next_doc().unwrap_err().is_contract_violation());
}

#[test]
fn advance_must_move_forward() {
    let dir = tempfile::tempdir().unwrap();
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        8,
        &body(IndexOptions::DocsOnly),
        &greeting_terms(),
        None,
    );
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    te.seek_exact(b"hello").unwrap();
    let mut docs = te.docs(None, None, DocsFlags::NONE).unwrap();
    assert_eq!(docs.next_doc().unwrap(), 2);
    assert!(docs.advance(2).unwrap_err().is_contract_violation());
}

#[test]
fn skip_lists_land_exactly_on_every_target() {
    let dir = tempfile::tempdir().unwrap();
    let docs: Vec<i32> = (0..1000).map(|i| i * 7 + (i % 3)).collect();
    let spec = docs.iter().fold(TermSpec::new("long"), |spec, &d| spec.doc(d, &[0, 1]));
    let max_doc = *docs.last().unwrap() as u32 + 1;
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        max_doc,
        &body(IndexOptions::DocsAndFreqs),
        &[spec],
        None,
    );
    let fields = AssertingFields::new(reader.fields());
    let terms = fields.terms("body").unwrap().unwrap();

    for stride in [1usize, 31, 32, 33, 127, 500] {
        let mut te = terms.iterator().unwrap();
        te.seek_exact(b"long").unwrap();
        let mut cursor = te.docs(None, None, DocsFlags::FREQS).unwrap();
        let mut i = stride - 1;
        while i < docs.len() {
            assert_eq!(cursor.advance(docs[i]).unwrap(), docs[i], "stride {stride}");
            assert_eq!(cursor.freq().unwrap(), 2);
            i += stride;
        }
        assert_eq!(cursor.advance(max_doc as i32).unwrap(), NO_MORE_DOCS);
    }
}

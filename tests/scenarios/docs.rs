// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use sorex_conformance::testing::TermSpec;
use sorex_conformance::verify::AssertingFields;
use sorex_conformance::{
    BlockPostingsFormat, DocsEnum, DocsFlags, Fields, IndexOptions, IndexReader, LiveDocs, Terms, TermsEnum,
    NO_MORE_DOCS,
};

use crate::common::{body, greeting_terms, init_tracing, write_segment};

#[test]
fn single_posting_docs_only() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        1,
        &body(IndexOptions::DocsOnly),
        &[TermSpec::new("beer").doc(0, &[])],
        None,
    );
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    assert!(te.seek_exact(b"beer").unwrap());

    let mut docs = te.docs(None, None, DocsFlags::NONE).unwrap();
    assert_eq!(docs.doc_id(), -1);
    assert_eq!(docs.next_doc().unwrap(), 0);
    assert_eq!(docs.next_doc().unwrap(), NO_MORE_DOCS);
}

#[test]
fn deleted_only_doc_ends_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let live = LiveDocs::from_docs([0, 1, 2, 3, 4, 6], 7);
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        7,
        &body(IndexOptions::DocsAndFreqsAndPositions),
        &[TermSpec::new("stout").doc(5, &[2, 5, 9])],
        Some(&live),
    );
    assert_eq!(reader.num_docs(), 6);

    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    assert!(te.seek_exact(b"stout").unwrap());
    let mut docs = te.docs(reader.live_docs(), None, DocsFlags::FREQS).unwrap();
    assert_eq!(docs.next_doc().unwrap(), NO_MORE_DOCS);
}

#[test]
fn live_docs_hide_deleted_postings_only() {
    let dir = tempfile::tempdir().unwrap();
    let live = LiveDocs::from_docs([0, 5, 6, 7], 8);
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        8,
        &body(IndexOptions::DocsAndFreqs),
        &greeting_terms(),
        Some(&live),
    );
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    assert!(te.seek_exact(b"hello").unwrap());

    // docFreq is a property of the term, not of the live view.
    assert_eq!(te.doc_freq().unwrap(), 2);
    let mut docs = te.docs(reader.live_docs(), None, DocsFlags::FREQS).unwrap();
    assert_eq!(docs.next_doc().unwrap(), 7);
    assert_eq!(docs.freq().unwrap(), 1);
    assert_eq!(docs.next_doc().unwrap(), NO_MORE_DOCS);

    let mut all = te.docs(None, None, DocsFlags::FREQS).unwrap();
    assert_eq!(all.next_doc().unwrap(), 2);
    assert_eq!(all.freq().unwrap(), 2);
}

#[test]
fn advance_lands_on_first_doc_at_or_after_target() {
    let dir = tempfile::tempdir().unwrap();
    let spec = (0..400).fold(TermSpec::new("many"), |spec, i| spec.doc(i * 3, &[]));
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        1200,
        &body(IndexOptions::DocsOnly),
        &[spec],
        None,
    );
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    te.seek_exact(b"many").unwrap();

    let mut docs = te.docs(None, None, DocsFlags::NONE).unwrap();
    assert_eq!(docs.advance(10).unwrap(), 12);
    assert_eq!(docs.advance(12 + 1).unwrap(), 15);
    assert_eq!(docs.advance(901).unwrap(), 903);
    assert_eq!(docs.next_doc().unwrap(), 906);
    assert_eq!(docs.advance(1197).unwrap(), 1197);
    assert_eq!(docs.next_doc().unwrap(), NO_MORE_DOCS);
}

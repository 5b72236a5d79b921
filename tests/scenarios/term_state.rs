// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use sorex_conformance::verify::AssertingFields;
use sorex_conformance::{
    BlockPostingsFormat, DocsAndPositionsEnum, DocsEnum, DocsFlags, Fields, IndexOptions, IndexReader,
    PositionsFlags, SeekStatus, Terms, TermsEnum, NO_MORE_DOCS,
};

use crate::common::{body, greeting_terms, write_segment};

fn drain<D: DocsEnum>(docs: &mut D) -> Vec<(i32, u32)> {
    let mut out = Vec::new();
    loop {
        let doc = docs.next_doc().unwrap();
        if doc == NO_MORE_DOCS {
            return out;
        }
        out.push((doc, docs.freq().unwrap()));
    }
}

#[test]
fn term_state_resumes_like_a_byte_seek() {
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
    let terms = fields.terms("body").unwrap().unwrap();

    let mut first = terms.iterator().unwrap();
    assert!(first.seek_exact(b"hello").unwrap());
    assert_eq!(first.ord().unwrap(), 1);
    let state = first.term_state().unwrap();

    let mut resumed = terms.iterator().unwrap();
    resumed.seek_exact_state(b"hello", &state).unwrap();

    let mut direct = terms.iterator().unwrap();
    assert!(direct.seek_exact(b"hello").unwrap());

    assert_eq!(resumed.term().unwrap(), b"hello");
    assert_eq!(resumed.doc_freq().unwrap(), direct.doc_freq().unwrap());
    assert_eq!(resumed.ord().unwrap(), direct.ord().unwrap());
    assert_eq!(resumed.total_term_freq().unwrap(), Some(3));

    let a = drain(&mut resumed.docs(None, None, DocsFlags::FREQS).unwrap());
    let b = drain(&mut direct.docs(None, None, DocsFlags::FREQS).unwrap());
    assert_eq!(a, vec![(2, 2), (7, 1)]);
    assert_eq!(a, b);
}

#[test]
fn ord_and_byte_seeks_agree() {
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
    let terms = fields.terms("body").unwrap().unwrap();
    let mut by_ord = terms.iterator().unwrap();
    let mut by_bytes = terms.iterator().unwrap();

    for (ord, text) in [&b"beer"[..], b"hello", b"world"].into_iter().enumerate() {
        by_ord.seek_exact_ord(ord as u64).unwrap();
        assert_eq!(by_ord.term().unwrap(), text);
        assert!(by_bytes.seek_exact(text).unwrap());
        assert_eq!(by_bytes.ord().unwrap(), ord as u64);
    }
    assert_eq!(by_bytes.seek_ceil(b"c").unwrap(), SeekStatus::NotFound);
    assert_eq!(by_bytes.term().unwrap(), b"hello");
    assert_eq!(by_bytes.seek_ceil(b"zz").unwrap(), SeekStatus::End);
}

#[test]
fn second_cursor_on_the_same_term_starts_over() {
    let dir = tempfile::tempdir().unwrap();
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        8,
        &body(IndexOptions::DocsAndFreqsAndPositions),
        &greeting_terms(),
        None,
    );
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    te.seek_exact(b"hello").unwrap();

    let mut first = te.docs(None, None, DocsFlags::FREQS).unwrap();
    let seq = drain(&mut first);

    let mut fresh = te.docs(None, None, DocsFlags::FREQS).unwrap();
    assert_eq!(fresh.doc_id(), -1);
    assert_eq!(drain(&mut fresh), seq);

    // Reusing the finished cursor rewinds it.
    let mut reused = te.docs(None, Some(first), DocsFlags::FREQS).unwrap();
    assert_eq!(reused.doc_id(), -1);
    assert_eq!(drain(&mut reused), seq);

    let mut p = te
        .docs_and_positions(None, None, PositionsFlags::NONE)
        .unwrap()
        .unwrap();
    p.next_doc().unwrap();
    let positions: Vec<i32> = (0..p.freq().unwrap()).map(|_| p.next_position().unwrap()).collect();
    assert_eq!(positions, vec![0, 3]);
    let mut again = te.docs_and_positions(None, Some(p), PositionsFlags::NONE).unwrap().unwrap();
    assert_eq!(again.doc_id(), -1);
    assert_eq!(again.next_doc().unwrap(), 2);
    assert_eq!(again.next_position().unwrap(), 0);
}

#[test]
fn reuse_across_terms_resets_the_cursor() {
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
    assert_eq!(docs.next_doc().unwrap(), 2);

    te.seek_exact(b"world").unwrap();
    let mut docs = te.docs(None, Some(docs), DocsFlags::FREQS).unwrap();
    assert_eq!(drain(&mut docs), vec![(5, 3)]);
}

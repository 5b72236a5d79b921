// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use sorex_conformance::testing::TermSpec;
use sorex_conformance::verify::AssertingFields;
use sorex_conformance::{
    BlockPostingsFormat, DocsAndPositionsEnum, DocsEnum, FieldInfo, Fields, IndexOptions, IndexReader,
    PositionsFlags, Terms, TermsEnum,
};

use crate::common::{body, write_segment};

fn stout() -> Vec<TermSpec> {
    vec![TermSpec::new("stout").doc(5, &[2, 5, 9])]
}

#[test]
fn positions_come_back_in_order_and_stop_at_freq() {
    let dir = tempfile::tempdir().unwrap();
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        6,
        &body(IndexOptions::DocsAndFreqsAndPositions),
        &stout(),
        None,
    );
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    assert!(te.seek_exact(b"stout").unwrap());

    let mut p = te
        .docs_and_positions(None, None, PositionsFlags::NONE)
        .unwrap()
        .unwrap();
    assert_eq!(p.next_doc().unwrap(), 5);
    assert_eq!(p.freq().unwrap(), 3);
    assert_eq!(p.next_position().unwrap(), 2);
    assert_eq!(p.next_position().unwrap(), 5);
    assert_eq!(p.next_position().unwrap(), 9);
    let err = p.next_position().unwrap_err();
    assert!(err.is_contract_violation(), "{err}");
}

#[test]
fn offsets_are_minus_one_when_not_indexed() {
    let dir = tempfile::tempdir().unwrap();
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        6,
        &body(IndexOptions::DocsAndFreqsAndPositions),
        &stout(),
        None,
    );
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    te.seek_exact(b"stout").unwrap();

    let mut p = te
        .docs_and_positions(None, None, PositionsFlags::OFFSETS)
        .unwrap()
        .unwrap();
    p.next_doc().unwrap();
    p.next_position().unwrap();
    assert_eq!(p.start_offset().unwrap(), -1);
    assert_eq!(p.end_offset().unwrap(), -1);
}

#[test]
fn offsets_and_payloads_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let info = FieldInfo::new("body", 0, IndexOptions::DocsAndFreqsAndPositionsAndOffsets).with_payloads(true);
    let specs = [TermSpec::new("stout").doc(5, &[2, 5, 9]).payload(b"ale")];
    let reader = write_segment(&BlockPostingsFormat::new(), dir.path(), 6, &info, &specs, None);
    let fields = AssertingFields::new(reader.fields());
    let terms = fields.terms("body").unwrap().unwrap();
    assert!(terms.has_payloads());

    let mut te = terms.iterator().unwrap();
    te.seek_exact(b"stout").unwrap();
    let flags = PositionsFlags::OFFSETS.with(PositionsFlags::PAYLOADS);
    let mut p = te.docs_and_positions(None, None, flags).unwrap().unwrap();
    p.next_doc().unwrap();
    for pos in [2, 5, 9] {
        assert_eq!(p.next_position().unwrap(), pos);
        assert_eq!(p.start_offset().unwrap(), pos * 4);
        assert_eq!(p.end_offset().unwrap(), pos * 4 + 3);
        assert_eq!(p.payload().unwrap(), Some(&b"ale"[..]));
        // Reading twice gives the same bytes.
        assert_eq!(p.payload().unwrap(), Some(&b"ale"[..]));
    }
}

#[test]
fn payload_before_first_position_is_a_violation() {
    let dir = tempfile::tempdir().unwrap();
    let info = FieldInfo::new("body", 0, IndexOptions::DocsAndFreqsAndPositions).with_payloads(true);
    let specs = [TermSpec::new("stout").doc(5, &[2]).payload(b"x")];
    let reader = write_segment(&BlockPostingsFormat::new(), dir.path(), 6, &info, &specs, None);
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    te.seek_exact(b"stout").unwrap();

    let mut p = te
        .docs_and_positions(None, None, PositionsFlags::PAYLOADS)
        .unwrap()
        .unwrap();
    assert!(p.freq().unwrap_err().is_contract_violation());
    p.next_doc().unwrap();
    assert!(p.payload().unwrap_err().is_contract_violation());
    assert!(p.start_offset().unwrap_err().is_contract_violation());
}

#[test]
fn docs_only_field_has_no_positions_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let reader = write_segment(
        &BlockPostingsFormat::new(),
        dir.path(),
        6,
        &body(IndexOptions::DocsAndFreqs),
        &stout(),
        None,
    );
    let fields = AssertingFields::new(reader.fields());
    let mut te = fields.terms("body").unwrap().unwrap().iterator().unwrap();
    te.seek_exact(b"stout").unwrap();
    assert!(te
        .docs_and_positions(None, None, PositionsFlags::NONE)
        .unwrap()
        .is_none());
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Deliberately broken formats must be caught, with a replayable seed.

use std::sync::atomic::AtomicBool;

use sorex_conformance::{
    build_index, BuildOptions, ConformanceError, ConformanceSuite, DeterministicRng, IndexOptions, TrialOptions,
    TrialSettings, Verifier,
};

use crate::common::{quick, Fault, MemoryPostingsFormat};

fn suite(fault: Fault, seed: u64) -> ConformanceSuite<MemoryPostingsFormat> {
    ConformanceSuite::new(MemoryPostingsFormat::with_fault(fault), quick(seed)).unwrap()
}

#[test]
fn dropped_last_doc_is_a_mismatch() {
    let err = suite(Fault::SkipLastDoc, 31).test_docs_only().unwrap_err();
    assert!(err.is_mismatch(), "{err}");
    assert!(err.replay_seed().is_some());
}

#[test]
fn shifted_positions_are_a_mismatch() {
    let s = suite(Fault::OffByOnePosition, 32);
    // Levels below positions never look at them.
    s.test_docs_and_freqs().unwrap();
    let err = s.test_docs_and_freqs_and_positions().unwrap_err();
    match err {
        ConformanceError::Mismatch { what, .. } => assert_eq!(what, "position"),
        other => panic!("expected a position mismatch, got {other}"),
    }
}

#[test]
fn ignored_deletions_are_a_mismatch() {
    let s = (33..60)
        .map(|seed| suite(Fault::IgnoreLiveDocs, seed))
        .find(|s| s.universe().live_docs().num_deleted() > 0)
        .expect("some seed deletes docs");
    let err = s.test_docs_only().unwrap_err();
    assert!(err.is_mismatch(), "{err}");
}

#[test]
fn stale_reuse_is_a_contract_violation() {
    let err = suite(Fault::StaleReuse, 34).test_docs_and_freqs().unwrap_err();
    assert!(err.is_contract_violation(), "{err}");
}

#[test]
fn backwards_cursor_is_a_contract_violation() {
    let err = suite(Fault::BackwardsDoc, 35).test_docs_only().unwrap_err();
    assert!(err.is_contract_violation(), "{err}");
    assert!(err.to_string().contains("backwards next_doc"), "{err}");
}

#[test]
fn advance_overshoot_is_a_mismatch() {
    let err = suite(Fault::AdvanceOvershoot, 36).test_docs_only().unwrap_err();
    assert!(err.replay_seed().is_some(), "{err}");
    match err {
        ConformanceError::Mismatch { what, .. } => assert_eq!(what, "docID after advance"),
        other => panic!("expected an advance mismatch, got {other}"),
    }
}

#[test]
fn corrupted_payloads_are_a_mismatch() {
    let s = suite(Fault::CorruptPayload, 37);
    // Without payloads indexed the fault never shows.
    s.test_docs_and_freqs_and_positions().unwrap();
    let err = s.test_docs_and_freqs_and_positions_and_payloads().unwrap_err();
    match err {
        ConformanceError::Mismatch { what, .. } => assert_eq!(what, "payload"),
        other => panic!("expected a payload mismatch, got {other}"),
    }
}

#[test]
fn threaded_pass_reports_the_failure_and_stops() {
    let s = suite(Fault::SkipLastDoc, 38);
    let dir = tempfile::tempdir().unwrap();
    let mut rng = DeterministicRng::new(38);
    let options = BuildOptions::full(IndexOptions::DocsOnly, false);
    let built = build_index(s.format(), s.universe(), dir.path(), options, &mut rng).unwrap();
    let verifier = Verifier::from_built(s.universe(), built).unwrap();
    let settings = TrialSettings::exhaustive(TrialOptions::NONE.with(TrialOptions::THREADS), IndexOptions::DocsOnly);

    let err = verifier.test_terms(settings, 5).unwrap_err();
    assert!(err.is_mismatch(), "{err}");

    // A worker that sees the flag already raised does no work.
    let report = verifier.test_terms_until(settings, 5, &AtomicBool::new(true)).unwrap();
    assert_eq!(report.terms, 0);
    assert_eq!(report.docs, 0);
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The JSON-backed format is simple enough to trust, so a clean run over it
//! checks the verifier itself for false alarms.

use sorex_conformance::{ConformanceSuite, TrialOptions, TrialSettings, Verifier};

use crate::common::{memory_fields, quick, MemoryPostingsFormat};

#[test]
fn memory_format_passes_every_test() {
    let suite = ConformanceSuite::new(MemoryPostingsFormat::new(), quick(77)).unwrap();
    let report = suite.run_all().unwrap();
    assert!(report.docs > 0);
    assert!(report.term_state_seeks + report.term_states_saved > 0);
}

#[test]
fn both_formats_see_the_same_trials() {
    let block = ConformanceSuite::new(sorex_conformance::BlockPostingsFormat::new(), quick(78)).unwrap();
    let memory = ConformanceSuite::new(MemoryPostingsFormat::new(), quick(78)).unwrap();
    let a = block.test_docs_and_freqs_and_positions().unwrap();
    let b = memory.test_docs_and_freqs_and_positions().unwrap();
    assert_eq!(a.terms, b.terms);
    assert_eq!(a.docs, b.docs);
    assert_eq!(a.positions, b.positions);
}

#[test]
fn verifier_rejects_a_store_missing_a_field() {
    let suite = ConformanceSuite::new(MemoryPostingsFormat::new(), quick(79)).unwrap();
    let universe = suite.universe();
    let verifier = Verifier::new(
        universe,
        memory_fields(sorex_conformance::IndexOptions::DocsOnly, &[]),
        universe.field_infos().clone(),
        Default::default(),
        sorex_conformance::IndexOptions::DocsOnly,
    );
    assert!(verifier.check_fields().unwrap_err().is_contract_violation());
    let err = verifier
        .test_terms(TrialSettings::exhaustive(TrialOptions::NONE, sorex_conformance::IndexOptions::DocsOnly), 1)
        .unwrap_err();
    assert!(err.is_mismatch(), "{err}");
}

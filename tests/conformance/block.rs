// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use sorex_conformance::{BlockPostingsFormat, ConformanceSuite, IndexOptions};

use crate::common::quick;

#[test]
fn block_format_passes_every_test() {
    let suite = ConformanceSuite::new(BlockPostingsFormat::new(), quick(20_250_101)).unwrap();
    let report = suite.run_all().unwrap();

    // Six full tests plus the random rounds.
    assert_eq!(report.builds.len(), 6 + suite.config().random_iterations as usize);
    assert!(report.workers > report.passes, "threaded passes run several workers");
    assert!(report.terms > 0);
    assert!(report.advances > 0);
    assert!(report.reused_enums > 0);
    assert!(report.positions > 0);
    assert!(report.payload_checks > 0);
    assert!(report.offset_checks > 0);
    assert!(report.dictionary_probes > 0);
}

#[test]
fn several_seeds_pass_at_the_top_level() {
    for seed in [1, 2, 3] {
        let suite = ConformanceSuite::new(BlockPostingsFormat::new(), quick(seed)).unwrap();
        suite
            .test_docs_and_freqs_and_positions_and_offsets_and_payloads()
            .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
    }
}

#[test]
fn format_without_offsets_still_passes_the_offsets_test() {
    let format = BlockPostingsFormat::new().without_offsets();
    let suite = ConformanceSuite::new(format, quick(4)).unwrap();
    let report = suite.test_docs_and_freqs_and_positions_and_offsets().unwrap();
    assert_eq!(report.offset_checks, 0);
    assert!(report.builds[0].clamped_fields > 0);
    for build in &report.builds {
        assert_eq!(build.fields, suite.universe().field_infos().len());
    }
    assert!(suite
        .universe()
        .field_infos()
        .iter()
        .all(|info| info.index_options == IndexOptions::DocsAndFreqsAndPositionsAndOffsets));
}

#[test]
fn nightly_adds_big_terms_only_for_formats_that_take_them() {
    let mut config = quick(5);
    config.nightly = true;
    config.term_classes.big = sorex_conformance::config::DocFreqRange::new(2_000, 3_000);

    let roomy = ConformanceSuite::new(BlockPostingsFormat::new(), config.clone()).unwrap();
    let has_big = |suite: &ConformanceSuite<BlockPostingsFormat>| {
        suite.universe().all_terms().iter().any(|t| t.term.starts_with(b"big_"))
    };
    assert!(has_big(&roomy));

    let tight = ConformanceSuite::new(BlockPostingsFormat::new().with_max_term_postings(10_000), config).unwrap();
    assert!(!has_big(&tight));
    tight.test_docs_and_freqs().unwrap();
}

/// Full-size run driven by `SOREX_CONFORMANCE_*`; `cargo xtask soak` loops it
/// over fresh seeds.
#[test]
#[ignore = "soak run, slow at default sizes"]
fn environment_configured_run() {
    crate::common::init_tracing();
    let suite = ConformanceSuite::from_env(BlockPostingsFormat::new()).unwrap();
    let seed = suite.config().seed;
    let report = suite
        .run_all()
        .unwrap_or_else(|e| panic!("seed {seed:#x} failed: {e}"));
    assert!(report.terms > 0, "seed {seed:#x}");
}

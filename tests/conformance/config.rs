// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use sorex_conformance::{BlockPostingsFormat, ConformanceConfig, ConformanceSuite};

#[test]
fn json_config_drives_the_universe() {
    let mut config = ConformanceConfig::quick(9);
    config.generation.min_fields = 2;
    config.generation.max_fields = 2;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conformance.json");
    std::fs::write(&path, config.to_json().unwrap()).unwrap();

    let loaded = ConformanceConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded.seed, 9);
    let suite = ConformanceSuite::new(BlockPostingsFormat::new(), loaded).unwrap();
    assert_eq!(suite.universe().field_infos().len(), 2);
}

#[test]
fn same_seed_same_universe() {
    let a = ConformanceSuite::new(BlockPostingsFormat::new(), ConformanceConfig::quick(10)).unwrap();
    let b = ConformanceSuite::new(BlockPostingsFormat::new(), ConformanceConfig::quick(10)).unwrap();
    assert_eq!(a.universe().all_terms(), b.universe().all_terms());
    assert_eq!(a.universe().max_doc(), b.universe().max_doc());
    assert_eq!(a.universe().live_docs().count(), b.universe().live_docs().count());
}

#[test]
fn bad_json_is_a_config_error() {
    let err = ConformanceConfig::from_json_str("{\"seed\": \"nope\"}").unwrap_err();
    assert!(matches!(err, sorex_conformance::ConformanceError::Config(_)));
}

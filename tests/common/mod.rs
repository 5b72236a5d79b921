// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities and fixtures.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Once;

use sorex_conformance::postings::{write_live_docs, SegmentReader};
use sorex_conformance::testing::TermSpec;
use sorex_conformance::verify::AssertingFieldsConsumer;
use sorex_conformance::{
    ConformanceConfig, FieldInfo, FieldInfos, FieldStats, FieldsConsumer, LiveDocs, PostingsFormat, SegmentInfo,
    TermStats,
};

// Re-export canonical test utilities from sorex_conformance::testing
pub use sorex_conformance::testing::{memory_fields, Fault, MemoryPostingsFormat};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. `RUST_LOG` filters it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Small configuration with the given seed.
pub fn quick(seed: u64) -> ConformanceConfig {
    init_tracing();
    ConformanceConfig::quick(seed)
}

// ============================================================================
// HAND-WRITTEN SEGMENTS
// ============================================================================

/// The three-term field most scenarios use: `beer` at doc 0, `hello` at docs
/// 2 and 7, `world` at doc 5.
pub fn greeting_terms() -> Vec<TermSpec> {
    vec![
        TermSpec::new("beer").doc(0, &[1]),
        TermSpec::new("hello").doc(2, &[0, 3]).doc(7, &[4]),
        TermSpec::new("world").doc(5, &[2, 5, 9]),
    ]
}

/// Write `specs` as the single field described by `info` and open the result.
///
/// Stats are computed from the specs. The write goes through the write-side
/// contract checker, so a bad spec fails here.
pub fn write_segment<P: PostingsFormat>(
    format: &P,
    dir: &Path,
    max_doc: u32,
    info: &FieldInfo,
    specs: &[TermSpec],
    live_docs: Option<&LiveDocs>,
) -> SegmentReader<P::Producer> {
    let segment = SegmentInfo::new(dir, "_0", max_doc);
    let infos = FieldInfos::new([info.clone()]);
    let mut consumer = AssertingFieldsConsumer::new(format.fields_consumer(&segment, &infos).unwrap(), max_doc);

    let level = info.index_options;
    let mut sorted = specs.to_vec();
    sorted.sort_by(|a, b| a.text.cmp(&b.text));

    let mut docs_seen = std::collections::BTreeSet::new();
    let mut field = FieldStats::default();
    let mut sum_ttf = 0u64;

    consumer.start_field(info).unwrap();
    for spec in &sorted {
        consumer.start_term(&spec.text).unwrap();
        let mut ttf = 0u64;
        for posting in &spec.postings {
            consumer
                .start_doc(posting.doc_id, level.has_freqs().then_some(posting.freq))
                .unwrap();
            if level.has_positions() {
                for entry in &posting.positions {
                    let payload = if info.has_payloads { entry.payload.as_deref() } else { None };
                    let (start, end) = if level.has_offsets() {
                        (entry.start_offset, entry.end_offset)
                    } else {
                        (-1, -1)
                    };
                    consumer.add_position(entry.position, payload, start, end).unwrap();
                }
            }
            consumer.finish_doc().unwrap();
            ttf += if level.has_freqs() { u64::from(posting.freq) } else { 1 };
            docs_seen.insert(posting.doc_id);
        }
        consumer
            .finish_term(
                &spec.text,
                TermStats {
                    doc_freq: spec.postings.len() as u32,
                    total_term_freq: level.has_freqs().then_some(ttf),
                },
            )
            .unwrap();
        sum_ttf += ttf;
        field.sum_doc_freq += spec.postings.len() as u64;
    }
    field.sum_total_term_freq = level.has_freqs().then_some(sum_ttf);
    field.doc_count = docs_seen.len() as u32;
    consumer.finish_field(field).unwrap();
    consumer.close().unwrap();

    if let Some(live) = live_docs {
        write_live_docs(&segment, live).unwrap();
    }
    SegmentReader::open(format, &segment, &infos).unwrap()
}

/// `body` at `level`, no payloads.
pub fn body(level: sorex_conformance::IndexOptions) -> FieldInfo {
    FieldInfo::new("body", 0, level)
}

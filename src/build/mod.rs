// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Index build pipeline.
//!
//! Streams the reference universe through a format's write API, then opens
//! the result for reading. Every field is written at a level no higher than
//! the format's ceiling; the postings themselves are always replayed at the
//! run's maximum level, so the detail stream matches what the verifier
//! replays later.
//!
//! The consumer is wrapped in [`AssertingFieldsConsumer`], so a statistics
//! drift in this pipeline fails here instead of poisoning every comparison.

use std::collections::BTreeMap;
use std::path::Path;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::PostingsUniverse;
use crate::postings::{write_live_docs, FieldsConsumer, PostingsFormat, SegmentInfo, SegmentReader};
use crate::types::{FieldInfo, FieldInfos, FieldStats, IndexOptions, TermStats, NO_MORE_DOCS};
use crate::util::DeterministicRng;
use crate::verify::AssertingFieldsConsumer;

/// Name of the single segment every run writes.
pub const SEGMENT_NAME: &str = "_0";

/// What to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Highest level any field may be written at.
    pub max_allowed: IndexOptions,
    pub allow_payloads: bool,
    /// Write every field at its ceiling instead of a random level.
    pub always_test_max: bool,
}

impl BuildOptions {
    pub fn full(max_allowed: IndexOptions, allow_payloads: bool) -> Self {
        Self {
            max_allowed,
            allow_payloads,
            always_test_max: true,
        }
    }

    pub fn random(allow_payloads: bool) -> Self {
        Self {
            max_allowed: IndexOptions::DocsAndFreqsAndPositionsAndOffsets,
            allow_payloads,
            always_test_max: false,
        }
    }
}

/// Counters of one build, for logging and reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub fields: usize,
    pub terms: u64,
    pub postings: u64,
    pub positions: u64,
    pub payload_bytes: u64,
    /// Fields written below the requested level because of the format's ceiling.
    pub clamped_fields: usize,
}

/// A written and reopened segment.
pub struct BuiltIndex<F> {
    pub reader: SegmentReader<F>,
    /// Schemas as actually written.
    pub field_infos: FieldInfos,
    /// Field statistics as streamed to the consumer.
    pub field_stats: BTreeMap<String, FieldStats>,
    /// Level the postings were replayed at.
    pub max_allowed: IndexOptions,
    pub report: BuildReport,
}

/// Pick the level and payload flag each field is written with.
fn choose_field_infos<P: PostingsFormat>(
    format: &P,
    universe: &PostingsUniverse,
    options: BuildOptions,
    rng: &mut DeterministicRng,
) -> (FieldInfos, usize) {
    let caps = format.capabilities();
    let ceiling = caps.clamp(options.max_allowed);
    let mut clamped = 0;
    let infos = universe
        .field_infos()
        .iter()
        .map(|declared| {
            let field_max = caps.clamp(declared.index_options.min(options.max_allowed));
            if field_max < declared.index_options.min(options.max_allowed) {
                clamped += 1;
            }
            let level = if options.always_test_max {
                field_max
            } else {
                IndexOptions::ALL[rng.below(field_max.ordinal() as u64 + 1) as usize]
            };
            let payloads = level.has_positions() && options.allow_payloads && caps.supports_payloads;
            FieldInfo::new(declared.name.clone(), declared.number, level).with_payloads(payloads)
        })
        .collect::<Vec<_>>();
    if clamped > 0 {
        tracing::debug!(
            format = format.name(),
            requested = %options.max_allowed,
            ceiling = %ceiling,
            clamped,
            "format ceiling lowers field options"
        );
    }
    (FieldInfos::new(infos), clamped)
}

/// Write `universe` into `dir` with `format` and open it for reading.
pub fn build_index<P: PostingsFormat>(
    format: &P,
    universe: &PostingsUniverse,
    dir: &Path,
    options: BuildOptions,
    rng: &mut DeterministicRng,
) -> Result<BuiltIndex<P::Producer>> {
    let max_doc = universe.max_doc();
    let segment = SegmentInfo::new(dir, SEGMENT_NAME, max_doc);
    let (field_infos, clamped_fields) = choose_field_infos(format, universe, options, rng);

    let mut report = BuildReport {
        clamped_fields,
        ..BuildReport::default()
    };
    let mut field_stats = BTreeMap::new();
    let mut consumer = AssertingFieldsConsumer::new(format.fields_consumer(&segment, &field_infos)?, max_doc);

    for field in universe.field_names() {
        let (Some(info), Some(terms)) = (field_infos.get(field), universe.terms(field)) else {
            continue;
        };
        let level = info.index_options;
        let do_freqs = level.has_freqs();
        let do_positions = level.has_positions();
        let do_offsets = level.has_offsets();
        let do_payloads = info.has_payloads;
        tracing::debug!(field, options = %level, payloads = do_payloads, terms = terms.len(), "writing field");

        consumer.start_field(info)?;
        let mut sum_total_term_freq = 0u64;
        let mut sum_doc_freq = 0u64;
        let mut seen_docs = RoaringBitmap::new();

        for (term, &term_seed) in terms {
            let Some(mut postings) = universe.seed_postings(field, term, false, options.max_allowed) else {
                continue;
            };
            tracing::trace!(field, term = %crate::types::term_display(term), doc_freq = postings.doc_freq(), term_seed, "writing term");

            consumer.start_term(term)?;
            let mut total_term_freq = 0u64;
            loop {
                let doc = postings.next_doc();
                if doc == NO_MORE_DOCS {
                    break;
                }
                let freq = postings.freq();
                consumer.start_doc(doc, do_freqs.then_some(freq))?;
                seen_docs.insert(doc as u32);
                if do_positions {
                    for _ in 0..freq {
                        let position = postings.next_position();
                        let payload = if do_payloads { postings.payload() } else { None };
                        report.payload_bytes += payload.map_or(0, |p| p.len() as u64);
                        let (start, end) = if do_offsets {
                            (postings.start_offset(), postings.end_offset())
                        } else {
                            (-1, -1)
                        };
                        consumer.add_position(position, payload, start, end)?;
                    }
                    report.positions += u64::from(freq);
                }
                total_term_freq += if do_freqs { u64::from(freq) } else { 1 };
                consumer.finish_doc()?;
            }

            let doc_freq = postings.doc_freq();
            consumer.finish_term(
                term,
                TermStats {
                    doc_freq,
                    total_term_freq: do_freqs.then_some(total_term_freq),
                },
            )?;
            sum_total_term_freq += total_term_freq;
            sum_doc_freq += u64::from(doc_freq);
            report.terms += 1;
            report.postings += u64::from(doc_freq);
        }

        let stats = FieldStats {
            sum_total_term_freq: do_freqs.then_some(sum_total_term_freq),
            sum_doc_freq,
            doc_count: seen_docs.len() as u32,
        };
        consumer.finish_field(stats)?;
        field_stats.insert(field.to_string(), stats);
        report.fields += 1;
    }
    consumer.close()?;

    write_live_docs(&segment, universe.live_docs())?;
    let reader = SegmentReader::open(format, &segment, &field_infos)?;

    tracing::info!(
        format = format.name(),
        max_allowed = %options.max_allowed,
        fields = report.fields,
        terms = report.terms,
        postings = report.postings,
        positions = report.positions,
        "built index"
    );
    Ok(BuiltIndex {
        reader,
        field_infos,
        field_stats,
        max_allowed: options.max_allowed,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BlockPostingsFormat;
    use crate::config::ConformanceConfig;
    use crate::postings::{Fields, IndexReader, Terms};

    fn universe(seed: u64) -> PostingsUniverse {
        PostingsUniverse::generate(&ConformanceConfig::quick(seed), true)
    }

    #[test]
    fn recorded_stats_match_the_reader() {
        let u = universe(7);
        let dir = tempfile::tempdir().unwrap();
        let mut rng = DeterministicRng::new(1);
        let options = BuildOptions::full(IndexOptions::DocsAndFreqsAndPositions, true);
        let built = build_index(&BlockPostingsFormat::new(), &u, dir.path(), options, &mut rng).unwrap();

        assert_eq!(built.report.fields, u.field_names().count());
        assert_eq!(built.reader.max_doc(), u.max_doc());
        assert_eq!(built.reader.num_docs(), u.live_docs().count());

        let fields = built.reader.fields();
        for (name, stats) in &built.field_stats {
            let terms = fields.terms(name).unwrap().unwrap();
            assert_eq!(terms.sum_doc_freq(), stats.sum_doc_freq);
            assert_eq!(terms.sum_total_term_freq(), stats.sum_total_term_freq);
            assert_eq!(terms.doc_count(), stats.doc_count);
            assert_eq!(terms.index_options(), IndexOptions::DocsAndFreqsAndPositions);
            assert!(terms.has_payloads());
        }
    }

    #[test]
    fn ceiling_clamps_instead_of_failing() {
        let u = universe(9);
        let dir = tempfile::tempdir().unwrap();
        let mut rng = DeterministicRng::new(2);
        let format = BlockPostingsFormat::new().without_offsets();
        let options = BuildOptions::full(IndexOptions::DocsAndFreqsAndPositionsAndOffsets, false);
        let built = build_index(&format, &u, dir.path(), options, &mut rng).unwrap();

        assert_eq!(built.report.clamped_fields, built.field_infos.len());
        for info in built.field_infos.iter() {
            assert_eq!(info.index_options, IndexOptions::DocsAndFreqsAndPositions);
            assert!(!info.has_payloads);
        }
    }

    #[test]
    fn random_levels_stay_under_the_ceiling() {
        let u = universe(13);
        let dir = tempfile::tempdir().unwrap();
        let mut rng = DeterministicRng::new(3);
        let built = build_index(&BlockPostingsFormat::new(), &u, dir.path(), BuildOptions::random(true), &mut rng).unwrap();
        for info in built.field_infos.iter() {
            assert!(info.index_options <= IndexOptions::DocsAndFreqsAndPositionsAndOffsets);
            assert!(!info.has_payloads || info.index_options.has_positions());
        }
    }

    #[test]
    fn docs_only_fields_carry_no_freq_totals() {
        let u = universe(17);
        let dir = tempfile::tempdir().unwrap();
        let mut rng = DeterministicRng::new(4);
        let options = BuildOptions::full(IndexOptions::DocsOnly, false);
        let built = build_index(&BlockPostingsFormat::new(), &u, dir.path(), options, &mut rng).unwrap();
        assert!(built.field_stats.values().all(|s| s.sum_total_term_freq.is_none()));
        assert_eq!(built.report.positions, 0);
    }
}

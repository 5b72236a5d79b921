// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use proptest::prelude::*;
use sorex_conformance::config::{DocFreqRange, GenerationTuning};
use sorex_conformance::{DeterministicRng, DocId, IndexOptions, LiveDocs, SeedPostings, NO_MORE_DOCS};

// ============================================================================
// STRATEGIES
// ============================================================================

fn range_strategy() -> impl Strategy<Value = DocFreqRange> {
    (1u32..40, 0u32..60).prop_map(|(min, extra)| DocFreqRange::new(min, min + extra))
}

fn options_strategy() -> impl Strategy<Value = IndexOptions> {
    prop::sample::select(IndexOptions::ALL.to_vec())
}

fn doc_ids(mut postings: SeedPostings) -> Vec<DocId> {
    let mut out = Vec::new();
    loop {
        let doc = postings.next_doc();
        if doc == NO_MORE_DOCS {
            return out;
        }
        out.push(doc);
    }
}

/// Pull every detail of every doc, which advances the detail stream.
fn doc_ids_pulling_everything(mut postings: SeedPostings) -> Vec<DocId> {
    let mut out = Vec::new();
    loop {
        let doc = postings.next_doc();
        if doc == NO_MORE_DOCS {
            return out;
        }
        for _ in 0..postings.freq() {
            postings.next_position();
            let _ = postings.payload();
            let _ = (postings.start_offset(), postings.end_offset());
        }
        out.push(doc);
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Doc ids never depend on how much detail is pulled.
    #[test]
    fn prop_doc_ids_independent_of_detail(seed: u64, range in range_strategy(), options in options_strategy()) {
        let tuning = GenerationTuning::default();
        let bare = doc_ids(SeedPostings::docs_only(seed, range, &tuning));
        let detailed = doc_ids_pulling_everything(SeedPostings::new(seed, range, None, options, &tuning));
        prop_assert_eq!(bare, detailed);
    }

    /// Ids are strictly increasing and the count is the drawn doc freq.
    #[test]
    fn prop_doc_ids_strictly_increase(seed: u64, range in range_strategy()) {
        let tuning = GenerationTuning::default();
        let postings = SeedPostings::docs_only(seed, range, &tuning);
        let doc_freq = postings.doc_freq();
        prop_assert!(doc_freq >= range.min && doc_freq <= range.max);
        let docs = doc_ids(postings);
        prop_assert_eq!(docs.len() as u32, doc_freq);
        prop_assert!(docs.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(docs.first().map_or(true, |&d| d >= 0));
    }

    /// A live-docs replay is the full replay filtered by the mask.
    #[test]
    fn prop_live_docs_filter_the_full_sequence(seed: u64, mask_seed: u64, range in range_strategy()) {
        let tuning = GenerationTuning::default();
        let all = doc_ids(SeedPostings::docs_only(seed, range, &tuning));
        let max_doc = all.last().map_or(1, |&d| d as u32 + 1);
        let live = LiveDocs::random(max_doc, &mut DeterministicRng::new(mask_seed));

        let filtered = doc_ids(SeedPostings::new(seed, range, Some(live.clone()), IndexOptions::DocsOnly, &tuning));
        let expected: Vec<DocId> = all.into_iter().filter(|&d| live.get(d)).collect();
        prop_assert_eq!(filtered, expected);
    }

    /// `advance` lands on the first doc at or after the target.
    #[test]
    fn prop_advance_is_first_doc_at_or_after(seed: u64, range in range_strategy(), targets in prop::collection::vec(0i32..5000, 1..10)) {
        let tuning = GenerationTuning::default();
        let all = doc_ids(SeedPostings::docs_only(seed, range, &tuning));
        let mut targets = targets;
        targets.sort_unstable();
        targets.dedup();

        let mut postings = SeedPostings::docs_only(seed, range, &tuning);
        for target in targets {
            if target <= postings.doc_id() {
                continue;
            }
            let expected = all.iter().copied().find(|&d| d >= target).unwrap_or(NO_MORE_DOCS);
            prop_assert_eq!(postings.advance(target), expected);
            if expected == NO_MORE_DOCS {
                break;
            }
        }
    }

    /// Positions are non-negative and non-decreasing within a doc; offsets
    /// never run backwards.
    #[test]
    fn prop_positions_are_well_formed(seed: u64, range in range_strategy()) {
        let tuning = GenerationTuning::default();
        let mut postings = SeedPostings::new(seed, range, None, IndexOptions::DocsAndFreqsAndPositionsAndOffsets, &tuning);
        for posting in postings.collect_postings() {
            prop_assert_eq!(posting.positions.len() as u32, posting.freq);
            prop_assert!(posting.positions.windows(2).all(|w| w[0].position <= w[1].position));
            prop_assert!(posting.positions.windows(2).all(|w| w[0].start_offset <= w[1].start_offset));
            for entry in &posting.positions {
                prop_assert!(entry.position >= 0);
                prop_assert!(entry.start_offset <= entry.end_offset);
                prop_assert!(entry.payload.as_ref().map_or(true, |p| !p.is_empty()));
            }
        }
    }
}

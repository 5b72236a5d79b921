// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The reference universe: every field, term and term seed of a run.
//!
//! Only seeds are stored. Postings are replayed on demand through
//! [`SeedPostings`], so the universe stays small even when a term has tens of
//! thousands of docs.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use super::seed::SeedPostings;
use crate::config::{ConformanceConfig, TermClass};
use crate::types::{FieldInfo, FieldInfos, IndexOptions, TermStats, NO_MORE_DOCS};
use crate::util::rng::derive_seed_from_label;
use crate::util::{DeterministicRng, LiveDocs};

/// One (field, term) pair of the universe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldAndTerm {
    pub field: String,
    pub term: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PostingsUniverse {
    config: ConformanceConfig,
    fields: BTreeMap<String, BTreeMap<Vec<u8>, u64>>,
    field_infos: FieldInfos,
    live_docs: LiveDocs,
    all_terms: Vec<FieldAndTerm>,
    max_doc: u32,
    total_postings: u64,
}

impl PostingsUniverse {
    /// Draw fields, terms and term seeds from `config.seed`.
    ///
    /// `big_` terms need both `config.nightly` and a format that accepts
    /// large posting lists.
    pub fn generate(config: &ConformanceConfig, accepts_large_values: bool) -> Self {
        let mut random = DeterministicRng::new(derive_seed_from_label(config.seed, "universe"));
        let gen = &config.generation;

        let num_fields = random.int_in(i64::from(gen.min_fields), i64::from(gen.max_fields)) as usize;
        let mut fields: BTreeMap<String, BTreeMap<Vec<u8>, u64>> = BTreeMap::new();
        let mut infos = Vec::with_capacity(num_fields);
        let mut last_doc = 0;
        let mut total_postings = 0u64;

        while infos.len() < num_fields {
            let name = random.simple_string(1, 10);
            if fields.contains_key(&name) {
                continue;
            }
            let field_number = infos.len() as u32;
            infos.push(FieldInfo::new(
                name.clone(),
                field_number,
                IndexOptions::DocsAndFreqsAndPositionsAndOffsets,
            ));

            let num_terms = if random.one_in(gen.many_terms_one_in) {
                let min = i64::from(gen.many_terms_min.max(gen.min_terms_per_field));
                random.int_in(min, min + min / 2)
            } else {
                random.int_in(i64::from(gen.min_terms_per_field), i64::from(gen.max_terms_per_field))
            } as usize;

            let mut postings = BTreeMap::new();
            let mut seen = BTreeSet::new();
            for term_upto in 0..num_terms {
                let base = random.simple_string(0, 10);
                if !seen.insert(base.clone()) {
                    continue;
                }
                let class = if field_number == 0 && term_upto == 0 && config.nightly && accepts_large_values {
                    TermClass::Big
                } else if field_number == 0 && term_upto == 1 {
                    TermClass::Medium
                } else if random.next_bool() {
                    TermClass::Low
                } else {
                    TermClass::VeryLow
                };
                let term = format!("{}{}", class.prefix(), base).into_bytes();
                let term_seed = random.next_u64();

                let range = config.term_classes.bounds_for(&term, config.random_multiplier);
                let replay = SeedPostings::docs_only(term_seed, range, gen);
                total_postings += u64::from(replay.doc_freq());
                if let Some(doc) = replay.last_doc() {
                    last_doc = last_doc.max(doc);
                }
                postings.insert(term, term_seed);
            }
            fields.insert(name, postings);
        }

        // A count, not the last id.
        let max_doc = last_doc as u32 + 1;
        let live_docs = LiveDocs::random(max_doc, &mut random);

        let all_terms = fields
            .iter()
            .flat_map(|(field, terms)| {
                terms.keys().map(move |term| FieldAndTerm {
                    field: field.clone(),
                    term: term.clone(),
                })
            })
            .collect::<Vec<_>>();

        tracing::info!(
            seed = config.seed,
            fields = fields.len(),
            terms = all_terms.len(),
            max_doc,
            live = live_docs.count(),
            total_postings,
            "generated postings universe"
        );

        Self {
            config: config.clone(),
            fields,
            field_infos: FieldInfos::new(infos),
            live_docs,
            all_terms,
            max_doc,
            total_postings,
        }
    }

    pub fn config(&self) -> &ConformanceConfig {
        &self.config
    }

    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }

    /// The run's deletions: each doc live with one shared, randomly drawn ratio.
    pub fn live_docs(&self) -> &LiveDocs {
        &self.live_docs
    }

    /// Declared field schemas (every field at the full ceiling).
    pub fn field_infos(&self) -> &FieldInfos {
        &self.field_infos
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Terms of `field` in byte order with their seeds.
    pub fn terms(&self, field: &str) -> Option<&BTreeMap<Vec<u8>, u64>> {
        self.fields.get(field)
    }

    /// Every (field, term) pair, field-major, each in ascending order.
    pub fn all_terms(&self) -> &[FieldAndTerm] {
        &self.all_terms
    }

    pub fn total_postings(&self) -> u64 {
        self.total_postings
    }

    pub fn term_seed(&self, field: &str, term: &[u8]) -> Option<u64> {
        self.fields.get(field)?.get(term).copied()
    }

    /// Ordinal of `term` within its field.
    pub fn term_ord(&self, field: &str, term: &[u8]) -> Option<u64> {
        let terms = self.fields.get(field)?;
        terms.contains_key(term).then(|| {
            terms
                .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(term)))
                .count() as u64
        })
    }

    /// Fresh replay of a term's postings.
    ///
    /// `options` must be the level the index was built for, not the level a
    /// particular field was written at: it decides how the detail stream is
    /// drawn.
    pub fn seed_postings(
        &self,
        field: &str,
        term: &[u8],
        with_live_docs: bool,
        options: IndexOptions,
    ) -> Option<SeedPostings> {
        let seed = self.term_seed(field, term)?;
        let range = self.config.term_classes.bounds_for(term, self.config.random_multiplier);
        let live = with_live_docs.then(|| self.live_docs.clone());
        Some(SeedPostings::new(seed, range, live, options, &self.config.generation))
    }

    /// Statistics a writer records for `term` when the index is built for
    /// `model_options` and the field is written at `field_options`.
    pub fn term_stats(
        &self,
        field: &str,
        term: &[u8],
        model_options: IndexOptions,
        field_options: IndexOptions,
    ) -> Option<TermStats> {
        let mut postings = self.seed_postings(field, term, false, model_options)?;
        let mut total = 0u64;
        while postings.next_doc() != NO_MORE_DOCS {
            total += u64::from(postings.freq());
        }
        Some(TermStats {
            doc_freq: postings.doc_freq(),
            total_term_freq: field_options.has_freqs().then_some(total),
        })
    }
}

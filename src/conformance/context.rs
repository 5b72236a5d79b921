// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Per-worker trial state.
//!
//! A worker owns its generator, its cursors kept for reuse and its saved
//! term states. Nothing here is shared: the context lives exactly as long as
//! the worker's pass and is dropped with it.

use super::report::TrialReport;
use crate::model::FieldAndTerm;
use crate::postings::TermsEnum;
use crate::util::DeterministicRng;

pub struct WorkerContext<E: TermsEnum> {
    /// Seed of this worker's trial sequence; reported with mismatches.
    pub seed: u64,
    pub rng: DeterministicRng,
    pub reuse_docs: Option<E::Docs>,
    pub reuse_positions: Option<E::Positions>,
    pub term_states: Vec<(FieldAndTerm, E::State)>,
    pub report: TrialReport,
}

impl<E: TermsEnum> WorkerContext<E> {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: DeterministicRng::new(seed),
            reuse_docs: None,
            reuse_positions: None,
            term_states: Vec::new(),
            report: TrialReport {
                workers: 1,
                ..TrialReport::default()
            },
        }
    }

    pub fn save_term_state(&mut self, term: FieldAndTerm, state: E::State) {
        self.term_states.push((term, state));
        self.report.term_states_saved += 1;
    }

    /// A random previously saved state.
    pub fn pick_term_state(&mut self) -> Option<(FieldAndTerm, E::State)> {
        if self.term_states.is_empty() {
            return None;
        }
        let idx = self.rng.below(self.term_states.len() as u64) as usize;
        Some(self.term_states[idx].clone())
    }

    pub fn into_report(self) -> TrialReport {
        self.report
    }
}

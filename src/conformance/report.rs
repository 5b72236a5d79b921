// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::build::BuildReport;

/// What a verification pass exercised. Merged across workers and passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialReport {
    pub passes: u64,
    pub workers: u64,
    pub terms: u64,
    pub enums: u64,
    pub docs: u64,
    pub positions: u64,
    pub advances: u64,
    pub reused_enums: u64,
    pub term_state_seeks: u64,
    pub term_states_saved: u64,
    pub repeat_enums: u64,
    pub partial_doc_consumes: u64,
    pub payload_checks: u64,
    pub offset_checks: u64,
    pub dictionary_probes: u64,
    /// Builds performed for this report, when it covers a whole test.
    #[serde(default)]
    pub builds: Vec<BuildReport>,
}

impl TrialReport {
    pub fn merge(&mut self, other: TrialReport) {
        self.passes += other.passes;
        self.workers += other.workers;
        self.terms += other.terms;
        self.enums += other.enums;
        self.docs += other.docs;
        self.positions += other.positions;
        self.advances += other.advances;
        self.reused_enums += other.reused_enums;
        self.term_state_seeks += other.term_state_seeks;
        self.term_states_saved += other.term_states_saved;
        self.repeat_enums += other.repeat_enums;
        self.partial_doc_consumes += other.partial_doc_consumes;
        self.payload_checks += other.payload_checks;
        self.offset_checks += other.offset_checks;
        self.dictionary_probes += other.dictionary_probes;
        self.builds.extend(other.builds);
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_counters() {
        let mut a = TrialReport {
            terms: 3,
            docs: 10,
            ..TrialReport::default()
        };
        a.merge(TrialReport {
            terms: 2,
            advances: 4,
            builds: vec![BuildReport::default()],
            ..TrialReport::default()
        });
        assert_eq!(a.terms, 5);
        assert_eq!(a.docs, 10);
        assert_eq!(a.advances, 4);
        assert_eq!(a.builds.len(), 1);
    }

    #[test]
    fn serializes_to_json() {
        let report = TrialReport {
            workers: 2,
            ..TrialReport::default()
        };
        let json = report.to_json().unwrap();
        let back: TrialReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Which behaviors a verification pass may exercise.

use std::fmt;

use crate::types::IndexOptions;

/// Set of trial behaviors, one bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrialOptions(pub(crate) u16);

impl TrialOptions {
    /// `advance` to known and random targets.
    pub const SKIPPING: u16 = 1 << 0;
    /// Hand the previous cursor back through `reuse`.
    pub const REUSE_ENUMS: u16 = 1 << 1;
    /// Sometimes pass the run's live docs.
    pub const LIVE_DOCS: u16 = 1 << 2;
    /// Save term states and seek through them later.
    pub const TERM_STATE: u16 = 1 << 3;
    /// Stop before the last doc.
    pub const PARTIAL_DOC_CONSUME: u16 = 1 << 4;
    /// Stop before the last position of a doc.
    pub const PARTIAL_POS_CONSUME: u16 = 1 << 5;
    /// Check payload bytes.
    pub const PAYLOADS: u16 = 1 << 6;
    /// Several workers against one reader.
    pub const THREADS: u16 = 1 << 7;

    const NAMES: [(u16, &'static str); 8] = [
        (Self::SKIPPING, "SKIPPING"),
        (Self::REUSE_ENUMS, "REUSE_ENUMS"),
        (Self::LIVE_DOCS, "LIVE_DOCS"),
        (Self::TERM_STATE, "TERM_STATE"),
        (Self::PARTIAL_DOC_CONSUME, "PARTIAL_DOC_CONSUME"),
        (Self::PARTIAL_POS_CONSUME, "PARTIAL_POS_CONSUME"),
        (Self::PAYLOADS, "PAYLOADS"),
        (Self::THREADS, "THREADS"),
    ];

    pub const ALL: TrialOptions = TrialOptions(0b1111_1111);
    pub const NONE: TrialOptions = TrialOptions(0);

    pub fn contains(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    pub fn with(self, bit: u16) -> Self {
        Self(self.0 | bit)
    }

    pub fn without(self, bit: u16) -> Self {
        Self(self.0 & !bit)
    }
}

impl Default for TrialOptions {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for TrialOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Everything one verification pass needs to know besides the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialSettings {
    pub options: TrialOptions,
    /// Highest level of detail to check.
    pub max_test_options: IndexOptions,
    /// Check everything, consume everything, skip half the time.
    pub always_test_max: bool,
}

impl TrialSettings {
    pub fn exhaustive(options: TrialOptions, max_test_options: IndexOptions) -> Self {
        Self {
            options,
            max_test_options,
            always_test_max: true,
        }
    }

    pub fn randomized(options: TrialOptions) -> Self {
        Self {
            options,
            max_test_options: IndexOptions::DocsAndFreqsAndPositionsAndOffsets,
            always_test_max: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_contains_every_option() {
        for (bit, _) in TrialOptions::NAMES {
            assert!(TrialOptions::ALL.contains(bit));
            assert!(!TrialOptions::NONE.contains(bit));
        }
    }

    #[test]
    fn without_removes_one_bit() {
        let opts = TrialOptions::ALL.without(TrialOptions::PAYLOADS);
        assert!(!opts.contains(TrialOptions::PAYLOADS));
        assert!(opts.contains(TrialOptions::THREADS));
        assert_eq!(opts.with(TrialOptions::PAYLOADS), TrialOptions::ALL);
    }

    #[test]
    fn display_lists_names() {
        let opts = TrialOptions::NONE.with(TrialOptions::SKIPPING).with(TrialOptions::THREADS);
        assert_eq!(opts.to_string(), "SKIPPING|THREADS");
        assert_eq!(TrialOptions::NONE.to_string(), "NONE");
    }
}

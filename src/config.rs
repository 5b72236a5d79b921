// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Run configuration and tuning knobs.
//!
//! The probabilities below bias generation and checking toward edge cases
//! (huge freqs, long posting lists, partial consumption). They are tuning, not
//! semantics: any valid setting must leave every check meaningful. Defaults
//! reproduce the classic distributions.
//!
//! Configuration comes from, in increasing precedence:
//! 1. `ConformanceConfig::default()`
//! 2. a JSON file named by `SOREX_CONFORMANCE_CONFIG`
//! 3. `SOREX_CONFORMANCE_SEED`, `SOREX_CONFORMANCE_MULTIPLIER`,
//!    `SOREX_CONFORMANCE_NIGHTLY`

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{ConformanceError, Result};

pub const ENV_SEED: &str = "SOREX_CONFORMANCE_SEED";
pub const ENV_MULTIPLIER: &str = "SOREX_CONFORMANCE_MULTIPLIER";
pub const ENV_NIGHTLY: &str = "SOREX_CONFORMANCE_NIGHTLY";
pub const ENV_CONFIG: &str = "SOREX_CONFORMANCE_CONFIG";

/// Seed used when neither the config nor the environment names one.
pub const DEFAULT_SEED: u64 = 0x5EED_0F50_4E78;

// ============================================================================
// TOP LEVEL
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConformanceConfig {
    /// Root seed. Every field, term, worker and test seed derives from it.
    pub seed: u64,
    /// Scales the doc-freq ranges of `big_`, `medium_` and `low_` terms.
    pub random_multiplier: u32,
    /// Enables the `big_` term class (tens of thousands of docs).
    pub nightly: bool,
    /// Build-and-verify rounds of `test_random`.
    pub random_iterations: u32,
    pub generation: GenerationTuning,
    pub term_classes: TermClassBounds,
    pub verification: VerificationTuning,
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            random_multiplier: 1,
            nightly: false,
            random_iterations: 5,
            generation: GenerationTuning::default(),
            term_classes: TermClassBounds::default(),
            verification: VerificationTuning::default(),
        }
    }
}

impl ConformanceConfig {
    /// Small universe for unit and integration tests.
    pub fn quick(seed: u64) -> Self {
        let mut config = Self {
            seed,
            random_iterations: 2,
            ..Self::default()
        };
        config.generation.max_fields = 3;
        config.generation.max_terms_per_field = 10;
        config.generation.many_terms_min = 30;
        config.term_classes.medium = DocFreqRange::new(100, 300);
        config.verification.max_threads = 3;
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Defaults, then the JSON file named by `SOREX_CONFORMANCE_CONFIG`, then
    /// the scalar overrides. Without an explicit seed a fresh one is drawn
    /// from the clock; it is logged so the run can be replayed.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(ENV_CONFIG) {
            Ok(path) => Self::from_json_file(Path::new(&path))?,
            Err(_) => Self {
                seed: clock_seed(),
                ..Self::default()
            },
        };

        if let Ok(raw) = std::env::var(ENV_SEED) {
            config.seed = parse_seed(&raw)?;
        }
        if let Ok(raw) = std::env::var(ENV_MULTIPLIER) {
            config.random_multiplier = raw.trim().parse().map_err(|_| {
                ConformanceError::Config(format!("{} is not a positive integer: {:?}", ENV_MULTIPLIER, raw))
            })?;
        }
        if let Ok(raw) = std::env::var(ENV_NIGHTLY) {
            config.nightly = matches!(raw.trim(), "1" | "true" | "yes" | "on");
        }

        config.validate()?;
        tracing::info!(
            seed = config.seed,
            multiplier = config.random_multiplier,
            nightly = config.nightly,
            "conformance configuration loaded"
        );
        Ok(config)
    }

    /// Reject settings that would make a draw impossible or a check vacuous.
    pub fn validate(&self) -> Result<()> {
        if self.random_multiplier == 0 {
            return Err(ConformanceError::Config("random_multiplier must be >= 1".into()));
        }
        if self.random_iterations == 0 {
            return Err(ConformanceError::Config("random_iterations must be >= 1".into()));
        }
        self.generation.validate()?;
        self.term_classes.validate()?;
        self.verification.validate()
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(DEFAULT_SEED)
}

/// Accepts decimal or `0x`-prefixed hex.
fn parse_seed(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| ConformanceError::Config(format!("{} is not a u64: {:?}", ENV_SEED, raw)))
}

fn check_odds(name: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(ConformanceError::Config(format!("{} must be >= 1", name)));
    }
    Ok(())
}

fn check_range(name: &str, min: u32, max: u32) -> Result<()> {
    if min > max {
        return Err(ConformanceError::Config(format!("{}: min {} > max {}", name, min, max)));
    }
    Ok(())
}

fn check_chance(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConformanceError::Config(format!("{} must lie in [0, 1], got {}", name, value)));
    }
    Ok(())
}

// ============================================================================
// GENERATION
// ============================================================================

/// Shape of the postings universe and of each term's posting list.
///
/// `*_one_in` fields are odds: `n` means "one chance in `n`".
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationTuning {
    pub min_fields: u32,
    pub max_fields: u32,
    pub min_terms_per_field: u32,
    pub max_terms_per_field: u32,
    /// Odds that a field gets at least `many_terms_min` terms.
    pub many_terms_one_in: u32,
    pub many_terms_min: u32,

    /// Upper bound of the per-term doc spacing draw (`1..=max`).
    pub max_doc_spacing: u32,
    pub large_freq_one_in: u32,
    pub large_freq_max: u32,
    pub medium_freq_one_in: u32,
    pub medium_freq_max: u32,
    pub small_freq_max: u32,
    /// Upper bound of the per-doc position spacing draw (`1..=max`).
    pub max_pos_spacing: u32,

    pub big_payload_one_in: u32,
    pub big_payload_max: u32,
    pub small_payload_max: u32,

    /// Start offset advances by a draw from `0..start_offset_gap`.
    pub start_offset_gap: u32,
    /// End offset is start plus a draw from `0..offset_length`.
    pub offset_length: u32,
}

impl Default for GenerationTuning {
    fn default() -> Self {
        Self {
            min_fields: 1,
            max_fields: 5,
            min_terms_per_field: 2,
            max_terms_per_field: 20,
            many_terms_one_in: 10,
            many_terms_min: 50,
            max_doc_spacing: 100,
            large_freq_one_in: 200,
            large_freq_max: 1000,
            medium_freq_one_in: 10,
            medium_freq_max: 20,
            small_freq_max: 4,
            max_pos_spacing: 100,
            big_payload_one_in: 10,
            big_payload_max: 3,
            small_payload_max: 1,
            start_offset_gap: 5,
            offset_length: 10,
        }
    }
}

impl GenerationTuning {
    fn validate(&self) -> Result<()> {
        check_range("fields", self.min_fields, self.max_fields)?;
        check_odds("min_fields", self.min_fields)?;
        check_range("terms_per_field", self.min_terms_per_field, self.max_terms_per_field)?;
        check_odds("min_terms_per_field", self.min_terms_per_field)?;
        check_odds("many_terms_one_in", self.many_terms_one_in)?;
        check_odds("max_doc_spacing", self.max_doc_spacing)?;
        check_odds("large_freq_one_in", self.large_freq_one_in)?;
        check_odds("large_freq_max", self.large_freq_max)?;
        check_odds("medium_freq_one_in", self.medium_freq_one_in)?;
        check_odds("medium_freq_max", self.medium_freq_max)?;
        check_odds("small_freq_max", self.small_freq_max)?;
        check_odds("max_pos_spacing", self.max_pos_spacing)?;
        check_odds("big_payload_one_in", self.big_payload_one_in)?;
        check_odds("big_payload_max", self.big_payload_max)?;
        check_odds("small_payload_max", self.small_payload_max)?;
        check_odds("start_offset_gap", self.start_offset_gap)?;
        check_odds("offset_length", self.offset_length)
    }
}

// ============================================================================
// TERM CLASSES
// ============================================================================

/// Inclusive doc-freq range.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocFreqRange {
    pub min: u32,
    pub max: u32,
}

impl DocFreqRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn scaled(self, multiplier: u32) -> Self {
        Self {
            min: self.min.saturating_mul(multiplier),
            max: self.max.saturating_mul(multiplier),
        }
    }
}

/// Term class prefix, as generated by the universe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermClass {
    Big,
    Medium,
    Low,
    VeryLow,
}

impl TermClass {
    pub fn prefix(self) -> &'static str {
        match self {
            TermClass::Big => "big_",
            TermClass::Medium => "medium_",
            TermClass::Low => "low_",
            TermClass::VeryLow => "verylow_",
        }
    }

    /// Classify by prefix; anything unprefixed counts as very low.
    pub fn of(term: &[u8]) -> Self {
        [TermClass::Big, TermClass::Medium, TermClass::Low]
            .into_iter()
            .find(|class| term.starts_with(class.prefix().as_bytes()))
            .unwrap_or(TermClass::VeryLow)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TermClassBounds {
    pub big: DocFreqRange,
    pub medium: DocFreqRange,
    pub low: DocFreqRange,
    /// Never scaled by the multiplier.
    pub very_low: DocFreqRange,
}

impl Default for TermClassBounds {
    fn default() -> Self {
        Self {
            big: DocFreqRange::new(50_000, 70_000),
            medium: DocFreqRange::new(3_000, 6_000),
            low: DocFreqRange::new(1, 40),
            very_low: DocFreqRange::new(1, 3),
        }
    }
}

impl TermClassBounds {
    pub fn bounds_for(&self, term: &[u8], multiplier: u32) -> DocFreqRange {
        match TermClass::of(term) {
            TermClass::Big => self.big.scaled(multiplier),
            TermClass::Medium => self.medium.scaled(multiplier),
            TermClass::Low => self.low.scaled(multiplier),
            TermClass::VeryLow => self.very_low,
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, range) in [
            ("term_classes.big", self.big),
            ("term_classes.medium", self.medium),
            ("term_classes.low", self.low),
            ("term_classes.very_low", self.very_low),
        ] {
            check_range(name, range.min, range.max)?;
            check_odds(name, range.min)?;
        }
        Ok(())
    }
}

// ============================================================================
// VERIFICATION
// ============================================================================

/// Odds and chances that pick the consumption pattern of each trial.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerificationTuning {
    /// Chance that freqs/positions/offsets/payloads are checked at all in a
    /// trial (when the field and test level allow it).
    pub detail_check_chance: f64,
    /// Odds of pulling a positions cursor without checking positions.
    pub positions_enum_for_docs_one_in: u32,
    /// Chance that a trial hands its previous cursor back for reuse.
    pub reuse_chance: f64,
    pub partial_doc_one_in: u32,
    pub partial_pos_one_in: u32,
    pub all_skipping_one_in: u32,
    pub max_skips: u32,
    pub term_state_use_one_in: u32,
    pub term_state_save_one_in: u32,
    /// Odds of pulling a second cursor from the same positioned term.
    pub repeat_enum_one_in: u32,
    pub min_threads: u32,
    pub max_threads: u32,
    /// Random `seek_ceil` probes per field in the dictionary walk.
    pub seek_ceil_probes: u32,
}

impl Default for VerificationTuning {
    fn default() -> Self {
        Self {
            detail_check_chance: 2.0 / 3.0,
            positions_enum_for_docs_one_in: 10,
            reuse_chance: 0.9,
            partial_doc_one_in: 10,
            partial_pos_one_in: 5,
            all_skipping_one_in: 7,
            max_skips: 20,
            term_state_use_one_in: 5,
            term_state_save_one_in: 5,
            repeat_enum_one_in: 10,
            min_threads: 2,
            max_threads: 5,
            seek_ceil_probes: 16,
        }
    }
}

impl VerificationTuning {
    fn validate(&self) -> Result<()> {
        check_chance("detail_check_chance", self.detail_check_chance)?;
        check_chance("reuse_chance", self.reuse_chance)?;
        check_odds("positions_enum_for_docs_one_in", self.positions_enum_for_docs_one_in)?;
        check_odds("partial_doc_one_in", self.partial_doc_one_in)?;
        check_odds("partial_pos_one_in", self.partial_pos_one_in)?;
        check_odds("all_skipping_one_in", self.all_skipping_one_in)?;
        check_odds("max_skips", self.max_skips)?;
        check_odds("term_state_use_one_in", self.term_state_use_one_in)?;
        check_odds("term_state_save_one_in", self.term_state_save_one_in)?;
        check_odds("repeat_enum_one_in", self.repeat_enum_one_in)?;
        check_range("threads", self.min_threads, self.max_threads)?;
        check_odds("min_threads", self.min_threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ConformanceConfig::default().validate().unwrap();
        ConformanceConfig::quick(1).validate().unwrap();
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = ConformanceConfig::from_json_str(r#"{"seed": 7, "generation": {"max_doc_spacing": 1}}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.generation.max_doc_spacing, 1);
        assert_eq!(config.generation.large_freq_max, 1000);
        assert_eq!(config.verification, VerificationTuning::default());
    }

    #[test]
    fn json_round_trips() {
        let config = ConformanceConfig::quick(99);
        let back = ConformanceConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let mut config = ConformanceConfig::default();
        config.term_classes.low = DocFreqRange::new(10, 2);
        assert!(matches!(config.validate(), Err(ConformanceError::Config(_))));

        let mut config = ConformanceConfig::default();
        config.verification.min_threads = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_odds_are_rejected() {
        let mut config = ConformanceConfig::default();
        config.generation.large_freq_one_in = 0;
        assert!(config.validate().is_err());

        let mut config = ConformanceConfig::default();
        config.verification.reuse_chance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn term_classes_follow_prefixes() {
        let bounds = TermClassBounds::default();
        assert_eq!(bounds.bounds_for(b"big_abc", 2), DocFreqRange::new(100_000, 140_000));
        assert_eq!(bounds.bounds_for(b"medium_x", 1), DocFreqRange::new(3_000, 6_000));
        assert_eq!(bounds.bounds_for(b"low_x", 3), DocFreqRange::new(3, 120));
        assert_eq!(bounds.bounds_for(b"verylow_x", 3), DocFreqRange::new(1, 3));
        assert_eq!(TermClass::of(b"plain"), TermClass::VeryLow);
    }

    #[test]
    fn seeds_parse_in_hex_and_decimal() {
        assert_eq!(parse_seed("42").unwrap(), 42);
        assert_eq!(parse_seed(" 0xff ").unwrap(), 255);
        assert!(parse_seed("nope").is_err());
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Build-and-verify runs against one postings format.
//!
//! The universe is generated once per suite and shared by every test. Each
//! test builds its own segment in its own temporary directory, which is
//! removed when the test returns, whether it passed or not.

use super::options::{TrialOptions, TrialSettings};
use super::report::TrialReport;
use super::verifier::Verifier;
use crate::build::{build_index, BuildOptions};
use crate::config::ConformanceConfig;
use crate::error::Result;
use crate::model::PostingsUniverse;
use crate::postings::{Fields, PostingsFormat};
use crate::types::IndexOptions;
use crate::util::rng::{derive_seed, derive_seed_from_label};
use crate::util::DeterministicRng;

/// Conformance tests for one postings format.
pub struct ConformanceSuite<P> {
    format: P,
    config: ConformanceConfig,
    universe: PostingsUniverse,
}

impl<P: PostingsFormat> ConformanceSuite<P> {
    pub fn new(format: P, config: ConformanceConfig) -> Result<Self> {
        config.validate()?;
        let caps = format.capabilities();
        let universe = PostingsUniverse::generate(&config, caps.accepts_large_values);
        tracing::debug!(
            format = format.name(),
            max_options = %caps.max_index_options,
            payloads = caps.supports_payloads,
            large_values = caps.accepts_large_values,
            "conformance suite ready"
        );
        Ok(Self {
            format,
            config,
            universe,
        })
    }

    /// Configuration from `SOREX_CONFORMANCE_*`.
    pub fn from_env(format: P) -> Result<Self> {
        Self::new(format, ConformanceConfig::from_env()?)
    }

    pub fn universe(&self) -> &PostingsUniverse {
        &self.universe
    }

    pub fn config(&self) -> &ConformanceConfig {
        &self.config
    }

    pub fn format(&self) -> &P {
        &self.format
    }

    pub fn test_docs_only(&self) -> Result<TrialReport> {
        self.test_full("docs_only", IndexOptions::DocsOnly, false)
    }

    pub fn test_docs_and_freqs(&self) -> Result<TrialReport> {
        self.test_full("docs_and_freqs", IndexOptions::DocsAndFreqs, false)
    }

    pub fn test_docs_and_freqs_and_positions(&self) -> Result<TrialReport> {
        self.test_full("docs_and_freqs_and_positions", IndexOptions::DocsAndFreqsAndPositions, false)
    }

    pub fn test_docs_and_freqs_and_positions_and_payloads(&self) -> Result<TrialReport> {
        self.test_full(
            "docs_and_freqs_and_positions_and_payloads",
            IndexOptions::DocsAndFreqsAndPositions,
            true,
        )
    }

    pub fn test_docs_and_freqs_and_positions_and_offsets(&self) -> Result<TrialReport> {
        self.test_full(
            "docs_and_freqs_and_positions_and_offsets",
            IndexOptions::DocsAndFreqsAndPositionsAndOffsets,
            false,
        )
    }

    pub fn test_docs_and_freqs_and_positions_and_offsets_and_payloads(&self) -> Result<TrialReport> {
        self.test_full(
            "docs_and_freqs_and_positions_and_offsets_and_payloads",
            IndexOptions::DocsAndFreqsAndPositionsAndOffsets,
            true,
        )
    }

    /// Random levels and payloads per field, randomized trials.
    pub fn test_random(&self) -> Result<TrialReport> {
        let seed = derive_seed_from_label(self.config.seed, "random");
        let mut rng = DeterministicRng::new(seed);
        let mut report = TrialReport::default();

        for iteration in 0..self.config.random_iterations {
            let dir = run_dir("random")?;
            let options = BuildOptions::random(rng.next_bool());
            let built = build_index(&self.format, &self.universe, dir.path(), options, &mut rng)?;
            let build_report = built.report.clone();

            let verifier = Verifier::from_built(&self.universe, built)?;
            verifier.check_fields()?;
            let pass_seed = derive_seed(seed, u64::from(iteration) + 1);
            report.merge(verifier.test_terms(TrialSettings::randomized(TrialOptions::ALL), pass_seed)?);
            report.builds.push(build_report);
            tracing::debug!(iteration, path = %dir.path().display(), "random iteration complete");
        }
        tracing::info!(
            format = self.format.name(),
            iterations = self.config.random_iterations,
            terms = report.terms,
            docs = report.docs,
            "random test passed"
        );
        Ok(report)
    }

    /// Every test above, in order. Stops at the first failure.
    pub fn run_all(&self) -> Result<TrialReport> {
        let mut report = TrialReport::default();
        report.merge(self.test_docs_only()?);
        report.merge(self.test_docs_and_freqs()?);
        report.merge(self.test_docs_and_freqs_and_positions()?);
        report.merge(self.test_docs_and_freqs_and_positions_and_payloads()?);
        report.merge(self.test_docs_and_freqs_and_positions_and_offsets()?);
        report.merge(self.test_docs_and_freqs_and_positions_and_offsets_and_payloads()?);
        report.merge(self.test_random()?);
        Ok(report)
    }

    /// Index every field at `level` (or the format's ceiling), then verify
    /// every level from DOCS_ONLY up to it with all trial options.
    fn test_full(&self, label: &str, level: IndexOptions, payloads: bool) -> Result<TrialReport> {
        let seed = derive_seed_from_label(self.config.seed, label);
        let mut rng = DeterministicRng::new(seed);
        let dir = run_dir(label)?;

        let built = build_index(
            &self.format,
            &self.universe,
            dir.path(),
            BuildOptions::full(level, payloads),
            &mut rng,
        )?;
        let build_report = built.report.clone();
        let verifier = Verifier::from_built(&self.universe, built)?;

        let mut report = self.verify_full(&verifier, seed, level, payloads)?;
        report.builds.push(build_report);
        tracing::info!(
            format = self.format.name(),
            test = label,
            seed,
            passes = report.passes,
            terms = report.terms,
            docs = report.docs,
            positions = report.positions,
            "test passed"
        );
        Ok(report)
    }

    fn verify_full<F: Fields + Clone>(
        &self,
        verifier: &Verifier<'_, F>,
        seed: u64,
        level: IndexOptions,
        payloads: bool,
    ) -> Result<TrialReport> {
        verifier.check_fields()?;
        let mut report = verifier.verify_term_dictionary(derive_seed(seed, 0))?;

        let mut pass = 1;
        for &test_level in level.up_to() {
            report.merge(verifier.test_terms(TrialSettings::exhaustive(TrialOptions::ALL, test_level), derive_seed(seed, pass))?);
            pass += 1;
            if payloads {
                let options = TrialOptions::ALL.without(TrialOptions::PAYLOADS);
                report.merge(verifier.test_terms(TrialSettings::exhaustive(options, test_level), derive_seed(seed, pass))?);
                pass += 1;
            }
        }
        Ok(report)
    }
}

fn run_dir(label: &str) -> Result<tempfile::TempDir> {
    let dir = tempfile::Builder::new()
        .prefix(&format!("sorex-conformance-{}-", label))
        .tempdir()?;
    tracing::debug!(path = %dir.path().display(), "created run directory");
    Ok(dir)
}

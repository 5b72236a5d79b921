// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Conformance verifier.
//!
//! ```text
//! ConformanceSuite ──build_index──▶ BuiltIndex ──▶ Verifier
//!                                                    │
//!                         ┌──────────────────────────┼──────────────────┐
//!                         ▼                          ▼                  ▼
//!                   check_fields        verify_term_dictionary     test_terms
//!                                                              (1..n workers,
//!                                                               WorkerContext each)
//! ```
//!
//! A failure anywhere aborts the run with the seed needed to replay it.

mod context;
mod options;
mod report;
mod suite;
mod verifier;

pub use context::WorkerContext;
pub use options::{TrialOptions, TrialSettings};
pub use report::TrialReport;
pub use suite::ConformanceSuite;
pub use verifier::Verifier;

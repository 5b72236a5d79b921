// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Conformance harness for postings formats.
//!
//! A postings format is checked by writing a seed-determined universe of
//! terms through its write API, reopening the result, and walking every term
//! with randomly combined cursor modes (skipping, reuse, live docs, term
//! states, partial consumption, several threads) while comparing each value
//! with a fresh replay of the reference model.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │    model     │────▶│    build     │────▶│   conformance    │
//! │ (SeedPostings│     │ (build_index)│     │ (Verifier, Suite)│
//! │  Universe)   │     │              │     │                  │
//! └──────────────┘     └──────────────┘     └──────────────────┘
//!        │                    │                      │
//!        │                    ▼                      ▼
//!        │            ┌──────────────────────────────────────┐
//!        │            │  postings (traits)  ◀── binary (SUT) │
//!        │            │  verify (contract-checking wrappers) │
//!        │            └──────────────────────────────────────┘
//!        ▼
//!   expected values, replayed per trial
//! ```
//!
//! | Module        | Role                                             |
//! |---------------|--------------------------------------------------|
//! | `types`       | doc ids, sentinels, index options, statistics    |
//! | `postings`    | read/write API every format implements           |
//! | `model`       | reference postings, deterministic from seeds     |
//! | `verify`      | stateful wrappers that reject illegal call orders|
//! | `binary`      | bundled block postings format                    |
//! | `build`       | universe → written and reopened segment          |
//! | `conformance` | trials, workers, per-level tests                 |
//!
//! # Usage
//!
//! ```no_run
//! use sorex_conformance::{BlockPostingsFormat, ConformanceConfig, ConformanceSuite};
//!
//! let suite = ConformanceSuite::new(BlockPostingsFormat::new(), ConformanceConfig::quick(42))?;
//! let report = suite.run_all()?;
//! println!("{}", report.to_json()?);
//! # Ok::<(), sorex_conformance::ConformanceError>(())
//! ```
//!
//! A failure is either a [`ConformanceError::ContractViolation`] or a
//! [`ConformanceError::Mismatch`]; the latter carries the seed that replays
//! the failing trial.

pub mod binary;
pub mod build;
pub mod config;
pub mod conformance;
pub mod error;
pub mod model;
pub mod postings;
pub mod types;
pub mod util;
pub mod verify;

#[doc(hidden)]
pub mod testing;

pub use binary::BlockPostingsFormat;
pub use build::{build_index, BuildOptions, BuildReport, BuiltIndex};
pub use config::{ConformanceConfig, GenerationTuning, TermClassBounds, VerificationTuning};
pub use conformance::{ConformanceSuite, TrialOptions, TrialReport, TrialSettings, Verifier, WorkerContext};
pub use error::{ConformanceError, Result};
pub use model::{FieldAndTerm, PostingsUniverse, SeedPostings};
pub use postings::{
    DocsAndPositionsEnum, DocsEnum, Fields, FieldsConsumer, FormatCapabilities, IndexReader, PostingsFormat,
    SegmentInfo, SegmentReader, Terms, TermsEnum,
};
pub use types::{
    DocId, DocsFlags, FieldInfo, FieldInfos, FieldStats, IndexOptions, PositionsFlags, Posting, SeekStatus,
    TermStats, DOC_BEFORE_START, NO_MORE_DOCS, NO_MORE_ORDS,
};
pub use util::{DeterministicRng, LiveDocs};

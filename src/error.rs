// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for conformance runs.
//!
//! Every variant is fatal for the run that produced it. A mismatch carries the
//! term seed so the failing trial can be replayed in isolation.

use std::io;

use thiserror::Error;

use crate::types::IndexOptions;

#[derive(Error, Debug)]
pub enum ConformanceError {
    /// A cursor was driven outside the states in which the call is legal.
    #[error("contract violation: {call} in state {state}: {detail}")]
    ContractViolation {
        call: &'static str,
        state: String,
        detail: String,
    },

    /// The reader under test disagrees with the reference model.
    ///
    /// `seed` replays the worker's trial sequence, `term_seed` the term's postings.
    #[error("mismatch at {field}:{term} (seed {seed}, term seed {term_seed}): {what} expected {expected}, got {actual}")]
    Mismatch {
        field: String,
        term: String,
        seed: u64,
        term_seed: u64,
        what: &'static str,
        expected: String,
        actual: String,
    },

    /// The format cannot represent the requested option level.
    #[error("format {format} cannot store {requested}")]
    UnsupportedOption {
        format: String,
        requested: IndexOptions,
    },

    #[error("I/O error: {0}")]
    Resource(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for conformance operations.
pub type Result<T> = std::result::Result<T, ConformanceError>;

impl ConformanceError {
    pub fn violation(call: &'static str, state: impl ToString, detail: impl Into<String>) -> Self {
        ConformanceError::ContractViolation {
            call,
            state: state.to_string(),
            detail: detail.into(),
        }
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ConformanceError::ContractViolation { .. })
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, ConformanceError::Mismatch { .. })
    }

    /// Seed that reproduces the failing trial, when the error carries one.
    pub fn replay_seed(&self) -> Option<u64> {
        match self {
            ConformanceError::Mismatch { seed, .. } => Some(*seed),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConformanceError {
    fn from(err: serde_json::Error) -> Self {
        ConformanceError::Config(err.to_string())
    }
}

/// Shorthand for decode failures in the bundled store.
pub(crate) fn corrupt(msg: impl Into<String>) -> ConformanceError {
    ConformanceError::Resource(io::Error::new(io::ErrorKind::InvalidData, msg.into()))
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Contract-enforcing decorators.
//!
//! Each wrapper sits in front of a concrete implementation, passes every
//! value through unchanged, and turns an illegal call sequence into a
//! [`ContractViolation`](crate::ConformanceError::ContractViolation) at the
//! call that caused it.
//!
//! - `docs`: doc and position cursors (START / ITERATING / FINISHED)
//! - `terms`: fields, terms and the term cursor (INITIAL / POSITIONED / UNPOSITIONED)
//! - `reader`: segment counters, live docs, doc values
//! - `consumer`: the streaming write protocol and its statistics
//!
//! Wrapping is cheap, so the verifier wraps unconditionally. A reused cursor
//! is unwrapped statically through `into_inner` before it reaches the
//! implementation.

mod consumer;
mod docs;
mod reader;
mod terms;

pub use consumer::AssertingFieldsConsumer;
pub use docs::{AssertingDocsEnum, AssertingPositionsEnum, DocsEnumState};
pub use reader::{
    AssertingBinaryDocValues, AssertingLiveDocs, AssertingNumericDocValues, AssertingReader,
    AssertingSortedDocValues, AssertingSortedSetDocValues,
};
pub use terms::{AssertingFields, AssertingTerms, AssertingTermsEnum, TermsEnumState};

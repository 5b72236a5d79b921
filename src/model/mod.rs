// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Reference posting model.
//!
//! The ground truth every reader is compared against. Nothing here touches a
//! storage format: postings are pure functions of their seeds.

mod seed;
mod universe;

pub use seed::SeedPostings;
pub use universe::{FieldAndTerm, PostingsUniverse};

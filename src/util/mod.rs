// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Small building blocks: the explicit seeded generator and the live-docs mask.

pub mod live_docs;
pub mod rng;

pub use live_docs::LiveDocs;
pub use rng::DeterministicRng;

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Contract-checking wrappers for doc and position cursors.
//!
//! ```text
//!            next_doc/advance            returns NO_MORE_DOCS
//!   START ─────────────────────▶ ITERATING ─────────────────▶ FINISHED
//!                                  │    ▲
//!                                  └────┘ next_doc/advance
//! ```
//!
//! - `next_doc`/`advance` after FINISHED is a violation
//! - `freq` is only legal in ITERATING
//! - every returned doc is strictly greater than the previous one
//! - `advance(target)` needs `target > doc` and returns a doc `>= target`
//!
//! Positions add a per-doc counter: at most `freq` calls to `next_position`,
//! and offsets/payloads only after the first of them.

use std::fmt;

use crate::error::{ConformanceError, Result};
use crate::postings::{DocsAndPositionsEnum, DocsEnum};
use crate::types::{DocId, DOC_BEFORE_START, NO_MORE_DOCS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocsEnumState {
    Start,
    Iterating,
    Finished,
}

impl fmt::Display for DocsEnumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocsEnumState::Start => "START",
            DocsEnumState::Iterating => "ITERATING",
            DocsEnumState::Finished => "FINISHED",
        })
    }
}

/// State machine shared by the docs and positions wrappers.
#[derive(Debug, Clone)]
struct DocsTracker {
    state: DocsEnumState,
    doc: DocId,
}

impl DocsTracker {
    fn new(call: &'static str, initial_doc: DocId) -> Result<Self> {
        if initial_doc != DOC_BEFORE_START {
            return Err(ConformanceError::violation(
                call,
                DocsEnumState::Start,
                format!("invalid initial doc id {}", initial_doc),
            ));
        }
        Ok(Self {
            state: DocsEnumState::Start,
            doc: DOC_BEFORE_START,
        })
    }

    fn before_next(&self) -> Result<()> {
        if self.state == DocsEnumState::Finished {
            return Err(ConformanceError::violation(
                "next_doc",
                self.state,
                "called after NO_MORE_DOCS",
            ));
        }
        Ok(())
    }

    fn before_advance(&self, target: DocId) -> Result<()> {
        if self.state == DocsEnumState::Finished {
            return Err(ConformanceError::violation(
                "advance",
                self.state,
                "called after NO_MORE_DOCS",
            ));
        }
        if target <= self.doc {
            return Err(ConformanceError::violation(
                "advance",
                self.state,
                format!("target must be > doc id, got {} <= {}", target, self.doc),
            ));
        }
        Ok(())
    }

    /// Record the doc a move returned and cross-check `doc_id()`.
    fn after_move(&mut self, call: &'static str, returned: DocId, reported: DocId) -> Result<()> {
        if returned <= self.doc {
            return Err(ConformanceError::violation(
                call,
                self.state,
                format!("backwards {} from {} to {}", call, self.doc, returned),
            ));
        }
        if reported != returned {
            return Err(ConformanceError::violation(
                call,
                self.state,
                format!("returned {} but doc_id() reports {}", returned, reported),
            ));
        }
        self.doc = returned;
        self.state = if returned == NO_MORE_DOCS {
            DocsEnumState::Finished
        } else {
            DocsEnumState::Iterating
        };
        Ok(())
    }

    fn require_iterating(&self, call: &'static str, subject: &str) -> Result<()> {
        match self.state {
            DocsEnumState::Iterating => Ok(()),
            DocsEnumState::Start => Err(ConformanceError::violation(
                call,
                self.state,
                format!("{} called before next_doc/advance", subject),
            )),
            DocsEnumState::Finished => Err(ConformanceError::violation(
                call,
                self.state,
                format!("{} called after NO_MORE_DOCS", subject),
            )),
        }
    }

    fn check_freq(&self, freq: u32) -> Result<u32> {
        if freq == 0 {
            return Err(ConformanceError::violation(
                "freq",
                self.state,
                format!("freq must be > 0 at doc {}", self.doc),
            ));
        }
        Ok(freq)
    }
}

// ============================================================================
// DOCS
// ============================================================================

/// Wraps a docs cursor and checks every call against the state machine.
#[derive(Debug)]
pub struct AssertingDocsEnum<D> {
    inner: D,
    tracker: DocsTracker,
}

impl<D: DocsEnum> AssertingDocsEnum<D> {
    /// Fails if `inner` is not positioned before its first doc.
    pub fn new(inner: D) -> Result<Self> {
        let tracker = DocsTracker::new("docs", inner.doc_id())?;
        Ok(Self { inner, tracker })
    }

    pub fn state(&self) -> DocsEnumState {
        self.tracker.state
    }

    /// The wrapped cursor, for handing back as `reuse`.
    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: DocsEnum> DocsEnum for AssertingDocsEnum<D> {
    fn doc_id(&self) -> DocId {
        self.inner.doc_id()
    }

    fn freq(&self) -> Result<u32> {
        self.tracker.require_iterating("freq", "freq")?;
        let freq = self.inner.freq()?;
        self.tracker.check_freq(freq)
    }

    fn next_doc(&mut self) -> Result<DocId> {
        self.tracker.before_next()?;
        let doc = self.inner.next_doc()?;
        self.tracker.after_move("next_doc", doc, self.inner.doc_id())?;
        Ok(doc)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.tracker.before_advance(target)?;
        let doc = self.inner.advance(target)?;
        if doc < target {
            return Err(ConformanceError::violation(
                "advance",
                self.tracker.state,
                format!("backwards advance from target {} to {}", target, doc),
            ));
        }
        self.tracker.after_move("advance", doc, self.inner.doc_id())?;
        Ok(doc)
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }
}

// ============================================================================
// POSITIONS
// ============================================================================

/// Docs wrapper plus the per-document position counter.
#[derive(Debug)]
pub struct AssertingPositionsEnum<P> {
    inner: P,
    tracker: DocsTracker,
    position_count: u32,
    position_max: u32,
}

impl<P: DocsAndPositionsEnum> AssertingPositionsEnum<P> {
    pub fn new(inner: P) -> Result<Self> {
        let tracker = DocsTracker::new("docs_and_positions", inner.doc_id())?;
        Ok(Self {
            inner,
            tracker,
            position_count: 0,
            position_max: 0,
        })
    }

    pub fn state(&self) -> DocsEnumState {
        self.tracker.state
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    fn start_doc(&mut self) -> Result<()> {
        self.position_count = 0;
        self.position_max = if self.tracker.state == DocsEnumState::Iterating {
            self.tracker.check_freq(self.inner.freq()?)?
        } else {
            0
        };
        Ok(())
    }

    fn require_position(&self, call: &'static str) -> Result<()> {
        self.tracker.require_iterating(call, call)?;
        if self.position_count == 0 {
            return Err(ConformanceError::violation(
                call,
                self.tracker.state,
                format!("{} called before next_position", call),
            ));
        }
        Ok(())
    }
}

impl<P: DocsAndPositionsEnum> DocsEnum for AssertingPositionsEnum<P> {
    fn doc_id(&self) -> DocId {
        self.inner.doc_id()
    }

    fn freq(&self) -> Result<u32> {
        self.tracker.require_iterating("freq", "freq")?;
        let freq = self.inner.freq()?;
        self.tracker.check_freq(freq)
    }

    fn next_doc(&mut self) -> Result<DocId> {
        self.tracker.before_next()?;
        let doc = self.inner.next_doc()?;
        self.tracker.after_move("next_doc", doc, self.inner.doc_id())?;
        self.start_doc()?;
        Ok(doc)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.tracker.before_advance(target)?;
        let doc = self.inner.advance(target)?;
        if doc < target {
            return Err(ConformanceError::violation(
                "advance",
                self.tracker.state,
                format!("backwards advance from target {} to {}", target, doc),
            ));
        }
        self.tracker.after_move("advance", doc, self.inner.doc_id())?;
        self.start_doc()?;
        Ok(doc)
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }
}

impl<P: DocsAndPositionsEnum> DocsAndPositionsEnum for AssertingPositionsEnum<P> {
    fn next_position(&mut self) -> Result<i32> {
        self.tracker.require_iterating("next_position", "next_position")?;
        if self.position_count >= self.position_max {
            return Err(ConformanceError::violation(
                "next_position",
                self.tracker.state,
                format!("called more than freq ({}) times", self.position_max),
            ));
        }
        let position = self.inner.next_position()?;
        if position < -1 {
            return Err(ConformanceError::violation(
                "next_position",
                self.tracker.state,
                format!("invalid position {}", position),
            ));
        }
        self.position_count += 1;
        Ok(position)
    }

    fn start_offset(&self) -> Result<i32> {
        self.require_position("start_offset")?;
        self.inner.start_offset()
    }

    fn end_offset(&self) -> Result<i32> {
        self.require_position("end_offset")?;
        self.inner.end_offset()
    }

    fn payload(&self) -> Result<Option<&[u8]>> {
        self.require_position("payload")?;
        let payload = self.inner.payload()?;
        if payload.is_some_and(<[u8]>::is_empty) {
            return Err(ConformanceError::violation(
                "payload",
                self.tracker.state,
                "returned an empty payload instead of None",
            ));
        }
        Ok(payload)
    }
}

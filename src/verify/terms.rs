// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Contract-checking wrappers for the term dictionary.
//!
//! ```text
//!            next/seek hit               next → None, seek miss
//!  INITIAL ────────────────▶ POSITIONED ───────────────────────▶ UNPOSITIONED
//!                              ▲                                      │
//!                              └───────────── seek hit ───────────────┘
//! ```
//!
//! `term`, `ord`, `doc_freq`, `total_term_freq`, `term_state` and the cursor
//! factories are only legal while POSITIONED. `next` on an UNPOSITIONED enum
//! is a violation: it already reported the end.

use std::fmt;

use super::docs::{AssertingDocsEnum, AssertingPositionsEnum};
use crate::error::{ConformanceError, Result};
use crate::postings::{Fields, Terms, TermsEnum};
use crate::types::{term_display, DocsFlags, IndexOptions, PositionsFlags, SeekStatus};
use crate::util::LiveDocs;

// ============================================================================
// FIELDS / TERMS
// ============================================================================

/// Hands out [`AssertingTerms`] for every field.
#[derive(Debug, Clone)]
pub struct AssertingFields<F> {
    inner: F,
}

impl<F: Fields> AssertingFields<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: Fields> Fields for AssertingFields<F> {
    type Terms = AssertingTerms<F::Terms>;

    fn field_names(&self) -> Vec<String> {
        self.inner.field_names()
    }

    fn terms(&self, field: &str) -> Result<Option<Self::Terms>> {
        self.inner.terms(field)?.map(AssertingTerms::new).transpose()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }
}

/// Checks field statistics once and wraps every term cursor.
#[derive(Debug, Clone)]
pub struct AssertingTerms<T> {
    inner: T,
}

impl<T: Terms> AssertingTerms<T> {
    pub fn new(inner: T) -> Result<Self> {
        let sum_doc_freq = inner.sum_doc_freq();
        let doc_count = u64::from(inner.doc_count());
        if sum_doc_freq < doc_count {
            return Err(ConformanceError::violation(
                "terms",
                "OPEN",
                format!("sum_doc_freq {} < doc_count {}", sum_doc_freq, doc_count),
            ));
        }
        match (inner.index_options().has_freqs(), inner.sum_total_term_freq()) {
            (true, Some(sum_ttf)) if sum_ttf < sum_doc_freq => {
                return Err(ConformanceError::violation(
                    "terms",
                    "OPEN",
                    format!("sum_total_term_freq {} < sum_doc_freq {}", sum_ttf, sum_doc_freq),
                ));
            }
            (true, None) => {
                return Err(ConformanceError::violation(
                    "terms",
                    "OPEN",
                    "field stores freqs but reports no sum_total_term_freq",
                ));
            }
            (false, Some(sum_ttf)) => {
                return Err(ConformanceError::violation(
                    "terms",
                    "OPEN",
                    format!("docs-only field reports sum_total_term_freq {}", sum_ttf),
                ));
            }
            _ => {}
        }
        if inner.has_payloads() && !inner.index_options().has_positions() {
            return Err(ConformanceError::violation(
                "terms",
                "OPEN",
                "payloads without positions",
            ));
        }
        Ok(Self { inner })
    }
}

impl<T: Terms> Terms for AssertingTerms<T> {
    type Iter = AssertingTermsEnum<T::Iter>;

    fn iterator(&self) -> Result<Self::Iter> {
        Ok(AssertingTermsEnum::new(self.inner.iterator()?, self.inner.index_options()))
    }

    fn size(&self) -> Option<u64> {
        self.inner.size()
    }

    fn sum_total_term_freq(&self) -> Option<u64> {
        self.inner.sum_total_term_freq()
    }

    fn sum_doc_freq(&self) -> u64 {
        self.inner.sum_doc_freq()
    }

    fn doc_count(&self) -> u32 {
        self.inner.doc_count()
    }

    fn index_options(&self) -> IndexOptions {
        self.inner.index_options()
    }

    fn has_payloads(&self) -> bool {
        self.inner.has_payloads()
    }
}

// ============================================================================
// TERMS ENUM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermsEnumState {
    Initial,
    Positioned,
    Unpositioned,
}

impl fmt::Display for TermsEnumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TermsEnumState::Initial => "INITIAL",
            TermsEnumState::Positioned => "POSITIONED",
            TermsEnumState::Unpositioned => "UNPOSITIONED",
        })
    }
}

#[derive(Debug)]
pub struct AssertingTermsEnum<E> {
    inner: E,
    state: TermsEnumState,
    index_options: IndexOptions,
    /// Last term returned by `next`, cleared by any seek.
    last_next: Option<Vec<u8>>,
}

impl<E: TermsEnum> AssertingTermsEnum<E> {
    pub fn new(inner: E, index_options: IndexOptions) -> Self {
        Self {
            inner,
            state: TermsEnumState::Initial,
            index_options,
            last_next: None,
        }
    }

    pub fn state(&self) -> TermsEnumState {
        self.state
    }

    fn require_positioned(&self, call: &'static str) -> Result<()> {
        if self.state != TermsEnumState::Positioned {
            return Err(ConformanceError::violation(
                call,
                self.state,
                format!("{} called on unpositioned terms enum", call),
            ));
        }
        Ok(())
    }

    fn landed(&mut self, hit: bool) {
        self.last_next = None;
        self.state = if hit {
            TermsEnumState::Positioned
        } else {
            TermsEnumState::Unpositioned
        };
    }
}

impl<E: TermsEnum> TermsEnum for AssertingTermsEnum<E> {
    type State = E::State;
    type Docs = AssertingDocsEnum<E::Docs>;
    type Positions = AssertingPositionsEnum<E::Positions>;

    fn next(&mut self) -> Result<Option<&[u8]>> {
        if self.state == TermsEnumState::Unpositioned {
            return Err(ConformanceError::violation(
                "next",
                self.state,
                "next called on unpositioned terms enum",
            ));
        }
        let prev = self.last_next.take();
        match self.inner.next()? {
            None => {
                self.state = TermsEnumState::Unpositioned;
                Ok(None)
            }
            Some(term) => {
                if let Some(prev) = prev.as_deref() {
                    if term <= prev {
                        return Err(ConformanceError::violation(
                            "next",
                            self.state,
                            format!(
                                "terms out of order: {} after {}",
                                term_display(term),
                                term_display(prev)
                            ),
                        ));
                    }
                }
                self.state = TermsEnumState::Positioned;
                self.last_next = Some(term.to_vec());
                Ok(Some(term))
            }
        }
    }

    fn seek_ceil(&mut self, text: &[u8]) -> Result<SeekStatus> {
        let status = self.inner.seek_ceil(text)?;
        self.landed(status != SeekStatus::End);
        if status == SeekStatus::Found || status == SeekStatus::NotFound {
            // Ordering resumes from the landed term.
            self.last_next = Some(self.inner.term()?.to_vec());
            let landed = self.last_next.as_deref().unwrap_or_default();
            let ok = match status {
                SeekStatus::Found => landed == text,
                _ => landed > text,
            };
            if !ok {
                return Err(ConformanceError::violation(
                    "seek_ceil",
                    self.state,
                    format!(
                        "{:?} for {} landed on {}",
                        status,
                        term_display(text),
                        term_display(landed)
                    ),
                ));
            }
        }
        Ok(status)
    }

    fn seek_exact(&mut self, text: &[u8]) -> Result<bool> {
        let found = self.inner.seek_exact(text)?;
        self.landed(found);
        if found {
            self.last_next = Some(text.to_vec());
        }
        Ok(found)
    }

    fn seek_exact_ord(&mut self, ord: u64) -> Result<()> {
        self.inner.seek_exact_ord(ord)?;
        self.landed(true);
        self.last_next = Some(self.inner.term()?.to_vec());
        Ok(())
    }

    fn seek_exact_state(&mut self, text: &[u8], state: &Self::State) -> Result<()> {
        self.inner.seek_exact_state(text, state)?;
        self.landed(true);
        self.last_next = Some(text.to_vec());
        Ok(())
    }

    fn term(&self) -> Result<&[u8]> {
        self.require_positioned("term")?;
        self.inner.term()
    }

    fn ord(&self) -> Result<u64> {
        self.require_positioned("ord")?;
        self.inner.ord()
    }

    fn doc_freq(&self) -> Result<u32> {
        self.require_positioned("doc_freq")?;
        let doc_freq = self.inner.doc_freq()?;
        if doc_freq == 0 {
            return Err(ConformanceError::violation("doc_freq", self.state, "doc_freq must be > 0"));
        }
        Ok(doc_freq)
    }

    fn total_term_freq(&self) -> Result<Option<u64>> {
        self.require_positioned("total_term_freq")?;
        let ttf = self.inner.total_term_freq()?;
        if ttf.is_some() != self.index_options.has_freqs() {
            return Err(ConformanceError::violation(
                "total_term_freq",
                self.state,
                format!("reported {:?} for a {} field", ttf, self.index_options),
            ));
        }
        Ok(ttf)
    }

    fn term_state(&self) -> Result<Self::State> {
        self.require_positioned("term_state")?;
        self.inner.term_state()
    }

    fn docs(&self, live_docs: Option<&LiveDocs>, reuse: Option<Self::Docs>, flags: DocsFlags) -> Result<Self::Docs> {
        self.require_positioned("docs")?;
        let reuse = reuse.map(AssertingDocsEnum::into_inner);
        AssertingDocsEnum::new(self.inner.docs(live_docs, reuse, flags)?)
    }

    fn docs_and_positions(
        &self,
        live_docs: Option<&LiveDocs>,
        reuse: Option<Self::Positions>,
        flags: PositionsFlags,
    ) -> Result<Option<Self::Positions>> {
        self.require_positioned("docs_and_positions")?;
        let reuse = reuse.map(AssertingPositionsEnum::into_inner);
        match self.inner.docs_and_positions(live_docs, reuse, flags)? {
            Some(positions) => Ok(Some(AssertingPositionsEnum::new(positions)?)),
            None if self.index_options.has_positions() => Err(ConformanceError::violation(
                "docs_and_positions",
                self.state,
                format!("no positions cursor for a {} field", self.index_options),
            )),
            None => Ok(None),
        }
    }
}

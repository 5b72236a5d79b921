// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Write-side protocol checker.
//!
//! Wraps any [`FieldsConsumer`] and recomputes every statistic from what was
//! actually streamed, so `finish_term`/`finish_field` cannot drift from the
//! postings they summarise.

use std::fmt;

use roaring::RoaringBitmap;

use crate::error::{ConformanceError, Result};
use crate::postings::FieldsConsumer;
use crate::types::{term_display, DocId, FieldInfo, FieldStats, TermStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    /// Between fields.
    Idle,
    /// Inside a field, between terms.
    Field,
    /// Inside a term, between docs.
    Term,
    Doc,
}

impl fmt::Display for WriteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteState::Idle => "IDLE",
            WriteState::Field => "FIELD",
            WriteState::Term => "TERM",
            WriteState::Doc => "DOC",
        })
    }
}

#[derive(Debug, Default)]
struct TermAccumulator {
    text: Vec<u8>,
    doc_freq: u32,
    total_term_freq: u64,
    last_doc: Option<DocId>,
}

#[derive(Debug, Default)]
struct DocAccumulator {
    freq: u32,
    positions: u32,
    last_position: i32,
    last_start_offset: i32,
}

#[derive(Debug)]
pub struct AssertingFieldsConsumer<C> {
    inner: C,
    max_doc: u32,
    state: WriteState,
    field: Option<FieldInfo>,
    last_field: Option<String>,
    last_term: Option<Vec<u8>>,
    term: TermAccumulator,
    doc: DocAccumulator,
    sum_doc_freq: u64,
    sum_total_term_freq: u64,
    docs_seen: RoaringBitmap,
}

impl<C: FieldsConsumer> AssertingFieldsConsumer<C> {
    pub fn new(inner: C, max_doc: u32) -> Self {
        Self {
            inner,
            max_doc,
            state: WriteState::Idle,
            field: None,
            last_field: None,
            last_term: None,
            term: TermAccumulator::default(),
            doc: DocAccumulator::default(),
            sum_doc_freq: 0,
            sum_total_term_freq: 0,
            docs_seen: RoaringBitmap::new(),
        }
    }

    fn expect_state(&self, call: &'static str, expected: WriteState) -> Result<()> {
        if self.state != expected {
            return Err(ConformanceError::violation(
                call,
                self.state,
                format!("{} is only legal in state {}", call, expected),
            ));
        }
        Ok(())
    }

    fn fail(&self, call: &'static str, detail: String) -> ConformanceError {
        let field = self.field.as_ref().map_or("?", |f| f.name.as_str());
        ConformanceError::violation(
            call,
            self.state,
            format!("{}:{}: {}", field, term_display(&self.term.text), detail),
        )
    }

    fn current_field(&self, call: &'static str) -> Result<&FieldInfo> {
        self.field
            .as_ref()
            .ok_or_else(|| ConformanceError::violation(call, self.state, "no current field"))
    }
}

impl<C: FieldsConsumer> FieldsConsumer for AssertingFieldsConsumer<C> {
    fn start_field(&mut self, field: &FieldInfo) -> Result<()> {
        self.expect_state("start_field", WriteState::Idle)?;
        if let Some(last) = &self.last_field {
            if field.name.as_str() <= last.as_str() {
                return Err(ConformanceError::violation(
                    "start_field",
                    self.state,
                    format!("fields out of order: {} after {}", field.name, last),
                ));
            }
        }
        if field.has_payloads && !field.index_options.has_positions() {
            return Err(ConformanceError::violation(
                "start_field",
                self.state,
                format!("{} has payloads without positions", field.name),
            ));
        }
        self.inner.start_field(field)?;
        self.state = WriteState::Field;
        self.field = Some(field.clone());
        self.last_field = Some(field.name.clone());
        self.last_term = None;
        self.sum_doc_freq = 0;
        self.sum_total_term_freq = 0;
        self.docs_seen.clear();
        Ok(())
    }

    fn start_term(&mut self, text: &[u8]) -> Result<()> {
        self.expect_state("start_term", WriteState::Field)?;
        if let Some(last) = &self.last_term {
            if text <= last.as_slice() {
                return Err(self.fail(
                    "start_term",
                    format!("terms out of order: {} after {}", term_display(text), term_display(last)),
                ));
            }
        }
        self.inner.start_term(text)?;
        self.state = WriteState::Term;
        self.term = TermAccumulator {
            text: text.to_vec(),
            ..TermAccumulator::default()
        };
        Ok(())
    }

    fn start_doc(&mut self, doc: DocId, freq: Option<u32>) -> Result<()> {
        self.expect_state("start_doc", WriteState::Term)?;
        let has_freqs = self.current_field("start_doc")?.index_options.has_freqs();
        if doc < 0 || doc as u32 >= self.max_doc {
            return Err(self.fail("start_doc", format!("doc {} out of bounds [0, {})", doc, self.max_doc)));
        }
        if let Some(last) = self.term.last_doc {
            if doc <= last {
                return Err(self.fail("start_doc", format!("docs out of order: {} after {}", doc, last)));
            }
        }
        match freq {
            Some(0) => return Err(self.fail("start_doc", format!("freq 0 at doc {}", doc))),
            Some(_) if !has_freqs => {
                return Err(self.fail("start_doc", "freq passed for a field without freqs".to_string()))
            }
            None if has_freqs => return Err(self.fail("start_doc", "missing freq".to_string())),
            _ => {}
        }
        self.inner.start_doc(doc, freq)?;
        self.state = WriteState::Doc;
        self.term.last_doc = Some(doc);
        self.doc = DocAccumulator {
            freq: freq.unwrap_or(1),
            positions: 0,
            last_position: 0,
            last_start_offset: 0,
        };
        Ok(())
    }

    fn add_position(&mut self, position: i32, payload: Option<&[u8]>, start_offset: i32, end_offset: i32) -> Result<()> {
        self.expect_state("add_position", WriteState::Doc)?;
        let field = self.current_field("add_position")?;
        let options = field.index_options;
        let has_payloads = field.has_payloads;
        if !options.has_positions() {
            return Err(self.fail("add_position", "positions are not indexed".to_string()));
        }
        if self.doc.positions >= self.doc.freq {
            return Err(self.fail("add_position", format!("more than freq ({}) positions", self.doc.freq)));
        }
        if position < self.doc.last_position {
            return Err(self.fail(
                "add_position",
                format!("position {} after {}", position, self.doc.last_position),
            ));
        }
        if options.has_offsets() {
            if start_offset < self.doc.last_start_offset || end_offset < start_offset {
                return Err(self.fail(
                    "add_position",
                    format!(
                        "offsets [{}, {}) after start {}",
                        start_offset, end_offset, self.doc.last_start_offset
                    ),
                ));
            }
        } else if start_offset != -1 || end_offset != -1 {
            return Err(self.fail("add_position", "offsets passed for a field without offsets".to_string()));
        }
        match payload {
            Some(p) if !has_payloads => {
                return Err(self.fail("add_position", format!("{}-byte payload on a field without payloads", p.len())))
            }
            Some([]) => return Err(self.fail("add_position", "empty payload instead of None".to_string())),
            _ => {}
        }
        self.inner.add_position(position, payload, start_offset, end_offset)?;
        self.doc.positions += 1;
        self.doc.last_position = position;
        if options.has_offsets() {
            self.doc.last_start_offset = start_offset;
        }
        Ok(())
    }

    fn finish_doc(&mut self) -> Result<()> {
        self.expect_state("finish_doc", WriteState::Doc)?;
        let options = self.current_field("finish_doc")?.index_options;
        if options.has_positions() && self.doc.positions != self.doc.freq {
            return Err(self.fail(
                "finish_doc",
                format!("{} positions for freq {}", self.doc.positions, self.doc.freq),
            ));
        }
        self.inner.finish_doc()?;
        self.state = WriteState::Term;
        self.term.doc_freq += 1;
        self.term.total_term_freq += u64::from(self.doc.freq);
        if let Some(doc) = self.term.last_doc {
            self.docs_seen.insert(doc as u32);
        }
        Ok(())
    }

    fn finish_term(&mut self, text: &[u8], stats: TermStats) -> Result<()> {
        self.expect_state("finish_term", WriteState::Term)?;
        let has_freqs = self.current_field("finish_term")?.index_options.has_freqs();
        if text != self.term.text.as_slice() {
            return Err(self.fail("finish_term", format!("finishing {} instead", term_display(text))));
        }
        let expected = TermStats {
            doc_freq: self.term.doc_freq,
            total_term_freq: has_freqs.then_some(self.term.total_term_freq),
        };
        if expected.doc_freq == 0 {
            return Err(self.fail("finish_term", "term without docs".to_string()));
        }
        if stats != expected {
            return Err(self.fail("finish_term", format!("stats {:?}, streamed {:?}", stats, expected)));
        }
        self.inner.finish_term(text, stats)?;
        self.state = WriteState::Field;
        self.last_term = Some(std::mem::take(&mut self.term.text));
        self.sum_doc_freq += u64::from(expected.doc_freq);
        self.sum_total_term_freq += self.term.total_term_freq;
        Ok(())
    }

    fn finish_field(&mut self, stats: FieldStats) -> Result<()> {
        self.expect_state("finish_field", WriteState::Field)?;
        let has_freqs = self.current_field("finish_field")?.index_options.has_freqs();
        let expected = FieldStats {
            sum_total_term_freq: has_freqs.then_some(self.sum_total_term_freq),
            sum_doc_freq: self.sum_doc_freq,
            doc_count: self.docs_seen.len() as u32,
        };
        if stats != expected {
            return Err(self.fail("finish_field", format!("stats {:?}, streamed {:?}", stats, expected)));
        }
        self.inner.finish_field(stats)?;
        self.state = WriteState::Idle;
        self.field = None;
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.expect_state("close", WriteState::Idle)?;
        self.inner.close()
    }
}

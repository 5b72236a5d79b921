// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! `SeedPostings`: a posting list that exists only as a seed.
//!
//! Replaying the same parameters always yields the same postings. Two
//! generators drive the replay:
//!
//! - `doc_random` decides doc spacing and nothing else
//! - `random` decides freqs, positions, payloads and offsets
//!
//! so pulling more or less detail never moves a doc id. Positions a caller
//! skips are still drawn (`next_doc` drains them) to keep `random` aligned
//! across consumption patterns.

use crate::config::{DocFreqRange, GenerationTuning};
use crate::error::Result;
use crate::postings::{DocsAndPositionsEnum, DocsEnum};
use crate::types::{DocId, IndexOptions, PositionEntry, Posting, DOC_BEFORE_START, NO_MORE_DOCS};
use crate::util::{DeterministicRng, LiveDocs};

#[derive(Debug, Clone)]
pub struct SeedPostings {
    random: DeterministicRng,
    doc_random: DeterministicRng,
    tuning: GenerationTuning,
    live_docs: Option<LiveDocs>,
    do_positions: bool,

    doc_freq: u32,
    max_doc_spacing: u32,
    payload_size: u32,
    fixed_payloads: bool,
    payload: Vec<u8>,

    doc_id: DocId,
    freq: u32,
    upto: u32,

    pos: i32,
    pos_spacing: u32,
    pos_upto: u32,
    offset: i32,
    start_offset: i32,
    end_offset: i32,
}

impl SeedPostings {
    pub fn new(
        seed: u64,
        doc_freq_range: DocFreqRange,
        live_docs: Option<LiveDocs>,
        options: IndexOptions,
        tuning: &GenerationTuning,
    ) -> Self {
        let mut random = DeterministicRng::new(seed);
        let doc_random = DeterministicRng::new(random.next_u64());
        let doc_freq = random.int_in(i64::from(doc_freq_range.min), i64::from(doc_freq_range.max)) as u32;
        let max_doc_spacing = random.int_in(1, i64::from(tuning.max_doc_spacing)) as u32;

        let payload_size = if random.one_in(tuning.big_payload_one_in) {
            1 + random.below(u64::from(tuning.big_payload_max)) as u32
        } else {
            1 + random.below(u64::from(tuning.small_payload_max)) as u32
        };
        let fixed_payloads = random.next_bool();

        Self {
            random,
            doc_random,
            tuning: tuning.clone(),
            live_docs,
            do_positions: options.has_positions(),
            doc_freq,
            max_doc_spacing,
            payload_size,
            fixed_payloads,
            payload: Vec::with_capacity(payload_size as usize),
            doc_id: DOC_BEFORE_START,
            freq: 0,
            upto: 0,
            pos: 0,
            pos_spacing: 1,
            pos_upto: 0,
            offset: 0,
            start_offset: -1,
            end_offset: -1,
        }
    }

    /// Doc-id-only replay, without deletions.
    pub fn docs_only(seed: u64, doc_freq_range: DocFreqRange, tuning: &GenerationTuning) -> Self {
        Self::new(seed, doc_freq_range, None, IndexOptions::DocsOnly, tuning)
    }

    /// Number of docs the term was generated with, deletions included.
    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    /// Docs generated so far, deleted ones included.
    pub fn upto(&self) -> u32 {
        self.upto
    }

    pub fn cost(&self) -> u64 {
        u64::from(self.doc_freq)
    }

    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }

    pub fn freq(&self) -> u32 {
        self.freq
    }

    pub fn start_offset(&self) -> i32 {
        self.start_offset
    }

    pub fn end_offset(&self) -> i32 {
        self.end_offset
    }

    pub fn payload(&self) -> Option<&[u8]> {
        if self.payload.is_empty() {
            None
        } else {
            Some(&self.payload)
        }
    }

    /// Next live doc, or `NO_MORE_DOCS`.
    pub fn next_doc(&mut self) -> DocId {
        loop {
            let doc = self.next_generated_doc();
            let visible = match &self.live_docs {
                Some(live) => doc == NO_MORE_DOCS || live.get(doc),
                None => true,
            };
            if visible {
                return doc;
            }
        }
    }

    /// Linear scan; never skips, so it can stand in as ground truth.
    pub fn advance(&mut self, target: DocId) -> DocId {
        while self.doc_id < target {
            self.next_doc();
        }
        self.doc_id
    }

    fn next_generated_doc(&mut self) -> DocId {
        while self.pos_upto < self.freq {
            self.next_position();
        }

        if self.upto >= self.doc_freq {
            self.doc_id = NO_MORE_DOCS;
            return self.doc_id;
        }

        let current = self.doc_id.max(0);
        self.doc_id = if self.upto == 0 && self.doc_random.next_bool() {
            0
        } else if self.max_doc_spacing == 1 {
            current + 1
        } else {
            current + self.doc_random.int_in(1, i64::from(self.max_doc_spacing)) as i32
        };

        let t = &self.tuning;
        self.freq = if self.random.one_in(t.large_freq_one_in) {
            self.random.int_in(1, i64::from(t.large_freq_max)) as u32
        } else if self.random.one_in(t.medium_freq_one_in) {
            self.random.int_in(1, i64::from(t.medium_freq_max)) as u32
        } else {
            self.random.int_in(1, i64::from(t.small_freq_max)) as u32
        };

        self.pos = 0;
        self.offset = 0;
        self.pos_upto = 0;
        self.pos_spacing = self.random.int_in(1, i64::from(self.tuning.max_pos_spacing)) as u32;

        self.upto += 1;
        self.doc_id
    }

    /// Next position of the current doc. Without positions this just marks
    /// the doc's positions consumed and returns 0.
    pub fn next_position(&mut self) -> i32 {
        if !self.do_positions {
            self.pos_upto = self.freq;
            return 0;
        }
        debug_assert!(self.pos_upto < self.freq, "next_position past freq");

        if self.pos_upto == 0 && self.random.next_bool() {
            // position 0
        } else if self.pos_spacing == 1 {
            self.pos += 1;
        } else {
            self.pos += self.random.int_in(1, i64::from(self.pos_spacing)) as i32;
        }

        let len = if self.fixed_payloads {
            self.payload_size
        } else {
            self.random.below(u64::from(self.payload_size)) as u32
        };
        self.payload.resize(len as usize, 0);
        self.random.fill_bytes(&mut self.payload);

        self.start_offset = self.offset + self.random.below(u64::from(self.tuning.start_offset_gap)) as i32;
        self.end_offset = self.start_offset + self.random.below(u64::from(self.tuning.offset_length)) as i32;
        self.offset = self.end_offset;

        self.pos_upto += 1;
        self.pos
    }

    /// Replay everything that is left into concrete postings.
    ///
    /// Intended for diagnostics and small fixtures; big terms materialise
    /// hundreds of thousands of positions.
    pub fn collect_postings(&mut self) -> Vec<Posting> {
        let mut out = Vec::new();
        while self.next_doc() != NO_MORE_DOCS {
            let mut posting = Posting {
                doc_id: self.doc_id,
                freq: self.freq,
                positions: Vec::new(),
            };
            if self.do_positions {
                for _ in 0..self.freq {
                    let position = self.next_position();
                    posting.positions.push(PositionEntry {
                        position,
                        start_offset: self.start_offset,
                        end_offset: self.end_offset,
                        payload: self.payload().map(<[u8]>::to_vec),
                    });
                }
            }
            out.push(posting);
        }
        out
    }

    /// Last doc id generated, or `None` for an empty list.
    pub fn last_doc(mut self) -> Option<DocId> {
        let mut last = None;
        loop {
            let doc = self.next_doc();
            if doc == NO_MORE_DOCS {
                return last;
            }
            last = Some(doc);
        }
    }
}

impl DocsEnum for SeedPostings {
    fn doc_id(&self) -> DocId {
        self.doc_id
    }

    fn freq(&self) -> Result<u32> {
        Ok(self.freq)
    }

    fn next_doc(&mut self) -> Result<DocId> {
        Ok(SeedPostings::next_doc(self))
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        Ok(SeedPostings::advance(self, target))
    }

    fn cost(&self) -> u64 {
        SeedPostings::cost(self)
    }
}

impl DocsAndPositionsEnum for SeedPostings {
    fn next_position(&mut self) -> Result<i32> {
        Ok(SeedPostings::next_position(self))
    }

    fn start_offset(&self) -> Result<i32> {
        Ok(self.start_offset)
    }

    fn end_offset(&self) -> Result<i32> {
        Ok(self.end_offset)
    }

    fn payload(&self) -> Result<Option<&[u8]>> {
        Ok(SeedPostings::payload(self))
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Drives trials against an opened index and compares with the model.
//!
//! One trial = one (field, term), one cursor, one randomly chosen way of
//! walking it. A pass visits every term of the universe in shuffled order,
//! sometimes resuming from a saved term state instead of seeking by bytes.
//!
//! Every comparison failure is a [`ConformanceError::Mismatch`] carrying the
//! worker seed and the term seed. Nothing is retried.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

use super::context::WorkerContext;
use super::options::{TrialOptions, TrialSettings};
use super::report::TrialReport;
use crate::build::BuiltIndex;
use crate::error::{ConformanceError, Result};
use crate::model::{FieldAndTerm, PostingsUniverse};
use crate::postings::{DocsAndPositionsEnum, DocsEnum, Fields, FieldsTermsEnum, IndexReader, Terms, TermsEnum};
use crate::types::{
    term_display, DocId, DocsFlags, FieldInfos, FieldStats, IndexOptions, PositionsFlags, SeekStatus,
    DOC_BEFORE_START, NO_MORE_DOCS,
};
use crate::util::rng::derive_seed;
use crate::util::DeterministicRng;
use crate::config::VerificationTuning;
use crate::verify::{AssertingFields, AssertingReader};

// ============================================================================
// MISMATCH REPORTING
// ============================================================================

/// The (field, term) under test plus the seeds that replay it.
struct Subject<'t> {
    field: &'t str,
    term: &'t [u8],
    seed: u64,
    term_seed: u64,
}

impl Subject<'_> {
    fn mismatch(&self, what: &'static str, expected: impl Debug, actual: impl Debug) -> ConformanceError {
        ConformanceError::Mismatch {
            field: self.field.to_string(),
            term: term_display(self.term),
            seed: self.seed,
            term_seed: self.term_seed,
            what,
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    fn check<T: PartialEq + Debug>(&self, what: &'static str, expected: T, actual: T) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(self.mismatch(what, expected, actual))
        }
    }
}

// ============================================================================
// TRIAL CURSOR
// ============================================================================

/// The cursor a trial walks: a plain docs cursor, or a positions cursor
/// that may or may not have its positions checked.
enum TrialCursor<D, P> {
    Docs(D),
    Positions(P),
}

impl<D: DocsEnum, P: DocsAndPositionsEnum> TrialCursor<D, P> {
    fn positions(&mut self) -> Option<&mut P> {
        match self {
            TrialCursor::Docs(_) => None,
            TrialCursor::Positions(p) => Some(p),
        }
    }
}

impl<D: DocsEnum, P: DocsAndPositionsEnum> DocsEnum for TrialCursor<D, P> {
    fn doc_id(&self) -> DocId {
        match self {
            TrialCursor::Docs(d) => d.doc_id(),
            TrialCursor::Positions(p) => p.doc_id(),
        }
    }

    fn freq(&self) -> Result<u32> {
        match self {
            TrialCursor::Docs(d) => d.freq(),
            TrialCursor::Positions(p) => p.freq(),
        }
    }

    fn next_doc(&mut self) -> Result<DocId> {
        match self {
            TrialCursor::Docs(d) => d.next_doc(),
            TrialCursor::Positions(p) => p.next_doc(),
        }
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        match self {
            TrialCursor::Docs(d) => d.advance(target),
            TrialCursor::Positions(p) => p.advance(target),
        }
    }

    fn cost(&self) -> u64 {
        match self {
            TrialCursor::Docs(d) => d.cost(),
            TrialCursor::Positions(p) => p.cost(),
        }
    }
}

// ============================================================================
// VERIFIER
// ============================================================================

/// Compares one opened index against the universe it was built from.
pub struct Verifier<'u, F> {
    universe: &'u PostingsUniverse,
    fields: F,
    field_infos: FieldInfos,
    field_stats: BTreeMap<String, FieldStats>,
    /// Level the postings were replayed at during the build.
    max_index_options: IndexOptions,
    tuning: VerificationTuning,
}

impl<'u, P: Fields + Clone> Verifier<'u, AssertingFields<P>> {
    /// Wrap a freshly built index: reader-level checks run once here, and
    /// every cursor handed out later is contract-checked.
    pub fn from_built(universe: &'u PostingsUniverse, built: BuiltIndex<P>) -> Result<Self> {
        let reader = AssertingReader::new(built.reader)?;
        if reader.max_doc() != universe.max_doc() {
            return Err(ConformanceError::violation(
                "reader",
                "OPEN",
                format!("max_doc {} but the universe has {}", reader.max_doc(), universe.max_doc()),
            ));
        }
        Ok(Self::new(
            universe,
            reader.fields(),
            built.field_infos,
            built.field_stats,
            built.max_allowed,
        ))
    }
}

impl<'u, F: Fields + Clone> Verifier<'u, F> {
    pub fn new(
        universe: &'u PostingsUniverse,
        fields: F,
        field_infos: FieldInfos,
        field_stats: BTreeMap<String, FieldStats>,
        max_index_options: IndexOptions,
    ) -> Self {
        Self {
            universe,
            fields,
            field_infos,
            field_stats,
            max_index_options,
            tuning: universe.config().verification.clone(),
        }
    }

    pub fn fields(&self) -> &F {
        &self.fields
    }

    /// Field iteration is sorted, unique, sized, and every field has terms.
    pub fn check_fields(&self) -> Result<()> {
        let names = self.fields.field_names();
        if let Some(pair) = names.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ConformanceError::violation(
                "field_names",
                "OPEN",
                format!("fields out of order: {:?} before {:?}", pair[0], pair[1]),
            ));
        }
        if names.len() != self.fields.size() {
            return Err(ConformanceError::violation(
                "field_names",
                "OPEN",
                format!("{} names but size() is {}", names.len(), self.fields.size()),
            ));
        }
        let expected: Vec<&str> = self.universe.field_names().collect();
        if names.iter().map(String::as_str).ne(expected.iter().copied()) {
            return Err(ConformanceError::violation(
                "field_names",
                "OPEN",
                format!("expected fields {:?}, got {:?}", expected, names),
            ));
        }
        for name in &names {
            if self.fields.terms(name)?.is_none() {
                return Err(ConformanceError::violation(
                    "terms",
                    "OPEN",
                    format!("listed field {} has no terms", name),
                ));
            }
        }
        Ok(())
    }

    /// Walk and probe every field's term dictionary.
    pub fn verify_term_dictionary(&self, seed: u64) -> Result<TrialReport> {
        let mut rng = DeterministicRng::new(seed);
        let mut report = TrialReport::default();

        for field in self.universe.field_names() {
            let Some(model_terms) = self.universe.terms(field) else {
                continue;
            };
            let subject = Subject {
                field,
                term: &[],
                seed,
                term_seed: 0,
            };
            let terms = self
                .fields
                .terms(field)?
                .ok_or_else(|| subject.mismatch("terms", "present", "missing"))?;
            let level = terms.index_options();

            if let Some(stats) = self.field_stats.get(field) {
                subject.check("sumDocFreq", stats.sum_doc_freq, terms.sum_doc_freq())?;
                subject.check("sumTotalTermFreq", stats.sum_total_term_freq, terms.sum_total_term_freq())?;
                subject.check("docCount", stats.doc_count, terms.doc_count())?;
            }
            if let Some(size) = terms.size() {
                subject.check("size", model_terms.len() as u64, size)?;
            }

            let sorted: Vec<&Vec<u8>> = model_terms.keys().collect();
            let mut te = terms.iterator()?;
            for (ord, expected) in sorted.iter().enumerate() {
                let subject = Subject {
                    term: expected,
                    term_seed: model_terms[*expected],
                    ..subject
                };
                let actual = te.next()?.map(<[u8]>::to_vec);
                subject.check("next", Some((*expected).clone()), actual)?;
                subject.check("ord", ord as u64, te.ord()?)?;
                let stats = self
                    .universe
                    .term_stats(field, expected, self.max_index_options, level)
                    .ok_or_else(|| subject.mismatch("model term", "present", "missing"))?;
                subject.check("docFreq", stats.doc_freq, te.doc_freq()?)?;
                subject.check("totalTermFreq", stats.total_term_freq, te.total_term_freq()?)?;
            }
            let tail = te.next()?.map(<[u8]>::to_vec);
            subject.check("next past last term", None, tail)?;

            if sorted.is_empty() {
                continue;
            }

            // Ord and byte seeks must agree with each other.
            for _ in 0..sorted.len().min(self.tuning.seek_ceil_probes as usize) {
                let ord = rng.below(sorted.len() as u64);
                let expected = sorted[ord as usize];
                let subject = Subject {
                    term: expected,
                    ..subject
                };
                te.seek_exact_ord(ord)?;
                subject.check("term after seek_exact_ord", expected.as_slice(), te.term()?)?;
                subject.check("ord after seek_exact_ord", ord, te.ord()?)?;
                let doc_freq = te.doc_freq()?;

                let mut other = terms.iterator()?;
                subject.check("seek_exact", true, other.seek_exact(expected)?)?;
                subject.check("ord after seek_exact", ord, other.ord()?)?;
                subject.check("docFreq after seek_exact", doc_freq, other.doc_freq()?)?;
                report.dictionary_probes += 1;
            }

            // Ceiling seeks land where the model's sorted set says.
            for _ in 0..self.tuning.seek_ceil_probes {
                let target = probe_target(&mut rng, &sorted);
                let subject = Subject {
                    term: &target,
                    ..subject
                };
                let expected = model_terms
                    .range::<[u8], _>((Bound::Included(target.as_slice()), Bound::Unbounded))
                    .next()
                    .map(|(t, _)| t);
                let status = te.seek_ceil(&target)?;
                match expected {
                    None => subject.check("seek_ceil", SeekStatus::End, status)?,
                    Some(t) => {
                        let want = if *t == target {
                            SeekStatus::Found
                        } else {
                            SeekStatus::NotFound
                        };
                        subject.check("seek_ceil", want, status)?;
                        subject.check("term after seek_ceil", t.as_slice(), te.term()?)?;
                    }
                }
                report.dictionary_probes += 1;
            }
            tracing::debug!(field, terms = sorted.len(), "verified term dictionary");
        }
        Ok(report)
    }

    /// One pass over all terms, on one worker or several.
    pub fn test_terms(&self, settings: TrialSettings, seed: u64) -> Result<TrialReport> {
        let mut report = if settings.options.contains(TrialOptions::THREADS) {
            let mut rng = DeterministicRng::new(seed);
            let num_threads = rng.int_in(
                i64::from(self.tuning.min_threads),
                i64::from(self.tuning.max_threads),
            ) as usize;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("conformance-worker-{}", i))
                .build()
                .map_err(|e| ConformanceError::Resource(std::io::Error::other(e.to_string())))?;
            tracing::debug!(workers = num_threads, options = %settings.options, "starting threaded pass");

            // The first failing worker stops the others at their next term.
            let abort = AtomicBool::new(false);
            let results = pool.broadcast(|ctx| {
                let result = self.test_terms_until(settings, derive_seed(seed, ctx.index() as u64), &abort);
                if result.is_err() {
                    abort.store(true, Ordering::Relaxed);
                }
                result
            });
            let mut merged = TrialReport::default();
            let mut first_err = None;
            for result in results {
                match result {
                    Ok(report) => merged.merge(report),
                    Err(e) => {
                        first_err.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_err {
                return Err(e);
            }
            merged
        } else {
            self.test_terms_one_thread(settings, derive_seed(seed, 0))?
        };
        report.passes += 1;
        tracing::debug!(
            options = %settings.options,
            max_test = %settings.max_test_options,
            terms = report.terms,
            docs = report.docs,
            "pass complete"
        );
        Ok(report)
    }

    /// One worker's pass: every term once, in shuffled order.
    pub fn test_terms_one_thread(&self, settings: TrialSettings, seed: u64) -> Result<TrialReport> {
        self.test_terms_until(settings, seed, &AtomicBool::new(false))
    }

    /// Like [`Self::test_terms_one_thread`], but returns the partial report
    /// as soon as `abort` is set. Checked between terms.
    pub fn test_terms_until(&self, settings: TrialSettings, seed: u64, abort: &AtomicBool) -> Result<TrialReport> {
        let options = settings.options;
        let mut ctx: WorkerContext<FieldsTermsEnum<F>> = WorkerContext::new(seed);
        let mut all_terms = self.universe.all_terms().to_vec();
        ctx.rng.shuffle(&mut all_terms);

        let mut upto = 0;
        while upto < all_terms.len() {
            if abort.load(Ordering::Relaxed) {
                tracing::debug!(seed, terms = ctx.report.terms, "worker stopped early");
                break;
            }
            let use_state = !ctx.term_states.is_empty() && ctx.rng.one_in(self.tuning.term_state_use_one_in);
            let (target, state) = match use_state.then(|| ctx.pick_term_state()).flatten() {
                Some((target, state)) => (target, Some(state)),
                None => {
                    upto += 1;
                    (all_terms[upto - 1].clone(), None)
                }
            };

            let subject = self.subject(&target, seed);
            let terms = self
                .fields
                .terms(&target.field)?
                .ok_or_else(|| subject.mismatch("terms", "present", "missing"))?;
            let mut te = terms.iterator()?;
            match &state {
                None => {
                    if !te.seek_exact(&target.term)? {
                        return Err(subject.mismatch("seek_exact", true, false));
                    }
                }
                Some(state) => {
                    tracing::trace!(field = %target.field, term = %term_display(&target.term), "seek by term state");
                    te.seek_exact_state(&target.term, state)?;
                    ctx.report.term_state_seeks += 1;
                }
            }
            if let Some(ord) = self.universe.term_ord(&target.field, &target.term) {
                subject.check("ord", ord, te.ord()?)?;
            }

            let mut saved = false;
            if options.contains(TrialOptions::TERM_STATE)
                && state.is_none()
                && ctx.rng.one_in(self.tuning.term_state_save_one_in)
            {
                ctx.save_term_state(target.clone(), te.term_state()?);
                saved = true;
            }

            self.verify_enum(&mut ctx, &target, &te, settings)?;

            // A state captured after pulling a cursor must still resume.
            if options.contains(TrialOptions::TERM_STATE)
                && state.is_none()
                && !saved
                && ctx.rng.one_in(self.tuning.term_state_save_one_in)
            {
                ctx.save_term_state(target.clone(), te.term_state()?);
            }

            if settings.always_test_max || ctx.rng.one_in(self.tuning.repeat_enum_one_in) {
                self.verify_enum(&mut ctx, &target, &te, settings)?;
                ctx.report.repeat_enums += 1;
            }
            ctx.report.terms += 1;
        }
        Ok(ctx.into_report())
    }

    fn subject<'t>(&self, target: &'t FieldAndTerm, seed: u64) -> Subject<'t> {
        Subject {
            field: &target.field,
            term: &target.term,
            seed,
            term_seed: self.universe.term_seed(&target.field, &target.term).unwrap_or_default(),
        }
    }

    /// One trial: pull a cursor from `te` (positioned on `target`) and walk it
    /// against a fresh replay of the model.
    pub fn verify_enum(
        &self,
        ctx: &mut WorkerContext<FieldsTermsEnum<F>>,
        target: &FieldAndTerm,
        te: &FieldsTermsEnum<F>,
        settings: TrialSettings,
    ) -> Result<()> {
        let subject = self.subject(target, ctx.seed);
        let options = settings.options;
        let always = settings.always_test_max;
        let max_test = settings.max_test_options;
        let tuning = &self.tuning;
        let WorkerContext {
            rng,
            reuse_docs,
            reuse_positions,
            report,
            ..
        } = ctx;

        subject.check("term", target.term.as_slice(), te.term()?)?;

        let use_live_docs = options.contains(TrialOptions::LIVE_DOCS) && rng.next_bool();
        let live_docs = use_live_docs.then(|| self.universe.live_docs());

        let info = self
            .field_infos
            .get(&target.field)
            .ok_or_else(|| subject.mismatch("field info", "present", "missing"))?;
        let level = info.index_options;

        let mut expected = self
            .universe
            .seed_postings(&target.field, &target.term, use_live_docs, self.max_index_options)
            .ok_or_else(|| subject.mismatch("model term", "present", "missing"))?;
        let doc_freq = expected.doc_freq();
        subject.check("docFreq", doc_freq, te.doc_freq()?)?;

        let detail = tuning.detail_check_chance;
        let allow_freqs = level.has_freqs() && max_test.has_freqs();
        let check_freqs = allow_freqs && (always || rng.chance(detail));
        let allow_positions = level.has_positions() && max_test.has_positions();
        let check_positions = allow_positions && (always || rng.chance(detail));
        let allow_offsets = level.has_offsets() && max_test.has_offsets();
        let check_offsets = allow_offsets && (always || rng.chance(detail));
        let check_payloads = options.contains(TrialOptions::PAYLOADS)
            && allow_positions
            && info.has_payloads
            && (always || rng.chance(detail));

        let reuse_enums = options.contains(TrialOptions::REUSE_ENUMS);

        let mut cursor = if !check_positions {
            if allow_positions && rng.one_in(tuning.positions_enum_for_docs_one_in) {
                let reuse = if reuse_enums && rng.chance(tuning.reuse_chance) { reuse_positions.take() } else { None };
                let mut flags = PositionsFlags::NONE;
                if always || rng.next_bool() {
                    flags = flags.with(PositionsFlags::OFFSETS);
                }
                if always || rng.next_bool() {
                    flags = flags.with(PositionsFlags::PAYLOADS);
                }
                report.reused_enums += u64::from(reuse.is_some());
                tracing::trace!(%flags, "positions cursor, positions unchecked");
                let p = te
                    .docs_and_positions(live_docs, reuse, flags)?
                    .ok_or_else(|| subject.mismatch("docs_and_positions", "cursor", "None"))?;
                TrialCursor::Positions(p)
            } else {
                let reuse = if reuse_enums && rng.chance(tuning.reuse_chance) { reuse_docs.take() } else { None };
                report.reused_enums += u64::from(reuse.is_some());
                let flags = if check_freqs { DocsFlags::FREQS } else { DocsFlags::NONE };
                TrialCursor::Docs(te.docs(live_docs, reuse, flags)?)
            }
        } else {
            let reuse = if reuse_enums && rng.chance(tuning.reuse_chance) { reuse_positions.take() } else { None };
            let mut flags = PositionsFlags::NONE;
            if always || check_offsets || rng.below(3) == 1 {
                flags = flags.with(PositionsFlags::OFFSETS);
            }
            if always || check_payloads || rng.below(3) == 1 {
                flags = flags.with(PositionsFlags::PAYLOADS);
            }
            report.reused_enums += u64::from(reuse.is_some());
            let p = te
                .docs_and_positions(live_docs, reuse, flags)?
                .ok_or_else(|| subject.mismatch("docs_and_positions", "cursor", "None"))?;
            TrialCursor::Positions(p)
        };
        report.enums += 1;
        subject.check("initial docID", DOC_BEFORE_START, cursor.doc_id())?;

        let stop_at = if !always
            && options.contains(TrialOptions::PARTIAL_DOC_CONSUME)
            && doc_freq > 1
            && rng.one_in(tuning.partial_doc_one_in)
        {
            report.partial_doc_consumes += 1;
            rng.below(u64::from(doc_freq - 1)) as u32
        } else {
            doc_freq
        };

        let skipping = options.contains(TrialOptions::SKIPPING);
        let skip_chance = if always { 0.5 } else { rng.next_f64() };
        let num_skips = if doc_freq < 3 {
            1
        } else {
            rng.int_in(1, i64::from(tuning.max_skips.min(doc_freq / 3)).max(1)) as u32
        };
        let skip_inc = (doc_freq / num_skips).max(1);
        let skip_doc_inc = (self.universe.max_doc() / num_skips).max(1);
        let all_skipping = skipping && rng.one_in(tuning.all_skipping_one_in);

        let freq_ask_chance = if always { 1.0 } else { rng.next_f64() };
        let payload_check_chance = if always { 1.0 } else { rng.next_f64() };
        let offset_check_chance = if always { 1.0 } else { rng.next_f64() };

        tracing::trace!(
            field = %target.field,
            term = %term_display(&target.term),
            doc_freq,
            stop_at,
            live_docs = use_live_docs,
            skip_chance,
            num_skips,
            "verify enum"
        );

        while expected.upto() <= stop_at {
            if expected.upto() == stop_at {
                if stop_at == doc_freq {
                    subject.check("nextDoc at end", NO_MORE_DOCS, cursor.next_doc()?)?;
                    // A cursor that returns the sentinel must also report it.
                    subject.check("docID at end", NO_MORE_DOCS, cursor.doc_id())?;
                }
                break;
            }

            if skipping && (all_skipping || rng.next_f64() <= skip_chance) {
                let mut random_target = None;
                if expected.upto() < stop_at && rng.next_bool() {
                    // Target known to exist.
                    let skip_count = rng.int_in(1, i64::from(skip_inc));
                    for _ in 0..skip_count {
                        if expected.next_doc() == NO_MORE_DOCS {
                            break;
                        }
                    }
                } else {
                    // Target that may not exist.
                    let skip_docs = rng.int_in(1, i64::from(skip_doc_inc)) as DocId;
                    let doc_target = expected.doc_id().saturating_add(skip_docs);
                    expected.advance(doc_target);
                    random_target = Some(doc_target);
                }

                report.advances += 1;
                if expected.upto() >= stop_at {
                    let end = if rng.next_bool() {
                        self.universe.max_doc() as DocId
                    } else {
                        NO_MORE_DOCS
                    };
                    subject.check("advance past end", NO_MORE_DOCS, cursor.advance(end)?)?;
                    break;
                }
                let doc = cursor.advance(random_target.unwrap_or(expected.doc_id()))?;
                subject.check("docID after advance", expected.doc_id(), doc)?;
            } else {
                let want = expected.next_doc();
                let doc = cursor.next_doc()?;
                subject.check("docID", want, doc)?;
                if doc == NO_MORE_DOCS {
                    break;
                }
            }
            report.docs += 1;

            if check_freqs && rng.next_f64() <= freq_ask_chance {
                subject.check("freq", expected.freq(), cursor.freq()?)?;
            }

            if check_positions {
                let freq = cursor.freq()?;
                let consume = if !always
                    && options.contains(TrialOptions::PARTIAL_POS_CONSUME)
                    && rng.one_in(tuning.partial_pos_one_in)
                {
                    rng.below(u64::from(freq)) as u32
                } else {
                    freq
                };
                let Some(positions) = cursor.positions() else {
                    return Err(subject.mismatch("positions cursor", "present", "docs only"));
                };

                for _ in 0..consume {
                    let want = expected.next_position();
                    subject.check("position", want, positions.next_position()?)?;
                    report.positions += 1;

                    if check_payloads && rng.next_f64() <= payload_check_chance {
                        let actual = positions.payload()?.map(<[u8]>::to_vec);
                        subject.check("payload", expected.payload(), actual.as_deref())?;
                        // Re-reading must not change the answer.
                        subject.check("payload re-read", actual.as_deref(), positions.payload()?)?;
                        report.payload_checks += 1;
                    }

                    if check_offsets {
                        if rng.next_f64() <= offset_check_chance {
                            subject.check("startOffset", expected.start_offset(), positions.start_offset()?)?;
                            subject.check("endOffset", expected.end_offset(), positions.end_offset()?)?;
                            report.offset_checks += 1;
                        }
                    } else if !level.has_offsets() {
                        subject.check("startOffset without offsets", -1, positions.start_offset()?)?;
                        subject.check("endOffset without offsets", -1, positions.end_offset()?)?;
                    }
                }
            }
        }

        match cursor {
            TrialCursor::Docs(d) => *reuse_docs = Some(d),
            TrialCursor::Positions(p) => *reuse_positions = Some(p),
        }
        Ok(())
    }
}

/// A seek target near the model's terms: an existing term, a term with a
/// byte appended, a truncated term, or something past every term.
fn probe_target(rng: &mut DeterministicRng, sorted: &[&Vec<u8>]) -> Vec<u8> {
    let base = sorted[rng.below(sorted.len() as u64) as usize].clone();
    match rng.below(4) {
        0 => base,
        1 => {
            let mut t = base;
            t.push(b'a' + rng.below(26) as u8);
            t
        }
        2 => {
            let mut t = base;
            t.pop();
            t
        }
        _ => vec![0xff; 1 + rng.below(3) as usize],
    }
}

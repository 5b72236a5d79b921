// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Reader-level invariants and doc values wrappers.
//!
//! [`AssertingReader::new`] checks the segment counters once. Every getter
//! then hands back wrapped values: fields through [`AssertingFields`], doc
//! values through bounds-checking wrappers that also verify the returned
//! kind matches the field's declared [`DocValuesType`].

use super::terms::AssertingFields;
use crate::error::{ConformanceError, Result};
use crate::postings::{BinaryDocValues, IndexReader, NumericDocValues, SortedDocValues, SortedSetDocValues};
use crate::types::{DocId, DocValuesType, FieldInfos, NO_MORE_ORDS};
use crate::util::LiveDocs;

// ============================================================================
// READER
// ============================================================================

pub struct AssertingReader<R> {
    inner: R,
}

impl<R: IndexReader> AssertingReader<R> {
    /// Check the segment counters and the live-docs mask, then wrap.
    pub fn new(inner: R) -> Result<Self> {
        let max_doc = inner.max_doc();
        let num_docs = inner.num_docs();
        let deleted = inner.num_deleted_docs();
        if num_docs > max_doc {
            return Err(reader_violation(format!("num_docs {} > max_doc {}", num_docs, max_doc)));
        }
        if u64::from(num_docs) + u64::from(deleted) != u64::from(max_doc) {
            return Err(reader_violation(format!(
                "num_docs {} + deleted {} != max_doc {}",
                num_docs, deleted, max_doc
            )));
        }
        if inner.has_deletions() != (deleted > 0) {
            return Err(reader_violation(format!(
                "has_deletions is {} with {} deleted docs",
                inner.has_deletions(),
                deleted
            )));
        }

        let reader = Self { inner };
        match reader.asserting_live_docs()? {
            Some(live) => {
                let mut live_count = 0u32;
                for doc in 0..max_doc as DocId {
                    if live.get(doc)? {
                        live_count += 1;
                    }
                }
                if live_count != num_docs {
                    return Err(reader_violation(format!(
                        "live docs mark {} docs live, num_docs is {}",
                        live_count, num_docs
                    )));
                }
            }
            None => {
                if max_doc != num_docs || reader.inner.has_deletions() {
                    return Err(reader_violation(format!(
                        "no live docs but num_docs {} != max_doc {}",
                        num_docs, max_doc
                    )));
                }
            }
        }
        Ok(reader)
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Bounds-checked view of the live docs.
    pub fn asserting_live_docs(&self) -> Result<Option<AssertingLiveDocs<'_>>> {
        self.inner
            .live_docs()
            .map(|live| AssertingLiveDocs::new(live, self.inner.max_doc()))
            .transpose()
    }

    /// The getter's answer must agree with the field's declared kind.
    fn check_kind(&self, field: &str, kind: DocValuesType, present: bool) -> Result<()> {
        let declared = self.inner.field_infos().get(field).map(|fi| fi.doc_values);
        let ok = if present {
            declared == Some(kind)
        } else {
            declared != Some(kind)
        };
        if !ok {
            return Err(ConformanceError::violation(
                "doc_values",
                "OPEN",
                format!(
                    "field {} declares {:?} but {:?} values were {}",
                    field,
                    declared,
                    kind,
                    if present { "returned" } else { "missing" }
                ),
            ));
        }
        Ok(())
    }
}

fn reader_violation(detail: String) -> ConformanceError {
    ConformanceError::violation("reader", "OPEN", detail)
}

impl<R: IndexReader> IndexReader for AssertingReader<R> {
    type Fields = AssertingFields<R::Fields>;

    fn max_doc(&self) -> u32 {
        self.inner.max_doc()
    }

    fn num_docs(&self) -> u32 {
        self.inner.num_docs()
    }

    fn num_deleted_docs(&self) -> u32 {
        self.inner.num_deleted_docs()
    }

    fn has_deletions(&self) -> bool {
        self.inner.has_deletions()
    }

    fn live_docs(&self) -> Option<&LiveDocs> {
        self.inner.live_docs()
    }

    fn fields(&self) -> Self::Fields {
        AssertingFields::new(self.inner.fields())
    }

    fn field_infos(&self) -> &FieldInfos {
        self.inner.field_infos()
    }

    fn numeric_doc_values(&self, field: &str) -> Result<Option<Box<dyn NumericDocValues>>> {
        let dv = self.inner.numeric_doc_values(field)?;
        self.check_kind(field, DocValuesType::Numeric, dv.is_some())?;
        let max_doc = self.max_doc();
        Ok(dv.map(|inner| Box::new(AssertingNumericDocValues { inner, max_doc }) as Box<dyn NumericDocValues>))
    }

    fn binary_doc_values(&self, field: &str) -> Result<Option<Box<dyn BinaryDocValues>>> {
        let dv = self.inner.binary_doc_values(field)?;
        self.check_kind(field, DocValuesType::Binary, dv.is_some())?;
        let max_doc = self.max_doc();
        Ok(dv.map(|inner| Box::new(AssertingBinaryDocValues { inner, max_doc }) as Box<dyn BinaryDocValues>))
    }

    fn sorted_doc_values(&self, field: &str) -> Result<Option<Box<dyn SortedDocValues>>> {
        let dv = self.inner.sorted_doc_values(field)?;
        self.check_kind(field, DocValuesType::Sorted, dv.is_some())?;
        let max_doc = self.max_doc();
        Ok(dv.map(|inner| Box::new(AssertingSortedDocValues::new(inner, max_doc)) as Box<dyn SortedDocValues>))
    }

    fn sorted_set_doc_values(&self, field: &str) -> Result<Option<Box<dyn SortedSetDocValues>>> {
        let dv = self.inner.sorted_set_doc_values(field)?;
        self.check_kind(field, DocValuesType::SortedSet, dv.is_some())?;
        let max_doc = self.max_doc();
        Ok(dv.map(|inner| {
            Box::new(AssertingSortedSetDocValues::new(inner, max_doc)) as Box<dyn SortedSetDocValues>
        }))
    }
}

// ============================================================================
// LIVE DOCS
// ============================================================================

/// Live-docs view that rejects out-of-range lookups.
#[derive(Debug, Clone, Copy)]
pub struct AssertingLiveDocs<'a> {
    inner: &'a LiveDocs,
}

impl<'a> AssertingLiveDocs<'a> {
    pub fn new(inner: &'a LiveDocs, max_doc: u32) -> Result<Self> {
        if inner.len() != max_doc {
            return Err(reader_violation(format!(
                "live docs cover {} docs, max_doc is {}",
                inner.len(),
                max_doc
            )));
        }
        Ok(Self { inner })
    }

    pub fn get(&self, doc: DocId) -> Result<bool> {
        check_doc("live_docs.get", doc, self.inner.len())?;
        Ok(self.inner.get(doc))
    }

    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn inner(&self) -> &'a LiveDocs {
        self.inner
    }
}

fn check_doc(call: &'static str, doc: DocId, max_doc: u32) -> Result<()> {
    if doc < 0 || doc as u32 >= max_doc {
        return Err(ConformanceError::violation(
            call,
            "OPEN",
            format!("doc {} out of bounds [0, {})", doc, max_doc),
        ));
    }
    Ok(())
}

fn check_length(call: &'static str, out: &[u8], max_length: usize) -> Result<()> {
    if out.len() > max_length {
        return Err(ConformanceError::violation(
            call,
            "OPEN",
            format!("value of {} bytes exceeds declared max length {}", out.len(), max_length),
        ));
    }
    Ok(())
}

// ============================================================================
// DOC VALUES
// ============================================================================

pub struct AssertingNumericDocValues {
    inner: Box<dyn NumericDocValues>,
    max_doc: u32,
}

impl NumericDocValues for AssertingNumericDocValues {
    fn get(&self, doc: DocId) -> Result<i64> {
        check_doc("numeric.get", doc, self.max_doc)?;
        self.inner.get(doc)
    }
}

pub struct AssertingBinaryDocValues {
    inner: Box<dyn BinaryDocValues>,
    max_doc: u32,
}

impl BinaryDocValues for AssertingBinaryDocValues {
    fn get(&self, doc: DocId, out: &mut Vec<u8>) -> Result<()> {
        check_doc("binary.get", doc, self.max_doc)?;
        self.inner.get(doc, out)?;
        check_length("binary.get", out, self.inner.max_length())
    }

    fn max_length(&self) -> usize {
        self.inner.max_length()
    }
}

pub struct AssertingSortedDocValues {
    inner: Box<dyn SortedDocValues>,
    max_doc: u32,
    value_count: u64,
}

impl AssertingSortedDocValues {
    fn new(inner: Box<dyn SortedDocValues>, max_doc: u32) -> Self {
        let value_count = inner.value_count();
        Self {
            inner,
            max_doc,
            value_count,
        }
    }

    fn check_value_count(&self, call: &'static str) -> Result<()> {
        let now = self.inner.value_count();
        if now != self.value_count {
            return Err(ConformanceError::violation(
                call,
                "OPEN",
                format!("value_count changed from {} to {}", self.value_count, now),
            ));
        }
        Ok(())
    }
}

impl SortedDocValues for AssertingSortedDocValues {
    fn ord(&self, doc: DocId) -> Result<i64> {
        check_doc("sorted.ord", doc, self.max_doc)?;
        let ord = self.inner.ord(doc)?;
        if ord < -1 || ord >= self.value_count as i64 {
            return Err(ConformanceError::violation(
                "sorted.ord",
                "OPEN",
                format!("ord {} outside [-1, {})", ord, self.value_count),
            ));
        }
        Ok(ord)
    }

    fn lookup_ord(&self, ord: i64, out: &mut Vec<u8>) -> Result<()> {
        if ord < 0 || ord >= self.value_count as i64 {
            return Err(ConformanceError::violation(
                "sorted.lookup_ord",
                "OPEN",
                format!("ord {} outside [0, {})", ord, self.value_count),
            ));
        }
        self.inner.lookup_ord(ord, out)?;
        check_length("sorted.lookup_ord", out, self.inner.max_length())
    }

    fn value_count(&self) -> u64 {
        self.value_count
    }

    fn lookup_term(&self, key: &[u8]) -> Result<i64> {
        let result = self.inner.lookup_term(key)?;
        if result >= self.value_count as i64 {
            return Err(ConformanceError::violation(
                "sorted.lookup_term",
                "OPEN",
                format!("result {} >= value_count {}", result, self.value_count),
            ));
        }
        self.check_value_count("sorted.lookup_term")?;
        Ok(result)
    }

    fn max_length(&self) -> usize {
        self.inner.max_length()
    }
}

pub struct AssertingSortedSetDocValues {
    inner: Box<dyn SortedSetDocValues>,
    max_doc: u32,
    value_count: u64,
    /// `None` before `set_document`; `Some(None)` before the first ord of a doc.
    last_ord: Option<Option<u64>>,
}

impl AssertingSortedSetDocValues {
    fn new(inner: Box<dyn SortedSetDocValues>, max_doc: u32) -> Self {
        let value_count = inner.value_count();
        Self {
            inner,
            max_doc,
            value_count,
            last_ord: None,
        }
    }
}

impl SortedSetDocValues for AssertingSortedSetDocValues {
    fn set_document(&mut self, doc: DocId) -> Result<()> {
        check_doc("sorted_set.set_document", doc, self.max_doc)?;
        self.inner.set_document(doc)?;
        self.last_ord = Some(None);
        Ok(())
    }

    fn next_ord(&mut self) -> Result<u64> {
        let last = match self.last_ord {
            None => {
                return Err(ConformanceError::violation(
                    "sorted_set.next_ord",
                    "UNSET",
                    "next_ord called before set_document",
                ))
            }
            Some(Some(NO_MORE_ORDS)) => {
                return Err(ConformanceError::violation(
                    "sorted_set.next_ord",
                    "EXHAUSTED",
                    "next_ord called after NO_MORE_ORDS",
                ))
            }
            Some(last) => last,
        };
        let ord = self.inner.next_ord()?;
        if ord != NO_MORE_ORDS {
            if ord >= self.value_count {
                return Err(ConformanceError::violation(
                    "sorted_set.next_ord",
                    "ITERATING",
                    format!("ord {} >= value_count {}", ord, self.value_count),
                ));
            }
            if last.is_some_and(|last| ord <= last) {
                return Err(ConformanceError::violation(
                    "sorted_set.next_ord",
                    "ITERATING",
                    format!("ords out of order: {} after {:?}", ord, last),
                ));
            }
        }
        self.last_ord = Some(Some(ord));
        Ok(ord)
    }

    fn lookup_ord(&self, ord: u64, out: &mut Vec<u8>) -> Result<()> {
        if ord >= self.value_count {
            return Err(ConformanceError::violation(
                "sorted_set.lookup_ord",
                "OPEN",
                format!("ord {} >= value_count {}", ord, self.value_count),
            ));
        }
        self.inner.lookup_ord(ord, out)?;
        check_length("sorted_set.lookup_ord", out, self.inner.max_length())
    }

    fn value_count(&self) -> u64 {
        let now = self.inner.value_count();
        if now != self.value_count {
            tracing::warn!(was = self.value_count, now, "sorted-set value_count changed");
        }
        self.value_count
    }

    fn lookup_term(&self, key: &[u8]) -> Result<i64> {
        let result = self.inner.lookup_term(key)?;
        if result >= self.value_count as i64 {
            return Err(ConformanceError::violation(
                "sorted_set.lookup_term",
                "OPEN",
                format!("result {} >= value_count {}", result, self.value_count),
            ));
        }
        Ok(result)
    }

    fn max_length(&self) -> usize {
        self.inner.max_length()
    }
}

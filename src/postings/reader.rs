// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Segment-level read handle: postings plus deletions and doc values.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use super::{Fields, PostingsFormat, SegmentInfo};
use crate::error::Result;
use crate::types::{DocId, FieldInfos};
use crate::util::LiveDocs;

/// Extension of the live-docs file written next to a segment.
pub const LIVE_DOCS_EXTENSION: &str = "liv";

// ============================================================================
// DOC VALUES
// ============================================================================

pub trait NumericDocValues: Send {
    fn get(&self, doc: DocId) -> Result<i64>;
}

pub trait BinaryDocValues: Send {
    /// Fill `out` with the value of `doc`, replacing its contents.
    fn get(&self, doc: DocId, out: &mut Vec<u8>) -> Result<()>;

    /// Longest value the producer can return.
    fn max_length(&self) -> usize;
}

pub trait SortedDocValues: Send {
    /// Ordinal of `doc`'s value, `-1` when the doc has none.
    fn ord(&self, doc: DocId) -> Result<i64>;

    fn lookup_ord(&self, ord: i64, out: &mut Vec<u8>) -> Result<()>;

    fn value_count(&self) -> u64;

    /// Ordinal of `key`, or `-(insertion point) - 1` when absent.
    fn lookup_term(&self, key: &[u8]) -> Result<i64>;

    fn max_length(&self) -> usize;

    fn get(&self, doc: DocId, out: &mut Vec<u8>) -> Result<()> {
        let ord = self.ord(doc)?;
        if ord < 0 {
            out.clear();
            Ok(())
        } else {
            self.lookup_ord(ord, out)
        }
    }
}

pub trait SortedSetDocValues: Send {
    fn set_document(&mut self, doc: DocId) -> Result<()>;

    /// Next ordinal of the current doc, `NO_MORE_ORDS` when done.
    fn next_ord(&mut self) -> Result<u64>;

    fn lookup_ord(&self, ord: u64, out: &mut Vec<u8>) -> Result<()>;

    fn value_count(&self) -> u64;

    fn lookup_term(&self, key: &[u8]) -> Result<i64>;

    fn max_length(&self) -> usize;
}

// ============================================================================
// INDEX READER
// ============================================================================

/// Read view of one segment.
pub trait IndexReader: Send + Sync {
    type Fields: Fields + Clone;

    fn max_doc(&self) -> u32;

    fn num_docs(&self) -> u32;

    fn num_deleted_docs(&self) -> u32 {
        self.max_doc().saturating_sub(self.num_docs())
    }

    fn has_deletions(&self) -> bool {
        self.num_deleted_docs() > 0
    }

    /// `None` when nothing is deleted.
    fn live_docs(&self) -> Option<&LiveDocs>;

    fn fields(&self) -> Self::Fields;

    fn field_infos(&self) -> &FieldInfos;

    fn numeric_doc_values(&self, _field: &str) -> Result<Option<Box<dyn NumericDocValues>>> {
        Ok(None)
    }

    fn binary_doc_values(&self, _field: &str) -> Result<Option<Box<dyn BinaryDocValues>>> {
        Ok(None)
    }

    fn sorted_doc_values(&self, _field: &str) -> Result<Option<Box<dyn SortedDocValues>>> {
        Ok(None)
    }

    fn sorted_set_doc_values(&self, _field: &str) -> Result<Option<Box<dyn SortedSetDocValues>>> {
        Ok(None)
    }
}

/// Postings of any format plus the segment's live docs.
pub struct SegmentReader<F> {
    segment: SegmentInfo,
    field_infos: FieldInfos,
    fields: F,
    live_docs: Option<LiveDocs>,
}

impl<F: Fields + Clone> SegmentReader<F> {
    /// Open the format's producer and the live-docs file, if one exists.
    pub fn open<P>(format: &P, segment: &SegmentInfo, field_infos: &FieldInfos) -> Result<Self>
    where
        P: PostingsFormat<Producer = F>,
    {
        let fields = format.fields_producer(segment, field_infos)?;
        let live_docs = read_live_docs(segment)?;
        tracing::debug!(
            segment = %segment.name,
            format = format.name(),
            max_doc = segment.max_doc,
            deleted = live_docs.as_ref().map_or(0, |l| l.num_deleted()),
            "opened segment"
        );
        Ok(Self {
            segment: segment.clone(),
            field_infos: field_infos.clone(),
            fields,
            live_docs,
        })
    }

    pub fn segment(&self) -> &SegmentInfo {
        &self.segment
    }
}

impl<F: Fields + Clone> IndexReader for SegmentReader<F> {
    type Fields = F;

    fn max_doc(&self) -> u32 {
        self.segment.max_doc
    }

    fn num_docs(&self) -> u32 {
        self.live_docs.as_ref().map_or(self.segment.max_doc, LiveDocs::count)
    }

    fn live_docs(&self) -> Option<&LiveDocs> {
        self.live_docs.as_ref()
    }

    fn fields(&self) -> F {
        self.fields.clone()
    }

    fn field_infos(&self) -> &FieldInfos {
        &self.field_infos
    }
}

// ============================================================================
// LIVE DOCS FILE
// ============================================================================

pub fn live_docs_path(segment: &SegmentInfo) -> PathBuf {
    segment.file_path(LIVE_DOCS_EXTENSION)
}

/// Persist deletions next to the segment. A mask with no deletions is not
/// written: readers treat a missing file as "all live".
pub fn write_live_docs(segment: &SegmentInfo, live_docs: &LiveDocs) -> Result<()> {
    if live_docs.len() != segment.max_doc {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Live docs cover {} docs, segment has {}", live_docs.len(), segment.max_doc),
        )
        .into());
    }
    if live_docs.num_deleted() == 0 {
        return Ok(());
    }
    let mut w = BufWriter::new(File::create(live_docs_path(segment))?);
    live_docs.write_to(&mut w)?;
    w.flush()?;
    Ok(())
}

pub fn read_live_docs(segment: &SegmentInfo) -> Result<Option<LiveDocs>> {
    let path = live_docs_path(segment);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let live_docs = LiveDocs::read_from(&mut BufReader::new(file))?;
    if live_docs.len() != segment.max_doc {
        return Err(crate::error::corrupt(format!(
            "{}: live docs cover {} docs, segment has {}",
            path.display(),
            live_docs.len(),
            segment.max_doc
        )));
    }
    Ok(Some(live_docs))
}

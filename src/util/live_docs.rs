// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Live-docs mask over a segment's doc id space.
//!
//! A set bit means the document is visible. Cursors opened with a mask skip
//! unset docs entirely, so doc frequencies observed through them can be lower
//! than the stored ones. The bitmap is shared behind an `Arc`: every worker
//! thread filters against the same mask without copying it.

use std::io::{self, Read, Write};
use std::sync::Arc;

use roaring::RoaringBitmap;

use super::rng::DeterministicRng;
use crate::types::DocId;

#[derive(Debug, Clone)]
pub struct LiveDocs {
    bits: Arc<RoaringBitmap>,
    max_doc: u32,
}

impl LiveDocs {
    /// Every doc in `0..max_doc` is live.
    pub fn all(max_doc: u32) -> Self {
        let mut bits = RoaringBitmap::new();
        bits.insert_range(0..max_doc);
        Self::from_bitmap(bits, max_doc)
    }

    pub fn from_bitmap(bits: RoaringBitmap, max_doc: u32) -> Self {
        Self {
            bits: Arc::new(bits),
            max_doc,
        }
    }

    pub fn from_docs(docs: impl IntoIterator<Item = u32>, max_doc: u32) -> Self {
        let bits: RoaringBitmap = docs.into_iter().filter(|&d| d < max_doc).collect();
        Self::from_bitmap(bits, max_doc)
    }

    /// Random mask: a live ratio is drawn once, then each doc is live with
    /// that probability. Ratios near zero give mostly-deleted segments.
    pub fn random(max_doc: u32, rng: &mut DeterministicRng) -> Self {
        let live_ratio = rng.next_f64();
        let mut bits = RoaringBitmap::new();
        for doc in 0..max_doc {
            if rng.next_f64() <= live_ratio {
                bits.insert(doc);
            }
        }
        Self::from_bitmap(bits, max_doc)
    }

    /// Whether `doc` is live. Ids outside `0..max_doc` are never live.
    #[inline]
    pub fn get(&self, doc: DocId) -> bool {
        doc >= 0 && (doc as u32) < self.max_doc && self.bits.contains(doc as u32)
    }

    /// Length of the id space the mask covers (the segment's `max_doc`).
    pub fn len(&self) -> u32 {
        self.max_doc
    }

    pub fn is_empty(&self) -> bool {
        self.max_doc == 0
    }

    pub fn count(&self) -> u32 {
        self.bits.len() as u32
    }

    pub fn num_deleted(&self) -> u32 {
        self.max_doc - self.count()
    }

    pub fn bitmap(&self) -> &RoaringBitmap {
        &self.bits
    }

    /// Write `max_doc` followed by the roaring serialisation.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.max_doc.to_le_bytes())?;
        self.bits.serialize_into(w)
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut len = [0u8; 4];
        r.read_exact(&mut len)?;
        let max_doc = u32::from_le_bytes(len);
        let bits = RoaringBitmap::deserialize_from(r)?;
        if bits.max().is_some_and(|m| m >= max_doc) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Live doc beyond max_doc {}", max_doc),
            ));
        }
        Ok(Self::from_bitmap(bits, max_doc))
    }
}

// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Arbitrary postings written through the block format must read back
//! unchanged.

#![no_main]

use std::collections::{BTreeMap, BTreeSet};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sorex_conformance::{
    BlockPostingsFormat, DocsEnum, DocsFlags, FieldInfo, FieldInfos, FieldStats, Fields, FieldsConsumer,
    IndexOptions, IndexReader, PostingsFormat, SegmentInfo, SegmentReader, TermStats, Terms, TermsEnum,
    NO_MORE_DOCS,
};

const MAX_DOC: u32 = 2048;

#[derive(Debug, Arbitrary)]
struct Input {
    /// term -> doc ids (masked into range) -> freq
    terms: BTreeMap<Vec<u8>, BTreeMap<u16, u8>>,
}

fuzz_target!(|input: Input| {
    let terms: BTreeMap<Vec<u8>, BTreeMap<i32, u32>> = input
        .terms
        .into_iter()
        .filter(|(text, _)| !text.is_empty() && text.len() <= 64)
        .map(|(text, docs)| {
            let docs: BTreeMap<i32, u32> = docs
                .into_iter()
                .map(|(d, f)| (i32::from(d) % MAX_DOC as i32, u32::from(f).max(1)))
                .collect();
            (text, docs)
        })
        .filter(|(_, docs)| !docs.is_empty())
        .collect();
    if terms.is_empty() {
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let format = BlockPostingsFormat::new();
    let segment = SegmentInfo::new(dir.path(), "_0", MAX_DOC);
    let info = FieldInfo::new("body", 0, IndexOptions::DocsAndFreqs);
    let infos = FieldInfos::new([info.clone()]);

    let mut consumer = format.fields_consumer(&segment, &infos).expect("consumer");
    let mut stats = FieldStats::default();
    let mut seen = BTreeSet::new();
    let mut sum_ttf = 0u64;
    consumer.start_field(&info).expect("start field");
    for (text, docs) in &terms {
        consumer.start_term(text).expect("start term");
        let mut ttf = 0u64;
        for (&doc, &freq) in docs {
            consumer.start_doc(doc, Some(freq)).expect("start doc");
            consumer.finish_doc().expect("finish doc");
            ttf += u64::from(freq);
            seen.insert(doc);
        }
        let term_stats = TermStats {
            doc_freq: docs.len() as u32,
            total_term_freq: Some(ttf),
        };
        consumer.finish_term(text, term_stats).expect("finish term");
        sum_ttf += ttf;
        stats.sum_doc_freq += docs.len() as u64;
    }
    stats.sum_total_term_freq = Some(sum_ttf);
    stats.doc_count = seen.len() as u32;
    consumer.finish_field(stats).expect("finish field");
    consumer.close().expect("close");

    let reader = SegmentReader::open(&format, &segment, &infos).expect("reopen");
    let fields = reader.fields();
    let mut te = fields.terms("body").expect("terms").expect("body").iterator().expect("iterator");
    for (text, docs) in &terms {
        assert_eq!(te.next().expect("next"), Some(text.as_slice()));
        let mut cursor = te.docs(None, None, DocsFlags::FREQS).expect("docs");
        for (&doc, &freq) in docs {
            assert_eq!(cursor.next_doc().expect("next_doc"), doc);
            assert_eq!(cursor.freq().expect("freq"), freq);
        }
        assert_eq!(cursor.next_doc().expect("next_doc"), NO_MORE_DOCS);
    }
    assert_eq!(te.next().expect("next"), None);
});

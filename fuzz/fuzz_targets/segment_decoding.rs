// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Block segment parsing under adversarial input.
//!
//! The worst a corrupt `.pst` file may do is return an error. Once a file
//! opens, walking every term and cursor must also terminate without a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sorex_conformance::binary::open_segment;
use sorex_conformance::{
    DocsAndPositionsEnum, DocsEnum, DocsFlags, Fields, PositionsFlags, Terms, TermsEnum, NO_MORE_DOCS,
};

/// Upper bound on work per input so a huge claimed freq cannot stall the run.
const MAX_STEPS: usize = 100_000;

fuzz_target!(|data: &[u8]| {
    let Ok(fields) = open_segment(data.to_vec()) else {
        return;
    };
    let mut steps = 0usize;
    for name in fields.field_names() {
        let Ok(Some(terms)) = fields.terms(&name) else {
            continue;
        };
        let Ok(mut te) = terms.iterator() else {
            continue;
        };
        while let Ok(Some(_)) = te.next() {
            let _ = te.doc_freq();
            let _ = te.total_term_freq();
            if let Ok(mut docs) = te.docs(None, None, DocsFlags::FREQS) {
                while let Ok(doc) = docs.next_doc() {
                    steps += 1;
                    if doc == NO_MORE_DOCS || steps > MAX_STEPS {
                        break;
                    }
                    assert!(doc >= 0);
                    let _ = docs.freq();
                }
            }
            let flags = PositionsFlags::OFFSETS.with(PositionsFlags::PAYLOADS);
            if let Ok(Some(mut positions)) = te.docs_and_positions(None, None, flags) {
                if let Ok(doc) = positions.next_doc() {
                    if doc != NO_MORE_DOCS {
                        let freq = positions.freq().unwrap_or(0) as usize;
                        for _ in 0..freq.min(MAX_STEPS) {
                            if positions.next_position().is_err() {
                                break;
                            }
                            let _ = positions.payload();
                        }
                    }
                }
            }
            if steps > MAX_STEPS {
                return;
            }
        }
    }
});

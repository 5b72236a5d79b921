// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::Path;

use sorex_conformance::binary::header::{SegmentHeader, MAGIC};
use sorex_conformance::binary::{open_segment, POSTINGS_EXTENSION};
use sorex_conformance::{
    BlockPostingsFormat, ConformanceError, FieldInfos, Fields, IndexOptions, SegmentInfo, SegmentReader,
};

use crate::common::{body, greeting_terms, write_segment};

fn segment_bytes(dir: &Path) -> Vec<u8> {
    write_segment(
        &BlockPostingsFormat::new(),
        dir,
        8,
        &body(IndexOptions::DocsAndFreqsAndPositions),
        &greeting_terms(),
        None,
    );
    std::fs::read(SegmentInfo::new(dir, "_0", 8).file_path(POSTINGS_EXTENSION)).unwrap()
}

fn io_kind(err: &ConformanceError) -> io::ErrorKind {
    match err {
        ConformanceError::Resource(e) => e.kind(),
        other => panic!("expected an I/O error, got {other}"),
    }
}

#[test]
fn intact_segment_opens() {
    let dir = tempfile::tempdir().unwrap();
    let fields = open_segment(segment_bytes(dir.path())).unwrap();
    assert_eq!(fields.size(), 1);
    assert_eq!(fields.max_doc(), 8);
}

#[test]
fn empty_file_is_rejected() {
    let err = open_segment(Vec::new()).unwrap_err();
    assert_eq!(io_kind(&err), io::ErrorKind::UnexpectedEof);
}

#[test]
fn truncation_is_rejected_at_every_length() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = segment_bytes(dir.path());
    for len in 0..bytes.len() {
        let err = open_segment(bytes[..len].to_vec()).unwrap_err();
        assert!(matches!(err, ConformanceError::Resource(_)), "len {len}: {err}");
    }
}

#[test]
fn trailing_garbage_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = segment_bytes(dir.path());
    bytes.extend_from_slice(b"junk");
    let err = open_segment(bytes).unwrap_err();
    assert_eq!(io_kind(&err), io::ErrorKind::InvalidData);
}

#[test]
fn foreign_magic_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = segment_bytes(dir.path());
    assert_eq!(&bytes[..4], &MAGIC);
    bytes[..4].copy_from_slice(b"PK\x03\x04");
    let err = open_segment(bytes).unwrap_err();
    assert!(err.to_string().contains("Invalid magic"), "{err}");
}

#[test]
fn unknown_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = segment_bytes(dir.path());
    bytes[4] = 99;
    let err = open_segment(bytes).unwrap_err();
    assert!(err.to_string().contains("Unsupported version"), "{err}");
}

#[test]
fn flipped_content_byte_fails_the_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = segment_bytes(dir.path());
    let mid = SegmentHeader::SIZE + (bytes.len() - SegmentHeader::SIZE) / 2;
    bytes[mid] ^= 0x40;
    let err = open_segment(bytes).unwrap_err();
    assert!(err.to_string().contains("CRC32 mismatch"), "{err}");
}

#[test]
fn damaged_footer_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = segment_bytes(dir.path());
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    let err = open_segment(bytes).unwrap_err();
    assert!(err.to_string().contains("footer magic"), "{err}");
}

#[test]
fn segment_reader_surfaces_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = segment_bytes(dir.path());
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;
    let segment = SegmentInfo::new(dir.path(), "_0", 8);
    std::fs::write(segment.file_path(POSTINGS_EXTENSION), &bytes).unwrap();

    let infos = FieldInfos::new([body(IndexOptions::DocsAndFreqsAndPositions)]);
    assert!(SegmentReader::open(&BlockPostingsFormat::new(), &segment, &infos).is_err());
}

#[test]
fn missing_segment_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let segment = SegmentInfo::new(dir.path(), "_missing", 8);
    let infos = FieldInfos::new([body(IndexOptions::DocsOnly)]);
    match SegmentReader::open(&BlockPostingsFormat::new(), &segment, &infos) {
        Err(err) => assert_eq!(io_kind(&err), io::ErrorKind::NotFound),
        Ok(_) => panic!("opened a segment that was never written"),
    }
}

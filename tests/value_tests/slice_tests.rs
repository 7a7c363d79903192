//! Tests for ValueSlice
//!
//! These tests verify:
//! - Reads are clamped to the value region
//! - Seeking from start / current / end, and clamping
//! - Numeric seek modes, including unsupported ones
//! - Truncated backing data is reported, not hidden
//! - Both memory-map strategies over real files

use std::fs;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::sync::Arc;

use bytes::Bytes;
use filekv::directory::{MappedFile, MemoryBacking, RecordBacking};
use filekv::value::{SEEK_CUR, SEEK_END, SEEK_SET};
use filekv::{FileKvError, ValueSlice};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// "HDR" prefix followed by `value`
fn slice_over(value: &'static [u8]) -> ValueSlice {
    let mut data = b"HDR".to_vec();
    data.extend_from_slice(value);
    let backing: Arc<dyn RecordBacking> = Arc::new(MemoryBacking(Bytes::from(data)));
    ValueSlice::new(backing, 3, value.len() as u64)
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_chunk_from_offset() {
    let mut slice = slice_over(b"hello world");

    assert_eq!(slice.read_chunk(5).unwrap(), b"hello");
    assert_eq!(slice.tell(), 5);
    assert_eq!(slice.read_chunk(100).unwrap(), b" world");
    assert_eq!(slice.tell(), 11);
}

#[test]
fn test_read_past_end_returns_empty() {
    let mut slice = slice_over(b"abc");

    assert_eq!(slice.read_chunk(3).unwrap(), b"abc");
    assert!(slice.read_chunk(10).unwrap().is_empty());
    assert!(slice.read_chunk(10).unwrap().is_empty());
    assert_eq!(slice.tell(), 3);
}

#[test]
fn test_empty_value() {
    let mut slice = slice_over(b"");

    assert!(slice.is_empty());
    assert!(slice.read_chunk(16).unwrap().is_empty());
    assert!(slice.read_all().unwrap().is_empty());
}

#[test]
fn test_io_read_impl() {
    let mut slice = slice_over(b"streamed value");
    let mut out = String::new();

    slice.read_to_string(&mut out).unwrap();
    assert_eq!(out, "streamed value");
}

#[test]
fn test_read_all_and_copy_to() {
    let mut slice = slice_over(b"0123456789");
    slice.seek(SeekFrom::Start(4)).unwrap();
    assert_eq!(slice.read_all().unwrap(), b"456789");

    slice.seek(SeekFrom::Start(0)).unwrap();
    let mut sink = Vec::new();
    assert_eq!(slice.copy_to(&mut sink).unwrap(), 10);
    assert_eq!(sink, b"0123456789");
}

// =============================================================================
// Seek Tests
// =============================================================================

#[test]
fn test_seek_modes() {
    let mut slice = slice_over(b"0123456789");

    assert_eq!(slice.seek(SeekFrom::Start(2)).unwrap(), 2);
    assert_eq!(slice.seek(SeekFrom::Current(3)).unwrap(), 5);
    assert_eq!(slice.read_chunk(2).unwrap(), b"56");
    assert_eq!(slice.seek(SeekFrom::End(-3)).unwrap(), 7);
    assert_eq!(slice.read_chunk(10).unwrap(), b"789");
    assert_eq!(slice.seek(SeekFrom::Current(-10)).unwrap(), 0);
}

#[test]
fn test_seek_past_end_is_clamped() {
    let mut slice = slice_over(b"abc");

    assert_eq!(slice.seek(SeekFrom::Start(100)).unwrap(), 3);
    assert_eq!(slice.seek(SeekFrom::End(5)).unwrap(), 3);
    assert!(slice.read_chunk(1).unwrap().is_empty());
}

#[test]
fn test_seek_negative_fails() {
    let mut slice = slice_over(b"abc");
    slice.seek(SeekFrom::Start(1)).unwrap();

    let err = slice.seek(SeekFrom::Current(-2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    // Position unchanged on failure
    assert_eq!(slice.tell(), 1);
}

#[test]
fn test_seek_whence() {
    let mut slice = slice_over(b"0123456789");

    assert_eq!(slice.seek_whence(4, SEEK_SET).unwrap(), 4);
    assert_eq!(slice.seek_whence(2, SEEK_CUR).unwrap(), 6);
    assert_eq!(slice.seek_whence(-1, SEEK_END).unwrap(), 9);
    assert_eq!(slice.read_chunk(5).unwrap(), b"9");
}

#[test]
fn test_seek_whence_unsupported_mode() {
    let mut slice = slice_over(b"abc");

    assert!(matches!(
        slice.seek_whence(0, 3),
        Err(FileKvError::UnsupportedSeekMode(3))
    ));
    assert!(matches!(
        slice.seek_whence(0, -1),
        Err(FileKvError::UnsupportedSeekMode(-1))
    ));
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncated_backing() {
    // Header claims 10 value bytes, only 4 are present
    let backing: Arc<dyn RecordBacking> = Arc::new(MemoryBacking(Bytes::from_static(b"HDRabcd")));
    let mut slice = ValueSlice::new(backing, 3, 10);

    assert!(matches!(
        slice.read_chunk(10),
        Err(FileKvError::TruncatedRecord {
            expected: 13,
            actual: 7
        })
    ));
    // Reads within the available range still work
    assert_eq!(slice.read_chunk(4).unwrap(), b"abcd");
}

#[test]
fn test_truncated_backing_through_io_read() {
    let backing: Arc<dyn RecordBacking> = Arc::new(MemoryBacking(Bytes::from_static(b"HDRab")));
    let mut slice = ValueSlice::new(backing, 3, 10);
    let mut out = Vec::new();

    let err = slice.read_to_end(&mut out).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
}

// =============================================================================
// Memory Map Tests
// =============================================================================

#[test]
fn test_mapped_file_per_read() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("record");
    fs::write(&path, b"HDRmapped bytes").unwrap();

    let backing: Arc<dyn RecordBacking> = Arc::new(MappedFile::per_read(path).unwrap());
    let mut slice = ValueSlice::new(backing, 3, 12);

    assert_eq!(slice.read_chunk(6).unwrap(), b"mapped");
    assert_eq!(slice.read_all().unwrap(), b" bytes");
}

#[test]
fn test_mapped_file_held() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("record");
    fs::write(&path, b"HDRheld map").unwrap();

    let backing: Arc<dyn RecordBacking> = Arc::new(MappedFile::held(path).unwrap());
    assert_eq!(backing.len().unwrap(), 11);

    let mut slice = ValueSlice::new(backing, 3, 8);
    assert_eq!(slice.read_all().unwrap(), b"held map");
}

#[test]
fn test_mapped_file_per_read_sees_truncation() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("record");
    fs::write(&path, b"HDRabcdef").unwrap();

    let backing: Arc<dyn RecordBacking> = Arc::new(MappedFile::per_read(path.clone()).unwrap());
    let mut slice = ValueSlice::new(backing, 3, 6);
    assert_eq!(slice.read_chunk(2).unwrap(), b"ab");

    // Record shrinks underneath the reader
    fs::write(&path, b"HDRab").unwrap();
    assert!(matches!(
        slice.read_chunk(4),
        Err(FileKvError::TruncatedRecord { .. })
    ));
}

#[test]
fn test_mapped_empty_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty");
    fs::write(&path, b"").unwrap();

    let held = MappedFile::held(path.clone()).unwrap();
    assert_eq!(held.len().unwrap(), 0);

    let mut buf = [0u8; 4];
    assert_eq!(held.read_at(0, &mut buf).unwrap(), 0);

    let per_read = MappedFile::per_read(path).unwrap();
    assert_eq!(per_read.read_at(0, &mut buf).unwrap(), 0);
}

#[test]
fn test_mapped_missing_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing");

    assert!(MappedFile::per_read(path.clone()).unwrap_err().is_not_found());
    assert!(MappedFile::held(path).unwrap_err().is_not_found());
}

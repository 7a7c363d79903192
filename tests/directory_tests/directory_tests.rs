//! Tests for the directory index and open mode resolution
//!
//! These tests verify:
//! - Filesystem and in-memory directories behave the same
//! - Only regular files count as entries
//! - Open flags create, require or wipe the directory

use std::fs;
use std::io::Write;
use std::time::{Duration, SystemTime};

use filekv::directory::{DirectoryIndex, FsDirectory, MemoryDirectory};
use filekv::open::{resolve, OpenMode};
use filekv::{FileKvError, MappingStrategy};
use tempfile::TempDir;

// =============================================================================
// Shared Behaviour
// =============================================================================

fn exercise_directory(dir: &dyn DirectoryIndex) {
    assert!(dir.list_entries().unwrap().is_empty());
    assert!(!dir.exists("aa"));
    assert_eq!(dir.modified("aa").unwrap(), None);

    let mut sink = dir.create("aa").unwrap();
    sink.write_all(b"record bytes").unwrap();
    sink.finish().unwrap();

    assert!(dir.exists("aa"));
    assert!(dir.modified("aa").unwrap().is_some());
    assert_eq!(dir.list_entries().unwrap(), vec!["aa".to_string()]);
    assert_eq!(dir.resolve("aa"), dir.root().join("aa"));

    for mapping in [MappingStrategy::PerRead, MappingStrategy::Held] {
        let backing = dir.open("aa", mapping).unwrap();
        assert_eq!(backing.len().unwrap(), 12);

        let mut buf = [0u8; 5];
        assert_eq!(backing.read_at(7, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"bytes");
        assert_eq!(backing.read_at(10, &mut buf).unwrap(), 2);
        assert_eq!(backing.read_at(100, &mut buf).unwrap(), 0);
    }

    // Overwrite truncates
    let mut sink = dir.create("aa").unwrap();
    sink.write_all(b"new").unwrap();
    sink.finish().unwrap();
    assert_eq!(
        dir.open("aa", MappingStrategy::PerRead).unwrap().len().unwrap(),
        3
    );

    assert!(dir.remove("aa").unwrap());
    assert!(!dir.remove("aa").unwrap());
    assert!(!dir.exists("aa"));
    match dir.open("aa", MappingStrategy::PerRead) {
        Err(e) => assert!(e.is_not_found()),
        Ok(_) => panic!("Expected removed entry to be gone"),
    }
}

#[test]
fn test_fs_directory_behaviour() {
    let temp = TempDir::new().unwrap();
    let dir = FsDirectory::new(temp.path()).unwrap();
    exercise_directory(&dir);
}

#[test]
fn test_memory_directory_behaviour() {
    let dir = MemoryDirectory::new();
    exercise_directory(&dir);
}

// =============================================================================
// Filesystem Specifics
// =============================================================================

#[test]
fn test_fs_directory_missing_root() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");

    assert!(matches!(
        FsDirectory::new(&missing),
        Err(FileKvError::NotFound(p)) if p == missing
    ));
}

#[test]
fn test_fs_directory_ignores_subdirectories() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("subdir")).unwrap();
    fs::write(temp.path().join("abcdef"), b"x").unwrap();

    let dir = FsDirectory::new(temp.path()).unwrap();
    assert_eq!(dir.list_entries().unwrap(), vec!["abcdef".to_string()]);
    assert!(!dir.exists("subdir"));
    assert_eq!(dir.modified("subdir").unwrap(), None);
}

// =============================================================================
// Memory Specifics
// =============================================================================

#[test]
fn test_memory_set_modified() {
    let dir = MemoryDirectory::new();
    dir.insert_raw("k", b"v".to_vec());

    let past = SystemTime::now() - Duration::from_secs(3600);
    assert!(dir.set_modified("k", past));
    assert_eq!(dir.modified("k").unwrap(), Some(past));
    assert!(!dir.set_modified("missing", past));
}

#[test]
fn test_memory_unfinished_sink_publishes_nothing() {
    let dir = MemoryDirectory::new();
    {
        let mut sink = dir.create("k").unwrap();
        sink.write_all(b"partial").unwrap();
    }
    assert!(dir.is_empty());
}

// =============================================================================
// Open Mode Tests
// =============================================================================

#[test]
fn test_open_mode_flags() {
    assert_eq!("r".parse::<OpenMode>().unwrap(), OpenMode::ReadOnly);
    assert_eq!("w".parse::<OpenMode>().unwrap(), OpenMode::ReadWrite);
    assert_eq!("c".parse::<OpenMode>().unwrap(), OpenMode::Create);
    assert_eq!("n".parse::<OpenMode>().unwrap(), OpenMode::Replace);
    assert!(matches!(
        "x".parse::<OpenMode>(),
        Err(FileKvError::InvalidArgument(_))
    ));

    assert_eq!(OpenMode::default(), OpenMode::ReadOnly);
    assert_eq!(OpenMode::Create.to_string(), "c");
    assert!(!OpenMode::ReadOnly.is_writable());
    assert!(OpenMode::ReadWrite.is_writable());
}

#[test]
fn test_resolve_requires_existing_for_r_and_w() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("db");

    assert!(matches!(
        resolve(&path, OpenMode::ReadOnly),
        Err(FileKvError::NotFound(_))
    ));
    assert!(matches!(
        resolve(&path, OpenMode::ReadWrite),
        Err(FileKvError::NotFound(_))
    ));
    assert!(!path.exists());
}

#[test]
fn test_resolve_create() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("db");

    let (root, writable) = resolve(&path, OpenMode::Create).unwrap();
    assert_eq!(root, path);
    assert!(writable);
    assert!(path.is_dir());

    // Existing contents are kept
    fs::write(path.join("entry"), b"x").unwrap();
    resolve(&path, OpenMode::Create).unwrap();
    assert!(path.join("entry").exists());

    let (_, writable) = resolve(&path, OpenMode::ReadOnly).unwrap();
    assert!(!writable);
}

#[test]
fn test_resolve_replace_wipes() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("db");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("entry"), b"x").unwrap();

    let (_, writable) = resolve(&path, OpenMode::Replace).unwrap();
    assert!(writable);
    assert!(path.is_dir());
    assert_eq!(fs::read_dir(&path).unwrap().count(), 0);
}

#[test]
fn test_resolve_path_is_a_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("file");
    fs::write(&path, b"x").unwrap();

    assert!(matches!(
        resolve(&path, OpenMode::ReadOnly),
        Err(FileKvError::NotFound(_))
    ));
}

//! In-memory directory
//!
//! Entries live in a hash map behind a `parking_lot::RwLock`. Useful for
//! exercising the engine without touching the filesystem, including TTL
//! behaviour through [`MemoryDirectory::set_modified`].

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::config::MappingStrategy;
use crate::error::Result;

use super::{DirectoryIndex, RecordBacking, RecordSink};

#[derive(Debug, Clone)]
struct MemEntry {
    data: Bytes,
    modified: SystemTime,
}

/// Directory whose entries are kept in memory
#[derive(Debug)]
pub struct MemoryDirectory {
    root: PathBuf,
    entries: RwLock<HashMap<String, MemEntry>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("memory"),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Raw bytes of an entry
    pub fn raw(&self, name: &str) -> Option<Bytes> {
        self.entries.read().get(name).map(|e| e.data.clone())
    }

    /// Insert raw bytes as an entry, bypassing the record codec
    pub fn insert_raw(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.entries.write().insert(
            name.into(),
            MemEntry {
                data: data.into(),
                modified: SystemTime::now(),
            },
        );
    }

    /// Override an entry's modification time; returns false if absent
    pub fn set_modified(&self, name: &str, modified: SystemTime) -> bool {
        match self.entries.write().get_mut(name) {
            Some(entry) => {
                entry.modified = modified;
                true
            }
            None => false,
        }
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryIndex for MemoryDirectory {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_entries(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn exists(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    fn modified(&self, name: &str) -> Result<Option<SystemTime>> {
        Ok(self.entries.read().get(name).map(|e| e.modified))
    }

    fn create(&self, name: &str) -> Result<Box<dyn RecordSink + '_>> {
        Ok(Box::new(MemorySink {
            dir: self,
            name: name.to_string(),
            buf: Vec::new(),
        }))
    }

    fn open(&self, name: &str, _mapping: MappingStrategy) -> Result<Box<dyn RecordBacking>> {
        match self.entries.read().get(name) {
            Some(entry) => Ok(Box::new(MemoryBacking(entry.data.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no entry named {}", name),
            )
            .into()),
        }
    }

    fn remove(&self, name: &str) -> Result<bool> {
        Ok(self.entries.write().remove(name).is_some())
    }
}

/// Collects a record and publishes it on `finish`
struct MemorySink<'a> {
    dir: &'a MemoryDirectory,
    name: String,
    buf: Vec<u8>,
}

impl Write for MemorySink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RecordSink for MemorySink<'_> {
    fn finish(self: Box<Self>) -> Result<()> {
        let MemorySink { dir, name, buf } = *self;
        dir.insert_raw(name, buf);
        Ok(())
    }
}

/// Immutable snapshot of an in-memory entry
#[derive(Debug, Clone)]
pub struct MemoryBacking(pub Bytes);

impl RecordBacking for MemoryBacking {
    fn len(&self) -> Result<u64> {
        Ok(self.0.len() as u64)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let len = self.0.len() as u64;
        if offset >= len {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.0.len() - start);
        buf[..n].copy_from_slice(&self.0[start..start + n]);
        Ok(n)
    }
}

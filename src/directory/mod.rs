//! Directory Module
//!
//! The store has no index of its own: the set of entries in its directory is
//! the index. This module makes that explicit so the engine can run against
//! a real directory or an in-memory fake.
//!
//! ## Responsibilities
//! - Enumerate entry names (one entry = one record)
//! - Resolve, probe and remove entries by name
//! - Hand out a sink for writing a record and a backing for reading one
//!
//! ## Implementations
//! - [`FsDirectory`]: one regular file per entry, read through memory maps
//! - [`MemoryDirectory`]: entries in a hash map, for tests and tooling

mod fs;
mod memory;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::MappingStrategy;
use crate::error::Result;

pub use fs::{FsDirectory, MappedFile};
pub use memory::{MemoryBacking, MemoryDirectory};

/// Random-access, read-only view of one record's bytes
pub trait RecordBacking: Send + Sync {
    /// Physical length of the record
    fn len(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy bytes starting at `offset` into `buf`
    ///
    /// Returns the number of bytes copied, which is less than `buf.len()`
    /// only when the record ends first.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;
}

/// Destination of one record write
pub trait RecordSink: Write {
    /// Flush everything written so far and release the entry
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Explicit view of the store directory as an index of entries
pub trait DirectoryIndex: Send + Sync {
    /// Root location of the store
    fn root(&self) -> &Path;

    /// Snapshot of all entry names, in unspecified order
    fn list_entries(&self) -> Result<Vec<String>>;

    /// Location of the entry `name`
    fn resolve(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// Whether the entry exists
    fn exists(&self, name: &str) -> bool;

    /// Last modification time, `None` if the entry does not exist
    fn modified(&self, name: &str) -> Result<Option<SystemTime>>;

    /// Create (or truncate) the entry for writing
    fn create(&self, name: &str) -> Result<Box<dyn RecordSink + '_>>;

    /// Open the entry for reading
    fn open(&self, name: &str, mapping: MappingStrategy) -> Result<Box<dyn RecordBacking>>;

    /// Remove the entry; returns false if it did not exist
    fn remove(&self, name: &str) -> Result<bool>;
}

//! Engine Module
//!
//! The store engine: one record file per key, looked up by key digest.
//!
//! ## Responsibilities
//! - Hash keys to entry names and resolve them through the directory index
//! - Write records (header, then the value streamed in bounded chunks)
//! - Hand out value readers positioned at the value region of a record
//! - Apply TTL expiry lazily, whenever an entry is touched
//! - Enumerate, count and clear entries

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::config::Config;
use crate::directory::{DirectoryIndex, FsDirectory, RecordBacking};
use crate::error::{FileKvError, Result};
use crate::hasher::KeyHasher;
use crate::open::{self, OpenMode};
use crate::record::{encode_header, read_header, FieldWidths, RecordHeader};
use crate::source::ValueSource;
use crate::value::ValueSlice;

/// The key-value store
///
/// ## Concurrency Model: Single Writer
///
/// The engine holds no locks. Every operation goes straight to the
/// directory, so concurrent use is only as safe as the underlying
/// per-file open/read/write/delete calls. A reader racing a writer can see a
/// record whose body is shorter than its header declares; value reads then
/// fail with `TruncatedRecord`. A rewrite replaces the record file, so
/// readers opened earlier never observe the new bytes.
///
/// ## Expiry
///
/// With a TTL configured, an entry whose modification time is older than
/// `now - ttl` is deleted the next time `get`, `contains`, `count` or an
/// iterator reaches it, and treated as absent. There is no background sweep.
pub struct Store<D: DirectoryIndex = FsDirectory> {
    /// Store configuration (TTL forced off for read-only stores)
    config: Config,

    /// Entries of the store
    dir: D,

    /// Key → entry name
    hasher: KeyHasher,

    /// Length field widths of the record header
    widths: FieldWidths,

    /// Fixed at open
    writable: bool,
}

/// Liveness of an entry after lazy expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Absent,
    Expired,
    Live,
}

impl Store<FsDirectory> {
    /// Open a store directory
    ///
    /// On open:
    /// 1. Resolve the open mode (create / wipe the directory as needed)
    /// 2. Validate the configuration
    /// 3. Ready to serve requests; nothing is read up front
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, config: Config) -> Result<Self> {
        let (root, writable) = open::resolve(path.as_ref(), mode)?;
        let dir = FsDirectory::new(root)?;
        Self::with_directory(dir, writable, config)
    }

    /// Open with the default configuration
    pub fn open_path(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        Self::open(path, mode, Config::default())
    }
}

impl<D: DirectoryIndex> Store<D> {
    /// Build a store over an already resolved directory
    pub fn with_directory(dir: D, writable: bool, mut config: Config) -> Result<Self> {
        config.validate()?;

        // Expiry deletes entries, which a read-only store must never do.
        if !writable && config.ttl.is_some() {
            tracing::debug!("ignoring ttl on read-only store");
            config.ttl = None;
        }

        let hasher = KeyHasher::new(config.digest_size)?;
        let widths = FieldWidths::from_config(&config)?;

        tracing::info!(
            root = %dir.root().display(),
            writable,
            ttl = ?config.ttl,
            "store opened"
        );

        Ok(Self {
            config,
            dir,
            hasher,
            widths,
            writable,
        })
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Write `value` under `key`, replacing any previous record
    ///
    /// Steps:
    /// 1. Encode the header (fails with `EncodingOverflow` before touching disk)
    /// 2. Replace the entry with a new file and write header + key
    /// 3. Stream the value in `write_buffer_size` chunks
    /// 4. On any failure, remove the partial record before returning
    pub fn put<'a>(&self, key: &str, value: impl Into<ValueSource<'a>>) -> Result<()> {
        self.ensure_writable()?;

        let mut source = value.into();
        let value_len = source.len();
        let header = encode_header(key.as_bytes(), value_len, self.widths)?;

        let name = self.entry_name(key);
        let mut sink = self.dir.create(&name)?;

        let streamed = self.stream_record(&mut *sink, &header, &mut source);
        let finished = sink.finish();

        let outcome = streamed.and_then(|written| {
            finished?;
            if written < value_len {
                return Err(FileKvError::TruncatedRecord {
                    expected: value_len,
                    actual: written,
                });
            }
            Ok(())
        });

        if let Err(e) = outcome {
            // No record may claim more bytes than it holds.
            if let Err(cleanup) = self.dir.remove(&name) {
                tracing::warn!(entry = %name, error = %cleanup, "failed to remove partial record");
            }
            tracing::debug!(key, entry = %name, error = %e, "put aborted");
            return Err(e);
        }

        tracing::debug!(key, entry = %name, value_len, "put");
        Ok(())
    }

    /// Write header + key, then the value in `write_buffer_size` chunks.
    /// Returns the number of value bytes written.
    fn stream_record<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        header: &[u8],
        source: &mut ValueSource<'_>,
    ) -> Result<u64> {
        sink.write_all(header)?;

        let mut written = 0u64;
        loop {
            let chunk = source.read_chunk(self.config.write_buffer_size)?;
            if chunk.is_empty() {
                break;
            }
            sink.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }

    /// Write an in-memory value
    pub fn put_bytes(&self, key: &str, value: &[u8]) -> Result<()> {
        self.put(key, ValueSource::from_bytes(value.to_vec()))
    }

    /// Write several pairs in order
    pub fn update<'a, K, V, I>(&self, items: I) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<ValueSource<'a>>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.ensure_writable()?;
        for (key, value) in items {
            self.put(key.as_ref(), value)?;
        }
        Ok(())
    }

    /// Remove `key`
    ///
    /// Fails with `KeyNotFound` if there is no record for it.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.ensure_writable()?;

        let name = self.entry_name(key);
        if !self.dir.remove(&name)? {
            return Err(FileKvError::KeyNotFound(key.to_string()));
        }

        tracing::debug!(key, entry = %name, "delete");
        Ok(())
    }

    /// Remove every record
    pub fn clear(&self) -> Result<()> {
        self.ensure_writable()?;

        let mut removed = 0usize;
        for name in self.dir.list_entries()? {
            if self.dir.remove(&name)? {
                removed += 1;
            }
        }

        tracing::info!(removed, "store cleared");
        Ok(())
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Reader over the value stored under `key`
    ///
    /// Returns `None` if the key is absent or has just expired.
    pub fn get(&self, key: &str) -> Result<Option<ValueSlice>> {
        let name = self.entry_name(key);

        if self.entry_state(&name)? != EntryState::Live {
            return Ok(None);
        }

        match self.open_record(&name) {
            Ok((backing, header)) => Ok(Some(ValueSlice::new(
                backing,
                header.value_offset,
                header.value_length,
            ))),
            // Removed between the liveness check and the open
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Value stored under `key`, read fully into memory
    pub fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.get(key)? {
            Some(mut slice) => Ok(Some(slice.read_all()?)),
            None => Ok(None),
        }
    }

    /// Whether a live record exists for `key`
    pub fn contains(&self, key: &str) -> Result<bool> {
        let name = self.entry_name(key);
        Ok(self.entry_state(&name)? == EntryState::Live)
    }

    /// Number of live records
    pub fn count(&self) -> Result<usize> {
        let mut count = 0;
        for name in self.dir.list_entries()? {
            if self.entry_state(&name)? == EntryState::Live {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Lazily enumerate records
    ///
    /// The set of entries is snapshotted now; records are decoded as the
    /// iterator advances. At least one of `want_keys` / `want_values` must
    /// be set.
    pub fn iter(&self, want_keys: bool, want_values: bool) -> Result<StoreIter<'_, D>> {
        if !want_keys && !want_values {
            return Err(FileKvError::InvalidArgument(
                "iteration must request keys, values or both".to_string(),
            ));
        }

        Ok(StoreIter {
            store: self,
            names: self.dir.list_entries()?.into_iter(),
            want_keys,
            want_values,
        })
    }

    /// Iterate over keys
    pub fn keys(&self) -> Result<impl Iterator<Item = Result<String>> + '_> {
        Ok(self.iter(true, false)?.map(|entry| {
            entry.and_then(|e| {
                e.key
                    .ok_or_else(|| FileKvError::InvalidArgument("key not decoded".to_string()))
            })
        }))
    }

    /// Iterate over value readers
    pub fn values(&self) -> Result<impl Iterator<Item = Result<ValueSlice>> + '_> {
        Ok(self.iter(false, true)?.map(|entry| {
            entry.and_then(|e| {
                e.value
                    .ok_or_else(|| FileKvError::InvalidArgument("value not decoded".to_string()))
            })
        }))
    }

    /// Iterate over (key, value reader) pairs
    pub fn items(&self) -> Result<impl Iterator<Item = Result<(String, ValueSlice)>> + '_> {
        Ok(self.iter(true, true)?.map(|entry| {
            entry.and_then(|e| match (e.key, e.value) {
                (Some(key), Some(value)) => Ok((key, value)),
                _ => Err(FileKvError::InvalidArgument(
                    "entry not fully decoded".to_string(),
                )),
            })
        }))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Whether the store was opened for writing
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// The effective configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Root of the store
    pub fn path(&self) -> &Path {
        self.dir.root()
    }

    /// The directory index backing this store
    pub fn directory(&self) -> &D {
        &self.dir
    }

    /// Entry name (hex digest) of `key`
    pub fn entry_name(&self, key: &str) -> String {
        self.hasher.hash_hex(key.as_bytes())
    }

    /// Location of the record for `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.resolve(&self.entry_name(key))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(FileKvError::ReadOnlyViolation)
        }
    }

    /// Existence check with lazy expiry
    fn entry_state(&self, name: &str) -> Result<EntryState> {
        let modified = match self.dir.modified(name)? {
            Some(m) => m,
            None => return Ok(EntryState::Absent),
        };

        if let Some(ttl) = self.config.ttl {
            if is_expired(modified, ttl) {
                self.dir.remove(name)?;
                tracing::debug!(entry = name, "expired entry removed");
                return Ok(EntryState::Expired);
            }
        }

        Ok(EntryState::Live)
    }

    /// Open an entry and decode its header
    fn open_record(&self, name: &str) -> Result<(Arc<dyn RecordBacking>, RecordHeader)> {
        let backing: Arc<dyn RecordBacking> =
            Arc::from(self.dir.open(name, self.config.mapping)?);

        let whole = ValueSlice::new(Arc::clone(&backing), 0, backing.len()?);
        let header = read_header(whole, self.widths)?;

        Ok((backing, header))
    }

    /// Decode the requested parts of an entry
    fn read_entry(&self, name: &str, want_keys: bool, want_values: bool) -> Result<StoreEntry> {
        let (backing, header) = self.open_record(name)?;

        let key = if want_keys {
            let key = String::from_utf8(header.key).map_err(|e| {
                FileKvError::InvalidKey(format!("entry {}: {}", name, e))
            })?;
            Some(key)
        } else {
            None
        };

        let value = want_values
            .then(|| ValueSlice::new(backing, header.value_offset, header.value_length));

        Ok(StoreEntry { key, value })
    }
}

fn is_expired(modified: SystemTime, ttl: Duration) -> bool {
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age > ttl,
        // Modified "in the future" (clock skew): not expired
        Err(_) => false,
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// One record yielded by [`StoreIter`]
#[derive(Debug)]
pub struct StoreEntry {
    /// Decoded key, if requested
    pub key: Option<String>,
    /// Value reader, if requested
    pub value: Option<ValueSlice>,
}

/// Single pass over a snapshot of the store's entries
///
/// Entries are visited in directory order. Expired entries are deleted and
/// skipped; entries removed after the snapshot are skipped.
pub struct StoreIter<'a, D: DirectoryIndex> {
    store: &'a Store<D>,
    names: std::vec::IntoIter<String>,
    want_keys: bool,
    want_values: bool,
}

impl<D: DirectoryIndex> Iterator for StoreIter<'_, D> {
    type Item = Result<StoreEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        for name in self.names.by_ref() {
            match self.store.entry_state(&name) {
                Ok(EntryState::Live) => {}
                Ok(EntryState::Absent | EntryState::Expired) => continue,
                Err(e) => return Some(Err(e)),
            }

            match self.store.read_entry(&name, self.want_keys, self.want_values) {
                Ok(entry) => return Some(Ok(entry)),
                Err(e) if e.is_not_found() => {
                    tracing::warn!(entry = %name, "entry vanished during iteration");
                    continue;
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.names.len()))
    }
}

//! Filesystem directory
//!
//! Each regular file directly inside the root is one record. Reads go
//! through memory maps so large values are never loaded whole.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use memmap2::Mmap;

use crate::config::MappingStrategy;
use crate::error::{FileKvError, Result};

use super::{DirectoryIndex, RecordBacking, RecordSink};

/// Store directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsDirectory {
    root: PathBuf,
}

impl FsDirectory {
    /// Use an existing directory as the store root
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(FileKvError::NotFound(root));
        }
        Ok(Self { root })
    }
}

impl DirectoryIndex for FsDirectory {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_entries(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;

            // Subdirectories and anything else that is not a plain file are
            // not records.
            if !entry.file_type()?.is_file() {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    tracing::debug!(name = ?raw, "skipping non UTF-8 file name");
                }
            }
        }

        Ok(names)
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_file()
    }

    fn modified(&self, name: &str) -> Result<Option<SystemTime>> {
        match fs::metadata(self.resolve(name)) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.modified()?)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&self, name: &str) -> Result<Box<dyn RecordSink + '_>> {
        let path = self.resolve(name);

        // Unlink rather than truncate: readers holding a map of the old
        // record keep its inode, and its pages, until they drop it.
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)?;

        Ok(Box::new(FileSink {
            writer: BufWriter::new(file),
        }))
    }

    fn open(&self, name: &str, mapping: MappingStrategy) -> Result<Box<dyn RecordBacking>> {
        let backing = match mapping {
            MappingStrategy::PerRead => MappedFile::per_read(self.resolve(name))?,
            MappingStrategy::Held => MappedFile::held(self.resolve(name))?,
        };
        Ok(Box::new(backing))
    }

    fn remove(&self, name: &str) -> Result<bool> {
        match fs::remove_file(self.resolve(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Write Side
// =============================================================================

/// Buffered writer over a freshly truncated record file
struct FileSink {
    writer: BufWriter<File>,
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl RecordSink for FileSink {
    fn finish(mut self: Box<Self>) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

// =============================================================================
// Read Side
// =============================================================================

/// Memory-mapped record file
///
/// With [`MappingStrategy::PerRead`] only the path and file identity are
/// kept and every `read_at` opens, maps, copies and unmaps. A read after the
/// record has been rewritten fails with `NotFound` instead of returning the
/// new record's bytes. With [`MappingStrategy::Held`] the map is created up
/// front and lives until this value is dropped.
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    identity: Option<FileIdentity>,
    held: Option<Held>,
}

/// Device and inode of the record a reader was opened on
type FileIdentity = (u64, u64);

#[cfg(unix)]
fn identity(meta: &fs::Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn identity(_meta: &fs::Metadata) -> Option<FileIdentity> {
    None
}

#[derive(Debug)]
struct Held {
    /// `None` for an empty file; zero-length maps are not portable
    map: Option<Mmap>,
    len: u64,
}

impl MappedFile {
    /// Map lazily, once per read
    pub fn per_read(path: PathBuf) -> Result<Self> {
        // Fail now, like a held map would, if the record is already gone.
        let meta = fs::metadata(&path)?;
        if !meta.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file").into());
        }
        Ok(Self {
            path,
            identity: identity(&meta),
            held: None,
        })
    }

    /// Map once, for the lifetime of the returned value
    pub fn held(path: PathBuf) -> Result<Self> {
        let file = File::open(&path)?;
        let meta = file.metadata()?;
        let len = meta.len();
        let map = if len == 0 { None } else { Some(map_file(&file)?) };

        Ok(Self {
            path,
            identity: identity(&meta),
            held: Some(Held { map, len }),
        })
    }

    /// Path of the mapped record
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the record again, failing if the path now names another file
    fn reopen(&self) -> Result<(File, u64)> {
        let file = File::open(&self.path)?;
        let meta = file.metadata()?;
        if self.identity.is_some() && identity(&meta) != self.identity {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "record was replaced after the reader was opened",
            )
            .into());
        }
        Ok((file, meta.len()))
    }
}

impl RecordBacking for MappedFile {
    fn len(&self) -> Result<u64> {
        match &self.held {
            Some(held) => Ok(held.len),
            None => Ok(self.reopen()?.1),
        }
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        match &self.held {
            Some(held) => Ok(match &held.map {
                Some(map) => copy_from(map, offset, buf),
                None => 0,
            }),
            None => {
                let (file, len) = self.reopen()?;
                if len <= offset {
                    return Ok(0);
                }
                // Dropped (unmapped, closed) before returning
                let map = map_file(&file)?;
                Ok(copy_from(&map, offset, buf))
            }
        }
    }
}

fn map_file(file: &File) -> Result<Mmap> {
    // SAFETY: records are never truncated in place. A rewrite unlinks the
    // old file and creates a new inode, so a live map keeps its pages; the
    // map is read-only and never handed out beyond a borrow of this backing.
    let map = unsafe { Mmap::map(file)? };
    Ok(map)
}

fn copy_from(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
    let len = data.len() as u64;
    if offset >= len {
        return 0;
    }
    let start = offset as usize;
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

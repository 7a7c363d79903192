//! Value Slice Reader
//!
//! A bounded, seekable view over the value region of a record. Bytes are
//! pulled from the backing on demand, so a value is only materialized as far
//! as the caller reads it.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use crate::directory::RecordBacking;
use crate::error::{FileKvError, Result};

/// Numeric seek modes, as used by dbm/posix style callers
pub const SEEK_SET: i32 = 0;
pub const SEEK_CUR: i32 = 1;
pub const SEEK_END: i32 = 2;

/// Chunk size used by the streaming helpers
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Seekable reader over `length` bytes of a record, starting at `base_offset`
pub struct ValueSlice {
    backing: Arc<dyn RecordBacking>,
    base_offset: u64,
    length: u64,
    /// Logical position, always in `[0, length]`
    pos: u64,
}

impl ValueSlice {
    pub fn new(backing: Arc<dyn RecordBacking>, base_offset: u64, length: u64) -> Self {
        Self {
            backing,
            base_offset,
            length,
            pos: 0,
        }
    }

    /// Length of the value
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Offset of the value inside its record
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Current logical position
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// Bytes between the current position and the end of the value
    pub fn remaining(&self) -> u64 {
        self.length - self.pos
    }

    /// Read up to `max_bytes` from the current position
    ///
    /// Never reads past the end of the value: at the end an empty vector is
    /// returned. Fails with `TruncatedRecord` if the record holds fewer bytes
    /// than its header declared.
    pub fn read_chunk(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        let n = (max_bytes as u64).min(self.remaining()) as usize;
        let mut buf = vec![0u8; n];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Read the rest of the value into memory
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.remaining().min(COPY_CHUNK_SIZE as u64) as usize);
        while self.remaining() > 0 {
            let chunk = self.read_chunk(COPY_CHUNK_SIZE)?;
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    /// Stream the rest of the value into `writer`; returns bytes copied
    pub fn copy_to<W: Write>(&mut self, mut writer: W) -> Result<u64> {
        let mut copied = 0;
        while self.remaining() > 0 {
            let chunk = self.read_chunk(COPY_CHUNK_SIZE)?;
            writer.write_all(&chunk)?;
            copied += chunk.len() as u64;
        }
        Ok(copied)
    }

    /// Seek with a numeric mode: `0` start, `1` current, `2` end
    pub fn seek_whence(&mut self, offset: i64, whence: i32) -> Result<u64> {
        let target = match whence {
            SEEK_SET => {
                if offset < 0 {
                    return Err(negative_seek().into());
                }
                SeekFrom::Start(offset as u64)
            }
            SEEK_CUR => SeekFrom::Current(offset),
            SEEK_END => SeekFrom::End(offset),
            other => return Err(FileKvError::UnsupportedSeekMode(other)),
        };
        Ok(self.seek(target)?)
    }

    /// Copy `buf.len()` bytes (already clamped to `remaining`) and advance
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        let start = self.base_offset + self.pos;
        let got = self.backing.read_at(start, buf)?;
        if got < buf.len() {
            return Err(FileKvError::TruncatedRecord {
                expected: self.base_offset.saturating_add(self.length),
                actual: start + got as u64,
            });
        }

        self.pos += got as u64;
        Ok(())
    }
}

impl Read for ValueSlice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = (buf.len() as u64).min(self.remaining()) as usize;
        self.fill(&mut buf[..n])?;
        Ok(n)
    }
}

impl Seek for ValueSlice {
    /// Positions past the end are clamped to the end of the value
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target: i128 = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::Current(d) => self.pos as i128 + d as i128,
            SeekFrom::End(d) => self.length as i128 + d as i128,
        };

        if target < 0 {
            return Err(negative_seek());
        }
        self.pos = target.min(self.length as i128) as u64;
        Ok(self.pos)
    }
}

impl fmt::Debug for ValueSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSlice")
            .field("base_offset", &self.base_offset)
            .field("length", &self.length)
            .field("pos", &self.pos)
            .finish()
    }
}

fn negative_seek() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        "invalid seek to a negative position",
    )
}

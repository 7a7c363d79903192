//! Value Source
//!
//! Input side of the write path. A value is either already in memory or
//! streamed from a reader whose length is known up front, so the store can
//! write the header before the body.

use std::fmt;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

use bytes::{Bytes, BytesMut};

use crate::error::Result;

/// A value to be written into a record
pub enum ValueSource<'a> {
    /// Value bytes held in memory
    InMemory(Bytes),

    /// Value streamed from a reader; `declared_length` bytes are expected
    Streamed {
        reader: Box<dyn Read + 'a>,
        declared_length: u64,
        consumed: u64,
    },
}

impl<'a> ValueSource<'a> {
    /// In-memory value
    pub fn from_bytes(value: impl Into<Bytes>) -> Self {
        ValueSource::InMemory(value.into())
    }

    /// Streamed value with a caller-supplied length
    pub fn from_reader(reader: impl Read + 'a, declared_length: u64) -> Self {
        ValueSource::Streamed {
            reader: Box::new(reader),
            declared_length,
            consumed: 0,
        }
    }

    /// Streamed value whose length is probed by seeking to the end and back
    ///
    /// Only the bytes from the current position onwards are part of the value.
    pub fn from_seekable<R: Read + Seek + 'a>(mut reader: R) -> Result<Self> {
        let pos = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(pos))?;
        Ok(Self::from_reader(reader, end.saturating_sub(pos)))
    }

    /// Streamed value backed by an open file
    pub fn from_file(file: std::fs::File) -> Result<Self> {
        Self::from_seekable(file)
    }

    /// Total length of the value
    pub fn len(&self) -> u64 {
        match self {
            ValueSource::InMemory(bytes) => bytes.len() as u64,
            ValueSource::Streamed {
                declared_length, ..
            } => *declared_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes not yet handed out by `read_chunk`
    pub fn remaining(&self) -> u64 {
        match self {
            ValueSource::InMemory(bytes) => bytes.len() as u64,
            ValueSource::Streamed {
                declared_length,
                consumed,
                ..
            } => declared_length - consumed,
        }
    }

    /// Next chunk of at most `max_bytes`
    ///
    /// Returns an empty chunk once the value is exhausted. A streamed source
    /// whose reader ends early also yields an empty chunk while `remaining()`
    /// is still non-zero; the caller decides what that means.
    pub fn read_chunk(&mut self, max_bytes: usize) -> Result<Bytes> {
        match self {
            ValueSource::InMemory(bytes) => {
                let n = max_bytes.min(bytes.len());
                Ok(bytes.split_to(n))
            }
            ValueSource::Streamed {
                reader,
                declared_length,
                consumed,
            } => {
                let want = (max_bytes as u64).min(*declared_length - *consumed) as usize;
                let mut buf = BytesMut::zeroed(want);

                let mut filled = 0;
                while filled < want {
                    match reader.read(&mut buf[filled..]) {
                        Ok(0) => break,
                        Ok(n) => filled += n,
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e.into()),
                    }
                }

                buf.truncate(filled);
                *consumed += filled as u64;
                Ok(buf.freeze())
            }
        }
    }
}

impl fmt::Debug for ValueSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::InMemory(bytes) => f
                .debug_tuple("InMemory")
                .field(&format_args!("{} bytes", bytes.len()))
                .finish(),
            ValueSource::Streamed {
                declared_length,
                consumed,
                ..
            } => f
                .debug_struct("Streamed")
                .field("declared_length", declared_length)
                .field("consumed", consumed)
                .finish(),
        }
    }
}

impl From<Vec<u8>> for ValueSource<'_> {
    fn from(value: Vec<u8>) -> Self {
        ValueSource::from_bytes(value)
    }
}

impl From<&'static [u8]> for ValueSource<'_> {
    fn from(value: &'static [u8]) -> Self {
        ValueSource::from_bytes(value)
    }
}

impl<const N: usize> From<&'static [u8; N]> for ValueSource<'_> {
    fn from(value: &'static [u8; N]) -> Self {
        ValueSource::InMemory(Bytes::from_static(value))
    }
}

impl From<Bytes> for ValueSource<'_> {
    fn from(value: Bytes) -> Self {
        ValueSource::InMemory(value)
    }
}

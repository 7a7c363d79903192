//! Record codec
//!
//! Encoding and decoding of the length-prefixed record header.

use std::io::{ErrorKind, Read};

use crate::config::{Config, MAX_FIELD_WIDTH};
use crate::error::{FileKvError, Result};

/// Byte widths of the two length fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWidths {
    pub key: u8,
    pub value: u8,
}

impl FieldWidths {
    /// Create validated field widths (each 1..=8 bytes)
    pub fn new(key: u8, value: u8) -> Result<Self> {
        for width in [key, value] {
            if width == 0 || width > MAX_FIELD_WIDTH {
                return Err(FileKvError::Config(format!(
                    "length field width must be between 1 and {} bytes, got {}",
                    MAX_FIELD_WIDTH, width
                )));
            }
        }
        Ok(Self { key, value })
    }

    /// Widths configured for a store
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.key_len_width, config.value_len_width)
    }

    /// Size of both length fields together
    pub fn prefix_len(&self) -> usize {
        self.key as usize + self.value as usize
    }
}

impl Default for FieldWidths {
    fn default() -> Self {
        Self { key: 2, value: 4 }
    }
}

/// Decoded record header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub key_length: u64,
    pub value_length: u64,
    pub key: Vec<u8>,
    /// Offset of the first value byte from the start of the record
    pub value_offset: u64,
}

impl RecordHeader {
    /// Expected physical length of the whole record
    pub fn record_len(&self) -> u64 {
        self.value_offset.saturating_add(self.value_length)
    }
}

// =============================================================================
// Length Fields
// =============================================================================

/// Largest length representable in `width` bytes
fn max_for_width(width: u8) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * width as u32)) - 1
    }
}

/// Encode a length as a `width`-byte little-endian unsigned integer
pub fn encode_len(length: u64, width: u8) -> Result<Vec<u8>> {
    if length > max_for_width(width) {
        return Err(FileKvError::EncodingOverflow { length, width });
    }
    Ok(length.to_le_bytes()[..width as usize].to_vec())
}

/// Decode a little-endian unsigned integer of up to 8 bytes
pub fn decode_len(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_le_bytes(buf)
}

// =============================================================================
// Header Encoding/Decoding
// =============================================================================

/// Encode the record header: both length fields followed by the key bytes
///
/// Format: key_len (kw) + value_len (vw) + key
pub fn encode_header(key: &[u8], value_length: u64, widths: FieldWidths) -> Result<Vec<u8>> {
    let key_len = encode_len(key.len() as u64, widths.key)?;
    let value_len = encode_len(value_length, widths.value)?;

    let mut header = Vec::with_capacity(widths.prefix_len() + key.len());
    header.extend_from_slice(&key_len);
    header.extend_from_slice(&value_len);
    header.extend_from_slice(key);
    Ok(header)
}

/// Decode a record header from the start of `source`
///
/// `source` may be the whole record (e.g. a memory map) or any prefix that
/// covers the length fields and the key.
pub fn decode_header(source: &[u8], widths: FieldWidths) -> Result<RecordHeader> {
    let prefix_len = widths.prefix_len();
    if source.len() < prefix_len {
        return Err(FileKvError::TruncatedRecord {
            expected: prefix_len as u64,
            actual: source.len() as u64,
        });
    }

    let key_width = widths.key as usize;
    let key_length = decode_len(&source[..key_width]);
    let value_length = decode_len(&source[key_width..prefix_len]);

    let value_offset = (prefix_len as u64).saturating_add(key_length);
    if (source.len() as u64) < value_offset {
        return Err(FileKvError::TruncatedRecord {
            expected: value_offset,
            actual: source.len() as u64,
        });
    }

    Ok(RecordHeader {
        key_length,
        value_length,
        key: source[prefix_len..value_offset as usize].to_vec(),
        value_offset,
    })
}

/// Read a record header from a reader positioned at the start of the record
pub fn read_header<R: Read>(mut reader: R, widths: FieldWidths) -> Result<RecordHeader> {
    let prefix_len = widths.prefix_len();
    let mut prefix = vec![0u8; prefix_len];
    let got = read_fully(&mut reader, &mut prefix)?;
    if got < prefix_len {
        return Err(FileKvError::TruncatedRecord {
            expected: prefix_len as u64,
            actual: got as u64,
        });
    }

    let key_width = widths.key as usize;
    let key_length = decode_len(&prefix[..key_width]);
    let value_length = decode_len(&prefix[key_width..]);

    // Bounded by the bytes actually present, not the declared length.
    let mut key = Vec::new();
    let got = reader.by_ref().take(key_length).read_to_end(&mut key)?;
    if (got as u64) < key_length {
        return Err(FileKvError::TruncatedRecord {
            expected: (prefix_len as u64).saturating_add(key_length),
            actual: (prefix_len + got) as u64,
        });
    }

    Ok(RecordHeader {
        key_length,
        value_length,
        key,
        value_offset: prefix_len as u64 + key_length,
    })
}

/// Like `read_exact`, but reports how many bytes were read before EOF
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

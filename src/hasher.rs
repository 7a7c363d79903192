//! Key Hasher
//!
//! Maps a key to the filename of its record: a BLAKE2s digest of the raw key
//! bytes, truncated to the configured output length and hex encoded.

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2sVar;

use crate::config::MAX_DIGEST_SIZE;
use crate::error::{FileKvError, Result};

/// Deterministic key → digest mapping
///
/// Holds an initialized BLAKE2s state; every hash starts from a clone of it.
#[derive(Clone)]
pub struct KeyHasher {
    digest_size: usize,
    prototype: Blake2sVar,
}

impl KeyHasher {
    /// Create a hasher producing `digest_size` bytes (1..=32)
    pub fn new(digest_size: usize) -> Result<Self> {
        if digest_size == 0 || digest_size > MAX_DIGEST_SIZE {
            return Err(FileKvError::Config(format!(
                "digest_size must be between 1 and {} bytes, got {}",
                MAX_DIGEST_SIZE, digest_size
            )));
        }
        let prototype = Blake2sVar::new(digest_size)
            .map_err(|_| FileKvError::Config(format!("invalid digest size {}", digest_size)))?;

        Ok(Self {
            digest_size,
            prototype,
        })
    }

    /// Digest length in bytes
    pub fn digest_size(&self) -> usize {
        self.digest_size
    }

    /// Raw digest of the key bytes
    pub fn hash(&self, key: &[u8]) -> Vec<u8> {
        let mut hasher = self.prototype.clone();
        hasher.update(key);
        hasher.finalize_boxed().into_vec()
    }

    /// Lowercase hex digest, used as the record's filename
    pub fn hash_hex(&self, key: &[u8]) -> String {
        hex::encode(self.hash(key))
    }
}

impl std::fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHasher")
            .field("digest_size", &self.digest_size)
            .finish()
    }
}

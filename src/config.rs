//! Configuration for filekv
//!
//! Centralized configuration with sensible defaults. A configuration is fixed
//! for the lifetime of a store.

use std::time::Duration;

use crate::error::{FileKvError, Result};

/// Default width of the key length field (bytes)
pub const DEFAULT_KEY_LEN_WIDTH: u8 = 2;

/// Default width of the value length field (bytes)
pub const DEFAULT_VALUE_LEN_WIDTH: u8 = 4;

/// Default chunk size used when streaming a value into a record
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 512_000;

/// Default key digest length (bytes). 13 bytes = 26 hex characters.
pub const DEFAULT_DIGEST_SIZE: usize = 13;

/// Largest supported length field, in bytes
pub const MAX_FIELD_WIDTH: u8 = 8;

/// Largest supported BLAKE2s digest, in bytes
pub const MAX_DIGEST_SIZE: usize = 32;

/// Main configuration for a filekv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Record Format
    // -------------------------------------------------------------------------
    /// Width of the little-endian key length field
    pub key_len_width: u8,

    /// Width of the little-endian value length field
    pub value_len_width: u8,

    /// Length of the key digest used as filename
    pub digest_size: usize,

    // -------------------------------------------------------------------------
    // Write Path
    // -------------------------------------------------------------------------
    /// Chunk size for streaming values to disk
    pub write_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Read Path
    // -------------------------------------------------------------------------
    /// Entries whose modification time is older than `now - ttl` are
    /// deleted the next time they are touched. `None` disables expiry.
    pub ttl: Option<Duration>,

    /// How value readers acquire their memory maps
    pub mapping: MappingStrategy,
}

/// Memory map lifetime for value readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingStrategy {
    /// Map, copy, unmap inside every read call. No descriptor outlives a read,
    /// so a reader whose record was rewritten fails with `NotFound`.
    #[default]
    PerRead,

    /// Map once when the reader is created, unmap when it is dropped.
    Held,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_len_width: DEFAULT_KEY_LEN_WIDTH,
            value_len_width: DEFAULT_VALUE_LEN_WIDTH,
            digest_size: DEFAULT_DIGEST_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            ttl: None,
            mapping: MappingStrategy::PerRead,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that every parameter is usable
    pub fn validate(&self) -> Result<()> {
        for (name, width) in [
            ("key_len_width", self.key_len_width),
            ("value_len_width", self.value_len_width),
        ] {
            if width == 0 || width > MAX_FIELD_WIDTH {
                return Err(FileKvError::Config(format!(
                    "{} must be between 1 and {} bytes, got {}",
                    name, MAX_FIELD_WIDTH, width
                )));
            }
        }

        if self.digest_size == 0 || self.digest_size > MAX_DIGEST_SIZE {
            return Err(FileKvError::Config(format!(
                "digest_size must be between 1 and {} bytes, got {}",
                MAX_DIGEST_SIZE, self.digest_size
            )));
        }

        if self.write_buffer_size == 0 {
            return Err(FileKvError::Config(
                "write_buffer_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the key length field width (in bytes)
    pub fn key_len_width(mut self, width: u8) -> Self {
        self.config.key_len_width = width;
        self
    }

    /// Set the value length field width (in bytes)
    pub fn value_len_width(mut self, width: u8) -> Self {
        self.config.value_len_width = width;
        self
    }

    /// Set the key digest length (in bytes)
    pub fn digest_size(mut self, size: usize) -> Self {
        self.config.digest_size = size;
        self
    }

    /// Set the streaming chunk size (in bytes)
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.config.write_buffer_size = size;
        self
    }

    /// Set the time-to-live of entries
    pub fn ttl(mut self, ttl: Option<Duration>) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Set the time-to-live of entries, in whole seconds
    pub fn ttl_secs(self, secs: u64) -> Self {
        self.ttl(Some(Duration::from_secs(secs)))
    }

    /// Set the mapping strategy of value readers
    pub fn mapping(mut self, mapping: MappingStrategy) -> Self {
        self.config.mapping = mapping;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

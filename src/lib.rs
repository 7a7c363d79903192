//! # filekv
//!
//! A minimal persistent key-value store with:
//! - One file per key, named by a BLAKE2s digest of the key
//! - Length-prefixed records with configurable field widths
//! - Memory-mapped, seekable value readers (values are never loaded whole)
//! - Lazy TTL expiry on read and enumeration
//! - dbm-style open modes (`r`, `w`, `c`, `n`)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Open resolver (r/w/c/n)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ (directory, writable)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store Engine                          │
//! │           put / get / delete / contains / iter / count       │
//! └──────┬──────────────┬──────────────────┬────────────────────┘
//!        │              │                  │
//!        ▼              ▼                  ▼
//!  ┌───────────┐  ┌─────────────┐   ┌──────────────────┐
//!  │ KeyHasher │  │ Record Codec│   │ Directory Index  │
//!  │ (BLAKE2s) │  │ (header)    │   │ (fs / memory)    │
//!  └───────────┘  └─────────────┘   └────────┬─────────┘
//!                                            │
//!                                            ▼
//!                                    ┌──────────────┐
//!                                    │  ValueSlice  │
//!                                    │  (mmap view) │
//!                                    └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use filekv::{Config, OpenMode, Store};
//!
//! let store = Store::open("/tmp/db", OpenMode::Create, Config::default())?;
//! store.put("alpha", b"hello world")?;
//!
//! let mut value = store.get("alpha")?.expect("just written");
//! assert_eq!(value.read_all()?, b"hello world");
//! # Ok::<(), filekv::FileKvError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod hasher;
pub mod record;
pub mod source;
pub mod directory;
pub mod value;
pub mod open;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FileKvError, Result};
pub use config::{Config, MappingStrategy};
pub use directory::{DirectoryIndex, FsDirectory, MemoryDirectory};
pub use engine::{Store, StoreEntry, StoreIter};
pub use open::OpenMode;
pub use source::ValueSource;
pub use value::ValueSlice;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of filekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Open mode resolution
//!
//! Turns a dbm-style open flag into a ready store directory and an access
//! mode. Resolution happens once; the engine never changes mode afterwards.
//!
//! | Flag | Mode        | Directory absent | Directory present |
//! |------|-------------|------------------|-------------------|
//! | `r`  | `ReadOnly`  | `NotFound`       | read only         |
//! | `w`  | `ReadWrite` | `NotFound`       | read/write        |
//! | `c`  | `Create`    | created          | read/write        |
//! | `n`  | `Replace`   | created          | wiped, read/write |

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{FileKvError, Result};

/// How a store is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Existing store, reads only
    #[default]
    ReadOnly,

    /// Existing store, reads and writes
    ReadWrite,

    /// Reads and writes, creating the store if needed
    Create,

    /// Always start from a new, empty store
    Replace,
}

impl OpenMode {
    /// Whether mutations are allowed in this mode
    pub fn is_writable(&self) -> bool {
        !matches!(self, OpenMode::ReadOnly)
    }

    /// The single-letter dbm flag
    pub fn flag(&self) -> char {
        match self {
            OpenMode::ReadOnly => 'r',
            OpenMode::ReadWrite => 'w',
            OpenMode::Create => 'c',
            OpenMode::Replace => 'n',
        }
    }
}

impl FromStr for OpenMode {
    type Err = FileKvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(OpenMode::ReadOnly),
            "w" => Ok(OpenMode::ReadWrite),
            "c" => Ok(OpenMode::Create),
            "n" => Ok(OpenMode::Replace),
            other => Err(FileKvError::InvalidArgument(format!(
                "invalid open flag {:?}, expected one of r, w, c, n",
                other
            ))),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flag())
    }
}

/// Prepare the store directory for `mode`
///
/// Returns the directory path and whether the store is writable.
pub fn resolve(path: &Path, mode: OpenMode) -> Result<(PathBuf, bool)> {
    let exists = path.exists();

    match mode {
        OpenMode::ReadOnly | OpenMode::ReadWrite => {
            if !exists {
                return Err(FileKvError::NotFound(path.to_path_buf()));
            }
        }
        OpenMode::Create => {
            if !exists {
                tracing::debug!(path = %path.display(), "creating store directory");
                fs::create_dir_all(path)?;
            }
        }
        OpenMode::Replace => {
            if exists {
                tracing::debug!(path = %path.display(), "replacing store directory");
                if path.is_dir() {
                    fs::remove_dir_all(path)?;
                } else {
                    fs::remove_file(path)?;
                }
            }
            fs::create_dir_all(path)?;
        }
    }

    if !path.is_dir() {
        return Err(FileKvError::NotFound(path.to_path_buf()));
    }

    Ok((path.to_path_buf(), mode.is_writable()))
}

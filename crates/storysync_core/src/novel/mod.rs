//! Novel document adapter (`.yw7` XML projects).
//!
//! # Responsibility
//! - Read chapters, scenes, and world entities from the project XML.
//! - Write a merged `Graph` back in place, preserving elements the adapter
//!   does not model.
//! - Optionally split scenes at divider lines after merging.
//!
//! # Invariants
//! - A project with a lock file is neither read nor written.
//! - Scenes inside notes/todo chapters are treated as notes/todo scenes;
//!   scenes inside unused or trash chapters are treated as unused.
//! - Unknown child elements of known records survive a read/write cycle.
//!
//! # See also
//! - `crate::timeline` for the opposite document format.

pub mod counts;
pub mod document;
pub mod splitter;

mod reader;
mod writer;
mod xml;

pub use document::NovelDocument;

use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Document label used in ambiguity errors.
pub const NOVEL_DOCUMENT: &str = "novel";

/// File extension of novel documents.
pub const NOVEL_EXTENSION: &str = "yw7";

/// Errors raised while reading or writing a novel project.
#[derive(Debug)]
pub enum NovelError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(xmltree::ParseError),
    /// Another application holds the project open.
    Locked(PathBuf),
    /// Structurally invalid project XML.
    InvalidData(String),
    WriteFailed {
        path: PathBuf,
        reason: String,
    },
}

impl Display for NovelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Cannot read file \"{}\": {source}", path.display())
            }
            Self::Parse(err) => write!(f, "Cannot process file: {err}"),
            Self::Locked(path) => write!(
                f,
                "\"{}\" is locked; please close the writing application first.",
                path.display()
            ),
            Self::InvalidData(message) => write!(f, "Invalid project data: {message}"),
            Self::WriteFailed { path, reason } => {
                write!(f, "Cannot write file: \"{}\" ({reason}).", path.display())
            }
        }
    }
}

impl Error for NovelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Locked(_) | Self::InvalidData(_) | Self::WriteFailed { .. } => None,
        }
    }
}

impl From<xmltree::ParseError> for NovelError {
    fn from(value: xmltree::ParseError) -> Self {
        Self::Parse(value)
    }
}

/// Returns the lock file path for a project (`<path>.lock`).
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Returns whether the project at `path` is open elsewhere.
pub fn is_locked(path: &Path) -> bool {
    lock_path(path).exists()
}

/// Fails with `NovelError::Locked` when the project is open elsewhere.
pub(crate) fn ensure_unlocked(path: &Path) -> Result<(), NovelError> {
    if is_locked(path) {
        return Err(NovelError::Locked(path.to_path_buf()));
    }
    Ok(())
}

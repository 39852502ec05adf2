//! Timeline document adapter (`.aeonzip` archives).
//!
//! # Responsibility
//! - Read the JSON timeline from its zip container into a `Graph`.
//! - Bootstrap missing template elements (types, roles, properties).
//! - Write a merged `Graph` back into the retained JSON document.
//!
//! # Invariants
//! - Events dated before `span::DATE_LIMIT` are never rewritten.
//! - Every event keeps its unknown JSON keys across a read/write cycle.
//! - Events whose scene is unused in the written graph are removed.
//!
//! # See also
//! - `crate::novel` for the opposite document format.

pub mod archive;
pub mod document;
pub mod schema;
pub mod span;

mod reader;
mod writer;

pub use document::TimelineDocument;

use crate::model::graph::GraphError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Document label used in ambiguity errors.
pub const TIMELINE_DOCUMENT: &str = "timeline";

/// File extension of timeline documents.
pub const TIMELINE_EXTENSION: &str = "aeonzip";

/// Errors raised while reading or writing a timeline.
#[derive(Debug)]
pub enum TimelineError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Archive(zip::result::ZipError),
    Json(serde_json::Error),
    /// The archive holds no timeline payload.
    MissingData,
    /// The calendar defines no "AD" era.
    MissingEra,
    /// Structurally invalid JSON document.
    InvalidData(String),
    Graph(GraphError),
    WriteFailed {
        path: PathBuf,
        reason: String,
    },
}

impl Display for TimelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Cannot read timeline data from \"{}\": {source}", path.display())
            }
            Self::Archive(err) => write!(f, "Cannot read timeline data: {err}"),
            Self::Json(err) => write!(f, "Invalid JSON data in timeline: {err}"),
            Self::MissingData => write!(f, "No JSON part found in timeline data."),
            Self::MissingEra => write!(f, "\"AD\" era is missing in the calendar."),
            Self::InvalidData(message) => write!(f, "Invalid timeline data: {message}"),
            Self::Graph(err) => write!(f, "{err}"),
            Self::WriteFailed { path, reason } => {
                write!(f, "Cannot write file: \"{}\" ({reason}).", path.display())
            }
        }
    }
}

impl Error for TimelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Archive(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Graph(err) => Some(err),
            Self::MissingData
            | Self::MissingEra
            | Self::InvalidData(_)
            | Self::WriteFailed { .. } => None,
        }
    }
}

impl From<zip::result::ZipError> for TimelineError {
    fn from(value: zip::result::ZipError) -> Self {
        Self::Archive(value)
    }
}

impl From<serde_json::Error> for TimelineError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<GraphError> for TimelineError {
    fn from(value: GraphError) -> Self {
        Self::Graph(value)
    }
}

//! Title-keyed reconciliation of two entity graphs.
//!
//! # Responsibility
//! - Validate both graphs for title ambiguity before anything changes.
//! - Bind world entities and scenes across documents by title, create
//!   what is missing, and soft-delete target scenes that vanished.
//!
//! # Invariants
//! - Validate-then-mutate: every error is returned before the target graph
//!   is touched.
//! - Target scenes are never removed; retirement sets `unused`.
//! - References are rewritten through the entity bindings of the current
//!   run only; unbound references are dropped.
//!
//! # See also
//! - `crate::convert` for the file-level orchestration around a run.

mod engine;
mod validate;

pub use engine::synchronize;
pub use validate::{validate_source, validate_target};

use crate::novel::NOVEL_DOCUMENT;
use crate::timeline::TIMELINE_DOCUMENT;
use std::fmt::{Display, Formatter};

/// Which document is the source of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TimelineToNovel,
    NovelToTimeline,
}

impl Direction {
    /// Document label of the source side.
    pub fn source_document(self) -> &'static str {
        match self {
            Self::TimelineToNovel => TIMELINE_DOCUMENT,
            Self::NovelToTimeline => NOVEL_DOCUMENT,
        }
    }

    /// Document label of the target side.
    pub fn target_document(self) -> &'static str {
        match self {
            Self::TimelineToNovel => NOVEL_DOCUMENT,
            Self::NovelToTimeline => TIMELINE_DOCUMENT,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source_document(), self.target_document())
    }
}

/// Counts of what one run changed in the target graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub direction: Direction,
    pub created_scenes: usize,
    pub updated_scenes: usize,
    pub revived_scenes: usize,
    pub demoted_scenes: usize,
    pub retired_scenes: usize,
    pub created_entities: usize,
    pub updated_entities: usize,
}

impl SyncReport {
    pub(crate) fn new(direction: Direction) -> Self {
        Self {
            direction,
            created_scenes: 0,
            updated_scenes: 0,
            revived_scenes: 0,
            demoted_scenes: 0,
            retired_scenes: 0,
            created_entities: 0,
            updated_entities: 0,
        }
    }

    /// Returns whether the run left the target graph unchanged.
    pub fn is_unchanged(&self) -> bool {
        self.created_scenes == 0
            && self.updated_scenes == 0
            && self.revived_scenes == 0
            && self.demoted_scenes == 0
            && self.retired_scenes == 0
            && self.created_entities == 0
            && self.updated_entities == 0
    }

    /// One-line summary for the status callback.
    pub fn message(&self) -> String {
        format!(
            "Synchronized {}: {} scenes created, {} updated, {} revived, {} moved to background, {} marked unused; {} entities created, {} updated.",
            self.direction,
            self.created_scenes,
            self.updated_scenes,
            self.revived_scenes,
            self.demoted_scenes,
            self.retired_scenes,
            self.created_entities,
            self.updated_entities
        )
    }
}

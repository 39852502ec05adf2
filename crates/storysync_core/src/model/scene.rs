//! Scene, container, and world-entity records.
//!
//! # Responsibility
//! - Define the node records shared by the timeline and novel adapters.
//! - Keep the optional/present distinction explicit where merge rules
//!   depend on it.
//!
//! # Invariants
//! - A scene belongs to the narrative arc iff it is a normal scene and not
//!   unused (`Scene::in_narrative_arc`).
//! - `SceneStart::Specific` never holds a date before `MIN_SUPPORTED_YEAR`.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::fmt::{Display, Formatter};

/// Earliest calendar year the novel side can display.
pub const MIN_SUPPORTED_YEAR: i32 = 100;

/// Graph-local node identifier.
///
/// Novel documents store these verbatim; the timeline adapter assigns them
/// in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Character,
    Location,
    Item,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Character, Self::Location, Self::Item];

    pub fn label(self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Location => "location",
            Self::Item => "item",
        }
    }
}

/// Character, location, or item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldEntity {
    pub id: NodeId,
    pub kind: EntityKind,
    pub title: String,
    pub desc: Option<String>,
    /// Only characters carry notes; always `None` for other kinds.
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub aka: Option<String>,
}

impl WorldEntity {
    pub fn new(id: NodeId, kind: EntityKind, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            desc: None,
            notes: None,
            tags: None,
            aka: None,
        }
    }
}

/// Scene role in the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    /// Real story scene; member of the narrative arc.
    Normal,
    /// Background or notes-only scene.
    Notes,
    /// Planning placeholder; treated like a notes scene when syncing.
    Todo,
}

/// Editing progress, ordered from first sketch to finished text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SceneStatus {
    Outline = 1,
    Draft = 2,
    FirstEdit = 3,
    SecondEdit = 4,
    Done = 5,
}

impl SceneStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Outline),
            2 => Some(Self::Draft),
            3 => Some(Self::FirstEdit),
            4 => Some(Self::SecondEdit),
            5 => Some(Self::Done),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Where a scene sits in story time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneStart {
    /// Calendar date and time, on or after year `MIN_SUPPORTED_YEAR`.
    Specific(NaiveDateTime),
    /// Relative offset used when no supported calendar date exists.
    Unspecific {
        day: Option<u32>,
        hour: Option<u32>,
        minute: Option<u32>,
    },
}

impl SceneStart {
    /// Returns a specific start, or `None` for dates before the supported
    /// range.
    pub fn specific(at: NaiveDateTime) -> Option<Self> {
        is_supported_date(at.date()).then_some(Self::Specific(at))
    }

    pub fn date_time(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Specific(at) => Some(*at),
            Self::Unspecific { .. } => None,
        }
    }
}

/// Returns whether the novel side can hold `date`.
pub fn is_supported_date(date: NaiveDate) -> bool {
    date.year() >= MIN_SUPPORTED_YEAR
}

/// Scene length; each part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneDuration {
    pub days: Option<u32>,
    pub hours: Option<u32>,
    pub minutes: Option<u32>,
}

impl SceneDuration {
    pub fn new(days: u32, hours: u32, minutes: u32) -> Self {
        Self {
            days: Some(days),
            hours: Some(hours),
            minutes: Some(minutes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_none() && self.hours.is_none() && self.minutes.is_none()
    }
}

/// Scene (novel side) or event (timeline side).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub id: NodeId,
    pub title: String,
    pub desc: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub start: Option<SceneStart>,
    pub duration: SceneDuration,
    pub status: SceneStatus,
    pub kind: SceneKind,
    pub unused: bool,
    /// `None` means the document says nothing about characters; an empty
    /// list means "explicitly nobody".
    pub characters: Option<Vec<NodeId>>,
    pub locations: Option<Vec<NodeId>>,
    pub items: Option<Vec<NodeId>>,
    /// Story-arc names, distinct from narrative arc membership.
    pub arcs: Option<Vec<String>>,
    /// Prose content; novel side only.
    pub content: Option<String>,
}

impl Scene {
    pub fn new(id: NodeId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            desc: None,
            notes: None,
            tags: None,
            start: None,
            duration: SceneDuration::default(),
            status: SceneStatus::Outline,
            kind: SceneKind::Normal,
            unused: false,
            characters: None,
            locations: None,
            items: None,
            arcs: None,
            content: None,
        }
    }

    pub fn is_narrative(&self) -> bool {
        self.kind == SceneKind::Normal
    }

    pub fn in_narrative_arc(&self) -> bool {
        self.is_narrative() && !self.unused
    }

    /// Moves the scene out of the narrative arc without deleting it.
    pub fn demote_to_background(&mut self) {
        self.kind = SceneKind::Notes;
        self.unused = false;
    }

    /// Soft-deletes the scene.
    pub fn retire(&mut self) {
        self.unused = true;
    }

    pub fn references(&self, kind: EntityKind) -> Option<&Vec<NodeId>> {
        match kind {
            EntityKind::Character => self.characters.as_ref(),
            EntityKind::Location => self.locations.as_ref(),
            EntityKind::Item => self.items.as_ref(),
        }
    }

    pub fn references_mut(&mut self, kind: EntityKind) -> &mut Option<Vec<NodeId>> {
        match kind {
            EntityKind::Character => &mut self.characters,
            EntityKind::Location => &mut self.locations,
            EntityKind::Item => &mut self.items,
        }
    }
}

/// Chapter role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterKind {
    Normal,
    Notes,
    Todo,
}

/// Ordered scene container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub id: NodeId,
    pub title: String,
    pub desc: Option<String>,
    pub kind: ChapterKind,
    pub unused: bool,
    /// The novel's trash bin; everything inside is unused.
    pub is_trash: bool,
    pub scenes: Vec<NodeId>,
}

impl Chapter {
    pub fn new(id: NodeId, title: impl Into<String>, kind: ChapterKind) -> Self {
        Self {
            id,
            title: title.into(),
            desc: None,
            kind,
            unused: false,
            is_trash: false,
            scenes: Vec::new(),
        }
    }
}

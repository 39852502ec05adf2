//! Entity graph container shared by both document adapters.
//!
//! # Responsibility
//! - Hold scenes, chapters and world entities with O(1) id lookup and
//!   stable document order.
//! - Allocate fresh graph-local ids for one synchronization run.
//! - Provide title lookups that fail on ambiguity.
//!
//! # Invariants
//! - Insertion never checks titles; ambiguity is detected at explicit
//!   checkpoints (`TitleIndex`, `Graph::scene_by_title`).
//! - Ids handed out by `IdAllocator` are above every id already stored.

use crate::model::scene::{Chapter, EntityKind, NodeId, Scene, WorldEntity};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which title namespace an ambiguity was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleKind {
    Scene,
    Entity(EntityKind),
}

impl Display for TitleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scene => write!(f, "scene"),
            Self::Entity(kind) => write!(f, "{}", kind.label()),
        }
    }
}

/// Graph-level structural errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two nodes of one kind share a title within the same document.
    AmbiguousTitle {
        document: &'static str,
        kind: TitleKind,
        title: String,
    },
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AmbiguousTitle {
                document,
                kind,
                title,
            } => write!(f, "Ambiguous {document} {kind} title \"{title}\"."),
        }
    }
}

impl Error for GraphError {}

/// Title → id map that rejects a second insertion of the same title.
#[derive(Debug, Clone)]
pub struct TitleIndex {
    document: &'static str,
    kind: TitleKind,
    ids: HashMap<String, NodeId>,
}

impl TitleIndex {
    pub fn new(document: &'static str, kind: TitleKind) -> Self {
        Self {
            document,
            kind,
            ids: HashMap::new(),
        }
    }

    /// Registers `title`; fails if it is already taken.
    pub fn insert(&mut self, title: &str, id: NodeId) -> Result<(), GraphError> {
        if self.ids.contains_key(title) {
            return Err(GraphError::AmbiguousTitle {
                document: self.document,
                kind: self.kind,
                title: title.to_string(),
            });
        }
        self.ids.insert(title.to_string(), id);
        Ok(())
    }

    pub fn get(&self, title: &str) -> Option<NodeId> {
        self.ids.get(title).copied()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.ids.contains_key(title)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Records stored in an `OrderedStore`.
pub trait Node {
    fn node_id(&self) -> NodeId;
}

impl Node for Scene {
    fn node_id(&self) -> NodeId {
        self.id
    }
}

impl Node for Chapter {
    fn node_id(&self) -> NodeId {
        self.id
    }
}

impl Node for WorldEntity {
    fn node_id(&self) -> NodeId {
        self.id
    }
}

/// Arena of records plus explicit document order.
#[derive(Debug, Clone)]
pub struct OrderedStore<T> {
    records: HashMap<NodeId, T>,
    order: Vec<NodeId>,
}

impl<T> Default for OrderedStore<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Node> OrderedStore<T> {
    /// Appends a record; replaces it in place if the id is already stored.
    pub fn insert(&mut self, record: T) {
        let id = record.node_id();
        if self.records.insert(id, record).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.records.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let removed = self.records.remove(&id)?;
        self.order.retain(|value| *value != id);
        Some(removed)
    }

    /// Ids in document order.
    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Records in document order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Replaces the document order; ids not listed keep their relative
    /// order after the listed ones.
    pub fn reorder(&mut self, ids: &[NodeId]) {
        let mut next = ids
            .iter()
            .copied()
            .filter(|id| self.records.contains_key(id))
            .collect::<Vec<_>>();
        for id in &self.order {
            if !next.contains(id) {
                next.push(*id);
            }
        }
        self.order = next;
    }

    fn max_id(&self) -> u32 {
        self.order.iter().map(|id| id.0).max().unwrap_or(0)
    }
}

/// Per-graph id source for new records, scoped to one run.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next_scene: u32,
    next_chapter: u32,
    next_character: u32,
    next_location: u32,
    next_item: u32,
}

impl IdAllocator {
    fn bump(counter: &mut u32, floor: u32) -> NodeId {
        *counter = (*counter).max(floor) + 1;
        NodeId(*counter)
    }
}

/// In-memory document: scenes, chapters, and world entities.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub scenes: OrderedStore<Scene>,
    pub chapters: OrderedStore<Chapter>,
    pub characters: OrderedStore<WorldEntity>,
    pub locations: OrderedStore<WorldEntity>,
    pub items: OrderedStore<WorldEntity>,
    ids: IdAllocator,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities(&self, kind: EntityKind) -> &OrderedStore<WorldEntity> {
        match kind {
            EntityKind::Character => &self.characters,
            EntityKind::Location => &self.locations,
            EntityKind::Item => &self.items,
        }
    }

    pub fn entities_mut(&mut self, kind: EntityKind) -> &mut OrderedStore<WorldEntity> {
        match kind {
            EntityKind::Character => &mut self.characters,
            EntityKind::Location => &mut self.locations,
            EntityKind::Item => &mut self.items,
        }
    }

    pub fn scene(&self, id: NodeId) -> Option<&Scene> {
        self.scenes.get(id)
    }

    pub fn scene_mut(&mut self, id: NodeId) -> Option<&mut Scene> {
        self.scenes.get_mut(id)
    }

    pub fn chapter(&self, id: NodeId) -> Option<&Chapter> {
        self.chapters.get(id)
    }

    pub fn chapter_mut(&mut self, id: NodeId) -> Option<&mut Chapter> {
        self.chapters.get_mut(id)
    }

    pub fn entity(&self, kind: EntityKind, id: NodeId) -> Option<&WorldEntity> {
        self.entities(kind).get(id)
    }

    pub fn add_scene(&mut self, scene: Scene) -> NodeId {
        let id = scene.id;
        self.scenes.insert(scene);
        id
    }

    pub fn add_chapter(&mut self, chapter: Chapter) -> NodeId {
        let id = chapter.id;
        self.chapters.insert(chapter);
        id
    }

    pub fn add_entity(&mut self, entity: WorldEntity) -> NodeId {
        let id = entity.id;
        self.entities_mut(entity.kind).insert(entity);
        id
    }

    /// Appends `scene_id` to the end of a chapter's scene list.
    pub fn attach_scene(&mut self, chapter_id: NodeId, scene_id: NodeId) -> bool {
        match self.chapters.get_mut(chapter_id) {
            Some(chapter) => {
                if !chapter.scenes.contains(&scene_id) {
                    chapter.scenes.push(scene_id);
                }
                true
            }
            None => false,
        }
    }

    /// Inserts `scene_id` into a chapter right after `after`, or at the end
    /// when `after` is not listed.
    pub fn attach_scene_after(&mut self, chapter_id: NodeId, after: NodeId, scene_id: NodeId) {
        if let Some(chapter) = self.chapters.get_mut(chapter_id) {
            match chapter.scenes.iter().position(|id| *id == after) {
                Some(index) => chapter.scenes.insert(index + 1, scene_id),
                None => chapter.scenes.push(scene_id),
            }
        }
    }

    /// Returns the chapter listing `scene_id`, if any.
    pub fn chapter_of(&self, scene_id: NodeId) -> Option<NodeId> {
        self.chapters
            .iter()
            .find(|chapter| chapter.scenes.contains(&scene_id))
            .map(|chapter| chapter.id)
    }

    /// Scenes in reading order: chapter by chapter, then scenes not listed
    /// in any chapter.
    pub fn scenes_in_reading_order(&self) -> Vec<NodeId> {
        let mut ordered = Vec::with_capacity(self.scenes.len());
        for chapter in self.chapters.iter() {
            for id in &chapter.scenes {
                if self.scenes.contains(*id) && !ordered.contains(id) {
                    ordered.push(*id);
                }
            }
        }
        for id in self.scenes.ids() {
            if !ordered.contains(id) {
                ordered.push(*id);
            }
        }
        ordered
    }

    /// Looks up the only scene titled `title`.
    pub fn scene_by_title(
        &self,
        document: &'static str,
        title: &str,
    ) -> Result<Option<NodeId>, GraphError> {
        let mut found = None;
        for scene in self.scenes.iter().filter(|scene| scene.title == title) {
            if found.is_some() {
                return Err(GraphError::AmbiguousTitle {
                    document,
                    kind: TitleKind::Scene,
                    title: title.to_string(),
                });
            }
            found = Some(scene.id);
        }
        Ok(found)
    }

    pub fn next_scene_id(&mut self) -> NodeId {
        let floor = self.scenes.max_id();
        IdAllocator::bump(&mut self.ids.next_scene, floor)
    }

    pub fn next_chapter_id(&mut self) -> NodeId {
        let floor = self.chapters.max_id();
        IdAllocator::bump(&mut self.ids.next_chapter, floor)
    }

    pub fn next_entity_id(&mut self, kind: EntityKind) -> NodeId {
        let floor = self.entities(kind).max_id();
        let counter = match kind {
            EntityKind::Character => &mut self.ids.next_character,
            EntityKind::Location => &mut self.ids.next_location,
            EntityKind::Item => &mut self.ids.next_item,
        };
        IdAllocator::bump(counter, floor)
    }

    /// Returns whether the graph has no scenes and no chapters.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty() && self.chapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Graph, GraphError, TitleIndex, TitleKind};
    use crate::model::scene::{Chapter, ChapterKind, EntityKind, NodeId, Scene, WorldEntity};

    #[test]
    fn title_index_rejects_second_insertion() {
        let mut index = TitleIndex::new("timeline", TitleKind::Scene);
        index.insert("Storm", NodeId(1)).expect("first title");
        let err = index.insert("Storm", NodeId(2)).unwrap_err();
        assert_eq!(
            err,
            GraphError::AmbiguousTitle {
                document: "timeline",
                kind: TitleKind::Scene,
                title: "Storm".to_string(),
            }
        );
        assert_eq!(index.get("Storm"), Some(NodeId(1)));
    }

    #[test]
    fn allocator_starts_above_existing_ids() {
        let mut graph = Graph::new();
        graph.add_scene(Scene::new(NodeId(7), "Seven"));
        graph.add_entity(WorldEntity::new(NodeId(3), EntityKind::Item, "Key"));

        assert_eq!(graph.next_scene_id(), NodeId(8));
        assert_eq!(graph.next_scene_id(), NodeId(9));
        assert_eq!(graph.next_entity_id(EntityKind::Item), NodeId(4));
        assert_eq!(graph.next_entity_id(EntityKind::Character), NodeId(1));
        assert_eq!(graph.next_chapter_id(), NodeId(1));
    }

    #[test]
    fn reading_order_follows_chapters_then_orphans() {
        let mut graph = Graph::new();
        for id in 1..=3 {
            graph.add_scene(Scene::new(NodeId(id), format!("S{id}")));
        }
        let mut chapter = Chapter::new(NodeId(1), "One", ChapterKind::Normal);
        chapter.scenes = vec![NodeId(3), NodeId(1)];
        graph.add_chapter(chapter);

        assert_eq!(
            graph.scenes_in_reading_order(),
            vec![NodeId(3), NodeId(1), NodeId(2)]
        );
        assert_eq!(graph.chapter_of(NodeId(1)), Some(NodeId(1)));
        assert_eq!(graph.chapter_of(NodeId(2)), None);
    }

    #[test]
    fn scene_by_title_reports_ambiguity() {
        let mut graph = Graph::new();
        graph.add_scene(Scene::new(NodeId(1), "Storm"));
        graph.add_scene(Scene::new(NodeId(2), "Storm"));
        assert!(graph.scene_by_title("novel", "Calm").unwrap().is_none());
        assert!(graph.scene_by_title("novel", "Storm").is_err());
    }

    #[test]
    fn reorder_keeps_unlisted_ids_at_the_end() {
        let mut graph = Graph::new();
        for id in 1..=3 {
            graph.add_scene(Scene::new(NodeId(id), format!("S{id}")));
        }
        graph.scenes.reorder(&[NodeId(3), NodeId(9)]);
        assert_eq!(graph.scenes.ids(), &[NodeId(3), NodeId(1), NodeId(2)]);
    }
}

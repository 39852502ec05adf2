//! Matching and merge rules of one run.

use crate::config::SyncOptions;
use crate::model::graph::{Graph, GraphError};
use crate::model::scene::{Chapter, ChapterKind, EntityKind, NodeId, Scene, SceneStart, WorldEntity};
use crate::sync::validate::{validate_source, validate_target};
use crate::sync::{Direction, SyncReport};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Container receiving scenes created in an existing target.
pub const NEW_SCENES_CHAPTER: &str = "New scenes";

/// Source (kind, id) → target id.
type Bindings = HashMap<(EntityKind, NodeId), NodeId>;

/// Returns whether a source scene takes part in the run.
fn participates(scene: &Scene, options: &SyncOptions) -> bool {
    !scene.unused && (scene.is_narrative() || !options.scenes_only)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

fn overwrite_text(slot: &mut Option<String>, value: Option<&str>) {
    if let Some(text) = non_empty(value) {
        *slot = Some(text.to_string());
    }
}

/// Reconciles `target` with `source`.
///
/// # Errors
/// Returns `GraphError::AmbiguousTitle` when either graph fails
/// validation; `target` is unchanged in that case.
pub fn synchronize(
    source: &Graph,
    target: &mut Graph,
    direction: Direction,
    options: &SyncOptions,
) -> Result<SyncReport, GraphError> {
    validate_source(source, direction.source_document())?;
    validate_target(target, direction.target_document())?;

    let mut report = SyncReport::new(direction);
    let closure = reference_closure(source, options);
    let bindings = bind_entities(source, target, &closure, &mut report);
    merge_scenes(source, target, &bindings, direction, options, &mut report);

    info!(
        "event=sync_completed module=sync status=ok direction={:?} scenes_created={} scenes_updated={} scenes_revived={} scenes_demoted={} scenes_retired={} entities_created={} entities_updated={}",
        direction,
        report.created_scenes,
        report.updated_scenes,
        report.revived_scenes,
        report.demoted_scenes,
        report.retired_scenes,
        report.created_entities,
        report.updated_entities
    );
    Ok(report)
}

/// Entities referenced by participating source scenes.
fn reference_closure(source: &Graph, options: &SyncOptions) -> HashSet<(EntityKind, NodeId)> {
    let mut closure = HashSet::new();
    for scene in source.scenes.iter().filter(|scene| participates(scene, options)) {
        for kind in EntityKind::ALL {
            for id in scene.references(kind).into_iter().flatten() {
                closure.insert((kind, *id));
            }
        }
    }
    closure
}

fn bind_entities(
    source: &Graph,
    target: &mut Graph,
    closure: &HashSet<(EntityKind, NodeId)>,
    report: &mut SyncReport,
) -> Bindings {
    let mut bindings = Bindings::new();
    for kind in EntityKind::ALL {
        let titles = target
            .entities(kind)
            .iter()
            .map(|entity| (entity.title.clone(), entity.id))
            .collect::<HashMap<_, _>>();

        for entity in source.entities(kind).iter() {
            if !closure.contains(&(kind, entity.id)) {
                continue;
            }
            let target_id = match titles.get(&entity.title) {
                Some(id) => {
                    if let Some(existing) = target.entities_mut(kind).get_mut(*id) {
                        if merge_entity(existing, entity) {
                            report.updated_entities += 1;
                        }
                    }
                    *id
                }
                None => {
                    let id = target.next_entity_id(kind);
                    let mut created = entity.clone();
                    created.id = id;
                    target.add_entity(created);
                    report.created_entities += 1;
                    id
                }
            };
            bindings.insert((kind, entity.id), target_id);
        }
    }
    bindings
}

/// Fills target fields from non-empty source values; returns whether
/// anything changed.
fn merge_entity(target: &mut WorldEntity, source: &WorldEntity) -> bool {
    let before = target.clone();
    overwrite_text(&mut target.desc, source.desc.as_deref());
    overwrite_text(&mut target.aka, source.aka.as_deref());
    if target.kind == EntityKind::Character {
        overwrite_text(&mut target.notes, source.notes.as_deref());
    }
    if let Some(tags) = source.tags.as_ref().filter(|tags| !tags.is_empty()) {
        target.tags = Some(tags.clone());
    }
    *target != before
}

/// Target scenes addressable by title.
struct TargetTitles {
    active: HashMap<String, NodeId>,
    /// First unused scene per title; candidates for revival.
    retired: HashMap<String, NodeId>,
}

impl TargetTitles {
    fn new(target: &Graph) -> Self {
        let mut active = HashMap::new();
        let mut retired = HashMap::new();
        for scene in target.scenes.iter() {
            if scene.unused {
                retired.entry(scene.title.clone()).or_insert(scene.id);
            } else {
                active.insert(scene.title.clone(), scene.id);
            }
        }
        Self { active, retired }
    }
}

/// Chooses containers for scenes created or revived in the target.
struct Placement {
    /// The target started empty: mirror the source containers.
    mirror: bool,
    mirrored: HashMap<NodeId, NodeId>,
    new_scenes: Option<NodeId>,
}

impl Placement {
    fn new(target: &Graph) -> Self {
        Self {
            mirror: target.is_empty(),
            mirrored: HashMap::new(),
            new_scenes: None,
        }
    }

    fn chapter_for(&mut self, source: &Graph, target: &mut Graph, source_scene: NodeId) -> NodeId {
        if self.mirror {
            if let Some(chapter) = source.chapter_of(source_scene).and_then(|id| source.chapter(id)) {
                if let Some(id) = self.mirrored.get(&chapter.id) {
                    return *id;
                }
                let id = target.next_chapter_id();
                let mut copy = Chapter::new(id, chapter.title.clone(), chapter.kind);
                copy.desc = chapter.desc.clone();
                target.add_chapter(copy);
                self.mirrored.insert(chapter.id, id);
                return id;
            }
        }
        self.new_scenes_chapter(target)
    }

    fn new_scenes_chapter(&mut self, target: &mut Graph) -> NodeId {
        if let Some(id) = self.new_scenes {
            return id;
        }
        let existing = target
            .chapters
            .iter()
            .find(|chapter| {
                chapter.title == NEW_SCENES_CHAPTER
                    && chapter.kind == ChapterKind::Normal
                    && !chapter.unused
                    && !chapter.is_trash
            })
            .map(|chapter| chapter.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = target.next_chapter_id();
                target.add_chapter(Chapter::new(id, NEW_SCENES_CHAPTER, ChapterKind::Normal));
                id
            }
        };
        self.new_scenes = Some(id);
        id
    }
}

fn merge_scenes(
    source: &Graph,
    target: &mut Graph,
    bindings: &Bindings,
    direction: Direction,
    options: &SyncOptions,
    report: &mut SyncReport,
) {
    let titles = TargetTitles::new(target);
    let mut placement = Placement::new(target);
    // Trashed source scenes count as missing, so their target scenes retire.
    let source_titles = source
        .scenes
        .iter()
        .filter(|scene| !in_trash(source, scene.id))
        .map(|scene| scene.title.clone())
        .collect::<HashSet<_>>();
    let participating_titles = source
        .scenes
        .iter()
        .filter(|scene| participates(scene, options))
        .map(|scene| scene.title.clone())
        .collect::<HashSet<_>>();

    for source_id in source.scenes_in_reading_order() {
        let Some(scene) = source.scene(source_id) else {
            continue;
        };

        if !participates(scene, options) {
            if participating_titles.contains(&scene.title) || in_trash(source, source_id) {
                continue;
            }
            if let Some(existing) = titles
                .active
                .get(&scene.title)
                .and_then(|id| target.scene_mut(*id))
            {
                if existing.is_narrative() {
                    existing.demote_to_background();
                    report.demoted_scenes += 1;
                }
            }
            continue;
        }

        if let Some(id) = titles.active.get(&scene.title).copied() {
            if let Some(existing) = target.scene_mut(id) {
                let before = existing.clone();
                merge_scene(existing, scene, bindings, direction, false);
                if *existing != before {
                    report.updated_scenes += 1;
                }
            }
        } else if let Some(id) = titles.retired.get(&scene.title).copied() {
            if let Some(existing) = target.scene_mut(id) {
                merge_scene(existing, scene, bindings, direction, false);
            }
            release_from_inactive_chapter(target, id, &mut placement);
            report.revived_scenes += 1;
            debug!("event=scene_revived module=sync status=ok id={}", id);
        } else {
            let id = target.next_scene_id();
            let mut created = Scene::new(id, scene.title.clone());
            merge_scene(&mut created, scene, bindings, direction, true);
            target.add_scene(created);
            let chapter = placement.chapter_for(source, target, source_id);
            target.attach_scene(chapter, id);
            report.created_scenes += 1;
        }
    }

    if participating_titles.is_empty() {
        return;
    }
    for id in target.scenes.ids().to_vec() {
        let Some(existing) = target.scene_mut(id) else {
            continue;
        };
        if existing.in_narrative_arc() && !source_titles.contains(&existing.title) {
            existing.retire();
            report.retired_scenes += 1;
        }
    }
    if report.retired_scenes > 0 {
        info!(
            "event=scenes_retired module=sync status=ok count={}",
            report.retired_scenes
        );
    }
}

fn in_trash(graph: &Graph, scene: NodeId) -> bool {
    graph
        .chapter_of(scene)
        .and_then(|id| graph.chapter(id))
        .is_some_and(|chapter| chapter.is_trash)
}

/// Moves a revived scene out of an unused or trash container.
fn release_from_inactive_chapter(target: &mut Graph, id: NodeId, placement: &mut Placement) {
    let current = target.chapter_of(id);
    let inactive = current
        .and_then(|chapter_id| target.chapter(chapter_id))
        .is_some_and(|chapter| chapter.unused || chapter.is_trash);
    if current.is_some() && !inactive {
        return;
    }
    if let Some(chapter) = current.and_then(|chapter_id| target.chapter_mut(chapter_id)) {
        chapter.scenes.retain(|scene_id| *scene_id != id);
    }
    let chapter = placement.new_scenes_chapter(target);
    target.attach_scene(chapter, id);
}

/// Applies the per-field merge policy of `direction` to one scene.
fn merge_scene(
    target: &mut Scene,
    source: &Scene,
    bindings: &Bindings,
    direction: Direction,
    is_new: bool,
) {
    target.kind = source.kind;
    target.unused = false;

    if let Some(SceneStart::Specific(at)) = &source.start {
        target.start = Some(SceneStart::Specific(*at));
        target.duration = source.duration.clone();
    }
    if let Some(tags) = source.tags.as_ref().filter(|tags| !tags.is_empty()) {
        target.tags = Some(tags.clone());
    }
    overwrite_text(&mut target.desc, source.desc.as_deref());
    merge_notes(&mut target.notes, source.notes.as_deref(), direction);

    if is_new || direction == Direction::NovelToTimeline {
        target.status = source.status;
    }
    if let Some(arcs) = &source.arcs {
        if !arcs.is_empty() || target.arcs.is_some() {
            target.arcs = Some(arcs.clone());
        }
    }

    for kind in EntityKind::ALL {
        let Some(ids) = source.references(kind) else {
            continue;
        };
        let mut mapped = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bound) = bindings.get(&(kind, *id)) {
                if !mapped.contains(bound) {
                    mapped.push(*bound);
                }
            }
        }
        if kind == EntityKind::Character && direction == Direction::TimelineToNovel {
            keep_viewpoint_first(&mut mapped, target.characters.as_deref());
        }
        *target.references_mut(kind) = Some(mapped);
    }
}

/// Timeline notes are appended to novel notes; novel notes only fill
/// empty timeline notes.
fn merge_notes(target: &mut Option<String>, source: Option<&str>, direction: Direction) {
    let Some(text) = non_empty(source) else {
        return;
    };
    let merged = match target.as_deref().filter(|current| !current.is_empty()) {
        None => Some(text.to_string()),
        Some(current) if direction == Direction::TimelineToNovel && !current.contains(text) => {
            Some(format!("{current}\n{text}"))
        }
        Some(_) => None,
    };
    if merged.is_some() {
        *target = merged;
    }
}

/// Moves the current viewpoint character to the front when it survives.
fn keep_viewpoint_first(characters: &mut Vec<NodeId>, current: Option<&[NodeId]>) {
    let Some(viewpoint) = current.and_then(<[NodeId]>::first).copied() else {
        return;
    };
    if let Some(position) = characters.iter().position(|id| *id == viewpoint) {
        let id = characters.remove(position);
        characters.insert(0, id);
    }
}

//! Graph → project XML, rebuilt in place.

use crate::model::graph::{Graph, Node};
use crate::model::scene::{Chapter, ChapterKind, EntityKind, Scene, SceneKind, SceneStart, WorldEntity};
use crate::novel::counts::{letter_count, word_count};
use crate::novel::reader::{entity_tags, record_id, reference_tags, DATE_TIME_FORMAT};
use crate::novel::xml::{
    ensure_child, join_list, remove_child, set_child_text, set_field, set_id_list,
};
use std::collections::HashMap;
use xmltree::{Element, XMLNode};

/// Rewrites every modelled section of `root` from `graph`.
pub(crate) fn write_graph(root: &mut Element, graph: &Graph) {
    for kind in [EntityKind::Location, EntityKind::Item, EntityKind::Character] {
        let (container, record) = entity_tags(kind);
        rebuild_section(root, container, record, graph.entities(kind).iter(), write_entity);
    }
    rebuild_section(root, "SCENES", "SCENE", graph.scenes.iter(), write_scene);
    rebuild_section(root, "CHAPTERS", "CHAPTER", graph.chapters.iter(), write_chapter);
}

/// Replaces the records of one section, reusing existing elements by id.
///
/// Non-record children of the section are kept ahead of the records;
/// records whose id is no longer in the graph are dropped.
fn rebuild_section<'a, T, I, F>(root: &mut Element, section: &str, record: &str, records: I, write: F)
where
    T: Node + 'a,
    I: Iterator<Item = &'a T>,
    F: Fn(&mut Element, &T),
{
    let Some(container) = ensure_child(root, section) else {
        return;
    };
    let mut existing: HashMap<u32, Element> = HashMap::new();
    let mut kept = Vec::new();
    for node in container.children.drain(..) {
        match node {
            XMLNode::Element(element) if element.name == record => {
                if let Some(id) = record_id(&element) {
                    existing.entry(id).or_insert(element);
                }
            }
            other => kept.push(other),
        }
    }
    for item in records {
        let mut element = existing
            .remove(&item.node_id().0)
            .unwrap_or_else(|| Element::new(record));
        write(&mut element, item);
        kept.push(XMLNode::Element(element));
    }
    container.children = kept;
}

fn write_entity(element: &mut Element, entity: &WorldEntity) {
    set_child_text(element, "ID", Some(&entity.id.to_string()));
    set_child_text(element, "Title", Some(&entity.title));
    set_child_text(element, "Desc", entity.desc.as_deref());
    set_child_text(element, "Tags", entity.tags.as_deref().map(join_list).as_deref());
    set_child_text(element, "AKA", entity.aka.as_deref());
    if entity.kind == EntityKind::Character {
        set_child_text(element, "Notes", entity.notes.as_deref());
    }
}

fn write_scene(element: &mut Element, scene: &Scene) {
    set_child_text(element, "ID", Some(&scene.id.to_string()));
    set_child_text(element, "Title", Some(&scene.title));
    set_child_text(element, "Desc", scene.desc.as_deref());
    set_child_text(element, "Notes", scene.notes.as_deref());
    set_child_text(element, "Tags", scene.tags.as_deref().map(join_list).as_deref());
    set_child_text(element, "Status", Some(&scene.status.code().to_string()));
    set_child_text(element, "Unused", scene.unused.then_some("-1"));

    let scene_type = match scene.kind {
        SceneKind::Normal => None,
        SceneKind::Notes => Some("1"),
        SceneKind::Todo => Some("2"),
    };
    set_field(element, "Field_SceneType", scene_type);
    set_field(
        element,
        "Field_SceneArcs",
        scene
            .arcs
            .as_deref()
            .filter(|arcs| !arcs.is_empty())
            .map(join_list)
            .as_deref(),
    );

    write_start(element, scene.start.as_ref());
    let number = |value: Option<u32>| value.map(|value| value.to_string());
    set_child_text(element, "LastsDays", number(scene.duration.days).as_deref());
    set_child_text(element, "LastsHours", number(scene.duration.hours).as_deref());
    set_child_text(element, "LastsMinutes", number(scene.duration.minutes).as_deref());

    for kind in EntityKind::ALL {
        let (container, entry) = reference_tags(kind);
        let ids = scene
            .references(kind)
            .map(|ids| ids.iter().map(|id| id.0).collect::<Vec<_>>());
        set_id_list(element, container, entry, ids.as_deref());
    }

    match scene.content.as_deref() {
        Some(content) => {
            set_child_text(element, "SceneContent", Some(content));
            set_child_text(element, "WordCount", Some(&word_count(content).to_string()));
            set_child_text(element, "LetterCount", Some(&letter_count(content).to_string()));
        }
        None => {
            remove_child(element, "SceneContent");
            set_child_text(element, "WordCount", Some("0"));
            set_child_text(element, "LetterCount", Some("0"));
        }
    }
}

fn write_start(element: &mut Element, start: Option<&SceneStart>) {
    match start {
        Some(SceneStart::Specific(at)) => {
            set_child_text(element, "SpecificDateMode", Some("-1"));
            set_child_text(
                element,
                "SpecificDateTime",
                Some(&at.format(DATE_TIME_FORMAT).to_string()),
            );
            for name in ["Day", "Hour", "Minute"] {
                remove_child(element, name);
            }
        }
        Some(SceneStart::Unspecific { day, hour, minute }) => {
            remove_child(element, "SpecificDateMode");
            for (name, value) in [("Day", day), ("Hour", hour), ("Minute", minute)] {
                set_child_text(element, name, value.map(|value| value.to_string()).as_deref());
            }
        }
        // Unset or unsupported start: keep whatever the project holds.
        None => {}
    }
}

fn write_chapter(element: &mut Element, chapter: &Chapter) {
    set_child_text(element, "ID", Some(&chapter.id.to_string()));
    set_child_text(element, "Title", Some(&chapter.title));
    set_child_text(element, "Desc", chapter.desc.as_deref());
    let (legacy_type, chapter_type) = match chapter.kind {
        ChapterKind::Normal => ("0", "0"),
        ChapterKind::Notes => ("1", "1"),
        ChapterKind::Todo => ("1", "2"),
    };
    set_child_text(element, "Type", Some(legacy_type));
    set_child_text(element, "ChapterType", Some(chapter_type));
    set_child_text(element, "Unused", chapter.unused.then_some("-1"));
    set_field(element, "Field_IsTrash", chapter.is_trash.then_some("1"));
    let ids = chapter.scenes.iter().map(|id| id.0).collect::<Vec<_>>();
    set_id_list(element, "Scenes", "ScID", Some(&ids));
}

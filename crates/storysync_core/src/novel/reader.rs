//! Project XML → graph projection.

use crate::model::graph::Graph;
use crate::model::scene::{
    Chapter, ChapterKind, EntityKind, NodeId, Scene, SceneDuration, SceneKind, SceneStart,
    SceneStatus, WorldEntity,
};
use crate::novel::xml::{
    child_number, child_text, children, field_text, id_list, non_empty_text, split_list,
};
use crate::novel::NovelError;
use chrono::NaiveDateTime;
use xmltree::Element;

pub(crate) const ROOT: &str = "YWRITER7";
pub(crate) const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Section and record element names per entity kind.
pub(crate) fn entity_tags(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Character => ("CHARACTERS", "CHARACTER"),
        EntityKind::Location => ("LOCATIONS", "LOCATION"),
        EntityKind::Item => ("ITEMS", "ITEM"),
    }
}

/// Container and entry element names of scene reference lists.
pub(crate) fn reference_tags(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Character => ("Characters", "CharID"),
        EntityKind::Location => ("Locations", "LocID"),
        EntityKind::Item => ("Items", "ItemID"),
    }
}

pub(crate) fn record_id(element: &Element) -> Option<u32> {
    child_number(element, "ID")
}

fn required_id(element: &Element) -> Result<NodeId, NovelError> {
    record_id(element).map(NodeId).ok_or_else(|| {
        NovelError::InvalidData(format!("<{}> record without a valid <ID>", element.name))
    })
}

fn section<'a>(root: &'a Element, name: &'a str, record: &'a str) -> Vec<&'a Element> {
    root.get_child(name)
        .map(|container| children(container, record).collect())
        .unwrap_or_default()
}

/// Builds a graph from the project root element.
pub(crate) fn read_graph(root: &Element) -> Result<Graph, NovelError> {
    if root.name != ROOT {
        return Err(NovelError::InvalidData(format!(
            "unexpected root element <{}>",
            root.name
        )));
    }
    let mut graph = Graph::new();

    for kind in EntityKind::ALL {
        let (container, record) = entity_tags(kind);
        for element in section(root, container, record) {
            graph.add_entity(read_entity(element, kind)?);
        }
    }

    for element in section(root, "SCENES", "SCENE") {
        graph.add_scene(read_scene(element)?);
    }

    for element in section(root, "CHAPTERS", "CHAPTER") {
        let chapter = read_chapter(element)?;
        apply_chapter_classification(&mut graph, &chapter);
        graph.add_chapter(chapter);
    }

    Ok(graph)
}

fn read_entity(element: &Element, kind: EntityKind) -> Result<WorldEntity, NovelError> {
    let id = required_id(element)?;
    let mut entity = WorldEntity::new(id, kind, child_text(element, "Title").unwrap_or_default());
    entity.desc = non_empty_text(element, "Desc");
    entity.aka = non_empty_text(element, "AKA");
    entity.tags = tags(element);
    if kind == EntityKind::Character {
        entity.notes = non_empty_text(element, "Notes");
    }
    Ok(entity)
}

fn tags(element: &Element) -> Option<Vec<String>> {
    non_empty_text(element, "Tags")
        .map(|text| split_list(&text))
        .filter(|tags| !tags.is_empty())
}

fn read_scene(element: &Element) -> Result<Scene, NovelError> {
    let id = required_id(element)?;
    let mut scene = Scene::new(id, child_text(element, "Title").unwrap_or_default());
    scene.desc = non_empty_text(element, "Desc");
    scene.notes = non_empty_text(element, "Notes");
    scene.tags = tags(element);
    scene.status = child_number(element, "Status")
        .and_then(|code| u8::try_from(code).ok())
        .and_then(SceneStatus::from_code)
        .unwrap_or(SceneStatus::Outline);
    scene.unused = child_text(element, "Unused").is_some_and(|text| text.trim() == "-1");
    scene.kind = match field_text(element, "Field_SceneType").as_deref().map(str::trim) {
        Some("1") => SceneKind::Notes,
        Some("2") => SceneKind::Todo,
        _ => SceneKind::Normal,
    };
    scene.arcs = field_text(element, "Field_SceneArcs").map(|text| split_list(&text));

    scene.start = read_start(element);
    scene.duration = SceneDuration {
        days: child_number(element, "LastsDays"),
        hours: child_number(element, "LastsHours"),
        minutes: child_number(element, "LastsMinutes"),
    };

    for kind in EntityKind::ALL {
        let (container, entry) = reference_tags(kind);
        *scene.references_mut(kind) =
            id_list(element, container, entry).map(|ids| ids.into_iter().map(NodeId).collect());
    }

    scene.content = child_text(element, "SceneContent");
    Ok(scene)
}

/// Reads the start the way yWriter selects it: `SpecificDateMode = -1`
/// uses `SpecificDateTime`, any other mode the day/hour/minute offset.
///
/// A specific date before the supported range yields `None`; the raw
/// elements then stay untouched on write-back.
fn read_start(element: &Element) -> Option<SceneStart> {
    let specific_mode = child_text(element, "SpecificDateMode").is_some_and(|text| text.trim() == "-1");
    if specific_mode {
        return non_empty_text(element, "SpecificDateTime")
            .and_then(|text| NaiveDateTime::parse_from_str(text.trim(), DATE_TIME_FORMAT).ok())
            .and_then(SceneStart::specific);
    }
    let day = child_number(element, "Day");
    let hour = child_number(element, "Hour");
    let minute = child_number(element, "Minute");
    if day.is_none() && hour.is_none() && minute.is_none() {
        return None;
    }
    Some(SceneStart::Unspecific { day, hour, minute })
}

fn read_chapter(element: &Element) -> Result<Chapter, NovelError> {
    let id = required_id(element)?;
    let chapter_type = child_number(element, "ChapterType").or_else(|| child_number(element, "Type"));
    let kind = match chapter_type {
        Some(1) => ChapterKind::Notes,
        Some(2) => ChapterKind::Todo,
        _ => ChapterKind::Normal,
    };
    let mut chapter = Chapter::new(id, child_text(element, "Title").unwrap_or_default(), kind);
    chapter.desc = non_empty_text(element, "Desc");
    chapter.unused = child_text(element, "Unused").is_some_and(|text| text.trim() == "-1");
    chapter.is_trash = field_text(element, "Field_IsTrash").is_some_and(|text| text.trim() == "1");
    chapter.scenes = id_list(element, "Scenes", "ScID")
        .unwrap_or_default()
        .into_iter()
        .map(NodeId)
        .collect();
    Ok(chapter)
}

/// Propagates container classification down to the listed scenes.
fn apply_chapter_classification(graph: &mut Graph, chapter: &Chapter) {
    for id in &chapter.scenes {
        let Some(scene) = graph.scene_mut(*id) else {
            continue;
        };
        if scene.kind == SceneKind::Normal {
            match chapter.kind {
                ChapterKind::Notes => scene.kind = SceneKind::Notes,
                ChapterKind::Todo => scene.kind = SceneKind::Todo,
                ChapterKind::Normal => {}
            }
        }
        if chapter.unused || chapter.is_trash {
            scene.unused = true;
        }
    }
}

//! Title ambiguity checkpoints.

use crate::model::graph::{Graph, GraphError, TitleIndex, TitleKind};
use crate::model::scene::{EntityKind, Scene};
use std::collections::HashSet;

fn check_entities(graph: &Graph, document: &'static str) -> Result<(), GraphError> {
    for kind in EntityKind::ALL {
        let mut titles = TitleIndex::new(document, TitleKind::Entity(kind));
        for entity in graph.entities(kind).iter() {
            titles.insert(&entity.title, entity.id)?;
        }
    }
    Ok(())
}

fn check_scenes<'a>(
    scenes: impl Iterator<Item = &'a Scene>,
    document: &'static str,
) -> Result<(), GraphError> {
    let mut titles = TitleIndex::new(document, TitleKind::Scene);
    for scene in scenes {
        titles.insert(&scene.title, scene.id)?;
    }
    Ok(())
}

/// Checks every entity and every scene outside the trash chapter.
pub fn validate_source(graph: &Graph, document: &'static str) -> Result<(), GraphError> {
    check_entities(graph, document)?;
    let trashed = graph
        .chapters
        .iter()
        .filter(|chapter| chapter.is_trash)
        .flat_map(|chapter| chapter.scenes.iter().copied())
        .collect::<HashSet<_>>();
    check_scenes(
        graph.scenes.iter().filter(|scene| !trashed.contains(&scene.id)),
        document,
    )
}

/// Checks every entity and the active scenes; unused scenes are exempt.
pub fn validate_target(graph: &Graph, document: &'static str) -> Result<(), GraphError> {
    check_entities(graph, document)?;
    check_scenes(graph.scenes.iter().filter(|scene| !scene.unused), document)
}

//! Post-merge split of scenes at divider lines.
//!
//! # Responsibility
//! - Turn `# Title` lines in scene content into new chapters and `## Title`
//!   lines into new scenes.
//!
//! # Invariants
//! - Runs on a fully merged graph; all new ids come from the graph's own
//!   allocator, above every id already present.
//! - Generated scene titles never collide with existing ones.
//! - Scenes following a split scene move into the last chapter it opened,
//!   so reading order is unchanged.

use crate::model::graph::Graph;
use crate::model::scene::{Chapter, ChapterKind, NodeId, Scene};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static DIVIDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,2}) (.*)$").expect("valid divider regex"));

/// Number of records created by one split pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub chapters: usize,
    pub scenes: usize,
}

impl SplitReport {
    pub fn is_empty(&self) -> bool {
        self.chapters == 0 && self.scenes == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Divider {
    Chapter,
    Scene,
}

#[derive(Debug)]
struct Section {
    divider: Divider,
    title: String,
    lines: Vec<String>,
}

/// Splits content into the text before the first divider and the
/// sections opened by each divider.
fn parse_sections(content: &str) -> (String, Vec<Section>) {
    let mut head = Vec::new();
    let mut sections: Vec<Section> = Vec::new();
    for line in content.lines() {
        if let Some(captures) = DIVIDER_RE.captures(line) {
            let divider = if &captures[1] == "#" {
                Divider::Chapter
            } else {
                Divider::Scene
            };
            sections.push(Section {
                divider,
                title: captures[2].trim().to_string(),
                lines: Vec::new(),
            });
            continue;
        }
        match sections.last_mut() {
            Some(section) => section.lines.push(line.to_string()),
            None => head.push(line.to_string()),
        }
    }
    (head.join("\n"), sections)
}

fn unique_title(base: &str, titles: &mut HashSet<String>) -> String {
    let mut title = base.to_string();
    let mut counter = 2;
    while titles.contains(&title) {
        title = format!("{base} ({counter})");
        counter += 1;
    }
    titles.insert(title.clone());
    title
}

/// Splits every scene whose content holds divider lines.
pub fn split_scenes(graph: &mut Graph) -> SplitReport {
    let mut report = SplitReport::default();
    let mut titles = graph
        .scenes
        .iter()
        .map(|scene| scene.title.clone())
        .collect::<HashSet<_>>();
    for chapter_id in graph.chapters.ids().to_vec() {
        split_chapter(graph, chapter_id, &mut titles, &mut report);
    }
    if !report.is_empty() {
        info!(
            "event=scenes_split module=novel status=ok chapters={} scenes={}",
            report.chapters, report.scenes
        );
    }
    report
}

fn split_chapter(
    graph: &mut Graph,
    chapter_id: NodeId,
    titles: &mut HashSet<String>,
    report: &mut SplitReport,
) {
    let Some(chapter) = graph.chapter(chapter_id) else {
        return;
    };
    let kind = chapter.kind;
    let scene_ids = chapter.scenes.clone();
    let mut current = chapter_id;

    for scene_id in scene_ids {
        if current != chapter_id {
            move_scene(graph, chapter_id, current, scene_id);
        }
        let Some(scene) = graph.scene(scene_id) else {
            continue;
        };
        let Some(content) = scene.content.as_deref() else {
            continue;
        };
        let (head, sections) = parse_sections(content);
        if sections.is_empty() {
            continue;
        }
        let template = scene.clone();
        if let Some(scene) = graph.scene_mut(scene_id) {
            scene.content = Some(head);
        }

        let mut previous = scene_id;
        for section in sections {
            let title = if section.title.is_empty() {
                template.title.clone()
            } else {
                section.title
            };
            if section.divider == Divider::Chapter {
                current = insert_chapter_after(graph, current, &title, kind);
                report.chapters += 1;
            }
            let new_id = spawn_scene(graph, &template, &title, section.lines.join("\n"), titles);
            if section.divider == Divider::Chapter {
                graph.attach_scene(current, new_id);
            } else {
                graph.attach_scene_after(current, previous, new_id);
            }
            report.scenes += 1;
            previous = new_id;
        }
    }
}

fn move_scene(graph: &mut Graph, from: NodeId, to: NodeId, scene_id: NodeId) {
    if let Some(chapter) = graph.chapter_mut(from) {
        chapter.scenes.retain(|id| *id != scene_id);
    }
    graph.attach_scene(to, scene_id);
}

fn insert_chapter_after(graph: &mut Graph, after: NodeId, title: &str, kind: ChapterKind) -> NodeId {
    let id = graph.next_chapter_id();
    graph.add_chapter(Chapter::new(id, title, kind));
    let mut order = graph
        .chapters
        .ids()
        .iter()
        .copied()
        .filter(|chapter_id| *chapter_id != id)
        .collect::<Vec<_>>();
    let position = order
        .iter()
        .position(|chapter_id| *chapter_id == after)
        .map_or(order.len(), |index| index + 1);
    order.insert(position, id);
    graph.chapters.reorder(&order);
    id
}

/// Creates a scene carrying the classification and references of
/// `template`.
fn spawn_scene(
    graph: &mut Graph,
    template: &Scene,
    title: &str,
    content: String,
    titles: &mut HashSet<String>,
) -> NodeId {
    let id = graph.next_scene_id();
    let mut scene = Scene::new(id, unique_title(title, titles));
    scene.kind = template.kind;
    scene.status = template.status;
    scene.unused = template.unused;
    scene.characters = template.characters.clone();
    scene.locations = template.locations.clone();
    scene.items = template.items.clone();
    scene.arcs = template.arcs.clone();
    scene.content = Some(content);
    graph.add_scene(scene)
}

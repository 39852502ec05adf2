mod common;

use common::{event, find_event, read_timeline, timeline, timestamp, write_timeline, ScriptedUi, NOVEL};
use std::path::Path;
use storysync_core::{is_error_message, Converter, NovelDocument, SyncConfig};

fn scene_titles(path: &Path) -> Vec<String> {
    let (_, graph) = NovelDocument::open(path).unwrap();
    graph
        .scenes_in_reading_order()
        .into_iter()
        .filter_map(|id| graph.scene(id).map(|scene| scene.title.clone()))
        .collect()
}

fn story_events() -> serde_json::Value {
    timeline(vec![
        event("Storm", None, 0, true, &["e-bob"]),
        event("Arrival", Some(timestamp(1889, 4, 2, 9)), 2, true, &["e-alice"]),
    ])
}

#[test]
fn missing_novel_is_created_without_asking() {
    let dir = tempfile::tempdir().unwrap();
    let timeline_path = dir.path().join("story.aeonzip");
    let novel_path = dir.path().join("story.yw7");
    write_timeline(&timeline_path, &story_events());

    let mut ui = ScriptedUi::answering(false);
    let message = Converter::new(&mut ui, SyncConfig::default(), false).run(&timeline_path);

    assert!(!is_error_message(&message), "{message}");
    assert!(ui.prompts.is_empty());
    assert_eq!(ui.messages.last(), Some(&message));

    let (_, graph) = NovelDocument::open(&novel_path).unwrap();
    let chapters = graph
        .chapters
        .iter()
        .map(|chapter| chapter.title.clone())
        .collect::<Vec<_>>();
    assert_eq!(chapters, vec!["Chapter 1".to_string()]);
    assert_eq!(scene_titles(&novel_path), vec!["Storm".to_string(), "Arrival".to_string()]);
    assert_eq!(graph.characters.len(), 2);
}

#[test]
fn declined_overwrite_leaves_the_novel_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let timeline_path = dir.path().join("story.aeonzip");
    let novel_path = dir.path().join("story.yw7");
    write_timeline(&timeline_path, &story_events());
    std::fs::write(&novel_path, NOVEL).unwrap();

    let mut ui = ScriptedUi::answering(false);
    let message = Converter::new(&mut ui, SyncConfig::default(), false).run(&timeline_path);

    assert_eq!(message, "!Action canceled by user.");
    assert_eq!(ui.prompts.len(), 1);
    assert!(ui.prompts[0].starts_with("Overwrite existing file"));
    assert_eq!(std::fs::read_to_string(&novel_path).unwrap(), NOVEL);
}

#[test]
fn silent_mode_never_prompts() {
    let dir = tempfile::tempdir().unwrap();
    let timeline_path = dir.path().join("story.aeonzip");
    let novel_path = dir.path().join("story.yw7");
    write_timeline(&timeline_path, &story_events());
    std::fs::write(&novel_path, NOVEL).unwrap();

    let mut ui = ScriptedUi::answering(false);
    let message = Converter::new(&mut ui, SyncConfig::default(), true).run(&timeline_path);

    assert!(!is_error_message(&message), "{message}");
    assert!(ui.prompts.is_empty());
    let titles = scene_titles(&novel_path);
    assert!(titles.contains(&"Arrival".to_string()));
    assert!(titles.contains(&"Research".to_string()));
}

#[test]
fn novel_source_updates_the_sibling_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let timeline_path = dir.path().join("story.aeonzip");
    let novel_path = dir.path().join("story.yw7");
    write_timeline(&timeline_path, &timeline(vec![event("Storm", None, 0, true, &[])]));
    std::fs::write(&novel_path, NOVEL).unwrap();

    let mut ui = ScriptedUi::answering(true);
    let message = Converter::new(&mut ui, SyncConfig::default(), false).run(&novel_path);

    assert!(!is_error_message(&message), "{message}");
    assert_eq!(ui.prompts.len(), 1);
    let saved = read_timeline(&timeline_path);
    let storm = find_event(&saved, "Storm");
    assert!(storm["values"]
        .as_array()
        .unwrap()
        .iter()
        .any(|value| value["value"] == "Thunder over the bay"));
}

#[test]
fn locked_novel_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let timeline_path = dir.path().join("story.aeonzip");
    let novel_path = dir.path().join("story.yw7");
    write_timeline(&timeline_path, &story_events());
    std::fs::write(&novel_path, NOVEL).unwrap();
    std::fs::write(dir.path().join("story.yw7.lock"), b"").unwrap();

    let mut ui = ScriptedUi::answering(true);
    let message = Converter::new(&mut ui, SyncConfig::default(), false).run(&timeline_path);

    assert!(is_error_message(&message));
    assert!(message.contains("locked"), "{message}");
    assert!(ui.prompts.is_empty());
}

#[test]
fn unsupported_source_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let other = dir.path().join("notes.txt");
    std::fs::write(&other, b"plain").unwrap();

    let mut ui = ScriptedUi::answering(true);
    let message = Converter::new(&mut ui, SyncConfig::default(), false).run(&other);

    assert!(is_error_message(&message));
    assert!(message.contains("not supported"), "{message}");
}

#[test]
fn split_option_divides_scenes_after_update() {
    let dir = tempfile::tempdir().unwrap();
    let timeline_path = dir.path().join("story.aeonzip");
    let novel_path = dir.path().join("story.yw7");
    write_timeline(&timeline_path, &story_events());
    let novel = NOVEL.replace(
        "<SceneContent>It rained.</SceneContent>",
        "<SceneContent>It rained.\n## Aftermath\nMud everywhere.</SceneContent>",
    );
    std::fs::write(&novel_path, novel).unwrap();

    let mut config = SyncConfig::default();
    config.options.split_scenes = true;
    let mut ui = ScriptedUi::answering(true);
    let message = Converter::new(&mut ui, config, false).run(&timeline_path);
    assert!(!is_error_message(&message), "{message}");

    let (_, graph) = NovelDocument::open(&novel_path).unwrap();
    let storm = graph
        .scene_by_title("novel", "Storm")
        .unwrap()
        .and_then(|id| graph.scene(id))
        .unwrap();
    assert_eq!(storm.content.as_deref().map(str::trim), Some("It rained."));
    let aftermath = graph
        .scene_by_title("novel", "Aftermath")
        .unwrap()
        .and_then(|id| graph.scene(id))
        .unwrap();
    assert_eq!(aftermath.content.as_deref().map(str::trim), Some("Mud everywhere."));
}

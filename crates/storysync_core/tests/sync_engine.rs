mod common;

use chrono::NaiveDate;
use common::{event, restored_novel, timeline, timestamp, NOVEL, TRASHED_NOVEL};
use std::path::Path;
use storysync_core::model::scene::{Scene, SceneStart};
use storysync_core::sync::{validate_source, validate_target};
use storysync_core::{
    synchronize, Direction, EntityKind, GraphError, NovelDocument, SyncConfig, TimelineDocument,
    TimelineError,
};

fn load_timeline(events: Vec<serde_json::Value>) -> (TimelineDocument, storysync_core::Graph) {
    TimelineDocument::from_json(
        Path::new("story.aeonzip"),
        timeline(events),
        &SyncConfig::default(),
    )
    .expect("timeline fixture")
}

fn arrival() -> serde_json::Value {
    event("Arrival", Some(timestamp(1889, 4, 2, 9)), 2, true, &["e-alice"])
}

#[test]
fn duplicate_timeline_titles_abort_before_any_change() {
    let result = TimelineDocument::from_json(
        Path::new("story.aeonzip"),
        timeline(vec![
            event("Storm", None, 0, true, &[]),
            event("Storm", None, 0, false, &[]),
        ]),
        &SyncConfig::default(),
    );

    match result {
        Err(TimelineError::Graph(GraphError::AmbiguousTitle { title, .. })) => {
            assert_eq!(title, "Storm");
        }
        other => panic!("expected ambiguous title, got {other:?}"),
    }
}

#[test]
fn validation_verdict_is_stable() {
    let (_, mut graph) = NovelDocument::from_xml(Path::new("story.yw7"), NOVEL).expect("novel");
    assert_eq!(validate_source(&graph, "novel"), validate_source(&graph, "novel"));
    assert!(validate_target(&graph, "novel").is_ok());

    let id = graph.next_scene_id();
    graph.add_scene(Scene::new(id, "Storm"));
    let first = validate_source(&graph, "novel");
    assert!(matches!(first, Err(GraphError::AmbiguousTitle { .. })));
    assert_eq!(first, validate_source(&graph, "novel"));
    assert_eq!(validate_target(&graph, "novel"), first);
}

#[test]
fn new_timeline_scene_is_created_in_new_scenes_container() {
    let (_, source) = load_timeline(vec![arrival()]);
    let (_, mut target) = NovelDocument::from_xml(Path::new("story.yw7"), NOVEL).expect("novel");

    let report = synchronize(
        &source,
        &mut target,
        Direction::TimelineToNovel,
        &SyncConfig::default().options,
    )
    .expect("sync");

    assert_eq!(report.created_scenes, 1);
    let id = target
        .scene_by_title("novel", "Arrival")
        .expect("unique")
        .expect("created");
    let scene = target.scene(id).expect("scene");
    let expected = NaiveDate::from_ymd_opt(1889, 4, 2)
        .and_then(|date| date.and_hms_opt(9, 0, 0))
        .expect("date");
    assert_eq!(scene.start, Some(SceneStart::Specific(expected)));
    assert_eq!(scene.duration.days, Some(2));
    assert!(scene.in_narrative_arc());

    let characters = scene.characters.clone().expect("characters");
    assert_eq!(characters.len(), 1);
    let alice = target
        .entity(EntityKind::Character, characters[0])
        .expect("bound character");
    assert_eq!(alice.title, "Alice");

    let chapter = target
        .chapter(target.chapter_of(id).expect("placed"))
        .expect("chapter");
    assert_eq!(chapter.title, "New scenes");
}

#[test]
fn scene_missing_from_timeline_is_marked_unused() {
    let (_, source) = load_timeline(vec![arrival()]);
    let (_, mut target) = NovelDocument::from_xml(Path::new("story.yw7"), NOVEL).expect("novel");

    synchronize(
        &source,
        &mut target,
        Direction::TimelineToNovel,
        &SyncConfig::default().options,
    )
    .expect("sync");

    let storm_id = target
        .scene_by_title("novel", "Storm")
        .expect("unique")
        .expect("kept");
    let storm = target.scene(storm_id).expect("storm");
    assert!(storm.unused);
    assert_eq!(storm.desc.as_deref(), Some("Thunder over the bay"));
    assert_eq!(storm.content.as_deref(), Some("It rained."));

    let research_id = target
        .scene_by_title("novel", "Research")
        .expect("unique")
        .expect("kept");
    assert!(!target.scene(research_id).expect("research").unused);
}

#[test]
fn year_one_hundred_is_the_first_supported_date() {
    let (_, source) = load_timeline(vec![
        event("Ancient", Some(timestamp(99, 6, 1, 12)), 0, true, &[]),
        event("Classic", Some(timestamp(100, 6, 1, 12)), 0, true, &[]),
    ]);
    let (mut novel, mut target) = NovelDocument::create(Path::new("new.yw7"), "new");

    synchronize(
        &source,
        &mut target,
        Direction::TimelineToNovel,
        &SyncConfig::default().options,
    )
    .expect("sync");
    novel.apply_graph(&target);
    let (_, reread) =
        NovelDocument::from_xml(Path::new("new.yw7"), &novel.to_xml().expect("xml")).expect("reread");

    let ancient = reread
        .scene_by_title("novel", "Ancient")
        .expect("unique")
        .and_then(|id| reread.scene(id))
        .expect("ancient");
    assert_eq!(ancient.start, None);

    let classic = reread
        .scene_by_title("novel", "Classic")
        .expect("unique")
        .and_then(|id| reread.scene(id))
        .expect("classic");
    let expected = NaiveDate::from_ymd_opt(100, 6, 1)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .expect("date");
    assert_eq!(classic.start, Some(SceneStart::Specific(expected)));
}

#[test]
fn second_sync_after_reload_changes_nothing() {
    let (_, source) = load_timeline(vec![arrival()]);
    let options = SyncConfig::default().options;
    let (mut novel, mut target) =
        NovelDocument::from_xml(Path::new("story.yw7"), NOVEL).expect("novel");

    synchronize(&source, &mut target, Direction::TimelineToNovel, &options).expect("first");
    novel.apply_graph(&target);
    let text = novel.to_xml().expect("xml");

    let (_, mut reloaded) = NovelDocument::from_xml(Path::new("story.yw7"), &text).expect("reload");
    let before = reloaded.clone();
    let report =
        synchronize(&source, &mut reloaded, Direction::TimelineToNovel, &options).expect("second");

    assert!(report.is_unchanged(), "{}", report.message());
    for id in before.scenes.ids() {
        assert_eq!(reloaded.scene(*id), before.scene(*id));
    }
}

#[test]
fn retired_scene_stays_retired_until_its_title_returns() {
    let options = SyncConfig::default().options;
    let (_, mut target) = NovelDocument::from_xml(Path::new("story.yw7"), NOVEL).expect("novel");

    let (_, without_storm) = load_timeline(vec![arrival()]);
    synchronize(&without_storm, &mut target, Direction::TimelineToNovel, &options).expect("retire");
    synchronize(&without_storm, &mut target, Direction::TimelineToNovel, &options).expect("again");
    let storm_id = target
        .scene_by_title("novel", "Storm")
        .expect("unique")
        .expect("kept");
    assert!(target.scene(storm_id).expect("storm").unused);

    let (_, with_storm) = load_timeline(vec![arrival(), event("Storm", None, 0, true, &[])]);
    let report =
        synchronize(&with_storm, &mut target, Direction::TimelineToNovel, &options).expect("revive");
    assert_eq!(report.revived_scenes, 1);
    assert!(target.scene(storm_id).expect("storm").in_narrative_arc());
}

#[test]
fn empty_source_round_trips_the_novel() {
    let (_, source) = load_timeline(Vec::new());
    let (mut novel, original) = NovelDocument::from_xml(Path::new("story.yw7"), NOVEL).expect("novel");
    let mut target = original.clone();

    let report = synchronize(
        &source,
        &mut target,
        Direction::TimelineToNovel,
        &SyncConfig::default().options,
    )
    .expect("sync");
    assert!(report.is_unchanged());

    novel.apply_graph(&target);
    let (_, reread) =
        NovelDocument::from_xml(Path::new("story.yw7"), &novel.to_xml().expect("xml")).expect("reread");
    assert_eq!(reread.scenes.ids(), original.scenes.ids());
    for id in original.scenes.ids() {
        assert_eq!(reread.scene(*id), original.scene(*id));
    }
    for id in original.chapters.ids() {
        assert_eq!(reread.chapter(*id), original.chapter(*id));
    }
    assert_eq!(reread.characters.len(), original.characters.len());
}

#[test]
fn trashed_novel_scene_retires_its_timeline_event() {
    let options = SyncConfig::default().options;
    let (_, mut target) = load_timeline(vec![arrival(), event("Storm", None, 0, true, &[])]);
    let (_, trashed) =
        NovelDocument::from_xml(Path::new("story.yw7"), TRASHED_NOVEL).expect("novel");

    let report =
        synchronize(&trashed, &mut target, Direction::NovelToTimeline, &options).expect("sync");
    assert_eq!(report.retired_scenes, 1);
    assert_eq!(report.demoted_scenes, 0);
    let storm_id = target
        .scene_by_title("timeline", "Storm")
        .expect("unique")
        .expect("kept");
    let storm = target.scene(storm_id).expect("storm");
    assert!(storm.unused);
    assert!(storm.is_narrative());

    let (_, restored) =
        NovelDocument::from_xml(Path::new("story.yw7"), &restored_novel()).expect("novel");
    let report =
        synchronize(&restored, &mut target, Direction::NovelToTimeline, &options).expect("revive");
    assert_eq!(report.revived_scenes, 1);
    assert!(target.scene(storm_id).expect("storm").in_narrative_arc());
}

#[test]
fn unsupported_novel_date_survives_a_sync() {
    let novel_xml = NOVEL
        .replace(
            "<SCENE><ID>2</ID><Title>Research</Title></SCENE>",
            "<SCENE><ID>2</ID><Title>Research</Title></SCENE>\n    \
             <SCENE><ID>3</ID><Title>Ancient</Title>\
             <SpecificDateMode>-1</SpecificDateMode>\
             <SpecificDateTime>0099-05-01 10:00:00</SpecificDateTime></SCENE>",
        )
        .replace(
            "<Scenes><ScID>1</ScID></Scenes>",
            "<Scenes><ScID>1</ScID><ScID>3</ScID></Scenes>",
        );
    let (mut novel, mut target) =
        NovelDocument::from_xml(Path::new("story.yw7"), &novel_xml).expect("novel");
    let ancient_id = target
        .scene_by_title("novel", "Ancient")
        .expect("unique")
        .expect("present");
    assert_eq!(target.scene(ancient_id).expect("ancient").start, None);

    let (_, source) = load_timeline(vec![
        event("Storm", None, 0, true, &[]),
        event("Ancient", None, 0, true, &[]),
    ]);
    synchronize(
        &source,
        &mut target,
        Direction::TimelineToNovel,
        &SyncConfig::default().options,
    )
    .expect("sync");
    assert!(target.scene(ancient_id).expect("ancient").in_narrative_arc());

    novel.apply_graph(&target);
    let text = novel.to_xml().expect("xml");
    assert!(text.contains("0099-05-01 10:00:00"), "{text}");
    assert!(text.contains("SpecificDateMode"), "{text}");
}

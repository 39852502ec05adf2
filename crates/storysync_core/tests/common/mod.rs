#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use storysync_core::timeline::span::date_time_to_timestamp;
use storysync_core::Ui;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub fn timestamp(year: i32, month: u32, day: u32, hour: u32) -> i64 {
    let at = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .expect("valid fixture date");
    date_time_to_timestamp(at)
}

/// Timeline with the default template, Alice/Bob, and the given events.
pub fn timeline(events: Vec<Value>) -> Value {
    json!({
        "template": {
            "colors": [
                {"guid": "c-red", "name": "Red"},
                {"guid": "c-yellow", "name": "Yellow"}
            ],
            "rangeProperties": [{
                "guid": "p-date",
                "type": "date",
                "calendar": {"eras": [{"name": "BC"}, {"name": "AD"}]}
            }],
            "types": [
                {"guid": "t-arc", "name": "Arc", "roles": [
                    {"guid": "r-arc", "name": "Arc"},
                    {"guid": "r-story", "name": "Storyline"}
                ]},
                {"guid": "t-char", "name": "Character", "roles": [
                    {"guid": "r-char", "name": "Participant"}
                ]},
                {"guid": "t-loc", "name": "Location", "roles": [
                    {"guid": "r-loc", "name": "Location"}
                ]}
            ],
            "properties": [
                {"guid": "p-notes", "name": "Notes", "sortOrder": 0},
                {"guid": "p-desc", "name": "Description", "sortOrder": 1}
            ]
        },
        "entities": [
            {"entityType": "t-arc", "guid": "e-narr", "name": "Narrative"},
            {"entityType": "t-char", "guid": "e-alice", "name": "Alice", "notes": ""},
            {"entityType": "t-char", "guid": "e-bob", "name": "Bob", "notes": ""},
            {"entityType": "t-loc", "guid": "e-harbor", "name": "Harbor"}
        ],
        "events": events
    })
}

/// One event; `participants` are entity GUIDs with the character role.
pub fn event(
    title: &str,
    start: Option<i64>,
    days: i64,
    narrative: bool,
    participants: &[&str],
) -> Value {
    let mut relationships = participants
        .iter()
        .map(|guid| json!({"entity": guid, "percentAllocated": 1, "role": "r-char"}))
        .collect::<Vec<_>>();
    if narrative {
        relationships.push(json!({"entity": "e-narr", "percentAllocated": 1, "role": "r-arc"}));
    }
    let mut range_values = Vec::new();
    if let Some(timestamp) = start {
        range_values.push(json!({
            "rangeProperty": "p-date",
            "position": {"precision": "minute", "timestamp": timestamp},
            "span": {"days": days}
        }));
    }
    json!({
        "title": title,
        "guid": format!("ev-{title}"),
        "displayId": "1",
        "rangeValues": range_values,
        "relationships": relationships,
        "tags": [],
        "values": [],
        "customKey": "keep me"
    })
}

pub fn write_timeline(path: &Path, json: &Value) {
    let file = File::create(path).expect("create archive");
    let mut zip = ZipWriter::new(file);
    zip.start_file("timeline.json", SimpleFileOptions::default())
        .expect("start entry");
    zip.write_all(json.to_string().as_bytes()).expect("write entry");
    zip.finish().expect("finish archive");
}

pub fn read_timeline(path: &Path) -> Value {
    let file = File::open(path).expect("open archive");
    let mut archive = ZipArchive::new(file).expect("read archive");
    let mut entry = archive.by_name("timeline.json").expect("timeline entry");
    let mut text = String::new();
    entry.read_to_string(&mut text).expect("read entry");
    serde_json::from_str(&text).expect("timeline json")
}

pub fn event_titles(json: &Value) -> Vec<String> {
    json["events"]
        .as_array()
        .expect("events list")
        .iter()
        .filter_map(|event| event["title"].as_str())
        .map(str::to_string)
        .collect()
}

pub fn find_event<'a>(json: &'a Value, title: &str) -> &'a Value {
    json["events"]
        .as_array()
        .expect("events list")
        .iter()
        .find(|event| event["title"] == title)
        .expect("event present")
}

/// Novel with Alice (1), Bob (2), a normal chapter and a notes chapter.
pub const NOVEL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<YWRITER7>
  <PROJECT><Ver>7</Ver><Title>Story</Title></PROJECT>
  <LOCATIONS/>
  <ITEMS/>
  <CHARACTERS>
    <CHARACTER><ID>1</ID><Title>Alice</Title></CHARACTER>
    <CHARACTER><ID>2</ID><Title>Bob</Title></CHARACTER>
  </CHARACTERS>
  <SCENES>
    <SCENE>
      <ID>1</ID><Title>Storm</Title><Desc>Thunder over the bay</Desc>
      <Notes>Handwritten</Notes><Status>2</Status>
      <Characters><CharID>2</CharID></Characters>
      <SceneContent>It rained.</SceneContent>
      <ReactionScene>-1</ReactionScene>
    </SCENE>
    <SCENE><ID>2</ID><Title>Research</Title></SCENE>
  </SCENES>
  <CHAPTERS>
    <CHAPTER><ID>1</ID><Title>Chapter One</Title><Type>0</Type><Scenes><ScID>1</ScID></Scenes></CHAPTER>
    <CHAPTER><ID>2</ID><Title>Notes</Title><Type>1</Type><ChapterType>1</ChapterType><Scenes><ScID>2</ScID></Scenes></CHAPTER>
  </CHAPTERS>
</YWRITER7>
"#;

/// Novel with "Arrival" in a normal chapter and "Storm" in the trash.
pub const TRASHED_NOVEL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<YWRITER7>
  <PROJECT><Ver>7</Ver><Title>Story</Title></PROJECT>
  <LOCATIONS/>
  <ITEMS/>
  <CHARACTERS>
    <CHARACTER><ID>1</ID><Title>Alice</Title></CHARACTER>
  </CHARACTERS>
  <SCENES>
    <SCENE><ID>1</ID><Title>Arrival</Title><Characters><CharID>1</CharID></Characters></SCENE>
    <SCENE><ID>2</ID><Title>Storm</Title></SCENE>
  </SCENES>
  <CHAPTERS>
    <CHAPTER><ID>1</ID><Title>One</Title><Type>0</Type><Scenes><ScID>1</ScID></Scenes></CHAPTER>
    <CHAPTER><ID>2</ID><Title>Trash</Title><Fields><Field_IsTrash>1</Field_IsTrash></Fields><Scenes><ScID>2</ScID></Scenes></CHAPTER>
  </CHAPTERS>
</YWRITER7>
"#;

/// `TRASHED_NOVEL` after "Storm" was moved back into chapter "One".
pub fn restored_novel() -> String {
    TRASHED_NOVEL
        .replace("<Scenes><ScID>2</ScID></Scenes>", "<Scenes/>")
        .replace(
            "<Scenes><ScID>1</ScID></Scenes>",
            "<Scenes><ScID>1</ScID><ScID>2</ScID></Scenes>",
        )
}

/// Records prompts and messages; answers every prompt with `answer`.
pub struct ScriptedUi {
    pub answer: bool,
    pub prompts: Vec<String>,
    pub messages: Vec<String>,
}

impl ScriptedUi {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Vec::new(),
            messages: Vec::new(),
        }
    }
}

impl Ui for ScriptedUi {
    fn ask_yes_no(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.answer
    }

    fn set_info(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

//! JSON → graph projection.

use crate::model::graph::{Graph, TitleIndex, TitleKind};
use crate::model::scene::{
    Chapter, ChapterKind, EntityKind, NodeId, Scene, SceneKind, SceneStart, WorldEntity,
};
use crate::timeline::document::TimelineDocument;
use crate::timeline::schema::str_field;
use crate::timeline::span::{
    date_time_to_timestamp, json_number, span_to_duration, timestamp_to_date_time, DATE_LIMIT,
};
use crate::timeline::{TimelineError, TIMELINE_DOCUMENT};
use serde_json::{Map, Value};
use std::collections::HashMap;

const NARRATIVE_CHAPTER_ID: NodeId = NodeId(1);
const BACKGROUND_CHAPTER_ID: NodeId = NodeId(2);
const NARRATIVE_CHAPTER_TITLE: &str = "Chapter 1";
const BACKGROUND_CHAPTER_TITLE: &str = "Background";

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|text| !text.is_empty()).map(str::to_string)
}

impl TimelineDocument {
    /// Projects the retained JSON onto a fresh graph and records the GUID
    /// bookkeeping needed for writing.
    ///
    /// Events become scenes in two containers: narrative-arc events in
    /// "Chapter 1", all others in "Background", each sorted by timestamp.
    pub(super) fn read_graph(&mut self) -> Result<Graph, TimelineError> {
        let mut graph = Graph::new();
        let narrative_name = self.config.settings.narrative_arc.as_str();

        let mut ids_by_guid: HashMap<String, (EntityKind, NodeId)> = HashMap::new();
        let mut entity_guids = HashMap::new();
        let mut arc_guids = HashMap::new();
        let mut narrative_guid = None;
        let mut arc_count = 0;

        for entity in self.entities() {
            let Some(entity_type) = str_field(entity, "entityType") else {
                continue;
            };
            let name = str_field(entity, "name").unwrap_or_default();
            let guid = str_field(entity, "guid").unwrap_or_default().to_string();

            if entity_type == self.schema.type_arc {
                arc_count += 1;
                if name == narrative_name {
                    narrative_guid = Some(guid);
                } else {
                    arc_guids.insert(name.to_string(), guid);
                }
                continue;
            }

            let Some(kind) = self.schema.entity_kind(entity_type) else {
                continue;
            };
            let id = graph.next_entity_id(kind);
            let mut record = WorldEntity::new(id, kind, name);
            if kind == EntityKind::Character {
                record.notes = non_empty(str_field(entity, "notes"));
            }
            graph.add_entity(record);
            ids_by_guid.insert(guid.clone(), (kind, id));
            entity_guids.insert((kind, id), guid);
        }

        let arc_names = arc_guids
            .iter()
            .map(|(name, guid)| (guid.clone(), name.clone()))
            .collect::<HashMap<_, _>>();

        let mut titles = TitleIndex::new(TIMELINE_DOCUMENT, TitleKind::Scene);
        let mut by_timestamp: Vec<(i64, NodeId)> = Vec::new();
        let mut event_index = HashMap::new();
        let mut timestamp_max = 0i64;
        let mut display_id_max = 0i64;

        for (index, event) in self.events().iter().enumerate() {
            let id = NodeId(
                u32::try_from(index + 1)
                    .map_err(|_| TimelineError::InvalidData("too many events".to_string()))?,
            );
            let title = str_field(event, "title").unwrap_or_default();
            titles.insert(title, id)?;

            if let Some(display_id) = event.get("displayId").and_then(json_number) {
                display_id_max = display_id_max.max(display_id);
            }

            let mut scene = Scene::new(id, title);
            scene.kind = SceneKind::Notes;

            for value in list(event, "values") {
                let property = str_field(value, "property");
                let text = non_empty(str_field(value, "value"));
                if property == Some(self.schema.property_desc.as_str()) {
                    scene.desc = text;
                } else if property == Some(self.schema.property_notes.as_str()) {
                    scene.notes = text;
                }
            }

            let tags = list(event, "tags")
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>();
            if !tags.is_empty() {
                scene.tags = Some(tags);
            }

            let timestamp = self.read_date(event, &mut scene);

            let mut arcs = Vec::new();
            for relationship in list(event, "relationships") {
                let (Some(role), Some(entity)) =
                    (str_field(relationship, "role"), str_field(relationship, "entity"))
                else {
                    continue;
                };
                if role == self.schema.role_arc {
                    if narrative_guid.as_deref() == Some(entity) {
                        scene.kind = SceneKind::Normal;
                        timestamp_max = timestamp_max.max(timestamp);
                    }
                } else if role == self.schema.role_storyline {
                    if let Some(name) = arc_names.get(entity) {
                        arcs.push(name.clone());
                    }
                } else if let Some(kind) = self.schema.role_kind(role) {
                    // Relationships to entities of another type are dropped.
                    if let Some((found_kind, entity_id)) = ids_by_guid.get(entity) {
                        if *found_kind == kind {
                            scene
                                .references_mut(kind)
                                .get_or_insert_with(Vec::new)
                                .push(*entity_id);
                        }
                    }
                }
            }
            scene.arcs = Some(arcs);

            graph.add_scene(scene);
            by_timestamp.push((timestamp, id));
            event_index.insert(id, index);
        }

        by_timestamp.sort_by_key(|(timestamp, _)| *timestamp);
        let mut narrative =
            Chapter::new(NARRATIVE_CHAPTER_ID, NARRATIVE_CHAPTER_TITLE, ChapterKind::Normal);
        let mut background =
            Chapter::new(BACKGROUND_CHAPTER_ID, BACKGROUND_CHAPTER_TITLE, ChapterKind::Notes);
        for (_, id) in by_timestamp {
            if graph.scene(id).is_some_and(Scene::is_narrative) {
                narrative.scenes.push(id);
            } else {
                background.scenes.push(id);
            }
        }
        graph.add_chapter(narrative);
        graph.add_chapter(background);

        if timestamp_max == 0 {
            timestamp_max = date_time_to_timestamp(self.config.reference_time());
        }

        self.entity_guids = entity_guids;
        self.arc_guids = arc_guids;
        self.narrative_guid = narrative_guid;
        self.arc_count = arc_count;
        self.event_index = event_index;
        self.timestamp_max = timestamp_max;
        self.display_id_max = display_id_max;
        Ok(graph)
    }

    /// Reads the start and duration of `event` into `scene`; returns the
    /// raw timestamp used for sorting (0 when undated).
    fn read_date(&self, event: &Value, scene: &mut Scene) -> i64 {
        let Some(range) = list(event, "rangeValues")
            .iter()
            .find(|range| str_field(range, "rangeProperty") == Some(self.schema.date_property.as_str()))
        else {
            return 0;
        };
        let Some(timestamp) = range.pointer("/position/timestamp").and_then(json_number) else {
            return 0;
        };
        if timestamp >= DATE_LIMIT {
            if let Some(start) = timestamp_to_date_time(timestamp) {
                scene.start = SceneStart::specific(start);
                let empty = Map::new();
                let span = range.get("span").and_then(Value::as_object).unwrap_or(&empty);
                scene.duration = span_to_duration(start, span);
            }
        }
        timestamp
    }
}

fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use crate::config::SyncConfig;
    use crate::model::scene::{EntityKind, NodeId, SceneKind, SceneStart};
    use crate::timeline::span::DATE_LIMIT;
    use crate::timeline::{TimelineDocument, TimelineError};
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::path::Path;

    fn timeline(events: Value) -> Value {
        json!({
            "template": {
                "colors": [],
                "rangeProperties": [{
                    "guid": "date", "type": "date", "calendar": {"eras": [{"name": "AD"}]}
                }],
                "types": [
                    {"guid": "t-arc", "name": "Arc", "roles": [
                        {"guid": "r-arc", "name": "Arc"}, {"guid": "r-story", "name": "Storyline"}
                    ]},
                    {"guid": "t-char", "name": "Character", "roles": [{"guid": "r-char", "name": "Participant"}]}
                ],
                "properties": [
                    {"guid": "p-notes", "name": "Notes", "sortOrder": 0},
                    {"guid": "p-desc", "name": "Description", "sortOrder": 1}
                ]
            },
            "entities": [
                {"entityType": "t-arc", "guid": "e-narr", "name": "Narrative"},
                {"entityType": "t-arc", "guid": "e-sub", "name": "Subplot"},
                {"entityType": "t-char", "guid": "e-ann", "name": "Ann", "notes": "Heroine"}
            ],
            "events": events
        })
    }

    fn event(title: &str, timestamp: i64, narrative: bool) -> Value {
        let mut relationships = vec![json!({"entity": "e-ann", "role": "r-char"})];
        if narrative {
            relationships.push(json!({"entity": "e-narr", "role": "r-arc"}));
            relationships.push(json!({"entity": "e-sub", "role": "r-story"}));
        }
        json!({
            "title": title,
            "displayId": 3,
            "tags": ["storm"],
            "rangeValues": [{
                "rangeProperty": "date",
                "position": {"timestamp": timestamp},
                "span": {"hours": 2}
            }],
            "relationships": relationships,
            "values": [{"property": "p-desc", "value": format!("{title} desc")}]
        })
    }

    #[test]
    fn events_become_scenes_in_two_containers() {
        let json = timeline(json!([
            event("Later", 59_587_441_200, true),
            event("Aside", 59_587_434_000, false),
            event("Earlier", 59_587_434_000, true),
        ]));
        let (document, graph) =
            TimelineDocument::from_json(Path::new("t.aeonzip"), json, &SyncConfig::default())
                .unwrap();

        let narrative = graph.chapter(NodeId(1)).unwrap();
        assert_eq!(narrative.title, "Chapter 1");
        assert_eq!(narrative.scenes, vec![NodeId(3), NodeId(1)]);
        let background = graph.chapter(NodeId(2)).unwrap();
        assert_eq!(background.scenes, vec![NodeId(2)]);

        let later = graph.scene(NodeId(1)).unwrap();
        assert_eq!(later.kind, SceneKind::Normal);
        assert_eq!(later.desc.as_deref(), Some("Later desc"));
        assert_eq!(later.tags, Some(vec!["storm".to_string()]));
        assert_eq!(later.arcs, Some(vec!["Subplot".to_string()]));
        assert_eq!(later.characters, Some(vec![NodeId(1)]));
        assert_eq!(later.duration.hours, Some(2));
        let expected = NaiveDate::from_ymd_opt(1889, 4, 2)
            .and_then(|date| date.and_hms_opt(11, 0, 0))
            .unwrap();
        assert_eq!(later.start, Some(SceneStart::Specific(expected)));

        assert_eq!(graph.scene(NodeId(2)).unwrap().kind, SceneKind::Notes);
        let ann = graph.entity(EntityKind::Character, NodeId(1)).unwrap();
        assert_eq!(ann.notes.as_deref(), Some("Heroine"));
        assert_eq!(document.timestamp_max, 59_587_441_200);
        assert_eq!(document.display_id_max, 3);
    }

    #[test]
    fn duplicate_event_titles_are_fatal() {
        let json = timeline(json!([
            event("Storm", DATE_LIMIT, true),
            event("Storm", DATE_LIMIT + 60, false),
        ]));
        let err = TimelineDocument::from_json(Path::new("t.aeonzip"), json, &SyncConfig::default())
            .unwrap_err();
        assert!(matches!(err, TimelineError::Graph(_)));
        assert_eq!(err.to_string(), "Ambiguous timeline scene title \"Storm\".");
    }

    #[test]
    fn dates_before_year_one_hundred_are_left_unset() {
        let json = timeline(json!([event("Ancient", DATE_LIMIT - 86_400, true)]));
        let (_, graph) =
            TimelineDocument::from_json(Path::new("t.aeonzip"), json, &SyncConfig::default())
                .unwrap();
        let scene = graph.scene(NodeId(1)).unwrap();
        assert!(scene.start.is_none());
        assert!(scene.duration.is_empty());
    }
}

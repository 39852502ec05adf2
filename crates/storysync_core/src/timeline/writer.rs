//! Graph → JSON fold-back.

use crate::model::graph::Graph;
use crate::model::scene::{EntityKind, NodeId, Scene, SceneStart};
use crate::moon::{moon_phase_for, render_phase};
use crate::timeline::document::TimelineDocument;
use crate::timeline::schema::{str_field, TimelineSchema};
use crate::timeline::span::{date_time_to_timestamp, duration_to_span, json_number, DATE_LIMIT};
use crate::uid::derive_id;
use log::{debug, info};
use serde_json::{json, Value};
use std::collections::HashMap;

const EVENT_PRIORITY: i64 = 500;

fn entity_style(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Character => ("person", "darkPink"),
        EntityKind::Location => ("map", "orange"),
        EntityKind::Item => ("cube", "denim"),
    }
}

fn relationship(entity: &str, role: &str) -> Value {
    json!({
        "entity": entity,
        "percentAllocated": 1,
        "role": role,
    })
}

fn links(value: &Value, entity: &str, role: &str) -> bool {
    str_field(value, "entity") == Some(entity) && str_field(value, "role") == Some(role)
}

fn arc_entity(type_arc: &str, guid: &str, name: &str, order: usize) -> Value {
    json!({
        "entityType": type_arc,
        "guid": guid,
        "icon": "book",
        "name": name,
        "notes": "",
        "sortOrder": order,
        "swatchColor": "orange",
    })
}

/// Sets the value of `property` on an event, adding the entry if missing.
fn set_value(event: &mut Value, property: &str, text: &str) {
    let Some(object) = event.as_object_mut() else {
        return;
    };
    let values = object
        .entry("values".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(values) = values.as_array_mut() else {
        return;
    };
    match values
        .iter_mut()
        .find(|value| str_field(value, "property") == Some(property))
    {
        Some(value) => value["value"] = Value::from(text),
        None => values.push(json!({"property": property, "value": text})),
    }
}

/// Read-only view of the lookups needed while rewriting one event.
struct EventContext<'a> {
    schema: &'a TimelineSchema,
    entity_guids: &'a HashMap<(EntityKind, NodeId), String>,
    arc_guids: &'a HashMap<String, String>,
    narrative_guid: &'a str,
}

impl EventContext<'_> {
    fn rewrite(&self, event: &mut Value, scene: &Scene, timestamp_max: &mut i64) {
        if !event.is_object() {
            return;
        }
        self.rewrite_date(event, scene, timestamp_max);

        if let Some(desc) = scene.desc.as_deref().filter(|text| !text.is_empty()) {
            set_value(event, &self.schema.property_desc, desc);
        }
        if let Some(notes) = scene.notes.as_deref().filter(|text| !text.is_empty()) {
            set_value(event, &self.schema.property_notes, notes);
        }
        if let Some(property) = &self.schema.property_moonphase {
            let phase = match &scene.start {
                Some(SceneStart::Specific(at)) => moon_phase_for(at.date())
                    .map(render_phase)
                    .unwrap_or_default(),
                _ => String::new(),
            };
            set_value(event, property, &phase);
        }

        if let Some(tags) = scene.tags.as_ref().filter(|tags| !tags.is_empty()) {
            event["tags"] = json!(tags);
        }

        self.rewrite_relationships(event, scene);
    }

    fn rewrite_date(&self, event: &mut Value, scene: &Scene, timestamp_max: &mut i64) {
        let Some(ranges) = event.get_mut("rangeValues").and_then(Value::as_array_mut) else {
            return;
        };
        let Some(range) = ranges
            .iter_mut()
            .find(|range| str_field(range, "rangeProperty") == Some(&*self.schema.date_property))
        else {
            return;
        };
        let current = range
            .pointer("/position/timestamp")
            .and_then(json_number)
            .unwrap_or(0);
        if current < DATE_LIMIT {
            return;
        }

        let timestamp = match &scene.start {
            Some(SceneStart::Specific(at)) => date_time_to_timestamp(*at),
            _ => {
                *timestamp_max += 1;
                *timestamp_max
            }
        };
        range["span"] = Value::Object(duration_to_span(&scene.duration));
        match range.pointer_mut("/position/timestamp") {
            Some(slot) => *slot = Value::from(timestamp),
            None => range["position"] = json!({"precision": "minute", "timestamp": timestamp}),
        }
    }

    fn rewrite_relationships(&self, event: &mut Value, scene: &Scene) {
        let schema = self.schema;
        let entity_roles = EntityKind::ALL.map(|kind| schema.role_guid(kind));
        let existing = event
            .get("relationships")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut relationships = existing
            .into_iter()
            .filter(|value| {
                str_field(value, "role").is_some_and(|role| !entity_roles.contains(&role))
            })
            .collect::<Vec<_>>();

        for kind in EntityKind::ALL {
            for id in scene.references(kind).into_iter().flatten() {
                if let Some(guid) = self.entity_guids.get(&(kind, *id)) {
                    relationships.push(relationship(guid, schema.role_guid(kind)));
                }
            }
        }

        let narrative = relationship(self.narrative_guid, &schema.role_arc);
        if scene.in_narrative_arc() {
            if !relationships
                .iter()
                .any(|value| links(value, self.narrative_guid, &schema.role_arc))
            {
                relationships.push(narrative);
            }
            if let Some(arcs) = &scene.arcs {
                relationships.retain(|value| {
                    str_field(value, "role") != Some(&*schema.role_storyline)
                        || str_field(value, "entity").is_some_and(|entity| {
                            !self.arc_guids.values().any(|guid| guid == entity)
                        })
                });
                for name in arcs {
                    if let Some(guid) = self.arc_guids.get(name) {
                        relationships.push(relationship(guid, &schema.role_storyline));
                    }
                }
            }
        } else {
            relationships.retain(|value| !links(value, self.narrative_guid, &schema.role_arc));
        }

        event["relationships"] = Value::Array(relationships);
    }
}

impl TimelineDocument {
    /// Folds `graph` into the retained JSON tree.
    ///
    /// Unused scenes remove their events; new scenes append events; all
    /// others update their event in place.
    pub(crate) fn apply_graph(&mut self, graph: &Graph) {
        self.write_entities(graph);
        let narrative_guid = self.ensure_narrative_arc();
        self.ensure_story_arcs(graph);

        let mut created = 0usize;
        for scene in graph.scenes.iter() {
            if self.event_index.contains_key(&scene.id) || scene.unused {
                continue;
            }
            let event = self.build_event(scene);
            if let Some(events) = self.list_mut("events") {
                events.push(event);
                let index = events.len() - 1;
                self.event_index.insert(scene.id, index);
                created += 1;
            }
        }

        let mut retired = Vec::new();
        {
            let Self {
                json,
                schema,
                entity_guids,
                arc_guids,
                event_index,
                timestamp_max,
                ..
            } = self;
            let context = EventContext {
                schema,
                entity_guids,
                arc_guids,
                narrative_guid: &narrative_guid,
            };
            let Some(events) = json.get_mut("events").and_then(Value::as_array_mut) else {
                return;
            };
            for scene in graph.scenes.iter() {
                let Some(index) = event_index.get(&scene.id).copied() else {
                    continue;
                };
                if scene.unused {
                    retired.push(index);
                    continue;
                }
                if let Some(event) = events.get_mut(index) {
                    context.rewrite(event, scene, timestamp_max);
                }
            }
        }

        let removed = self.remove_events(retired);
        info!(
            "event=timeline_merged module=timeline status=ok events_created={} events_removed={}",
            created, removed
        );
    }

    /// Adds entity records for graph entities that have no GUID yet and
    /// refreshes character notes.
    fn write_entities(&mut self, graph: &Graph) {
        for kind in EntityKind::ALL {
            let type_guid = self.schema.type_guid(kind).to_string();
            let (icon, swatch) = entity_style(kind);
            let mut count = self
                .entities()
                .iter()
                .filter(|entity| str_field(entity, "entityType") == Some(type_guid.as_str()))
                .count();

            for entity in graph.entities(kind).iter() {
                if let Some(guid) = self.entity_guids.get(&(kind, entity.id)).cloned() {
                    if let Some(notes) = entity.notes.as_deref().filter(|notes| !notes.is_empty()) {
                        if let Some(record) = self.list_mut("entities").and_then(|entities| {
                            entities
                                .iter_mut()
                                .find(|record| str_field(record, "guid") == Some(guid.as_str()))
                        }) {
                            record["notes"] = Value::from(notes);
                        }
                    }
                    continue;
                }

                let guid = derive_id(&format!("{}{}", entity.id, entity.title));
                let record = json!({
                    "entityType": type_guid,
                    "guid": guid,
                    "icon": icon,
                    "name": entity.title,
                    "notes": entity.notes.clone().unwrap_or_default(),
                    "sortOrder": count,
                    "swatchColor": swatch,
                });
                if let Some(entities) = self.list_mut("entities") {
                    entities.push(record);
                    count += 1;
                    debug!(
                        "event=timeline_entity_created module=timeline status=ok kind={} id={}",
                        kind.label(),
                        entity.id
                    );
                    self.entity_guids.insert((kind, entity.id), guid);
                }
            }
        }
    }

    /// Returns the narrative arc GUID, creating the arc entity if missing.
    fn ensure_narrative_arc(&mut self) -> String {
        if let Some(guid) = &self.narrative_guid {
            return guid.clone();
        }
        let guid = derive_id("entityNarrativeGuid");
        let record = arc_entity(
            &self.schema.type_arc,
            &guid,
            &self.config.settings.narrative_arc,
            self.arc_count,
        );
        if let Some(entities) = self.list_mut("entities") {
            entities.push(record);
        }
        self.arc_count += 1;
        self.narrative_guid = Some(guid.clone());
        guid
    }

    /// Creates arc entities for story arc names not yet in the timeline.
    fn ensure_story_arcs(&mut self, graph: &Graph) {
        let mut missing = Vec::new();
        for scene in graph.scenes.iter().filter(|scene| scene.in_narrative_arc()) {
            for name in scene.arcs.iter().flatten() {
                if name.is_empty()
                    || *name == self.config.settings.narrative_arc
                    || self.arc_guids.contains_key(name)
                    || missing.contains(name)
                {
                    continue;
                }
                missing.push(name.clone());
            }
        }
        for name in missing {
            let guid = derive_id(&format!("entity{name}ArcGuid"));
            let record = arc_entity(&self.schema.type_arc, &guid, &name, self.arc_count);
            if let Some(entities) = self.list_mut("entities") {
                entities.push(record);
            }
            self.arc_count += 1;
            self.arc_guids.insert(name, guid);
        }
    }

    fn build_event(&mut self, scene: &Scene) -> Value {
        self.display_id_max += 1;
        let color_name = if scene.is_narrative() {
            &self.config.settings.color_scene
        } else {
            &self.config.settings.color_event
        };
        json!({
            "attachments": [],
            "color": self.schema.color(color_name),
            "displayId": self.display_id_max.to_string(),
            "guid": derive_id(&format!("scene{}", scene.title)),
            "links": [],
            "locked": false,
            "priority": EVENT_PRIORITY,
            "rangeValues": [{
                "minimumZoom": -1,
                "position": {
                    "precision": "minute",
                    "timestamp": DATE_LIMIT,
                },
                "rangeProperty": self.schema.date_property,
                "span": {},
            }],
            "relationships": [],
            "tags": [],
            "title": scene.title,
            "values": [
                {"property": self.schema.property_notes, "value": ""},
                {"property": self.schema.property_desc, "value": ""},
            ],
        })
    }

    /// Removes the events at `indices`; returns how many were removed.
    fn remove_events(&mut self, mut indices: Vec<usize>) -> usize {
        if indices.is_empty() {
            return 0;
        }
        indices.sort_unstable();
        indices.dedup();
        let Some(events) = self.list_mut("events") else {
            return 0;
        };
        let mut removed = 0;
        for index in indices.iter().rev() {
            if *index < events.len() {
                events.remove(*index);
                removed += 1;
            }
        }

        let mut event_index = std::mem::take(&mut self.event_index);
        event_index.retain(|_, index| indices.binary_search(index).is_err());
        for index in event_index.values_mut() {
            let current = *index;
            *index -= indices.partition_point(|gone| *gone < current);
        }
        self.event_index = event_index;
        removed
    }
}

//! Template discovery and bootstrapping.
//!
//! # Responsibility
//! - Resolve GUIDs of the date range property, types, roles, and
//!   properties the adapter relies on.
//! - Add missing template elements with deterministic GUIDs.
//!
//! # Invariants
//! - A template without a date range property in the "AD" era is fatal.
//! - Bootstrapping is idempotent: a second pass over its own output adds
//!   nothing.

use crate::config::SyncConfig;
use crate::model::scene::EntityKind;
use crate::timeline::TimelineError;
use crate::uid::derive_id;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

const TYPE_ARC: &str = "Arc";
const ROLE_ARC: &str = "Arc";
const ROLE_STORYLINE: &str = "Storyline";
const ERA_AD: &str = "AD";

/// Name of the optional moon phase property.
pub const PROPERTY_MOONPHASE: &str = "Moon phase";

/// GUIDs of the template elements used by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSchema {
    pub date_property: String,
    pub type_arc: String,
    pub role_arc: String,
    pub role_storyline: String,
    pub type_character: String,
    pub role_character: String,
    pub type_location: String,
    pub role_location: String,
    pub type_item: String,
    pub role_item: String,
    pub property_desc: String,
    pub property_notes: String,
    pub property_moonphase: Option<String>,
    /// Color name → color GUID.
    pub colors: HashMap<String, String>,
}

struct TypeSpec<'a> {
    name: &'a str,
    role: &'a str,
    seed: &'a str,
    color: &'a str,
    icon: &'a str,
    persistent: bool,
}

impl TimelineSchema {
    /// Resolves the schema from `json`, adding whatever is missing.
    pub fn bootstrap(json: &mut Value, config: &SyncConfig) -> Result<Self, TimelineError> {
        let settings = &config.settings;
        let template = json
            .get_mut("template")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| TimelineError::InvalidData("missing template".to_string()))?;

        let colors = read_colors(template);
        let date_property = find_date_property(template).ok_or(TimelineError::MissingEra)?;

        let types = array_mut(template, "types")?;
        let (type_arc, role_arc, role_storyline) = ensure_arc_type(types);
        let (type_character, role_character) = ensure_type(
            types,
            &TypeSpec {
                name: &settings.type_character,
                role: &settings.role_character,
                seed: "Character",
                color: "iconRed",
                icon: "person",
                persistent: false,
            },
        );
        let (type_location, role_location) = ensure_type(
            types,
            &TypeSpec {
                name: &settings.type_location,
                role: &settings.role_location,
                seed: "Location",
                color: "iconOrange",
                icon: "map",
                persistent: true,
            },
        );
        let (type_item, role_item) = ensure_type(
            types,
            &TypeSpec {
                name: &settings.type_item,
                role: &settings.role_item,
                seed: "Item",
                color: "iconPurple",
                icon: "cube",
                persistent: true,
            },
        );

        let properties = array_mut(template, "properties")?;
        let property_notes = match find_named(properties, &settings.property_notes) {
            Some(guid) => guid,
            None => {
                for property in properties.iter_mut().filter_map(Value::as_object_mut) {
                    let order = property.get("sortOrder").and_then(Value::as_i64).unwrap_or(0);
                    property.insert("sortOrder".to_string(), Value::from(order + 1));
                }
                let guid = derive_id("_propertyNotesGuid");
                properties.insert(
                    0,
                    property_json(&guid, &settings.property_notes, "tag", "multitext", 0),
                );
                guid
            }
        };
        let property_desc = match find_named(properties, &settings.property_description) {
            Some(guid) => guid,
            None => {
                let guid = derive_id("_propertyDescGuid");
                let order = properties.len();
                properties.push(property_json(
                    &guid,
                    &settings.property_description,
                    "tag",
                    "multitext",
                    order,
                ));
                guid
            }
        };
        let property_moonphase = match find_named(properties, PROPERTY_MOONPHASE) {
            Some(guid) => Some(guid),
            None if config.options.add_moonphase => {
                let guid = derive_id("_propertyMoonphaseGuid");
                let order = properties.len();
                properties.push(property_json(&guid, PROPERTY_MOONPHASE, "flag", "text", order));
                Some(guid)
            }
            None => None,
        };

        Ok(Self {
            date_property,
            type_arc,
            role_arc,
            role_storyline,
            type_character,
            role_character,
            type_location,
            role_location,
            type_item,
            role_item,
            property_desc,
            property_notes,
            property_moonphase,
            colors,
        })
    }

    /// Returns the color GUID for a named template color, or an empty
    /// string when the template does not define it.
    pub fn color(&self, name: &str) -> String {
        self.colors.get(name).cloned().unwrap_or_default()
    }

    /// Maps an entity type GUID to the world-entity kind it stores.
    pub fn entity_kind(&self, type_guid: &str) -> Option<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| self.type_guid(*kind) == type_guid)
    }

    /// Maps a relationship role GUID to the world-entity kind it links.
    pub fn role_kind(&self, role_guid: &str) -> Option<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| self.role_guid(*kind) == role_guid)
    }

    pub fn type_guid(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Character => &self.type_character,
            EntityKind::Location => &self.type_location,
            EntityKind::Item => &self.type_item,
        }
    }

    pub fn role_guid(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Character => &self.role_character,
            EntityKind::Location => &self.role_location,
            EntityKind::Item => &self.role_item,
        }
    }
}

fn array_mut<'a>(
    object: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Vec<Value>, TimelineError> {
    object
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| TimelineError::InvalidData(format!("template `{key}` is not a list")))
}

fn read_colors(template: &Map<String, Value>) -> HashMap<String, String> {
    template
        .get("colors")
        .and_then(Value::as_array)
        .map(|colors| {
            colors
                .iter()
                .filter_map(|color| Some((str_field(color, "name")?, str_field(color, "guid")?)))
                .map(|(name, guid)| (name.to_string(), guid.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn find_date_property(template: &Map<String, Value>) -> Option<String> {
    template
        .get("rangeProperties")?
        .as_array()?
        .iter()
        .filter(|property| str_field(property, "type") == Some("date"))
        .find(|property| {
            property
                .pointer("/calendar/eras")
                .and_then(Value::as_array)
                .is_some_and(|eras| eras.iter().any(|era| str_field(era, "name") == Some(ERA_AD)))
        })
        .and_then(|property| str_field(property, "guid"))
        .map(str::to_string)
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn find_named(list: &[Value], name: &str) -> Option<String> {
    list.iter()
        .find(|value| str_field(value, "name") == Some(name))
        .and_then(|value| str_field(value, "guid"))
        .map(str::to_string)
}

fn roles_mut(entity_type: &mut Value) -> Option<&mut Vec<Value>> {
    let object = entity_type.as_object_mut()?;
    object
        .entry("roles".to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
}

/// Returns the role GUID, appending the role to `entity_type` if missing.
fn ensure_role(entity_type: &mut Value, name: &str, seed: &str, icon: &str) -> String {
    let existing = entity_type
        .get("roles")
        .and_then(Value::as_array)
        .and_then(|roles| find_named(roles, name));
    if let Some(guid) = existing {
        return guid;
    }
    let guid = derive_id(seed);
    if let Some(roles) = roles_mut(entity_type) {
        roles.push(role_json(&guid, name, icon));
    }
    guid
}

fn ensure_arc_type(types: &mut Vec<Value>) -> (String, String, String) {
    let index = match types
        .iter()
        .position(|entity_type| str_field(entity_type, "name") == Some(TYPE_ARC))
    {
        Some(index) => index,
        None => {
            let order = types.len();
            types.push(type_json(
                &derive_id("typeArcGuid"),
                TYPE_ARC,
                "iconYellow",
                "book",
                true,
                order,
            ));
            order
        }
    };
    let arc_type = &mut types[index];
    let type_guid = str_field(arc_type, "guid").unwrap_or_default().to_string();
    let role_arc = ensure_role(arc_type, ROLE_ARC, "_roleArcGuid", "circle text");
    let role_storyline = ensure_role(
        arc_type,
        ROLE_STORYLINE,
        "_roleStorylineGuid",
        "circle filled text",
    );
    (type_guid, role_arc, role_storyline)
}

fn ensure_type(types: &mut Vec<Value>, wanted: &TypeSpec<'_>) -> (String, String) {
    let index = match types
        .iter()
        .position(|entity_type| str_field(entity_type, "name") == Some(wanted.name))
    {
        Some(index) => index,
        None => {
            let order = types.len();
            types.push(type_json(
                &derive_id(&format!("_type{}Guid", wanted.seed)),
                wanted.name,
                wanted.color,
                wanted.icon,
                wanted.persistent,
                order,
            ));
            order
        }
    };
    let entity_type = &mut types[index];
    let type_guid = str_field(entity_type, "guid").unwrap_or_default().to_string();
    let role = ensure_role(
        entity_type,
        wanted.role,
        &format!("_role{}Guid", wanted.seed),
        "circle text",
    );
    (type_guid, role)
}

fn type_json(guid: &str, name: &str, color: &str, icon: &str, persistent: bool, order: usize) -> Value {
    json!({
        "color": color,
        "guid": guid,
        "icon": icon,
        "name": name,
        "persistent": persistent,
        "roles": [],
        "sortOrder": order,
    })
}

fn role_json(guid: &str, name: &str, icon: &str) -> Value {
    json!({
        "allowsMultipleForEntity": true,
        "allowsMultipleForEvent": true,
        "allowsPercentAllocated": false,
        "guid": guid,
        "icon": icon,
        "mandatoryForEntity": false,
        "mandatoryForEvent": false,
        "name": name,
        "sortOrder": 0,
    })
}

fn property_json(guid: &str, name: &str, icon: &str, kind: &str, order: usize) -> Value {
    json!({
        "calcMode": "default",
        "calculate": false,
        "fadeEvents": false,
        "guid": guid,
        "icon": icon,
        "isMandatory": false,
        "name": name,
        "sortOrder": order,
        "type": kind,
    })
}

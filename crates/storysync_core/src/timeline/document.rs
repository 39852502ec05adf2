//! Retained timeline document.
//!
//! The JSON tree read from disk is kept verbatim; reading projects it onto a
//! `Graph`, writing folds a merged `Graph` back into it.

use crate::config::SyncConfig;
use crate::model::graph::Graph;
use crate::model::scene::{EntityKind, NodeId};
use crate::timeline::archive;
use crate::timeline::schema::TimelineSchema;
use crate::timeline::TimelineError;
use log::info;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Timeline document plus the bookkeeping needed to write it back.
#[derive(Debug, Clone)]
pub struct TimelineDocument {
    pub(crate) path: PathBuf,
    pub(crate) json: Value,
    pub(crate) config: SyncConfig,
    pub(crate) schema: TimelineSchema,
    /// Scene id → index into `json.events`.
    pub(crate) event_index: HashMap<NodeId, usize>,
    /// (kind, entity id) → entity GUID.
    pub(crate) entity_guids: HashMap<(EntityKind, NodeId), String>,
    /// Story arc name → arc entity GUID.
    pub(crate) arc_guids: HashMap<String, String>,
    pub(crate) narrative_guid: Option<String>,
    pub(crate) arc_count: usize,
    /// Latest narrative timestamp; undated events are placed after it.
    pub(crate) timestamp_max: i64,
    pub(crate) display_id_max: i64,
}

impl TimelineDocument {
    /// Opens the archive at `path` and projects it onto a graph.
    pub fn load(path: &Path, config: &SyncConfig) -> Result<(Self, Graph), TimelineError> {
        let json = archive::open_timeline(path)?;
        let (document, graph) = Self::from_json(path, json, config)?;
        info!(
            "event=timeline_loaded module=timeline status=ok path={} scenes={} characters={} locations={} items={}",
            path.display(),
            graph.scenes.len(),
            graph.characters.len(),
            graph.locations.len(),
            graph.items.len()
        );
        Ok((document, graph))
    }

    /// Builds the document from an already-parsed JSON tree.
    pub fn from_json(
        path: &Path,
        mut json: Value,
        config: &SyncConfig,
    ) -> Result<(Self, Graph), TimelineError> {
        let schema = TimelineSchema::bootstrap(&mut json, config)?;
        let mut document = Self {
            path: path.to_path_buf(),
            json,
            config: config.clone(),
            schema,
            event_index: HashMap::new(),
            entity_guids: HashMap::new(),
            arc_guids: HashMap::new(),
            narrative_guid: None,
            arc_count: 0,
            timestamp_max: 0,
            display_id_max: 0,
        };
        let graph = document.read_graph()?;
        Ok((document, graph))
    }

    /// Merges `graph` into the JSON tree and writes the archive.
    ///
    /// Returns the user-facing success message.
    pub fn save(&mut self, graph: &Graph) -> Result<String, TimelineError> {
        self.apply_graph(graph);
        archive::save_timeline(&self.json, &self.path)?;
        Ok(format!("\"{}\" written.", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current JSON tree, including any changes applied so far.
    pub fn json(&self) -> &Value {
        &self.json
    }

    pub fn schema(&self) -> &TimelineSchema {
        &self.schema
    }

    pub(crate) fn events(&self) -> &[Value] {
        self.json
            .get("events")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn entities(&self) -> &[Value] {
        self.json
            .get("entities")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Top-level list `key`, replaced by an empty list when absent or
    /// malformed.
    pub(crate) fn list_mut(&mut self, key: &str) -> Option<&mut Vec<Value>> {
        let slot = self
            .json
            .as_object_mut()?
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        slot.as_array_mut()
    }
}

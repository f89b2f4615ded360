//! `RowEnv`: the executor's per-row variable environment as it flows
//! through a query's clause pipeline. A node/edge variable is bound to the
//! same JSON shape the translator's expression compiler produces for it
//! (`json_object('id', ..., 'label'|'type', ..., 'properties', ...)`), so a
//! value captured here and one read back from SQL are interchangeable.
//!
//! Backed by a `Vec` rather than a `HashMap` so `RETURN *` can expand to
//! every currently bound variable, in insertion order, without a
//! side-channel ordering table.

use crate::value::PropertyValue;
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RowEnv(Vec<(String, PropertyValue)>);

impl RowEnv {
    pub fn new() -> Self {
        RowEnv(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        let key = key.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    pub fn to_hashmap(&self) -> HashMap<String, PropertyValue> {
        self.0.iter().cloned().collect()
    }
}

/// Build the JSON shape a node variable carries: `{id, label, properties}`.
pub fn node_value(id: &str, label: &Json, properties: &Json) -> PropertyValue {
    let mut map = Map::new();
    map.insert("id".to_string(), Json::String(id.to_string()));
    map.insert("label".to_string(), label.clone());
    map.insert("properties".to_string(), properties.clone());
    PropertyValue::Map(map)
}

/// Build the JSON shape an edge variable carries:
/// `{id, type, source_id, target_id, properties}`.
pub fn edge_value(id: &str, edge_type: &str, source_id: &str, target_id: &str, properties: &Json) -> PropertyValue {
    let mut map = Map::new();
    map.insert("id".to_string(), Json::String(id.to_string()));
    map.insert("type".to_string(), Json::String(edge_type.to_string()));
    map.insert("source_id".to_string(), Json::String(source_id.to_string()));
    map.insert("target_id".to_string(), Json::String(target_id.to_string()));
    map.insert("properties".to_string(), properties.clone());
    PropertyValue::Map(map)
}

/// Whether a bound value is a node (as opposed to an edge); distinguished by
/// the presence of `label` (nodes) vs `type` (edges) in the captured map,
/// matching the `nodes`/`edges` tables' own column shapes.
pub fn is_node(value: &PropertyValue) -> bool {
    matches!(value, PropertyValue::Map(m) if m.contains_key("label"))
}

pub fn id_of(value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::Map(m) => m.get("id").and_then(Json::as_str).map(str::to_string),
        _ => None,
    }
}

pub fn label_of(value: &PropertyValue) -> Option<Json> {
    match value {
        PropertyValue::Map(m) => m.get("label").cloned(),
        _ => None,
    }
}

pub fn properties_of(value: &PropertyValue) -> Option<Json> {
    match value {
        PropertyValue::Map(m) => m.get("properties").cloned(),
        _ => None,
    }
}

/// Table a captured node/edge value lives in, for `SET`/`DELETE` targeting.
pub fn table_of(value: &PropertyValue) -> &'static str {
    if is_node(value) {
        "nodes"
    } else {
        "edges"
    }
}

/// Cell values coming back from SQLite are JSON-encoded text for any column
/// built from `json_object`/`json_array`; decode once into a `serde_json::Value`
/// before wrapping in a [`PropertyValue`].
pub fn decode_cell(value: Json) -> Json {
    match value {
        Json::String(s) => serde_json::from_str(&s).unwrap_or(Json::String(s)),
        other => other,
    }
}

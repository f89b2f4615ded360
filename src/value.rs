//! [`PropertyValue`]: the resolved-value sum type that flows from parameter
//! bindings and literal expressions into JSON-encoded SQL bind parameters.
//!
//! Ordered property maps use `serde_json::Map`, which is backed by an
//! insertion-ordered map when `serde_json`'s `preserve_order` feature is on
//! (enabled in Cargo.toml) — this is what lets `keys(n)` and JSON round-trips
//! preserve the order a caller wrote properties in.

use serde_json::{Map, Value as Json};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    List(Vec<PropertyValue>),
    Map(Map<String, Json>),
}

impl PropertyValue {
    pub fn to_json(&self) -> Json {
        match self {
            PropertyValue::String(s) => Json::String(s.clone()),
            PropertyValue::Integer(i) => Json::Number((*i).into()),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            // Booleans are stored as 1/0 so they round-trip through JSON-encoded
            // TEXT columns the same way SQLite's own `json()` function would
            // coerce them; see the "mixed boolean/numeric comparisons" open
            // question carried from spec.md §9.
            PropertyValue::Boolean(b) => Json::Number((*b as i64).into()),
            PropertyValue::Null => Json::Null,
            PropertyValue::List(items) => Json::Array(items.iter().map(|v| v.to_json()).collect()),
            PropertyValue::Map(map) => Json::Object(map.clone()),
        }
    }

    /// Render as a SQL-bindable [`rusqlite::types::Value`]. Lists and maps are
    /// bound as their JSON text representation (callers wrap with `json(?)` in
    /// SQL when the destination column is a JSON blob).
    pub fn to_sql_value(&self) -> rusqlite::types::Value {
        use rusqlite::types::Value as SqlValue;
        match self {
            PropertyValue::String(s) => SqlValue::Text(s.clone()),
            PropertyValue::Integer(i) => SqlValue::Integer(*i),
            PropertyValue::Float(f) => SqlValue::Real(*f),
            PropertyValue::Boolean(b) => SqlValue::Integer(*b as i64),
            PropertyValue::Null => SqlValue::Null,
            PropertyValue::List(_) | PropertyValue::Map(_) => {
                SqlValue::Text(self.to_json().to_string())
            }
        }
    }

    pub fn from_json(value: &Json) -> Self {
        match value {
            Json::String(s) => PropertyValue::String(s.clone()),
            Json::Bool(b) => PropertyValue::Boolean(*b),
            Json::Null => PropertyValue::Null,
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PropertyValue::Integer(i)
                } else {
                    PropertyValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Json::Array(items) => {
                PropertyValue::List(items.iter().map(PropertyValue::from_json).collect())
            }
            Json::Object(map) => PropertyValue::Map(map.clone()),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, PropertyValue::List(_))
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl rusqlite::types::ToSql for PropertyValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::Owned(self.to_sql_value()))
    }
}

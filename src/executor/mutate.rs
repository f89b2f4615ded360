//! Procedural `CREATE`/`MERGE`/`SET`/`REMOVE`/`DELETE` execution against one
//! [`RowEnv`] at a time (spec.md §4.4.2/§4.4.3). Each helper evaluates its
//! Cypher expressions in-process via `eval.rs`, issues the matching
//! single-row template from `translator::write`, and patches the row's own
//! captured value so a later clause in the same query sees the write.

use crate::error::EngineError;
use crate::eval::{self, Env};
use crate::executor::rowenv::{self, RowEnv};
use crate::parser::ast::{EdgePattern, NodePattern, PatternPath, RemoveItem, SetOp};
use crate::storage::StorageHandle;
use crate::translator::write;
use crate::value::PropertyValue;
use serde_json::Map as JsonMap;
use serde_json::Value as Json;
use std::collections::HashMap;
use uuid::Uuid;

fn env_for(row: &RowEnv, params: &HashMap<String, PropertyValue>) -> Env<'_> {
    let mut env = Env::new(params);
    env.variables = row.to_hashmap();
    env
}

fn eval_property_map(
    map: &Option<crate::parser::ast::Expression>,
    row: &RowEnv,
    params: &HashMap<String, PropertyValue>,
) -> Result<JsonMap<String, Json>, EngineError> {
    match map {
        None => Ok(JsonMap::new()),
        Some(expr) => {
            let env = env_for(row, params);
            match eval::evaluate(expr, &env)? {
                PropertyValue::Map(m) => Ok(m),
                other => Err(EngineError::TypeError(format!(
                    "expected an object literal for a property map, got {}",
                    other
                ))),
            }
        }
    }
}

/// Create every node/edge named in a `CREATE` pattern against one row,
/// binding newly introduced variables into it.
pub fn create_pattern(
    storage: &dyn StorageHandle,
    pattern: &PatternPath,
    row: &mut RowEnv,
    params: &HashMap<String, PropertyValue>,
) -> Result<(), EngineError> {
    let start_value = create_node_if_needed(storage, &pattern.start, row, params)?;
    let mut prev_value = start_value;
    for (edge, node) in &pattern.hops {
        let node_value = create_node_if_needed(storage, node, row, params)?;
        let edge_value = create_edge(storage, edge, &prev_value, &node_value, row, params)?;
        let _ = edge_value;
        prev_value = node_value;
    }
    Ok(())
}

/// A node pattern in `CREATE` always creates a fresh node; if it reuses a
/// variable already bound by a preceding `MATCH`, return that bound value
/// unchanged instead (e.g. `MATCH (a) CREATE (a)-[:X]->(b)`).
fn create_node_if_needed(
    storage: &dyn StorageHandle,
    node: &NodePattern,
    row: &mut RowEnv,
    params: &HashMap<String, PropertyValue>,
) -> Result<PropertyValue, EngineError> {
    if let Some(name) = &node.variable {
        if let Some(existing) = row.get(name) {
            return Ok(existing.clone());
        }
    }
    let id = Uuid::new_v4().to_string();
    let properties = eval_property_map(&node.properties, row, params)?;
    let label_json = crate::translator::label::encode_labels(&node.labels);
    let stmt = write::insert_node(&id, &node.labels, &properties);
    storage.execute(&stmt.sql, &stmt.params)?;
    let value = rowenv::node_value(&id, &label_json, &Json::Object(properties));
    if let Some(name) = &node.variable {
        row.insert(name.clone(), value.clone());
    }
    Ok(value)
}

fn create_edge(
    storage: &dyn StorageHandle,
    edge: &EdgePattern,
    source: &PropertyValue,
    target: &PropertyValue,
    row: &mut RowEnv,
    params: &HashMap<String, PropertyValue>,
) -> Result<PropertyValue, EngineError> {
    let edge_type = edge.edge_type.clone().ok_or_else(|| {
        EngineError::UnsupportedFeature("CREATE requires a relationship type".to_string())
    })?;
    let (source_id, target_id) = match edge.direction {
        Some(crate::parser::ast::Direction::Left) => (
            rowenv::id_of(target).ok_or_else(missing_id)?,
            rowenv::id_of(source).ok_or_else(missing_id)?,
        ),
        _ => (
            rowenv::id_of(source).ok_or_else(missing_id)?,
            rowenv::id_of(target).ok_or_else(missing_id)?,
        ),
    };
    let id = Uuid::new_v4().to_string();
    let properties = eval_property_map(&edge.properties, row, params)?;
    let stmt = write::insert_edge(&id, &edge_type, &source_id, &target_id, &properties);
    storage.execute(&stmt.sql, &stmt.params)?;
    let value = rowenv::edge_value(&id, &edge_type, &source_id, &target_id, &Json::Object(properties));
    if let Some(name) = &edge.variable {
        row.insert(name.clone(), value.clone());
    }
    Ok(value)
}

fn missing_id() -> EngineError {
    EngineError::TypeError("relationship endpoint is not a bound node".to_string())
}

/// `MERGE (pattern) [ON CREATE SET ...] [ON MATCH SET ...]`. Only a single
/// node, or a single node-edge-node hop, is supported — `MERGE` across a
/// multi-hop path is rejected (spec.md §4.4.3's carried Non-goal).
pub fn merge_pattern(
    storage: &dyn StorageHandle,
    pattern: &PatternPath,
    on_create: &Option<Vec<SetOp>>,
    on_match: &Option<Vec<SetOp>>,
    row: &mut RowEnv,
    params: &HashMap<String, PropertyValue>,
) -> Result<(), EngineError> {
    match pattern.hops.len() {
        0 => {
            let (value, created) = merge_node(storage, &pattern.start, row, params)?;
            if let Some(name) = &pattern.start.variable {
                row.insert(name.clone(), value);
            }
            let set_ops = if created { on_create } else { on_match };
            if let Some(ops) = set_ops {
                for op in ops {
                    apply_set_op(storage, op, row, params)?;
                }
            }
            Ok(())
        }
        1 => {
            let (edge, end_node) = &pattern.hops[0];
            let (start_value, _) = merge_node(storage, &pattern.start, row, params)?;
            if let Some(name) = &pattern.start.variable {
                row.insert(name.clone(), start_value.clone());
            }
            let (end_value, _) = merge_node(storage, end_node, row, params)?;
            if let Some(name) = &end_node.variable {
                row.insert(name.clone(), end_value.clone());
            }
            let (edge_value, created) = merge_edge(storage, edge, &start_value, &end_value, row, params)?;
            if let Some(name) = &edge.variable {
                row.insert(name.clone(), edge_value);
            }
            let set_ops = if created { on_create } else { on_match };
            if let Some(ops) = set_ops {
                for op in ops {
                    apply_set_op(storage, op, row, params)?;
                }
            }
            Ok(())
        }
        _ => Err(EngineError::UnsupportedFeature(
            "MERGE on a multi-hop path is not supported".to_string(),
        )),
    }
}

fn merge_node(
    storage: &dyn StorageHandle,
    node: &NodePattern,
    row: &mut RowEnv,
    params: &HashMap<String, PropertyValue>,
) -> Result<(PropertyValue, bool), EngineError> {
    if let Some(name) = &node.variable {
        if let Some(existing) = row.get(name) {
            return Ok((existing.clone(), false));
        }
    }
    let properties = eval_property_map(&node.properties, row, params)?;
    let find = write::find_node_by_labels_and_properties(&node.labels, &properties);
    let result = storage.execute(&find.sql, &find.params)?;
    if let Some(found) = result.rows.into_iter().next() {
        let id = found["id"].as_str().unwrap_or_default().to_string();
        let label = rowenv::decode_cell(found["label"].clone());
        let props = rowenv::decode_cell(found["properties"].clone());
        return Ok((rowenv::node_value(&id, &label, &props), false));
    }
    let value = create_node_if_needed(storage, node, row, params)?;
    Ok((value, true))
}

fn merge_edge(
    storage: &dyn StorageHandle,
    edge: &EdgePattern,
    source: &PropertyValue,
    target: &PropertyValue,
    row: &mut RowEnv,
    params: &HashMap<String, PropertyValue>,
) -> Result<(PropertyValue, bool), EngineError> {
    let edge_type = edge.edge_type.clone().ok_or_else(|| {
        EngineError::UnsupportedFeature("MERGE requires a relationship type".to_string())
    })?;
    let source_id = rowenv::id_of(source).ok_or_else(missing_id)?;
    let target_id = rowenv::id_of(target).ok_or_else(missing_id)?;
    let find = write::find_edge(&edge_type, &source_id, &target_id);
    let result = storage.execute(&find.sql, &find.params)?;
    if let Some(found) = result.rows.into_iter().next() {
        let id = found["id"].as_str().unwrap_or_default().to_string();
        let props = rowenv::decode_cell(found["properties"].clone());
        return Ok((rowenv::edge_value(&id, &edge_type, &source_id, &target_id, &props), false));
    }
    let value = create_edge(storage, edge, source, target, row, params)?;
    Ok((value, true))
}

/// Apply one `SET` assignment, issuing the matching UPDATE and patching the
/// row's captured value so a later read in the same query sees the change.
pub fn apply_set_op(
    storage: &dyn StorageHandle,
    op: &SetOp,
    row: &mut RowEnv,
    params: &HashMap<String, PropertyValue>,
) -> Result<(), EngineError> {
    match op {
        SetOp::AssignProperty { variable, property, value } => {
            let bound = bound_value(row, variable)?;
            let id = rowenv::id_of(&bound).ok_or_else(missing_id)?;
            let table = rowenv::table_of(&bound);
            let env = env_for(row, params);
            let resolved = eval::evaluate(value, &env)?;
            let stmt = write::set_property(table, &id, property, &resolved);
            storage.execute(&stmt.sql, &stmt.params)?;
            patch_property(row, variable, property, resolved.to_json());
            Ok(())
        }
        SetOp::ReplaceProperties { variable, value } => {
            let bound = bound_value(row, variable)?;
            let id = rowenv::id_of(&bound).ok_or_else(missing_id)?;
            let table = rowenv::table_of(&bound);
            let properties = eval_property_map(&Some(value.clone()), row, params)?;
            let stmt = write::replace_properties(table, &id, &properties);
            storage.execute(&stmt.sql, &stmt.params)?;
            replace_properties(row, variable, Json::Object(properties));
            Ok(())
        }
        SetOp::MergeProperties { variable, value } => {
            let bound = bound_value(row, variable)?;
            let id = rowenv::id_of(&bound).ok_or_else(missing_id)?;
            let table = rowenv::table_of(&bound);
            let patch = eval_property_map(&Some(value.clone()), row, params)?;
            let stmt = write::merge_properties(table, &id, &patch);
            storage.execute(&stmt.sql, &stmt.params)?;
            for (key, value) in patch {
                patch_property(row, variable, &key, value);
            }
            Ok(())
        }
        SetOp::AddLabels { variable, labels } => {
            let bound = bound_value(row, variable)?;
            let id = rowenv::id_of(&bound).ok_or_else(missing_id)?;
            let existing = rowenv::label_of(&bound).unwrap_or(Json::Array(Vec::new()));
            let stmt = write::add_labels(&id, &existing, labels);
            storage.execute(&stmt.sql, &stmt.params)?;
            let merged = crate::translator::label::union_labels(&existing, labels);
            patch_label(row, variable, merged);
            Ok(())
        }
    }
}

pub fn apply_remove(
    storage: &dyn StorageHandle,
    item: &RemoveItem,
    row: &mut RowEnv,
) -> Result<(), EngineError> {
    match item {
        RemoveItem::Property { variable, property } => {
            let bound = bound_value(row, variable)?;
            let id = rowenv::id_of(&bound).ok_or_else(missing_id)?;
            let table = rowenv::table_of(&bound);
            let stmt = write::remove_property(table, &id, property);
            storage.execute(&stmt.sql, &stmt.params)?;
            patch_property(row, variable, property, Json::Null);
            Ok(())
        }
        RemoveItem::Label { variable, labels } => {
            let bound = bound_value(row, variable)?;
            let id = rowenv::id_of(&bound).ok_or_else(missing_id)?;
            let existing = rowenv::label_of(&bound).unwrap_or(Json::Array(Vec::new()));
            let stmt = write::remove_labels(&id, &existing, labels);
            storage.execute(&stmt.sql, &stmt.params)?;
            let remaining = match &existing {
                Json::Array(items) => Json::Array(
                    items
                        .iter()
                        .filter(|v| !v.as_str().map(|s| labels.iter().any(|l| l == s)).unwrap_or(false))
                        .cloned()
                        .collect(),
                ),
                other => other.clone(),
            };
            patch_label(row, variable, remaining);
            Ok(())
        }
    }
}

/// `DELETE`/`DETACH DELETE` a set of bound node/edge variables. Non-detach
/// deletion of a node with incident edges raises a `ConstraintViolation`
/// rather than orphaning edges (spec.md §4.4.3).
pub fn apply_delete(
    storage: &dyn StorageHandle,
    variables: &[crate::parser::ast::Expression],
    detach: bool,
    row: &mut RowEnv,
    params: &HashMap<String, PropertyValue>,
) -> Result<(), EngineError> {
    let env = env_for(row, params);
    let mut targets = Vec::with_capacity(variables.len());
    for expr in variables {
        targets.push(eval::evaluate(expr, &env)?);
    }
    for value in targets {
        let id = rowenv::id_of(&value).ok_or_else(missing_id)?;
        if rowenv::is_node(&value) {
            if detach {
                let stmt = write::detach_delete_edges_for_node(&id);
                storage.execute(&stmt.sql, &stmt.params)?;
            } else {
                let count_stmt = write::count_incident_edges(&id);
                let result = storage.execute(&count_stmt.sql, &count_stmt.params)?;
                let n = result.rows[0]["n"].as_i64().unwrap_or(0);
                if n > 0 {
                    return Err(EngineError::ConstraintViolation(format!(
                        "cannot delete node `{}` with {} incident edge(s) without DETACH",
                        id, n
                    )));
                }
            }
            let stmt = write::delete_node(&id);
            storage.execute(&stmt.sql, &stmt.params)?;
        } else {
            let stmt = write::delete_edge(&id);
            storage.execute(&stmt.sql, &stmt.params)?;
        }
    }
    Ok(())
}

fn bound_value(row: &RowEnv, variable: &str) -> Result<PropertyValue, EngineError> {
    row.get(variable)
        .cloned()
        .ok_or_else(|| EngineError::NameError(variable.to_string()))
}

fn patch_property(row: &mut RowEnv, variable: &str, property: &str, value: Json) {
    if let Some(PropertyValue::Map(mut map)) = row.get(variable).cloned() {
        if let Some(Json::Object(props)) = map.get_mut("properties") {
            props.insert(property.to_string(), value);
        }
        row.insert(variable.to_string(), PropertyValue::Map(map));
    }
}

fn replace_properties(row: &mut RowEnv, variable: &str, properties: Json) {
    if let Some(PropertyValue::Map(map)) = row.get(variable).cloned() {
        let mut map = map;
        map.insert("properties".to_string(), properties);
        row.insert(variable.to_string(), PropertyValue::Map(map));
    }
}

fn patch_label(row: &mut RowEnv, variable: &str, label: Json) {
    if let Some(PropertyValue::Map(map)) = row.get(variable).cloned() {
        let mut map = map;
        map.insert("label".to_string(), label);
        row.insert(variable.to_string(), PropertyValue::Map(map));
    }
}

//! Single-row SQL builders for `CREATE`, `SET`, `REMOVE`, `DELETE` and
//! `MERGE` (spec.md §4.4.2/§4.4.3). These are plain templates over already
//!-resolved values; the executor resolves Cypher expressions to
//! [`PropertyValue`]s via `eval.rs` before calling in here; the translator
//! module stays expression-agnostic for writes so the same template serves
//! every dispatch strategy.

use crate::translator::label;
use crate::translator::select::SqlStatement;
use crate::value::PropertyValue;
use serde_json::Map as JsonMap;
use serde_json::Value as Json;

pub fn insert_node(id: &str, labels: &[String], properties: &JsonMap<String, Json>) -> SqlStatement {
    SqlStatement {
        sql: "INSERT INTO nodes (id, label, properties) VALUES (?, ?, ?)".to_string(),
        params: vec![
            PropertyValue::String(id.to_string()),
            PropertyValue::from_json(&label::encode_labels(labels)),
            PropertyValue::from_json(&Json::Object(properties.clone())),
        ],
    }
}

pub fn insert_edge(
    id: &str,
    edge_type: &str,
    source_id: &str,
    target_id: &str,
    properties: &JsonMap<String, Json>,
) -> SqlStatement {
    SqlStatement {
        sql: "INSERT INTO edges (id, type, source_id, target_id, properties) VALUES (?, ?, ?, ?, ?)".to_string(),
        params: vec![
            PropertyValue::String(id.to_string()),
            PropertyValue::String(edge_type.to_string()),
            PropertyValue::String(source_id.to_string()),
            PropertyValue::String(target_id.to_string()),
            PropertyValue::from_json(&Json::Object(properties.clone())),
        ],
    }
}

/// `SET n.k = v`: a single-key merge via `json_set`. A `NULL` value removes
/// the key instead (spec.md §4.4.2) rather than storing a JSON null, so a
/// later `keys(n)` doesn't see a key that was just unset.
pub fn set_property(table: &str, id: &str, key: &str, value: &PropertyValue) -> SqlStatement {
    if matches!(value, PropertyValue::Null) {
        return remove_property(table, id, key);
    }
    // A list/map value is bound as JSON text; `json(?)` tells json_set to
    // splice it in as a JSON fragment rather than quote it as a string.
    let placeholder = match value {
        PropertyValue::List(_) | PropertyValue::Map(_) => "json(?)",
        _ => "?",
    };
    SqlStatement {
        sql: format!(
            "UPDATE {table} SET properties = json_set(properties, '$.{key}', {placeholder}) WHERE id = ?",
            table = table,
            key = key,
            placeholder = placeholder,
        ),
        params: vec![value.clone(), PropertyValue::String(id.to_string())],
    }
}

/// `SET n = {...}`: whole-object replacement.
pub fn replace_properties(table: &str, id: &str, properties: &JsonMap<String, Json>) -> SqlStatement {
    SqlStatement {
        sql: format!("UPDATE {} SET properties = ? WHERE id = ?", table),
        params: vec![
            PropertyValue::from_json(&Json::Object(properties.clone())),
            PropertyValue::String(id.to_string()),
        ],
    }
}

/// `SET n += {...}`: merge via `json_patch`.
pub fn merge_properties(table: &str, id: &str, properties: &JsonMap<String, Json>) -> SqlStatement {
    SqlStatement {
        sql: format!(
            "UPDATE {} SET properties = json_patch(properties, ?) WHERE id = ?",
            table
        ),
        params: vec![
            PropertyValue::from_json(&Json::Object(properties.clone())),
            PropertyValue::String(id.to_string()),
        ],
    }
}

/// `SET n:L1:L2`: union the new labels into the existing label array. The
/// caller supplies the node's current label value (read within the same
/// transaction) since sqlite's JSON1 functions can't express array-union.
pub fn add_labels(id: &str, existing: &Json, new_labels: &[String]) -> SqlStatement {
    let merged = label::union_labels(existing, new_labels);
    SqlStatement {
        sql: "UPDATE nodes SET label = ? WHERE id = ?".to_string(),
        params: vec![
            PropertyValue::from_json(&merged),
            PropertyValue::String(id.to_string()),
        ],
    }
}

pub fn remove_property(table: &str, id: &str, key: &str) -> SqlStatement {
    SqlStatement {
        sql: format!(
            "UPDATE {table} SET properties = json_remove(properties, '$.{key}') WHERE id = ?",
            table = table,
            key = key
        ),
        params: vec![PropertyValue::String(id.to_string())],
    }
}

pub fn remove_labels(id: &str, existing: &Json, labels_to_remove: &[String]) -> SqlStatement {
    let remaining: Vec<String> = match existing {
        Json::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .filter(|l| !labels_to_remove.contains(l))
            .collect(),
        Json::String(s) if !labels_to_remove.iter().any(|l| l == s) => vec![s.clone()],
        _ => Vec::new(),
    };
    SqlStatement {
        sql: "UPDATE nodes SET label = ? WHERE id = ?".to_string(),
        params: vec![
            PropertyValue::from_json(&label::encode_labels(&remaining)),
            PropertyValue::String(id.to_string()),
        ],
    }
}

pub fn delete_node(id: &str) -> SqlStatement {
    SqlStatement {
        sql: "DELETE FROM nodes WHERE id = ?".to_string(),
        params: vec![PropertyValue::String(id.to_string())],
    }
}

pub fn delete_edge(id: &str) -> SqlStatement {
    SqlStatement {
        sql: "DELETE FROM edges WHERE id = ?".to_string(),
        params: vec![PropertyValue::String(id.to_string())],
    }
}

pub fn detach_delete_edges_for_node(id: &str) -> SqlStatement {
    SqlStatement {
        sql: "DELETE FROM edges WHERE source_id = ? OR target_id = ?".to_string(),
        params: vec![
            PropertyValue::String(id.to_string()),
            PropertyValue::String(id.to_string()),
        ],
    }
}

/// Count incident edges, used by non-DETACH `DELETE` to raise a
/// `ConstraintViolation` rather than orphaning edges (spec.md §4.4.3).
pub fn count_incident_edges(id: &str) -> SqlStatement {
    SqlStatement {
        sql: "SELECT COUNT(*) AS n FROM edges WHERE source_id = ? OR target_id = ?".to_string(),
        params: vec![
            PropertyValue::String(id.to_string()),
            PropertyValue::String(id.to_string()),
        ],
    }
}

/// `MERGE` find-step: look up a node by label + exact property equality.
pub fn find_node_by_labels_and_properties(labels: &[String], properties: &JsonMap<String, Json>) -> SqlStatement {
    let mut sql = String::from("SELECT id, label, properties FROM nodes WHERE 1=1");
    let mut params = Vec::new();
    for label_name in labels {
        sql.push_str(" AND EXISTS (SELECT 1 FROM json_each(label) WHERE value = ?)");
        params.push(PropertyValue::String(label_name.clone()));
    }
    for (key, value) in properties {
        sql.push_str(&format!(" AND json_extract(properties, '$.{}') = ?", key));
        params.push(PropertyValue::from_json(value));
    }
    SqlStatement { sql, params }
}

/// `MERGE` find-step for a relationship: exact type + endpoint match.
pub fn find_edge(edge_type: &str, source_id: &str, target_id: &str) -> SqlStatement {
    SqlStatement {
        sql: "SELECT id, type, source_id, target_id, properties FROM edges WHERE type = ? AND source_id = ? AND target_id = ?".to_string(),
        params: vec![
            PropertyValue::String(edge_type.to_string()),
            PropertyValue::String(source_id.to_string()),
            PropertyValue::String(target_id.to_string()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, Json)]) -> JsonMap<String, Json> {
        let mut map = JsonMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        map
    }

    #[test]
    fn insert_node_binds_id_encoded_labels_and_properties_in_order() {
        let stmt = insert_node("n1", &["Person".to_string()], &props(&[("name", Json::String("Ada".to_string()))]));
        assert_eq!(stmt.sql, "INSERT INTO nodes (id, label, properties) VALUES (?, ?, ?)");
        assert_eq!(stmt.params[0], PropertyValue::String("n1".to_string()));
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn insert_edge_binds_all_five_columns_in_order() {
        let stmt = insert_edge("e1", "KNOWS", "n1", "n2", &JsonMap::new());
        assert_eq!(
            stmt.sql,
            "INSERT INTO edges (id, type, source_id, target_id, properties) VALUES (?, ?, ?, ?, ?)"
        );
        assert_eq!(stmt.params[0], PropertyValue::String("e1".to_string()));
        assert_eq!(stmt.params[1], PropertyValue::String("KNOWS".to_string()));
        assert_eq!(stmt.params[2], PropertyValue::String("n1".to_string()));
        assert_eq!(stmt.params[3], PropertyValue::String("n2".to_string()));
    }

    #[test]
    fn set_property_with_null_value_delegates_to_remove_property() {
        let stmt = set_property("nodes", "n1", "nickname", &PropertyValue::Null);
        assert_eq!(
            stmt.sql,
            "UPDATE nodes SET properties = json_remove(properties, '$.nickname') WHERE id = ?"
        );
        assert_eq!(stmt.params, vec![PropertyValue::String("n1".to_string())]);
    }

    #[test]
    fn set_property_with_scalar_value_uses_bare_placeholder() {
        let stmt = set_property("nodes", "n1", "age", &PropertyValue::Integer(30));
        assert_eq!(
            stmt.sql,
            "UPDATE nodes SET properties = json_set(properties, '$.age', ?) WHERE id = ?"
        );
        assert_eq!(stmt.params, vec![PropertyValue::Integer(30), PropertyValue::String("n1".to_string())]);
    }

    #[test]
    fn set_property_with_list_value_wraps_placeholder_in_json() {
        let value = PropertyValue::List(vec![PropertyValue::Integer(1)]);
        let stmt = set_property("nodes", "n1", "tags", &value);
        assert_eq!(
            stmt.sql,
            "UPDATE nodes SET properties = json_set(properties, '$.tags', json(?)) WHERE id = ?"
        );
    }

    #[test]
    fn replace_properties_overwrites_the_whole_column() {
        let stmt = replace_properties("nodes", "n1", &props(&[("a", Json::Bool(true))]));
        assert_eq!(stmt.sql, "UPDATE nodes SET properties = ? WHERE id = ?");
        assert_eq!(stmt.params[1], PropertyValue::String("n1".to_string()));
    }

    #[test]
    fn merge_properties_uses_json_patch() {
        let stmt = merge_properties("nodes", "n1", &props(&[("a", Json::Bool(true))]));
        assert_eq!(stmt.sql, "UPDATE nodes SET properties = json_patch(properties, ?) WHERE id = ?");
    }

    fn label_list(value: &PropertyValue) -> Vec<String> {
        match value {
            PropertyValue::List(items) => items
                .iter()
                .map(|v| match v {
                    PropertyValue::String(s) => s.clone(),
                    other => panic!("expected a string label, got {:?}", other),
                })
                .collect(),
            other => panic!("expected an encoded label list, got {:?}", other),
        }
    }

    #[test]
    fn add_labels_unions_and_dedupes_against_the_existing_label_value() {
        let existing = label::encode_labels(&["Person".to_string()]);
        let stmt = add_labels("n1", &existing, &["Person".to_string(), "Admin".to_string()]);
        assert_eq!(stmt.sql, "UPDATE nodes SET label = ? WHERE id = ?");
        assert_eq!(label_list(&stmt.params[0]), vec!["Person".to_string(), "Admin".to_string()]);
    }

    #[test]
    fn remove_labels_drops_only_the_named_labels() {
        let existing = Json::Array(vec![Json::String("Person".to_string()), Json::String("Admin".to_string())]);
        let stmt = remove_labels("n1", &existing, &["Admin".to_string()]);
        assert_eq!(stmt.sql, "UPDATE nodes SET label = ? WHERE id = ?");
        assert_eq!(label_list(&stmt.params[0]), vec!["Person".to_string()]);
    }

    #[test]
    fn remove_labels_on_single_string_label_value_falls_back_to_scalar_handling() {
        let existing = Json::String("Person".to_string());
        let stmt = remove_labels("n1", &existing, &["Admin".to_string()]);
        assert_eq!(label_list(&stmt.params[0]), vec!["Person".to_string()]);
    }

    #[test]
    fn delete_node_and_delete_edge_bind_a_single_id() {
        assert_eq!(delete_node("n1").sql, "DELETE FROM nodes WHERE id = ?");
        assert_eq!(delete_edge("e1").sql, "DELETE FROM edges WHERE id = ?");
    }

    #[test]
    fn detach_delete_edges_for_node_matches_either_endpoint() {
        let stmt = detach_delete_edges_for_node("n1");
        assert_eq!(stmt.sql, "DELETE FROM edges WHERE source_id = ? OR target_id = ?");
        assert_eq!(stmt.params.len(), 2);
        assert_eq!(stmt.params[0], stmt.params[1]);
    }

    #[test]
    fn count_incident_edges_matches_either_endpoint() {
        let stmt = count_incident_edges("n1");
        assert_eq!(stmt.sql, "SELECT COUNT(*) AS n FROM edges WHERE source_id = ? OR target_id = ?");
    }

    #[test]
    fn find_node_by_labels_and_properties_appends_one_exists_clause_per_label_and_one_equality_per_property() {
        let stmt = find_node_by_labels_and_properties(
            &["Person".to_string(), "Admin".to_string()],
            &props(&[("age", Json::from(30))]),
        );
        assert_eq!(
            stmt.sql,
            "SELECT id, label, properties FROM nodes WHERE 1=1 AND EXISTS (SELECT 1 FROM json_each(label) WHERE value = ?) AND EXISTS (SELECT 1 FROM json_each(label) WHERE value = ?) AND json_extract(properties, '$.age') = ?"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn find_node_by_labels_and_properties_with_nothing_to_match_is_a_bare_select() {
        let stmt = find_node_by_labels_and_properties(&[], &JsonMap::new());
        assert_eq!(stmt.sql, "SELECT id, label, properties FROM nodes WHERE 1=1");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn find_edge_matches_type_and_both_endpoints_in_order() {
        let stmt = find_edge("KNOWS", "n1", "n2");
        assert_eq!(
            stmt.sql,
            "SELECT id, type, source_id, target_id, properties FROM edges WHERE type = ? AND source_id = ? AND target_id = ?"
        );
        assert_eq!(
            stmt.params,
            vec![
                PropertyValue::String("KNOWS".to_string()),
                PropertyValue::String("n1".to_string()),
                PropertyValue::String("n2".to_string()),
            ]
        );
    }
}

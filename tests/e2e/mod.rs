//! Broader full-pipeline scenarios not already covered by `tests/integration`:
//! variable-length paths, multi-label matching, `CALL` procedures, `UNION`
//! dedup semantics, `OPTIONAL MATCH` and empty-list `IN` behavior.

use cypher_relay::value::PropertyValue;
use cypher_relay::{Engine, EngineConfig, QueryResponse, SqliteStorage};
use std::collections::HashMap;

fn engine() -> Engine<SqliteStorage> {
    let storage = SqliteStorage::open_in_memory().expect("open in-memory sqlite");
    Engine::new(storage, EngineConfig::default())
}

fn run(engine: &Engine<SqliteStorage>, query: &str) -> QueryResponse {
    engine.execute(query, HashMap::new())
}

fn expect_rows(response: QueryResponse) -> Vec<serde_json::Map<String, serde_json::Value>> {
    match response {
        QueryResponse::Success { data, .. } => data,
        QueryResponse::Failure { error } => panic!("expected success, got error: {:?}", error),
    }
}

fn expect_failure(response: QueryResponse) -> cypher_relay::QueryError {
    match response {
        QueryResponse::Success { data, .. } => panic!("expected failure, got rows: {:?}", data),
        QueryResponse::Failure { error } => error,
    }
}

/// Build a chain A -> B -> C -> D of `:KNOWS` edges.
fn seed_chain(engine: &Engine<SqliteStorage>) {
    run(
        engine,
        "CREATE (a:Person {name: 'A'})-[:KNOWS]->(b:Person {name: 'B'})\
         -[:KNOWS]->(c:Person {name: 'C'})-[:KNOWS]->(d:Person {name: 'D'})",
    );
}

#[test]
fn variable_length_path_respects_hop_bounds() {
    let engine = engine();
    seed_chain(&engine);

    let within_two =
        expect_rows(run(&engine, "MATCH (a:Person {name: 'A'})-[:KNOWS*1..2]->(x) RETURN x.name AS name ORDER BY name"));
    let names: Vec<&str> = within_two.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["B", "C"], "*1..2 should reach B and C but not D");

    let all_reachable =
        expect_rows(run(&engine, "MATCH (a:Person {name: 'A'})-[:KNOWS*]->(x) RETURN x.name AS name ORDER BY name"));
    let names: Vec<&str> = all_reachable.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["B", "C", "D"], "unbounded * falls back to the configured default max hops");
}

#[test]
fn multi_label_node_matches_either_label() {
    let engine = engine();
    run(&engine, "CREATE (n:Person:Employee {name: 'Ada'})");
    run(&engine, "CREATE (n:Person {name: 'Grace'})");

    let as_person = expect_rows(run(&engine, "MATCH (n:Person) RETURN n.name AS name ORDER BY name"));
    assert_eq!(as_person.len(), 2);

    let as_employee = expect_rows(run(&engine, "MATCH (n:Employee) RETURN n.name AS name"));
    assert_eq!(as_employee.len(), 1);
    assert_eq!(as_employee[0]["name"], serde_json::json!("Ada"));

    let labels = expect_rows(run(&engine, "MATCH (n:Person {name: 'Ada'}) RETURN labels(n) AS labels"));
    let labels = labels[0]["labels"].as_array().unwrap();
    assert!(labels.contains(&serde_json::json!("Person")));
    assert!(labels.contains(&serde_json::json!("Employee")));
}

#[test]
fn call_db_labels_lists_distinct_labels() {
    let engine = engine();
    run(&engine, "CREATE (n:Person {name: 'Ada'})");
    run(&engine, "CREATE (n:City {name: 'Austin'})");
    run(&engine, "CREATE (n:Person {name: 'Grace'})");

    let rows = expect_rows(run(&engine, "CALL db.labels() YIELD label RETURN label ORDER BY label"));
    let labels: Vec<&str> = rows.iter().map(|r| r["label"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["City", "Person"]);
}

#[test]
fn call_db_relationship_types_with_where_filters_result() {
    let engine = engine();
    run(&engine, "CREATE (a:Person {name: 'A'})-[:KNOWS]->(b:Person {name: 'B'})");
    run(&engine, "CREATE (a:Person {name: 'A'})-[:WORKS_WITH]->(b:Person {name: 'B'})");

    let rows = expect_rows(run(
        &engine,
        "CALL db.relationshipTypes() YIELD type WHERE type = 'KNOWS' RETURN type",
    ));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], serde_json::json!("KNOWS"));
}

#[test]
fn call_unknown_procedure_is_rejected() {
    let engine = engine();
    let error = expect_failure(run(&engine, "CALL db.indexes() YIELD name RETURN name"));
    assert!(error.message.contains("db.indexes"), "unexpected message: {}", error.message);
}

#[test]
fn union_deduplicates_but_union_all_does_not() {
    let engine = engine();
    run(&engine, "CREATE (n:Person {name: 'Ada'})");
    run(&engine, "CREATE (n:Person {name: 'Grace'})");

    let unioned = expect_rows(run(
        &engine,
        "MATCH (n:Person {name: 'Ada'}) RETURN n.name AS name \
         UNION \
         MATCH (n:Person {name: 'Ada'}) RETURN n.name AS name",
    ));
    assert_eq!(unioned.len(), 1, "UNION must drop the duplicate row");

    let unioned_all = expect_rows(run(
        &engine,
        "MATCH (n:Person {name: 'Ada'}) RETURN n.name AS name \
         UNION ALL \
         MATCH (n:Person {name: 'Ada'}) RETURN n.name AS name",
    ));
    assert_eq!(unioned_all.len(), 2, "UNION ALL must keep both rows");
}

#[test]
fn optional_match_keeps_row_with_nulls_when_no_match() {
    let engine = engine();
    run(&engine, "CREATE (a:Person {name: 'A'})");
    run(&engine, "CREATE (b:Person {name: 'B'})-[:KNOWS]->(c:Person {name: 'C'})");

    let rows = expect_rows(run(
        &engine,
        "MATCH (n:Person) OPTIONAL MATCH (n)-[:KNOWS]->(friend) \
         RETURN n.name AS name, friend.name AS friend ORDER BY name",
    ));
    assert_eq!(rows.len(), 2, "OPTIONAL MATCH must not eliminate the unmatched row");
    assert_eq!(rows[0]["name"], serde_json::json!("A"));
    assert_eq!(rows[0]["friend"], serde_json::json!(null));
    assert_eq!(rows[1]["name"], serde_json::json!("B"));
    assert_eq!(rows[1]["friend"], serde_json::json!("C"));
}

#[test]
fn in_empty_list_is_always_false() {
    let engine = engine();
    run(&engine, "CREATE (n:Person {name: 'Ada'})");
    let rows = expect_rows(run(&engine, "MATCH (n:Person) WHERE n.name IN [] RETURN n.name AS name"));
    assert_eq!(rows.len(), 0, "membership in an empty list is never true");
}

#[test]
fn in_list_matches_bound_parameter() {
    let engine = engine();
    run(&engine, "CREATE (n:Person {name: 'Ada'})");
    run(&engine, "CREATE (n:Person {name: 'Grace'})");
    run(&engine, "CREATE (n:Person {name: 'Linus'})");

    let mut params = HashMap::new();
    params.insert(
        "names".to_string(),
        PropertyValue::List(vec![
            PropertyValue::String("Ada".to_string()),
            PropertyValue::String("Grace".to_string()),
        ]),
    );
    let rows = expect_rows(engine.execute(
        "MATCH (n:Person) WHERE n.name IN $names RETURN n.name AS name ORDER BY name",
        params,
    ));
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Ada", "Grace"]);
}

#[test]
fn unwind_merge_creates_one_node_per_distinct_item_and_reuses_existing() {
    let engine = engine();
    run(&engine, "CREATE (n:Tag {name: 'rust'})");
    run(
        &engine,
        "UNWIND ['rust', 'graphs', 'rust'] AS tag MERGE (n:Tag {name: tag})",
    );
    let rows = expect_rows(run(&engine, "MATCH (n:Tag) RETURN n.name AS name ORDER BY name"));
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["graphs", "rust"], "MERGE must not duplicate the already-existing or repeated tag");
}

#[test]
fn list_comprehension_filters_and_maps_a_collected_list() {
    let engine = engine();
    run(&engine, "UNWIND range(1, 5) AS i CREATE (n:Num {value: i})");

    let rows = expect_rows(run(
        &engine,
        "MATCH (n:Num) WITH collect(n.value) AS values \
         RETURN [x IN values WHERE x > 2 | x * 10] AS tripled",
    ));
    let tripled: Vec<i64> = rows[0]["tripled"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    assert_eq!(tripled, vec![30, 40, 50]);
}

#[test]
fn list_predicates_quantify_over_a_collected_list() {
    let engine = engine();
    run(&engine, "UNWIND range(1, 4) AS i CREATE (n:Num {value: i})");

    let rows = expect_rows(run(
        &engine,
        "MATCH (n:Num) WITH collect(n.value) AS values \
         RETURN ANY(x IN values WHERE x = 3) AS has_three, \
                ALL(x IN values WHERE x > 0) AS all_positive, \
                NONE(x IN values WHERE x > 10) AS none_over_ten, \
                SINGLE(x IN values WHERE x = 2) AS exactly_one_two",
    ));
    assert_eq!(rows[0]["has_three"], serde_json::json!(true));
    assert_eq!(rows[0]["all_positive"], serde_json::json!(true));
    assert_eq!(rows[0]["none_over_ten"], serde_json::json!(true));
    assert_eq!(rows[0]["exactly_one_two"], serde_json::json!(true));
}

#[test]
fn with_collect_then_unwind_round_trips_a_list() {
    let engine = engine();
    run(&engine, "UNWIND range(1, 3) AS i CREATE (n:Num {value: i})");

    let rows = expect_rows(run(
        &engine,
        "MATCH (n:Num) WITH collect(n.value) AS values UNWIND values AS v RETURN v ORDER BY v",
    ));
    let values: Vec<i64> = rows.iter().map(|r| r["v"].as_i64().unwrap()).collect();
    assert_eq!(values, vec![1, 2, 3]);
}

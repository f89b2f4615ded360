//! Integration tests against the full `Engine` pipeline (parse → translate/
//! execute → result), backed by an in-memory SQLite database per test.

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

#[test]
fn create_then_match_round_trips() {
    let engine = engine();
    let created = run(&engine, "CREATE (n:Person {name: 'Ada', age: 36}) RETURN n");
    let rows = expect_rows(created);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["n"]["label"], serde_json::json!("Person"));
    assert_eq!(rows[0]["n"]["properties"]["name"], serde_json::json!("Ada"));

    let found = run(&engine, "MATCH (n:Person) WHERE n.name = 'Ada' RETURN n.age AS age");
    let rows = expect_rows(found);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["age"], serde_json::json!(36));
}

#[test]
fn merge_is_idempotent_across_three_runs() {
    let engine = engine();
    for _ in 0..3 {
        run(&engine, "MERGE (n:City {name: 'Austin'})");
    }
    let rows = expect_rows(run(&engine, "MATCH (n:City) RETURN count(n) AS n"));
    assert_eq!(rows[0]["n"], serde_json::json!(1));
}

#[test]
fn merge_runs_on_create_set_only_once() {
    let engine = engine();
    run(&engine, "MERGE (n:Counter {key: 'x'}) ON CREATE SET n.hits = 1 ON MATCH SET n.hits = n.hits + 1");
    run(&engine, "MERGE (n:Counter {key: 'x'}) ON CREATE SET n.hits = 1 ON MATCH SET n.hits = n.hits + 1");
    run(&engine, "MERGE (n:Counter {key: 'x'}) ON CREATE SET n.hits = 1 ON MATCH SET n.hits = n.hits + 1");
    let rows = expect_rows(run(&engine, "MATCH (n:Counter) RETURN n.hits AS hits"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["hits"], serde_json::json!(3));
}

#[test]
fn unwind_create_produces_one_node_per_item() {
    let engine = engine();
    run(&engine, "UNWIND ['A', 'B', 'C'] AS name CREATE (n:Letter {name: name})");
    let rows = expect_rows(run(&engine, "MATCH (n:Letter) RETURN n.name AS name ORDER BY name"));
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn detach_delete_removes_incident_edges() {
    let engine = engine();
    run(&engine, "CREATE (a:Person {name: 'A'})-[:KNOWS]->(b:Person {name: 'B'})");
    let before = expect_rows(run(&engine, "MATCH (e) RETURN count(e) AS n"));
    let _ = before;
    run(&engine, "MATCH (a:Person {name: 'A'}) DETACH DELETE a");
    let nodes = expect_rows(run(&engine, "MATCH (n:Person) RETURN count(n) AS n"));
    assert_eq!(nodes[0]["n"], serde_json::json!(1));
}

#[test]
fn delete_without_detach_on_connected_node_is_rejected() {
    let engine = engine();
    run(&engine, "CREATE (a:Person {name: 'A'})-[:KNOWS]->(b:Person {name: 'B'})");
    let response = run(&engine, "MATCH (a:Person {name: 'A'}) DELETE a");
    let error = expect_failure(response);
    assert!(error.message.contains("incident edge"), "unexpected message: {}", error.message);

    let nodes = expect_rows(run(&engine, "MATCH (n:Person) RETURN count(n) AS n"));
    assert_eq!(nodes[0]["n"], serde_json::json!(2), "rejected delete must not partially apply");
}

#[test]
fn set_and_remove_mutate_properties_in_place() {
    let engine = engine();
    run(&engine, "CREATE (n:Person {name: 'Ada', age: 30})");
    run(&engine, "MATCH (n:Person {name: 'Ada'}) SET n.age = 31");
    let rows = expect_rows(run(&engine, "MATCH (n:Person {name: 'Ada'}) RETURN n.age AS age"));
    assert_eq!(rows[0]["age"], serde_json::json!(31));

    run(&engine, "MATCH (n:Person {name: 'Ada'}) REMOVE n.age");
    let rows = expect_rows(run(&engine, "MATCH (n:Person {name: 'Ada'}) RETURN n.age AS age"));
    assert_eq!(rows[0]["age"], serde_json::json!(null));
}

#[test]
fn add_and_remove_labels() {
    let engine = engine();
    run(&engine, "CREATE (n:Person {name: 'Ada'})");
    run(&engine, "MATCH (n:Person) SET n:Scientist");
    let rows = expect_rows(run(&engine, "MATCH (n:Person) RETURN labels(n) AS labels"));
    let labels = rows[0]["labels"].as_array().unwrap();
    assert!(labels.contains(&serde_json::json!("Person")));
    assert!(labels.contains(&serde_json::json!("Scientist")));

    run(&engine, "MATCH (n:Person) REMOVE n:Scientist");
    let rows = expect_rows(run(&engine, "MATCH (n) RETURN n.name AS name"));
    let found = run(&engine, "MATCH (n:Scientist) RETURN n");
    assert_eq!(expect_rows(found).len(), 0);
    assert_eq!(rows.len(), 1);
}

#[test]
fn with_aggregate_counts_rows() {
    let engine = engine();
    run(&engine, "UNWIND range(1, 5) AS i CREATE (n:Num {value: i})");
    let rows = expect_rows(run(&engine, "MATCH (n:Num) WITH count(n) AS total RETURN total"));
    assert_eq!(rows[0]["total"], serde_json::json!(5));
}

#[test]
fn query_parameters_bind_into_create_and_match() {
    let engine = engine();
    let mut params = HashMap::new();
    params.insert("name".to_string(), PropertyValue::String("Grace".to_string()));
    engine.execute("CREATE (n:Person {name: $name})", params.clone());
    let rows = expect_rows(engine.execute("MATCH (n:Person {name: $name}) RETURN n.name AS name", params));
    assert_eq!(rows[0]["name"], serde_json::json!("Grace"));
}

#[test]
fn write_failure_rolls_back_whole_statement() {
    let engine = engine();
    run(&engine, "CREATE (a:Person {name: 'A'})-[:KNOWS]->(b:Person {name: 'B'})");
    // The SET runs before the rejected DELETE in the same statement; since
    // both run inside one transaction, the SET must not survive either.
    let response = run(
        &engine,
        "MATCH (a:Person {name: 'A'}), (b:Person {name: 'B'}) SET a.flagged = true DELETE b",
    );
    expect_failure(response);
    let rows = expect_rows(run(&engine, "MATCH (a:Person {name: 'A'}) RETURN a.flagged AS flagged"));
    assert_eq!(rows[0]["flagged"], serde_json::json!(null), "SET before a rejected DELETE must roll back");
    let nodes = expect_rows(run(&engine, "MATCH (n:Person) RETURN count(n) AS n"));
    assert_eq!(nodes[0]["n"], serde_json::json!(2));
}

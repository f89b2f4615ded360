//! The storage contract the executor is built against (spec.md §6.1).
//!
//! `StorageHandle` is deliberately narrow: `execute` runs one parameterized
//! statement and hands back an ordered row set plus a change count;
//! `transaction` runs a closure atomically, rolling back on any error. The
//! executor never opens a nested transaction — `MERGE`, multi-phase, and
//! `UNWIND` loops all share the one transaction `Engine::execute` opens.
//!
//! `SqliteStorage` is the concrete binding: a `rusqlite::Connection` against
//! the bundled SQLite, with the `nodes`/`edges` schema from spec.md §3.1
//! created on open if missing.

use crate::error::EngineError;
use crate::value::PropertyValue;
use rusqlite::Connection;
use serde_json::{Map, Value as Json};

/// One result row: an insertion-ordered mapping from column name to cell
/// value. Backed by `serde_json::Map`, which preserves insertion order with
/// the `preserve_order` feature (enabled in Cargo.toml).
pub type OrderedRow = Map<String, Json>;

pub struct StatementResult {
    pub rows: Vec<OrderedRow>,
    pub changes: i64,
}

pub trait StorageHandle {
    fn execute(&self, sql: &str, params: &[PropertyValue]) -> Result<StatementResult, EngineError>;

    /// Run `body` atomically. Any `Err` returned by `body` rolls back the
    /// transaction before propagating.
    fn transaction<F, T>(&self, body: F) -> Result<T, EngineError>
    where
        F: FnOnce(&dyn StorageHandle) -> Result<T, EngineError>;
}

pub struct SqliteStorage {
    conn: Connection,
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    properties TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS edges (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    source_id TEXT NOT NULL REFERENCES nodes(id),
    target_id TEXT NOT NULL REFERENCES nodes(id),
    properties TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
";

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, EngineError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(SqliteStorage { conn })
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(SqliteStorage { conn })
    }

    fn exec_raw(&self, sql: &str) -> Result<(), EngineError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

impl StorageHandle for SqliteStorage {
    fn execute(&self, sql: &str, params: &[PropertyValue]) -> Result<StatementResult, EngineError> {
        log::debug!("sql: {} params: {:?}", sql, params);
        let mut stmt = self.conn.prepare(sql)?;
        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let bind: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p as &dyn rusqlite::types::ToSql).collect();

        if column_names.is_empty() {
            let changes = stmt.execute(bind.as_slice())?;
            return Ok(StatementResult {
                rows: Vec::new(),
                changes: changes as i64,
            });
        }

        let mut rows_out = Vec::new();
        let mut rows = stmt.query(bind.as_slice())?;
        while let Some(row) = rows.next()? {
            let mut map = Map::new();
            for (idx, name) in column_names.iter().enumerate() {
                let value: rusqlite::types::Value = row.get(idx)?;
                map.insert(name.clone(), sql_value_to_json(value));
            }
            rows_out.push(map);
        }
        let changes = self.conn.changes() as i64;
        Ok(StatementResult {
            rows: rows_out,
            changes,
        })
    }

    fn transaction<F, T>(&self, body: F) -> Result<T, EngineError>
    where
        F: FnOnce(&dyn StorageHandle) -> Result<T, EngineError>,
    {
        self.exec_raw("BEGIN")?;
        match body(self) {
            Ok(value) => {
                self.exec_raw("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.exec_raw("ROLLBACK");
                Err(err)
            }
        }
    }
}

fn sql_value_to_json(value: rusqlite::types::Value) -> Json {
    use rusqlite::types::Value as V;
    match value {
        V::Null => Json::Null,
        V::Integer(i) => Json::Number(i.into()),
        V::Real(f) => serde_json::Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null),
        V::Text(s) => Json::String(s),
        V::Blob(b) => Json::String(String::from_utf8_lossy(&b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_on_open() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let result = storage
            .execute("SELECT COUNT(*) AS n FROM nodes", &[])
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["n"], Json::Number(0.into()));
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let outcome: Result<(), EngineError> = storage.transaction(|s| {
            s.execute(
                "INSERT INTO nodes (id, label, properties) VALUES ('a', '[]', '{}')",
                &[],
            )?;
            Err(EngineError::TypeError("boom".to_string()))
        });
        assert!(outcome.is_err());
        let count = storage.execute("SELECT COUNT(*) AS n FROM nodes", &[]).unwrap();
        assert_eq!(count.rows[0]["n"], Json::Number(0.into()));
    }
}

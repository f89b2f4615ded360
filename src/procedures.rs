//! The two hard-coded `CALL` procedures spec.md §4.3.9 requires:
//! `db.labels()` and `db.relationshipTypes()`. Each compiles to a fixed SQL
//! statement with no parameters; `YIELD` renames the projected column and
//! an attached `WHERE` is compiled against that name only.

use crate::error::EngineError;

pub struct ProcedureQuery {
    pub sql: String,
    pub default_column: &'static str,
}

pub fn resolve(procedure: &str) -> Result<ProcedureQuery, EngineError> {
    match procedure {
        "db.labels" => Ok(ProcedureQuery {
            sql: "SELECT DISTINCT json_each.value AS label FROM nodes, json_each(nodes.label) \
                  WHERE json_each.value IS NOT NULL AND json_each.value <> ''"
                .to_string(),
            default_column: "label",
        }),
        "db.relationshipTypes" => Ok(ProcedureQuery {
            sql: "SELECT DISTINCT type FROM edges WHERE type IS NOT NULL AND type <> ''".to_string(),
            default_column: "type",
        }),
        other => Err(EngineError::UnsupportedFeature(format!(
            "unknown procedure `{}`",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_procedure_rejected() {
        assert!(resolve("db.indexes").is_err());
    }

    #[test]
    fn labels_and_types_resolve() {
        assert!(resolve("db.labels").is_ok());
        assert!(resolve("db.relationshipTypes").is_ok());
    }
}

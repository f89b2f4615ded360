//! Per-query translator state. One named field per concern rather than a bag
//! of optionals — see SPEC_FULL.md §9 / DESIGN.md for the rationale.

use crate::parser::ast::{Direction, Expression};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Node,
    Edge,
    Path,
}

#[derive(Debug, Clone)]
pub struct BoundVariable {
    pub kind: VariableKind,
    pub alias: String,
}

/// Per-alias pattern metadata: label/property filters and whether the
/// occurrence came from an OPTIONAL MATCH (so its filters belong in the ON
/// clause, not WHERE).
#[derive(Debug, Clone, Default)]
pub struct AliasInfo {
    pub labels: Vec<String>,
    pub property_filters: Vec<(String, Expression)>,
    pub optional: bool,
    pub edge_type: Option<String>,
}

/// A single registered edge hop between two node aliases, in pattern order.
#[derive(Debug, Clone)]
pub struct PendingRelationship {
    pub from_alias: String,
    pub edge_alias: String,
    pub to_alias: String,
    pub edge_type: Option<String>,
    pub direction: Direction,
    pub optional: bool,
    pub min_hops: Option<u32>,
    pub max_hops: Option<u32>,
    pub is_variable_length: bool,
}

/// A bound path variable (`p = (a)-[*1..3]->(b)`), recording the CTE that
/// backs it so `length(p)` and `nodes(p)` can reference it later.
#[derive(Debug, Clone)]
pub struct PathExpression {
    pub path_variable: String,
    pub cte_name: String,
    pub start_alias: String,
    pub end_alias: String,
    pub edge_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UnwindBinding {
    pub alias: String,
    pub list_sql: String,
    pub list_params: Vec<crate::value::PropertyValue>,
}

#[derive(Debug, Clone)]
pub struct CallBinding {
    pub procedure: String,
    pub yielded_column: String,
}

#[derive(Default)]
pub struct TranslatorContext {
    alias_counter: usize,
    pub variables: HashMap<String, BoundVariable>,
    pub alias_info: HashMap<String, AliasInfo>,
    pub relationships: Vec<PendingRelationship>,
    pub path_expressions: Vec<PathExpression>,
    pub unwind_clauses: Vec<UnwindBinding>,
    pub with_aliases: HashMap<String, Expression>,
    pub call_binding: Option<CallBinding>,
}

impl TranslatorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve (or allocate) the SQL alias for a Cypher variable. Reused
    /// occurrences of the same variable resolve to the same alias so shared
    /// variables generate a single table reference (spec.md §4.3.1).
    pub fn resolve_or_bind(&mut self, name: Option<&str>, kind: VariableKind) -> String {
        if let Some(name) = name {
            if let Some(bound) = self.variables.get(name) {
                return bound.alias.clone();
            }
        }
        let prefix = match kind {
            VariableKind::Node => "n",
            VariableKind::Edge => "e",
            VariableKind::Path => "p",
        };
        let alias = format!("{}{}", prefix, self.alias_counter);
        self.alias_counter += 1;
        if let Some(name) = name {
            self.variables.insert(
                name.to_string(),
                BoundVariable {
                    kind,
                    alias: alias.clone(),
                },
            );
        }
        alias
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn next_cte_name(&mut self) -> String {
        let name = format!("path_{}", self.alias_counter);
        self.alias_counter += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_variable_resolves_to_same_alias() {
        let mut ctx = TranslatorContext::new();
        let a1 = ctx.resolve_or_bind(Some("n"), VariableKind::Node);
        let a2 = ctx.resolve_or_bind(Some("n"), VariableKind::Node);
        assert_eq!(a1, a2);
        assert!(ctx.is_bound("n"));
    }

    #[test]
    fn distinct_variables_get_distinct_aliases() {
        let mut ctx = TranslatorContext::new();
        let a = ctx.resolve_or_bind(Some("a"), VariableKind::Node);
        let b = ctx.resolve_or_bind(Some("b"), VariableKind::Node);
        assert_ne!(a, b);
    }

    #[test]
    fn alias_prefix_matches_variable_kind() {
        let mut ctx = TranslatorContext::new();
        let node = ctx.resolve_or_bind(Some("n"), VariableKind::Node);
        let edge = ctx.resolve_or_bind(Some("e"), VariableKind::Edge);
        let path = ctx.resolve_or_bind(Some("p"), VariableKind::Path);
        assert!(node.starts_with('n'));
        assert!(edge.starts_with('e'));
        assert!(path.starts_with('p'));
    }

    #[test]
    fn anonymous_variable_is_not_bound() {
        let mut ctx = TranslatorContext::new();
        ctx.resolve_or_bind(None, VariableKind::Node);
        assert!(ctx.variables.is_empty());
    }

    #[test]
    fn anonymous_occurrences_never_collide_with_bound_names() {
        let mut ctx = TranslatorContext::new();
        let anon = ctx.resolve_or_bind(None, VariableKind::Node);
        let bound = ctx.resolve_or_bind(Some("n"), VariableKind::Node);
        assert_ne!(anon, bound);
    }

    #[test]
    fn cte_names_are_unique_and_share_the_alias_counter() {
        let mut ctx = TranslatorContext::new();
        let first = ctx.next_cte_name();
        ctx.resolve_or_bind(Some("n"), VariableKind::Node);
        let second = ctx.next_cte_name();
        assert_ne!(first, second);
    }
}

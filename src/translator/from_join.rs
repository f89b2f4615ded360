//! FROM/JOIN/WHERE assembly for `MATCH`/`OPTIONAL MATCH` patterns
//! (spec.md §4.3.3, §4.3.4). Binds pattern variables into the
//! [`TranslatorContext`], emits one `FROM nodes` reference for the first node
//! of the first pattern and a `JOIN` per subsequent node/edge, and collects
//! per-alias label/property/edge-type predicates into either `WHERE`
//! (required match) or the join's `ON` clause (optional match, so a
//! non-matching optional pattern still yields a row with NULLs rather than
//! eliminating the row).

use crate::error::EngineError;
use crate::parser::ast::{Direction, EdgePattern, Literal, NodePattern, PatternPath};
use crate::translator::context::{PendingRelationship, TranslatorContext, VariableKind};
use crate::translator::expr::{ExprCompiler, ExprMode};
use crate::translator::label;
use crate::translator::vlp;
use crate::value::PropertyValue;
use std::collections::HashMap;

pub struct JoinClause {
    pub sql: String,
    pub params: Vec<PropertyValue>,
}

pub struct FromJoinPlan {
    pub ctes: Vec<(String, Vec<PropertyValue>)>,
    pub from_sql: String,
    pub joins: Vec<JoinClause>,
    pub where_predicates: Vec<(String, Vec<PropertyValue>)>,
    /// Inline pattern property maps (`(n {k: v})`) deferred until the whole
    /// pattern is bound, so they can be compiled with a fully-populated
    /// [`TranslatorContext`] (e.g. a filter referencing another pattern
    /// variable bound later in the same clause).
    pub property_maps: Vec<(String, bool, crate::parser::ast::Expression)>,
}

struct Hop<'a> {
    edge: &'a EdgePattern,
    node: &'a NodePattern,
}

pub fn plan_patterns(
    ctx: &mut TranslatorContext,
    patterns: &[PatternPath],
    optional: bool,
    params: &HashMap<String, PropertyValue>,
    default_max_hops: u32,
    max_cte_depth: u32,
) -> Result<FromJoinPlan, EngineError> {
    let mut plan = FromJoinPlan {
        ctes: Vec::new(),
        from_sql: String::new(),
        joins: Vec::new(),
        where_predicates: Vec::new(),
        property_maps: Vec::new(),
    };

    for pattern in patterns {
        bind_pattern(
            ctx,
            pattern,
            optional,
            params,
            default_max_hops,
            max_cte_depth,
            &mut plan,
        )?;
    }
    Ok(plan)
}

fn bind_pattern(
    ctx: &mut TranslatorContext,
    pattern: &PatternPath,
    optional: bool,
    params: &HashMap<String, PropertyValue>,
    default_max_hops: u32,
    max_cte_depth: u32,
    plan: &mut FromJoinPlan,
) -> Result<(), EngineError> {
    let (start_alias, start_predicates) = bind_node(ctx, &pattern.start, optional, params, plan)?;
    let first_reference = plan.from_sql.is_empty();
    if first_reference {
        plan.from_sql = format!("nodes {}", start_alias);
        // No join backs the first FROM-position reference, so an optional
        // filter here has nowhere to fold into ON; it always goes to WHERE.
        plan.where_predicates.extend(start_predicates);
    } else if !ctx_already_joined(&plan.joins, &start_alias) {
        plan.joins.push(JoinClause {
            sql: format!("JOIN nodes {} ON 1=1", start_alias),
            params: Vec::new(),
        });
        for predicate in start_predicates {
            push_predicate(plan, optional, predicate);
        }
    }

    let mut prev_alias = start_alias.clone();
    let mut cte_sequence: Vec<String> = Vec::new();

    for (edge, node) in &pattern.hops {
        let hop = Hop { edge, node };
        let (to_alias, to_predicates) = bind_node(ctx, hop.node, optional, params, plan)?;

        if hop.edge.is_variable_length {
            let cte_name = ctx.next_cte_name();
            let direction = hop.edge.direction.unwrap_or(Direction::Right);
            let vlp_plan = vlp::build_vlp_cte(
                cte_name.clone(),
                &prev_alias,
                hop.edge.edge_type.as_deref(),
                direction,
                hop.edge.min_hops,
                hop.edge.max_hops,
                default_max_hops,
                max_cte_depth,
            );
            plan.ctes.push((vlp_plan.cte_sql.clone(), vlp_plan.params.clone()));
            cte_sequence.push(cte_name.clone());

            plan.joins.push(JoinClause {
                sql: format!(
                    "JOIN {cte} ON {cte}.start_id = {prev}.id",
                    cte = cte_name,
                    prev = prev_alias
                ),
                params: Vec::new(),
            });
            plan.joins.push(JoinClause {
                sql: format!(
                    "JOIN nodes {to} ON {to}.id = {cte}.current_id",
                    to = to_alias,
                    cte = cte_name
                ),
                params: Vec::new(),
            });
            let filter = vlp::terminal_filter(&cte_name, vlp_plan.min_hops, vlp_plan.max_hops);
            plan.where_predicates.push((filter, Vec::new()));

            if let Some(path_var) = &pattern.path_variable {
                ctx.path_expressions.push(crate::translator::context::PathExpression {
                    path_variable: path_var.clone(),
                    cte_name: cte_name.clone(),
                    start_alias: prev_alias.clone(),
                    end_alias: to_alias.clone(),
                    edge_type: hop.edge.edge_type.clone(),
                });
                ctx.variables.insert(
                    path_var.clone(),
                    crate::translator::context::BoundVariable {
                        kind: VariableKind::Path,
                        alias: cte_name.clone(),
                    },
                );
            }
        } else {
            let edge_alias = ctx.resolve_or_bind(hop.edge.variable.as_deref(), VariableKind::Edge);
            let direction = hop.edge.direction.unwrap_or(Direction::Right);
            let (src, dst) = match direction {
                Direction::Right => (prev_alias.clone(), to_alias.clone()),
                Direction::Left => (to_alias.clone(), prev_alias.clone()),
                Direction::Either => (prev_alias.clone(), to_alias.clone()),
            };
            let on_clause = match direction {
                Direction::Either => format!(
                    "({e}.source_id = {a}.id AND {e}.target_id = {b}.id) OR ({e}.source_id = {b}.id AND {e}.target_id = {a}.id)",
                    e = edge_alias,
                    a = prev_alias,
                    b = to_alias
                ),
                _ => format!(
                    "{e}.source_id = {s}.id AND {e}.target_id = {d}.id",
                    e = edge_alias,
                    s = src,
                    d = dst
                ),
            };
            let join_kind = if optional { "LEFT JOIN" } else { "JOIN" };
            plan.joins.push(JoinClause {
                sql: format!("{kind} edges {alias} ON {on}", kind = join_kind, alias = edge_alias, on = on_clause),
                params: Vec::new(),
            });
            let join_kind_node = if optional { "LEFT JOIN" } else { "JOIN" };
            plan.joins.push(JoinClause {
                sql: format!(
                    "{kind} nodes {alias} ON {alias}.id = {link}",
                    kind = join_kind_node,
                    alias = to_alias,
                    link = if matches!(direction, Direction::Left) {
                        format!("{}.source_id", edge_alias)
                    } else {
                        format!("{}.target_id", edge_alias)
                    }
                ),
                params: Vec::new(),
            });

            if let Some(edge_type) = &hop.edge.edge_type {
                let predicate = format!("{}.type = ?", edge_alias);
                let binding = (predicate, vec![PropertyValue::String(edge_type.clone())]);
                push_predicate(plan, optional, binding);
            }
            if let Some(map) = &hop.edge.properties {
                plan.property_maps.push((edge_alias.clone(), optional, map.clone()));
            }
        }

        // Pushed after this hop's own join(s), so an optional label filter
        // folds into the join that actually introduces `to_alias`.
        for predicate in to_predicates {
            push_predicate(plan, optional, predicate);
        }

        prev_alias = to_alias;
    }

    Ok(())
}

/// Binds `node`'s variable and returns its alias plus any label predicates
/// the caller still owes `plan` — the caller decides whether those fold into
/// WHERE or a specific join's ON clause once it knows which join (if any)
/// introduces this alias.
fn bind_node(
    ctx: &mut TranslatorContext,
    node: &NodePattern,
    optional: bool,
    params: &HashMap<String, PropertyValue>,
    plan: &mut FromJoinPlan,
) -> Result<(String, Vec<(String, Vec<PropertyValue>)>), EngineError> {
    let already_bound = node
        .variable
        .as_deref()
        .map(|v| ctx.is_bound(v))
        .unwrap_or(false);
    let alias = ctx.resolve_or_bind(node.variable.as_deref(), VariableKind::Node);

    let mut predicates = Vec::new();
    if !already_bound {
        if !node.labels.is_empty() {
            for (fragment, label_value) in label::label_exists_fragments(&alias, &node.labels) {
                predicates.push((fragment, vec![PropertyValue::String(label_value)]));
            }
        }
        if let Some(map) = &node.properties {
            plan.property_maps.push((alias.clone(), optional, map.clone()));
        }
    }
    let _ = params;
    Ok((alias, predicates))
}

fn push_predicate(
    plan: &mut FromJoinPlan,
    optional: bool,
    predicate: (String, Vec<PropertyValue>),
) {
    if optional {
        // Optional-match filters belong on the join's ON clause; since joins
        // are emitted before pattern property filters are known in the
        // general case, we fold these into the last join's ON text directly.
        if let Some(last) = plan.joins.last_mut() {
            last.sql = format!(
                "{} AND {}",
                last.sql.trim_end(),
                predicate.0
            );
            last.params.extend(predicate.1);
            return;
        }
    }
    plan.where_predicates.push(predicate);
}

fn ctx_already_joined(joins: &[JoinClause], alias: &str) -> bool {
    joins.iter().any(|j| j.sql.contains(&format!(" {} ", alias)))
}

/// Compile a node/edge pattern's inline property map (`{k: v, ...}`) into
/// `WHERE`/`ON` predicates using the expression compiler, once the context
/// is fully bound. Returns one predicate per key.
pub fn compile_property_map_predicates(
    compiler: &ExprCompiler,
    alias: &str,
    map: &crate::parser::ast::Expression,
) -> Result<Vec<(String, Vec<PropertyValue>)>, EngineError> {
    let pairs = match map {
        crate::parser::ast::Expression::Object(pairs) => pairs,
        _ => {
            return Err(EngineError::TypeError(
                "pattern property filters must be an object literal".to_string(),
            ))
        }
    };
    let mut out = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        let compiled = compiler.compile(value, ExprMode::Scalar)?;
        let predicate = format!("json_extract({}.properties, '$.{}') = {}", alias, key, compiled.sql);
        out.push((predicate, compiled.params));
    }
    Ok(out)
}

pub fn literal_placeholder(lit: &Literal) -> &'static str {
    match lit {
        Literal::Null => "NULL",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::EdgePattern;

    fn node(var: &str) -> NodePattern {
        NodePattern {
            variable: Some(var.to_string()),
            ..Default::default()
        }
    }

    fn labeled_node(var: &str, label: &str) -> NodePattern {
        NodePattern {
            variable: Some(var.to_string()),
            labels: vec![label.to_string()],
            ..Default::default()
        }
    }

    fn plain_edge() -> EdgePattern {
        EdgePattern {
            direction: Some(Direction::Right),
            ..Default::default()
        }
    }

    #[test]
    fn single_node_pattern_is_the_from_clause() {
        let mut ctx = TranslatorContext::new();
        let params = HashMap::new();
        let pattern = PatternPath {
            path_variable: None,
            start: node("n"),
            hops: vec![],
        };
        let plan = plan_patterns(&mut ctx, std::slice::from_ref(&pattern), false, &params, 10, 10).unwrap();
        assert_eq!(plan.from_sql, "nodes n0");
        assert!(plan.joins.is_empty());
    }

    #[test]
    fn one_hop_pattern_joins_edge_then_target_node() {
        let mut ctx = TranslatorContext::new();
        let params = HashMap::new();
        let pattern = PatternPath {
            path_variable: None,
            start: node("a"),
            hops: vec![(plain_edge(), node("b"))],
        };
        let plan = plan_patterns(&mut ctx, std::slice::from_ref(&pattern), false, &params, 10, 10).unwrap();
        assert_eq!(plan.from_sql, "nodes n0");
        assert_eq!(plan.joins.len(), 2);
        assert!(plan.joins[0].sql.starts_with("JOIN edges"));
        assert!(plan.joins[1].sql.starts_with("JOIN nodes"));
    }

    #[test]
    fn optional_match_folds_label_filter_into_join_on_clause() {
        let mut ctx = TranslatorContext::new();
        let params = HashMap::new();
        let pattern = PatternPath {
            path_variable: None,
            start: node("a"),
            hops: vec![(plain_edge(), labeled_node("b", "Person"))],
        };
        let plan = plan_patterns(&mut ctx, std::slice::from_ref(&pattern), true, &params, 10, 10).unwrap();
        assert!(plan.where_predicates.is_empty());
        assert!(plan.joins.last().unwrap().sql.contains(" AND "));
    }

    #[test]
    fn required_match_label_filter_goes_to_where() {
        let mut ctx = TranslatorContext::new();
        let params = HashMap::new();
        let pattern = PatternPath {
            path_variable: None,
            start: labeled_node("n", "Person"),
            hops: vec![],
        };
        let plan = plan_patterns(&mut ctx, std::slice::from_ref(&pattern), false, &params, 10, 10).unwrap();
        assert_eq!(plan.where_predicates.len(), 1);
    }

    #[test]
    fn two_hop_chain_joins_an_edge_and_node_per_hop() {
        let mut ctx = TranslatorContext::new();
        let params = HashMap::new();
        let pattern = PatternPath {
            path_variable: None,
            start: node("a"),
            hops: vec![(plain_edge(), node("b")), (plain_edge(), node("c"))],
        };
        let plan = plan_patterns(&mut ctx, std::slice::from_ref(&pattern), false, &params, 10, 10).unwrap();
        assert_eq!(plan.joins.len(), 4);
        assert!(ctx.is_bound("a"));
        assert!(ctx.is_bound("b"));
        assert!(ctx.is_bound("c"));
    }

    #[test]
    fn literal_placeholder_is_bare_null_for_null_literal() {
        assert_eq!(literal_placeholder(&Literal::Null), "NULL");
        assert_eq!(literal_placeholder(&Literal::Integer(1)), "?");
    }
}

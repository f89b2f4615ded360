//! Final `SELECT` assembly (spec.md §4.3.4). Assembly order is fixed:
//! SELECT list → FROM/JOIN → WHERE → ORDER BY/LIMIT/OFFSET → DISTINCT
//! dedup, and bind parameters interleave in exactly that order so a
//! caller can zip them against `?` placeholders left-to-right.

use crate::error::EngineError;
use crate::parser::ast::{Expression, OrderByItem, ReturnItem};
use crate::translator::context::TranslatorContext;
use crate::translator::expr::{ExprCompiler, ExprMode};
use crate::translator::from_join::FromJoinPlan;
use crate::value::PropertyValue;
use std::collections::HashMap;

pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<PropertyValue>,
}

#[allow(clippy::too_many_arguments)]
pub fn compile_select(
    ctx: &TranslatorContext,
    params: &HashMap<String, PropertyValue>,
    plan: &FromJoinPlan,
    items: &[ReturnItem],
    distinct: bool,
    where_clause: Option<&Expression>,
    order_by: Option<&[OrderByItem]>,
    skip: Option<&Expression>,
    limit: Option<&Expression>,
) -> Result<SqlStatement, EngineError> {
    let compiler = ExprCompiler::new(ctx, params);
    let mut bind_params = Vec::new();

    // SELECT expressions.
    let mut select_parts = Vec::with_capacity(items.len());
    for item in items {
        let compiled = compiler.compile(&item.expression, ExprMode::Projection)?;
        let column = match &item.alias {
            Some(alias) => format!("{} AS {}", compiled.sql, quote_ident(alias)),
            None => format!("{} AS {}", compiled.sql, quote_ident(&display_name(&item.expression))),
        };
        select_parts.push(column);
        bind_params.extend(compiled.params);
    }
    if select_parts.is_empty() {
        select_parts.push("*".to_string());
    }

    // FROM/JOIN. Join ON parameters (edge type filters compiled during
    // pattern binding) come right after the SELECT list's own parameters.
    let mut from_sql = format!("FROM {}", plan.from_sql);
    for join in &plan.joins {
        from_sql.push(' ');
        from_sql.push_str(&join.sql);
        bind_params.extend(join.params.clone());
    }

    // WHERE: pattern label/property predicates, deferred property-map
    // predicates, then the explicit WHERE clause expression.
    let mut where_fragments = Vec::new();
    for (fragment, p) in &plan.where_predicates {
        where_fragments.push(fragment.clone());
        bind_params.extend(p.clone());
    }
    for (alias, optional, map) in &plan.property_maps {
        let predicates = crate::translator::from_join::compile_property_map_predicates(&compiler, alias, map)?;
        for (fragment, p) in predicates {
            if *optional {
                // Folded into ON rather than WHERE would be more precise,
                // but by this point the join text is already assembled;
                // conjoining in WHERE only loosens optional semantics when
                // the map filter is the *sole* predicate on that alias.
                where_fragments.push(format!("({} OR {}.id IS NULL)", fragment, alias));
            } else {
                where_fragments.push(fragment);
            }
            bind_params.extend(p);
        }
    }
    if let Some(expr) = where_clause {
        let compiled = compiler.compile(expr, ExprMode::Scalar)?;
        where_fragments.push(compiled.sql);
        bind_params.extend(compiled.params);
    }

    let mut sql = String::new();
    if !plan.ctes.is_empty() {
        sql.push_str("WITH RECURSIVE ");
        let mut cte_parts = Vec::with_capacity(plan.ctes.len());
        for (cte_sql, cte_params) in &plan.ctes {
            cte_parts.push(cte_sql.clone());
            // CTE-body parameters are bound where they're textually defined,
            // ahead of everything else.
            let _ = cte_params;
        }
        sql.push_str(&cte_parts.join(", "));
        sql.push(' ');
        // Re-collect CTE params in definition order, ahead of the SELECT's own.
        let mut cte_params_all = Vec::new();
        for (_, cte_params) in &plan.ctes {
            cte_params_all.extend(cte_params.clone());
        }
        bind_params = cte_params_all.into_iter().chain(bind_params).collect();
    }

    sql.push_str("SELECT ");
    if distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&select_parts.join(", "));
    sql.push(' ');
    sql.push_str(&from_sql);
    if !where_fragments.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_fragments.join(" AND "));
    }

    if let Some(order_by) = order_by {
        if !order_by.is_empty() {
            let mut order_parts = Vec::with_capacity(order_by.len());
            for item in order_by {
                let compiled = compiler.compile(&item.expression, ExprMode::Scalar)?;
                bind_params.extend(compiled.params);
                order_parts.push(format!(
                    "{} {}",
                    compiled.sql,
                    if item.descending { "DESC" } else { "ASC" }
                ));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_parts.join(", "));
        }
    }

    if let Some(limit) = limit {
        let compiled = compiler.compile(limit, ExprMode::Scalar)?;
        sql.push_str(&format!(" LIMIT {}", compiled.sql));
        bind_params.extend(compiled.params);
    } else if skip.is_some() {
        sql.push_str(" LIMIT -1");
    }
    if let Some(skip) = skip {
        let compiled = compiler.compile(skip, ExprMode::Scalar)?;
        sql.push_str(&format!(" OFFSET {}", compiled.sql));
        bind_params.extend(compiled.params);
    }

    Ok(SqlStatement {
        sql,
        params: bind_params,
    })
}

fn display_name(expr: &Expression) -> String {
    match expr {
        Expression::Variable(name) | Expression::PathVariable(name) => name.clone(),
        Expression::Property(base, prop) => format!("{}_{}", display_name(base), prop),
        Expression::Function { name, .. } => name.clone(),
        _ => "expr".to_string(),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Literal;
    use crate::translator::context::{TranslatorContext, VariableKind};
    use crate::translator::from_join::{FromJoinPlan, JoinClause};

    fn bare_plan(from_sql: &str) -> FromJoinPlan {
        FromJoinPlan {
            ctes: Vec::new(),
            from_sql: from_sql.to_string(),
            joins: Vec::new(),
            where_predicates: Vec::new(),
            property_maps: Vec::new(),
        }
    }

    fn ctx_with_bound_node(var: &str) -> TranslatorContext {
        let mut ctx = TranslatorContext::new();
        ctx.resolve_or_bind(Some(var), VariableKind::Node);
        ctx
    }

    fn name_prop_item(var: &str) -> ReturnItem {
        ReturnItem {
            expression: Expression::Property(Box::new(Expression::Variable(var.to_string())), "name".to_string()),
            alias: None,
        }
    }

    #[test]
    fn plain_return_compiles_select_from_with_quoted_alias() {
        let ctx = ctx_with_bound_node("n");
        let params = HashMap::new();
        let plan = bare_plan("nodes n0");
        let stmt = compile_select(&ctx, &params, &plan, &[name_prop_item("n")], false, None, None, None, None).unwrap();
        assert_eq!(stmt.sql, "SELECT n0.properties -> '$.name' AS \"n_name\" FROM nodes n0");
    }

    #[test]
    fn distinct_flag_inserts_distinct_keyword() {
        let ctx = ctx_with_bound_node("n");
        let params = HashMap::new();
        let plan = bare_plan("nodes n0");
        let stmt = compile_select(&ctx, &params, &plan, &[name_prop_item("n")], true, None, None, None, None).unwrap();
        assert!(stmt.sql.starts_with("SELECT DISTINCT "));
    }

    #[test]
    fn no_return_items_projects_star() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let plan = bare_plan("nodes n0");
        let stmt = compile_select(&ctx, &params, &plan, &[], false, None, None, None, None).unwrap();
        assert!(stmt.sql.starts_with("SELECT * FROM"));
    }

    #[test]
    fn aliased_return_item_uses_the_explicit_alias() {
        let ctx = ctx_with_bound_node("n");
        let params = HashMap::new();
        let plan = bare_plan("nodes n0");
        let item = ReturnItem {
            expression: Expression::Variable("n".to_string()),
            alias: Some("person".to_string()),
        };
        let stmt = compile_select(&ctx, &params, &plan, &[item], false, None, None, None, None).unwrap();
        assert!(stmt.sql.contains("AS \"person\""));
        assert!(!stmt.sql.contains("AS \"n\""));
    }

    #[test]
    fn pattern_predicates_and_where_clause_join_with_and() {
        let ctx = ctx_with_bound_node("n");
        let params = HashMap::new();
        let mut plan = bare_plan("nodes n0");
        plan.where_predicates
            .push(("n0.kind = ?".to_string(), vec![PropertyValue::String("Person".to_string())]));
        let where_clause = Expression::Literal(Literal::Boolean(true));
        let stmt = compile_select(&ctx, &params, &plan, &[name_prop_item("n")], false, Some(&where_clause), None, None, None).unwrap();
        assert!(stmt.sql.contains("WHERE n0.kind = ? AND "));
        assert_eq!(stmt.params[0], PropertyValue::String("Person".to_string()));
    }

    #[test]
    fn join_params_are_interleaved_ahead_of_where_params() {
        let ctx = ctx_with_bound_node("n");
        let params = HashMap::new();
        let mut plan = bare_plan("nodes n0");
        plan.joins.push(JoinClause {
            sql: "JOIN edges e0 ON e0.type = ?".to_string(),
            params: vec![PropertyValue::String("KNOWS".to_string())],
        });
        plan.where_predicates
            .push(("1=1".to_string(), vec![PropertyValue::Integer(7)]));
        let stmt = compile_select(&ctx, &params, &plan, &[name_prop_item("n")], false, None, None, None, None).unwrap();
        assert_eq!(stmt.params[0], PropertyValue::String("KNOWS".to_string()));
        assert_eq!(stmt.params[1], PropertyValue::Integer(7));
    }

    #[test]
    fn order_by_and_limit_and_offset_append_in_fixed_order() {
        let ctx = ctx_with_bound_node("n");
        let params = HashMap::new();
        let plan = bare_plan("nodes n0");
        let order_by = vec![OrderByItem {
            expression: Expression::Property(Box::new(Expression::Variable("n".to_string())), "name".to_string()),
            descending: true,
        }];
        let limit = Expression::Literal(Literal::Integer(10));
        let skip = Expression::Literal(Literal::Integer(5));
        let stmt = compile_select(
            &ctx,
            &params,
            &plan,
            &[name_prop_item("n")],
            false,
            None,
            Some(&order_by),
            Some(&skip),
            Some(&limit),
        )
        .unwrap();
        let order_pos = stmt.sql.find(" ORDER BY json_extract(n0.properties, '$.name') DESC").unwrap();
        let limit_pos = stmt.sql.find(" LIMIT ").unwrap();
        let offset_pos = stmt.sql.find(" OFFSET ").unwrap();
        assert!(order_pos < limit_pos);
        assert!(limit_pos < offset_pos);
    }

    #[test]
    fn skip_without_limit_gets_an_unbounded_limit_clause() {
        let ctx = ctx_with_bound_node("n");
        let params = HashMap::new();
        let plan = bare_plan("nodes n0");
        let skip = Expression::Literal(Literal::Integer(3));
        let stmt = compile_select(&ctx, &params, &plan, &[name_prop_item("n")], false, None, None, Some(&skip), None).unwrap();
        assert!(stmt.sql.contains(" LIMIT -1 OFFSET "));
    }

    #[test]
    fn ctes_are_prefixed_with_with_recursive_and_their_params_lead() {
        let ctx = ctx_with_bound_node("n");
        let params = HashMap::new();
        let mut plan = bare_plan("nodes n0");
        plan.ctes.push((
            "path_1(start_id, current_id) AS (SELECT id, id FROM nodes)".to_string(),
            vec![PropertyValue::Integer(42)],
        ));
        let stmt = compile_select(&ctx, &params, &plan, &[name_prop_item("n")], false, None, None, None, None).unwrap();
        assert!(stmt.sql.starts_with("WITH RECURSIVE path_1("));
        assert_eq!(stmt.params[0], PropertyValue::Integer(42));
    }

    #[test]
    fn display_name_falls_back_to_property_chain_for_unaliased_projections() {
        assert_eq!(display_name(&Expression::Variable("n".to_string())), "n");
        let prop = Expression::Property(Box::new(Expression::Variable("n".to_string())), "name".to_string());
        assert_eq!(display_name(&prop), "n_name");
    }

    #[test]
    fn quote_ident_escapes_embedded_quotes() {
        assert_eq!(quote_ident("weird\"name"), "\"weird\"\"name\"");
    }
}

//! Cypher clause → SQL translation (spec.md §4.3). `compile_match_return`
//! handles the single-phase `MATCH [WHERE] RETURN|WITH` shape directly;
//! multi-clause queries (`CREATE`, `MERGE`, interleaved `WITH`s, `UNWIND`)
//! are orchestrated procedurally by `executor`, which calls back into this
//! module's `from_join`/`select`/`write` builders one clause at a time.

pub mod context;
pub mod expr;
pub mod from_join;
pub mod functions;
pub mod label;
pub mod select;
pub mod vlp;
pub mod write;

use crate::error::EngineError;
use crate::parser::ast::{Clause, OrderByItem, PatternPath, ReturnItem};
use crate::value::PropertyValue;
use context::TranslatorContext;
use select::SqlStatement;
use std::collections::HashMap;

/// Compile a `MATCH [OPTIONAL MATCH ...] [WHERE ...] RETURN|WITH ...` query
/// into one SQL statement. `default_max_hops`/`max_cte_depth` come from
/// [`crate::config::EngineConfig`].
#[allow(clippy::too_many_arguments)]
pub fn compile_match_return(
    ctx: &mut TranslatorContext,
    match_clauses: &[(Vec<PatternPath>, Option<crate::parser::ast::Expression>, bool)],
    params: &HashMap<String, PropertyValue>,
    items: &[ReturnItem],
    distinct: bool,
    order_by: Option<&[OrderByItem]>,
    skip: Option<&crate::parser::ast::Expression>,
    limit: Option<&crate::parser::ast::Expression>,
    default_max_hops: u32,
    max_cte_depth: u32,
) -> Result<SqlStatement, EngineError> {
    let (combined, explicit_where) =
        build_combined_plan(ctx, match_clauses, params, default_max_hops, max_cte_depth)?;

    select::compile_select(
        ctx,
        params,
        &combined,
        items,
        distinct,
        explicit_where.as_ref(),
        order_by,
        skip,
        limit,
    )
}

/// Bind every pattern in a leading run of `MATCH`/`OPTIONAL MATCH` clauses
/// into one [`from_join::FromJoinPlan`], ANDing their `WHERE` clauses.
/// Shared between `compile_match_return` (single-phase `MATCH...RETURN`) and
/// the executor (which projects a synthetic "capture every bound variable"
/// `SELECT` from the same plan for its multi-phase strategies).
pub fn build_combined_plan(
    ctx: &mut TranslatorContext,
    match_clauses: &[(Vec<PatternPath>, Option<crate::parser::ast::Expression>, bool)],
    params: &HashMap<String, PropertyValue>,
    default_max_hops: u32,
    max_cte_depth: u32,
) -> Result<(from_join::FromJoinPlan, Option<crate::parser::ast::Expression>), EngineError> {
    let mut combined = from_join::FromJoinPlan {
        ctes: Vec::new(),
        from_sql: String::new(),
        joins: Vec::new(),
        where_predicates: Vec::new(),
        property_maps: Vec::new(),
    };
    let mut explicit_where: Option<crate::parser::ast::Expression> = None;

    for (patterns, where_clause, optional) in match_clauses {
        let sub_plan = from_join::plan_patterns(
            ctx,
            patterns,
            *optional,
            params,
            default_max_hops,
            max_cte_depth,
        )?;
        if combined.from_sql.is_empty() {
            combined.from_sql = sub_plan.from_sql;
        } else if !sub_plan.from_sql.is_empty() {
            // A second non-optional MATCH with a disjoint start node is a
            // cartesian join (no shared variable); bring it in as a plain
            // cross join, matching Cypher's multi-MATCH semantics.
            combined.joins.push(from_join::JoinClause {
                sql: format!("JOIN {} ON 1=1", sub_plan.from_sql),
                params: Vec::new(),
            });
        }
        combined.ctes.extend(sub_plan.ctes);
        combined.joins.extend(sub_plan.joins);
        combined.where_predicates.extend(sub_plan.where_predicates);
        combined.property_maps.extend(sub_plan.property_maps);

        if let Some(w) = where_clause {
            explicit_where = Some(match explicit_where {
                Some(existing) => crate::parser::ast::Expression::Logical {
                    op: crate::parser::ast::LogicalOp::And,
                    left: Box::new(existing),
                    right: Box::new(w.clone()),
                },
                None => w.clone(),
            });
        }
    }

    Ok((combined, explicit_where))
}

/// Extract the `(patterns, where_clause, optional)` triples a query's
/// leading run of `Match` clauses carries, stopping at the first
/// non-`Match` clause. Used by the executor to recognize the
/// "single-phase MATCH...RETURN" dispatch strategy (spec.md §4.4, case 3).
pub fn leading_match_clauses(
    clauses: &[Clause],
) -> Vec<(Vec<PatternPath>, Option<crate::parser::ast::Expression>, bool)> {
    clauses
        .iter()
        .take_while(|c| matches!(c, Clause::Match { .. }))
        .map(|c| match c {
            Clause::Match {
                patterns,
                where_clause,
                optional,
            } => (patterns.clone(), where_clause.clone(), *optional),
            _ => unreachable!(),
        })
        .collect()
}

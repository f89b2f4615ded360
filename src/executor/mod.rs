//! Query dispatch (spec.md §4.4). Two strategies divide the work:
//!
//! - Single-phase: a leading run of `MATCH`/`OPTIONAL MATCH` clauses
//!   followed by exactly one plain `RETURN` (no wildcard) compiles straight
//!   to one `SELECT` via `translator::compile_match_return` — RETURN's
//!   projection, `WHERE`, `DISTINCT`, `ORDER BY`, `SKIP`, and `LIMIT` are all
//!   pushed into that one statement and the result rows go straight through
//!   `result::format_rows`, with no `RowEnv` in between (spec.md §2, §4.3.4).
//! - Multi-phase: everything else. The leading `MATCH` run still becomes one
//!   `SELECT`, but it projects every bound variable (node, edge, or path)
//!   into a `Vec<RowEnv>` via `run_match`, and every following clause
//!   (`CREATE`, `MERGE`, `SET`, `REMOVE`, `DELETE`, `UNWIND`, `WITH`, `CALL`,
//!   and a non-single-phase-eligible `RETURN`) runs procedurally, one row at
//!   a time, against that `Vec<RowEnv>`. UNWIND+CREATE and UNWIND+MERGE are
//!   just a `Unwind` clause fanning a `RowEnv` out before a `Create`/`Merge`
//!   clause runs on each of its copies; CREATE+RETURN and the general
//!   MATCH…SET…DELETE…RETURN shape run the same way, differing only in which
//!   clauses appear in between.
//!
//! A query may only open its `MATCH` run at the very start (no `MATCH`
//! following a `CREATE`/`WITH`/etc.) — an explicit scope limitation recorded
//! in DESIGN.md rather than attempted here.

pub mod mutate;
pub mod rowenv;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, QueryError};
use crate::eval::{self, Env};
use crate::parser::{ast::*, CypherStatement};
use crate::procedures;
use crate::query_cache::QueryCache;
use crate::result;
use crate::storage::StorageHandle;
use crate::translator::{self, context::TranslatorContext, select};
use crate::value::PropertyValue;
use rowenv::RowEnv;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::collections::HashMap;
use std::time::Instant;

pub struct Engine<S: StorageHandle> {
    storage: S,
    config: EngineConfig,
    cache: Option<QueryCache>,
}

/// Wire-shaped per spec.md §6.2: `{count, time_ms}`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMeta {
    pub count: usize,
    pub time_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QueryResponse {
    Success {
        data: Vec<Map<String, Json>>,
        meta: QueryMeta,
    },
    Failure {
        error: QueryError,
    },
}

impl<S: StorageHandle> Engine<S> {
    pub fn new(storage: S, config: EngineConfig) -> Self {
        let cache = config
            .query_cache_enabled
            .then(|| QueryCache::new(config.query_cache_capacity));
        Engine { storage, config, cache }
    }

    /// Parse, plan and run one Cypher statement inside its own transaction.
    /// Every clause in the statement either fully commits or fully rolls
    /// back; there is no partial-statement visibility (spec.md §5).
    pub fn execute(&self, query: &str, params: HashMap<String, PropertyValue>) -> QueryResponse {
        let start = Instant::now();
        match self.run(query, &params) {
            Ok(data) => {
                let meta = QueryMeta {
                    count: data.len(),
                    time_ms: start.elapsed().as_secs_f64() * 1000.0,
                };
                QueryResponse::Success { data, meta }
            }
            Err(err) => QueryResponse::Failure { error: err.into() },
        }
    }

    fn run(&self, query: &str, params: &HashMap<String, PropertyValue>) -> EngineResult<Vec<Map<String, Json>>> {
        let CypherStatement::Query(parsed) = match &self.cache {
            Some(cache) => cache.get_or_parse(query)?,
            None => crate::parser::parse(query)?,
        };
        self.storage
            .transaction(|handle| execute_query(handle, &self.config, &parsed, params))
    }
}

fn execute_query(
    storage: &dyn StorageHandle,
    config: &EngineConfig,
    query: &Query,
    params: &HashMap<String, PropertyValue>,
) -> EngineResult<Vec<Map<String, Json>>> {
    if let [Clause::Union { left, right, all }] = query.clauses.as_slice() {
        let mut rows = execute_query(storage, config, left, params)?;
        let right_rows = execute_query(storage, config, right, params)?;
        rows.extend(right_rows);
        if !*all {
            dedupe_rows(&mut rows);
        }
        return Ok(rows);
    }

    let clauses = &query.clauses;
    let mut rows: Vec<RowEnv> = vec![RowEnv::new()];
    let mut idx = 0;
    let mut output: Option<Vec<Map<String, Json>>> = None;

    while idx < clauses.len() {
        match &clauses[idx] {
            Clause::Match { .. } => {
                if idx != 0 {
                    return Err(EngineError::UnsupportedFeature(
                        "MATCH may only appear as the query's leading clause(s)".to_string(),
                    ));
                }
                let leading = translator::leading_match_clauses(&clauses[idx..]);
                let consumed = leading.len();
                let rest = &clauses[idx + consumed..];
                if let [Clause::Return { items, distinct, order_by, skip, limit }] = rest {
                    if !is_wildcard_return(items) {
                        let mut ctx = TranslatorContext::new();
                        let stmt = translator::compile_match_return(
                            &mut ctx,
                            &leading,
                            params,
                            items,
                            *distinct,
                            order_by.as_deref(),
                            skip.as_ref(),
                            limit.as_ref(),
                            config.default_max_hops,
                            config.max_cte_depth,
                        )?;
                        let result = storage.execute(&stmt.sql, &stmt.params)?;
                        output = Some(result::format_rows(result.rows));
                        idx = clauses.len();
                        continue;
                    }
                }
                rows = run_match(storage, config, &leading, params)?;
                idx += consumed;
                continue;
            }
            Clause::Call { procedure, yields, where_clause } => {
                rows = run_call(storage, rows, procedure, yields.as_deref(), where_clause.as_ref(), params)?;
            }
            Clause::Create { patterns } => {
                for row in rows.iter_mut() {
                    for pattern in patterns {
                        mutate::create_pattern(storage, pattern, row, params)?;
                    }
                }
            }
            Clause::Merge { pattern, on_create_set, on_match_set } => {
                for row in rows.iter_mut() {
                    mutate::merge_pattern(storage, pattern, on_create_set, on_match_set, row, params)?;
                }
            }
            Clause::Set { assignments } => {
                for row in rows.iter_mut() {
                    for op in assignments {
                        mutate::apply_set_op(storage, op, row, params)?;
                    }
                }
            }
            Clause::Remove { items } => {
                for row in rows.iter_mut() {
                    for item in items {
                        mutate::apply_remove(storage, item, row)?;
                    }
                }
            }
            Clause::Delete { variables, detach } => {
                for row in rows.iter_mut() {
                    mutate::apply_delete(storage, variables, *detach, row, params)?;
                }
            }
            Clause::Unwind { expression, alias } => {
                rows = run_unwind(rows, expression, alias, params)?;
            }
            Clause::With { items, where_clause, distinct, order_by, skip, limit } => {
                rows = run_project(
                    rows,
                    items,
                    where_clause.as_ref(),
                    *distinct,
                    order_by.as_deref(),
                    skip.as_ref(),
                    limit.as_ref(),
                    params,
                )?;
            }
            Clause::Return { items, distinct, order_by, skip, limit } => {
                let projected = run_project(rows, items, None, *distinct, order_by.as_deref(), skip.as_ref(), limit.as_ref(), params)?;
                let ordered_rows: Vec<Map<String, Json>> = projected.into_iter().map(row_to_ordered).collect();
                output = Some(result::format_rows(ordered_rows));
                idx = clauses.len();
                continue;
            }
            Clause::Union { .. } => unreachable!("UNION only appears as a lone top-level clause"),
        }
        idx += 1;
    }

    Ok(output.unwrap_or_default())
}

/// `RETURN *`/`WITH *` expand against the executor's own row environment
/// (`run_project`); `select::compile_select` has no equivalent "every bound
/// variable" expansion against a `TranslatorContext`, so a lone wildcard
/// RETURN stays on the procedural path.
fn is_wildcard_return(items: &[ReturnItem]) -> bool {
    matches!(items, [ReturnItem { expression: Expression::Variable(v), .. }] if v == "*")
}

/// Compile and run the leading `MATCH`/`OPTIONAL MATCH` run as one `SELECT`
/// that projects every bound variable (node, edge, or path), producing one
/// [`RowEnv`] per result row.
fn run_match(
    storage: &dyn StorageHandle,
    config: &EngineConfig,
    leading: &[(Vec<PatternPath>, Option<Expression>, bool)],
    params: &HashMap<String, PropertyValue>,
) -> EngineResult<Vec<RowEnv>> {
    let mut ctx = TranslatorContext::new();
    let (plan, where_clause) = translator::build_combined_plan(
        &mut ctx,
        leading,
        params,
        config.default_max_hops,
        config.max_cte_depth,
    )?;

    let mut names: Vec<String> = ctx.variables.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        // A MATCH with every variable anonymous still needs to fan out one
        // row per match; project a constant so the row count survives.
        let items = vec![ReturnItem {
            expression: Expression::Literal(Literal::Integer(1)),
            alias: Some("_match".to_string()),
        }];
        let stmt = select::compile_select(&ctx, params, &plan, &items, false, where_clause.as_ref(), None, None, None)?;
        let result = storage.execute(&stmt.sql, &stmt.params)?;
        return Ok(result.rows.into_iter().map(|_| RowEnv::new()).collect());
    }

    let items: Vec<ReturnItem> = names
        .iter()
        .map(|name| ReturnItem {
            expression: Expression::Variable(name.clone()),
            alias: Some(name.clone()),
        })
        .collect();
    let stmt = select::compile_select(&ctx, params, &plan, &items, false, where_clause.as_ref(), None, None, None)?;
    let result = storage.execute(&stmt.sql, &stmt.params)?;

    let mut out = Vec::with_capacity(result.rows.len());
    for row in result.rows {
        let mut env = RowEnv::new();
        for name in &names {
            let cell = row.get(name).cloned().unwrap_or(Json::Null);
            env.insert(name.clone(), PropertyValue::from_json(&rowenv::decode_cell(cell)));
        }
        out.push(env);
    }
    Ok(out)
}

fn run_call(
    storage: &dyn StorageHandle,
    rows: Vec<RowEnv>,
    procedure: &str,
    yields: Option<&[YieldItem]>,
    where_clause: Option<&Expression>,
    params: &HashMap<String, PropertyValue>,
) -> EngineResult<Vec<RowEnv>> {
    let query = procedures::resolve(procedure)?;
    let result = storage.execute(&query.sql, &[])?;
    let alias = yields
        .and_then(|items| items.first())
        .and_then(|item| item.alias.clone())
        .unwrap_or_else(|| query.default_column.to_string());

    let mut produced = Vec::with_capacity(result.rows.len());
    for sql_row in result.rows {
        let value = PropertyValue::from_json(&rowenv::decode_cell(
            sql_row.get(query.default_column).cloned().unwrap_or(Json::Null),
        ));
        for base in &rows {
            let mut env = base.clone();
            env.insert(alias.clone(), value.clone());
            produced.push(env);
        }
    }

    if let Some(filter) = where_clause {
        let mut kept = Vec::with_capacity(produced.len());
        for row in produced {
            let env = Env { params, variables: row.to_hashmap() };
            if truthy(&eval::evaluate(filter, &env)?) {
                kept.push(row);
            }
        }
        return Ok(kept);
    }
    Ok(produced)
}

fn run_unwind(
    rows: Vec<RowEnv>,
    expression: &Expression,
    alias: &str,
    params: &HashMap<String, PropertyValue>,
) -> EngineResult<Vec<RowEnv>> {
    let mut out = Vec::new();
    for row in rows {
        let env = Env { params, variables: row.to_hashmap() };
        let items = match eval::evaluate(expression, &env)? {
            PropertyValue::List(items) => items,
            PropertyValue::Null => Vec::new(),
            other => vec![other],
        };
        for item in items {
            let mut next = row.clone();
            next.insert(alias.to_string(), item);
            out.push(next);
        }
    }
    Ok(out)
}

/// Shared by `WITH` and `RETURN`: project, filter, group aggregates,
/// dedupe, order, skip, and limit. `RETURN *`/`WITH *` expand to every
/// variable currently bound, in insertion order (spec.md §4.3.4).
#[allow(clippy::too_many_arguments)]
fn run_project(
    rows: Vec<RowEnv>,
    items: &[ReturnItem],
    where_clause: Option<&Expression>,
    distinct: bool,
    order_by: Option<&[OrderByItem]>,
    skip: Option<&Expression>,
    limit: Option<&Expression>,
    params: &HashMap<String, PropertyValue>,
) -> EngineResult<Vec<RowEnv>> {
    let expanded_items;
    let items = if items.len() == 1 && matches!(&items[0].expression, Expression::Variable(v) if v == "*") {
        expanded_items = rows
            .first()
            .map(|row| {
                row.keys()
                    .map(|name| ReturnItem {
                        expression: Expression::Variable(name.clone()),
                        alias: Some(name.clone()),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        expanded_items.as_slice()
    } else {
        items
    };

    let has_aggregate = items.iter().any(|item| contains_aggregate(&item.expression));
    let mut projected: Vec<RowEnv> = if has_aggregate {
        project_aggregated(&rows, items, params)?
    } else {
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(project_row(row, items, params)?);
        }
        out
    };

    if let Some(filter) = where_clause {
        let mut kept = Vec::with_capacity(projected.len());
        for row in projected {
            let env = Env { params, variables: row.to_hashmap() };
            if truthy(&eval::evaluate(filter, &env)?) {
                kept.push(row);
            }
        }
        projected = kept;
    }

    if distinct {
        dedupe_rowenvs(&mut projected);
    }

    if let Some(order) = order_by {
        let env_params = params;
        let mut keyed: Vec<(Vec<PropertyValue>, RowEnv)> = Vec::with_capacity(projected.len());
        for row in projected {
            let env = Env { params: env_params, variables: row.to_hashmap() };
            let mut key = Vec::with_capacity(order.len());
            for item in order {
                key.push(eval::evaluate(&item.expression, &env)?);
            }
            keyed.push((key, row));
        }
        keyed.sort_by(|a, b| {
            for (idx, item) in order.iter().enumerate() {
                let ord = compare_values(&a.0[idx], &b.0[idx]);
                let ord = if item.descending { ord.reverse() } else { ord };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
        projected = keyed.into_iter().map(|(_, row)| row).collect();
    }

    let skip_n = match skip {
        Some(expr) => as_usize(&eval::evaluate(expr, &Env::new(params))?)?,
        None => 0,
    };
    let projected: Vec<RowEnv> = projected.into_iter().skip(skip_n).collect();
    let projected = match limit {
        Some(expr) => {
            let n = as_usize(&eval::evaluate(expr, &Env::new(params))?)?;
            projected.into_iter().take(n).collect()
        }
        None => projected,
    };

    Ok(projected)
}

fn project_row(row: &RowEnv, items: &[ReturnItem], params: &HashMap<String, PropertyValue>) -> EngineResult<RowEnv> {
    let env = Env { params, variables: row.to_hashmap() };
    let mut out = RowEnv::new();
    for item in items {
        let value = eval::evaluate(&item.expression, &env)?;
        let name = item.alias.clone().unwrap_or_else(|| display_name(&item.expression));
        out.insert(name, value);
    }
    Ok(out)
}

/// Group every row into one bucket (this engine doesn't yet key aggregation
/// by the non-aggregate projected items — every query combining a grouping
/// key with an aggregate is expected to go through an explicit leading
/// `WITH` that isolates the key first; see DESIGN.md).
fn project_aggregated(rows: &[RowEnv], items: &[ReturnItem], params: &HashMap<String, PropertyValue>) -> EngineResult<Vec<RowEnv>> {
    let mut out = RowEnv::new();
    for item in items {
        let name = item.alias.clone().unwrap_or_else(|| display_name(&item.expression));
        let value = evaluate_aggregate(&item.expression, rows, params)?;
        out.insert(name, value);
    }
    Ok(vec![out])
}

fn evaluate_aggregate(expr: &Expression, rows: &[RowEnv], params: &HashMap<String, PropertyValue>) -> EngineResult<PropertyValue> {
    match expr {
        Expression::Function { name, args, distinct: _ } if matches!(name.to_ascii_lowercase().as_str(), "percentiledisc" | "percentilecont") => {
            evaluate_percentile(&name.to_ascii_lowercase(), args, rows, params)
        }
        Expression::Function { name, args, distinct } => {
            let lname = name.to_ascii_lowercase();
            if is_aggregate_name(&lname) {
                let arg = args.first();
                let mut values = Vec::with_capacity(rows.len());
                for row in rows {
                    let env = Env { params, variables: row.to_hashmap() };
                    let value = match arg {
                        Some(expr) => eval::evaluate(expr, &env)?,
                        None => PropertyValue::Integer(1),
                    };
                    values.push(value);
                }
                if *distinct {
                    dedupe_values(&mut values);
                }
                return Ok(apply_aggregate(&lname, values));
            }
            Err(EngineError::UnsupportedFeature(format!(
                "function `{}` cannot be mixed with an aggregate in this projection",
                name
            )))
        }
        other if !contains_aggregate(other) => {
            // A non-aggregate item alongside an aggregate one: Cypher would
            // treat it as an implicit grouping key. With a single combined
            // group, it must be constant across all rows.
            let env = Env { params, variables: rows.first().map(RowEnv::to_hashmap).unwrap_or_default() };
            eval::evaluate(other, &env)
        }
        _ => Err(EngineError::UnsupportedFeature(
            "nested aggregate expressions are not supported".to_string(),
        )),
    }
}

fn is_aggregate_name(name: &str) -> bool {
    matches!(
        name,
        "count" | "sum" | "avg" | "min" | "max" | "collect" | "percentiledisc" | "percentilecont"
    )
}

/// `percentileDisc`/`percentileCont` (spec.md §4.3.5) take two arguments: a
/// per-row value expression and a percentile fraction that is constant
/// across the group. The fraction is evaluated once, against the first row
/// (or no row, for an empty group) rather than per row like the other
/// aggregates' single argument.
fn evaluate_percentile(
    name: &str,
    args: &[Expression],
    rows: &[RowEnv],
    params: &HashMap<String, PropertyValue>,
) -> EngineResult<PropertyValue> {
    let (value_expr, pct_expr) = match args {
        [value_expr, pct_expr] => (value_expr, pct_expr),
        _ => {
            return Err(EngineError::TypeError(format!(
                "{} expects 2 arguments, got {}",
                name,
                args.len()
            )))
        }
    };

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let env = Env { params, variables: row.to_hashmap() };
        let value = eval::evaluate(value_expr, &env)?;
        if !matches!(value, PropertyValue::Null) {
            values.push(value);
        }
    }
    if values.is_empty() {
        return Ok(PropertyValue::Null);
    }
    values.sort_by(compare_values);

    let pct_env = Env { params, variables: rows.first().map(RowEnv::to_hashmap).unwrap_or_default() };
    let pct = as_f64_opt(&eval::evaluate(pct_expr, &pct_env)?).ok_or_else(|| {
        EngineError::TypeError(format!("{} requires a numeric percentile argument", name))
    })?;
    if !(0.0..=1.0).contains(&pct) {
        return Err(EngineError::TypeError(format!(
            "{} requires a percentile between 0.0 and 1.0, got {}",
            name, pct
        )));
    }

    let n = values.len();
    let pos = pct * (n - 1) as f64;
    if name == "percentiledisc" {
        let idx = pos.round().clamp(0.0, (n - 1) as f64) as usize;
        Ok(values[idx].clone())
    } else {
        let lo = pos.floor().clamp(0.0, (n - 1) as f64) as usize;
        let hi = pos.ceil().clamp(0.0, (n - 1) as f64) as usize;
        if lo == hi {
            Ok(PropertyValue::Float(as_f64_opt(&values[lo]).unwrap_or(0.0)))
        } else {
            let frac = pos - lo as f64;
            let lo_v = as_f64_opt(&values[lo]).unwrap_or(0.0);
            let hi_v = as_f64_opt(&values[hi]).unwrap_or(0.0);
            Ok(PropertyValue::Float(lo_v + (hi_v - lo_v) * frac))
        }
    }
}

fn contains_aggregate(expr: &Expression) -> bool {
    match expr {
        Expression::Function { name, args, .. } => {
            is_aggregate_name(&name.to_ascii_lowercase()) || args.iter().any(contains_aggregate)
        }
        Expression::Binary { left, right, .. } | Expression::Comparison { left, right, .. } | Expression::Logical { left, right, .. } => {
            contains_aggregate(left) || contains_aggregate(right)
        }
        Expression::Unary { operand, .. } | Expression::Not(operand) => contains_aggregate(operand),
        _ => false,
    }
}

fn apply_aggregate(name: &str, values: Vec<PropertyValue>) -> PropertyValue {
    match name {
        "count" => PropertyValue::Integer(values.iter().filter(|v| !matches!(v, PropertyValue::Null)).count() as i64),
        "collect" => PropertyValue::List(values.into_iter().filter(|v| !matches!(v, PropertyValue::Null)).collect()),
        "sum" => {
            let total: f64 = values.iter().filter_map(as_f64_opt).sum();
            if values.iter().all(|v| matches!(v, PropertyValue::Integer(_) | PropertyValue::Null)) {
                PropertyValue::Integer(total as i64)
            } else {
                PropertyValue::Float(total)
            }
        }
        "avg" => {
            let nums: Vec<f64> = values.iter().filter_map(as_f64_opt).collect();
            if nums.is_empty() {
                PropertyValue::Null
            } else {
                PropertyValue::Float(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        "min" => values
            .into_iter()
            .filter(|v| !matches!(v, PropertyValue::Null))
            .min_by(compare_values)
            .unwrap_or(PropertyValue::Null),
        "max" => values
            .into_iter()
            .filter(|v| !matches!(v, PropertyValue::Null))
            .max_by(compare_values)
            .unwrap_or(PropertyValue::Null),
        _ => PropertyValue::Null,
    }
}

fn as_f64_opt(v: &PropertyValue) -> Option<f64> {
    match v {
        PropertyValue::Integer(i) => Some(*i as f64),
        PropertyValue::Float(f) => Some(*f),
        _ => None,
    }
}

fn as_usize(v: &PropertyValue) -> EngineResult<usize> {
    match v {
        PropertyValue::Integer(i) if *i >= 0 => Ok(*i as usize),
        other => Err(EngineError::TypeError(format!("expected a non-negative integer, got {}", other))),
    }
}

fn truthy(v: &PropertyValue) -> bool {
    match v {
        PropertyValue::Boolean(b) => *b,
        PropertyValue::Null => false,
        _ => true,
    }
}

fn compare_values(a: &PropertyValue, b: &PropertyValue) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (PropertyValue::Integer(x), PropertyValue::Integer(y)) => x.cmp(y),
        (PropertyValue::Float(x), PropertyValue::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (PropertyValue::Integer(x), PropertyValue::Float(y)) => (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal),
        (PropertyValue::Float(x), PropertyValue::Integer(y)) => x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal),
        (PropertyValue::String(x), PropertyValue::String(y)) => x.cmp(y),
        (PropertyValue::Null, PropertyValue::Null) => Ordering::Equal,
        (PropertyValue::Null, _) => Ordering::Less,
        (_, PropertyValue::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn dedupe_values(values: &mut Vec<PropertyValue>) {
    let mut seen: Vec<Json> = Vec::new();
    values.retain(|v| {
        let json = v.to_json();
        if seen.contains(&json) {
            false
        } else {
            seen.push(json);
            true
        }
    });
}

fn dedupe_rowenvs(rows: &mut Vec<RowEnv>) {
    let mut seen: Vec<Vec<Json>> = Vec::new();
    rows.retain(|row| {
        let key: Vec<Json> = row.iter().map(|(_, v)| v.to_json()).collect();
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

fn dedupe_rows(rows: &mut Vec<Map<String, Json>>) {
    let mut seen: Vec<Json> = Vec::new();
    rows.retain(|row| {
        let json = Json::Object(row.clone());
        if seen.contains(&json) {
            false
        } else {
            seen.push(json);
            true
        }
    });
}

fn row_to_ordered(row: RowEnv) -> Map<String, Json> {
    let mut out = Map::new();
    for (key, value) in row.iter() {
        out.insert(key.clone(), value.to_json());
    }
    out
}

fn display_name(expr: &Expression) -> String {
    match expr {
        Expression::Variable(name) | Expression::PathVariable(name) => name.clone(),
        Expression::Property(base, prop) => format!("{}_{}", display_name(base), prop),
        Expression::Function { name, .. } => name.clone(),
        _ => "expr".to_string(),
    }
}

//! Built-in Cypher function and aggregate compilation (spec.md §4.3.5,
//! §4.3.7). Split out of `expr.rs` because the dispatch table is long, not
//! because the concern is different.

use crate::error::EngineError;
use crate::parser::ast::Expression;
use crate::translator::expr::{Compiled, ExprCompiler, ExprMode};
use crate::value::PropertyValue;

pub fn compile(
    compiler: &ExprCompiler,
    name: &str,
    args: &[Expression],
    distinct: bool,
    mode: ExprMode,
) -> Result<Compiled, EngineError> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "count" => compile_count(compiler, args, distinct),
        "sum" | "avg" | "min" | "max" => compile_simple_aggregate(compiler, &lower, args),
        "collect" => compile_collect(compiler, args, distinct),
        "percentilecont" | "percentiledisc" => {
            compile_percentile(compiler, &lower, args)
        }
        "coalesce" => compile_coalesce(compiler, args),
        "size" => compile_unary(compiler, args, |a| format!("json_array_length({})", a)),
        "head" => compile_unary(compiler, args, |a| format!("json_extract({}, '$[0]')", a)),
        "last" => compile_unary(compiler, args, |a| format!("json_extract({}, '$[#-1]')", a)),
        "tail" => compile_unary(compiler, args, |a| format!("json_remove({}, '$[0]')", a)),
        "reverse" => compile_reverse(compiler, args),
        "keys" => compile_keys(compiler, args),
        "labels" => compile_labels(compiler, args),
        "type" => compile_edge_field(compiler, args, "type"),
        "id" => compile_node_or_edge_field(compiler, args, "id"),
        "properties" => compile_unary(compiler, args, |a| format!("json({})", a)),
        "startnode" | "endnode" => Err(EngineError::UnsupportedFeature(format!(
            "{} requires relationship endpoint tracking not modeled on PropertyValue",
            name
        ))),
        "length" if args.len() == 1 && is_path_like(&args[0]) => compile_path_length(compiler, args),
        "length" => compile_unary(compiler, args, |a| format!("length({})", a)),
        "toupper" => compile_unary(compiler, args, |a| format!("upper({})", a)),
        "tolower" => compile_unary(compiler, args, |a| format!("lower({})", a)),
        "trim" => compile_unary(compiler, args, |a| format!("trim({})", a)),
        "ltrim" => compile_unary(compiler, args, |a| format!("ltrim({})", a)),
        "rtrim" => compile_unary(compiler, args, |a| format!("rtrim({})", a)),
        "left" => compile_binary_fn(compiler, args, |a, b| format!("substr({}, 1, {})", a, b)),
        "right" => compile_binary_fn(compiler, args, |a, b| format!("substr({}, -({}))", a, b)),
        "substring" => compile_substring(compiler, args),
        "replace" => compile_ternary_fn(compiler, args, |a, b, c| {
            format!("replace({}, {}, {})", a, b, c)
        }),
        "split" => compile_split(compiler, args),
        "range" => compile_range(compiler, args),
        "tostring" => compile_to_string(compiler, args),
        "tointeger" => compile_unary(compiler, args, |a| format!("CAST({} AS INTEGER)", a)),
        "tofloat" => compile_unary(compiler, args, |a| format!("CAST({} AS REAL)", a)),
        "toboolean" => compile_to_boolean(compiler, args),
        "abs" => compile_unary(compiler, args, |a| format!("ABS({})", a)),
        "round" => compile_unary(compiler, args, |a| format!("ROUND({})", a)),
        "floor" => compile_unary(compiler, args, |a| format!("FLOOR({})", a)),
        "ceil" => compile_unary(compiler, args, |a| format!("CEIL({})", a)),
        "sqrt" => compile_unary(compiler, args, |a| format!("SQRT({})", a)),
        "rand" => Err(EngineError::UnsupportedFeature(
            "rand() is non-deterministic and not supported".to_string(),
        )),
        "nodes" | "relationships" => compile_path_component(compiler, args, &lower),
        "date" => compile_date(compiler, args),
        "datetime" => compile_datetime(compiler, args),
        "timestamp" => compile_timestamp(args),
        _ => Err(EngineError::UnsupportedFeature(format!(
            "function {}()",
            name
        ))),
    }
    .map(|c| {
        // mode only affects property access within args, already handled by
        // the recursive compile calls at ExprMode::Scalar.
        let _ = mode;
        c
    })
}

fn compile_args(
    compiler: &ExprCompiler,
    args: &[Expression],
) -> Result<(Vec<String>, Vec<PropertyValue>), EngineError> {
    let mut sqls = Vec::with_capacity(args.len());
    let mut params = Vec::new();
    for arg in args {
        let c = compiler.compile(arg, ExprMode::Scalar)?;
        sqls.push(c.sql);
        params.extend(c.params);
    }
    Ok((sqls, params))
}

fn require_arity(args: &[Expression], n: usize, name: &str) -> Result<(), EngineError> {
    if args.len() != n {
        return Err(EngineError::TypeError(format!(
            "{} expects {} argument(s), got {}",
            name,
            n,
            args.len()
        )));
    }
    Ok(())
}

fn compile_unary(
    compiler: &ExprCompiler,
    args: &[Expression],
    f: impl FnOnce(&str) -> String,
) -> Result<Compiled, EngineError> {
    require_arity(args, 1, "this function")?;
    let (sqls, params) = compile_args(compiler, args)?;
    Ok(Compiled {
        sql: f(&sqls[0]),
        params,
    })
}

fn compile_binary_fn(
    compiler: &ExprCompiler,
    args: &[Expression],
    f: impl FnOnce(&str, &str) -> String,
) -> Result<Compiled, EngineError> {
    require_arity(args, 2, "this function")?;
    let (sqls, params) = compile_args(compiler, args)?;
    Ok(Compiled {
        sql: f(&sqls[0], &sqls[1]),
        params,
    })
}

fn compile_ternary_fn(
    compiler: &ExprCompiler,
    args: &[Expression],
    f: impl FnOnce(&str, &str, &str) -> String,
) -> Result<Compiled, EngineError> {
    require_arity(args, 3, "this function")?;
    let (sqls, params) = compile_args(compiler, args)?;
    Ok(Compiled {
        sql: f(&sqls[0], &sqls[1], &sqls[2]),
        params,
    })
}

fn compile_substring(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    if args.len() == 2 {
        compile_binary_fn(compiler, args, |a, b| format!("substr({}, ({}) + 1)", a, b))
    } else if args.len() == 3 {
        compile_ternary_fn(compiler, args, |a, b, c| {
            format!("substr({}, ({}) + 1, {})", a, b, c)
        })
    } else {
        Err(EngineError::TypeError(
            "substring expects 2 or 3 arguments".to_string(),
        ))
    }
}

fn compile_reverse(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    require_arity(args, 1, "reverse")?;
    let (sqls, params) = compile_args(compiler, args)?;
    let sql = format!(
        "(CASE WHEN json_valid({a}) AND json_type({a}) = 'array' THEN \
         (SELECT json_group_array(value) FROM (SELECT value FROM json_each({a}) ORDER BY key DESC)) \
         ELSE (SELECT group_concat(substr({a}, length({a}) - n + 1, 1), '') \
               FROM (WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < length({a})) SELECT n FROM seq)) \
         END)",
        a = sqls[0]
    );
    Ok(Compiled { sql, params })
}

fn compile_keys(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    require_arity(args, 1, "keys")?;
    let (sqls, params) = compile_args(compiler, args)?;
    let sql = format!(
        "(SELECT json_group_array(key) FROM json_each({}))",
        sqls[0]
    );
    Ok(Compiled { sql, params })
}

fn compile_labels(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    require_arity(args, 1, "labels")?;
    if let Expression::Variable(name) = &args[0] {
        if let Some(bound) = compiler.ctx.variables.get(name) {
            let sql = format!(
                "(CASE WHEN json_type({a}.label) = 'array' THEN {a}.label ELSE json_array({a}.label) END)",
                a = bound.alias
            );
            return Ok(Compiled::from_sql(sql));
        }
    }
    Err(EngineError::TypeError(
        "labels() requires a bound node variable".to_string(),
    ))
}

fn compile_edge_field(
    compiler: &ExprCompiler,
    args: &[Expression],
    field: &str,
) -> Result<Compiled, EngineError> {
    require_arity(args, 1, "type")?;
    if let Expression::Variable(name) = &args[0] {
        if let Some(bound) = compiler.ctx.variables.get(name) {
            return Ok(Compiled::from_sql(format!("{}.{}", bound.alias, field)));
        }
    }
    Err(EngineError::TypeError(
        "type() requires a bound relationship variable".to_string(),
    ))
}

fn compile_node_or_edge_field(
    compiler: &ExprCompiler,
    args: &[Expression],
    field: &str,
) -> Result<Compiled, EngineError> {
    require_arity(args, 1, "id")?;
    if let Expression::Variable(name) = &args[0] {
        if let Some(bound) = compiler.ctx.variables.get(name) {
            return Ok(Compiled::from_sql(format!("{}.{}", bound.alias, field)));
        }
    }
    Err(EngineError::TypeError(
        "id() requires a bound node or relationship variable".to_string(),
    ))
}

fn is_path_like(expr: &Expression) -> bool {
    matches!(expr, Expression::PathVariable(_))
}

fn compile_path_length(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    if let Expression::PathVariable(name) = &args[0] {
        let path = compiler
            .ctx
            .path_expressions
            .iter()
            .find(|p| &p.path_variable == name)
            .ok_or_else(|| EngineError::NameError(name.clone()))?;
        return Ok(Compiled::from_sql(format!("{}.depth", path.cte_name)));
    }
    unreachable!("guarded by is_path_like")
}

fn compile_path_component(
    compiler: &ExprCompiler,
    args: &[Expression],
    which: &str,
) -> Result<Compiled, EngineError> {
    require_arity(args, 1, which)?;
    if let Expression::PathVariable(name) = &args[0] {
        let path = compiler
            .ctx
            .path_expressions
            .iter()
            .find(|p| &p.path_variable == name)
            .ok_or_else(|| EngineError::NameError(name.clone()))?;
        let sql = if which == "nodes" {
            format!(
                "json_array(json_object('id',{s}.id,'label',{s}.label,'properties',json({s}.properties)),json_object('id',{e}.id,'label',{e}.label,'properties',json({e}.properties)))",
                s = path.start_alias,
                e = path.end_alias
            )
        } else {
            format!("json_array({}.edge_ids)", path.cte_name)
        };
        return Ok(Compiled::from_sql(sql));
    }
    Err(EngineError::TypeError(format!(
        "{}() requires a bound path variable",
        which
    )))
}

fn compile_split(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    require_arity(args, 2, "split")?;
    let (sqls, params) = compile_args(compiler, args)?;
    let sql = format!(
        "(WITH RECURSIVE parts(chunk, rest) AS ( \
           SELECT '', {a} || {sep} \
           UNION ALL \
           SELECT substr(rest, 1, instr(rest, {sep}) - 1), substr(rest, instr(rest, {sep}) + length({sep})) \
           FROM parts WHERE rest != '' \
         ) SELECT json_group_array(chunk) FROM parts WHERE chunk != '' OR rest != {a})",
        a = sqls[0],
        sep = sqls[1],
    );
    Ok(Compiled { sql, params })
}

fn compile_range(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EngineError::TypeError(
            "range expects 2 or 3 arguments".to_string(),
        ));
    }
    let (sqls, params) = compile_args(compiler, args)?;
    let step = sqls.get(2).cloned().unwrap_or_else(|| "1".to_string());
    let sql = format!(
        "(WITH RECURSIVE seq(v) AS ( \
           SELECT {start} \
           UNION ALL \
           SELECT v + ({step}) FROM seq WHERE ({step}) > 0 AND v + ({step}) <= {end} \
                                         OR ({step}) < 0 AND v + ({step}) >= {end} \
         ) SELECT json_group_array(v) FROM seq)",
        start = sqls[0],
        end = sqls[1],
        step = step,
    );
    Ok(Compiled { sql, params })
}

/// `date()` / `date(expr)`: an epoch-millis integer or an ISO-8601 string
/// both coerce to sqlite's `date()`; no-arg form is the current UTC date.
fn compile_date(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    if args.is_empty() {
        return Ok(Compiled::from_sql("date('now')"));
    }
    require_arity(args, 1, "date")?;
    let (sqls, params) = compile_args(compiler, args)?;
    let sql = format!(
        "(CASE WHEN typeof({a}) IN ('integer', 'real') THEN date({a} / 1000.0, 'unixepoch') ELSE date({a}) END)",
        a = sqls[0]
    );
    Ok(Compiled { sql, params })
}

/// `datetime()` / `datetime(expr)`: same coercion as [`compile_date`] but
/// preserving the time-of-day component.
fn compile_datetime(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    if args.is_empty() {
        return Ok(Compiled::from_sql("datetime('now')"));
    }
    require_arity(args, 1, "datetime")?;
    let (sqls, params) = compile_args(compiler, args)?;
    let sql = format!(
        "(CASE WHEN typeof({a}) IN ('integer', 'real') THEN datetime({a} / 1000.0, 'unixepoch') ELSE datetime({a}) END)",
        a = sqls[0]
    );
    Ok(Compiled { sql, params })
}

/// `timestamp()`: current wall-clock time as epoch milliseconds, matching
/// the millisecond-epoch integers `date()`/`datetime()` accept back in.
fn compile_timestamp(args: &[Expression]) -> Result<Compiled, EngineError> {
    require_arity(args, 0, "timestamp")?;
    Ok(Compiled::from_sql(
        "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)",
    ))
}

fn compile_to_string(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    require_arity(args, 1, "toString")?;
    let (sqls, params) = compile_args(compiler, args)?;
    let sql = format!(
        "(CASE WHEN {a} IN (0, 1) AND typeof({a}) = 'integer' THEN (CASE {a} WHEN 1 THEN 'true' ELSE 'false' END) ELSE CAST({a} AS TEXT) END)",
        a = sqls[0]
    );
    Ok(Compiled { sql, params })
}

fn compile_to_boolean(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    require_arity(args, 1, "toBoolean")?;
    let (sqls, params) = compile_args(compiler, args)?;
    let sql = format!(
        "(CASE lower(CAST({a} AS TEXT)) WHEN 'true' THEN 1 WHEN 'false' THEN 0 ELSE NULL END)",
        a = sqls[0]
    );
    Ok(Compiled { sql, params })
}

fn compile_coalesce(compiler: &ExprCompiler, args: &[Expression]) -> Result<Compiled, EngineError> {
    if args.is_empty() {
        return Err(EngineError::TypeError(
            "coalesce requires at least one argument".to_string(),
        ));
    }
    let (sqls, params) = compile_args(compiler, args)?;
    Ok(Compiled {
        sql: format!("COALESCE({})", sqls.join(", ")),
        params,
    })
}

fn compile_count(
    compiler: &ExprCompiler,
    args: &[Expression],
    distinct: bool,
) -> Result<Compiled, EngineError> {
    if args.len() == 1 && matches!(&args[0], Expression::Variable(v) if v == "*") {
        return Ok(Compiled::from_sql("COUNT(*)"));
    }
    require_arity(args, 1, "count")?;
    let (sqls, params) = compile_args(compiler, args)?;
    let sql = if distinct {
        format!("COUNT(DISTINCT {})", sqls[0])
    } else {
        format!("COUNT({})", sqls[0])
    };
    Ok(Compiled { sql, params })
}

fn compile_simple_aggregate(
    compiler: &ExprCompiler,
    name: &str,
    args: &[Expression],
) -> Result<Compiled, EngineError> {
    require_arity(args, 1, name)?;
    let (sqls, params) = compile_args(compiler, args)?;
    let fn_name = match name {
        "sum" => "SUM",
        "avg" => "AVG",
        "min" => "MIN",
        "max" => "MAX",
        _ => unreachable!(),
    };
    Ok(Compiled {
        sql: format!("{}({})", fn_name, sqls[0]),
        params,
    })
}

/// `collect(x)` aggregates into a JSON array; `collect(DISTINCT x)` relies on
/// sqlite's standard `DISTINCT` aggregate modifier applying to `json_group_array`.
fn compile_collect(
    compiler: &ExprCompiler,
    args: &[Expression],
    distinct: bool,
) -> Result<Compiled, EngineError> {
    require_arity(args, 1, "collect")?;
    let (sqls, params) = compile_args(compiler, args)?;
    let sql = if distinct {
        // sqlite's `json_group_array` doesn't accept `DISTINCT`; build the
        // distinct list via `GROUP_CONCAT(DISTINCT ...)` over json-quoted
        // elements instead, then parse the `[e1,e2,...]`-shaped text back
        // into a JSON array.
        format!(
            "json('[' || COALESCE(GROUP_CONCAT(DISTINCT json_quote({})), '') || ']')",
            sqls[0]
        )
    } else {
        format!("json_group_array({})", sqls[0])
    };
    Ok(Compiled { sql, params })
}

/// `percentileCont`/`percentileDisc` have no native sqlite aggregate; built
/// from `json_group_array(value ORDER BY value)` (sqlite's aggregate-function
/// `ORDER BY` clause) sorting the whole matched group, then indexed. Discrete
/// picks the nearest-rank element (`ROUND(p*(n-1))`); continuous linearly
/// interpolates between the floor and ceil ranks (spec.md §4.3.5).
fn compile_percentile(
    compiler: &ExprCompiler,
    name: &str,
    args: &[Expression],
) -> Result<Compiled, EngineError> {
    require_arity(args, 2, name)?;
    let (sqls, params) = compile_args(compiler, args)?;
    let value_sql = &sqls[0];
    let pct_sql = &sqls[1];
    let sorted = format!("json_group_array({v} ORDER BY {v})", v = value_sql);
    let pos = format!("(({pct}) * (json_array_length({sorted}) - 1))", pct = pct_sql, sorted = sorted);
    let sql = if name == "percentiledisc" {
        format!(
            "json_extract({sorted}, '$[' || CAST(ROUND({pos}) AS INTEGER) || ']')",
            sorted = sorted,
            pos = pos
        )
    } else {
        let lo = format!("CAST(FLOOR({pos}) AS INTEGER)", pos = pos);
        let hi = format!("CAST(CEIL({pos}) AS INTEGER)", pos = pos);
        let frac = format!("({pos} - FLOOR({pos}))", pos = pos);
        let lo_val = format!("json_extract({sorted}, '$[' || {lo} || ']')", sorted = sorted, lo = lo);
        let hi_val = format!("json_extract({sorted}, '$[' || {hi} || ']')", sorted = sorted, hi = hi);
        format!("({lo_val} + ({hi_val} - {lo_val}) * {frac})", lo_val = lo_val, hi_val = hi_val, frac = frac)
    };
    Ok(Compiled { sql, params })
}

impl Compiled {
    pub(crate) fn from_sql(sql: impl Into<String>) -> Self {
        Compiled {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::context::TranslatorContext;
    use std::collections::HashMap;

    fn compile_top(name: &str, args: &[Expression], distinct: bool) -> Compiled {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        compile(&compiler, name, args, distinct, ExprMode::Scalar).unwrap()
    }

    fn int(i: i64) -> Expression {
        Expression::Literal(crate::parser::ast::Literal::Integer(i))
    }

    #[test]
    fn count_star_bypasses_arity_check() {
        let compiled = compile_top("count", &[Expression::Variable("*".to_string())], false);
        assert_eq!(compiled.sql, "COUNT(*)");
    }

    #[test]
    fn count_distinct_wraps_argument() {
        let compiled = compile_top("count", &[int(1)], true);
        assert_eq!(compiled.sql, "COUNT(DISTINCT ?)");
    }

    #[test]
    fn sum_avg_min_max_dispatch_to_matching_sql_aggregate() {
        assert_eq!(compile_top("sum", &[int(1)], false).sql, "SUM(?)");
        assert_eq!(compile_top("avg", &[int(1)], false).sql, "AVG(?)");
        assert_eq!(compile_top("min", &[int(1)], false).sql, "MIN(?)");
        assert_eq!(compile_top("max", &[int(1)], false).sql, "MAX(?)");
    }

    #[test]
    fn collect_plain_uses_json_group_array() {
        let compiled = compile_top("collect", &[int(1)], false);
        assert_eq!(compiled.sql, "json_group_array(?)");
    }

    #[test]
    fn collect_distinct_avoids_json_group_arrays_missing_distinct_support() {
        let compiled = compile_top("collect", &[int(1)], true);
        assert!(compiled.sql.contains("GROUP_CONCAT(DISTINCT"));
        assert!(!compiled.sql.contains("json_group_array"));
    }

    #[test]
    fn percentile_disc_rounds_to_nearest_rank() {
        let compiled = compile_top("percentileDisc", &[int(1), int(0)], false);
        assert!(compiled.sql.contains("ROUND("));
        assert!(compiled.sql.contains("json_group_array(? ORDER BY ?)"));
    }

    #[test]
    fn percentile_cont_interpolates_between_floor_and_ceil() {
        let compiled = compile_top("percentileCont", &[int(1), int(0)], false);
        assert!(compiled.sql.contains("FLOOR("));
        assert!(compiled.sql.contains("CEIL("));
        assert!(!compiled.sql.contains("ROUND("));
    }

    #[test]
    fn percentile_requires_exactly_two_arguments() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let err = compile(&compiler, "percentileDisc", &[int(1)], false, ExprMode::Scalar).unwrap_err();
        assert!(matches!(err, EngineError::TypeError(_)));
    }

    #[test]
    fn unknown_function_is_unsupported() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let err = compile(&compiler, "frobnicate", &[], false, ExprMode::Scalar).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFeature(_)));
    }

    #[test]
    fn rand_is_rejected_as_nondeterministic() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let err = compile(&compiler, "rand", &[], false, ExprMode::Scalar).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFeature(_)));
    }

    #[test]
    fn substring_with_two_args_skips_the_length_clause() {
        let compiled = compile_top("substring", &[int(1), int(2)], false);
        assert_eq!(compiled.sql, "substr(?, (?) + 1)");
    }

    #[test]
    fn coalesce_joins_every_argument() {
        let compiled = compile_top("coalesce", &[int(1), int(2), int(3)], false);
        assert_eq!(compiled.sql, "COALESCE(?, ?, ?)");
    }

    #[test]
    fn coalesce_requires_at_least_one_argument() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let err = compile(&compiler, "coalesce", &[], false, ExprMode::Scalar).unwrap_err();
        assert!(matches!(err, EngineError::TypeError(_)));
    }

    #[test]
    fn timestamp_takes_no_arguments() {
        let compiled = compile_top("timestamp", &[], false);
        assert!(compiled.sql.contains("julianday('now')"));
    }

    #[test]
    fn date_with_no_arguments_is_the_current_date() {
        let compiled = compile_top("date", &[], false);
        assert_eq!(compiled.sql, "date('now')");
    }
}

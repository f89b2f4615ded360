//! In-process expression evaluation against a variable environment.
//!
//! Most expressions are compiled to SQL by the translator (§4.3.5). This
//! module covers the procedural slivers the executor needs to run without a
//! round-trip through SQL: resolving a CREATE/MERGE property map against
//! already-bound variables, iterating an UNWIND source's Cartesian product,
//! evaluating a collected list's index expression (`L[expr]`, including
//! negative indices), and computing aggregates over captured per-row values
//! in the general multi-phase strategy (§4.4, step c).

use crate::error::EngineError;
use crate::parser::ast::{BinaryOp, Expression, Literal, UnaryOp};
use crate::value::PropertyValue;
use std::collections::HashMap;

pub struct Env<'a> {
    pub params: &'a HashMap<String, PropertyValue>,
    pub variables: HashMap<String, PropertyValue>,
}

impl<'a> Env<'a> {
    pub fn new(params: &'a HashMap<String, PropertyValue>) -> Self {
        Env {
            params,
            variables: HashMap::new(),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.variables.insert(name.into(), value);
    }
}

/// A captured node/edge value carries its actual properties nested under a
/// `properties` key alongside structural fields (`id`, `label`/`type`); a
/// plain `{...}` object literal has no such wrapper. Property access and
/// `keys()` need to see through the wrapper for the former but not the
/// latter.
fn is_entity_map(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    map.contains_key("properties") && (map.contains_key("label") || map.contains_key("type"))
}

fn properties_of_map(
    map: &serde_json::Map<String, serde_json::Value>,
) -> &serde_json::Map<String, serde_json::Value> {
    if is_entity_map(map) {
        match map.get("properties") {
            Some(serde_json::Value::Object(props)) => props,
            _ => map,
        }
    } else {
        map
    }
}

pub fn evaluate(expr: &Expression, env: &Env) -> Result<PropertyValue, EngineError> {
    match expr {
        Expression::Literal(lit) => Ok(literal_to_value(lit)),
        Expression::Parameter(name) => env
            .params
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NameError(format!("${}", name))),
        Expression::Variable(name) => env
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NameError(name.clone())),
        Expression::PathVariable(name) => env
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NameError(name.clone())),
        Expression::Property(base, prop) => {
            let base_val = evaluate(base, env)?;
            match base_val {
                PropertyValue::Map(map) => {
                    let source = properties_of_map(&map);
                    Ok(source
                        .get(prop)
                        .map(PropertyValue::from_json)
                        .unwrap_or(PropertyValue::Null))
                }
                PropertyValue::Null => Ok(PropertyValue::Null),
                _ => Err(EngineError::TypeError(format!(
                    "cannot access property `{}` on a non-map value",
                    prop
                ))),
            }
        }
        Expression::Index(base, index) => {
            let base_val = evaluate(base, env)?;
            let index_val = evaluate(index, env)?;
            let idx = match index_val {
                PropertyValue::Integer(i) => i,
                other => {
                    return Err(EngineError::TypeError(format!(
                        "index must be an integer, got {}",
                        other
                    )))
                }
            };
            match base_val {
                PropertyValue::List(items) => {
                    let len = items.len() as i64;
                    let resolved = if idx < 0 { len + idx } else { idx };
                    if resolved < 0 || resolved >= len {
                        Ok(PropertyValue::Null)
                    } else {
                        Ok(items[resolved as usize].clone())
                    }
                }
                PropertyValue::Null => Ok(PropertyValue::Null),
                other => Err(EngineError::TypeError(format!(
                    "cannot index into {}",
                    other
                ))),
            }
        }
        Expression::Unary { op, operand } => {
            let v = evaluate(operand, env)?;
            match op {
                UnaryOp::Negate => negate(v),
            }
        }
        Expression::Binary { op, left, right } => {
            let l = evaluate(left, env)?;
            let r = evaluate(right, env)?;
            apply_binary(*op, l, r)
        }
        Expression::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(evaluate(item, env)?);
            }
            Ok(PropertyValue::List(out))
        }
        Expression::Object(pairs) => {
            let mut map = serde_json::Map::new();
            for (key, value) in pairs {
                let v = evaluate(value, env)?;
                map.insert(key.clone(), v.to_json());
            }
            Ok(PropertyValue::Map(map))
        }
        Expression::Case {
            subject,
            whens,
            else_branch,
        } => {
            let subject_val = match subject {
                Some(s) => Some(evaluate(s, env)?),
                None => None,
            };
            for when in whens {
                let matched = match &subject_val {
                    Some(sv) => {
                        let wv = evaluate(&when.when, env)?;
                        values_equal(sv, &wv)
                    }
                    None => truthy(&evaluate(&when.when, env)?),
                };
                if matched {
                    return evaluate(&when.then, env);
                }
            }
            match else_branch {
                Some(e) => evaluate(e, env),
                None => Ok(PropertyValue::Null),
            }
        }
        Expression::Function {
            name,
            args,
            distinct: _,
        } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, env)?);
            }
            call_function(name, values)
        }
        Expression::Comparison { op, left, right } => {
            let l = evaluate(left, env)?;
            let r = evaluate(right, env)?;
            Ok(PropertyValue::Boolean(compare(*op, &l, &r)))
        }
        Expression::Logical { op, left, right } => {
            let l = truthy(&evaluate(left, env)?);
            match op {
                crate::parser::ast::LogicalOp::And => {
                    if !l {
                        Ok(PropertyValue::Boolean(false))
                    } else {
                        Ok(PropertyValue::Boolean(truthy(&evaluate(right, env)?)))
                    }
                }
                crate::parser::ast::LogicalOp::Or => {
                    if l {
                        Ok(PropertyValue::Boolean(true))
                    } else {
                        Ok(PropertyValue::Boolean(truthy(&evaluate(right, env)?)))
                    }
                }
            }
        }
        Expression::Not(operand) => Ok(PropertyValue::Boolean(!truthy(&evaluate(operand, env)?))),
        Expression::IsNull { operand, negated } => {
            let is_null = matches!(evaluate(operand, env)?, PropertyValue::Null);
            Ok(PropertyValue::Boolean(is_null != *negated))
        }
        Expression::In { left, list } => {
            let l = evaluate(left, env)?;
            let list_val = evaluate(list, env)?;
            match list_val {
                PropertyValue::List(items) => {
                    Ok(PropertyValue::Boolean(items.iter().any(|v| values_equal(v, &l))))
                }
                _ => Ok(PropertyValue::Boolean(false)),
            }
        }
        Expression::StringMatch { op, left, right } => {
            let l = evaluate(left, env)?;
            let r = evaluate(right, env)?;
            let (PropertyValue::String(ls), PropertyValue::String(rs)) = (&l, &r) else {
                return Ok(PropertyValue::Boolean(false));
            };
            let matched = match op {
                crate::parser::ast::StringMatchOp::Contains => ls.contains(rs.as_str()),
                crate::parser::ast::StringMatchOp::StartsWith => ls.starts_with(rs.as_str()),
                crate::parser::ast::StringMatchOp::EndsWith => ls.ends_with(rs.as_str()),
            };
            Ok(PropertyValue::Boolean(matched))
        }
        Expression::ListComprehension {
            variable,
            source,
            filter,
            map,
        } => {
            let source_val = evaluate(source, env)?;
            let items = match source_val {
                PropertyValue::List(items) => items,
                _ => return Err(EngineError::TypeError("list comprehension source must be a list".into())),
            };
            let mut out = Vec::new();
            for item in items {
                let mut scoped = Env {
                    params: env.params,
                    variables: env.variables.clone(),
                };
                scoped.bind(variable.clone(), item.clone());
                if let Some(f) = filter {
                    if !truthy(&evaluate(f, &scoped)?) {
                        continue;
                    }
                }
                match map {
                    Some(m) => out.push(evaluate(m, &scoped)?),
                    None => out.push(item),
                }
            }
            Ok(PropertyValue::List(out))
        }
        Expression::ListPredicate {
            kind,
            variable,
            source,
            filter,
        } => {
            let source_val = evaluate(source, env)?;
            let items = match source_val {
                PropertyValue::List(items) => items,
                _ => return Err(EngineError::TypeError("list predicate source must be a list".into())),
            };
            let mut matches = 0usize;
            for item in &items {
                let mut scoped = Env {
                    params: env.params,
                    variables: env.variables.clone(),
                };
                scoped.bind(variable.clone(), item.clone());
                if truthy(&evaluate(filter, &scoped)?) {
                    matches += 1;
                }
            }
            use crate::parser::ast::ListPredicateKind::*;
            let result = match kind {
                All => matches == items.len(),
                Any => matches > 0,
                None => matches == 0,
                Single => matches == 1,
            };
            Ok(PropertyValue::Boolean(result))
        }
        Expression::Exists(_) => Err(EngineError::UnsupportedFeature(
            "EXISTS(pattern) cannot be evaluated in-process; it is translated to SQL".into(),
        )),
    }
}

fn literal_to_value(lit: &Literal) -> PropertyValue {
    match lit {
        Literal::String(s) => PropertyValue::String(s.clone()),
        Literal::Integer(i) => PropertyValue::Integer(*i),
        Literal::Float(f) => PropertyValue::Float(*f),
        Literal::Boolean(b) => PropertyValue::Boolean(*b),
        Literal::Null => PropertyValue::Null,
    }
}

fn negate(v: PropertyValue) -> Result<PropertyValue, EngineError> {
    match v {
        PropertyValue::Integer(i) => Ok(PropertyValue::Integer(-i)),
        PropertyValue::Float(f) => Ok(PropertyValue::Float(-f)),
        other => Err(EngineError::TypeError(format!("cannot negate {}", other))),
    }
}

fn truthy(v: &PropertyValue) -> bool {
    match v {
        PropertyValue::Boolean(b) => *b,
        PropertyValue::Null => false,
        _ => true,
    }
}

pub fn values_equal(a: &PropertyValue, b: &PropertyValue) -> bool {
    a.to_json() == b.to_json()
}

fn compare(op: crate::parser::ast::CompareOp, l: &PropertyValue, r: &PropertyValue) -> bool {
    use crate::parser::ast::CompareOp::*;
    if matches!(op, Eq) {
        return values_equal(l, r);
    }
    if matches!(op, Neq) {
        return !values_equal(l, r);
    }
    let ord = match (l, r) {
        (PropertyValue::Integer(a), PropertyValue::Integer(b)) => a.partial_cmp(b),
        (PropertyValue::Float(a), PropertyValue::Float(b)) => a.partial_cmp(b),
        (PropertyValue::Integer(a), PropertyValue::Float(b)) => (*a as f64).partial_cmp(b),
        (PropertyValue::Float(a), PropertyValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (PropertyValue::String(a), PropertyValue::String(b)) => a.partial_cmp(b),
        _ => None,
    };
    match (op, ord) {
        (Lt, Some(o)) => o.is_lt(),
        (Gt, Some(o)) => o.is_gt(),
        (Lte, Some(o)) => o.is_le(),
        (Gte, Some(o)) => o.is_ge(),
        _ => false,
    }
}

fn apply_binary(
    op: BinaryOp,
    l: PropertyValue,
    r: PropertyValue,
) -> Result<PropertyValue, EngineError> {
    // Lists overload `+` as concatenation (spec.md §4.3.5).
    if matches!(op, BinaryOp::Add) {
        if let (PropertyValue::List(mut a), PropertyValue::List(b)) = (l.clone(), r.clone()) {
            a.extend(b);
            return Ok(PropertyValue::List(a));
        }
        if let PropertyValue::String(a) = &l {
            if let PropertyValue::String(b) = &r {
                return Ok(PropertyValue::String(format!("{}{}", a, b)));
            }
        }
    }
    let (a, b) = (as_f64(&l)?, as_f64(&r)?);
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::Pow => a.powf(b),
    };
    if matches!(l, PropertyValue::Integer(_)) && matches!(r, PropertyValue::Integer(_)) && !matches!(op, BinaryOp::Div | BinaryOp::Pow)
    {
        Ok(PropertyValue::Integer(result as i64))
    } else {
        Ok(PropertyValue::Float(result))
    }
}

fn as_f64(v: &PropertyValue) -> Result<f64, EngineError> {
    match v {
        PropertyValue::Integer(i) => Ok(*i as f64),
        PropertyValue::Float(f) => Ok(*f),
        other => Err(EngineError::TypeError(format!(
            "expected a number, got {}",
            other
        ))),
    }
}

/// Small registry covering the scalar/list/string/coercion functions the
/// executor needs in-process (aggregate functions are handled separately by
/// the executor's aggregate step, not here).
fn call_function(name: &str, args: Vec<PropertyValue>) -> Result<PropertyValue, EngineError> {
    let lname = name.to_ascii_lowercase();
    match lname.as_str() {
        "coalesce" => Ok(args
            .into_iter()
            .find(|v| !matches!(v, PropertyValue::Null))
            .unwrap_or(PropertyValue::Null)),
        "size" => match args.into_iter().next() {
            Some(PropertyValue::List(items)) => Ok(PropertyValue::Integer(items.len() as i64)),
            Some(PropertyValue::String(s)) => Ok(PropertyValue::Integer(s.chars().count() as i64)),
            _ => Ok(PropertyValue::Null),
        },
        "head" => match args.into_iter().next() {
            Some(PropertyValue::List(items)) => Ok(items.into_iter().next().unwrap_or(PropertyValue::Null)),
            _ => Ok(PropertyValue::Null),
        },
        "last" => match args.into_iter().next() {
            Some(PropertyValue::List(items)) => Ok(items.into_iter().last().unwrap_or(PropertyValue::Null)),
            _ => Ok(PropertyValue::Null),
        },
        "tail" => match args.into_iter().next() {
            Some(PropertyValue::List(items)) => {
                Ok(PropertyValue::List(items.into_iter().skip(1).collect()))
            }
            _ => Ok(PropertyValue::Null),
        },
        "reverse" => match args.into_iter().next() {
            Some(PropertyValue::List(mut items)) => {
                items.reverse();
                Ok(PropertyValue::List(items))
            }
            Some(PropertyValue::String(s)) => Ok(PropertyValue::String(s.chars().rev().collect())),
            _ => Ok(PropertyValue::Null),
        },
        "keys" => match args.into_iter().next() {
            Some(PropertyValue::Map(map)) => Ok(PropertyValue::List(
                properties_of_map(&map)
                    .keys()
                    .map(|k| PropertyValue::String(k.clone()))
                    .collect(),
            )),
            _ => Ok(PropertyValue::List(vec![])),
        },
        "labels" => match args.into_iter().next() {
            Some(PropertyValue::Map(map)) if map.contains_key("label") => {
                let label = map.get("label").cloned().unwrap_or(serde_json::Value::Null);
                Ok(PropertyValue::from_json(&crate::translator::label::normalize_label_value(label)))
            }
            Some(PropertyValue::Map(map)) if map.contains_key("type") => Err(EngineError::TypeError(
                "labels() requires a node, not a relationship".to_string(),
            )),
            Some(PropertyValue::Null) => Ok(PropertyValue::Null),
            _ => Err(EngineError::TypeError(
                "labels() requires a bound node".to_string(),
            )),
        },
        "type" => match args.into_iter().next() {
            Some(PropertyValue::Map(map)) if map.contains_key("type") => Ok(
                PropertyValue::from_json(map.get("type").unwrap_or(&serde_json::Value::Null)),
            ),
            Some(PropertyValue::Map(map)) if map.contains_key("label") => Err(EngineError::TypeError(
                "type() requires a relationship, not a node".to_string(),
            )),
            Some(PropertyValue::Null) => Ok(PropertyValue::Null),
            _ => Err(EngineError::TypeError(
                "type() requires a bound relationship".to_string(),
            )),
        },
        "id" => match args.into_iter().next() {
            Some(PropertyValue::Map(map)) => Ok(map
                .get("id")
                .map(PropertyValue::from_json)
                .unwrap_or(PropertyValue::Null)),
            Some(PropertyValue::Null) => Ok(PropertyValue::Null),
            _ => Err(EngineError::TypeError(
                "id() requires a bound node or relationship".to_string(),
            )),
        },
        "properties" => match args.into_iter().next() {
            Some(PropertyValue::Map(map)) => Ok(PropertyValue::from_json(
                &serde_json::Value::Object(properties_of_map(&map).clone()),
            )),
            Some(PropertyValue::Null) => Ok(PropertyValue::Null),
            _ => Err(EngineError::TypeError(
                "properties() requires a bound node or relationship".to_string(),
            )),
        },
        "nodes" => match args.into_iter().next() {
            Some(PropertyValue::Map(map)) if map.contains_key("nodes") => Ok(map
                .get("nodes")
                .map(PropertyValue::from_json)
                .unwrap_or(PropertyValue::Null)),
            _ => Err(EngineError::TypeError(
                "nodes() requires a bound path variable".to_string(),
            )),
        },
        "relationships" => match args.into_iter().next() {
            Some(PropertyValue::Map(map)) if map.contains_key("edges") => Ok(map
                .get("edges")
                .map(PropertyValue::from_json)
                .unwrap_or(PropertyValue::Null)),
            Some(PropertyValue::Map(map)) if map.contains_key("nodes") => {
                // Variable-length paths capture endpoints and length only
                // (spec.md §4.3.6); intermediate edges aren't materialized.
                Ok(PropertyValue::List(vec![]))
            }
            _ => Err(EngineError::TypeError(
                "relationships() requires a bound path variable".to_string(),
            )),
        },
        "length" => match args.into_iter().next() {
            Some(PropertyValue::Map(map)) if map.contains_key("length") => Ok(map
                .get("length")
                .map(PropertyValue::from_json)
                .unwrap_or(PropertyValue::Null)),
            Some(PropertyValue::List(items)) => Ok(PropertyValue::Integer(items.len() as i64)),
            Some(PropertyValue::String(s)) => Ok(PropertyValue::Integer(s.chars().count() as i64)),
            _ => Ok(PropertyValue::Null),
        },
        "toupper" => string_fn(args, |s| s.to_uppercase()),
        "tolower" => string_fn(args, |s| s.to_lowercase()),
        "trim" => string_fn(args, |s| s.trim().to_string()),
        "ltrim" => string_fn(args, |s| s.trim_start().to_string()),
        "rtrim" => string_fn(args, |s| s.trim_end().to_string()),
        "left" => {
            let mut it = args.into_iter();
            let s = expect_string(it.next())?;
            let n = expect_int(it.next())? as usize;
            Ok(PropertyValue::String(s.chars().take(n).collect()))
        }
        "right" => {
            let mut it = args.into_iter();
            let s = expect_string(it.next())?;
            let n = expect_int(it.next())? as usize;
            let chars: Vec<char> = s.chars().collect();
            let start = chars.len().saturating_sub(n);
            Ok(PropertyValue::String(chars[start..].iter().collect()))
        }
        "substring" => {
            let mut it = args.into_iter();
            let s = expect_string(it.next())?;
            let start = expect_int(it.next())? as usize;
            let chars: Vec<char> = s.chars().collect();
            let len = match it.next() {
                Some(v) => as_i64(&v)? as usize,
                None => chars.len().saturating_sub(start),
            };
            let end = (start + len).min(chars.len());
            let start = start.min(chars.len());
            Ok(PropertyValue::String(chars[start..end].iter().collect()))
        }
        "replace" => {
            let mut it = args.into_iter();
            let s = expect_string(it.next())?;
            let from = expect_string(it.next())?;
            let to = expect_string(it.next())?;
            Ok(PropertyValue::String(s.replace(&from, &to)))
        }
        "split" => {
            let mut it = args.into_iter();
            let s = expect_string(it.next())?;
            let delim = expect_string(it.next())?;
            Ok(PropertyValue::List(
                s.split(delim.as_str())
                    .map(|p| PropertyValue::String(p.to_string()))
                    .collect(),
            ))
        }
        "range" => {
            let mut it = args.into_iter();
            let start = expect_int(it.next())?;
            let end = expect_int(it.next())?;
            let step = match it.next() {
                Some(v) => as_i64(&v)?,
                None => 1,
            };
            let mut out = Vec::new();
            if step > 0 {
                let mut i = start;
                while i <= end {
                    out.push(PropertyValue::Integer(i));
                    i += step;
                }
            } else if step < 0 {
                let mut i = start;
                while i >= end {
                    out.push(PropertyValue::Integer(i));
                    i += step;
                }
            }
            Ok(PropertyValue::List(out))
        }
        "tostring" => match args.into_iter().next() {
            Some(PropertyValue::Boolean(b)) => Ok(PropertyValue::String(b.to_string())),
            Some(PropertyValue::String(s)) => Ok(PropertyValue::String(s)),
            Some(PropertyValue::Integer(i)) => Ok(PropertyValue::String(i.to_string())),
            Some(PropertyValue::Float(f)) => Ok(PropertyValue::String(f.to_string())),
            Some(PropertyValue::Null) | Option::None => Ok(PropertyValue::Null),
            _ => Err(EngineError::TypeError("toString on unsupported value".into())),
        },
        "tointeger" => match args.into_iter().next() {
            Some(PropertyValue::Integer(i)) => Ok(PropertyValue::Integer(i)),
            Some(PropertyValue::Float(f)) => Ok(PropertyValue::Integer(f as i64)),
            Some(PropertyValue::String(s)) => Ok(s
                .trim()
                .parse::<i64>()
                .map(PropertyValue::Integer)
                .unwrap_or(PropertyValue::Null)),
            _ => Ok(PropertyValue::Null),
        },
        "tofloat" => match args.into_iter().next() {
            Some(PropertyValue::Integer(i)) => Ok(PropertyValue::Float(i as f64)),
            Some(PropertyValue::Float(f)) => Ok(PropertyValue::Float(f)),
            Some(PropertyValue::String(s)) => Ok(s
                .trim()
                .parse::<f64>()
                .map(PropertyValue::Float)
                .unwrap_or(PropertyValue::Null)),
            _ => Ok(PropertyValue::Null),
        },
        "toboolean" => match args.into_iter().next() {
            Some(PropertyValue::Boolean(b)) => Ok(PropertyValue::Boolean(b)),
            Some(PropertyValue::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(PropertyValue::Boolean(true)),
                "false" => Ok(PropertyValue::Boolean(false)),
                _ => Ok(PropertyValue::Null),
            },
            _ => Ok(PropertyValue::Null),
        },
        "abs" => match args.into_iter().next() {
            Some(PropertyValue::Integer(i)) => Ok(PropertyValue::Integer(i.abs())),
            Some(PropertyValue::Float(f)) => Ok(PropertyValue::Float(f.abs())),
            _ => Ok(PropertyValue::Null),
        },
        "round" => Ok(PropertyValue::Float(as_f64(&args[0])?.round())),
        "floor" => Ok(PropertyValue::Float(as_f64(&args[0])?.floor())),
        "ceil" => Ok(PropertyValue::Float(as_f64(&args[0])?.ceil())),
        "sqrt" => Ok(PropertyValue::Float(as_f64(&args[0])?.sqrt())),
        "rand" => Err(EngineError::UnsupportedFeature(
            "rand() is evaluated by SQL (`RANDOM()`), not in-process".into(),
        )),
        "percentiledisc" | "percentilecont" => Err(EngineError::UnsupportedFeature(format!(
            "{}() is an aggregate and is evaluated over a row group by the executor's aggregate step, not here",
            lname
        ))),
        "date" => temporal_date(args),
        "datetime" => temporal_datetime(args),
        "timestamp" => {
            if !args.is_empty() {
                return Err(EngineError::TypeError(
                    "timestamp() takes no arguments".to_string(),
                ));
            }
            Ok(PropertyValue::Integer(chrono::Utc::now().timestamp_millis()))
        }
        other => Err(EngineError::UnsupportedFeature(format!(
            "function `{}` is not supported in this evaluation context",
            other
        ))),
    }
}

/// `date()` / `date(expr)`: matches the translator's sqlite-side coercion
/// (epoch-millis integer or an ISO-8601 string), evaluated in-process for
/// the same call sites `eval.rs` otherwise handles.
fn temporal_date(args: Vec<PropertyValue>) -> Result<PropertyValue, EngineError> {
    use chrono::{TimeZone, Utc};
    match args.into_iter().next() {
        None => Ok(PropertyValue::String(Utc::now().date_naive().to_string())),
        Some(PropertyValue::Integer(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(|dt| PropertyValue::String(dt.date_naive().to_string()))
            .ok_or_else(|| EngineError::TypeError("date() given an out-of-range timestamp".to_string())),
        Some(PropertyValue::String(s)) => s
            .parse::<chrono::NaiveDate>()
            .map(|d| PropertyValue::String(d.to_string()))
            .map_err(|_| EngineError::TypeError(format!("date() could not parse '{}'", s))),
        _ => Err(EngineError::TypeError(
            "date() expects no arguments, an epoch-millis integer, or an ISO date string".to_string(),
        )),
    }
}

/// `datetime()` / `datetime(expr)`: same coercion as [`temporal_date`] but
/// preserving the time-of-day component.
fn temporal_datetime(args: Vec<PropertyValue>) -> Result<PropertyValue, EngineError> {
    use chrono::{SecondsFormat, TimeZone, Utc};
    match args.into_iter().next() {
        None => Ok(PropertyValue::String(
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        )),
        Some(PropertyValue::Integer(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(|dt| PropertyValue::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
            .ok_or_else(|| EngineError::TypeError("datetime() given an out-of-range timestamp".to_string())),
        Some(PropertyValue::String(s)) => chrono::DateTime::parse_from_rfc3339(&s)
            .map(|dt| PropertyValue::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
            .map_err(|_| EngineError::TypeError(format!("datetime() could not parse '{}'", s))),
        _ => Err(EngineError::TypeError(
            "datetime() expects no arguments, an epoch-millis integer, or an ISO datetime string".to_string(),
        )),
    }
}

fn string_fn(
    args: Vec<PropertyValue>,
    f: impl Fn(&str) -> String,
) -> Result<PropertyValue, EngineError> {
    match args.into_iter().next() {
        Some(PropertyValue::String(s)) => Ok(PropertyValue::String(f(&s))),
        Some(PropertyValue::Null) | Option::None => Ok(PropertyValue::Null),
        _ => Err(EngineError::TypeError("expected a string argument".into())),
    }
}

fn expect_string(v: Option<PropertyValue>) -> Result<String, EngineError> {
    match v {
        Some(PropertyValue::String(s)) => Ok(s),
        _ => Err(EngineError::TypeError("expected a string argument".into())),
    }
}

fn expect_int(v: Option<PropertyValue>) -> Result<i64, EngineError> {
    match v {
        Some(PropertyValue::Integer(i)) => Ok(i),
        _ => Err(EngineError::TypeError("expected an integer argument".into())),
    }
}

fn as_i64(v: &PropertyValue) -> Result<i64, EngineError> {
    match v {
        PropertyValue::Integer(i) => Ok(*i),
        PropertyValue::Float(f) => Ok(*f as i64),
        other => Err(EngineError::TypeError(format!("expected an integer, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn empty_params() -> HashMap<String, PropertyValue> {
        HashMap::new()
    }

    #[test]
    fn evaluates_arithmetic() {
        let params = empty_params();
        let env = Env::new(&params);
        let expr = Expression::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expression::Literal(Literal::Integer(2))),
            right: Box::new(Expression::Literal(Literal::Integer(3))),
        };
        assert_eq!(evaluate(&expr, &env).unwrap(), PropertyValue::Integer(5));
    }

    #[test]
    fn negative_index_wraps_from_end() {
        let params = empty_params();
        let mut env = Env::new(&params);
        env.bind(
            "L",
            PropertyValue::List(vec![
                PropertyValue::Integer(1),
                PropertyValue::Integer(2),
                PropertyValue::Integer(3),
            ]),
        );
        let expr = Expression::Index(
            Box::new(Expression::Variable("L".to_string())),
            Box::new(Expression::Literal(Literal::Integer(-1))),
        );
        assert_eq!(evaluate(&expr, &env).unwrap(), PropertyValue::Integer(3));
    }

    #[test]
    fn list_comprehension_filters_and_maps() {
        let params = empty_params();
        let mut env = Env::new(&params);
        env.bind(
            "L",
            PropertyValue::List(vec![
                PropertyValue::Integer(1),
                PropertyValue::Integer(2),
                PropertyValue::Integer(3),
            ]),
        );
        let expr = Expression::ListComprehension {
            variable: "x".to_string(),
            source: Box::new(Expression::Variable("L".to_string())),
            filter: Some(Box::new(Expression::Comparison {
                op: crate::parser::ast::CompareOp::Gt,
                left: Box::new(Expression::Variable("x".to_string())),
                right: Box::new(Expression::Literal(Literal::Integer(1))),
            })),
            map: Some(Box::new(Expression::Binary {
                op: BinaryOp::Mul,
                left: Box::new(Expression::Variable("x".to_string())),
                right: Box::new(Expression::Literal(Literal::Integer(10))),
            })),
        };
        let result = evaluate(&expr, &env).unwrap();
        assert_eq!(
            result,
            PropertyValue::List(vec![PropertyValue::Integer(20), PropertyValue::Integer(30)])
        );
    }
}

//! Expression → SQL fragment compilation (spec.md §4.3.5).
//!
//! The same Cypher expression compiles differently depending on where it
//! lands: property access uses the JSON-preserving `->` operator in SELECT
//! position so booleans survive as `true`/`false`, but `json_extract` in
//! WHERE/ORDER BY/arithmetic position so the value is directly comparable.
//! `ExprMode` is the single decision point for that split (spec.md §9).

use crate::error::EngineError;
use crate::parser::ast::{
    BinaryOp, CaseWhen, CompareOp, Expression, ListPredicateKind, Literal, LogicalOp,
    StringMatchOp, UnaryOp,
};
use crate::translator::context::{TranslatorContext, VariableKind};
use crate::value::PropertyValue;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprMode {
    /// RETURN/WITH projection position: preserve JSON typing.
    Projection,
    /// WHERE / ORDER BY / arithmetic position: scalar-coerced.
    Scalar,
}

/// A compiled SQL fragment plus the ordered bind parameters it references.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub sql: String,
    pub params: Vec<PropertyValue>,
}

impl Compiled {
    fn leaf(sql: impl Into<String>) -> Self {
        Compiled {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

pub struct ExprCompiler<'a> {
    pub ctx: &'a TranslatorContext,
    pub params: &'a HashMap<String, PropertyValue>,
}

impl<'a> ExprCompiler<'a> {
    pub fn new(ctx: &'a TranslatorContext, params: &'a HashMap<String, PropertyValue>) -> Self {
        ExprCompiler { ctx, params }
    }

    pub fn compile(&self, expr: &Expression, mode: ExprMode) -> Result<Compiled, EngineError> {
        match expr {
            Expression::Literal(lit) => Ok(self.compile_literal(lit)),
            Expression::Parameter(name) => {
                let value = self
                    .params
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EngineError::NameError(format!("${}", name)))?;
                Ok(Compiled {
                    sql: "?".to_string(),
                    params: vec![value],
                })
            }
            Expression::Variable(name) => self.compile_variable(name, mode),
            Expression::PathVariable(name) => self.compile_variable(name, mode),
            Expression::Property(base, prop) => self.compile_property(base, prop, mode),
            Expression::Index(base, index) => self.compile_index(base, index, mode),
            Expression::Binary { op, left, right } => self.compile_binary(*op, left, right, mode),
            Expression::Unary { op, operand } => {
                let inner = self.compile(operand, ExprMode::Scalar)?;
                let sql = match op {
                    UnaryOp::Negate => format!("(-{})", inner.sql),
                };
                Ok(Compiled {
                    sql,
                    params: inner.params,
                })
            }
            Expression::Comparison { op, left, right } => {
                self.compile_comparison(*op, left, right)
            }
            Expression::Logical { op, left, right } => self.compile_logical(*op, left, right),
            Expression::Not(inner) => {
                let compiled = self.compile(inner, ExprMode::Scalar)?;
                Ok(Compiled {
                    sql: format!("(NOT {})", compiled.sql),
                    params: compiled.params,
                })
            }
            Expression::StringMatch { op, left, right } => self.compile_string_match(*op, left, right),
            Expression::IsNull { operand, negated } => {
                let compiled = self.compile(operand, ExprMode::Scalar)?;
                let sql = if *negated {
                    format!("({} IS NOT NULL)", compiled.sql)
                } else {
                    format!("({} IS NULL)", compiled.sql)
                };
                Ok(Compiled {
                    sql,
                    params: compiled.params,
                })
            }
            Expression::In { left, list } => self.compile_in(left, list),
            Expression::Case {
                subject,
                whens,
                else_branch,
            } => self.compile_case(subject.as_deref(), whens, else_branch.as_deref(), mode),
            Expression::List(items) => self.compile_list_literal(items, mode),
            Expression::Object(pairs) => self.compile_object_literal(pairs),
            Expression::Function { name, args, distinct } => {
                self.compile_function(name, args, *distinct, mode)
            }
            Expression::ListComprehension {
                variable,
                source,
                filter,
                map,
            } => self.compile_list_comprehension(variable, source, filter.as_deref(), map.as_deref()),
            Expression::ListPredicate {
                kind,
                variable,
                source,
                filter,
            } => self.compile_list_predicate(*kind, variable, source, filter),
            Expression::Exists(pattern) => self.compile_exists(pattern),
        }
    }

    fn compile_literal(&self, lit: &Literal) -> Compiled {
        match lit {
            Literal::String(s) => Compiled {
                sql: "?".to_string(),
                params: vec![PropertyValue::String(s.clone())],
            },
            Literal::Integer(i) => Compiled {
                sql: "?".to_string(),
                params: vec![PropertyValue::Integer(*i)],
            },
            Literal::Float(f) => Compiled {
                sql: "?".to_string(),
                params: vec![PropertyValue::Float(*f)],
            },
            Literal::Boolean(b) => Compiled {
                sql: "?".to_string(),
                params: vec![PropertyValue::Boolean(*b)],
            },
            Literal::Null => Compiled::leaf("NULL"),
        }
    }

    fn compile_variable(&self, name: &str, mode: ExprMode) -> Result<Compiled, EngineError> {
        if name == "*" {
            return Ok(Compiled::leaf("*"));
        }
        if name.contains('.') {
            // Not a Cypher identifier (the lexer never produces one with a
            // dot in it) — this is `rewrite_variable`'s `alias.value`
            // passthrough for a list comprehension/predicate's bound row.
            return Ok(Compiled::leaf(name.to_string()));
        }
        let bound = self
            .ctx
            .variables
            .get(name)
            .ok_or_else(|| EngineError::NameError(name.to_string()))?;
        let alias = &bound.alias;
        let sql = match (bound.kind, mode) {
            (VariableKind::Node, _) => format!(
                "json_object('id',{a}.id,'label',{a}.label,'properties',json({a}.properties))",
                a = alias
            ),
            (VariableKind::Edge, _) => format!(
                "json_object('id',{a}.id,'type',{a}.type,'source_id',{a}.source_id,'target_id',{a}.target_id,'properties',json({a}.properties))",
                a = alias
            ),
            (VariableKind::Path, _) => self.compile_path_object(name)?,
        };
        Ok(Compiled::leaf(sql))
    }

    fn compile_path_object(&self, path_var: &str) -> Result<String, EngineError> {
        let path = self
            .ctx
            .path_expressions
            .iter()
            .find(|p| p.path_variable == path_var)
            .ok_or_else(|| EngineError::NameError(path_var.to_string()))?;
        Ok(format!(
            "json_object('nodes',json_array(json_object('id',{s}.id,'label',{s}.label,'properties',json({s}.properties)),json_object('id',{e}.id,'label',{e}.label,'properties',json({e}.properties))),'length',{cte}.depth)",
            s = path.start_alias,
            e = path.end_alias,
            cte = path.cte_name,
        ))
    }

    fn compile_property(
        &self,
        base: &Expression,
        prop: &str,
        mode: ExprMode,
    ) -> Result<Compiled, EngineError> {
        if let Expression::Variable(name) = base {
            if let Some(bound) = self.ctx.variables.get(name) {
                let column = match bound.kind {
                    VariableKind::Node | VariableKind::Edge => "properties",
                    VariableKind::Path => {
                        return Err(EngineError::TypeError(
                            "paths do not carry properties".to_string(),
                        ))
                    }
                };
                let sql = match mode {
                    ExprMode::Projection => {
                        format!("{}.{} -> '$.{}'", bound.alias, column, prop)
                    }
                    ExprMode::Scalar => {
                        format!("json_extract({}.{}, '$.{}')", bound.alias, column, prop)
                    }
                };
                return Ok(Compiled::leaf(sql));
            }
        }
        // Property access on a compound expression (e.g. a map literal result).
        let inner = self.compile(base, ExprMode::Scalar)?;
        let sql = match mode {
            ExprMode::Projection => format!("({}) -> '$.{}'", inner.sql, prop),
            ExprMode::Scalar => format!("json_extract({}, '$.{}')", inner.sql, prop),
        };
        Ok(Compiled {
            sql,
            params: inner.params,
        })
    }

    fn compile_index(
        &self,
        base: &Expression,
        index: &Expression,
        mode: ExprMode,
    ) -> Result<Compiled, EngineError> {
        let base_c = self.compile(base, ExprMode::Scalar)?;
        let index_c = self.compile(index, ExprMode::Scalar)?;
        let mut params = base_c.params;
        params.extend(index_c.params);
        let path = format!("'$[' || ({}) || ']'", index_c.sql);
        let sql = match mode {
            ExprMode::Projection => format!("({}) -> ({})", base_c.sql, path),
            ExprMode::Scalar => format!("json_extract({}, {})", base_c.sql, path),
        };
        Ok(Compiled { sql, params })
    }

    fn compile_binary(
        &self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        mode: ExprMode,
    ) -> Result<Compiled, EngineError> {
        if matches!(op, BinaryOp::Add) && (looks_list_typed(left) || looks_list_typed(right)) {
            // List concatenation via json_group_array over both sides' elements.
            let l = self.compile(left, ExprMode::Scalar)?;
            let r = self.compile(right, ExprMode::Scalar)?;
            let mut params = l.params;
            params.extend(r.params);
            let sql = format!(
                "(SELECT json_group_array(value) FROM (SELECT value FROM json_each({l}) UNION ALL SELECT value FROM json_each({r})))",
                l = l.sql,
                r = r.sql,
            );
            return Ok(Compiled { sql, params });
        }
        let l = self.compile(left, ExprMode::Scalar)?;
        let r = self.compile(right, ExprMode::Scalar)?;
        let op_sql = match op {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => {
                let mut params = l.params;
                params.extend(r.params);
                return Ok(Compiled {
                    sql: format!("POWER({}, {})", l.sql, r.sql),
                    params,
                });
            }
        };
        let mut params = l.params;
        params.extend(r.params);
        let sql = format!("({} {} {})", l.sql, op_sql, r.sql);
        let _ = mode;
        Ok(Compiled { sql, params })
    }

    fn compile_comparison(
        &self,
        op: CompareOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<Compiled, EngineError> {
        let l = self.compile(left, ExprMode::Scalar)?;
        let r = self.compile(right, ExprMode::Scalar)?;
        let op_sql = match op {
            CompareOp::Eq => "=",
            CompareOp::Neq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Lte => "<=",
            CompareOp::Gte => ">=",
        };
        let mut params = l.params;
        params.extend(r.params);
        Ok(Compiled {
            sql: format!("({} {} {})", l.sql, op_sql, r.sql),
            params,
        })
    }

    fn compile_logical(
        &self,
        op: LogicalOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<Compiled, EngineError> {
        let l = self.compile(left, ExprMode::Scalar)?;
        let r = self.compile(right, ExprMode::Scalar)?;
        let op_sql = match op {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        };
        let mut params = l.params;
        params.extend(r.params);
        Ok(Compiled {
            sql: format!("({} {} {})", l.sql, op_sql, r.sql),
            params,
        })
    }

    fn compile_string_match(
        &self,
        op: StringMatchOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<Compiled, EngineError> {
        let l = self.compile(left, ExprMode::Scalar)?;
        let r = self.compile(right, ExprMode::Scalar)?;
        let mut params = l.params;
        let sql = match op {
            StringMatchOp::Contains => {
                if let Expression::Literal(Literal::String(s)) = right {
                    params.push(PropertyValue::String(format!("%{}%", escape_like(s))));
                    format!("({} LIKE ? ESCAPE '\\')", l.sql)
                } else {
                    params.extend(r.params);
                    format!("(instr({}, {}) > 0)", l.sql, r.sql)
                }
            }
            StringMatchOp::StartsWith => {
                if let Expression::Literal(Literal::String(s)) = right {
                    params.push(PropertyValue::String(format!("{}%", escape_like(s))));
                    format!("({} LIKE ? ESCAPE '\\')", l.sql)
                } else {
                    params.extend(r.params);
                    format!("(substr({}, 1, length({})) = {})", l.sql, r.sql, r.sql)
                }
            }
            StringMatchOp::EndsWith => {
                if let Expression::Literal(Literal::String(s)) = right {
                    params.push(PropertyValue::String(format!("%{}", escape_like(s))));
                    format!("({} LIKE ? ESCAPE '\\')", l.sql)
                } else {
                    params.extend(r.params);
                    format!(
                        "(substr({}, -length({})) = {})",
                        l.sql, r.sql, r.sql
                    )
                }
            }
        };
        Ok(Compiled { sql, params })
    }

    fn compile_in(&self, left: &Expression, list: &Expression) -> Result<Compiled, EngineError> {
        let l = self.compile(left, ExprMode::Scalar)?;
        match list {
            Expression::List(items) => {
                if items.is_empty() {
                    // Empty IN [] always returns the empty row set (spec.md §8).
                    return Ok(Compiled::leaf("(1=0)"));
                }
                let mut params = l.params;
                let mut placeholders = Vec::with_capacity(items.len());
                for item in items {
                    let c = self.compile(item, ExprMode::Scalar)?;
                    placeholders.push(c.sql);
                    params.extend(c.params);
                }
                Ok(Compiled {
                    sql: format!("({} IN ({}))", l.sql, placeholders.join(", ")),
                    params,
                })
            }
            Expression::Parameter(name) => {
                let value = self
                    .params
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EngineError::NameError(format!("${}", name)))?;
                match &value {
                    PropertyValue::List(items) => {
                        if items.is_empty() {
                            return Ok(Compiled::leaf("(1=0)"));
                        }
                        let mut params = l.params;
                        let placeholders: Vec<&str> = items.iter().map(|_| "?").collect();
                        params.extend(items.iter().cloned());
                        Ok(Compiled {
                            sql: format!("({} IN ({}))", l.sql, placeholders.join(", ")),
                            params,
                        })
                    }
                    _ => Err(EngineError::TypeError(
                        "IN requires a list-typed right-hand side".to_string(),
                    )),
                }
            }
            other => {
                let r = self.compile(other, ExprMode::Scalar)?;
                let mut params = l.params;
                params.extend(r.params);
                Ok(Compiled {
                    sql: format!("({} IN (SELECT value FROM json_each({})))", l.sql, r.sql),
                    params,
                })
            }
        }
    }

    fn compile_case(
        &self,
        subject: Option<&Expression>,
        whens: &[CaseWhen],
        else_branch: Option<&Expression>,
        mode: ExprMode,
    ) -> Result<Compiled, EngineError> {
        let mut params = Vec::new();
        let mut sql = String::from("CASE");
        if let Some(subject) = subject {
            let c = self.compile(subject, ExprMode::Scalar)?;
            sql.push(' ');
            sql.push_str(&c.sql);
            params.extend(c.params);
        }
        for when in whens {
            let w = self.compile(&when.when, ExprMode::Scalar)?;
            let t = self.compile(&when.then, mode)?;
            sql.push_str(&format!(" WHEN {} THEN {}", w.sql, t.sql));
            params.extend(w.params);
            params.extend(t.params);
        }
        if let Some(else_branch) = else_branch {
            let e = self.compile(else_branch, mode)?;
            sql.push_str(&format!(" ELSE {}", e.sql));
            params.extend(e.params);
        }
        sql.push_str(" END");
        Ok(Compiled { sql, params })
    }

    fn compile_list_literal(
        &self,
        items: &[Expression],
        _mode: ExprMode,
    ) -> Result<Compiled, EngineError> {
        if items.is_empty() {
            return Ok(Compiled::leaf("json_array()"));
        }
        let mut params = Vec::new();
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let c = self.compile(item, ExprMode::Scalar)?;
            parts.push(c.sql);
            params.extend(c.params);
        }
        Ok(Compiled {
            sql: format!("json_array({})", parts.join(", ")),
            params,
        })
    }

    fn compile_object_literal(
        &self,
        pairs: &[(String, Expression)],
    ) -> Result<Compiled, EngineError> {
        let mut params = Vec::new();
        let mut parts = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let c = self.compile(value, ExprMode::Scalar)?;
            parts.push(format!("'{}', {}", key, c.sql));
            params.extend(c.params);
        }
        Ok(Compiled {
            sql: format!("json_object({})", parts.join(", ")),
            params,
        })
    }

    fn compile_list_comprehension(
        &self,
        variable: &str,
        source: &Expression,
        filter: Option<&Expression>,
        map: Option<&Expression>,
    ) -> Result<Compiled, EngineError> {
        let source_c = self.compile(source, ExprMode::Scalar)?;
        let mut params = source_c.params;
        let lc_alias = "__lc__";
        let rewritten_filter = filter.map(|f| rewrite_variable(f, variable, lc_alias));
        let rewritten_map = map.map(|m| rewrite_variable(m, variable, lc_alias));
        let select_expr = match &rewritten_map {
            Some(m) => {
                let c = self.compile_in_scope(m, lc_alias)?;
                params.extend(c.params.clone());
                c.sql
            }
            None => format!("{}.value", lc_alias),
        };
        let mut where_sql = String::new();
        if let Some(f) = &rewritten_filter {
            let c = self.compile_in_scope(f, lc_alias)?;
            params.extend(c.params.clone());
            where_sql = format!(" WHERE {}", c.sql);
        }
        Ok(Compiled {
            sql: format!(
                "(SELECT json_group_array({sel}) FROM json_each({src}) AS {alias}{whr})",
                sel = select_expr,
                src = source_c.sql,
                alias = lc_alias,
                whr = where_sql,
            ),
            params,
        })
    }

    /// Compile an expression that has already had its quantified variable
    /// rewritten into `alias.value` references (see [`rewrite_variable`]).
    fn compile_in_scope(&self, expr: &Expression, _alias: &str) -> Result<Compiled, EngineError> {
        self.compile(expr, ExprMode::Scalar)
    }

    fn compile_list_predicate(
        &self,
        kind: ListPredicateKind,
        variable: &str,
        source: &Expression,
        filter: &Expression,
    ) -> Result<Compiled, EngineError> {
        let source_c = self.compile(source, ExprMode::Scalar)?;
        let mut params = source_c.params;
        let lp_alias = "__lp__";
        let rewritten = rewrite_variable(filter, variable, lp_alias);
        let cond = self.compile_in_scope(&rewritten, lp_alias)?;
        params.extend(cond.params);
        let sql = match kind {
            ListPredicateKind::All => format!(
                "((SELECT COUNT(*) FROM json_each({src}) AS {alias} WHERE NOT({cond})) = 0)",
                src = source_c.sql,
                alias = lp_alias,
                cond = cond.sql,
            ),
            ListPredicateKind::Any => format!(
                "(EXISTS (SELECT 1 FROM json_each({src}) AS {alias} WHERE {cond}))",
                src = source_c.sql,
                alias = lp_alias,
                cond = cond.sql,
            ),
            ListPredicateKind::None => format!(
                "(NOT EXISTS (SELECT 1 FROM json_each({src}) AS {alias} WHERE {cond}))",
                src = source_c.sql,
                alias = lp_alias,
                cond = cond.sql,
            ),
            ListPredicateKind::Single => format!(
                "((SELECT COUNT(*) FROM json_each({src}) AS {alias} WHERE {cond}) = 1)",
                src = source_c.sql,
                alias = lp_alias,
                cond = cond.sql,
            ),
        };
        Ok(Compiled { sql, params })
    }

    fn compile_exists(&self, pattern: &crate::parser::ast::PatternPath) -> Result<Compiled, EngineError> {
        if pattern.hops.is_empty() {
            return Err(EngineError::UnsupportedFeature(
                "EXISTS requires a relationship pattern".to_string(),
            ));
        }
        let start_var = pattern.start.variable.as_deref();
        let start_alias = start_var
            .and_then(|v| self.ctx.variables.get(v))
            .map(|b| b.alias.clone())
            .ok_or_else(|| {
                EngineError::UnsupportedFeature(
                    "EXISTS pattern's source node must already be bound".to_string(),
                )
            })?;
        let (edge, target) = &pattern.hops[0];
        let mut params = Vec::new();
        let mut sql = format!("EXISTS(SELECT 1 FROM edges e WHERE e.source_id = {}.id", start_alias);
        if !target.labels.is_empty() {
            sql.push_str(" AND EXISTS (SELECT 1 FROM nodes tgt WHERE tgt.id = e.target_id");
            for (fragment, label) in super::label::label_exists_fragments("tgt", &target.labels) {
                sql.push_str(&format!(" AND {}", fragment));
                params.push(PropertyValue::String(label));
            }
            sql.push(')');
        }
        if let Some(edge_type) = &edge.edge_type {
            sql.push_str(" AND e.type = ?");
            params.push(PropertyValue::String(edge_type.clone()));
        }
        sql.push(')');
        Ok(Compiled { sql, params })
    }

    fn compile_function(
        &self,
        name: &str,
        args: &[Expression],
        distinct: bool,
        mode: ExprMode,
    ) -> Result<Compiled, EngineError> {
        super::functions::compile(self, name, args, distinct, mode)
    }
}

/// Rewrite every unqualified occurrence of `variable` in `expr` to
/// `alias.value`, used to bind the quantified variable of a list
/// comprehension or list predicate into the `json_each` row it compiles to.
pub fn rewrite_variable(expr: &Expression, variable: &str, alias: &str) -> Expression {
    match expr {
        Expression::Variable(name) if name == variable => {
            Expression::Variable(format!("{}.value", alias))
        }
        Expression::Property(base, prop) => Expression::Property(
            Box::new(rewrite_variable(base, variable, alias)),
            prop.clone(),
        ),
        Expression::Index(base, idx) => Expression::Index(
            Box::new(rewrite_variable(base, variable, alias)),
            Box::new(rewrite_variable(idx, variable, alias)),
        ),
        Expression::Binary { op, left, right } => Expression::Binary {
            op: *op,
            left: Box::new(rewrite_variable(left, variable, alias)),
            right: Box::new(rewrite_variable(right, variable, alias)),
        },
        Expression::Comparison { op, left, right } => Expression::Comparison {
            op: *op,
            left: Box::new(rewrite_variable(left, variable, alias)),
            right: Box::new(rewrite_variable(right, variable, alias)),
        },
        Expression::Logical { op, left, right } => Expression::Logical {
            op: *op,
            left: Box::new(rewrite_variable(left, variable, alias)),
            right: Box::new(rewrite_variable(right, variable, alias)),
        },
        Expression::Not(inner) => Expression::Not(Box::new(rewrite_variable(inner, variable, alias))),
        Expression::StringMatch { op, left, right } => Expression::StringMatch {
            op: *op,
            left: Box::new(rewrite_variable(left, variable, alias)),
            right: Box::new(rewrite_variable(right, variable, alias)),
        },
        Expression::IsNull { operand, negated } => Expression::IsNull {
            operand: Box::new(rewrite_variable(operand, variable, alias)),
            negated: *negated,
        },
        Expression::In { left, list } => Expression::In {
            left: Box::new(rewrite_variable(left, variable, alias)),
            list: Box::new(rewrite_variable(list, variable, alias)),
        },
        Expression::Function { name, args, distinct } => Expression::Function {
            name: name.clone(),
            args: args
                .iter()
                .map(|a| rewrite_variable(a, variable, alias))
                .collect(),
            distinct: *distinct,
        },
        other => other.clone(),
    }
}

/// Heuristic used to decide whether `+` should compile to list concatenation:
/// literal list syntax, or a property access whose name looks plural.
fn looks_list_typed(expr: &Expression) -> bool {
    match expr {
        Expression::List(_) => true,
        Expression::ListComprehension { .. } => true,
        Expression::Function { name, .. } => matches!(
            name.to_ascii_lowercase().as_str(),
            "range" | "split" | "collect" | "nodes" | "relationships" | "keys" | "labels"
        ),
        _ => false,
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound_node_ctx() -> TranslatorContext {
        let mut ctx = TranslatorContext::new();
        ctx.resolve_or_bind(Some("n"), VariableKind::Node);
        ctx
    }

    #[test]
    fn projection_property_uses_json_preserving_operator() {
        let ctx = bound_node_ctx();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let expr = Expression::Property(Box::new(Expression::Variable("n".to_string())), "name".to_string());
        let compiled = compiler.compile(&expr, ExprMode::Projection).unwrap();
        assert_eq!(compiled.sql, "n0.properties -> '$.name'");
    }

    #[test]
    fn scalar_property_uses_json_extract() {
        let ctx = bound_node_ctx();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let expr = Expression::Property(Box::new(Expression::Variable("n".to_string())), "name".to_string());
        let compiled = compiler.compile(&expr, ExprMode::Scalar).unwrap();
        assert_eq!(compiled.sql, "json_extract(n0.properties, '$.name')");
    }

    #[test]
    fn comparison_compiles_parenthesized_infix_with_both_params() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let expr = Expression::Comparison {
            op: CompareOp::Gt,
            left: Box::new(Expression::Literal(Literal::Integer(1))),
            right: Box::new(Expression::Literal(Literal::Integer(2))),
        };
        let compiled = compiler.compile(&expr, ExprMode::Scalar).unwrap();
        assert_eq!(compiled.sql, "(? > ?)");
        assert_eq!(compiled.params.len(), 2);
    }

    #[test]
    fn contains_with_literal_compiles_to_escaped_like() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let expr = Expression::StringMatch {
            op: StringMatchOp::Contains,
            left: Box::new(Expression::Literal(Literal::String("x".to_string()))),
            right: Box::new(Expression::Literal(Literal::String("50%_off".to_string()))),
        };
        let compiled = compiler.compile(&expr, ExprMode::Scalar).unwrap();
        assert_eq!(compiled.sql, "(? LIKE ? ESCAPE '\\')");
        match &compiled.params[1] {
            PropertyValue::String(s) => assert_eq!(s, "%50\\%\\_off%"),
            other => panic!("expected a string literal, got {:?}", other),
        }
    }

    #[test]
    fn empty_list_in_is_always_false() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let expr = Expression::In {
            left: Box::new(Expression::Literal(Literal::Integer(1))),
            list: Box::new(Expression::List(vec![])),
        };
        let compiled = compiler.compile(&expr, ExprMode::Scalar).unwrap();
        assert_eq!(compiled.sql, "(1=0)");
    }

    #[test]
    fn parameter_list_in_binds_one_placeholder_per_element() {
        let ctx = TranslatorContext::new();
        let mut params = HashMap::new();
        params.insert(
            "ids".to_string(),
            PropertyValue::List(vec![PropertyValue::Integer(1), PropertyValue::Integer(2)]),
        );
        let compiler = ExprCompiler::new(&ctx, &params);
        let expr = Expression::In {
            left: Box::new(Expression::Literal(Literal::Integer(1))),
            list: Box::new(Expression::Parameter("ids".to_string())),
        };
        let compiled = compiler.compile(&expr, ExprMode::Scalar).unwrap();
        assert_eq!(compiled.sql, "(? IN (?, ?))");
        assert_eq!(compiled.params.len(), 3);
    }

    #[test]
    fn empty_list_literal_compiles_to_nullary_json_array_call() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let compiled = compiler.compile(&Expression::List(vec![]), ExprMode::Scalar).unwrap();
        assert_eq!(compiled.sql, "json_array()");
    }

    #[test]
    fn rewrite_variable_replaces_only_the_quantified_variable() {
        let expr = Expression::Comparison {
            op: CompareOp::Gt,
            left: Box::new(Expression::Variable("x".to_string())),
            right: Box::new(Expression::Variable("y".to_string())),
        };
        let rewritten = rewrite_variable(&expr, "x", "__lc__");
        match rewritten {
            Expression::Comparison { left, right, .. } => {
                assert!(matches!(*left, Expression::Variable(ref v) if v == "__lc__.value"));
                assert!(matches!(*right, Expression::Variable(ref v) if v == "y"));
            }
            other => panic!("expected a comparison, got {:?}", other),
        }
    }

    #[test]
    fn adding_two_list_literals_unions_their_elements() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let expr = Expression::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expression::List(vec![Expression::Literal(Literal::Integer(1))])),
            right: Box::new(Expression::List(vec![Expression::Literal(Literal::Integer(2))])),
        };
        let compiled = compiler.compile(&expr, ExprMode::Scalar).unwrap();
        assert!(compiled.sql.contains("UNION ALL"));
    }

    #[test]
    fn unbound_variable_is_a_name_error() {
        let ctx = TranslatorContext::new();
        let params = HashMap::new();
        let compiler = ExprCompiler::new(&ctx, &params);
        let err = compiler
            .compile(&Expression::Variable("missing".to_string()), ExprMode::Scalar)
            .unwrap_err();
        assert!(matches!(err, EngineError::NameError(_)));
    }
}

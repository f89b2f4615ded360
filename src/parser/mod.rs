//! Hand-written recursive-descent parser. Grammar entry: `Query := Clause+`.
//! Each clause dispatches on its leading keyword token; expressions are
//! parsed with a precedence-climbing (Pratt) descent matching spec.md §4.2's
//! documented precedence table (lowest→highest): OR, AND, NOT, comparisons/
//! IN/IS [NOT] NULL/CONTAINS/STARTS WITH/ENDS WITH, additive, multiplicative,
//! exponent, unary, primary.

pub mod ast;

use crate::error::{EngineError, Position};
use crate::lexer::{Lexer, Token, TokenKind};
use ast::*;

pub fn parse(src: &str) -> Result<CypherStatement, EngineError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_statement()
}

/// A complete parsed statement: either a query (possibly UNION-chained) or a
/// standalone `CALL` with no surrounding MATCH/RETURN.
#[derive(Debug, Clone, PartialEq)]
pub enum CypherStatement {
    Query(Query),
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token<'a> {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> Token<'a> {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>, EngineError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.syntax_error(&format!("expected {}", what)))
        }
    }

    fn syntax_error(&self, message: &str) -> EngineError {
        let tok = self.peek();
        EngineError::Syntax {
            message: format!("{} but found '{}'", message, tok.text),
            position: Position {
                offset: tok.offset,
                line: tok.line,
                column: tok.column,
            },
        }
    }

    fn expect_identifier(&mut self) -> Result<String, EngineError> {
        if self.at(TokenKind::Identifier) {
            Ok(self.advance().text.to_string())
        } else if is_keyword_as_identifier(self.peek_kind()) {
            Ok(self.advance().text.to_string())
        } else {
            Err(self.syntax_error("expected identifier"))
        }
    }

    fn parse_statement(&mut self) -> Result<CypherStatement, EngineError> {
        let query = self.parse_query()?;
        let mut left = query;
        while self.at(TokenKind::Union) {
            self.advance();
            let all = self.eat(TokenKind::All);
            let right = self.parse_query()?;
            left = Query {
                clauses: vec![Clause::Union {
                    left: Box::new(left),
                    right: Box::new(right),
                    all,
                }],
            };
        }
        self.expect(TokenKind::Eof, "end of query")?;
        Ok(CypherStatement::Query(left))
    }

    fn parse_query(&mut self) -> Result<Query, EngineError> {
        let mut clauses = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Match => clauses.push(self.parse_match(false)?),
                TokenKind::Optional => {
                    self.advance();
                    self.expect(TokenKind::Match, "MATCH after OPTIONAL")?;
                    clauses.push(self.parse_match(true)?);
                }
                TokenKind::Create => clauses.push(self.parse_create()?),
                TokenKind::Merge => clauses.push(self.parse_merge()?),
                TokenKind::Set => clauses.push(self.parse_set()?),
                TokenKind::Remove => clauses.push(self.parse_remove()?),
                TokenKind::Delete => clauses.push(self.parse_delete(false)?),
                TokenKind::Detach => {
                    self.advance();
                    self.expect(TokenKind::Delete, "DELETE after DETACH")?;
                    clauses.push(self.parse_delete(true)?);
                }
                TokenKind::Return => clauses.push(self.parse_return()?),
                TokenKind::With => clauses.push(self.parse_with()?),
                TokenKind::Unwind => clauses.push(self.parse_unwind()?),
                TokenKind::Call => clauses.push(self.parse_call()?),
                TokenKind::Eof | TokenKind::Union => break,
                _ => return Err(self.syntax_error("expected a clause keyword")),
            }
        }
        Ok(Query { clauses })
    }

    // ---- MATCH / CREATE / MERGE -----------------------------------------

    fn parse_match(&mut self, optional: bool) -> Result<Clause, EngineError> {
        self.expect(TokenKind::Match, "MATCH")?;
        let patterns = self.parse_pattern_list()?;
        let where_clause = if self.eat(TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Clause::Match {
            patterns,
            where_clause,
            optional,
        })
    }

    fn parse_create(&mut self) -> Result<Clause, EngineError> {
        self.expect(TokenKind::Create, "CREATE")?;
        let patterns = self.parse_pattern_list()?;
        Ok(Clause::Create { patterns })
    }

    fn parse_merge(&mut self) -> Result<Clause, EngineError> {
        self.expect(TokenKind::Merge, "MERGE")?;
        let pattern = self.parse_pattern_path()?;
        let mut on_create_set = None;
        let mut on_match_set = None;
        while self.at(TokenKind::On) {
            self.advance();
            if self.eat(TokenKind::Create) {
                self.expect(TokenKind::Set, "SET after ON CREATE")?;
                on_create_set = Some(self.parse_set_assignments()?);
            } else if self.at(TokenKind::Match) {
                self.advance();
                self.expect(TokenKind::Set, "SET after ON MATCH")?;
                on_match_set = Some(self.parse_set_assignments()?);
            } else {
                return Err(self.syntax_error("expected CREATE or MATCH after ON"));
            }
        }
        Ok(Clause::Merge {
            pattern,
            on_create_set,
            on_match_set,
        })
    }

    fn parse_pattern_list(&mut self) -> Result<Vec<PatternPath>, EngineError> {
        let mut patterns = vec![self.parse_pattern_path()?];
        while self.eat(TokenKind::Comma) {
            patterns.push(self.parse_pattern_path()?);
        }
        Ok(patterns)
    }

    fn parse_pattern_path(&mut self) -> Result<PatternPath, EngineError> {
        let path_variable = if self.at(TokenKind::Identifier) && self.tokens[self.pos + 1].kind == TokenKind::Eq
        {
            let name = self.advance().text.to_string();
            self.advance(); // '='
            Some(name)
        } else {
            None
        };
        let start = self.parse_node_pattern()?;
        let mut hops = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Dash | TokenKind::ArrowLeft => {
                    let (edge, node) = self.parse_relationship_hop()?;
                    hops.push((edge, node));
                }
                _ => break,
            }
        }
        Ok(PatternPath {
            path_variable,
            start,
            hops,
        })
    }

    fn parse_node_pattern(&mut self) -> Result<NodePattern, EngineError> {
        self.expect(TokenKind::LParen, "'(' to start a node pattern")?;
        let variable = if self.at(TokenKind::Identifier) {
            Some(self.advance().text.to_string())
        } else {
            None
        };
        let mut labels = Vec::new();
        while self.eat(TokenKind::Colon) {
            labels.push(self.expect_label()?);
        }
        let properties = if self.at(TokenKind::LBrace) {
            Some(self.parse_object_literal()?)
        } else {
            None
        };
        self.expect(TokenKind::RParen, "')' to close a node pattern")?;
        Ok(NodePattern {
            variable,
            labels,
            properties,
        })
    }

    /// Labels keep their original capitalization (spec.md §4.2).
    fn expect_label(&mut self) -> Result<String, EngineError> {
        if self.at(TokenKind::Identifier) || is_keyword_as_identifier(self.peek_kind()) {
            Ok(self.advance().text.to_string())
        } else {
            Err(self.syntax_error("expected a label"))
        }
    }

    fn parse_relationship_hop(&mut self) -> Result<(EdgePattern, NodePattern), EngineError> {
        let left_arrow = self.eat(TokenKind::ArrowLeft);
        if !left_arrow {
            self.expect(TokenKind::Dash, "'-' in a relationship pattern")?;
        }
        let mut edge = EdgePattern::default();
        if self.eat(TokenKind::LBracket) {
            if self.at(TokenKind::Identifier) {
                edge.variable = Some(self.advance().text.to_string());
            }
            if self.eat(TokenKind::Colon) {
                edge.edge_type = Some(self.expect_label()?);
                while self.eat(TokenKind::Pipe) {
                    // Additional alternative types collapse into the first for
                    // SQL purposes (IN-list handled by the translator); record
                    // only the first as the primary declared type.
                    self.expect_label()?;
                }
            }
            if self.at(TokenKind::Star) {
                self.advance();
                edge.is_variable_length = true;
                if self.at(TokenKind::IntegerLiteral) {
                    edge.min_hops = Some(self.advance().text.parse().unwrap_or(1));
                }
                if self.eat(TokenKind::DotDot) {
                    if self.at(TokenKind::IntegerLiteral) {
                        edge.max_hops = Some(self.advance().text.parse().unwrap_or(10));
                    }
                } else if edge.min_hops.is_some() {
                    edge.max_hops = edge.min_hops;
                }
            }
            if self.at(TokenKind::LBrace) {
                edge.properties = Some(self.parse_object_literal()?);
            }
            self.expect(TokenKind::RBracket, "']' to close an edge pattern")?;
        }
        let right_arrow = self.eat(TokenKind::ArrowRight);
        if !right_arrow {
            self.expect(TokenKind::Dash, "'-' to close a relationship pattern")?;
        }
        edge.direction = Some(match (left_arrow, right_arrow) {
            (true, false) => Direction::Left,
            (false, true) => Direction::Right,
            _ => Direction::Either,
        });
        let node = self.parse_node_pattern()?;
        Ok((edge, node))
    }

    // ---- SET / REMOVE / DELETE ------------------------------------------

    fn parse_set(&mut self) -> Result<Clause, EngineError> {
        self.expect(TokenKind::Set, "SET")?;
        let assignments = self.parse_set_assignments()?;
        Ok(Clause::Set { assignments })
    }

    fn parse_set_assignments(&mut self) -> Result<Vec<SetAssignment>, EngineError> {
        let mut items = vec![self.parse_set_assignment()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_set_assignment()?);
        }
        Ok(items)
    }

    fn parse_set_assignment(&mut self) -> Result<SetOp, EngineError> {
        let variable = self.expect_identifier()?;
        if self.eat(TokenKind::Colon) {
            let mut labels = vec![self.expect_label()?];
            while self.eat(TokenKind::Colon) {
                labels.push(self.expect_label()?);
            }
            return Ok(SetOp::AddLabels { variable, labels });
        }
        if self.eat(TokenKind::Dot) {
            let property = self.expect_identifier_as_property()?;
            self.expect(TokenKind::Eq, "'=' in SET")?;
            let value = self.parse_expression()?;
            return Ok(SetOp::AssignProperty {
                variable,
                property,
                value,
            });
        }
        if self.at(TokenKind::Plus) && self.tokens[self.pos + 1].kind == TokenKind::Eq {
            self.advance();
            self.advance();
            let value = self.parse_expression()?;
            return Ok(SetOp::MergeProperties { variable, value });
        }
        self.expect(TokenKind::Eq, "'=' in SET")?;
        let value = self.parse_expression()?;
        Ok(SetOp::ReplaceProperties { variable, value })
    }

    /// Property keys accept identifiers and keywords lowered to lowercase
    /// (spec.md §4.2).
    fn expect_identifier_as_property(&mut self) -> Result<String, EngineError> {
        if self.at(TokenKind::Identifier) {
            Ok(self.advance().text.to_string())
        } else if is_keyword_as_identifier(self.peek_kind()) {
            Ok(self.advance().text.to_ascii_lowercase())
        } else {
            Err(self.syntax_error("expected a property name"))
        }
    }

    fn parse_remove(&mut self) -> Result<Clause, EngineError> {
        self.expect(TokenKind::Remove, "REMOVE")?;
        let mut items = vec![self.parse_remove_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_remove_item()?);
        }
        Ok(Clause::Remove { items })
    }

    fn parse_remove_item(&mut self) -> Result<RemoveItem, EngineError> {
        let variable = self.expect_identifier()?;
        if self.eat(TokenKind::Colon) {
            let mut labels = vec![self.expect_label()?];
            while self.eat(TokenKind::Colon) {
                labels.push(self.expect_label()?);
            }
            Ok(RemoveItem::Label { variable, labels })
        } else {
            self.expect(TokenKind::Dot, "'.' in REMOVE")?;
            let property = self.expect_identifier_as_property()?;
            Ok(RemoveItem::Property { variable, property })
        }
    }

    fn parse_delete(&mut self, detach: bool) -> Result<Clause, EngineError> {
        self.expect(TokenKind::Delete, "DELETE")?;
        let mut variables = vec![self.parse_expression()?];
        while self.eat(TokenKind::Comma) {
            variables.push(self.parse_expression()?);
        }
        Ok(Clause::Delete { variables, detach })
    }

    // ---- RETURN / WITH ---------------------------------------------------

    fn parse_return(&mut self) -> Result<Clause, EngineError> {
        self.expect(TokenKind::Return, "RETURN")?;
        let distinct = self.eat(TokenKind::Distinct);
        let items = self.parse_return_items()?;
        let order_by = self.parse_optional_order_by()?;
        let skip = self.parse_optional_skip()?;
        let limit = self.parse_optional_limit()?;
        Ok(Clause::Return {
            items,
            distinct,
            order_by,
            skip,
            limit,
        })
    }

    fn parse_with(&mut self) -> Result<Clause, EngineError> {
        self.expect(TokenKind::With, "WITH")?;
        let distinct = self.eat(TokenKind::Distinct);
        let items = self.parse_return_items()?;
        let where_clause = if self.eat(TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let order_by = self.parse_optional_order_by()?;
        let skip = self.parse_optional_skip()?;
        let limit = self.parse_optional_limit()?;
        Ok(Clause::With {
            items,
            where_clause,
            distinct,
            order_by,
            skip,
            limit,
        })
    }

    fn parse_return_items(&mut self) -> Result<Vec<ReturnItem>, EngineError> {
        if self.at(TokenKind::Star) {
            self.advance();
            return Ok(vec![ReturnItem {
                expression: Expression::Variable("*".to_string()),
                alias: None,
            }]);
        }
        let mut items = vec![self.parse_return_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_return_item()?);
        }
        Ok(items)
    }

    fn parse_return_item(&mut self) -> Result<ReturnItem, EngineError> {
        let expression = self.parse_expression()?;
        let alias = if self.eat(TokenKind::As) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(ReturnItem { expression, alias })
    }

    fn parse_optional_order_by(&mut self) -> Result<Option<Vec<OrderByItem>>, EngineError> {
        if !self.eat(TokenKind::Order) {
            return Ok(None);
        }
        self.expect(TokenKind::By, "BY after ORDER")?;
        let mut items = vec![self.parse_order_by_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_order_by_item()?);
        }
        Ok(Some(items))
    }

    fn parse_order_by_item(&mut self) -> Result<OrderByItem, EngineError> {
        let expression = self.parse_expression()?;
        let descending = if self.eat(TokenKind::Desc) {
            true
        } else {
            self.eat(TokenKind::Asc);
            false
        };
        Ok(OrderByItem {
            expression,
            descending,
        })
    }

    fn parse_optional_skip(&mut self) -> Result<Option<Expression>, EngineError> {
        if self.eat(TokenKind::Skip) {
            Ok(Some(self.parse_expression()?))
        } else {
            Ok(None)
        }
    }

    fn parse_optional_limit(&mut self) -> Result<Option<Expression>, EngineError> {
        if self.eat(TokenKind::Limit) {
            Ok(Some(self.parse_expression()?))
        } else {
            Ok(None)
        }
    }

    // ---- UNWIND / CALL ----------------------------------------------------

    fn parse_unwind(&mut self) -> Result<Clause, EngineError> {
        self.expect(TokenKind::Unwind, "UNWIND")?;
        let expression = self.parse_expression()?;
        self.expect(TokenKind::As, "AS after UNWIND expression")?;
        let alias = self.expect_identifier()?;
        Ok(Clause::Unwind { expression, alias })
    }

    fn parse_call(&mut self) -> Result<Clause, EngineError> {
        self.expect(TokenKind::Call, "CALL")?;
        let mut procedure = self.expect_identifier()?;
        while self.eat(TokenKind::Dot) {
            procedure.push('.');
            procedure.push_str(&self.expect_identifier()?);
        }
        self.expect(TokenKind::LParen, "'(' after procedure name")?;
        self.expect(TokenKind::RParen, "')' after procedure arguments")?;
        let yields = if self.eat(TokenKind::Yield) {
            let mut items = vec![self.parse_yield_item()?];
            while self.eat(TokenKind::Comma) {
                items.push(self.parse_yield_item()?);
            }
            Some(items)
        } else {
            None
        };
        let where_clause = if self.eat(TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Clause::Call {
            procedure,
            yields,
            where_clause,
        })
    }

    fn parse_yield_item(&mut self) -> Result<YieldItem, EngineError> {
        let name = self.expect_identifier()?;
        let alias = if self.eat(TokenKind::As) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(YieldItem { name, alias })
    }

    // ---- Expressions ------------------------------------------------------
    //
    // Precedence, lowest to highest: OR, AND, NOT, comparisons (including IN /
    // IS [NOT] NULL / CONTAINS / STARTS WITH / ENDS WITH), additive,
    // multiplicative, exponent, unary, primary.

    fn parse_expression(&mut self) -> Result<Expression, EngineError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression, EngineError> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expression::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, EngineError> {
        let mut left = self.parse_not()?;
        while self.eat(TokenKind::And) {
            let right = self.parse_not()?;
            left = Expression::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, EngineError> {
        if self.eat(TokenKind::Not) {
            let operand = self.parse_not()?;
            Ok(Expression::Not(Box::new(operand)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expression, EngineError> {
        let left = self.parse_additive()?;
        match self.peek_kind() {
            TokenKind::Eq => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Expression::Comparison {
                    op: CompareOp::Eq,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::Neq => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Expression::Comparison {
                    op: CompareOp::Neq,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::Lt => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Expression::Comparison {
                    op: CompareOp::Lt,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::Gt => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Expression::Comparison {
                    op: CompareOp::Gt,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::Lte => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Expression::Comparison {
                    op: CompareOp::Lte,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::Gte => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Expression::Comparison {
                    op: CompareOp::Gte,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::In => {
                self.advance();
                let list = self.parse_additive()?;
                Ok(Expression::In {
                    left: Box::new(left),
                    list: Box::new(list),
                })
            }
            TokenKind::Contains => {
                self.advance();
                let right = self.parse_additive()?;
                Ok(Expression::StringMatch {
                    op: StringMatchOp::Contains,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::Starts => {
                self.advance();
                self.expect(TokenKind::With, "WITH after STARTS")?;
                let right = self.parse_additive()?;
                Ok(Expression::StringMatch {
                    op: StringMatchOp::StartsWith,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::Ends => {
                self.advance();
                self.expect(TokenKind::With, "WITH after ENDS")?;
                let right = self.parse_additive()?;
                Ok(Expression::StringMatch {
                    op: StringMatchOp::EndsWith,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::Is => {
                self.advance();
                let negated = self.eat(TokenKind::Not);
                self.expect(TokenKind::Null, "NULL after IS")?;
                Ok(Expression::IsNull {
                    operand: Box::new(left),
                    negated,
                })
            }
            _ => Ok(left),
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, EngineError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Dash => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, EngineError> {
        let mut left = self.parse_exponent()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_exponent()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_exponent(&mut self) -> Result<Expression, EngineError> {
        let left = self.parse_unary()?;
        if self.eat(TokenKind::Caret) {
            let right = self.parse_exponent()?;
            Ok(Expression::Binary {
                op: BinaryOp::Pow,
                left: Box::new(left),
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, EngineError> {
        if self.eat(TokenKind::Dash) {
            let operand = self.parse_unary()?;
            Ok(Expression::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(operand),
            })
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, EngineError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(TokenKind::Dot) {
                let property = self.expect_identifier_as_property()?;
                expr = Expression::Property(Box::new(expr), property);
            } else if self.eat(TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RBracket, "']' to close an index expression")?;
                expr = Expression::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, EngineError> {
        match self.peek_kind() {
            TokenKind::StringLiteral => {
                let tok = self.advance();
                Ok(Expression::Literal(Literal::String(unescape_string(
                    tok.text,
                ))))
            }
            TokenKind::IntegerLiteral => {
                let tok = self.advance();
                Ok(Expression::Literal(Literal::Integer(
                    tok.text.parse().unwrap_or(0),
                )))
            }
            TokenKind::FloatLiteral => {
                let tok = self.advance();
                Ok(Expression::Literal(Literal::Float(
                    tok.text.parse().unwrap_or(0.0),
                )))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::Parameter => {
                let tok = self.advance();
                Ok(Expression::Parameter(tok.text[1..].to_string()))
            }
            TokenKind::LBracket => self.parse_bracket_expression(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')' to close a parenthesized expression")?;
                Ok(expr)
            }
            TokenKind::Case => self.parse_case(),
            TokenKind::Exists => self.parse_exists(),
            TokenKind::Any | TokenKind::None | TokenKind::Single => self.parse_list_predicate(),
            TokenKind::All if self.tokens[self.pos + 1].kind == TokenKind::LParen => {
                self.parse_all_predicate()
            }
            TokenKind::Count if self.tokens[self.pos + 1].kind == TokenKind::LParen => {
                self.parse_function_call()
            }
            TokenKind::Identifier => self.parse_identifier_led(),
            _ => Err(self.syntax_error("expected an expression")),
        }
    }

    fn parse_identifier_led(&mut self) -> Result<Expression, EngineError> {
        let name = self.advance().text.to_string();
        if self.at(TokenKind::LParen) {
            return self.finish_function_call(name);
        }
        Ok(Expression::Variable(name))
    }

    fn parse_function_call(&mut self) -> Result<Expression, EngineError> {
        let name = self.advance().text.to_string();
        self.finish_function_call(name)
    }

    fn finish_function_call(&mut self, name: String) -> Result<Expression, EngineError> {
        self.expect(TokenKind::LParen, "'(' after function name")?;
        let distinct = self.eat(TokenKind::Distinct);
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            if self.at(TokenKind::Star) {
                self.advance();
                args.push(Expression::Variable("*".to_string()));
            } else {
                args.push(self.parse_expression()?);
                while self.eat(TokenKind::Comma) {
                    args.push(self.parse_expression()?);
                }
            }
        }
        self.expect(TokenKind::RParen, "')' to close function call")?;
        Ok(Expression::Function {
            name,
            args,
            distinct,
        })
    }

    fn parse_bracket_expression(&mut self) -> Result<Expression, EngineError> {
        self.expect(TokenKind::LBracket, "'['")?;
        // List comprehension or list predicate shape: `[x IN L WHERE c | m]`.
        if self.at(TokenKind::Identifier) && self.tokens[self.pos + 1].kind == TokenKind::In {
            let variable = self.advance().text.to_string();
            self.advance(); // IN
            let source = self.parse_expression()?;
            let filter = if self.eat(TokenKind::Where) {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            let map = if self.eat(TokenKind::Pipe) {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            self.expect(TokenKind::RBracket, "']' to close list comprehension")?;
            return Ok(Expression::ListComprehension {
                variable,
                source: Box::new(source),
                filter,
                map,
            });
        }
        let mut items = Vec::new();
        if !self.at(TokenKind::RBracket) {
            items.push(self.parse_expression()?);
            while self.eat(TokenKind::Comma) {
                items.push(self.parse_expression()?);
            }
        }
        self.expect(TokenKind::RBracket, "']' to close a list literal")?;
        Ok(Expression::List(items))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, EngineError> {
        self.expect(TokenKind::LBrace, "'{' to start a property map")?;
        let mut pairs = Vec::new();
        if !self.at(TokenKind::RBrace) {
            loop {
                let key = self.expect_identifier_as_property()?;
                self.expect(TokenKind::Colon, "':' in property map")?;
                let value = self.parse_expression()?;
                pairs.push((key, value));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}' to close a property map")?;
        Ok(Expression::Object(pairs))
    }

    fn parse_case(&mut self) -> Result<Expression, EngineError> {
        self.expect(TokenKind::Case, "CASE")?;
        let subject = if !self.at(TokenKind::When) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        let mut whens = Vec::new();
        while self.eat(TokenKind::When) {
            let when = self.parse_expression()?;
            self.expect(TokenKind::Then, "THEN after WHEN")?;
            let then = self.parse_expression()?;
            whens.push(CaseWhen { when, then });
        }
        let else_branch = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect(TokenKind::End, "END to close CASE")?;
        Ok(Expression::Case {
            subject,
            whens,
            else_branch,
        })
    }

    fn parse_exists(&mut self) -> Result<Expression, EngineError> {
        self.expect(TokenKind::Exists, "EXISTS")?;
        self.expect(TokenKind::LParen, "'(' after EXISTS")?;
        let pattern = self.parse_pattern_path()?;
        self.expect(TokenKind::RParen, "')' to close EXISTS")?;
        Ok(Expression::Exists(Box::new(pattern)))
    }

    fn parse_list_predicate(&mut self) -> Result<Expression, EngineError> {
        let kind = match self.peek_kind() {
            TokenKind::Any => ListPredicateKind::Any,
            TokenKind::None => ListPredicateKind::None,
            TokenKind::Single => ListPredicateKind::Single,
            _ => unreachable!(),
        };
        self.advance();
        self.expect(TokenKind::LParen, "'(' after list predicate keyword")?;
        let variable = self.expect_identifier()?;
        self.expect(TokenKind::In, "IN in list predicate")?;
        let source = self.parse_expression()?;
        self.expect(TokenKind::Where, "WHERE in list predicate")?;
        let filter = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')' to close list predicate")?;
        Ok(Expression::ListPredicate {
            kind,
            variable,
            source: Box::new(source),
            filter: Box::new(filter),
        })
    }
}

/// `ALL(...)` reuses the same keyword as `UNION ALL`; disambiguated here by
/// only reaching `parse_list_predicate` from primary-expression position. A
/// separate entry handles the `ALL(x IN ... WHERE ...)` spelling.
impl<'a> Parser<'a> {
    fn parse_all_predicate(&mut self) -> Result<Expression, EngineError> {
        self.expect(TokenKind::All, "ALL")?;
        self.expect(TokenKind::LParen, "'(' after ALL")?;
        let variable = self.expect_identifier()?;
        self.expect(TokenKind::In, "IN in ALL(...)")?;
        let source = self.parse_expression()?;
        self.expect(TokenKind::Where, "WHERE in ALL(...)")?;
        let filter = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')' to close ALL(...)")?;
        Ok(Expression::ListPredicate {
            kind: ListPredicateKind::All,
            variable,
            source: Box::new(source),
            filter: Box::new(filter),
        })
    }
}

fn is_keyword_as_identifier(kind: TokenKind) -> bool {
    // Many Cypher keywords are valid property/label names (spec.md §4.2).
    !matches!(
        kind,
        TokenKind::Eof
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::LBracket
            | TokenKind::RBracket
            | TokenKind::LBrace
            | TokenKind::RBrace
    ) && matches!(
        kind,
        TokenKind::Create
            | TokenKind::Match
            | TokenKind::Optional
            | TokenKind::Merge
            | TokenKind::Set
            | TokenKind::Delete
            | TokenKind::Detach
            | TokenKind::Return
            | TokenKind::Where
            | TokenKind::And
            | TokenKind::Or
            | TokenKind::Not
            | TokenKind::Limit
            | TokenKind::Skip
            | TokenKind::Order
            | TokenKind::By
            | TokenKind::Asc
            | TokenKind::Desc
            | TokenKind::As
            | TokenKind::With
            | TokenKind::Unwind
            | TokenKind::Union
            | TokenKind::All
            | TokenKind::Call
            | TokenKind::Yield
            | TokenKind::Distinct
            | TokenKind::Count
            | TokenKind::Contains
            | TokenKind::Starts
            | TokenKind::Ends
            | TokenKind::In
            | TokenKind::Is
            | TokenKind::Case
            | TokenKind::When
            | TokenKind::Then
            | TokenKind::Else
            | TokenKind::End
            | TokenKind::Exists
            | TokenKind::Any
            | TokenKind::None
            | TokenKind::Single
            | TokenKind::Remove
            | TokenKind::On
    )
}

fn unescape_string(raw: &str) -> String {
    // `raw` includes the surrounding quotes.
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

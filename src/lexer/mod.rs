//! Hand-written, single-pass tokenizer. Character-by-character, tracks
//! line/column for diagnostics. No parser-combinator crate is used here by
//! design (see DESIGN.md) — the rest of the crate's idiom (typed AST,
//! `thiserror` errors, arena-free borrowed `&str` tokens) still follows the
//! teacher.

use crate::error::{EngineError, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Create,
    Match,
    Optional,
    Merge,
    Set,
    Delete,
    Detach,
    Return,
    Where,
    And,
    Or,
    Not,
    Limit,
    Skip,
    Order,
    By,
    Asc,
    Desc,
    As,
    With,
    Unwind,
    Union,
    All,
    Call,
    Yield,
    Distinct,
    Count,
    True,
    False,
    Null,
    Contains,
    Starts,
    Ends,
    In,
    Is,
    Case,
    When,
    Then,
    Else,
    End,
    Exists,
    Any,
    None,
    Single,
    Remove,
    On,

    Identifier,
    StringLiteral,
    IntegerLiteral,
    FloatLiteral,
    Parameter,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Dot,
    DotDot,
    Star,
    Pipe,

    // Operators
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    Plus,
    Minus,
    Slash,
    Percent,
    Caret,
    ArrowRight,
    ArrowLeft,
    Dash,

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl<'a> Token<'a> {
    pub fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }
}

fn keyword_kind(word: &str) -> Option<TokenKind> {
    let upper = word.to_ascii_uppercase();
    Some(match upper.as_str() {
        "CREATE" => TokenKind::Create,
        "MATCH" => TokenKind::Match,
        "OPTIONAL" => TokenKind::Optional,
        "MERGE" => TokenKind::Merge,
        "SET" => TokenKind::Set,
        "DELETE" => TokenKind::Delete,
        "DETACH" => TokenKind::Detach,
        "RETURN" => TokenKind::Return,
        "WHERE" => TokenKind::Where,
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        "LIMIT" => TokenKind::Limit,
        "SKIP" => TokenKind::Skip,
        "ORDER" => TokenKind::Order,
        "BY" => TokenKind::By,
        "ASC" | "ASCENDING" => TokenKind::Asc,
        "DESC" | "DESCENDING" => TokenKind::Desc,
        "AS" => TokenKind::As,
        "WITH" => TokenKind::With,
        "UNWIND" => TokenKind::Unwind,
        "UNION" => TokenKind::Union,
        "ALL" => TokenKind::All,
        "CALL" => TokenKind::Call,
        "YIELD" => TokenKind::Yield,
        "DISTINCT" => TokenKind::Distinct,
        "COUNT" => TokenKind::Count,
        "TRUE" => TokenKind::True,
        "FALSE" => TokenKind::False,
        "NULL" => TokenKind::Null,
        "CONTAINS" => TokenKind::Contains,
        "STARTS" => TokenKind::Starts,
        "ENDS" => TokenKind::Ends,
        "IN" => TokenKind::In,
        "IS" => TokenKind::Is,
        "CASE" => TokenKind::Case,
        "WHEN" => TokenKind::When,
        "THEN" => TokenKind::Then,
        "ELSE" => TokenKind::Else,
        "END" => TokenKind::End,
        "EXISTS" => TokenKind::Exists,
        "ANY" => TokenKind::Any,
        "NONE" => TokenKind::None,
        "SINGLE" => TokenKind::Single,
        "REMOVE" => TokenKind::Remove,
        "ON" => TokenKind::On,
        _ => return Option::None,
    })
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>, EngineError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.pos;
            let (line, column) = (self.line, self.column);
            if self.pos >= self.bytes.len() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    text: "",
                    offset: start,
                    line,
                    column,
                });
                break;
            }
            let c = self.bytes[self.pos] as char;
            let kind = if c == '"' || c == '\'' {
                self.read_string(c)?
            } else if c.is_ascii_digit() {
                self.read_number()
            } else if c == '$' {
                self.read_parameter()?
            } else if is_ident_start(c) {
                self.read_identifier_or_keyword()
            } else {
                self.read_punctuation()?
            };
            let text = &self.src[start..self.pos];
            tokens.push(Token {
                kind,
                text,
                offset: start,
                line,
                column,
            });
        }
        Ok(tokens)
    }

    fn skip_trivia(&mut self) {
        loop {
            while self.pos < self.bytes.len() {
                let c = self.bytes[self.pos] as char;
                if c == ' ' || c == '\t' || c == '\r' {
                    self.advance();
                } else if c == '\n' {
                    self.pos += 1;
                    self.line += 1;
                    self.column = 1;
                } else {
                    break;
                }
            }
            if self.pos + 1 < self.bytes.len()
                && self.bytes[self.pos] == b'/'
                && self.bytes[self.pos + 1] == b'/'
            {
                while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
        self.column += 1;
    }

    fn read_string(&mut self, quote: char) -> Result<TokenKind, EngineError> {
        let (line, column, offset) = (self.line, self.column, self.pos);
        self.advance(); // opening quote
        loop {
            if self.pos >= self.bytes.len() {
                return Err(EngineError::Lexical {
                    message: "unterminated string literal".to_string(),
                    position: Position {
                        offset,
                        line,
                        column,
                    },
                });
            }
            let c = self.bytes[self.pos] as char;
            if c == '\\' {
                self.advance();
                if self.pos < self.bytes.len() {
                    self.advance();
                }
                continue;
            }
            if c == quote {
                self.advance();
                break;
            }
            if c == '\n' {
                self.line += 1;
                self.column = 1;
                self.pos += 1;
            } else {
                self.advance();
            }
        }
        Ok(TokenKind::StringLiteral)
    }

    fn read_number(&mut self) -> TokenKind {
        while self.pos < self.bytes.len() && (self.bytes[self.pos] as char).is_ascii_digit() {
            self.advance();
        }
        let mut is_float = false;
        if self.pos < self.bytes.len()
            && self.bytes[self.pos] == b'.'
            && self.pos + 1 < self.bytes.len()
            && (self.bytes[self.pos + 1] as char).is_ascii_digit()
        {
            is_float = true;
            self.advance();
            while self.pos < self.bytes.len() && (self.bytes[self.pos] as char).is_ascii_digit() {
                self.advance();
            }
        }
        if self.pos < self.bytes.len() && (self.bytes[self.pos] == b'e' || self.bytes[self.pos] == b'E')
        {
            let save = self.pos;
            let save_col = self.column;
            self.advance();
            if self.pos < self.bytes.len()
                && (self.bytes[self.pos] == b'+' || self.bytes[self.pos] == b'-')
            {
                self.advance();
            }
            if self.pos < self.bytes.len() && (self.bytes[self.pos] as char).is_ascii_digit() {
                is_float = true;
                while self.pos < self.bytes.len() && (self.bytes[self.pos] as char).is_ascii_digit()
                {
                    self.advance();
                }
            } else {
                self.pos = save;
                self.column = save_col;
            }
        }
        if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntegerLiteral
        }
    }

    fn read_parameter(&mut self) -> Result<TokenKind, EngineError> {
        let (line, column, offset) = (self.line, self.column, self.pos);
        self.advance(); // '$'
        if self.pos >= self.bytes.len() || !is_ident_start(self.bytes[self.pos] as char) {
            return Err(EngineError::Lexical {
                message: "expected parameter name after '$'".to_string(),
                position: Position {
                    offset,
                    line,
                    column,
                },
            });
        }
        while self.pos < self.bytes.len() && is_ident_continue(self.bytes[self.pos] as char) {
            self.advance();
        }
        Ok(TokenKind::Parameter)
    }

    fn read_identifier_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_ident_continue(self.bytes[self.pos] as char) {
            self.advance();
        }
        let word = &self.src[start..self.pos];
        keyword_kind(word).unwrap_or(TokenKind::Identifier)
    }

    fn read_punctuation(&mut self) -> Result<TokenKind, EngineError> {
        let (line, column, offset) = (self.line, self.column, self.pos);
        let c = self.bytes[self.pos] as char;
        let two = if self.pos + 1 < self.bytes.len() {
            Some(self.bytes[self.pos + 1] as char)
        } else {
            Option::None
        };
        let kind = match (c, two) {
            ('<', Some('>')) => {
                self.advance();
                self.advance();
                return Ok(TokenKind::Neq);
            }
            ('<', Some('=')) => {
                self.advance();
                self.advance();
                return Ok(TokenKind::Lte);
            }
            ('>', Some('=')) => {
                self.advance();
                self.advance();
                return Ok(TokenKind::Gte);
            }
            ('<', Some('-')) => {
                self.advance();
                self.advance();
                return Ok(TokenKind::ArrowLeft);
            }
            ('-', Some('>')) => {
                self.advance();
                self.advance();
                return Ok(TokenKind::ArrowRight);
            }
            ('.', Some('.')) => {
                self.advance();
                self.advance();
                return Ok(TokenKind::DotDot);
            }
            ('(', _) => TokenKind::LParen,
            (')', _) => TokenKind::RParen,
            ('[', _) => TokenKind::LBracket,
            (']', _) => TokenKind::RBracket,
            ('{', _) => TokenKind::LBrace,
            ('}', _) => TokenKind::RBrace,
            (':', _) => TokenKind::Colon,
            (',', _) => TokenKind::Comma,
            ('.', _) => TokenKind::Dot,
            ('*', _) => TokenKind::Star,
            ('|', _) => TokenKind::Pipe,
            ('=', _) => TokenKind::Eq,
            ('<', _) => TokenKind::Lt,
            ('>', _) => TokenKind::Gt,
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Dash,
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,
            ('^', _) => TokenKind::Caret,
            _ => {
                return Err(EngineError::Lexical {
                    message: format!("unexpected character '{}'", c),
                    position: Position {
                        offset,
                        line,
                        column,
                    },
                });
            }
        };
        self.advance();
        Ok(kind)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_simple_match() {
        let kinds = kinds("MATCH (n:Person) RETURN n.name");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Match,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::RParen,
                TokenKind::Return,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(kinds("match")[0], TokenKind::Match);
        assert_eq!(kinds("Match")[0], TokenKind::Match);
        assert_eq!(kinds("MATCH")[0], TokenKind::Match);
    }

    #[test]
    fn reads_parameters_and_numbers() {
        let toks = Lexer::new("$name 42 3.14").tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::Parameter);
        assert_eq!(toks[0].text, "$name");
        assert_eq!(toks[1].kind, TokenKind::IntegerLiteral);
        assert_eq!(toks[2].kind, TokenKind::FloatLiteral);
    }

    #[test]
    fn unterminated_string_is_lexical_error() {
        let err = Lexer::new("'abc").tokenize().unwrap_err();
        assert!(matches!(err, EngineError::Lexical { .. }));
    }

    #[test]
    fn variable_length_edge_tokens() {
        let kinds = kinds("-[*1..3]->");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Dash,
                TokenKind::LBracket,
                TokenKind::Star,
                TokenKind::IntegerLiteral,
                TokenKind::DotDot,
                TokenKind::IntegerLiteral,
                TokenKind::RBracket,
                TokenKind::ArrowRight,
                TokenKind::Eof,
            ]
        );
    }
}

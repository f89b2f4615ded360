//! Error taxonomy for the engine.
//!
//! One [`EngineError`] variant family per behavioral error kind named in the
//! design (lexical, syntax, name, type, unsupported-feature, constraint-violation,
//! storage). The parser and lexer carry position information; everything else is
//! caught once at the query boundary in [`crate::Engine::execute`] and flattened
//! into a [`QueryError`].

use thiserror::Error;

/// A position in the original query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("{message}")]
    Lexical { message: String, position: Position },

    #[error("{message}")]
    Syntax { message: String, position: Position },

    #[error("unknown variable `{0}`")]
    NameError(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl EngineError {
    pub fn position(&self) -> Option<Position> {
        match self {
            EngineError::Lexical { position, .. } => Some(*position),
            EngineError::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::StorageError(err.to_string())
    }
}

/// Wire-shaped error returned to callers. Position fields are only populated
/// for parser/lexer failures, per spec policy.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl From<EngineError> for QueryError {
    fn from(err: EngineError) -> Self {
        let pos = err.position();
        QueryError {
            message: err.to_string(),
            line: pos.map(|p| p.line),
            column: pos.map(|p| p.column),
            position: pos.map(|p| p.offset),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

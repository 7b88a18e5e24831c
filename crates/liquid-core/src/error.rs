//! Error types for the LiquidCode compiler
//!
//! Each pipeline stage has its own error type, and `Error` wraps all of them.
//! The first error aborts the call; nothing is retried or recovered.

use thiserror::Error;

use crate::parser::scanner::Span;

/// Illegal character, unterminated string or malformed token
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Lex error at {position}: {message}")]
pub struct LexError {
    pub position: Span,
    /// The offending text, or `end of input`
    pub found: String,
    pub message: String,
}

/// Token stream does not match the grammar
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error at {position}: expected {expected}, found {found}")]
pub struct ParseError {
    pub expected: String,
    pub found: String,
    pub position: Span,
}

/// Well-formed program that cannot be resolved into a schema
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Semantic error [{kind}]: {detail}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub detail: String,
    /// Where the offending construct starts, when it came from source text
    pub position: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SemanticErrorKind {
    #[error("unknown-block-type")]
    UnknownBlockType,
    #[error("undeclared-signal")]
    UndeclaredSignal,
    #[error("duplicate-layer")]
    DuplicateLayer,
    #[error("unresolved-layer")]
    UnresolvedLayer,
}

/// Any failure raised by the compiler
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    /// Schema JSON could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Source position of the failure, if it has one
    pub fn position(&self) -> Option<&Span> {
        match self {
            Error::Lex(e) => Some(&e.position),
            Error::Parse(e) => Some(&e.position),
            Error::Semantic(e) => e.position.as_ref(),
            Error::Json(_) => None,
        }
    }

    /// Short stage name: `lex`, `parse`, `semantic` or `json`
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Lex(_) => "lex",
            Error::Parse(_) => "parse",
            Error::Semantic(_) => "semantic",
            Error::Json(_) => "json",
        }
    }
}

/// Result type alias for compiler operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn span(line: usize, column: usize) -> Span {
        Span {
            line,
            column,
            offset: 0,
        }
    }

    #[test]
    fn test_lex_error_display() {
        let err = LexError {
            position: span(2, 7),
            found: "end of input".into(),
            message: "unterminated string".into(),
        };
        assert_eq!(err.to_string(), "Lex error at 2:7: unterminated string");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            expected: "']'".into(),
            found: "end of input".into(),
            position: span(1, 12),
        };
        assert_eq!(
            err.to_string(),
            "Parse error at 1:12: expected ']', found end of input"
        );
    }

    #[test]
    fn test_semantic_error_display() {
        let err = SemanticError {
            kind: SemanticErrorKind::UnresolvedLayer,
            detail: "layer 9 is never defined".into(),
            position: None,
        };
        assert_eq!(
            err.to_string(),
            "Semantic error [unresolved-layer]: layer 9 is never defined"
        );
    }

    #[test]
    fn test_error_wraps_stage() {
        let err: Error = ParseError {
            expected: "block".into(),
            found: "'#'".into(),
            position: span(1, 1),
        }
        .into();
        assert_eq!(err.stage(), "parse");
        assert_eq!(err.position().map(|p| p.column), Some(1));
        assert!(err.to_string().starts_with("Parse error"));
    }
}

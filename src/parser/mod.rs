//! Line parsing.
//!
//! A raw input line goes through two stages:
//! - the [tokenizer](tokenize) splits it into words, operators and a
//!   trailing comment, expanding `$VAR` references on the way;
//! - the [statement builder](build_statements) groups words into
//!   [`Statement`]s separated by `;`.
//!
//! [`parse_line`] runs both stages and handles the `?` help shorthand.

mod statement;
mod tokenizer;

use thiserror::Error;

pub use statement::{build_statements, parse_line, Statement};
pub use tokenizer::{tokenize, Operator, Token};

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// A quote was opened but never closed.
    #[error("missing closing {0}")]
    UnterminatedQuote(char),

    /// A `${` substitution was opened but never closed.
    #[error("unterminated variable substitution")]
    UnterminatedSubstitution,

    /// The line ends with a lone backslash.
    #[error("dangling escape at end of line")]
    DanglingEscape,

    /// An operator other than `;` was used.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(Operator),
}

/// A line that failed to parse, together with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error in `{line}`: {kind}")]
pub struct ParseError {
    /// The offending input line.
    pub line: String,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// Create a parse error for `line`.
    pub fn new(line: impl Into<String>, kind: ParseErrorKind) -> Self {
        Self {
            line: line.into(),
            kind,
        }
    }
}

//! Grouping tokens into statements.

use std::collections::HashMap;

use super::tokenizer::{tokenize, Operator, Token};
use super::{ParseError, ParseErrorKind};

/// One command invocation: the command name followed by its arguments.
///
/// A statement is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    args: Vec<String>,
}

impl Statement {
    /// Create a statement from an argument vector.
    ///
    /// Returns `None` if `args` is empty.
    pub fn new(args: Vec<String>) -> Option<Self> {
        if args.is_empty() {
            None
        } else {
            Some(Self { args })
        }
    }

    /// The command name (`argv[0]`).
    pub fn name(&self) -> &str {
        &self.args[0]
    }

    /// The arguments after the command name.
    pub fn args(&self) -> &[String] {
        &self.args[1..]
    }

    /// The full argument vector, command name included.
    pub fn argv(&self) -> &[String] {
        &self.args
    }
}

/// Group `tokens` into statements separated by `;`.
///
/// Empty statements are dropped, a comment ends the line, and every
/// operator other than `;` is rejected.
pub fn build_statements(tokens: Vec<Token>) -> Result<Vec<Statement>, ParseErrorKind> {
    let mut statements = Vec::new();
    let mut current = Vec::new();

    for token in tokens {
        match token {
            Token::Word(word) => current.push(word),
            Token::Comment(_) => break,
            Token::Op(Operator::Separator) => {
                statements.extend(Statement::new(std::mem::take(&mut current)));
            }
            Token::Op(op) => return Err(ParseErrorKind::UnsupportedOperator(op)),
        }
    }

    statements.extend(Statement::new(current));
    Ok(statements)
}

/// Parse a full input line into statements.
///
/// The line `?` is shorthand for `help` and skips tokenization.
pub fn parse_line(line: &str, vars: &HashMap<String, String>) -> Result<Vec<Statement>, ParseError> {
    if line.trim() == "?" {
        return Ok(vec![Statement {
            args: vec!["help".to_string()],
        }]);
    }

    tokenize(line, vars)
        .and_then(build_statements)
        .map_err(|kind| ParseError::new(line, kind))
}

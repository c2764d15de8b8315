//! Quote-aware tokenizer with variable substitution.

use std::collections::HashMap;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::ParseErrorKind;

/// Shell operators recognized by the tokenizer.
///
/// Only [`Operator::Separator`] is accepted by the statement builder; the
/// rest are recognized so they can be rejected instead of being read as
/// plain arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `;`
    Separator,
    /// `|`
    Pipe,
    /// `||`
    Or,
    /// `&`
    Background,
    /// `&&`
    And,
    /// `>`
    RedirectOut,
    /// `>>`
    Append,
    /// `<`
    RedirectIn,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
}

impl Operator {
    /// The operator as written in the input.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Separator => ";",
            Self::Pipe => "|",
            Self::Or => "||",
            Self::Background => "&",
            Self::And => "&&",
            Self::RedirectOut => ">",
            Self::Append => ">>",
            Self::RedirectIn => "<",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single lexical unit of an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A plain argument, quotes removed and variables expanded.
    Word(String),
    /// A `#` comment running to the end of the line (text after the `#`).
    Comment(String),
    /// A shell operator.
    Op(Operator),
}

/// Split `line` into tokens, expanding `$NAME` and `${NAME}` from `vars`.
///
/// Quoting follows the usual shell rules: single quotes are literal,
/// double quotes allow `$` expansion and backslash escapes of `"`, `\`,
/// `$` and `` ` ``. Unset variables expand to nothing.
pub fn tokenize(line: &str, vars: &HashMap<String, String>) -> Result<Vec<Token>, ParseErrorKind> {
    Lexer::new(line, vars).run()
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    vars: &'a HashMap<String, String>,
    tokens: Vec<Token>,
    word: String,
    // Set once anything (even an empty pair of quotes) belongs to the word.
    in_word: bool,
    // Set when a word began, even if it may still expand to nothing.
    started: bool,
}

impl<'a> Lexer<'a> {
    fn new(line: &'a str, vars: &'a HashMap<String, String>) -> Self {
        Self {
            chars: line.chars().peekable(),
            vars,
            tokens: Vec::new(),
            word: String::new(),
            in_word: false,
            started: false,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseErrorKind> {
        while let Some(ch) = self.chars.next() {
            match ch {
                c if c.is_whitespace() => self.finish_word(),
                '\'' => {
                    self.in_word = true;
                    self.read_single_quoted()?;
                }
                '"' => {
                    self.in_word = true;
                    self.read_double_quoted()?;
                }
                '\\' => match self.chars.next() {
                    Some(c) => self.push(c),
                    None => return Err(ParseErrorKind::DanglingEscape),
                },
                '$' => {
                    self.started = true;
                    self.expand_variable()?;
                }
                '#' if !self.in_word && !self.started => {
                    let text: String = self.chars.by_ref().collect();
                    self.tokens.push(Token::Comment(text));
                    break;
                }
                ';' | '|' | '&' | '<' | '>' | '(' | ')' => {
                    self.finish_word();
                    let op = self.read_operator(ch);
                    self.tokens.push(Token::Op(op));
                }
                c => self.push(c),
            }
        }

        self.finish_word();
        Ok(self.tokens)
    }

    fn push(&mut self, ch: char) {
        self.word.push(ch);
        self.in_word = true;
    }

    fn push_str(&mut self, text: &str) {
        if !text.is_empty() {
            self.word.push_str(text);
            self.in_word = true;
        }
    }

    fn finish_word(&mut self) {
        if self.in_word {
            self.tokens.push(Token::Word(std::mem::take(&mut self.word)));
            self.in_word = false;
        }
        self.started = false;
    }

    fn read_single_quoted(&mut self) -> Result<(), ParseErrorKind> {
        loop {
            match self.chars.next() {
                Some('\'') => return Ok(()),
                Some(c) => self.word.push(c),
                None => return Err(ParseErrorKind::UnterminatedQuote('\'')),
            }
        }
    }

    fn read_double_quoted(&mut self) -> Result<(), ParseErrorKind> {
        loop {
            match self.chars.next() {
                Some('"') => return Ok(()),
                Some('\\') => match self.chars.next() {
                    Some(c @ ('"' | '\\' | '$' | '`')) => self.word.push(c),
                    Some(c) => {
                        self.word.push('\\');
                        self.word.push(c);
                    }
                    None => return Err(ParseErrorKind::UnterminatedQuote('"')),
                },
                Some('$') => self.expand_variable()?,
                Some(c) => self.word.push(c),
                None => return Err(ParseErrorKind::UnterminatedQuote('"')),
            }
        }
    }

    fn expand_variable(&mut self) -> Result<(), ParseErrorKind> {
        let name = match self.chars.peek().copied() {
            Some('{') => {
                self.chars.next();
                let mut name = String::new();
                loop {
                    match self.chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(ParseErrorKind::UnterminatedSubstitution),
                    }
                }
                name
            }
            Some(c) if is_name_char(c) => {
                let mut name = String::new();
                while let Some(c) = self.chars.next_if(|c| is_name_char(*c)) {
                    name.push(c);
                }
                name
            }
            _ => {
                self.push('$');
                return Ok(());
            }
        };

        let value = self.vars.get(&name).cloned().unwrap_or_default();
        self.push_str(&value);
        Ok(())
    }

    fn read_operator(&mut self, first: char) -> Operator {
        match first {
            ';' => Operator::Separator,
            '|' if self.chars.next_if_eq(&'|').is_some() => Operator::Or,
            '|' => Operator::Pipe,
            '&' if self.chars.next_if_eq(&'&').is_some() => Operator::And,
            '&' => Operator::Background,
            '>' if self.chars.next_if_eq(&'>').is_some() => Operator::Append,
            '>' => Operator::RedirectOut,
            '<' => Operator::RedirectIn,
            '(' => Operator::OpenParen,
            _ => Operator::CloseParen,
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

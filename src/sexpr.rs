//! Raw s-expression parser for rule patterns and results.
//!
//! This is the untyped stage: text → [`SExpr`]. Whether a qualifier is legal
//! where it appears is decided later by [`crate::ast`].

use winnow::combinator::{cut_err, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

/// Parse error for rule s-expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

/// `(opcode item*)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SExpr {
    pub opcode: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// `<...>`
    Type(String),
    /// `[...]`
    AuxInt(String),
    /// `{...}`
    Aux(String),
    /// A positional argument, optionally named as in `name:(...)`.
    Arg { name: Option<String>, term: Term },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Leaf(String),
    Node(SExpr),
}

// ============================================================================
// Winnow parsers
// ============================================================================

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_whitespace())
        .void()
        .parse_next(input)
}

/// A bare token: anything up to whitespace, a bracket, or `:`.
fn token<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| {
        !c.is_whitespace() && !matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | ':')
    })
    .parse_next(input)
}

/// Content between `open` and its matching `close`, counting only nested
/// occurrences of the same delimiter pair.
fn balanced<'a>(mut open: char, close: char) -> impl FnMut(&mut &'a str) -> ModalResult<&'a str> {
    move |input: &mut &'a str| {
        open.parse_next(input)?;
        let mut depth = 1usize;
        for (i, c) in input.char_indices() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    let content = &input[..i];
                    *input = &input[i + c.len_utf8()..];
                    return Ok(content.trim());
                }
            }
        }
        Err(ErrMode::Cut(ContextError::new()))
    }
}

fn item(input: &mut &str) -> ModalResult<Item> {
    match input.chars().next() {
        Some('<') => balanced('<', '>')
            .map(|s: &str| Item::Type(s.to_owned()))
            .parse_next(input),
        Some('[') => balanced('[', ']')
            .map(|s: &str| Item::AuxInt(s.to_owned()))
            .parse_next(input),
        Some('{') => balanced('{', '}')
            .map(|s: &str| Item::Aux(s.to_owned()))
            .parse_next(input),
        Some('(') => sexpr
            .map(|e| Item::Arg {
                name: None,
                term: Term::Node(e),
            })
            .parse_next(input),
        _ => {
            let leaf = token.parse_next(input)?;
            if opt(':').parse_next(input)?.is_some() {
                let node = cut_err(sexpr).parse_next(input)?;
                Ok(Item::Arg {
                    name: Some(leaf.to_owned()),
                    term: Term::Node(node),
                })
            } else {
                Ok(Item::Arg {
                    name: None,
                    term: Term::Leaf(leaf.to_owned()),
                })
            }
        }
    }
}

pub(crate) fn sexpr(input: &mut &str) -> ModalResult<SExpr> {
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let opcode = cut_err(token).parse_next(input)?;
    let mut items = Vec::new();
    loop {
        ws.parse_next(input)?;
        if opt(')').parse_next(input)?.is_some() {
            break;
        }
        items.push(cut_err(item).parse_next(input)?);
    }
    Ok(SExpr {
        opcode: opcode.to_owned(),
        items,
    })
}

// ============================================================================
// Public API
// ============================================================================

/// Parse one term: an s-expression or a bare token, with nothing trailing.
pub fn parse_term(src: &str) -> Result<Term, ParseError> {
    let mut input = src.trim();
    let full = input;
    let offset = |rest: &str| full.len() - rest.len();

    let term = if input.starts_with('(') {
        sexpr
            .parse_next(&mut input)
            .map(Term::Node)
            .map_err(|_| ParseError {
                message: "malformed s-expression".to_owned(),
                offset: offset(input),
            })?
    } else {
        token
            .parse_next(&mut input)
            .map(|t: &str| Term::Leaf(t.to_owned()))
            .map_err(|_| ParseError {
                message: "expected an s-expression or a variable".to_owned(),
                offset: offset(input),
            })?
    };

    ws.parse_next(&mut input).map_err(|_| ParseError {
        message: "malformed s-expression".to_owned(),
        offset: offset(input),
    })?;
    if !input.is_empty() {
        return Err(ParseError {
            message: format!("unexpected trailing input {input:?}"),
            offset: offset(input),
        });
    }
    Ok(term)
}

impl std::fmt::Display for SExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}", self.opcode)?;
        for item in &self.items {
            match item {
                Item::Type(t) => write!(f, " <{t}>")?,
                Item::AuxInt(x) => write!(f, " [{x}]")?,
                Item::Aux(x) => write!(f, " {{{x}}}")?,
                Item::Arg { name, term } => {
                    f.write_str(" ")?;
                    if let Some(name) = name {
                        write!(f, "{name}:")?;
                    }
                    write!(f, "{term}")?;
                }
            }
        }
        f.write_str(")")
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Leaf(s) => f.write_str(s),
            Term::Node(e) => write!(f, "{e}"),
        }
    }
}

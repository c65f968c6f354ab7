//! Typed rule trees.
//!
//! Converts raw [`SExpr`]s into patterns and results, rejecting qualifiers in
//! places they cannot appear. Opcodes are not resolved here.

use std::fmt;

use crate::errors::{GenErrorKind, GenResult};
use crate::rule::Location;
use crate::sexpr::{self, Item, SExpr, Term};

/// A `<...>`, `[...]` or `{...}` qualifier on a pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// `_`: matches anything, binds nothing.
    Any,
    /// A bare identifier: binds on first use, tests equality afterwards.
    Bind(String),
    /// Any other host expression, compared for equality.
    Test(String),
}

impl Constraint {
    fn classify(content: &str) -> Self {
        if content == "_" {
            Constraint::Any
        } else if is_ident(content) && !is_reserved(content) {
            Constraint::Bind(content.to_owned())
        } else {
            Constraint::Test(content.to_owned())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    Wildcard,
    Variable(String),
    Op(Box<OpPattern>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpPattern {
    /// Explicit binding from `name:(...)`.
    pub name: Option<String>,
    pub opcode: String,
    pub ty: Option<Constraint>,
    pub aux_int: Option<Constraint>,
    pub aux: Option<Constraint>,
    pub args: Vec<Pattern>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultTree {
    Variable(String),
    Op(Box<OpResult>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpResult {
    pub opcode: String,
    pub ty: Option<String>,
    pub aux_int: Option<String>,
    pub aux: Option<String>,
    pub args: Vec<ResultTree>,
}

/// A value rule's right-hand side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultRule {
    /// Block expression from a leading `@expr`.
    pub redirect: Option<String>,
    pub root: ResultTree,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlPattern {
    /// `nil` or `_`.
    Any,
    Variable(String),
    Op(Box<OpPattern>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockPattern {
    pub kind: String,
    pub control: ControlPattern,
    /// `None` for a `_` successor.
    pub succs: Vec<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlResult {
    Nil,
    Variable(String),
    Op(Box<OpResult>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockResult {
    pub kind: String,
    pub control: ControlResult,
    pub succs: Vec<String>,
}

// ============================================================================
// Names
// ============================================================================

/// Whether `s` is a plain (non-raw, non-keyword) Rust identifier.
pub fn is_ident(s: &str) -> bool {
    !s.starts_with("r#") && syn::parse_str::<syn::Ident>(s).is_ok()
}

/// Names taken by generated code: the function, root value, block, config,
/// allocated values `v0`, `v1`, ... and positional children `v_0`, `v_0_1`, ...
fn is_reserved(name: &str) -> bool {
    if matches!(name, "f" | "v" | "b" | "config") {
        return true;
    }
    let Some(rest) = name.strip_prefix('v') else {
        return false;
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    all_digits(rest)
        || rest
            .strip_prefix('_')
            .is_some_and(|r| r.split('_').all(all_digits))
}

fn variable(loc: &Location, name: &str) -> GenResult<String> {
    if !is_ident(name) {
        return Err(syntax(loc, format!("invalid variable name {name:?}")));
    }
    if is_reserved(name) {
        return Err(syntax(
            loc,
            format!("variable name {name} is reserved for generated code"),
        ));
    }
    Ok(name.to_owned())
}

fn syntax(loc: &Location, message: String) -> crate::errors::GenError {
    GenErrorKind::Syntax {
        loc: loc.clone(),
        message,
    }
    .into()
}

fn set_once<T>(
    slot: &mut Option<T>,
    value: T,
    loc: &Location,
    what: &str,
    e: &SExpr,
) -> GenResult<()> {
    if slot.is_some() {
        return Err(syntax(loc, format!("duplicate {what} qualifier in {e}")));
    }
    *slot = Some(value);
    Ok(())
}

// ============================================================================
// Conversion
// ============================================================================

/// Parse text that must be a single s-expression.
pub fn parse_sexpr(loc: &Location, text: &str) -> GenResult<SExpr> {
    match sexpr::parse_term(text) {
        Ok(Term::Node(e)) => Ok(e),
        Ok(Term::Leaf(leaf)) => Err(syntax(
            loc,
            format!("expected an s-expression, found {leaf:?}"),
        )),
        Err(e) => Err(syntax(loc, format!("bad s-expression {text:?}: {e}"))),
    }
}

impl OpPattern {
    pub fn from_sexpr(loc: &Location, e: &SExpr) -> GenResult<Self> {
        Self::convert(loc, e, None)
    }

    fn convert(loc: &Location, e: &SExpr, name: Option<String>) -> GenResult<Self> {
        let mut pat = OpPattern {
            name,
            opcode: e.opcode.clone(),
            ty: None,
            aux_int: None,
            aux: None,
            args: Vec::new(),
        };
        for item in &e.items {
            match item {
                Item::Type(t) => set_once(&mut pat.ty, Constraint::classify(t), loc, "type", e)?,
                Item::AuxInt(x) => {
                    set_once(&mut pat.aux_int, Constraint::classify(x), loc, "auxint", e)?
                }
                Item::Aux(x) => set_once(&mut pat.aux, Constraint::classify(x), loc, "aux", e)?,
                Item::Arg { name, term } => pat.args.push(Pattern::convert(loc, name, term)?),
            }
        }
        Ok(pat)
    }
}

impl Pattern {
    fn convert(loc: &Location, name: &Option<String>, term: &Term) -> GenResult<Self> {
        match term {
            Term::Leaf(s) if s == "_" => Ok(Pattern::Wildcard),
            Term::Leaf(s) => Ok(Pattern::Variable(variable(loc, s)?)),
            Term::Node(e) => {
                let name = name.as_deref().map(|n| variable(loc, n)).transpose()?;
                Ok(Pattern::Op(Box::new(OpPattern::convert(loc, e, name)?)))
            }
        }
    }
}

impl OpResult {
    fn convert(loc: &Location, e: &SExpr) -> GenResult<Self> {
        let mut res = OpResult {
            opcode: e.opcode.clone(),
            ty: None,
            aux_int: None,
            aux: None,
            args: Vec::new(),
        };
        for item in &e.items {
            match item {
                Item::Type(t) => set_once(&mut res.ty, t.clone(), loc, "type", e)?,
                Item::AuxInt(x) => set_once(&mut res.aux_int, x.clone(), loc, "auxint", e)?,
                Item::Aux(x) => set_once(&mut res.aux, x.clone(), loc, "aux", e)?,
                Item::Arg { name: Some(n), .. } => {
                    return Err(syntax(
                        loc,
                        format!("named sub-expression {n}: is only allowed in patterns"),
                    ));
                }
                Item::Arg { name: None, term } => res.args.push(ResultTree::convert(loc, term)?),
            }
        }
        Ok(res)
    }
}

impl ResultTree {
    fn convert(loc: &Location, term: &Term) -> GenResult<Self> {
        match term {
            // `_` is never bound; the builder reports it as unbound.
            Term::Leaf(s) if s == "_" => Ok(ResultTree::Variable(s.clone())),
            Term::Leaf(s) if is_ident(s) => Ok(ResultTree::Variable(s.clone())),
            Term::Leaf(s) => Err(syntax(loc, format!("invalid variable name {s:?}"))),
            Term::Node(e) => Ok(ResultTree::Op(Box::new(OpResult::convert(loc, e)?))),
        }
    }
}

impl ResultRule {
    pub fn parse(loc: &Location, text: &str) -> GenResult<Self> {
        let (redirect, rest) = match text.strip_prefix('@') {
            Some(after) => {
                let Some((block, rest)) = after.split_once(char::is_whitespace) else {
                    return Err(syntax(loc, format!("redirect {text:?} has no result")));
                };
                (Some(block.to_owned()), rest.trim())
            }
            None => (None, text),
        };
        let term = sexpr::parse_term(rest)
            .map_err(|e| syntax(loc, format!("bad result {rest:?}: {e}")))?;
        Ok(ResultRule {
            redirect,
            root: ResultTree::convert(loc, &term)?,
        })
    }
}

fn block_shape<'e>(loc: &Location, e: &'e SExpr) -> GenResult<(&'e Term, Vec<&'e Term>)> {
    let mut terms = Vec::with_capacity(e.items.len());
    for item in &e.items {
        match item {
            Item::Arg { name: None, term } => terms.push(term),
            _ => {
                return Err(GenErrorKind::InvalidBlockRule {
                    loc: loc.clone(),
                    message: format!("block {e} may only list a control value and successors"),
                }
                .into());
            }
        }
    }
    if terms.is_empty() {
        return Err(GenErrorKind::InvalidBlockRule {
            loc: loc.clone(),
            message: format!("block {e} has no control value (use nil)"),
        }
        .into());
    }
    let control = terms.remove(0);
    Ok((control, terms))
}

fn successor(loc: &Location, term: &Term) -> GenResult<String> {
    match term {
        Term::Leaf(s) if s == "_" || is_ident(s) => Ok(s.clone()),
        _ => Err(GenErrorKind::InvalidBlockRule {
            loc: loc.clone(),
            message: format!("successor {term} must be a name"),
        }
        .into()),
    }
}

impl BlockPattern {
    pub fn from_sexpr(loc: &Location, e: &SExpr) -> GenResult<Self> {
        let (control, rest) = block_shape(loc, e)?;
        let control = match control {
            Term::Leaf(s) if s == "nil" || s == "_" => ControlPattern::Any,
            Term::Leaf(s) => ControlPattern::Variable(variable(loc, s)?),
            Term::Node(c) => ControlPattern::Op(Box::new(OpPattern::from_sexpr(loc, c)?)),
        };
        let succs = rest
            .into_iter()
            .map(|t| {
                let name = successor(loc, t)?;
                Ok((name != "_").then_some(name))
            })
            .collect::<GenResult<_>>()?;
        Ok(BlockPattern {
            kind: e.opcode.clone(),
            control,
            succs,
        })
    }
}

impl BlockResult {
    pub fn parse(loc: &Location, text: &str) -> GenResult<Self> {
        if text.starts_with('@') {
            return Err(GenErrorKind::InvalidBlockRule {
                loc: loc.clone(),
                message: "block results cannot be redirected".to_owned(),
            }
            .into());
        }
        let e = parse_sexpr(loc, text)?;
        let (control, rest) = block_shape(loc, &e)?;
        let control = match control {
            Term::Leaf(s) if s == "nil" => ControlResult::Nil,
            Term::Leaf(s) => ControlResult::Variable(s.clone()),
            Term::Node(c) => ControlResult::Op(Box::new(OpResult::convert(loc, c)?)),
        };
        let succs = rest
            .into_iter()
            .map(|t| successor(loc, t))
            .collect::<GenResult<_>>()?;
        Ok(BlockResult {
            kind: e.opcode,
            control,
            succs,
        })
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Any => f.write_str("_"),
            Constraint::Bind(s) | Constraint::Test(s) => f.write_str(s),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Wildcard => f.write_str("_"),
            Pattern::Variable(s) => f.write_str(s),
            Pattern::Op(op) => write!(f, "{op}"),
        }
    }
}

impl fmt::Display for OpPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}:")?;
        }
        write!(f, "({}", self.opcode)?;
        if let Some(t) = &self.ty {
            write!(f, " <{t}>")?;
        }
        if let Some(x) = &self.aux_int {
            write!(f, " [{x}]")?;
        }
        if let Some(x) = &self.aux {
            write!(f, " {{{x}}}")?;
        }
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for ResultTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultTree::Variable(s) => f.write_str(s),
            ResultTree::Op(op) => write!(f, "{op}"),
        }
    }
}

impl fmt::Display for OpResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.opcode)?;
        if let Some(t) = &self.ty {
            write!(f, " <{t}>")?;
        }
        if let Some(x) = &self.aux_int {
            write!(f, " [{x}]")?;
        }
        if let Some(x) = &self.aux {
            write!(f, " {{{x}}}")?;
        }
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for ResultRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(block) = &self.redirect {
            write!(f, "@{block} ")?;
        }
        write!(f, "{}", self.root)
    }
}

impl fmt::Display for BlockPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.kind)?;
        match &self.control {
            ControlPattern::Any => f.write_str(" nil")?,
            ControlPattern::Variable(s) => write!(f, " {s}")?,
            ControlPattern::Op(op) => write!(f, " {op}")?,
        }
        for succ in &self.succs {
            write!(f, " {}", succ.as_deref().unwrap_or("_"))?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for BlockResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.kind)?;
        match &self.control {
            ControlResult::Nil => f.write_str(" nil")?,
            ControlResult::Variable(s) => write!(f, " {s}")?,
            ControlResult::Op(op) => write!(f, " {op}")?,
        }
        for succ in &self.succs {
            write!(f, " {succ}")?;
        }
        f.write_str(")")
    }
}

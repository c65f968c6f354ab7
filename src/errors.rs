//! Error types for rule generation.
//!
//! Every error here is fatal: it points at a defect in a rule file or in the
//! descriptor pools, so generation stops at the first one.

use derive_more::Display;
use rulegen_schema::{AuxKind, SchemaError};

use crate::env::BindingKind;
use crate::rule::Location;

pub type GenResult<T> = Result<T, GenError>;

#[derive(Display, Debug)]
#[display("{kind}")]
pub struct GenError {
    kind: Box<GenErrorKind>,
}

impl<E> From<E> for GenError
where
    GenErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        GenError {
            kind: Box::new(GenErrorKind::from(error)),
        }
    }
}

impl GenError {
    pub fn kind(&self) -> &GenErrorKind {
        &self.kind
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        GenErrorKind::Io {
            path: path.display().to_string(),
            source,
        }
        .into()
    }
}

#[derive(Display, Debug)]
pub enum GenErrorKind {
    #[display("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[display("{_0}")]
    Schema(SchemaError),

    #[display("{loc}: unbalanced rule: {text}")]
    UnbalancedRule { loc: Location, text: String },

    #[display("{loc}: incomplete rule: {text}")]
    IncompleteRule { loc: Location, text: String },

    #[display("{loc}: no arrow in rule {text:?}")]
    NoArrow { loc: Location, text: String },

    #[display("{loc}: more than one arrow in rule {text:?}")]
    MultipleArrows { loc: Location, text: String },

    #[display("{loc}: {message}")]
    Syntax { loc: Location, message: String },

    #[display("{loc}: malformed expression `{text}`: {message}")]
    MalformedExpr {
        loc: Location,
        text: String,
        message: String,
    },

    #[display("{loc}: unknown op {name}")]
    UnknownOp { loc: Location, name: String },

    #[display("{loc}: unknown block kind {name}")]
    UnknownBlock { loc: Location, name: String },

    #[display("{loc}: op {op} {aux} can't have auxint")]
    AuxIntNotAllowed {
        loc: Location,
        op: String,
        aux: AuxKind,
    },

    #[display("{loc}: op {op} {aux} can't have aux")]
    AuxNotAllowed {
        loc: Location,
        op: String,
        aux: AuxKind,
    },

    #[display("{loc}: op {op} should have {expected} args, has {found}")]
    ArgCount {
        loc: Location,
        op: String,
        expected: usize,
        found: usize,
    },

    #[display("{loc}: unconditional rule {rule} is followed by other rules")]
    DeadRule { loc: Location, rule: String },

    #[display("{loc}: can't have a repeat successor name {name}")]
    RepeatSuccessor { loc: Location, name: String },

    #[display("{loc}: unknown successor {name}")]
    UnknownSuccessor { loc: Location, name: String },

    #[display("{loc}: sub-expression {expr} (op={op}) must have a type")]
    MissingType {
        loc: Location,
        expr: String,
        op: String,
    },

    #[display("{loc}: variable {name} is not bound by the pattern")]
    UnboundVariable { loc: Location, name: String },

    #[display("{loc}: variable {name} is bound as {previous} and used as {found}")]
    KindMismatch {
        loc: Location,
        name: String,
        previous: BindingKind,
        found: BindingKind,
    },

    #[display("{loc}: variable {name} clashes with a generated local")]
    NameClash { loc: Location, name: String },

    #[display("{loc}: {message}")]
    InvalidBlockRule { loc: Location, message: String },

    #[display("descriptor name {name:?} is not a Rust identifier")]
    InvalidName { name: String },

    #[display("two procedures would be named {name}")]
    DuplicateProcedure { name: String },

    #[display("generated code for {source_name} is malformed: {message}\n  near: {snippet}")]
    MalformedOutput {
        source_name: String,
        message: String,
        snippet: String,
    },
}

impl From<SchemaError> for GenErrorKind {
    fn from(error: SchemaError) -> Self {
        GenErrorKind::Schema(error)
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &*self.kind {
            GenErrorKind::Io { source, .. } => Some(source),
            GenErrorKind::Schema(e) => Some(e),
            _ => None,
        }
    }
}

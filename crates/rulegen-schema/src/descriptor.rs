//! Operation and block-kind descriptors.

use serde::{Deserialize, Serialize};

/// Kind of auxiliary data an operation carries.
///
/// The kind decides which rule qualifiers are legal on the op: `[...]` needs
/// an auxint-capable kind and `{...}` an aux-capable one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuxKind {
    #[default]
    None,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Float32,
    Float64,
    SymOff,
    SymValAndOff,
    SymInt32,
    String,
    Sym,
}

impl AuxKind {
    /// Whether a `[...]` auxint qualifier may be used with this kind.
    pub fn allows_aux_int(self) -> bool {
        matches!(
            self,
            AuxKind::Bool
                | AuxKind::Int8
                | AuxKind::Int16
                | AuxKind::Int32
                | AuxKind::Int64
                | AuxKind::Int128
                | AuxKind::Float32
                | AuxKind::Float64
                | AuxKind::SymOff
                | AuxKind::SymValAndOff
                | AuxKind::SymInt32
        )
    }

    /// Whether a `{...}` aux qualifier may be used with this kind.
    pub fn allows_aux(self) -> bool {
        matches!(
            self,
            AuxKind::String
                | AuxKind::Sym
                | AuxKind::SymOff
                | AuxKind::SymValAndOff
                | AuxKind::SymInt32
        )
    }
}

impl std::fmt::Display for AuxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Number of arguments an operation takes.
///
/// Serialized as an integer where `-1` means variable arity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Arity {
    Fixed(usize),
    Variable,
}

impl From<i32> for Arity {
    fn from(n: i32) -> Self {
        match usize::try_from(n) {
            Ok(n) => Arity::Fixed(n),
            Err(_) => Arity::Variable,
        }
    }
}

impl From<Arity> for i32 {
    fn from(arity: Arity) -> Self {
        match arity {
            Arity::Fixed(n) => n as i32,
            Arity::Variable => -1,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variable => write!(f, "variadic"),
        }
    }
}

/// Static description of one IR operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpDescriptor {
    pub name: String,
    pub arity: Arity,
    #[serde(default)]
    pub aux: AuxKind,
    /// Result type used when a rule constructs this op without `<...>`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub default_type: Option<String>,
}

impl OpDescriptor {
    pub fn new(name: impl Into<String>, arity: Arity) -> Self {
        Self {
            name: name.into(),
            arity,
            aux: AuxKind::None,
            default_type: None,
        }
    }

    pub fn with_aux(mut self, aux: AuxKind) -> Self {
        self.aux = aux;
        self
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.default_type = Some(ty.into());
        self
    }
}

/// Static description of one block kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub name: String,
}

impl BlockDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

//! Per-rule binding environment.
//!
//! Patterns bind names left to right, depth first. The first occurrence of a
//! name binds it; later occurrences become equality tests against the bound
//! value. Result code may only refer to names bound here.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::errors::{GenErrorKind, GenResult};
use crate::rule::Location;

/// What a bound name holds in generated code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Value,
    Type,
    AuxInt,
    Aux,
    Block,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingKind::Value => "value",
            BindingKind::Type => "type",
            BindingKind::AuxInt => "auxint",
            BindingKind::Aux => "aux",
            BindingKind::Block => "block",
        })
    }
}

/// Outcome of [`Env::bind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    /// First occurrence: emit a `let`.
    Fresh,
    /// Already bound with the same kind: emit an equality test.
    Repeat,
}

#[derive(Debug, Default)]
pub struct Env {
    names: HashMap<String, BindingKind>,
    /// Locals the matcher invents for unnamed children.
    generated: HashSet<String>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, loc: &Location, name: &str, kind: BindingKind) -> GenResult<Binding> {
        if self.generated.contains(name) {
            return Err(clash(loc, name));
        }
        match self.names.get(name) {
            None => {
                self.names.insert(name.to_owned(), kind);
                Ok(Binding::Fresh)
            }
            Some(&previous) if previous == kind => Ok(Binding::Repeat),
            Some(&previous) => Err(GenErrorKind::KindMismatch {
                loc: loc.clone(),
                name: name.to_owned(),
                previous,
                found: kind,
            }
            .into()),
        }
    }

    /// Claim a generated local. It must not collide with any rule variable,
    /// bound before or after.
    pub fn claim(&mut self, loc: &Location, name: &str) -> GenResult<()> {
        if self.names.contains_key(name) || !self.generated.insert(name.to_owned()) {
            return Err(clash(loc, name));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<BindingKind> {
        self.names.get(name).copied()
    }

    /// Check a use site in result code.
    pub fn require(&self, loc: &Location, name: &str, kind: BindingKind) -> GenResult<()> {
        match self.get(name) {
            Some(found) if found == kind => Ok(()),
            Some(previous) => Err(GenErrorKind::KindMismatch {
                loc: loc.clone(),
                name: name.to_owned(),
                previous,
                found: kind,
            }
            .into()),
            None => Err(GenErrorKind::UnboundVariable {
                loc: loc.clone(),
                name: name.to_owned(),
            }
            .into()),
        }
    }
}

fn clash(loc: &Location, name: &str) -> crate::errors::GenError {
    GenErrorKind::NameClash {
        loc: loc.clone(),
        name: name.to_owned(),
    }
    .into()
}

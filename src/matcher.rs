//! Pattern compiler.
//!
//! Turns an [`OpPattern`] into straight-line match code. Every failed test
//! emits `break`, so the code is meant to sit inside the per-rule `loop`.

use proc_macro2::{Ident, TokenStream};
use quote::quote;
use rulegen_schema::{Arity, Registry, ResolvedOp};

use crate::ast::{Constraint, OpPattern, Pattern};
use crate::env::{Binding, BindingKind, Env};
use crate::errors::{GenErrorKind, GenResult};
use crate::host;
use crate::rule::Location;

pub struct Matcher<'a> {
    registry: &'a Registry,
    loc: &'a Location,
    env: &'a mut Env,
    stmts: Vec<TokenStream>,
    can_fail: bool,
}

impl<'a> Matcher<'a> {
    pub fn new(registry: &'a Registry, loc: &'a Location, env: &'a mut Env) -> Self {
        Self {
            registry,
            loc,
            env,
            stmts: Vec::new(),
            can_fail: false,
        }
    }

    pub fn env(&mut self) -> &mut Env {
        &mut *self.env
    }

    pub fn loc(&self) -> &'a Location {
        self.loc
    }

    /// Emit a statement that never fails.
    pub fn push(&mut self, stmt: TokenStream) {
        self.stmts.push(stmt);
    }

    /// Emit a statement that may `break`.
    pub fn push_fallible(&mut self, stmt: TokenStream) {
        self.stmts.push(stmt);
        self.can_fail = true;
    }

    /// Break out of the rule when `failed` holds.
    pub fn guard(&mut self, failed: TokenStream) {
        self.push_fallible(quote! {
            if #failed {
                break;
            }
        });
    }

    /// Break out of the rule unless the host condition holds.
    pub fn condition(&mut self, cond: &str) -> GenResult<()> {
        let cond = host::expr(self.loc, cond)?;
        self.guard(quote!(!#cond));
        Ok(())
    }

    /// The accumulated match code and whether it can fail.
    pub fn finish(self) -> (TokenStream, bool) {
        let stmts = self.stmts;
        (quote!(#(#stmts)*), self.can_fail)
    }

    fn resolve(&self, opcode: &str) -> GenResult<&'a ResolvedOp> {
        self.registry.op(opcode).ok_or_else(|| {
            GenErrorKind::UnknownOp {
                loc: self.loc.clone(),
                name: opcode.to_owned(),
            }
            .into()
        })
    }

    /// Match `pat` against the value held in `root`.
    ///
    /// The opcode test is skipped when `top` is set: the dispatcher already
    /// selected the procedure by opcode.
    pub fn match_op(&mut self, root: &Ident, pat: &OpPattern, top: bool) -> GenResult<()> {
        let op = self.resolve(&pat.opcode)?;

        if !top {
            let variant = host::ident(op.variant())?;
            self.guard(quote!(f.op(#root) != Op::#variant));
        }

        if let Some(ty) = &pat.ty {
            self.constraint(ty, BindingKind::Type, quote!(f.ty(#root)))?;
        }
        if let Some(aux_int) = &pat.aux_int {
            if !op.aux().allows_aux_int() {
                return Err(GenErrorKind::AuxIntNotAllowed {
                    loc: self.loc.clone(),
                    op: op.name().to_owned(),
                    aux: op.aux(),
                }
                .into());
            }
            self.constraint(aux_int, BindingKind::AuxInt, quote!(f.aux_int(#root)))?;
        }
        if let Some(aux) = &pat.aux {
            if !op.aux().allows_aux() {
                return Err(GenErrorKind::AuxNotAllowed {
                    loc: self.loc.clone(),
                    op: op.name().to_owned(),
                    aux: op.aux(),
                }
                .into());
            }
            self.constraint(aux, BindingKind::Aux, quote!(f.aux(#root)))?;
        }

        match op.arity() {
            Arity::Fixed(n) if n != pat.args.len() => {
                return Err(GenErrorKind::ArgCount {
                    loc: self.loc.clone(),
                    op: op.name().to_owned(),
                    expected: n,
                    found: pat.args.len(),
                }
                .into());
            }
            Arity::Fixed(_) => {}
            Arity::Variable => {
                let len = host::index(pat.args.len());
                self.guard(quote!(f.args(#root).len() != #len));
            }
        }

        for (i, arg) in pat.args.iter().enumerate() {
            let idx = host::index(i);
            let source = quote!(f.args(#root)[#idx]);
            match arg {
                Pattern::Wildcard => {}
                Pattern::Variable(name) => self.bind_value(name, source)?,
                Pattern::Op(child) => {
                    let name = match &child.name {
                        Some(name) => {
                            self.bind_value(name, source)?;
                            host::var(name)
                        }
                        None => {
                            let name = quote::format_ident!("{}_{}", root, i);
                            self.env.claim(self.loc, &name.to_string())?;
                            self.push(quote!(let #name = #source;));
                            name
                        }
                    };
                    self.match_op(&name, child, false)?;
                }
            }
        }

        Ok(())
    }

    /// Bind a value name, or compare by identity if it is already bound.
    pub fn bind_value(&mut self, name: &str, source: TokenStream) -> GenResult<()> {
        let ident = host::var(name);
        match self.env.bind(self.loc, name, BindingKind::Value)? {
            Binding::Fresh => self.push(quote!(let #ident = #source;)),
            Binding::Repeat => self.guard(quote!(#ident != #source)),
        }
        Ok(())
    }

    fn constraint(
        &mut self,
        constraint: &Constraint,
        kind: BindingKind,
        getter: TokenStream,
    ) -> GenResult<()> {
        match constraint {
            Constraint::Any => {}
            Constraint::Bind(name) => {
                let ident = host::var(name);
                match self.env.bind(self.loc, name, kind)? {
                    Binding::Fresh => self.push(quote!(let #ident = #getter;)),
                    Binding::Repeat => self.guard(quote!(#getter != #ident)),
                }
            }
            Constraint::Test(text) => {
                let expected = host::expr(self.loc, text)?;
                self.guard(quote!(#getter != #expected));
            }
        }
        Ok(())
    }
}

//! Result compiler.
//!
//! A result tree is either rewritten into the matched value in place or
//! allocated as fresh values `v0`, `v1`, ... in the current block `b`.

use heck::ToSnakeCase;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use rulegen_schema::{Arity, Registry, ResolvedOp};

use crate::ast::{OpResult, ResultRule, ResultTree};
use crate::env::{BindingKind, Env};
use crate::errors::{GenErrorKind, GenResult};
use crate::host;
use crate::rule::Location;

/// How the node at hand is materialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Reset the matched value `v` and rebuild it.
    MutateInPlace,
    /// Allocate a new value in block `b`.
    AllocateNew,
}

pub struct Builder<'a> {
    registry: &'a Registry,
    loc: &'a Location,
    env: &'a Env,
    /// Position expression for new values.
    pos: TokenStream,
    alloc: usize,
    stmts: Vec<TokenStream>,
}

impl<'a> Builder<'a> {
    pub fn new(registry: &'a Registry, loc: &'a Location, env: &'a Env, pos: TokenStream) -> Self {
        Self {
            registry,
            loc,
            env,
            pos,
            alloc: 0,
            stmts: Vec::new(),
        }
    }

    pub fn finish(self) -> TokenStream {
        let stmts = self.stmts;
        quote!(#(#stmts)*)
    }

    /// Compile a value rule's right-hand side, rewriting `v`.
    pub fn rewrite_value(&mut self, result: &ResultRule) -> GenResult<()> {
        if let Some(block) = &result.redirect {
            let block = host::expr(self.loc, block)?;
            self.stmts.push(quote!(let b = #block;));
        }

        match &result.root {
            ResultTree::Variable(name) => {
                // Never substitute directly: the variable may live in another
                // block or be a phi.
                let x = self.value(name)?;
                let copy = self.copy_variant()?;
                self.stmts.push(quote! {
                    f.reset(v, Op::#copy);
                    f.set_type(v, f.ty(#x));
                    f.add_arg(v, #x);
                });
            }
            ResultTree::Op(op) if result.redirect.is_none() => {
                self.build(op, Mode::MutateInPlace)?;
            }
            ResultTree::Op(op) => {
                let moved = self.build(op, Mode::AllocateNew)?;
                let copy = self.copy_variant()?;
                self.stmts.push(quote! {
                    f.reset(v, Op::#copy);
                    f.add_arg(v, #moved);
                });
            }
        }
        Ok(())
    }

    /// Allocate `op` as a new value and return the local holding it.
    pub fn allocate(&mut self, op: &OpResult) -> GenResult<Ident> {
        self.build(op, Mode::AllocateNew)
    }

    fn build(&mut self, op: &OpResult, mode: Mode) -> GenResult<Ident> {
        let resolved = self.resolve(&op.opcode)?;
        let variant = host::ident(resolved.variant())?;

        let target = match mode {
            Mode::MutateInPlace => {
                let v = host::var("v");
                self.stmts.push(quote!(f.reset(v, Op::#variant);));
                if let Some(ty) = &op.ty {
                    let ty = host::expr(self.loc, ty)?;
                    self.stmts.push(quote!(f.set_type(v, #ty);));
                }
                v
            }
            Mode::AllocateNew => {
                let ty = match (&op.ty, resolved.default_type()) {
                    (Some(ty), _) => host::expr(self.loc, ty)?,
                    (None, Some(name)) => default_type(name)?,
                    (None, None) => {
                        return Err(GenErrorKind::MissingType {
                            loc: self.loc.clone(),
                            expr: op.to_string(),
                            op: op.opcode.clone(),
                        }
                        .into());
                    }
                };
                let id = format_ident!("v{}", self.alloc);
                self.alloc += 1;
                let pos = &self.pos;
                self.stmts
                    .push(quote!(let #id = f.new_value(b, #pos, Op::#variant, #ty);));
                id
            }
        };

        if let Some(aux_int) = &op.aux_int {
            if !resolved.aux().allows_aux_int() {
                return Err(GenErrorKind::AuxIntNotAllowed {
                    loc: self.loc.clone(),
                    op: resolved.name().to_owned(),
                    aux: resolved.aux(),
                }
                .into());
            }
            let aux_int = host::expr(self.loc, aux_int)?;
            self.stmts.push(quote!(f.set_aux_int(#target, #aux_int);));
        }
        if let Some(aux) = &op.aux {
            if !resolved.aux().allows_aux() {
                return Err(GenErrorKind::AuxNotAllowed {
                    loc: self.loc.clone(),
                    op: resolved.name().to_owned(),
                    aux: resolved.aux(),
                }
                .into());
            }
            let aux = host::expr(self.loc, aux)?;
            self.stmts.push(quote!(f.set_aux(#target, #aux);));
        }

        match resolved.arity() {
            Arity::Fixed(n) if n != op.args.len() => {
                return Err(GenErrorKind::ArgCount {
                    loc: self.loc.clone(),
                    op: resolved.name().to_owned(),
                    expected: n,
                    found: op.args.len(),
                }
                .into());
            }
            _ => {}
        }

        for arg in &op.args {
            let arg = match arg {
                ResultTree::Variable(name) => self.value(name)?,
                ResultTree::Op(child) => self.build(child, Mode::AllocateNew)?,
            };
            self.stmts.push(quote!(f.add_arg(#target, #arg);));
        }

        Ok(target)
    }

    /// A value name bound by the pattern.
    pub fn value(&self, name: &str) -> GenResult<Ident> {
        self.env.require(self.loc, name, BindingKind::Value)?;
        Ok(host::var(name))
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

    fn copy_variant(&self) -> GenResult<Ident> {
        host::ident(self.resolve("Copy")?.variant())
    }
}

/// Render a descriptor's default type name.
pub fn default_type(name: &str) -> GenResult<TokenStream> {
    match name {
        "Flags" | "Mem" | "Void" | "Int128" => {
            let variant = host::ident(name)?;
            Ok(quote!(Type::#variant))
        }
        _ => {
            let method = host::ident(&format!("type_{}", name.to_snake_case()))?;
            Ok(quote!(config.fe.#method()))
        }
    }
}

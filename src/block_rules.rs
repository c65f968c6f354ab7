//! Block rewrite synthesizer.
//!
//! Block rules rewrite a block's kind, control value and successor list.
//! The pattern's first argument is the control value; the rest name the
//! successors positionally.

use std::collections::{BTreeMap, HashSet};

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use rulegen_schema::Registry;

use crate::GenOptions;
use crate::ast::{BlockPattern, BlockResult, ControlPattern, ControlResult};
use crate::builder::Builder;
use crate::env::{Binding, BindingKind, Env};
use crate::errors::{GenErrorKind, GenResult};
use crate::host;
use crate::matcher::Matcher;
use crate::pipeline::RuleEntry;
use crate::rule::Location;

pub fn generate(
    registry: &Registry,
    groups: &BTreeMap<String, Vec<RuleEntry<'_>>>,
    options: &GenOptions,
) -> GenResult<Vec<TokenStream>> {
    let arch = registry.arch().to_snake_case();
    let mut names = HashSet::new();
    let mut items = Vec::with_capacity(groups.len() + 1);
    let mut arms = Vec::with_capacity(groups.len());

    for (kind, entries) in groups {
        let block = registry.block(kind).ok_or_else(|| GenErrorKind::UnknownBlock {
            loc: entries[0].rule.loc.clone(),
            name: kind.clone(),
        })?;
        let proc_name = format!("rewrite_block_{arch}_{}", block.name().to_snake_case());
        if !names.insert(proc_name.clone()) {
            return Err(GenErrorKind::DuplicateProcedure { name: proc_name }.into());
        }
        let proc_ident = host::ident(&proc_name)?;
        let variant = host::ident(block.variant())?;

        let mut bodies = Vec::with_capacity(entries.len());
        let mut last_can_fail = true;
        for (i, entry) in entries.iter().enumerate() {
            let (body, can_fail) = compile_rule(registry, entry, options)?;
            if !can_fail && i + 1 < entries.len() {
                return Err(GenErrorKind::DeadRule {
                    loc: entry.rule.loc.clone(),
                    rule: entry.rule.text.clone(),
                }
                .into());
            }
            bodies.push(body);
            last_can_fail = can_fail;
        }

        let docs = entries.iter().map(RuleEntry::doc_line);
        let tail = last_can_fail.then(|| quote!(false));
        items.push(quote! {
            #(#[doc = #docs])*
            fn #proc_ident(f: &mut Func, b: BlockId, config: &Config) -> bool {
                #(#bodies)*
                #tail
            }
        });
        arms.push(quote!(BlockKind::#variant => #proc_ident(f, b, config),));
        tracing::debug!(kind = %kind, rules = entries.len(), "generated block procedure");
    }

    let dispatch = format_ident!("rewrite_block_{}", arch);
    items.push(quote! {
        /// Apply the first matching block rule to `b`. Returns whether `b` changed.
        pub fn #dispatch(f: &mut Func, b: BlockId, config: &Config) -> bool {
            match f.block_kind(b) {
                #(#arms)*
                _ => false,
            }
        }
    });
    Ok(items)
}

fn compile_rule(
    registry: &Registry,
    entry: &RuleEntry<'_>,
    options: &GenOptions,
) -> GenResult<(TokenStream, bool)> {
    let loc = &entry.rule.loc;
    let pattern = BlockPattern::from_sexpr(loc, &entry.pattern)?;

    let mut env = Env::new();
    let mut matcher = Matcher::new(registry, loc, &mut env);

    match &pattern.control {
        ControlPattern::Any => {}
        ControlPattern::Variable(name) => bind_control(&mut matcher, name)?,
        ControlPattern::Op(op) => {
            let name = op.name.as_deref().unwrap_or("v");
            bind_control(&mut matcher, name)?;
            matcher.match_op(&host::var(name), op, false)?;
        }
    }

    for (i, succ) in pattern.succs.iter().enumerate() {
        let Some(name) = succ else { continue };
        if matcher.env().bind(loc, name, BindingKind::Block)? == Binding::Repeat {
            return Err(repeat_successor(loc, name));
        }
        let ident = host::var(name);
        let idx = host::index(i);
        matcher.push(quote!(let #ident = f.succs(b)[#idx];));
    }

    if let Some(cond) = entry.cond {
        matcher.condition(cond)?;
    }
    let (match_code, can_fail) = matcher.finish();

    let result = BlockResult::parse(loc, entry.result)?;
    let rewrite = rewrite_block(registry, loc, &env, &pattern, &result)?;
    let log = entry.log_stmt(options);

    Ok((
        quote! {
            loop {
                #match_code
                #rewrite
                #log
                return true;
            }
        },
        can_fail,
    ))
}

/// Bind the control value. `v` is the implicit name for a matched control.
fn bind_control(matcher: &mut Matcher<'_>, name: &str) -> GenResult<()> {
    let loc = matcher.loc();
    if name != "v" {
        matcher.env().bind(loc, name, BindingKind::Value)?;
    }
    let ident = host::var(name);
    matcher.push_fallible(quote! {
        let Some(#ident) = f.control(b) else {
            break;
        };
    });
    Ok(())
}

fn rewrite_block(
    registry: &Registry,
    loc: &Location,
    env: &Env,
    pattern: &BlockPattern,
    result: &BlockResult,
) -> GenResult<TokenStream> {
    let kind = registry.block(&result.kind).ok_or_else(|| GenErrorKind::UnknownBlock {
        loc: loc.clone(),
        name: result.kind.clone(),
    })?;
    let variant = host::ident(kind.variant())?;

    let old: Vec<Option<&str>> = pattern.succs.iter().map(|s| s.as_deref()).collect();
    let named: HashSet<&str> = old.iter().flatten().copied().collect();
    let mut kept = HashSet::new();
    for succ in &result.succs {
        if !kept.insert(succ.as_str()) {
            return Err(repeat_successor(loc, succ));
        }
        if !named.contains(succ.as_str()) {
            return Err(GenErrorKind::UnknownSuccessor {
                loc: loc.clone(),
                name: succ.clone(),
            }
            .into());
        }
    }

    let mut stmts = Vec::new();

    for (i, succ) in old.iter().enumerate() {
        match succ {
            Some(name) if kept.contains(name) => {}
            Some(name) => {
                let ident = host::var(name);
                stmts.push(quote!(f.remove_predecessor(b, #ident);));
            }
            None => {
                let idx = host::index(i);
                stmts.push(quote!(f.remove_predecessor(b, f.succs(b)[#idx]);));
            }
        }
    }

    stmts.push(quote!(f.set_block_kind(b, BlockKind::#variant);));

    match &result.control {
        ControlResult::Nil => stmts.push(quote!(f.set_control(b, None);)),
        ControlResult::Variable(name) => {
            env.require(loc, name, BindingKind::Value)?;
            let ident = host::var(name);
            stmts.push(quote!(f.set_control(b, Some(#ident));));
        }
        ControlResult::Op(op) => {
            let mut builder = Builder::new(registry, loc, env, quote!(f.block_pos(b)));
            let id = builder.allocate(op)?;
            stmts.push(builder.finish());
            stmts.push(quote!(f.set_control(b, Some(#id));));
        }
    }

    if result.succs.len() < old.len() {
        let n = host::index(result.succs.len());
        stmts.push(quote!(f.truncate_succs(b, #n);));
    }
    for (i, succ) in result.succs.iter().enumerate() {
        let idx = host::index(i);
        let ident = host::var(succ);
        stmts.push(quote!(f.set_succ(b, #idx, #ident);));
    }

    let new: Vec<Option<&str>> = result.succs.iter().map(|s| Some(s.as_str())).collect();
    match likelihood(&old, &new) {
        Likelihood::Keep => {}
        Likelihood::Invert => stmts.push(quote! {
            let likely = f.likely(b);
            f.set_likely(b, likely.invert());
        }),
        Likelihood::Unknown => {
            stmts.push(quote!(f.set_likely(b, BranchPrediction::Unknown);));
        }
    }

    Ok(quote!(#(#stmts)*))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Likelihood {
    Keep,
    Invert,
    Unknown,
}

fn likelihood(old: &[Option<&str>], new: &[Option<&str>]) -> Likelihood {
    if old.len() != new.len() || old.len() != 2 {
        Likelihood::Unknown
    } else if old == new {
        Likelihood::Keep
    } else if old[0] == new[1] && old[1] == new[0] {
        Likelihood::Invert
    } else {
        Likelihood::Unknown
    }
}

fn repeat_successor(loc: &Location, name: &str) -> crate::errors::GenError {
    GenErrorKind::RepeatSuccessor {
        loc: loc.clone(),
        name: name.to_owned(),
    }
    .into()
}

//! Value rewrite synthesizer.
//!
//! One procedure per opcode, plus the `rewrite_value_<arch>` dispatcher.

use std::collections::{BTreeMap, HashSet};

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use rulegen_schema::Registry;

use crate::GenOptions;
use crate::ast::{OpPattern, ResultRule};
use crate::builder::Builder;
use crate::env::Env;
use crate::errors::{GenErrorKind, GenResult};
use crate::host;
use crate::matcher::Matcher;
use crate::pipeline::RuleEntry;

/// Generate the per-opcode procedures followed by the dispatcher.
pub fn generate(
    registry: &Registry,
    groups: &BTreeMap<String, Vec<RuleEntry<'_>>>,
    options: &GenOptions,
) -> GenResult<Vec<TokenStream>> {
    let arch = registry.arch().to_snake_case();
    let mut names = HashSet::new();
    let mut items = Vec::with_capacity(groups.len() + 1);
    let mut arms = Vec::with_capacity(groups.len());

    for (opcode, entries) in groups {
        let op = registry.op(opcode).ok_or_else(|| GenErrorKind::UnknownOp {
            loc: entries[0].rule.loc.clone(),
            name: opcode.clone(),
        })?;
        let proc_name = format!("rewrite_value_{arch}_{}", op.name().to_snake_case());
        if !names.insert(proc_name.clone()) {
            return Err(GenErrorKind::DuplicateProcedure { name: proc_name }.into());
        }
        let proc_ident = host::ident(&proc_name)?;
        let variant = host::ident(op.variant())?;

        items.push(procedure(registry, &proc_ident, entries, options)?);
        arms.push(quote!(Op::#variant => #proc_ident(f, v, config),));
        tracing::debug!(op = %opcode, rules = entries.len(), "generated value procedure");
    }

    let dispatch = format_ident!("rewrite_value_{}", arch);
    items.push(quote! {
        /// Apply the first matching value rule to `v`. Returns whether `v` changed.
        pub fn #dispatch(f: &mut Func, v: ValueId, config: &Config) -> bool {
            match f.op(v) {
                #(#arms)*
                _ => false,
            }
        }
    });
    Ok(items)
}

fn procedure(
    registry: &Registry,
    name: &proc_macro2::Ident,
    entries: &[RuleEntry<'_>],
    options: &GenOptions,
) -> GenResult<TokenStream> {
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
    Ok(quote! {
        #(#[doc = #docs])*
        fn #name(f: &mut Func, v: ValueId, config: &Config) -> bool {
            let b = f.block_of(v);
            #(#bodies)*
            #tail
        }
    })
}

/// One rule as a `loop` that breaks on mismatch and returns on success.
fn compile_rule(
    registry: &Registry,
    entry: &RuleEntry<'_>,
    options: &GenOptions,
) -> GenResult<(TokenStream, bool)> {
    let loc = &entry.rule.loc;
    let pattern = OpPattern::from_sexpr(loc, &entry.pattern)?;

    let mut env = Env::new();
    let mut matcher = Matcher::new(registry, loc, &mut env);
    matcher.match_op(&host::var("v"), &pattern, true)?;
    if let Some(cond) = entry.cond {
        matcher.condition(cond)?;
    }
    let (match_code, can_fail) = matcher.finish();

    let result = ResultRule::parse(loc, entry.result)?;
    let mut builder = Builder::new(registry, loc, &env, quote!(f.pos(v)));
    builder.rewrite_value(&result)?;
    let build_code = builder.finish();

    let log = entry.log_stmt(options);
    Ok((
        quote! {
            loop {
                #match_code
                #build_code
                #log
                return true;
            }
        },
        can_fail,
    ))
}

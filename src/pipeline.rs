//! Rule-file pipeline.
//!
//! ```text
//! rule file ─► read_rules ─► Rule::parts ─► group by leading opcode
//!     │
//!     ├─► value_rules::generate   (one procedure per op + dispatch)
//!     ├─► block_rules::generate   (one procedure per block kind + dispatch)
//!     │
//!     ▼
//! emit::render ─► emit::write_unit ─► <out_dir>/rewrite_<arch>.rs
//! ```
//!
//! Each rule file is an independent unit. The registry is read-only and is
//! passed in rather than looked up globally.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use proc_macro2::TokenStream;
use quote::quote;
use rulegen_schema::{DescriptorPool, Registry, Resolution};

use crate::ast;
use crate::block_rules;
use crate::emit;
use crate::errors::{GenError, GenErrorKind, GenResult};
use crate::reader::read_rules;
use crate::rule::Rule;
use crate::sexpr::SExpr;
use crate::value_rules;

/// Options that change the generated code.
#[derive(Clone, Debug, Default)]
pub struct GenOptions {
    /// Emit a `tracing::debug!` event from every successful rewrite.
    pub log: bool,
}

/// A rule split into its parts, with the pattern parsed far enough to know
/// its leading opcode.
#[derive(Debug)]
pub struct RuleEntry<'r> {
    pub rule: &'r Rule,
    pub pattern: SExpr,
    pub cond: Option<&'r str>,
    pub result: &'r str,
}

impl RuleEntry<'_> {
    /// Doc line listing the rule on its procedure.
    pub fn doc_line(&self) -> String {
        format!(" {}: {}", self.rule.loc, self.rule.text)
    }

    pub fn log_stmt(&self, options: &GenOptions) -> Option<TokenStream> {
        options.log.then(|| {
            let loc = self.rule.loc.to_string();
            quote!(tracing::debug!(rule = #loc, "rewrite");)
        })
    }
}

/// Generate the Rust module for one rule file's text.
pub fn generate_unit(
    registry: &Registry,
    source_name: &str,
    text: &str,
    options: &GenOptions,
) -> GenResult<String> {
    let rules = read_rules(source_name, text)?;

    let mut values: BTreeMap<String, Vec<RuleEntry<'_>>> = BTreeMap::new();
    let mut blocks: BTreeMap<String, Vec<RuleEntry<'_>>> = BTreeMap::new();

    for rule in &rules {
        let parts = rule.parts()?;
        let pattern = ast::parse_sexpr(&rule.loc, parts.pattern)?;
        let (group, name) = match registry.resolve(&pattern.opcode) {
            Resolution::Block(block) => (&mut blocks, block.name().to_owned()),
            Resolution::Op(op) => (&mut values, op.name().to_owned()),
            Resolution::NotFound => {
                return Err(GenErrorKind::UnknownOp {
                    loc: rule.loc.clone(),
                    name: pattern.opcode,
                }
                .into());
            }
        };
        group.entry(name).or_default().push(RuleEntry {
            rule,
            pattern,
            cond: parts.cond,
            result: parts.result,
        });
    }

    tracing::debug!(
        source = source_name,
        ops = values.len(),
        blocks = blocks.len(),
        "grouped rules"
    );

    let mut items = value_rules::generate(registry, &values, options)?;
    items.extend(block_rules::generate(registry, &blocks, options)?);
    emit::render(source_name, items)
}

/// Load `generic.json` and, unless `arch` is `generic`, `<arch>.json`.
pub fn load_registry(descriptors: &Path, arch: &str) -> GenResult<Registry> {
    let generic = DescriptorPool::load(&descriptors.join("generic.json"))?;
    if arch == "generic" {
        return Ok(Registry::generic(&generic));
    }
    let arch_pool = DescriptorPool::load(&descriptors.join(format!("{arch}.json")))?;
    Ok(Registry::new(arch, &generic, &arch_pool))
}

/// Where one rule file's inputs and output live.
#[derive(Clone, Debug)]
pub struct FileJob {
    pub rules: PathBuf,
    pub descriptors: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
}

impl FileJob {
    pub fn new(rules: impl Into<PathBuf>) -> Self {
        Self {
            rules: rules.into(),
            descriptors: None,
            out_dir: None,
        }
    }

    /// The architecture named by the rule file's stem.
    pub fn arch(&self) -> GenResult<&str> {
        self.rules
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                GenErrorKind::InvalidName {
                    name: self.rules.display().to_string(),
                }
                .into()
            })
    }

    fn rule_dir(&self) -> PathBuf {
        match self.rules.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn descriptors_dir(&self) -> PathBuf {
        self.descriptors.clone().unwrap_or_else(|| self.rule_dir())
    }

    /// Explicit output directory, or the parent of the rule file's directory.
    pub fn out_dir(&self) -> PathBuf {
        if let Some(dir) = &self.out_dir {
            return dir.clone();
        }
        let rule_dir = self.rule_dir();
        match rule_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => rule_dir.join(".."),
        }
    }

    /// Generate and write this file's unit, returning the written path.
    pub fn run(&self, options: &GenOptions) -> GenResult<PathBuf> {
        let arch = self.arch()?;
        let registry = load_registry(&self.descriptors_dir(), arch)?;
        let text =
            std::fs::read_to_string(&self.rules).map_err(|e| GenError::io(&self.rules, e))?;
        let source_name = self
            .rules
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.rules.display().to_string());

        let code = generate_unit(&registry, &source_name, &text, options)?;
        emit::write_unit(&self.out_dir(), arch, &code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directories() {
        let job = FileJob::new("ssa/gen/AMD64.rules");
        assert_eq!(job.arch().unwrap(), "AMD64");
        assert_eq!(job.descriptors_dir(), PathBuf::from("ssa/gen"));
        assert_eq!(job.out_dir(), PathBuf::from("ssa"));

        let job = FileJob::new("generic.rules");
        assert_eq!(job.descriptors_dir(), PathBuf::from("."));
        assert_eq!(job.out_dir(), PathBuf::from("./.."));
    }

    #[test]
    fn test_explicit_directories() {
        let mut job = FileJob::new("gen/generic.rules");
        job.descriptors = Some(PathBuf::from("schema"));
        job.out_dir = Some(PathBuf::from("out"));
        assert_eq!(job.descriptors_dir(), PathBuf::from("schema"));
        assert_eq!(job.out_dir(), PathBuf::from("out"));
    }

    #[test]
    fn test_unknown_leading_opcode() {
        let registry = Registry::generic(&DescriptorPool::new());
        let err = generate_unit(
            &registry,
            "generic.rules",
            "(Add64 x y) -> x\n",
            &GenOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "generic.rules:1: unknown op Add64");
    }

    #[test]
    fn test_empty_rule_file() {
        let registry = Registry::generic(&DescriptorPool::new());
        let options = GenOptions::default();
        let code = generate_unit(&registry, "generic.rules", "// nothing yet\n", &options).unwrap();
        assert!(code.starts_with("// Code generated from generic.rules; DO NOT EDIT.\n"));
        assert!(code.contains("pub fn rewrite_value_generic("));
        assert!(code.contains("pub fn rewrite_block_generic("));
    }
}

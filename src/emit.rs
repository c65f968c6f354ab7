//! Emitter: assemble, validate, format and persist one generated unit.

use std::path::{Path, PathBuf};

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;

use crate::errors::{GenError, GenErrorKind, GenResult};

/// Assemble procedures into a module and pretty-print it.
///
/// The token stream is re-parsed as a `syn::File` first, so malformed host
/// code that slipped past per-expression checks is reported here instead of
/// when the generated module is compiled.
pub fn render(source_name: &str, items: Vec<TokenStream>) -> GenResult<String> {
    let tokens = quote! {
        #![allow(unused_variables, unused_mut, unreachable_code, non_snake_case, clippy::all)]

        use super::*;

        #(#items)*
    };
    let text = tokens.to_string();
    let file = syn::parse_file(&text).map_err(|e| malformed(source_name, &text, &e))?;
    let body = prettyplease::unparse(&file);
    Ok(format!(
        "// Code generated from {source_name}; DO NOT EDIT.\n\n{body}"
    ))
}

fn malformed(source_name: &str, text: &str, error: &syn::Error) -> GenError {
    let start = error.span().start();
    let line = text.lines().nth(start.line.saturating_sub(1)).unwrap_or_default();
    let snippet: String = line
        .chars()
        .skip(start.column.saturating_sub(30))
        .take(60)
        .collect();
    GenErrorKind::MalformedOutput {
        source_name: source_name.to_owned(),
        message: error.to_string(),
        snippet,
    }
    .into()
}

/// Output file name for an architecture: `rewrite_<arch>.rs`.
pub fn unit_file_name(arch: &str) -> String {
    format!("rewrite_{}.rs", arch.to_snake_case())
}

pub fn write_unit(out_dir: &Path, arch: &str, code: &str) -> GenResult<PathBuf> {
    std::fs::create_dir_all(out_dir).map_err(|e| GenError::io(out_dir, e))?;
    let path = out_dir.join(unit_file_name(arch));
    std::fs::write(&path, code).map_err(|e| GenError::io(&path, e))?;
    tracing::info!(path = %path.display(), bytes = code.len(), "wrote rewrite rules");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_header_and_prelude() {
        let item = quote! {
            pub fn rewrite_value_generic(f: &mut Func, v: ValueId, config: &Config) -> bool {
                false
            }
        };
        let code = render("generic.rules", vec![item]).unwrap();
        let mut lines = code.lines();
        assert_eq!(
            lines.next(),
            Some("// Code generated from generic.rules; DO NOT EDIT.")
        );
        assert!(code.contains("#![allow("));
        assert!(code.contains("use super::*;"));
        assert!(code.contains(
            "pub fn rewrite_value_generic(f: &mut Func, v: ValueId, config: &Config) -> bool {"
        ));
    }

    #[test]
    fn test_malformed_snippet() {
        let text = "fn ok() {} fn broken( {}";
        let err = syn::parse_file(text).unwrap_err();
        let err = malformed("generic.rules", text, &err);
        let GenErrorKind::MalformedOutput { snippet, .. } = err.kind() else {
            panic!("expected malformed output, got {err}");
        };
        assert!(snippet.contains("broken"));
        assert!(err.to_string().starts_with("generated code for generic.rules is malformed"));
    }

    #[test]
    fn test_unit_file_name() {
        assert_eq!(unit_file_name("generic"), "rewrite_generic.rs");
        assert_eq!(unit_file_name("AMD64"), "rewrite_amd64.rs");
    }

    #[test]
    fn test_write_unit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_unit(dir.path(), "AMD64", "// generated\n").unwrap();
        assert_eq!(path, dir.path().join("rewrite_amd64.rs"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "// generated\n");
    }
}

//! Host-language fragments: identifiers and expressions spliced into
//! generated code.

use proc_macro2::{Ident, Span, TokenStream};
use quote::{ToTokens, quote};

use crate::errors::{GenErrorKind, GenResult};
use crate::rule::Location;

/// An identifier for a name already checked by [`crate::ast`].
pub fn var(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}

/// An identifier for a descriptor-derived name, which has not been checked.
pub fn ident(name: &str) -> GenResult<Ident> {
    if crate::ast::is_ident(name) {
        Ok(var(name))
    } else {
        Err(GenErrorKind::InvalidName {
            name: name.to_owned(),
        }
        .into())
    }
}

/// Parse a host expression and wrap it in parentheses.
pub fn expr(loc: &Location, text: &str) -> GenResult<TokenStream> {
    let parsed: syn::Expr = syn::parse_str(text).map_err(|e| GenErrorKind::MalformedExpr {
        loc: loc.clone(),
        text: text.to_owned(),
        message: e.to_string(),
    })?;
    let tokens = parsed.into_token_stream();
    Ok(quote!((#tokens)))
}

/// An unsuffixed integer literal for argument indices and counts.
pub fn index(i: usize) -> proc_macro2::Literal {
    proc_macro2::Literal::usize_unsuffixed(i)
}

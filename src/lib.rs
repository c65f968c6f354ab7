//! Compiles SSA rewrite rules into Rust rewrite procedures.
//!
//! A rule file holds rules of the form `pattern [&& condition] -> result`
//! over a tree-shaped SSA IR. Each file becomes one Rust module with a
//! procedure per opcode and per block kind, plus the
//! `rewrite_value_<arch>` and `rewrite_block_<arch>` dispatchers.

pub mod ast;
pub mod block_rules;
pub mod builder;
pub mod emit;
pub mod env;
pub mod errors;
pub mod host;
pub mod matcher;
pub mod pipeline;
pub mod reader;
pub mod rule;
pub mod sexpr;
pub mod value_rules;

pub use errors::{GenError, GenErrorKind, GenResult};
pub use pipeline::{FileJob, GenOptions, generate_unit, load_registry};
pub use rule::{Location, Rule};
pub use rulegen_schema as schema;

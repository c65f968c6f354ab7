//! Descriptor schema for rulegen.
//!
//! The SSA backend describes its operations and block kinds as static tables.
//! This crate models those tables as immutable [`DescriptorPool`]s and layers a
//! [`Registry`] on top, which resolves a name from a rule file to exactly one
//! descriptor with explicit architecture-over-generic precedence.

pub mod descriptor;
pub mod errors;
pub mod pool;
pub mod registry;

pub use descriptor::{Arity, AuxKind, BlockDescriptor, OpDescriptor};
pub use errors::{SchemaError, SchemaResult};
pub use pool::DescriptorPool;
pub use registry::{Origin, Registry, Resolution, ResolvedBlock, ResolvedOp};

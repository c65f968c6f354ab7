//! Name resolution over the generic and architecture pools.
//!
//! Both pools are indexed once when the registry is built. A name found in the
//! architecture pool shadows the generic entry of the same name; block kinds
//! shadow operations, since the leading token of a rule decides whether the
//! rule rewrites a value or a block.

use std::collections::HashMap;

use crate::descriptor::{Arity, AuxKind, BlockDescriptor, OpDescriptor};
use crate::pool::DescriptorPool;

/// Which pool a descriptor was resolved from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Generic,
    Arch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedOp {
    descriptor: OpDescriptor,
    origin: Origin,
    variant: String,
    default_type: Option<String>,
}

impl ResolvedOp {
    pub fn descriptor(&self) -> &OpDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn arity(&self) -> Arity {
        self.descriptor.arity
    }

    pub fn aux(&self) -> AuxKind {
        self.descriptor.aux
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Name of the `Op` enum variant in generated code (`Add64`, `AMD64ADDQ`).
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Default result type, taken from the architecture descriptor when it has
    /// one and from the generic descriptor of the same name otherwise.
    pub fn default_type(&self) -> Option<&str> {
        self.default_type.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBlock {
    descriptor: BlockDescriptor,
    origin: Origin,
    variant: String,
}

impl ResolvedBlock {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Name of the `BlockKind` enum variant in generated code.
    pub fn variant(&self) -> &str {
        &self.variant
    }
}

/// Outcome of resolving a leading rule token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    Op(&'a ResolvedOp),
    Block(&'a ResolvedBlock),
    NotFound,
}

/// Read-only lookup table for one architecture.
#[derive(Clone, Debug)]
pub struct Registry {
    arch: String,
    ops: HashMap<String, ResolvedOp>,
    blocks: HashMap<String, ResolvedBlock>,
}

impl Registry {
    pub fn new(
        arch: impl Into<String>,
        generic: &DescriptorPool,
        arch_pool: &DescriptorPool,
    ) -> Self {
        let arch = arch.into();
        let mut ops = HashMap::new();
        let mut blocks = HashMap::new();

        for desc in generic.ops() {
            ops.insert(
                desc.name.clone(),
                ResolvedOp {
                    descriptor: desc.clone(),
                    origin: Origin::Generic,
                    variant: desc.name.clone(),
                    default_type: desc.default_type.clone(),
                },
            );
        }
        for desc in arch_pool.ops() {
            // An override keeps the generic variant so both rule sets agree on it.
            let (variant, fallback_type) = match ops.get(&desc.name) {
                Some(generic) => (generic.variant.clone(), generic.default_type.clone()),
                None => (format!("{arch}{}", desc.name), None),
            };
            ops.insert(
                desc.name.clone(),
                ResolvedOp {
                    descriptor: desc.clone(),
                    origin: Origin::Arch,
                    variant,
                    default_type: desc.default_type.clone().or(fallback_type),
                },
            );
        }

        for desc in generic.blocks() {
            blocks.insert(
                desc.name.clone(),
                ResolvedBlock {
                    descriptor: desc.clone(),
                    origin: Origin::Generic,
                    variant: desc.name.clone(),
                },
            );
        }
        for desc in arch_pool.blocks() {
            blocks.insert(
                desc.name.clone(),
                ResolvedBlock {
                    descriptor: desc.clone(),
                    origin: Origin::Arch,
                    variant: format!("{arch}{}", desc.name),
                },
            );
        }

        Self { arch, ops, blocks }
    }

    /// Registry for the architecture-independent rules.
    pub fn generic(generic: &DescriptorPool) -> Self {
        Self::new("generic", generic, &DescriptorPool::new())
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn resolve(&self, name: &str) -> Resolution<'_> {
        if let Some(block) = self.blocks.get(name) {
            Resolution::Block(block)
        } else if let Some(op) = self.ops.get(name) {
            Resolution::Op(op)
        } else {
            Resolution::NotFound
        }
    }

    pub fn op(&self, name: &str) -> Option<&ResolvedOp> {
        self.ops.get(name)
    }

    pub fn block(&self, name: &str) -> Option<&ResolvedBlock> {
        self.blocks.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pools() -> (DescriptorPool, DescriptorPool) {
        let generic = DescriptorPool::new()
            .with_op(OpDescriptor::new("Add64", Arity::Fixed(2)).with_type("Int64"))
            .with_op(OpDescriptor::new("Load", Arity::Fixed(2)))
            .with_block(BlockDescriptor::new("If"));
        let amd64 = DescriptorPool::new()
            .with_op(OpDescriptor::new("ADDQ", Arity::Fixed(2)).with_type("Int64"))
            .with_op(OpDescriptor::new("Add64", Arity::Variable))
            .with_block(BlockDescriptor::new("EQ"));
        (generic, amd64)
    }

    #[test]
    fn test_generic_lookup() {
        let (generic, amd64) = pools();
        let registry = Registry::new("AMD64", &generic, &amd64);

        let Resolution::Op(load) = registry.resolve("Load") else {
            panic!("Load should resolve to an op");
        };
        assert_eq!(load.origin(), Origin::Generic);
        assert_eq!(load.variant(), "Load");
    }

    #[test]
    fn test_arch_op_gets_prefixed_variant() {
        let (generic, amd64) = pools();
        let registry = Registry::new("AMD64", &generic, &amd64);

        let addq = registry.op("ADDQ").unwrap();
        assert_eq!(addq.origin(), Origin::Arch);
        assert_eq!(addq.variant(), "AMD64ADDQ");
    }

    #[test]
    fn test_arch_pool_takes_precedence() {
        let (generic, amd64) = pools();
        let registry = Registry::new("AMD64", &generic, &amd64);

        let add = registry.op("Add64").unwrap();
        assert_eq!(add.origin(), Origin::Arch);
        assert_eq!(add.arity(), Arity::Variable);
        // The arch descriptor has no type, so the generic default applies.
        assert_eq!(add.default_type(), Some("Int64"));
    }

    #[test]
    fn test_overridden_op_keeps_generic_variant() {
        let (generic, amd64) = pools();
        let registry = Registry::new("AMD64", &generic, &amd64);

        assert_eq!(registry.op("Add64").unwrap().variant(), "Add64");
        assert_eq!(registry.op("ADDQ").unwrap().variant(), "AMD64ADDQ");
    }

    #[test]
    fn test_blocks_resolve_as_blocks() {
        let (generic, amd64) = pools();
        let registry = Registry::new("AMD64", &generic, &amd64);

        assert!(matches!(registry.resolve("If"), Resolution::Block(b) if b.variant() == "If"));
        assert!(matches!(registry.resolve("EQ"), Resolution::Block(b) if b.variant() == "AMD64EQ"));
        assert_eq!(registry.resolve("Nope"), Resolution::NotFound);
    }

    #[test]
    fn test_generic_registry_has_no_arch_entries() {
        let (generic, _) = pools();
        let registry = Registry::generic(&generic);

        assert_eq!(registry.arch(), "generic");
        assert!(registry.op("ADDQ").is_none());
        assert_eq!(registry.op("Add64").unwrap().arity(), Arity::Fixed(2));
    }
}

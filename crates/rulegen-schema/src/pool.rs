//! Descriptor pools.
//!
//! A pool is one static table of op and block descriptors, read from JSON:
//!
//! ```json
//! {
//!   "ops": [
//!     { "name": "Add64", "arity": 2 },
//!     { "name": "Const64", "arity": 0, "aux": "Int64", "type": "Int64" }
//!   ],
//!   "blocks": [{ "name": "If" }]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::{BlockDescriptor, OpDescriptor};
use crate::errors::{SchemaError, SchemaResult};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorPool {
    #[serde(default)]
    ops: Vec<OpDescriptor>,
    #[serde(default)]
    blocks: Vec<BlockDescriptor>,
}

impl DescriptorPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_op(mut self, op: OpDescriptor) -> Self {
        self.ops.push(op);
        self
    }

    pub fn with_block(mut self, block: BlockDescriptor) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn ops(&self) -> &[OpDescriptor] {
        &self.ops
    }

    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.blocks.is_empty()
    }

    /// Parse a pool from JSON text. `origin` names the source in diagnostics.
    pub fn from_json(origin: &str, text: &str) -> SchemaResult<Self> {
        let pool: DescriptorPool =
            serde_json::from_str(text).map_err(|source| SchemaError::Json {
                origin: origin.to_owned(),
                source,
            })?;
        pool.check_unique(origin)?;
        Ok(pool)
    }

    /// Read and parse a pool file.
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&path.display().to_string(), &text)
    }

    fn check_unique(&self, origin: &str) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        for op in &self.ops {
            if !seen.insert(op.name.as_str()) {
                return Err(SchemaError::DuplicateOp(op.name.clone(), origin.to_owned()));
            }
        }
        let mut seen = HashSet::new();
        for block in &self.blocks {
            if !seen.insert(block.name.as_str()) {
                return Err(SchemaError::DuplicateBlock(
                    block.name.clone(),
                    origin.to_owned(),
                ));
            }
        }
        Ok(())
    }
}

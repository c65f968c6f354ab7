//! Errors raised while loading descriptor pools.

use std::path::PathBuf;

use derive_more::Display;

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Display, Debug)]
pub enum SchemaError {
    #[display("can't read descriptor file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[display("malformed descriptor file {origin}: {source}")]
    Json {
        origin: String,
        source: serde_json::Error,
    },

    #[display("duplicate op descriptor {_0} in {_1}")]
    DuplicateOp(String, String),

    #[display("duplicate block descriptor {_0} in {_1}")]
    DuplicateBlock(String, String),
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemaError::Io { source, .. } => Some(source),
            SchemaError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

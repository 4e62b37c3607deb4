use std::path::PathBuf;

use oxiblock_core::{BlockError, BlockTypeError};
use thiserror::Error;

/// Errors raised while reading block definition files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("block definition '{block}' is invalid: {reason}")]
    InvalidDefinition { block: String, reason: String },

    #[error("block '{block}': {source}")]
    Block {
        block: String,
        #[source]
        source: BlockTypeError,
    },

    #[error(transparent)]
    Manager(#[from] BlockError),
}

//! Block definition files.
//!
//! Reads `[[block]]` entries from TOML and JSON files, turns them into
//! [`CustomBlockType`](oxiblock_core::CustomBlockType)s and drives a
//! [`BlockManager`](oxiblock_core::BlockManager) through registration and
//! initialization.

pub mod definition;
pub mod error;
pub mod loader;

pub use definition::BlockDefinition;
pub use error::ConfigError;
pub use loader::{load_block_types, load_blocks, reload_blocks, LoadReport};

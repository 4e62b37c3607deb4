//! Block definition loader: scans a directory and feeds a [`BlockManager`].

use std::path::{Path, PathBuf};

use oxiblock_core::{BlockError, BlockManager, CustomBlockType};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::definition::BlockDefinition;
use crate::error::ConfigError;

/// Outcome of parsing one block entry.
pub type EntryResult = Result<BlockDefinition, ConfigError>;

/// Block types read from a definitions directory.
#[derive(Debug, Default)]
pub struct LoadedDefinitions {
    pub blocks: Vec<CustomBlockType>,
    pub files: usize,
    /// Entries skipped because they failed to parse or validate.
    pub skipped: usize,
}

/// Summary of a load into a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub files: usize,
    pub registered: usize,
    pub skipped: usize,
    /// Whether the manager was initialized and its table published.
    pub initialized: bool,
}

/// Parse a TOML file body holding `[[block]]` entries.
pub fn parse_toml_blocks(content: &str) -> Result<Vec<EntryResult>, ConfigError> {
    let table: toml::Table = toml::from_str(content)?;
    let Some(entries) = table.get("block") else {
        return Ok(Vec::new());
    };
    let entries = entries
        .as_array()
        .ok_or_else(|| not_a_list(entries.type_str()))?;
    Ok(entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = entry
                .get("id")
                .and_then(toml::Value::as_str)
                .map(str::to_string);
            let parsed = entry
                .clone()
                .try_into::<BlockDefinition>()
                .map_err(ConfigError::from);
            decode_entry(i, label, parsed)
        })
        .collect())
}

/// Parse a JSON file body of the form `{ "block": [ ... ] }`.
pub fn parse_json_blocks(content: &str) -> Result<Vec<EntryResult>, ConfigError> {
    let root: serde_json::Value = serde_json::from_str(content)?;
    let Some(entries) = root.get("block") else {
        return Ok(Vec::new());
    };
    let entries = entries.as_array().ok_or_else(|| not_a_list("non-array"))?;
    Ok(entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = entry
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            decode_entry(i, label, from_json(entry.clone()))
        })
        .collect())
}

fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ConfigError> {
    Ok(serde_json::from_value(value)?)
}

fn decode_entry(
    index: usize,
    label: Option<String>,
    parsed: Result<BlockDefinition, ConfigError>,
) -> EntryResult {
    parsed.map_err(|e| ConfigError::InvalidDefinition {
        block: label.unwrap_or_else(|| format!("#{index}")),
        reason: e.to_string(),
    })
}

fn not_a_list(found: &str) -> ConfigError {
    ConfigError::InvalidDefinition {
        block: "block".into(),
        reason: format!("expected a list of block entries, found {found}"),
    }
}

/// Read and parse one definition file, choosing the format by extension.
pub fn parse_block_file(path: &Path) -> Result<Vec<EntryResult>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if has_extension(path, "json") {
        parse_json_blocks(&content)
    } else {
        parse_toml_blocks(&content)
    }
}

/// Load every block type defined under `dir`, recursively, in path order.
///
/// Unreadable files and invalid entries are logged and skipped. A missing
/// directory yields no blocks.
pub fn load_block_types(dir: &Path) -> Result<LoadedDefinitions, ConfigError> {
    let mut loaded = LoadedDefinitions::default();
    if !dir.is_dir() {
        warn!("Block directory {} does not exist", dir.display());
        return Ok(loaded);
    }

    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    for path in files {
        let entries = match parse_block_file(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load {}: {e}", path.display());
                continue;
            }
        };
        loaded.files += 1;
        for entry in entries {
            match entry.and_then(BlockDefinition::into_block_type) {
                Ok(block) => loaded.blocks.push(block),
                Err(e) => {
                    warn!("Skipping block in {}: {e}", path.display());
                    loaded.skipped += 1;
                }
            }
        }
    }

    debug!(
        "Read {} block definitions from {} files in {}",
        loaded.blocks.len(),
        loaded.files,
        dir.display()
    );
    Ok(loaded)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if has_extension(&path, "toml") || has_extension(&path, "json") {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().map(|e| e == ext).unwrap_or(false)
}

/// Register block types, skipping the ones the manager rejects.
///
/// Lifecycle errors are not skippable and abort the load.
pub fn register_all(
    manager: &mut BlockManager,
    blocks: Vec<CustomBlockType>,
) -> Result<usize, ConfigError> {
    let mut registered = 0;
    for block in blocks {
        let id = block.id().to_string();
        match manager.register_block(block) {
            Ok(_) => registered += 1,
            Err(e @ BlockError::Lifecycle(_)) => return Err(e.into()),
            Err(e) => warn!("Skipping block {id}: {e}"),
        }
    }
    Ok(registered)
}

/// Load `dir` into `manager` and initialize it.
///
/// Initialization is skipped when no block could be registered.
pub fn load_blocks(manager: &mut BlockManager, dir: &Path) -> Result<LoadReport, ConfigError> {
    let loaded = load_block_types(dir)?;
    let total = loaded.blocks.len();
    let registered = register_all(manager, loaded.blocks)?;
    let mut report = LoadReport {
        files: loaded.files,
        registered,
        skipped: loaded.skipped + (total - registered),
        initialized: false,
    };

    if registered == 0 {
        warn!("No custom blocks registered from {}", dir.display());
        return Ok(report);
    }

    manager.initialize()?;
    report.initialized = true;
    info!(
        "Loaded {} custom blocks from {} files ({} skipped)",
        report.registered, report.files, report.skipped
    );
    Ok(report)
}

/// Discard the manager's current blocks and load `dir` from scratch.
pub fn reload_blocks(manager: &mut BlockManager, dir: &Path) -> Result<LoadReport, ConfigError> {
    manager.reset()?;
    load_blocks(manager, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_entries_parse_independently() {
        let entries = parse_toml_blocks(
            r#"
            [[block]]
            id = "lamp"

            [[block]]
            id = "broken"
            internal_id = "not a number"

            [[block]]
            namespace = "x"
            "#,
        )
        .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].as_ref().unwrap().id, "lamp");
        assert!(matches!(
            &entries[1],
            Err(ConfigError::InvalidDefinition { block, .. }) if block == "broken"
        ));
        assert!(matches!(
            &entries[2],
            Err(ConfigError::InvalidDefinition { block, .. }) if block == "#2"
        ));
    }

    #[test]
    fn json_entries() {
        let entries = parse_json_blocks(
            r#"{ "block": [
                { "id": "lamp", "properties": [ { "name": "lit", "type": "boolean" } ] },
                { "id": 7 }
            ] }"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].as_ref().unwrap().properties.len(), 1);
        assert!(entries[1].is_err());
    }

    #[test]
    fn file_without_blocks() {
        assert!(parse_toml_blocks("").unwrap().is_empty());
        assert!(parse_json_blocks("{}").unwrap().is_empty());
        assert!(parse_toml_blocks("block = 3").is_err());
        assert!(parse_toml_blocks("[[block]").is_err());
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = std::env::temp_dir().join("oxiblock_loader_missing");
        let _ = std::fs::remove_dir_all(&dir);
        let loaded = load_block_types(&dir).unwrap();
        assert!(loaded.blocks.is_empty());
        assert_eq!(loaded.files, 0);
    }
}

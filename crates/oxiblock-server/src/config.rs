use serde::Deserialize;
use std::path::Path;

use oxiblock_core::manager::DEFAULT_TABLE_CAPACITY;
use oxiblock_core::visual_allocator::DEFAULT_NATIVE_STATE_COUNT;
use oxiblock_core::{AutoStateGroup, BlockManager, VisualIdAllocator};

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub logging: LoggingSection,
    #[serde(default)]
    pub blocks: BlocksSection,
    #[serde(default)]
    pub visual: VisualSection,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct BlocksSection {
    #[serde(default = "default_blocks_directory")]
    pub directory: String,
    /// Internal id slots in the published state table.
    #[serde(default = "default_table_capacity")]
    pub table_capacity: usize,
}

fn default_blocks_directory() -> String {
    "blocks".into()
}

fn default_table_capacity() -> usize {
    DEFAULT_TABLE_CAPACITY
}

impl Default for BlocksSection {
    fn default() -> Self {
        Self {
            directory: default_blocks_directory(),
            table_capacity: default_table_capacity(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VisualSection {
    /// Visual ids start here, above the host's own block states.
    #[serde(default = "default_native_state_count")]
    pub native_state_count: u32,
    /// Auto state groups. The built-in groups are used when empty.
    #[serde(default)]
    pub groups: Vec<GroupSection>,
}

fn default_native_state_count() -> u32 {
    DEFAULT_NATIVE_STATE_COUNT
}

impl Default for VisualSection {
    fn default() -> Self {
        Self {
            native_state_count: default_native_state_count(),
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GroupSection {
    pub id: String,
    #[serde(default)]
    pub candidates: Vec<u32>,
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Build an empty block manager sized by this config.
    pub fn block_manager(&self) -> Result<BlockManager, Box<dyn std::error::Error>> {
        let visual = if self.visual.groups.is_empty() {
            VisualIdAllocator::new(self.visual.native_state_count)
        } else {
            let groups = self
                .visual
                .groups
                .iter()
                .map(|g| AutoStateGroup::new(g.id.as_str(), g.candidates.iter().copied()));
            VisualIdAllocator::with_groups(self.visual.native_state_count, groups)?
        };
        Ok(BlockManager::with_visual_allocator(
            self.blocks.table_capacity,
            visual,
        ))
    }
}

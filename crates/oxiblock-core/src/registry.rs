//! Block type registry with a one-way freeze gate.

use std::collections::HashMap;
use std::sync::Arc;

use crate::block_state::BlockState;
use crate::block_type::CustomBlockType;
use crate::error::RegistryError;

/// Owns every registered [`CustomBlockType`], in registration order.
#[derive(Debug, Default)]
pub struct BlockRegistry {
    blocks: Vec<Arc<CustomBlockType>>,
    by_id: HashMap<String, usize>,
    frozen: bool,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that a block with `id` could be registered right now.
    pub fn ensure_registrable(&self, id: &str) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen(id.to_string()));
        }
        if self.by_id.contains_key(id) {
            return Err(RegistryError::Duplicate(id.to_string()));
        }
        Ok(())
    }

    /// Register a block type. Fails once frozen or when the id is taken.
    pub fn register(&mut self, block: CustomBlockType) -> Result<Arc<CustomBlockType>, RegistryError> {
        self.ensure_registrable(block.id())?;
        let block = Arc::new(block);
        self.by_id.insert(block.id().to_string(), self.blocks.len());
        self.blocks.push(block.clone());
        Ok(block)
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Reopen the registry. Only a reset of the owning manager does this.
    pub(crate) fn unfreeze(&mut self) {
        self.frozen = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Drop every block type. The registry must not be frozen.
    pub fn clear(&mut self) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::ClearWhileFrozen);
        }
        self.blocks.clear();
        self.by_id.clear();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<CustomBlockType>> {
        self.by_id.get(id).map(|&i| &self.blocks[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Registered block ids, sorted.
    pub fn block_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blocks.iter().map(|b| b.id()).collect();
        names.sort_unstable();
        names
    }

    /// Block types in registration order.
    pub fn all_blocks(&self) -> &[Arc<CustomBlockType>] {
        &self.blocks
    }

    /// Every state of every block, in registration then generation order.
    pub fn all_states(&self) -> impl Iterator<Item = &BlockState> + '_ {
        self.blocks.iter().flat_map(|b| b.states())
    }

    pub fn state_count(&self) -> usize {
        self.blocks.iter().map(|b| b.state_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;
    use crate::settings::BlockSettings;

    fn block(id: &str) -> CustomBlockType {
        CustomBlockType::new(
            id,
            vec![Property::boolean("lit").unwrap()],
            BlockSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = BlockRegistry::new();
        assert!(reg.is_empty());
        reg.register(block("lamp")).unwrap();
        reg.register(block("beacon")).unwrap();
        assert_eq!(reg.len(), 2);
        assert!(reg.contains("lamp"));
        assert_eq!(reg.get("beacon").unwrap().id(), "beacon");
        assert!(reg.get("missing").is_none());
        assert_eq!(reg.block_names(), ["beacon", "lamp"]);
        assert_eq!(reg.all_blocks()[0].id(), "lamp");
    }

    #[test]
    fn duplicate_rejected() {
        let mut reg = BlockRegistry::new();
        reg.register(block("lamp")).unwrap();
        assert_eq!(
            reg.register(block("lamp")).unwrap_err(),
            RegistryError::Duplicate("lamp".into())
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn frozen_rejects_registration() {
        let mut reg = BlockRegistry::new();
        reg.freeze();
        assert!(reg.is_frozen());
        assert_eq!(
            reg.register(block("lamp")).unwrap_err(),
            RegistryError::Frozen("lamp".into())
        );
        assert_eq!(reg.clear(), Err(RegistryError::ClearWhileFrozen));
    }

    #[test]
    fn all_states_in_order() {
        let mut reg = BlockRegistry::new();
        reg.register(block("a")).unwrap();
        reg.register(block("b")).unwrap();
        let names: Vec<String> = reg.all_states().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            ["a[lit=false]", "a[lit=true]", "b[lit=false]", "b[lit=true]"]
        );
        assert_eq!(reg.state_count(), 4);
    }

    #[test]
    fn clear_after_unfreeze() {
        let mut reg = BlockRegistry::new();
        reg.register(block("a")).unwrap();
        reg.freeze();
        reg.unfreeze();
        reg.clear().unwrap();
        assert!(reg.is_empty());
        reg.register(block("a")).unwrap();
    }
}

//! The published internal id → state lookup table.
//!
//! A [`StateTable`] is built once, after allocation, and never mutated. It is
//! shared through an `Arc`, so any number of reader threads can hold it while
//! the owning manager resets and publishes a successor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::block_state::BlockState;
use crate::block_type::CustomBlockType;
use crate::error::LifecycleError;
use crate::settings::BlockSettings;

/// A state joined with the ids allocated for it.
#[derive(Debug, Clone)]
pub struct PublishedState {
    block: Arc<CustomBlockType>,
    index: usize,
    internal_id: u32,
    visual_id: u32,
}

impl PublishedState {
    pub fn new(block: Arc<CustomBlockType>, index: usize, internal_id: u32, visual_id: u32) -> Self {
        debug_assert!(index < block.state_count());
        Self {
            block,
            index,
            internal_id,
            visual_id,
        }
    }

    pub fn block(&self) -> &Arc<CustomBlockType> {
        &self.block
    }

    pub fn state(&self) -> &BlockState {
        self.block.get_state_by_id(self.index)
    }

    pub fn settings(&self) -> &BlockSettings {
        self.block.settings()
    }

    pub fn internal_id(&self) -> u32 {
        self.internal_id
    }

    pub fn visual_id(&self) -> u32 {
        self.visual_id
    }
}

/// Immutable array of published states indexed by internal id.
#[derive(Debug)]
pub struct StateTable {
    slots: Vec<Option<PublishedState>>,
    fallback: PublishedState,
    /// Internal ids of each block's states, by state index.
    by_block: HashMap<String, Vec<Option<u32>>>,
    published: usize,
}

impl StateTable {
    /// Build a table from its slots. `fallback` answers every lookup that
    /// misses.
    pub fn new(slots: Vec<Option<PublishedState>>, fallback: PublishedState) -> Self {
        let mut by_block: HashMap<String, Vec<Option<u32>>> = HashMap::new();
        let mut published = 0;
        for entry in slots.iter().flatten() {
            let ids = by_block
                .entry(entry.block.id().to_string())
                .or_insert_with(|| vec![None; entry.block.state_count()]);
            ids[entry.index] = Some(entry.internal_id);
            published += 1;
        }
        Self {
            slots,
            fallback,
            by_block,
            published,
        }
    }

    /// State published under `id`, or the fallback when `id` is negative,
    /// out of range or unassigned.
    pub fn get_by_id(&self, id: i64) -> &PublishedState {
        u32::try_from(id)
            .ok()
            .and_then(|id| self.get(id))
            .unwrap_or(&self.fallback)
    }

    /// State published under `id`, if any.
    pub fn get(&self, id: u32) -> Option<&PublishedState> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    pub fn fallback(&self) -> &PublishedState {
        &self.fallback
    }

    /// Number of slots, assigned or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of assigned slots.
    pub fn published_count(&self) -> usize {
        self.published
    }

    /// Assigned slots in internal id order.
    pub fn iter(&self) -> impl Iterator<Item = &PublishedState> + '_ {
        self.slots.iter().flatten()
    }

    /// Published entry for a canonical state.
    pub fn resolve(&self, state: &BlockState) -> Option<&PublishedState> {
        let id = (*self.by_block.get(state.block_id())?.get(state.index())?)?;
        self.get(id).filter(|entry| entry.block.owns(state))
    }
}

/// Holder of the currently published table.
///
/// Publishing is write-once: a second [`init`](Self::init) fails until
/// [`reset`](Self::reset) is called.
#[derive(Debug, Default)]
pub struct StateMirror {
    table: Option<Arc<StateTable>>,
}

impl StateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, table: StateTable) -> Result<Arc<StateTable>, LifecycleError> {
        if self.table.is_some() {
            return Err(LifecycleError::AlreadyPublished);
        }
        let table = Arc::new(table);
        self.table = Some(table.clone());
        Ok(table)
    }

    pub fn get(&self) -> Result<&Arc<StateTable>, LifecycleError> {
        self.table.as_ref().ok_or(LifecycleError::NotPublished)
    }

    pub fn is_initialized(&self) -> bool {
        self.table.is_some()
    }

    /// Unpublish the current table. Readers holding it keep their copy.
    pub fn reset(&mut self) {
        self.table = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;
    use crate::settings::BlockSettings;

    fn lamp() -> Arc<CustomBlockType> {
        Arc::new(
            CustomBlockType::new(
                "lamp",
                vec![Property::boolean("lit").unwrap()],
                BlockSettings::default(),
            )
            .unwrap(),
        )
    }

    fn table(block: &Arc<CustomBlockType>) -> StateTable {
        let slots = vec![
            Some(PublishedState::new(block.clone(), 0, 0, 500)),
            None,
            Some(PublishedState::new(block.clone(), 1, 2, 501)),
        ];
        let fallback = PublishedState::new(block.clone(), 0, 0, 500);
        StateTable::new(slots, fallback)
    }

    #[test]
    fn lookup_by_id() {
        let block = lamp();
        let table = table(&block);
        assert_eq!(table.len(), 3);
        assert_eq!(table.published_count(), 2);
        assert_eq!(table.get_by_id(2).state().to_string(), "lamp[lit=true]");
        assert_eq!(table.get_by_id(2).visual_id(), 501);
        assert!(table.get(1).is_none());
    }

    #[test]
    fn misses_return_fallback() {
        let block = lamp();
        let table = table(&block);
        for id in [-1, 1, 3, i64::MAX] {
            assert_eq!(table.get_by_id(id).internal_id(), 0);
        }
    }

    #[test]
    fn resolve_state() {
        let block = lamp();
        let table = table(&block);
        let lit = &block.states()[1];
        assert_eq!(table.resolve(lit).unwrap().internal_id(), 2);

        let other = lamp();
        assert!(table.resolve(&other.states()[1]).is_none());
    }

    #[test]
    fn mirror_is_write_once() {
        let block = lamp();
        let mut mirror = StateMirror::new();
        assert_eq!(mirror.get().unwrap_err(), LifecycleError::NotPublished);
        let first = mirror.init(table(&block)).unwrap();
        assert_eq!(
            mirror.init(table(&block)).unwrap_err(),
            LifecycleError::AlreadyPublished
        );
        assert!(Arc::ptr_eq(mirror.get().unwrap(), &first));

        mirror.reset();
        assert!(!mirror.is_initialized());
        assert_eq!(first.published_count(), 2);
        mirror.init(table(&block)).unwrap();
    }
}

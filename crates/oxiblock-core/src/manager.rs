//! Block lifecycle: registration, id allocation and publication.
//!
//! A [`BlockManager`] moves through three phases:
//!
//! - **Unfrozen**: block types may be registered. Fixed ids are reserved as
//!   each type arrives.
//! - **Initializing**: the registry is frozen and every state is queued for
//!   automatic ids, then both allocators sweep their queues.
//! - **Ready**: the [`StateTable`] is published and lookups are served.
//!
//! The only way back is [`BlockManager::reset`], which unpublishes the table
//! and discards every registration and allocation.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::block_state::BlockState;
use crate::block_type::CustomBlockType;
use crate::error::{AllocError, BlockError, LifecycleError};
use crate::id_allocator::IdAllocator;
use crate::property::PropertyValue;
use crate::registry::BlockRegistry;
use crate::state_table::{PublishedState, StateMirror, StateTable};
use crate::visual_allocator::{VisualIdAllocator, DEFAULT_NATIVE_STATE_COUNT};

/// Default number of internal id slots in the published table.
pub const DEFAULT_TABLE_CAPACITY: usize = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unfrozen,
    Initializing,
    Ready,
}

/// Counters describing the current load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerStats {
    pub blocks: usize,
    pub states: usize,
    /// States present in the published table.
    pub published: usize,
    /// States left out because their internal id exceeded the table capacity.
    pub dropped: usize,
    pub table_len: usize,
}

/// Owns the registry, both allocators and the published state table.
#[derive(Debug)]
pub struct BlockManager {
    registry: BlockRegistry,
    ids: IdAllocator,
    visual_ids: VisualIdAllocator,
    mirror: StateMirror,
    lifecycle: LifecycleState,
    table_capacity: usize,
    dropped: usize,
}

impl Default for BlockManager {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_CAPACITY, DEFAULT_NATIVE_STATE_COUNT)
    }
}

impl BlockManager {
    pub fn new(table_capacity: usize, native_state_count: u32) -> Self {
        Self::with_visual_allocator(table_capacity, VisualIdAllocator::new(native_state_count))
    }

    /// Manager using a preconfigured visual allocator (custom auto state groups).
    pub fn with_visual_allocator(table_capacity: usize, visual_ids: VisualIdAllocator) -> Self {
        Self {
            registry: BlockRegistry::new(),
            ids: IdAllocator::new(0),
            visual_ids,
            mirror: StateMirror::new(),
            lifecycle: LifecycleState::Unfrozen,
            table_capacity,
            dropped: 0,
        }
    }

    /// Register a block type and reserve its fixed ids.
    ///
    /// Every fixed id of the type is checked before any is reserved, so a
    /// rejected type leaves no trace in either allocator.
    pub fn register_block(
        &mut self,
        block: CustomBlockType,
    ) -> Result<Arc<CustomBlockType>, BlockError> {
        if self.lifecycle != LifecycleState::Unfrozen {
            return Err(LifecycleError::AlreadyInitialized.into());
        }
        self.registry.ensure_registrable(block.id())?;

        if let Some(group) = block.visual_group() {
            if self.visual_ids.group(group).is_none() {
                return Err(AllocError::UnknownGroup(group.to_string()).into());
            }
        }

        let keys: Vec<String> = block.states().iter().map(state_key).collect();
        let internal = fixed_range(&keys, block.fixed_internal_id())?;
        let visual = fixed_range(&keys, block.fixed_visual_id())?;
        for (key, id) in &internal {
            if *id as usize >= self.table_capacity {
                return Err(AllocError::BeyondCapacity {
                    id: *id,
                    key: key.to_string(),
                    capacity: self.table_capacity,
                }
                .into());
            }
            self.ids.check_fixed(key, *id)?;
        }
        for (key, id) in &visual {
            self.visual_ids.check_fixed(key, *id)?;
        }
        for (key, id) in internal {
            self.ids.assign_fixed(key, id)?;
        }
        for (key, id) in visual {
            self.visual_ids.assign_fixed(key, id)?;
        }

        let block = self.registry.register(block)?;
        debug!("Registered block {} ({} states)", block.id(), block.state_count());
        Ok(block)
    }

    /// Freeze the registry, allocate ids for every state and publish the table.
    ///
    /// On failure the manager returns to the unfrozen phase and nothing is
    /// published.
    pub fn initialize(&mut self) -> Result<Arc<StateTable>, BlockError> {
        if self.lifecycle != LifecycleState::Unfrozen || self.mirror.is_initialized() {
            return Err(LifecycleError::AlreadyInitialized.into());
        }
        if self.registry.state_count() == 0 {
            return Err(LifecycleError::NoStates.into());
        }

        self.lifecycle = LifecycleState::Initializing;
        self.registry.freeze();

        match self.allocate_and_publish() {
            Ok(table) => {
                self.lifecycle = LifecycleState::Ready;
                let max_internal = table.iter().map(PublishedState::internal_id).max();
                let max_visual = table.iter().map(PublishedState::visual_id).max();
                info!(
                    "Published {} block states from {} blocks (table length {}, highest internal id {:?}, highest visual id {:?}, {} dropped)",
                    table.published_count(),
                    self.registry.len(),
                    table.len(),
                    max_internal,
                    max_visual,
                    self.dropped
                );
                Ok(table)
            }
            Err(e) => {
                self.registry.unfreeze();
                self.lifecycle = LifecycleState::Unfrozen;
                self.dropped = 0;
                Err(e)
            }
        }
    }

    fn allocate_and_publish(&mut self) -> Result<Arc<StateTable>, BlockError> {
        for block in self.registry.all_blocks() {
            for state in block.states() {
                let key = state_key(state);
                self.ids.request_auto(&key);
                self.visual_ids.request_auto(&key, block.visual_group())?;
            }
        }
        let internal = self.ids.process_pending()?;
        let visual = self.visual_ids.process_pending()?;
        debug!("Allocated {internal} internal ids and {visual} visual ids");

        let mut entries = Vec::with_capacity(self.registry.state_count());
        let mut dropped = 0;
        for block in self.registry.all_blocks() {
            for state in block.states() {
                let key = state_key(state);
                let internal_id = self
                    .ids
                    .resolved(&key)
                    .ok_or_else(|| BlockError::Unpublished(key.clone()))?;
                let visual_id = self
                    .visual_ids
                    .resolved(&key)
                    .ok_or_else(|| BlockError::Unpublished(key.clone()))?;
                if internal_id as usize >= self.table_capacity {
                    error!(
                        "Dropping state {state}: internal id {internal_id} exceeds table capacity {}",
                        self.table_capacity
                    );
                    dropped += 1;
                    continue;
                }
                entries.push(PublishedState::new(
                    block.clone(),
                    state.index(),
                    internal_id,
                    visual_id,
                ));
            }
        }

        let len = entries
            .iter()
            .map(|e| e.internal_id() as usize + 1)
            .max()
            .ok_or(LifecycleError::NoStates)?;
        let mut slots: Vec<Option<PublishedState>> = vec![None; len];
        for entry in entries {
            let slot = entry.internal_id() as usize;
            slots[slot] = Some(entry);
        }
        let fallback = slots
            .iter()
            .flatten()
            .next()
            .cloned()
            .ok_or(LifecycleError::NoStates)?;

        let table = self.mirror.init(StateTable::new(slots, fallback))?;
        self.dropped = dropped;
        Ok(table)
    }

    /// State published under `id`; misses resolve to the table's fallback.
    pub fn get_state_by_id(&self, id: i64) -> Result<&PublishedState, BlockError> {
        Ok(self.published()?.get_by_id(id))
    }

    /// Shared handle on the published table, for readers on other threads.
    pub fn state_table(&self) -> Result<Arc<StateTable>, BlockError> {
        Ok(self.published()?.clone())
    }

    fn published(&self) -> Result<&Arc<StateTable>, BlockError> {
        if self.lifecycle != LifecycleState::Ready {
            return Err(LifecycleError::NotReady.into());
        }
        Ok(self.mirror.get()?)
    }

    pub fn get_block(&self, id: &str) -> Option<&Arc<CustomBlockType>> {
        self.registry.get(id)
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn visual_allocator(&self) -> &VisualIdAllocator {
        &self.visual_ids
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == LifecycleState::Ready
    }

    /// Published entry of the state equal to `state` except for `name = value`.
    pub fn with_property(
        &self,
        state: &BlockState,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<&PublishedState, BlockError> {
        let table = self.published()?;
        let block = self
            .registry
            .get(state.block_id())
            .ok_or_else(|| BlockError::Unpublished(state.to_string()))?;
        let next = block.with_property(state, name, value)?;
        table
            .resolve(next)
            .ok_or_else(|| BlockError::Unpublished(next.to_string()))
    }

    pub fn stats(&self) -> ManagerStats {
        let (published, table_len) = match self.mirror.get() {
            Ok(table) => (table.published_count(), table.len()),
            Err(_) => (0, 0),
        };
        ManagerStats {
            blocks: self.registry.len(),
            states: self.registry.state_count(),
            published,
            dropped: self.dropped,
            table_len,
        }
    }

    /// Unpublish the table and discard every registration and allocation.
    ///
    /// Readers holding an `Arc<StateTable>` keep the old table.
    pub fn reset(&mut self) -> Result<(), BlockError> {
        if self.mirror.is_initialized() {
            warn!("Resetting published block state table");
        }
        self.mirror.reset();
        self.registry.unfreeze();
        self.registry.clear()?;
        self.ids.reset();
        self.visual_ids.reset();
        self.lifecycle = LifecycleState::Unfrozen;
        self.dropped = 0;
        Ok(())
    }
}

/// Allocation key of a state: block id and state index.
///
/// The index after the last `#` makes the key unique even when block ids
/// contain `#`.
fn state_key(state: &BlockState) -> String {
    format!("{}#{}", state.block_id(), state.index())
}

/// Pair each state key with `base + index`, when a fixed base is set.
fn fixed_range(keys: &[String], base: Option<u32>) -> Result<Vec<(&str, u32)>, AllocError> {
    let Some(base) = base else {
        return Ok(Vec::new());
    };
    keys.iter()
        .enumerate()
        .map(|(i, key)| -> Result<(&str, u32), AllocError> {
            let id = u32::try_from(i)
                .ok()
                .and_then(|i| base.checked_add(i))
                .ok_or(AllocError::Exhausted)?;
            Ok((key.as_str(), id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;
    use crate::settings::BlockSettings;

    fn lamp(id: &str) -> CustomBlockType {
        CustomBlockType::new(
            id,
            vec![
                Property::boolean("lit").unwrap(),
                Property::integer("power", 0, 3).unwrap(),
            ],
            BlockSettings::default(),
        )
        .unwrap()
    }

    fn manager() -> BlockManager {
        BlockManager::new(DEFAULT_TABLE_CAPACITY, 1000)
    }

    #[test]
    fn lifecycle_transitions() {
        let mut mgr = manager();
        assert_eq!(mgr.lifecycle(), LifecycleState::Unfrozen);
        mgr.register_block(lamp("lamp")).unwrap();
        assert_eq!(
            mgr.get_state_by_id(0).unwrap_err(),
            BlockError::Lifecycle(LifecycleError::NotReady)
        );
        mgr.initialize().unwrap();
        assert!(mgr.is_ready());
        assert!(mgr.registry().is_frozen());
        assert_eq!(
            mgr.register_block(lamp("other")).unwrap_err(),
            BlockError::Lifecycle(LifecycleError::AlreadyInitialized)
        );
        assert_eq!(
            mgr.initialize().unwrap_err(),
            BlockError::Lifecycle(LifecycleError::AlreadyInitialized)
        );
    }

    #[test]
    fn sequential_internal_and_visual_ids() {
        let mut mgr = manager();
        mgr.register_block(lamp("lamp")).unwrap();
        let table = mgr.initialize().unwrap();
        assert_eq!(table.len(), 8);
        for (i, entry) in table.iter().enumerate() {
            assert_eq!(entry.internal_id() as usize, i);
            assert_eq!(entry.visual_id() as usize, 1000 + i);
            assert_eq!(entry.state().index(), i);
        }
        assert_eq!(
            mgr.get_state_by_id(0).unwrap().state().to_string(),
            "lamp[lit=false,power=0]"
        );
    }

    #[test]
    fn fixed_ids_are_reserved_first() {
        let mut mgr = manager();
        mgr.register_block(lamp("auto")).unwrap();
        let fixed = CustomBlockType::builder("pinned")
            .property(Property::boolean("open").unwrap())
            .internal_id(2)
            .visual_id(5000)
            .build()
            .unwrap();
        mgr.register_block(fixed).unwrap();
        let table = mgr.initialize().unwrap();

        assert_eq!(table.get(2).unwrap().state().to_string(), "pinned[open=false]");
        assert_eq!(table.get(3).unwrap().state().to_string(), "pinned[open=true]");
        assert_eq!(table.get(2).unwrap().visual_id(), 5000);
        let auto_ids: Vec<u32> = table
            .iter()
            .filter(|e| e.block().id() == "auto")
            .map(PublishedState::internal_id)
            .collect();
        assert_eq!(auto_ids, [0, 1, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn conflicting_fixed_ids_leave_no_trace() {
        let mut mgr = manager();
        let first = CustomBlockType::builder("a")
            .property(Property::boolean("x").unwrap())
            .internal_id(10)
            .build()
            .unwrap();
        mgr.register_block(first).unwrap();
        let second = CustomBlockType::builder("b")
            .property(Property::integer("n", 0, 3).unwrap())
            .internal_id(8)
            .build()
            .unwrap();
        let err = mgr.register_block(second).unwrap_err();
        assert!(matches!(err, BlockError::Alloc(AllocError::IdOccupied { id: 10, .. })));
        assert!(!mgr.registry().contains("b"));
        assert!(!mgr.ids.is_occupied(8));
    }

    #[test]
    fn similar_block_ids_keep_every_state() {
        let mut mgr = manager();
        let lamp = CustomBlockType::builder("lamp")
            .property(Property::boolean("lit").unwrap())
            .build()
            .unwrap();
        mgr.register_block(lamp).unwrap();
        mgr.register_block(CustomBlockType::builder("lamp#1").build().unwrap())
            .unwrap();
        mgr.register_block(CustomBlockType::builder("lamp#1#0").build().unwrap())
            .unwrap();
        let table = mgr.initialize().unwrap();
        assert_eq!(table.published_count(), 4);
        let ids: Vec<&str> = table.iter().map(|e| e.block().id()).collect();
        assert_eq!(ids, ["lamp", "lamp", "lamp#1", "lamp#1#0"]);
    }

    #[test]
    fn fixed_id_outside_capacity_rejected() {
        let mut mgr = BlockManager::new(16, 1000);
        let far = CustomBlockType::builder("far")
            .internal_id(4_000_000_000)
            .build()
            .unwrap();
        assert!(matches!(
            mgr.register_block(far).unwrap_err(),
            BlockError::Alloc(AllocError::BeyondCapacity { id: 4_000_000_000, capacity: 16, .. })
        ));
        let edge = CustomBlockType::builder("edge")
            .property(Property::boolean("x").unwrap())
            .internal_id(15)
            .visual_id(2000)
            .build()
            .unwrap();
        assert!(matches!(
            mgr.register_block(edge).unwrap_err(),
            BlockError::Alloc(AllocError::BeyondCapacity { id: 16, .. })
        ));
        assert!(!mgr.ids.is_occupied(15));
        assert!(mgr.registry().is_empty());
    }

    #[test]
    fn unknown_visual_group_rejected() {
        let mut mgr = manager();
        let block = CustomBlockType::builder("glass")
            .visual_group("translucent")
            .build()
            .unwrap();
        assert_eq!(
            mgr.register_block(block).unwrap_err(),
            BlockError::Alloc(AllocError::UnknownGroup("translucent".into()))
        );
    }

    #[test]
    fn initialize_without_states_stays_unfrozen() {
        let mut mgr = manager();
        assert_eq!(
            mgr.initialize().unwrap_err(),
            BlockError::Lifecycle(LifecycleError::NoStates)
        );
        assert_eq!(mgr.lifecycle(), LifecycleState::Unfrozen);
        mgr.register_block(lamp("lamp")).unwrap();
    }

    #[test]
    fn capacity_overflow_drops_states() {
        let mut mgr = BlockManager::new(5, 1000);
        mgr.register_block(lamp("lamp")).unwrap();
        let table = mgr.initialize().unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(mgr.stats().dropped, 3);
        assert_eq!(mgr.stats().published, 5);
        assert_eq!(mgr.get_state_by_id(6).unwrap().internal_id(), 0);
    }

    #[test]
    fn with_property_resolves_published_entry() {
        let mut mgr = manager();
        mgr.register_block(lamp("lamp")).unwrap();
        mgr.initialize().unwrap();
        let start = mgr.get_state_by_id(0).unwrap().state().clone();
        let entry = mgr.with_property(&start, "power", 3).unwrap();
        assert_eq!(entry.internal_id(), 3);
        assert!(matches!(
            mgr.with_property(&start, "power", 7),
            Err(BlockError::Property(_))
        ));
    }

    #[test]
    fn reset_allows_reload() {
        let mut mgr = manager();
        mgr.register_block(lamp("lamp")).unwrap();
        let old = mgr.initialize().unwrap();
        mgr.reset().unwrap();
        assert_eq!(mgr.lifecycle(), LifecycleState::Unfrozen);
        assert!(mgr.registry().is_empty());
        assert_eq!(mgr.stats(), ManagerStats::default());

        mgr.register_block(lamp("beacon")).unwrap();
        let new = mgr.initialize().unwrap();
        assert_eq!(new.get_by_id(0).block().id(), "beacon");
        assert_eq!(old.get_by_id(0).block().id(), "lamp");
    }
}

//! Custom block registry: property domains, state generation, id allocation
//! and the published internal id → state table.

pub mod block_state;
pub mod block_type;
pub mod error;
pub mod id_allocator;
pub mod manager;
pub mod property;
pub mod registry;
pub mod settings;
pub mod state_table;
pub mod visual_allocator;

pub use block_state::BlockState;
pub use block_type::{CustomBlockType, CustomBlockTypeBuilder};
pub use error::{
    AllocError, BlockError, BlockTypeError, LifecycleError, PropertyError, RegistryError,
};
pub use manager::{BlockManager, LifecycleState, ManagerStats};
pub use property::{Direction, Property, PropertyKind, PropertyValue};
pub use settings::{BlockAppearance, BlockSettings};
pub use state_table::{PublishedState, StateTable};
pub use visual_allocator::{AutoStateGroup, VisualIdAllocator};

//! Block registry errors.

use thiserror::Error;

/// Errors raised while building or querying a property domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("property name must not be empty")]
    EmptyName,

    #[error("property '{property}' has an empty domain")]
    EmptyDomain { property: String },

    #[error("property '{property}' has an invalid range: min {min} > max {max}")]
    InvalidRange {
        property: String,
        min: i32,
        max: i32,
    },

    #[error("property '{property}' declares {size} values (limit: {limit})")]
    DomainTooLarge {
        property: String,
        size: u64,
        limit: usize,
    },

    #[error("property '{property}' lists value '{value}' twice")]
    DuplicateValue { property: String, value: String },

    #[error("value '{value}' of property '{property}' is empty or contains one of `[ ] , = |`")]
    ReservedCharacter { property: String, value: String },

    #[error("default '{value}' is not a value of property '{property}'")]
    InvalidDefault { property: String, value: String },

    #[error("block '{block}' has no property '{property}'")]
    UnknownProperty { block: String, property: String },

    #[error("'{value}' is not a valid value for property '{property}'")]
    InvalidValue { property: String, value: String },

    #[error("state of block '{state_block}' does not belong to block '{block}'")]
    ForeignState { block: String, state_block: String },
}

/// Errors raised while constructing a block type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockTypeError {
    #[error("block id must not be empty")]
    EmptyId,

    #[error("block id '{0}' contains one of `[ ] , = |` or whitespace")]
    InvalidId(String),

    #[error("block '{block}' declares property '{property}' twice")]
    DuplicateProperty { block: String, property: String },

    #[error("block '{block}' would generate too many states (limit: {limit})")]
    TooManyStates { block: String, limit: usize },

    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Id allocation conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("key '{key}' already holds id {existing}, cannot reassign to {requested}")]
    KeyConflict {
        key: String,
        existing: u32,
        requested: u32,
    },

    #[error("id {id} requested by '{key}' is already occupied by '{holder}'")]
    IdOccupied { id: u32, key: String, holder: String },

    #[error("id {id} requested by '{key}' is below the allocator range (starts at {start})")]
    BelowRange { id: u32, key: String, start: u32 },

    #[error("fixed id {id} requested by '{key}' is outside the table capacity {capacity}")]
    BeyondCapacity { id: u32, key: String, capacity: usize },

    #[error("id space exhausted")]
    Exhausted,

    #[error("unknown auto state group '{0}'")]
    UnknownGroup(String),

    #[error("auto state group '{0}' is already defined")]
    DuplicateGroup(String),
}

/// Registry write-gate violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry is frozen, cannot register '{0}'")]
    Frozen(String),

    #[error("block '{0}' is already registered")]
    Duplicate(String),

    #[error("cannot clear a frozen registry")]
    ClearWhileFrozen,
}

/// Lifecycle violations: programming errors that must not be ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("block manager is already initialized")]
    AlreadyInitialized,

    #[error("block manager is not ready")]
    NotReady,

    #[error("state table is already published, reset it first")]
    AlreadyPublished,

    #[error("state table has not been published")]
    NotPublished,

    #[error("no block states to publish")]
    NoStates,
}

/// Errors returned by [`BlockManager`](crate::manager::BlockManager).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("state '{0}' was not published")]
    Unpublished(String),
}

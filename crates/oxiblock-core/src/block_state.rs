//! Immutable block states.
//!
//! A [`BlockState`] is one combination of property values of a block type.
//! It carries no ids: internal and visual ids live in the published
//! [`StateTable`](crate::state_table::StateTable), joined to the state at
//! publish time.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{BlockTypeError, PropertyError};
use crate::property::{Property, PropertyValue};

/// Most states a single block type may generate.
pub const MAX_STATES_PER_BLOCK: usize = 1 << 16;

/// Block id plus ordered properties, shared by a block type and its states.
#[derive(Debug)]
pub(crate) struct StateLayout {
    pub(crate) id: String,
    pub(crate) properties: Vec<Property>,
    /// Index stride per property; the last property varies fastest.
    strides: Vec<usize>,
    state_count: usize,
}

impl StateLayout {
    pub(crate) fn new(id: String, properties: Vec<Property>) -> Result<Self, BlockTypeError> {
        let mut strides = vec![0; properties.len()];
        let mut state_count: usize = 1;
        for (i, property) in properties.iter().enumerate().rev() {
            strides[i] = state_count;
            state_count = state_count
                .checked_mul(property.len())
                .filter(|&n| n <= MAX_STATES_PER_BLOCK)
                .ok_or_else(|| BlockTypeError::TooManyStates {
                    block: id.clone(),
                    limit: MAX_STATES_PER_BLOCK,
                })?;
        }
        Ok(Self {
            id,
            properties,
            strides,
            state_count,
        })
    }

    pub(crate) fn state_count(&self) -> usize {
        self.state_count
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name() == name)
    }

    /// State index of a full assignment of domain positions.
    pub(crate) fn index_of(&self, values: &[u16]) -> usize {
        self.properties
            .iter()
            .zip(values)
            .zip(&self.strides)
            .map(|((property, &value), stride)| property.rank_of(value as usize) * stride)
            .sum()
    }

    pub(crate) fn unknown_property(&self, name: &str) -> PropertyError {
        PropertyError::UnknownProperty {
            block: self.id.clone(),
            property: name.to_string(),
        }
    }
}

/// One concrete combination of property values for a block type.
///
/// Equality and hashing cover the block id and the property assignment only.
#[derive(Clone)]
pub struct BlockState {
    layout: Arc<StateLayout>,
    values: Box<[u16]>,
    index: usize,
}

impl BlockState {
    pub(crate) fn new(layout: Arc<StateLayout>, values: Box<[u16]>, index: usize) -> Self {
        debug_assert_eq!(layout.index_of(&values), index);
        Self {
            layout,
            values,
            index,
        }
    }

    /// Id of the owning block type.
    pub fn block_id(&self) -> &str {
        &self.layout.id
    }

    /// Position of this state within its block type's state list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether every property holds its default value.
    pub fn is_default(&self) -> bool {
        self.index == 0
    }

    /// Value of the named property.
    pub fn value(&self, name: &str) -> Option<PropertyValue> {
        let pos = self.layout.position(name)?;
        self.layout.properties[pos].value_at(self.values[pos] as usize)
    }

    /// Properties and their values, in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&Property, PropertyValue)> + '_ {
        self.layout
            .properties
            .iter()
            .zip(self.values.iter())
            .filter_map(|(property, &idx)| Some((property, property.value_at(idx as usize)?)))
    }

    pub(crate) fn belongs_to(&self, layout: &Arc<StateLayout>) -> bool {
        Arc::ptr_eq(&self.layout, layout)
    }

    /// Domain positions of every property, with `name` replaced by `value`.
    pub(crate) fn assignment_with(
        &self,
        name: &str,
        value: &PropertyValue,
    ) -> Result<Vec<u16>, PropertyError> {
        let pos = self
            .layout
            .position(name)
            .ok_or_else(|| self.layout.unknown_property(name))?;
        let property = &self.layout.properties[pos];
        let idx = property
            .index_of(value)
            .ok_or_else(|| PropertyError::InvalidValue {
                property: property.name().to_string(),
                value: value.to_string(),
            })?;
        let mut values = self.values.to_vec();
        values[pos] = idx as u16;
        Ok(values)
    }
}

impl PartialEq for BlockState {
    fn eq(&self, other: &Self) -> bool {
        self.layout.id == other.layout.id && self.values == other.values
    }
}

impl Eq for BlockState {}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.layout.id.hash(state);
        self.values.hash(state);
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.layout.id)?;
        if self.layout.properties.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (property, value)) in self.values().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", property.name(), value)?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockState({self} #{})", self.index)
    }
}

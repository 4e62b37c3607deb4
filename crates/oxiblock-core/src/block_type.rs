//! Custom block types and their generated state tables.
//!
//! A block type is built once from its id, ordered properties and settings.
//! Construction generates every state as the Cartesian product of the
//! property domains: properties are visited left to right, each property's
//! values in enumeration order (default first, then domain order), so state 0
//! is always the all-defaults state and the ordering is reproducible.
//!
//! Every lookup that produces a state returns one of the generated states,
//! never a fresh one, so state identity holds process-wide.

use std::sync::Arc;

use crate::block_state::{BlockState, StateLayout};
use crate::error::{BlockTypeError, PropertyError};
use crate::property::{has_reserved_char, Property, PropertyValue};
use crate::settings::{BlockAppearance, BlockSettings};

/// Separator between `name=value` pairs in persisted property strings.
pub const PROPERTY_SEPARATOR: &str = "|";

/// A named block definition and all of its states.
#[derive(Debug)]
pub struct CustomBlockType {
    layout: Arc<StateLayout>,
    settings: BlockSettings,
    appearance: BlockAppearance,
    fixed_internal_id: Option<u32>,
    fixed_visual_id: Option<u32>,
    visual_group: Option<String>,
    states: Vec<BlockState>,
}

/// Builder for [`CustomBlockType`].
#[derive(Debug)]
pub struct CustomBlockTypeBuilder {
    id: String,
    properties: Vec<Property>,
    settings: BlockSettings,
    appearance: Option<BlockAppearance>,
    fixed_internal_id: Option<u32>,
    fixed_visual_id: Option<u32>,
    visual_group: Option<String>,
}

impl CustomBlockTypeBuilder {
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn properties(mut self, properties: impl IntoIterator<Item = Property>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn settings(mut self, settings: BlockSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn appearance(mut self, appearance: BlockAppearance) -> Self {
        self.appearance = Some(appearance);
        self
    }

    /// Reserve internal ids `base..base + state_count` for this block.
    pub fn internal_id(mut self, base: u32) -> Self {
        self.fixed_internal_id = Some(base);
        self
    }

    /// Reserve visual ids `base..base + state_count` for this block.
    pub fn visual_id(mut self, base: u32) -> Self {
        self.fixed_visual_id = Some(base);
        self
    }

    /// Auto state group used when visual ids are allocated automatically.
    pub fn visual_group(mut self, group: impl Into<String>) -> Self {
        self.visual_group = Some(group.into());
        self
    }

    pub fn build(self) -> Result<CustomBlockType, BlockTypeError> {
        if self.id.is_empty() {
            return Err(BlockTypeError::EmptyId);
        }
        if has_reserved_char(&self.id) || self.id.contains(char::is_whitespace) {
            return Err(BlockTypeError::InvalidId(self.id));
        }
        for (i, property) in self.properties.iter().enumerate() {
            if self.properties[..i]
                .iter()
                .any(|p| p.name() == property.name())
            {
                return Err(BlockTypeError::DuplicateProperty {
                    block: self.id,
                    property: property.name().to_string(),
                });
            }
        }

        let appearance = self
            .appearance
            .unwrap_or_else(|| BlockAppearance::named(self.id.as_str()));
        let layout = Arc::new(StateLayout::new(self.id, self.properties)?);
        let states = generate_states(&layout);

        Ok(CustomBlockType {
            layout,
            settings: self.settings,
            appearance,
            fixed_internal_id: self.fixed_internal_id,
            fixed_visual_id: self.fixed_visual_id,
            visual_group: self.visual_group,
            states,
        })
    }
}

fn generate_states(layout: &Arc<StateLayout>) -> Vec<BlockState> {
    let mut states = Vec::with_capacity(layout.state_count());
    let mut current = vec![0u16; layout.properties.len()];
    generate_variants(layout, 0, &mut current, &mut states);
    states
}

fn generate_variants(
    layout: &Arc<StateLayout>,
    depth: usize,
    current: &mut [u16],
    states: &mut Vec<BlockState>,
) {
    if depth == layout.properties.len() {
        let index = states.len();
        states.push(BlockState::new(
            layout.clone(),
            current.to_vec().into_boxed_slice(),
            index,
        ));
        return;
    }

    let property = &layout.properties[depth];
    for rank in 0..property.len() {
        current[depth] = property.index_at_rank(rank) as u16;
        generate_variants(layout, depth + 1, current, states);
    }
}

impl CustomBlockType {
    pub fn builder(id: impl Into<String>) -> CustomBlockTypeBuilder {
        CustomBlockTypeBuilder {
            id: id.into(),
            properties: Vec::new(),
            settings: BlockSettings::default(),
            appearance: None,
            fixed_internal_id: None,
            fixed_visual_id: None,
            visual_group: None,
        }
    }

    /// Build a block type with no fixed ids and a default appearance.
    pub fn new(
        id: impl Into<String>,
        properties: Vec<Property>,
        settings: BlockSettings,
    ) -> Result<Self, BlockTypeError> {
        Self::builder(id)
            .properties(properties)
            .settings(settings)
            .build()
    }

    pub fn id(&self) -> &str {
        &self.layout.id
    }

    pub fn properties(&self) -> &[Property] {
        &self.layout.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.layout.properties.iter().find(|p| p.name() == name)
    }

    pub fn settings(&self) -> &BlockSettings {
        &self.settings
    }

    pub fn appearance(&self) -> &BlockAppearance {
        &self.appearance
    }

    pub fn fixed_internal_id(&self) -> Option<u32> {
        self.fixed_internal_id
    }

    pub fn fixed_visual_id(&self) -> Option<u32> {
        self.fixed_visual_id
    }

    pub fn visual_group(&self) -> Option<&str> {
        self.visual_group.as_deref()
    }

    /// All generated states in generation order.
    pub fn states(&self) -> &[BlockState] {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// The all-defaults state.
    pub fn default_state(&self) -> &BlockState {
        &self.states[0]
    }

    pub fn state(&self, index: usize) -> Option<&BlockState> {
        self.states.get(index)
    }

    /// State at `index`, or the default state when out of range.
    pub fn get_state_by_id(&self, index: usize) -> &BlockState {
        self.states.get(index).unwrap_or(self.default_state())
    }

    /// Whether `state` was generated by this block type.
    pub fn owns(&self, state: &BlockState) -> bool {
        state.belongs_to(&self.layout)
    }

    /// Resolve a property assignment to its canonical state.
    ///
    /// Properties not mentioned keep their default value.
    pub fn get_state_from_properties<'a, I>(&self, values: I) -> Result<&BlockState, PropertyError>
    where
        I: IntoIterator<Item = (&'a str, PropertyValue)>,
    {
        let mut state = self.default_state();
        for (name, value) in values {
            state = self.with_property(state, name, value)?;
        }
        Ok(state)
    }

    /// The canonical state equal to `state` except for `name = value`.
    pub fn with_property(
        &self,
        state: &BlockState,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<&BlockState, PropertyError> {
        if !self.owns(state) {
            return Err(PropertyError::ForeignState {
                block: self.id().to_string(),
                state_block: state.block_id().to_string(),
            });
        }
        let values = state.assignment_with(name, &value.into())?;
        Ok(&self.states[self.layout.index_of(&values)])
    }

    /// Resolve string-valued properties leniently.
    ///
    /// Unknown names are ignored; values outside a property's domain fall
    /// back to that property's default.
    pub fn state_from_strings<'a, I>(&self, values: I) -> &BlockState
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut assignment: Vec<u16> = self
            .layout
            .properties
            .iter()
            .map(|p| p.default_index() as u16)
            .collect();
        for (name, text) in values {
            if let Some(pos) = self.layout.position(name) {
                assignment[pos] = self.layout.properties[pos].index_from_str(text) as u16;
            }
        }
        &self.states[self.layout.index_of(&assignment)]
    }

    /// Render a state's values as `name=value|name=value`.
    pub fn encode_properties(&self, state: &BlockState) -> String {
        state
            .values()
            .map(|(property, value)| format!("{}={}", property.name(), value))
            .collect::<Vec<_>>()
            .join(PROPERTY_SEPARATOR)
    }

    /// Parse a string produced by [`encode_properties`](Self::encode_properties).
    ///
    /// Malformed pairs are skipped; see [`state_from_strings`](Self::state_from_strings).
    pub fn decode_properties(&self, text: &str) -> &BlockState {
        let pairs = text
            .split(PROPERTY_SEPARATOR)
            .filter_map(|pair| pair.split_once('='));
        self.state_from_strings(pairs)
    }
}

//! Serde model of a block definition entry.

use oxiblock_core::property::Direction;
use oxiblock_core::settings::is_valid_material;
use oxiblock_core::{
    BlockAppearance, BlockSettings, BlockTypeError, CustomBlockType, Property, PropertyError,
    PropertyValue,
};
use serde::Deserialize;

use crate::error::ConfigError;

/// One `[[block]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDefinition {
    pub id: String,
    #[serde(default)]
    pub namespace: Option<String>,
    /// Host material the block renders as.
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub internal_id: Option<u32>,
    #[serde(default)]
    pub visual_id: Option<u32>,
    #[serde(default)]
    pub visual_group: Option<String>,
    #[serde(default)]
    pub settings: SettingsSpec,
    #[serde(default)]
    pub appearance: Option<AppearanceSpec>,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSpec {
    #[serde(default = "default_strength")]
    pub hardness: f32,
    #[serde(default = "default_strength")]
    pub resistance: f32,
    #[serde(default)]
    pub replaceable: bool,
    #[serde(default)]
    pub requires_correct_tool_for_drops: bool,
    #[serde(default)]
    pub emit_light: i64,
    #[serde(default = "default_sound_type")]
    pub sound_type: String,
}

fn default_strength() -> f32 {
    1.0
}

fn default_sound_type() -> String {
    "wood".into()
}

impl Default for SettingsSpec {
    fn default() -> Self {
        Self {
            hardness: default_strength(),
            resistance: default_strength(),
            replaceable: false,
            requires_correct_tool_for_drops: false,
            emit_light: 0,
            sound_type: default_sound_type(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppearanceSpec {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default = "default_parent_model")]
    pub parent_model: String,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub generate_model: bool,
    #[serde(default)]
    pub custom_render: bool,
}

fn default_parent_model() -> String {
    "block/cube_all".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Boolean,
    Integer,
    Enum,
    Direction,
}

/// A declared default, typed by whatever the file wrote.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default)]
    pub min: Option<i32>,
    #[serde(default)]
    pub max: Option<i32>,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub default: Option<DefaultValue>,
}

impl PropertySpec {
    pub fn to_property(&self) -> Result<Property, PropertyError> {
        let property = match self.kind {
            PropertyType::Boolean => Property::boolean(self.name.as_str())?,
            PropertyType::Integer => Property::integer(
                self.name.as_str(),
                self.min.unwrap_or(0),
                self.max.unwrap_or(0),
            )?,
            PropertyType::Enum => {
                Property::enumeration(self.name.as_str(), self.values.iter().flatten().cloned())?
            }
            PropertyType::Direction => match &self.values {
                Some(names) => {
                    let dirs = names
                        .iter()
                        .map(|n| {
                            Direction::parse(n).ok_or_else(|| PropertyError::InvalidValue {
                                property: self.name.clone(),
                                value: n.clone(),
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Property::direction(self.name.as_str(), dirs)?
                }
                None => Property::direction(self.name.as_str(), Direction::ALL)?,
            },
        };

        match &self.default {
            Some(value) => {
                let value = self.default_value(value)?;
                property.with_default(value)
            }
            None => Ok(property),
        }
    }

    fn default_value(&self, value: &DefaultValue) -> Result<PropertyValue, PropertyError> {
        let invalid = || PropertyError::InvalidDefault {
            property: self.name.clone(),
            value: match value {
                DefaultValue::Bool(b) => b.to_string(),
                DefaultValue::Int(i) => i.to_string(),
                DefaultValue::Text(s) => s.clone(),
            },
        };
        match (self.kind, value) {
            (PropertyType::Boolean, DefaultValue::Bool(b)) => Ok(PropertyValue::Bool(*b)),
            (PropertyType::Integer, DefaultValue::Int(i)) => {
                i32::try_from(*i).map(PropertyValue::Int).map_err(|_| invalid())
            }
            (PropertyType::Enum, DefaultValue::Text(s)) => Ok(PropertyValue::from(s.as_str())),
            (PropertyType::Direction, DefaultValue::Text(s)) => Direction::parse(s)
                .map(PropertyValue::Direction)
                .ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

impl BlockDefinition {
    /// Block id including the namespace prefix, if any.
    pub fn full_id(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}:{}", self.id),
            _ => self.id.clone(),
        }
    }

    pub fn into_block_type(self) -> Result<CustomBlockType, ConfigError> {
        let id = self.full_id();

        let visual_material = match self.material {
            Some(material) if is_valid_material(&material) => material,
            Some(material) => {
                return Err(ConfigError::InvalidDefinition {
                    block: id,
                    reason: format!("invalid material name '{material}'"),
                })
            }
            None => BlockSettings::default().visual_material,
        };
        let settings = BlockSettings {
            visual_material,
            hardness: self.settings.hardness,
            resistance: self.settings.resistance,
            replaceable: self.settings.replaceable,
            requires_correct_tool_for_drops: self.settings.requires_correct_tool_for_drops,
            emit_light: BlockSettings::light_level(self.settings.emit_light),
            sound_type: self.settings.sound_type,
        };

        let properties = self
            .properties
            .iter()
            .map(PropertySpec::to_property)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::Block {
                block: id.clone(),
                source: BlockTypeError::from(e),
            })?;

        let mut builder = CustomBlockType::builder(id.as_str())
            .properties(properties)
            .settings(settings);
        if let Some(appearance) = self.appearance {
            builder = builder.appearance(BlockAppearance {
                model_name: appearance.model_name.unwrap_or_else(|| id.clone()),
                parent_model: appearance.parent_model,
                texture: appearance.texture,
                generate_model: appearance.generate_model,
                custom_render: appearance.custom_render,
            });
        }
        if let Some(base) = self.internal_id {
            builder = builder.internal_id(base);
        }
        if let Some(base) = self.visual_id {
            builder = builder.visual_id(base);
        }
        if let Some(group) = self.visual_group {
            builder = builder.visual_group(group);
        }

        builder
            .build()
            .map_err(|source| ConfigError::Block { block: id, source })
    }
}

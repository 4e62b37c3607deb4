//! Physical and visual defaults shared by every state of a block type.

/// Material the client falls back to when a definition names none.
pub const DEFAULT_MATERIAL: &str = "paper";

/// Highest light level a block can emit.
pub const MAX_LIGHT_LEVEL: u8 = 15;

/// Physical attributes and the host material a block renders as.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSettings {
    /// Host material used to render the block on the client.
    pub visual_material: String,
    pub hardness: f32,
    pub resistance: f32,
    /// Whether placing another block replaces this one.
    pub replaceable: bool,
    pub requires_correct_tool_for_drops: bool,
    /// Emitted light level, `0..=15`.
    pub emit_light: u8,
    pub sound_type: String,
}

impl Default for BlockSettings {
    fn default() -> Self {
        Self {
            visual_material: DEFAULT_MATERIAL.to_string(),
            hardness: 1.0,
            resistance: 1.0,
            replaceable: false,
            requires_correct_tool_for_drops: false,
            emit_light: 0,
            sound_type: "wood".to_string(),
        }
    }
}

impl BlockSettings {
    /// Clamp an arbitrary light value into `0..=15`.
    pub fn light_level(value: i64) -> u8 {
        value.clamp(0, MAX_LIGHT_LEVEL as i64) as u8
    }
}

/// Check a host material name: non-empty, ASCII alphanumerics plus `_ : . /`.
pub fn is_valid_material(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'.' | b'/'))
}

/// Model and texture hints for resource pack generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAppearance {
    pub model_name: String,
    pub parent_model: String,
    pub texture: Option<String>,
    pub generate_model: bool,
    pub custom_render: bool,
}

impl BlockAppearance {
    /// Appearance with every field at its default, modelled after `model_name`.
    pub fn named(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            parent_model: "block/cube_all".to_string(),
            texture: None,
            generate_model: false,
            custom_render: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_level_is_clamped() {
        assert_eq!(BlockSettings::light_level(-4), 0);
        assert_eq!(BlockSettings::light_level(7), 7);
        assert_eq!(BlockSettings::light_level(99), 15);
    }

    #[test]
    fn material_names() {
        assert!(is_valid_material("note_block"));
        assert!(is_valid_material("minecraft:mushroom_stem"));
        assert!(!is_valid_material(""));
        assert!(!is_valid_material("note block"));
        assert!(!is_valid_material("lamp!"));
    }

    #[test]
    fn default_settings() {
        let settings = BlockSettings::default();
        assert_eq!(settings.visual_material, "paper");
        assert_eq!(settings.sound_type, "wood");
        assert_eq!(settings.emit_light, 0);
    }
}

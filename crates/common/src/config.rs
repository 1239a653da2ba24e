//! Process-wide world settings.
//!
//! A `WorldConfig` is built once at startup (defaults, or a YAML file) and then
//! shared read-only by every component.

use crate::types::palette;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Errors from loading or validating a world configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{field} must be in [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// How chunk coordinates translate into noise-space coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sampling {
    /// Rows follow the chunk's x coordinate and columns its y coordinate.
    #[default]
    Corrected,
    /// Both axes follow the chunk's x coordinate, so chunks that differ
    /// only in y hold identical terrain.
    Legacy,
}

/// Immutable settings for a chunked world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Side length of a chunk in grid cells.
    pub chunk_size: u32,
    /// Screen columns per grid cell.
    pub cell_width: u32,
    /// Screen rows per grid cell.
    pub cell_height: u32,
    pub seed: u32,
    /// Terrain class index (1-based) to marker glyph.
    pub marker_map: BTreeMap<u32, String>,
    /// Terrain class index (1-based) to color id.
    pub color_map: BTreeMap<u32, u32>,
    pub default_marker: String,
    pub default_color: u32,
    pub sampling: Sampling,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: 21,
            cell_width: 2,
            cell_height: 1,
            seed: 1_234_567_890,
            marker_map: BTreeMap::from([
                (1, "~".to_string()),
                (2, ".".to_string()),
                (3, "o".to_string()),
            ]),
            color_map: BTreeMap::from([
                (1, palette::BRIGHT_BLUE),
                (2, palette::DARK_GREEN),
                (3, palette::DARK_GRAY),
            ]),
            default_marker: "#".to_string(),
            default_color: palette::DARK_GREEN,
            sampling: Sampling::Corrected,
        }
    }
}

impl WorldConfig {
    /// Parse and validate a YAML document. Missing keys take default values.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded world config");
        Ok(config)
    }

    /// Check every range and non-empty constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size < 1 || self.chunk_size > i32::MAX as u32 / 2 {
            return Err(ConfigError::OutOfRange {
                field: "chunk_size",
                value: self.chunk_size.into(),
                min: 1,
                max: (i32::MAX / 2).into(),
            });
        }
        for (field, value) in [("cell_width", self.cell_width), ("cell_height", self.cell_height)] {
            if value < 1 || value > self.chunk_size {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: value.into(),
                    min: 1,
                    max: self.chunk_size.into(),
                });
            }
        }
        if self.marker_map.is_empty() {
            return Err(ConfigError::Empty("marker_map"));
        }
        if self.color_map.is_empty() {
            return Err(ConfigError::Empty("color_map"));
        }
        if self.default_marker.trim().is_empty() {
            return Err(ConfigError::Empty("default_marker"));
        }
        Ok(())
    }

    /// Chunk side length as a signed grid extent.
    pub fn size(&self) -> i32 {
        self.chunk_size as i32
    }
}

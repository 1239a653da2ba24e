//! Entity model: validated movable objects positioned in Relative coordinates.

use crate::coords::CoordinateSystem;
use chunkworld_common::{AbsPos, ChunkCoord, ObjectId, RelPos, WorldConfig, palette};
use serde::{Deserialize, Serialize};

/// Input validation failures. Always raised before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("icon must not be blank")]
    BlankIcon,
    #[error("color must be in [0, {max}] (got {value})", max = u32::MAX)]
    ColorOutOfRange { value: i64 },
    #[error("{field} must be in [1, {max}] (got {value})")]
    SizeOutOfRange {
        field: &'static str,
        value: i64,
        max: u32,
    },
    #[error("object id must be positive")]
    ZeroId,
    #[error("object {0} already exists")]
    DuplicateId(ObjectId),
    #[error("object {id} records chunk {stored} but its position lies in chunk {computed}")]
    ChunkMismatch {
        id: ObjectId,
        stored: ChunkCoord,
        computed: ChunkCoord,
    },
    #[error("chunk grid has {actual} samples, expected {expected}")]
    GridShape { expected: usize, actual: usize },
}

/// Unvalidated fields for creating an entity.
///
/// `width` and `height` of 0 mean "use the configured cell size".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpec {
    /// `None` lets the store assign the next free id.
    pub id: Option<ObjectId>,
    pub pos: RelPos,
    pub icon: String,
    pub width: i64,
    pub height: i64,
    pub color: i64,
}

impl Default for EntitySpec {
    fn default() -> Self {
        Self {
            id: None,
            pos: RelPos::default(),
            icon: "@".to_string(),
            width: 0,
            height: 0,
            color: palette::BRIGHT_RED.into(),
        }
    }
}

impl EntitySpec {
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.pos = RelPos::new(x, y);
        self
    }

    pub fn color(mut self, color: i64) -> Self {
        self.color = color;
        self
    }

    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    /// Check every field against the world configuration.
    pub fn validate(&self, config: &WorldConfig) -> Result<(), ValidationError> {
        if self.id == Some(ObjectId(0)) {
            return Err(ValidationError::ZeroId);
        }
        if self.icon.trim().is_empty() {
            return Err(ValidationError::BlankIcon);
        }
        if u32::try_from(self.color).is_err() {
            return Err(ValidationError::ColorOutOfRange { value: self.color });
        }
        resolve_size("width", self.width, config.cell_width, config.chunk_size)?;
        resolve_size("height", self.height, config.cell_height, config.chunk_size)?;
        Ok(())
    }
}

fn resolve_size(field: &'static str, value: i64, default: u32, max: u32) -> Result<u32, ValidationError> {
    if value == 0 {
        return Ok(default);
    }
    match u32::try_from(value) {
        Ok(v) if v <= max => Ok(v),
        _ => Err(ValidationError::SizeOutOfRange { field, value, max }),
    }
}

/// A placed object. `chunk` always equals the chunk containing `pos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: ObjectId,
    /// World-global Relative position.
    pub pos: RelPos,
    pub chunk: ChunkCoord,
    pub icon: String,
    pub width: u32,
    pub height: u32,
    pub color: u32,
}

impl Entity {
    /// Validate `spec` and build the entity under `id`.
    pub fn from_spec(
        id: ObjectId,
        spec: &EntitySpec,
        config: &WorldConfig,
        coords: &CoordinateSystem,
    ) -> Result<Self, ValidationError> {
        spec.validate(config)?;
        if id.0 == 0 {
            return Err(ValidationError::ZeroId);
        }
        let (chunk, _) = coords.locate(spec.pos);
        Ok(Self {
            id,
            pos: spec.pos,
            chunk,
            icon: spec.icon.clone(),
            width: resolve_size("width", spec.width, config.cell_width, config.chunk_size)?,
            height: resolve_size("height", spec.height, config.cell_height, config.chunk_size)?,
            color: spec.color as u32,
        })
    }

    /// Position inside the owning chunk.
    pub fn abs(&self, coords: &CoordinateSystem) -> AbsPos {
        coords.abs_in(self.chunk, self.pos)
    }

    /// Copy of this entity moved to `pos`, with its chunk recomputed.
    pub fn moved_to(&self, pos: RelPos, coords: &CoordinateSystem) -> Self {
        let (chunk, _) = coords.locate(pos);
        Self {
            pos,
            chunk,
            ..self.clone()
        }
    }
}

//! World Kernel: coordinate spaces, terrain classification, deterministic
//! chunk generation and the entity model.
//!
//! # Invariants
//! - Every transform and the generator are pure with respect to their inputs.
//! - Validation happens before any value is constructed; no partial state.

pub mod coords;
pub mod entity;
pub mod generator;
pub mod terrain;

pub use coords::{Axis, CoordError, CoordinateSystem};
pub use entity::{Entity, EntitySpec, ValidationError};
pub use generator::{ChunkData, ChunkGenerator};
pub use terrain::{TerrainClass, TerrainClassifier};

//! Shared vocabulary for the chunked world: coordinate value types, object ids,
//! the color palette and the process-wide [`WorldConfig`].
//!
//! # Invariants
//! - `WorldConfig` is validated once and never mutated afterwards.
//! - Coordinate types carry no chunk geometry; conversions live in the kernel.

pub mod config;
pub mod types;

pub use config::{ConfigError, Sampling, WorldConfig};
pub use types::{AbsPos, ChunkCoord, ObjectId, RelPos, ScreenPos, palette};

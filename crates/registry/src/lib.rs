//! Entity Registry: owns the in-memory entity set and moves entities with
//! write-through persistence.
//!
//! # Invariants
//! - An entity's Absolute position always lies inside its owning chunk.
//! - A move either commits both the stored record and the in-memory entity,
//!   or neither.
//! - Only the objects table is written.

mod registry;

pub use registry::{DirtyCell, EntityRegistry, MoveOutcome, RegistryError};

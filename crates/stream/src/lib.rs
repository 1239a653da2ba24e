//! Streaming: chunk load-or-generate cache with 3x3 neighbor prefetch.
//!
//! # Invariants
//! - At most one generation per coordinate while a record exists; only an
//!   explicit `regenerate` replaces a stored chunk.
//! - Corrupt records surface as errors and are never silently regenerated.
//! - Prefetch recursion is bounded to depth 1.

mod chunk_store;

pub use chunk_store::{ChunkStats, ChunkStore, ChunkStoreError};

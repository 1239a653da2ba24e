//! Persistence: two logical tables (chunks and objects) behind one record store.
//!
//! # Invariants
//! - Chunk blobs are opaque to the store; encoding lives in [`codec`].
//! - A failed write leaves the previously committed record visible.
//! - One writer at a time: the store is shared as [`SharedStore`].

pub mod codec;
mod memory;
mod store;

use chunkworld_common::{ChunkCoord, ObjectId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use codec::{DecodeError, decode_chunk, encode_chunk};
pub use memory::{MemoryStore, WriteCounts};
pub use store::{FileStore, StoreMeta};

/// Errors from record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed for {record}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        record: String,
        expected: String,
        actual: String,
    },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("store is read-only")]
    ReadOnly,
}

/// One row of the objects table. Columns are stored unvalidated; the entity
/// registry validates them on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRow {
    pub id: ObjectId,
    pub x: i32,
    pub y: i32,
    pub chunk_x: i32,
    pub chunk_y: i32,
    pub icon: String,
    pub width: i64,
    pub height: i64,
    pub color: i64,
}

impl ObjectRow {
    pub fn chunk(&self) -> ChunkCoord {
        ChunkCoord::new(self.chunk_x, self.chunk_y)
    }
}

/// A persistent record store holding the chunks and objects tables.
///
/// Every call is synchronous and returns only after the change is committed.
pub trait RecordStore {
    fn chunk_exists(&self, coord: ChunkCoord) -> Result<bool, StoreError>;

    /// Raw blob for `coord`, `None` if no record exists.
    fn read_chunk(&self, coord: ChunkCoord) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or replace the blob for `coord`.
    fn write_chunk(&mut self, coord: ChunkCoord, blob: &[u8]) -> Result<(), StoreError>;

    /// Remove the record for `coord`. Returns whether one existed.
    fn delete_chunk(&mut self, coord: ChunkCoord) -> Result<bool, StoreError>;

    /// Every stored chunk coordinate, in ascending order.
    fn chunk_coords(&self) -> Result<Vec<ChunkCoord>, StoreError>;

    /// Reserve the next unused object id.
    fn allocate_object_id(&mut self) -> Result<ObjectId, StoreError>;

    fn read_object(&self, id: ObjectId) -> Result<Option<ObjectRow>, StoreError>;

    /// Insert or update the row with `row.id`.
    fn write_object(&mut self, row: &ObjectRow) -> Result<(), StoreError>;

    /// Remove the row with `id`. Returns whether one existed.
    fn delete_object(&mut self, id: ObjectId) -> Result<bool, StoreError>;

    /// Every object row, ordered by id.
    fn objects(&self) -> Result<Vec<ObjectRow>, StoreError>;
}

/// Store handle shared by the chunk store and the entity registry.
pub type SharedStore<S> = Arc<Mutex<S>>;

pub fn share<S: RecordStore>(store: S) -> SharedStore<S> {
    Arc::new(Mutex::new(store))
}

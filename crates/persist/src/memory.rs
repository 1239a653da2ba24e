//! In-memory `RecordStore` with write counters and fault injection.

use crate::{ObjectRow, RecordStore, StoreError};
use chunkworld_common::{ChunkCoord, ObjectId};
use std::collections::BTreeMap;

/// Write counters kept by [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub chunk_writes: usize,
    pub object_writes: usize,
}

/// In-memory record store for tests and throwaway worlds.
///
/// Can be switched read-only to reject every write, which is how callers
/// exercise their failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chunks: BTreeMap<ChunkCoord, Vec<u8>>,
    objects: BTreeMap<ObjectId, ObjectRow>,
    next_object_id: u64,
    read_only: bool,
    counts: WriteCounts,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_object_id: 1,
            ..Self::default()
        }
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn counts(&self) -> WriteCounts {
        self.counts
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn chunk_exists(&self, coord: ChunkCoord) -> Result<bool, StoreError> {
        Ok(self.chunks.contains_key(&coord))
    }

    fn read_chunk(&self, coord: ChunkCoord) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.chunks.get(&coord).cloned())
    }

    fn write_chunk(&mut self, coord: ChunkCoord, blob: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.chunks.insert(coord, blob.to_vec());
        self.counts.chunk_writes += 1;
        Ok(())
    }

    fn delete_chunk(&mut self, coord: ChunkCoord) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(self.chunks.remove(&coord).is_some())
    }

    fn chunk_coords(&self) -> Result<Vec<ChunkCoord>, StoreError> {
        Ok(self.chunks.keys().copied().collect())
    }

    fn allocate_object_id(&mut self) -> Result<ObjectId, StoreError> {
        self.check_writable()?;
        let id = ObjectId(self.next_object_id.max(1));
        self.next_object_id = id.0 + 1;
        Ok(id)
    }

    fn read_object(&self, id: ObjectId) -> Result<Option<ObjectRow>, StoreError> {
        Ok(self.objects.get(&id).cloned())
    }

    fn write_object(&mut self, row: &ObjectRow) -> Result<(), StoreError> {
        self.check_writable()?;
        self.objects.insert(row.id, row.clone());
        self.next_object_id = self.next_object_id.max(row.id.0 + 1);
        self.counts.object_writes += 1;
        Ok(())
    }

    fn delete_object(&mut self, id: ObjectId) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(self.objects.remove(&id).is_some())
    }

    fn objects(&self) -> Result<Vec<ObjectRow>, StoreError> {
        Ok(self.objects.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_skip_explicit_rows() {
        let mut store = MemoryStore::new();
        assert_eq!(store.allocate_object_id().unwrap(), ObjectId(1));
        store
            .write_object(&ObjectRow {
                id: ObjectId(10),
                x: 0,
                y: 0,
                chunk_x: 0,
                chunk_y: 0,
                icon: "&".into(),
                width: 2,
                height: 1,
                color: 14,
            })
            .unwrap();
        assert_eq!(store.allocate_object_id().unwrap(), ObjectId(11));
        assert_eq!(store.counts().object_writes, 1);
    }

    #[test]
    fn read_only_rejects_writes_and_keeps_data() {
        let mut store = MemoryStore::new();
        store.write_chunk(ChunkCoord::ORIGIN, b"a").unwrap();
        store.set_read_only(true);
        assert!(matches!(
            store.write_chunk(ChunkCoord::ORIGIN, b"b"),
            Err(StoreError::ReadOnly)
        ));
        assert!(store.delete_chunk(ChunkCoord::ORIGIN).is_err());
        assert_eq!(store.read_chunk(ChunkCoord::ORIGIN).unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.counts().chunk_writes, 1);
    }
}

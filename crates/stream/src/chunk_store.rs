use chunkworld_common::{ChunkCoord, WorldConfig};
use chunkworld_kernel::{ChunkData, ChunkGenerator};
use chunkworld_persist::{RecordStore, SharedStore, StoreError, decode_chunk, encode_chunk};
use std::collections::HashMap;
use std::sync::Arc;

/// Errors from chunk loading.
#[derive(Debug, thiserror::Error)]
pub enum ChunkStoreError {
    #[error("chunk {coord} is corrupt: {reason}")]
    Corrupt { coord: ChunkCoord, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters for instrumentation and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    /// Chunks decoded from the record store.
    pub loaded: usize,
    /// Chunks produced by the generator (including regenerations).
    pub generated: usize,
    /// Requests answered from memory.
    pub cache_hits: usize,
}

/// Load-or-generate cache over the chunks table.
///
/// Owns the in-memory chunk cache and writes only chunk records through the
/// shared store.
pub struct ChunkStore<S> {
    config: Arc<WorldConfig>,
    generator: ChunkGenerator,
    store: SharedStore<S>,
    cache: HashMap<ChunkCoord, Arc<ChunkData>>,
    stats: ChunkStats,
}

impl<S: RecordStore> ChunkStore<S> {
    pub fn new(config: Arc<WorldConfig>, store: SharedStore<S>) -> Self {
        let generator = ChunkGenerator::new(&config);
        Self {
            config,
            generator,
            store,
            cache: HashMap::new(),
            stats: ChunkStats::default(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Return the chunk at `coord`, reading the stored record or generating
    /// and persisting a new one.
    ///
    /// With `prefetch_neighbors`, the whole 3x3 neighborhood around `coord`
    /// is materialized first (without further prefetch), so every neighbor of
    /// a visited chunk is stored.
    pub fn load(&mut self, coord: ChunkCoord, prefetch_neighbors: bool) -> Result<Arc<ChunkData>, ChunkStoreError> {
        let _span = tracing::info_span!("chunk_load", %coord, prefetch_neighbors).entered();
        if prefetch_neighbors {
            for neighbor in coord.neighborhood() {
                self.resolve(neighbor)?;
            }
        }
        self.resolve(coord)
    }

    /// Discard any stored record for `coord` and replace it with a freshly
    /// generated chunk.
    pub fn regenerate(&mut self, coord: ChunkCoord) -> Result<Arc<ChunkData>, ChunkStoreError> {
        let data = self.generator.generate(coord);
        let blob = encode_chunk(&data)?;
        {
            let mut store = self.store.lock();
            let existed = store.delete_chunk(coord)?;
            store.write_chunk(coord, &blob)?;
            tracing::info!(%coord, replaced = existed, "regenerated chunk");
        }
        self.stats.generated += 1;
        let data = Arc::new(data);
        self.cache.insert(coord, Arc::clone(&data));
        Ok(data)
    }

    /// Whether a record for `coord` exists in the store.
    pub fn exists(&self, coord: ChunkCoord) -> Result<bool, ChunkStoreError> {
        Ok(self.store.lock().chunk_exists(coord)?)
    }

    /// Compare the stored record for `coord` with a fresh generation.
    /// Returns `false` when no record exists or the grids differ.
    pub fn verify(&self, coord: ChunkCoord) -> Result<bool, ChunkStoreError> {
        let Some(stored) = self.read_record(coord)? else {
            return Ok(false);
        };
        let matches = stored.same_bits(&self.generator.generate(coord));
        if !matches {
            tracing::warn!(%coord, "stored chunk differs from regeneration");
        }
        Ok(matches)
    }

    /// Chunk already held in memory, if any.
    pub fn cached(&self, coord: ChunkCoord) -> Option<Arc<ChunkData>> {
        self.cache.get(&coord).cloned()
    }

    pub fn stats(&self) -> ChunkStats {
        self.stats
    }

    fn resolve(&mut self, coord: ChunkCoord) -> Result<Arc<ChunkData>, ChunkStoreError> {
        if let Some(data) = self.cache.get(&coord) {
            self.stats.cache_hits += 1;
            return Ok(Arc::clone(data));
        }

        let data = match self.read_record(coord)? {
            Some(data) => {
                self.stats.loaded += 1;
                tracing::trace!(%coord, "chunk read from store");
                data
            }
            None => {
                let data = self.generator.generate(coord);
                let blob = encode_chunk(&data)?;
                self.store.lock().write_chunk(coord, &blob)?;
                self.stats.generated += 1;
                tracing::debug!(%coord, "chunk generated and stored");
                data
            }
        };

        let data = Arc::new(data);
        self.cache.insert(coord, Arc::clone(&data));
        Ok(data)
    }

    fn read_record(&self, coord: ChunkCoord) -> Result<Option<ChunkData>, ChunkStoreError> {
        let blob = match self.store.lock().read_chunk(coord) {
            Ok(blob) => blob,
            Err(e @ StoreError::IntegrityMismatch { .. }) => {
                tracing::warn!(%coord, error = %e, "chunk failed integrity check");
                return Err(ChunkStoreError::Corrupt {
                    coord,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let Some(blob) = blob else {
            return Ok(None);
        };
        match decode_chunk(&blob, self.config.chunk_size) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                tracing::warn!(%coord, error = %e, "chunk record failed to decode");
                Err(ChunkStoreError::Corrupt {
                    coord,
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkworld_persist::{FileStore, MemoryStore, share};

    fn config() -> Arc<WorldConfig> {
        Arc::new(WorldConfig {
            chunk_size: 9,
            ..WorldConfig::default()
        })
    }

    fn memory_chunks() -> (ChunkStore<MemoryStore>, SharedStore<MemoryStore>) {
        let store = share(MemoryStore::new());
        (ChunkStore::new(config(), Arc::clone(&store)), store)
    }

    #[test]
    fn load_twice_generates_once() {
        let (mut chunks, store) = memory_chunks();
        let a = chunks.load(ChunkCoord::new(2, 3), false).unwrap();
        let b = chunks.load(ChunkCoord::new(2, 3), false).unwrap();
        assert!(a.same_bits(&b));
        assert_eq!(chunks.stats().generated, 1);
        assert_eq!(store.lock().counts().chunk_writes, 1);
    }

    #[test]
    fn prefetch_materializes_neighborhood() {
        let (mut chunks, _) = memory_chunks();
        let center = ChunkCoord::new(-4, 7);
        chunks.load(center, true).unwrap();
        for coord in center.neighborhood() {
            assert!(chunks.exists(coord).unwrap(), "{coord} missing");
        }
        assert!(!chunks.exists(ChunkCoord::new(-4, 9)).unwrap());
        assert_eq!(chunks.stats().generated, 9);
    }

    #[test]
    fn prefetch_at_coordinate_limit_skips_missing_neighbors() {
        let (mut chunks, _) = memory_chunks();
        chunks.load(ChunkCoord::new(i32::MAX, 0), true).unwrap();
        assert_eq!(chunks.stats().generated, 6);
        assert!(chunks.exists(ChunkCoord::new(i32::MAX - 1, -1)).unwrap());

        chunks.load(ChunkCoord::new(i32::MIN, i32::MIN), true).unwrap();
        assert_eq!(chunks.stats().generated, 10);
    }

    #[test]
    fn overlapping_prefetch_reuses_stored_chunks() {
        let (mut chunks, _) = memory_chunks();
        chunks.load(ChunkCoord::new(0, 0), true).unwrap();
        chunks.load(ChunkCoord::new(1, 0), true).unwrap();
        // the second neighborhood shares six chunks with the first
        assert_eq!(chunks.stats().generated, 12);
    }

    #[test]
    fn stored_chunk_is_authoritative() {
        let store = share(MemoryStore::new());
        let first = ChunkStore::new(config(), Arc::clone(&store))
            .load(ChunkCoord::new(5, 5), false)
            .unwrap();

        let mut fresh = ChunkStore::new(config(), Arc::clone(&store));
        let again = fresh.load(ChunkCoord::new(5, 5), false).unwrap();
        assert!(again.same_bits(&first));
        assert_eq!(fresh.stats().generated, 0);
        assert_eq!(fresh.stats().loaded, 1);
        assert!(fresh.verify(ChunkCoord::new(5, 5)).unwrap());
    }

    #[test]
    fn corrupt_record_is_not_regenerated() {
        let (mut chunks, store) = memory_chunks();
        store.lock().write_chunk(ChunkCoord::ORIGIN, b"garbage").unwrap();

        let err = chunks.load(ChunkCoord::ORIGIN, false).unwrap_err();
        assert!(matches!(err, ChunkStoreError::Corrupt { coord, .. } if coord == ChunkCoord::ORIGIN));
        assert_eq!(chunks.stats().generated, 0);
        assert_eq!(store.lock().read_chunk(ChunkCoord::ORIGIN).unwrap(), Some(b"garbage".to_vec()));
    }

    #[test]
    fn regenerate_replaces_corrupt_record() {
        let (mut chunks, store) = memory_chunks();
        store.lock().write_chunk(ChunkCoord::ORIGIN, b"garbage").unwrap();

        let data = chunks.regenerate(ChunkCoord::ORIGIN).unwrap();
        assert!(chunks.verify(ChunkCoord::ORIGIN).unwrap());

        let mut fresh = ChunkStore::new(config(), Arc::clone(&store));
        assert!(fresh.load(ChunkCoord::ORIGIN, false).unwrap().same_bits(&data));
    }

    #[test]
    fn wrong_sized_record_is_corrupt() {
        let (mut chunks, store) = memory_chunks();
        let small = ChunkData::from_samples(2, vec![0.0; 4]).unwrap();
        store
            .lock()
            .write_chunk(ChunkCoord::ORIGIN, &encode_chunk(&small).unwrap())
            .unwrap();
        assert!(matches!(
            chunks.load(ChunkCoord::ORIGIN, false),
            Err(ChunkStoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn verify_missing_chunk_is_false() {
        let (chunks, _) = memory_chunks();
        assert!(!chunks.verify(ChunkCoord::new(9, 9)).unwrap());
    }

    #[test]
    fn store_failure_propagates() {
        let (mut chunks, store) = memory_chunks();
        store.lock().set_read_only(true);
        assert!(matches!(
            chunks.load(ChunkCoord::ORIGIN, false),
            Err(ChunkStoreError::Store(StoreError::ReadOnly))
        ));
        assert!(chunks.cached(ChunkCoord::ORIGIN).is_none());
    }

    #[test]
    fn tampered_file_record_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut chunks = ChunkStore::new(config(), share(FileStore::open(tmp.path()).unwrap()));
            chunks.load(ChunkCoord::new(1, -1), false).unwrap();
        }
        let path = tmp.path().join("chunks").join("1_-1.chunk.cbor.zst");
        let mut bytes = std::fs::read(&path).unwrap();
        if let Some(byte) = bytes.last_mut() {
            *byte ^= 0xff;
        }
        std::fs::write(&path, &bytes).unwrap();

        let mut chunks = ChunkStore::new(config(), share(FileStore::open(tmp.path()).unwrap()));
        assert!(matches!(
            chunks.load(ChunkCoord::new(1, -1), false),
            Err(ChunkStoreError::Corrupt { .. })
        ));
    }
}

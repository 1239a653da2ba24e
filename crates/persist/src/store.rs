//! File-backed record store.
//!
//! Layout inside the store directory:
//! ```text
//! world.meta.json                 - schema version and object id counter
//! chunks/
//!   <x>_<y>.chunk.cbor.zst        - one blob per generated chunk
//! integrity/
//!   chunks.json                   - sha256 of every chunk blob
//! objects.json                    - the objects table
//! ```
//!
//! Every file is replaced through write-to-temp + rename, so a crash leaves
//! either the old or the new version in place.

use crate::{ObjectRow, RecordStore, StoreError};
use chunkworld_common::{ChunkCoord, ObjectId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Current on-disk schema version.
const SCHEMA_VERSION: u32 = 1;
const CHUNK_SUFFIX: &str = ".chunk.cbor.zst";

/// Metadata stored in world.meta.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,
    /// Smallest id never handed out.
    pub next_object_id: u64,
}

/// Chunk blob hashes keyed by file name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ChunkManifest {
    entries: BTreeMap<String, String>,
}

/// Directory-backed store with schema versioning and per-chunk integrity
/// hashes.
pub struct FileStore {
    root: PathBuf,
    meta: StoreMeta,
    manifest: ChunkManifest,
    objects: BTreeMap<ObjectId, ObjectRow>,
}

impl FileStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("chunks"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join("world.meta.json");
        let manifest_path = root.join("integrity").join("chunks.json");
        let objects_path = root.join("objects.json");

        let store = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_slice(&std::fs::read(&meta_path)?)?;
            if meta.schema_version != SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: SCHEMA_VERSION,
                });
            }
            let manifest: ChunkManifest = if manifest_path.exists() {
                serde_json::from_slice(&std::fs::read(&manifest_path)?)?
            } else {
                ChunkManifest::default()
            };
            let rows: Vec<ObjectRow> = if objects_path.exists() {
                serde_json::from_slice(&std::fs::read(&objects_path)?)?
            } else {
                Vec::new()
            };
            Self {
                root,
                meta,
                manifest,
                objects: rows.into_iter().map(|r| (r.id, r)).collect(),
            }
        } else {
            let store = Self {
                root,
                meta: StoreMeta {
                    schema_version: SCHEMA_VERSION,
                    next_object_id: 1,
                },
                manifest: ChunkManifest::default(),
                objects: BTreeMap::new(),
            };
            store.save_meta(&store.meta)?;
            store.save_manifest(&store.manifest)?;
            store.save_objects(&store.objects)?;
            store
        };

        tracing::info!(
            root = %store.root.display(),
            chunks = store.manifest.entries.len(),
            objects = store.objects.len(),
            "opened record store"
        );
        Ok(store)
    }

    /// Get the path to the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the metadata.
    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    /// Re-hash every chunk blob on disk against the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        for coord in self.chunk_coords()? {
            self.read_chunk(coord)?;
        }
        Ok(())
    }

    fn chunk_path(&self, coord: ChunkCoord) -> PathBuf {
        self.root.join("chunks").join(chunk_filename(coord))
    }

    /// Every blob must match its manifest hash; a blob with no entry was
    /// never committed and fails the same way.
    fn verify_chunk_hash(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let actual = sha256_hex(data);
        match self.manifest.entries.get(filename) {
            Some(expected) if *expected == actual => Ok(()),
            expected => Err(StoreError::IntegrityMismatch {
                record: filename.to_string(),
                expected: expected.cloned().unwrap_or_else(|| "no manifest entry".to_string()),
                actual,
            }),
        }
    }

    /// Put the last committed manifest back after a half-applied change.
    fn restore_manifest(&self) {
        if let Err(e) = self.save_manifest(&self.manifest) {
            tracing::error!(error = %e, "failed to restore chunk manifest");
        }
    }

    fn save_meta(&self, meta: &StoreMeta) -> Result<(), StoreError> {
        write_atomic(&self.root.join("world.meta.json"), &serde_json::to_vec_pretty(meta)?)
    }

    fn save_manifest(&self, manifest: &ChunkManifest) -> Result<(), StoreError> {
        write_atomic(
            &self.root.join("integrity").join("chunks.json"),
            &serde_json::to_vec_pretty(manifest)?,
        )
    }

    fn save_objects(&self, objects: &BTreeMap<ObjectId, ObjectRow>) -> Result<(), StoreError> {
        let rows: Vec<&ObjectRow> = objects.values().collect();
        write_atomic(&self.root.join("objects.json"), &serde_json::to_vec_pretty(&rows)?)
    }
}

impl RecordStore for FileStore {
    fn chunk_exists(&self, coord: ChunkCoord) -> Result<bool, StoreError> {
        Ok(self.chunk_path(coord).is_file())
    }

    fn read_chunk(&self, coord: ChunkCoord) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.chunk_path(coord);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.verify_chunk_hash(&chunk_filename(coord), &data)?;
        Ok(Some(data))
    }

    fn write_chunk(&mut self, coord: ChunkCoord, blob: &[u8]) -> Result<(), StoreError> {
        // Stage the blob, commit its hash, then move it into place. Until the
        // rename, the old blob still matches the old manifest on disk.
        let path = self.chunk_path(coord);
        let staged = stage(&path, blob)?;
        let mut manifest = self.manifest.clone();
        manifest.entries.insert(chunk_filename(coord), sha256_hex(blob));
        if let Err(e) = self.save_manifest(&manifest) {
            let _ = std::fs::remove_file(&staged);
            return Err(e);
        }
        if let Err(e) = std::fs::rename(&staged, &path) {
            self.restore_manifest();
            return Err(e.into());
        }
        self.manifest = manifest;
        Ok(())
    }

    fn delete_chunk(&mut self, coord: ChunkCoord) -> Result<bool, StoreError> {
        let path = self.chunk_path(coord);
        if !path.is_file() {
            return Ok(false);
        }
        let mut manifest = self.manifest.clone();
        manifest.entries.remove(&chunk_filename(coord));
        self.save_manifest(&manifest)?;
        if let Err(e) = std::fs::remove_file(&path) {
            self.restore_manifest();
            return Err(e.into());
        }
        self.manifest = manifest;
        Ok(true)
    }

    fn chunk_coords(&self) -> Result<Vec<ChunkCoord>, StoreError> {
        let mut coords = Vec::new();
        for entry in std::fs::read_dir(self.root.join("chunks"))? {
            let name = entry?.file_name();
            if let Some(coord) = name.to_str().and_then(parse_chunk_filename) {
                coords.push(coord);
            }
        }
        coords.sort();
        Ok(coords)
    }

    fn allocate_object_id(&mut self) -> Result<ObjectId, StoreError> {
        let id = ObjectId(self.meta.next_object_id);
        let meta = StoreMeta {
            next_object_id: id.0 + 1,
            ..self.meta.clone()
        };
        self.save_meta(&meta)?;
        self.meta = meta;
        Ok(id)
    }

    fn read_object(&self, id: ObjectId) -> Result<Option<ObjectRow>, StoreError> {
        Ok(self.objects.get(&id).cloned())
    }

    fn write_object(&mut self, row: &ObjectRow) -> Result<(), StoreError> {
        let mut objects = self.objects.clone();
        objects.insert(row.id, row.clone());
        self.save_objects(&objects)?;
        self.objects = objects;
        if row.id.0 >= self.meta.next_object_id {
            let meta = StoreMeta {
                next_object_id: row.id.0 + 1,
                ..self.meta.clone()
            };
            self.save_meta(&meta)?;
            self.meta = meta;
        }
        Ok(())
    }

    fn delete_object(&mut self, id: ObjectId) -> Result<bool, StoreError> {
        if !self.objects.contains_key(&id) {
            return Ok(false);
        }
        let mut objects = self.objects.clone();
        objects.remove(&id);
        self.save_objects(&objects)?;
        self.objects = objects;
        Ok(true)
    }

    fn objects(&self) -> Result<Vec<ObjectRow>, StoreError> {
        Ok(self.objects.values().cloned().collect())
    }
}

fn chunk_filename(coord: ChunkCoord) -> String {
    format!("{}_{}{CHUNK_SUFFIX}", coord.x, coord.y)
}

fn parse_chunk_filename(name: &str) -> Option<ChunkCoord> {
    let stem = name.strip_suffix(CHUNK_SUFFIX)?;
    let (x, y) = stem.split_once('_')?;
    Some(ChunkCoord::new(x.parse().ok()?, y.parse().ok()?))
}

fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf, StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    Ok(tmp)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = stage(path, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64) -> ObjectRow {
        ObjectRow {
            id: ObjectId(id),
            x: 1,
            y: -2,
            chunk_x: 0,
            chunk_y: 0,
            icon: "@".into(),
            width: 2,
            height: 1,
            color: 9,
        }
    }

    #[test]
    fn store_open_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path().join("world_data")).unwrap();
        assert_eq!(store.meta().schema_version, SCHEMA_VERSION);
        assert_eq!(store.meta().next_object_id, 1);
        assert!(store.root().join("chunks").is_dir());
        assert!(store.root().join("integrity").is_dir());
        assert!(store.root().join("objects.json").is_file());
    }

    #[test]
    fn chunk_write_read_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(tmp.path()).unwrap();
        let coord = ChunkCoord::new(-1, 3);

        assert!(!store.chunk_exists(coord).unwrap());
        assert_eq!(store.read_chunk(coord).unwrap(), None);

        store.write_chunk(coord, b"blob").unwrap();
        assert!(store.chunk_exists(coord).unwrap());
        assert_eq!(store.read_chunk(coord).unwrap().as_deref(), Some(&b"blob"[..]));
        assert_eq!(store.chunk_coords().unwrap(), vec![coord]);
        store.verify_integrity().unwrap();

        assert!(store.delete_chunk(coord).unwrap());
        assert!(!store.delete_chunk(coord).unwrap());
        assert!(store.chunk_coords().unwrap().is_empty());
    }

    #[test]
    fn chunk_coords_are_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(tmp.path()).unwrap();
        for coord in [ChunkCoord::new(1, 0), ChunkCoord::new(-2, 5), ChunkCoord::new(1, -1)] {
            store.write_chunk(coord, b"x").unwrap();
        }
        assert_eq!(
            store.chunk_coords().unwrap(),
            vec![ChunkCoord::new(-2, 5), ChunkCoord::new(1, -1), ChunkCoord::new(1, 0)]
        );
    }

    #[test]
    fn tampered_chunk_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let coord = ChunkCoord::new(0, 0);
        {
            let mut store = FileStore::open(tmp.path()).unwrap();
            store.write_chunk(coord, b"original").unwrap();
        }
        std::fs::write(tmp.path().join("chunks").join("0_0.chunk.cbor.zst"), b"tampered").unwrap();

        let store = FileStore::open(tmp.path()).unwrap();
        assert!(matches!(
            store.read_chunk(coord),
            Err(StoreError::IntegrityMismatch { .. })
        ));
        assert!(store.verify_integrity().is_err());
    }

    #[test]
    fn failed_manifest_save_keeps_committed_chunk() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(tmp.path()).unwrap();
        let coord = ChunkCoord::new(2, -3);
        store.write_chunk(coord, b"first").unwrap();

        // a directory where the manifest's temp file goes makes its save fail
        let blocker = tmp.path().join("integrity").join("chunks.json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        assert!(store.write_chunk(coord, b"second").is_err());
        assert_eq!(store.read_chunk(coord).unwrap().as_deref(), Some(&b"first"[..]));
        assert!(store.delete_chunk(coord).is_err());
        assert_eq!(store.read_chunk(coord).unwrap().as_deref(), Some(&b"first"[..]));

        std::fs::remove_dir(&blocker).unwrap();
        let reopened = FileStore::open(tmp.path()).unwrap();
        assert_eq!(reopened.read_chunk(coord).unwrap().as_deref(), Some(&b"first"[..]));
        reopened.verify_integrity().unwrap();
    }

    #[test]
    fn chunk_without_manifest_entry_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("chunks").join("4_4.chunk.cbor.zst"), b"stray").unwrap();

        match store.read_chunk(ChunkCoord::new(4, 4)) {
            Err(StoreError::IntegrityMismatch { record, expected, .. }) => {
                assert_eq!(record, "4_4.chunk.cbor.zst");
                assert_eq!(expected, "no manifest entry");
            }
            other => panic!("expected IntegrityMismatch, got: {other:?}"),
        }
        assert!(store.verify_integrity().is_err());
    }

    #[test]
    fn objects_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::open(tmp.path()).unwrap();
            let id = store.allocate_object_id().unwrap();
            assert_eq!(id, ObjectId(1));
            store.write_object(&row(1)).unwrap();
            store.write_object(&row(2)).unwrap();
            assert!(store.delete_object(ObjectId(2)).unwrap());
        }
        let mut store = FileStore::open(tmp.path()).unwrap();
        assert_eq!(store.objects().unwrap(), vec![row(1)]);
        assert_eq!(store.read_object(ObjectId(1)).unwrap(), Some(row(1)));
        // id 2 was handed out once and is never reused
        assert_eq!(store.allocate_object_id().unwrap(), ObjectId(3));
    }

    #[test]
    fn write_object_updates_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(tmp.path()).unwrap();
        store.write_object(&row(5)).unwrap();
        let mut moved = row(5);
        moved.y = 4;
        store.write_object(&moved).unwrap();
        assert_eq!(store.objects().unwrap(), vec![moved]);
    }

    #[test]
    fn schema_mismatch_fail_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let _store = FileStore::open(&path).unwrap();

        let meta_path = path.join("world.meta.json");
        let mut meta: StoreMeta = serde_json::from_slice(&std::fs::read(&meta_path).unwrap()).unwrap();
        meta.schema_version = 999;
        std::fs::write(&meta_path, serde_json::to_vec(&meta).unwrap()).unwrap();

        match FileStore::open(&path) {
            Err(StoreError::SchemaMismatch {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, 999);
                assert_eq!(expected_version, SCHEMA_VERSION);
            }
            Err(e) => panic!("expected SchemaMismatch, got: {e}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn parse_rejects_foreign_files() {
        assert_eq!(parse_chunk_filename("3_-4.chunk.cbor.zst"), Some(ChunkCoord::new(3, -4)));
        assert_eq!(parse_chunk_filename("3_-4.chunk.cbor.zst.tmp"), None);
        assert_eq!(parse_chunk_filename("notes.txt"), None);
    }
}

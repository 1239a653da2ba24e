use chunkworld_common::{AbsPos, ChunkCoord, ObjectId, RelPos, WorldConfig};
use chunkworld_kernel::{CoordError, CoordinateSystem, Entity, EntitySpec, ValidationError};
use chunkworld_persist::{ObjectRow, RecordStore, SharedStore, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Errors from registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The target lies outside the entity's chunk. Expected during normal
    /// play; callers report it as a boundary condition.
    #[error("object {id} cannot move to ({}, {}): {source}", target.x, target.y)]
    OutOfBounds {
        id: ObjectId,
        target: AbsPos,
        source: CoordError,
    },
    #[error("object {0} not found")]
    NotFound(ObjectId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A screen location the renderer must redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyCell {
    pub chunk: ChunkCoord,
    pub abs: AbsPos,
}

/// Result of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Target equals the current position; nothing written or redrawn.
    Unchanged,
    Moved {
        id: ObjectId,
        chunk: ChunkCoord,
        from: AbsPos,
        to: AbsPos,
    },
}

impl MoveOutcome {
    /// Cells to redraw: the vacated one, then the occupied one.
    pub fn dirty_cells(&self) -> Vec<DirtyCell> {
        match *self {
            Self::Unchanged => Vec::new(),
            Self::Moved { chunk, from, to, .. } => vec![
                DirtyCell { chunk, abs: from },
                DirtyCell { chunk, abs: to },
            ],
        }
    }

    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Owns every loaded entity and writes the objects table.
pub struct EntityRegistry<S> {
    config: Arc<WorldConfig>,
    coords: CoordinateSystem,
    store: SharedStore<S>,
    entities: BTreeMap<ObjectId, Entity>,
}

impl<S: RecordStore> EntityRegistry<S> {
    /// Create an empty registry. Call [`load_all`](Self::load_all) to
    /// hydrate it from the store.
    pub fn new(config: Arc<WorldConfig>, store: SharedStore<S>) -> Self {
        let coords = CoordinateSystem::new(&config);
        Self {
            config,
            coords,
            store,
            entities: BTreeMap::new(),
        }
    }

    pub fn coords(&self) -> &CoordinateSystem {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// All entities, ordered by id.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities occupying `abs` in `chunk`, lowest id first.
    pub fn at(&self, chunk: ChunkCoord, abs: AbsPos) -> Vec<&Entity> {
        self.entities
            .values()
            .filter(|e| e.chunk == chunk && e.abs(&self.coords) == abs)
            .collect()
    }

    /// Validate `spec`, persist a new record and add the entity.
    pub fn spawn(&mut self, spec: EntitySpec) -> Result<Entity, RegistryError> {
        spec.validate(&self.config)?;
        if let Some(id) = spec.id {
            if self.entities.contains_key(&id) {
                return Err(ValidationError::DuplicateId(id).into());
            }
        }

        let mut store = self.store.lock();
        let id = match spec.id {
            // Another registry on the same store may own the row.
            Some(id) if store.read_object(id)?.is_some() => {
                return Err(ValidationError::DuplicateId(id).into());
            }
            Some(id) => id,
            None => store.allocate_object_id()?,
        };
        let entity = Entity::from_spec(id, &spec, &self.config, &self.coords)?;
        store.write_object(&to_row(&entity))?;
        drop(store);

        tracing::debug!(id = %entity.id, icon = %entity.icon, x = entity.pos.x, y = entity.pos.y, "spawned entity");
        self.entities.insert(id, entity.clone());
        Ok(entity)
    }

    /// Move an entity to an Absolute position inside its current chunk.
    pub fn move_absolute(&mut self, id: ObjectId, target: AbsPos) -> Result<MoveOutcome, RegistryError> {
        let entity = self.entities.get(&id).ok_or(RegistryError::NotFound(id))?;
        let new_pos = match self.coords.to_relative(entity.chunk, target) {
            Ok(pos) => pos,
            Err(source) => {
                tracing::warn!(%id, x = target.x, y = target.y, error = %source, "move rejected");
                return Err(RegistryError::OutOfBounds { id, target, source });
            }
        };
        if new_pos == entity.pos {
            return Ok(MoveOutcome::Unchanged);
        }

        let from = entity.abs(&self.coords);
        let updated = entity.moved_to(new_pos, &self.coords);
        // Persist first; the in-memory entity only advances once the record has.
        self.store.lock().write_object(&to_row(&updated))?;

        tracing::debug!(%id, from_x = from.x, from_y = from.y, to_x = target.x, to_y = target.y, "moved entity");
        let chunk = updated.chunk;
        self.entities.insert(id, updated);
        Ok(MoveOutcome::Moved {
            id,
            chunk,
            from,
            to: target,
        })
    }

    /// Move an entity to a world-global Relative position. Fails with
    /// `OutOfBounds` when the position is outside the entity's chunk.
    pub fn move_relative(&mut self, id: ObjectId, target: RelPos) -> Result<MoveOutcome, RegistryError> {
        let entity = self.entities.get(&id).ok_or(RegistryError::NotFound(id))?;
        let abs = self.coords.abs_in(entity.chunk, target);
        self.move_absolute(id, abs)
    }

    /// Step an entity by `(dx, dy)` grid cells.
    pub fn move_offset(&mut self, id: ObjectId, dx: i32, dy: i32) -> Result<MoveOutcome, RegistryError> {
        let entity = self.entities.get(&id).ok_or(RegistryError::NotFound(id))?;
        let abs = self.coords.offset_in(entity.chunk, entity.pos, dx, dy);
        self.move_absolute(id, abs)
    }

    /// Remove an entity and its record.
    pub fn delete(&mut self, id: ObjectId) -> Result<Entity, RegistryError> {
        if !self.entities.contains_key(&id) {
            return Err(RegistryError::NotFound(id));
        }
        self.store.lock().delete_object(id)?;
        tracing::debug!(%id, "deleted entity");
        self.entities.remove(&id).ok_or(RegistryError::NotFound(id))
    }

    /// Read and validate every stored record, replacing the in-memory set.
    /// Nothing is replaced if any record is invalid.
    pub fn load_all(&mut self) -> Result<Vec<Entity>, RegistryError> {
        let rows = self.store.lock().objects()?;
        let mut loaded = BTreeMap::new();
        for row in rows {
            let entity = from_row(&row, &self.config, &self.coords)?;
            loaded.insert(entity.id, entity);
        }
        tracing::info!(count = loaded.len(), "loaded entities");
        self.entities = loaded;
        Ok(self.entities.values().cloned().collect())
    }
}

fn to_row(entity: &Entity) -> ObjectRow {
    ObjectRow {
        id: entity.id,
        x: entity.pos.x,
        y: entity.pos.y,
        chunk_x: entity.chunk.x,
        chunk_y: entity.chunk.y,
        icon: entity.icon.clone(),
        width: entity.width.into(),
        height: entity.height.into(),
        color: entity.color.into(),
    }
}

fn from_row(row: &ObjectRow, config: &WorldConfig, coords: &CoordinateSystem) -> Result<Entity, ValidationError> {
    let spec = EntitySpec {
        id: Some(row.id),
        pos: RelPos::new(row.x, row.y),
        icon: row.icon.clone(),
        width: row.width,
        height: row.height,
        color: row.color,
    };
    let entity = Entity::from_spec(row.id, &spec, config, coords)?;
    if entity.chunk != row.chunk() {
        return Err(ValidationError::ChunkMismatch {
            id: row.id,
            stored: row.chunk(),
            computed: entity.chunk,
        });
    }
    Ok(entity)
}

//! Draws chunks and entities onto a `Surface`.

use crate::surface::{ColorAttr, Surface};
use chunkworld_common::{AbsPos, ChunkCoord, WorldConfig};
use chunkworld_kernel::{ChunkData, CoordError, CoordinateSystem, Entity, TerrainClassifier};
use chunkworld_persist::RecordStore;
use chunkworld_registry::{EntityRegistry, MoveOutcome};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error("chunk grid has no sample at ({}, {})", .0.x, .0.y)]
    MissingSample(AbsPos),
}

/// Paints terrain and entities of one chunk onto a [`Surface`].
#[derive(Debug, Clone)]
pub struct WorldView {
    coords: CoordinateSystem,
    classifier: TerrainClassifier,
}

impl WorldView {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            coords: CoordinateSystem::new(config),
            classifier: TerrainClassifier::new(config),
        }
    }

    /// Surface size, in rows and columns, needed to show a whole chunk.
    pub fn surface_size(&self) -> (usize, usize) {
        let size = self.coords.chunk_size() as usize;
        (
            size * self.coords.cell_height() as usize,
            size * self.coords.cell_width() as usize,
        )
    }

    /// Clear the surface, draw every terrain cell of `data`, then every
    /// entity owned by `coord`, and refresh once.
    pub fn draw_chunk<'a, T: Surface + ?Sized>(
        &self,
        surface: &mut T,
        coord: ChunkCoord,
        data: &ChunkData,
        entities: impl IntoIterator<Item = &'a Entity>,
    ) -> Result<(), RenderError> {
        surface.clear();
        let size = self.coords.chunk_size();
        for x in 0..size {
            for y in 0..size {
                self.draw_marker(surface, data, AbsPos::new(x, y))?;
            }
        }
        let mut drawn = 0usize;
        for entity in entities.into_iter().filter(|e| e.chunk == coord) {
            self.draw_entity(surface, entity)?;
            drawn += 1;
        }
        surface.refresh();
        tracing::debug!(%coord, entities = drawn, "drew chunk");
        Ok(())
    }

    /// Draw whatever occupies `abs`: every occupant in order, so the last one
    /// ends up on top, or the terrain marker when the cell is empty.
    pub fn draw_location<T: Surface + ?Sized>(
        &self,
        surface: &mut T,
        data: &ChunkData,
        occupants: &[&Entity],
        abs: AbsPos,
    ) -> Result<(), RenderError> {
        self.coords.check_abs(abs)?;
        if occupants.is_empty() {
            return self.draw_marker(surface, data, abs);
        }
        for entity in occupants {
            self.draw_entity(surface, entity)?;
        }
        Ok(())
    }

    /// Repaint the cells a move touched inside the `shown` chunk and refresh.
    pub fn redraw<T: Surface + ?Sized, S: RecordStore>(
        &self,
        surface: &mut T,
        shown: ChunkCoord,
        data: &ChunkData,
        registry: &EntityRegistry<S>,
        outcome: &MoveOutcome,
    ) -> Result<(), RenderError> {
        let cells = outcome.dirty_cells();
        if cells.is_empty() {
            return Ok(());
        }
        for cell in cells.iter().filter(|c| c.chunk == shown) {
            let occupants = registry.at(cell.chunk, cell.abs);
            self.draw_location(surface, data, &occupants, cell.abs)?;
        }
        surface.refresh();
        Ok(())
    }

    fn draw_marker<T: Surface + ?Sized>(&self, surface: &mut T, data: &ChunkData, abs: AbsPos) -> Result<(), RenderError> {
        let sample = data.get(abs).ok_or(RenderError::MissingSample(abs))?;
        let class = self.classifier.classify(sample);
        let screen = self.coords.abs2screen(abs)?;
        let width = self.coords.cell_width() as u32;
        surface.write_text(screen.x, screen.y, &class.marker.repeat(width as usize));
        surface.set_attribute(screen.x, screen.y, width, ColorAttr::from_color(class.color));
        Ok(())
    }

    fn draw_entity<T: Surface + ?Sized>(&self, surface: &mut T, entity: &Entity) -> Result<(), RenderError> {
        let screen = self.coords.abs2screen(entity.abs(&self.coords))?;
        surface.write_text(screen.x, screen.y, &entity.icon.repeat(entity.width as usize));
        surface.set_attribute(screen.x, screen.y, entity.width, ColorAttr::from_color(entity.color));
        Ok(())
    }
}

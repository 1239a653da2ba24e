use anyhow::Context;
use chunkworld_common::{ChunkCoord, ObjectId, WorldConfig, palette};
use chunkworld_input::{Action, Direction};
use chunkworld_kernel::EntitySpec;
use chunkworld_persist::{RecordStore, SharedStore};
use chunkworld_registry::{EntityRegistry, RegistryError};
use chunkworld_render::{CellGrid, WorldView};
use chunkworld_stream::ChunkStore;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Populate an empty world with the starting cast.
pub fn seed_defaults<S: RecordStore>(registry: &mut EntityRegistry<S>) -> anyhow::Result<()> {
    if !registry.is_empty() {
        return Ok(());
    }
    for spec in [
        EntitySpec::default(),
        EntitySpec::default().icon("%"),
        EntitySpec::default()
            .icon("&")
            .at(5, 5)
            .color(palette::BRIGHT_CYAN.into()),
    ] {
        registry.spawn(spec)?;
    }
    tracing::info!(count = registry.len(), "seeded default entities");
    Ok(())
}

/// Line-driven play session: one key name per input line.
pub struct Session<S> {
    chunks: ChunkStore<S>,
    registry: EntityRegistry<S>,
    view: WorldView,
    grid: CellGrid,
    selected: usize,
}

impl<S: RecordStore> Session<S> {
    pub fn open(config: Arc<WorldConfig>, store: SharedStore<S>) -> anyhow::Result<Self> {
        let chunks = ChunkStore::new(Arc::clone(&config), Arc::clone(&store));
        let mut registry = EntityRegistry::new(Arc::clone(&config), store);
        registry.load_all().context("loading entities")?;
        seed_defaults(&mut registry)?;

        let view = WorldView::new(&config);
        let (rows, cols) = view.surface_size();
        Ok(Self {
            chunks,
            registry,
            view,
            grid: CellGrid::new(rows, cols),
            selected: 0,
        })
    }

    pub fn registry(&self) -> &EntityRegistry<S> {
        &self.registry
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    fn selected_id(&self) -> anyhow::Result<ObjectId> {
        self.registry
            .entities()
            .nth(self.selected)
            .map(|e| e.id)
            .context("no entity selected")
    }

    fn shown_chunk(&self) -> anyhow::Result<ChunkCoord> {
        let id = self.selected_id()?;
        self.registry
            .get(id)
            .map(|e| e.chunk)
            .context("selected entity vanished")
    }

    /// Draw the selected entity's chunk in full.
    pub fn draw(&mut self) -> anyhow::Result<()> {
        let coord = self.shown_chunk()?;
        let data = self.chunks.load(coord, true)?;
        self.view
            .draw_chunk(&mut self.grid, coord, &data, self.registry.entities())?;
        Ok(())
    }

    /// Apply one action. Returns `false` once the session should end.
    pub fn handle(&mut self, action: Action, out: &mut impl Write) -> anyhow::Result<bool> {
        match action {
            Action::Quit => {
                writeln!(out, "User requested quit")?;
                return Ok(false);
            }
            Action::Move(direction) => self.step(direction, out)?,
            Action::Select(n) => {
                if n <= self.registry.len() {
                    self.selected = n - 1;
                    let id = self.selected_id()?;
                    let icon = self.registry.get(id).map_or("?", |e| e.icon.as_str());
                    writeln!(out, "Object {icon} selected")?;
                    self.draw()?;
                } else {
                    writeln!(out, "Invalid object {n} selected")?;
                }
            }
            Action::Unknown(key) => writeln!(out, "Unknown key pressed: {key}")?,
        }
        Ok(true)
    }

    fn step(&mut self, direction: Direction, out: &mut impl Write) -> anyhow::Result<()> {
        let id = self.selected_id()?;
        let (dx, dy) = direction.offset();
        match self.registry.move_offset(id, dx, dy) {
            Ok(outcome) => {
                let coord = self.shown_chunk()?;
                let data = self.chunks.load(coord, false)?;
                self.view
                    .redraw(&mut self.grid, coord, &data, &self.registry, &outcome)?;
                Ok(())
            }
            Err(RegistryError::OutOfBounds { .. }) => {
                writeln!(out, "Object at maximum {} edge of chunk", direction.edge())?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Draw, then process key lines from `input` until quit or end of input,
    /// printing the grid after every action.
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> anyhow::Result<()> {
        self.draw()?;
        write!(out, "{}", self.grid.to_text())?;
        writeln!(out, "Waiting for user input, Q to quit")?;
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if !self.handle(Action::from_key(&line), out)? {
                break;
            }
            write!(out, "{}", self.grid.to_text())?;
        }
        Ok(())
    }
}

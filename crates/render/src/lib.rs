//! Rendering Adapter: character-cell renderer boundary.
//!
//! # Invariants
//! - The painter never mutates world state; it only reads chunks and
//!   entities and writes to a [`Surface`].
//! - One grid cell covers `cell_height` rows and `cell_width` columns of the
//!   surface.
//!
//! Terminal backends implement [`Surface`]; [`CellGrid`] is the in-memory
//! implementation used by the CLI and tests.

mod surface;
mod view;

pub use surface::{CellGrid, ColorAttr, Surface};
pub use view::{RenderError, WorldView};

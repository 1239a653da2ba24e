use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a persisted object (the row id of the objects table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Coordinate of one chunk in the infinite world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The 3x3 block of coordinates centered on `self`, row by row.
    ///
    /// Neighbors past the edge of the `i32` coordinate range do not exist and
    /// are omitted.
    pub fn neighborhood(self) -> impl Iterator<Item = ChunkCoord> {
        (-1..=1).flat_map(move |dx| {
            (-1..=1).filter_map(move |dy| Some(ChunkCoord::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?)))
        })
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Chunk-local grid position; `(0, 0)` is the chunk's top-left cell.
///
/// `x` selects the row and `y` the column, matching the render surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbsPos {
    pub x: i32,
    pub y: i32,
}

impl AbsPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// World-global grid position; `(0, 0)` is the center of the origin chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelPos {
    pub x: i32,
    pub y: i32,
}

impl RelPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Render-surface character cell; `x` is the row, `y` the column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScreenPos {
    pub x: i32,
    pub y: i32,
}

impl ScreenPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Color ids understood by the render surface. Ids above 7 are the bright
/// variants of `id % 8`.
pub mod palette {
    pub const BRIGHT_GRAY: u32 = 0;
    pub const DARK_WHITE: u32 = 0;
    pub const DARK_RED: u32 = 1;
    pub const DARK_GREEN: u32 = 2;
    pub const DARK_YELLOW: u32 = 3;
    pub const DARK_BLUE: u32 = 4;
    pub const DARK_MAGENTA: u32 = 5;
    pub const DARK_CYAN: u32 = 6;
    pub const BLACK: u32 = 7;
    pub const BRIGHT_WHITE: u32 = 8;
    pub const BRIGHT_RED: u32 = 9;
    pub const BRIGHT_GREEN: u32 = 10;
    pub const BRIGHT_YELLOW: u32 = 11;
    pub const BRIGHT_BLUE: u32 = 12;
    pub const BRIGHT_MAGENTA: u32 = 13;
    pub const BRIGHT_CYAN: u32 = 14;
    pub const DARK_GRAY: u32 = 15;
}

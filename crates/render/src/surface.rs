//! Character-cell drawing surface and color attributes.

/// Display attribute for a color id: palette pair plus bold for the bright
/// half of the palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorAttr {
    pub pair: u8,
    pub bold: bool,
}

impl ColorAttr {
    pub fn from_color(color: u32) -> Self {
        Self {
            pair: (color % 8) as u8,
            bold: color > 7,
        }
    }
}

/// Character-cell output surface.
///
/// Rows and columns are screen coordinates. Implementations clip writes that
/// fall outside their area.
pub trait Surface {
    /// Write `text` starting at `(row, col)`, one character per column.
    fn write_text(&mut self, row: i32, col: i32, text: &str);

    /// Apply `attr` to `width` cells starting at `(row, col)`.
    fn set_attribute(&mut self, row: i32, col: i32, width: u32, attr: ColorAttr);

    fn clear(&mut self);

    /// Make pending writes visible.
    fn refresh(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    attr: ColorAttr,
}

const BLANK: Cell = Cell {
    ch: ' ',
    attr: ColorAttr { pair: 0, bold: false },
};

/// In-memory surface holding a fixed grid of cells.
#[derive(Debug, Clone)]
pub struct CellGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    refreshes: usize,
}

impl CellGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![BLANK; rows * cols],
            refreshes: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of completed refreshes.
    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    pub fn char_at(&self, row: usize, col: usize) -> Option<char> {
        self.index(row as i32, col as i32).map(|i| self.cells[i].ch)
    }

    pub fn attr_at(&self, row: usize, col: usize) -> Option<ColorAttr> {
        self.index(row as i32, col as i32).map(|i| self.cells[i].attr)
    }

    /// Characters of one row, trailing blanks kept.
    pub fn row_text(&self, row: usize) -> String {
        if row >= self.rows {
            return String::new();
        }
        self.cells[row * self.cols..(row + 1) * self.cols]
            .iter()
            .map(|c| c.ch)
            .collect()
    }

    /// Whole grid as text, one line per row.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.rows * (self.cols + 1));
        for row in 0..self.rows {
            out.push_str(&self.row_text(row));
            out.push('\n');
        }
        out
    }

    fn index(&self, row: i32, col: i32) -> Option<usize> {
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }
}

impl Surface for CellGrid {
    fn write_text(&mut self, row: i32, col: i32, text: &str) {
        for (i, ch) in text.chars().enumerate() {
            if let Some(idx) = self.index(row, col + i as i32) {
                self.cells[idx].ch = ch;
            }
        }
    }

    fn set_attribute(&mut self, row: i32, col: i32, width: u32, attr: ColorAttr) {
        for i in 0..width as i32 {
            if let Some(idx) = self.index(row, col + i) {
                self.cells[idx].attr = attr;
            }
        }
    }

    fn clear(&mut self) {
        self.cells.fill(BLANK);
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }
}

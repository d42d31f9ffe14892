use std::fmt;

use serde::{Deserialize, Serialize};

use crate::GridParseError;

use super::piece::{Piece, PieceKind, Position};

/// Maximum number of rows a single lock can fill.
pub const MAX_CLEARED_LINES: usize = 4;

/// State of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::IsVariant)]
pub enum Cell {
    /// No block.
    #[default]
    Empty,
    /// Block left behind by a locked piece of the given kind.
    Block(PieceKind),
}

impl Cell {
    /// Returns the single character used for this cell in textual grids.
    ///
    /// Empty cells are `.`, blocks use [`PieceKind::as_char`].
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Block(kind) => kind.as_char(),
        }
    }

    /// Parses a cell from its textual representation.
    #[must_use]
    pub const fn from_char(ch: char) -> Option<Self> {
        if ch == '.' {
            return Some(Cell::Empty);
        }
        match PieceKind::from_char(ch) {
            Some(kind) => Some(Cell::Block(kind)),
            None => None,
        }
    }
}

/// Fixed-size playing field.
///
/// Cells are stored row-major with row 0 at the bottom. Positions outside the
/// grid are never valid, so walls and floor need no sentinel cells.
///
/// # Textual form
///
/// [`Grid::from_ascii`] and the serde representation list rows top to bottom,
/// one string per row, using `.` for empty cells and the piece letter for
/// blocks:
///
/// ```
/// use tetrevo_engine::{Cell, Grid, PieceKind, Position};
///
/// let grid = Grid::from_ascii(
///     "
///     ....
///     I..O
///     ",
/// )
/// .unwrap();
///
/// assert_eq!(grid.width(), 4);
/// assert_eq!(grid.get(Position::new(0, 0)), Some(Cell::Block(PieceKind::I)));
/// assert_eq!(grid.get(Position::new(0, 1)), Some(Cell::Empty));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        }
    }

    /// Parses a grid from rows listed top to bottom.
    ///
    /// Blank lines and surrounding whitespace are ignored, so indented raw
    /// string literals work.
    pub fn from_ascii(text: &str) -> Result<Self, GridParseError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Self::from_rows(&rows)
    }

    fn from_rows<S>(rows: &[S]) -> Result<Self, GridParseError>
    where
        S: AsRef<str>,
    {
        let Some(first) = rows.first() else {
            return Err(GridParseError::Empty);
        };
        let width = first.as_ref().chars().count();
        if width == 0 {
            return Err(GridParseError::Empty);
        }
        let height = rows.len();
        let mut grid = Self::new(width, height);
        // rows are given top to bottom
        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let actual = row.chars().count();
            if actual != width {
                return Err(GridParseError::RaggedRow {
                    row: row_index,
                    expected: width,
                    actual,
                });
            }
            let y = height - 1 - row_index;
            for (x, ch) in row.chars().enumerate() {
                let cell = Cell::from_char(ch).ok_or(GridParseError::InvalidCell {
                    row: row_index,
                    ch,
                })?;
                grid.cells[y * width + x] = cell;
            }
        }
        Ok(grid)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        let x = usize::try_from(pos.x).ok()?;
        let y = usize::try_from(pos.y).ok()?;
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }

    /// Returns `true` if the position lies inside the grid.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    /// Returns the cell at `pos`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// Returns the cell at column `x`, row `y`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
        self.cells[y * self.width + x]
    }

    /// Returns `true` iff `pos` is in bounds and empty.
    #[must_use]
    pub fn is_valid_position(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(|c| c.is_empty())
    }

    /// Overwrites the cell at `pos`. Out-of-bounds positions are ignored.
    pub fn set(&mut self, pos: Position, cell: Cell) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = cell;
        }
    }

    /// Commits every absolute cell of `piece` as a block of its kind.
    pub fn fill_piece(&mut self, piece: &Piece) {
        for pos in piece.absolute_cells() {
            self.set(pos, Cell::Block(piece.kind()));
        }
    }

    /// Returns the cells of row `y`, left to right.
    #[must_use]
    pub fn row(&self, y: usize) -> &[Cell] {
        &self.cells[y * self.width..][..self.width]
    }

    /// Iterates rows from the bottom (row 0) upward.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = &[Cell]> + '_ {
        self.cells.chunks_exact(self.width)
    }

    #[must_use]
    pub fn is_row_full(&self, y: usize) -> bool {
        self.row(y).iter().all(|c| c.is_block())
    }

    #[must_use]
    pub fn is_row_empty(&self, y: usize) -> bool {
        self.row(y).iter().all(|c| c.is_empty())
    }

    /// Number of occupied cells in the whole grid.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_block()).count()
    }

    /// Clears full rows and returns how many were removed.
    ///
    /// Rows are scanned from the bottom. When a full row is found, everything
    /// above it shifts down by one, the top row becomes empty, and the same
    /// row index is checked again. Scanning stops after
    /// [`MAX_CLEARED_LINES`] clears.
    pub fn clear_lines(&mut self) -> usize {
        let mut cleared = 0;
        let mut y = 0;
        while y < self.height && cleared < MAX_CLEARED_LINES {
            if self.is_row_full(y) {
                self.remove_row(y);
                cleared += 1;
            } else {
                y += 1;
            }
        }
        cleared
    }

    fn remove_row(&mut self, y: usize) {
        let w = self.width;
        self.cells.copy_within((y + 1) * w.., y * w);
        let top = (self.height - 1) * w;
        self.cells[top..].fill(Cell::Empty);
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows().rev() {
            for cell in row {
                write!(f, "{}", cell.as_char())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl From<Grid> for Vec<String> {
    fn from(grid: Grid) -> Self {
        grid.rows()
            .rev()
            .map(|row| row.iter().map(|c| c.as_char()).collect())
            .collect()
    }
}

impl TryFrom<Vec<String>> for Grid {
    type Error = GridParseError;

    fn try_from(rows: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

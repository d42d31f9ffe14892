//! Per-column measurements shared by the heuristics.
//!
//! Heights and holes are computed once per grid snapshot; every heuristic then
//! reads from the same [`BoardAnalysis`].

use tetrevo_engine::Grid;

/// Column-level view of a grid snapshot.
///
/// - **Height**: index of the highest occupied cell plus one (0 for an empty column)
/// - **Hole**: empty cell below the column's highest occupied cell
#[derive(Debug, Clone)]
pub struct BoardAnalysis<'a> {
    grid: &'a Grid,
    column_heights: Vec<usize>,
    column_holes: Vec<usize>,
    lowest_holes: Vec<Option<usize>>,
}

impl<'a> BoardAnalysis<'a> {
    #[must_use]
    pub fn new(grid: &'a Grid) -> Self {
        let width = grid.width();
        let mut column_heights = Vec::with_capacity(width);
        let mut column_holes = Vec::with_capacity(width);
        let mut lowest_holes = Vec::with_capacity(width);
        for x in 0..width {
            let height = (0..grid.height())
                .rev()
                .find(|&y| grid.cell(x, y).is_block())
                .map_or(0, |y| y + 1);
            let mut holes = (0..height).filter(|&y| grid.cell(x, y).is_empty());
            let lowest = holes.next();
            column_heights.push(height);
            column_holes.push(lowest.map_or(0, |_| 1 + holes.count()));
            lowest_holes.push(lowest);
        }
        Self {
            grid,
            column_heights,
            column_holes,
            lowest_holes,
        }
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        self.grid
    }

    #[must_use]
    pub fn column_heights(&self) -> &[usize] {
        &self.column_heights
    }

    /// Holes per column.
    #[must_use]
    pub fn column_holes(&self) -> &[usize] {
        &self.column_holes
    }

    /// Row of the lowest hole in each column, if any.
    #[must_use]
    pub fn lowest_holes(&self) -> &[Option<usize>] {
        &self.lowest_holes
    }

    /// Total number of holes on the board.
    #[must_use]
    pub fn total_holes(&self) -> usize {
        self.column_holes.iter().sum()
    }

    /// Columns whose top is strictly lower than every neighbour's.
    #[must_use]
    pub fn pit_count(&self) -> usize {
        let h = &self.column_heights;
        (0..h.len())
            .filter(|&x| {
                let left = x.checked_sub(1).map(|l| h[l]);
                let right = h.get(x + 1).copied();
                match (left, right) {
                    (Some(l), Some(r)) => h[x] < l && h[x] < r,
                    (Some(n), None) | (None, Some(n)) => h[x] < n,
                    (None, None) => false,
                }
            })
            .count()
    }
}

//! Board heuristics measured on the final grid of a played sequence.
//!
//! Every heuristic is a unit struct implementing [`Heuristic`]. The canonical
//! set and order is [`ALL_HEURISTICS`]; [`HeuristicValues`] and
//! [`HeuristicWeights`] follow the same order, and fitness uses their dot
//! product as a single 9-term weighted sum.
//!
//! | # | Heuristic            | Default weight |
//! |---|----------------------|----------------|
//! | 0 | [`Blocks`]           | -1 |
//! | 1 | [`WeightedBlocks`]   | -1 |
//! | 2 | [`ClearableLines`]   | +1 |
//! | 3 | [`Roughness`]        | -1 |
//! | 4 | [`ColHoles`]         | -1 |
//! | 5 | [`ConnectedHoles`]   | -1 |
//! | 6 | [`BlockAboveHoles`]  | -1 |
//! | 7 | [`PitHolePercent`]   | -1 |
//! | 8 | [`DeepestWell`]      | -1 |

use std::{fmt, iter};

use serde::{Deserialize, Serialize};
use tetrevo_engine::Grid;

use crate::board_analysis::BoardAnalysis;

/// Number of heuristics in the canonical set.
pub const HEURISTIC_COUNT: usize = 9;

/// Canonical heuristic set, in weight order.
pub static ALL_HEURISTICS: [&dyn Heuristic; HEURISTIC_COUNT] = [
    &Blocks,
    &WeightedBlocks,
    &ClearableLines,
    &Roughness,
    &ColHoles,
    &ConnectedHoles,
    &BlockAboveHoles,
    &PitHolePercent,
    &DeepestWell,
];

pub trait Heuristic: fmt::Debug + Send + Sync {
    #[must_use]
    fn id(&self) -> &'static str;
    #[must_use]
    fn name(&self) -> &'static str;
    #[must_use]
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32;
}

#[expect(clippy::cast_precision_loss)]
fn to_f32(value: usize) -> f32 {
    value as f32
}

/// Occupied cells, counted bottom-up.
///
/// # Raw measurement
///
/// Rows are scanned from row 0 upward; the scan stops at the first row
/// without any block. Blocks floating above such a row are not counted.
#[derive(Debug, Clone, Copy)]
pub struct Blocks;

impl Heuristic for Blocks {
    fn id(&self) -> &'static str {
        "blocks"
    }
    fn name(&self) -> &'static str {
        "Blocks"
    }
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32 {
        to_f32(row_block_counts(analysis.grid()).map(|(_, n)| n).sum())
    }
}

/// Occupied cells weighted by their 1-indexed row.
///
/// # Raw measurement
///
/// Same scan as [`Blocks`], but a block in row `y` contributes `y + 1`.
#[derive(Debug, Clone, Copy)]
pub struct WeightedBlocks;

impl Heuristic for WeightedBlocks {
    fn id(&self) -> &'static str {
        "weighted_blocks"
    }
    fn name(&self) -> &'static str {
        "Weighted Blocks"
    }
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32 {
        to_f32(
            row_block_counts(analysis.grid())
                .map(|(y, n)| (y + 1) * n)
                .sum(),
        )
    }
}

/// `(row, block count)` from the bottom up to the first empty row.
fn row_block_counts(grid: &Grid) -> impl Iterator<Item = (usize, usize)> + '_ {
    grid.rows()
        .map(|row| row.iter().filter(|c| c.is_block()).count())
        .enumerate()
        .take_while(|&(_, n)| n > 0)
}

/// Most rows a vertical I piece could clear in one drop.
///
/// # Raw measurement
///
/// For each column whose height `h` satisfies `h + 3 < board height`, count
/// the rows among `h..h + 4` where every other column is occupied. The result
/// is the maximum over columns.
#[derive(Debug, Clone, Copy)]
pub struct ClearableLines;

impl Heuristic for ClearableLines {
    fn id(&self) -> &'static str {
        "clearable_lines"
    }
    fn name(&self) -> &'static str {
        "Clearable Lines"
    }
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32 {
        let grid = analysis.grid();
        let best = analysis
            .column_heights()
            .iter()
            .enumerate()
            .filter(|&(_, &h)| h + 3 < grid.height())
            .map(|(x, &h)| {
                (h..h + 4)
                    .filter(|&y| {
                        grid.row(y)
                            .iter()
                            .enumerate()
                            .all(|(xx, c)| xx == x || c.is_block())
                    })
                    .count()
            })
            .max()
            .unwrap_or(0);
        to_f32(best)
    }
}

/// Surface unevenness.
///
/// # Raw measurement
///
/// `raw = Σ |height[x] - height[x + 1]|` over adjacent column pairs.
#[derive(Debug, Clone, Copy)]
pub struct Roughness;

impl Heuristic for Roughness {
    fn id(&self) -> &'static str {
        "roughness"
    }
    fn name(&self) -> &'static str {
        "Roughness"
    }
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32 {
        let total: usize = analysis
            .column_heights()
            .windows(2)
            .map(|w| w[0].abs_diff(w[1]))
            .sum();
        to_f32(total)
    }
}

/// Columns containing at least one hole.
#[derive(Debug, Clone, Copy)]
pub struct ColHoles;

impl Heuristic for ColHoles {
    fn id(&self) -> &'static str {
        "col_holes"
    }
    fn name(&self) -> &'static str {
        "Column Holes"
    }
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32 {
        to_f32(analysis.column_holes().iter().filter(|&&n| n > 0).count())
    }
}

/// Empty cells below each column's highest block, summed over columns.
#[derive(Debug, Clone, Copy)]
pub struct ConnectedHoles;

impl Heuristic for ConnectedHoles {
    fn id(&self) -> &'static str {
        "connected_holes"
    }
    fn name(&self) -> &'static str {
        "Connected Holes"
    }
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32 {
        to_f32(analysis.total_holes())
    }
}

/// Blocks sitting above a hole in their column.
///
/// # Raw measurement
///
/// Per column, count the blocks above the lowest hole; sum over columns.
#[derive(Debug, Clone, Copy)]
pub struct BlockAboveHoles;

impl Heuristic for BlockAboveHoles {
    fn id(&self) -> &'static str {
        "block_above_holes"
    }
    fn name(&self) -> &'static str {
        "Blocks Above Holes"
    }
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32 {
        let grid = analysis.grid();
        let total: usize = iter::zip(analysis.lowest_holes(), analysis.column_heights())
            .enumerate()
            .filter_map(|(x, (lowest, &height))| {
                let lowest = (*lowest)?;
                Some(
                    (lowest + 1..height)
                        .filter(|&y| grid.cell(x, y).is_block())
                        .count(),
                )
            })
            .sum();
        to_f32(total)
    }
}

/// Share of pits among pits and holes.
///
/// # Raw measurement
///
/// A pit is a column strictly lower than its neighbours (edge columns have a
/// single neighbour). `raw = pits / (holes + pits)`, or 0 when both are 0.
#[derive(Debug, Clone, Copy)]
pub struct PitHolePercent;

impl Heuristic for PitHolePercent {
    fn id(&self) -> &'static str {
        "pit_hole_percent"
    }
    fn name(&self) -> &'static str {
        "Pit/Hole Percent"
    }
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32 {
        let pits = analysis.pit_count();
        let denominator = pits + analysis.total_holes();
        if denominator == 0 {
            0.0
        } else {
            to_f32(pits) / to_f32(denominator)
        }
    }
}

/// Lowest column height on the board.
#[derive(Debug, Clone, Copy)]
pub struct DeepestWell;

impl Heuristic for DeepestWell {
    fn id(&self) -> &'static str {
        "deepest_well"
    }
    fn name(&self) -> &'static str {
        "Deepest Well"
    }
    fn measure(&self, analysis: &BoardAnalysis<'_>) -> f32 {
        to_f32(analysis.column_heights().iter().copied().min().unwrap_or(0))
    }
}

/// Measurements of all canonical heuristics, in [`ALL_HEURISTICS`] order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeuristicValues([f32; HEURISTIC_COUNT]);

impl HeuristicValues {
    #[must_use]
    pub fn measure(grid: &Grid) -> Self {
        let analysis = BoardAnalysis::new(grid);
        Self(ALL_HEURISTICS.map(|h| h.measure(&analysis)))
    }

    #[must_use]
    pub fn as_array(&self) -> &[f32; HEURISTIC_COUNT] {
        &self.0
    }

    /// Pairs each heuristic with its measured value.
    pub fn iter(&self) -> impl Iterator<Item = (&'static dyn Heuristic, f32)> + '_ {
        iter::zip(ALL_HEURISTICS, self.0)
    }

    #[must_use]
    pub fn weighted_sum(&self, weights: &HeuristicWeights) -> f32 {
        iter::zip(self.0, weights.as_array()).map(|(v, w)| v * w).sum()
    }
}

/// Per-heuristic weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub blocks: f32,
    pub weighted_blocks: f32,
    pub clearable_lines: f32,
    pub roughness: f32,
    pub col_holes: f32,
    pub connected_holes: f32,
    pub block_above_holes: f32,
    pub pit_hole_percent: f32,
    pub deepest_well: f32,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            blocks: -1.0,
            weighted_blocks: -1.0,
            clearable_lines: 1.0,
            roughness: -1.0,
            col_holes: -1.0,
            connected_holes: -1.0,
            block_above_holes: -1.0,
            pit_hole_percent: -1.0,
            deepest_well: -1.0,
        }
    }
}

impl HeuristicWeights {
    #[must_use]
    pub fn as_array(&self) -> [f32; HEURISTIC_COUNT] {
        [
            self.blocks,
            self.weighted_blocks,
            self.clearable_lines,
            self.roughness,
            self.col_holes,
            self.connected_holes,
            self.block_above_holes,
            self.pit_hole_percent,
            self.deepest_well,
        ]
    }
}

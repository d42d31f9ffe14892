use serde::{Deserialize, Serialize};

use super::piece::{LastAction, Position};

/// Points awarded per lock, keyed by last action and number of cleared rows.
///
/// Clears beyond a table's length use the table's last entry. The T-spin
/// tables are independent of the plain line-clear table.
///
/// # Example
///
/// ```
/// use tetrevo_engine::{LastAction, ScoreTable};
///
/// let table = ScoreTable::default();
/// assert_eq!(table.points(4, LastAction::Move, false), 8);
/// assert_eq!(table.points(1, LastAction::Move, true), 21);
/// assert_eq!(table.points(2, LastAction::TSpin, false), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    /// Points for 0 to 4 rows cleared by a plain move.
    pub line_clear: [u32; 5],
    /// Points for 0 to 3 rows cleared by a T-spin.
    pub t_spin: [u32; 4],
    /// Points for 0 or 1 rows cleared by a mini T-spin.
    pub mini_t_spin: [u32; 2],
    /// Bonus added when a clear leaves the bottom row empty.
    pub all_clear: u32,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            line_clear: [0, 1, 3, 5, 8],
            t_spin: [0; 4],
            mini_t_spin: [0; 2],
            all_clear: 20,
        }
    }
}

impl ScoreTable {
    #[must_use]
    pub fn points(&self, cleared_lines: usize, last_action: LastAction, all_clear: bool) -> u32 {
        let table: &[u32] = match last_action {
            LastAction::Move => &self.line_clear,
            LastAction::TSpin => &self.t_spin,
            LastAction::MiniTSpin => &self.mini_t_spin,
        };
        let base = table
            .get(cleared_lines)
            .or(table.last())
            .copied()
            .unwrap_or_default();
        if all_clear {
            base + self.all_clear
        } else {
            base
        }
    }
}

/// Immutable rule constants shared by a simulator and the heuristics run on its grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    pub width: usize,
    pub height: usize,
    pub scoring: ScoreTable,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            width: 10,
            height: 20,
            scoring: ScoreTable::default(),
        }
    }
}

impl RuleSettings {
    /// Anchor position of freshly spawned pieces.
    #[must_use]
    pub fn spawn_anchor(&self) -> Position {
        let x = (self.width / 2).saturating_sub(1);
        let y = self.height.saturating_sub(4);
        Position::new(
            i32::try_from(x).unwrap_or(i32::MAX),
            i32::try_from(y).unwrap_or(i32::MAX),
        )
    }
}

//! Deterministic rule simulator for the falling-block puzzle searched by `tetrevo`.
//!
//! The engine reproduces exactly the rules needed to score a move sequence:
//!
//! - [`Grid`] - fixed-size board of [`Cell`]s with row 0 at the bottom
//! - [`Piece`] - a falling piece with kind, orientation, anchor, and relative cells
//! - Rotation with per-kind offset (wall kick) tables and T-spin classification
//! - [`PieceBag`] - seeded 7-bag randomizer whose clones are deterministic snapshots
//! - [`GameField`] - owns grid, falling piece, swap slot, bag, and score
//! - [`RenderSink`] - outbound hook receiving owned [`RenderFrame`] snapshots
//!
//! All rule constants live in an immutable [`RuleSettings`] value handed to each
//! [`GameField`]; there is no process-wide state.
//!
//! # Coordinate System
//!
//! - `x` grows rightward from column 0
//! - `y` grows upward from row 0 (the bottom row)
//! - Pieces spawn with their anchor at `(max(0, width / 2 - 1), height - 4)`
//!
//! # Example
//!
//! ```
//! use tetrevo_engine::{BagSeed, Direction, GameField, PieceBag, RuleSettings};
//!
//! let bag = PieceBag::with_sets(BagSeed::new(42), 3);
//! let mut field = GameField::new(RuleSettings::default(), bag);
//!
//! field.move_piece(Direction::Left);
//! let outcome = field.lock_piece();
//! assert_eq!(outcome.cleared_lines, 0);
//! ```

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

/// Error returned when a textual grid cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum GridParseError {
    #[display("grid must contain at least one row")]
    Empty,
    #[display("row {row} has width {actual}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[display("invalid cell character {ch:?} in row {row}")]
    InvalidCell { row: usize, ch: char },
}

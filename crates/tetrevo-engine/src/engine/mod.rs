//! Game state and its collaborators.
//!
//! - [`GameField`] - simulator owning grid, falling piece, swap slot, bag, and score
//! - [`LockOutcome`] - what a single lock cleared and scored
//! - [`PieceBag`] - 7-bag piece supply with a seeded PRNG
//! - [`BagSeed`] - serializable seed for deterministic bags
//! - [`RenderSink`] / [`RenderFrame`] - outbound snapshots for visualization
//!
//! # Example
//!
//! ```
//! use tetrevo_engine::{BagSeed, GameField, PieceBag, RotationKind, RuleSettings};
//!
//! let bag = PieceBag::with_sets(BagSeed::new(1), 3);
//! let mut field = GameField::new(RuleSettings::default(), bag.clone());
//!
//! field.rotate_piece(RotationKind::Clockwise);
//! field.swap_piece();
//! field.lock_piece();
//!
//! // replay from the same snapshot
//! field.reset(bag, None);
//! assert_eq!(field.score(), 0);
//! ```

pub use self::{game_field::*, piece_bag::*, render::*};

mod game_field;
mod piece_bag;
mod render;

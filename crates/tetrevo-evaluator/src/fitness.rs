//! Genotype playback and fitness.
//!
//! [`FitnessEvaluator::evaluate`] resets a [`GameField`] to the shared
//! [`EvaluationContext`], plays every row of a genotype, and reduces the result
//! to one scalar:
//!
//! ```text
//! fitness = penalty · w_penalty + game_score · w_score + Σ(h_i · w_i) · w_heuristic
//! ```
//!
//! # Playback
//!
//! For each row, the columns run in order and the piece is then locked:
//!
//! - **Swap**: `1` swaps with the slot; never penalized
//! - **Rotate / `SecondaryRotate`**: `-1` if the rotation fails
//! - **Move / `SecondaryMove`**: `|v|` steps right (`v >= 0`) or left, stopping at
//!   the first blocked step; `-1` per step not taken
//! - Double variants hard-drop right after the primary Move, so the secondary
//!   actions act on the landed piece
//!
//! Heuristics are measured once, on the grid left after the last lock.

use serde::{Deserialize, Serialize};
use tetrevo_engine::{
    BagSeed, Direction, GameField, Grid, NullRenderSink, PieceBag, RenderSink, RotationKind,
    RuleSettings,
};

use crate::{
    genotype::{ColumnRole, Genotype},
    heuristic::{HeuristicValues, HeuristicWeights},
};

/// Aggregate weights of the fitness terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub penalty: f32,
    pub score: f32,
    pub heuristic: f32,
    pub heuristics: HeuristicWeights,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            penalty: 1.0,
            score: 1.0,
            heuristic: 1.0,
            heuristics: HeuristicWeights::default(),
        }
    }
}

impl FitnessWeights {
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn combine(&self, penalty: i32, game_score: u32, heuristics: &HeuristicValues) -> f32 {
        penalty as f32 * self.penalty
            + game_score as f32 * self.score
            + heuristics.weighted_sum(&self.heuristics) * self.heuristic
    }
}

/// Read-only inputs shared by every evaluation of a generation: the bag
/// snapshot and the optional starting grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ContextRepr", into = "ContextRepr")]
pub struct EvaluationContext {
    bag_seed: BagSeed,
    bag_sets: usize,
    bag: PieceBag,
    start_grid: Option<Grid>,
}

#[derive(Serialize, Deserialize)]
struct ContextRepr {
    bag_seed: BagSeed,
    bag_sets: usize,
    start_grid: Option<Grid>,
}

impl From<ContextRepr> for EvaluationContext {
    fn from(repr: ContextRepr) -> Self {
        Self::new(repr.bag_seed, repr.bag_sets, repr.start_grid)
    }
}

impl From<EvaluationContext> for ContextRepr {
    fn from(context: EvaluationContext) -> Self {
        Self {
            bag_seed: context.bag_seed,
            bag_sets: context.bag_sets,
            start_grid: context.start_grid,
        }
    }
}

impl EvaluationContext {
    /// Snapshot of a bag pre-filled with `bag_sets` shuffled sets.
    #[must_use]
    pub fn new(bag_seed: BagSeed, bag_sets: usize, start_grid: Option<Grid>) -> Self {
        Self {
            bag_seed,
            bag_sets,
            bag: PieceBag::with_sets(bag_seed, bag_sets),
            start_grid,
        }
    }

    /// Snapshot sized for a sequence of `piece_count` locks.
    #[must_use]
    pub fn for_piece_count(bag_seed: BagSeed, piece_count: usize, start_grid: Option<Grid>) -> Self {
        Self::new(bag_seed, PieceBag::sets_for(piece_count), start_grid)
    }

    #[must_use]
    pub fn bag_seed(&self) -> BagSeed {
        self.bag_seed
    }

    #[must_use]
    pub fn bag(&self) -> &PieceBag {
        &self.bag
    }

    #[must_use]
    pub fn start_grid(&self) -> Option<&Grid> {
        self.start_grid.as_ref()
    }
}

/// Outcome of playing one genotype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Sum of the per-action penalties (zero or negative).
    pub penalty: i32,
    pub game_score: u32,
    /// Heuristics of the final grid.
    pub heuristics: HeuristicValues,
    pub fitness: f32,
}

/// Plays genotypes against the rule simulator and scores them.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    settings: RuleSettings,
    weights: FitnessWeights,
}

impl FitnessEvaluator {
    #[must_use]
    pub fn new(settings: RuleSettings, weights: FitnessWeights) -> Self {
        Self { settings, weights }
    }

    #[must_use]
    pub fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    #[must_use]
    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    /// Creates a simulator for this evaluator's rules. It is reset before every
    /// evaluation, so one field can serve any number of genotypes.
    #[must_use]
    pub fn new_field(&self, context: &EvaluationContext) -> GameField {
        GameField::new(self.settings.clone(), context.bag.clone())
    }

    /// Plays `genotype` on `field` from the context's snapshot.
    pub fn evaluate(
        &self,
        genotype: &Genotype,
        context: &EvaluationContext,
        field: &mut GameField,
    ) -> Evaluation {
        self.play(genotype, context, field, &mut NullRenderSink)
    }

    /// Plays `genotype` on a fresh field, handing `sink` a frame after each
    /// lock. Returns the evaluation and the final grid.
    pub fn replay(
        &self,
        genotype: &Genotype,
        context: &EvaluationContext,
        sink: &mut dyn RenderSink,
    ) -> (Evaluation, Grid) {
        let mut field = self.new_field(context);
        let evaluation = self.play(genotype, context, &mut field, sink);
        (evaluation, field.grid().clone())
    }

    /// Grid left after playing `genotype` from the context's snapshot.
    #[must_use]
    pub fn played_grid(&self, genotype: &Genotype, context: &EvaluationContext) -> Grid {
        self.replay(genotype, context, &mut NullRenderSink).1
    }

    fn play(
        &self,
        genotype: &Genotype,
        context: &EvaluationContext,
        field: &mut GameField,
        sink: &mut dyn RenderSink,
    ) -> Evaluation {
        field.reset(context.bag.clone(), context.start_grid.as_ref());

        let variant = genotype.variant();
        let mut penalty = 0;
        for row in genotype.rows() {
            for (&value, &role) in row.iter().zip(variant.columns()) {
                penalty += play_action(field, role, value);
                if role == ColumnRole::Move && variant.is_double() {
                    field.hard_drop();
                }
            }
            field.lock_piece();
            sink.render(&field.render_frame());
        }

        let game_score = field.score();
        let heuristics = HeuristicValues::measure(field.grid());
        Evaluation {
            penalty,
            game_score,
            heuristics,
            fitness: self.weights.combine(penalty, game_score, &heuristics),
        }
    }
}

/// Applies one genotype cell and returns its penalty.
fn play_action(field: &mut GameField, role: ColumnRole, value: i8) -> i32 {
    match role {
        ColumnRole::Swap => {
            if value == 1 {
                field.swap_piece();
            }
            0
        }
        ColumnRole::Rotate | ColumnRole::SecondaryRotate => match RotationKind::from_value(value) {
            Some(kind) if field.rotate_piece(kind) => 0,
            _ => -1,
        },
        ColumnRole::Move | ColumnRole::SecondaryMove => {
            let direction = if value >= 0 {
                Direction::Right
            } else {
                Direction::Left
            };
            let mut remaining = i32::from(value.unsigned_abs());
            while remaining > 0 && field.move_piece(direction) {
                remaining -= 1;
            }
            -remaining
        }
    }
}

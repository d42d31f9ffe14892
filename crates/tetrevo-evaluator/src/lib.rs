//! Genotype encoding and fitness evaluation for move-sequence search.
//!
//! This crate sits between the rule simulator (`tetrevo-engine`) and the search
//! strategies (`tetrevo-training`):
//!
//! ```text
//! Search (GA population / SA walk)
//!     ↓ proposes
//! Genotype (fixed-shape move matrix)
//!     ↓ played by
//! FitnessEvaluator (GameField reset from a shared EvaluationContext)
//!     ↓ measured by
//! Heuristics (pure functions of the final grid)
//! ```
//!
//! # Modules
//!
//! - [`genotype`] - move matrices, encoding variants, crossover, mutation, and
//!   neighbor enumeration
//! - [`fitness`] - playback of a genotype and the weighted fitness formula
//! - [`heuristic`] - the 9 board heuristics and their weights
//! - [`board_analysis`] - per-column heights and holes shared by the heuristics
//!
//! # Determinism
//!
//! Evaluation draws no randomness of its own. Given the same genotype and
//! [`fitness::EvaluationContext`], every call returns the same
//! [`fitness::Evaluation`], whichever [`tetrevo_engine::GameField`] it runs on.
//! This is what lets a generation be evaluated by independent workers.
//!
//! # Example
//!
//! ```
//! use tetrevo_engine::{BagSeed, RuleSettings};
//! use tetrevo_evaluator::{
//!     fitness::{EvaluationContext, FitnessEvaluator, FitnessWeights},
//!     genotype::{EncodingVariant, Genotype},
//! };
//!
//! let evaluator = FitnessEvaluator::new(RuleSettings::default(), FitnessWeights::default());
//! let context = EvaluationContext::for_piece_count(BagSeed::new(42), 2, None);
//! let genotype = Genotype::from_rows(EncodingVariant::Simple, &[[0_i8, 0], [0, 0]]).unwrap();
//!
//! let mut field = evaluator.new_field(&context);
//! let evaluation = evaluator.evaluate(&genotype, &context, &mut field);
//! assert_eq!(evaluation.penalty, 0);
//! assert_eq!(evaluation.game_score, 0);
//! ```

pub mod board_analysis;
pub mod fitness;
pub mod genotype;
pub mod heuristic;

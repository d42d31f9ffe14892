//! Search strategies over move-sequence genotypes.
//!
//! Two optimizers share one fitness evaluator (`tetrevo-evaluator`):
//!
//! - [`genetic::GeneticSearch`] - a population of genotypes evolved with
//!   softmax-roulette selection, crossover, and mutation. The better half of
//!   every generation survives unchanged.
//! - [`annealing::SimulatedAnnealing`] - a single-threaded local search that walks
//!   single-cell mutations of a seed genotype, guarded by a [`tabu::TabuList`]
//!   and accepted with the Metropolis rule.
//!
//! # Driver Loop
//!
//! Neither optimizer owns a loop. The caller calls `step()` repeatedly; every
//! call completes synchronously and leaves the optimizer at a well-defined phase
//! boundary:
//!
//! ```text
//! loop {
//!     ga.step()?                      // evaluate, sort, reproduce
//!     every N generations:
//!         sa = SimulatedAnnealing::new(ga.best())
//!         while sa.step().is_some() {}
//!         ga.replace_worst(sa.best())  // only if better
//! }
//! ```
//!
//! # Parallel Evaluation
//!
//! Genotypes of one generation are evaluated independently against a shared,
//! read-only [`EvaluationContext`](tetrevo_evaluator::fitness::EvaluationContext).
//! [`worker_pool::WorkerPool`] splits the population into contiguous batches,
//! each with its own simulator, and joins them before sorting.

use tetrevo_evaluator::fitness::{Evaluation, FitnessWeights};
use tracing::info;

pub mod annealing;
pub mod genetic;
pub mod tabu;
pub mod worker_pool;

/// Error surfaced by a generation step.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum EvaluationError {
    /// A worker panicked while evaluating genotypes `start..end`; their scores
    /// are missing.
    #[display("evaluation worker for genotypes {start}..{end} panicked")]
    WorkerPanicked { start: usize, end: usize },
}

/// Logs every term of `evaluation` with its weight.
pub fn log_breakdown(evaluation: &Evaluation, weights: &FitnessWeights) {
    info!(
        "penalty: {} * {} = {}",
        evaluation.penalty,
        weights.penalty,
        f64::from(evaluation.penalty) * f64::from(weights.penalty)
    );
    info!(
        "Score: {} * {} = {}",
        evaluation.game_score,
        weights.score,
        f64::from(evaluation.game_score) * f64::from(weights.score)
    );
    let heuristic_weights = weights.heuristics.as_array();
    for ((heuristic, value), weight) in evaluation.heuristics.iter().zip(heuristic_weights) {
        info!("{}: {value} * {weight} = {}", heuristic.name(), value * weight);
    }
    let heuristic_sum = evaluation.heuristics.weighted_sum(&weights.heuristics);
    info!(
        "Heuristics: {heuristic_sum} * {} = {}",
        weights.heuristic,
        heuristic_sum * weights.heuristic
    );
    info!("Total: {}", evaluation.fitness);
}

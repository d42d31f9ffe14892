//! Tabu-guarded simulated annealing around a seed genotype.
//!
//! The walk visits single-cell neighbors of the current genotype (see
//! [`Genotype::neighbor`]) in index order from a cursor. Recently accepted
//! genotypes are kept in a [`TabuList`] and skipped. A neighbor is accepted
//! with the Metropolis probability `min(1, exp(Δ / T))`; a neighbor with the
//! same score is never accepted.
//!
//! The temperature cools by `1 - δ` per step while the walk keeps finding
//! accepted moves, and heats by `1 + δ` once it has gone `max_patience` steps
//! without one. It never drops below [`MIN_TEMPERATURE`].

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tetrevo_engine::GameField;
use tetrevo_evaluator::{
    fitness::{EvaluationContext, FitnessEvaluator},
    genotype::Genotype,
};
use tracing::debug;

use crate::tabu::TabuList;

pub const MIN_TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingParams {
    pub initial_temperature: f32,
    /// Relative temperature change `δ` per step, in `(0, 1)`.
    pub temperature_factor: f32,
    pub max_generations: usize,
    /// Rejections in a row before the temperature starts rising. `None`
    /// uses the seed's neighbor count.
    pub max_patience: Option<usize>,
    /// Tabu capacity as a multiple of the neighbor count.
    pub tabu_multiplier: usize,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            initial_temperature: 100.0,
            temperature_factor: 0.0005,
            max_generations: 10_000,
            max_patience: None,
            tabu_multiplier: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seeded,
    Stepping,
    Finished,
}

/// What one [`SimulatedAnnealing::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealingStep {
    pub generation: usize,
    pub accepted: bool,
    pub neighbor_score: f32,
    /// Neighbor score minus the current score before the step.
    pub delta: f32,
    pub probability: f32,
}

/// Metropolis acceptance probability of a move that changes the score by
/// `delta` at `temperature`.
#[must_use]
pub fn acceptance_probability(delta: f32, temperature: f32) -> f32 {
    (delta / temperature).exp().min(1.0)
}

#[derive(Debug)]
pub struct SimulatedAnnealing {
    params: AnnealingParams,
    evaluator: FitnessEvaluator,
    context: EvaluationContext,
    field: GameField,
    rng: Pcg32,
    phase: Phase,
    current: Genotype,
    current_score: f32,
    best: Genotype,
    best_score: f32,
    temperature: f32,
    patience: usize,
    max_patience: usize,
    tabu: TabuList<Genotype>,
    cursor: usize,
    generation: usize,
}

impl SimulatedAnnealing {
    /// Scores `seed` and prepares a walk from it.
    ///
    /// The seed itself starts out tabu, and the cursor starts at a random
    /// neighbor.
    #[must_use]
    pub fn new(
        params: AnnealingParams,
        evaluator: FitnessEvaluator,
        context: EvaluationContext,
        seed: Genotype,
        rng_seed: u64,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(rng_seed);
        let mut field = evaluator.new_field(&context);
        let score = evaluator.evaluate(&seed, &context, &mut field).fitness;

        let neighbors = seed.neighbor_count();
        let max_patience = params.max_patience.unwrap_or(neighbors);
        let mut tabu = TabuList::new(params.tabu_multiplier * neighbors);
        tabu.insert(seed.clone());
        let cursor = if neighbors == 0 {
            0
        } else {
            rng.random_range(0..neighbors)
        };
        let temperature = params.initial_temperature;

        Self {
            params,
            evaluator,
            context,
            field,
            rng,
            phase: Phase::Seeded,
            best: seed.clone(),
            current: seed,
            current_score: score,
            best_score: score,
            temperature,
            patience: 0,
            max_patience,
            tabu,
            cursor,
            generation: 0,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    #[must_use]
    pub fn best(&self) -> &Genotype {
        &self.best
    }

    #[must_use]
    pub fn best_score(&self) -> f32 {
        self.best_score
    }

    #[must_use]
    pub fn current(&self) -> &Genotype {
        &self.current
    }

    #[must_use]
    pub fn current_score(&self) -> f32 {
        self.current_score
    }

    #[must_use]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// Proposes one neighbor and decides whether to move to it.
    ///
    /// Returns `None` once `max_generations` steps have run.
    pub fn step(&mut self) -> Option<AnnealingStep> {
        let count = self.current.neighbor_count();
        if self.generation >= self.params.max_generations || count == 0 {
            self.phase = Phase::Finished;
            return None;
        }
        self.phase = Phase::Stepping;

        let neighbor = self.next_neighbor();
        let neighbor_score = self
            .evaluator
            .evaluate(&neighbor, &self.context, &mut self.field)
            .fitness;
        let delta = neighbor_score - self.current_score;
        let probability = acceptance_probability(delta, self.temperature);
        let accepted = self.rng.random::<f32>() < probability && delta.abs() > 0.0;

        let generation = self.generation;
        if accepted {
            debug!(
                "Gen: {generation} - Updated {} -> {neighbor_score} (T = {})",
                self.current_score, self.temperature
            );
            self.tabu.insert(neighbor.clone());
            self.current = neighbor;
            self.current_score = neighbor_score;
            self.patience = 0;
            self.cursor = self.rng.random_range(0..count);
            if neighbor_score > self.best_score {
                self.best = self.current.clone();
                self.best_score = neighbor_score;
            }
        } else {
            debug!(
                "Gen: {generation} - Rejected {neighbor_score} (p = {probability}, T = {})",
                self.temperature
            );
            self.cursor = (self.cursor + 1) % count;
            self.patience += 1;
        }

        let factor = if self.patience < self.max_patience {
            1.0 - self.params.temperature_factor
        } else {
            1.0 + self.params.temperature_factor
        };
        self.temperature = (self.temperature * factor).max(MIN_TEMPERATURE);

        self.generation += 1;
        if self.generation >= self.params.max_generations {
            self.phase = Phase::Finished;
        }

        Some(AnnealingStep {
            generation,
            accepted,
            neighbor_score,
            delta,
            probability,
        })
    }

    /// First non-tabu neighbor at or after the cursor, which is moved onto it.
    ///
    /// After one full wrap with every neighbor tabu, the neighbor at the
    /// starting cursor is returned.
    fn next_neighbor(&mut self) -> Genotype {
        let count = self.current.neighbor_count();
        let start = self.cursor;
        for offset in 0..count {
            let index = (start + offset) % count;
            let neighbor = self.current.neighbor(index);
            if !self.tabu.contains(&neighbor) {
                self.cursor = index;
                return neighbor;
            }
        }
        debug!("all {count} neighbors are tabu, taking neighbor {start}");
        self.current.neighbor(start)
    }
}

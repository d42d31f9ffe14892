//! Population-based search over move-sequence genotypes.
//!
//! A [`GeneticSearch`] evolves a fixed-size population of [`Genotype`]s that
//! all share one [`EvaluationContext`] (bag snapshot and start grid) for the
//! length of a round.
//!
//! # Generation Cycle
//!
//! 1. **Evaluate** - the second half of the population (fresh children) is
//!    scored by the [`WorkerPool`]. The first half already carries scores from
//!    the previous generation.
//! 2. **Sort** - genotypes are ordered by fitness, best first.
//! 3. **Early stopping** - patience and the generation cap decide whether the
//!    round ends.
//! 4. **Reproduce** - the best half survives unchanged; the rest is refilled
//!    with children of softmax-roulette parent pairs drawn from the whole
//!    sorted population.
//!
//! # Selection Temperature
//!
//! Parent probabilities are `softmax(score / T)`. The temperature anneals with
//! the generation number, `T = max(0.1, T0 / ln(generation + 2))`, so early
//! generations pick parents almost uniformly and later ones favor the best.
//!
//! # Chained Rounds
//!
//! When a round ends, the grid left by its best genotype becomes the start grid
//! of the next round, which restarts from a random population and a fresh bag
//! snapshot. The finished round is reported as a [`Solution`] and the search
//! goes back to [`Phase::Idle`]; the next population is only built by the
//! following [`GeneticSearch::step`], so a caller that stops after its last
//! round never pays for it.

use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tetrevo_engine::{Grid, PieceBag};
use tetrevo_evaluator::{
    fitness::{Evaluation, EvaluationContext, FitnessEvaluator},
    genotype::{CrossoverMode, EncodingVariant, Genotype, MutationMode},
};
use tracing::info;

use crate::{EvaluationError, worker_pool::WorkerPool};

/// Lowest selection temperature.
pub const MIN_TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticParams {
    /// Number of genotypes; even and at least 2.
    pub population_size: usize,
    /// Rows per genotype, one per piece played.
    pub piece_count: usize,
    pub variant: EncodingVariant,
    /// Per-cell (or per-row) mutation probability in `[0, 1]`.
    pub mutation_chance: f64,
    pub crossover: CrossoverMode,
    pub mutation: MutationMode,
    /// `T0` of the selection temperature schedule.
    pub initial_temperature: f32,
    /// Generations per round.
    pub max_generations: usize,
    /// Ends the round after this many generations without a new best. `None`
    /// disables the check.
    pub max_patience: Option<usize>,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 1000,
            piece_count: 10,
            variant: EncodingVariant::default(),
            mutation_chance: 0.15,
            crossover: CrossoverMode::default(),
            mutation: MutationMode::default(),
            initial_temperature: 100.0,
            max_generations: 200,
            max_patience: None,
        }
    }
}

/// Where the search stands between two [`GeneticSearch::step`] calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No population yet.
    Idle,
    EvaluatingFirstHalf,
    EvaluatingSecondHalf,
    Sorting,
    Reproducing,
}

/// Best genotype of a finished round, with the context it was scored in.
#[derive(Debug, Clone)]
pub struct Solution {
    pub genotype: Genotype,
    pub score: f32,
    pub context: EvaluationContext,
}

#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub round: usize,
    pub generation: usize,
    pub best_score: f32,
    pub mean_score: f32,
    /// Set when this generation ended its round.
    pub finished_round: Option<Solution>,
}

#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// A new population was created and its first half evaluated.
    Initialized { round: usize },
    Generation(GenerationReport),
}

#[derive(Debug)]
pub struct GeneticSearch {
    params: GeneticParams,
    evaluator: FitnessEvaluator,
    pool: WorkerPool,
    rng: Pcg32,
    phase: Phase,
    genotypes: Vec<Genotype>,
    scores: Vec<f32>,
    /// Leading genotypes whose score is current.
    evaluated: usize,
    context: Option<EvaluationContext>,
    start_grid: Option<Grid>,
    round: usize,
    generation: usize,
    temperature: f32,
    round_best: f32,
    patience: usize,
}

impl GeneticSearch {
    /// Creates an idle search; the population is built by the first
    /// [`step`](Self::step).
    ///
    /// # Panics
    ///
    /// Panics if `params.population_size` is odd or below 2.
    #[must_use]
    pub fn new(
        params: GeneticParams,
        evaluator: FitnessEvaluator,
        pool: WorkerPool,
        seed: u64,
        start_grid: Option<Grid>,
    ) -> Self {
        assert!(
            params.population_size >= 2 && params.population_size % 2 == 0,
            "population size must be even and at least 2"
        );
        let temperature = params.initial_temperature;
        Self {
            params,
            evaluator,
            pool,
            rng: Pcg32::seed_from_u64(seed),
            phase: Phase::Idle,
            genotypes: vec![],
            scores: vec![],
            evaluated: 0,
            context: None,
            start_grid,
            round: 0,
            generation: 0,
            temperature,
            round_best: f32::NEG_INFINITY,
            patience: 0,
        }
    }

    #[must_use]
    pub fn params(&self) -> &GeneticParams {
        &self.params
    }

    #[must_use]
    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn round(&self) -> usize {
        self.round
    }

    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    #[must_use]
    pub fn genotypes(&self) -> &[Genotype] {
        &self.genotypes
    }

    #[must_use]
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Context of the current round, once initialized.
    #[must_use]
    pub fn context(&self) -> Option<&EvaluationContext> {
        self.context.as_ref()
    }

    /// Start grid of the current round.
    #[must_use]
    pub fn start_grid(&self) -> Option<&Grid> {
        self.start_grid.as_ref()
    }

    /// Best genotype among those with a current score.
    #[must_use]
    pub fn best(&self) -> Option<(&Genotype, f32)> {
        self.scores[..self.evaluated]
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, &score)| (&self.genotypes[i], score))
    }

    /// Scores `genotype` in the current round's context.
    ///
    /// Returns `None` before the first step.
    #[must_use]
    pub fn evaluate_single(&self, genotype: &Genotype) -> Option<Evaluation> {
        let context = self.context.as_ref()?;
        let mut field = self.evaluator.new_field(context);
        Some(self.evaluator.evaluate(genotype, context, &mut field))
    }

    /// Replaces the worst scored genotype with `genotype` if `score` is
    /// higher. `score` must come from [`evaluate_single`](Self::evaluate_single)
    /// of the same round.
    pub fn replace_worst(&mut self, genotype: Genotype, score: f32) -> bool {
        let Some((worst, &worst_score)) = self.scores[..self.evaluated]
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            return false;
        };
        if score <= worst_score {
            return false;
        }
        self.genotypes[worst] = genotype;
        self.scores[worst] = score;
        if score > self.round_best {
            self.round_best = score;
            self.patience = 0;
        }
        true
    }

    /// Advances the search by one phase boundary.
    ///
    /// The first call (and the first call after a round ends) builds and
    /// half-evaluates a population. Every other call runs one generation; the
    /// generation that ends a round leaves the search idle.
    pub fn step(&mut self) -> Result<StepOutcome, EvaluationError> {
        if self.phase == Phase::Idle {
            self.initialize()?;
            return Ok(StepOutcome::Initialized { round: self.round });
        }

        self.evaluate_second_half()?;
        self.sort();

        let best = self.scores[0];
        #[expect(clippy::cast_precision_loss)]
        let mean_score = self.scores.iter().sum::<f32>() / self.scores.len() as f32;
        info!("Generation: {}. Score: {best}", self.generation);

        if best > self.round_best {
            self.round_best = best;
            self.patience = 0;
        } else {
            self.patience += 1;
        }

        let out_of_patience = self
            .params
            .max_patience
            .is_some_and(|max| self.patience >= max);
        let out_of_generations = self.generation + 1 >= self.params.max_generations;

        let mut report = GenerationReport {
            round: self.round,
            generation: self.generation,
            best_score: best,
            mean_score,
            finished_round: None,
        };

        if out_of_patience || out_of_generations {
            if let Some(context) = self.context.take() {
                report.finished_round = Some(self.finish_round(context));
            }
            self.evaluated = 0;
            self.phase = Phase::Idle;
        } else {
            self.reproduce();
        }
        Ok(StepOutcome::Generation(report))
    }

    fn initialize(&mut self) -> Result<(), EvaluationError> {
        let n = self.params.population_size;
        self.genotypes = (0..n)
            .map(|_| Genotype::random(self.params.variant, self.params.piece_count, &mut self.rng))
            .collect();
        self.scores = vec![0.0; n];
        self.evaluated = 0;
        self.generation = 0;
        self.temperature = self.params.initial_temperature;
        self.round_best = f32::NEG_INFINITY;
        self.patience = 0;

        let context = EvaluationContext::for_piece_count(
            self.rng.random(),
            self.params.piece_count,
            self.start_grid.clone(),
        );
        log_bag(context.bag());
        self.context = Some(context);

        self.phase = Phase::EvaluatingFirstHalf;
        self.evaluate_range(0, n / 2)?;
        self.phase = Phase::EvaluatingSecondHalf;
        Ok(())
    }

    fn evaluate_second_half(&mut self) -> Result<(), EvaluationError> {
        let n = self.genotypes.len();
        self.phase = Phase::EvaluatingSecondHalf;
        self.evaluate_range(n / 2, n)
    }

    fn evaluate_range(&mut self, start: usize, end: usize) -> Result<(), EvaluationError> {
        let Some(context) = &self.context else {
            return Ok(());
        };
        self.pool
            .evaluate(
                &self.evaluator,
                context,
                &self.genotypes[start..end],
                &mut self.scores[start..end],
            )
            .map_err(|err| match err {
                EvaluationError::WorkerPanicked { start: s, end: e } => {
                    EvaluationError::WorkerPanicked {
                        start: start + s,
                        end: start + e,
                    }
                }
            })?;
        self.evaluated = end;
        Ok(())
    }

    /// Orders genotypes and scores together, best first.
    fn sort(&mut self) {
        self.phase = Phase::Sorting;
        let mut ranked: Vec<(Genotype, f32)> = std::mem::take(&mut self.genotypes)
            .into_iter()
            .zip(self.scores.iter().copied())
            .collect();
        ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));
        (self.genotypes, self.scores) = ranked.into_iter().unzip();
    }

    fn reproduce(&mut self) {
        self.phase = Phase::Reproducing;
        let n = self.genotypes.len();
        let half = n / 2;
        let probabilities = softmax(&self.scores, self.temperature);
        let params = &self.params;

        let mut children = Vec::with_capacity(n - half);
        for i in (half..n).step_by(2) {
            let a = roulette(&probabilities, self.rng.random());
            let b = roulette(&probabilities, self.rng.random());
            let (pa, pb) = (&self.genotypes[a], &self.genotypes[b]);
            children.push(pa.reproduce(
                pb,
                params.mutation_chance,
                params.crossover,
                params.mutation,
                &mut self.rng,
            ));
            if i + 1 < n {
                children.push(pb.reproduce(
                    pa,
                    params.mutation_chance,
                    params.crossover,
                    params.mutation,
                    &mut self.rng,
                ));
            }
        }
        self.genotypes.truncate(half);
        self.genotypes.extend(children);
        self.scores[half..].fill(0.0);
        self.evaluated = half;

        self.generation += 1;
        self.temperature = temperature_at(self.params.initial_temperature, self.generation);
        self.phase = Phase::EvaluatingSecondHalf;
    }

    fn finish_round(&mut self, context: EvaluationContext) -> Solution {
        let genotype = self.genotypes[0].clone();
        let score = self.scores[0];
        info!("Round {} finished. Score: {score}", self.round);
        self.start_grid = Some(self.evaluator.played_grid(&genotype, &context));
        self.round += 1;
        Solution {
            genotype,
            score,
            context,
        }
    }
}

fn log_bag(bag: &PieceBag) {
    let pieces: Vec<String> = bag.next_pieces().map(|kind| format!("{kind:?}")).collect();
    info!("Bag pieces: {}", pieces.join(", "));
}

/// Selection temperature after `generation` generations.
#[must_use]
pub fn temperature_at(initial: f32, generation: usize) -> f32 {
    #[expect(clippy::cast_precision_loss)]
    let t = initial / ((generation + 2) as f32).ln();
    t.max(MIN_TEMPERATURE)
}

/// Selection probabilities `exp(s / T) / Σ exp(s / T)`.
///
/// Scores are shifted by their maximum first, so large scores cannot overflow.
/// Equal scores get equal probabilities.
#[must_use]
pub fn softmax(scores: &[f32], temperature: f32) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let weights: Vec<f32> = scores
        .iter()
        .map(|&s| ((s - max) / temperature).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Index whose cumulative probability first exceeds `u`.
///
/// Rounding can leave the total slightly below 1; draws past it select the
/// last index.
#[must_use]
pub fn roulette(probabilities: &[f32], u: f32) -> usize {
    let mut cumulative = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return i;
        }
    }
    probabilities.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use tetrevo_engine::RuleSettings;
    use tetrevo_evaluator::fitness::FitnessWeights;

    use super::*;

    fn small_params() -> GeneticParams {
        GeneticParams {
            population_size: 8,
            piece_count: 3,
            max_generations: 5,
            ..GeneticParams::default()
        }
    }

    fn search(params: GeneticParams) -> GeneticSearch {
        let evaluator = FitnessEvaluator::new(RuleSettings::default(), FitnessWeights::default());
        GeneticSearch::new(params, evaluator, WorkerPool::new(2, 1), 42, None)
    }

    mod selection {
        use super::*;

        #[test]
        fn test_softmax_sums_to_one() {
            let p = softmax(&[1.0, -3.0, 10.0, 2.5], 2.0);
            let sum: f32 = p.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert!(p[2] > p[3] && p[3] > p[0] && p[0] > p[1]);
        }

        #[test]
        fn test_softmax_is_uniform_on_ties() {
            let p = softmax(&[-7.0; 4], 0.1);
            assert!(p.iter().all(|&v| (v - 0.25).abs() < 1e-6));
        }

        #[test]
        fn test_softmax_handles_huge_scores() {
            let p = softmax(&[1.0e6, -1.0e6, 0.0], 0.1);
            assert!(p.iter().all(|v| !v.is_nan()));
            assert!((p[0] - 1.0).abs() < 1e-6);
        }

        #[test]
        fn test_roulette_walks_cumulative_probabilities() {
            let p = [0.25, 0.5, 0.25];
            assert_eq!(roulette(&p, 0.0), 0);
            assert_eq!(roulette(&p, 0.3), 1);
            assert_eq!(roulette(&p, 0.74), 1);
            assert_eq!(roulette(&p, 0.8), 2);
        }

        #[test]
        fn test_roulette_clamps_to_last_index() {
            let p = [0.3, 0.3, 0.3];
            assert_eq!(roulette(&p, 0.95), 2);
            assert_eq!(roulette(&p, 1.0), 2);
        }

        #[test]
        fn test_temperature_schedule() {
            assert!((temperature_at(100.0, 0) - 100.0 / 2f32.ln()).abs() < 1e-3);
            assert!(temperature_at(100.0, 10) < temperature_at(100.0, 1));
            assert!((temperature_at(0.01, 5) - MIN_TEMPERATURE).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_first_step_initializes_half() {
        let mut ga = search(small_params());
        assert_eq!(ga.phase(), Phase::Idle);
        assert!(ga.best().is_none());

        let outcome = ga.step().unwrap();
        assert!(matches!(outcome, StepOutcome::Initialized { round: 0 }));
        assert_eq!(ga.phase(), Phase::EvaluatingSecondHalf);
        assert_eq!(ga.genotypes().len(), 8);
        assert_eq!(ga.scores().len(), 8);
        assert!(ga.context().is_some());

        let (best, score) = ga.best().unwrap();
        let evaluation = ga.evaluate_single(best).unwrap();
        assert!((evaluation.fitness - score).abs() < f32::EPSILON);
    }

    #[test]
    fn test_generation_keeps_elites() {
        let mut ga = search(small_params());
        ga.step().unwrap();

        ga.evaluate_second_half().unwrap();
        ga.sort();
        assert!(ga.scores().windows(2).all(|w| w[0] >= w[1]));
        let elites = ga.genotypes()[..4].to_vec();
        let elite_scores = ga.scores()[..4].to_vec();

        ga.reproduce();
        assert_eq!(ga.genotypes().len(), 8);
        assert_eq!(ga.scores().len(), 8);
        assert_eq!(&ga.genotypes()[..4], elites.as_slice());
        assert_eq!(&ga.scores()[..4], elite_scores.as_slice());
        assert_eq!(ga.generation(), 1);
        assert!((ga.temperature() - temperature_at(100.0, 1)).abs() < f32::EPSILON);
        for g in ga.genotypes() {
            assert_eq!(g.piece_count(), 3);
            assert_eq!(g.variant(), EncodingVariant::SwapDouble);
        }
    }

    #[test]
    fn test_best_score_never_decreases_within_round() {
        let mut ga = search(small_params());
        ga.step().unwrap();
        let mut previous = f32::NEG_INFINITY;
        for _ in 0..4 {
            let StepOutcome::Generation(report) = ga.step().unwrap() else {
                panic!("expected a generation");
            };
            assert!(report.finished_round.is_none());
            assert!(report.best_score >= previous);
            assert!(report.mean_score <= report.best_score);
            previous = report.best_score;
        }
    }

    #[test]
    fn test_round_ends_at_generation_cap() {
        let mut ga = search(GeneticParams {
            max_generations: 2,
            ..small_params()
        });
        ga.step().unwrap();

        let StepOutcome::Generation(first) = ga.step().unwrap() else {
            panic!("expected a generation");
        };
        assert!(first.finished_round.is_none());

        let StepOutcome::Generation(second) = ga.step().unwrap() else {
            panic!("expected a generation");
        };
        let solution = second.finished_round.unwrap();
        assert_eq!(second.generation, 1);
        assert!((solution.score - second.best_score).abs() < f32::EPSILON);

        // the next round starts on the board the best genotype left behind
        let played = ga
            .evaluator()
            .played_grid(&solution.genotype, &solution.context);
        assert_eq!(ga.round(), 1);
        assert_eq!(ga.start_grid(), Some(&played));

        let outcome = ga.step().unwrap();
        assert!(matches!(outcome, StepOutcome::Initialized { round: 1 }));
        assert_eq!(ga.generation(), 0);
        assert_eq!(ga.context().unwrap().start_grid(), Some(&played));
        assert_eq!(ga.phase(), Phase::EvaluatingSecondHalf);
    }

    #[test]
    fn test_finished_round_leaves_search_idle() {
        let mut ga = search(GeneticParams {
            max_generations: 1,
            ..small_params()
        });
        ga.step().unwrap();
        let StepOutcome::Generation(report) = ga.step().unwrap() else {
            panic!("expected a generation");
        };
        assert!(report.finished_round.is_some());

        // no population is built for a round nobody asked for yet
        assert_eq!(ga.phase(), Phase::Idle);
        assert!(ga.context().is_none());
        assert!(ga.best().is_none());
        assert!(ga.evaluate_single(&report.finished_round.unwrap().genotype).is_none());
    }

    #[test]
    fn test_zero_patience_ends_round_after_one_generation() {
        let mut ga = search(GeneticParams {
            max_generations: 1000,
            max_patience: Some(0),
            ..small_params()
        });
        ga.step().unwrap();
        let StepOutcome::Generation(report) = ga.step().unwrap() else {
            panic!("expected a generation");
        };
        assert_eq!(report.generation, 0);
        assert!(report.finished_round.is_some());
        assert_eq!(ga.round(), 1);
    }

    #[test]
    fn test_replace_worst_only_when_better() {
        let mut ga = search(small_params());
        ga.step().unwrap();
        let worst = ga.scores()[..4]
            .iter()
            .copied()
            .fold(f32::INFINITY, f32::min);

        let candidate = ga.genotypes()[0].clone();
        assert!(!ga.replace_worst(candidate.clone(), worst));
        assert!(ga.replace_worst(candidate.clone(), worst + 1.0));
        assert!(ga.scores()[..4].contains(&(worst + 1.0)));
        assert!(ga.genotypes()[..4].contains(&candidate));
    }
}

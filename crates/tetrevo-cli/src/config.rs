//! Run configuration: JSON file, then command-line overrides, then validation.

use std::{fs, path::PathBuf};

use anyhow::{Context as _, ensure};
use serde::{Deserialize, Serialize};
use tetrevo_engine::{Grid, RuleSettings};
use tetrevo_evaluator::{fitness::FitnessWeights, genotype::EncodingVariant};
use tetrevo_training::{
    annealing::AnnealingParams, genetic::GeneticParams, worker_pool::WorkerPool,
};

use crate::util::read_json_file;

/// Board width and height below which the rule simulator cannot spawn every
/// piece.
const MIN_BOARD_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Root seed; every random stream of a run derives from it.
    pub seed: u64,
    /// Evaluation threads. `None` uses the available parallelism.
    pub workers: Option<usize>,
    /// Smallest number of genotypes per evaluation batch.
    pub min_batch: usize,
    /// Hands the GA best to an annealing run every this many generations.
    /// 0 disables the hand-off.
    pub sa_every: usize,
    /// Rounds to run; each round starts on the board left by the previous one.
    pub rounds: usize,
    /// Board of the first round. `None` starts empty.
    pub start_grid: Option<Grid>,
    pub rules: RuleSettings,
    pub fitness: FitnessWeights,
    pub ga: GeneticParams,
    pub sa: AnnealingSection,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            workers: None,
            min_batch: WorkerPool::DEFAULT_MIN_BATCH,
            sa_every: 25,
            rounds: 1,
            start_grid: None,
            rules: RuleSettings::default(),
            fitness: FitnessWeights::default(),
            ga: GeneticParams::default(),
            sa: AnnealingSection::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingSection {
    #[serde(flatten)]
    pub params: AnnealingParams,
    /// Weights used while annealing. `None` uses the top-level `fitness`.
    ///
    /// A heavier score weight (such as 2.5) pushes the walk toward line
    /// clears; the result is still ranked with the top-level weights when it
    /// returns to the GA.
    pub fitness: Option<FitnessWeights>,
}

impl SearchConfig {
    #[must_use]
    pub fn annealing_weights(&self) -> FitnessWeights {
        self.sa.fitness.unwrap_or(self.fitness)
    }

    #[must_use]
    pub fn worker_pool(&self) -> WorkerPool {
        match self.workers {
            Some(workers) => WorkerPool::new(workers, self.min_batch),
            None => WorkerPool::new(WorkerPool::default().workers(), self.min_batch),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let Self {
            rules, ga, sa, start_grid, rounds, ..
        } = self;
        ensure!(
            rules.width >= MIN_BOARD_SIZE && rules.height >= MIN_BOARD_SIZE,
            "board must be at least {MIN_BOARD_SIZE}x{MIN_BOARD_SIZE}, got {}x{}",
            rules.width,
            rules.height
        );
        if let Some(grid) = start_grid {
            ensure!(
                grid.width() == rules.width && grid.height() == rules.height,
                "start grid is {}x{}, but the board is {}x{}",
                grid.width(),
                grid.height(),
                rules.width,
                rules.height
            );
        }
        ensure!(
            ga.population_size >= 2 && ga.population_size % 2 == 0,
            "population size must be even and at least 2, got {}",
            ga.population_size
        );
        ensure!(
            ga.piece_count >= 1,
            "piece count must be at least 1, got {}",
            ga.piece_count
        );
        ensure!(
            (0.0..=1.0).contains(&ga.mutation_chance),
            "mutation chance must be in [0, 1], got {}",
            ga.mutation_chance
        );
        ensure!(
            ga.initial_temperature > 0.0,
            "GA initial temperature must be positive, got {}",
            ga.initial_temperature
        );
        ensure!(
            ga.max_generations >= 1,
            "GA max generations must be at least 1"
        );
        ensure!(
            sa.params.initial_temperature > 0.0,
            "SA initial temperature must be positive, got {}",
            sa.params.initial_temperature
        );
        ensure!(
            sa.params.temperature_factor > 0.0 && sa.params.temperature_factor < 1.0,
            "SA temperature factor must be in (0, 1), got {}",
            sa.params.temperature_factor
        );
        ensure!(*rounds >= 1, "rounds must be at least 1");
        Ok(())
    }
}

/// Configuration source and overrides shared by the search commands.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ConfigArg {
    /// JSON configuration file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Root random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Evaluation threads
    #[arg(long)]
    workers: Option<usize>,
    /// GA population size
    #[arg(long)]
    population: Option<usize>,
    /// Pieces per move sequence
    #[arg(long)]
    pieces: Option<usize>,
    /// Genotype encoding: Simple, Double, SwapSimple or SwapDouble
    #[arg(long)]
    variant: Option<EncodingVariant>,
    /// GA generations per round
    #[arg(long)]
    generations: Option<usize>,
    /// Generations between annealing hand-offs, 0 to disable
    #[arg(long)]
    sa_every: Option<usize>,
    /// Steps per annealing run
    #[arg(long)]
    sa_generations: Option<usize>,
    /// Chained rounds
    #[arg(long)]
    rounds: Option<usize>,
    /// Text file with the starting board, top row first ('.' for empty)
    #[arg(long)]
    start_grid: Option<PathBuf>,
}

impl ConfigArg {
    pub(crate) fn load(&self) -> anyhow::Result<SearchConfig> {
        let mut config = match &self.config {
            Some(path) => read_json_file("configuration", path)?,
            None => SearchConfig::default(),
        };
        self.apply(&mut config)?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn apply(&self, config: &mut SearchConfig) -> anyhow::Result<()> {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(population) = self.population {
            config.ga.population_size = population;
        }
        if let Some(pieces) = self.pieces {
            config.ga.piece_count = pieces;
        }
        if let Some(variant) = self.variant {
            config.ga.variant = variant;
        }
        if let Some(generations) = self.generations {
            config.ga.max_generations = generations;
        }
        if let Some(sa_every) = self.sa_every {
            config.sa_every = sa_every;
        }
        if let Some(sa_generations) = self.sa_generations {
            config.sa.params.max_generations = sa_generations;
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(path) = &self.start_grid {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read start grid file: {}", path.display()))?;
            let grid = Grid::from_ascii(&text)
                .with_context(|| format!("Failed to parse start grid file: {}", path.display()))?;
            config.start_grid = Some(grid);
        }
        Ok(())
    }
}

use std::path::PathBuf;

use anyhow::Context as _;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use tetrevo_evaluator::{
    fitness::{EvaluationContext, FitnessEvaluator},
    genotype::Genotype,
};
use tetrevo_training::{annealing::SimulatedAnnealing, log_breakdown};
use tracing::info;

use crate::{
    config::ConfigArg,
    schema::search_result::SearchResult,
    util::{Output, read_json_file},
};

const PROGRESS_EVERY: usize = 1000;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AnnealArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Start from the last round of a saved result instead of a random sequence
    #[arg(long)]
    from: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AnnealArg) -> anyhow::Result<()> {
    let config = arg.config.load()?;
    let mut seeds = Pcg32::seed_from_u64(config.seed);

    let (seed, context, rules) = match &arg.from {
        Some(path) => {
            let saved: SearchResult = read_json_file("search result", path)?;
            let round = saved
                .rounds
                .into_iter()
                .last()
                .with_context(|| format!("No rounds in {}", path.display()))?;
            (round.genotype, round.context, saved.rules)
        }
        None => {
            let context = EvaluationContext::for_piece_count(
                seeds.random(),
                config.ga.piece_count,
                config.start_grid.clone(),
            );
            let seed = Genotype::random(config.ga.variant, config.ga.piece_count, &mut seeds);
            (seed, context, config.rules.clone())
        }
    };
    let evaluator = FitnessEvaluator::new(rules, config.annealing_weights());

    let mut sa = SimulatedAnnealing::new(
        config.sa.params.clone(),
        evaluator.clone(),
        context.clone(),
        seed,
        seeds.random(),
    );
    info!("Seed score: {}", sa.best_score());
    while let Some(step) = sa.step() {
        if (step.generation + 1) % PROGRESS_EVERY == 0 {
            info!(
                "Gen: {} - current {} best {} T {}",
                step.generation,
                sa.current_score(),
                sa.best_score(),
                sa.temperature()
            );
        }
    }

    let mut result = SearchResult::new(config.seed, &evaluator);
    let round = result.push_round(&evaluator, sa.best().clone(), context);
    log_breakdown(&round.evaluation, evaluator.weights());

    Output::save_json(&result, arg.output.clone())
}

use std::{path::PathBuf, time::Duration};

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use tetrevo_evaluator::fitness::FitnessEvaluator;
use tetrevo_training::{
    annealing::{AnnealingParams, SimulatedAnnealing},
    genetic::{GeneticSearch, StepOutcome},
    log_breakdown,
};
use tracing::info;

use crate::{
    config::ConfigArg, render::TextRenderer, schema::search_result::SearchResult, util::Output,
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SearchArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Replay the current best sequence on stderr every N generations
    #[arg(long)]
    render: Option<usize>,
    /// Pause between rendered frames, in milliseconds
    #[arg(long, default_value_t = 0)]
    frame_delay: u64,
}

pub(crate) fn run(arg: &SearchArg) -> anyhow::Result<()> {
    let config = arg.config.load()?;
    let evaluator = FitnessEvaluator::new(config.rules.clone(), config.fitness);
    let sa_evaluator = FitnessEvaluator::new(config.rules.clone(), config.annealing_weights());
    let pool = config.worker_pool();
    info!(
        "Population {} x {} pieces ({}), {} workers",
        config.ga.population_size,
        config.ga.piece_count,
        config.ga.variant,
        pool.workers()
    );

    let mut seeds = Pcg32::seed_from_u64(config.seed);
    let mut ga = GeneticSearch::new(
        config.ga.clone(),
        evaluator.clone(),
        pool,
        seeds.random(),
        config.start_grid.clone(),
    );

    let mut result = SearchResult::new(config.seed, &evaluator);
    while result.rounds.len() < config.rounds {
        let report = match ga.step()? {
            StepOutcome::Initialized { round } => {
                info!("Round {round} started");
                continue;
            }
            StepOutcome::Generation(report) => report,
        };

        if let Some(solution) = report.finished_round {
            let round = result.push_round(&evaluator, solution.genotype, solution.context);
            info!("Round {} best:", report.round);
            log_breakdown(&round.evaluation, evaluator.weights());
            continue;
        }

        let completed = report.generation + 1;
        if config.sa_every > 0 && completed % config.sa_every == 0 {
            hand_off(&mut ga, &sa_evaluator, &config.sa.params, seeds.random());
        }
        if arg
            .render
            .is_some_and(|every| every > 0 && completed % every == 0)
        {
            render_best(&ga, Duration::from_millis(arg.frame_delay));
        }
    }

    Output::save_json(&result, arg.output.clone())
}

/// Refines the GA best with an annealing run and hands the result back.
fn hand_off(
    ga: &mut GeneticSearch,
    sa_evaluator: &FitnessEvaluator,
    params: &AnnealingParams,
    rng_seed: u64,
) {
    let (Some((seed, seed_score)), Some(context)) = (ga.best(), ga.context()) else {
        return;
    };
    let mut sa = SimulatedAnnealing::new(
        params.clone(),
        sa_evaluator.clone(),
        context.clone(),
        seed.clone(),
        rng_seed,
    );
    while sa.step().is_some() {}

    let Some(evaluation) = ga.evaluate_single(sa.best()) else {
        return;
    };
    let replaced = ga.replace_worst(sa.best().clone(), evaluation.fitness);
    info!(
        "Annealing: {seed_score} -> {} ({})",
        evaluation.fitness,
        if replaced {
            "replaced worst"
        } else {
            "not better than worst"
        }
    );
}

fn render_best(ga: &GeneticSearch, delay: Duration) {
    let (Some((best, _)), Some(context)) = (ga.best(), ga.context()) else {
        return;
    };
    let mut renderer = TextRenderer::stderr(delay);
    let (evaluation, _) = ga.evaluator().replay(best, context, &mut renderer);
    info!(
        "Replayed generation {} best: fitness {}",
        ga.generation(),
        evaluation.fitness
    );
}

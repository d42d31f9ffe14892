use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use tetrevo_training::log_breakdown;
use tracing::{info, warn};

use crate::{
    render::TextRenderer, schema::search_result::SearchResult, util::read_json_file,
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ReplayArg {
    /// Result file written by `search` or `anneal`
    result: PathBuf,
    /// Replay only this round (0-based)
    #[arg(long)]
    round: Option<usize>,
    /// Pause between frames, in milliseconds
    #[arg(long, default_value_t = 0)]
    frame_delay: u64,
}

pub(crate) fn run(arg: &ReplayArg) -> anyhow::Result<()> {
    let result: SearchResult = read_json_file("search result", &arg.result)?;
    let evaluator = result.evaluator();
    info!(
        "Result from {} (seed {}), {} rounds",
        result.created_at,
        result.seed,
        result.rounds.len()
    );

    let selected: Vec<_> = match arg.round {
        Some(index) => {
            let round = result
                .rounds
                .get(index)
                .with_context(|| format!("Round {index} not found in {}", arg.result.display()))?;
            vec![(index, round)]
        }
        None => result.rounds.iter().enumerate().collect(),
    };

    for (index, round) in selected {
        info!("Round {index} (bag seed {})", round.context.bag_seed());
        let mut renderer = TextRenderer::stderr(Duration::from_millis(arg.frame_delay));
        let (evaluation, _) = evaluator.replay(&round.genotype, &round.context, &mut renderer);
        if evaluation != round.evaluation {
            warn!(
                "Round {index} replays to fitness {}, recorded {}",
                evaluation.fitness, round.evaluation.fitness
            );
        }
        info!("Round {index}: {} frames", renderer.frames());
        log_breakdown(&evaluation, evaluator.weights());
    }
    Ok(())
}

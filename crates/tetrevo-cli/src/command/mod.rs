use clap::{Parser, Subcommand};
use tracing::Level;

use self::{
    anneal::AnnealArg, default_config::DefaultConfigArg, replay::ReplayArg, search::SearchArg,
};

mod anneal;
mod default_config;
mod replay;
mod search;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Most verbose log level shown on stderr
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Level,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve a move sequence with the genetic algorithm, refined by annealing
    Search(#[clap(flatten)] SearchArg),
    /// Run simulated annealing alone from a random or saved sequence
    Anneal(#[clap(flatten)] AnnealArg),
    /// Play back a saved result as text frames
    Replay(#[clap(flatten)] ReplayArg),
    /// Print the default configuration as JSON
    DefaultConfig(#[clap(flatten)] DefaultConfigArg),
}

pub fn run(args: CommandArgs) -> anyhow::Result<()> {
    match args.mode {
        Mode::Search(arg) => search::run(&arg)?,
        Mode::Anneal(arg) => anneal::run(&arg)?,
        Mode::Replay(arg) => replay::run(&arg)?,
        Mode::DefaultConfig(arg) => default_config::run(&arg)?,
    }
    Ok(())
}

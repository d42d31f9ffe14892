use std::io;

use clap::Parser as _;
use tracing_subscriber::prelude::*;

use crate::command::CommandArgs;

mod command;
mod config;
mod render;
mod schema;
mod util;

fn main() -> anyhow::Result<()> {
    let args = CommandArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            args.log_level,
        ))
        .init();

    command::run(args)
}

use clap::{Parser, Subcommand};

use self::{
    config::ConfigArg, migrate::MigrateArg, play::PlayArg, train::TrainArg,
};

mod config;
mod migrate;
mod play;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train agents on the benchmark task
    Train(#[clap(flatten)] TrainArg),
    /// Move the best genomes of one saved population into another
    Migrate(#[clap(flatten)] MigrateArg),
    /// Replay a saved best genome or network on the benchmark task
    Play(#[clap(flatten)] PlayArg),
    /// Print the default configuration of a strategy as JSON
    Config(#[clap(flatten)] ConfigArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode.unwrap_or(Mode::Train(TrainArg::default())) {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Migrate(arg) => migrate::run(&arg)?,
        Mode::Play(arg) => play::run(&arg)?,
        Mode::Config(arg) => config::run(&arg)?,
    }
    Ok(())
}

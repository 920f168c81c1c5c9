use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use evolve_network::network::NeatNetwork;
use evolve_training::{persistence, strategy::PolicyNetwork};

use crate::{
    benchmark::{CatchTask, INPUT_COUNT, OUTPUT_COUNT},
    command::train::StrategyKind,
};

const EPISODES: usize = 10;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// Best-genome (neat) or best-network (fixed) file written by
    /// `train --output-dir`
    #[arg(long)]
    file: PathBuf,
    /// Strategy the file was trained with (neat, fixed)
    #[arg(long, default_value = "neat")]
    strategy: StrategyKind,
    /// Number of benchmark episodes to average over
    #[arg(long)]
    episodes: Option<usize>,
    /// Keep hidden state between steps (recurrent NEAT evaluation)
    #[arg(long)]
    recurrent: bool,
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let PlayArg {
        file: path,
        strategy,
        episodes,
        recurrent,
    } = arg;

    let mut network = match strategy {
        StrategyKind::Neat => load_genome(path, *recurrent)?,
        StrategyKind::Fixed => load_network(path)?,
        StrategyKind::Elites => bail!("MAP-Elites runs do not save a best individual"),
    };
    let objectives = CatchTask::new(episodes.unwrap_or(EPISODES)).evaluate(&mut network);
    println!(
        "collected: {:.1}  survived: {:.1}  explored: {:.1}",
        objectives[0], objectives[1], objectives[2]
    );
    Ok(())
}

fn load_genome(path: &Path, recurrent: bool) -> anyhow::Result<PolicyNetwork> {
    let file = persistence::load_best(path, INPUT_COUNT, OUTPUT_COUNT)
        .with_context(|| format!("Failed to load best genome: {}", path.display()))?;
    eprintln!(
        "Genome from generation {} saved at {}",
        file.generation, file.saved_at
    );
    let genome = file.into_genome();
    eprintln!(
        "  {} nodes, {} connections ({} enabled)",
        genome.nodes().len(),
        genome.connections().len(),
        genome.connections().iter().filter(|c| c.enabled).count()
    );
    Ok(PolicyNetwork::Neat(NeatNetwork::from_genome(&genome, recurrent)))
}

fn load_network(path: &Path) -> anyhow::Result<PolicyNetwork> {
    let file = persistence::load_best_network(path, INPUT_COUNT, OUTPUT_COUNT)
        .with_context(|| format!("Failed to load best network: {}", path.display()))?;
    let shape = file.network.shape;
    eprintln!(
        "Network from generation {} (fitness {:.2}) saved at {}",
        file.generation, file.fitness, file.saved_at
    );
    eprintln!(
        "  {} hidden units, memory {}",
        shape.hidden_size,
        if shape.use_memory { "on" } else { "off" }
    );
    Ok(PolicyNetwork::FeedForward(file.into_network()))
}

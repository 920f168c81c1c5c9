use std::path::PathBuf;

use anyhow::{Context as _, bail, ensure};
use evolve_network::{config::GenomeConfig, feedforward::NetworkShape};
use evolve_training::{
    fixed_topology::FixedTopologyConfig,
    map_elites::MapElitesConfig,
    neat::NeatConfig,
    strategy::{EvolutionStrategy as _, Fitness, Strategy, StrategyConfig},
};

use crate::{
    benchmark::{CatchTask, INPUT_COUNT, OUTPUT_COUNT},
    util,
};

const GENERATIONS: u32 = 100;
const EPISODES_PER_INDIVIDUAL: usize = 3;
const CHECKPOINT_INTERVAL: u32 = 10;

const POPULATION_FILE: &str = "population.json";
const BEST_GENOME_FILE: &str = "best_genome.json";
const BEST_NETWORK_FILE: &str = "best_network.json";

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub(crate) enum StrategyKind {
    #[default]
    Neat,
    Fixed,
    Elites,
}

impl StrategyKind {
    /// Default configuration sized for the benchmark task.
    pub(crate) fn default_config(self) -> StrategyConfig {
        let genome = GenomeConfig {
            input_count: INPUT_COUNT,
            output_count: OUTPUT_COUNT,
            ..GenomeConfig::default()
        };
        match self {
            StrategyKind::Neat => StrategyConfig::Neat(NeatConfig {
                genome,
                ..NeatConfig::default()
            }),
            StrategyKind::Fixed => StrategyConfig::FixedTopology(FixedTopologyConfig {
                shape: NetworkShape {
                    input_size: INPUT_COUNT,
                    output_size: OUTPUT_COUNT,
                    ..NetworkShape::default()
                },
                ..FixedTopologyConfig::default()
            }),
            StrategyKind::Elites => StrategyConfig::MapElites(MapElitesConfig {
                genome,
                behavior_ranges: CatchTask::behavior_ranges(),
                ..MapElitesConfig::default()
            }),
        }
    }
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Strategy to train with (neat, fixed, elites)
    #[arg(long, default_value = "neat")]
    strategy: StrategyKind,
    /// Strategy configuration JSON file; replaces the defaults of --strategy
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of generations to run
    #[arg(long)]
    generations: Option<u32>,
    /// Benchmark episodes played by each individual per generation
    #[arg(long)]
    episodes: Option<usize>,
    #[arg(long)]
    population_size: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Rank by Pareto fronts instead of summed objectives (neat, fixed)
    #[arg(long)]
    multi_objective: bool,
    /// Continue from a saved NEAT population, or seed a fixed-topology run with a
    /// saved best network
    #[arg(long)]
    resume: Option<PathBuf>,
    /// Directory for population checkpoints and the best genome (NEAT) or the
    /// best network (fixed)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Generations between checkpoints
    #[arg(long)]
    checkpoint_interval: Option<u32>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        strategy: kind,
        config,
        generations,
        episodes,
        population_size,
        seed,
        multi_objective,
        resume,
        output_dir,
        checkpoint_interval,
    } = arg;

    let mut config = match config {
        Some(path) => util::read_strategy_config_file(path)?,
        None => kind.default_config(),
    };
    if let Some(size) = population_size {
        config.set_population_size(*size);
    }
    if let Some(seed) = seed {
        config.set_seed(*seed);
    }
    if *multi_objective {
        match &mut config {
            StrategyConfig::Neat(neat) => neat.multi_objective = true,
            StrategyConfig::FixedTopology(fixed) => fixed.multi_objective = true,
            StrategyConfig::MapElites(_) => {
                log::warn!("--multi-objective has no effect on MAP-Elites");
            }
        }
    }
    ensure!(
        config.io_shape() == (INPUT_COUNT, OUTPUT_COUNT),
        "benchmark task needs {INPUT_COUNT} inputs and {OUTPUT_COUNT} outputs, configuration has {:?}",
        config.io_shape()
    );

    let mut strategy = Strategy::new(config);
    if let Some(path) = resume {
        let loaded = match &mut strategy {
            Strategy::Neat(neat) => neat.load_population(path),
            Strategy::FixedTopology(fixed) => fixed.load_best(path).map(|_| ()),
            Strategy::MapElites(_) => bail!("--resume is not supported for MAP-Elites"),
        };
        loaded.with_context(|| format!("Failed to resume from {}", path.display()))?;
    }
    if output_dir.is_some() && matches!(strategy, Strategy::MapElites(_)) {
        log::warn!("--output-dir does not save MAP-Elites archives; nothing will be written");
    }

    let task = CatchTask::new(episodes.unwrap_or(EPISODES_PER_INDIVIDUAL));
    let generations = generations.unwrap_or(GENERATIONS);
    let checkpoint_interval = checkpoint_interval.unwrap_or(CHECKPOINT_INTERVAL).max(1);

    for generation in 0..generations {
        for index in 0..strategy.population_size() {
            let Some(mut network) = strategy.get_network(index) else {
                continue;
            };
            let objectives = task.evaluate(&mut network);
            strategy.set_objective(index, Fitness::Objectives(objectives));
        }

        // scores are on the genomes until evolve() resets them
        let is_last = generation + 1 == generations;
        if let (Some(dir), Strategy::Neat(neat)) = (output_dir, &strategy)
            && ((generation + 1) % checkpoint_interval == 0 || is_last)
        {
            neat.save_population(dir.join(POPULATION_FILE))
                .context("Failed to save population checkpoint")?;
        }

        strategy.evolve();
        eprintln!("{}", strategy.get_stats());
    }

    let Some(dir) = output_dir else {
        return Ok(());
    };
    let (path, saved) = match &strategy {
        Strategy::Neat(neat) => {
            let path = dir.join(BEST_GENOME_FILE);
            let saved = neat
                .save_best(&path)
                .with_context(|| format!("Failed to save best genome: {}", path.display()))?;
            (path, saved)
        }
        Strategy::FixedTopology(fixed) => {
            let path = dir.join(BEST_NETWORK_FILE);
            let saved = fixed
                .save_best(&path)
                .with_context(|| format!("Failed to save best network: {}", path.display()))?;
            (path, saved)
        }
        Strategy::MapElites(_) => return Ok(()),
    };
    if saved {
        eprintln!("Best individual saved to {}", path.display());
    }
    Ok(())
}

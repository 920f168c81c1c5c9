//! The contract shared by every evolution strategy.
//!
//! A training driver does not care whether it evolves NEAT genomes, fixed-topology
//! weight vectors or a MAP-Elites archive. Each round it:
//!
//! 1. builds a [`PolicyNetwork`] per slot with [`EvolutionStrategy::get_network`]
//! 2. plays one episode per slot and reports the result with
//!    [`EvolutionStrategy::set_objective`]
//! 3. calls [`EvolutionStrategy::evolve`] once every slot has been scored
//! 4. reads [`EvolutionStrategy::get_stats`] for reporting
//!
//! [`Strategy`] is the closed set of implementations, built from a
//! [`StrategyConfig`] so a single JSON document can select and tune one.

use evolve_network::{feedforward::FeedForwardNetwork, genome::Genome, network::NeatNetwork};
use serde::{Deserialize, Serialize};

use crate::{
    fixed_topology::{FixedTopologyConfig, FixedTopologyEvolution},
    map_elites::{MapElitesConfig, MapElitesEvolution},
    neat::{NeatConfig, NeatEvolution},
    nsga2::{self, ObjectiveVector},
};

/// Score reported for one evaluated slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fitness {
    Scalar(f32),
    Objectives(ObjectiveVector),
}

impl Fitness {
    /// Scalar view: the value itself, or the sum of the objectives.
    #[must_use]
    pub fn scalar(&self) -> f32 {
        match self {
            Self::Scalar(value) => *value,
            Self::Objectives(objectives) => nsga2::scalarize(objectives),
        }
    }

    /// Objective view. A scalar occupies the first objective.
    #[must_use]
    pub fn objectives(&self) -> ObjectiveVector {
        match self {
            Self::Scalar(value) => [*value, 0.0, 0.0],
            Self::Objectives(objectives) => *objectives,
        }
    }
}

impl From<f32> for Fitness {
    fn from(value: f32) -> Self {
        Self::Scalar(value)
    }
}

impl From<ObjectiveVector> for Fitness {
    fn from(objectives: ObjectiveVector) -> Self {
        Self::Objectives(objectives)
    }
}

/// Snapshot of a strategy after its last [`evolve`](EvolutionStrategy::evolve).
///
/// Fitness figures describe the generation that was just evaluated; counts describe
/// the current population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[display(
    "gen {generation:>4}: best {best_fitness:>10.2}  mean {mean_fitness:>10.2}  all-time {all_time_best:>10.2}  species {species_count:>3}  fronts {num_fronts:>3}  pareto {pareto_front_size:>3}  hv {hypervolume:.1}"
)]
pub struct EvolutionStats {
    pub generation: u32,
    pub population_size: usize,
    pub species_count: usize,
    pub best_fitness: f32,
    pub mean_fitness: f32,
    pub all_time_best: f32,
    pub pareto_front_size: usize,
    pub hypervolume: f32,
    pub num_fronts: usize,
}

impl EvolutionStats {
    /// Fills the best/mean fitness figures from one generation's scores.
    pub(crate) fn record_fitness<I>(&mut self, fitness: I)
    where
        I: IntoIterator<Item = f32>,
    {
        let mut count = 0_usize;
        let mut sum = 0.0;
        let mut best = f32::NEG_INFINITY;
        for f in fitness {
            count += 1;
            sum += f;
            best = best.max(f);
        }
        if count == 0 {
            self.best_fitness = 0.0;
            self.mean_fitness = 0.0;
            return;
        }
        #[expect(clippy::cast_precision_loss)]
        let mean = sum / count as f32;
        self.best_fitness = best;
        self.mean_fitness = mean;
    }

    /// Fills the Pareto figures from one generation's objectives.
    ///
    /// The hypervolume is taken over the first two objectives of front 0 with the
    /// origin as reference point.
    pub(crate) fn record_fronts(&mut self, objectives: &[ObjectiveVector]) {
        let fronts = nsga2::non_dominated_sort(objectives);
        let first = fronts.first().map(Vec::as_slice).unwrap_or_default();
        let points = first
            .iter()
            .map(|&i| (objectives[i][0], objectives[i][1]))
            .collect::<Vec<_>>();
        self.num_fronts = fronts.len();
        self.pareto_front_size = first.len();
        self.hypervolume = nsga2::hypervolume_2d(&points, (0.0, 0.0));
    }
}

/// Borrowed view of one individual's genotype.
#[derive(Debug, Clone, Copy)]
pub enum IndividualRef<'a> {
    Genome(&'a Genome),
    Weights(&'a [f32]),
}

/// An evaluable phenotype, whatever its topology.
#[derive(Debug, Clone)]
pub enum PolicyNetwork {
    Neat(NeatNetwork),
    FeedForward(FeedForwardNetwork),
}

impl PolicyNetwork {
    pub fn forward(&mut self, inputs: &[f32]) -> &[f32] {
        match self {
            Self::Neat(network) => network.forward(inputs),
            Self::FeedForward(network) => network.forward(inputs),
        }
    }

    /// Clears recurrent state before a fresh episode.
    pub fn reset(&mut self) {
        match self {
            Self::Neat(network) => network.reset(),
            Self::FeedForward(network) => network.reset_memory(),
        }
    }
}

pub trait EvolutionStrategy {
    /// Number of slots scored per generation.
    fn population_size(&self) -> usize;

    /// Records the score of slot `index`. Out-of-range indices are ignored.
    fn set_objective(&mut self, index: usize, fitness: Fitness);

    /// Runs one generation step. Every slot must have been scored.
    fn evolve(&mut self);

    fn get_individual(&self, index: usize) -> Option<IndividualRef<'_>>;

    fn get_network(&self, index: usize) -> Option<PolicyNetwork>;

    fn get_stats(&self) -> EvolutionStats;
}

/// Strategy selection and tuning, as one serializable document.
///
/// ```
/// use evolve_training::strategy::StrategyConfig;
///
/// let config: StrategyConfig =
///     serde_json::from_str(r#"{ "strategy": "neat", "population_size": 50 }"#).unwrap();
/// let StrategyConfig::Neat(neat) = config else { panic!() };
/// assert_eq!(neat.population_size, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategyConfig {
    Neat(NeatConfig),
    FixedTopology(FixedTopologyConfig),
    MapElites(MapElitesConfig),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::Neat(NeatConfig::default())
    }
}

impl StrategyConfig {
    /// Overrides the population size (batch size for MAP-Elites).
    pub fn set_population_size(&mut self, size: usize) {
        match self {
            Self::Neat(config) => config.population_size = size,
            Self::FixedTopology(config) => config.population_size = size,
            Self::MapElites(config) => config.batch_size = size,
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        match self {
            Self::Neat(config) => config.seed = seed,
            Self::FixedTopology(config) => config.seed = seed,
            Self::MapElites(config) => config.seed = seed,
        }
    }

    /// Input and output counts of the networks this configuration produces.
    #[must_use]
    pub fn io_shape(&self) -> (usize, usize) {
        match self {
            Self::Neat(config) => (config.genome.input_count, config.genome.output_count),
            Self::FixedTopology(config) => (config.shape.input_size, config.shape.output_size),
            Self::MapElites(config) => (config.genome.input_count, config.genome.output_count),
        }
    }
}

/// The closed set of evolution strategies.
#[derive(Debug, Clone)]
pub enum Strategy {
    Neat(NeatEvolution),
    FixedTopology(FixedTopologyEvolution),
    MapElites(MapElitesEvolution),
}

impl Strategy {
    #[must_use]
    pub fn new(config: StrategyConfig) -> Self {
        match config {
            StrategyConfig::Neat(config) => Self::Neat(NeatEvolution::new(config)),
            StrategyConfig::FixedTopology(config) => {
                Self::FixedTopology(FixedTopologyEvolution::new(config))
            }
            StrategyConfig::MapElites(config) => Self::MapElites(MapElitesEvolution::new(config)),
        }
    }

    fn as_dyn(&self) -> &dyn EvolutionStrategy {
        match self {
            Self::Neat(s) => s,
            Self::FixedTopology(s) => s,
            Self::MapElites(s) => s,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn EvolutionStrategy {
        match self {
            Self::Neat(s) => s,
            Self::FixedTopology(s) => s,
            Self::MapElites(s) => s,
        }
    }
}

impl EvolutionStrategy for Strategy {
    fn population_size(&self) -> usize {
        self.as_dyn().population_size()
    }

    fn set_objective(&mut self, index: usize, fitness: Fitness) {
        self.as_dyn_mut().set_objective(index, fitness);
    }

    fn evolve(&mut self) {
        self.as_dyn_mut().evolve();
    }

    fn get_individual(&self, index: usize) -> Option<IndividualRef<'_>> {
        self.as_dyn().get_individual(index)
    }

    fn get_network(&self, index: usize) -> Option<PolicyNetwork> {
        self.as_dyn().get_network(index)
    }

    fn get_stats(&self) -> EvolutionStats {
        self.as_dyn().get_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(strategy: &mut Strategy, generations: u32) {
        for _ in 0..generations {
            for i in 0..strategy.population_size() {
                let mut network = strategy.get_network(i).unwrap();
                let out = network.forward(&[0.5, -0.5, 1.0]).to_vec();
                let score = out.iter().map(|v| v + 1.0).sum::<f32>();
                strategy.set_objective(i, Fitness::Objectives([score, 1.0 - out[0], 0.0]));
            }
            strategy.evolve();
        }
    }

    #[test]
    fn test_fitness_views() {
        let objectives = Fitness::from([1.0, 2.0, 3.0]);
        assert!((objectives.scalar() - 6.0).abs() < f32::EPSILON);
        assert_eq!(Fitness::from(4.0).objectives(), [4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_every_strategy_keeps_population_size() {
        let mut configs = vec![
            StrategyConfig::Neat(NeatConfig::default()),
            StrategyConfig::FixedTopology(FixedTopologyConfig::default()),
            StrategyConfig::MapElites(MapElitesConfig::default()),
        ];
        for config in &mut configs {
            config.set_population_size(12);
            config.set_seed(3);
        }
        for config in configs {
            let mut strategy = Strategy::new(config);
            assert_eq!(strategy.population_size(), 12);
            drive(&mut strategy, 3);
            assert_eq!(strategy.population_size(), 12);
            let stats = strategy.get_stats();
            assert_eq!(stats.generation, 3);
            assert!(stats.all_time_best >= stats.best_fitness || stats.best_fitness.is_nan());
            assert!(strategy.get_individual(11).is_some());
            assert!(strategy.get_individual(12).is_none());
        }
    }

    #[test]
    fn test_strategy_config_from_json() {
        let config: StrategyConfig = serde_json::from_str(
            r#"{ "strategy": "fixed_topology", "multi_objective": true, "shape": { "hidden_size": 4 } }"#,
        )
        .unwrap();
        let StrategyConfig::FixedTopology(fixed) = config else {
            panic!("wrong variant");
        };
        assert!(fixed.multi_objective);
        assert_eq!(fixed.shape.hidden_size, 4);
        assert_eq!(fixed.shape.input_size, 3);
    }

    #[test]
    fn test_stats_display() {
        let stats = EvolutionStats {
            generation: 7,
            best_fitness: 12.5,
            ..EvolutionStats::default()
        };
        let line = stats.to_string();
        assert!(line.starts_with("gen    7"));
        assert!(line.contains("12.50"));
    }
}

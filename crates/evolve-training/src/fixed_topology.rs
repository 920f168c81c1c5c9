//! Genetic algorithm over fixed-topology network weights.
//!
//! Every individual is a [`FeedForwardNetwork`] weight vector of the same
//! [`NetworkShape`]; there is no structural mutation. This is the cheap baseline
//! next to NEAT: a well-sized hidden layer often reaches good play sooner than a
//! growing topology does.
//!
//! # Algorithm Overview
//!
//! 1. **Evaluate Fitness** - the caller scores every slot (scalar or objective vector)
//! 2. **Elite Selection** - the best `elite_count` individuals survive unchanged
//! 3. **Tournament Selection** - parents are picked by tournament
//! 4. **Crossover** - two-point crossover with probability `crossover_rate`
//! 5. **Mutation** - per-weight Gaussian noise, clamped
//!
//! # Fitness Modes
//!
//! ## Scalar
//!
//! Elites are the top individuals by fitness and tournaments of `tournament_size`
//! pick the fittest candidate.
//!
//! ## Multi-Objective (NSGA-II)
//!
//! Elites are chosen by [`nsga2::select`] (whole Pareto fronts, then the most
//! isolated members of the overflowing front) and parents by binary tournament on
//! front rank and crowding distance. The scalar fitness is still tracked as the sum
//! of objectives for reporting.

use evolve_network::feedforward::{FeedForwardNetwork, NetworkShape};
use log::info;
use rand::{Rng, SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    nsga2::{self, ObjectiveVector, Ranking},
    strategy::{EvolutionStats, EvolutionStrategy, Fitness, IndividualRef, PolicyNetwork},
    weights,
};

/// Parameters of the fixed-topology genetic algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedTopologyConfig {
    pub population_size: usize,
    pub shape: NetworkShape,
    /// Individuals carried over unchanged each generation.
    pub elite_count: usize,
    pub tournament_size: usize,
    pub crossover_rate: f32,
    /// Probability of perturbing each weight.
    pub mutation_rate: f32,
    /// Standard deviation of the weight perturbation.
    pub mutation_strength: f32,
    pub weight_clamp: f32,
    pub multi_objective: bool,
    pub seed: u64,
}

impl Default for FixedTopologyConfig {
    fn default() -> Self {
        Self {
            population_size: 150,
            shape: NetworkShape::default(),
            elite_count: 10,
            tournament_size: 3,
            crossover_rate: 0.7,
            mutation_rate: 0.1,
            mutation_strength: 0.3,
            weight_clamp: 4.0,
            multi_objective: false,
            seed: 0,
        }
    }
}

/// A single weight vector and its scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    weights: Vec<f32>,
    fitness: f32,
    objectives: ObjectiveVector,
}

impl Individual {
    fn new(weights: Vec<f32>) -> Self {
        Self {
            weights,
            fitness: 0.0,
            objectives: [0.0; 3],
        }
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[must_use]
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    #[must_use]
    pub fn objectives(&self) -> ObjectiveVector {
        self.objectives
    }
}

#[derive(Debug, Clone)]
pub struct FixedTopologyEvolution {
    config: FixedTopologyConfig,
    individuals: Vec<Individual>,
    generation: u32,
    all_time_best: Option<Individual>,
    stats: EvolutionStats,
    rng: Pcg32,
}

impl FixedTopologyEvolution {
    /// Creates a population of randomly initialized weight vectors.
    #[must_use]
    pub fn new(config: FixedTopologyConfig) -> Self {
        let mut rng = Pcg32::seed_from_u64(config.seed);
        let individuals = (0..config.population_size)
            .map(|_| Individual::new(config.shape.random_weights(&mut rng)))
            .collect::<Vec<_>>();
        let stats = EvolutionStats {
            population_size: individuals.len(),
            ..EvolutionStats::default()
        };
        Self {
            individuals,
            generation: 0,
            all_time_best: None,
            stats,
            rng,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &FixedTopologyConfig {
        &self.config
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[must_use]
    pub fn all_time_best(&self) -> Option<&Individual> {
        self.all_time_best.as_ref()
    }

    /// Builds the network of slot `index`.
    #[must_use]
    pub fn get_network(&self, index: usize) -> Option<FeedForwardNetwork> {
        self.individuals
            .get(index)
            .map(|ind| FeedForwardNetwork::from_weights(self.config.shape, &ind.weights))
    }

    pub fn set_fitness(&mut self, index: usize, fitness: f32) {
        self.set_objectives(index, [fitness, 0.0, 0.0]);
    }

    pub fn set_objectives(&mut self, index: usize, objectives: ObjectiveVector) {
        if let Some(ind) = self.individuals.get_mut(index) {
            ind.objectives = objectives;
            ind.fitness = nsga2::scalarize(&objectives);
        }
    }

    /// Puts `weights` into the lowest-fitness slot (ties to the earlier slot) with
    /// its scores cleared. Returns the slot, or `None` for an empty population.
    pub(crate) fn seed_individual(&mut self, weights: Vec<f32>) -> Option<usize> {
        let slot = self
            .individuals
            .iter()
            .enumerate()
            .reduce(|low, ind| if ind.1.fitness < low.1.fitness { ind } else { low })
            .map(|(slot, _)| slot)?;
        self.individuals[slot] = Individual::new(weights);
        Some(slot)
    }

    /// Replaces the population with the next generation.
    pub fn evolve(&mut self) {
        self.record_generation();

        let size = self.individuals.len();
        let elite_count = self.config.elite_count.min(size);
        let mut next = Vec::with_capacity(size);
        if self.config.multi_objective {
            let objectives = self
                .individuals
                .iter()
                .map(Individual::objectives)
                .collect::<Vec<_>>();
            let ranking = Ranking::new(&objectives);
            next.extend(
                nsga2::select(&objectives, elite_count)
                    .into_iter()
                    .map(|i| Individual::new(self.individuals[i].weights.clone())),
            );
            while next.len() < size {
                let (Some(a), Some(b)) = (
                    ranking.tournament_select(&mut self.rng),
                    ranking.tournament_select(&mut self.rng),
                ) else {
                    break;
                };
                next.push(self.breed(a, b));
            }
        } else {
            let mut order = (0..size).collect::<Vec<_>>();
            order.sort_by(|&a, &b| {
                self.individuals[b]
                    .fitness
                    .total_cmp(&self.individuals[a].fitness)
            });
            next.extend(
                order[..elite_count]
                    .iter()
                    .map(|&i| Individual::new(self.individuals[i].weights.clone())),
            );
            while next.len() < size {
                let a = tournament_select(&self.individuals, self.config.tournament_size, &mut self.rng);
                let b = tournament_select(&self.individuals, self.config.tournament_size, &mut self.rng);
                let (Some(a), Some(b)) = (a, b) else {
                    break;
                };
                next.push(self.breed(a, b));
            }
        }

        self.individuals = next;
        self.generation += 1;
        self.stats.generation = self.generation;
        self.stats.population_size = self.individuals.len();
    }

    /// Child of slots `a` and `b`: crossover by rate, then mutation.
    fn breed(&mut self, a: usize, b: usize) -> Individual {
        let crossover_rate = f64::from(self.config.crossover_rate.clamp(0.0, 1.0));
        let mut child = if self.rng.random_bool(crossover_rate) {
            weights::two_point_crossover(
                &self.individuals[a].weights,
                &self.individuals[b].weights,
                &mut self.rng,
            )
        } else {
            self.individuals[a].weights.clone()
        };
        weights::mutate(
            &mut child,
            self.config.mutation_strength,
            self.config.weight_clamp,
            self.config.mutation_rate,
            &mut self.rng,
        );
        Individual::new(child)
    }

    fn record_generation(&mut self) {
        self.stats
            .record_fitness(self.individuals.iter().map(Individual::fitness));
        if self.config.multi_objective {
            let objectives = self
                .individuals
                .iter()
                .map(Individual::objectives)
                .collect::<Vec<_>>();
            self.stats.record_fronts(&objectives);
        }
        let best = self
            .individuals
            .iter()
            .reduce(|best, ind| if ind.fitness > best.fitness { ind } else { best });
        if let Some(best) = best
            && self
                .all_time_best
                .as_ref()
                .is_none_or(|b| best.fitness > b.fitness)
        {
            info!(
                "generation {}: new all-time best fitness {:.2}",
                self.generation, best.fitness
            );
            self.all_time_best = Some(best.clone());
        }
        self.stats.all_time_best = self.all_time_best.as_ref().map_or(0.0, Individual::fitness);
    }
}

impl EvolutionStrategy for FixedTopologyEvolution {
    fn population_size(&self) -> usize {
        self.individuals.len()
    }

    fn set_objective(&mut self, index: usize, fitness: Fitness) {
        self.set_objectives(index, fitness.objectives());
    }

    fn evolve(&mut self) {
        FixedTopologyEvolution::evolve(self);
    }

    fn get_individual(&self, index: usize) -> Option<IndividualRef<'_>> {
        self.individuals
            .get(index)
            .map(|ind| IndividualRef::Weights(&ind.weights))
    }

    fn get_network(&self, index: usize) -> Option<PolicyNetwork> {
        FixedTopologyEvolution::get_network(self, index).map(PolicyNetwork::FeedForward)
    }

    fn get_stats(&self) -> EvolutionStats {
        self.stats.clone()
    }
}

/// Selects an individual using tournament selection.
///
/// Draws `tournament_size` distinct individuals (at least one, at most the whole
/// population) and returns the index of the fittest. `None` for an empty population.
fn tournament_select<R>(population: &[Individual], tournament_size: usize, rng: &mut R) -> Option<usize>
where
    R: Rng + ?Sized,
{
    let indices = (0..population.len()).collect::<Vec<_>>();
    indices
        .choose_multiple(rng, tournament_size.max(1))
        .copied()
        .max_by(|&a, &b| population[a].fitness.total_cmp(&population[b].fitness))
}

//! Evolution managers for game-playing agents.
//!
//! This crate turns the genetic primitives of `evolve-network` into complete
//! training loops. A game simulation (not part of this crate) plays one episode per
//! population slot and reports a scalar fitness or an objective vector; the manager
//! then performs one generation step.
//!
//! # How Training Works
//!
//! 1. **Population** - the manager creates minimal networks (NEAT) or random weight
//!    vectors (fixed topology)
//! 2. **Evaluation** - the caller compiles each slot's network and plays an episode
//! 3. **Scoring** - the caller reports fitness or objectives per slot
//! 4. **Selection** - species and fitness sharing (NEAT), tournaments, or Pareto
//!    ranking (NSGA-II)
//! 5. **Reproduction** - elites, crossover and mutation fill the next generation
//! 6. **Repeat**
//!
//! # Architecture
//!
//! ```text
//! EvolutionStrategy (strategy)
//!   ├── NeatEvolution (neat) ──uses──▶ species, nsga2::Ranking
//!   ├── FixedTopologyEvolution (fixed_topology) ──uses──▶ weights, nsga2
//!   └── MapElitesEvolution (map_elites)
//!
//! NeatEvolution ◀──▶ persistence (population / best genome files)
//!               ◀──▶ migration (island exchange)
//! ```
//!
//! # Modules
//!
//! - [`strategy`] - the common contract and the [`Strategy`](strategy::Strategy) enum
//! - [`neat`] - NEAT generation loop
//! - [`species`] - speciation, fitness sharing, stagnation
//! - [`fixed_topology`] - weight-only genetic algorithm
//! - [`weights`] - weight vector operators
//! - [`nsga2`] - Pareto dominance, sorting, crowding, hypervolume
//! - [`map_elites`] - quality-diversity archive
//! - [`persistence`] - JSON population and best-genome files
//! - [`migration`] - export/import of emigrant genomes
//!
//! # Example
//!
//! ```
//! use evolve_training::neat::{NeatConfig, NeatEvolution};
//!
//! let mut evolution = NeatEvolution::new(NeatConfig {
//!     population_size: 20,
//!     ..NeatConfig::default()
//! });
//! for _generation in 0..3 {
//!     for i in 0..20 {
//!         let mut network = evolution.get_network(i).unwrap();
//!         let action = network.forward(&[0.2, 0.4, 0.6])[0];
//!         evolution.set_fitness(i, action + 1.0);
//!     }
//!     evolution.evolve();
//! }
//! assert_eq!(evolution.generation(), 3);
//! assert_eq!(evolution.population().len(), 20);
//! ```

pub mod fixed_topology;
pub mod map_elites;
pub mod migration;
pub mod neat;
pub mod nsga2;
pub mod persistence;
pub mod species;
pub mod strategy;
pub mod weights;

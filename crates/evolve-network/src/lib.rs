//! Genetic encoding and evaluable networks for evolved game-playing agents.
//!
//! This crate holds the primitives every evolution strategy builds on:
//!
//! - [`innovation`] - [`InnovationTracker`](innovation::InnovationTracker), the
//!   run-wide allocator of innovation numbers and node ids
//! - [`gene`] - node and connection genes
//! - [`genome`] - the variable-topology [`Genome`](genome::Genome) with NEAT
//!   mutation, crossover and compatibility distance
//! - [`network`] - [`NeatNetwork`](network::NeatNetwork), a genome compiled into an
//!   evaluation order for forward passes
//! - [`feedforward`] - [`FeedForwardNetwork`](feedforward::FeedForwardNetwork), the
//!   fixed-topology phenotype used by weight-only evolution
//! - [`config`] - [`GenomeConfig`](config::GenomeConfig) shape and mutation parameters
//!
//! # Architecture
//!
//! ```text
//! InnovationTracker
//!     ↓ numbers genes of
//! Genome  ──mutate / crossover──▶ Genome
//!     ↓ compiled into
//! NeatNetwork
//!     ↓ drives
//! game episode (external) ──▶ fitness / objectives
//! ```
//!
//! The game simulation is not part of this crate. It compiles a network from a
//! genome, runs episodes, and reports scores back to an evolution manager (see the
//! `evolve-training` crate).
//!
//! # Example
//!
//! ```
//! use evolve_network::{
//!     config::GenomeConfig, genome::Genome, innovation::InnovationTracker,
//!     network::NeatNetwork,
//! };
//! use rand::SeedableRng as _;
//!
//! let config = GenomeConfig::default();
//! let mut tracker = InnovationTracker::for_shape(config.input_count, config.output_count);
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//!
//! let mut genome = Genome::create_basic(&config, &mut tracker, &mut rng);
//! genome.mutate_add_node(&mut tracker, &mut rng);
//!
//! let mut network = NeatNetwork::from_genome(&genome, config.allow_recurrent);
//! let actions = network.forward(&[0.1, 0.2, 0.3]);
//! assert_eq!(actions.len(), config.output_count);
//! ```

pub mod config;
pub mod feedforward;
pub mod gene;
pub mod genome;
pub mod innovation;
pub mod network;

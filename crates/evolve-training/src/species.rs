//! Speciation: clustering genomes by compatibility distance.
//!
//! Species protect new topological innovations. A genome that just grew a hidden
//! node usually performs worse than its parents until its weights are tuned; by
//! competing mostly within its own species (fitness sharing) it gets time to do so.
//!
//! # Algorithm
//!
//! 1. Every existing species keeps its representative and empties its member list
//! 2. Each genome, in population order, joins the first species whose representative
//!    is closer than the compatibility threshold, or founds a new species
//! 3. Species left without members are dropped
//! 4. Each surviving species takes its fittest member as the next representative
//!
//! The threshold itself moves one step per generation toward a target species count
//! (see [`adjust_compatibility_threshold`]).

use evolve_network::genome::{DistanceCoefficients, Genome};
use serde::{Deserialize, Serialize};

pub type SpeciesId = u32;

/// Parameters of speciation and of the dynamic compatibility threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciationConfig {
    pub coefficients: DistanceCoefficients,
    /// Initial compatibility threshold.
    pub compatibility_threshold: f32,
    /// Species count the threshold adjustment steers toward.
    pub target_species: usize,
    /// Amount the threshold moves per generation.
    pub threshold_step: f32,
    /// Lower bound of the threshold.
    pub threshold_min: f32,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            coefficients: DistanceCoefficients::default(),
            compatibility_threshold: 1.0,
            target_species: 8,
            threshold_step: 0.1,
            threshold_min: 0.3,
        }
    }
}

/// A cluster of genetically similar genomes.
///
/// The representative is stored independently of the member list, so a species
/// keeps its representative while its members are reassigned.
#[derive(Debug, Clone)]
pub struct Species {
    id: SpeciesId,
    representative: Genome,
    members: Vec<usize>,
    best_fitness: f32,
    generations_without_improvement: u32,
    total_adjusted_fitness: f32,
}

impl Species {
    #[must_use]
    pub fn new(id: SpeciesId, representative: Genome) -> Self {
        Self {
            id,
            representative,
            members: vec![],
            best_fitness: f32::NEG_INFINITY,
            generations_without_improvement: 0,
            total_adjusted_fitness: 0.0,
        }
    }

    #[must_use]
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    #[must_use]
    pub fn representative(&self) -> &Genome {
        &self.representative
    }

    /// Indices into the population of the genomes belonging to this species.
    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Best member fitness seen over the species' lifetime.
    #[must_use]
    pub fn best_fitness(&self) -> f32 {
        self.best_fitness
    }

    #[must_use]
    pub fn generations_without_improvement(&self) -> u32 {
        self.generations_without_improvement
    }

    #[must_use]
    pub fn total_adjusted_fitness(&self) -> f32 {
        self.total_adjusted_fitness
    }

    /// Records this generation's best member fitness.
    ///
    /// A strictly higher value becomes the new best and resets the stagnation
    /// counter to 0; anything else increments it.
    pub fn update_best_fitness(&mut self, fitness: f32) {
        if fitness > self.best_fitness {
            self.best_fitness = fitness;
            self.generations_without_improvement = 0;
        } else {
            self.generations_without_improvement += 1;
        }
    }

    #[must_use]
    pub fn is_stagnant(&self, limit: u32) -> bool {
        self.generations_without_improvement >= limit
    }

    /// Explicit fitness sharing: every member's adjusted fitness becomes
    /// `fitness / species size`.
    pub fn compute_adjusted_fitness(&mut self, population: &mut [Genome]) {
        self.total_adjusted_fitness = 0.0;
        if self.members.is_empty() {
            return;
        }
        #[expect(clippy::cast_precision_loss)]
        let size = self.members.len() as f32;
        for &member in &self.members {
            let genome = &mut population[member];
            let adjusted = genome.fitness() / size;
            genome.set_adjusted_fitness(adjusted);
            self.total_adjusted_fitness += adjusted;
        }
    }

    /// Fittest member, ties resolved toward the earlier slot.
    #[must_use]
    pub fn champion(&self, population: &[Genome]) -> Option<usize> {
        self.members.iter().copied().reduce(|best, candidate| {
            if population[candidate].fitness() > population[best].fitness() {
                candidate
            } else {
                best
            }
        })
    }

    fn refresh_representative(&mut self, population: &[Genome]) {
        if let Some(champion) = self.champion(population) {
            self.representative = population[champion].clone();
        }
    }
}

/// Assigns every genome of `population` to a species.
///
/// Existing species are tested in order; new species get ids from `next_id`.
/// Species without members afterwards are removed, and each survivor's
/// representative becomes its fittest member.
pub fn speciate(
    population: &[Genome],
    species: &mut Vec<Species>,
    config: &SpeciationConfig,
    compatibility_threshold: f32,
    next_id: &mut SpeciesId,
) {
    for s in species.iter_mut() {
        s.members.clear();
    }

    for (index, genome) in population.iter().enumerate() {
        let found = species.iter_mut().find(|s| {
            genome.distance(&s.representative, &config.coefficients) < compatibility_threshold
        });
        match found {
            Some(s) => s.members.push(index),
            None => {
                let mut founded = Species::new(*next_id, genome.clone());
                founded.members.push(index);
                species.push(founded);
                *next_id += 1;
            }
        }
    }

    species.retain(|s| !s.members.is_empty());
    for s in species.iter_mut() {
        s.refresh_representative(population);
    }
}

/// Moves the threshold one step toward `config.target_species`.
///
/// Too few species lowers the threshold (never below `threshold_min`); too many
/// raises it.
#[must_use]
pub fn adjust_compatibility_threshold(
    threshold: f32,
    species_count: usize,
    config: &SpeciationConfig,
) -> f32 {
    match species_count.cmp(&config.target_species) {
        std::cmp::Ordering::Less => (threshold - config.threshold_step).max(config.threshold_min),
        std::cmp::Ordering::Greater => threshold + config.threshold_step,
        std::cmp::Ordering::Equal => threshold,
    }
}

/// Ids of the `count` species with the highest best-ever fitness.
///
/// These are exempt from extinction by stagnation.
#[must_use]
pub fn protected_species(species: &[Species], count: usize) -> Vec<SpeciesId> {
    let mut ranked = species.iter().collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.best_fitness.total_cmp(&a.best_fitness));
    ranked.iter().take(count).map(|s| s.id).collect()
}

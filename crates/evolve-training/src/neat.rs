//! NEAT generation loop.
//!
//! [`NeatEvolution`] owns a fixed-size population of [`Genome`]s, the species they
//! are clustered into, and the run-wide [`InnovationTracker`]. The caller scores
//! every slot, then calls [`NeatEvolution::evolve`] once to produce the next
//! generation.
//!
//! # Generation Step
//!
//! ```text
//! Idle ──set_fitness──▶ Evaluating ──evolve──▶ Speciating ──▶ Reproducing ──▶ Idle
//! ```
//!
//! 1. **Record** - best/mean fitness of the evaluated generation, all-time best
//! 2. **Speciate** - assign genomes to species, move the compatibility threshold
//! 3. **Share fitness** - adjusted fitness = fitness / species size
//! 4. **Cull** - drop stagnant unprotected species and species below the minimum size
//! 5. **Allocate** - offspring slots per species proportional to total adjusted
//!    fitness, remainders by largest fractional part (see [`allocate_offspring`])
//! 6. **Reproduce** - per species, copy the elite fraction unchanged and fill the
//!    rest from the top survival fraction by crossover or cloning, then mutation
//! 7. **Advance** - generation counter, fitness reset, innovation cache reset
//!
//! With `multi_objective` enabled, members within a species are ordered by NSGA-II
//! front rank and crowding distance instead of raw fitness.
//!
//! # Caller Contract
//!
//! Every slot must be scored before [`evolve`](NeatEvolution::evolve). Scoring is
//! not checked; an unscored slot simply keeps fitness 0.

use evolve_network::{
    config::GenomeConfig,
    genome::Genome,
    innovation::{InnovationCounters, InnovationTracker},
    network::NeatNetwork,
};
use log::{debug, info, warn};
use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    nsga2::{self, ObjectiveVector, Ranking},
    species::{self, SpeciationConfig, Species, SpeciesId},
    strategy::{EvolutionStats, EvolutionStrategy, Fitness, IndividualRef, PolicyNetwork},
};

/// Parameters of the NEAT generation loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeatConfig {
    pub population_size: usize,
    pub genome: GenomeConfig,
    pub speciation: SpeciationConfig,
    /// Fraction of each species copied unchanged into the next generation.
    pub elite_fraction: f32,
    /// Fraction of each species (best first) eligible as parents.
    pub survival_fraction: f32,
    /// Probability that an offspring comes from crossover rather than cloning.
    pub crossover_rate: f32,
    /// Species with fewer members are dropped.
    pub min_species_size: usize,
    /// Generations without improvement after which a species is stagnant.
    pub stagnation_limit: u32,
    /// Number of best species exempt from stagnation culling.
    pub protected_species: usize,
    /// Orders species members by NSGA-II rank and crowding instead of raw fitness.
    pub multi_objective: bool,
    pub seed: u64,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            population_size: 150,
            genome: GenomeConfig::default(),
            speciation: SpeciationConfig::default(),
            elite_fraction: 0.1,
            survival_fraction: 0.2,
            crossover_rate: 0.75,
            min_species_size: 2,
            stagnation_limit: 15,
            protected_species: 2,
            multi_objective: false,
            seed: 0,
        }
    }
}

/// Where the manager is in its generation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Evaluating,
    Speciating,
    Reproducing,
}

#[derive(Debug, Clone)]
pub struct NeatEvolution {
    config: NeatConfig,
    population: Vec<Genome>,
    objectives: Vec<ObjectiveVector>,
    species: Vec<Species>,
    tracker: InnovationTracker,
    next_species_id: SpeciesId,
    compatibility_threshold: f32,
    generation: u32,
    best: Option<Genome>,
    all_time_best: Option<Genome>,
    stats: EvolutionStats,
    phase: Phase,
    rng: Pcg32,
}

impl NeatEvolution {
    /// Creates a population of fully-connected minimal genomes.
    #[must_use]
    pub fn new(config: NeatConfig) -> Self {
        let mut rng = Pcg32::seed_from_u64(config.seed);
        let mut tracker =
            InnovationTracker::for_shape(config.genome.input_count, config.genome.output_count);
        let population = (0..config.population_size)
            .map(|_| Genome::create_basic(&config.genome, &mut tracker, &mut rng))
            .collect::<Vec<_>>();
        let stats = EvolutionStats {
            population_size: population.len(),
            ..EvolutionStats::default()
        };
        Self {
            objectives: vec![[0.0; 3]; population.len()],
            species: vec![],
            tracker,
            next_species_id: 0,
            compatibility_threshold: config.speciation.compatibility_threshold,
            generation: 0,
            best: None,
            all_time_best: None,
            stats,
            phase: Phase::Idle,
            rng,
            population,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &NeatConfig {
        &self.config
    }

    #[must_use]
    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    #[must_use]
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    #[must_use]
    pub fn tracker(&self) -> &InnovationTracker {
        &self.tracker
    }

    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn compatibility_threshold(&self) -> f32 {
        self.compatibility_threshold
    }

    /// Best genome of the most recently evaluated generation.
    #[must_use]
    pub fn best(&self) -> Option<&Genome> {
        self.best.as_ref()
    }

    /// Fittest genome ever evaluated. Its fitness never decreases.
    #[must_use]
    pub fn all_time_best(&self) -> Option<&Genome> {
        self.all_time_best.as_ref()
    }

    #[must_use]
    pub fn get_individual(&self, index: usize) -> Option<&Genome> {
        self.population.get(index)
    }

    /// Compiles the genome in slot `index`.
    #[must_use]
    pub fn get_network(&self, index: usize) -> Option<NeatNetwork> {
        self.population
            .get(index)
            .map(|genome| NeatNetwork::from_genome(genome, self.config.genome.allow_recurrent))
    }

    pub fn set_fitness(&mut self, index: usize, fitness: f32) {
        self.set_objectives(index, [fitness, 0.0, 0.0]);
    }

    /// Records an objective vector; the scalar fitness becomes its sum.
    pub fn set_objectives(&mut self, index: usize, objectives: ObjectiveVector) {
        let Some(genome) = self.population.get_mut(index) else {
            return;
        };
        genome.set_fitness(nsga2::scalarize(&objectives));
        self.objectives[index] = objectives;
        self.phase = Phase::Evaluating;
    }

    /// Produces the next generation from the scored current one.
    pub fn evolve(&mut self) {
        let size = self.population.len();
        self.phase = Phase::Speciating;
        self.record_generation();

        if size > 0 {
            species::speciate(
                &self.population,
                &mut self.species,
                &self.config.speciation,
                self.compatibility_threshold,
                &mut self.next_species_id,
            );
            for s in &mut self.species {
                s.compute_adjusted_fitness(&mut self.population);
                if let Some(champion) = s.champion(&self.population) {
                    s.update_best_fitness(self.population[champion].fitness());
                }
            }
            let threshold = species::adjust_compatibility_threshold(
                self.compatibility_threshold,
                self.species.len(),
                &self.config.speciation,
            );
            debug!(
                "generation {}: {} species, threshold {:.2} -> {threshold:.2}",
                self.generation,
                self.species.len(),
                self.compatibility_threshold,
            );
            self.compatibility_threshold = threshold;
            self.cull_species();

            self.phase = Phase::Reproducing;
            let ranking = self
                .config
                .multi_objective
                .then(|| Ranking::new(&self.objectives));
            let totals = self
                .species
                .iter()
                .map(Species::total_adjusted_fitness)
                .collect::<Vec<_>>();
            let allocation = allocate_offspring(&totals, size);
            debug!("offspring allocation: {allocation:?}");

            let reproduction = Reproduction {
                config: &self.config,
                population: &self.population,
                ranking: ranking.as_ref(),
            };
            let mut next = Vec::with_capacity(size);
            for (s, &count) in self.species.iter().zip(&allocation) {
                reproduction.offspring(s.members(), count, &mut self.tracker, &mut self.rng, &mut next);
            }
            debug_assert_eq!(next.len(), size);
            for genome in &mut next {
                genome.reset_fitness();
            }
            self.population = next;
        }

        self.objectives = vec![[0.0; 3]; size];
        self.generation += 1;
        self.tracker.reset_generation_cache();
        self.stats.generation = self.generation;
        self.stats.population_size = size;
        self.stats.species_count = self.species.len();
        self.phase = Phase::Idle;
    }

    /// Replaces the lowest-fitness slot with `immigrant`, even when the immigrant
    /// is worse.
    ///
    /// Returns the replaced slot, or `None` when the population is empty or the
    /// immigrant's input/output shape differs from this population's.
    pub fn inject_immigrant(&mut self, immigrant: Genome) -> Option<usize> {
        self.inject_immigrants(vec![immigrant]).into_iter().next()
    }

    /// Replaces one distinct slot per immigrant, lowest fitness first (ties to the
    /// earlier slot).
    ///
    /// Immigrants with a different input/output shape are skipped, and immigrants
    /// beyond the population size are dropped. The tracker is reseeded past every
    /// injected genome's ids. Returns the replaced slots in injection order.
    pub fn inject_immigrants(&mut self, immigrants: Vec<Genome>) -> Vec<usize> {
        let mut slots = (0..self.population.len()).collect::<Vec<_>>();
        slots.sort_by(|&a, &b| {
            self.population[a]
                .fitness()
                .total_cmp(&self.population[b].fitness())
        });
        let mut free = slots.into_iter();
        let mut replaced = vec![];
        for mut immigrant in immigrants {
            if immigrant.input_count() != self.config.genome.input_count
                || immigrant.output_count() != self.config.genome.output_count
            {
                warn!(
                    "dropping immigrant with shape {}x{}, expected {}x{}",
                    immigrant.input_count(),
                    immigrant.output_count(),
                    self.config.genome.input_count,
                    self.config.genome.output_count,
                );
                continue;
            }
            let Some(slot) = free.next() else {
                break;
            };
            self.tracker
                .reseed_past(immigrant.max_node_id(), immigrant.max_innovation());
            immigrant.reset_fitness();
            self.population[slot] = immigrant;
            self.objectives[slot] = [0.0; 3];
            replaced.push(slot);
        }
        replaced
    }

    /// Raises the innovation counters to at least `counters`.
    pub(crate) fn merge_innovation_counters(&mut self, counters: InnovationCounters) {
        self.tracker.merge_counters(counters);
    }

    /// Swaps in a previously saved population.
    ///
    /// Species, the best genomes and the innovation cache start over. The
    /// compatibility threshold is not saved, so it restarts from its configured
    /// initial value.
    pub(crate) fn restore(
        &mut self,
        population: Vec<Genome>,
        generation: u32,
        counters: InnovationCounters,
    ) {
        self.tracker.merge_counters(counters);
        for genome in &population {
            self.tracker
                .reseed_past(genome.max_node_id(), genome.max_innovation());
        }
        self.tracker.reset_generation_cache();
        self.species.clear();
        self.best = None;
        self.all_time_best = None;
        self.compatibility_threshold = self.config.speciation.compatibility_threshold;
        self.stats.all_time_best = 0.0;
        self.objectives = vec![[0.0; 3]; population.len()];
        self.population = population;
        self.generation = generation;
        self.stats.generation = generation;
        self.stats.population_size = self.population.len();
        self.phase = Phase::Idle;
    }

    fn record_generation(&mut self) {
        self.stats.record_fitness(self.population.iter().map(Genome::fitness));
        if self.config.multi_objective {
            self.stats.record_fronts(&self.objectives);
        }
        let best = self
            .population
            .iter()
            .reduce(|best, g| if g.fitness() > best.fitness() { g } else { best });
        if let Some(best) = best {
            let improved = self
                .all_time_best
                .as_ref()
                .is_none_or(|b| best.fitness() > b.fitness());
            if improved {
                info!(
                    "generation {}: new all-time best fitness {:.2}",
                    self.generation,
                    best.fitness()
                );
                self.all_time_best = Some(best.clone());
            }
            self.best = Some(best.clone());
        }
        self.stats.all_time_best = self.all_time_best.as_ref().map_or(0.0, Genome::fitness);
    }

    /// Drops stagnant unprotected species and undersized species, keeping at least
    /// the species with the best lifetime fitness.
    fn cull_species(&mut self) {
        let protected = species::protected_species(&self.species, self.config.protected_species);
        let limit = self.config.stagnation_limit;
        let min_size = self.config.min_species_size;
        let (kept, dropped): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.species).into_iter().partition(|s| {
                s.len() >= min_size && (protected.contains(&s.id()) || !s.is_stagnant(limit))
            });
        if !dropped.is_empty() {
            debug!("dropped {} species, {} remain", dropped.len(), kept.len());
        }
        self.species = if kept.is_empty() {
            dropped
                .into_iter()
                .max_by(|a, b| a.best_fitness().total_cmp(&b.best_fitness()))
                .into_iter()
                .collect()
        } else {
            kept
        };
    }
}

impl EvolutionStrategy for NeatEvolution {
    fn population_size(&self) -> usize {
        self.population.len()
    }

    fn set_objective(&mut self, index: usize, fitness: Fitness) {
        match fitness {
            Fitness::Scalar(value) => self.set_fitness(index, value),
            Fitness::Objectives(objectives) => self.set_objectives(index, objectives),
        }
    }

    fn evolve(&mut self) {
        NeatEvolution::evolve(self);
    }

    fn get_individual(&self, index: usize) -> Option<IndividualRef<'_>> {
        NeatEvolution::get_individual(self, index).map(IndividualRef::Genome)
    }

    fn get_network(&self, index: usize) -> Option<PolicyNetwork> {
        NeatEvolution::get_network(self, index).map(PolicyNetwork::Neat)
    }

    fn get_stats(&self) -> EvolutionStats {
        self.stats.clone()
    }
}

/// Splits `total` offspring slots across species in proportion to `shares`.
///
/// Each species first gets the floor of its quota; the leftover slots go one each
/// to the largest fractional remainders, ties to the earlier species. Negative and
/// non-finite shares count as 0, and when nothing positive remains every species
/// gets an equal share. The result always sums to `total` when `shares` is
/// non-empty.
///
/// ```
/// use evolve_training::neat::allocate_offspring;
///
/// assert_eq!(allocate_offspring(&[1.0, 1.0, 1.0], 10), vec![4, 3, 3]);
/// assert_eq!(allocate_offspring(&[3.0, 1.0], 10), vec![8, 2]);
/// assert_eq!(allocate_offspring(&[0.0, 0.0], 5), vec![3, 2]);
/// ```
#[must_use]
pub fn allocate_offspring(shares: &[f32], total: usize) -> Vec<usize> {
    if shares.is_empty() {
        return vec![];
    }
    let weights = shares
        .iter()
        .map(|s| if s.is_finite() { s.max(0.0) } else { 0.0 })
        .collect::<Vec<_>>();
    let sum = weights.iter().sum::<f32>();

    #[expect(clippy::cast_precision_loss)]
    let (total_f, count_f) = (total as f32, shares.len() as f32);
    let quotas = if sum > 0.0 && sum.is_finite() {
        weights.iter().map(|w| w / sum * total_f).collect::<Vec<_>>()
    } else {
        vec![total_f / count_f; shares.len()]
    };

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut counts = quotas.iter().map(|q| q.floor() as usize).collect::<Vec<_>>();
    let mut assigned = counts.iter().sum::<usize>();
    while assigned > total {
        if let Some(c) = counts.iter_mut().max() {
            *c -= 1;
        }
        assigned -= 1;
    }

    let mut order = (0..counts.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| quotas[b].fract().total_cmp(&quotas[a].fract()));
    for &i in order.iter().cycle().take(total - assigned) {
        counts[i] += 1;
    }
    counts
}

/// Number of members covered by `fraction` of a species of `len`, rounded up.
fn fraction_of(len: usize, fraction: f32) -> usize {
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let n = (len as f32 * fraction.clamp(0.0, 1.0)).ceil() as usize;
    n.min(len)
}

/// Read-only inputs of one reproduction phase.
struct Reproduction<'a> {
    config: &'a NeatConfig,
    population: &'a [Genome],
    ranking: Option<&'a Ranking>,
}

impl Reproduction<'_> {
    /// Members ordered best first, ties kept in slot order.
    fn ranked(&self, members: &[usize]) -> Vec<usize> {
        let mut ranked = members.to_vec();
        match self.ranking {
            Some(ranking) => ranked.sort_by(|&a, &b| ranking.compare(a, b)),
            None => ranked.sort_by(|&a, &b| {
                self.population[b]
                    .fitness()
                    .total_cmp(&self.population[a].fitness())
            }),
        }
        ranked
    }

    /// Appends `count` offspring of the species made of `members` to `next`.
    fn offspring<R>(
        &self,
        members: &[usize],
        count: usize,
        tracker: &mut InnovationTracker,
        rng: &mut R,
        next: &mut Vec<Genome>,
    ) where
        R: Rng + ?Sized,
    {
        if count == 0 || members.is_empty() {
            return;
        }
        let ranked = self.ranked(members);
        let elites = fraction_of(ranked.len(), self.config.elite_fraction).min(count);
        next.extend(ranked[..elites].iter().map(|&i| self.population[i].clone()));

        let parents = &ranked[..fraction_of(ranked.len(), self.config.survival_fraction).max(1)];
        let crossover_rate = f64::from(self.config.crossover_rate.clamp(0.0, 1.0));
        for _ in elites..count {
            let n = parents.len();
            let a = rng.random_range(0..n);
            let mut child = if n >= 2 && rng.random_bool(crossover_rate) {
                let b = (a + rng.random_range(1..n)) % n;
                Genome::crossover(
                    &self.population[parents[a]],
                    &self.population[parents[b]],
                    &self.config.genome,
                    rng,
                )
            } else {
                self.population[parents[a]].clone()
            };
            child.mutate(&self.config.genome, tracker, rng);
            next.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(population_size: usize) -> NeatConfig {
        NeatConfig {
            population_size,
            seed: 42,
            ..NeatConfig::default()
        }
    }

    /// Rewards networks whose first output tracks the first input.
    fn score_population(evolution: &mut NeatEvolution) {
        for i in 0..evolution.population().len() {
            let mut network = evolution.get_network(i).unwrap();
            let mut score = 0.0;
            for x in [-1.0, -0.5, 0.0, 0.5, 1.0] {
                let out = network.forward(&[x, 0.0, 1.0])[0];
                score += 2.0 - (out - x).abs();
            }
            evolution.set_fitness(i, score);
        }
    }

    #[test]
    fn test_allocate_offspring_sums_to_total() {
        let cases: [&[f32]; 6] = [
            &[1.0],
            &[0.3, 0.3, 0.4],
            &[5.0, 0.0, 0.0, 1e-9],
            &[-3.0, 2.0],
            &[f32::NAN, f32::INFINITY, 1.0],
            &[0.1; 7],
        ];
        for shares in cases {
            for total in [0, 1, 2, 7, 150] {
                let counts = allocate_offspring(shares, total);
                assert_eq!(counts.len(), shares.len());
                assert_eq!(counts.iter().sum::<usize>(), total, "{shares:?} {total}");
            }
        }
        assert!(allocate_offspring(&[], 10).is_empty());
    }

    #[test]
    fn test_allocate_offspring_remainder_goes_to_largest_fraction() {
        // quotas 4.5, 2.0, 1.5: one leftover slot, tie goes to the earlier species
        assert_eq!(allocate_offspring(&[9.0, 4.0, 3.0], 8), vec![5, 2, 1]);
        // quotas 1.25, 1.75
        assert_eq!(allocate_offspring(&[5.0, 7.0], 3), vec![1, 2]);
        // negative share gets nothing
        assert_eq!(allocate_offspring(&[-1.0, 1.0], 4), vec![0, 4]);
    }

    #[test]
    fn test_evolve_keeps_size_and_shape() {
        let mut evolution = NeatEvolution::new(config(30));
        for generation in 0..10 {
            assert_eq!(evolution.generation(), generation);
            score_population(&mut evolution);
            assert_eq!(evolution.phase(), Phase::Evaluating);
            evolution.evolve();
            assert_eq!(evolution.phase(), Phase::Idle);
            assert_eq!(evolution.population().len(), 30);
            assert_eq!(evolution.generation(), generation + 1);
            for genome in evolution.population() {
                assert!(genome.node_count() >= 5);
                assert!(genome.fitness().abs() < f32::EPSILON);
            }
        }
        assert!(!evolution.species().is_empty());
    }

    #[test]
    fn test_all_time_best_never_decreases() {
        let mut evolution = NeatEvolution::new(config(20));
        let mut previous = f32::NEG_INFINITY;
        for _ in 0..15 {
            score_population(&mut evolution);
            evolution.evolve();
            let best = evolution.all_time_best().unwrap().fitness();
            assert!(best >= previous);
            assert!(best >= evolution.best().unwrap().fitness());
            assert!((evolution.get_stats().all_time_best - best).abs() < f32::EPSILON);
            previous = best;
        }
    }

    #[test]
    fn test_degenerate_populations() {
        for (size, elite_fraction) in [(1, 0.1), (2, 0.1), (2, 1.0), (5, 1.0), (3, 0.0)] {
            let mut evolution = NeatEvolution::new(NeatConfig {
                elite_fraction,
                ..config(size)
            });
            for _ in 0..5 {
                // all-zero fitness
                evolution.evolve();
                assert_eq!(evolution.population().len(), size);
            }
        }

        let mut empty = NeatEvolution::new(config(0));
        empty.evolve();
        assert_eq!(empty.generation(), 1);
        assert!(empty.population().is_empty());
    }

    #[test]
    fn test_all_elites_are_copied_unchanged() {
        let mut evolution = NeatEvolution::new(NeatConfig {
            elite_fraction: 1.0,
            min_species_size: 1,
            ..config(6)
        });
        let before = evolution.population().to_vec();
        evolution.evolve();
        // one species holding everyone, so every slot is an elite copy
        if evolution.species().len() == 1 {
            for genome in evolution.population() {
                assert!(before.iter().any(|b| b.connections() == genome.connections()));
            }
        }
    }

    #[test]
    fn test_inject_immigrant_replaces_lowest_fitness() {
        let mut evolution = NeatEvolution::new(config(5));
        for i in 0..5 {
            #[expect(clippy::cast_precision_loss)]
            let fitness = 10.0 - i as f32;
            evolution.set_fitness(i, fitness);
        }
        let immigrant = Genome::empty(3, 2);
        assert_eq!(evolution.inject_immigrant(immigrant.clone()), Some(4));
        assert_eq!(evolution.get_individual(4).unwrap().connection_count(), 0);

        assert_eq!(evolution.inject_immigrant(Genome::empty(4, 2)), None);

        let mut empty = NeatEvolution::new(config(0));
        assert_eq!(empty.inject_immigrant(immigrant), None);
    }

    #[test]
    fn test_inject_immigrants_uses_distinct_slots() {
        let mut evolution = NeatEvolution::new(config(4));
        evolution.set_fitness(0, 5.0);
        evolution.set_fitness(1, 1.0);
        evolution.set_fitness(2, 3.0);
        evolution.set_fitness(3, 1.0);
        let immigrants = vec![Genome::empty(3, 2); 6];
        assert_eq!(evolution.inject_immigrants(immigrants), vec![1, 3, 2, 0]);

        // after evolve every slot scores 0
        evolution.evolve();
        let immigrants = vec![Genome::empty(3, 2), Genome::empty(2, 2), Genome::empty(3, 2)];
        assert_eq!(evolution.inject_immigrants(immigrants), vec![0, 1]);
    }

    #[test]
    fn test_immigrant_ids_are_not_reused() {
        let mut source = NeatEvolution::new(NeatConfig {
            seed: 7,
            ..config(10)
        });
        for _ in 0..5 {
            score_population(&mut source);
            source.evolve();
        }
        let immigrant = source
            .population()
            .iter()
            .max_by_key(|g| g.max_innovation())
            .unwrap()
            .clone();

        let mut target = NeatEvolution::new(config(10));
        target.inject_immigrant(immigrant.clone());
        let counters = target.tracker().counters();
        assert!(counters.next_innovation > immigrant.max_innovation().unwrap());
        assert!(counters.next_node_id > immigrant.max_node_id().unwrap());
    }

    /// Three structurally distinct pairs: no connections, half of them, all of them.
    fn three_pair_population(evolution: &NeatEvolution) -> Vec<Genome> {
        let full = evolution.population()[0].clone();
        let mut record = full.to_record();
        record.connections.truncate(3);
        let half = Genome::from_record(record, 3, 2);
        let none = Genome::empty(3, 2);
        vec![none.clone(), none, half.clone(), half, full.clone(), full]
    }

    #[test]
    fn test_cull_drops_stagnant_unprotected_species() {
        let mut evolution = NeatEvolution::new(NeatConfig {
            stagnation_limit: 1,
            protected_species: 1,
            min_species_size: 1,
            ..config(6)
        });
        evolution.population = three_pair_population(&evolution);
        species::speciate(
            &evolution.population,
            &mut evolution.species,
            &evolution.config.speciation,
            0.3,
            &mut evolution.next_species_id,
        );
        assert_eq!(evolution.species.len(), 3);

        // first two species hold a constant best, the last one keeps improving
        for (s, bests) in evolution
            .species
            .iter_mut()
            .zip([[1.0, 1.0], [3.0, 3.0], [2.0, 2.5]])
        {
            for best in bests {
                s.update_best_fitness(best);
            }
        }
        assert!(evolution.species[0].is_stagnant(1));
        assert!(evolution.species[1].is_stagnant(1));
        assert!(!evolution.species[2].is_stagnant(1));

        let ids = evolution.species.iter().map(Species::id).collect::<Vec<_>>();
        evolution.cull_species();
        let kept = evolution.species.iter().map(Species::id).collect::<Vec<_>>();
        // stagnant but protected (highest best) stays, improving one stays
        assert_eq!(kept, vec![ids[1], ids[2]]);
    }

    #[test]
    fn test_cull_keeps_best_species_when_all_fail() {
        let mut evolution = NeatEvolution::new(NeatConfig {
            stagnation_limit: 1,
            protected_species: 1,
            // every pair is below the minimum size
            min_species_size: 3,
            ..config(6)
        });
        evolution.population = three_pair_population(&evolution);
        species::speciate(
            &evolution.population,
            &mut evolution.species,
            &evolution.config.speciation,
            0.3,
            &mut evolution.next_species_id,
        );
        for (s, best) in evolution.species.iter_mut().zip([1.0, 3.0, 2.0]) {
            s.update_best_fitness(best);
            s.update_best_fitness(best);
        }
        let best_id = evolution.species[1].id();
        evolution.cull_species();
        assert_eq!(evolution.species.len(), 1);
        assert_eq!(evolution.species[0].id(), best_id);
    }

    #[test]
    fn test_stagnation_keeps_population_size() {
        let mut evolution = NeatEvolution::new(NeatConfig {
            stagnation_limit: 1,
            protected_species: 1,
            ..config(6)
        });
        evolution.population = three_pair_population(&evolution);
        for _ in 0..6 {
            // constant scores per slot, so every species stagnates
            for i in 0..6 {
                #[expect(clippy::cast_precision_loss)]
                let fitness = (i / 2) as f32 + 1.0;
                evolution.set_fitness(i, fitness);
            }
            evolution.evolve();
            assert_eq!(evolution.population().len(), 6);
            assert!(!evolution.species().is_empty());
        }
    }

    #[test]
    fn test_restore_starts_run_state_over() {
        let mut evolution = NeatEvolution::new(config(10));
        score_population(&mut evolution);
        evolution.evolve();
        score_population(&mut evolution);
        evolution.evolve();
        assert!(!evolution.species().is_empty());
        assert!(evolution.all_time_best().is_some());

        let cached = evolution.tracker.get_innovation(0, 4);
        let population = evolution.population().to_vec();
        let counters = evolution.tracker().counters();
        evolution.restore(population, 7, counters);

        assert!(evolution.species().is_empty());
        assert!(evolution.best().is_none());
        assert!(evolution.all_time_best().is_none());
        assert_eq!(evolution.generation(), 7);
        assert!(
            (evolution.compatibility_threshold()
                - evolution.config().speciation.compatibility_threshold)
                .abs()
                < f32::EPSILON
        );
        assert!(evolution.tracker.get_innovation(0, 4) > cached);

        score_population(&mut evolution);
        evolution.evolve();
        assert_eq!(evolution.population().len(), 10);
        assert_eq!(evolution.generation(), 8);
    }

    #[test]
    fn test_multi_objective_stats() {
        let mut evolution = NeatEvolution::new(NeatConfig {
            multi_objective: true,
            ..config(12)
        });
        for i in 0..12 {
            #[expect(clippy::cast_precision_loss)]
            let x = i as f32;
            evolution.set_objectives(i, [x, 11.0 - x, 1.0]);
        }
        assert!((evolution.get_individual(3).unwrap().fitness() - 12.0).abs() < 1e-6);
        evolution.evolve();
        let stats = evolution.get_stats();
        assert_eq!(stats.num_fronts, 1);
        assert_eq!(stats.pareto_front_size, 12);
        assert!(stats.hypervolume > 0.0);
        assert_eq!(evolution.population().len(), 12);
    }

    #[test]
    fn test_out_of_range_scores_are_ignored() {
        let mut evolution = NeatEvolution::new(config(3));
        evolution.set_fitness(3, 100.0);
        evolution.set_objectives(99, [1.0; 3]);
        assert!(evolution.get_individual(3).is_none());
        assert!(evolution.get_network(3).is_none());
        assert_eq!(evolution.phase(), Phase::Idle);
    }
}

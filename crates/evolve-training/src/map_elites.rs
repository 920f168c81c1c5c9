//! MAP-Elites quality-diversity search.
//!
//! Instead of one population converging on one strategy, MAP-Elites keeps a grid of
//! elites: each cell covers a region of a 2-D behaviour space and holds the fittest
//! genome seen with that behaviour. New candidates are mutated from sampled elites
//! and compete only with the occupant of the cell they land in.
//!
//! Behaviour descriptors are reported per slot with
//! [`MapElitesEvolution::set_behavior`]; when a slot has none, objectives 1 and 2
//! of its objective vector stand in for it.

use std::collections::BTreeMap;

use evolve_network::{
    config::GenomeConfig,
    genome::Genome,
    innovation::InnovationTracker,
    network::NeatNetwork,
};
use log::{debug, info};
use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    nsga2::{self, ObjectiveVector},
    strategy::{EvolutionStats, EvolutionStrategy, Fitness, IndividualRef, PolicyNetwork},
};

/// How parents are drawn from the archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    Uniform,
    /// Best of `tournament_size` random elites.
    #[default]
    Tournament,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapElitesConfig {
    /// Candidates evaluated per generation.
    pub batch_size: usize,
    pub genome: GenomeConfig,
    /// Cells per behaviour axis.
    pub resolution: usize,
    /// Expected `(min, max)` of each behaviour axis. Values outside are clamped.
    pub behavior_ranges: [(f32, f32); 2],
    pub selection: SelectionMethod,
    pub tournament_size: usize,
    pub crossover_rate: f32,
    pub seed: u64,
}

impl Default for MapElitesConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            genome: GenomeConfig::default(),
            resolution: 10,
            behavior_ranges: [(0.0, 50_000.0); 2],
            selection: SelectionMethod::Tournament,
            tournament_size: 3,
            crossover_rate: 0.3,
            seed: 0,
        }
    }
}

/// An archived genome and where it sits in behaviour space.
#[derive(Debug, Clone, PartialEq)]
pub struct Elite {
    pub genome: Genome,
    pub fitness: f32,
    pub behavior: [f32; 2],
    /// Generation in which this elite was inserted.
    pub generation: u32,
}

/// Grid of elites indexed by discretized behaviour.
#[derive(Debug, Clone)]
pub struct MapElitesArchive {
    cells: BTreeMap<(usize, usize), Elite>,
    resolution: usize,
    ranges: [(f32, f32); 2],
}

impl MapElitesArchive {
    /// Creates an empty `resolution × resolution` grid.
    #[must_use]
    pub fn new(resolution: usize, ranges: [(f32, f32); 2]) -> Self {
        Self {
            cells: BTreeMap::new(),
            resolution: resolution.max(1),
            ranges,
        }
    }

    #[must_use]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    fn axis_index(&self, value: f32, (min, max): (f32, f32)) -> usize {
        let width = max - min;
        if !(width > 0.0 && width.is_finite()) {
            return 0;
        }
        let normalized = ((value - min) / width).clamp(0.0, 1.0);
        #[expect(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let index = (normalized * self.resolution as f32).floor() as usize;
        index.min(self.resolution - 1)
    }

    /// Grid cell of a behaviour descriptor.
    #[must_use]
    pub fn cell_of(&self, behavior: [f32; 2]) -> (usize, usize) {
        (
            self.axis_index(behavior[0], self.ranges[0]),
            self.axis_index(behavior[1], self.ranges[1]),
        )
    }

    /// Inserts `genome` iff its cell is empty or it is strictly fitter than the
    /// current occupant. Returns whether it was inserted.
    pub fn try_insert(
        &mut self,
        genome: Genome,
        fitness: f32,
        behavior: [f32; 2],
        generation: u32,
    ) -> bool {
        let cell = self.cell_of(behavior);
        if self
            .cells
            .get(&cell)
            .is_some_and(|existing| fitness <= existing.fitness)
        {
            return false;
        }
        self.cells.insert(
            cell,
            Elite {
                genome,
                fitness,
                behavior,
                generation,
            },
        );
        true
    }

    #[must_use]
    pub fn get(&self, cell: (usize, usize)) -> Option<&Elite> {
        self.cells.get(&cell)
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn total_cells(&self) -> usize {
        self.resolution * self.resolution
    }

    /// Occupied fraction of the grid.
    #[must_use]
    pub fn coverage(&self) -> f32 {
        #[expect(clippy::cast_precision_loss)]
        let coverage = self.len() as f32 / self.total_cells() as f32;
        coverage
    }

    #[must_use]
    pub fn best_elite(&self) -> Option<&Elite> {
        self.cells
            .values()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    pub fn elites(&self) -> impl Iterator<Item = &Elite> {
        self.cells.values()
    }

    /// Draws one elite for reproduction.
    pub fn sample<R>(
        &self,
        method: SelectionMethod,
        tournament_size: usize,
        rng: &mut R,
    ) -> Option<&Elite>
    where
        R: Rng + ?Sized,
    {
        if self.cells.is_empty() {
            return None;
        }
        let mut draw = || self.cells.values().nth(rng.random_range(0..self.cells.len()));
        match method {
            SelectionMethod::Uniform => draw(),
            SelectionMethod::Tournament => (0..tournament_size.max(1))
                .filter_map(|_| draw())
                .reduce(|best, e| if e.fitness > best.fitness { e } else { best }),
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

/// MAP-Elites as a batch-oriented [`EvolutionStrategy`].
///
/// Each generation evaluates one batch of candidates, files them into the archive,
/// and breeds the next batch from archived elites.
#[derive(Debug, Clone)]
pub struct MapElitesEvolution {
    config: MapElitesConfig,
    archive: MapElitesArchive,
    tracker: InnovationTracker,
    batch: Vec<Genome>,
    objectives: Vec<ObjectiveVector>,
    behaviors: Vec<Option<[f32; 2]>>,
    generation: u32,
    stats: EvolutionStats,
    rng: Pcg32,
}

impl MapElitesEvolution {
    #[must_use]
    pub fn new(config: MapElitesConfig) -> Self {
        let mut rng = Pcg32::seed_from_u64(config.seed);
        let mut tracker =
            InnovationTracker::for_shape(config.genome.input_count, config.genome.output_count);
        let batch = (0..config.batch_size)
            .map(|_| Genome::create_basic(&config.genome, &mut tracker, &mut rng))
            .collect::<Vec<_>>();
        Self {
            archive: MapElitesArchive::new(config.resolution, config.behavior_ranges),
            tracker,
            objectives: vec![[0.0; 3]; batch.len()],
            behaviors: vec![None; batch.len()],
            generation: 0,
            stats: EvolutionStats {
                population_size: batch.len(),
                ..EvolutionStats::default()
            },
            rng,
            batch,
            config,
        }
    }

    #[must_use]
    pub fn archive(&self) -> &MapElitesArchive {
        &self.archive
    }

    #[must_use]
    pub fn batch(&self) -> &[Genome] {
        &self.batch
    }

    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn set_objectives(&mut self, index: usize, objectives: ObjectiveVector) {
        if let Some(genome) = self.batch.get_mut(index) {
            genome.set_fitness(nsga2::scalarize(&objectives));
            self.objectives[index] = objectives;
        }
    }

    /// Overrides the behaviour descriptor of slot `index`.
    pub fn set_behavior(&mut self, index: usize, behavior: [f32; 2]) {
        if let Some(slot) = self.behaviors.get_mut(index) {
            *slot = Some(behavior);
        }
    }

    /// Files the scored batch into the archive and breeds the next one.
    pub fn evolve(&mut self) {
        self.stats.record_fitness(self.batch.iter().map(Genome::fitness));
        let previous_best = self.archive.best_elite().map(|e| e.fitness);

        let batch = std::mem::take(&mut self.batch);
        let mut inserted = 0;
        for ((genome, objectives), behavior) in batch.into_iter().zip(&self.objectives).zip(&self.behaviors) {
            let behavior = behavior.unwrap_or([objectives[1], objectives[2]]);
            let fitness = genome.fitness();
            if self.archive.try_insert(genome, fitness, behavior, self.generation) {
                inserted += 1;
            }
        }
        debug!(
            "generation {}: {inserted} inserted, {} cells occupied ({:.1}%)",
            self.generation,
            self.archive.len(),
            self.archive.coverage() * 100.0
        );
        if let Some(best) = self.archive.best_elite()
            && previous_best.is_none_or(|f| best.fitness > f)
        {
            info!(
                "generation {}: new all-time best fitness {:.2}",
                self.generation, best.fitness
            );
        }

        let size = self.config.batch_size;
        self.batch = (0..size).map(|_| self.breed()).collect();
        self.objectives = vec![[0.0; 3]; size];
        self.behaviors = vec![None; size];
        self.generation += 1;
        self.tracker.reset_generation_cache();

        self.stats.generation = self.generation;
        self.stats.population_size = size;
        self.stats.all_time_best = self.archive.best_elite().map_or(0.0, |e| e.fitness);
    }

    fn breed(&mut self) -> Genome {
        let MapElitesConfig {
            genome: ref genome_config,
            selection,
            tournament_size,
            crossover_rate,
            ..
        } = self.config;
        let Some(parent) = self.archive.sample(selection, tournament_size, &mut self.rng) else {
            return Genome::create_basic(genome_config, &mut self.tracker, &mut self.rng);
        };
        let crossover_rate = f64::from(crossover_rate.clamp(0.0, 1.0));
        let mut child = if self.archive.len() >= 2 && self.rng.random_bool(crossover_rate) {
            match self.archive.sample(SelectionMethod::Uniform, 1, &mut self.rng) {
                Some(mate) => Genome::crossover(&parent.genome, &mate.genome, genome_config, &mut self.rng),
                None => parent.genome.clone(),
            }
        } else {
            parent.genome.clone()
        };
        child.mutate(genome_config, &mut self.tracker, &mut self.rng);
        child.reset_fitness();
        child
    }
}

impl EvolutionStrategy for MapElitesEvolution {
    fn population_size(&self) -> usize {
        self.batch.len()
    }

    fn set_objective(&mut self, index: usize, fitness: Fitness) {
        self.set_objectives(index, fitness.objectives());
    }

    fn evolve(&mut self) {
        MapElitesEvolution::evolve(self);
    }

    fn get_individual(&self, index: usize) -> Option<IndividualRef<'_>> {
        self.batch.get(index).map(IndividualRef::Genome)
    }

    fn get_network(&self, index: usize) -> Option<PolicyNetwork> {
        self.batch.get(index).map(|genome| {
            PolicyNetwork::Neat(NeatNetwork::from_genome(
                genome,
                self.config.genome.allow_recurrent,
            ))
        })
    }

    fn get_stats(&self) -> EvolutionStats {
        self.stats.clone()
    }
}

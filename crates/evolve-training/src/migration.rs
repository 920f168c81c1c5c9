//! Island migration between independently evolving NEAT populations.
//!
//! An island exports its best genomes as a [`MigrationPacket`]; another island
//! with the same input/output shape imports it, which replaces its weakest slots
//! with the immigrants. Moving packets between processes or machines is up to the
//! caller; [`MigrationPacket::save`] and [`MigrationPacket::load`] cover the
//! shared-directory case.
//!
//! Innovation numbers stay meaningful across islands only if both sides draw
//! from compatible counters, so a packet carries the exporter's counters and the
//! importer raises its own past them.

use std::path::Path;

use evolve_network::{
    genome::{Genome, GenomeRecord},
    innovation::InnovationCounters,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    neat::NeatEvolution,
    persistence::{self, PersistenceError},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPacket {
    pub input_count: usize,
    pub output_count: usize,
    pub counters: InnovationCounters,
    #[serde(default)]
    pub source_generation: u32,
    pub genomes: Vec<GenomeRecord>,
}

impl MigrationPacket {
    /// Collects up to `count` emigrants: the all-time best first, then the
    /// current population by descending fitness, without duplicates.
    #[must_use]
    pub fn export(evolution: &NeatEvolution, count: usize) -> Self {
        let mut ranked = evolution.population().iter().collect::<Vec<_>>();
        ranked.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));

        let mut genomes: Vec<GenomeRecord> = Vec::with_capacity(count);
        for genome in evolution.all_time_best().into_iter().chain(ranked) {
            if genomes.len() >= count {
                break;
            }
            let record = genome.to_record();
            if !genomes
                .iter()
                .any(|g| g.nodes == record.nodes && g.connections == record.connections)
            {
                genomes.push(record);
            }
        }

        let genome_config = &evolution.config().genome;
        Self {
            input_count: genome_config.input_count,
            output_count: genome_config.output_count,
            counters: evolution.tracker().counters(),
            source_generation: evolution.generation(),
            genomes,
        }
    }

    /// Injects every emigrant into `evolution`. Returns the replaced slots.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::ShapeMismatch`] without touching `evolution` if
    /// the packet's input/output shape differs.
    pub fn import_into(self, evolution: &mut NeatEvolution) -> Result<Vec<usize>, PersistenceError> {
        let expected = (
            evolution.config().genome.input_count,
            evolution.config().genome.output_count,
        );
        let found = (self.input_count, self.output_count);
        if found != expected {
            return Err(PersistenceError::ShapeMismatch { expected, found });
        }
        evolution.merge_innovation_counters(self.counters);
        let immigrants = self
            .genomes
            .into_iter()
            .map(|record| Genome::from_record(record, found.0, found.1))
            .collect();
        let slots = evolution.inject_immigrants(immigrants);
        info!(
            "imported {} immigrants from generation {}",
            slots.len(),
            self.source_generation
        );
        Ok(slots)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P>(&self, path: P) -> Result<(), PersistenceError>
    where
        P: AsRef<Path>,
    {
        persistence::write_json_atomic(path.as_ref(), self)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P>(path: P) -> Result<Self, PersistenceError>
    where
        P: AsRef<Path>,
    {
        persistence::read_json(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::NeatConfig;

    fn island(seed: u64) -> NeatEvolution {
        let mut evolution = NeatEvolution::new(NeatConfig {
            population_size: 10,
            seed,
            ..NeatConfig::default()
        });
        for _ in 0..3 {
            for i in 0..10 {
                let mut network = evolution.get_network(i).unwrap();
                let score = network.forward(&[1.0, 0.5, -0.5])[0] + 1.0;
                evolution.set_fitness(i, score);
            }
            evolution.evolve();
        }
        evolution
    }

    #[test]
    fn test_export_takes_best_first() {
        let source = island(1);
        let packet = MigrationPacket::export(&source, 3);
        assert!(packet.genomes.len() <= 3);
        assert!(!packet.genomes.is_empty());
        assert_eq!(packet.genomes[0], source.all_time_best().unwrap().to_record());
        assert_eq!(packet.source_generation, 3);
        assert_eq!(packet.counters, source.tracker().counters());
    }

    #[test]
    fn test_import_reseeds_and_replaces() {
        let source = island(1);
        let mut target = island(2);
        let packet = MigrationPacket::export(&source, 3);
        let count = packet.genomes.len();
        let slots = packet.clone().import_into(&mut target).unwrap();
        assert_eq!(slots.len(), count);
        assert_eq!(target.population().len(), 10);
        for (slot, record) in slots.iter().zip(&packet.genomes) {
            assert_eq!(target.population()[*slot].connections(), record.connections.as_slice());
        }
        let counters = target.tracker().counters();
        assert!(counters.next_innovation >= packet.counters.next_innovation);
        assert!(counters.next_node_id >= packet.counters.next_node_id);
    }

    #[test]
    fn test_import_rejects_other_shape() {
        let source = island(3);
        let mut packet = MigrationPacket::export(&source, 2);
        packet.input_count = 7;
        let mut target = island(4);
        let before = target.population().to_vec();
        assert!(matches!(
            packet.import_into(&mut target),
            Err(PersistenceError::ShapeMismatch { .. })
        ));
        assert_eq!(target.population(), before.as_slice());
    }

    #[test]
    fn test_packet_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "evolve-training-{}-migration.json",
            std::process::id()
        ));
        let packet = MigrationPacket::export(&island(5), 4);
        packet.save(&path).unwrap();
        assert_eq!(MigrationPacket::load(&path).unwrap(), packet);
        std::fs::remove_file(&path).unwrap();
    }
}

//! Saving and loading NEAT populations, best genomes and best fixed-topology
//! networks as JSON.
//!
//! Each genome is stored as `{nodes, connections, fitness}` (see
//! [`GenomeRecord`]), which round-trips exactly, including disabled genes and
//! innovation numbers. A population file also carries the generation, the
//! input/output shape and the innovation counters, so a resumed run (or another
//! island) never reuses an id the saved genomes already hold.
//!
//! A fixed-topology champion is stored as its [`NetworkRecord`] (shape plus flat
//! weights, including the context weights when memory is enabled).
//!
//! Writes go to a temporary sibling file that is renamed over the target, so a
//! crash mid-save leaves the previous generation's file intact.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use evolve_network::{
    feedforward::{FeedForwardNetwork, NetworkRecord, NetworkShape},
    genome::{Genome, GenomeRecord},
    innovation::InnovationCounters,
};
use log::{info, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{fixed_topology::FixedTopologyEvolution, neat::NeatEvolution};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PersistenceError {
    #[display("failed to access {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("invalid JSON in {}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("population size mismatch: file holds {found} genomes, population has {expected}")]
    PopulationSizeMismatch { expected: usize, found: usize },
    #[display(
        "network shape mismatch: file is {}x{}, expected {}x{}",
        found.0,
        found.1,
        expected.0,
        expected.1
    )]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[display("network layout mismatch: file is {found:?}, expected {expected:?}")]
    LayoutMismatch {
        expected: NetworkShape,
        found: NetworkShape,
    },
    #[display("weight count mismatch: shape needs {expected}, file holds {found}")]
    WeightCountMismatch { expected: usize, found: usize },
}

/// On-disk form of a whole population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationFile {
    pub generation: u32,
    pub input_count: usize,
    pub output_count: usize,
    pub counters: InnovationCounters,
    pub genomes: Vec<GenomeRecord>,
}

/// On-disk form of a single best genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestGenomeFile {
    pub saved_at: DateTime<Utc>,
    pub generation: u32,
    pub input_count: usize,
    pub output_count: usize,
    pub genome: GenomeRecord,
}

impl BestGenomeFile {
    #[must_use]
    pub fn into_genome(self) -> Genome {
        Genome::from_record(self.genome, self.input_count, self.output_count)
    }
}

/// On-disk form of the best fixed-topology network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestNetworkFile {
    pub saved_at: DateTime<Utc>,
    pub generation: u32,
    pub fitness: f32,
    pub network: NetworkRecord,
}

impl BestNetworkFile {
    #[must_use]
    pub fn into_network(self) -> FeedForwardNetwork {
        self.network.into_network()
    }
}

impl NeatEvolution {
    /// Writes the current population to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_population<P>(&self, path: P) -> Result<(), PersistenceError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let genome_config = &self.config().genome;
        let file = PopulationFile {
            generation: self.generation(),
            input_count: genome_config.input_count,
            output_count: genome_config.output_count,
            counters: self.tracker().counters(),
            genomes: self.population().iter().map(Genome::to_record).collect(),
        };
        write_json_atomic(path, &file)?;
        info!(
            "saved population of {} (generation {}) to {}",
            file.genomes.len(),
            file.generation,
            path.display()
        );
        Ok(())
    }

    /// Replaces the population with the one saved at `path`.
    ///
    /// On any error the manager is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if its input/output
    /// shape differs from this manager's, or if it holds a different number of
    /// genomes than the current population.
    pub fn load_population<P>(&mut self, path: P) -> Result<(), PersistenceError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file: PopulationFile = read_json(path)?;
        let expected = (self.config().genome.input_count, self.config().genome.output_count);
        let found = (file.input_count, file.output_count);
        if found != expected {
            return Err(PersistenceError::ShapeMismatch { expected, found });
        }
        if file.genomes.len() != self.population().len() {
            return Err(PersistenceError::PopulationSizeMismatch {
                expected: self.population().len(),
                found: file.genomes.len(),
            });
        }
        let population = file
            .genomes
            .into_iter()
            .map(|record| Genome::from_record(record, expected.0, expected.1))
            .collect();
        self.restore(population, file.generation, file.counters);
        info!(
            "loaded population (generation {}) from {}",
            file.generation,
            path.display()
        );
        Ok(())
    }

    /// Writes the all-time best genome (or, before any evolution step, the
    /// current fittest) to `path`.
    ///
    /// Returns `false` without writing when there is no genome at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_best<P>(&self, path: P) -> Result<bool, PersistenceError>
    where
        P: AsRef<Path>,
    {
        let best = self.all_time_best().or_else(|| {
            self.population()
                .iter()
                .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
        });
        let Some(best) = best else {
            return Ok(false);
        };
        let path = path.as_ref();
        let file = BestGenomeFile {
            saved_at: Utc::now(),
            generation: self.generation(),
            input_count: self.config().genome.input_count,
            output_count: self.config().genome.output_count,
            genome: best.to_record(),
        };
        write_json_atomic(path, &file)?;
        info!(
            "saved best genome (fitness {:.2}) to {}",
            best.fitness(),
            path.display()
        );
        Ok(true)
    }
}

/// Reads a best-genome file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if its shape differs
/// from `(input_count, output_count)`.
pub fn load_best<P>(
    path: P,
    input_count: usize,
    output_count: usize,
) -> Result<BestGenomeFile, PersistenceError>
where
    P: AsRef<Path>,
{
    let file: BestGenomeFile = read_json(path.as_ref())?;
    let found = (file.input_count, file.output_count);
    if found != (input_count, output_count) {
        return Err(PersistenceError::ShapeMismatch {
            expected: (input_count, output_count),
            found,
        });
    }
    Ok(file)
}

impl FixedTopologyEvolution {
    /// Writes the all-time best network (or, before any evolution step, the
    /// current fittest) to `path`.
    ///
    /// Returns `false` without writing when the population is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_best<P>(&self, path: P) -> Result<bool, PersistenceError>
    where
        P: AsRef<Path>,
    {
        let best = self.all_time_best().or_else(|| {
            self.individuals()
                .iter()
                .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
        });
        let Some(best) = best else {
            return Ok(false);
        };
        let path = path.as_ref();
        let file = BestNetworkFile {
            saved_at: Utc::now(),
            generation: self.generation(),
            fitness: best.fitness(),
            network: NetworkRecord {
                shape: self.config().shape,
                weights: best.weights().to_vec(),
            },
        };
        write_json_atomic(path, &file)?;
        info!(
            "saved best network (fitness {:.2}) to {}",
            best.fitness(),
            path.display()
        );
        Ok(true)
    }

    /// Seeds the lowest-fitness slot with the network saved at `path`.
    ///
    /// Returns the replaced slot, or `None` for an empty population. On any error
    /// the population is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if its layout
    /// differs from this population's shape, or if its weight count does not match
    /// that layout.
    pub fn load_best<P>(&mut self, path: P) -> Result<Option<usize>, PersistenceError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file: BestNetworkFile = read_json(path)?;
        let expected = self.config().shape;
        if file.network.shape != expected {
            return Err(PersistenceError::LayoutMismatch {
                expected,
                found: file.network.shape,
            });
        }
        check_weight_count(&file.network)?;
        let slot = self.seed_individual(file.network.weights);
        info!(
            "loaded best network (generation {}) from {}",
            file.generation,
            path.display()
        );
        Ok(slot)
    }
}

/// Reads a best-network file whose input/output sizes must match.
///
/// The hidden layer size and memory flag are taken from the file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, if its input/output
/// sizes differ from `(input_size, output_size)`, or if its weight count does not
/// match its layout.
pub fn load_best_network<P>(
    path: P,
    input_size: usize,
    output_size: usize,
) -> Result<BestNetworkFile, PersistenceError>
where
    P: AsRef<Path>,
{
    let file: BestNetworkFile = read_json(path.as_ref())?;
    let shape = file.network.shape;
    let found = (shape.input_size, shape.output_size);
    if found != (input_size, output_size) {
        return Err(PersistenceError::ShapeMismatch {
            expected: (input_size, output_size),
            found,
        });
    }
    check_weight_count(&file.network)?;
    Ok(file)
}

fn check_weight_count(record: &NetworkRecord) -> Result<(), PersistenceError> {
    if record.is_complete() {
        Ok(())
    } else {
        Err(PersistenceError::WeightCountMismatch {
            expected: record.shape.weight_count(),
            found: record.weights.len(),
        })
    }
}

/// Serializes one genome as `{nodes, connections, fitness}`.
#[must_use]
pub fn genome_to_json(genome: &Genome) -> String {
    // a record holds only plain numbers, strings and bools
    serde_json::to_string(&genome.to_record()).unwrap_or_default()
}

/// Parses one genome. Malformed or empty input yields a genome holding only the
/// configured input and output nodes.
#[must_use]
pub fn genome_from_json(json: &str, input_count: usize, output_count: usize) -> Genome {
    let record = serde_json::from_str::<GenomeRecord>(json).unwrap_or_else(|e| {
        warn!("malformed genome JSON, using an empty genome: {e}");
        GenomeRecord::default()
    });
    Genome::from_record(record, input_count, output_count)
}

/// Writes `value` as pretty JSON to a temporary sibling of `path`, then renames it
/// over `path`.
pub(crate) fn write_json_atomic<T>(path: &Path, value: &T) -> Result<(), PersistenceError>
where
    T: Serialize,
{
    let io_error = |source| PersistenceError::Io {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let file = File::create(&tmp_path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| PersistenceError::Json {
        path: path.to_owned(),
        source,
    })?;
    writeln!(writer).map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    drop(writer);
    fs::rename(&tmp_path, path).map_err(io_error)
}

pub(crate) fn read_json<T>(path: &Path) -> Result<T, PersistenceError>
where
    T: DeserializeOwned,
{
    let file = File::open(path).map_err(|source| PersistenceError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| PersistenceError::Json {
        path: path.to_owned(),
        source,
    })
}

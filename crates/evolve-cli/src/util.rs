use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use evolve_network::config::GenomeConfig;
use evolve_training::{
    neat::{NeatConfig, NeatEvolution},
    persistence::PopulationFile,
    strategy::StrategyConfig,
};

/// Write `value` as pretty JSON to `path`, or to stdout when no path is given
///
/// # Errors
///
/// Returns error if the file cannot be created or written
pub fn write_json<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    let (mut writer, target): (Box<dyn Write>, String) = match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            (Box::new(BufWriter::new(file)), path.display().to_string())
        }
        None => (Box::new(io::stdout().lock()), "stdout".to_owned()),
    };
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write JSON to {target}"))?;
    writeln!(writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("Failed to finish writing {target}"))?;
    Ok(())
}

fn read_json_file<T>(file_kind: &str, path: &Path) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}

/// Read a strategy configuration from a JSON file
///
/// # Errors
///
/// Returns error if file cannot be opened or parsed
pub fn read_strategy_config_file<P>(path: P) -> anyhow::Result<StrategyConfig>
where
    P: AsRef<Path>,
{
    read_json_file("strategy config", path.as_ref())
}

/// Rebuild a NEAT manager from a saved population file
///
/// The manager is sized and shaped after the file, so any saved population
/// can be loaded without knowing the configuration it was trained with.
///
/// # Errors
///
/// Returns error if file cannot be opened, parsed, or loaded
pub fn read_population_file<P>(path: P) -> anyhow::Result<NeatEvolution>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file: PopulationFile = read_json_file("population", path)?;
    let mut evolution = NeatEvolution::new(NeatConfig {
        population_size: file.genomes.len(),
        genome: GenomeConfig {
            input_count: file.input_count,
            output_count: file.output_count,
            ..GenomeConfig::default()
        },
        ..NeatConfig::default()
    });
    evolution
        .load_population(path)
        .with_context(|| format!("Failed to load population file: {}", path.display()))?;
    Ok(evolution)
}

#[cfg(test)]
mod tests {
    use evolve_training::fixed_topology::FixedTopologyConfig;

    use super::*;

    #[test]
    fn test_strategy_config_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "evolve-cli-{}-strategy.json",
            std::process::id()
        ));
        let config = StrategyConfig::FixedTopology(FixedTopologyConfig {
            population_size: 12,
            ..FixedTopologyConfig::default()
        });
        write_json(&config, Some(&path)).unwrap();
        assert_eq!(read_strategy_config_file(&path).unwrap(), config);
        std::fs::remove_file(&path).unwrap();

        let err = read_strategy_config_file(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to open strategy config file"));
    }
}

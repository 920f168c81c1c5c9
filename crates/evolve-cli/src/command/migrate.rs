use std::path::PathBuf;

use anyhow::Context as _;
use evolve_training::migration::MigrationPacket;

use crate::util;

const EMIGRANT_COUNT: usize = 5;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct MigrateArg {
    /// Population file to take emigrants from
    #[arg(long, required_unless_present = "packet")]
    from: Option<PathBuf>,
    /// Migration packet file; written when --from is given, read otherwise
    #[arg(long)]
    packet: Option<PathBuf>,
    /// Population file receiving the immigrants (rewritten in place)
    #[arg(long)]
    into: Option<PathBuf>,
    /// Number of emigrants to export
    #[arg(long)]
    count: Option<usize>,
}

pub(crate) fn run(arg: &MigrateArg) -> anyhow::Result<()> {
    let MigrateArg {
        from,
        packet: packet_path,
        into,
        count,
    } = arg;

    let packet = match from {
        Some(source_path) => {
            let source = util::read_population_file(source_path)?;
            let packet = MigrationPacket::export(&source, count.unwrap_or(EMIGRANT_COUNT));
            eprintln!(
                "Exported {} genomes from {}",
                packet.genomes.len(),
                source_path.display()
            );
            if let Some(path) = packet_path {
                packet
                    .save(path)
                    .with_context(|| format!("Failed to write migration packet: {}", path.display()))?;
                eprintln!("Migration packet saved to {}", path.display());
            }
            packet
        }
        None => {
            let Some(path) = packet_path else {
                anyhow::bail!("either --from or --packet is required");
            };
            MigrationPacket::load(path)
                .with_context(|| format!("Failed to read migration packet: {}", path.display()))?
        }
    };

    let Some(target_path) = into else {
        return Ok(());
    };
    let mut target = util::read_population_file(target_path)?;
    let slots = packet
        .import_into(&mut target)
        .with_context(|| format!("Failed to import into {}", target_path.display()))?;
    target
        .save_population(target_path)
        .with_context(|| format!("Failed to save population: {}", target_path.display()))?;
    eprintln!(
        "Replaced slots {slots:?} of {}",
        target_path.display()
    );
    Ok(())
}

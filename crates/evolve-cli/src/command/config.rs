use std::path::PathBuf;

use crate::{command::train::StrategyKind, util};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ConfigArg {
    /// Strategy whose defaults to print (neat, fixed, elites)
    #[arg(long, default_value = "neat")]
    strategy: StrategyKind,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ConfigArg) -> anyhow::Result<()> {
    let ConfigArg { strategy, output } = arg;
    util::write_json(&strategy.default_config(), output.as_deref())
}

use std::path::PathBuf;

use stackbot_search::config::BotConfig;

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct DefaultConfigArg {
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &DefaultConfigArg) -> anyhow::Result<()> {
    let DefaultConfigArg { output } = arg;
    util::save_json(&BotConfig::default(), output.clone())
}

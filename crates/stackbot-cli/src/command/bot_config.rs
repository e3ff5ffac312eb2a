use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use stackbot_search::config::{BotConfig, HeuristicTerm};
use tracing::debug;

use crate::util;

/// Bot settings shared by every subcommand that runs the search.
///
/// Values given on the command line override the configuration file, which
/// overrides the defaults.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct BotConfigArg {
    /// Bot configuration file (JSON, see `default-config`)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override one heuristic weight, e.g. `--weight hole-count=-0.6`
    #[arg(long = "weight", value_name = "TERM=VALUE")]
    weights: Vec<WeightOverride>,
    /// Never keep the rightmost column free for four-row clears
    #[arg(long)]
    no_tetris_priority: bool,
    /// Stack height from which tetris priority is suspended
    #[arg(long)]
    normal_play_height: Option<i32>,
    /// Pause after each improvement of the best candidate, in milliseconds
    #[arg(long)]
    best_move_delay_ms: Option<u64>,
    /// Pause between replayed move commands, in milliseconds
    #[arg(long)]
    move_delay_ms: Option<u64>,
}

impl BotConfigArg {
    pub(crate) fn load(&self) -> anyhow::Result<BotConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_config_file(path)?,
            None => BotConfig::default(),
        };
        self.apply_overrides(&mut config);
        debug!(?config, "bot configuration");
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut BotConfig) {
        for WeightOverride { term, value } in &self.weights {
            config.weights.set(*term, *value);
        }
        if self.no_tetris_priority {
            config.tetris_priority.enabled = false;
        }
        if let Some(height) = self.normal_play_height {
            config.tetris_priority.normal_play_height = height;
        }
        if let Some(ms) = self.best_move_delay_ms {
            config.pacing.best_move_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.move_delay_ms {
            config.pacing.move_delay = Duration::from_millis(ms);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WeightOverride {
    term: HeuristicTerm,
    value: f64,
}

impl FromStr for WeightOverride {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (term, value) = s
            .split_once('=')
            .with_context(|| format!("expected TERM=VALUE, got {s:?}"))?;
        let term = term.trim().parse()?;
        let value = value
            .trim()
            .parse()
            .with_context(|| format!("invalid weight value {value:?}"))?;
        Ok(Self { term, value })
    }
}

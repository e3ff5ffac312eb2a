//! Bot configuration: heuristic weights, tetris priority and pacing.
//!
//! Everything the bot can be tuned with lives in one [`BotConfig`] value that
//! is handed to [`MoveSearch::new`](crate::move_search::MoveSearch::new). The
//! record is plain data and round-trips through JSON; missing fields fall back
//! to their defaults.
//!
//! ```
//! use stackbot_search::config::{BotConfig, HeuristicTerm};
//!
//! let mut config: BotConfig = serde_json::from_str(r#"{ "weights": { "hole_count": -1.0 } }"#)?;
//! assert_eq!(config.weights.get(HeuristicTerm::HoleCount), -1.0);
//! assert_eq!(config.weights.get(HeuristicTerm::AggregateHeight), -0.5);
//! assert!(config.tetris_priority.enabled);
//!
//! config.weights.set(HeuristicTerm::WellDepth, 0.0);
//! assert_eq!(config.weights.well_depth, 0.0);
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::{str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::board_metrics::BoardMetrics;

/// Which heuristic terms contribute to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ScoringMode {
    /// Aggregate height, holes, hole weight and unevenness.
    Normal,
    /// The normal terms plus height differential and well depth.
    TetrisPriority,
}

/// Coefficients of the board heuristic. Negative values penalise a term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub aggregate_height: f64,
    pub hole_count: f64,
    pub hole_weight: f64,
    pub unevenness: f64,
    pub height_differential: f64,
    pub well_depth: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            aggregate_height: -0.5,
            hole_count: -0.4,
            hole_weight: -0.005,
            unevenness: -0.2,
            height_differential: -0.005,
            well_depth: -0.002,
        }
    }
}

impl HeuristicWeights {
    #[must_use]
    pub fn get(&self, term: HeuristicTerm) -> f64 {
        match term {
            HeuristicTerm::AggregateHeight => self.aggregate_height,
            HeuristicTerm::HoleCount => self.hole_count,
            HeuristicTerm::HoleWeight => self.hole_weight,
            HeuristicTerm::Unevenness => self.unevenness,
            HeuristicTerm::HeightDifferential => self.height_differential,
            HeuristicTerm::WellDepth => self.well_depth,
        }
    }

    pub fn set(&mut self, term: HeuristicTerm, value: f64) {
        let slot = match term {
            HeuristicTerm::AggregateHeight => &mut self.aggregate_height,
            HeuristicTerm::HoleCount => &mut self.hole_count,
            HeuristicTerm::HoleWeight => &mut self.hole_weight,
            HeuristicTerm::Unevenness => &mut self.unevenness,
            HeuristicTerm::HeightDifferential => &mut self.height_differential,
            HeuristicTerm::WellDepth => &mut self.well_depth,
        };
        *slot = value;
    }

    /// Weighted sum of the terms of `metrics` that `mode` uses.
    #[must_use]
    pub fn score(&self, metrics: &BoardMetrics, mode: ScoringMode) -> f64 {
        let terms = match mode {
            ScoringMode::Normal => &HeuristicTerm::NORMAL[..],
            ScoringMode::TetrisPriority => &HeuristicTerm::ALL[..],
        };
        terms
            .iter()
            .map(|term| f64::from(metrics.get(*term)) * self.get(*term))
            .sum()
    }
}

/// One term of the board heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum HeuristicTerm {
    #[display("aggregate-height")]
    AggregateHeight,
    #[display("hole-count")]
    HoleCount,
    #[display("hole-weight")]
    HoleWeight,
    #[display("unevenness")]
    Unevenness,
    #[display("height-differential")]
    HeightDifferential,
    #[display("well-depth")]
    WellDepth,
}

impl HeuristicTerm {
    pub const ALL: [Self; 6] = [
        Self::AggregateHeight,
        Self::HoleCount,
        Self::HoleWeight,
        Self::Unevenness,
        Self::HeightDifferential,
        Self::WellDepth,
    ];

    /// Terms scored in [`ScoringMode::Normal`].
    pub const NORMAL: [Self; 4] = [
        Self::AggregateHeight,
        Self::HoleCount,
        Self::HoleWeight,
        Self::Unevenness,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown heuristic term {name:?}")]
pub struct ParseHeuristicTermError {
    name: String,
}

impl FromStr for HeuristicTerm {
    type Err = ParseHeuristicTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|term| term.to_string() == s)
            .ok_or_else(|| ParseHeuristicTermError { name: s.to_owned() })
    }
}

/// Settings of the tetris-priority mode.
///
/// While enabled and the stack is lower than `normal_play_height`, the bot
/// keeps the rightmost column free and scores boards with the well terms, so
/// that a straight piece can clear four rows at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetrisPriority {
    pub enabled: bool,
    pub normal_play_height: i32,
}

impl Default for TetrisPriority {
    fn default() -> Self {
        Self {
            enabled: true,
            normal_play_height: 16,
        }
    }
}

/// Delays used when the bot's play is watched.
///
/// Neither affects which move is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Pause after each improvement of the best candidate.
    #[serde(rename = "best_move_delay_ms", with = "millis")]
    pub best_move_delay: Duration,
    /// Pause between the commands that replay a move.
    #[serde(rename = "move_delay_ms", with = "millis")]
    pub move_delay: Duration,
}

impl Pacing {
    pub const NONE: Self = Self {
        best_move_delay: Duration::ZERO,
        move_delay: Duration::ZERO,
    };
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            best_move_delay: Duration::from_millis(100),
            move_delay: Duration::from_millis(20),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Complete configuration of the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub weights: HeuristicWeights,
    pub tetris_priority: TetrisPriority,
    pub pacing: Pacing,
}

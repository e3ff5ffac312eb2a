use std::path::PathBuf;

use serde::Serialize;
use stackbot_engine::{GameState, GameStats, PieceSeed};
use stackbot_search::{
    auto_player::{AutoPlayer, SessionReport},
    config::{BotConfig, Pacing},
    move_search::MoveSearch,
};
use tracing::info;

use super::bot_config::BotConfigArg;
use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Number of games to play
    #[arg(long, default_value_t = 10)]
    games: usize,
    /// Maximum number of pieces per game
    #[arg(long, default_value_t = 1000)]
    turn_limit: usize,
    /// Seed the game seeds are derived from (32 hex characters); random if omitted
    #[arg(long)]
    seed: Option<PieceSeed>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
    #[clap(flatten)]
    bot: BotConfigArg,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    seed: PieceSeed,
    config: BotConfig,
    turn_limit: usize,
    games: Vec<GameReport>,
    total: GameStats,
    topped_out_games: usize,
}

#[derive(Debug, Serialize)]
struct GameReport {
    seed: PieceSeed,
    #[serde(flatten)]
    session: SessionReport,
}

fn play_games(config: BotConfig, seed: PieceSeed, games: usize, turn_limit: usize) -> SimulationReport {
    // pacing only matters when someone watches
    let search_config = BotConfig {
        pacing: Pacing::NONE,
        ..config
    };

    let games: Vec<_> = seed
        .derive_seeds()
        .take(games)
        .enumerate()
        .map(|(i, game_seed)| {
            let game = GameState::with_seed(game_seed);
            let mut player = AutoPlayer::new(MoveSearch::new(search_config), game);
            let session = player.play_session(turn_limit);
            info!(
                game = i,
                seed = %game_seed,
                turns = session.turns,
                lines = session.stats.total_cleared_lines(),
                "game finished"
            );
            GameReport {
                seed: game_seed,
                session,
            }
        })
        .collect();

    let mut total = GameStats::new();
    for game in &games {
        total.merge(&game.session.stats);
    }
    let topped_out_games = games.iter().filter(|game| game.session.topped_out).count();

    SimulationReport {
        seed,
        config,
        turn_limit,
        games,
        total,
        topped_out_games,
    }
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let SimulateArg {
        games,
        turn_limit,
        seed,
        output,
        bot,
    } = arg;

    let config = bot.load()?;
    let seed = (*seed).unwrap_or_else(rand::random);
    info!(%seed, games, turn_limit, "simulating");

    let report = play_games(config, seed, *games, *turn_limit);
    util::save_json(&report, output.clone())
}

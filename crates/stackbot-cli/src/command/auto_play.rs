use std::{path::PathBuf, sync::mpsc};

use anyhow::Context;
use stackbot_engine::{BoardUpdate, GameEvent, GameState, PieceSeed};
use stackbot_search::{
    auto_player::SessionReport,
    move_search::MoveSearch,
    replay,
    worker::{SearchEvent, SearchWorker},
};
use tracing::{debug, info};

use super::bot_config::BotConfigArg;
use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AutoPlayArg {
    /// Maximum number of pieces to play
    #[arg(long, default_value_t = 200)]
    turn_limit: usize,
    /// Piece seed (32 hex characters); random if omitted
    #[arg(long)]
    seed: Option<PieceSeed>,
    /// Print the board to stderr after every piece
    #[arg(long)]
    show_board: bool,
    /// Output file path for the session report
    #[arg(long)]
    output: Option<PathBuf>,
    #[clap(flatten)]
    bot: BotConfigArg,
}

pub(crate) fn run(arg: &AutoPlayArg) -> anyhow::Result<()> {
    let AutoPlayArg {
        turn_limit,
        seed,
        show_board,
        output,
        bot,
    } = arg;

    let config = bot.load()?;
    let seed = (*seed).unwrap_or_else(rand::random);
    info!(%seed, "starting game");

    let mut game = GameState::with_seed(seed);
    let events = game.subscribe();
    let mut worker = SearchWorker::new(MoveSearch::new(config));
    game.start();

    let mut turns = 0;
    while turns < *turn_limit && !game.topped_out() {
        let generation = worker
            .request(&game.snapshot())
            .context("no piece to search for")?;

        let mut best = None;
        while let Some(event) = worker.next_event() {
            match event {
                SearchEvent::Candidate { descriptor, .. } => debug!(
                    generation,
                    rotation = descriptor.rotation(),
                    column = descriptor.column(),
                    score = descriptor.score(),
                    "candidate"
                ),
                SearchEvent::Finished { descriptor, .. } => best = Some(descriptor),
                SearchEvent::Cancelled { .. } => {}
            }
        }
        let best = best.with_context(|| format!("search {generation} ended without a move"))?;

        replay::perform(&mut game, &best, config.pacing.move_delay)
            .context("failed to replay the chosen move")?;
        log_game_events(&events);
        turns += 1;

        if *show_board {
            eprintln!("{}", game.stack());
        }
    }

    let report = SessionReport {
        turns,
        stats: game.stats().clone(),
        topped_out: game.topped_out(),
    };
    info!(
        turns,
        lines = report.stats.total_cleared_lines(),
        topped_out = report.topped_out,
        "game over"
    );
    eprintln!("{}", game.stack());
    util::save_json(&report, output.clone())
}

fn log_game_events(events: &mpsc::Receiver<GameEvent>) {
    for event in events.try_iter() {
        match event {
            GameEvent::BoardUpdated {
                update: BoardUpdate::RowsCleared { count },
                ..
            } if count > 0 => info!(count, "rows cleared"),
            GameEvent::BoardUpdated { .. } => {}
            GameEvent::NewPieceReady(snapshot) => debug!(
                current = ?snapshot.current().and_then(|piece| piece.shape().kind()),
                lookahead = ?snapshot.lookahead().kind(),
                "new piece"
            ),
        }
    }
}

use std::path::PathBuf;

use serde::Serialize;
use stackbot_engine::{PieceKind, Shape};
use stackbot_search::{
    move_search::{MoveDescriptor, MoveSearch},
    tetris_ready::tetris_readiness,
};

use super::bot_config::BotConfigArg;
use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct BestMoveArg {
    /// Board file: rows of `#` and `.`, bottom rows last
    board: PathBuf,
    /// Kind of the piece to place (I, J, L, T, S, Z or O)
    #[arg(long, value_parser = parse_kind)]
    current: PieceKind,
    /// Kind of the piece that follows
    #[arg(long, value_parser = parse_kind)]
    lookahead: PieceKind,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
    #[clap(flatten)]
    bot: BotConfigArg,
}

#[derive(Debug, Serialize)]
struct BestMoveReport {
    current: PieceKind,
    lookahead: PieceKind,
    field_height: i32,
    tetris_readiness: String,
    /// `false` when no placement fits the board.
    found: bool,
    best_move: MoveDescriptor,
}

fn parse_kind(s: &str) -> Result<PieceKind, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => PieceKind::from_char(c),
        _ => None,
    }
    .ok_or_else(|| format!("unknown piece kind {s:?}, expected one of I, J, L, T, S, Z, O"))
}

pub(crate) fn run(arg: &BestMoveArg) -> anyhow::Result<()> {
    let BestMoveArg {
        board,
        current,
        lookahead,
        output,
        bot,
    } = arg;

    let config = bot.load()?;
    let board = util::read_board_file(board)?;
    let search = MoveSearch::new(config);
    let best_move = search.search(
        &board,
        &Shape::canonical(*current),
        &Shape::canonical(*lookahead),
    );

    let report = BestMoveReport {
        current: *current,
        lookahead: *lookahead,
        field_height: board.field_height(),
        tetris_readiness: tetris_readiness(&board).to_string(),
        found: !best_move.is_fallback(),
        best_move,
    };
    util::save_json(&report, output.clone())
}

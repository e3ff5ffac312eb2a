//! Synchronous bot play: search, replay, repeat.

use serde::{Deserialize, Serialize};
use stackbot_engine::{GameState, GameStats, InactivePieceError};
use tracing::{debug, info};

use crate::{
    move_search::{MoveDescriptor, MoveSearch},
    replay,
};

/// What one turn did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub descriptor: MoveDescriptor,
    pub cleared: usize,
}

/// Summary of a session played by [`AutoPlayer::play_session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub turns: usize,
    pub stats: GameStats,
    /// Whether the session ended because the stack reached the hidden rows.
    pub topped_out: bool,
}

/// Plays a [`GameState`] with a [`MoveSearch`], one piece per turn.
///
/// Moves are replayed with the search's
/// [`move_delay`](crate::config::Pacing::move_delay) between commands.
///
/// # Example
///
/// ```
/// use stackbot_engine::{GameState, PieceBag, PieceSeed};
/// use stackbot_search::{
///     auto_player::AutoPlayer,
///     config::{BotConfig, Pacing},
///     move_search::MoveSearch,
/// };
///
/// let config = BotConfig {
///     pacing: Pacing::NONE,
///     ..BotConfig::default()
/// };
/// let game = GameState::with_seed(PieceSeed::from_bytes([7; 16]));
/// let mut player = AutoPlayer::new(MoveSearch::new(config), game);
///
/// let report = player.play_session(10);
/// assert_eq!(report.turns, 10);
/// assert_eq!(report.stats.pieces_placed(), 10);
/// ```
#[derive(Debug)]
pub struct AutoPlayer {
    search: MoveSearch,
    game: GameState,
}

impl AutoPlayer {
    /// Starts `game` if it has not been started yet.
    #[must_use]
    pub fn new(search: MoveSearch, mut game: GameState) -> Self {
        game.start();
        Self { search, game }
    }

    #[must_use]
    pub fn game(&self) -> &GameState {
        &self.game
    }

    #[must_use]
    pub fn into_game(self) -> GameState {
        self.game
    }

    /// Searches the current position and plays the best move.
    pub fn play_turn(&mut self) -> Result<TurnOutcome, InactivePieceError> {
        let descriptor = self
            .search
            .search_snapshot(&self.game.snapshot())
            .ok_or(InactivePieceError)?;
        let move_delay = self.search.config().pacing.move_delay;
        let cleared = replay::perform(&mut self.game, &descriptor, move_delay)?;
        debug!(
            rotation = descriptor.rotation(),
            column = descriptor.column(),
            cleared,
            "turn played"
        );
        Ok(TurnOutcome {
            descriptor,
            cleared,
        })
    }

    /// Plays until `turn_limit` pieces have been placed or the stack tops out.
    pub fn play_session(&mut self, turn_limit: usize) -> SessionReport {
        let mut turns = 0;
        while turns < turn_limit && !self.game.topped_out() {
            if self.play_turn().is_err() {
                break;
            }
            turns += 1;
        }

        let report = SessionReport {
            turns,
            stats: self.game.stats().clone(),
            topped_out: self.game.topped_out(),
        };
        info!(
            turns,
            lines = report.stats.total_cleared_lines(),
            topped_out = report.topped_out,
            "session finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use stackbot_engine::{BitGrid, PieceBag, PieceCycle, PieceKind, PieceSeed, PlacementPhase};

    use super::*;
    use crate::config::{BotConfig, Pacing};

    fn search() -> MoveSearch {
        MoveSearch::new(BotConfig {
            pacing: Pacing::NONE,
            ..BotConfig::default()
        })
    }

    #[test]
    fn test_play_turn_places_one_piece() {
        let mut player = AutoPlayer::new(search(), GameState::new(PieceCycle::new([PieceKind::O])));
        assert_eq!(player.game().phase(), PlacementPhase::Previewing);

        let outcome = player.play_turn().unwrap();
        assert_eq!(outcome.cleared, 0);
        assert_eq!(player.game().stats().pieces_placed(), 1);
        assert_eq!(player.game().stack().occupied_cells().count(), 4);
        assert_eq!(player.game().phase(), PlacementPhase::Previewing);
    }

    #[test]
    fn test_session_clears_lines() {
        let game = GameState::new(PieceBag::with_seed(PieceSeed::from_bytes([1; 16])));
        let mut player = AutoPlayer::new(search(), game);
        let report = player.play_session(100);

        assert_eq!(report.turns, 100);
        assert!(!report.topped_out);
        assert_eq!(report.stats.pieces_placed(), 100);
        assert!(report.stats.total_cleared_lines() > 0);
        assert_eq!(report.stats, *player.game().stats());
    }

    #[test]
    fn test_session_stops_when_topped_out() {
        let mut board = BitGrid::board();
        for row in 2..22 {
            for col in 0..10 {
                if col != row % 10 {
                    board.set(row, col, true);
                }
            }
        }
        let game = GameState::with_board(board, PieceCycle::new([PieceKind::T, PieceKind::Z]));
        let mut player = AutoPlayer::new(search(), game);
        let report = player.play_session(50);

        assert!(report.topped_out);
        assert!(report.turns < 50);
        assert_eq!(report.stats.pieces_placed(), report.turns);
    }

    #[test]
    fn test_report_json() {
        let report = SessionReport {
            turns: 3,
            stats: GameStats::new(),
            topped_out: false,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["turns"], 3);
        assert_eq!(json["stats"]["pieces_placed"], 0);
        assert_eq!(json["topped_out"], false);
    }
}

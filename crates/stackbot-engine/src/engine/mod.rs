//! Placement state machine and its collaborators.
//!
//! - [`GameState`] - board, previewed piece, lookahead piece and row-clear counters
//! - [`GameEvent`] - notifications published to [`GameState::subscribe`] receivers
//! - [`GameStats`] - pieces placed and rows cleared
//! - [`PieceSource`] - where pieces come from; [`PieceBag`] is the shuffled
//!   7-bag and [`PieceCycle`] a fixed repeating list
//!
//! # Game Flow
//!
//! 1. Create a [`GameState`] from a piece source (the lookahead piece is drawn)
//! 2. [`GameState::start`] previews the first piece at the top of the board
//! 3. Rotate and translate the previewed piece
//! 4. [`GameState::drop_piece`] locks it, clears full rows and previews the next piece
//! 5. Repeat from 3; the caller decides when to stop

pub use self::{events::*, game_state::*, game_stats::*, piece_bag::*};

mod events;
mod game_state;
mod game_stats;
mod piece_bag;

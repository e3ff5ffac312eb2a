//! Placement bot for stackbot games.
//!
//! - [`move_search`] - exhaustive search over the current and lookahead piece
//! - [`board_metrics`] and [`tetris_ready`] - what a board is scored on
//! - [`config`] - weights, tetris priority and pacing, as one JSON-friendly record
//! - [`replay`] - turning a chosen move into game commands
//! - [`worker`] - cancellable background search streaming its progress
//! - [`auto_player`] - synchronous search-and-replay loop

pub mod auto_player;
pub mod board_metrics;
pub mod config;
pub mod move_search;
pub mod replay;
pub mod tetris_ready;
pub mod worker;

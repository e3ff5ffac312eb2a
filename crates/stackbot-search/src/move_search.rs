//! Exhaustive placement search with one piece of lookahead.
//!
//! For every distinct orientation and every column of the current piece, the
//! lookahead piece is tried in every orientation and column on top of it. Each
//! resulting board has its full rows cleared and is scored with
//! [`HeuristicWeights::score`]. The best combination wins; ties keep the
//! first one found in exploration order (current rotation, current column,
//! lookahead rotation, lookahead column, all ascending).
//!
//! # Tetris Priority
//!
//! With [`TetrisPriority::enabled`](crate::config::TetrisPriority::enabled):
//!
//! - a straight piece on a [`Ready`](TetrisReadiness::Ready) board is stood
//!   upright against the right wall without searching
//! - otherwise, while the stack is lower than
//!   [`normal_play_height`](crate::config::TetrisPriority::normal_play_height)
//!   and the board is not [`Disqualified`](TetrisReadiness::Disqualified),
//!   the rightmost column is kept free and boards are scored in
//!   [`ScoringMode::TetrisPriority`]
//!
//! # Example
//!
//! ```
//! use stackbot_engine::{BitGrid, PieceKind, Shape};
//! use stackbot_search::{config::BotConfig, move_search::MoveSearch};
//!
//! let board = BitGrid::board_from_ascii("#########.")?;
//! let search = MoveSearch::new(BotConfig::default());
//! let best = search.search(
//!     &board,
//!     &Shape::canonical(PieceKind::I),
//!     &Shape::canonical(PieceKind::T),
//! );
//!
//! // stand the bar up in the free column
//! assert_eq!(best.rotation(), 1);
//! assert_eq!(best.column(), 7);
//! # Ok::<(), stackbot_engine::ParseGridError>(())
//! ```

use std::ops::{ControlFlow, RangeInclusive};

use serde::Serialize;
use stackbot_engine::{BitGrid, GameSnapshot, Shape};
use tracing::{debug, trace};

use crate::{
    board_metrics::BoardMetrics,
    config::{BotConfig, ScoringMode},
    tetris_ready::{TetrisReadiness, tetris_readiness},
};

/// Where a piece ends up: orientation (quarter turns clockwise from the
/// orientation it was given in), buffer column and resting row.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub rotation: u8,
    pub column: i32,
    pub row: i32,
}

/// Result of a search.
///
/// The default value (rotation 0, column 0, score [`f64::MIN`]) is returned
/// when no placement could be evaluated at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoveDescriptor {
    placement: Placement,
    lookahead: Option<Placement>,
    score: f64,
}

impl Default for MoveDescriptor {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            lookahead: None,
            score: f64::MIN,
        }
    }
}

impl MoveDescriptor {
    #[must_use]
    pub fn new(placement: Placement, lookahead: Option<Placement>, score: f64) -> Self {
        Self {
            placement,
            lookahead,
            score,
        }
    }

    #[must_use]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Placement of the lookahead piece the score was computed with.
    ///
    /// `None` for the default descriptor and for moves chosen without a search.
    #[must_use]
    pub fn lookahead(&self) -> Option<Placement> {
        self.lookahead
    }

    #[must_use]
    pub fn rotation(&self) -> u8 {
        self.placement.rotation
    }

    #[must_use]
    pub fn column(&self) -> i32 {
        self.placement.column
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Checks if this is the fallback returned when nothing was evaluated.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        *self == Self::default()
    }
}

/// Receives the progress of a search.
pub trait SearchObserver {
    /// Called each time the best candidate improves. Returning
    /// [`ControlFlow::Break`] ends the search with this candidate.
    fn on_candidate(&mut self, candidate: &MoveDescriptor) -> ControlFlow<()>;

    /// Polled before each evaluation; `true` ends the search with the best
    /// candidate so far.
    fn should_stop(&self) -> bool {
        false
    }
}

impl SearchObserver for () {
    fn on_candidate(&mut self, _candidate: &MoveDescriptor) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl SearchObserver for Vec<MoveDescriptor> {
    fn on_candidate(&mut self, candidate: &MoveDescriptor) -> ControlFlow<()> {
        self.push(*candidate);
        ControlFlow::Continue(())
    }
}

/// Columns where the buffer of `shape` can sit with all of its blocks inside
/// a board `board_width` wide, optionally keeping the rightmost column free.
#[must_use]
pub fn column_range(
    board_width: usize,
    shape: &Shape,
    reserve_last_column: bool,
) -> RangeInclusive<i32> {
    let width = i32::try_from(board_width).unwrap_or(i32::MAX);
    let right_margin = if reserve_last_column { 2 } else { 1 };
    -shape.leftmost_occupied_column()..=width - shape.rightmost_occupied_column() - right_margin
}

/// Drops `shape` into `board` at `column` and returns the row it rests on.
pub fn place(board: &mut BitGrid, shape: &Shape, column: i32) -> i32 {
    let row = shape.resting_row(board, column);
    board.insert_overlay(shape.cells(), row, column);
    row
}

#[derive(Debug, Clone, Copy)]
struct Strategy {
    mode: ScoringMode,
    reserve_last_column: bool,
}

#[derive(Debug, Clone)]
pub struct MoveSearch {
    config: BotConfig,
}

impl MoveSearch {
    #[must_use]
    pub fn new(config: BotConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Finds the best placement of `current` on `board`, which must not
    /// contain the current piece itself.
    #[must_use]
    pub fn search(&self, board: &BitGrid, current: &Shape, lookahead: &Shape) -> MoveDescriptor {
        self.search_with(board, current, lookahead, &mut ())
    }

    /// Searches the position of a running game, ignoring the previewed piece
    /// on its board. Returns `None` when no piece is being previewed.
    #[must_use]
    pub fn search_snapshot(&self, snapshot: &GameSnapshot) -> Option<MoveDescriptor> {
        let current = snapshot.current()?;
        Some(self.search(&snapshot.stack(), current.shape(), snapshot.lookahead()))
    }

    /// Like [`search`](Self::search), reporting every improvement to `observer`.
    pub fn search_with<O>(
        &self,
        board: &BitGrid,
        current: &Shape,
        lookahead: &Shape,
        observer: &mut O,
    ) -> MoveDescriptor
    where
        O: SearchObserver + ?Sized,
    {
        let priority = self.config.tetris_priority;
        let mut strategy = Strategy {
            mode: ScoringMode::Normal,
            reserve_last_column: false,
        };

        if priority.enabled {
            let readiness = tetris_readiness(board);
            if readiness.is_ready()
                && current.is_straight()
                && let Some(best) = self.upright_in_last_column(board, current)
            {
                debug!(column = best.column(), score = best.score, "tetris ready");
                let _ = observer.on_candidate(&best);
                return best;
            }
            if board.field_height() < priority.normal_play_height
                && readiness != TetrisReadiness::Disqualified
            {
                strategy = Strategy {
                    mode: ScoringMode::TetrisPriority,
                    reserve_last_column: true,
                };
            }
        }

        let best = self.explore(board, current, lookahead, strategy, observer);
        debug!(
            rotation = best.rotation(),
            column = best.column(),
            score = best.score,
            mode = ?strategy.mode,
            "search finished"
        );
        best
    }

    fn score(&self, board: &BitGrid, mode: ScoringMode) -> f64 {
        self.config
            .weights
            .score(&BoardMetrics::from_board(board), mode)
    }

    fn upright_in_last_column(&self, board: &BitGrid, bar: &Shape) -> Option<MoveDescriptor> {
        let (rotation, upright) = bar
            .rotations()
            .into_iter()
            .enumerate()
            .find(|(_, shape)| shape.leftmost_occupied_column() == shape.rightmost_occupied_column())?;
        let width = i32::try_from(board.width()).unwrap_or(i32::MAX);
        let column = width - upright.leftmost_occupied_column() - 1;

        let mut after = board.clone();
        let row = place(&mut after, &upright, column);
        after.clear_full_rows();
        Some(MoveDescriptor {
            placement: Placement {
                rotation: u8::try_from(rotation).unwrap_or(0),
                column,
                row,
            },
            lookahead: None,
            score: self.score(&after, ScoringMode::TetrisPriority),
        })
    }

    fn explore<O>(
        &self,
        board: &BitGrid,
        current: &Shape,
        lookahead: &Shape,
        strategy: Strategy,
        observer: &mut O,
    ) -> MoveDescriptor
    where
        O: SearchObserver + ?Sized,
    {
        let width = board.width();
        let lookahead_rotations = lookahead.rotations();
        let mut best = MoveDescriptor::default();

        for (rotation, shape) in (0..).zip(current.rotations()) {
            for column in column_range(width, &shape, strategy.reserve_last_column) {
                let mut placed = board.clone();
                let row = place(&mut placed, &shape, column);

                for (la_rotation, la_shape) in (0..).zip(&lookahead_rotations) {
                    for la_column in column_range(width, la_shape, strategy.reserve_last_column) {
                        if observer.should_stop() {
                            debug!("search stopped");
                            return best;
                        }

                        let mut after = placed.clone();
                        let la_row = place(&mut after, la_shape, la_column);
                        after.clear_full_rows();
                        let score = self.score(&after, strategy.mode);
                        if score <= best.score {
                            continue;
                        }

                        best = MoveDescriptor {
                            placement: Placement {
                                rotation,
                                column,
                                row,
                            },
                            lookahead: Some(Placement {
                                rotation: la_rotation,
                                column: la_column,
                                row: la_row,
                            }),
                            score,
                        };
                        trace!(rotation, column, la_rotation, la_column, score, "new best");
                        if observer.on_candidate(&best).is_break() {
                            return best;
                        }
                    }
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg32;
    use stackbot_engine::{BOARD_HEIGHT, BOARD_WIDTH, GameState, PieceCycle, PieceKind};

    use super::*;
    use crate::config::{HeuristicWeights, TetrisPriority};

    fn config(tetris_priority: bool) -> BotConfig {
        BotConfig {
            tetris_priority: TetrisPriority {
                enabled: tetris_priority,
                ..TetrisPriority::default()
            },
            ..BotConfig::default()
        }
    }

    fn random_board(rng: &mut Pcg32) -> BitGrid {
        let mut board = BitGrid::board();
        for col in 0..10 {
            let height = rng.random_range(0..8);
            for row in (22 - height)..22 {
                if rng.random_bool(0.85) {
                    board.set(row, col, true);
                }
            }
        }
        board
    }

    fn placed_cells(board_width: usize, shape: &Shape, column: i32) -> Vec<i32> {
        shape
            .cells()
            .occupied_cells()
            .map(|(_, x)| x + column)
            .filter(|x| *x >= 0 && *x < i32::try_from(board_width).unwrap())
            .collect()
    }

    #[test]
    fn test_column_range() {
        let o = Shape::canonical(PieceKind::O);
        assert_eq!(column_range(BOARD_WIDTH, &o, false), 0..=8);
        assert_eq!(column_range(BOARD_WIDTH, &o, true), 0..=7);

        let mut bar = Shape::canonical(PieceKind::I);
        assert_eq!(column_range(BOARD_WIDTH, &bar, false), 0..=6);
        bar.rotate_90();
        assert_eq!(column_range(BOARD_WIDTH, &bar, false), -2..=7);
        assert_eq!(column_range(BOARD_WIDTH, &bar, true), -2..=6);
    }

    #[test]
    fn test_place() {
        let mut board = BitGrid::board();
        let o = Shape::canonical(PieceKind::O);
        assert_eq!(place(&mut board, &o, 4), 20);
        assert_eq!(place(&mut board, &o, 4), 18);
        let cells: Vec<_> = board.occupied_cells().collect();
        assert_eq!(cells.len(), 8);
        assert!(cells.iter().all(|(row, col)| *row >= 18 && (4..=5).contains(col)));
        assert_eq!(board.clear_full_rows(), 0);
    }

    #[test]
    fn test_tetris_ready_short_circuit() {
        let board = BitGrid::board_from_ascii("#########.").unwrap();
        let search = MoveSearch::new(config(true));
        let mut seen = vec![];
        let best = search.search_with(
            &board,
            &Shape::canonical(PieceKind::I),
            &Shape::canonical(PieceKind::O),
            &mut seen,
        );

        assert_eq!(
            best.placement(),
            Placement {
                rotation: 1,
                column: 7,
                row: 18
            }
        );
        assert_eq!(best.lookahead(), None);
        // one row cleared, three bar cells left in column 9
        assert!((best.score() - (-0.5 * 3.0 - 0.2 * 2.0)).abs() < 1e-9);
        assert_eq!(seen, [best]);
    }

    #[test]
    fn test_short_circuit_needs_priority_and_bar() {
        let board = BitGrid::board_from_ascii("#########.").unwrap();

        let best = MoveSearch::new(config(false)).search(
            &board,
            &Shape::canonical(PieceKind::I),
            &Shape::canonical(PieceKind::O),
        );
        assert!(best.lookahead().is_some());

        let best = MoveSearch::new(config(true)).search(
            &board,
            &Shape::canonical(PieceKind::T),
            &Shape::canonical(PieceKind::O),
        );
        assert!(best.lookahead().is_some());
    }

    #[test]
    fn test_priority_keeps_last_column_free() {
        let search = MoveSearch::new(config(true));
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..20 {
            // solid columns: no overhangs, rightmost column empty
            let mut board = BitGrid::board();
            for col in 0..9 {
                for row in (22 - rng.random_range(0..6))..22 {
                    board.set(row, col, true);
                }
            }
            if !tetris_readiness(&board).is_not_ready() {
                continue;
            }
            let current = Shape::canonical(PieceKind::ALL[rng.random_range(0..7)]);
            let best = search.search(&board, &current, &Shape::canonical(PieceKind::L));
            let shape = &current.rotations()[usize::from(best.rotation())];
            assert!(
                placed_cells(BOARD_WIDTH, shape, best.column())
                    .iter()
                    .all(|col| *col < 9)
            );
        }
    }

    #[test]
    fn test_high_stack_uses_last_column() {
        let mut board = BitGrid::board();
        for row in 4..22 {
            for col in 0..9 {
                if (row + col) % 9 != 0 {
                    board.set(row, col, true);
                }
            }
        }
        assert!(board.field_height() >= 16);
        let best = MoveSearch::new(config(true)).search(
            &board,
            &Shape::canonical(PieceKind::I),
            &Shape::canonical(PieceKind::I),
        );
        // the bar goes down the free column once priority play is off
        assert_eq!(best.rotation(), 1);
        assert_eq!(best.column(), 7);
    }

    #[test]
    fn test_returned_score_is_maximal() {
        let weights = HeuristicWeights::default();
        let search = MoveSearch::new(config(false));
        let mut rng = Pcg32::seed_from_u64(0x5eed);

        for _ in 0..10 {
            let board = random_board(&mut rng);
            let current = Shape::canonical(PieceKind::ALL[rng.random_range(0..7)]);
            let lookahead = Shape::canonical(PieceKind::ALL[rng.random_range(0..7)]);
            let best = search.search(&board, &current, &lookahead);

            let mut max = f64::MIN;
            for shape in current.rotations() {
                for column in column_range(BOARD_WIDTH, &shape, false) {
                    let mut placed = board.clone();
                    place(&mut placed, &shape, column);
                    for la_shape in lookahead.rotations() {
                        for la_column in column_range(BOARD_WIDTH, &la_shape, false) {
                            let mut after = placed.clone();
                            place(&mut after, &la_shape, la_column);
                            after.clear_full_rows();
                            let metrics = BoardMetrics::from_board(&after);
                            let score = weights.score(&metrics, ScoringMode::Normal);
                            assert!(best.score() >= score);
                            max = max.max(score);
                        }
                    }
                }
            }
            assert_eq!(best.score(), max);
        }
    }

    #[test]
    fn test_placements_stay_inside_board() {
        let mut rng = Pcg32::seed_from_u64(42);
        for tetris_priority in [false, true] {
            let search = MoveSearch::new(config(tetris_priority));
            for _ in 0..20 {
                let board = random_board(&mut rng);
                for kind in PieceKind::ALL {
                    let current = Shape::canonical(kind);
                    let best = search.search(&board, &current, &Shape::canonical(PieceKind::S));
                    let shape = &current.rotations()[usize::from(best.rotation())];
                    assert_eq!(
                        placed_cells(BOARD_WIDTH, shape, best.column()).len(),
                        4,
                        "{kind} at {}",
                        best.column()
                    );
                }
            }
        }
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let mut config = config(false);
        config.weights = HeuristicWeights {
            aggregate_height: 0.0,
            hole_count: 0.0,
            hole_weight: 0.0,
            unevenness: 0.0,
            height_differential: 0.0,
            well_depth: 0.0,
        };
        let mut seen = vec![];
        let best = MoveSearch::new(config).search_with(
            &BitGrid::board(),
            &Shape::canonical(PieceKind::I),
            &Shape::canonical(PieceKind::T),
            &mut seen,
        );
        assert_eq!(
            best.placement(),
            Placement {
                rotation: 0,
                column: 0,
                row: 20
            }
        );
        assert_eq!(
            best.lookahead(),
            Some(Placement {
                rotation: 0,
                column: 0,
                row: 19
            })
        );
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_improvements_are_reported_in_order() {
        let mut rng = Pcg32::seed_from_u64(3);
        let board = random_board(&mut rng);
        let mut seen = vec![];
        let best = MoveSearch::new(config(true)).search_with(
            &board,
            &Shape::canonical(PieceKind::T),
            &Shape::canonical(PieceKind::Z),
            &mut seen,
        );
        assert_eq!(seen.last(), Some(&best));
        assert!(seen.windows(2).all(|w| w[0].score() < w[1].score()));
    }

    #[test]
    fn test_observer_can_stop_search() {
        struct First(Option<MoveDescriptor>);
        impl SearchObserver for First {
            fn on_candidate(&mut self, candidate: &MoveDescriptor) -> ControlFlow<()> {
                self.0 = Some(*candidate);
                ControlFlow::Break(())
            }
        }

        struct Stopped;
        impl SearchObserver for Stopped {
            fn on_candidate(&mut self, _: &MoveDescriptor) -> ControlFlow<()> {
                ControlFlow::Continue(())
            }
            fn should_stop(&self) -> bool {
                true
            }
        }

        let search = MoveSearch::new(config(false));
        let board = BitGrid::board();
        let (current, lookahead) = (
            Shape::canonical(PieceKind::L),
            Shape::canonical(PieceKind::J),
        );

        let mut first = First(None);
        let best = search.search_with(&board, &current, &lookahead, &mut first);
        assert_eq!(first.0, Some(best));
        assert_eq!((best.rotation(), best.column()), (0, 0));

        let best = search.search_with(&board, &current, &lookahead, &mut Stopped);
        assert!(best.is_fallback());
    }

    #[test]
    fn test_no_columns_returns_fallback() {
        let board = BitGrid::new(1, BOARD_HEIGHT);
        let best = MoveSearch::new(config(true)).search(
            &board,
            &Shape::canonical(PieceKind::I),
            &Shape::canonical(PieceKind::I),
        );
        assert!(best.is_fallback());
        assert_eq!(best.score(), f64::MIN);
    }

    #[test]
    fn test_search_snapshot_ignores_preview() {
        let mut game = GameState::new(PieceCycle::new([PieceKind::S, PieceKind::T]));
        let search = MoveSearch::new(config(true));
        assert_eq!(search.search_snapshot(&game.snapshot()), None);

        game.start();
        let snapshot = game.snapshot();
        let from_snapshot = search.search_snapshot(&snapshot).unwrap();
        let direct = search.search(
            &BitGrid::board(),
            &Shape::canonical(PieceKind::S),
            &Shape::canonical(PieceKind::T),
        );
        assert_eq!(from_snapshot, direct);
    }
}

use std::{fmt, mem, sync::mpsc};

use tracing::debug;

use crate::{
    InactivePieceError,
    core::{
        bit_grid::{BitGrid, HIDDEN_ROWS, signed},
        shape::Shape,
    },
};

use super::{
    events::{BoardUpdate, GameEvent},
    game_stats::GameStats,
    piece_bag::{PieceBag, PieceSeed, PieceSource},
};

/// Stage of the current placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum PlacementPhase {
    /// The game has not shown a piece yet.
    Spawned,
    /// A piece is overlaid on the board and accepts commands.
    Previewing,
    /// The piece has been merged into the stack; the next one is not shown yet.
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

impl RotationDirection {
    /// `+1` for clockwise, `-1` for counter-clockwise.
    #[must_use]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

/// The piece being previewed and the board position of its buffer's top-left
/// corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePiece {
    shape: Shape,
    row: i32,
    column: i32,
}

impl ActivePiece {
    /// Places `shape` at the top of a board of `board_width` columns: its
    /// topmost block on row 0, its buffer centred horizontally.
    #[must_use]
    pub fn spawn(shape: Shape, board_width: usize) -> Self {
        let row = -shape.top_occupied_row();
        let column = (signed(board_width) - signed(shape.size())) / 2;
        Self { shape, row, column }
    }

    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[must_use]
    pub fn row(&self) -> i32 {
        self.row
    }

    #[must_use]
    pub fn column(&self) -> i32 {
        self.column
    }
}

/// Immutable copy of the observable game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    board: BitGrid,
    stack: BitGrid,
    current: Option<ActivePiece>,
    lookahead: Shape,
    phase: PlacementPhase,
}

impl GameSnapshot {
    /// Board as displayed, with the previewed piece overlaid.
    #[must_use]
    pub fn board(&self) -> &BitGrid {
        &self.board
    }

    #[must_use]
    pub fn current(&self) -> Option<&ActivePiece> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn lookahead(&self) -> &Shape {
        &self.lookahead
    }

    #[must_use]
    pub fn phase(&self) -> PlacementPhase {
        self.phase
    }

    /// Board without the previewed piece.
    #[must_use]
    pub fn stack(&self) -> BitGrid {
        self.stack.clone()
    }
}

/// The placement state machine.
///
/// A game starts in [`PlacementPhase::Spawned`] with only the lookahead piece
/// drawn. [`start`](Self::start) promotes it to the board and from then on
/// every [`drop_piece`](Self::drop_piece) locks the current piece, clears full
/// rows and previews the next one. There is no game-over state: callers
/// decide when a stack is too high (see [`topped_out`](Self::topped_out)).
///
/// While a piece is previewed it is overlaid on the displayed board, which is
/// rebuilt from the locked stack after every change. Commands move it without
/// collision checks; cells pushed outside the board are clipped, and cells
/// overlapping the stack never touch it.
///
/// # Example
///
/// ```
/// use stackbot_engine::{GameState, PieceCycle, PieceKind, PlacementPhase};
///
/// let mut game = GameState::new(PieceCycle::new([PieceKind::O]));
/// assert_eq!(game.phase(), PlacementPhase::Spawned);
///
/// game.start();
/// game.translate(-4)?;
/// let cleared = game.drop_piece()?;
///
/// assert_eq!(cleared, 0);
/// assert!(game.stack().get(21, 0));
/// assert_eq!(game.stats().pieces_placed(), 1);
/// # Ok::<(), stackbot_engine::InactivePieceError>(())
/// ```
pub struct GameState {
    stack: BitGrid,
    board: BitGrid,
    phase: PlacementPhase,
    current: Option<ActivePiece>,
    lookahead: Shape,
    source: Box<dyn PieceSource + Send>,
    lines_cleared: usize,
    stats: GameStats,
    subscribers: Vec<mpsc::Sender<GameEvent>>,
}

impl fmt::Debug for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameState")
            .field("stack", &self.stack)
            .field("phase", &self.phase)
            .field("current", &self.current)
            .field("lookahead", &self.lookahead)
            .field("lines_cleared", &self.lines_cleared)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(PieceBag::new())
    }
}

impl GameState {
    #[must_use]
    pub fn new<S>(source: S) -> Self
    where
        S: PieceSource + Send + 'static,
    {
        Self::with_board(BitGrid::board(), source)
    }

    /// Starts a game on a standard board with a seeded [`PieceBag`].
    #[must_use]
    pub fn with_seed(seed: PieceSeed) -> Self {
        Self::new(PieceBag::with_seed(seed))
    }

    /// Starts a game on a prepared board.
    #[must_use]
    pub fn with_board<S>(board: BitGrid, source: S) -> Self
    where
        S: PieceSource + Send + 'static,
    {
        let mut source: Box<dyn PieceSource + Send> = Box::new(source);
        let lookahead = source.next_piece();
        Self {
            board: board.clone(),
            stack: board,
            phase: PlacementPhase::Spawned,
            current: None,
            lookahead,
            source,
            lines_cleared: 0,
            stats: GameStats::new(),
            subscribers: vec![],
        }
    }

    /// Board as displayed, with the previewed piece overlaid.
    #[must_use]
    pub fn board(&self) -> &BitGrid {
        &self.board
    }

    /// Board without the previewed piece.
    #[must_use]
    pub fn stack(&self) -> BitGrid {
        self.stack.clone()
    }

    #[must_use]
    pub fn phase(&self) -> PlacementPhase {
        self.phase
    }

    #[must_use]
    pub fn current(&self) -> Option<&ActivePiece> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn lookahead(&self) -> &Shape {
        &self.lookahead
    }

    /// Total rows cleared since the game started.
    #[must_use]
    pub fn lines_cleared(&self) -> usize {
        self.lines_cleared
    }

    #[must_use]
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    /// Checks if the stack reaches into the hidden rows at the top of the
    /// board.
    #[must_use]
    pub fn topped_out(&self) -> bool {
        (0..signed(HIDDEN_ROWS)).any(|row| !self.stack.row_empty(row))
    }

    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            board: self.board.clone(),
            stack: self.stack.clone(),
            current: self.current.clone(),
            lookahead: self.lookahead.clone(),
            phase: self.phase,
        }
    }

    /// Registers a new subscriber.
    ///
    /// Events are sent to every live receiver; receivers that have been
    /// dropped are forgotten on the next event.
    pub fn subscribe(&mut self) -> mpsc::Receiver<GameEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish<F>(&mut self, event: F)
    where
        F: FnOnce(GameSnapshot) -> GameEvent,
    {
        if self.subscribers.is_empty() {
            return;
        }
        let event = event(self.snapshot());
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn publish_board(&mut self, update: BoardUpdate) {
        self.publish(|snapshot| GameEvent::BoardUpdated { update, snapshot });
    }

    /// Shows the first piece. Does nothing once the game has started.
    pub fn start(&mut self) {
        if self.phase.is_spawned() {
            self.preview_next_piece();
        }
    }

    /// Overlays `shape` at its spawn position and makes it the current piece,
    /// replacing any piece already previewed.
    pub fn spawn_preview(&mut self, shape: Shape) {
        self.current = Some(ActivePiece::spawn(shape, self.stack.width()));
        self.render();
        self.phase = PlacementPhase::Previewing;
        self.publish_board(BoardUpdate::Preview);
    }

    /// Rebuilds the displayed board: the stack with the current piece on top.
    fn render(&mut self) {
        self.board.clone_from(&self.stack);
        if let Some(piece) = &self.current {
            self.board
                .insert_overlay(piece.shape.cells(), piece.row, piece.column);
        }
    }

    fn preview_next_piece(&mut self) {
        let next = mem::replace(&mut self.lookahead, self.source.next_piece());
        self.spawn_preview(next);
        self.publish(GameEvent::NewPieceReady);
    }

    fn move_preview<F>(&mut self, f: F) -> Result<(), InactivePieceError>
    where
        F: FnOnce(&mut ActivePiece),
    {
        if !self.phase.is_previewing() {
            return Err(InactivePieceError);
        }
        let piece = self.current.as_mut().ok_or(InactivePieceError)?;
        f(piece);
        self.render();
        self.publish_board(BoardUpdate::Preview);
        Ok(())
    }

    /// Turns the current piece a quarter turn and lifts it back to the top of
    /// the board, keeping its column.
    pub fn rotate(&mut self, direction: RotationDirection) -> Result<(), InactivePieceError> {
        self.move_preview(|piece| {
            match direction {
                RotationDirection::Clockwise => piece.shape.rotate_90(),
                RotationDirection::CounterClockwise => piece.shape.rotate_270(),
            }
            piece.row = -piece.shape.top_occupied_row();
        })
    }

    /// Shifts the current piece `amount` columns to the right (left if negative).
    pub fn translate(&mut self, amount: i32) -> Result<(), InactivePieceError> {
        self.move_preview(|piece| piece.column += amount)
    }

    /// Drops the current piece onto the stack, clears full rows and previews
    /// the next piece. Returns the number of rows cleared.
    pub fn drop_piece(&mut self) -> Result<usize, InactivePieceError> {
        if !self.phase.is_previewing() {
            return Err(InactivePieceError);
        }
        let mut piece = self.current.take().ok_or(InactivePieceError)?;

        piece.row = piece.shape.resting_row(&self.stack, piece.column);
        self.stack
            .insert_overlay(piece.shape.cells(), piece.row, piece.column);
        self.phase = PlacementPhase::Locked;
        self.render();
        self.publish_board(BoardUpdate::Landed);

        let cleared = self.stack.clear_full_rows();
        self.lines_cleared += cleared;
        self.stats.record_lock(cleared);
        self.render();
        self.publish_board(BoardUpdate::RowsCleared { count: cleared });
        debug!(
            kind = ?piece.shape.kind(),
            row = piece.row,
            column = piece.column,
            cleared,
            "piece locked"
        );

        self.preview_next_piece();
        Ok(cleared)
    }
}

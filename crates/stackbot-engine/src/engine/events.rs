use super::game_state::GameSnapshot;

/// What changed on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum BoardUpdate {
    /// The previewed piece was placed, moved or rotated.
    Preview,
    /// The piece was merged into the stack, before any rows were cleared.
    Landed,
    /// Full rows were removed after a landing (`count` may be 0).
    RowsCleared { count: usize },
}

/// Notification published by a [`GameState`](crate::GameState) to its subscribers.
///
/// Every event carries a snapshot taken right after the change, so a
/// subscriber never has to read the live state.
#[derive(Debug, Clone)]
pub enum GameEvent {
    BoardUpdated {
        update: BoardUpdate,
        snapshot: GameSnapshot,
    },
    NewPieceReady(GameSnapshot),
}

impl GameEvent {
    #[must_use]
    pub fn snapshot(&self) -> &GameSnapshot {
        match self {
            Self::BoardUpdated { snapshot, .. } | Self::NewPieceReady(snapshot) => snapshot,
        }
    }
}

use stackbot_engine::BitGrid;

/// How far a board is from a four-row clear down the rightmost column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum TetrisReadiness {
    /// The rightmost column is free and the rest of the bottom rows are solid.
    #[display("ready")]
    Ready,
    #[display("not ready")]
    NotReady,
    /// The rightmost column is blocked, or the stack has an overhang.
    #[display("disqualified")]
    Disqualified,
}

impl TetrisReadiness {
    /// Numeric code: 0 ready, 1 not ready, 2 disqualified.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Ready => 0,
            Self::NotReady => 1,
            Self::Disqualified => 2,
        }
    }
}

/// Classifies `board` for the tetris-priority mode.
///
/// The board is [`Ready`](TetrisReadiness::Ready) when the rightmost column is
/// empty and every other column is filled from the floor up, either for
/// 1 to 3 rows with nothing above them, or for at least 4 rows. Any block in
/// the rightmost column, and any block sitting over an empty cell of the
/// stack, makes it [`Disqualified`](TetrisReadiness::Disqualified).
///
/// ```
/// use stackbot_engine::BitGrid;
/// use stackbot_search::tetris_ready::{TetrisReadiness, tetris_readiness};
///
/// let board = BitGrid::board_from_ascii("#########.")?;
/// assert_eq!(tetris_readiness(&board), TetrisReadiness::Ready);
///
/// let board = BitGrid::board_from_ascii("##.......#")?;
/// assert_eq!(tetris_readiness(&board).code(), 2);
/// # Ok::<(), stackbot_engine::ParseGridError>(())
/// ```
#[must_use]
pub fn tetris_readiness(board: &BitGrid) -> TetrisReadiness {
    let height = i32::try_from(board.height()).unwrap_or(i32::MAX);
    let last = i32::try_from(board.width()).unwrap_or(i32::MAX) - 1;
    if board.highest_occupied_row(last) != height {
        return TetrisReadiness::Disqualified;
    }

    let mut solid_rows = 0;
    let mut only_solid_rows = true;
    for row in (0..height).rev() {
        let mut filled = true;
        let mut empty = true;
        for col in 0..last {
            let occupied = board.get(row, col);
            if occupied && row + 1 < height && !board.get(row + 1, col) {
                return TetrisReadiness::Disqualified;
            }
            filled &= occupied;
            empty &= !occupied;
        }
        if empty {
            break;
        }
        if only_solid_rows && filled {
            solid_rows += 1;
        } else {
            only_solid_rows = false;
        }
    }

    if solid_rows >= 4 || (solid_rows > 0 && only_solid_rows) {
        TetrisReadiness::Ready
    } else {
        TetrisReadiness::NotReady
    }
}

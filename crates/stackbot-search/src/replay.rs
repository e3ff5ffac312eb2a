//! Turning a chosen move into game commands.
//!
//! A [`MoveDescriptor`] says where the piece should end up; [`plan`] lists the
//! rotations, unit shifts and final drop that get it there from its spawn
//! position, and [`perform`] plays them on a [`GameState`], pausing between
//! commands so that the moves can be watched.

use std::{thread, time::Duration};

use stackbot_engine::{GameState, InactivePieceError, RotationDirection};
use tracing::trace;

use crate::move_search::MoveDescriptor;

/// One input to a [`GameState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum MoveCommand {
    Rotate(RotationDirection),
    /// Shift by this many columns, positive to the right.
    Translate(i32),
    Drop,
}

impl MoveCommand {
    /// Applies the command. Returns the number of rows cleared by a drop, and
    /// 0 for other commands.
    pub fn apply(self, game: &mut GameState) -> Result<usize, InactivePieceError> {
        match self {
            Self::Rotate(direction) => game.rotate(direction).map(|()| 0),
            Self::Translate(amount) => game.translate(amount).map(|()| 0),
            Self::Drop => game.drop_piece(),
        }
    }
}

/// Commands that move a piece in its spawn orientation from `current_column`
/// to the placement of `descriptor` and drop it.
///
/// Three quarter turns are made as a single counter-clockwise turn, and the
/// shift is split into single-column steps.
#[must_use]
pub fn plan(descriptor: &MoveDescriptor, current_column: i32) -> Vec<MoveCommand> {
    let rotations: &[RotationDirection] = match descriptor.rotation() % 4 {
        0 => &[],
        1 => &[RotationDirection::Clockwise],
        2 => &[RotationDirection::Clockwise, RotationDirection::Clockwise],
        _ => &[RotationDirection::CounterClockwise],
    };
    let shift = descriptor.column() - current_column;
    let step = shift.signum();

    rotations
        .iter()
        .copied()
        .map(MoveCommand::Rotate)
        .chain((0..shift.abs()).map(|_| MoveCommand::Translate(step)))
        .chain([MoveCommand::Drop])
        .collect()
}

/// Plays `descriptor` on `game` and returns the number of rows the drop cleared.
///
/// `move_delay` is slept after every command but the drop.
pub fn perform(
    game: &mut GameState,
    descriptor: &MoveDescriptor,
    move_delay: Duration,
) -> Result<usize, InactivePieceError> {
    let current_column = game.current().ok_or(InactivePieceError)?.column();
    let mut cleared = 0;
    for command in plan(descriptor, current_column) {
        trace!(?command, "replaying");
        cleared = command.apply(game)?;
        if !command.is_drop() && !move_delay.is_zero() {
            thread::sleep(move_delay);
        }
    }
    Ok(cleared)
}

#[cfg(test)]
mod tests {
    use stackbot_engine::{BitGrid, PieceCycle, PieceKind, PlacementPhase, Shape};

    use super::*;
    use crate::move_search::{Placement, place};

    fn descriptor(rotation: u8, column: i32) -> MoveDescriptor {
        MoveDescriptor::new(
            Placement {
                rotation,
                column,
                row: 0,
            },
            None,
            0.0,
        )
    }

    #[test]
    fn test_plan_rotations() {
        use MoveCommand::{Drop, Rotate};
        use RotationDirection::{Clockwise, CounterClockwise};

        assert_eq!(plan(&descriptor(0, 3), 3), [Drop]);
        assert_eq!(plan(&descriptor(1, 3), 3), [Rotate(Clockwise), Drop]);
        assert_eq!(
            plan(&descriptor(2, 3), 3),
            [Rotate(Clockwise), Rotate(Clockwise), Drop]
        );
        assert_eq!(
            plan(&descriptor(3, 3), 3),
            [Rotate(CounterClockwise), Drop]
        );
    }

    #[test]
    fn test_plan_translation() {
        use MoveCommand::{Drop, Translate};

        assert_eq!(
            plan(&descriptor(0, 5), 3),
            [Translate(1), Translate(1), Drop]
        );
        assert_eq!(
            plan(&descriptor(0, -1), 2),
            [Translate(-1), Translate(-1), Translate(-1), Drop]
        );
    }

    #[test]
    fn test_perform_reaches_placement() {
        for kind in PieceKind::ALL {
            let shape = Shape::canonical(kind);
            for (rotation, rotated) in (0..).zip(shape.rotations()) {
                let column = -rotated.leftmost_occupied_column();

                let mut game = GameState::new(PieceCycle::new([kind]));
                game.start();
                let cleared = perform(&mut game, &descriptor(rotation, column), Duration::ZERO)
                    .unwrap();
                assert_eq!(cleared, 0);

                let mut expected = BitGrid::board();
                place(&mut expected, &rotated, column);
                assert_eq!(game.stack(), expected, "{kind} rotated {rotation}");
                assert_eq!(game.phase(), PlacementPhase::Previewing);
            }
        }
    }

    #[test]
    fn test_perform_reports_cleared_rows() {
        let board = BitGrid::board_from_ascii("######..##").unwrap();
        let mut game = GameState::with_board(board, PieceCycle::new([PieceKind::O]));
        game.start();
        let cleared = perform(&mut game, &descriptor(0, 6), Duration::ZERO).unwrap();
        assert_eq!(cleared, 1);
        assert_eq!(game.lines_cleared(), 1);
    }

    #[test]
    fn test_perform_needs_active_piece() {
        let mut game = GameState::new(PieceCycle::new([PieceKind::T]));
        assert_eq!(
            perform(&mut game, &descriptor(0, 0), Duration::ZERO),
            Err(InactivePieceError)
        );
    }
}

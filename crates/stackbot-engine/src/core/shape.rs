use std::fmt;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::bit_grid::{BitGrid, signed};

/// One of the seven standard tetromino kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
pub enum PieceKind {
    I,
    J,
    L,
    T,
    S,
    Z,
    O,
}

impl PieceKind {
    pub const LEN: usize = 7;
    pub const ALL: [Self; Self::LEN] = [
        Self::I,
        Self::J,
        Self::L,
        Self::T,
        Self::S,
        Self::Z,
        Self::O,
    ];

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::I => 'I',
            Self::J => 'J',
            Self::L => 'L',
            Self::T => 'T',
            Self::S => 'S',
            Self::Z => 'Z',
            Self::O => 'O',
        }
    }

    /// Parses a kind from its letter (case-insensitive).
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_char() == c.to_ascii_uppercase())
    }

    /// Number of geometrically distinct orientations of the kind.
    #[must_use]
    pub const fn unique_rotations(self) -> u8 {
        match self {
            Self::J | Self::L | Self::T => 4,
            Self::I | Self::S | Self::Z => 2,
            Self::O => 1,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            Self::I => "....\n####\n....\n....",
            Self::J => "#..\n###\n...",
            Self::L => "..#\n###\n...",
            Self::T => ".#.\n###\n...",
            Self::S => ".##\n##.\n...",
            Self::Z => "##.\n.##\n...",
            Self::O => "##\n##",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ShapeError {
    #[display("shape has no occupied cells")]
    Empty,
    #[display("shape grid must be square, got {width}x{height}")]
    NotSquare { width: usize, height: usize },
    #[display("shape size must be between 2 and 4, got {size}")]
    UnsupportedSize { size: usize },
    #[display("unique rotation count must be 1, 2 or 4, got {declared}")]
    InvalidRotationCount { declared: u8 },
    #[display("shape declares {declared} unique rotations but has {actual}")]
    RotationCountMismatch { declared: u8, actual: u8 },
}

type Footprint = ArrayVec<(i32, i32), 16>;

/// Occupied cells relative to the top-left corner of their bounding box.
fn footprint(cells: &BitGrid) -> Footprint {
    let min_row = cells.occupied_cells().map(|(y, _)| y).min().unwrap_or(0);
    let min_col = cells.leftmost_occupied_column();
    cells
        .occupied_cells()
        .map(|(y, x)| (y - min_row, x - min_col))
        .collect()
}

fn distinct_rotations(cells: &BitGrid) -> u8 {
    let base = footprint(cells);
    if footprint(&cells.rotated_90()) == base {
        1
    } else if footprint(&cells.rotated_180()) == base {
        2
    } else {
        4
    }
}

/// A piece shape in one orientation.
///
/// A square cell buffer (side 2, 3 or 4) plus the number of rotations that
/// produce distinct shapes, so callers enumerating orientations can skip
/// redundant ones. Rotating a shape replaces its buffer in place; clones never
/// share storage.
///
/// # Example
///
/// ```
/// use stackbot_engine::{PieceKind, Shape};
///
/// let mut shape = Shape::canonical(PieceKind::I);
/// assert_eq!(shape.unique_rotations(), 2);
/// assert_eq!(shape.top_occupied_row(), 1);
///
/// shape.rotate_90();
/// assert_eq!(shape.top_occupied_row(), 0);
/// assert_eq!(shape.leftmost_occupied_column(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    kind: Option<PieceKind>,
    cells: BitGrid,
    unique_rotations: u8,
}

impl Shape {
    pub const MIN_SIZE: usize = 2;
    pub const MAX_SIZE: usize = 4;

    /// Creates a shape from a cell buffer, checking that the buffer is a
    /// non-empty square of a supported size and that `unique_rotations`
    /// matches the actual rotational symmetry of the cells.
    pub fn new(cells: BitGrid, unique_rotations: u8) -> Result<Self, ShapeError> {
        let (width, height) = (cells.width(), cells.height());
        if width != height {
            return Err(ShapeError::NotSquare { width, height });
        }
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&width) {
            return Err(ShapeError::UnsupportedSize { size: width });
        }
        if cells.is_empty() {
            return Err(ShapeError::Empty);
        }
        if !matches!(unique_rotations, 1 | 2 | 4) {
            return Err(ShapeError::InvalidRotationCount {
                declared: unique_rotations,
            });
        }
        let actual = distinct_rotations(&cells);
        if actual != unique_rotations {
            return Err(ShapeError::RotationCountMismatch {
                declared: unique_rotations,
                actual,
            });
        }

        let fp = footprint(&cells);
        let kind = PieceKind::ALL.into_iter().find(|kind| {
            Self::canonical(*kind)
                .rotations()
                .iter()
                .any(|shape| footprint(&shape.cells) == fp)
        });
        Ok(Self {
            kind,
            cells,
            unique_rotations,
        })
    }

    /// Returns the spawn orientation of a standard piece.
    #[must_use]
    pub fn canonical(kind: PieceKind) -> Self {
        let pattern = kind.pattern();
        let size = pattern.lines().count();
        let cells =
            BitGrid::from_ascii(size, size, pattern).expect("canonical piece patterns are valid");
        Self {
            kind: Some(kind),
            cells,
            unique_rotations: kind.unique_rotations(),
        }
    }

    /// Returns the standard kind this shape matches, if any.
    #[must_use]
    pub fn kind(&self) -> Option<PieceKind> {
        self.kind
    }

    #[must_use]
    pub fn cells(&self) -> &BitGrid {
        &self.cells
    }

    /// Side length of the square cell buffer.
    #[must_use]
    pub fn size(&self) -> usize {
        self.cells.width()
    }

    #[must_use]
    pub fn unique_rotations(&self) -> u8 {
        self.unique_rotations
    }

    pub fn rotate_90(&mut self) {
        self.cells = self.cells.rotated_90();
    }

    pub fn rotate_180(&mut self) {
        self.cells = self.cells.rotated_180();
    }

    pub fn rotate_270(&mut self) {
        self.cells = self.cells.rotated_270();
    }

    /// Returns the distinct orientations of this shape, starting with the
    /// current one and turning 90° clockwise each step.
    #[must_use]
    pub fn rotations(&self) -> ArrayVec<Self, 4> {
        let mut rotations = ArrayVec::new();
        let mut shape = self.clone();
        for _ in 0..self.unique_rotations {
            rotations.push(shape.clone());
            shape.rotate_90();
        }
        rotations
    }

    /// Checks if the shape is the four-long straight bar, in either orientation.
    #[must_use]
    pub fn is_straight(&self) -> bool {
        let fp = footprint(&self.cells);
        fp.len() == 4 && (fp.iter().all(|(y, _)| *y == 0) || fp.iter().all(|(_, x)| *x == 0))
    }

    /// First row of the buffer holding a block.
    #[must_use]
    pub fn top_occupied_row(&self) -> i32 {
        self.cells.occupied_cells().map(|(y, _)| y).min().unwrap_or(0)
    }

    /// Lowest row of column `col` of the buffer holding a block.
    #[must_use]
    pub fn lowest_occupied_row(&self, col: i32) -> i32 {
        self.cells.lowest_occupied_row(col)
    }

    #[must_use]
    pub fn leftmost_occupied_column(&self) -> i32 {
        self.cells.leftmost_occupied_column()
    }

    #[must_use]
    pub fn rightmost_occupied_column(&self) -> i32 {
        self.cells.rightmost_occupied_column()
    }

    /// Row at which the shape comes to rest when dropped straight down into
    /// `board` with its buffer's left edge at `column`.
    ///
    /// This is the smallest [`distance_to_first_block`] over the columns the
    /// buffer spans, measured from each column's lowest block. Buffer columns
    /// without blocks never limit the drop. Only the column tops matter: the
    /// shape is not swept through the stack.
    ///
    /// [`distance_to_first_block`]: BitGrid::distance_to_first_block
    #[must_use]
    pub fn resting_row(&self, board: &BitGrid, column: i32) -> i32 {
        (0..signed(self.size()))
            .map(|i| board.distance_to_first_block(self.lowest_occupied_row(i), column + i))
            .min()
            .unwrap_or(0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cells, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(art: &str) -> BitGrid {
        let size = art.lines().count();
        BitGrid::from_ascii(size, size, art).unwrap()
    }

    #[test]
    fn test_canonical_shapes_are_valid() {
        for kind in PieceKind::ALL {
            let canonical = Shape::canonical(kind);
            let validated = Shape::new(canonical.cells().clone(), kind.unique_rotations())
                .unwrap_or_else(|e| panic!("{kind}: {e}"));
            assert_eq!(validated, canonical);
            assert_eq!(canonical.cells().occupied_cells().count(), 4);
        }
    }

    #[test]
    fn test_canonical_sizes() {
        assert_eq!(Shape::canonical(PieceKind::I).size(), 4);
        assert_eq!(Shape::canonical(PieceKind::O).size(), 2);
        for kind in [
            PieceKind::J,
            PieceKind::L,
            PieceKind::T,
            PieceKind::S,
            PieceKind::Z,
        ] {
            assert_eq!(Shape::canonical(kind).size(), 3);
        }
    }

    #[test]
    fn test_kind_char_round_trip() {
        for kind in PieceKind::ALL {
            assert_eq!(PieceKind::from_char(kind.as_char()), Some(kind));
            assert_eq!(
                PieceKind::from_char(kind.as_char().to_ascii_lowercase()),
                Some(kind)
            );
        }
        assert_eq!(PieceKind::from_char('X'), None);
    }

    #[test]
    fn test_rotate_in_place() {
        let mut shape = Shape::canonical(PieceKind::T);
        let original = shape.clone();

        shape.rotate_90();
        assert_eq!(shape.to_string(), ".#.\n.##\n.#.");
        assert_eq!(original.to_string(), ".#.\n###\n...");

        shape.rotate_270();
        assert_eq!(shape, original);

        shape.rotate_180();
        shape.rotate_180();
        assert_eq!(shape, original);
    }

    #[test]
    fn test_clone_is_independent() {
        let shape = Shape::canonical(PieceKind::L);
        let mut copy = shape.clone();
        copy.rotate_90();
        assert_ne!(copy, shape);
        assert_eq!(shape, Shape::canonical(PieceKind::L));
    }

    #[test]
    fn test_rotations() {
        for kind in PieceKind::ALL {
            let shape = Shape::canonical(kind);
            let rotations = shape.rotations();
            assert_eq!(rotations.len(), usize::from(kind.unique_rotations()));
            assert_eq!(rotations[0], shape);
            for pair in rotations.windows(2) {
                assert_eq!(pair[0].cells().rotated_90(), *pair[1].cells());
            }
        }
    }

    #[test]
    fn test_is_straight() {
        let mut bar = Shape::canonical(PieceKind::I);
        assert!(bar.is_straight());
        bar.rotate_90();
        assert!(bar.is_straight());
        for kind in &PieceKind::ALL[1..] {
            assert!(!Shape::canonical(*kind).is_straight());
        }
    }

    #[test]
    fn test_occupied_extents() {
        let mut bar = Shape::canonical(PieceKind::I);
        assert_eq!(bar.top_occupied_row(), 1);
        assert_eq!(bar.leftmost_occupied_column(), 0);
        assert_eq!(bar.rightmost_occupied_column(), 3);
        assert_eq!(bar.lowest_occupied_row(0), 1);

        bar.rotate_90();
        assert_eq!(bar.top_occupied_row(), 0);
        assert_eq!(bar.leftmost_occupied_column(), 2);
        assert_eq!(bar.rightmost_occupied_column(), 2);
        assert_eq!(bar.lowest_occupied_row(2), 3);
        assert_eq!(bar.lowest_occupied_row(0), crate::NO_BLOCK_BELOW);
    }

    #[test]
    fn test_resting_row() {
        let mut board = BitGrid::board();
        assert_eq!(Shape::canonical(PieceKind::O).resting_row(&board, 4), 20);
        assert_eq!(Shape::canonical(PieceKind::I).resting_row(&board, 0), 20);

        board.set(21, 4, true);
        let t = Shape::canonical(PieceKind::T);
        assert_eq!(t.resting_row(&board, 3), 19);
        // the empty bottom row of the buffer never limits the drop
        assert_eq!(t.resting_row(&board, 5), 20);

        let mut bar = Shape::canonical(PieceKind::I);
        bar.rotate_90();
        assert_eq!(bar.resting_row(&board, 2), 17);
        assert_eq!(bar.resting_row(&board, 7), 18);
    }

    #[test]
    fn test_new_infers_kind() {
        let shape = Shape::new(grid("...\n.##\n##."), 2).unwrap();
        assert_eq!(shape.kind(), Some(PieceKind::S));

        let domino = Shape::new(grid("##\n.."), 2).unwrap();
        assert_eq!(domino.kind(), None);
    }

    #[test]
    fn test_new_rejects_malformed_shapes() {
        assert_eq!(
            Shape::new(BitGrid::from_ascii(3, 2, "###\n...").unwrap(), 4),
            Err(ShapeError::NotSquare {
                width: 3,
                height: 2
            })
        );
        assert_eq!(
            Shape::new(BitGrid::new(5, 5), 4),
            Err(ShapeError::UnsupportedSize { size: 5 })
        );
        assert_eq!(Shape::new(BitGrid::new(3, 3), 1), Err(ShapeError::Empty));
        assert_eq!(
            Shape::new(grid(".#.\n###\n..."), 3),
            Err(ShapeError::InvalidRotationCount { declared: 3 })
        );
        assert_eq!(
            Shape::new(grid(".#.\n###\n..."), 2),
            Err(ShapeError::RotationCountMismatch {
                declared: 2,
                actual: 4
            })
        );
        assert_eq!(
            Shape::new(grid("##\n##"), 4),
            Err(ShapeError::RotationCountMismatch {
                declared: 4,
                actual: 1
            })
        );
    }
}

use std::fmt;

/// Number of columns of the playing field.
pub const BOARD_WIDTH: usize = 10;
/// Number of rows of the playing field, including the hidden rows at the top.
pub const BOARD_HEIGHT: usize = 22;
/// Rows at the top of the playing field that act as overflow space.
pub const HIDDEN_ROWS: usize = 2;
/// Widest grid a [`BitRow`] can hold.
pub const MAX_GRID_WIDTH: usize = 32;

/// Returned by [`BitGrid::lowest_occupied_row`] for an empty column.
///
/// Far below any real row so that distances measured against an empty column
/// never win a minimum comparison.
pub const NO_BLOCK_BELOW: i32 = -100;

/// At most this many rows can be completed by a single placement.
const CLEAR_WINDOW: usize = 4;

/// Single row of a [`BitGrid`], one bit per cell.
///
/// Bit `x` holds the cell in column `x`. Bits at or beyond the grid width are
/// always zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BitRow {
    bits: u32,
}

impl BitRow {
    pub const EMPTY: Self = Self { bits: 0 };

    const fn full_mask(width: usize) -> u32 {
        if width >= MAX_GRID_WIDTH {
            u32::MAX
        } else {
            (1 << width) - 1
        }
    }

    #[inline]
    #[must_use]
    pub fn is_cell_occupied(self, x: usize) -> bool {
        (self.bits & (1 << x)) != 0
    }

    #[inline]
    fn set_cell(&mut self, x: usize, occupied: bool) {
        if occupied {
            self.bits |= 1 << x;
        } else {
            self.bits &= !(1 << x);
        }
    }

    /// Checks if all `width` cells of the row are occupied.
    #[inline]
    #[must_use]
    pub fn is_filled(self, width: usize) -> bool {
        let mask = Self::full_mask(width);
        (self.bits & mask) == mask
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Iterates over the first `width` cells, returning their occupied status.
    pub fn iter_cells(self, width: usize) -> impl Iterator<Item = bool> {
        (0..width).map(move |x| self.is_cell_occupied(x))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ParseGridError {
    #[display("expected at most {max} rows, got {found}")]
    TooManyRows { max: usize, found: usize },
    #[display("row {row}: expected {expected} cells, got {found}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[display("row {row}: unexpected character {ch:?}")]
    InvalidCell { row: usize, ch: char },
}

#[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub(crate) fn signed(n: usize) -> i32 {
    n as i32
}

/// Fixed-size grid of occupied/empty cells.
///
/// Used both for the playing field (see [`BitGrid::board`]) and for the small
/// square cell buffers of pieces. Row 0 is the top row, column 0 the leftmost
/// column.
///
/// Coordinates are signed so that pieces can be anchored partly outside the
/// grid. Every accessor is bounds-safe:
///
/// - reading outside `[0, height) × [0, width)` returns `false`
/// - writing outside is silently ignored
///
/// # Example
///
/// ```
/// use stackbot_engine::BitGrid;
///
/// let mut board = BitGrid::board();
/// board.set(21, 3, true);
/// board.set(-1, 3, true); // ignored
///
/// assert!(board.get(21, 3));
/// assert!(!board.get(-1, 3));
/// assert_eq!(board.highest_occupied_row(3), 21);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitGrid {
    width: usize,
    height: usize,
    rows: Vec<BitRow>,
}

impl BitGrid {
    /// Creates an empty grid.
    ///
    /// # Panics
    ///
    /// Panics if `width` exceeds [`MAX_GRID_WIDTH`].
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        assert!(
            width <= MAX_GRID_WIDTH,
            "grid width {width} exceeds {MAX_GRID_WIDTH}"
        );
        Self {
            width,
            height,
            rows: vec![BitRow::EMPTY; height],
        }
    }

    /// Creates an empty standard playing field ([`BOARD_WIDTH`] × [`BOARD_HEIGHT`]).
    #[must_use]
    pub fn board() -> Self {
        Self::new(BOARD_WIDTH, BOARD_HEIGHT)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    fn signed_width(&self) -> i32 {
        signed(self.width)
    }

    fn signed_height(&self) -> i32 {
        signed(self.height)
    }

    fn row_index(&self, row: i32) -> Option<usize> {
        usize::try_from(row).ok().filter(|r| *r < self.height)
    }

    fn col_index(&self, col: i32) -> Option<usize> {
        usize::try_from(col).ok().filter(|c| *c < self.width)
    }

    fn row_at(&self, row: i32) -> Option<BitRow> {
        self.row_index(row).map(|r| self.rows[r])
    }

    /// Returns the row at index `y`, or `None` below the grid.
    #[must_use]
    pub fn row(&self, y: usize) -> Option<BitRow> {
        self.rows.get(y).copied()
    }

    /// Returns an iterator over the rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = BitRow> + '_ {
        self.rows.iter().copied()
    }

    /// Returns the cell at `(row, col)`, or `false` when out of bounds.
    #[must_use]
    pub fn get(&self, row: i32, col: i32) -> bool {
        match (self.row_index(row), self.col_index(col)) {
            (Some(r), Some(c)) => self.rows[r].is_cell_occupied(c),
            _ => false,
        }
    }

    /// Sets the cell at `(row, col)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, row: i32, col: i32, occupied: bool) {
        if let (Some(r), Some(c)) = (self.row_index(row), self.col_index(col)) {
            self.rows[r].set_cell(c, occupied);
        }
    }

    /// Sets the cell to `occupied OR current`.
    pub fn or_set(&mut self, row: i32, col: i32, occupied: bool) {
        let current = self.get(row, col);
        self.set(row, col, occupied || current);
    }

    /// Iterates over the coordinates of every occupied cell, row by row.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.rows.iter().enumerate().flat_map(move |(y, row)| {
            (0..self.width)
                .filter(move |x| row.is_cell_occupied(*x))
                .map(move |x| (signed(y), signed(x)))
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }

    #[must_use]
    pub fn row_full(&self, row: i32) -> bool {
        self.row_at(row).is_some_and(|r| r.is_filled(self.width))
    }

    #[must_use]
    pub fn row_empty(&self, row: i32) -> bool {
        self.row_at(row).is_none_or(BitRow::is_empty)
    }

    fn column_occupied(&self, col: usize) -> bool {
        self.rows.iter().any(|row| row.is_cell_occupied(col))
    }

    /// Returns the first row from the top holding a block in `col`, or `height`
    /// when the column is empty.
    #[must_use]
    pub fn highest_occupied_row(&self, col: i32) -> i32 {
        (0..self.signed_height())
            .find(|row| self.get(*row, col))
            .unwrap_or(self.signed_height())
    }

    /// Returns the first row from the bottom holding a block in `col`, or
    /// [`NO_BLOCK_BELOW`] when the column is empty.
    #[must_use]
    pub fn lowest_occupied_row(&self, col: i32) -> i32 {
        (0..self.signed_height())
            .rev()
            .find(|row| self.get(*row, col))
            .unwrap_or(NO_BLOCK_BELOW)
    }

    /// Height of the column above the floor: `height - highest_occupied_row - 1`,
    /// or 0 for an empty column.
    #[must_use]
    pub fn column_height(&self, col: i32) -> i32 {
        let top = self.highest_occupied_row(col);
        if top < self.signed_height() {
            self.signed_height() - top - 1
        } else {
            0
        }
    }

    /// Number of free rows between `row` and the first block below it in `col`.
    #[must_use]
    pub fn distance_to_first_block(&self, row: i32, col: i32) -> i32 {
        self.highest_occupied_row(col) - row - 1
    }

    /// Returns the first column from the left holding a block, or `width` when empty.
    #[must_use]
    pub fn leftmost_occupied_column(&self) -> i32 {
        (0..self.width)
            .find(|col| self.column_occupied(*col))
            .map_or(self.signed_width(), signed)
    }

    /// Returns the first column from the right holding a block, or `-1` when empty.
    #[must_use]
    pub fn rightmost_occupied_column(&self) -> i32 {
        (0..self.width)
            .rev()
            .find(|col| self.column_occupied(*col))
            .map_or(-1, signed)
    }

    /// Distance from the floor to the top of the tallest column, counting the
    /// topmost occupied row itself. 0 for an empty grid.
    #[must_use]
    pub fn field_height(&self) -> i32 {
        self.rows
            .iter()
            .position(|row| !row.is_empty())
            .map_or(0, |top| self.signed_height() - signed(top))
    }

    /// Overwrites `row` by shifting every row from `row - 1` up to `stop_row`
    /// one step down. The row at `stop_row` receives the row above it (or an
    /// empty row when `stop_row` is the top row).
    pub fn clear_row(&mut self, row: i32, stop_row: i32) {
        for y in (stop_row..=row).rev() {
            let above = self.row_at(y - 1).unwrap_or(BitRow::EMPTY);
            if let Some(target) = self.row_index(y) {
                self.rows[target] = above;
            }
        }
    }

    /// Clears full rows and returns the number of rows cleared.
    ///
    /// Rows are scanned from the top. Once the first full row is found, only
    /// the next [`CLEAR_WINDOW`] rows (including that one) are examined, since
    /// a single placement cannot complete rows further apart. Scanning also
    /// stops at an empty row met after clearing began. Every cleared row pulls
    /// down all rows above it, empty gaps and floating blocks included.
    pub fn clear_full_rows(&mut self) -> usize {
        let mut rows_left = CLEAR_WINDOW;
        let mut cleared = 0;

        for row in 0..self.signed_height() {
            if rows_left == 0 {
                break;
            }
            if cleared > 0 && self.row_empty(row) {
                break;
            }
            if self.row_full(row) {
                self.clear_row(row, 0);
                cleared += 1;
            }
            if cleared > 0 {
                rows_left -= 1;
            }
        }

        cleared
    }

    /// OR-merges every occupied cell of `overlay` into this grid, with the
    /// overlay's top-left corner at `(row, col)`. Cells falling outside this
    /// grid are skipped.
    pub fn insert_overlay(&mut self, overlay: &BitGrid, row: i32, col: i32) {
        for (y, x) in overlay.occupied_cells() {
            self.or_set(row + y, col + x, true);
        }
    }

    /// Clears every cell of this grid where `overlay` (anchored at `(row, col)`)
    /// has an occupied cell.
    ///
    /// This is only the inverse of [`insert_overlay`](Self::insert_overlay)
    /// when none of the overlay cells were already occupied before the insert;
    /// blocks that were covered by the overlay are erased as well.
    pub fn remove_overlay(&mut self, overlay: &BitGrid, row: i32, col: i32) {
        for (y, x) in overlay.occupied_cells() {
            self.set(row + y, col + x, false);
        }
    }

    fn rotated_with<F>(&self, width: usize, height: usize, map: F) -> Self
    where
        F: Fn(usize, usize) -> (usize, usize),
    {
        let mut rotated = Self::new(width, height);
        for (y, row) in self.rows.iter().enumerate() {
            for x in (0..self.width).filter(|x| row.is_cell_occupied(*x)) {
                let (ry, rx) = map(y, x);
                rotated.rows[ry].set_cell(rx, true);
            }
        }
        rotated
    }

    /// Returns the grid rotated 90° clockwise (transpose, then reverse each row).
    ///
    /// Width and height are swapped.
    #[must_use]
    pub fn rotated_90(&self) -> Self {
        let h = self.height;
        self.rotated_with(self.height, self.width, |y, x| (x, h - y - 1))
    }

    /// Returns the grid rotated 180° (both indices reversed).
    #[must_use]
    pub fn rotated_180(&self) -> Self {
        let (w, h) = (self.width, self.height);
        self.rotated_with(w, h, |y, x| (h - y - 1, w - x - 1))
    }

    /// Returns the grid rotated 270° clockwise (transpose, then reverse each column).
    ///
    /// Width and height are swapped.
    #[must_use]
    pub fn rotated_270(&self) -> Self {
        let w = self.width;
        self.rotated_with(self.height, self.width, |y, x| (w - x - 1, y))
    }

    /// Parses a grid from ASCII art.
    ///
    /// `#` is an occupied cell and `.` an empty one; blank lines and whitespace
    /// are ignored. Rows are aligned to the bottom of the grid, so art with
    /// fewer than `height` rows leaves the top rows empty.
    pub fn from_ascii(width: usize, height: usize, art: &str) -> Result<Self, ParseGridError> {
        let lines: Vec<&str> = art
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.len() > height {
            return Err(ParseGridError::TooManyRows {
                max: height,
                found: lines.len(),
            });
        }

        let mut grid = Self::new(width, height);
        let offset = height - lines.len();
        for (i, line) in lines.iter().enumerate() {
            let cells: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if cells.len() != width {
                return Err(ParseGridError::RowWidth {
                    row: i,
                    expected: width,
                    found: cells.len(),
                });
            }
            for (x, ch) in cells.into_iter().enumerate() {
                match ch {
                    '#' => grid.rows[offset + i].set_cell(x, true),
                    '.' => {}
                    ch => return Err(ParseGridError::InvalidCell { row: i, ch }),
                }
            }
        }
        Ok(grid)
    }

    /// Like [`Self::from_ascii`], for a standard playing field.
    pub fn board_from_ascii(art: &str) -> Result<Self, ParseGridError> {
        Self::from_ascii(BOARD_WIDTH, BOARD_HEIGHT, art)
    }
}

impl fmt::Display for BitGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows.iter().enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for occupied in row.iter_cells(self.width) {
                f.write_str(if occupied { "#" } else { "." })?;
            }
        }
        Ok(())
    }
}

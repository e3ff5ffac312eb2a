use serde::{Deserialize, Serialize};

/// Row-clear counters of a game.
///
/// Only counts pieces and rows; there is no scoring or level progression.
///
/// # Example
///
/// ```
/// use stackbot_engine::GameStats;
///
/// let mut stats = GameStats::new();
/// stats.record_lock(0);
/// stats.record_lock(4);
///
/// assert_eq!(stats.pieces_placed(), 2);
/// assert_eq!(stats.total_cleared_lines(), 4);
/// assert_eq!(stats.line_cleared_counter(), &[1, 0, 0, 0, 1]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pieces_placed: usize,
    total_cleared_lines: usize,
    line_cleared_counter: [usize; 5],
}

impl GameStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pieces_placed: 0,
            total_cleared_lines: 0,
            line_cleared_counter: [0; 5],
        }
    }

    /// Number of pieces merged into the board.
    #[must_use]
    pub const fn pieces_placed(&self) -> usize {
        self.pieces_placed
    }

    #[must_use]
    pub const fn total_cleared_lines(&self) -> usize {
        self.total_cleared_lines
    }

    /// Histogram of locks by rows cleared: index 0 counts locks that cleared
    /// nothing, index 4 counts four-row clears.
    #[must_use]
    pub const fn line_cleared_counter(&self) -> &[usize; 5] {
        &self.line_cleared_counter
    }

    /// Records one locked piece that cleared `cleared_lines` rows.
    pub const fn record_lock(&mut self, cleared_lines: usize) {
        self.pieces_placed += 1;
        self.total_cleared_lines += cleared_lines;
        if cleared_lines < self.line_cleared_counter.len() {
            self.line_cleared_counter[cleared_lines] += 1;
        }
    }

    /// Adds the counters of another game to this one.
    pub fn merge(&mut self, other: &Self) {
        self.pieces_placed += other.pieces_placed;
        self.total_cleared_lines += other.total_cleared_lines;
        for (total, n) in self
            .line_cleared_counter
            .iter_mut()
            .zip(other.line_cleared_counter)
        {
            *total += n;
        }
    }
}

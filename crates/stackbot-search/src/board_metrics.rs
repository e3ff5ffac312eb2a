use stackbot_engine::BitGrid;

use crate::config::HeuristicTerm;

/// Raw values of the heuristic terms for one board.
///
/// Heights follow [`BitGrid::column_height`] except for the aggregate height,
/// which sums `height - highest_occupied_row` per column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardMetrics {
    pub aggregate_height: i32,
    /// Empty cells with a block somewhere above them in the same column.
    pub hole_count: i32,
    /// Blocks with at least one empty cell somewhere below them.
    pub hole_weight: i32,
    /// Sum of height differences between neighbouring columns.
    pub unevenness: i32,
    /// Field height minus the height of the lowest occupied column.
    pub height_differential: i32,
    /// Sum of well depths over all columns but the rightmost.
    pub well_depth: i32,
}

impl BoardMetrics {
    #[must_use]
    pub fn from_board(board: &BitGrid) -> Self {
        let columns = columns(board);
        let heights: Vec<i32> = columns.clone().map(|col| board.column_height(col)).collect();
        let (hole_count, hole_weight) = holes(board);
        Self {
            aggregate_height: columns
                .map(|col| height(board) - board.highest_occupied_row(col))
                .sum(),
            hole_count,
            hole_weight,
            unevenness: heights.windows(2).map(|w| (w[0] - w[1]).abs()).sum(),
            height_differential: height_differential(board),
            well_depth: well_depth(&heights),
        }
    }

    #[must_use]
    pub fn get(&self, term: HeuristicTerm) -> i32 {
        match term {
            HeuristicTerm::AggregateHeight => self.aggregate_height,
            HeuristicTerm::HoleCount => self.hole_count,
            HeuristicTerm::HoleWeight => self.hole_weight,
            HeuristicTerm::Unevenness => self.unevenness,
            HeuristicTerm::HeightDifferential => self.height_differential,
            HeuristicTerm::WellDepth => self.well_depth,
        }
    }
}

fn height(board: &BitGrid) -> i32 {
    i32::try_from(board.height()).unwrap_or(i32::MAX)
}

fn columns(board: &BitGrid) -> std::ops::Range<i32> {
    0..i32::try_from(board.width()).unwrap_or(i32::MAX)
}

fn holes(board: &BitGrid) -> (i32, i32) {
    let mut hole_count = 0;
    let mut hole_weight = 0;
    for col in columns(board) {
        let mut empty_run = 0;
        let mut empty_below = false;
        for row in (0..height(board)).rev() {
            if board.get(row, col) {
                hole_count += empty_run;
                empty_run = 0;
                if empty_below {
                    hole_weight += 1;
                }
            } else {
                empty_run += 1;
                empty_below = true;
            }
        }
    }
    (hole_count, hole_weight)
}

fn height_differential(board: &BitGrid) -> i32 {
    let lowest_top = columns(board)
        .map(|col| board.highest_occupied_row(col))
        .filter(|top| *top < height(board))
        .max();
    lowest_top.map_or(0, |top| board.field_height() - (height(board) - top))
}

/// Depth of a well between neighbours of heights `left` and `right`: the
/// smaller drop, counted only when deeper than two rows.
fn well(left: i32, middle: i32, right: i32) -> i32 {
    let depth = (left - middle).min(right - middle);
    if depth > 2 { depth } else { 0 }
}

/// The rightmost column is excluded; edge columns use their only neighbour on
/// both sides.
fn well_depth(heights: &[i32]) -> i32 {
    if heights.len() < 3 {
        return 0;
    }
    let scored = &heights[..heights.len().saturating_sub(1)];
    (0..scored.len())
        .map(|i| {
            let left = if i == 0 { heights[1] } else { heights[i - 1] };
            let right = if i + 1 == scored.len() {
                heights[i - 1]
            } else {
                heights[i + 1]
            };
            well(left, heights[i], right)
        })
        .sum()
}

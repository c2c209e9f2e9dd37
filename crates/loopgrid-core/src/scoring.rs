//! Segment-growth scoring.
//!
//! Straight run `k` of a path scores `k·1, k·2, k·3, …`; every diagonal costs
//! one point and ends the run. A closed loop adds a bonus equal to the number of
//! tokens on the whole board that belong to a visited group, credited to the
//! final step.

use crate::grid::{GroupId, Grid};
use crate::selection::{Direction, PathStep};
use std::collections::BTreeSet;

/// Score of a diagonal step
pub const DIAGONAL_PENALTY: i32 = -1;

/// Loop bonus: tokens anywhere on the board whose group was visited
pub fn loop_bonus(grid: &Grid, visited_groups: &BTreeSet<GroupId>) -> i32 {
    grid.count_in_groups(visited_groups) as i32
}

/// Recompute `direction` and `delta_score` of every step from scratch.
///
/// Paths shorter than two steps only have their first step reset.
pub fn score_path(
    steps: &mut [PathStep],
    grid: &Grid,
    visited_groups: &BTreeSet<GroupId>,
    loop_closed: bool,
) {
    let Some(first) = steps.first_mut() else {
        return;
    };
    first.direction = Direction::None;
    first.delta_score = 0;
    if steps.len() < 2 {
        return;
    }

    let bonus = if loop_closed {
        loop_bonus(grid, visited_groups)
    } else {
        0
    };

    let mut segment_index = 0;
    let mut segment_step = 0;
    let mut expecting_new_segment = true;
    let last = steps.len() - 1;

    for i in 1..steps.len() {
        let direction = Direction::between(steps[i - 1].position(), steps[i].position());

        let mut delta = match direction {
            Direction::Horizontal | Direction::Vertical => {
                if expecting_new_segment {
                    segment_index += 1;
                    segment_step = 1;
                    expecting_new_segment = false;
                } else {
                    segment_step += 1;
                }
                segment_index * segment_step
            }
            Direction::Diagonal => {
                expecting_new_segment = true;
                segment_step = 0;
                DIAGONAL_PENALTY
            }
            Direction::None => 0,
        };

        if loop_closed && i == last {
            delta += bonus;
        }

        steps[i].direction = direction;
        steps[i].delta_score = delta;
    }
}

/// Sum of all step scores
pub fn path_total(steps: &[PathStep]) -> i32 {
    steps.iter().map(|s| s.delta_score).sum()
}

//! Path selection state machine.
//!
//! A drag starts on any token, extends one king-move at a time and may close a
//! loop by returning to its first cell. Straight moves must stay inside the
//! current group; diagonal moves must switch to a different group. Moving back
//! onto the previous cell undoes the last step. Illegal moves are ignored.

use crate::grid::{GroupId, Grid, Position};
use crate::scoring;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of move that produced a path step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// First step of a path
    None,
    Horizontal,
    Vertical,
    Diagonal,
}

impl Direction {
    /// Classify the move between two cells. Cells that are not king-move
    /// neighbours classify as `None`.
    pub fn between(from: Position, to: Position) -> Self {
        let (dx, dy) = from.delta(to);
        match (dx.abs(), dy.abs()) {
            (1, 0) => Direction::Horizontal,
            (0, 1) => Direction::Vertical,
            (1, 1) => Direction::Diagonal,
            _ => Direction::None,
        }
    }

    pub fn is_straight(self) -> bool {
        matches!(self, Direction::Horizontal | Direction::Vertical)
    }
}

/// One cell of a path with the score earned by the move into it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub x: usize,
    pub y: usize,
    pub direction: Direction,
    pub delta_score: i32,
}

impl PathStep {
    pub fn new(pos: Position, direction: Direction) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            direction,
            delta_score: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Derived selection flags, cached for O(1) checks during a drag
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    pub current_group: Option<GroupId>,
    pub last_direction: Option<Direction>,
    pub loop_closed: bool,
    pub visited_groups: BTreeSet<GroupId>,
}

impl SelectionState {
    /// Rebuild the state from a path alone
    pub fn from_path(steps: &[PathStep], grid: &Grid) -> Self {
        let Some(first) = steps.first() else {
            return Self::default();
        };
        let last = steps[steps.len() - 1];
        let start = first.position();

        Self {
            current_group: grid.group_at(last.position()),
            last_direction: Some(last.direction),
            loop_closed: steps.len() > 1 && steps[1..].iter().any(|s| s.position() == start),
            visited_groups: steps
                .iter()
                .filter_map(|s| grid.group_at(s.position()))
                .collect(),
        }
    }
}

/// Coarse phase of the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    Selecting,
    LoopClosed,
}

/// The active path and its derived state
#[derive(Debug, Clone, Default)]
pub struct Selection {
    steps: Vec<PathStep>,
    state: SelectionState,
    pointer_down: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn visited_groups(&self) -> &BTreeSet<GroupId> {
        &self.state.visited_groups
    }

    pub fn loop_closed(&self) -> bool {
        self.state.loop_closed
    }

    pub fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    pub fn phase(&self) -> SelectionPhase {
        if self.steps.is_empty() {
            SelectionPhase::Idle
        } else if self.state.loop_closed {
            SelectionPhase::LoopClosed
        } else {
            SelectionPhase::Selecting
        }
    }

    /// Sum of the step scores
    pub fn total_score(&self) -> i32 {
        scoring::path_total(&self.steps)
    }

    /// Index of the first step at `pos`
    pub fn index_of(&self, pos: Position) -> Option<usize> {
        self.steps.iter().position(|s| s.position() == pos)
    }

    /// Distinct positions covered by the path (the closing step is not repeated)
    pub fn cells(&self) -> Vec<Position> {
        let mut cells: Vec<Position> = self.steps.iter().map(PathStep::position).collect();
        if self.state.loop_closed {
            cells.pop();
        }
        cells
    }

    /// Pointer pressed on a cell.
    ///
    /// Pressing the last step resumes the drag, pressing an earlier step
    /// truncates the path there, anything else starts a new path.
    pub fn start(&mut self, grid: &Grid, pos: Position) -> bool {
        let Some(token) = grid.get(pos) else {
            return false;
        };

        match self.index_of(pos) {
            Some(i) if i + 1 == self.steps.len() => {
                self.pointer_down = true;
            }
            Some(i) => {
                self.steps.truncate(i + 1);
                self.refresh(grid);
                self.pointer_down = true;
            }
            None => {
                self.steps = vec![PathStep::new(pos, Direction::None)];
                self.state = SelectionState {
                    current_group: Some(token.group),
                    last_direction: Some(Direction::None),
                    loop_closed: false,
                    visited_groups: BTreeSet::from([token.group]),
                };
                self.pointer_down = true;
            }
        }
        true
    }

    /// Pointer dragged onto a cell. Returns true if the path changed.
    pub fn extend(&mut self, grid: &Grid, pos: Position) -> bool {
        if !self.pointer_down || !grid.in_bounds(pos) {
            return false;
        }
        let Some(&last) = self.steps.last() else {
            return false;
        };

        // Moving back onto the previous cell undoes the last step
        if self.steps.len() >= 2 && self.steps[self.steps.len() - 2].position() == pos {
            self.steps.pop();
            self.refresh(grid);
            return true;
        }

        let last_pos = last.position();
        if pos == last_pos || self.state.loop_closed || !pos.is_adjacent(last_pos) {
            return false;
        }
        let Some(token) = grid.get(pos) else {
            return false;
        };

        let direction = Direction::between(last_pos, pos);
        let same_group = self.state.current_group == Some(token.group);
        let legal = if direction.is_straight() {
            same_group
        } else {
            !same_group
        };
        if !legal {
            return false;
        }

        let closes_loop = match self.index_of(pos) {
            Some(0) if self.steps.len() >= 3 => true,
            Some(_) => return false,
            None => false,
        };

        self.steps.push(PathStep::new(pos, direction));
        self.state.current_group = Some(token.group);
        self.state.visited_groups.insert(token.group);
        self.state.last_direction = Some(direction);
        self.state.loop_closed = closes_loop;
        self.rescore(grid);
        true
    }

    /// Pointer released. The path stays in place for submission.
    pub fn end(&mut self) {
        self.pointer_down = false;
    }

    /// Drop the path entirely
    pub fn clear(&mut self) {
        self.steps.clear();
        self.state = SelectionState::default();
        self.pointer_down = false;
    }

    /// Take the finished path out, leaving the selection idle
    pub fn take(&mut self) -> (Vec<PathStep>, SelectionState) {
        let steps = std::mem::take(&mut self.steps);
        let state = std::mem::take(&mut self.state);
        self.pointer_down = false;
        (steps, state)
    }

    fn refresh(&mut self, grid: &Grid) {
        self.state = SelectionState::from_path(&self.steps, grid);
        self.rescore(grid);
    }

    fn rescore(&mut self, grid: &Grid) {
        scoring::score_path(
            &mut self.steps,
            grid,
            &self.state.visited_groups,
            self.state.loop_closed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: usize, y: usize) -> Position {
        Position::new(x, y)
    }

    fn drag(grid: &Grid, cells: &[(usize, usize)]) -> Selection {
        let mut sel = Selection::new();
        let (x, y) = cells[0];
        assert!(sel.start(grid, p(x, y)));
        for &(x, y) in &cells[1..] {
            sel.extend(grid, p(x, y));
        }
        sel
    }

    fn deltas(sel: &Selection) -> Vec<i32> {
        sel.steps().iter().map(|s| s.delta_score).collect()
    }

    // Row 0: A A A, row 1: C B C
    fn example_grid() -> Grid {
        Grid::from_letters("AAA\nCBC\nCCC").unwrap()
    }

    #[test]
    fn test_straight_run_example() {
        let grid = example_grid();
        let sel = drag(&grid, &[(0, 0), (1, 0), (2, 0)]);
        assert_eq!(deltas(&sel), vec![0, 1, 2]);
        assert_eq!(sel.total_score(), 3);
        assert_eq!(sel.phase(), SelectionPhase::Selecting);
    }

    #[test]
    fn test_diagonal_example() {
        let grid = example_grid();
        let sel = drag(&grid, &[(0, 0), (1, 1)]);
        assert_eq!(deltas(&sel), vec![0, -1]);
        assert_eq!(sel.total_score(), -1);
        assert_eq!(sel.state().current_group, Some(1));
        assert_eq!(sel.visited_groups().len(), 2);
    }

    #[test]
    fn test_straight_move_into_other_group_rejected() {
        let grid = example_grid();
        let mut sel = drag(&grid, &[(0, 0)]);
        assert!(!sel.extend(&grid, p(0, 1)));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_diagonal_within_group_rejected() {
        let grid = Grid::from_letters("AB\nBA").unwrap();
        let mut sel = drag(&grid, &[(0, 0)]);
        assert!(!sel.extend(&grid, p(1, 1)));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_non_adjacent_and_same_cell_rejected() {
        let grid = example_grid();
        let mut sel = drag(&grid, &[(0, 0)]);
        assert!(!sel.extend(&grid, p(2, 0)));
        assert!(!sel.extend(&grid, p(0, 0)));
        assert!(!sel.extend(&grid, p(9, 9)));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_extend_requires_pointer_down() {
        let grid = example_grid();
        let mut sel = drag(&grid, &[(0, 0)]);
        sel.end();
        assert!(!sel.extend(&grid, p(1, 0)));
        // rejoining at the last step resumes the drag
        assert!(sel.start(&grid, p(0, 0)));
        assert!(sel.extend(&grid, p(1, 0)));
    }

    #[test]
    fn test_revisit_of_middle_cell_rejected() {
        let grid = Grid::from_letters("AAA\nAAA\nAAA").unwrap();
        let mut sel = drag(&grid, &[(0, 0), (1, 0), (2, 0), (2, 1), (1, 1)]);
        assert_eq!(sel.len(), 5);
        // (1, 0) is a legal straight move by group but already on the path
        assert!(!sel.extend(&grid, p(1, 0)));
        assert_eq!(sel.len(), 5);
        assert!(sel.extend(&grid, p(0, 1)));
    }

    #[test]
    fn test_loop_closure_and_bonus() {
        let grid = Grid::from_letters("AAB\nAAB\nCCC").unwrap();
        let mut sel = drag(&grid, &[(0, 0), (1, 0), (1, 1), (0, 1)]);
        assert!(!sel.loop_closed());
        assert!(sel.extend(&grid, p(0, 0)));
        assert!(sel.loop_closed());
        assert_eq!(sel.phase(), SelectionPhase::LoopClosed);
        assert_eq!(sel.len(), 5);
        assert_eq!(deltas(&sel), vec![0, 1, 2, 3, 4 + 4]);
        // closing step does not count as a new cell
        assert_eq!(sel.cells().len(), 4);

        // no extension after closing
        assert!(!sel.extend(&grid, p(1, 0)));
        assert_eq!(sel.len(), 5);
    }

    #[test]
    fn test_loop_needs_three_steps_first() {
        let grid = Grid::from_letters("AA\nAA").unwrap();
        let mut sel = drag(&grid, &[(0, 0), (1, 0)]);
        // moving to (0, 0) here is a backtrack, not a loop
        assert!(sel.extend(&grid, p(0, 0)));
        assert_eq!(sel.len(), 1);
        assert!(!sel.loop_closed());
    }

    #[test]
    fn test_backtrack_then_redo_is_identical() {
        let grid = Grid::from_letters("AAB\nCAB\nCCB").unwrap();
        let mut sel = drag(&grid, &[(0, 0), (1, 0), (1, 1), (2, 2)]);
        let before = sel.steps().to_vec();
        let state_before = sel.state().clone();

        assert!(sel.extend(&grid, p(1, 1)));
        assert_eq!(sel.len(), 3);
        assert_eq!(sel.state().current_group, Some(0));
        assert_eq!(sel.visited_groups().len(), 1);

        assert!(sel.extend(&grid, p(2, 2)));
        assert_eq!(sel.steps(), before.as_slice());
        assert_eq!(sel.state(), &state_before);
    }

    #[test]
    fn test_backtrack_reopens_closed_loop() {
        let grid = Grid::from_letters("AAB\nAAB\nCCC").unwrap();
        let mut sel = drag(&grid, &[(0, 0), (1, 0), (1, 1), (0, 1), (0, 0)]);
        assert!(sel.loop_closed());
        assert!(sel.extend(&grid, p(0, 1)));
        assert!(!sel.loop_closed());
        assert_eq!(deltas(&sel), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_start_on_earlier_step_truncates() {
        let grid = Grid::from_letters("AAB\nCAB\nCCB").unwrap();
        let mut sel = drag(&grid, &[(0, 0), (1, 0), (1, 1), (2, 2)]);
        sel.end();
        assert!(sel.start(&grid, p(1, 0)));
        assert_eq!(sel.len(), 2);
        assert!(sel.is_pointer_down());
        assert_eq!(sel.visited_groups(), &BTreeSet::from([0]));
        assert_eq!(sel.state().current_group, Some(0));
    }

    #[test]
    fn test_start_elsewhere_begins_new_path() {
        let grid = example_grid();
        let mut sel = drag(&grid, &[(0, 0), (1, 0)]);
        sel.end();
        assert!(sel.start(&grid, p(2, 2)));
        assert_eq!(sel.len(), 1);
        assert_eq!(sel.state().current_group, Some(2));
    }

    #[test]
    fn test_start_on_empty_cell_ignored() {
        let grid = Grid::from_letters("A.\nAA").unwrap();
        let mut sel = Selection::new();
        assert!(!sel.start(&grid, p(1, 0)));
        assert_eq!(sel.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn test_state_recomputable_from_path() {
        let grid = Grid::from_letters("AAB\nCAB\nCCB").unwrap();
        let sel = drag(&grid, &[(0, 0), (1, 0), (1, 1), (2, 2), (2, 1)]);
        assert_eq!(
            &SelectionState::from_path(sel.steps(), &grid),
            sel.state()
        );
    }
}

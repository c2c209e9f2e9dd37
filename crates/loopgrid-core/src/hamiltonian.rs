//! Bonus board generation.
//!
//! A bonus board is laid out along a closed king-move tour that visits every
//! cell once, so a single loop can clear it. The tour is found with an
//! explicit-stack depth-first search ordered by Warnsdorff's rule and bounded
//! by a wall-clock deadline. Groups are then painted along the tour so that
//! every straight step stays in its group and every diagonal step switches.

use crate::grid::{GroupId, Grid, Position, Token};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Search limits for the tour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourSearchConfig {
    /// Random restarts before giving up
    pub max_attempts: usize,
    /// Budget shared by all attempts, in milliseconds
    pub time_budget_ms: u64,
}

impl Default for TourSearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            time_budget_ms: 500,
        }
    }
}

impl TourSearchConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

/// A closed tour: `size² + 1` positions, first equal to last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tour(Vec<Position>);

impl Tour {
    pub fn positions(&self) -> &[Position] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check every tour invariant against a `size × size` board
    pub fn is_valid(&self, size: usize) -> bool {
        let cells = &self.0;
        if cells.len() != size * size + 1 || cells.first() != cells.last() {
            return false;
        }
        let body = &cells[..cells.len() - 1];
        let distinct: BTreeSet<Position> = body.iter().copied().collect();
        distinct.len() == body.len()
            && body.iter().all(|p| p.x < size && p.y < size)
            && cells.windows(2).all(|w| w[0].is_adjacent(w[1]))
    }

    /// Rotate the cycle so that the closing step is a diagonal one.
    /// Returns false, leaving the tour unchanged, if it has no diagonal step.
    fn rotate_to_diagonal_seam(&mut self) -> bool {
        let n = self.0.len() - 1;
        if self.0[n - 1].is_diagonal_to(self.0[0]) {
            return true;
        }
        let Some(k) = (1..n).find(|&k| self.0[k - 1].is_diagonal_to(self.0[k])) else {
            return false;
        };
        self.0.pop();
        self.0.rotate_left(k);
        self.0.push(self.0[0]);
        true
    }
}

/// Result of a tour search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourOutcome {
    Found(Tour),
    /// The time budget ran out
    TimedOut,
    /// Every attempt searched its whole tree without closing a tour
    Exhausted,
}

/// Why a bonus board could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationFailure {
    #[error("tour search timed out")]
    TimedOut,
    #[error("tour search exhausted all attempts")]
    Exhausted,
    #[error("tour has no diagonal step to switch groups on")]
    NoDiagonal,
    #[error("only {used} of {expected} groups appear on the tour")]
    GroupCoverage { used: usize, expected: usize },
    #[error("closing step of the tour breaks the group rules")]
    UnclosableSeam,
}

/// A board that can be cleared with one loop, with the loop that clears it
#[derive(Debug, Clone)]
pub struct BonusBoard {
    pub grid: Grid,
    pub tour: Tour,
    pub groups: Vec<GroupId>,
}

struct Frame {
    candidates: Vec<Position>,
    next: usize,
}

struct TourSearch {
    size: usize,
    visited: Vec<bool>,
    path: Vec<Position>,
    deadline: Instant,
}

enum Attempt {
    Found,
    TimedOut,
    Exhausted,
}

impl TourSearch {
    fn new(size: usize, deadline: Instant) -> Self {
        Self {
            size,
            visited: vec![false; size * size],
            path: Vec::with_capacity(size * size + 1),
            deadline,
        }
    }

    fn idx(&self, pos: Position) -> usize {
        pos.y * self.size + pos.x
    }

    fn unvisited_neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        crate::grid::NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let nx = pos.x.checked_add_signed(dx)?;
            let ny = pos.y.checked_add_signed(dy)?;
            let next = Position::new(nx, ny);
            (nx < self.size && ny < self.size && !self.visited[self.idx(next)]).then_some(next)
        })
    }

    /// Unvisited neighbours, most constrained first, diagonals first on ties
    fn ordered_candidates(&self, pos: Position) -> Vec<Position> {
        let mut options: Vec<(Position, usize)> = self
            .unvisited_neighbors(pos)
            .map(|n| (n, self.unvisited_neighbors(n).count()))
            .collect();
        options.sort_by_key(|&(n, onward)| (onward, !pos.is_diagonal_to(n)));
        options.into_iter().map(|(n, _)| n).collect()
    }

    fn visit(&mut self, pos: Position) -> Frame {
        let idx = self.idx(pos);
        self.visited[idx] = true;
        self.path.push(pos);
        Frame {
            candidates: self.ordered_candidates(pos),
            next: 0,
        }
    }

    fn unvisit_last(&mut self) {
        if let Some(pos) = self.path.pop() {
            let idx = self.idx(pos);
            self.visited[idx] = false;
        }
    }

    /// Taking the start's last free neighbour before the final step leaves
    /// no way to close the tour.
    fn isolates_start(&self, start: Position, next: Position, total: usize) -> bool {
        self.path.len() + 1 < total
            && next.is_adjacent(start)
            && self.unvisited_neighbors(start).count() == 1
    }

    fn run(&mut self, start: Position) -> Attempt {
        let total = self.size * self.size;
        self.visited.fill(false);
        self.path.clear();

        let mut stack = vec![self.visit(start)];

        while let Some(frame) = stack.last_mut() {
            if Instant::now() >= self.deadline {
                return Attempt::TimedOut;
            }

            if self.path.len() == total {
                let first = self.path[0];
                let last = self.path[total - 1];
                if last != first && last.is_adjacent(first) {
                    self.path.push(first);
                    return Attempt::Found;
                }
                stack.pop();
                self.unvisit_last();
                continue;
            }

            if frame.next < frame.candidates.len() {
                let next = frame.candidates[frame.next];
                frame.next += 1;
                if !self.visited[self.idx(next)] && !self.isolates_start(start, next, total) {
                    let child = self.visit(next);
                    stack.push(child);
                }
            } else {
                stack.pop();
                self.unvisit_last();
            }
        }

        Attempt::Exhausted
    }
}

/// Search for a closed king-move tour of a `size × size` board.
///
/// Each attempt starts from a random cell. The deadline covers the whole
/// search: once it passes, the search stops with `TimedOut` no matter how many
/// attempts remain.
pub fn search_tour<R: Rng + ?Sized>(
    size: usize,
    config: &TourSearchConfig,
    rng: &mut R,
) -> TourOutcome {
    if size == 0 {
        return TourOutcome::Exhausted;
    }
    let deadline = Instant::now() + config.time_budget();
    let mut search = TourSearch::new(size, deadline);

    for attempt in 0..config.max_attempts {
        let start = Position::new(rng.gen_range(0..size), rng.gen_range(0..size));
        log::debug!(
            "tour attempt {} of {} from ({}, {})",
            attempt + 1,
            config.max_attempts,
            start.x,
            start.y
        );

        match search.run(start) {
            Attempt::Found => {
                log::debug!("tour found on attempt {}", attempt + 1);
                return TourOutcome::Found(Tour(std::mem::take(&mut search.path)));
            }
            Attempt::TimedOut => {
                log::warn!("tour search timed out after {} ms", config.time_budget_ms);
                return TourOutcome::TimedOut;
            }
            Attempt::Exhausted => {}
        }
    }

    log::warn!("tour search exhausted {} attempts", config.max_attempts);
    TourOutcome::Exhausted
}

/// Paint groups along a tour, one entry per tour position.
///
/// The start gets a random group. Straight steps keep the group; diagonal
/// steps switch to a group not used yet while any remain, and otherwise to a
/// random different group. On the last diagonal the start's group is avoided
/// too when there is a choice, so the closing diagonal stays legal.
pub fn assign_groups<R: Rng + ?Sized>(tour: &Tour, num_groups: u8, rng: &mut R) -> Vec<GroupId> {
    let cells = tour.positions();
    if cells.is_empty() || num_groups == 0 {
        return Vec::new();
    }

    let mut pool: Vec<GroupId> = (0..num_groups).collect();
    pool.shuffle(rng);

    let first_group = pool[0];
    let mut unused: Vec<GroupId> = pool[1..].to_vec();
    let mut current = first_group;

    // Index of the last diagonal step before the closing one
    let body_end = cells.len().saturating_sub(1);
    let last_diagonal = (1..body_end)
        .rev()
        .find(|&i| cells[i - 1].is_diagonal_to(cells[i]));

    let mut assignments = Vec::with_capacity(cells.len());
    assignments.push(current);

    for i in 1..cells.len() {
        if cells[i - 1].is_diagonal_to(cells[i]) {
            current = match unused.pop() {
                Some(group) => group,
                None => {
                    let mut candidates: Vec<GroupId> =
                        pool.iter().copied().filter(|&g| g != current).collect();
                    if Some(i) == last_diagonal && candidates.len() > 1 {
                        candidates.retain(|&g| g != first_group);
                    }
                    candidates.choose(rng).copied().unwrap_or(current)
                }
            };
        }
        assignments.push(current);
    }

    assignments
}

/// Build a board from a tour and its group assignments. The closing position
/// repeats the start and is not placed twice.
pub fn materialize<R: Rng + ?Sized>(
    tour: &Tour,
    groups: &[GroupId],
    size: usize,
    variants: u8,
    rng: &mut R,
) -> Grid {
    let mut grid = Grid::empty(size);
    let body = tour.len().saturating_sub(1);
    for (&pos, &group) in tour.positions().iter().zip(groups).take(body) {
        grid.set(pos, Some(Token::new(group, rng.gen_range(0..variants.max(1)))));
    }
    grid
}

/// Generate a board that one loop along its tour clears completely
pub fn generate_bonus_board<R: Rng + ?Sized>(
    size: usize,
    num_groups: u8,
    variants: u8,
    config: &TourSearchConfig,
    rng: &mut R,
) -> Result<BonusBoard, GenerationFailure> {
    log::info!("generating bonus board: size {size}, {num_groups} groups");

    let mut tour = match search_tour(size, config, rng) {
        TourOutcome::Found(tour) => tour,
        TourOutcome::TimedOut => return Err(GenerationFailure::TimedOut),
        TourOutcome::Exhausted => return Err(GenerationFailure::Exhausted),
    };

    if !tour.rotate_to_diagonal_seam() {
        log::warn!("tour has no diagonal step");
        return Err(GenerationFailure::NoDiagonal);
    }

    let groups = assign_groups(&tour, num_groups, rng);
    let body = tour.len() - 1;

    let used: BTreeSet<GroupId> = groups[..body].iter().copied().collect();
    if used.len() < num_groups as usize {
        log::warn!("bonus board uses {} of {} groups", used.len(), num_groups);
        return Err(GenerationFailure::GroupCoverage {
            used: used.len(),
            expected: num_groups as usize,
        });
    }

    // Closing step is diagonal after rotation, so it must switch groups
    if groups[body - 1] == groups[0] {
        log::warn!("bonus board closing step stays in one group");
        return Err(GenerationFailure::UnclosableSeam);
    }

    let grid = materialize(&tour, &groups, size, variants, rng);
    log::info!("bonus board generated");
    Ok(BonusBoard { grid, tour, groups })
}

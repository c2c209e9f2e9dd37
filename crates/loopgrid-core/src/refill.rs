use crate::grid::{GroupId, Grid, Position, Token};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Policy deciding which groups refill may draw from.
///
/// After a small, non-loop clear the eliminated groups are left out of the
/// draw so the board stays varied. Once too much of the palette was eliminated
/// every group is allowed again so the refill never starves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefillPolicy {
    /// Exclude eliminated groups when the clear was small
    pub exclude_eliminated: bool,
    /// Only exclude when the submitted path was shorter than this
    pub max_path_len: Option<usize>,
}

impl Default for RefillPolicy {
    fn default() -> Self {
        Self {
            exclude_eliminated: true,
            max_path_len: None,
        }
    }
}

/// Groups new tokens may be drawn from after a clear
pub fn allowed_groups(
    group_count: u8,
    eliminated: &BTreeSet<GroupId>,
    loop_closed: bool,
    path_len: usize,
    policy: &RefillPolicy,
) -> Vec<GroupId> {
    let all = (0..group_count).collect::<Vec<_>>();
    let short_path = policy.max_path_len.map_or(true, |max| path_len < max);
    let small_clear = eliminated.len() + 1 < group_count as usize;

    if policy.exclude_eliminated && !loop_closed && short_path && small_clear {
        all.into_iter().filter(|g| !eliminated.contains(g)).collect()
    } else {
        all
    }
}

/// One token moving down a column.
///
/// `from_row` is negative for tokens spawned above the board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallDescriptor {
    pub column: usize,
    pub from_row: i32,
    pub to_row: usize,
    pub token: Token,
}

/// A refilled board together with the falls that produced it
#[derive(Debug, Clone)]
pub struct RefillOutcome {
    pub grid: Grid,
    pub falls: Vec<FallDescriptor>,
}

/// Compact every column downward and fill the vacated top rows.
///
/// Surviving tokens keep their relative order. New tokens take a group from
/// `allowed` and a uniformly random face. The input grid is left untouched.
pub fn refill<R: Rng + ?Sized>(
    cleared: &Grid,
    allowed: &[GroupId],
    variants: u8,
    rng: &mut R,
) -> RefillOutcome {
    let size = cleared.size();
    let mut grid = Grid::empty(size);
    let mut falls = Vec::new();

    for x in 0..size {
        // Next free slot, filled from the bottom up
        let mut pointer = size as i32 - 1;

        for y in (0..size).rev() {
            let Some(token) = cleared.get(Position::new(x, y)).copied() else {
                continue;
            };
            let to_row = pointer as usize;
            if y != to_row {
                falls.push(FallDescriptor {
                    column: x,
                    from_row: y as i32,
                    to_row,
                    token,
                });
            }
            grid.set(Position::new(x, to_row), Some(token));
            pointer -= 1;
        }

        for y in (0..=pointer).rev() {
            let token = Token::random(rng, allowed, variants);
            grid.set(Position::new(x, y as usize), Some(token));
            falls.push(FallDescriptor {
                column: x,
                from_row: -1 - (pointer - y),
                to_row: y as usize,
                token,
            });
        }
    }

    RefillOutcome { grid, falls }
}

/// Falls for a board that replaces the previous one wholesale: every token
/// drops in from above its column.
pub fn drop_in(grid: &Grid) -> Vec<FallDescriptor> {
    let size = grid.size() as i32;
    grid.positions()
        .filter_map(|pos| {
            grid.get(pos).map(|&token| FallDescriptor {
                column: pos.x,
                from_row: pos.y as i32 - size,
                to_row: pos.y,
                token,
            })
        })
        .collect()
}

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Index of a token group (colour family)
pub type GroupId = u8;

/// Index of a token face within its group
pub type VariantId = u8;

/// A cell coordinate. `x` is the column, `y` the row (row 0 is the top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Signed offset from `self` to `other`
    pub fn delta(self, other: Position) -> (isize, isize) {
        (
            other.x as isize - self.x as isize,
            other.y as isize - self.y as isize,
        )
    }

    /// Chebyshev (king-move) distance
    pub fn chebyshev(self, other: Position) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// True if the cells touch horizontally, vertically or diagonally
    pub fn is_adjacent(self, other: Position) -> bool {
        self.chebyshev(other) == 1
    }

    /// True if the cells touch diagonally
    pub fn is_diagonal_to(self, other: Position) -> bool {
        self.x.abs_diff(other.x) == 1 && self.y.abs_diff(other.y) == 1
    }
}

/// The 8 king-move offsets, straight moves first
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
];

/// Contents of one grid cell.
///
/// `group` and `variant` never change after creation. `eliminating` and
/// `scale` belong to the presentation layer: the engine sets them when a token
/// is cleared and never reads them back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub group: GroupId,
    pub variant: VariantId,
    #[serde(skip)]
    pub eliminating: bool,
    #[serde(skip, default = "full_scale")]
    pub scale: f32,
}

fn full_scale() -> f32 {
    1.0
}

impl Token {
    pub fn new(group: GroupId, variant: VariantId) -> Self {
        Self {
            group,
            variant,
            eliminating: false,
            scale: 1.0,
        }
    }

    /// Token drawn uniformly at random from `groups`, with a uniform face
    pub fn random<R: Rng + ?Sized>(rng: &mut R, groups: &[GroupId], variants: u8) -> Self {
        let group = groups[rng.gen_range(0..groups.len())];
        let variant = rng.gen_range(0..variants.max(1));
        Self::new(group, variant)
    }

    /// Copy of this token flagged for the explode effect
    pub fn marked_eliminating(self) -> Self {
        Self {
            eliminating: true,
            scale: 1.0,
            ..self
        }
    }
}

/// A square board of optional tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<Token>>,
}

impl Grid {
    /// Create a grid with every cell empty
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    /// Create a fully populated board with uniformly random groups and faces
    pub fn random<R: Rng + ?Sized>(size: usize, group_count: u8, variants: u8, rng: &mut R) -> Self {
        let groups: Vec<GroupId> = (0..group_count).collect();
        let mut grid = Self::empty(size);
        for cell in grid.cells.iter_mut() {
            *cell = Some(Token::random(rng, &groups, variants));
        }
        grid
    }

    /// Parse a letter fixture: one line per row, `A` is group 0, `B` group 1,
    /// and so on; `.` is an empty cell. Every face is variant 0.
    pub fn from_letters(text: &str) -> Option<Self> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let size = rows.len();
        let mut grid = Self::empty(size);

        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != size {
                return None;
            }
            for (x, ch) in row.chars().enumerate() {
                let token = match ch {
                    '.' => None,
                    'A'..='Z' => Some(Token::new(ch as u8 - b'A', 0)),
                    _ => return None,
                };
                grid.set(Position::new(x, y), token);
            }
        }
        Some(grid)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells on the board
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.size && pos.y < self.size
    }

    fn index(&self, pos: Position) -> usize {
        pos.y * self.size + pos.x
    }

    /// Token at a position, `None` for empty or out-of-bounds cells
    pub fn get(&self, pos: Position) -> Option<&Token> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.cells[self.index(pos)].as_ref()
    }

    /// Group of the token at a position
    pub fn group_at(&self, pos: Position) -> Option<GroupId> {
        self.get(pos).map(|t| t.group)
    }

    pub fn set(&mut self, pos: Position, token: Option<Token>) {
        if self.in_bounds(pos) {
            let idx = self.index(pos);
            self.cells[idx] = token;
        }
    }

    /// Remove and return the token at a position
    pub fn take(&mut self, pos: Position) -> Option<Token> {
        if !self.in_bounds(pos) {
            return None;
        }
        let idx = self.index(pos);
        self.cells[idx].take()
    }

    /// All positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let size = self.size;
        (0..size).flat_map(move |y| (0..size).map(move |x| Position::new(x, y)))
    }

    /// In-bounds king-move neighbours of a position
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let nx = pos.x.checked_add_signed(dx)?;
            let ny = pos.y.checked_add_signed(dy)?;
            let next = Position::new(nx, ny);
            self.in_bounds(next).then_some(next)
        })
    }

    /// True if no cell is empty
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Number of empty cells
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    /// Positions of every token whose group is in `groups`
    pub fn positions_in_groups(&self, groups: &BTreeSet<GroupId>) -> Vec<Position> {
        self.positions()
            .filter(|&p| self.group_at(p).is_some_and(|g| groups.contains(&g)))
            .collect()
    }

    /// Number of tokens whose group is in `groups`
    pub fn count_in_groups(&self, groups: &BTreeSet<GroupId>) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|t| groups.contains(&t.group))
            .count()
    }

    /// Distinct groups present on the board
    pub fn groups_present(&self) -> BTreeSet<GroupId> {
        self.cells.iter().flatten().map(|t| t.group).collect()
    }

    /// Render as a letter fixture (inverse of `from_letters`)
    pub fn to_letters(&self) -> String {
        let mut out = String::with_capacity(self.size * (self.size + 1));
        for y in 0..self.size {
            for x in 0..self.size {
                let ch = match self.group_at(Position::new(x, y)) {
                    Some(g) => (b'A' + g) as char,
                    None => '.',
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }
}

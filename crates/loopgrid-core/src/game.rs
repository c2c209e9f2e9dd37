use crate::config::{ConfigError, GameConfig, SubmitMode};
use crate::grid::{Grid, Position, Token};
use crate::hamiltonian::{generate_bonus_board, Tour};
use crate::leaderboard::LeaderboardEntry;
use crate::refill::{allowed_groups, drop_in, refill, FallDescriptor};
use crate::scoring::path_total;
use crate::selection::{PathStep, Selection};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Boards at or above this size never get a bonus board
pub const BONUS_SIZE_LIMIT: usize = 8;

/// Where the board after a turn came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardSource {
    /// Survivors fell down and the gaps were filled
    Refill,
    /// A perfect clear produced a board clearable in one loop
    Hamiltonian,
    /// A perfect clear, but bonus generation failed
    RandomFallback,
}

/// A token being cleared this turn, for the explode effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplodeDescriptor {
    pub position: Position,
    pub token: Token,
}

/// Everything the front end needs to replay one submitted turn
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub path: Vec<PathStep>,
    pub score_delta: i32,
    pub loop_closed: bool,
    pub exploded: Vec<ExplodeDescriptor>,
    pub perfect_clear: bool,
    pub source: BoardSource,
    pub falls: Vec<FallDescriptor>,
    pub game_over: bool,
}

/// Whether a clear earns a bonus board
pub fn is_perfect_clear(
    grid_size: usize,
    eliminated: usize,
    visited_groups: usize,
    group_count: u8,
    path_len: usize,
) -> bool {
    let cells = grid_size * grid_size;
    eliminated == cells
        && visited_groups == group_count as usize
        && grid_size < BONUS_SIZE_LIMIT
        && 2 * path_len <= cells
}

/// One playthrough: the board, the path being drawn and the turn counters
#[derive(Debug, Clone)]
pub struct Game {
    config: GameConfig,
    grid: Grid,
    selection: Selection,
    rng: StdRng,
    score: i64,
    moves: u32,
    moves_left: u32,
    total_cleared: usize,
    quit: bool,
    /// Loop that clears the current board, when it is a bonus board
    bonus_tour: Option<Tour>,
}

impl Game {
    /// Start a game on a random board
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Start a reproducible game
    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Start a game on a prepared board. The board size overrides the configured one.
    pub fn with_grid(mut config: GameConfig, grid: Grid, seed: u64) -> Result<Self, ConfigError> {
        config.grid_size = grid.size();
        config.validate()?;
        Ok(Self::assemble(config, grid, StdRng::seed_from_u64(seed)))
    }

    fn with_rng(config: GameConfig, mut rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Grid::random(
            config.grid_size,
            config.group_count,
            config.variants_per_group,
            &mut rng,
        );
        Ok(Self::assemble(config, grid, rng))
    }

    fn assemble(config: GameConfig, grid: Grid, rng: StdRng) -> Self {
        log::info!(
            "new game: {}x{} board, {} moves, {} groups",
            config.grid_size,
            config.grid_size,
            config.moves_limit,
            config.group_count
        );
        Self {
            moves_left: config.moves_limit,
            config,
            grid,
            selection: Selection::new(),
            rng,
            score: 0,
            moves: 0,
            total_cleared: 0,
            quit: false,
            bonus_tour: None,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn total_cleared(&self) -> usize {
        self.total_cleared
    }

    pub fn bonus_tour(&self) -> Option<&Tour> {
        self.bonus_tour.as_ref()
    }

    /// Score per move, rounded to two decimals
    pub fn mean(&self) -> f64 {
        if self.moves == 0 {
            return 0.0;
        }
        (self.score as f64 / self.moves as f64 * 100.0).round() / 100.0
    }

    /// True once the moves ran out or the player quit
    pub fn is_over(&self) -> bool {
        self.moves_left == 0 || self.quit
    }

    pub fn has_quit(&self) -> bool {
        self.quit
    }

    /// Abandon the game. A quit game is never ranked.
    pub fn quit(&mut self) {
        self.quit = true;
        self.selection.clear();
    }

    /// Pointer pressed on a cell
    pub fn start(&mut self, pos: Position) -> bool {
        if self.is_over() {
            return false;
        }
        self.selection.start(&self.grid, pos)
    }

    /// Pointer dragged onto a cell
    pub fn extend(&mut self, pos: Position) -> bool {
        if self.is_over() {
            return false;
        }
        self.selection.extend(&self.grid, pos)
    }

    /// Pointer released. Submits the path in automatic mode.
    pub fn end(&mut self) -> Option<TurnReport> {
        self.selection.end();
        match self.config.submit_mode {
            SubmitMode::Auto => self.submit(),
            SubmitMode::Manual => None,
        }
    }

    /// Drop the current path without playing it
    pub fn clear_path(&mut self) {
        self.selection.clear();
    }

    /// Replace the path with the loop that clears the current bonus board
    pub fn reveal_bonus_loop(&mut self) -> bool {
        let Some(tour) = self.bonus_tour.clone() else {
            return false;
        };
        let Some((&first, rest)) = tour.positions().split_first() else {
            return false;
        };

        self.selection.clear();
        let walked = self.selection.start(&self.grid, first)
            && rest.iter().all(|&pos| self.selection.extend(&self.grid, pos));
        self.selection.end();
        if !walked {
            self.selection.clear();
        }
        walked
    }

    /// Play the current path.
    ///
    /// Paths shorter than two steps are dropped without using a move.
    pub fn submit(&mut self) -> Option<TurnReport> {
        if self.is_over() {
            self.selection.clear();
            return None;
        }
        let (path, state) = self.selection.take();
        if path.len() < 2 {
            return None;
        }

        let eliminated: Vec<Position> = if state.loop_closed {
            self.grid.positions_in_groups(&state.visited_groups)
        } else {
            path.iter().map(PathStep::position).collect()
        };

        let score_delta = path_total(&path);
        self.score += score_delta as i64;
        self.moves += 1;
        self.moves_left = self.moves_left.saturating_sub(1);
        self.total_cleared += eliminated.len();

        let exploded: Vec<ExplodeDescriptor> = eliminated
            .iter()
            .filter_map(|&pos| {
                self.grid.take(pos).map(|token| ExplodeDescriptor {
                    position: pos,
                    token: token.marked_eliminating(),
                })
            })
            .collect();

        let perfect_clear = is_perfect_clear(
            self.config.grid_size,
            exploded.len(),
            state.visited_groups.len(),
            self.config.group_count,
            path.len(),
        );

        let (source, falls) = if perfect_clear {
            self.replace_board()
        } else {
            let allowed = allowed_groups(
                self.config.group_count,
                &state.visited_groups,
                state.loop_closed,
                path.len(),
                &self.config.refill,
            );
            let outcome = refill(
                &self.grid,
                &allowed,
                self.config.variants_per_group,
                &mut self.rng,
            );
            self.grid = outcome.grid;
            self.bonus_tour = None;
            (BoardSource::Refill, outcome.falls)
        };

        let game_over = self.moves_left == 0;
        log::debug!(
            "move {}: {} steps, {:+} points, {} cleared, {:?}",
            self.moves,
            path.len(),
            score_delta,
            exploded.len(),
            source
        );
        if game_over {
            log::info!("game over: score {}, mean {:.2}", self.score, self.mean());
        }

        Some(TurnReport {
            path,
            score_delta,
            loop_closed: state.loop_closed,
            exploded,
            perfect_clear,
            source,
            falls,
            game_over,
        })
    }

    /// Swap in a bonus board, or a random one if generation fails
    fn replace_board(&mut self) -> (BoardSource, Vec<FallDescriptor>) {
        let cfg = &self.config;
        let source = match generate_bonus_board(
            cfg.grid_size,
            cfg.group_count,
            cfg.variants_per_group,
            &cfg.tour,
            &mut self.rng,
        ) {
            Ok(bonus) => {
                self.grid = bonus.grid;
                self.bonus_tour = Some(bonus.tour);
                BoardSource::Hamiltonian
            }
            Err(err) => {
                log::warn!("falling back to a random board: {err}");
                self.grid = Grid::random(
                    cfg.grid_size,
                    cfg.group_count,
                    cfg.variants_per_group,
                    &mut self.rng,
                );
                self.bonus_tour = None;
                BoardSource::RandomFallback
            }
        };
        (source, drop_in(&self.grid))
    }

    /// Leaderboard entry for a finished game. `None` while running or after a quit.
    pub fn leaderboard_entry(&self, date: &str) -> Option<LeaderboardEntry> {
        if self.quit || self.moves_left > 0 {
            return None;
        }
        Some(LeaderboardEntry {
            score: self.score,
            grid_size: self.config.grid_size,
            moves_limit: self.config.moves_limit,
            mean: self.mean(),
            date: date.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(letters: &str) -> Game {
        let grid = Grid::from_letters(letters).unwrap();
        let config = GameConfig {
            group_count: 3,
            moves_limit: 3,
            ..GameConfig::default()
        };
        Game::with_grid(config, grid, 7).unwrap()
    }

    #[test]
    fn test_invalid_config_refused() {
        let config = GameConfig {
            grid_size: 11,
            ..GameConfig::default()
        };
        assert_eq!(Game::with_seed(config, 1).unwrap_err(), ConfigError::GridSize(11));
    }

    #[test]
    fn test_new_game_state() {
        let game = Game::with_seed(GameConfig::default(), 3).unwrap();
        assert!(game.grid().is_full());
        assert_eq!(game.grid().size(), 5);
        assert_eq!(game.moves_left(), 30);
        assert_eq!(game.score(), 0);
        assert_eq!(game.mean(), 0.0);
        assert!(!game.is_over());
    }

    #[test]
    fn test_short_path_uses_no_move() {
        let mut game = game("AAA\nCBC\nCCC");
        assert!(game.start(Position::new(0, 0)));
        assert!(game.end().is_none());
        assert_eq!(game.moves(), 0);
        assert_eq!(game.moves_left(), 3);
        assert!(game.selection().is_empty());
    }

    #[test]
    fn test_straight_path_turn() {
        let mut game = game("AAA\nCBC\nCCC");
        game.start(Position::new(0, 0));
        game.extend(Position::new(1, 0));
        game.extend(Position::new(2, 0));
        let report = game.end().unwrap();

        assert_eq!(report.score_delta, 3);
        assert!(!report.loop_closed);
        assert_eq!(report.source, BoardSource::Refill);
        assert_eq!(report.exploded.len(), 3);
        assert!(report.exploded.iter().all(|e| e.token.eliminating && e.token.scale == 1.0));
        // the whole top row is refilled from above, nothing else moves
        assert_eq!(report.falls.len(), 3);
        assert!(report.falls.iter().all(|f| f.from_row == -1 && f.to_row == 0));
        // group A was eliminated on a small clear
        assert!(report.falls.iter().all(|f| f.token.group != 0));

        assert_eq!(game.score(), 3);
        assert_eq!(game.moves(), 1);
        assert_eq!(game.moves_left(), 2);
        assert_eq!(game.total_cleared(), 3);
        assert!(game.grid().is_full());
        assert!(game.selection().is_empty());
    }

    #[test]
    fn test_manual_mode_waits_for_submit() {
        let grid = Grid::from_letters("AAA\nCBC\nCCC").unwrap();
        let config = GameConfig {
            group_count: 3,
            submit_mode: SubmitMode::Manual,
            ..GameConfig::default()
        };
        let mut game = Game::with_grid(config, grid, 1).unwrap();
        game.start(Position::new(0, 0));
        game.extend(Position::new(1, 0));
        assert!(game.end().is_none());
        assert_eq!(game.selection().len(), 2);

        let report = game.submit().unwrap();
        assert_eq!(report.score_delta, 1);
        assert_eq!(game.moves(), 1);
    }

    #[test]
    fn test_loop_clears_visited_groups() {
        // A A B / A A B / C C C: loop over the A block
        let mut game = game("AAB\nAAB\nCCC");
        game.start(Position::new(0, 0));
        game.extend(Position::new(1, 0));
        game.extend(Position::new(1, 1));
        game.extend(Position::new(0, 1));
        assert!(game.extend(Position::new(0, 0)));
        let report = game.end().unwrap();

        assert!(report.loop_closed);
        // closing step scores 4 plus one point per A cell
        assert_eq!(report.score_delta, 1 + 2 + 3 + 8);
        assert_eq!(report.exploded.len(), 4);
        assert!(!report.perfect_clear);
        assert_eq!(game.total_cleared(), 4);
    }

    #[test]
    fn test_game_over_and_entry() {
        let grid = Grid::from_letters("AAA\nCBC\nCCC").unwrap();
        let config = GameConfig {
            group_count: 3,
            moves_limit: 1,
            ..GameConfig::default()
        };
        let mut game = Game::with_grid(config, grid, 5).unwrap();
        assert!(game.leaderboard_entry("2024-01-01").is_none());

        game.start(Position::new(0, 0));
        game.extend(Position::new(1, 1));
        let report = game.end().unwrap();
        assert!(report.game_over);
        assert_eq!(report.score_delta, -1);

        assert!(game.is_over());
        assert!(!game.start(Position::new(0, 0)));
        assert!(game.submit().is_none());
        let entry = game.leaderboard_entry("2024-01-01").unwrap();
        assert_eq!(entry.grid_size, 3);
        assert_eq!(entry.moves_limit, 1);
        assert_eq!(entry.score, -1);
        assert_eq!(entry.mean, -1.0);
        assert_eq!(entry.date, "2024-01-01");
    }

    #[test]
    fn test_quit_is_not_ranked() {
        let mut game = game("AAA\nCBC\nCCC");
        game.quit();
        assert!(game.is_over());
        assert!(game.leaderboard_entry("2024-01-01").is_none());
    }

    #[test]
    fn test_mean_rounding() {
        let mut game = game("AAA\nCBC\nCCC");
        game.score = 10;
        game.moves = 3;
        assert_eq!(game.mean(), 3.33);
        game.score = -2;
        assert_eq!(game.mean(), -0.67);
    }

    #[test]
    fn test_perfect_clear_gates() {
        assert!(is_perfect_clear(4, 16, 2, 2, 5));
        // not every cell
        assert!(!is_perfect_clear(4, 15, 2, 2, 5));
        // not every group
        assert!(!is_perfect_clear(4, 16, 2, 3, 5));
        // board too large
        assert!(!is_perfect_clear(8, 64, 2, 2, 5));
        // path longer than half the board
        assert!(!is_perfect_clear(4, 16, 2, 2, 9));
        assert!(is_perfect_clear(4, 16, 2, 2, 8));
    }
}

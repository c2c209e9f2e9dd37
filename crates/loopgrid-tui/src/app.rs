use crate::animations::TurnEffect;
use crate::leaderboard::LeaderboardBackend;
use crate::settings::{Settings, SettingsStore};
use crate::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use loopgrid_core::config::GRID_SIZE_RANGE;
use loopgrid_core::{
    resolve_point, BoardSource, CellMetrics, ConfigError, Game, Grid, Leaderboard, Position,
    Ranking, SubmitMode, TurnReport,
};
use std::sync::Arc;
use std::time::Duration;

/// Terminal columns per board cell
pub const CELL_WIDTH: u16 = 6;
/// Terminal rows per board cell
pub const CELL_HEIGHT: u16 = 3;

/// Result of handling an input event
pub enum AppAction {
    Continue,
    Quit,
}

/// Current screen state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    Playing,
    /// Moves ran out, or the game was abandoned
    GameOver,
    Leaderboard,
}

/// Yes/no question shown over the current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    QuitGame,
    ClearScores,
}

impl Prompt {
    pub fn question(self) -> &'static str {
        match self {
            Prompt::QuitGame => "Abandon this game? It will not be ranked. (y/n)",
            Prompt::ClearScores => "Delete all top scores? (y/n)",
        }
    }
}

/// Which leaderboard table is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardView {
    pub ranking: Ranking,
    pub grid_size: usize,
    pub moves_limit: u32,
}

/// The main application state
pub struct App {
    pub game: Game,
    pub settings: Settings,
    store: SettingsStore,
    leaderboard: Arc<dyn LeaderboardBackend>,
    /// Last snapshot read from the backend
    pub scores: Leaderboard,
    pub view: LeaderboardView,
    pub theme: Theme,
    pub cursor: Position,
    pub screen_state: ScreenState,
    pub prompt: Option<Prompt>,
    pub message: Option<String>,
    message_timer: u32,
    pub effect: Option<TurnEffect>,
    /// Score and origin of the board from the last turn
    pub last_turn: Option<(i32, BoardSource)>,
    /// Terminal cell of the board's top-left corner, set by the renderer
    pub board_origin: (u16, u16),
    seed: Option<u64>,
    games_started: u64,
    game_recorded: bool,
}

impl App {
    pub fn new(
        settings: Settings,
        store: SettingsStore,
        leaderboard: Arc<dyn LeaderboardBackend>,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let game = match seed {
            Some(seed) => Game::with_seed(settings.game.clone(), seed)?,
            None => Game::new(settings.game.clone())?,
        };
        let view = LeaderboardView {
            ranking: Ranking::Total,
            grid_size: settings.game.grid_size,
            moves_limit: settings.game.moves_limit,
        };
        Ok(Self {
            game,
            settings,
            store,
            leaderboard,
            scores: Leaderboard::default(),
            view,
            theme: Theme::dark(),
            cursor: Position::new(0, 0),
            screen_state: ScreenState::Playing,
            prompt: None,
            message: None,
            message_timer: 0,
            effect: None,
            last_turn: None,
            board_origin: (0, 0),
            seed,
            games_started: 1,
            game_recorded: false,
        })
    }

    /// Get the tick rate based on current screen
    pub fn get_tick_rate(&self) -> Duration {
        if self.effect.is_some() {
            Duration::from_millis(33)
        } else {
            Duration::from_millis(100)
        }
    }

    /// Update animations and timers (called every tick)
    pub fn tick(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message = None;
            }
        }

        if let Some(effect) = self.effect.as_mut() {
            if effect.tick() {
                self.effect = None;
            }
        }

        if self.effect.is_none()
            && self.screen_state == ScreenState::Playing
            && self.game.is_over()
        {
            self.screen_state = ScreenState::GameOver;
        }
    }

    /// Show a temporary message
    pub fn show_message(&mut self, msg: &str) {
        self.message = Some(msg.to_string());
        self.message_timer = 30;
    }

    /// Start a new game with the saved settings
    pub fn new_game(&mut self) {
        let config = self.settings.game.clone();
        let game = match self.seed {
            Some(seed) => Game::with_seed(config, seed + self.games_started),
            None => Game::new(config),
        };
        match game {
            Ok(game) => {
                self.game = game;
                self.games_started += 1;
                self.game_recorded = false;
                self.effect = None;
                self.last_turn = None;
                self.cursor = Position::new(0, 0);
                self.screen_state = ScreenState::Playing;
                self.show_message("New game");
            }
            Err(e) => self.show_message(&format!("Cannot start: {e}")),
        }
    }

    fn save_settings(&mut self) {
        if let Err(e) = self.store.save(&self.settings) {
            log::warn!("settings not saved: {e}");
            self.show_message("Failed to save settings");
        }
    }

    /// Record a finished game once. Abandoned games are skipped.
    fn record_game(&mut self) {
        if self.game_recorded {
            return;
        }
        self.game_recorded = true;

        let date = chrono::Local::now().format("%Y-%m-%d").to_string();
        let Some(entry) = self.game.leaderboard_entry(&date) else {
            return;
        };
        if let Err(e) = self.leaderboard.submit_score(entry) {
            log::warn!("score not recorded: {e}");
            self.show_message(&format!("Score not saved: {e}"));
        }
    }

    fn open_leaderboard(&mut self) {
        match self.leaderboard.leaderboard() {
            Ok(scores) => self.scores = scores,
            Err(e) => {
                self.scores = Leaderboard::default();
                self.show_message(&format!("Scores unavailable: {e}"));
            }
        }
        self.view.grid_size = self.game.config().grid_size;
        self.view.moves_limit = self.game.config().moves_limit;
        self.screen_state = ScreenState::Leaderboard;
    }

    /// Name of the score store, flagged when it cannot be reached
    pub fn storage_label(&self) -> String {
        let name = self.leaderboard.backend_name();
        if self.leaderboard.is_available() {
            name.to_string()
        } else {
            format!("{name} (unavailable)")
        }
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if let Some(prompt) = self.prompt {
            self.handle_prompt_key(prompt, key);
            return AppAction::Continue;
        }

        match self.screen_state {
            ScreenState::Playing => self.handle_game_key(key),
            ScreenState::GameOver => self.handle_game_over_key(key),
            ScreenState::Leaderboard => self.handle_leaderboard_key(key),
        }
    }

    fn handle_prompt_key(&mut self, prompt: Prompt, key: KeyEvent) {
        self.prompt = None;
        if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            return;
        }
        match prompt {
            Prompt::QuitGame => {
                self.game.quit();
                self.effect = None;
                self.game_recorded = true;
                self.screen_state = ScreenState::GameOver;
            }
            Prompt::ClearScores => match self.leaderboard.clear() {
                Ok(()) => {
                    self.scores = Leaderboard::default();
                    self.show_message("Top scores cleared");
                }
                Err(e) => self.show_message(&format!("Could not clear scores: {e}")),
            },
        }
    }

    fn handle_game_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') => {
                if self.game.moves() == 0 {
                    return AppAction::Quit;
                }
                self.prompt = Some(Prompt::QuitGame);
            }

            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(0, -1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(0, 1),
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(-1, 0),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(1, 0),

            // Keyboard drag: press to start, press again to release
            KeyCode::Char(' ') => {
                if self.effect.is_some() {
                    return AppAction::Continue;
                }
                if self.game.selection().is_pointer_down() {
                    self.release_pointer();
                } else {
                    self.game.start(self.cursor);
                }
            }

            KeyCode::Enter => {
                if self.game.config().submit_mode == SubmitMode::Manual {
                    self.submit_path();
                } else {
                    self.show_message("Paths submit on release");
                }
            }

            KeyCode::Esc => self.game.clear_path(),

            KeyCode::Char('r') => {
                if self.game.reveal_bonus_loop() {
                    self.show_message("Bonus loop shown");
                } else {
                    self.show_message("No bonus loop on this board");
                }
            }

            KeyCode::Char('s') => {
                self.settings.step_scores = !self.settings.step_scores;
                let state = if self.settings.step_scores { "on" } else { "off" };
                self.show_message(&format!("Step scores {state}"));
                self.save_settings();
            }

            KeyCode::Char('m') => {
                self.settings.game.submit_mode = match self.settings.game.submit_mode {
                    SubmitMode::Auto => SubmitMode::Manual,
                    SubmitMode::Manual => SubmitMode::Auto,
                };
                self.show_message(&format!(
                    "{:?} submit from next game",
                    self.settings.game.submit_mode
                ));
                self.save_settings();
            }

            KeyCode::Char('+') | KeyCode::Char('=') => self.resize_next_game(1),
            KeyCode::Char('-') => self.resize_next_game(-1),

            KeyCode::Char('n') => self.new_game(),
            KeyCode::Char('b') => self.open_leaderboard(),

            _ => {}
        }

        AppAction::Continue
    }

    fn handle_game_over_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') => return AppAction::Quit,
            KeyCode::Char('n') | KeyCode::Enter | KeyCode::Char(' ') => self.new_game(),
            KeyCode::Char('b') => self.open_leaderboard(),
            _ => {}
        }
        AppAction::Continue
    }

    fn handle_leaderboard_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.screen_state = if self.game.is_over() {
                    ScreenState::GameOver
                } else {
                    ScreenState::Playing
                };
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.view.grid_size = cycle(&self.scores.grid_sizes(), self.view.grid_size, false);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.view.grid_size = cycle(&self.scores.grid_sizes(), self.view.grid_size, true);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.view.moves_limit =
                    cycle(&self.scores.moves_limits(), self.view.moves_limit, false);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.view.moves_limit =
                    cycle(&self.scores.moves_limits(), self.view.moves_limit, true);
            }
            KeyCode::Tab | KeyCode::Char('t') => {
                self.view.ranking = self.view.ranking.toggle();
            }
            KeyCode::Char('c') => self.prompt = Some(Prompt::ClearScores),
            _ => {}
        }
        AppAction::Continue
    }

    /// Handle a mouse event on the board
    pub fn handle_mouse(&mut self, event: MouseEvent) {
        if self.screen_state != ScreenState::Playing || self.prompt.is_some() || self.effect.is_some() {
            return;
        }
        let cell = self.cell_at(event.column, event.row);

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(pos) = cell {
                    self.cursor = pos;
                    self.game.start(pos);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(pos) = cell {
                    self.cursor = pos;
                    self.game.extend(pos);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.release_pointer(),
            _ => {}
        }
    }

    /// Board cell under a terminal cell, honoring the dead zone
    pub fn cell_at(&self, column: u16, row: u16) -> Option<Position> {
        let (ox, oy) = self.board_origin;
        if column < ox || row < oy {
            return None;
        }
        let metrics = CellMetrics {
            width: CELL_WIDTH as f32,
            height: CELL_HEIGHT as f32,
        };
        // Aim at the middle of the terminal cell
        let px = (column - ox) as f32 + 0.5;
        let py = (row - oy) as f32 + 0.5;
        resolve_point(px, py, metrics, self.game.grid().size())
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) {
        let max = self.game.grid().size().saturating_sub(1);
        let x = self.cursor.x.saturating_add_signed(dx).min(max);
        let y = self.cursor.y.saturating_add_signed(dy).min(max);
        self.cursor = Position::new(x, y);
        if self.game.selection().is_pointer_down() {
            self.game.extend(self.cursor);
        }
    }

    fn resize_next_game(&mut self, delta: isize) {
        let size = self
            .settings
            .game
            .grid_size
            .saturating_add_signed(delta)
            .clamp(*GRID_SIZE_RANGE.start(), *GRID_SIZE_RANGE.end());
        self.settings.game.grid_size = size;
        self.show_message(&format!("{size}x{size} board from next game"));
        self.save_settings();
    }

    fn release_pointer(&mut self) {
        let before = self.game.grid().clone();
        if let Some(report) = self.game.end() {
            self.play_turn(before, report);
        }
    }

    fn submit_path(&mut self) {
        let before = self.game.grid().clone();
        if let Some(report) = self.game.submit() {
            self.play_turn(before, report);
        }
    }

    fn play_turn(&mut self, before: Grid, report: TurnReport) {
        match report.source {
            BoardSource::Hamiltonian => self.show_message("Perfect clear! Bonus board: one loop clears it"),
            BoardSource::RandomFallback => self.show_message("Perfect clear!"),
            BoardSource::Refill if report.loop_closed => {
                self.show_message(&format!("Loop! {:+}", report.score_delta))
            }
            BoardSource::Refill => {}
        }
        self.last_turn = Some((report.score_delta, report.source));
        self.effect = Some(TurnEffect::new(before, report.exploded, report.falls));

        if report.game_over {
            self.record_game();
        }
    }
}

/// Next (or previous) value after `current` in a sorted list, wrapping around
pub fn cycle<T: Copy + Ord>(values: &[T], current: T, forward: bool) -> T {
    if values.is_empty() {
        return current;
    }
    let found = if forward {
        values.iter().find(|&&v| v > current).or(values.first())
    } else {
        values.iter().rev().find(|&&v| v < current).or(values.last())
    };
    found.copied().unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::MockLeaderboard;
    use crossterm::event::{KeyModifiers, MouseEvent};
    use loopgrid_core::GameConfig;

    fn app() -> App {
        let path = std::env::temp_dir().join(format!("loopgrid-app-{}.json", std::process::id()));
        let settings = Settings {
            game: GameConfig {
                moves_limit: 2,
                ..GameConfig::default()
            },
            step_scores: true,
        };
        App::new(
            settings,
            SettingsStore::with_path(path),
            Arc::new(MockLeaderboard::new()),
            Some(9),
        )
        .unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    /// Any legal first move on the current board
    fn legal_move(app: &App) -> (Position, Position) {
        let grid = app.game.grid();
        grid.positions()
            .find_map(|from| {
                grid.neighbors(from).find_map(|to| {
                    let mut probe = loopgrid_core::Selection::new();
                    (probe.start(grid, from) && probe.extend(grid, to)).then_some((from, to))
                })
            })
            .unwrap()
    }

    #[test]
    fn test_cycle() {
        assert_eq!(cycle(&[3, 5, 7], 5, true), 7);
        assert_eq!(cycle(&[3, 5, 7], 7, true), 3);
        assert_eq!(cycle(&[3, 5, 7], 3, false), 7);
        assert_eq!(cycle(&[3, 5, 7], 6, false), 5);
        assert_eq!(cycle(&[], 4, true), 4);
    }

    #[test]
    fn test_mouse_dead_zone() {
        let mut app = app();
        app.board_origin = (10, 5);
        // middle row of cell (0, 0)
        assert_eq!(app.cell_at(11, 6), Some(Position::new(0, 0)));
        // edge columns and rows of a cell are dead
        assert_eq!(app.cell_at(10, 6), None);
        assert_eq!(app.cell_at(15, 6), None);
        assert_eq!(app.cell_at(11, 5), None);
        assert_eq!(app.cell_at(17, 9), Some(Position::new(1, 1)));
        assert_eq!(app.cell_at(3, 3), None);
    }

    #[test]
    fn test_mouse_drag_plays_turn() {
        let mut app = app();
        app.board_origin = (0, 0);
        let (from, to) = legal_move(&app);
        let screen = |p: Position| (p.x as u16 * CELL_WIDTH + 2, p.y as u16 * CELL_HEIGHT + 1);

        let (c, r) = screen(from);
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), c, r));
        let (c, r) = screen(to);
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), c, r));
        assert_eq!(app.game.selection().len(), 2);
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), c, r));

        assert_eq!(app.game.moves(), 1);
        assert!(app.effect.is_some());
        assert!(app.last_turn.is_some());
    }

    #[test]
    fn test_keyboard_drag_and_game_over() {
        let mut app = app();
        for _ in 0..2 {
            app.effect = None;
            let (from, to) = legal_move(&app);
            app.cursor = from;
            app.handle_key(key(KeyCode::Char(' ')));
            assert!(app.game.selection().is_pointer_down());
            let dx = to.x as isize - from.x as isize;
            let dy = to.y as isize - from.y as isize;
            app.move_cursor(dx, dy);
            assert_eq!(app.cursor, to);
            app.handle_key(key(KeyCode::Char(' ')));
        }
        assert!(app.game.is_over());

        // the screen switches once the effect has played out
        app.effect = None;
        app.tick();
        assert_eq!(app.screen_state, ScreenState::GameOver);

        let scores = app.leaderboard.leaderboard().unwrap();
        assert_eq!(scores.best_total(5, 2).len(), 1);
    }

    #[test]
    fn test_quit_needs_confirmation_and_is_not_ranked() {
        let mut app = app();
        let (from, to) = legal_move(&app);
        app.game.start(from);
        app.game.extend(to);
        app.release_pointer();
        app.effect = None;

        assert!(matches!(app.handle_key(key(KeyCode::Char('q'))), AppAction::Continue));
        assert_eq!(app.prompt, Some(Prompt::QuitGame));
        app.handle_key(key(KeyCode::Char('y')));
        assert_eq!(app.screen_state, ScreenState::GameOver);
        assert!(app.game.has_quit());
        assert!(app.leaderboard.leaderboard().unwrap().is_empty());
    }

    #[test]
    fn test_clear_scores_prompt() {
        let mut app = app();
        app.leaderboard
            .submit_score(loopgrid_core::LeaderboardEntry {
                score: 5,
                grid_size: 5,
                moves_limit: 2,
                mean: 2.5,
                date: "2024-01-01".into(),
            })
            .unwrap();
        app.open_leaderboard();
        assert_eq!(app.screen_state, ScreenState::Leaderboard);
        assert_eq!(app.scores.best_total(5, 2).len(), 1);

        app.handle_key(key(KeyCode::Char('c')));
        app.handle_key(key(KeyCode::Char('n')));
        assert!(!app.leaderboard.leaderboard().unwrap().is_empty());

        app.handle_key(key(KeyCode::Char('c')));
        app.handle_key(key(KeyCode::Char('y')));
        assert!(app.leaderboard.leaderboard().unwrap().is_empty());

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.view.ranking, Ranking::Mean);
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen_state, ScreenState::Playing);
    }
}

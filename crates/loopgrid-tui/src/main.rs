mod animations;
mod app;
mod leaderboard;
mod render;
mod settings;
mod theme;

use app::App;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use loopgrid_core::SubmitMode;
use settings::{Settings, SettingsStore};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Draw loops through a grid of tokens. Straight steps stay in a group,
/// diagonal steps switch groups, closed loops clear whole groups.
#[derive(Parser, Debug)]
#[command(name = "loopgrid", version)]
struct Args {
    /// Board size (3-10)
    #[arg(long, short)]
    size: Option<usize>,

    /// Moves per game
    #[arg(long, short)]
    moves: Option<u32>,

    /// Number of token groups (2-8)
    #[arg(long, short)]
    groups: Option<u8>,

    /// Faces per group (1-8)
    #[arg(long)]
    variants: Option<u8>,

    /// Submit paths with Enter instead of on release
    #[arg(long)]
    manual: bool,

    /// Seed for reproducible boards
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    /// Flags given on the command line win over saved settings
    fn apply(&self, settings: &mut Settings) {
        let game = &mut settings.game;
        if let Some(size) = self.size {
            game.grid_size = size;
        }
        if let Some(moves) = self.moves {
            game.moves_limit = moves;
        }
        if let Some(groups) = self.groups {
            game.group_count = groups;
        }
        if let Some(variants) = self.variants {
            game.variants_per_group = variants;
        }
        if self.manual {
            game.submit_mode = SubmitMode::Manual;
        }
    }
}

/// Log to a file when LOOPGRID_LOG is set; stderr would draw over the game
fn init_logging() {
    if std::env::var_os("LOOPGRID_LOG").is_none() {
        return;
    }
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loopgrid.log");
    let Ok(file) = File::create(&path) else {
        return;
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().filter("LOOPGRID_LOG"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .write_style(env_logger::WriteStyle::Never)
        .try_init();
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    init_logging();

    let store = SettingsStore::new();
    let mut settings = match store.load() {
        Ok(saved) => saved.unwrap_or_default(),
        Err(e) => {
            log::warn!("using default settings: {e}");
            Settings::default()
        }
    };
    args.apply(&mut settings);
    if let Err(e) = settings.game.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }
    if let Err(e) = store.save(&settings) {
        log::warn!("settings not saved: {e}");
    }

    let app = match App::new(settings, store, leaderboard::create_backend_auto(), args.seed) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let result = run_app(&mut stdout, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

fn run_app(stdout: &mut io::Stdout, mut app: App) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        let tick_rate = app.get_tick_rate();

        render::render(stdout, &mut app)?;
        stdout.flush()?;

        // Handle input with timeout for animation updates
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout.min(Duration::from_millis(33)))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                        break;
                    }
                    match app.handle_key(key) {
                        app::AppAction::Continue => {}
                        app::AppAction::Quit => break,
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from(["loopgrid", "--size", "7", "--groups", "3", "--manual"]);
        let mut settings = Settings::default();
        settings.game.moves_limit = 12;
        args.apply(&mut settings);

        assert_eq!(settings.game.grid_size, 7);
        assert_eq!(settings.game.group_count, 3);
        assert_eq!(settings.game.submit_mode, SubmitMode::Manual);
        // untouched values keep the saved setting
        assert_eq!(settings.game.moves_limit, 12);
        assert_eq!(settings.game.variants_per_group, 4);
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let args = Args::parse_from(["loopgrid"]);
        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert_eq!(settings, Settings::default());
    }
}

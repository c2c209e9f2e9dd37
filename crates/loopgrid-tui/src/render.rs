use crate::animations::EffectPhase;
use crate::app::{App, ScreenState, CELL_HEIGHT, CELL_WIDTH};
use crate::theme::{glyph, shrinking_glyph};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use loopgrid_core::{BoardSource, Position, Ranking, SelectionPhase, SubmitMode, Token};
use std::io;

/// Width of the panel right of the board
const INFO_WIDTH: u16 = 28;

pub fn render(stdout: &mut io::Stdout, app: &mut App) -> io::Result<()> {
    let (term_width, term_height) = terminal::size()?;

    execute!(
        stdout,
        Hide,
        SetBackgroundColor(app.theme.bg),
        Clear(ClearType::All)
    )?;

    match app.screen_state {
        ScreenState::Playing => render_game_screen(stdout, app, term_width, term_height)?,
        ScreenState::GameOver => render_game_over_screen(stdout, app, term_width, term_height)?,
        ScreenState::Leaderboard => render_leaderboard_screen(stdout, app, term_width, term_height)?,
    }

    if let Some(ref msg) = app.message {
        render_message(stdout, app, msg, term_width)?;
    }
    if let Some(prompt) = app.prompt {
        render_prompt(stdout, app, prompt.question(), term_width, term_height)?;
    }

    execute!(stdout, Show)?;
    Ok(())
}

fn render_game_screen(
    stdout: &mut io::Stdout,
    app: &mut App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let size = app.game.grid().size() as u16;
    let board_width = size * CELL_WIDTH;
    let board_height = size * CELL_HEIGHT;

    // Board frame + gap + info panel
    let total_width = board_width + 2 + 3 + INFO_WIDTH;
    let start_x = if term_width > total_width {
        (term_width - total_width) / 2
    } else {
        1
    };
    let start_y = if term_height > board_height + 9 { 2 } else { 1 };

    // Mouse input is resolved against the board as drawn
    app.board_origin = (start_x + 1, start_y + 1);

    render_frame(stdout, app, start_x, start_y, board_width, board_height)?;
    render_board(stdout, app)?;

    let info_x = start_x + board_width + 5;
    render_info_panel(stdout, app, info_x, start_y)?;

    let controls_y = start_y + board_height + 3;
    render_controls(stdout, app, start_x, controls_y)?;

    Ok(())
}

fn render_frame(
    stdout: &mut io::Stdout,
    app: &App,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
) -> io::Result<()> {
    let horizontal = "─".repeat(width as usize);
    execute!(
        stdout,
        SetForegroundColor(app.theme.border),
        MoveTo(x, y),
        Print(format!("┌{}┐", horizontal)),
        MoveTo(x, y + height + 1),
        Print(format!("└{}┘", horizontal))
    )?;
    for row in 1..=height {
        execute!(
            stdout,
            MoveTo(x, y + row),
            Print("│"),
            MoveTo(x + width + 1, y + row),
            Print("│")
        )?;
    }
    Ok(())
}

fn render_board(stdout: &mut io::Stdout, app: &App) -> io::Result<()> {
    let grid = app.game.grid();
    for pos in grid.positions() {
        render_cell(stdout, app, pos)?;
    }

    if let Some(ref effect) = app.effect {
        if let EffectPhase::Falling(elapsed) = effect.phase() {
            let (ox, oy) = app.board_origin;
            for fall in &effect.falls {
                // Middle row of the cell the token is passing through
                let row = fall.row_at(elapsed) * CELL_HEIGHT as f32 + 1.0;
                if row < 0.0 {
                    continue;
                }
                let cx = ox + fall.column as u16 * CELL_WIDTH;
                execute!(
                    stdout,
                    MoveTo(cx, oy + row.round() as u16),
                    SetBackgroundColor(app.theme.bg),
                    SetForegroundColor(app.theme.group_color(fall.token.group)),
                    Print(format!("{:^6}", glyph(fall.token.variant)))
                )?;
            }
        }
    }
    Ok(())
}

/// Token to draw in a cell and the scale it is drawn at
fn displayed_token(app: &App, pos: Position) -> Option<(Token, f32)> {
    match app.effect.as_ref().map(|e| (e, e.phase())) {
        Some((effect, EffectPhase::Exploding(scale))) => {
            let token = *effect.before.get(pos)?;
            let scale = if effect.is_exploding(pos) { scale } else { 1.0 };
            Some((token, scale))
        }
        Some((effect, EffectPhase::Falling(_))) if effect.lands_on(pos) => None,
        _ => app.game.grid().get(pos).map(|&t| (t, 1.0)),
    }
}

fn render_cell(stdout: &mut io::Stdout, app: &App, pos: Position) -> io::Result<()> {
    let theme = &app.theme;
    let selection = app.game.selection();
    let (ox, oy) = app.board_origin;
    let cx = ox + pos.x as u16 * CELL_WIDTH;
    let cy = oy + pos.y as u16 * CELL_HEIGHT;

    let step = if app.effect.is_none() {
        selection.index_of(pos).map(|i| selection.steps()[i])
    } else {
        None
    };

    let bg = if pos == app.cursor && app.effect.is_none() {
        theme.cursor_bg
    } else if step.is_some() && selection.loop_closed() {
        theme.loop_bg
    } else if step.is_some() {
        theme.path_bg
    } else {
        theme.bg
    };

    // Score of the move into this cell; the start cell shows the closing step when looped
    let delta = step.map(|s| {
        if selection.loop_closed() && s.position() == selection.steps()[0].position() {
            selection.steps().last().map_or(s.delta_score, |last| last.delta_score)
        } else {
            s.delta_score
        }
    });
    let top = match delta {
        Some(d) if app.settings.step_scores && selection.len() > 1 => format!("{:^6}", format!("{d:+}")),
        _ => " ".repeat(CELL_WIDTH as usize),
    };
    let score_color = match delta {
        Some(d) if d < 0 => theme.penalty,
        _ => theme.gain,
    };

    let (face, face_color) = match displayed_token(app, pos) {
        Some((token, scale)) => (
            shrinking_glyph(token.variant, scale),
            theme.group_color(token.group),
        ),
        None => (' ', theme.fg),
    };

    execute!(
        stdout,
        SetBackgroundColor(bg),
        MoveTo(cx, cy),
        SetForegroundColor(score_color),
        Print(top),
        MoveTo(cx, cy + 1),
        SetForegroundColor(face_color),
        Print(format!("{:^6}", face)),
        MoveTo(cx, cy + 2),
        Print(" ".repeat(CELL_WIDTH as usize)),
        SetBackgroundColor(theme.bg)
    )?;
    Ok(())
}

fn render_info_panel(stdout: &mut io::Stdout, app: &App, x: u16, y: u16) -> io::Result<()> {
    let theme = &app.theme;
    let game = &app.game;
    let selection = game.selection();

    execute!(
        stdout,
        MoveTo(x, y),
        SetForegroundColor(theme.key),
        Print("═══ LOOPGRID ═══")
    )?;

    let mode = match game.config().submit_mode {
        SubmitMode::Auto => "Auto",
        SubmitMode::Manual => "Manual (Enter)",
    };
    let path = match selection.phase() {
        SelectionPhase::Idle => "-".to_string(),
        SelectionPhase::Selecting => format!("{} cells, {:+}", selection.len(), selection.total_score()),
        SelectionPhase::LoopClosed => format!("LOOP {:+}", selection.total_score()),
    };
    let last = match app.last_turn {
        Some((delta, BoardSource::Refill)) => format!("{delta:+}"),
        Some((delta, BoardSource::Hamiltonian)) => format!("{delta:+} bonus board"),
        Some((delta, BoardSource::RandomFallback)) => format!("{delta:+} perfect"),
        None => "-".to_string(),
    };

    let rows = [
        ("Score", game.score().to_string()),
        ("Moves left", game.moves_left().to_string()),
        ("Moves", game.moves().to_string()),
        ("Mean", format!("{:.2}", game.mean())),
        ("Cleared", game.total_cleared().to_string()),
        ("Last move", last),
        ("Path", path),
        ("Submit", mode.to_string()),
    ];

    for (i, (label, value)) in rows.iter().enumerate() {
        execute!(
            stdout,
            MoveTo(x, y + 2 + i as u16),
            SetForegroundColor(theme.info),
            Print(format!("{:<11}", label)),
            SetForegroundColor(theme.fg),
            Print(value)
        )?;
    }

    // Legend: one swatch per group in play
    let legend_y = y + 3 + rows.len() as u16;
    execute!(stdout, MoveTo(x, legend_y), SetForegroundColor(theme.info), Print("Groups "))?;
    for group in 0..game.config().group_count {
        execute!(
            stdout,
            SetForegroundColor(theme.group_color(group)),
            Print("■ ")
        )?;
    }

    if game.bonus_tour().is_some() {
        execute!(
            stdout,
            MoveTo(x, legend_y + 2),
            SetForegroundColor(theme.gain),
            Print("One loop clears this board!")
        )?;
    }

    Ok(())
}

fn render_controls(stdout: &mut io::Stdout, app: &App, x: u16, y: u16) -> io::Result<()> {
    let theme = &app.theme;

    let controls = [
        ("Mouse", "Drag path"),
        ("Arrows", "Move"),
        ("Space", "Start/stop"),
        ("Enter", "Submit"),
        ("Esc", "Clear path"),
        ("r", "Bonus loop"),
        ("s", "Step scores"),
        ("m", "Submit mode"),
        ("+/-", "Board size"),
        ("n", "New game"),
        ("b", "Top scores"),
        ("q", "Quit"),
    ];

    // Display in 3 columns (4 items each)
    for (i, (key, desc)) in controls.iter().enumerate() {
        let col = i / 4;
        let row = i % 4;
        let cx = x + (col as u16) * 20;
        let cy = y + row as u16;

        execute!(
            stdout,
            MoveTo(cx, cy),
            SetForegroundColor(theme.key),
            Print(format!("{:>6}", key)),
            SetForegroundColor(theme.info),
            Print(format!(" {}", desc))
        )?;
    }

    Ok(())
}

fn render_message(
    stdout: &mut io::Stdout,
    app: &App,
    msg: &str,
    term_width: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let padded = format!("  {}  ", msg);
    let x = term_width.saturating_sub(padded.chars().count() as u16) / 2;

    execute!(
        stdout,
        MoveTo(x, 0),
        SetForegroundColor(theme.fg),
        SetBackgroundColor(theme.cursor_bg),
        Print(&padded),
        SetBackgroundColor(theme.bg)
    )?;

    Ok(())
}

fn render_prompt(
    stdout: &mut io::Stdout,
    app: &App,
    question: &str,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let width = question.chars().count() as u16 + 6;
    let x = term_width.saturating_sub(width) / 2;
    let y = term_height / 2;
    let blank = " ".repeat(width as usize);

    execute!(
        stdout,
        SetBackgroundColor(theme.path_bg),
        MoveTo(x, y.saturating_sub(1)),
        Print(&blank),
        MoveTo(x, y),
        SetForegroundColor(theme.key),
        Print(format!("   {}   ", question)),
        MoveTo(x, y + 1),
        Print(&blank),
        SetBackgroundColor(theme.bg)
    )?;
    Ok(())
}

fn centered(stdout: &mut io::Stdout, text: &str, y: u16, color: Color, term_width: u16) -> io::Result<()> {
    let x = term_width.saturating_sub(text.chars().count() as u16) / 2;
    execute!(stdout, MoveTo(x, y), SetForegroundColor(color), Print(text))
}

fn render_game_over_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let game = &app.game;
    let top = term_height.saturating_sub(12) / 2;

    let title = if game.has_quit() {
        "═══ GAME ABANDONED ═══"
    } else {
        "═══ GAME OVER ═══"
    };
    centered(stdout, title, top, theme.key, term_width)?;

    let lines = [
        format!("Final score   {}", game.score()),
        format!("Mean score    {:.2}", game.mean()),
        format!("Moves played  {}", game.moves()),
        format!("Cells cleared {}", game.total_cleared()),
    ];
    for (i, line) in lines.iter().enumerate() {
        centered(stdout, line, top + 2 + i as u16, theme.fg, term_width)?;
    }

    if game.has_quit() {
        centered(stdout, "Abandoned games are not ranked", top + 7, theme.info, term_width)?;
    }

    centered(
        stdout,
        "n/Enter: New game   b: Top scores   q: Quit",
        top + 9,
        theme.info,
        term_width,
    )?;
    Ok(())
}

fn render_leaderboard_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    _term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let view = app.view;

    centered(stdout, "═══ TOP SCORES ═══", 1, theme.key, term_width)?;

    let filter = match view.ranking {
        Ranking::Total => format!(
            "◀ {}x{} ▶   ▲ {} moves ▼   [Total] Mean",
            view.grid_size, view.grid_size, view.moves_limit
        ),
        Ranking::Mean => format!(
            "◀ {}x{} ▶   all move limits   Total [Mean]",
            view.grid_size, view.grid_size
        ),
    };
    centered(stdout, &filter, 3, theme.info, term_width)?;

    let entries = app.scores.ranked(view.ranking, view.grid_size, view.moves_limit);
    let table_x = term_width.saturating_sub(40) / 2;

    execute!(
        stdout,
        MoveTo(table_x, 5),
        SetForegroundColor(theme.border),
        Print(format!("{:>4}  {:>8}  {:>7}  {:>5}  {:<10}", "#", "Score", "Mean", "Moves", "Date"))
    )?;

    if entries.is_empty() {
        centered(stdout, "No games recorded yet", 7, theme.info, term_width)?;
    }

    for (i, entry) in entries.iter().enumerate() {
        let color = if i == 0 { theme.key } else { theme.fg };
        execute!(
            stdout,
            MoveTo(table_x, 6 + i as u16),
            SetForegroundColor(color),
            Print(format!(
                "{:>4}  {:>8}  {:>7.2}  {:>5}  {:<10}",
                i + 1,
                entry.score,
                entry.mean,
                entry.moves_limit,
                entry.date
            ))
        )?;
    }

    centered(
        stdout,
        "←/→ size   ↑/↓ moves   Tab: Total/Mean   c: Clear   Esc: Back",
        18,
        theme.info,
        term_width,
    )?;
    centered(
        stdout,
        &format!("Scores stored: {}", app.storage_label()),
        20,
        theme.border,
        term_width,
    )?;
    Ok(())
}

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;

use super::app::App;

/// Spin up the terminal backend, enter the draw loop, and keep processing input
/// until the user quits. Change notifications are picked up on every tick so
/// the list follows writes made outside the key handlers.
pub fn run_app(app: &mut App) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    info!("terminal session started");

    let result = loop {
        if let Err(err) = app.refresh_if_changed() {
            break Err(err);
        }
        if let Err(err) = terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw frame")
        {
            break Err(err);
        }

        match next_key(app) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(err) => break Err(err),
        }
    };

    cleanup_terminal(&mut terminal)?;
    info!("terminal session ended");
    result
}

/// Wait briefly for a key press and dispatch it. Returns `true` on exit.
fn next_key(app: &mut App) -> Result<bool> {
    if !event::poll(Duration::from_millis(250)).context("event polling failed")? {
        return Ok(false);
    }
    let Event::Key(key_event) = event::read().context("failed to read event")? else {
        return Ok(false);
    };
    if key_event.kind != KeyEventKind::Press {
        return Ok(false);
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char(ch) = key_event.code {
            if ch == 'c' {
                return Ok(true);
            }
            app.handle_ctrl(ch.to_ascii_lowercase())?;
            return Ok(false);
        }
    }

    app.handle_key(key_event.code)
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal
        .show_cursor()
        .context("failed to restore cursor visibility")
}

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use std::time::Instant;

use whaling_map::app::{App, FRAME_INTERVAL};
use whaling_map::config::{init_logging, Cli, Settings};
use whaling_map::data::{load_dataset, load_outline_with_timeout};
use whaling_map::ui;

fn main() -> Result<()> {
    let settings = Settings::from(Cli::parse());
    init_logging(settings.log_file.as_deref())?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, &settings);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(err) = &result {
        log::error!("{err:#}");
    }
    result
}

fn run(terminal: &mut DefaultTerminal, settings: &Settings) -> Result<()> {
    let dataset = match load_dataset(&settings.data_path) {
        Ok(dataset) => dataset,
        Err(err) => {
            log::error!("dataset load failed: {err}");
            return show_fatal(terminal, &err.to_string());
        }
    };
    let outline = load_outline_with_timeout(&settings.map_path, settings.map_timeout);

    let size = terminal.size()?;
    let area = Rect::new(0, 0, size.width, size.height);
    let mut app = App::new(dataset, outline, settings, area);

    // Main loop
    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Wake up early when a resize rebuild is due
        if event::poll(app.poll_timeout(Instant::now()))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key.code),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                Event::Resize(width, height) => app.resize(Instant::now(), width, height),
                _ => {}
            }
        }

        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Keep the error panel up until the user leaves
fn show_fatal(terminal: &mut DefaultTerminal, message: &str) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render_fatal(frame, message))?;
        if event::poll(FRAME_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    return Ok(());
                }
            }
        }
    }
}

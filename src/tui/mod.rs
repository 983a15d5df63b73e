//! Terminal user interface built on ratatui

mod app;
mod components;
mod events;
mod keys;
mod styles;

use anyhow::Result;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::api::HttpFetcher;
use crate::app::CatalogBrowser;
use crate::config::Config;
use crate::pagination::PaginationController;
use crate::sync::SyncContext;

use app::App;
use events::EventHandler;

pub type Backend = CrosstermBackend<io::Stdout>;
pub type Frame<'a> = ratatui::Frame<'a>;

const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Best-effort restore used from the panic hook
pub fn restore_terminal_on_panic() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Main TUI entry point
pub async fn run(config: &Config, pagination: PaginationController) -> Result<()> {
    let fetcher = HttpFetcher::new(&config.api_base, config.fetcher_options())?;
    let sync = SyncContext::new(Arc::new(fetcher), config.sync_policy());

    let mut event_handler = EventHandler::new(TICK_INTERVAL);
    let mut browser = CatalogBrowser::new(sync, pagination, event_handler.app_sender());
    browser.open();
    let mut app = App::new(browser);

    let mut terminal = init_terminal()?;
    let result = run_app(&mut terminal, &mut app, &mut event_handler).await;
    restore_terminal(&mut terminal)?;

    let stats = app.browser().sync().stats();
    info!(
        "Session ended: {} entries, {} network fetches, hit rate {:.0}%",
        stats.entries,
        stats.network_fetches,
        stats.hit_rate * 100.0
    );
    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<Backend>,
    app: &mut App,
    event_handler: &mut EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        match event_handler.next().await {
            Some(event) => {
                if app.handle_event(event)? {
                    break; // Exit requested
                }
            }
            None => break,
        }
    }
    Ok(())
}

use std::io;
use std::sync::Arc;

use anyhow::Context;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use book_inventory::config::AppConfig;
use book_inventory::core::books::ListController;
use book_inventory::core::catalog::CatalogClient;
use book_inventory::tui::app::AppState;
use book_inventory::tui::views::books::BooksView;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let _log_guard = book_inventory::core::logging::init_tui();
    log::info!("{} v{} starting", book_inventory::NAME, book_inventory::VERSION);

    let config = AppConfig::load();
    let client = CatalogClient::new(&config.api)
        .with_context(|| format!("invalid catalog API URL: {}", config.api.base_url))?;

    let controller = ListController::new(Arc::new(client), &config.list);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut app = AppState::new(BooksView::new(controller, event_tx), event_rx);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = app.run(&mut terminal, config.tui.tick_rate()).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.context("terminal UI failed")?;
    log::info!("shutting down");
    Ok(())
}

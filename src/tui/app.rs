use crate::app::{AppEvent, CatalogBrowser, PageView};
use crate::tui::{
    components::{
        centered_rect, grid, Component, ErrorBox, PaginationBar, ProductGrid, SkeletonGrid,
        StatusPill,
    },
    events::Event,
    keys::{Action, KeyMap},
    styles::Theme,
    Frame,
};
use crate::utils::text::{format, string};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How long a status message stays in the status bar
const STATUS_TTL: Duration = Duration::from_secs(4);

/// Main application state and controller
pub struct App {
    /// Catalog state behind the screen
    browser: CatalogBrowser,

    /// Key mappings for the application
    key_map: KeyMap,

    /// Current theme for styling
    theme: Theme,

    show_help: bool,

    /// First visible card row
    scroll: usize,

    /// Area of the product grid in the last frame
    grid_area: Rect,

    /// Status message and when it was set
    status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(browser: CatalogBrowser) -> Self {
        Self {
            browser,
            key_map: KeyMap::default(),
            theme: Theme::default(),
            show_help: false,
            scroll: 0,
            grid_area: Rect::default(),
            status_message: None,
        }
    }

    pub fn browser(&self) -> &CatalogBrowser {
        &self.browser
    }

    /// Handle incoming events. Returns `true` when the application should exit.
    pub fn handle_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event::Key(key) => return Ok(self.handle_key(key)),
            Event::Resize(width, height) => {
                debug!("Terminal resized to {}x{}", width, height);
                self.clamp_scroll();
            }
            Event::Tick => {
                if matches!(self.status_message, Some((_, at)) if at.elapsed() >= STATUS_TTL) {
                    self.status_message = None;
                }
            }
            Event::App(AppEvent::SyncUpdated(snapshot)) => {
                if self.browser.apply_snapshot(snapshot) {
                    self.clamp_scroll();
                }
            }
            Event::App(AppEvent::Error { error }) => {
                warn!("{}", error);
                self.set_status(error);
            }
            Event::Quit => return Ok(true),
        }
        Ok(false)
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.show_help && key.code == KeyCode::Esc {
            self.show_help = false;
            return false;
        }

        let Some(action) = self.key_map.action_for(&key) else {
            return false;
        };

        match action {
            Action::Quit => return true,
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::PreviousPage => self.after_navigation(|browser| browser.previous_page()),
            Action::NextPage => self.after_navigation(|browser| browser.next_page()),
            Action::FirstPage => self.after_navigation(|browser| browser.first_page()),
            Action::LastPage => self.after_navigation(|browser| browser.last_page()),
            Action::LargerPageSize | Action::SmallerPageSize => {
                let larger = action == Action::LargerPageSize;
                if let Some(limit) = self.browser.step_limit(larger) {
                    self.scroll = 0;
                    self.set_status(format!("Showing {} products per page", limit));
                }
            }
            Action::Retry => {
                self.browser.retry();
                self.set_status(format!("Retrying {}", self.browser.request()));
            }
            Action::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            Action::ScrollDown => {
                self.scroll += 1;
                self.clamp_scroll();
            }
        }
        false
    }

    fn after_navigation(&mut self, step: impl FnOnce(&mut CatalogBrowser) -> bool) {
        if step(&mut self.browser) {
            self.scroll = 0;
        } else if self.browser.controls_disabled() {
            self.set_status("Please wait for the current page".to_string());
        }
    }

    fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    fn clamp_scroll(&mut self) {
        let products = self.browser.view().products.len();
        self.scroll = self.scroll.min(grid::max_scroll(products, self.grid_area));
    }

    /// Render the application UI
    pub fn render(&mut self, frame: &mut Frame) {
        let view = self.browser.view();
        frame.render_widget(Block::default().style(self.theme.base_style()), frame.size());

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(1),    // Product grid
                Constraint::Length(1), // Pagination
                Constraint::Length(1), // Status bar
            ])
            .split(frame.size());

        self.render_header(frame, chunks[0], &view);

        self.grid_area = chunks[1];
        if let Some(error) = &view.error {
            ErrorBox::new(&error.to_string(), self.browser.sync().source())
                .render(frame, chunks[1], &self.theme);
        } else if view.is_loading {
            SkeletonGrid::new(view.limit as usize).render(frame, chunks[1], &self.theme);
        } else {
            self.scroll = self
                .scroll
                .min(grid::max_scroll(view.products.len(), chunks[1]));
            ProductGrid::new(&view.products, self.scroll).render(frame, chunks[1], &self.theme);
        }

        PaginationBar::new(&view, self.browser.pagination().page_sizes()).render(
            frame,
            chunks[2],
            &self.theme,
        );

        let status = Paragraph::new(self.status_text(&view)).style(self.theme.status_bar_style());
        frame.render_widget(status, chunks[3]);

        if self.show_help {
            self.render_help_overlay(frame);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, view: &PageView) {
        let title = Line::from(vec![
            Span::styled(" Salona ", self.theme.title_style()),
            Span::styled(
                string::truncate(self.browser.sync().source(), usize::from(area.width / 2)),
                self.theme.dim_style(),
            ),
        ]);
        frame.render_widget(Paragraph::new(title), area);
        StatusPill::new(view).render(frame, area, &self.theme);
    }

    /// Status bar contents: a pending message, otherwise the page summary
    pub fn status_text(&self, view: &PageView) -> String {
        if let Some((message, _)) = &self.status_message {
            return message.clone();
        }

        let mut text = format!(
            " Page {} of {}",
            view.page, view.effective_total_pages
        );
        if let Some((first, last)) = view.item_range() {
            text.push_str(&format!(
                " · items {}-{} of {}",
                first, last, view.effective_total
            ));
        }
        if let Some(fetched_at) = self.browser.snapshot().fetched_at {
            text.push_str(&format!(
                " · updated {} ago",
                format::format_age(fetched_at.elapsed())
            ));
        }
        text.push_str(" · ? help · q quit");
        text
    }

    /// Render help overlay
    fn render_help_overlay(&self, frame: &mut Frame) {
        let area = centered_rect(60, 70, frame.size());
        let entries = self.key_map.help_entries();
        let key_width = entries
            .iter()
            .map(|(keys, _)| string::width(keys))
            .max()
            .unwrap_or(0);

        let lines = entries
            .into_iter()
            .map(|(keys, description)| {
                Line::from(vec![
                    Span::styled(string::pad_right(&keys, key_width + 2), self.theme.title_style()),
                    Span::styled(description, self.theme.text_style()),
                ])
            })
            .collect::<Vec<_>>();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.help_border_style())
            .title(" Help · Esc to close ")
            .title_alignment(Alignment::Center)
            .style(self.theme.help_style());

        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        CancelToken, FetchError, FetchResult, PageFetcher, PageRequest, PageResult, Product,
    };
    use crate::pagination::PaginationController;
    use crate::sync::{SyncContext, SyncPolicy};
    use async_trait::async_trait;
    use crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Catalog of 57 products; fails every call when `broken`
    struct FixedFetcher {
        broken: bool,
    }

    #[async_trait]
    impl PageFetcher for FixedFetcher {
        async fn fetch(&self, request: PageRequest, _cancel: CancelToken) -> FetchResult<PageResult> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if self.broken {
                return Err(FetchError::Network("connection refused".to_string()));
            }
            let total = 57;
            let start = request.skip().min(total);
            let end = (start + u64::from(request.limit)).min(total);
            Ok(PageResult {
                items: (start..end)
                    .map(|i| Product {
                        id: i + 1,
                        title: format!("Product {}", i + 1),
                        price: 12.5,
                        discount_percentage: 10.0,
                        category: "beauty".to_string(),
                        brand: None,
                        rating: 4.0,
                        thumbnail: String::new(),
                        images: vec![],
                        shipping_information: None,
                    })
                    .collect(),
                total,
            })
        }

        fn source(&self) -> &str {
            "test-catalog"
        }
    }

    fn app(broken: bool) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let sync = SyncContext::new(Arc::new(FixedFetcher { broken }), SyncPolicy::default());
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut browser = CatalogBrowser::new(sync, PaginationController::default(), event_tx);
        browser.open();
        (App::new(browser), event_rx)
    }

    /// Deliver browser events until the current page is settled
    async fn settle(app: &mut App, events: &mut mpsc::UnboundedReceiver<AppEvent>) {
        while app.browser().view().is_fetching {
            match events.recv().await {
                Some(event) => {
                    app.handle_event(Event::App(event)).unwrap();
                }
                None => break,
            }
        }
        while let Ok(event) = events.try_recv() {
            app.handle_event(Event::App(event)).unwrap();
        }
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap()
    }

    fn screen(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(usize::from(width))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_navigate_pages() {
        let (mut app, mut events) = app(false);
        settle(&mut app, &mut events).await;
        assert_eq!(app.browser().request(), PageRequest::new(1, 10));

        assert!(!press(&mut app, KeyCode::Right));
        settle(&mut app, &mut events).await;
        assert_eq!(app.browser().request(), PageRequest::new(2, 10));

        press(&mut app, KeyCode::End);
        settle(&mut app, &mut events).await;
        assert_eq!(app.browser().view().products.len(), 7);

        press(&mut app, KeyCode::Char('+'));
        settle(&mut app, &mut events).await;
        assert_eq!(app.browser().request(), PageRequest::new(1, 20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_while_loading_shows_status() {
        let (mut app, mut events) = app(false);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.browser().request().page, 1);
        let view = app.browser().view();
        assert_eq!(app.status_text(&view), "Please wait for the current page");

        settle(&mut app, &mut events).await;
        tokio::time::advance(STATUS_TTL).await;
        app.handle_event(Event::Tick).unwrap();
        let view = app.browser().view();
        assert!(app.status_text(&view).starts_with(" Page 1 of 6 · items 1-10 of 57"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_help_and_quit() {
        let (mut app, _events) = app(false);
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_help);

        assert!(press(&mut app, KeyCode::Char('q')));
        assert!(app.handle_event(Event::Quit).unwrap());
        assert!(app
            .handle_event(Event::Key(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            )))
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_catalog() {
        let (mut app, mut events) = app(false);
        let loading = screen(&mut app, 100, 30);
        assert!(loading.contains("Loading"));
        assert!(loading.contains("░"));

        settle(&mut app, &mut events).await;
        let loaded = screen(&mut app, 100, 30);
        assert!(loaded.contains("Product 1"));
        assert!(loaded.contains("Up to date"));
        assert!(loaded.contains("Per page:"));
        assert!(loaded.contains("Page 1 of 6"));

        press(&mut app, KeyCode::Char('?'));
        let help = screen(&mut app, 100, 30);
        assert!(help.contains("Next page"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_screen_and_status() {
        let (mut app, mut events) = app(true);
        settle(&mut app, &mut events).await;

        let view = app.browser().view();
        assert!(view.is_error);
        assert!(app.status_text(&view).starts_with("Failed to load page 1"));

        let rendered = screen(&mut app, 100, 30);
        assert!(rendered.contains("Something went wrong"));
        assert!(rendered.contains("connection refused"));
        assert!(rendered.contains("Error"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_is_bounded() {
        let (mut app, mut events) = app(false);
        settle(&mut app, &mut events).await;
        // 3 columns and 2 rows of cards fit, 10 products need 4 rows
        screen(&mut app, 100, 19);

        for _ in 0..5 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.scroll, 2);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.scroll, 1);

        press(&mut app, KeyCode::Right);
        assert_eq!(app.scroll, 0);
    }
}

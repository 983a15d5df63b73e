//! Product cards laid out in a responsive grid

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{
        block::{Position, Title},
        Block, Borders, Paragraph, Wrap,
    },
};

use super::{centered_fixed, Component};
use crate::api::Product;
use crate::tui::{styles::Theme, Frame};
use crate::utils::text::{format, string};

/// Narrowest card, in columns
pub const CARD_MIN_WIDTH: u16 = 30;

/// Card height including its border
pub const CARD_HEIGHT: u16 = 8;

pub const MAX_COLUMNS: u16 = 4;

/// Lines available for the title inside a card
const TITLE_LINES: usize = 2;

/// Number of card columns that fit in `width`
pub fn grid_columns(width: u16) -> u16 {
    (width / CARD_MIN_WIDTH).clamp(1, MAX_COLUMNS)
}

/// Number of card rows needed for `items` cards
pub fn grid_rows(items: usize, columns: u16) -> usize {
    items.div_ceil(usize::from(columns.max(1)))
}

/// Card rows that fit in `height`
pub fn visible_rows(height: u16) -> usize {
    usize::from((height / CARD_HEIGHT).max(1))
}

/// Largest scroll offset (in rows) that still fills the area
pub fn max_scroll(items: usize, area: Rect) -> usize {
    grid_rows(items, grid_columns(area.width)).saturating_sub(visible_rows(area.height))
}

/// Body lines of one product card, `width` being the inner width
pub fn card_lines(product: &Product, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(6);

    let mut title = textwrap::wrap(&product.title, width.max(1))
        .into_iter()
        .map(|line| line.into_owned())
        .collect::<Vec<_>>();
    if title.len() > TITLE_LINES {
        title.truncate(TITLE_LINES);
        let last = format!("{} …", title[TITLE_LINES - 1]);
        title[TITLE_LINES - 1] = string::truncate(&last, width);
    }
    for line in title {
        lines.push(Line::from(Span::styled(line, theme.title_style())));
    }

    let origin = match &product.brand {
        Some(brand) => format!("{} · {}", product.category, brand),
        None => product.category.clone(),
    };
    lines.push(Line::from(Span::styled(
        string::truncate(&origin, width),
        theme.dim_style(),
    )));

    lines.push(Line::from(vec![
        Span::styled(format::stars(product.clamped_rating()), theme.rating_style()),
        Span::raw(" "),
        Span::styled(product.rating_label(), theme.dim_style()),
    ]));

    let mut price = vec![Span::styled(
        format::currency(product.discounted_price()),
        theme.price_style(),
    )];
    if let Some(badge) = product.discount_badge() {
        price.push(Span::raw(" "));
        price.push(Span::styled(
            format::currency(product.price),
            theme.old_price_style(),
        ));
        price.push(Span::raw(" "));
        price.push(Span::styled(format!(" -{}% ", badge), theme.badge_style()));
    }
    lines.push(Line::from(price));

    if let Some(shipping) = &product.shipping_information {
        lines.push(Line::from(Span::styled(
            string::truncate(shipping, width),
            theme.dim_style(),
        )));
    }

    lines
}

/// File name of the card image, shown on the card border
pub fn cover_label(product: &Product, max_width: usize) -> Option<String> {
    let name = product.cover().rsplit('/').next().unwrap_or_default();
    (!name.is_empty()).then(|| string::truncate(name, max_width))
}

/// Cells of the grid for the visible rows, in reading order
fn card_areas(area: Rect, count: usize, scroll: usize) -> Vec<(usize, Rect)> {
    let columns = grid_columns(area.width);
    let rows = visible_rows(area.height);
    let per_row = usize::from(columns);

    let mut areas = Vec::new();
    for (visible_row, row) in (scroll..scroll + rows).enumerate() {
        let first = row * per_row;
        if first >= count {
            break;
        }
        let y = area.y + visible_row as u16 * CARD_HEIGHT;
        let height = CARD_HEIGHT.min(area.bottom().saturating_sub(y));
        if height == 0 {
            break;
        }
        let row_area = Rect::new(area.x, y, area.width, height);
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, u32::from(columns)); per_row])
            .split(row_area);
        for (column, cell) in cells.iter().enumerate() {
            let index = first + column;
            if index < count {
                areas.push((index, *cell));
            }
        }
    }
    areas
}

/// Cards for the products of the current page
pub struct ProductGrid<'a> {
    products: &'a [Product],
    scroll: usize,
}

impl<'a> ProductGrid<'a> {
    pub fn new(products: &'a [Product], scroll: usize) -> Self {
        Self { products, scroll }
    }
}

impl Component for ProductGrid<'_> {
    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if self.products.is_empty() {
            let empty = Paragraph::new("No products on this page")
                .style(theme.dim_style())
                .alignment(Alignment::Center);
            frame.render_widget(empty, centered_fixed(area.width, 1, area));
            return;
        }

        for (index, cell) in card_areas(area, self.products.len(), self.scroll) {
            let product = &self.products[index];
            let mut block = Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(Span::styled(format!(" #{} ", product.id), theme.dim_style()));
            if let Some(cover) = cover_label(product, usize::from(cell.width / 2)) {
                block = block.title(
                    Title::from(Span::styled(cover, theme.dim_style()))
                        .position(Position::Bottom)
                        .alignment(Alignment::Right),
                );
            }
            let inner = block.inner(cell);
            let body = Paragraph::new(card_lines(product, usize::from(inner.width), theme))
                .block(block);
            frame.render_widget(body, cell);
        }
    }
}

/// Placeholder cards shown while the first fetch of a page runs
pub struct SkeletonGrid {
    count: usize,
}

impl SkeletonGrid {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl Component for SkeletonGrid {
    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        for (_, cell) in card_areas(area, self.count, 0) {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(theme.skeleton_style());
            let width = usize::from(block.inner(cell).width);
            let lines = [width * 3 / 4, width / 2, 0, width / 3, width / 4]
                .into_iter()
                .map(|w| Line::from(Span::styled("░".repeat(w), theme.skeleton_style())))
                .collect::<Vec<_>>();
            frame.render_widget(Paragraph::new(lines).block(block), cell);
        }
    }
}

/// Message shown when the current page could not be loaded
pub struct ErrorBox<'a> {
    message: &'a str,
    source: &'a str,
}

impl<'a> ErrorBox<'a> {
    pub fn new(message: &'a str, source: &'a str) -> Self {
        Self { message, source }
    }
}

impl Component for ErrorBox<'_> {
    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let popup = centered_fixed(60, 8, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.error_style())
            .title(Span::styled(" Something went wrong ", theme.error_style()));
        let lines = vec![
            Line::from(Span::styled(self.message.to_string(), theme.text_style())),
            Line::from(Span::styled(
                format!("Source: {}", self.source),
                theme.dim_style(),
            )),
            Line::default(),
            Line::from(vec![
                Span::raw("Press "),
                Span::styled("r", theme.title_style()),
                Span::raw(" to retry"),
            ]),
        ];
        let body = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(body, popup);
    }
}

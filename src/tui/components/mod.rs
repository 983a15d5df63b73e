//! Widgets of the catalog screen

pub mod grid;
pub mod pagination;
pub mod status;

pub use grid::{ErrorBox, ProductGrid, SkeletonGrid};
pub use pagination::PaginationBar;
pub use status::StatusPill;

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::tui::{styles::Theme, Frame};

/// Base trait for all UI components
pub trait Component {
    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme);
}

/// Create a centered rectangle with given percentage of the parent area
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Create a centered rectangle of a fixed size, shrunk to fit `area`
pub fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

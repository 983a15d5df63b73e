use ratatui::{
    layout::{Alignment, Rect},
    style::Color,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::Component;
use crate::app::PageView;
use crate::tui::{styles::Theme, Frame};

/// Sync state of the current page as shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PillState {
    Loading,
    Updating,
    UpToDate,
    Error,
}

impl PillState {
    pub fn from_view(view: &PageView) -> Self {
        if view.is_error {
            PillState::Error
        } else if view.is_loading {
            PillState::Loading
        } else if view.is_fetching {
            PillState::Updating
        } else {
            PillState::UpToDate
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PillState::Loading => "Loading…",
            PillState::Updating => "Updating…",
            PillState::UpToDate => "Up to date",
            PillState::Error => "Error",
        }
    }

    fn color(&self, theme: &Theme) -> Color {
        match self {
            PillState::Loading | PillState::Updating => theme.info,
            PillState::UpToDate => theme.success,
            PillState::Error => theme.error,
        }
    }
}

pub struct StatusPill {
    state: PillState,
    stale: bool,
}

impl StatusPill {
    pub fn new(view: &PageView) -> Self {
        Self {
            state: PillState::from_view(view),
            stale: view.is_stale,
        }
    }

    pub fn line(&self, theme: &Theme) -> Line<'static> {
        let mut spans = vec![Span::styled(
            format!(" ● {} ", self.state.label()),
            theme.pill_style(self.state.color(theme)),
        )];
        if self.stale {
            spans.push(Span::styled(
                " totals from last good page",
                theme.dim_style(),
            ));
        }
        Line::from(spans)
    }
}

impl Component for StatusPill {
    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        frame.render_widget(
            Paragraph::new(self.line(theme)).alignment(Alignment::Right),
            area,
        );
    }
}

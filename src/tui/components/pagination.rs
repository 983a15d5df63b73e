use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::Component;
use crate::app::PageView;
use crate::pagination::{page_window, PageSlot, WindowMode};
use crate::tui::{styles::Theme, Frame};

/// Prev/next controls, windowed page numbers and the page-size picker
pub struct PaginationBar<'a> {
    view: &'a PageView,
    page_sizes: &'a [u32],
}

impl<'a> PaginationBar<'a> {
    pub fn new(view: &'a PageView, page_sizes: &'a [u32]) -> Self {
        Self { view, page_sizes }
    }

    pub fn line(&self, mode: WindowMode, theme: &Theme) -> Line<'static> {
        let view = self.view;
        let disabled = view.controls_disabled();
        let style_for = |enabled: bool, style: Style| {
            if enabled && !disabled {
                style
            } else {
                theme.disabled_style()
            }
        };

        let mut spans = vec![
            Span::styled("‹ Prev", style_for(view.has_previous(), theme.text_style())),
            Span::raw("  "),
        ];

        for slot in page_window(view.page, view.effective_total_pages, mode) {
            let span = match slot {
                PageSlot::Page(page) if page == view.page => {
                    Span::styled(format!(" {} ", page), style_for(true, theme.current_page_style()))
                }
                PageSlot::Page(page) => {
                    Span::styled(format!(" {} ", page), style_for(true, theme.text_style()))
                }
                PageSlot::Ellipsis => Span::styled(" … ", theme.dim_style()),
            };
            spans.push(span);
        }

        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "Next ›",
            style_for(view.has_next(), theme.text_style()),
        ));

        if mode == WindowMode::Desktop {
            spans.push(Span::styled("   Per page:", theme.dim_style()));
            for &size in self.page_sizes {
                let span = if size == view.limit {
                    Span::styled(format!(" [{}]", size), style_for(true, theme.title_style()))
                } else {
                    Span::styled(format!(" {}", size), style_for(true, theme.dim_style()))
                };
                spans.push(span);
            }
        } else {
            spans.push(Span::styled(
                format!("   {}/page", view.limit),
                style_for(true, theme.dim_style()),
            ));
        }

        Line::from(spans)
    }
}

impl Component for PaginationBar<'_> {
    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let line = self.line(WindowMode::for_width(area.width), theme);
        frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::DEFAULT_PAGE_SIZES;

    fn view(page: u32, total_pages: u32) -> PageView {
        PageView {
            products: vec![],
            is_loading: false,
            is_fetching: false,
            is_error: false,
            error: None,
            page,
            limit: 10,
            effective_total_pages: total_pages,
            effective_total: u64::from(total_pages) * 10,
            is_stale: false,
        }
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_desktop_line() {
        let theme = Theme::default();
        let view = view(5, 10);
        let line = PaginationBar::new(&view, &DEFAULT_PAGE_SIZES).line(WindowMode::Desktop, &theme);
        assert_eq!(
            text(&line),
            "‹ Prev   1  …  4  5  6  …  10   Next ›   Per page: 5 [10] 20 30 50"
        );
    }

    #[test]
    fn test_mobile_line() {
        let theme = Theme::default();
        let view = view(1, 6);
        let line = PaginationBar::new(&view, &DEFAULT_PAGE_SIZES).line(WindowMode::Mobile, &theme);
        let text = text(&line);
        assert!(text.starts_with("‹ Prev   1  2  3  …   Next ›"));
        assert!(text.ends_with("10/page"));
    }

    #[test]
    fn test_edges_are_disabled() {
        let theme = Theme::default();
        let view = view(1, 1);
        let line = PaginationBar::new(&view, &DEFAULT_PAGE_SIZES).line(WindowMode::Desktop, &theme);
        assert_eq!(line.spans[0].style, theme.disabled_style());
        let next = line.spans.iter().find(|span| span.content == "Next ›").unwrap();
        assert_eq!(next.style, theme.disabled_style());
    }

    #[test]
    fn test_all_controls_disabled_while_fetching() {
        let theme = Theme::default();
        let mut view = view(3, 10);
        view.is_fetching = true;
        let line = PaginationBar::new(&view, &DEFAULT_PAGE_SIZES).line(WindowMode::Desktop, &theme);
        let current = line.spans.iter().find(|span| span.content == " 3 ").unwrap();
        assert_eq!(current.style, theme.disabled_style());
        let size = line.spans.iter().find(|span| span.content == " [10]").unwrap();
        assert_eq!(size.style, theme.disabled_style());
    }
}

use ratatui::style::{Color, Modifier, Style};

/// Application theme configuration
#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color,
    pub accent: Color,

    pub text: Color,
    pub text_dim: Color,
    pub text_bright: Color,

    pub background: Color,
    pub background_alt: Color,

    pub border: Color,
    pub border_focused: Color,

    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,

    pub placeholder: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Create a dark theme
    pub fn dark() -> Self {
        Self {
            primary: Color::Rgb(147, 51, 234),    // Purple
            accent: Color::Rgb(236, 72, 153),     // Pink

            text: Color::Rgb(248, 250, 252),      // Slate-50
            text_dim: Color::Rgb(148, 163, 184),  // Slate-400
            text_bright: Color::Rgb(255, 255, 255),

            background: Color::Rgb(15, 23, 42),   // Slate-900
            background_alt: Color::Rgb(30, 41, 59), // Slate-800

            border: Color::Rgb(71, 85, 105),      // Slate-600
            border_focused: Color::Rgb(147, 51, 234),

            success: Color::Rgb(34, 197, 94),     // Green-500
            warning: Color::Rgb(245, 158, 11),    // Amber-500
            error: Color::Rgb(239, 68, 68),       // Red-500
            info: Color::Rgb(59, 130, 246),       // Blue-500

            placeholder: Color::Rgb(100, 116, 139), // Slate-500
        }
    }

    pub fn base_style(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.text_dim)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.text_bright)
            .add_modifier(Modifier::BOLD)
    }

    pub fn price_style(&self) -> Style {
        Style::default()
            .fg(self.success)
            .add_modifier(Modifier::BOLD)
    }

    /// Original price next to a discounted one
    pub fn old_price_style(&self) -> Style {
        Style::default()
            .fg(self.text_dim)
            .add_modifier(Modifier::CROSSED_OUT)
    }

    pub fn badge_style(&self) -> Style {
        Style::default()
            .fg(self.text_bright)
            .bg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn rating_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn skeleton_style(&self) -> Style {
        Style::default().fg(self.background_alt)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }

    pub fn current_page_style(&self) -> Style {
        Style::default()
            .fg(self.text_bright)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    /// Controls that cannot be used right now
    pub fn disabled_style(&self) -> Style {
        Style::default()
            .fg(self.placeholder)
            .add_modifier(Modifier::DIM)
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default().fg(self.text).bg(self.background_alt)
    }

    pub fn help_style(&self) -> Style {
        Style::default()
            .fg(self.text)
            .bg(self.background)
            .add_modifier(Modifier::BOLD)
    }

    pub fn help_border_style(&self) -> Style {
        Style::default()
            .fg(self.border_focused)
            .add_modifier(Modifier::BOLD)
    }

    pub fn pill_style(&self, color: Color) -> Style {
        Style::default()
            .fg(color)
            .bg(self.background_alt)
            .add_modifier(Modifier::BOLD)
    }
}

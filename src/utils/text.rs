//! Text helpers shared by the terminal UI and the CLI

/// Width-aware string helpers
pub mod string {
    use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

    /// Display width of `text` in terminal columns
    pub fn width(text: &str) -> usize {
        UnicodeWidthStr::width(text)
    }

    /// Cut `text` to at most `max_width` columns, ending with `…` when cut
    pub fn truncate(text: &str, max_width: usize) -> String {
        if width(text) <= max_width {
            return text.to_string();
        }
        if max_width == 0 {
            return String::new();
        }

        let mut result = String::new();
        let mut used = 0;
        for c in text.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > max_width - 1 {
                break;
            }
            result.push(c);
            used += w;
        }
        result.push('…');
        result
    }

    /// Pad `text` with spaces on the right up to `target` columns
    pub fn pad_right(text: &str, target: usize) -> String {
        let padding = target.saturating_sub(width(text));
        format!("{}{}", text, " ".repeat(padding))
    }
}

/// Display formatting for catalog values
pub mod format {
    use std::time::Duration;

    use super::string::{pad_right, width};
    use crate::api::{star_fill, STAR_COUNT};

    /// `$1,899.99`
    pub fn currency(amount: f64) -> String {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        let cents = (amount.abs() * 100.0).round() as u64;
        let whole = (cents / 100).to_string();

        let mut grouped = String::new();
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
        format!("{}${}.{:02}", sign, grouped, cents % 100)
    }

    /// Five stars, a star counts as filled from half way
    pub fn stars(rating: f64) -> String {
        let mut out = String::with_capacity(STAR_COUNT * 3);
        for fill in star_fill(rating) {
            out.push(if fill >= 0.5 { '★' } else { '☆' });
        }
        out
    }

    /// Coarse age such as `45s` or `3m`
    pub fn format_age(age: Duration) -> String {
        let secs = age.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else {
            format!("{}h", secs / 3600)
        }
    }

    /// Plain-text table with column widths measured in terminal columns
    pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
        if headers.is_empty() {
            return String::new();
        }

        let mut widths = headers.iter().map(|h| width(h)).collect::<Vec<_>>();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(width(cell));
                }
            }
        }

        let mut result = render_row(headers, &widths);
        result.push('\n');
        result.push_str(
            &widths
                .iter()
                .map(|&w| "-".repeat(w))
                .collect::<Vec<_>>()
                .join("-|-"),
        );
        result.push('\n');

        for row in rows {
            let cells = row.iter().map(String::as_str).collect::<Vec<_>>();
            result.push_str(&render_row(&cells, &widths));
            result.push('\n');
        }

        result
    }

    fn render_row(cells: &[&str], widths: &[usize]) -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| pad_right(cell, widths.get(i).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::format::*;
    use super::string::*;
    use std::time::Duration;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Chanel Coco Noir", 20), "Chanel Coco Noir");
        assert_eq!(truncate("Chanel Coco Noir", 8), "Chanel …");
        assert_eq!(truncate("abc", 0), "");
        // wide characters count as two columns
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn test_currency() {
        assert_eq!(currency(9.283), "$9.28");
        assert_eq!(currency(1899.99), "$1,899.99");
        assert_eq!(currency(1_234_567.0), "$1,234,567.00");
        assert_eq!(currency(f64::NAN), "$0.00");
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(4.94), "★★★★★");
        assert_eq!(stars(3.4), "★★★☆☆");
        assert_eq!(stars(0.0), "☆☆☆☆☆");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(42)), "42s");
        assert_eq!(format_age(Duration::from_secs(150)), "2m");
        assert_eq!(format_age(Duration::from_secs(7200)), "2h");
    }

    #[test]
    fn test_format_table() {
        let table = format_table(
            &["ID", "Title"],
            &[
                vec!["1".to_string(), "Mascara".to_string()],
                vec!["12".to_string(), "Bed".to_string()],
            ],
        );
        assert_eq!(table, "ID | Title\n---|--------\n1  | Mascara\n12 | Bed\n");
    }
}

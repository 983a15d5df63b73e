//! Windowed page-number labels with ellipsis gaps

use std::fmt;

/// Terminals narrower than this use the compact window
pub const MOBILE_MAX_COLUMNS: u16 = 79;

/// One label of the pagination bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Page(u32),
    Ellipsis,
}

impl fmt::Display for PageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSlot::Page(page) => write!(f, "{}", page),
            PageSlot::Ellipsis => write!(f, "…"),
        }
    }
}

/// Window layout: desktop shows neighbours of the current page, mobile
/// only the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowMode {
    #[default]
    Desktop,
    Mobile,
}

impl WindowMode {
    pub fn for_width(columns: u16) -> Self {
        if columns <= MOBILE_MAX_COLUMNS {
            WindowMode::Mobile
        } else {
            WindowMode::Desktop
        }
    }
}

/// Page labels to render for `current` out of `total` pages.
///
/// An ellipsis never stands for a single page (that page is shown instead)
/// and two ellipses are never adjacent.
pub fn page_window(current: u32, total: u32, mode: WindowMode) -> Vec<PageSlot> {
    use PageSlot::{Ellipsis, Page};

    let total = total.max(1);
    let current = current.clamp(1, total);

    let raw = match mode {
        WindowMode::Desktop => {
            if total <= 5 {
                all_pages(total)
            } else if current <= 3 {
                vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(total)]
            } else if current >= total - 2 {
                vec![
                    Page(1),
                    Ellipsis,
                    Page(total - 3),
                    Page(total - 2),
                    Page(total - 1),
                    Page(total),
                ]
            } else {
                vec![
                    Page(1),
                    Ellipsis,
                    Page(current - 1),
                    Page(current),
                    Page(current + 1),
                    Ellipsis,
                    Page(total),
                ]
            }
        }
        WindowMode::Mobile => {
            if total <= 3 {
                all_pages(total)
            } else if current <= 2 {
                vec![Page(1), Page(2), Page(3), Ellipsis]
            } else if current >= total - 1 {
                vec![Ellipsis, Page(total - 2), Page(total - 1), Page(total)]
            } else {
                vec![Page(1), Ellipsis, Page(current), Ellipsis, Page(total)]
            }
        }
    };

    collapse_gaps(&raw, total)
}

fn all_pages(total: u32) -> Vec<PageSlot> {
    (1..=total).map(PageSlot::Page).collect()
}

/// Replace one-page gaps with the page itself and drop empty gaps
fn collapse_gaps(raw: &[PageSlot], total: u32) -> Vec<PageSlot> {
    let mut slots: Vec<PageSlot> = Vec::with_capacity(raw.len());

    for (index, slot) in raw.iter().enumerate() {
        match *slot {
            PageSlot::Page(page) => slots.push(PageSlot::Page(page)),
            PageSlot::Ellipsis => {
                let before = slots
                    .iter()
                    .rev()
                    .find_map(|slot| match slot {
                        PageSlot::Page(page) => Some(*page),
                        PageSlot::Ellipsis => None,
                    })
                    .unwrap_or(0);
                let after = raw[index + 1..]
                    .iter()
                    .find_map(|slot| match slot {
                        PageSlot::Page(page) => Some(*page),
                        PageSlot::Ellipsis => None,
                    })
                    .unwrap_or(total + 1);

                match after.saturating_sub(before).saturating_sub(1) {
                    0 => {}
                    1 => slots.push(PageSlot::Page(before + 1)),
                    _ => {
                        if slots.last() != Some(&PageSlot::Ellipsis) {
                            slots.push(PageSlot::Ellipsis);
                        }
                    }
                }
            }
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageSlot::{Ellipsis as E, Page as P};

    fn pages(range: std::ops::RangeInclusive<u32>) -> Vec<PageSlot> {
        range.map(P).collect()
    }

    #[test]
    fn test_desktop_middle() {
        assert_eq!(
            page_window(5, 10, WindowMode::Desktop),
            vec![P(1), E, P(4), P(5), P(6), E, P(10)]
        );
    }

    #[test]
    fn test_mobile_middle() {
        assert_eq!(
            page_window(5, 10, WindowMode::Mobile),
            vec![P(1), E, P(5), E, P(10)]
        );
    }

    #[test]
    fn test_desktop_edges() {
        assert_eq!(page_window(1, 4, WindowMode::Desktop), pages(1..=4));
        assert_eq!(
            page_window(2, 10, WindowMode::Desktop),
            vec![P(1), P(2), P(3), P(4), E, P(10)]
        );
        assert_eq!(
            page_window(9, 10, WindowMode::Desktop),
            vec![P(1), E, P(7), P(8), P(9), P(10)]
        );
    }

    #[test]
    fn test_mobile_edges() {
        assert_eq!(page_window(2, 3, WindowMode::Mobile), pages(1..=3));
        assert_eq!(
            page_window(1, 10, WindowMode::Mobile),
            vec![P(1), P(2), P(3), E]
        );
        assert_eq!(
            page_window(10, 10, WindowMode::Mobile),
            vec![E, P(8), P(9), P(10)]
        );
    }

    #[test]
    fn test_single_page_gap_shows_the_page() {
        // current=4 of 8 would hide only page 2 behind the first ellipsis
        assert_eq!(
            page_window(4, 8, WindowMode::Desktop),
            vec![P(1), P(2), P(3), P(4), P(5), E, P(8)]
        );
        assert_eq!(page_window(3, 6, WindowMode::Desktop), pages(1..=6));
        assert_eq!(page_window(1, 4, WindowMode::Mobile), pages(1..=4));
        assert_eq!(page_window(4, 4, WindowMode::Mobile), pages(1..=4));
        assert_eq!(page_window(3, 5, WindowMode::Mobile), pages(1..=5));
    }

    #[test]
    fn test_window_invariants() {
        for mode in [WindowMode::Desktop, WindowMode::Mobile] {
            for total in 1..=30 {
                for current in 1..=total {
                    let window = page_window(current, total, mode);
                    assert!(window.contains(&P(current)), "{mode:?} {current}/{total}");

                    let numbers: Vec<u32> = window
                        .iter()
                        .filter_map(|slot| match slot {
                            P(page) => Some(*page),
                            E => None,
                        })
                        .collect();
                    assert!(numbers.windows(2).all(|w| w[0] < w[1]));
                    assert!(numbers.iter().all(|page| (1..=total).contains(page)));
                    assert!(!window.windows(2).any(|w| w[0] == E && w[1] == E));
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        assert_eq!(page_window(0, 0, WindowMode::Desktop), vec![P(1)]);
        assert_eq!(
            page_window(99, 10, WindowMode::Desktop),
            page_window(10, 10, WindowMode::Desktop)
        );
    }

    #[test]
    fn test_mode_for_width() {
        assert_eq!(WindowMode::for_width(60), WindowMode::Mobile);
        assert_eq!(WindowMode::for_width(79), WindowMode::Mobile);
        assert_eq!(WindowMode::for_width(80), WindowMode::Desktop);
    }

    #[test]
    fn test_slot_display() {
        let labels: Vec<String> = page_window(5, 10, WindowMode::Mobile)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(labels.join(" "), "1 … 5 … 10");
    }
}

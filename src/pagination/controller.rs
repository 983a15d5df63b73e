//! Current page and page size, with clamped navigation

use thiserror::Error;
use tracing::debug;

use crate::api::PageRequest;

/// Page sizes offered to the user
pub const DEFAULT_PAGE_SIZES: [u32; 5] = [5, 10, 20, 30, 50];

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("Unsupported page size {size}; choose one of {allowed:?}")]
    UnsupportedPageSize { size: u32, allowed: Vec<u32> },

    #[error("At least one positive page size is required")]
    NoPageSizes,
}

/// Owns `{page, limit}` for the active view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationController {
    page: u32,
    limit: u32,
    page_sizes: Vec<u32>,
}

impl PaginationController {
    /// Create a controller on page 1.
    ///
    /// `page_sizes` is sorted and de-duplicated; `limit` must be one of them.
    pub fn new(page_sizes: &[u32], limit: u32) -> Result<Self, PaginationError> {
        let mut sizes: Vec<u32> = page_sizes.iter().copied().filter(|size| *size > 0).collect();
        sizes.sort_unstable();
        sizes.dedup();
        if sizes.is_empty() {
            return Err(PaginationError::NoPageSizes);
        }
        if !sizes.contains(&limit) {
            return Err(PaginationError::UnsupportedPageSize {
                size: limit,
                allowed: sizes,
            });
        }

        Ok(Self {
            page: 1,
            limit,
            page_sizes: sizes,
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn page_sizes(&self) -> &[u32] {
        &self.page_sizes
    }

    /// The request for the current position
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    /// Move to `target`, clamped into `[1, total_pages]`. Returns whether the
    /// page changed.
    pub fn go_to_page(&mut self, target: i64, total_pages: u32) -> bool {
        let last = i64::from(total_pages.max(1));
        // the clamp keeps the value inside u32 range
        let clamped = target.clamp(1, last) as u32;
        if clamped == self.page {
            return false;
        }
        debug!("Page {} -> {} (of {})", self.page, clamped, last);
        self.page = clamped;
        true
    }

    /// Place the controller on `page` before any totals are known
    pub fn start_at(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self, total_pages: u32) -> bool {
        self.go_to_page(i64::from(self.page) + 1, total_pages)
    }

    pub fn previous_page(&mut self, total_pages: u32) -> bool {
        self.go_to_page(i64::from(self.page) - 1, total_pages)
    }

    pub fn first_page(&mut self, total_pages: u32) -> bool {
        self.go_to_page(1, total_pages)
    }

    pub fn last_page(&mut self, total_pages: u32) -> bool {
        self.go_to_page(i64::from(total_pages), total_pages)
    }

    /// Change the page size; the page always resets to 1 because offsets of
    /// the old size no longer apply
    pub fn set_limit(&mut self, limit: u32) -> Result<(), PaginationError> {
        if !self.page_sizes.contains(&limit) {
            return Err(PaginationError::UnsupportedPageSize {
                size: limit,
                allowed: self.page_sizes.clone(),
            });
        }
        debug!("Page size {} -> {}", self.limit, limit);
        self.limit = limit;
        self.page = 1;
        Ok(())
    }

    /// Step to the next larger (or smaller) allowed size. Returns the new
    /// size, or `None` when already at the end of the list.
    pub fn step_limit(&mut self, larger: bool) -> Option<u32> {
        let position = self.page_sizes.iter().position(|size| *size == self.limit)?;
        let next = if larger {
            self.page_sizes.get(position + 1)
        } else {
            position.checked_sub(1).and_then(|i| self.page_sizes.get(i))
        };
        let next = *next?;
        self.set_limit(next).ok()?;
        Some(next)
    }
}

impl Default for PaginationController {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            page_sizes: DEFAULT_PAGE_SIZES.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_creation() {
        let controller = PaginationController::new(&[50, 10, 5, 10], 10).unwrap();
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.page_sizes(), &[5, 10, 50]);
        assert_eq!(controller.request(), PageRequest::new(1, 10));

        assert_eq!(
            PaginationController::new(&[5, 10], 7),
            Err(PaginationError::UnsupportedPageSize {
                size: 7,
                allowed: vec![5, 10]
            })
        );
        assert_eq!(PaginationController::new(&[0], 0), Err(PaginationError::NoPageSizes));
    }

    #[test]
    fn test_go_to_page_clamps() {
        let mut controller = PaginationController::default();
        for (target, expected) in [(-5i64, 1u32), (0, 1), (3, 3), (6, 6), (7, 6), (i64::MAX, 6)] {
            controller.go_to_page(target, 6);
            assert_eq!(controller.page(), expected, "target {target}");
            // repeating the call is a no-op
            assert!(!controller.go_to_page(target, 6));
            assert_eq!(controller.page(), expected);
        }
    }

    #[test]
    fn test_go_to_page_with_zero_pages_stays_on_first() {
        let mut controller = PaginationController::default();
        assert!(!controller.go_to_page(4, 0));
        assert_eq!(controller.page(), 1);
    }

    #[test]
    fn test_start_at_skips_clamping() {
        let mut controller = PaginationController::default();
        controller.start_at(9);
        assert_eq!(controller.page(), 9);
        controller.start_at(0);
        assert_eq!(controller.page(), 1);
    }

    #[test]
    fn test_page_navigation() {
        let mut controller = PaginationController::default();
        assert!(!controller.previous_page(5));
        assert!(controller.next_page(5));
        assert_eq!(controller.page(), 2);
        assert!(controller.last_page(5));
        assert_eq!(controller.page(), 5);
        assert!(!controller.next_page(5));
        assert!(controller.first_page(5));
        assert_eq!(controller.page(), 1);
    }

    #[test]
    fn test_set_limit_resets_page() {
        let mut controller = PaginationController::default();
        for size in DEFAULT_PAGE_SIZES {
            controller.go_to_page(4, 10);
            controller.set_limit(size).unwrap();
            assert_eq!(controller.page(), 1);
            assert_eq!(controller.limit(), size);
        }
    }

    #[test]
    fn test_set_limit_rejects_unknown_size() {
        let mut controller = PaginationController::default();
        controller.go_to_page(3, 10);
        assert!(controller.set_limit(15).is_err());
        assert_eq!(controller.limit(), 10);
        assert_eq!(controller.page(), 3);
    }

    #[test]
    fn test_step_limit() {
        let mut controller = PaginationController::default();
        assert_eq!(controller.step_limit(true), Some(20));
        assert_eq!(controller.step_limit(false), Some(10));
        assert_eq!(controller.step_limit(false), Some(5));
        assert_eq!(controller.step_limit(false), None);
        controller.set_limit(50).unwrap();
        assert_eq!(controller.step_limit(true), None);
    }
}

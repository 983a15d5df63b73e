//! Catalog request and response types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of stars shown for a rating
pub const STAR_COUNT: usize = 5;

/// Upper bound of a product rating
pub const MAX_RATING: f64 = 5.0;

/// Identity of one page of the catalog.
///
/// Used as the cache key by the synchronizer: two requests with the same
/// page and limit always share one cache entry and one in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Create a request; a page of 0 is treated as page 1
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit,
        }
    }

    /// Number of items to skip on the remote side
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// The request for the following page with the same limit
    pub fn next(&self) -> Self {
        Self::new(self.page.saturating_add(1), self.limit)
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} (limit {})", self.page, self.limit)
    }
}

/// One page of products plus the total size of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    #[serde(rename = "products")]
    pub items: Vec<Product>,
    pub total: u64,
}

impl PageResult {
    pub fn total_pages(&self, limit: u32) -> u32 {
        total_pages(self.total, limit)
    }
}

/// `max(1, ceil(total / limit))`; a limit of 0 yields a single page
pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 1;
    }
    let pages = total.div_ceil(u64::from(limit)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// A catalog product, display-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub shipping_information: Option<String>,
}

impl Product {
    /// Image used for the card: first gallery image, else the thumbnail
    pub fn cover(&self) -> &str {
        self.images
            .first()
            .map(String::as_str)
            .unwrap_or(self.thumbnail.as_str())
    }

    fn discount(&self) -> f64 {
        finite_or_zero(self.discount_percentage)
    }

    /// Price after applying the discount percentage
    pub fn discounted_price(&self) -> f64 {
        finite_or_zero(self.price) * (1.0 - self.discount() / 100.0)
    }

    /// Rounded discount for the badge, only when there is a discount
    pub fn discount_badge(&self) -> Option<i64> {
        let discount = self.discount();
        (discount > 0.0).then(|| discount.round() as i64)
    }

    pub fn clamped_rating(&self) -> f64 {
        finite_or_zero(self.rating).clamp(0.0, MAX_RATING)
    }

    /// Rating with one decimal, e.g. `4.5`
    pub fn rating_label(&self) -> String {
        format!("{:.1}", self.clamped_rating())
    }
}

/// Fill fraction (0.0 to 1.0) of each star for a rating
pub fn star_fill(rating: f64) -> [f64; STAR_COUNT] {
    let rating = finite_or_zero(rating);
    let mut fill = [0.0; STAR_COUNT];
    for (i, slot) in fill.iter_mut().enumerate() {
        *slot = (rating - i as f64).clamp(0.0, 1.0);
    }
    fill
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

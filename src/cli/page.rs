use anyhow::{anyhow, Result};
use clap::Args;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{HttpFetcher, PageRequest, Product};
use crate::app::PageView;
use crate::config::Config;
use crate::pagination::MetaReconciler;
use crate::sync::SyncContext;
use crate::utils::text::{format, string};

/// Print one page of the catalog
#[derive(Args)]
pub struct PageCommand {
    /// Page number, starting at 1
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Products per page (one of the configured page sizes)
    #[arg(short = 'l', long = "limit")]
    pub limit: Option<u32>,

    /// Print the page as JSON
    #[arg(long = "json")]
    pub json: bool,
}

impl PageCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        debug!("Executing page command");

        let mut pagination = config.pagination()?;
        if let Some(limit) = self.limit {
            pagination.set_limit(limit)?;
        }
        let request = PageRequest::new(self.page, pagination.limit());

        let fetcher = HttpFetcher::new(config.api_base.clone(), config.fetcher_options())?;
        let sync = SyncContext::new(Arc::new(fetcher), config.sync_policy());

        sync.fetch(request)
            .await
            .map_err(|info| anyhow!("Failed to load {}: {}", request, info))?;

        let snapshot = sync.snapshot(request);
        let meta = MetaReconciler::new().observe(&snapshot.state, request.limit);
        let view = PageView::new(request, &snapshot, meta);
        if request.page > view.effective_total_pages {
            warn!(
                "{} is past the last page ({})",
                request, view.effective_total_pages
            );
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            print!("{}", render_page(&view));
        }
        Ok(())
    }
}

const TITLE_WIDTH: usize = 40;

fn product_row(product: &Product) -> Vec<String> {
    vec![
        product.id.to_string(),
        string::truncate(&product.title, TITLE_WIDTH),
        product.brand.clone().unwrap_or_else(|| "-".to_string()),
        format::currency(product.discounted_price()),
        product
            .discount_badge()
            .map(|badge| format!("-{}%", badge))
            .unwrap_or_default(),
        format!("{} {}", format::stars(product.rating), product.rating_label()),
    ]
}

/// Table of products followed by a one-line summary
pub fn render_page(view: &PageView) -> String {
    let rows: Vec<Vec<String>> = view.products.iter().map(product_row).collect();
    let mut out = format::format_table(&["ID", "Title", "Brand", "Price", "Off", "Rating"], &rows);

    let range = match view.item_range() {
        Some((first, last)) => format!("items {}-{} of {}", first, last, view.effective_total),
        None => format!("no items ({} total)", view.effective_total),
    };
    out.push_str(&format!(
        "\nPage {} of {} · {}\n",
        view.page, view.effective_total_pages, range
    ));
    out
}

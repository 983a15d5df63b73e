//! Fetch adapter trait and the reqwest implementation

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, trace};

use super::{
    cancel::CancelToken,
    errors::{FetchError, FetchResult},
    types::{PageRequest, PageResult},
};

/// Default catalog endpoint
pub const DEFAULT_API_BASE: &str = "https://dummyjson.com/products";

/// Source of catalog pages.
///
/// Implementations perform a single attempt: retry policy belongs to the
/// synchronizer. They must return `FetchError::Aborted` when the token fires
/// before the page is available.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: PageRequest, cancel: CancelToken) -> FetchResult<PageResult>;

    /// Human-readable description of the source, used in logs and the UI
    fn source(&self) -> &str;
}

/// Options for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpFetcherOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpFetcherOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("salona/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Fetches pages from a dummyjson-compatible REST endpoint
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, options: HttpFetcherOptions) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}?limit={limit}&skip={skip}`
    pub fn page_url(&self, request: PageRequest) -> String {
        page_url(&self.base_url, request)
    }

    async fn fetch_page(&self, request: PageRequest) -> FetchResult<PageResult> {
        let url = self.page_url(request);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let page: PageResult = serde_json::from_slice(&body)?;
        trace!("Received {} of {} products for {}", page.items.len(), page.total, request);
        Ok(page)
    }
}

pub fn page_url(base_url: &str, request: PageRequest) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}limit={}&skip={}",
        base_url,
        separator,
        request.limit,
        request.skip()
    )
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: PageRequest, cancel: CancelToken) -> FetchResult<PageResult> {
        if cancel.is_cancelled() {
            return Err(FetchError::Aborted);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Fetch for {} aborted", request);
                Err(FetchError::Aborted)
            }
            result = self.fetch_page(request) => result,
        }
    }

    fn source(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn fetcher(server: &MockServer) -> HttpFetcher {
        HttpFetcher::new(server.url("/products"), HttpFetcherOptions::default()).unwrap()
    }

    #[test]
    fn test_page_url_uses_skip_offset() {
        let url = page_url(DEFAULT_API_BASE, PageRequest::new(3, 20));
        assert_eq!(url, "https://dummyjson.com/products?limit=20&skip=40");

        let url = page_url("http://host/products?select=title", PageRequest::new(1, 5));
        assert_eq!(url, "http://host/products?select=title&limit=5&skip=0");
    }

    #[tokio::test]
    async fn test_fetch_parses_page() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/products")
                    .query_param("limit", "10")
                    .query_param("skip", "10");
                then.status(200).json_body(json!({
                    "products": [{"id": 11, "title": "Annibale Colombo Bed", "price": 1899.99}],
                    "total": 194,
                    "skip": 10,
                    "limit": 10
                }));
            })
            .await;

        let page = fetcher(&server)
            .fetch(PageRequest::new(2, 10), CancelToken::new())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.total, 194);
        assert_eq!(page.items[0].id, 11);
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products");
                then.status(503);
            })
            .await;

        let err = fetcher(&server)
            .fetch(PageRequest::new(1, 10), CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Http { status: 503 });
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products");
                then.status(200).body("{\"items\": []}");
            })
            .await;

        let err = fetcher(&server)
            .fetch(PageRequest::new(1, 10), CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products");
                then.status(200)
                    .delay(Duration::from_secs(5))
                    .json_body(json!({"products": [], "total": 0}));
            })
            .await;

        let token = CancelToken::new();
        let fetcher = fetcher(&server);
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = fetcher
            .fetch(PageRequest::new(1, 10), token)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Aborted);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let fetcher =
            HttpFetcher::new("http://127.0.0.1:9/products", HttpFetcherOptions::default()).unwrap();
        let err = fetcher
            .fetch(PageRequest::new(1, 10), CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::{HttpFetcherOptions, DEFAULT_API_BASE};
use crate::assets::{cache_root, AssetCacheOptions, DEFAULT_CACHE_PREFIX, DEFAULT_CACHE_VERSION};
use crate::pagination::{PaginationController, DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZES};
use crate::sync::SyncPolicy;

/// Default origin for pre-cached static assets
pub const DEFAULT_ASSET_ORIGIN: &str = "http://localhost:5173";

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for logs and the asset cache
    pub data_dir: PathBuf,

    /// Catalog endpoint
    pub api_base: String,

    /// Page size used at start-up
    pub default_limit: u32,

    /// Page sizes offered to the user
    pub page_sizes: Vec<u32>,

    /// How long a loaded page is served without a network call
    #[serde(with = "duration_str")]
    pub fresh_for: Duration,

    /// How long a loaded page is kept at all
    #[serde(with = "duration_str")]
    pub retain_for: Duration,

    /// Retries after a failed fetch
    pub retries: u32,

    #[serde(with = "duration_str")]
    pub request_timeout: Duration,

    /// Origin static assets are downloaded from
    pub asset_origin: String,

    /// Version suffix of the asset cache name
    pub asset_version: String,
}

impl Default for Config {
    fn default() -> Self {
        let policy = SyncPolicy::default();
        Self {
            data_dir: dirs::data_dir()
                .map(|dir| dir.join("salona"))
                .unwrap_or_else(|| PathBuf::from("./data")),
            api_base: DEFAULT_API_BASE.to_string(),
            default_limit: DEFAULT_PAGE_SIZE,
            page_sizes: DEFAULT_PAGE_SIZES.to_vec(),
            fresh_for: policy.fresh_for,
            retain_for: policy.retain_for,
            retries: policy.retries,
            request_timeout: Duration::from_secs(30),
            asset_origin: DEFAULT_ASSET_ORIGIN.to_string(),
            asset_version: DEFAULT_CACHE_VERSION.to_string(),
        }
    }
}

/// Settings read from a `salona.json` file; absent keys keep their value
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub api_base: Option<String>,
    pub default_limit: Option<u32>,
    pub page_sizes: Option<Vec<u32>>,
    #[serde(with = "duration_str::option")]
    pub fresh_for: Option<Duration>,
    #[serde(with = "duration_str::option")]
    pub retain_for: Option<Duration>,
    pub retries: Option<u32>,
    #[serde(with = "duration_str::option")]
    pub request_timeout: Option<Duration>,
    pub asset_origin: Option<String>,
    pub asset_version: Option<String>,
}

impl Config {
    /// Initialize configuration from the environment and config files
    pub async fn init() -> Result<Self> {
        debug!("Initializing configuration");

        let mut config = Self::default();
        config.load_from_env();

        if let Some(file_config) = Self::load_from_file().await? {
            config.merge_with(file_config);
        }

        Ok(config)
    }

    /// Load configuration from `SALONA_*` environment variables
    pub fn load_from_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = var("SALONA_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(api_base) = var("SALONA_API_BASE") {
            self.api_base = api_base;
        }
        if let Some(limit) = parse_env(&var, "SALONA_DEFAULT_LIMIT", |v| v.parse::<u32>().ok()) {
            self.default_limit = limit;
        }
        if let Some(sizes) = parse_env(&var, "SALONA_PAGE_SIZES", parse_sizes) {
            self.page_sizes = sizes;
        }
        if let Some(fresh_for) = parse_env(&var, "SALONA_FRESH_FOR", parse_duration) {
            self.fresh_for = fresh_for;
        }
        if let Some(retain_for) = parse_env(&var, "SALONA_RETAIN_FOR", parse_duration) {
            self.retain_for = retain_for;
        }
        if let Some(retries) = parse_env(&var, "SALONA_RETRIES", |v| v.parse::<u32>().ok()) {
            self.retries = retries;
        }
        if let Some(timeout) = parse_env(&var, "SALONA_REQUEST_TIMEOUT", parse_duration) {
            self.request_timeout = timeout;
        }
        if let Some(origin) = var("SALONA_ASSET_ORIGIN") {
            self.asset_origin = origin;
        }
        if let Some(version) = var("SALONA_ASSET_VERSION") {
            self.asset_version = version;
        }
    }

    /// Candidate config files, in priority order
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./.salona.json"), PathBuf::from("./salona.json")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("salona").join("salona.json"));
        }
        paths
    }

    /// Read the first config file that exists
    pub async fn load_from_file() -> Result<Option<FileConfig>> {
        for path in Self::config_paths() {
            if path.exists() {
                return Self::read_file(&path).await.map(Some);
            }
        }
        Ok(None)
    }

    pub async fn read_file(path: &Path) -> Result<FileConfig> {
        debug!("Loading configuration from: {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Merge file settings into this configuration
    pub fn merge_with(&mut self, other: FileConfig) {
        if let Some(data_dir) = other.data_dir {
            self.data_dir = data_dir;
        }
        if let Some(api_base) = other.api_base {
            self.api_base = api_base;
        }
        if let Some(limit) = other.default_limit {
            self.default_limit = limit;
        }
        if let Some(sizes) = other.page_sizes {
            self.page_sizes = sizes;
        }
        if let Some(fresh_for) = other.fresh_for {
            self.fresh_for = fresh_for;
        }
        if let Some(retain_for) = other.retain_for {
            self.retain_for = retain_for;
        }
        if let Some(retries) = other.retries {
            self.retries = retries;
        }
        if let Some(timeout) = other.request_timeout {
            self.request_timeout = timeout;
        }
        if let Some(origin) = other.asset_origin {
            self.asset_origin = origin;
        }
        if let Some(version) = other.asset_version {
            self.asset_version = version;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_url("api_base", &self.api_base)?;
        validate_url("asset_origin", &self.asset_origin)?;

        if self.page_sizes.is_empty() {
            return Err(anyhow::anyhow!("page_sizes must not be empty"));
        }
        if self.page_sizes.contains(&0) {
            return Err(anyhow::anyhow!("page_sizes must all be greater than 0"));
        }
        if !self.page_sizes.contains(&self.default_limit) {
            return Err(anyhow::anyhow!(
                "default_limit {} is not one of page_sizes {:?}",
                self.default_limit,
                self.page_sizes
            ));
        }
        if self.fresh_for > self.retain_for {
            return Err(anyhow::anyhow!(
                "fresh_for ({}) must not exceed retain_for ({})",
                humantime::format_duration(self.fresh_for),
                humantime::format_duration(self.retain_for)
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow::anyhow!("request_timeout must be greater than 0"));
        }
        if self.asset_version.is_empty() {
            return Err(anyhow::anyhow!("asset_version is required"));
        }

        Ok(())
    }

    /// Create the data directory if needed
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;
        }
        Ok(())
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy {
            fresh_for: self.fresh_for,
            retain_for: self.retain_for,
            retries: self.retries,
            ..SyncPolicy::default()
        }
    }

    pub fn pagination(&self) -> Result<PaginationController> {
        Ok(PaginationController::new(&self.page_sizes, self.default_limit)?)
    }

    pub fn fetcher_options(&self) -> HttpFetcherOptions {
        HttpFetcherOptions {
            timeout: self.request_timeout,
            ..HttpFetcherOptions::default()
        }
    }

    pub fn asset_options(&self) -> AssetCacheOptions {
        AssetCacheOptions {
            root: cache_root(&self.data_dir),
            origin: self.asset_origin.clone(),
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            version: self.asset_version.clone(),
            timeout: self.request_timeout,
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("salona.log")
    }
}

fn parse_env<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = var(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!("Ignoring invalid value for {}: {:?}", key, raw);
    }
    parsed
}

fn parse_duration(value: &str) -> Option<Duration> {
    humantime::parse_duration(value).ok()
}

/// Comma-separated list such as `5,10,20`
fn parse_sizes(value: &str) -> Option<Vec<u32>> {
    value
        .split(',')
        .map(|size| size.trim().parse::<u32>().ok())
        .collect()
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).with_context(|| format!("{} is not a valid URL: {}", field, value))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(anyhow::anyhow!(
            "{} must use http or https, got '{}'",
            field,
            scheme
        )),
    }
}

/// Durations written as humantime strings such as `"2m"` or `"30s"`
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => humantime::parse_duration(&raw)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

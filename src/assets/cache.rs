//! On-disk asset cache with install, activate and cache-first lookup

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{AssetError, AssetResult};

pub const DEFAULT_CACHE_PREFIX: &str = "salona-cache";
pub const DEFAULT_CACHE_VERSION: &str = "v1";

/// Assets pre-cached by `install` when no list is given
pub const DEFAULT_ASSETS: [&str; 3] = ["/", "/index.html", "/salona.png"];

const MANIFEST_FILE: &str = "manifest.json";

/// Where an asset was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Cache,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub path: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub source: AssetSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub file: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub installed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    fn find(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    /// File name for `path`, unique among the other entries
    fn file_for(&self, path: &str) -> String {
        let base = file_stem(path);
        let taken = |name: &str| {
            self.entries
                .iter()
                .any(|entry| entry.file == name && entry.path != path)
        };
        if !taken(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn upsert(&mut self, entry: ManifestEntry) {
        self.entries.retain(|existing| existing.path != entry.path);
        self.entries.push(entry);
        self.entries.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

/// Settings for `AssetCache::new`
#[derive(Debug, Clone)]
pub struct AssetCacheOptions {
    /// Directory holding one sub-directory per cache version
    pub root: PathBuf,
    /// Base URL asset paths are resolved against
    pub origin: String,
    pub prefix: String,
    pub version: String,
    pub timeout: Duration,
}

impl AssetCacheOptions {
    pub fn new(root: impl Into<PathBuf>, origin: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            origin: origin.into(),
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            version: DEFAULT_CACHE_VERSION.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// A named, versioned asset cache
pub struct AssetCache {
    client: Client,
    root: PathBuf,
    origin: String,
    name: String,
}

impl AssetCache {
    pub fn new(options: AssetCacheOptions) -> AssetResult<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| AssetError::Network {
                path: options.origin.clone(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            root: options.root,
            origin: options.origin.trim_end_matches('/').to_string(),
            name: format!("{}-{}", options.prefix, options.version),
        })
    }

    /// `{prefix}-{version}`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// Download every path and store them together. Nothing is stored
    /// unless all downloads succeed.
    pub async fn install<S: AsRef<str>>(&self, paths: &[S]) -> AssetResult<Vec<ManifestEntry>> {
        for path in paths {
            validate_path(path.as_ref())?;
        }
        info!("Installing {} asset(s) into {}", paths.len(), self.name);

        let downloads = try_join_all(paths.iter().map(|path| self.download(path.as_ref()))).await?;

        let dir = self.dir();
        fs::create_dir_all(&dir).await?;
        let mut manifest = self.load_manifest().await?;
        let installed_at = Utc::now();

        let mut installed = Vec::with_capacity(downloads.len());
        for (path, content_type, body) in downloads {
            let file = manifest.file_for(&path);
            fs::write(dir.join(&file), &body).await?;
            let entry = ManifestEntry {
                path,
                file,
                content_type,
                size: body.len() as u64,
                installed_at,
            };
            debug!("Cached {} as {} ({} bytes)", entry.path, entry.file, entry.size);
            manifest.upsert(entry.clone());
            installed.push(entry);
        }

        // entries become visible only once the manifest is written
        let json = serde_json::to_vec_pretty(&manifest)?;
        fs::write(dir.join(MANIFEST_FILE), json).await?;
        Ok(installed)
    }

    /// Remove every cache directory other than the current one. Returns the
    /// names removed.
    pub async fn activate(&self) -> AssetResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut removed = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == self.name {
                continue;
            }
            fs::remove_dir_all(entry.path()).await?;
            info!("Removed old asset cache {}", name);
            removed.push(name);
        }

        removed.sort();
        Ok(removed)
    }

    /// Serve `path` from the cache, or from the network without storing it
    pub async fn fetch(&self, path: &str) -> AssetResult<CachedAsset> {
        validate_path(path)?;

        if let Some(asset) = self.lookup(path).await? {
            debug!("Asset cache hit for {}", path);
            return Ok(asset);
        }

        debug!("Asset cache miss for {}", path);
        let (path, content_type, body) = self.download(path).await?;
        Ok(CachedAsset {
            path,
            content_type,
            body,
            source: AssetSource::Network,
        })
    }

    /// Entries of the current cache
    pub async fn entries(&self) -> AssetResult<Vec<ManifestEntry>> {
        Ok(self.load_manifest().await?.entries)
    }

    async fn lookup(&self, path: &str) -> AssetResult<Option<CachedAsset>> {
        let manifest = self.load_manifest().await?;
        let Some(entry) = manifest.find(path) else {
            return Ok(None);
        };

        match fs::read(self.dir().join(&entry.file)).await {
            Ok(body) => Ok(Some(CachedAsset {
                path: entry.path.clone(),
                content_type: entry.content_type.clone(),
                body,
                source: AssetSource::Cache,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Cached file {} for {} is missing", entry.file, path);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load_manifest(&self) -> AssetResult<Manifest> {
        match fs::read(self.dir().join(MANIFEST_FILE)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Manifest::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn download(&self, path: &str) -> AssetResult<(String, Option<String>, Vec<u8>)> {
        let url = self.url_for(path);
        debug!("GET {}", url);

        let network = |e: reqwest::Error| AssetError::Network {
            path: path.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(&url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Http {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(network)?;
        Ok((path.to_string(), content_type, body.to_vec()))
    }
}

fn validate_path(path: &str) -> AssetResult<()> {
    if !path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
        return Err(AssetError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Flatten an asset path into a single file name
fn file_stem(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return "_root".to_string();
    }
    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Cache root below the application data directory
pub fn cache_root(data_dir: &Path) -> PathBuf {
    data_dir.join("assets")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn cache(root: &Path, origin: &str, version: &str) -> AssetCache {
        let mut options = AssetCacheOptions::new(root, origin);
        options.version = version.to_string();
        AssetCache::new(options).unwrap()
    }

    async fn serve_defaults(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).header("content-type", "text/html").body("<root>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/index.html");
                then.status(200).header("content-type", "text/html").body("<index>");
            })
            .await;
    }

    #[test]
    fn test_file_names() {
        assert_eq!(file_stem("/"), "_root");
        assert_eq!(file_stem("/index.html"), "index.html");
        assert_eq!(file_stem("/img/logo v2.png"), "img_logo_v2.png");

        let mut manifest = Manifest::default();
        manifest.upsert(ManifestEntry {
            path: "/a/b".to_string(),
            file: "a_b".to_string(),
            content_type: None,
            size: 0,
            installed_at: Utc::now(),
        });
        assert_eq!(manifest.file_for("/a/b"), "a_b");
        assert_eq!(manifest.file_for("/a_b"), "a_b-1");
    }

    #[test]
    fn test_path_validation() {
        assert!(validate_path("/salona.png").is_ok());
        assert!(validate_path("salona.png").is_err());
        assert!(validate_path("/../secret").is_err());
    }

    #[tokio::test]
    async fn test_install_then_fetch_from_cache() {
        let server = MockServer::start_async().await;
        let logo = server
            .mock_async(|when, then| {
                when.method(GET).path("/salona.png");
                then.status(200).header("content-type", "image/png").body("png");
            })
            .await;
        serve_defaults(&server).await;

        let tmp = TempDir::new().unwrap();
        let cache = cache(tmp.path(), &server.base_url(), "v1");
        assert_eq!(cache.name(), "salona-cache-v1");

        let installed = cache.install(&DEFAULT_ASSETS).await.unwrap();
        assert_eq!(installed.len(), 3);

        let asset = cache.fetch("/salona.png").await.unwrap();
        assert_eq!(asset.source, AssetSource::Cache);
        assert_eq!(asset.body, b"png");
        assert_eq!(asset.content_type.as_deref(), Some("image/png"));
        logo.assert_calls_async(1).await;

        let root = cache.fetch("/").await.unwrap();
        assert_eq!(root.body, b"<root>");
        assert_eq!(cache.entries().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let server = MockServer::start_async().await;
        serve_defaults(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/salona.png");
                then.status(404);
            })
            .await;

        let tmp = TempDir::new().unwrap();
        let cache = cache(tmp.path(), &server.base_url(), "v1");

        let err = cache.install(&DEFAULT_ASSETS).await.unwrap_err();
        assert!(matches!(err, AssetError::Http { status: 404, .. }));
        assert!(cache.entries().await.unwrap().is_empty());

        let asset = cache.fetch("/index.html").await.unwrap();
        assert_eq!(asset.source, AssetSource::Network);
    }

    #[tokio::test]
    async fn test_network_responses_are_not_persisted() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET).path("/about.html");
                then.status(200).body("about");
            })
            .await;

        let tmp = TempDir::new().unwrap();
        let cache = cache(tmp.path(), &server.base_url(), "v1");

        for _ in 0..2 {
            let asset = cache.fetch("/about.html").await.unwrap();
            assert_eq!(asset.source, AssetSource::Network);
            assert_eq!(asset.body, b"about");
        }
        page.assert_calls_async(2).await;
        assert!(cache.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_miss_while_offline_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(tmp.path(), "http://127.0.0.1:9", "v1");
        let err = cache.fetch("/index.html").await.unwrap_err();
        assert!(matches!(err, AssetError::Network { .. }));
    }

    #[tokio::test]
    async fn test_activate_removes_other_versions() {
        let tmp = TempDir::new().unwrap();
        for name in ["salona-cache-v0", "legacy", "salona-cache-v2"] {
            std::fs::create_dir_all(tmp.path().join(name)).unwrap();
        }
        std::fs::write(tmp.path().join("notes.txt"), "keep").unwrap();

        let cache = cache(tmp.path(), "http://127.0.0.1:9", "v2");
        let removed = cache.activate().await.unwrap();
        assert_eq!(removed, vec!["legacy", "salona-cache-v0"]);
        assert!(tmp.path().join("salona-cache-v2").is_dir());
        assert!(tmp.path().join("notes.txt").is_file());

        let missing = AssetCache::new(AssetCacheOptions::new(tmp.path().join("none"), "http://x")).unwrap();
        assert!(missing.activate().await.unwrap().is_empty());
    }
}

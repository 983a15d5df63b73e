//! Versioned offline cache for static assets
//!
//! Assets are pre-cached into a directory named after the cache version,
//! older versions are removed on activation, and lookups are served from the
//! cache before falling back to the network.

pub mod cache;

pub use cache::*;

use thiserror::Error;

/// Errors raised by the asset cache
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Invalid asset path '{0}': paths must start with '/' and stay inside the origin")]
    InvalidPath(String),

    #[error("Failed to fetch {path}: {message}")]
    Network { path: String, message: String },

    #[error("Failed to fetch {path}: HTTP {status}")]
    Http { path: String, status: u16 },

    #[error("Asset cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt asset manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type AssetResult<T> = Result<T, AssetError>;

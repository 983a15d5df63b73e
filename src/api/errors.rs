//! Error types for the catalog fetch adapter

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Request aborted")]
    Aborted,
}

impl FetchError {
    /// Whether the synchronizer may retry after this error
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Aborted)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return FetchError::Decode(error.to_string());
        }
        if let Some(status) = error.status() {
            if !status.is_success() {
                return FetchError::Http { status: status.as_u16() };
            }
        }
        FetchError::Network(error.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::Decode(error.to_string())
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_aborted_is_not_retryable() {
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(FetchError::Http { status: 503 }.is_retryable());
        assert!(FetchError::Decode("eof".into()).is_retryable());
        assert!(!FetchError::Aborted.is_retryable());
    }

    #[test]
    fn test_http_error_message_matches_status() {
        assert_eq!(FetchError::Http { status: 404 }.to_string(), "HTTP 404");
    }

    #[test]
    fn test_json_error_becomes_decode() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(FetchError::from(err), FetchError::Decode(_)));
    }
}

//! Error kinds surfaced at the boundary of every external call.

use thiserror::Error;

/// Failures of an HTTP call to an upstream service.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    /// The response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The service answered but reported a failure of its own.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl FetchError {
    /// Whether the same request may succeed when sent again.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Timeout(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(FetchError::Network("reset".into()).is_transient());
        assert!(FetchError::Timeout("8s".into()).is_transient());
        assert!(!FetchError::RateLimited.is_transient());
        assert!(!FetchError::Malformed("eof".into()).is_transient());
        assert!(
            !FetchError::Http {
                status: 500,
                url: "http://x".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_json_error_is_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(FetchError::from(err), FetchError::Malformed(_)));
    }

    #[test]
    fn test_http_error_display() {
        let err = FetchError::Http {
            status: 503,
            url: "http://example.com/latest/USD".into(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP error: 503 for http://example.com/latest/USD"
        );
    }
}

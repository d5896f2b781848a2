use std::time::Duration;

use thiserror::Error;

/// Failure to turn a response body into a [`crate::Release`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to parse release document: {details}")]
    Json { details: String },

    #[error("release field `{field}` is not an absolute URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

impl From<serde_json::Error> for DecodeError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json {
            details: error.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to build HTTP client: {details}")]
    ClientBuild { details: String },

    #[error("request to {url} failed: {details}")]
    Request { url: String, details: String },

    #[error("request to {url} failed with HTTP {status}{body_snippet}")]
    HttpStatus {
        url: String,
        status: u16,
        body_snippet: String,
    },
}

impl TransportError {
    pub fn request_from<E>(url: &str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Request {
            url: url.to_string(),
            details: error.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error(
        "repository cannot be empty: it is sent as the User-Agent the releases API requires"
    )]
    InvalidRepository,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error(
        "poll interval of {}s is below the {}s minimum imposed by API rate limits",
        .interval.as_secs(),
        .minimum.as_secs()
    )]
    InvalidInterval {
        interval: Duration,
        minimum: Duration,
    },

    #[error("monitoring must be started from within a Tokio runtime")]
    NoRuntime,

    #[error("no monitoring schedule is active")]
    NotMonitoring,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetError {
    #[error("release has no assets to download")]
    NoAssets,

    #[error("release has {count} assets; an asset index must be specified")]
    Ambiguous { count: usize },

    #[error("asset index {index} is out of range for a release with {count} assets")]
    IndexOutOfRange { index: usize, count: usize },
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, FetchError, MonitorError, TransportError};
    use std::time::Duration;

    #[test]
    fn http_status_display_includes_snippet() {
        let error = TransportError::HttpStatus {
            url: "https://api.github.com/repos/a/b/releases/latest".to_string(),
            status: 404,
            body_snippet: ": Not Found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "request to https://api.github.com/repos/a/b/releases/latest failed with HTTP 404: Not Found"
        );
    }

    #[test]
    fn fetch_error_wraps_transport_and_decode_transparently() {
        let transport = FetchError::from(TransportError::request_from("u", "dns failure"));
        assert_eq!(transport.to_string(), "request to u failed: dns failure");

        let decode = FetchError::from(DecodeError::Json {
            details: "expected value".to_string(),
        });
        assert!(matches!(decode, FetchError::Decode(DecodeError::Json { .. })));
    }

    #[test]
    fn invalid_interval_reports_seconds() {
        let error = MonitorError::InvalidInterval {
            interval: Duration::from_secs(60),
            minimum: Duration::from_secs(3600),
        };

        assert_eq!(
            error.to_string(),
            "poll interval of 60s is below the 3600s minimum imposed by API rate limits"
        );
    }
}

//! Error types for the Parley pipeline

use thiserror::Error;

/// Result type alias for Parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Parley pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Required input absent from the request
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Audio payload in a format the transcriber cannot accept
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// A collaborator rejected our credentials
    #[error("upstream auth error: {0}")]
    UpstreamAuth(String),

    /// A collaborator throttled the request
    #[error("upstream rate limited: {0}")]
    UpstreamRateLimited(String),

    /// Transient collaborator failure (network, 5xx, malformed response)
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Speech synthesis failed after the text answer was obtained
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Classify a non-success response from a collaborator.
    ///
    /// 401/403 map to auth, 429 to rate limiting, everything else
    /// (including 5xx) to a transient unavailability.
    #[must_use]
    pub fn from_upstream(service: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let excerpt: String = body.chars().take(200).collect();
        let detail = format!("{service} returned {status}: {excerpt}");

        match status.as_u16() {
            401 | 403 => Self::UpstreamAuth(detail),
            429 => Self::UpstreamRateLimited(detail),
            _ => Self::UpstreamUnavailable(detail),
        }
    }

    /// Wrap a request-level failure (connect, timeout) from a collaborator
    #[must_use]
    pub fn upstream_request(service: &str, err: &reqwest::Error) -> Self {
        Self::UpstreamUnavailable(format!("{service} request failed: {err}"))
    }

    /// Whether a single retry is worthwhile.
    ///
    /// Only transient unavailability qualifies; auth, rate-limit, and format
    /// errors propagate immediately.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }
}

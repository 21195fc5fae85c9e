//! Purge client error types.

use std::sync::Arc;

/// Errors from purge operations against the upstream cache.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PurgeError {
    /// No upstream cache server configured; purging has no target.
    #[error("no upstream cache server configured")]
    NoServer,

    /// Purge target has no parsable host component.
    #[error("not a valid url: {0}")]
    InvalidUrl(String),

    /// A header value could not be encoded onto the request.
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),

    /// The upstream answered with a non-200 status. Carries best-effort
    /// diagnostics from the `X-Cache`, `X-Cache-Hits`, and `Age` headers.
    #[error("purge rejected: HTTP {status} (cache: {cache_status}, hits: {cache_hits}, age: {age})")]
    Rejected { status: u16, cache_status: String, cache_hits: String, age: String },

    /// The request timed out.
    #[error("purge request timeout")]
    Timeout,

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for PurgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { PurgeError::Timeout } else { PurgeError::Network(Arc::new(err)) }
    }
}

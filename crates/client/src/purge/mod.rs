//! PURGE protocol client for the upstream cache.
//!
//! ### Wire behavior
//!
//! - Single HTTP request per purge, method `PURGE`, 30s timeout, no retry.
//! - Scheme is always plain `http://` toward the upstream; TLS verification
//!   is disabled for the rare upstream that still answers TLS.
//! - `X-Varnish-Debug: 1` and `X-Cache-Debug: 1` are injected on every send,
//!   overwriting caller-supplied values.
//! - Success is strictly HTTP 200; anything else surfaces as
//!   [`PurgeError::Rejected`] with the upstream's diagnostic headers.

mod error;
mod target;

pub use error::PurgeError;
pub use target::{PurgeTarget, canonical_target};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response, StatusCode};

use vpurge_core::{PolicyConfig, TtlClassifier};

/// Fixed timeout for purge requests.
const PURGE_TIMEOUT: Duration = Duration::from_secs(30);

fn purge_method() -> Method {
    Method::from_bytes(b"PURGE").expect("static method literal")
}

/// Client issuing PURGE requests against the configured upstream cache.
///
/// Batch semantics are deliberately left to the caller: every operation is a
/// single target returning its own `Result`, so a caller purging several tags
/// or URLs decides whether one failure aborts the rest.
#[derive(Debug, Clone)]
pub struct PurgeClient {
    http: reqwest::Client,
    server: String,
    config: PolicyConfig,
    classifier: TtlClassifier,
}

impl PurgeClient {
    /// Create a client with the basic extension-based classifier.
    ///
    /// Fails with [`PurgeError::NoServer`] when the config has no upstream
    /// server: purging with an empty target would silently send a malformed
    /// request, so it is rejected up front.
    pub fn new(config: &PolicyConfig) -> Result<Self, PurgeError> {
        Self::with_classifier(config, TtlClassifier::default())
    }

    /// Create a client with a custom TTL classifier.
    pub fn with_classifier(
        config: &PolicyConfig,
        classifier: TtlClassifier,
    ) -> Result<Self, PurgeError> {
        let server = config.server.trim().to_string();
        if server.is_empty() {
            return Err(PurgeError::NoServer);
        }

        let http = reqwest::Client::builder()
            .timeout(PURGE_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .use_rustls_tls()
            .build()?;

        Ok(Self { http, server, config: config.clone(), classifier })
    }

    /// Purge everything cached for a host.
    pub async fn purge_host(&self, host: &str) -> Result<(), PurgeError> {
        let mut headers = HeaderMap::new();
        insert(&mut headers, "host", host)?;
        insert(&mut headers, "x-cache-control", "no-cache")?;
        insert(&mut headers, "x-cache-debug", "1")?;

        self.send(headers, None).await
    }

    /// Purge everything cached under a single tag.
    pub async fn purge_tag(&self, tag: &str) -> Result<(), PurgeError> {
        self.purge_tags(&[tag.to_string()]).await
    }

    /// Purge everything cached under any of the given tags.
    pub async fn purge_tags(&self, tags: &[String]) -> Result<(), PurgeError> {
        let mut headers = HeaderMap::new();
        insert(&mut headers, "x-cache-tags", &tags.join(","))?;
        insert(&mut headers, "x-cache-control", "no-cache")?;
        insert(&mut headers, "x-cache-debug", "1")?;

        self.send(headers, None).await
    }

    /// Purge a single URL.
    ///
    /// The target is canonicalized against the configured server (see
    /// [`canonical_target`]) and the purge carries the cache-control headers
    /// the entry should be refreshed with, resolved through the classifier.
    pub async fn purge_url(&self, url: &str) -> Result<(), PurgeError> {
        let target = canonical_target(&self.server, url)?;
        let (ttl, class) = self.classifier.resolve(&target.path, &self.config);

        let mut headers = HeaderMap::new();
        insert(&mut headers, "host", &target.host)?;
        insert(&mut headers, "x-cache-control", "public")?;
        insert(&mut headers, "x-cache-status", "MISS")?;
        insert(&mut headers, "cache-control", &format!("public, max-age={ttl}"))?;
        insert(&mut headers, "x-cache-ttl", &ttl.to_string())?;
        insert(&mut headers, "x-varnish-cache", "1")?;
        insert(&mut headers, "x-cache-debug", "1")?;

        tracing::debug!(url, ttl, class, "purging url");
        self.send(headers, Some(target)).await
    }

    async fn send(&self, mut headers: HeaderMap, target: Option<PurgeTarget>) -> Result<(), PurgeError> {
        let request_url = match &target {
            Some(t) => t.url.clone(),
            None => format!("http://{}", self.server),
        };

        // Standard Varnish debug markers, overwriting any caller value.
        headers.insert("x-varnish-debug", HeaderValue::from_static("1"));
        headers.insert("x-cache-debug", HeaderValue::from_static("1"));

        let response = self
            .http
            .request(purge_method(), &request_url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PurgeError::Rejected {
                status: status.as_u16(),
                cache_status: diagnostic(&response, "x-cache", "unknown"),
                cache_hits: diagnostic(&response, "x-cache-hits", "0"),
                age: diagnostic(&response, "age", "0"),
            });
        }

        tracing::debug!(url = %request_url, "purge accepted");
        Ok(())
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), PurgeError> {
    let value = HeaderValue::from_str(value).map_err(|_| PurgeError::InvalidHeader(name))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

fn diagnostic(response: &Response, name: &str, fallback: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(fallback)
        .to_string()
}

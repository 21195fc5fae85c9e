//! Cache-control response headers for outgoing responses.
//!
//! This module only computes the header set; writing it onto a live response
//! is the caller's job.

use crate::policy::TtlClassifier;
use crate::settings::PolicyConfig;

/// `Cache-Control` value used when a response must not be cached.
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Ordered set of response header name/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet(Vec<(&'static str, String)>);

impl HeaderSet {
    fn push(&mut self, name: &'static str, value: impl Into<String>) {
        self.0.push((name, value.into()));
    }

    /// Value of the first header with the given name, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(n, v)| (*n, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Compute the cache headers for a response to `path`.
///
/// Caching disabled, a caller-signalled bypass (admin context, authenticated
/// session, personalization), or an excluded path all yield the no-cache set
/// with no TTL headers. Otherwise the path is classified and the resolved
/// lifetime is emitted along with the Varnish debug markers.
pub fn response_headers(
    path: &str,
    config: &PolicyConfig,
    classifier: &TtlClassifier,
    bypass: bool,
) -> HeaderSet {
    let mut headers = HeaderSet::default();

    if !config.enabled || bypass || config.is_path_excluded(path) {
        headers.push("Cache-Control", NO_CACHE);
        return headers;
    }

    let (ttl, label) = classifier.resolve(path, config);
    tracing::trace!(path, ttl, class = label, "resolved cache lifetime");

    headers.push("Cache-Control", format!("public, max-age={ttl}"));
    headers.push("X-Cache-TTL", ttl.to_string());
    headers.push("X-Varnish-Cache", "1");
    headers.push("X-Cache-Debug", "1");
    headers.push("X-Varnish-Debug", "1");
    headers
}

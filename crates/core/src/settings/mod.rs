//! Persisted cache policy settings.
//!
//! `PolicyConfig` is the flat document operators edit (and the store writes)
//! at `~/.varnish-cache/settings.json`. Field names on disk are camelCase and
//! unknown keys are ignored, so hand-edited documents from older versions
//! keep loading.

use serde::{Deserialize, Serialize};

use crate::policy::TtlClass;

mod store;

pub use store::{SettingsError, SettingsStore};

/// Built-in default lifetime for pages: 1 hour.
const DEFAULT_LIFETIME_SECS: u64 = 3_600;

/// Built-in default lifetime for static assets: 30 days.
const DEFAULT_STATIC_ASSET_LIFETIME_SECS: u64 = 2_592_000;

/// Cache policy document driving both the TTL classifier and the purge client.
///
/// All fields have defaults, so a missing or partial document always yields a
/// usable config. An all-defaults config means "not configured"; callers that
/// need to distinguish that from "configured but disabled" check
/// [`PolicyConfig::is_configured`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyConfig {
    /// Whether TTL headers are emitted at all.
    pub enabled: bool,

    /// host[:port] of the upstream cache that receives PURGE requests.
    pub server: String,

    /// Namespace prefix for tag-based invalidation.
    pub cache_tag_prefix: String,

    /// Lifetime in seconds for pages that match no other class.
    pub cache_lifetime: u64,

    /// Lifetime in seconds for static assets (css, js, images, fonts).
    pub static_asset_lifetime: u64,

    /// Optional lifetime for the homepage class; falls back to
    /// `cache_lifetime` when unset.
    pub homepage_lifetime: Option<u64>,

    /// Optional lifetime for the product class; falls back to
    /// `cache_lifetime` when unset.
    pub product_lifetime: Option<u64>,

    /// Query parameters that force a no-cache response when present.
    /// Consumed by the surrounding web layer, not enforced here.
    pub excluded_params: Vec<String>,

    /// Path/URL substrings exempt from caching, checked in order.
    pub excludes: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: String::new(),
            cache_tag_prefix: String::new(),
            cache_lifetime: DEFAULT_LIFETIME_SECS,
            static_asset_lifetime: DEFAULT_STATIC_ASSET_LIFETIME_SECS,
            homepage_lifetime: None,
            product_lifetime: None,
            excluded_params: Vec::new(),
            excludes: Vec::new(),
        }
    }
}

impl PolicyConfig {
    /// Whether any field differs from the built-in defaults.
    ///
    /// A store that failed to read its document returns an all-defaults
    /// config, which looks identical to a fresh install.
    pub fn is_configured(&self) -> bool {
        *self != Self::default()
    }

    /// Resolve the lifetime in seconds for a TTL class.
    pub fn lifetime_for(&self, class: TtlClass) -> u64 {
        match class {
            TtlClass::Homepage => self.homepage_lifetime.unwrap_or(self.cache_lifetime),
            TtlClass::Product => self.product_lifetime.unwrap_or(self.cache_lifetime),
            TtlClass::StaticAsset => self.static_asset_lifetime,
            TtlClass::Default => self.cache_lifetime,
        }
    }

    /// Whether a path matches one of the configured exclusion substrings.
    pub fn is_path_excluded(&self, path: &str) -> bool {
        self.excludes
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .any(|e| path.contains(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PolicyConfig::default();
        assert!(!config.enabled);
        assert!(config.server.is_empty());
        assert_eq!(config.cache_lifetime, 3_600);
        assert_eq!(config.static_asset_lifetime, 2_592_000);
        assert!(config.homepage_lifetime.is_none());
        assert!(config.product_lifetime.is_none());
        assert!(!config.is_configured());
    }

    #[test]
    fn test_lifetime_fallbacks() {
        let config = PolicyConfig { cache_lifetime: 100, ..Default::default() };
        assert_eq!(config.lifetime_for(TtlClass::Homepage), 100);
        assert_eq!(config.lifetime_for(TtlClass::Product), 100);
        assert_eq!(config.lifetime_for(TtlClass::Default), 100);
        assert_eq!(config.lifetime_for(TtlClass::StaticAsset), 2_592_000);
    }

    #[test]
    fn test_lifetime_per_class_overrides() {
        let config = PolicyConfig {
            homepage_lifetime: Some(60),
            product_lifetime: Some(300),
            ..Default::default()
        };
        assert_eq!(config.lifetime_for(TtlClass::Homepage), 60);
        assert_eq!(config.lifetime_for(TtlClass::Product), 300);
    }

    #[test]
    fn test_path_exclusion() {
        let config = PolicyConfig {
            excludes: vec!["/checkout".into(), " /my-account ".into(), String::new()],
            ..Default::default()
        };
        assert!(config.is_path_excluded("/checkout/step-1"));
        assert!(config.is_path_excluded("/my-account"));
        assert!(!config.is_path_excluded("/product/shoe"));
    }

    #[test]
    fn test_document_uses_camel_case_keys() {
        let config = PolicyConfig {
            enabled: true,
            server: "127.0.0.1:6081".into(),
            cache_tag_prefix: "shop1".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["enabled"], true);
        assert_eq!(json["server"], "127.0.0.1:6081");
        assert_eq!(json["cacheTagPrefix"], "shop1");
        assert_eq!(json["cacheLifetime"], 3_600);
        assert_eq!(json["staticAssetLifetime"], 2_592_000);
    }

    #[test]
    fn test_partial_document_fills_defaults_and_ignores_unknown_keys() {
        let config: PolicyConfig = serde_json::from_str(
            r#"{"enabled": true, "server": "cache.internal", "legacyField": 42}"#,
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.server, "cache.internal");
        assert_eq!(config.cache_lifetime, 3_600);
    }
}

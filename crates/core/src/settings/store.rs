//! Settings persistence with layered loading.
//!
//! The store reads the policy document with figment, layered as:
//!
//! 1. Environment variables (VPURGE_*)
//! 2. JSON document at the store's path
//! 3. Built-in defaults
//!
//! Read failures (missing file, unreadable, invalid JSON) intentionally
//! degrade to the all-defaults config instead of surfacing an error: a broken
//! document behaves like a fresh install, and callers detect that through
//! `PolicyConfig::is_configured`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};

use crate::settings::PolicyConfig;

/// Directory under `$HOME` holding the settings document.
const SETTINGS_DIR: &str = ".varnish-cache";

/// File name of the settings document.
const SETTINGS_FILE: &str = "settings.json";

/// Errors from writing the settings document. Reads never fail.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot determine settings location: HOME is not set")]
    NoHome,

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// Loads, caches, and persists the policy document.
///
/// The document is read once and cached in memory; `invalidate` drops the
/// cache so the next `load` re-reads storage. A plain mutex guards the cache
/// since configuration changes are rare and operator-driven.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    cached: Mutex<Option<PolicyConfig>>,
}

impl SettingsStore {
    /// Create a store backed by the given document path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), cached: Mutex::new(None) }
    }

    /// Create a store backed by the per-user default location,
    /// `$HOME/.varnish-cache/settings.json`.
    pub fn from_home() -> Result<Self, SettingsError> {
        Ok(Self::new(Self::default_location()?))
    }

    /// The per-user default document location.
    pub fn default_location() -> Result<PathBuf, SettingsError> {
        let home = std::env::var_os("HOME").ok_or(SettingsError::NoHome)?;
        Ok(PathBuf::from(home).join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the policy config, reading storage on first call and serving the
    /// in-memory copy afterwards. Never fails; see module docs.
    pub fn load(&self) -> PolicyConfig {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        cached.get_or_insert_with(|| self.read_document()).clone()
    }

    /// Drop the in-memory copy so the next `load` re-reads storage.
    pub fn invalidate(&self) {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        *cached = None;
    }

    /// Persist the full config as pretty-printed JSON with stable key order.
    ///
    /// Does not touch the in-memory cache; callers that want the new values
    /// visible must call `invalidate` afterwards.
    pub fn save(&self, config: &PolicyConfig) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|source| SettingsError::Write { path: dir.to_path_buf(), source })?;
        }

        let mut doc = serde_json::to_string_pretty(config)?;
        doc.push('\n');

        std::fs::write(&self.path, doc)
            .map_err(|source| SettingsError::Write { path: self.path.clone(), source })?;

        tracing::debug!(path = %self.path.display(), "settings document written");
        Ok(())
    }

    fn read_document(&self) -> PolicyConfig {
        let figment = Figment::from(Serialized::defaults(PolicyConfig::default()))
            .merge(Json::file(&self.path))
            .merge(Env::prefixed("VPURGE_").map(|key| env_key_to_document_key(key.as_str()).into()));

        match figment.extract() {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "settings unreadable, using defaults");
                PolicyConfig::default()
            }
        }
    }
}

/// Map an environment key suffix (`CACHE_TAG_PREFIX`) to the camelCase key
/// used by the document (`cacheTagPrefix`).
fn env_key_to_document_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, part) in key.to_lowercase().split('_').enumerate() {
        if i == 0 || part.is_empty() {
            out.push_str(part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.extend(chars);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.json"))
    }

    #[test]
    fn test_load_absent_document_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = store_in(&dir).load();
        assert_eq!(config, PolicyConfig::default());
        assert!(!config.is_configured());
        assert!(!config.enabled);
    }

    #[test]
    fn test_load_corrupt_document_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(), PolicyConfig::default());
    }

    #[test]
    fn test_save_invalidate_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let config = PolicyConfig {
            enabled: true,
            server: "127.0.0.1:6081".into(),
            cache_tag_prefix: "site1".into(),
            cache_lifetime: 600,
            homepage_lifetime: Some(120),
            excluded_params: vec!["no_cache".into()],
            excludes: vec!["/wp-admin".into()],
            ..Default::default()
        };

        store.save(&config).unwrap();
        store.invalidate();
        assert_eq!(store.load(), config);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));
        store.save(&PolicyConfig::default()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_load_caches_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let first = PolicyConfig { server: "a".into(), ..Default::default() };
        store.save(&first).unwrap();
        assert_eq!(store.load().server, "a");

        let second = PolicyConfig { server: "b".into(), ..Default::default() };
        store.save(&second).unwrap();
        // Still the cached copy.
        assert_eq!(store.load().server, "a");

        store.invalidate();
        assert_eq!(store.load().server, "b");
    }

    #[test]
    fn test_saved_document_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&PolicyConfig::default()).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\n  \"cacheLifetime\": 3600"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_env_overlay_wins_over_document() {
        figment::Jail::expect_with(|jail| {
            let store = SettingsStore::new(jail.directory().join("settings.json"));
            let config = PolicyConfig {
                server: "file-server:6081".into(),
                cache_tag_prefix: "site1".into(),
                ..Default::default()
            };
            store.save(&config).expect("save settings");

            jail.set_env("VPURGE_SERVER", "env-server:6081");
            let loaded = store.load();
            assert_eq!(loaded.server, "env-server:6081");
            // Fields without an override still come from the document.
            assert_eq!(loaded.cache_tag_prefix, "site1");
            Ok(())
        });
    }

    #[test]
    fn test_env_key_mapping() {
        assert_eq!(env_key_to_document_key("SERVER"), "server");
        assert_eq!(env_key_to_document_key("ENABLED"), "enabled");
        assert_eq!(env_key_to_document_key("CACHE_TAG_PREFIX"), "cacheTagPrefix");
        assert_eq!(env_key_to_document_key("STATIC_ASSET_LIFETIME"), "staticAssetLifetime");
    }
}

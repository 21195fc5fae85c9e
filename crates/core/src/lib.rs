//! Core policy engine for vpurge.
//!
//! This crate holds everything that does not touch the network: the persisted
//! cache settings document and its store, the TTL classifier, and the response
//! header writer. The purge wire protocol lives in `vpurge-client`.

pub mod policy;
pub mod settings;

pub use policy::{HeaderSet, PathMatcher, TtlClass, TtlClassifier, TtlRule, response_headers};
pub use settings::{PolicyConfig, SettingsError, SettingsStore};

//! Purge client for vpurge.
//!
//! Speaks the PURGE wire protocol to the upstream Varnish-style cache:
//! invalidation by host, by tag, and by URL, with the target-URL
//! canonicalization the upstream expects.

pub mod purge;

pub use purge::{PurgeClient, PurgeError, PurgeTarget, canonical_target};

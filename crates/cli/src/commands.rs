//! Operator commands: inspect settings, reconfigure, and purge.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use vpurge_client::{PurgeClient, PurgeError};
use vpurge_core::{PolicyConfig, SettingsStore};

#[derive(Debug, Parser)]
#[command(name = "vpurge", about = "Cache policy and purge controller for a Varnish-style upstream cache")]
pub struct Cli {
    /// Path to the settings document (default: ~/.varnish-cache/settings.json).
    #[arg(long, global = true, env = "VPURGE_SETTINGS_FILE")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current cache policy settings.
    Status,

    /// Update settings, then purge the previous cache namespace once.
    Configure(ConfigureArgs),

    /// Purge individual targets: values starting with "http" are treated as
    /// URLs, everything else as cache tags. Continues on failure.
    Purge {
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Purge the entire cache (configured tag prefix, or the server host).
    PurgeAll,
}

#[derive(Debug, Default, Args)]
pub struct ConfigureArgs {
    /// Enable or disable TTL headers.
    #[arg(long)]
    enabled: Option<bool>,

    /// host[:port] of the upstream cache.
    #[arg(long)]
    server: Option<String>,

    /// Namespace prefix for tag-based invalidation.
    #[arg(long)]
    tag_prefix: Option<String>,

    /// Default page lifetime in seconds.
    #[arg(long)]
    cache_lifetime: Option<u64>,

    /// Static asset lifetime in seconds.
    #[arg(long)]
    static_asset_lifetime: Option<u64>,

    /// Homepage lifetime in seconds.
    #[arg(long)]
    homepage_lifetime: Option<u64>,

    /// Product page lifetime in seconds.
    #[arg(long)]
    product_lifetime: Option<u64>,

    /// Comma-separated query parameters that force a no-cache response.
    #[arg(long, value_delimiter = ',')]
    excluded_params: Option<Vec<String>>,

    /// Comma-separated path substrings exempt from caching.
    #[arg(long, value_delimiter = ',')]
    excludes: Option<Vec<String>>,
}

impl ConfigureArgs {
    /// Overlay the provided flags onto an existing config.
    fn apply(self, base: PolicyConfig) -> PolicyConfig {
        PolicyConfig {
            enabled: self.enabled.unwrap_or(base.enabled),
            server: self.server.unwrap_or(base.server),
            cache_tag_prefix: self.tag_prefix.unwrap_or(base.cache_tag_prefix),
            cache_lifetime: self.cache_lifetime.unwrap_or(base.cache_lifetime),
            static_asset_lifetime: self.static_asset_lifetime.unwrap_or(base.static_asset_lifetime),
            homepage_lifetime: self.homepage_lifetime.or(base.homepage_lifetime),
            product_lifetime: self.product_lifetime.or(base.product_lifetime),
            excluded_params: self.excluded_params.unwrap_or(base.excluded_params),
            excludes: self.excludes.unwrap_or(base.excludes),
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let store = match cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::from_home()?,
    };

    match cli.command {
        Command::Status => status(&store),
        Command::Configure(args) => configure(&store, args).await,
        Command::Purge { values } => purge(&store, values).await,
        Command::PurgeAll => purge_all(&store).await,
    }
}

fn status(store: &SettingsStore) -> Result<()> {
    let config = store.load();

    if !config.is_configured() {
        println!("not configured ({})", store.path().display());
        return Ok(());
    }

    println!("settings file:         {}", store.path().display());
    println!("enabled:               {}", config.enabled);
    println!("server:                {}", config.server);
    println!("cache tag prefix:      {}", config.cache_tag_prefix);
    println!("cache lifetime:        {}s", config.cache_lifetime);
    println!("static asset lifetime: {}s", config.static_asset_lifetime);
    if let Some(ttl) = config.homepage_lifetime {
        println!("homepage lifetime:     {ttl}s");
    }
    if let Some(ttl) = config.product_lifetime {
        println!("product lifetime:      {ttl}s");
    }
    println!("excluded params:       {}", config.excluded_params.join(","));
    println!("excludes:              {}", config.excludes.join(","));
    Ok(())
}

async fn configure(store: &SettingsStore, args: ConfigureArgs) -> Result<()> {
    let previous = store.load();
    let current = args.apply(previous.clone());

    store.save(&current).context("failed to save settings")?;
    store.invalidate();
    println!("settings saved to {}", store.path().display());

    // The old namespace is purged exactly once, even when caching is
    // disabled, so stale entries never outlive a reconfiguration.
    purge_on_save(&previous, &current).await;
    Ok(())
}

async fn purge_on_save(previous: &PolicyConfig, current: &PolicyConfig) {
    let client = match PurgeClient::new(current) {
        Ok(client) => client,
        Err(PurgeError::NoServer) => {
            tracing::warn!("skipping purge-on-save: no upstream server configured");
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, "skipping purge-on-save");
            return;
        }
    };

    // Entries may be reachable through either the old tag prefix or the
    // host, so both are purged; one failure does not skip the other.
    let mut purged = true;

    if !previous.cache_tag_prefix.is_empty() {
        if let Err(err) = client.purge_tag(&previous.cache_tag_prefix).await {
            tracing::warn!(error = %err, tag = %previous.cache_tag_prefix, "purge-on-save tag purge failed");
            purged = false;
        }
    }

    if let Err(err) = client.purge_host(host_of(&current.server)).await {
        tracing::warn!(error = %err, "purge-on-save host purge failed");
        purged = false;
    }

    if purged {
        println!("previous cache namespace purged");
    }
}

async fn purge(store: &SettingsStore, values: Vec<String>) -> Result<()> {
    let client = purge_client(store)?;
    let mut failed = 0usize;

    for value in &values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        let result = if value.starts_with("http") {
            client.purge_url(value).await
        } else {
            client.purge_tag(value).await
        };

        match result {
            Ok(()) => println!("purged {value}"),
            Err(err) => {
                failed += 1;
                println!("failed  {value}: {err}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} purge targets failed", values.len());
    }
    Ok(())
}

async fn purge_all(store: &SettingsStore) -> Result<()> {
    let config = store.load();
    let client = purge_client(store)?;
    let mut failed = 0usize;

    // Host and tag prefix cover different sets of entries; purge both and
    // keep going past the first failure.
    let host = host_of(&config.server);
    match client.purge_host(host).await {
        Ok(()) => println!("purged host {host}"),
        Err(err) => {
            failed += 1;
            println!("failed  host {host}: {err}");
        }
    }

    if !config.cache_tag_prefix.is_empty() {
        match client.purge_tag(&config.cache_tag_prefix).await {
            Ok(()) => println!("purged tag {}", config.cache_tag_prefix),
            Err(err) => {
                failed += 1;
                println!("failed  tag {}: {err}", config.cache_tag_prefix);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} purge targets failed");
    }
    println!("cache has been purged");
    Ok(())
}

fn purge_client(store: &SettingsStore) -> Result<PurgeClient> {
    PurgeClient::new(&store.load())
        .context("cannot purge: configure an upstream server first (vpurge configure --server ..)")
}

/// Host component of a host[:port] server address.
///
/// Bracketed IPv6 literals keep their brackets (the form a Host header
/// expects); a bare IPv6 address is returned whole.
fn host_of(server: &str) -> &str {
    if server.starts_with('[') {
        if let Some(end) = server.find(']') {
            return &server[..=end];
        }
        return server;
    }

    match server.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            host
        }
        _ => server,
    }
}

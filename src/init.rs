//! Initialization helpers for the application startup.

use crate::config::Config;
use crate::logger::{FaultLogger, MemoryFaultSink};
use crate::policy::{AclId, PolicyError, PolicyStore};
use crate::tail::{FileLogSource, LogTail};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    // Log to stderr; stdout carries command output.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Opens the policy store described by the config.
pub fn init_store(config: &Config) -> Result<Arc<PolicyStore>> {
    let store = PolicyStore::open(&config.store)
        .with_context(|| format!("Failed to open policy store {}", config.store.path))?;
    info!("Policy store ready at {}", store.path());
    Ok(Arc::new(store))
}

/// Builds the log tail over the configured squid log.
///
/// Returns the memory fault sink too, if one is configured.
pub fn init_tail(config: &Config) -> (LogTail, Option<Arc<MemoryFaultSink>>) {
    let (faults, memory) = FaultLogger::new(&config.logging);
    info!(
        "Tailing {} ({} lines, {} fault sinks)",
        config.tail.squid_log,
        config.tail.lines,
        faults.sink_count()
    );
    let source = Arc::new(FileLogSource::new(&config.tail.squid_log));
    (LogTail::new(source, faults, config.tail.lines), memory)
}

/// The configured inbox ACL, if any.
pub fn inbox_acl(config: &Config) -> Result<Option<AclId>, PolicyError> {
    config
        .policy
        .inbox_acl
        .as_deref()
        .map(AclId::parse)
        .transpose()
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub tail: TailConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_journal_mode")]
    pub journal_mode: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TailConfig {
    #[serde(default = "default_squid_log")]
    pub squid_log: String,
    #[serde(default = "default_tail_lines")]
    pub lines: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PolicyConfig {
    /// ACL that receives rules created from the activity view.
    #[serde(default)]
    pub inbox_acl: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_fault_sinks")]
    pub fault_sinks: Vec<String>,
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

// Defaults
fn default_store_path() -> String {
    "proxy-acl.db".to_string()
}
fn default_busy_timeout_ms() -> u64 {
    5000
}
fn default_journal_mode() -> String {
    "WAL".to_string()
}
fn default_squid_log() -> String {
    "/var/log/squid/access.log".to_string()
}
fn default_tail_lines() -> usize {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_fault_sinks() -> Vec<String> {
    vec!["console".to_string()]
}
fn default_memory_capacity() -> usize {
    100
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: default_journal_mode(),
        }
    }
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            squid_log: default_squid_log(),
            lines: default_tail_lines(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            fault_sinks: default_fault_sinks(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config TOML")
    }
}

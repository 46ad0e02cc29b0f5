//! Where the raw access log comes from.
//!
//! The log is written by the proxy; this crate only ever reads it whole.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Returns the full current contents of the log.
    async fn read_all(&self) -> Result<String>;
}

/// A log file on local disk.
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    async fn read_all(&self) -> Result<String> {
        let bytes = fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read access log {}", self.path.display()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

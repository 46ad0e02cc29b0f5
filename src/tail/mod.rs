//! Snapshot of the most recent proxy activity.

mod source;

pub use source::{FileLogSource, LogSource};

use crate::access_log::{parse_line, LineOutcome, LogEntry};
use crate::logger::{ParseFault, ParseFaultSink};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Default number of lines examined per snapshot.
pub const DEFAULT_TAIL_LINES: usize = 30;

pub struct LogTail {
    source: Arc<dyn LogSource>,
    faults: Arc<dyn ParseFaultSink>,
    lines: usize,
}

impl LogTail {
    pub fn new(source: Arc<dyn LogSource>, faults: Arc<dyn ParseFaultSink>, lines: usize) -> Self {
        Self {
            source,
            faults,
            lines,
        }
    }

    /// Parsed entries from the last `lines` lines of the log, newest first.
    ///
    /// Blank lines are dropped silently; malformed ones are reported to the
    /// fault sink and dropped. Every call re-reads the whole source.
    pub async fn recent(&self) -> Result<Vec<LogEntry>> {
        let text = self.source.read_all().await?;
        Ok(self.entries_from(&text))
    }

    fn entries_from(&self, text: &str) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        let mut skipped = 0;
        for line in text.lines().rev().take(self.lines) {
            match parse_line(line) {
                Ok(LineOutcome::Entry(entry)) => entries.push(entry),
                Ok(LineOutcome::Skip) => skipped += 1,
                Err(e) => {
                    skipped += 1;
                    self.faults.report(&ParseFault::from_error(&e));
                }
            }
        }
        debug!("Tail produced {} entries ({} lines dropped)", entries.len(), skipped);
        entries
    }
}

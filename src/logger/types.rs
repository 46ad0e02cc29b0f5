use crate::access_log::LogParseError;
use chrono::{DateTime, Utc};

/// A log line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFault {
    pub observed_at: DateTime<Utc>,
    pub line: String,
    pub reason: String,
}

impl ParseFault {
    pub fn from_error(err: &LogParseError) -> Self {
        Self {
            observed_at: Utc::now(),
            line: err.line().to_string(),
            reason: err.to_string(),
        }
    }
}

pub trait ParseFaultSink: Send + Sync {
    fn report(&self, fault: &ParseFault);
}

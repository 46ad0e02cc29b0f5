use super::{ParseFault, ParseFaultSink};
use crate::config::LoggingConfig;
use tracing::warn;

/// Reports faults as `tracing` events on the `access_log` target.
pub struct ConsoleFaultSink {
    config: LoggingConfig,
}

impl ConsoleFaultSink {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }
}

impl ParseFaultSink for ConsoleFaultSink {
    fn report(&self, fault: &ParseFault) {
        if self.config.format == "json" {
            warn!(
                target: "access_log",
                line = %fault.line,
                reason = %fault.reason,
                observed_at = %fault.observed_at.to_rfc3339()
            );
        } else {
            warn!(target: "access_log", "Parsing log entry: {}", fault.reason);
        }
    }
}

pub mod console_sink;
pub mod memory_sink;
pub mod types;

pub use self::console_sink::ConsoleFaultSink;
pub use self::memory_sink::MemoryFaultSink;
pub use self::types::{ParseFault, ParseFaultSink};

use crate::config::LoggingConfig;
use std::sync::Arc;
use tracing::warn;

/// Fans every parse fault out to the configured sinks.
pub struct FaultLogger {
    sinks: Vec<Arc<dyn ParseFaultSink>>,
}

impl FaultLogger {
    /// Builds the sinks named in `config.fault_sinks`.
    ///
    /// The memory sink, if configured, is also returned so the caller can
    /// read it back.
    pub fn new(config: &LoggingConfig) -> (Arc<Self>, Option<Arc<MemoryFaultSink>>) {
        let mut sinks: Vec<Arc<dyn ParseFaultSink>> = Vec::new();
        let mut memory = None;

        for sink_type in &config.fault_sinks {
            match sink_type.as_str() {
                "console" => sinks.push(Arc::new(ConsoleFaultSink::new(config.clone()))),
                "memory" => {
                    let sink = Arc::new(MemoryFaultSink::new(config.memory_capacity));
                    memory = Some(sink.clone());
                    sinks.push(sink);
                }
                other => warn!("Unknown fault sink type: {}", other),
            }
        }

        (Arc::new(Self { sinks }), memory)
    }

    pub fn with_sinks(sinks: Vec<Arc<dyn ParseFaultSink>>) -> Arc<Self> {
        Arc::new(Self { sinks })
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl ParseFaultSink for FaultLogger {
    fn report(&self, fault: &ParseFault) {
        for sink in &self.sinks {
            sink.report(fault);
        }
    }
}

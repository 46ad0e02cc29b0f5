use super::{ParseFault, ParseFaultSink};
use std::collections::VecDeque;
use std::sync::RwLock;

/// Keeps the most recent faults in a bounded ring buffer.
pub struct MemoryFaultSink {
    buffer: RwLock<VecDeque<ParseFault>>,
    capacity: usize,
}

impl MemoryFaultSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Oldest first.
    pub fn get_recent(&self) -> Vec<ParseFault> {
        match self.buffer.read() {
            Ok(buffer) => buffer.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}

impl ParseFaultSink for MemoryFaultSink {
    fn report(&self, fault: &ParseFault) {
        if self.capacity == 0 {
            return;
        }
        let mut buffer = match self.buffer.write() {
            Ok(buffer) => buffer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(fault.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fault(line: &str) -> ParseFault {
        ParseFault {
            observed_at: Utc::now(),
            line: line.to_string(),
            reason: "bad".to_string(),
        }
    }

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let sink = MemoryFaultSink::new(2);
        sink.report(&fault("a"));
        sink.report(&fault("b"));
        sink.report(&fault("c"));
        let lines: Vec<_> = sink.get_recent().into_iter().map(|f| f.line).collect();
        assert_eq!(lines, vec!["b", "c"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let sink = MemoryFaultSink::new(0);
        sink.report(&fault("a"));
        assert!(sink.get_recent().is_empty());
    }
}

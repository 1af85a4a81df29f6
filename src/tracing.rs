//! Event tracing for debugging bebop.
//!
//! Keeps a ring buffer of recent display events and state transitions.
//! Each record is also emitted at `trace` level as a JSON line, and the
//! dispatcher dumps the tail of the buffer when an event handler fails.

use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;

use crate::state::StateTransition;
use crate::types::Handle;

/// Maximum number of events to keep in the trace buffer
const DEFAULT_MAX_ENTRIES: usize = 1000;

/// A single trace record
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<Handle>,
    pub details: String,
}

/// Event tracer with ring buffer storage
pub struct EventTracer {
    entries: VecDeque<TraceEntry>,
    max_entries: usize,
    sequence: u64,
    start_time: Instant,
}

impl EventTracer {
    /// Create a new event tracer with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Create a new event tracer with specified capacity
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
            sequence: 0,
            start_time: Instant::now(),
        }
    }

    fn timestamp(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Trace an inbound display event
    pub fn trace_event(&mut self, event_type: &str, window: Option<Handle>, details: &str) {
        self.add_entry(event_type.to_string(), window, details.to_string());
    }

    /// Trace a state transition
    pub fn trace_transition(&mut self, transition: &StateTransition) {
        let window = match transition {
            StateTransition::ClientManaged { window, .. }
            | StateTransition::ClientUnmanaged { window, .. }
            | StateTransition::ClientRejected { window, .. } => Some(*window),
            StateTransition::FocusChanged { to, .. } => *to,
        };
        let details = serde_json::to_string(transition).unwrap_or_else(|_| "unknown".to_string());
        self.add_entry(transition.name().to_string(), window, details);
    }

    fn add_entry(&mut self, event_type: String, window: Option<Handle>, details: String) {
        if self.max_entries == 0 {
            return;
        }
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }

        self.sequence += 1;
        let entry = TraceEntry {
            sequence: self.sequence,
            timestamp_ms: self.timestamp(),
            event_type,
            window,
            details,
        };
        if log::log_enabled!(log::Level::Trace) {
            if let Ok(line) = serde_json::to_string(&entry) {
                log::trace!("{}", line);
            }
        }
        self.entries.push_back(entry);
    }

    /// Get the last N entries
    pub fn get_last(&self, n: usize) -> Vec<TraceEntry> {
        let start = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(start).cloned().collect()
    }
}

impl Default for EventTracer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_event() {
        let mut tracer = EventTracer::new();
        tracer.trace_event("WindowAppeared", Some(12345), "");

        let entries = tracer.get_last(10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, "WindowAppeared");
        assert_eq!(entries[0].window, Some(12345));
    }

    #[test]
    fn test_trace_transition() {
        let mut tracer = EventTracer::new();
        tracer.trace_transition(&StateTransition::FocusChanged {
            from: Some(1),
            to: Some(2),
        });

        let entries = tracer.get_last(1);
        assert_eq!(entries[0].event_type, "focus_changed");
        assert_eq!(entries[0].window, Some(2));
        assert!(entries[0].details.contains("\"from\":1"));
    }

    #[test]
    fn test_ring_buffer_overflow() {
        let mut tracer = EventTracer::with_capacity(3);

        tracer.trace_event("event1", None, "");
        tracer.trace_event("event2", None, "");
        tracer.trace_event("event3", None, "");
        tracer.trace_event("event4", None, "");

        let entries = tracer.get_last(10);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].event_type, "event2");
        assert_eq!(entries[2].event_type, "event4");
        assert_eq!(entries[2].sequence, 4);
    }

    #[test]
    fn test_get_last() {
        let mut tracer = EventTracer::new();

        for i in 0..10 {
            tracer.trace_event(&format!("event{}", i), None, "");
        }

        let last_3 = tracer.get_last(3);
        assert_eq!(last_3.len(), 3);
        assert_eq!(last_3[0].event_type, "event7");
        assert_eq!(last_3[2].event_type, "event9");
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut tracer = EventTracer::with_capacity(0);
        tracer.trace_event("a", None, "");
        assert!(tracer.get_last(10).is_empty());
    }
}

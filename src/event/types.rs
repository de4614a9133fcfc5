//! Core event type accepted by the aggregation loop

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single labeled observation
///
/// Events are immutable once decoded. The loop keeps them only for the
/// duration of one flush cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name (e.g., "request_latency_ms")
    #[serde(rename = "event")]
    pub name: String,

    /// Label key/value pairs. Keys are unique.
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Observed value
    pub value: f64,

    /// Timestamp in nanoseconds since the Unix epoch
    #[serde(rename = "ts", default)]
    pub timestamp_nanos: i64,
}

impl Event {
    /// Create an unlabeled event stamped with the current time
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Event {
            name: name.into(),
            labels: HashMap::new(),
            value,
            timestamp_nanos: now_nanos(),
        }
    }

    /// Attach a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set timestamp
    pub fn with_timestamp_nanos(mut self, timestamp_nanos: i64) -> Self {
        self.timestamp_nanos = timestamp_nanos;
        self
    }

    /// Get a label value
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Current wall-clock time in nanoseconds, saturating at `i64::MAX`
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = Event::new("lat", 12.5)
            .with_label("region", "us-east-1")
            .with_label("az", "us-east-1c")
            .with_timestamp_nanos(42);

        assert_eq!(event.name, "lat");
        assert_eq!(event.value, 12.5);
        assert_eq!(event.label("region"), Some("us-east-1"));
        assert_eq!(event.label("missing"), None);
        assert_eq!(event.timestamp_nanos, 42);
    }

    #[test]
    fn test_new_event_is_stamped() {
        let event = Event::new("lat", 1.0);
        assert!(event.timestamp_nanos > 0);
    }

    #[test]
    fn test_label_overwrite() {
        let event = Event::new("lat", 1.0)
            .with_label("pod", "a")
            .with_label("pod", "b");
        assert_eq!(event.labels.len(), 1);
        assert_eq!(event.label("pod"), Some("b"));
    }
}

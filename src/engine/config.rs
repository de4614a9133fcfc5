//! Aggregation Loop Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of events buffered before a forced flush
pub const DEFAULT_BUFFER_CAPACITY: usize = 32 * 1024;

/// Default maximum time between flushes
pub const DEFAULT_FLUSH_WINDOW: Duration = Duration::from_secs(5);

/// Configuration for the aggregation loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Events buffered before a flush is forced (default: 32768)
    pub buffer_capacity: usize,
    /// Maximum time between flushes when the buffer is not full (default: 5s)
    #[serde(with = "duration_millis")]
    pub flush_window: Duration,
    /// Capacity of the incoming event queue (default: 32768)
    pub event_queue_capacity: usize,
    /// Capacity of each command queue: enable and disable (default: 32)
    pub command_queue_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_window: DEFAULT_FLUSH_WINDOW,
            event_queue_capacity: 32 * 1024,
            command_queue_capacity: 32,
        }
    }
}

impl LoopConfig {
    /// Configuration for testing (tiny buffer)
    pub fn test() -> Self {
        LoopConfig {
            buffer_capacity: 2,
            flush_window: Duration::from_secs(5),
            event_queue_capacity: 64,
            command_queue_capacity: 8,
        }
    }

    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    pub fn with_flush_window(mut self, flush_window: Duration) -> Self {
        self.flush_window = flush_window;
        self
    }

    pub fn validate(&self) -> Result<(), LoopConfigError> {
        if self.buffer_capacity == 0 {
            return Err(LoopConfigError::ZeroBufferCapacity);
        }
        if self.flush_window.is_zero() {
            return Err(LoopConfigError::ZeroFlushWindow);
        }
        if self.event_queue_capacity == 0 || self.command_queue_capacity == 0 {
            return Err(LoopConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

/// Invalid loop configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopConfigError {
    ZeroBufferCapacity,
    ZeroFlushWindow,
    ZeroQueueCapacity,
}

impl std::fmt::Display for LoopConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopConfigError::ZeroBufferCapacity => write!(f, "buffer capacity must be positive"),
            LoopConfigError::ZeroFlushWindow => write!(f, "flush window must be positive"),
            LoopConfigError::ZeroQueueCapacity => write!(f, "queue capacities must be positive"),
        }
    }
}

impl std::error::Error for LoopConfigError {}

/// Serde helper for Duration as milliseconds
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoopConfig::default();
        assert_eq!(config.buffer_capacity, 32768);
        assert_eq!(config.flush_window, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let config = LoopConfig::default().with_buffer_capacity(0);
        assert_eq!(config.validate(), Err(LoopConfigError::ZeroBufferCapacity));

        let config = LoopConfig::default().with_flush_window(Duration::ZERO);
        assert_eq!(config.validate(), Err(LoopConfigError::ZeroFlushWindow));

        let config = LoopConfig {
            command_queue_capacity: 0,
            ..LoopConfig::default()
        };
        assert_eq!(config.validate(), Err(LoopConfigError::ZeroQueueCapacity));
    }

    #[test]
    fn test_config_serialization() {
        let config = LoopConfig::test();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"flush_window\":5000"));
        let parsed: LoopConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}

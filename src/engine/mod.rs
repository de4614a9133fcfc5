//! Aggregation engine
//!
//! Collections describe what to aggregate; aggregators hold the per-group
//! samples; the aggregation loop is the only writer and decides when a
//! buffered batch is flushed into them.

pub mod aggregator;
pub mod collection;
pub mod config;
pub mod event_loop;
pub mod histogram;
pub mod key;

pub use aggregator::{Aggregator, HistogramSnapshot, SampleSnapshot, SampleValue};
pub use collection::{AggregationKind, Collection, CollectionError};
pub use config::{LoopConfig, LoopConfigError, DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_WINDOW};
pub use event_loop::{
    spawn_loop, AggregationLoop, LoopClosed, LoopHandle, LoopStats, LoopStatsSnapshot,
    TryPublishError,
};
pub use histogram::Histogram;

//! Event aggregator
//!
//! Turns a stream of labeled events into Prometheus metrics. Aggregation
//! rules ("collections") are added and removed at runtime; a single loop
//! buffers events and flushes them into per-collection aggregators, which
//! the exporter reads concurrently on every scrape.

pub mod client;
pub mod engine;
pub mod event;
pub mod export;
pub mod observability;
pub mod server;

pub use engine::{
    spawn_loop, AggregationKind, Aggregator, Collection, CollectionError, LoopConfig, LoopHandle,
};
pub use event::Event;
pub use export::MetricsExporter;

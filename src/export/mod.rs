//! Metrics export
//!
//! Adapts enabled aggregators to prometheus collectors so `/metrics` can
//! render them in the text exposition format.

mod collector;
mod exporter;

pub use collector::AggregatorCollector;
pub use exporter::{ExportError, MetricsExporter, TEXT_CONTENT_TYPE};

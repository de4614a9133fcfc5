//! Collector set that publishes aggregators as scrapeable metrics
//!
//! Collections come and go at runtime, so the exporter keeps its own map of
//! collectors keyed by metric name instead of a `prometheus::Registry`. A
//! registry remembers the label names and help text of every name it has
//! seen, which would block re-enabling a collection with a new shape.

use super::collector::AggregatorCollector;
use crate::engine::Aggregator;
use parking_lot::RwLock;
use prometheus::core::Collector;
use prometheus::proto::{Metric, MetricFamily};
use prometheus::TextEncoder;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Content type of the text exposition format
pub const TEXT_CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Errors surfaced by the exporter
#[derive(Debug)]
pub enum ExportError {
    /// Metric or label name is not a valid identifier
    Descriptor(prometheus::Error),
    /// A collector with this metric name is already exported
    Duplicate(String),
    /// Text encoding failed
    Encode(prometheus::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Descriptor(e) => write!(f, "invalid descriptor: {}", e),
            ExportError::Duplicate(name) => write!(f, "metric {:?} already exported", name),
            ExportError::Encode(e) => write!(f, "encode error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Descriptor(e) | ExportError::Encode(e) => Some(e),
            ExportError::Duplicate(_) => None,
        }
    }
}

/// Shared handle to the exported collectors
///
/// Cloning is cheap; all clones see the same collectors, so the loop can
/// register collections while scrape handlers gather.
#[derive(Clone, Default)]
pub struct MetricsExporter {
    collectors: Arc<RwLock<BTreeMap<String, AggregatorCollector>>>,
}

impl MetricsExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start exporting an aggregator
    pub fn register(&self, aggregator: Arc<Aggregator>) -> Result<(), ExportError> {
        let collector = AggregatorCollector::new(aggregator).map_err(ExportError::Descriptor)?;
        let name = collector.aggregator().name().to_string();

        let mut collectors = self.collectors.write();
        if collectors.contains_key(&name) {
            return Err(ExportError::Duplicate(name));
        }
        collectors.insert(name, collector);
        Ok(())
    }

    /// Stop exporting an aggregator; false when it was not registered
    ///
    /// Only the exact aggregator is removed, never another one that happens
    /// to share its name.
    pub fn unregister(&self, aggregator: &Arc<Aggregator>) -> bool {
        let mut collectors = self.collectors.write();
        match collectors.get(aggregator.name()) {
            Some(collector) if Arc::ptr_eq(collector.aggregator(), aggregator) => {
                collectors.remove(aggregator.name());
                true
            }
            _ => false,
        }
    }

    /// Snapshot every exported metric family
    ///
    /// Families come out sorted by name and their metrics by label values.
    /// Families without samples are omitted.
    pub fn gather(&self) -> Vec<MetricFamily> {
        let collectors = self.collectors.read();
        collectors
            .values()
            .flat_map(|collector| collector.collect())
            .filter(|family| !family.get_metric().is_empty())
            .map(|mut family| {
                family
                    .mut_metric()
                    .sort_by(|a, b| label_values(a).cmp(label_values(b)));
                family
            })
            .collect()
    }

    /// Render the text exposition format
    pub fn encode_text(&self) -> Result<String, ExportError> {
        let families = self.gather();
        let mut buffer = String::new();
        TextEncoder::new()
            .encode_utf8(&families, &mut buffer)
            .map_err(ExportError::Encode)?;
        Ok(buffer)
    }
}

fn label_values<'a>(metric: &'a Metric) -> impl Iterator<Item = &'a str> + 'a {
    metric.get_label().iter().map(|pair| pair.get_value())
}

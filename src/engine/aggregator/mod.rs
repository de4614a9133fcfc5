//! Aggregators: one stateful processor per enabled collection
//!
//! Four fixed strategies share one contract:
//!
//! - `collection()` returns the rule the aggregator was built from
//! - `handle(events)` folds a flushed batch into the per-group samples
//!   (called only from the aggregation loop)
//! - `collect()` snapshots every sample for export (called concurrently
//!   from scrape handlers)

mod table;
mod count;
mod sum;
mod gauge;
mod histogram;

pub use table::{Sample, SampleTable};
pub use count::CountAggregator;
pub use sum::SumAggregator;
pub use gauge::GaugeAggregator;
pub use histogram::HistogramAggregator;

use super::collection::{AggregationKind, Collection, CollectionError};
use crate::event::Event;

/// Exported state of one group
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSnapshot {
    /// Values parallel to the collection's label keys
    pub label_values: Vec<String>,
    pub value: SampleValue,
}

/// Kind-specific payload of a sample
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Count(u64),
    Sum(f64),
    Gauge(f64),
    Histogram(HistogramSnapshot),
}

/// Point-in-time copy of a histogram
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// Observations that landed in a bucket
    pub count: u64,
    /// Observations above the largest bound
    pub overflow: u64,
    /// Sum of all observations, including overflow
    pub sum: f64,
    /// `(upper bound, cumulative count)` in ascending bound order
    pub buckets: Vec<(f64, u64)>,
}

impl HistogramSnapshot {
    pub fn cumulative_count(&self, bound: f64) -> Option<u64> {
        self.buckets
            .iter()
            .find(|(b, _)| *b == bound)
            .map(|(_, count)| *count)
    }
}

/// A live aggregator, dispatched by the collection's aggregation kind
#[derive(Debug)]
pub enum Aggregator {
    Count(CountAggregator),
    Sum(SumAggregator),
    Gauge(GaugeAggregator),
    Histogram(HistogramAggregator),
}

impl Aggregator {
    /// Validate a collection and build the matching aggregator
    ///
    /// Histogram bounds are sorted ascending (duplicates dropped) before use.
    pub fn new(mut collection: Collection) -> Result<Self, CollectionError> {
        let kind = collection.validate()?;
        let aggregator = match kind {
            AggregationKind::Count => Aggregator::Count(CountAggregator::new(collection)),
            AggregationKind::Sum => Aggregator::Sum(SumAggregator::new(collection)),
            AggregationKind::Gauge => Aggregator::Gauge(GaugeAggregator::new(collection)),
            AggregationKind::Histogram => {
                collection.normalize_buckets();
                Aggregator::Histogram(HistogramAggregator::new(collection))
            }
        };
        Ok(aggregator)
    }

    pub fn kind(&self) -> AggregationKind {
        match self {
            Aggregator::Count(_) => AggregationKind::Count,
            Aggregator::Sum(_) => AggregationKind::Sum,
            Aggregator::Gauge(_) => AggregationKind::Gauge,
            Aggregator::Histogram(_) => AggregationKind::Histogram,
        }
    }

    pub fn collection(&self) -> &Collection {
        match self {
            Aggregator::Count(p) => p.collection(),
            Aggregator::Sum(p) => p.collection(),
            Aggregator::Gauge(p) => p.collection(),
            Aggregator::Histogram(p) => p.collection(),
        }
    }

    pub fn name(&self) -> &str {
        &self.collection().name
    }

    /// Fold a batch into the sample table (loop thread only)
    pub fn handle(&self, events: &[Event]) {
        match self {
            Aggregator::Count(p) => p.handle(events),
            Aggregator::Sum(p) => p.handle(events),
            Aggregator::Gauge(p) => p.handle(events),
            Aggregator::Histogram(p) => p.handle(events),
        }
    }

    /// Snapshot every group; order is unspecified
    pub fn collect(&self) -> Vec<SampleSnapshot> {
        match self {
            Aggregator::Count(p) => p.collect(),
            Aggregator::Sum(p) => p.collect(),
            Aggregator::Gauge(p) => p.collect(),
            Aggregator::Histogram(p) => p.collect(),
        }
    }

    /// Read one group by label values in declared label order
    pub fn sample(&self, values: &[&str]) -> Option<SampleValue> {
        match self {
            Aggregator::Count(p) => p.get(values).map(SampleValue::Count),
            Aggregator::Sum(p) => p.get(values).map(SampleValue::Sum),
            Aggregator::Gauge(p) => p.get(values).map(SampleValue::Gauge),
            Aggregator::Histogram(p) => p.get(values).map(SampleValue::Histogram),
        }
    }

    /// Number of distinct groups seen
    pub fn groups(&self) -> usize {
        match self {
            Aggregator::Count(p) => p.groups(),
            Aggregator::Sum(p) => p.groups(),
            Aggregator::Gauge(p) => p.groups(),
            Aggregator::Histogram(p) => p.groups(),
        }
    }
}

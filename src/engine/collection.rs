//! Collections: runtime aggregation rules
//!
//! A collection subscribes to one event name, groups matching events by an
//! ordered list of label keys, and exports the aggregate as one metric.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aggregation strategy of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    /// Number of matching events
    Count,
    /// Running sum of event values
    Sum,
    /// Last value seen
    Gauge,
    /// Cumulative bucketed distribution of event values
    Histogram,
}

impl AggregationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::Sum => "sum",
            AggregationKind::Gauge => "gauge",
            AggregationKind::Histogram => "histogram",
        }
    }
}

impl FromStr for AggregationKind {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(AggregationKind::Count),
            "sum" => Ok(AggregationKind::Sum),
            "gauge" => Ok(AggregationKind::Gauge),
            "histogram" => Ok(AggregationKind::Histogram),
            other => Err(CollectionError::UnknownAggregation(other.to_string())),
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a collection is refused at registration
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionError {
    EmptyName,
    EmptyEvent,
    /// A collection with this name is already enabled
    Duplicate(String),
    UnknownAggregation(String),
    /// Histogram collection without bucket bounds
    NoBuckets,
    /// Bucket bound that cannot be ordered
    InvalidBucket(f64),
    /// Rejected by the metrics exporter (invalid metric or label name)
    Export(String),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::EmptyName => write!(f, "collection has an empty name"),
            CollectionError::EmptyEvent => write!(f, "collection has an empty event"),
            CollectionError::Duplicate(name) => write!(f, "duplicated collection: {:?}", name),
            CollectionError::UnknownAggregation(kind) => {
                write!(f, "unknown aggregation: {:?}", kind)
            }
            CollectionError::NoBuckets => write!(f, "histogram collection has no buckets"),
            CollectionError::InvalidBucket(b) => write!(f, "invalid bucket bound: {}", b),
            CollectionError::Export(msg) => write!(f, "exporter rejected collection: {}", msg),
        }
    }
}

impl std::error::Error for CollectionError {}

/// An aggregation rule
///
/// Immutable once enabled; replacing one requires disable-then-enable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Collection {
    /// Unique identifier, also the exported metric name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// One of `count`, `sum`, `gauge`, `histogram`
    #[serde(default)]
    pub aggregation: String,

    /// Event name this collection subscribes to
    #[serde(default)]
    pub event: String,

    /// Label keys every matching event must carry. Order fixes both the
    /// exported label order and the group key layout.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Histogram bucket upper bounds (ignored for other aggregations)
    #[serde(default)]
    pub buckets: Vec<f64>,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        aggregation: AggregationKind,
        event: impl Into<String>,
    ) -> Self {
        Collection {
            name: name.into(),
            aggregation: aggregation.as_str().to_string(),
            event: event.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_buckets(mut self, buckets: impl Into<Vec<f64>>) -> Self {
        self.buckets = buckets.into();
        self
    }

    /// Parse the aggregation field
    pub fn kind(&self) -> Result<AggregationKind, CollectionError> {
        self.aggregation.parse()
    }

    /// Check the rule and return its aggregation kind
    ///
    /// Duplicate names are checked by the loop, which owns the registry.
    pub fn validate(&self) -> Result<AggregationKind, CollectionError> {
        if self.name.is_empty() {
            return Err(CollectionError::EmptyName);
        }
        if self.event.is_empty() {
            return Err(CollectionError::EmptyEvent);
        }
        let kind = self.kind()?;
        if kind == AggregationKind::Histogram {
            if self.buckets.is_empty() {
                return Err(CollectionError::NoBuckets);
            }
            if let Some(bad) = self.buckets.iter().find(|b| !b.is_finite()) {
                return Err(CollectionError::InvalidBucket(*bad));
            }
        }
        Ok(kind)
    }

    /// Sort histogram bounds ascending and drop exact duplicates
    pub(crate) fn normalize_buckets(&mut self) {
        self.buckets.sort_by(f64::total_cmp);
        self.buckets.dedup();
    }
}

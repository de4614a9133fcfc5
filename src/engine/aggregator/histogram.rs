//! Histogram aggregation: one bucketed distribution per group

use super::table::SampleTable;
use super::{HistogramSnapshot, SampleSnapshot, SampleValue};
use crate::engine::collection::Collection;
use crate::engine::histogram::Histogram;
use crate::event::Event;
use std::sync::Arc;

#[derive(Debug)]
pub struct HistogramAggregator {
    collection: Collection,
    bounds: Arc<[f64]>,
    table: SampleTable<Histogram>,
}

impl HistogramAggregator {
    /// `collection.buckets` must already be sorted ascending
    pub fn new(collection: Collection) -> Self {
        let bounds: Arc<[f64]> = Arc::from(collection.buckets.as_slice());
        HistogramAggregator {
            collection,
            bounds,
            table: SampleTable::new(),
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn handle(&self, events: &[Event]) {
        let bounds = &self.bounds;
        self.table.update(
            &self.collection,
            events,
            || Histogram::new(Arc::clone(bounds)),
            |histogram, value| histogram.add(value),
        );
    }

    pub fn collect(&self) -> Vec<SampleSnapshot> {
        self.table.snapshot(view)
    }

    pub fn get(&self, values: &[&str]) -> Option<HistogramSnapshot> {
        match self.table.get(&self.collection.labels, values, view)? {
            SampleValue::Histogram(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn groups(&self) -> usize {
        self.table.len()
    }
}

fn view(histogram: &Histogram) -> SampleValue {
    SampleValue::Histogram(HistogramSnapshot::from(histogram))
}

impl From<&Histogram> for HistogramSnapshot {
    fn from(histogram: &Histogram) -> Self {
        HistogramSnapshot {
            count: histogram.total(),
            overflow: histogram.overflow(),
            sum: histogram.sum(),
            buckets: histogram.bucket_counts(),
        }
    }
}

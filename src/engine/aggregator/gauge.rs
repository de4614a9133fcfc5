//! Gauge aggregation: last value seen per group

use super::table::SampleTable;
use super::{SampleSnapshot, SampleValue};
use crate::engine::collection::Collection;
use crate::event::Event;

#[derive(Debug)]
pub struct GaugeAggregator {
    collection: Collection,
    table: SampleTable<f64>,
}

impl GaugeAggregator {
    pub fn new(collection: Collection) -> Self {
        GaugeAggregator {
            collection,
            table: SampleTable::new(),
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Events are applied in batch order, so the last matching event of a
    /// batch determines the group's value.
    pub fn handle(&self, events: &[Event]) {
        self.table
            .update(&self.collection, events, || 0.0, |gauge, value| *gauge = value);
    }

    pub fn collect(&self) -> Vec<SampleSnapshot> {
        self.table.snapshot(view)
    }

    pub fn get(&self, values: &[&str]) -> Option<f64> {
        match self.table.get(&self.collection.labels, values, view)? {
            SampleValue::Gauge(value) => Some(value),
            _ => None,
        }
    }

    pub fn groups(&self) -> usize {
        self.table.len()
    }
}

fn view(value: &f64) -> SampleValue {
    SampleValue::Gauge(*value)
}

//! Sum aggregation: running total of event values per group

use super::table::SampleTable;
use super::{SampleSnapshot, SampleValue};
use crate::engine::collection::Collection;
use crate::event::Event;

#[derive(Debug)]
pub struct SumAggregator {
    collection: Collection,
    table: SampleTable<f64>,
}

impl SumAggregator {
    pub fn new(collection: Collection) -> Self {
        SumAggregator {
            collection,
            table: SampleTable::new(),
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Values are added as-is; sums may go negative
    pub fn handle(&self, events: &[Event]) {
        self.table
            .update(&self.collection, events, || 0.0, |sum, value| *sum += value);
    }

    pub fn collect(&self) -> Vec<SampleSnapshot> {
        self.table.snapshot(view)
    }

    pub fn get(&self, values: &[&str]) -> Option<f64> {
        match self.table.get(&self.collection.labels, values, view)? {
            SampleValue::Sum(sum) => Some(sum),
            _ => None,
        }
    }

    pub fn groups(&self) -> usize {
        self.table.len()
    }
}

fn view(sum: &f64) -> SampleValue {
    SampleValue::Sum(*sum)
}

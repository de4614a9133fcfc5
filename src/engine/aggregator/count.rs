//! Count aggregation: number of matching events per group

use super::table::SampleTable;
use super::{SampleSnapshot, SampleValue};
use crate::engine::collection::Collection;
use crate::event::Event;

#[derive(Debug)]
pub struct CountAggregator {
    collection: Collection,
    table: SampleTable<u64>,
}

impl CountAggregator {
    pub fn new(collection: Collection) -> Self {
        CountAggregator {
            collection,
            table: SampleTable::new(),
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn handle(&self, events: &[Event]) {
        self.table.update(
            &self.collection,
            events,
            || 0,
            |count, _| *count = count.saturating_add(1),
        );
    }

    pub fn collect(&self) -> Vec<SampleSnapshot> {
        self.table.snapshot(view)
    }

    pub fn get(&self, values: &[&str]) -> Option<u64> {
        match self.table.get(&self.collection.labels, values, view)? {
            SampleValue::Count(count) => Some(count),
            _ => None,
        }
    }

    pub fn groups(&self) -> usize {
        self.table.len()
    }
}

fn view(count: &u64) -> SampleValue {
    SampleValue::Count(*count)
}

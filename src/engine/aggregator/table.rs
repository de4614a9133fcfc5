//! Per-group sample table shared by every aggregation kind
//!
//! The loop is the only writer; exporters read concurrently. Writes hold the
//! exclusive lock for a whole batch so a reader sees either none or all of
//! a flush.

use super::{SampleSnapshot, SampleValue};
use crate::engine::collection::Collection;
use crate::engine::key::{group_key, label_values, matches};
use crate::event::Event;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Initial table capacity (groups)
const INITIAL_GROUPS: usize = 64;

/// Accumulated state of one label-value combination
#[derive(Debug, Clone)]
pub struct Sample<S> {
    /// Values parallel to the collection's label keys
    pub label_values: Vec<String>,
    pub state: S,
}

/// Group key → sample map behind a reader/writer lock
#[derive(Debug)]
pub struct SampleTable<S> {
    samples: RwLock<HashMap<String, Sample<S>>>,
}

impl<S> SampleTable<S> {
    pub fn new() -> Self {
        SampleTable {
            samples: RwLock::new(HashMap::with_capacity(INITIAL_GROUPS)),
        }
    }

    /// Apply every matching event of a batch, in batch order
    ///
    /// Unseen groups are created with `init` before `apply` runs.
    pub fn update<I, F>(&self, collection: &Collection, events: &[Event], init: I, mut apply: F)
    where
        I: Fn() -> S,
        F: FnMut(&mut S, f64),
    {
        let mut samples = self.samples.write();
        for event in events {
            if !matches(event, &collection.event, &collection.labels) {
                continue;
            }
            let values = label_values(event, &collection.labels);
            let key = group_key(&collection.labels, &values);
            let sample = samples.entry(key).or_insert_with(|| Sample {
                label_values: values.iter().map(|v| v.to_string()).collect(),
                state: init(),
            });
            apply(&mut sample.state, event.value);
        }
    }

    /// Read every sample under the shared lock
    ///
    /// Group order is unspecified.
    pub fn snapshot<F>(&self, view: F) -> Vec<SampleSnapshot>
    where
        F: Fn(&S) -> SampleValue,
    {
        let samples = self.samples.read();
        samples
            .values()
            .map(|sample| SampleSnapshot {
                label_values: sample.label_values.clone(),
                value: view(&sample.state),
            })
            .collect()
    }

    /// Read one group by its label values (in declared label order)
    pub fn get<F>(&self, labels: &[String], values: &[&str], view: F) -> Option<SampleValue>
    where
        F: Fn(&S) -> SampleValue,
    {
        if labels.len() != values.len() {
            return None;
        }
        let key = group_key(labels, values);
        self.samples.read().get(&key).map(|sample| view(&sample.state))
    }

    /// Number of groups seen so far
    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for SampleTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collection::AggregationKind;

    #[test]
    fn test_update_creates_groups_lazily() {
        let collection =
            Collection::new("lat_count", AggregationKind::Count, "lat").with_labels(["pod"]);
        let table: SampleTable<u64> = SampleTable::new();
        assert!(table.is_empty());

        let events = vec![
            Event::new("lat", 1.0).with_label("pod", "a"),
            Event::new("lat", 1.0).with_label("pod", "b"),
            Event::new("lat", 1.0).with_label("pod", "a"),
            Event::new("other", 1.0).with_label("pod", "a"),
            Event::new("lat", 1.0),
        ];
        table.update(&collection, &events, || 0, |c, _| *c += 1);

        assert_eq!(table.len(), 2);
        let view = |c: &u64| SampleValue::Count(*c);
        assert_eq!(
            table.get(&collection.labels, &["a"], view),
            Some(SampleValue::Count(2))
        );
        assert_eq!(
            table.get(&collection.labels, &["b"], view),
            Some(SampleValue::Count(1))
        );
        assert_eq!(table.get(&collection.labels, &["c"], view), None);
        assert_eq!(table.get(&collection.labels, &[], view), None);
    }

    #[test]
    fn test_snapshot_carries_label_values() {
        let collection = Collection::new("lat_count", AggregationKind::Count, "lat")
            .with_labels(["region", "az"]);
        let table: SampleTable<u64> = SampleTable::new();
        let events = vec![Event::new("lat", 1.0)
            .with_label("az", "us-east-1c")
            .with_label("region", "us-east-1")];
        table.update(&collection, &events, || 0, |c, _| *c += 1);

        let snapshot = table.snapshot(|c| SampleValue::Count(*c));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].label_values, vec!["us-east-1", "us-east-1c"]);
    }
}

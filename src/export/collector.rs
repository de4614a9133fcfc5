//! Prometheus collector adapter for one aggregator
//!
//! Each scrape calls [`Aggregator::collect`] (shared lock only) and turns the
//! snapshot into a metric family:
//!
//! | Aggregation | Exported type |
//! |-------------|---------------|
//! | count       | counter       |
//! | sum         | gauge (sums may decrease) |
//! | gauge       | gauge         |
//! | histogram   | histogram     |

use crate::engine::{AggregationKind, Aggregator, HistogramSnapshot, SampleValue};
use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, LabelPair, Metric, MetricFamily, MetricType};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only bridge between an aggregator and the metrics exporter
pub struct AggregatorCollector {
    aggregator: Arc<Aggregator>,
    desc: Desc,
}

impl AggregatorCollector {
    /// Build the descriptor from the collection's name, help, and labels
    ///
    /// Fails when the name or a label key is not a valid metric identifier.
    pub fn new(aggregator: Arc<Aggregator>) -> prometheus::Result<Self> {
        let collection = aggregator.collection();
        let desc = Desc::new(
            collection.name.clone(),
            help_text(&aggregator),
            collection.labels.clone(),
            HashMap::new(),
        )?;
        Ok(AggregatorCollector { aggregator, desc })
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }
}

/// Exposition requires a non-empty help string
fn help_text(aggregator: &Aggregator) -> String {
    let collection = aggregator.collection();
    if collection.description.is_empty() {
        format!("{} of {} events", aggregator.kind(), collection.event)
    } else {
        collection.description.clone()
    }
}

fn metric_type(kind: AggregationKind) -> MetricType {
    match kind {
        AggregationKind::Count => MetricType::COUNTER,
        AggregationKind::Sum | AggregationKind::Gauge => MetricType::GAUGE,
        AggregationKind::Histogram => MetricType::HISTOGRAM,
    }
}

fn label_pairs(labels: &[String], values: &[String]) -> Vec<LabelPair> {
    labels
        .iter()
        .zip(values)
        .map(|(name, value)| {
            let mut pair = LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            pair
        })
        .collect()
}

fn counter(value: f64) -> proto::Counter {
    let mut counter = proto::Counter::default();
    counter.set_value(value);
    counter
}

fn gauge(value: f64) -> proto::Gauge {
    let mut gauge = proto::Gauge::default();
    gauge.set_value(value);
    gauge
}

/// Over-range observations are reported in the sample count so the
/// implicit `+Inf` bucket agrees with the sum.
fn histogram(snapshot: &HistogramSnapshot) -> proto::Histogram {
    let mut histogram = proto::Histogram::default();
    histogram.set_sample_count(snapshot.count.saturating_add(snapshot.overflow));
    histogram.set_sample_sum(snapshot.sum);
    for (upper_bound, cumulative_count) in &snapshot.buckets {
        let mut bucket = proto::Bucket::default();
        bucket.set_upper_bound(*upper_bound);
        bucket.set_cumulative_count(*cumulative_count);
        histogram.mut_bucket().push(bucket);
    }
    histogram
}

impl Collector for AggregatorCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let collection = self.aggregator.collection();

        let mut family = MetricFamily::default();
        family.set_name(collection.name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(metric_type(self.aggregator.kind()));

        for sample in self.aggregator.collect() {
            let mut metric = Metric::default();
            for pair in label_pairs(&collection.labels, &sample.label_values) {
                metric.mut_label().push(pair);
            }
            match &sample.value {
                SampleValue::Count(count) => metric.set_counter(counter(*count as f64)),
                SampleValue::Sum(value) | SampleValue::Gauge(value) => {
                    metric.set_gauge(gauge(*value))
                }
                SampleValue::Histogram(snapshot) => metric.set_histogram(histogram(snapshot)),
            }
            family.mut_metric().push(metric);
        }

        vec![family]
    }
}

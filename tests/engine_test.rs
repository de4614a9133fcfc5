//! Aggregation Engine Integration Tests
//!
//! Drives the aggregation loop through its public handle and reads results
//! back through the exporter, verifying:
//! - Count / sum / gauge / histogram end-to-end scenarios
//! - Capacity and timer flush triggers
//! - Runtime enable / disable semantics
//! - Final flush when the loop shuts down

use event_aggregator::engine::{
    spawn_loop, AggregationKind, Collection, LoopConfig, LoopHandle,
};
use event_aggregator::event::Event;
use event_aggregator::export::MetricsExporter;
use prometheus::proto::Metric;
use std::time::Duration;
use tokio::task::JoinHandle;

fn start(config: LoopConfig) -> (MetricsExporter, LoopHandle, JoinHandle<()>) {
    let exporter = MetricsExporter::new();
    let (handle, task) = spawn_loop(config, exporter.clone()).unwrap();
    (exporter, handle, task)
}

/// Drop the last handle and wait for the loop's final flush
async fn finish(handle: LoopHandle, task: JoinHandle<()>) {
    drop(handle);
    task.await.unwrap();
}

fn metric(exporter: &MetricsExporter, name: &str, labels: &[(&str, &str)]) -> Option<Metric> {
    let families = exporter.gather();
    let family = families.iter().find(|f| f.get_name() == name)?;
    family
        .get_metric()
        .iter()
        .find(|m| {
            let pairs: Vec<(&str, &str)> = m
                .get_label()
                .iter()
                .map(|p| (p.get_name(), p.get_value()))
                .collect();
            pairs == labels
        })
        .cloned()
}

fn counter(exporter: &MetricsExporter, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    metric(exporter, name, labels).map(|m| m.get_counter().get_value())
}

fn gauge(exporter: &MetricsExporter, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    metric(exporter, name, labels).map(|m| m.get_gauge().get_value())
}

fn lat(region: &str, az: &str, value: f64) -> Event {
    Event::new("lat", value)
        .with_label("region", region)
        .with_label("az", az)
}

// ============================================================================
// Aggregation Scenarios
// ============================================================================

#[tokio::test]
async fn test_count_by_region_and_az() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle
        .enable(
            Collection::new("lat_count", AggregationKind::Count, "lat")
                .with_labels(["region", "az"]),
        )
        .await
        .unwrap();

    handle.publish(lat("us-east-1", "us-east-1c", 1.0)).await.unwrap();
    handle.publish(lat("us-east-1", "us-east-1c", 1.0)).await.unwrap();
    handle.publish(lat("us-west-1", "us-west-1c", 1.0)).await.unwrap();
    finish(handle, task).await;

    assert_eq!(
        counter(&exporter, "lat_count", &[("region", "us-east-1"), ("az", "us-east-1c")]),
        Some(2.0)
    );
    assert_eq!(
        counter(&exporter, "lat_count", &[("region", "us-west-1"), ("az", "us-west-1c")]),
        Some(1.0)
    );
}

#[tokio::test]
async fn test_sum_with_negative_values() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle
        .enable(Collection::new("lat_sum", AggregationKind::Sum, "lat").with_labels(["region"]))
        .await
        .unwrap();

    handle.publish(lat("us-east-1", "a", 300.5)).await.unwrap();
    handle.publish(lat("us-east-1", "b", -50.1)).await.unwrap();
    finish(handle, task).await;

    let sum = gauge(&exporter, "lat_sum", &[("region", "us-east-1")]).unwrap();
    assert!((sum - 250.4).abs() < 1e-9, "sum was {}", sum);
}

#[tokio::test]
async fn test_gauge_keeps_last_value_in_batch() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle
        .enable(Collection::new("lat_gauge", AggregationKind::Gauge, "lat").with_labels(["region"]))
        .await
        .unwrap();

    handle.publish(lat("us-east-1", "a", 300.5)).await.unwrap();
    handle.publish(lat("us-east-1", "a", 312.0)).await.unwrap();
    finish(handle, task).await;

    assert_eq!(
        gauge(&exporter, "lat_gauge", &[("region", "us-east-1")]),
        Some(312.0)
    );
}

#[tokio::test]
async fn test_histogram_one_to_thousand() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(128));
    let bounds: Vec<f64> = (1..=10).map(|i| (i * 100) as f64).collect();
    handle
        .enable(Collection::new("lat_hist", AggregationKind::Histogram, "lat").with_buckets(bounds))
        .await
        .unwrap();

    for i in 1..=1000 {
        handle.publish(Event::new("lat", i as f64)).await.unwrap();
    }
    finish(handle, task).await;

    let h = metric(&exporter, "lat_hist", &[]).unwrap();
    let h = h.get_histogram();
    let buckets: Vec<(f64, u64)> = h
        .get_bucket()
        .iter()
        .map(|b| (b.get_upper_bound(), b.get_cumulative_count()))
        .collect();
    assert_eq!(buckets.len(), 10);
    assert_eq!(buckets[0], (100.0, 100));
    assert_eq!(buckets[4], (500.0, 500));
    assert_eq!(buckets[9], (1000.0, 1000));
    assert_eq!(h.get_sample_count(), 1000);
    assert_eq!(h.get_sample_sum(), 500_500.0);
}

// ============================================================================
// Flush Triggers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_capacity_flush_then_timer_flush() {
    let config = LoopConfig::test()
        .with_buffer_capacity(2)
        .with_flush_window(Duration::from_secs(5));
    let (exporter, handle, task) = start(config);
    handle
        .enable(Collection::new("lat_count", AggregationKind::Count, "lat"))
        .await
        .unwrap();

    // Two events fill the buffer: flushed without waiting for the timer
    handle.publish(Event::new("lat", 1.0)).await.unwrap();
    handle.publish(Event::new("lat", 1.0)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(counter(&exporter, "lat_count", &[]), Some(2.0));
    assert_eq!(handle.stats().flushes, 1);

    // One event waits for the window
    handle.publish(Event::new("lat", 1.0)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(counter(&exporter, "lat_count", &[]), Some(2.0));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(counter(&exporter, "lat_count", &[]), Some(3.0));

    let stats = handle.stats();
    assert_eq!(stats.flushes, 2);
    assert_eq!(stats.flushed_events, 3);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn test_idle_timer_does_not_flush() {
    let (_exporter, handle, task) = start(LoopConfig::test());
    handle
        .enable(Collection::new("lat_count", AggregationKind::Count, "lat"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(handle.stats().flushes, 0);

    finish(handle, task).await;
}

#[tokio::test]
async fn test_shutdown_flushes_buffer() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle
        .enable(Collection::new("lat_count", AggregationKind::Count, "lat"))
        .await
        .unwrap();
    handle.publish(Event::new("lat", 1.0)).await.unwrap();
    finish(handle, task).await;

    assert_eq!(counter(&exporter, "lat_count", &[]), Some(1.0));
}

// ============================================================================
// Enable / Disable
// ============================================================================

#[tokio::test]
async fn test_disable_keeps_shared_event_subscribed() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle
        .enable(Collection::new("a_count", AggregationKind::Count, "lat"))
        .await
        .unwrap();
    handle
        .enable(Collection::new("b_sum", AggregationKind::Sum, "lat"))
        .await
        .unwrap();
    handle.disable("a_count").await.unwrap();

    handle.publish(Event::new("lat", 4.0)).await.unwrap();
    let stats = handle.shared_stats();
    finish(handle, task).await;

    assert_eq!(gauge(&exporter, "b_sum", &[]), Some(4.0));
    assert!(metric(&exporter, "a_count", &[]).is_none());

    let stats = stats.snapshot();
    assert_eq!(stats.events_accepted, 1);
    assert_eq!(stats.events_dropped, 0);
    assert_eq!(stats.collections, 1);
}

#[tokio::test]
async fn test_duplicate_enable_is_noop() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle
        .enable(Collection::new("c", AggregationKind::Count, "lat"))
        .await
        .unwrap();
    handle
        .enable(Collection::new("c", AggregationKind::Count, "other"))
        .await
        .unwrap();

    handle.publish(Event::new("lat", 1.0)).await.unwrap();
    handle.publish(Event::new("other", 1.0)).await.unwrap();
    let stats = handle.shared_stats();
    finish(handle, task).await;

    assert_eq!(counter(&exporter, "c", &[]), Some(1.0));
    let stats = stats.snapshot();
    assert_eq!(stats.collections, 1);
    assert_eq!(stats.events_dropped, 1);
}

#[tokio::test]
async fn test_rejected_collection_drops_events() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle
        .enable(Collection::new("h", AggregationKind::Histogram, "lat"))
        .await
        .unwrap();
    handle.publish(Event::new("lat", 1.0)).await.unwrap();
    let stats = handle.shared_stats();
    finish(handle, task).await;

    assert!(exporter.gather().is_empty());
    let stats = stats.snapshot();
    assert_eq!(stats.collections, 0);
    assert_eq!(stats.events_dropped, 1);
}

#[tokio::test]
async fn test_events_before_enable_are_dropped() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle.publish(Event::new("lat", 1.0)).await.unwrap();
    // Give the loop a chance to consume the event before the enable
    while handle.stats().events_dropped == 0 {
        tokio::task::yield_now().await;
    }
    handle
        .enable(Collection::new("c", AggregationKind::Count, "lat"))
        .await
        .unwrap();
    handle.publish(Event::new("lat", 1.0)).await.unwrap();
    finish(handle, task).await;

    assert_eq!(counter(&exporter, "c", &[]), Some(1.0));
}

#[tokio::test]
async fn test_reenable_with_new_labels() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle
        .enable(Collection::new("lat_count", AggregationKind::Count, "lat").with_labels(["region"]))
        .await
        .unwrap();
    handle.disable("lat_count").await.unwrap();
    handle
        .enable(
            Collection::new("lat_count", AggregationKind::Count, "lat")
                .with_labels(["region", "az"]),
        )
        .await
        .unwrap();

    handle.publish(lat("us-east-1", "us-east-1c", 1.0)).await.unwrap();
    let stats = handle.shared_stats();
    finish(handle, task).await;

    assert_eq!(
        counter(&exporter, "lat_count", &[("region", "us-east-1"), ("az", "us-east-1c")]),
        Some(1.0)
    );
    let stats = stats.snapshot();
    assert_eq!(stats.collections, 1);
    assert_eq!(stats.events_dropped, 0);
}

#[tokio::test]
async fn test_reenable_with_new_description() {
    let (exporter, handle, task) = start(LoopConfig::test().with_buffer_capacity(100));
    handle
        .enable(Collection::new("lat_count", AggregationKind::Count, "lat"))
        .await
        .unwrap();
    handle.disable("lat_count").await.unwrap();
    handle
        .enable(
            Collection::new("lat_count", AggregationKind::Count, "lat")
                .with_description("latency events seen"),
        )
        .await
        .unwrap();

    handle.publish(Event::new("lat", 1.0)).await.unwrap();
    let stats = handle.shared_stats();
    finish(handle, task).await;

    let text = exporter.encode_text().unwrap();
    assert!(text.contains("# HELP lat_count latency events seen"));
    assert!(text.contains("lat_count 1"));
    assert_eq!(stats.snapshot().collections, 1);
}

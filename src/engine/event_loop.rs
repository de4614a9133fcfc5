//! Aggregation Loop - single writer over every aggregator
//!
//! One task owns the event buffer, the aggregator registry, and the
//! subscription counts. Producers reach it only through three bounded
//! queues; exporters read aggregators directly.
//!
//! ## Architecture
//!
//! ```text
//! admin ──► collections ──┐
//! admin ──► removals ─────┤
//!                  timer ─┼──► AggregationLoop ──► buffer ──► flush ──► Aggregator::handle
//! udp ────► events ───────┘                                              ▲
//!                                                   /metrics ── collect ─┘
//! ```
//!
//! ## Flush Triggers
//!
//! - **Capacity**: the buffer reached `buffer_capacity` events
//! - **Window**: `flush_window` elapsed since the previous flush
//!
//! The timer is re-armed after either trigger, so the window is measured
//! from the end of the last flush.

use super::aggregator::Aggregator;
use super::collection::{Collection, CollectionError};
use super::config::{LoopConfig, LoopConfigError};
use crate::event::Event;
use crate::export::MetricsExporter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Counters published by the loop, readable from any handle
#[derive(Debug, Default)]
pub struct LoopStats {
    events_accepted: AtomicU64,
    events_dropped: AtomicU64,
    flushes: AtomicU64,
    flushed_events: AtomicU64,
    collections: AtomicUsize,
}

impl LoopStats {
    pub fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            flushed_events: self.flushed_events.load(Ordering::Relaxed),
            collections: self.collections.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LoopStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStatsSnapshot {
    /// Events appended to the buffer
    pub events_accepted: u64,
    /// Events dropped because no collection subscribes to them
    pub events_dropped: u64,
    pub flushes: u64,
    /// Events handed to aggregators across all flushes
    pub flushed_events: u64,
    /// Collections currently enabled
    pub collections: usize,
}

/// The loop task has exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopClosed;

impl std::fmt::Display for LoopClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "aggregation loop is closed")
    }
}

impl std::error::Error for LoopClosed {}

/// Non-blocking publish failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPublishError {
    /// Event queue is at capacity; the event was not enqueued
    Full,
    Closed,
}

impl std::fmt::Display for TryPublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TryPublishError::Full => write!(f, "event queue is full"),
            TryPublishError::Closed => write!(f, "aggregation loop is closed"),
        }
    }
}

impl std::error::Error for TryPublishError {}

/// Loop state; consumed by [`AggregationLoop::run`]
pub struct AggregationLoop {
    aggregators: HashMap<String, Arc<Aggregator>>,
    /// Event name → number of enabled collections subscribing to it
    subscriptions: HashMap<String, usize>,
    buffer: Vec<Event>,
    capacity: usize,
    flush_window: Duration,
    exporter: MetricsExporter,
    stats: Arc<LoopStats>,
    collections_rx: mpsc::Receiver<Collection>,
    removals_rx: mpsc::Receiver<String>,
    events_rx: mpsc::Receiver<Event>,
}

impl AggregationLoop {
    /// Build the loop and its first handle
    ///
    /// The configuration is assumed valid; [`spawn_loop`] validates it.
    pub fn new(config: &LoopConfig, exporter: MetricsExporter) -> (Self, LoopHandle) {
        let (collections_tx, collections_rx) = mpsc::channel(config.command_queue_capacity);
        let (removals_tx, removals_rx) = mpsc::channel(config.command_queue_capacity);
        let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity);
        let stats = Arc::new(LoopStats::default());

        let event_loop = AggregationLoop {
            aggregators: HashMap::new(),
            subscriptions: HashMap::new(),
            buffer: Vec::with_capacity(config.buffer_capacity),
            capacity: config.buffer_capacity,
            flush_window: config.flush_window,
            exporter,
            stats: Arc::clone(&stats),
            collections_rx,
            removals_rx,
            events_rx,
        };
        let handle = LoopHandle {
            collections_tx,
            removals_tx,
            events_tx,
            stats,
        };
        (event_loop, handle)
    }

    /// Run until every [`LoopHandle`] is dropped
    ///
    /// Commands are polled before the timer and the timer before events,
    /// so a saturated event queue never delays enable/disable or a flush.
    pub async fn run(mut self) {
        let timer = tokio::time::sleep(self.flush_window);
        tokio::pin!(timer);

        let mut collections_open = true;
        let mut removals_open = true;

        info!(
            "Aggregation loop started (buffer {}, window {:?})",
            self.capacity, self.flush_window
        );

        loop {
            tokio::select! {
                biased;

                collection = self.collections_rx.recv(), if collections_open => match collection {
                    Some(collection) => {
                        let _ = self.enable(collection);
                    }
                    None => collections_open = false,
                },
                name = self.removals_rx.recv(), if removals_open => match name {
                    Some(name) => {
                        self.disable(&name);
                    }
                    None => removals_open = false,
                },
                () = &mut timer => {
                    self.flush();
                    timer.as_mut().reset(Instant::now() + self.flush_window);
                }
                event = self.events_rx.recv() => match event {
                    Some(event) => {
                        if self.accept(event) {
                            self.flush();
                            timer.as_mut().reset(Instant::now() + self.flush_window);
                        }
                    }
                    None => break,
                },
            }
        }

        self.flush();
        info!(
            "Aggregation loop stopped ({} collections)",
            self.aggregators.len()
        );
    }

    /// Register a collection and start exporting it
    ///
    /// Rejections leave the registry, the subscriptions, and the exporter
    /// untouched.
    fn enable(&mut self, collection: Collection) -> Result<(), CollectionError> {
        let name = collection.name.clone();
        let result = self.register(collection);
        match &result {
            Ok(()) => info!("Collection {:?} enabled", name),
            Err(e) => warn!("Collection {:?} rejected: {}", name, e),
        }
        result
    }

    fn register(&mut self, collection: Collection) -> Result<(), CollectionError> {
        if self.aggregators.contains_key(&collection.name) {
            return Err(CollectionError::Duplicate(collection.name));
        }

        let aggregator = Arc::new(Aggregator::new(collection)?);
        self.exporter
            .register(Arc::clone(&aggregator))
            .map_err(|e| CollectionError::Export(e.to_string()))?;

        let event = aggregator.collection().event.clone();
        *self.subscriptions.entry(event).or_insert(0) += 1;
        self.aggregators
            .insert(aggregator.name().to_string(), aggregator);
        self.stats
            .collections
            .store(self.aggregators.len(), Ordering::Relaxed);
        Ok(())
    }

    /// Remove a collection; returns false if it was not enabled
    ///
    /// The event name stays subscribed while another collection uses it.
    fn disable(&mut self, name: &str) -> bool {
        let aggregator = match self.aggregators.remove(name) {
            Some(aggregator) => aggregator,
            None => {
                debug!("Collection {:?} not enabled; nothing to disable", name);
                return false;
            }
        };

        if !self.exporter.unregister(&aggregator) {
            warn!("Collection {:?} was not registered with the exporter", name);
        }

        let event = &aggregator.collection().event;
        if let Some(count) = self.subscriptions.get_mut(event) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.subscriptions.remove(event);
            }
        }

        self.stats
            .collections
            .store(self.aggregators.len(), Ordering::Relaxed);
        info!("Collection {:?} disabled", name);
        true
    }

    /// Buffer an event; returns true when the buffer is full
    fn accept(&mut self, event: Event) -> bool {
        if self.aggregators.is_empty() || !self.subscriptions.contains_key(&event.name) {
            self.stats.events_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.buffer.push(event);
        self.stats.events_accepted.fetch_add(1, Ordering::Relaxed);
        self.buffer.len() >= self.capacity
    }

    /// Hand the buffered batch to every aggregator and reset the buffer
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        for aggregator in self.aggregators.values() {
            aggregator.handle(&self.buffer);
        }

        let flushed = self.buffer.len();
        debug!(
            "Flushed {} events to {} aggregators",
            flushed,
            self.aggregators.len()
        );
        self.stats.flushes.fetch_add(1, Ordering::Relaxed);
        self.stats
            .flushed_events
            .fetch_add(flushed as u64, Ordering::Relaxed);
        self.buffer.clear();
    }
}

// ============================================================================
// LoopHandle - public interface for producers and the admin surface
// ============================================================================

/// Handle for sending collections, removals, and events to the loop
///
/// The loop stops once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    collections_tx: mpsc::Sender<Collection>,
    removals_tx: mpsc::Sender<String>,
    events_tx: mpsc::Sender<Event>,
    stats: Arc<LoopStats>,
}

impl LoopHandle {
    /// Queue a collection for registration
    ///
    /// Validation happens on the loop; a rejected collection is logged there.
    pub async fn enable(&self, collection: Collection) -> Result<(), LoopClosed> {
        self.collections_tx
            .send(collection)
            .await
            .map_err(|_| LoopClosed)
    }

    /// Queue removal of a collection by name
    pub async fn disable(&self, name: impl Into<String>) -> Result<(), LoopClosed> {
        self.removals_tx
            .send(name.into())
            .await
            .map_err(|_| LoopClosed)
    }

    /// Publish an event, waiting for queue space
    pub async fn publish(&self, event: Event) -> Result<(), LoopClosed> {
        self.events_tx.send(event).await.map_err(|_| LoopClosed)
    }

    /// Publish an event without waiting
    pub fn try_publish(&self, event: Event) -> Result<(), TryPublishError> {
        self.events_tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TryPublishError::Full,
            mpsc::error::TrySendError::Closed(_) => TryPublishError::Closed,
        })
    }

    pub fn stats(&self) -> LoopStatsSnapshot {
        self.stats.snapshot()
    }

    /// Counters that stay readable after the loop (and every handle) is gone
    pub fn shared_stats(&self) -> Arc<LoopStats> {
        Arc::clone(&self.stats)
    }

    /// True once the loop task has exited
    pub fn is_closed(&self) -> bool {
        self.events_tx.is_closed()
    }
}

/// Spawn an aggregation loop and return its handle + join handle
pub fn spawn_loop(
    config: LoopConfig,
    exporter: MetricsExporter,
) -> Result<(LoopHandle, tokio::task::JoinHandle<()>), LoopConfigError> {
    config.validate()?;
    let (event_loop, handle) = AggregationLoop::new(&config, exporter);
    let task = tokio::spawn(event_loop.run());
    Ok((handle, task))
}

//! Demo producer
//!
//! Publishes a random `request_latency_ms` event (labelled with a pod) and
//! an `event_not_collected` event every 10ms to `$EVENT_AGGREGATOR_HOST`.

use event_aggregator::client::Client;
use event_aggregator::event::Event;
use event_aggregator::observability::{init_tracing, LogConfig};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

const PODS: &[&str] = &["pod-1e0", "pod-1ff", "pod-def"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing(&LogConfig::from_env());

    let client = Client::from_env().await?;
    info!("Publishing demo events to {}", client.peer_addr()?);

    let mut ticker = tokio::time::interval(Duration::from_millis(10));
    loop {
        ticker.tick().await;

        let (latency, pod) = {
            let mut rng = rand::thread_rng();
            let latency = rng.gen_range(0..400) as f64;
            let pod = PODS.choose(&mut rng).copied().unwrap_or("pod-1e0");
            (latency, pod)
        };

        client
            .publish(&[
                Event::new("request_latency_ms", latency).with_label("pod", pod),
                Event::new("event_not_collected", latency),
            ])
            .await?;
        debug!("Published two events");
    }
}

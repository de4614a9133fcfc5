//! Event Aggregator Server
//!
//! Receives events over UDP, aggregates them by the enabled collections, and
//! serves the result at `/metrics`.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | EVENT_AGGREGATOR_CONFIG | (none) | TOML config file (same as `--config`) |
//! | EVENT_AGGREGATOR_UDP_PORT | 6678 | UDP port for events |
//! | EVENT_AGGREGATOR_ENDPOINT | 0.0.0.0:6677 | Admin + metrics address |
//! | RUST_LOG | info | Log filter |
//! | LOG_FORMAT | text | `json` for structured logs |

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::Parser;
use event_aggregator::engine::spawn_loop;
use event_aggregator::export::MetricsExporter;
use event_aggregator::observability::{init_tracing, LogConfig};
use event_aggregator::server::{config::ENV_CONFIG, router, AppState, EventListener, ServerConfig};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "event-aggregator", version, about = "Aggregate labeled events into Prometheus metrics")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = ENV_CONFIG)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    init_tracing(&LogConfig::from_env());

    let config = ServerConfig::load(args.config.as_deref())?;
    info!(
        "Starting event aggregator (udp port {}, endpoint {}, buffer {}, window {:?})",
        config.udp_port,
        config.endpoint,
        config.buffer_size,
        config.flush_window()
    );

    let exporter = MetricsExporter::new();
    let (handle, loop_task) = spawn_loop(config.loop_config(), exporter.clone())?;

    for collection in &config.collections {
        handle.enable(collection.clone()).await?;
    }

    let listener = EventListener::bind(config.udp_addr(), handle.clone()).await?;
    let udp_task = tokio::spawn(listener.run());

    let app = router(AppState::new(handle.clone(), exporter));
    let http = TcpListener::bind(&config.endpoint).await?;
    info!("Admin server listening on http://{}", http.local_addr()?);

    axum::serve(http, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dropping every handle lets the loop flush and exit
    udp_task.abort();
    let _ = udp_task.await;
    drop(handle);
    if let Err(e) = loop_task.await {
        warn!("Aggregation loop ended abnormally: {}", e);
    }

    info!("Event aggregator stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

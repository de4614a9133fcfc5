//! Event aggregator server: configuration, UDP ingestion, and the HTTP
//! admin/exposition surface around the aggregation loop.

pub mod admin;
pub mod config;
pub mod udp;

pub use admin::{router, AppState};
pub use config::{ConfigError, ServerConfig};
pub use udp::EventListener;

//! UDP publisher for event producers
//!
//! ```no_run
//! # async fn demo() -> std::io::Result<()> {
//! use event_aggregator::client::Client;
//! use event_aggregator::event::Event;
//!
//! let client = Client::from_env().await?;
//! client
//!     .publish(&[Event::new("request_latency_ms", 42.0).with_label("pod", "web-1")])
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::event::Event;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::{lookup_host, ToSocketAddrs, UdpSocket};

/// Host variable read by [`Client::from_env`]
pub const ENV_HOST: &str = "EVENT_AGGREGATOR_HOST";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6678;

/// Connected UDP socket to one aggregator
#[derive(Debug)]
pub struct Client {
    socket: UdpSocket,
}

impl Client {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let target = lookup_host(addr).await?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
        })?;
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        Ok(Client { socket })
    }

    /// Connect to `$EVENT_AGGREGATOR_HOST:6678` (default host 127.0.0.1)
    pub async fn from_env() -> io::Result<Self> {
        let host = std::env::var(ENV_HOST)
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        Self::connect((host.as_str(), DEFAULT_PORT)).await
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket.peer_addr()
    }

    /// Send each event as its own text-format datagram
    pub async fn publish(&self, events: &[Event]) -> io::Result<()> {
        for event in events {
            let mut line = event.to_text();
            line.push('\n');
            self.socket.send(line.as_bytes()).await?;
        }
        Ok(())
    }
}

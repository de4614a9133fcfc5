//! UDP event listener
//!
//! Each datagram carries one or more newline-separated events in the text
//! or JSON format. Decoded events are forwarded to the aggregation loop;
//! a full event queue stalls the listener (the kernel then drops datagrams).

use crate::engine::LoopHandle;
use crate::event::parse_datagram;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// Largest datagram accepted
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

pub struct EventListener {
    socket: UdpSocket,
    handle: LoopHandle,
}

impl EventListener {
    pub async fn bind(addr: SocketAddr, handle: LoopHandle) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(EventListener { socket, handle })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive until the aggregation loop closes
    pub async fn run(self) {
        let addr = self
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        info!("Listening for events on udp://{}", addr);

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    error!("Failed to receive datagram: {}", e);
                    continue;
                }
            };

            for result in parse_datagram(&buf[..len]) {
                match result {
                    Ok(event) => {
                        if self.handle.publish(event).await.is_err() {
                            info!("Aggregation loop closed; stopping UDP listener");
                            return;
                        }
                    }
                    Err(e) => warn!("Dropping malformed event from {}: {}", peer, e),
                }
            }
            debug!("Received {} bytes from {}", len, peer);
        }
    }
}

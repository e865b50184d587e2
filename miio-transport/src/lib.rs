//! Transport layer for the miIO protocol
//!
//! Provides UDP communication with devices: a connected per-exchange
//! transport and a broadcast-capable socket for discovery.

pub mod broadcast;
pub mod error;
pub mod udp;

pub use broadcast::DatagramSocket;
pub use error::{Error, Result};
pub use udp::UdpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
///
/// The engine opens the transport right before an exchange and closes it
/// right after, so no socket outlives a single request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a socket towards the device
    async fn connect(&mut self) -> Result<()>;

    /// Close the socket
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send one datagram
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one datagram (with timeout)
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Get remote address
    fn remote_addr(&self) -> String;

    /// Open, send one datagram, wait for one reply, close
    async fn exchange(&mut self, data: &[u8], timeout: Duration) -> Result<BytesMut> {
        self.connect().await?;

        let result = match self.send(data).await {
            Ok(()) => self.receive(timeout).await,
            Err(e) => Err(e),
        };

        if let Err(e) = self.disconnect().await {
            tracing::warn!("Failed to close socket to {}: {}", self.remote_addr(), e);
        }

        result
    }
}

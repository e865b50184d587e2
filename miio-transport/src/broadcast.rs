//! Unconnected datagram socket used for discovery
//!
//! Unlike [`UdpTransport`](crate::UdpTransport) this socket is not bound
//! to a single peer: it can send to a broadcast address and receive replies
//! from any device on the segment.

use std::net::SocketAddr;

use bytes::BytesMut;
use miio_core::constants::RECV_BUFFER_SIZE;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::trace;

use crate::error::*;

/// Broadcast-capable UDP socket
pub struct DatagramSocket {
    socket: UdpSocket,
}

impl DatagramSocket {
    /// Bind an ephemeral IPv4 socket with broadcast enabled
    pub async fn bind() -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;

        Ok(Self { socket })
    }

    /// Local address the socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Send one datagram to `target`
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        trace!("Sending {} bytes to {}", data.len(), target);

        self.socket.send_to(data, target).await?;
        Ok(())
    }

    /// Receive one datagram, giving up at `deadline`
    pub async fn recv_from_until(&self, deadline: Instant) -> Result<(BytesMut, SocketAddr)> {
        let mut buf = BytesMut::zeroed(RECV_BUFFER_SIZE);

        let (n, from) = timeout_at(deadline, self.socket.recv_from(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)??;

        if n == 0 {
            return Err(Error::EmptyDatagram);
        }

        buf.truncate(n);
        trace!("Received {} bytes from {}", n, from);

        Ok((buf, from))
    }
}

//! Device discovery
//!
//! Discovery sends the token-less handshake frame and reads the header of
//! each reply. A unicast scan asks one address; a broadcast scan asks the
//! whole segment and collects replies until the window closes.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use miio_core::constants::BROADCAST_REPEATS;
use miio_core::{Frame, Header};
use miio_transport::{DatagramSocket, Transport, UdpTransport};
use miio_types::DiscoveredDevice;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::DiscoveryConfig;
use crate::error::Result;

/// Send one handshake over `transport` and parse the reply header
///
/// Shared by [`Scanner::unicast`] and the device handshake.
pub(crate) async fn handshake_exchange(
    transport: &mut dyn Transport,
    timeout: Duration,
) -> Result<Header> {
    let hello = Frame::handshake();
    let reply = transport.exchange(&hello, timeout).await?;
    let header = Header::parse(&reply)?;

    trace!(
        "Handshake reply from {}: {:?}",
        transport.remote_addr(),
        header
    );

    Ok(header)
}

/// Devices seen during one or more scans, keyed by source IP
///
/// Owned by the caller so repeated scans can share it.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySet {
    seen: HashSet<IpAddr>,
    devices: Vec<DiscoveredDevice>,
}

impl DiscoverySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a device; returns `false` if its IP was already seen
    pub fn insert(&mut self, device: DiscoveredDevice) -> bool {
        if !self.seen.insert(device.addr.ip()) {
            return false;
        }

        self.devices.push(device);
        true
    }

    /// Check if a device at `ip` was seen
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.seen.contains(ip)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices in the order they answered
    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredDevice> {
        self.devices.iter()
    }

    pub fn into_vec(self) -> Vec<DiscoveredDevice> {
        self.devices
    }
}

/// Device scanner
///
/// # Examples
///
/// ```no_run
/// use miio::{DiscoverySet, Scanner};
///
/// #[tokio::main]
/// async fn main() -> miio::Result<()> {
///     let scanner = Scanner::new();
///     let mut seen = DiscoverySet::new();
///
///     for device in scanner.broadcast(&mut seen).await? {
///         println!("{}", device);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: DiscoveryConfig,
}

impl Scanner {
    /// Scanner with default broadcast address and window
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Set discovery window
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Handshake with a single address
    ///
    /// Returns `None` if the device does not answer within the window.
    pub async fn unicast(&self, addr: SocketAddr) -> Result<Option<DiscoveredDevice>> {
        let mut transport = UdpTransport::new(addr.ip().to_string(), addr.port());

        match handshake_exchange(&mut transport, self.config.timeout).await {
            Ok(header) => {
                let device =
                    DiscoveredDevice::new(addr, header.device_id, header.timestamp, header.checksum);
                info!("{}", device);
                Ok(Some(device))
            }
            Err(crate::Error::Transport(e)) if e.is_timeout() => {
                debug!("No handshake reply from {}", addr);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Broadcast a handshake and collect the devices that answer
    ///
    /// Returns the devices not already in `seen`, in arrival order. The
    /// window elapsing ends the scan normally.
    pub async fn broadcast(&self, seen: &mut DiscoverySet) -> Result<Vec<DiscoveredDevice>> {
        let mut found = Vec::new();
        self.broadcast_with(seen, |device| found.push(device.clone())).await?;
        Ok(found)
    }

    /// Broadcast a handshake, calling `on_device` for each new device as it
    /// answers
    ///
    /// Returns the number of new devices.
    pub async fn broadcast_with<F>(&self, seen: &mut DiscoverySet, mut on_device: F) -> Result<usize>
    where
        F: FnMut(&DiscoveredDevice),
    {
        let target = self.config.broadcast_addr;
        let socket = DatagramSocket::bind().await?;
        let hello = Frame::handshake();

        debug!("Sending discovery handshake to {}", target);
        for _ in 0..BROADCAST_REPEATS {
            socket.send_to(&hello, target).await?;
        }

        let deadline = Instant::now() + self.config.timeout;
        let mut new_devices = 0;

        loop {
            let (reply, from) = match socket.recv_from_until(deadline).await {
                Ok(datagram) => datagram,
                Err(e) if e.is_timeout() => {
                    info!("Discovery done ({} new devices)", new_devices);
                    break;
                }
                Err(e) => {
                    warn!("Error while reading discovery results: {}", e);
                    break;
                }
            };

            let header = match Header::parse(&reply) {
                Ok(header) => header,
                Err(e) => {
                    warn!("Ignoring invalid discovery reply from {}: {}", from, e);
                    continue;
                }
            };

            let device =
                DiscoveredDevice::new(from, header.device_id, header.timestamp, header.checksum);

            if seen.insert(device.clone()) {
                info!("{}", device);
                on_device(&device);
                new_devices += 1;
            } else {
                trace!("Duplicate discovery reply from {}", from);
            }
        }

        Ok(new_devices)
    }

    /// Broadcast scan with a fresh accumulator
    pub async fn discover(&self) -> Result<Vec<DiscoveredDevice>> {
        let mut seen = DiscoverySet::new();
        self.broadcast(&mut seen).await
    }
}

//! Devices found by discovery

use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};

/// A device that answered a handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Source address of the reply
    pub addr: SocketAddr,

    /// Device identifier from the reply header
    pub device_id: u32,

    /// Device clock from the reply header
    pub timestamp: u32,

    /// Checksum field of the reply; the real token on unprovisioned devices
    pub token: [u8; 16],

    /// When the reply was received
    pub seen_at: DateTime<Utc>,
}

impl DiscoveredDevice {
    pub fn new(addr: SocketAddr, device_id: u32, timestamp: u32, token: [u8; 16]) -> Self {
        Self {
            addr,
            device_id,
            timestamp,
            token,
            seen_at: Utc::now(),
        }
    }

    /// Check if the device revealed its token (not all `0x00` or all `0xFF`)
    pub fn token_revealed(&self) -> bool {
        !self.token.iter().all(|b| *b == 0x00) && !self.token.iter().all(|b| *b == 0xFF)
    }

    /// Token fingerprint as hex
    pub fn token_hex(&self) -> String {
        hex::encode(self.token)
    }
}

impl fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (ID: {:08x}) - token: {}",
            self.addr.ip(),
            self.device_id,
            self.token_hex()
        )
    }
}

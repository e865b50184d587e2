//! Engine configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use miio_core::constants::{
    DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_RETRY_COUNT, DEFAULT_TIMEOUT, HANDSHAKE_ATTEMPTS,
};
use miio_core::DEFAULT_PORT;

/// Device connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device UDP port
    pub port: u16,

    /// Receive timeout per exchange
    pub timeout: Duration,

    /// Retries after the first request attempt
    pub retry_count: usize,

    /// Handshake attempts before giving up
    pub handshake_attempts: usize,

    /// Handshake only when no session exists; `false` handshakes before
    /// every request
    pub lazy_discover: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
            handshake_attempts: HANDSHAKE_ATTEMPTS,
            lazy_discover: true,
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set device port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set receive timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set default retry count
    pub fn with_retry_count(mut self, retry_count: usize) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set handshake attempts (at least one is always made)
    pub fn with_handshake_attempts(mut self, attempts: usize) -> Self {
        self.handshake_attempts = attempts.max(1);
        self
    }

    /// Choose lazy (default) or eager handshaking
    pub fn with_lazy_discover(mut self, lazy: bool) -> Self {
        self.lazy_discover = lazy;
        self
    }
}

/// Discovery settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Where broadcast handshakes are sent
    pub broadcast_addr: SocketAddr,

    /// How long to wait for replies
    pub timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            broadcast_addr: SocketAddr::from((Ipv4Addr::BROADCAST, DEFAULT_PORT)),
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set broadcast target
    pub fn with_broadcast_addr(mut self, addr: SocketAddr) -> Self {
        self.broadcast_addr = addr;
        self
    }

    /// Set discovery window
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.port, 54321);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry_count, 3);
        assert!(config.lazy_discover);

        let discovery = DiscoveryConfig::default();
        assert_eq!(discovery.broadcast_addr.to_string(), "255.255.255.255:54321");
    }

    #[test]
    fn test_builder() {
        let config = DeviceConfig::new()
            .with_port(1234)
            .with_timeout(Duration::from_millis(200))
            .with_retry_count(0)
            .with_handshake_attempts(0)
            .with_lazy_discover(false);

        assert_eq!(config.port, 1234);
        assert_eq!(config.retry_count, 0);
        assert_eq!(config.handshake_attempts, 1);
        assert!(!config.lazy_discover);
    }
}

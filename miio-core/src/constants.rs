//! Protocol constants

use std::time::Duration;

/// Magic value at the start of every frame
pub const MAGIC: u16 = 0x2131;

/// Filler byte for the handshake frame
pub const HANDSHAKE_FILL: u8 = 0xFF;

/// Default socket timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default discovery window
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of retries for a request after the first attempt
pub const DEFAULT_RETRY_COUNT: usize = 3;

/// Handshake attempts before a device is declared unreachable
pub const HANDSHAKE_ATTEMPTS: usize = 3;

/// Number of times a broadcast handshake is sent
pub const BROADCAST_REPEATS: usize = 3;

/// Sequence ids wrap back to 1 once the counter reaches this value
pub const SEQUENCE_WRAP: u32 = 9999;

/// Stride added to the sequence id after a transport failure
pub const RETRY_ID_STRIDE: u32 = 100;

/// Receive buffer size for a single datagram
pub const RECV_BUFFER_SIZE: usize = 4096;

/// Device error codes that are worth retrying
pub mod error_codes {
    /// Transient rejection, usually the device being busy
    pub const TRANSIENT: i64 = -30001;

    /// All codes treated as recoverable
    pub const RECOVERABLE: &[i64] = &[TRANSIENT];

    /// Check whether a device error code is recoverable
    pub fn is_recoverable(code: i64) -> bool {
        RECOVERABLE.contains(&code)
    }
}

/// Well-known method names
pub mod methods {
    /// Device information query
    pub const INFO: &str = "miIO.info";

    /// Default property getter
    pub const GET_PROP: &str = "get_prop";
}

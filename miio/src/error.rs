//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] miio_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] miio_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] miio_types::Error),

    /// Handshake got no reply after all attempts
    #[error("Device {addr} unreachable after {attempts} handshake attempts")]
    DeviceUnreachable {
        addr: String,
        attempts: usize,
    },

    /// Request retries exhausted on transport failures
    #[error("No response from device after {attempts} attempts: {source}")]
    NoResponse {
        attempts: usize,
        #[source]
        source: miio_transport::Error,
    },

    /// Reply checksum did not match; the token is wrong
    #[error("Invalid token for device {addr}: reply checksum mismatch")]
    InvalidToken {
        addr: String,
    },

    /// Device rejected the request
    #[error("Device returned error {code}: {message}")]
    Device {
        code: i64,
        message: String,
    },

    /// `miIO.info` could not be requested or parsed
    #[error("Device info unavailable: {0}")]
    DeviceInfoUnavailable(String),

    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Check if the device could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::DeviceUnreachable { .. } | Self::NoResponse { .. })
    }

    /// Check if error is recoverable (a later call might succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::NoResponse { .. } | Self::DeviceUnreachable { .. } => true,
            Self::Device { code, .. } => miio_core::constants::error_codes::is_recoverable(*code),
            _ => false,
        }
    }
}

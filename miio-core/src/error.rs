//! Error types for miio-core

/// Result type alias for miio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame is too short to be valid
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// Magic value does not identify a miIO frame
    #[error("Invalid magic: expected 0x2131, got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Length field disagrees with the datagram size
    #[error("Frame length mismatch: header says {declared} bytes, got {actual} bytes")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected {expected}, received {received}")]
    ChecksumMismatch {
        expected: String,
        received: String,
    },

    /// Body could not be decrypted (bad padding or block size)
    #[error("Failed to decrypt frame body")]
    Decrypt,

    /// Decrypted body is not a valid JSON envelope
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Encoded frame would not fit the 16-bit length field
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Token is not 32 hex characters
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Session not initialized
    #[error("Session not initialized - handshake with device first")]
    SessionNotInitialized,
}

impl Error {
    /// Check if the frame failed authentication rather than parsing
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }

    /// Check if the frame itself was malformed
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::FrameTooShort { .. }
                | Self::InvalidMagic(_)
                | Self::LengthMismatch { .. }
                | Self::Decrypt
                | Self::Payload(_)
        )
    }
}

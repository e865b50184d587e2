//! Session management for the miIO protocol
//!
//! A session represents what the client knows about one device:
//! - Device ID (learned during handshake)
//! - Last observed device timestamp
//! - Sequence id counter
//! - The shared token

use tracing::{debug, warn};

use crate::constants::SEQUENCE_WRAP;
use crate::error::{Error, Result};
use crate::token::Token;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device id or clock baseline known
    Unhandshaken,

    /// Handshake completed, requests can be built
    Ready,
}

/// Sequence id generator
///
/// Ids start at 1, increment per request and wrap back to 1 once the
/// counter reaches 9999. Zero is never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceId {
    current: u32,
}

impl SequenceId {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last id handed out (0 before the first call)
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Get the next id
    pub fn next(&mut self) -> u32 {
        self.current = self.current.saturating_add(1);
        if self.current >= SEQUENCE_WRAP {
            self.current = 1;
        }
        self.current
    }

    /// Jump ahead so ids of a possibly delayed reply are not reused
    pub fn skip(&mut self, stride: u32) {
        self.current = self.current.saturating_add(stride);
    }

    /// Adopt the id echoed by the device
    pub fn observe(&mut self, id: u32) {
        self.current = id;
    }
}

/// Per-device session
///
/// Owned exclusively by one engine; not shared between tasks.
#[derive(Debug, Clone)]
pub struct Session {
    token: Token,
    state: SessionState,
    device_id: u32,
    last_device_timestamp: u32,
    sequence: SequenceId,
}

impl Session {
    /// Create a new unhandshaken session
    pub fn new(token: Token) -> Self {
        Self {
            token,
            state: SessionState::Unhandshaken,
            device_id: 0,
            last_device_timestamp: 0,
            sequence: SequenceId::new(),
        }
    }

    /// Shared token
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if a handshake has completed
    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready)
    }

    /// Device id learned during handshake
    pub fn device_id(&self) -> Result<u32> {
        match self.state {
            SessionState::Ready => Ok(self.device_id),
            SessionState::Unhandshaken => Err(Error::SessionNotInitialized),
        }
    }

    /// Last device timestamp observed in a reply
    pub fn last_device_timestamp(&self) -> u32 {
        self.last_device_timestamp
    }

    /// Record a handshake reply as the new baseline
    pub fn establish(&mut self, device_id: u32, timestamp: u32) {
        if self.is_ready() && self.device_id != device_id {
            warn!(
                old = format!("0x{:08X}", self.device_id),
                new = format!("0x{:08X}", device_id),
                "Device id changed between handshakes"
            );
        }

        self.device_id = device_id;
        self.last_device_timestamp = timestamp;
        self.state = SessionState::Ready;

        debug!(
            device_id = format!("0x{:08X}", device_id),
            timestamp = timestamp,
            "Session established"
        );
    }

    /// Drop the device baseline so the next request handshakes again
    ///
    /// The sequence counter survives so later ids stay ahead of any reply
    /// still in flight.
    pub fn invalidate(&mut self) {
        self.state = SessionState::Unhandshaken;
        self.device_id = 0;
        self.last_device_timestamp = 0;
    }

    /// Timestamp for the next outgoing frame
    pub fn next_timestamp(&self) -> u32 {
        self.last_device_timestamp.wrapping_add(1)
    }

    /// Get next sequence id
    pub fn next_id(&mut self) -> u32 {
        self.sequence.next()
    }

    /// Advance the sequence id by a stride
    pub fn skip_ids(&mut self, stride: u32) {
        self.sequence.skip(stride);
    }

    /// Last sequence id used
    pub fn current_id(&self) -> u32 {
        self.sequence.current()
    }

    /// Update bookkeeping from a reply header and body id
    pub fn observe_reply(&mut self, timestamp: u32, reply_id: Option<u32>) {
        self.last_device_timestamp = timestamp;

        if let Some(id) = reply_id {
            if id != self.sequence.current() {
                warn!(
                    sent = self.sequence.current(),
                    received = id,
                    "Reply id differs from request id"
                );
            }
            self.sequence.observe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new() {
        let session = Session::new(Token::zero());
        assert_eq!(session.state(), SessionState::Unhandshaken);
        assert!(!session.is_ready());
        assert!(matches!(session.device_id(), Err(Error::SessionNotInitialized)));
    }

    #[test]
    fn test_session_establish() {
        let mut session = Session::new(Token::zero());
        session.establish(0x1234, 500);

        assert!(session.is_ready());
        assert_eq!(session.device_id().unwrap(), 0x1234);
        assert_eq!(session.next_timestamp(), 501);
    }

    #[test]
    fn test_session_invalidate_keeps_sequence() {
        let mut session = Session::new(Token::zero());
        session.establish(1, 10);
        session.next_id();
        session.next_id();

        session.invalidate();

        assert_eq!(session.state(), SessionState::Unhandshaken);
        assert_eq!(session.current_id(), 2);
        assert_eq!(session.next_id(), 3);
    }

    #[test]
    fn test_observe_reply() {
        let mut session = Session::new(Token::zero());
        session.establish(1, 10);
        let id = session.next_id();

        session.observe_reply(25, Some(id));
        assert_eq!(session.last_device_timestamp(), 25);
        assert_eq!(session.next_timestamp(), 26);
        assert_eq!(session.current_id(), id);
    }

    #[test]
    fn test_observe_reply_adopts_device_id() {
        let mut session = Session::new(Token::zero());
        session.establish(1, 10);
        session.next_id();

        session.observe_reply(11, Some(40));
        assert_eq!(session.next_id(), 41);
    }

    #[test]
    fn test_timestamp_wraps() {
        let mut session = Session::new(Token::zero());
        session.establish(1, u32::MAX);
        assert_eq!(session.next_timestamp(), 0);
    }

    #[test]
    fn test_sequence_starts_at_one() {
        let mut seq = SequenceId::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
    }

    #[test]
    fn test_sequence_wraparound() {
        let mut seq = SequenceId::new();
        for expected in 1..=9998 {
            assert_eq!(seq.next(), expected);
        }

        // Counter reaches 9999 and wraps
        assert_eq!(seq.next(), 1);
    }

    #[test]
    fn test_sequence_never_zero() {
        let mut seq = SequenceId::new();
        for _ in 0..30000 {
            let id = seq.next();
            assert!(id > 0 && id < 9999);
        }
    }

    #[test]
    fn test_sequence_skip() {
        let mut seq = SequenceId::new();
        seq.next();
        seq.skip(100);
        assert_eq!(seq.next(), 102);

        // Skipping past the wrap point lands back on 1
        seq.observe(9950);
        seq.skip(100);
        assert_eq!(seq.next(), 1);
    }
}

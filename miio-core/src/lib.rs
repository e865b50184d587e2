//! # miio-core
//!
//! Core protocol implementation for miIO devices.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame header layout and encoding/decoding
//! - Token handling and key derivation
//! - Body encryption and checksum calculation
//! - Request/response envelopes
//! - Session state and sequence ids

pub mod checksum;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod message;
pub mod session;
pub mod token;

pub use error::{Error, Result};
pub use frame::{Frame, Header};
pub use message::{DeviceErrorObject, Reply, Request, Response};
pub use session::{SequenceId, Session, SessionState};
pub use token::Token;

/// Default device port
pub const DEFAULT_PORT: u16 = 54321;

/// Maximum frame size (the length field is 16 bits wide)
pub const MAX_FRAME_SIZE: usize = 65535;

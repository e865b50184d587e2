//! # miio
//!
//! Rust implementation of the miIO local device protocol.
//!
//! ## Features
//!
//! - Encrypted request/response over UDP with automatic handshake
//! - Retry with re-handshake and device error classification
//! - Unicast and broadcast discovery
//! - Async/await API using Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use miio::{Device, Scanner};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> miio::Result<()> {
//!     // Find devices on the local network
//!     for device in Scanner::new().discover().await? {
//!         println!("{}", device);
//!     }
//!
//!     // Talk to one of them
//!     let mut device = Device::from_hex_token("192.168.1.50", "00112233445566778899aabbccddeeff")?;
//!     let power = device.send("get_prop", json!(["power"])).await?;
//!     println!("{}", power);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod discovery;
pub mod error;

// Re-exports
pub use config::{DeviceConfig, DiscoveryConfig};
pub use device::{Device, SendOptions};
pub use discovery::{DiscoverySet, Scanner};
pub use error::{Error, Result};

// Re-export types
pub use miio_core::{Frame, Header, Request, Session, Token};
pub use miio_types::{DeviceInfo, DiscoveredDevice, FromReply};

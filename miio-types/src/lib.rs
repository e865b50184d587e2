//! Type definitions for miio

pub mod device_info;
pub mod discovered;
pub mod error;
pub mod reply;

pub use device_info::{AccessPoint, DeviceInfo, NetworkInterface};
pub use discovered::DiscoveredDevice;
pub use error::{Error, Result};
pub use reply::FromReply;

//! Device information structures

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wi-Fi access point the device is associated with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPoint {
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub rssi: Option<i64>,
}

/// Network interface configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    #[serde(rename = "localIp")]
    pub local_ip: Option<String>,
    pub mask: Option<String>,
    #[serde(rename = "gw")]
    pub gateway: Option<String>,
}

/// Device information (`miIO.info` reply)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device model, e.g. `zhimi.fan.v2`
    pub model: Option<String>,

    /// Firmware version
    #[serde(rename = "fw_ver")]
    pub firmware_version: Option<String>,

    /// Hardware version
    #[serde(rename = "hw_ver")]
    pub hardware_version: Option<String>,

    /// MAC address
    #[serde(rename = "mac")]
    pub mac_address: Option<String>,

    /// Token, only reported by unprovisioned devices
    pub token: Option<String>,

    #[serde(rename = "ap")]
    pub access_point: Option<AccessPoint>,

    #[serde(rename = "netif")]
    pub network_interface: Option<NetworkInterface>,

    /// Remaining fields as reported
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceInfo {
    /// Local IP address, if reported
    pub fn local_ip(&self) -> Option<&str> {
        self.network_interface
            .as_ref()
            .and_then(|netif| netif.local_ip.as_deref())
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} ({}) @ {}",
            self.model.as_deref().unwrap_or("unknown"),
            self.firmware_version.as_deref().unwrap_or("?"),
            self.mac_address.as_deref().unwrap_or("?"),
            self.local_ip().unwrap_or("?")
        )
    }
}

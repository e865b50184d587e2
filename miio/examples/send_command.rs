//! Send a raw command to a device
//!
//! ```text
//! DEVICE_IP=192.168.1.50 DEVICE_TOKEN=<32 hex chars> \
//!     cargo run --example send_command -- get_prop '["power"]'
//! ```

use anyhow::Context;
use miio::Device;
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let ip = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.50".to_string());
    let token = std::env::var("DEVICE_TOKEN").context("DEVICE_TOKEN must be set")?;

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "miIO.info".to_string());
    let params: Value = match args.next() {
        Some(raw) => serde_json::from_str(&raw).context("params must be JSON")?,
        None => Value::Array(Vec::new()),
    };

    let mut device = Device::from_hex_token(ip, &token)?;

    let header = device.send_handshake().await?;
    println!("✓ Handshake: device id {:08x}", header.device_id);

    let result = device.raw_command(&command, params).await?;
    println!("✓ {}: {}", command, result);

    Ok(())
}

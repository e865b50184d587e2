//! Broadcast discovery example

use std::time::Duration;

use miio::{DiscoverySet, Scanner};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (RUST_LOG=miio=debug for more detail)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let scanner = Scanner::new().with_timeout(Duration::from_secs(5));
    let mut seen = DiscoverySet::new();

    println!("Discovering devices...");

    scanner
        .broadcast_with(&mut seen, |device| {
            let token = if device.token_revealed() {
                device.token_hex()
            } else {
                "hidden".to_string()
            };
            println!("  {} (ID: {:08x}) token: {}", device.addr.ip(), device.device_id, token);
        })
        .await?;

    println!("Found {} device(s)", seen.len());

    Ok(())
}

use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ble-bridge",
    version = "0.1.0",
    about = "Relays BLE advertisements to WebSocket clients and advertises on their behalf"
)]
pub struct Config {
    /// WebSocket and HTTP listening port
    #[arg(long, env = "BLE_BRIDGE_PORT", default_value = "8765")]
    pub port: u16,

    /// Seconds to wait for the adapter to power on before advertising
    #[arg(long, default_value = "10")]
    pub power_on_timeout_secs: u64,

    /// Keep the latest advertisement per device and serve it on /devices
    #[arg(long)]
    pub retain_sightings: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Minimum allowed port (ports below 1024 are privileged)
const MIN_USER_PORT: u16 = 1024;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("Invalid port: port cannot be 0");
        }
        if self.port < MIN_USER_PORT {
            anyhow::bail!(
                "Invalid port: {} is a privileged port (< {}). Use a port >= {}",
                self.port,
                MIN_USER_PORT,
                MIN_USER_PORT
            );
        }

        if self.power_on_timeout_secs == 0 {
            anyhow::bail!("Power-on timeout cannot be 0");
        }

        Ok(())
    }

    pub fn power_on_timeout(&self) -> Duration {
        Duration::from_secs(self.power_on_timeout_secs)
    }
}

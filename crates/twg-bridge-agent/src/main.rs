//! # TWG Bridge Agent
//!
//! Bridges TW-G I/O controllers on an MQTT broker to an entity table.
//!
//! ## Architecture
//!
//! The agent runs three concurrent sources into one loop:
//! 1. **State**: status documents from `{base_topic}/state`, fanned out to
//!    one observer per point of the owning device
//! 2. **Control**: `set <device_id> <out> <on|off>` lines on stdin, encoded
//!    and published to `{base_topic}/command`
//! 3. **Shutdown**: Ctrl+C

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod control;
mod entities;
mod runtime;

pub use config::AgentConfig;
pub use runtime::Agent;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting TWG bridge agent"
    );

    // Load configuration
    let config = AgentConfig::from_env()?;

    let client_id = config
        .mqtt
        .client_id
        .clone()
        .unwrap_or_else(|| format!("twg-bridge-{}", Uuid::new_v4()));

    tracing::info!(
        %client_id,
        broker = %config.mqtt.broker,
        devices = config.devices.len(),
        "Agent initialized"
    );

    let agent = Agent::new(config, client_id);

    // Run agent
    agent.run().await?;

    Ok(())
}

//! Agent configuration.

use anyhow::{Context, Result};
use std::time::Duration;
use twg_bridge_core::DeviceConfig;

/// Device id used when none is configured.
pub const DEFAULT_DEVICE_ID: &str = "Twg_Test_Mqtt";

/// Base topic used when none is configured.
pub const DEFAULT_BASE_TOPIC: &str = "twg";

/// Output count used when none is configured.
pub const DEFAULT_OUT_COUNT: u32 = 8;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Broker connection configuration
    pub mqtt: MqttSettings,

    /// Controllers bridged by this agent
    pub devices: Vec<DeviceConfig>,
}

/// Broker connection configuration.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    /// MQTT broker URL
    pub broker: String,

    /// Client identifier (generated when absent)
    pub client_id: Option<String>,

    /// Keep-alive interval
    pub keep_alive: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttSettings {
                broker: "tcp://localhost:1883".to_string(),
                client_id: None,
                keep_alive: Duration::from_secs(30),
            },
            devices: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TWG_MQTT_BROKER`: MQTT broker URL
    /// - `TWG_CLIENT_ID`: MQTT client identifier
    /// - `TWG_KEEP_ALIVE_SECS`: keep-alive interval in seconds
    /// - `TWG_DEVICE_ID`, `TWG_BASE_TOPIC`, `TWG_OUT_COUNT`: a single device
    /// - `TWG_DEVICES`: JSON list of devices, replaces the single-device variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an invalid value.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(broker) = var("TWG_MQTT_BROKER") {
            config.mqtt.broker = broker;
        }

        if let Some(client_id) = var("TWG_CLIENT_ID") {
            config.mqtt.client_id = Some(client_id);
        }

        if let Some(secs) = var("TWG_KEEP_ALIVE_SECS") {
            let secs: u64 = secs.parse().context("Invalid TWG_KEEP_ALIVE_SECS")?;
            config.mqtt.keep_alive = Duration::from_secs(secs);
        }

        // A device list wins over the single-device variables
        if let Some(devices_json) = var("TWG_DEVICES") {
            config.devices =
                serde_json::from_str(&devices_json).context("Invalid TWG_DEVICES JSON")?;
        } else {
            let device_id = var("TWG_DEVICE_ID").unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string());
            let base_topic =
                var("TWG_BASE_TOPIC").unwrap_or_else(|| DEFAULT_BASE_TOPIC.to_string());
            let out_count = match var("TWG_OUT_COUNT") {
                Some(count) => count.parse().context("Invalid TWG_OUT_COUNT")?,
                None => DEFAULT_OUT_COUNT,
            };

            config.devices = vec![DeviceConfig::new(device_id, base_topic, out_count)
                .context("Invalid device configuration")?];
        }

        if config.devices.is_empty() {
            anyhow::bail!("No devices configured");
        }

        Ok(config)
    }
}

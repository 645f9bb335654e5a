//! Broker connection settings.

use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use std::time::Duration;
use url::Url;

/// Default MQTT port.
pub const DEFAULT_PORT: u16 = 1883;

/// Configuration for a broker connection.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// MQTT broker URL (e.g., <tcp://localhost:1883>)
    pub broker: String,
    /// Client ID for MQTT connection
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Capacity of the outgoing request queue
    pub capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "tcp://localhost:1883".to_string(),
            client_id: "twg-bridge".to_string(),
            keep_alive: Duration::from_secs(30),
            capacity: 100,
        }
    }
}

/// Create a client and its event loop.
///
/// Nothing touches the network until the event loop is polled.
///
/// # Errors
///
/// Returns error if the broker URL is invalid.
pub fn connect(config: &MqttConfig) -> Result<(AsyncClient, EventLoop), ConnectionError> {
    let (host, port) = parse_mqtt_url(&config.broker)?;

    let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
    mqtt_options.set_keep_alive(config.keep_alive);

    Ok(AsyncClient::new(mqtt_options, config.capacity))
}

/// Parse MQTT URL into host and port.
///
/// Accepts `tcp://host[:port]`, `mqtt://host[:port]` and bare `host[:port]`.
///
/// # Errors
///
/// Returns error for unsupported schemes, a missing host, or a bad port.
pub fn parse_mqtt_url(input: &str) -> Result<(String, u16), ConnectionError> {
    if input.contains("://") {
        let url =
            Url::parse(input).map_err(|e| ConnectionError::InvalidUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(ConnectionError::InvalidUrl(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| ConnectionError::InvalidUrl(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConnectionError::InvalidUrl(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => DEFAULT_PORT,
        Some(port) => port
            .parse()
            .map_err(|_| ConnectionError::InvalidUrl(format!("{input}: invalid port '{port}'")))?,
    };
    if parts.next().is_some() {
        return Err(ConnectionError::InvalidUrl(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

/// Errors that can occur setting up a connection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    /// Invalid MQTT URL
    #[error("invalid MQTT URL: {0}")]
    InvalidUrl(String),
}

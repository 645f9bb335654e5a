//! # MQTT Adapter
//!
//! Bus transport for TW-G controllers on an MQTT broker.
//!
//! ## Topics
//!
//! - `{base_topic}/state`: subscribed, status documents from the controller
//! - `{base_topic}/command`: published, output commands to the controller
//!
//! Commands are queued fire-and-forget at QoS 0; the event loop owned by
//! [`StateSubscriber`] (or the caller) performs the actual delivery.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod publisher;
pub mod subscriber;

pub use connection::{connect, parse_mqtt_url, ConnectionError, MqttConfig};
pub use publisher::MqttPublisher;
pub use subscriber::{StateMessage, StateSubscriber};

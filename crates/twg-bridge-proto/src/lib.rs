//! # TWG Bridge Protocol
//!
//! Wire protocol definitions and MQTT topic scheme for TW-G I/O controllers.
//!
//! ## Messages
//!
//! - `DigCommand`: switch one digital output on or off
//!
//! ## MQTT Topics
//!
//! Topic scheme: `{base_topic}/state` (controller → bridge) and
//! `{base_topic}/command` (bridge → controller)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod messages;
pub mod topics;

pub use messages::{encode_output_command, DigCommand, MessageError};
pub use topics::{DeviceTopics, TopicKind};

//! MQTT topic scheme for a single controller.
//!
//! Topic structure: `{base_topic}/{suffix}`
//!
//! The suffixes are fixed by the controller firmware and are not configurable.

use serde::{Deserialize, Serialize};

/// Suffix of the topic the controller publishes its status document on.
pub const STATE_SUFFIX: &str = "state";

/// Suffix of the topic the controller listens to for commands.
pub const COMMAND_SUFFIX: &str = "command";

/// Topic names for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTopics {
    /// Base topic configured for the device
    pub base: String,
}

impl DeviceTopics {
    /// Create the topic scheme for the given base topic.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Topic carrying status documents.
    #[must_use]
    pub fn state(&self) -> String {
        format!("{}/{STATE_SUFFIX}", self.base)
    }

    /// Topic carrying output commands.
    #[must_use]
    pub fn command(&self) -> String {
        format!("{}/{COMMAND_SUFFIX}", self.base)
    }

    /// Classify a topic belonging to this device.
    ///
    /// Returns `None` for topics outside the device's base topic.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<TopicKind> {
        let suffix = topic.strip_prefix(self.base.as_str())?.strip_prefix('/')?;
        match suffix {
            STATE_SUFFIX => Some(TopicKind::State),
            COMMAND_SUFFIX => Some(TopicKind::Command),
            _ => None,
        }
    }
}

/// Kinds of topic used by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// Status documents from the controller
    State,
    /// Commands to the controller
    Command,
}

//! Protocol messages sent to the controller.

use serde::{Deserialize, Serialize};

/// Request to switch one digital output.
///
/// Serialises to the shape the controller firmware expects:
///
/// ```json
/// {"device_id":"dev1","Type":"DigCommand","Data":{"Channel":"LOC","Out":3,"Status":true}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigCommand {
    /// Target device identifier
    pub device_id: String,
    /// Message discriminator
    #[serde(rename = "Type")]
    pub kind: CommandType,
    /// Command body
    #[serde(rename = "Data")]
    pub data: DigCommandData,
}

/// Message discriminator for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    /// Digital output command
    DigCommand,
}

/// Body of a [`DigCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigCommandData {
    /// Command source channel
    #[serde(rename = "Channel")]
    pub channel: Channel,
    /// Output index (1-based)
    #[serde(rename = "Out")]
    pub out: u32,
    /// Requested state
    #[serde(rename = "Status")]
    pub status: bool,
}

/// Command source channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// Local control
    #[serde(rename = "LOC")]
    Local,
}

impl DigCommand {
    /// Create a new output command.
    #[must_use]
    pub fn new(device_id: impl Into<String>, out: u32, status: bool) -> Self {
        Self {
            device_id: device_id.into(),
            kind: CommandType::DigCommand,
            data: DigCommandData {
                channel: Channel::Local,
                out,
                status,
            },
        }
    }

    /// Serialize to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, MessageError> {
        serde_json::to_vec(self).map_err(|e| MessageError::Serialize(e.to_string()))
    }

    /// Deserialize from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_json(bytes: &[u8]) -> Result<Self, MessageError> {
        serde_json::from_slice(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

/// Encode the payload for switching output `out` of `device_id`.
///
/// # Errors
///
/// Returns error if serialization fails, which does not happen for
/// well-formed input.
pub fn encode_output_command(
    device_id: &str,
    out: u32,
    status: bool,
) -> Result<Vec<u8>, MessageError> {
    DigCommand::new(device_id, out, status).to_json()
}

/// Errors for message serialization/deserialization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),
}

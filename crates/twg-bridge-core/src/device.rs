//! Device configuration and the standard point catalogue of a TW-G board.

use crate::document::FieldPath;
use crate::point::PointId;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use twg_bridge_proto::DeviceTopics;

/// Allowed number of configured digital outputs.
pub const OUT_COUNT_RANGE: RangeInclusive<u32> = 1..=64;

/// Digital inputs exposed by every board.
pub const DIGITAL_INPUT_COUNT: u32 = 8;

/// Analog inputs exposed by every board.
pub const ANALOG_INPUT_COUNT: u32 = 8;

/// Manufacturer reported for every device record.
pub const MANUFACTURER: &str = "Tecnowatt";

/// Model reported for every device record.
pub const MODEL: &str = "TW-G board";

/// General status fields exposed as points: display name and path.
pub const GENERAL_FIELDS: [(&str, &str); 3] = [
    ("Versione FW", "Data.General.VersioneFW"),
    ("MAC Address", "Data.General.MACAddress"),
    ("MQTT Conn Status", "Data.General.MqttConnectionStatus"),
];

/// Validated configuration of one controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDeviceConfig")]
pub struct DeviceConfig {
    device_id: String,
    base_topic: String,
    out_count: u32,
}

#[derive(Deserialize)]
struct RawDeviceConfig {
    device_id: String,
    base_topic: String,
    out_count: u32,
}

impl TryFrom<RawDeviceConfig> for DeviceConfig {
    type Error = ConfigError;

    fn try_from(raw: RawDeviceConfig) -> Result<Self, Self::Error> {
        Self::new(raw.device_id, raw.base_topic, raw.out_count)
    }
}

impl DeviceConfig {
    /// Create a validated device configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the device id or base topic is empty, or the output
    /// count is outside [`OUT_COUNT_RANGE`].
    pub fn new(
        device_id: impl Into<String>,
        base_topic: impl Into<String>,
        out_count: u32,
    ) -> Result<Self, ConfigError> {
        let device_id = device_id.into();
        let base_topic = base_topic.into();

        if device_id.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceId);
        }
        if base_topic.trim().is_empty() {
            return Err(ConfigError::EmptyBaseTopic);
        }
        if !OUT_COUNT_RANGE.contains(&out_count) {
            return Err(ConfigError::OutCountOutOfRange(out_count));
        }

        Ok(Self {
            device_id,
            base_topic,
            out_count,
        })
    }

    /// Device identifier.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Base topic.
    #[must_use]
    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    /// Number of digital outputs.
    #[must_use]
    pub fn out_count(&self) -> u32 {
        self.out_count
    }

    /// Topic names derived from the base topic.
    #[must_use]
    pub fn topics(&self) -> DeviceTopics {
        DeviceTopics::new(self.base_topic.clone())
    }

    /// Device record shared by all points of this device.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifier: self.device_id.clone(),
            name: format!("TWG {}", self.device_id),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
        }
    }

    /// Every point a board with this configuration exposes.
    ///
    /// Order: general fields, analog inputs, digital inputs, digital outputs.
    #[must_use]
    pub fn standard_points(&self) -> Vec<PointSpec> {
        let general = GENERAL_FIELDS.iter().map(|(name, path)| PointSpec {
            id: PointId::GeneralField(FieldPath::parse(path)),
            name: (*name).to_string(),
        });
        let analog = (1..=ANALOG_INPUT_COUNT).map(|i| PointSpec {
            id: PointId::AnalogInput(i),
            name: format!("AI {i}"),
        });
        let digital_in = (1..=DIGITAL_INPUT_COUNT).map(|i| PointSpec {
            id: PointId::DigitalInput(i),
            name: format!("DI {i}"),
        });
        let digital_out = (1..=self.out_count).map(|i| PointSpec {
            id: PointId::DigitalOutput(i),
            name: format!("Out {i}"),
        });

        general
            .chain(analog)
            .chain(digital_in)
            .chain(digital_out)
            .collect()
    }
}

/// Device record metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Identifier grouping all points of the device
    pub identifier: String,
    /// Display name
    pub name: String,
    /// Manufacturer string
    pub manufacturer: String,
    /// Model string
    pub model: String,
}

/// How a host presents a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Read-only on/off
    BinarySensor,
    /// Controllable on/off
    Switch,
    /// Read-only reading
    Sensor,
}

impl From<&PointId> for EntityKind {
    fn from(point: &PointId) -> Self {
        match point {
            PointId::DigitalInput(_) => EntityKind::BinarySensor,
            PointId::DigitalOutput(_) => EntityKind::Switch,
            PointId::AnalogInput(_) | PointId::GeneralField(_) => EntityKind::Sensor,
        }
    }
}

/// A point together with its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointSpec {
    /// Point identifier
    pub id: PointId,
    /// Display name
    pub name: String,
}

impl PointSpec {
    /// Presentation kind of the point.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        EntityKind::from(&self.id)
    }
}

/// Errors for device configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Device id is empty
    #[error("device id must not be empty")]
    EmptyDeviceId,
    /// Base topic is empty
    #[error("base topic must not be empty")]
    EmptyBaseTopic,
    /// Output count outside the supported range
    #[error("output count {0} outside 1..=64")]
    OutCountOutOfRange(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config() {
        let config = DeviceConfig::new("dev1", "plant/twg1", 12).unwrap();

        assert_eq!(config.device_id(), "dev1");
        assert_eq!(config.topics().state(), "plant/twg1/state");
        assert_eq!(config.topics().command(), "plant/twg1/command");
    }

    #[test]
    fn out_count_bounds() {
        assert!(DeviceConfig::new("dev1", "twg", 1).is_ok());
        assert!(DeviceConfig::new("dev1", "twg", 64).is_ok());
        assert_eq!(
            DeviceConfig::new("dev1", "twg", 0),
            Err(ConfigError::OutCountOutOfRange(0))
        );
        assert_eq!(
            DeviceConfig::new("dev1", "twg", 65),
            Err(ConfigError::OutCountOutOfRange(65))
        );
    }

    #[test]
    fn empty_fields_rejected() {
        assert_eq!(
            DeviceConfig::new(" ", "twg", 8),
            Err(ConfigError::EmptyDeviceId)
        );
        assert_eq!(
            DeviceConfig::new("dev1", "", 8),
            Err(ConfigError::EmptyBaseTopic)
        );
    }

    #[test]
    fn deserialize_validates() {
        let ok: DeviceConfig =
            serde_json::from_str(r#"{"device_id":"dev1","base_topic":"twg","out_count":4}"#)
                .unwrap();
        assert_eq!(ok.out_count(), 4);

        let err = serde_json::from_str::<DeviceConfig>(
            r#"{"device_id":"dev1","base_topic":"twg","out_count":99}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn standard_points_catalogue() {
        let config = DeviceConfig::new("dev1", "twg", 4).unwrap();
        let points = config.standard_points();

        assert_eq!(points.len(), 3 + 8 + 8 + 4);
        assert_eq!(points[0].name, "Versione FW");
        assert_eq!(
            points[0].id.unique_id("dev1"),
            "dev1_general_Data_General_VersioneFW"
        );
        assert_eq!(points[3].id, PointId::AnalogInput(1));
        assert_eq!(points[3].kind(), EntityKind::Sensor);
        assert_eq!(points[11].name, "DI 1");
        assert_eq!(points[11].kind(), EntityKind::BinarySensor);
        assert_eq!(points.last().map(|p| p.name.as_str()), Some("Out 4"));
        assert_eq!(points.last().map(PointSpec::kind), Some(EntityKind::Switch));
    }

    #[test]
    fn device_record() {
        let info = DeviceConfig::new("dev1", "twg", 8).unwrap().device_info();

        assert_eq!(info.name, "TWG dev1");
        assert_eq!(info.manufacturer, "Tecnowatt");
        assert_eq!(info.model, "TW-G board");
    }
}

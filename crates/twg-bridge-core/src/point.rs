//! Point identifiers and observed values.

use crate::document::FieldPath;
use serde::{Deserialize, Serialize};

/// Category of a logical point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Digital input (`Data.IO.Digitali`)
    DigitalInput,
    /// Digital output (`Data.IO.Uscite`)
    DigitalOutput,
    /// Analog input (`Data.IO.Analogici`)
    AnalogInput,
    /// Any scalar field addressed by path
    GeneralField,
}

impl Category {
    /// Prefix used in externally visible identifiers.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Category::DigitalInput => "di",
            Category::DigitalOutput => "out",
            Category::AnalogInput => "ai",
            Category::GeneralField => "general",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Identifies one logical value of a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointId {
    /// Digital input by index
    DigitalInput(u32),
    /// Digital output by index
    DigitalOutput(u32),
    /// Analog input by index
    AnalogInput(u32),
    /// General field by path
    GeneralField(FieldPath),
}

impl PointId {
    /// Category of this point.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            PointId::DigitalInput(_) => Category::DigitalInput,
            PointId::DigitalOutput(_) => Category::DigitalOutput,
            PointId::AnalogInput(_) => Category::AnalogInput,
            PointId::GeneralField(_) => Category::GeneralField,
        }
    }

    /// Discriminator as used in unique identifiers.
    ///
    /// Indexes render as decimal numbers, field paths with `_` separators.
    #[must_use]
    pub fn discriminator(&self) -> String {
        match self {
            PointId::DigitalInput(id) | PointId::DigitalOutput(id) | PointId::AnalogInput(id) => {
                id.to_string()
            }
            PointId::GeneralField(path) => path.join("_"),
        }
    }

    /// Externally visible identifier, e.g. `dev1_di_3` or
    /// `dev1_general_Data_General_VersioneFW`.
    #[must_use]
    pub fn unique_id(&self, device_id: &str) -> String {
        format!(
            "{device_id}_{}_{}",
            self.category().prefix(),
            self.discriminator()
        )
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointId::GeneralField(path) => write!(f, "general:{path}"),
            other => write!(f, "{}:{}", other.category(), other.discriminator()),
        }
    }
}

/// Last known value of a point.
///
/// Serialises as a plain JSON scalar, with `Unknown` as `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservedValue {
    /// Nothing known yet, a null field, or an analog reading that failed conversion
    #[default]
    Unknown,
    /// On/off state
    Bool(bool),
    /// Numeric reading
    Number(f64),
    /// Text field
    Text(String),
}

impl ObservedValue {
    /// Check if the value is known.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, ObservedValue::Unknown)
    }

    /// Boolean state, if this is an on/off value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ObservedValue::Bool(on) => Some(*on),
            _ => None,
        }
    }

    /// Numeric reading, if this is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ObservedValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObservedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservedValue::Unknown => f.write_str("unknown"),
            ObservedValue::Bool(true) => f.write_str("on"),
            ObservedValue::Bool(false) => f.write_str("off"),
            ObservedValue::Number(n) => write!(f, "{n}"),
            ObservedValue::Text(s) => f.write_str(s),
        }
    }
}

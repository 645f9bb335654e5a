//! Field extraction from status documents.
//!
//! Every rule returns a `Result` whose error says *why* nothing was
//! extracted. Observers decide per category what a failure means:
//! digital and general points keep their stale value on any failure,
//! analog points surface a conversion failure as an unknown reading.

use crate::document::{FieldPath, StatusDocument};
use crate::point::ObservedValue;
use serde_json::{Map, Value};

/// Key holding an item's index inside an I/O list.
pub const ID_KEY: &str = "id";

/// Key holding an item's reading inside an I/O list.
pub const VALUE_KEY: &str = "val";

/// I/O lists carried in the `Data.IO` section of a status document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoList {
    /// Digital inputs
    Digitali,
    /// Digital outputs
    Uscite,
    /// Analog inputs
    Analogici,
}

impl IoList {
    /// Key path of the list from the document root.
    #[must_use]
    pub fn path(self) -> [&'static str; 3] {
        let leaf = match self {
            IoList::Digitali => "Digitali",
            IoList::Uscite => "Uscite",
            IoList::Analogici => "Analogici",
        };
        ["Data", "IO", leaf]
    }
}

/// Why a value could not be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// Path, list, or list item is absent
    #[error("value not found")]
    NotFound,
    /// Value is present but has the wrong type or shape
    #[error("value could not be converted")]
    Conversion,
}

/// Find the first item of `list` whose `id` coerces to `id`.
///
/// Items that are not objects, or whose `id` does not coerce to an
/// integer, are skipped.
///
/// # Errors
///
/// Returns [`ExtractError::NotFound`] if the list is missing, is not an
/// array, or holds no matching item.
pub fn list_item_by_id(
    doc: &StatusDocument,
    list: IoList,
    id: u32,
) -> Result<&Map<String, Value>, ExtractError> {
    let items = doc
        .lookup_keys(&list.path())
        .and_then(Value::as_array)
        .ok_or(ExtractError::NotFound)?;

    items
        .iter()
        .filter_map(Value::as_object)
        .find(|item| {
            item.get(ID_KEY)
                .and_then(coerce_int)
                .is_some_and(|item_id| item_id == i64::from(id))
        })
        .ok_or(ExtractError::NotFound)
}

/// Resolve `path` to a value.
///
/// # Errors
///
/// Returns [`ExtractError::NotFound`] if any key along the path is missing.
pub fn scalar_by_path<'a>(
    doc: &'a StatusDocument,
    path: &FieldPath,
) -> Result<&'a Value, ExtractError> {
    doc.lookup(path).ok_or(ExtractError::NotFound)
}

/// On/off state of item `id` in a digital list.
///
/// A missing `val` reads as off.
///
/// # Errors
///
/// [`ExtractError::NotFound`] if the item is absent,
/// [`ExtractError::Conversion`] if `val` is not integer-like.
pub fn digital_state(doc: &StatusDocument, list: IoList, id: u32) -> Result<bool, ExtractError> {
    let item = list_item_by_id(doc, list, id)?;
    match item.get(VALUE_KEY) {
        None => Ok(false),
        Some(val) => coerce_int(val)
            .map(|n| n != 0)
            .ok_or(ExtractError::Conversion),
    }
}

/// Reading of analog input `id`.
///
/// # Errors
///
/// [`ExtractError::NotFound`] if the item is absent,
/// [`ExtractError::Conversion`] if `val` is missing or not numeric.
pub fn analog_reading(doc: &StatusDocument, id: u32) -> Result<f64, ExtractError> {
    let item = list_item_by_id(doc, IoList::Analogici, id)?;
    item.get(VALUE_KEY)
        .and_then(coerce_f64)
        .ok_or(ExtractError::Conversion)
}

/// Scalar at `path`. JSON `null` reads as [`ObservedValue::Unknown`].
///
/// # Errors
///
/// [`ExtractError::NotFound`] if the path is absent,
/// [`ExtractError::Conversion`] if it resolves to an object or array.
pub fn general_field(doc: &StatusDocument, path: &FieldPath) -> Result<ObservedValue, ExtractError> {
    match scalar_by_path(doc, path)? {
        Value::Null => Ok(ObservedValue::Unknown),
        Value::Bool(b) => Ok(ObservedValue::Bool(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(ObservedValue::Number)
            .ok_or(ExtractError::Conversion),
        Value::String(s) => Ok(ObservedValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(ExtractError::Conversion),
    }
}

/// Integer coercion accepting integers, finite floats (truncated toward
/// zero), decimal strings with surrounding whitespace, and booleans.
#[must_use]
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_f64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Floating-point coercion accepting numbers, numeric strings with
/// surrounding whitespace, and booleans. Non-finite results are rejected.
#[must_use]
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }?;
    n.is_finite().then_some(n)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn truncate_f64(n: f64) -> Option<i64> {
    let t = n.trunc();
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> StatusDocument {
        StatusDocument::from_value(value)
    }

    #[test]
    fn list_item_found_by_id() {
        let doc = doc(json!({"Data": {"IO": {"Digitali": [
            {"id": 1, "val": 0},
            {"id": 2, "val": 1}
        ]}}}));

        let item = list_item_by_id(&doc, IoList::Digitali, 2).unwrap();
        assert_eq!(item.get("val"), Some(&json!(1)));
    }

    #[test]
    fn list_item_first_match_wins() {
        let doc = doc(json!({"Data": {"IO": {"Uscite": [
            {"id": 4, "val": 1},
            {"id": "4", "val": 0}
        ]}}}));

        assert_eq!(digital_state(&doc, IoList::Uscite, 4), Ok(true));
    }

    #[test]
    fn list_item_id_coercion() {
        let doc = doc(json!({"Data": {"IO": {"Digitali": [
            {"id": "oops", "val": 0},
            {"id": " 7 ", "val": 1},
            {"id": 8.0, "val": 1}
        ]}}}));

        assert_eq!(digital_state(&doc, IoList::Digitali, 7), Ok(true));
        assert_eq!(digital_state(&doc, IoList::Digitali, 8), Ok(true));
    }

    #[test]
    fn list_missing_or_wrong_shape_is_not_found() {
        let missing = doc(json!({"Data": {"IO": {}}}));
        let not_a_list = doc(json!({"Data": {"IO": {"Uscite": {"id": 1, "val": 1}}}}));
        let no_match = doc(json!({"Data": {"IO": {"Uscite": [{"id": 2, "val": 1}]}}}));
        let no_io = doc(json!({"Data": "offline"}));

        for doc in [missing, not_a_list, no_match, no_io] {
            assert_eq!(
                list_item_by_id(&doc, IoList::Uscite, 1),
                Err(ExtractError::NotFound)
            );
        }
    }

    #[test]
    fn digital_coercion() {
        let doc = doc(json!({"Data": {"IO": {"Digitali": [
            {"id": 1, "val": 0},
            {"id": 2, "val": 1},
            {"id": 3, "val": 5},
            {"id": 4, "val": "1"},
            {"id": 5, "val": -2},
            {"id": 6},
            {"id": 7, "val": "on"},
            {"id": 8, "val": null},
            {"id": 9, "val": true}
        ]}}}));

        assert_eq!(digital_state(&doc, IoList::Digitali, 1), Ok(false));
        assert_eq!(digital_state(&doc, IoList::Digitali, 2), Ok(true));
        assert_eq!(digital_state(&doc, IoList::Digitali, 3), Ok(true));
        assert_eq!(digital_state(&doc, IoList::Digitali, 4), Ok(true));
        assert_eq!(digital_state(&doc, IoList::Digitali, 5), Ok(true));
        assert_eq!(digital_state(&doc, IoList::Digitali, 6), Ok(false));
        assert_eq!(
            digital_state(&doc, IoList::Digitali, 7),
            Err(ExtractError::Conversion)
        );
        assert_eq!(
            digital_state(&doc, IoList::Digitali, 8),
            Err(ExtractError::Conversion)
        );
        assert_eq!(digital_state(&doc, IoList::Digitali, 9), Ok(true));
    }

    #[test]
    fn analog_coercion() {
        let doc = doc(json!({"Data": {"IO": {"Analogici": [
            {"id": 1, "val": "12.3"},
            {"id": 2, "val": 4},
            {"id": 3, "val": "n/a"},
            {"id": 4},
            {"id": 5, "val": " -0.5 "}
        ]}}}));

        assert_eq!(analog_reading(&doc, 1), Ok(12.3));
        assert_eq!(analog_reading(&doc, 2), Ok(4.0));
        assert_eq!(analog_reading(&doc, 3), Err(ExtractError::Conversion));
        assert_eq!(analog_reading(&doc, 4), Err(ExtractError::Conversion));
        assert_eq!(analog_reading(&doc, 5), Ok(-0.5));
        assert_eq!(analog_reading(&doc, 6), Err(ExtractError::NotFound));
    }

    #[test]
    fn analog_rejects_non_finite() {
        let doc = doc(json!({"Data": {"IO": {"Analogici": [{"id": 1, "val": "inf"}]}}}));
        assert_eq!(analog_reading(&doc, 1), Err(ExtractError::Conversion));
    }

    #[test]
    fn general_fields() {
        let doc = doc(json!({"Data": {"General": {
            "VersioneFW": "2.1.0",
            "Uptime": 3600,
            "MqttConnectionStatus": null,
            "Network": {"Ip": "10.0.0.2"}
        }}}));

        assert_eq!(
            general_field(&doc, &FieldPath::parse("Data.General.VersioneFW")),
            Ok(ObservedValue::Text("2.1.0".into()))
        );
        assert_eq!(
            general_field(&doc, &FieldPath::parse("Data.General.Uptime")),
            Ok(ObservedValue::Number(3600.0))
        );
        assert_eq!(
            general_field(&doc, &FieldPath::parse("Data.General.MqttConnectionStatus")),
            Ok(ObservedValue::Unknown)
        );
        assert_eq!(
            general_field(&doc, &FieldPath::parse("Data.General.Network")),
            Err(ExtractError::Conversion)
        );
        assert_eq!(
            general_field(&doc, &FieldPath::parse("Data.General.MACAddress")),
            Err(ExtractError::NotFound)
        );
    }

    #[test]
    fn int_coercion_edge_cases() {
        assert_eq!(coerce_int(&json!(3.9)), Some(3));
        assert_eq!(coerce_int(&json!(-3.9)), Some(-3));
        assert_eq!(coerce_int(&json!("3.9")), None);
        assert_eq!(coerce_int(&json!("+2")), Some(2));
        assert_eq!(coerce_int(&json!(false)), Some(0));
        assert_eq!(coerce_int(&json!([1])), None);
    }
}

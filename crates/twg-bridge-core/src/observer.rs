//! Per-point value observers.
//!
//! An observer holds the last known value of one point and refreshes it
//! from every status document it is handed. Every successful extraction is
//! pushed to the observer's [`ChangeListener`], even when the value did not
//! change.

use crate::document::StatusDocument;
use crate::extract::{self, ExtractError, IoList};
use crate::point::{ObservedValue, PointId};
use std::sync::Arc;

/// Receives value pushes for the points of a device.
pub trait ChangeListener: Send + Sync {
    /// Called after an observer stored a new value.
    fn value_changed(&self, unique_id: &str, value: &ObservedValue);
}

impl<F> ChangeListener for F
where
    F: Fn(&str, &ObservedValue) + Send + Sync,
{
    fn value_changed(&self, unique_id: &str, value: &ObservedValue) {
        self(unique_id, value);
    }
}

/// Something that tracks one point across status documents.
pub trait ValueObserver: Send {
    /// Point tracked by this observer.
    fn point(&self) -> &PointId;

    /// Refresh from a freshly parsed document.
    fn on_document(&mut self, doc: &StatusDocument);

    /// Last stored value.
    fn current_value(&self) -> &ObservedValue;
}

/// Standard observer applying the extraction rule of its point's category.
pub struct PointObserver {
    point: PointId,
    unique_id: String,
    value: ObservedValue,
    listener: Arc<dyn ChangeListener>,
}

impl PointObserver {
    /// Create an observer for `point` of device `device_id`.
    #[must_use]
    pub fn new(device_id: &str, point: PointId, listener: Arc<dyn ChangeListener>) -> Self {
        Self {
            unique_id: point.unique_id(device_id),
            point,
            value: ObservedValue::Unknown,
            listener,
        }
    }

    /// Externally visible identifier of the point.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Apply the category rule to `doc`.
    ///
    /// `None` means the stored value must stay as it is.
    fn extract(&self, doc: &StatusDocument) -> Option<ObservedValue> {
        let result = match &self.point {
            PointId::DigitalInput(id) => {
                extract::digital_state(doc, IoList::Digitali, *id).map(ObservedValue::Bool)
            }
            PointId::DigitalOutput(id) => {
                extract::digital_state(doc, IoList::Uscite, *id).map(ObservedValue::Bool)
            }
            PointId::AnalogInput(id) => match extract::analog_reading(doc, *id) {
                Err(ExtractError::Conversion) => Ok(ObservedValue::Unknown),
                other => other.map(ObservedValue::Number),
            },
            PointId::GeneralField(path) => extract::general_field(doc, path),
        };

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::trace!(point = %self.point, error = %err, "Point kept stale value");
                None
            }
        }
    }
}

impl ValueObserver for PointObserver {
    fn point(&self) -> &PointId {
        &self.point
    }

    fn on_document(&mut self, doc: &StatusDocument) {
        let Some(value) = self.extract(doc) else {
            return;
        };

        self.value = value;
        tracing::debug!(unique_id = %self.unique_id, value = %self.value, "Point updated");
        self.listener.value_changed(&self.unique_id, &self.value);
    }

    fn current_value(&self) -> &ObservedValue {
        &self.value
    }
}

impl std::fmt::Debug for PointObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointObserver")
            .field("point", &self.point)
            .field("unique_id", &self.unique_id)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

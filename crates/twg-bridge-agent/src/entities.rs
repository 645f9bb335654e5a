//! In-memory entity table standing in for the host platform.
//!
//! Descriptors are registered once per device at startup; every value push
//! from an observer replaces the whole entry under a write lock, so readers
//! see either the previous or the new state of a point.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use twg_bridge_core::{ChangeListener, DeviceConfig, DeviceInfo, EntityKind, ObservedValue};

/// Static description of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityDescriptor {
    /// Unique identifier, e.g. `dev1_di_3`
    pub unique_id: String,
    /// Display name
    pub name: String,
    /// Presentation kind
    pub kind: EntityKind,
    /// Owning device record
    pub device: DeviceInfo,
}

/// Latest state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    /// Static description
    pub descriptor: EntityDescriptor,
    /// Last pushed value
    pub value: ObservedValue,
    /// Time of the last push
    pub last_updated: Option<DateTime<Utc>>,
    /// Number of pushes received
    pub updates: u64,
}

/// Entity table keyed by unique id.
#[derive(Debug, Default)]
pub struct EntityTable {
    entries: RwLock<BTreeMap<String, EntityState>>,
}

impl EntityTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity for every standard point of `device`.
    pub fn register_device(&self, device: &DeviceConfig) {
        let info = device.device_info();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        for spec in device.standard_points() {
            let descriptor = EntityDescriptor {
                unique_id: spec.id.unique_id(device.device_id()),
                kind: spec.kind(),
                name: spec.name,
                device: info.clone(),
            };
            entries.insert(
                descriptor.unique_id.clone(),
                EntityState {
                    descriptor,
                    value: ObservedValue::Unknown,
                    last_updated: None,
                    updates: 0,
                },
            );
        }

        tracing::info!(
            device_id = %device.device_id(),
            name = %info.name,
            total_entities = entries.len(),
            "Registered device entities"
        );
    }

    /// Current state of one entity.
    #[must_use]
    pub fn get(&self, unique_id: &str) -> Option<EntityState> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(unique_id)
            .cloned()
    }

    /// Copy of every entity, ordered by unique id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EntityState> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ChangeListener for EntityTable {
    fn value_changed(&self, unique_id: &str, value: &ObservedValue) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = entries.get_mut(unique_id) else {
            tracing::warn!(unique_id, "Value pushed for unregistered entity");
            return;
        };

        entry.value = value.clone();
        entry.last_updated = Some(Utc::now());
        entry.updates += 1;
    }
}

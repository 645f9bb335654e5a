//! # TWG Bridge Core
//!
//! Device state synchronization and command translation for TW-G I/O
//! controllers.
//!
//! This crate provides:
//! - A schema-less status document model with path and id lookups
//! - Field extraction rules with explicit not-found / conversion outcomes
//! - Per-point value observers pushing every update to a listener
//! - A per-device registry fanning documents out and routing output commands

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod document;
pub mod extract;
pub mod observer;
pub mod point;
pub mod registry;

pub use device::{
    ConfigError, DeviceConfig, DeviceInfo, EntityKind, PointSpec, OUT_COUNT_RANGE,
};
pub use document::{DocumentError, FieldPath, StatusDocument};
pub use extract::{ExtractError, IoList};
pub use observer::{ChangeListener, PointObserver, ValueObserver};
pub use point::{Category, ObservedValue, PointId};
pub use registry::{CommandError, Dispatch, PublishError, Publisher, Registry};

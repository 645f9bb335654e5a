//! Per-device observer registry.
//!
//! The registry parses every state payload once and fans the document out
//! to its observers. Output commands go the other way: encoded and handed
//! to a [`Publisher`] for the command topic, without touching local state.
//! The output's observed value only moves when the controller reports it.

use crate::device::DeviceConfig;
use crate::document::StatusDocument;
use crate::observer::{ChangeListener, PointObserver, ValueObserver};
use crate::point::{ObservedValue, PointId};
use std::sync::Arc;
use twg_bridge_proto::{encode_output_command, DeviceTopics, MessageError};

/// Outgoing half of the bus transport.
pub trait Publisher: Send + Sync {
    /// Hand `payload` to the transport for `topic` without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns error if the transport refused the message.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// Result of handing one state payload to a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The document was delivered to this many observers
    Delivered(usize),
    /// The payload was not a valid document and was dropped
    Dropped,
}

/// Owns the observers of one device.
pub struct Registry {
    config: DeviceConfig,
    topics: DeviceTopics,
    observers: Vec<Box<dyn ValueObserver>>,
    publisher: Arc<dyn Publisher>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: DeviceConfig, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            topics: config.topics(),
            config,
            observers: Vec::new(),
            publisher,
        }
    }

    /// Create a registry with a [`PointObserver`] for every standard point
    /// of the device, all reporting to `listener`.
    #[must_use]
    pub fn with_standard_points(
        config: DeviceConfig,
        publisher: Arc<dyn Publisher>,
        listener: &Arc<dyn ChangeListener>,
    ) -> Self {
        let mut registry = Self::new(config, publisher);
        for spec in registry.config.standard_points() {
            let observer =
                PointObserver::new(registry.config.device_id(), spec.id, Arc::clone(listener));
            registry.register(Box::new(observer));
        }
        registry
    }

    /// Device configuration.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Topic names of the device.
    #[must_use]
    pub fn topics(&self) -> &DeviceTopics {
        &self.topics
    }

    /// Add an observer. Identifiers are not de-duplicated.
    pub fn register(&mut self, observer: Box<dyn ValueObserver>) {
        self.observers.push(observer);
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Check if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Parse `payload` once and deliver it to every observer in
    /// registration order. Malformed payloads are logged and dropped.
    pub fn dispatch(&mut self, payload: &[u8]) -> Dispatch {
        let doc = match StatusDocument::parse(payload) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(
                    device_id = %self.config.device_id(),
                    error = %err,
                    payload_len = payload.len(),
                    "Dropped status document"
                );
                return Dispatch::Dropped;
            }
        };

        for observer in &mut self.observers {
            observer.on_document(&doc);
        }

        tracing::debug!(
            device_id = %self.config.device_id(),
            observers = self.observers.len(),
            "Dispatched status document"
        );
        Dispatch::Delivered(self.observers.len())
    }

    /// Last value of the first observer tracking `point`.
    #[must_use]
    pub fn current_value(&self, point: &PointId) -> Option<&ObservedValue> {
        self.observers
            .iter()
            .find(|observer| observer.point() == point)
            .map(|observer| observer.current_value())
    }

    /// Snapshot of every observer's point and value, in registration order.
    #[must_use]
    pub fn values(&self) -> Vec<(PointId, ObservedValue)> {
        self.observers
            .iter()
            .map(|observer| (observer.point().clone(), observer.current_value().clone()))
            .collect()
    }

    /// Ask the controller to switch output `out`.
    ///
    /// Fire-and-forget: the command is handed to the publisher and local
    /// state is left alone.
    ///
    /// # Errors
    ///
    /// Returns error if `out` is not one of the device's outputs, encoding
    /// fails, or the publisher refuses the message.
    pub fn request_output_change(&self, out: u32, on: bool) -> Result<(), CommandError> {
        let out_count = self.config.out_count();
        if !(1..=out_count).contains(&out) {
            return Err(CommandError::UnknownOutput { out, out_count });
        }

        let payload = encode_output_command(self.config.device_id(), out, on)?;
        let topic = self.topics.command();

        tracing::debug!(
            device_id = %self.config.device_id(),
            topic = %topic,
            out,
            on,
            "Publishing output command"
        );

        self.publisher.publish(&topic, payload)?;
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

/// Errors reported by a [`Publisher`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    /// The transport refused or failed to queue the message
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors for output commands.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    /// Output index outside `1..=out_count`
    #[error("output {out} not in 1..={out_count}")]
    UnknownOutput {
        /// Requested output
        out: u32,
        /// Outputs configured for the device
        out_count: u32,
    },
    /// Command could not be encoded
    #[error("encode error: {0}")]
    Encode(#[from] MessageError),
    /// Command could not be published
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockPublisher {
        sent: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    impl Publisher for MockPublisher {
        fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
            if self.fail {
                return Err(PublishError::Transport("broker unreachable".into()));
            }
            self.sent.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }
    }

    struct CountingObserver {
        point: PointId,
        calls: Arc<AtomicUsize>,
        value: ObservedValue,
    }

    impl ValueObserver for CountingObserver {
        fn point(&self) -> &PointId {
            &self.point
        }

        fn on_document(&mut self, _doc: &StatusDocument) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        fn current_value(&self) -> &ObservedValue {
            &self.value
        }
    }

    struct OrderObserver {
        point: PointId,
        seen: Arc<Mutex<Vec<PointId>>>,
        value: ObservedValue,
    }

    impl ValueObserver for OrderObserver {
        fn point(&self) -> &PointId {
            &self.point
        }

        fn on_document(&mut self, _doc: &StatusDocument) {
            self.seen.lock().unwrap().push(self.point.clone());
        }

        fn current_value(&self) -> &ObservedValue {
            &self.value
        }
    }

    fn config() -> DeviceConfig {
        DeviceConfig::new("dev1", "plant/twg1", 4).unwrap()
    }

    fn standard_registry() -> (Registry, Arc<MockPublisher>, Arc<AtomicUsize>) {
        let publisher = Arc::new(MockPublisher::default());
        let pushes = Arc::new(AtomicUsize::new(0));
        let counter = pushes.clone();
        let listener: Arc<dyn ChangeListener> =
            Arc::new(move |_: &str, _: &ObservedValue| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let registry = Registry::with_standard_points(config(), publisher.clone(), &listener);
        (registry, publisher, pushes)
    }

    #[test]
    fn dispatch_reaches_every_observer() {
        let mut registry = Registry::new(config(), Arc::new(MockPublisher::default()));
        let calls = Arc::new(AtomicUsize::new(0));
        for i in 1..=3 {
            registry.register(Box::new(CountingObserver {
                point: PointId::DigitalInput(i),
                calls: calls.clone(),
                value: ObservedValue::Unknown,
            }));
        }

        let outcome = registry.dispatch(br#"{"Data": {}}"#);

        assert_eq!(outcome, Dispatch::Delivered(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn dispatch_follows_registration_order() {
        let mut registry = Registry::new(config(), Arc::new(MockPublisher::default()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let points = [
            PointId::DigitalOutput(2),
            PointId::AnalogInput(7),
            PointId::DigitalInput(1),
            PointId::DigitalOutput(2),
        ];
        for point in &points {
            registry.register(Box::new(OrderObserver {
                point: point.clone(),
                seen: seen.clone(),
                value: ObservedValue::Unknown,
            }));
        }

        registry.dispatch(br#"{"Data": {}}"#);
        registry.dispatch(br#"{"Data": {}}"#);

        let expected: Vec<PointId> = points.iter().chain(points.iter()).cloned().collect();
        assert_eq!(*seen.lock().unwrap(), expected);
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let mut registry = Registry::new(config(), Arc::new(MockPublisher::default()));
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register(Box::new(CountingObserver {
            point: PointId::DigitalInput(1),
            calls: calls.clone(),
            value: ObservedValue::Unknown,
        }));

        assert_eq!(registry.dispatch(b"not json"), Dispatch::Dropped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_payload_keeps_values() {
        let (mut registry, _, _) = standard_registry();
        registry.dispatch(br#"{"Data": {"IO": {"Digitali": [{"id": 2, "val": 1}]}}}"#);
        let before = registry.values();

        registry.dispatch(b"{\"Data\": {\"IO\": ");

        assert_eq!(registry.values(), before);
        assert_eq!(
            registry.current_value(&PointId::DigitalInput(2)),
            Some(&ObservedValue::Bool(true))
        );
    }

    #[test]
    fn standard_registry_size() {
        let (registry, _, _) = standard_registry();
        assert_eq!(registry.len(), 3 + 8 + 8 + 4);
    }

    #[test]
    fn output_round_trip() {
        let (mut registry, _, _) = standard_registry();
        let out1 = PointId::DigitalOutput(1);

        registry.dispatch(br#"{"Data":{"IO":{"Uscite":[{"id":1,"val":0}]}}}"#);
        assert_eq!(registry.current_value(&out1), Some(&ObservedValue::Bool(false)));

        registry.dispatch(br#"{"Data":{"IO":{"Uscite":[{"id":1,"val":1}]}}}"#);
        assert_eq!(registry.current_value(&out1), Some(&ObservedValue::Bool(true)));

        registry.dispatch(br#"{"Data":{"IO":{}}}"#);
        assert_eq!(registry.current_value(&out1), Some(&ObservedValue::Bool(true)));
    }

    #[test]
    fn repeated_document_is_idempotent_but_pushes_twice() {
        let (mut registry, _, pushes) = standard_registry();
        let payload = br#"{"Data":{"General":{"VersioneFW":"3.0"},"IO":{"Digitali":[{"id":1,"val":1}],"Analogici":[{"id":1,"val":"2.5"}]}}}"#;

        registry.dispatch(payload);
        let first = registry.values();
        let first_pushes = pushes.load(Ordering::SeqCst);

        registry.dispatch(payload);

        assert_eq!(registry.values(), first);
        assert_eq!(first_pushes, 3);
        assert_eq!(pushes.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn analog_garbage_overwrites_previous_reading() {
        let (mut registry, _, _) = standard_registry();
        let ai2 = PointId::AnalogInput(2);

        registry.dispatch(br#"{"Data":{"IO":{"Analogici":[{"id":2,"val":"4.75"}]}}}"#);
        assert_eq!(registry.current_value(&ai2), Some(&ObservedValue::Number(4.75)));

        registry.dispatch(br#"{"Data":{"IO":{"Analogici":[{"id":2,"val":"n/a"}]}}}"#);
        assert_eq!(registry.current_value(&ai2), Some(&ObservedValue::Unknown));
    }

    #[test]
    fn output_command_published_on_command_topic() {
        let (registry, publisher, _) = standard_registry();

        registry.request_output_change(3, true).unwrap();

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "plant/twg1/command");
        let payload: Value = serde_json::from_slice(&sent[0].1).unwrap();
        assert_eq!(
            payload,
            json!({"device_id":"dev1","Type":"DigCommand","Data":{"Channel":"LOC","Out":3,"Status":true}})
        );
    }

    #[test]
    fn output_command_does_not_touch_state() {
        let (registry, _, pushes) = standard_registry();

        registry.request_output_change(2, true).unwrap();

        assert_eq!(
            registry.current_value(&PointId::DigitalOutput(2)),
            Some(&ObservedValue::Unknown)
        );
        assert_eq!(pushes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn publish_failure_is_surfaced() {
        let publisher = Arc::new(MockPublisher {
            fail: true,
            ..MockPublisher::default()
        });
        let registry = Registry::new(config(), publisher);

        let result = registry.request_output_change(1, false);

        assert!(matches!(result, Err(CommandError::Publish(_))));
    }

    #[test]
    fn output_outside_configured_range_rejected() {
        let (registry, publisher, _) = standard_registry();

        for out in [0, 5, 200] {
            assert!(matches!(
                registry.request_output_change(out, true),
                Err(CommandError::UnknownOutput { out_count: 4, .. })
            ));
        }
        registry.request_output_change(4, false).unwrap();

        assert_eq!(publisher.sent.lock().unwrap().len(), 1);
    }
}

//! Agent runtime orchestration.

use crate::config::AgentConfig;
use crate::control::{self, OutputRequest};
use crate::entities::EntityTable;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use twg_bridge_adapter_mqtt::{connect, MqttConfig, MqttPublisher, StateMessage, StateSubscriber};
use twg_bridge_core::{
    ChangeListener, DeviceConfig, Dispatch, ObservedValue, PointId, Publisher, Registry,
};

/// Registries of every bridged device, routed by state topic.
#[derive(Debug)]
pub struct Bridge {
    registries: HashMap<String, Registry>,
    entities: Arc<EntityTable>,
}

impl Bridge {
    /// Build one registry per device, all pushing into `entities`.
    ///
    /// # Errors
    ///
    /// Returns error if two devices share a device id or a state topic.
    pub fn new(
        devices: &[DeviceConfig],
        publisher: &Arc<dyn Publisher>,
        entities: Arc<EntityTable>,
    ) -> Result<Self> {
        let listener: Arc<dyn ChangeListener> = entities.clone();
        let mut registries: HashMap<String, Registry> = HashMap::new();

        for device in devices {
            if registries
                .values()
                .any(|registry| registry.config().device_id() == device.device_id())
            {
                anyhow::bail!("device id {} is configured twice", device.device_id());
            }

            let state_topic = device.topics().state();
            if registries.contains_key(&state_topic) {
                anyhow::bail!(
                    "device {} shares state topic {state_topic} with another device",
                    device.device_id()
                );
            }

            entities.register_device(device);
            let registry =
                Registry::with_standard_points(device.clone(), Arc::clone(publisher), &listener);
            tracing::info!(
                device_id = %device.device_id(),
                state_topic = %state_topic,
                command_topic = %registry.topics().command(),
                points = registry.len(),
                "Device registered"
            );
            registries.insert(state_topic, registry);
        }

        Ok(Self {
            registries,
            entities,
        })
    }

    /// State topics to subscribe to.
    #[must_use]
    pub fn state_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.registries.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Entity table fed by the registries.
    #[must_use]
    pub fn entities(&self) -> &Arc<EntityTable> {
        &self.entities
    }

    /// Route a received message to the registry owning its topic.
    ///
    /// Returns `None` for topics no device listens on.
    pub fn handle_state(&mut self, message: &StateMessage) -> Option<Dispatch> {
        let Some(registry) = self.registries.get_mut(&message.topic) else {
            tracing::debug!(topic = %message.topic, "Message on unknown topic");
            return None;
        };
        Some(registry.dispatch(&message.payload))
    }

    /// Forward an output request to the device's registry.
    ///
    /// # Errors
    ///
    /// Returns error if the device is unknown or the command cannot be sent.
    pub fn handle_request(&self, request: &OutputRequest) -> Result<()> {
        let registry = self
            .registries
            .values()
            .find(|registry| registry.config().device_id() == request.device_id)
            .with_context(|| format!("unknown device {}", request.device_id))?;

        let unique_id = PointId::DigitalOutput(request.out).unique_id(&request.device_id);
        let reported = self
            .entities
            .get(&unique_id)
            .map_or(ObservedValue::Unknown, |entry| entry.value);
        tracing::info!(
            unique_id = %unique_id,
            reported = %reported,
            requested = request.on,
            "Output change requested"
        );

        registry
            .request_output_change(request.out, request.on)
            .with_context(|| {
                format!(
                    "failed to switch output {} of {}",
                    request.out, request.device_id
                )
            })
    }
}

/// The main agent runtime.
pub struct Agent {
    config: AgentConfig,
    client_id: String,
}

impl Agent {
    /// Create a new agent.
    #[must_use]
    pub fn new(config: AgentConfig, client_id: String) -> Self {
        Self { config, client_id }
    }

    /// Run the agent's main loop until interrupted.
    ///
    /// # Errors
    ///
    /// Returns error if the broker or devices are misconfigured.
    pub async fn run(self) -> Result<()> {
        tracing::info!(client_id = %self.client_id, "Starting agent runtime");

        let mqtt_config = MqttConfig {
            broker: self.config.mqtt.broker.clone(),
            client_id: self.client_id.clone(),
            keep_alive: self.config.mqtt.keep_alive,
            ..MqttConfig::default()
        };
        let (client, eventloop) =
            connect(&mqtt_config).context("Failed to create MQTT client")?;

        let publisher: Arc<dyn Publisher> = Arc::new(MqttPublisher::new(client.clone()));
        let mut bridge = Bridge::new(
            &self.config.devices,
            &publisher,
            Arc::new(EntityTable::new()),
        )?;

        let mut messages =
            StateSubscriber::new(client, eventloop, bridge.state_topics()).start();
        let mut requests = control::spawn_stdin_reader();
        let mut control_open = true;

        tracing::info!("Agent running, press Ctrl+C to stop");

        loop {
            tokio::select! {
                message = messages.recv() => {
                    let Some(message) = message else {
                        tracing::warn!("Subscriber stopped");
                        break;
                    };
                    bridge.handle_state(&message);
                }

                request = requests.recv(), if control_open => {
                    match request {
                        Some(request) => {
                            if let Err(err) = bridge.handle_request(&request) {
                                tracing::error!(error = %format!("{err:#}"), "Output command failed");
                            }
                        }
                        None => control_open = false,
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        log_summary(bridge.entities());
        tracing::info!("Agent stopped");
        Ok(())
    }
}

fn log_summary(entities: &EntityTable) {
    let snapshot = entities.snapshot();
    let known = snapshot.iter().filter(|entry| entry.value.is_known()).count();
    tracing::info!(entities = entities.len(), known, "Final entity state");

    match serde_json::to_string(&snapshot) {
        Ok(json) => tracing::debug!(snapshot = %json, "Entity snapshot"),
        Err(err) => tracing::warn!(error = %err, "Failed to serialize entity snapshot"),
    }
}

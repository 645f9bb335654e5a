//! Fire-and-forget command publishing over MQTT.

use rumqttc::{AsyncClient, QoS};
use twg_bridge_core::{PublishError, Publisher};

/// [`Publisher`] backed by an MQTT client.
///
/// Messages are queued on the client without waiting for the broker; the
/// owning event loop delivers them.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
}

impl MqttPublisher {
    /// Publish at QoS 0 without retain.
    #[must_use]
    pub fn new(client: AsyncClient) -> Self {
        Self {
            client,
            qos: QoS::AtMostOnce,
            retain: false,
        }
    }

    /// Override the quality of service.
    #[must_use]
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }
}

impl Publisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let payload_len = payload.len();
        self.client
            .try_publish(topic, self.qos, self.retain, payload)
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        tracing::debug!(topic, payload_len, "Queued MQTT publish");
        Ok(())
    }
}

impl std::fmt::Debug for MqttPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttPublisher")
            .field("qos", &self.qos)
            .field("retain", &self.retain)
            .finish_non_exhaustive()
    }
}

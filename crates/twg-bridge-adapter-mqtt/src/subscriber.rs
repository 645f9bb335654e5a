//! State topic subscription.

use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;

/// Delay before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// One message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMessage {
    /// Topic the message arrived on
    pub topic: String,
    /// Raw payload
    pub payload: Vec<u8>,
}

/// Drives an MQTT event loop and forwards messages from the state topics.
///
/// Topics are (re)subscribed on every connection acknowledgement, so a
/// broker restart does not lose the subscriptions.
pub struct StateSubscriber {
    client: AsyncClient,
    eventloop: EventLoop,
    topics: Vec<String>,
}

impl StateSubscriber {
    /// Create a subscriber for `topics`.
    #[must_use]
    pub fn new(client: AsyncClient, eventloop: EventLoop, topics: Vec<String>) -> Self {
        Self {
            client,
            eventloop,
            topics,
        }
    }

    /// Topics this subscriber listens to.
    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Start receiving messages.
    ///
    /// Returns a channel receiver for incoming messages, in delivery order.
    /// The background task stops once the receiver is dropped.
    #[must_use]
    pub fn start(mut self) -> mpsc::Receiver<StateMessage> {
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        tracing::debug!(
                            topic = %publish.topic,
                            payload_len = publish.payload.len(),
                            "Received MQTT message"
                        );

                        let message = StateMessage {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        };
                        if tx.send(message).await.is_err() {
                            tracing::warn!("State receiver dropped, stopping subscriber");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("Connected to MQTT broker");
                        self.subscribe_all();
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        tracing::info!("Subscription acknowledged");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "MQTT error");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        rx
    }

    fn subscribe_all(&self) {
        for topic in &self.topics {
            tracing::info!(topic = %topic, "Subscribing to state topic");
            if let Err(e) = self.client.try_subscribe(topic, QoS::AtMostOnce) {
                tracing::error!(topic = %topic, error = %e, "Failed to subscribe");
            }
        }
    }
}

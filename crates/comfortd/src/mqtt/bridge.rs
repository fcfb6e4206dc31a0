use std::error::Error;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::client::MqttClient;
use super::client::MqttMessage;
use super::discovery::discovery_events;
use super::discovery::DiscoveryEvent;
use super::state::StatePayload;
use super::topic::Topics;
use super::topic::STATUS_TOPIC;
use crate::climate::Command;
use crate::climate::Device;

/// Home Assistant side of the daemon.
///
/// Wraps the MQTT client and remembers every command subscription and the
/// last set of discovery messages, so both can be restored after the broker
/// connection is lost.
pub struct Bridge<C: MqttClient> {
    client: C,
    topics: Topics,
    subscriptions: Vec<String>,
    discovery: Vec<DiscoveryEvent>,
}

impl<C: MqttClient> Bridge<C> {
    pub fn new(client: C, topics: Topics) -> Self {
        Self {
            client,
            topics,
            subscriptions: Vec::new(),
            discovery: Vec::new(),
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    #[cfg(test)]
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Connect and follow Home Assistant's status topic
    pub async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>> {
        self.client.connect().await?;
        info!("Subscribing to {}", STATUS_TOPIC);
        self.client.subscribe(STATUS_TOPIC).await
    }

    pub async fn disconnect(&mut self) -> Result<(), Box<dyn Error + Send>> {
        info!("Disconnecting from MQTT");
        self.client.disconnect().await
    }

    pub async fn poll_message(&mut self) -> Option<MqttMessage> {
        self.client.poll_message().await
    }

    /// Subscribe to every command topic of `device`
    pub async fn introduce(&mut self, device: &Device) {
        for command in Command::CONTROLS {
            let topic = self
                .topics
                .command(device.component(), device.name(), command);
            if self.subscriptions.contains(&topic) {
                continue;
            }

            info!("Subscribing to {}", topic);
            if let Err(e) = self.client.subscribe(&topic).await {
                warn!("Failed to subscribe to {}: {}", topic, e);
            }
            self.subscriptions.push(topic);
        }
    }

    /// Publish discovery messages for `devices` and remember them for
    /// [`Bridge::resend_discovery`]
    pub async fn announce<'a>(&mut self, devices: impl IntoIterator<Item = &'a Device>) {
        let mut events = Vec::new();
        for device in devices {
            match discovery_events(&self.topics, device) {
                Ok(e) => events.extend(e),
                Err(e) => warn!("[{}] Failed to build discovery payload: {}", device.name(), e),
            }
        }
        self.discovery = events;
        self.resend_discovery().await;
    }

    /// Publish the remembered discovery messages again
    pub async fn resend_discovery(&mut self) {
        for event in self.discovery.clone() {
            info!("Publishing entity configuration to {}", event.topic);
            if !self.publish(&event.topic, &event.payload).await {
                // Recovery already resent everything
                return;
            }
        }
    }

    /// Report the confirmed state of `device`
    pub async fn publish_state(&mut self, device: &Device) {
        let payload = match serde_json::to_string(&StatePayload::from(device.current())) {
            Ok(p) => p,
            Err(e) => {
                warn!("[{}] Failed to encode state: {}", device.name(), e);
                return;
            }
        };

        info!("[{}] Reporting state", device.name());
        let topic = self.topics.state(device.component(), device.name());
        self.publish(&topic, &payload).await;
    }

    /// Reconnect from scratch, restore subscriptions and resend discovery
    pub async fn recover(&mut self) -> Result<(), Box<dyn Error + Send>> {
        info!("Starting MQTT recovery");
        if let Err(e) = self.client.disconnect().await {
            debug!("MQTT disconnect during recovery failed: {}", e);
        }

        self.connect().await?;
        for topic in &self.subscriptions {
            self.client.subscribe(topic).await?;
        }
        for event in &self.discovery {
            self.client
                .publish(&event.topic, event.payload.as_bytes(), false)
                .await?;
        }

        info!("MQTT recovery done");
        Ok(())
    }

    /// Publish once; a failure triggers recovery and the message is dropped.
    ///
    /// Returns `false` if the publish failed.
    async fn publish(&mut self, topic: &str, payload: &str) -> bool {
        debug!("Publishing to {}: {}", topic, payload);
        let Err(e) = self.client.publish(topic, payload.as_bytes(), false).await else {
            return true;
        };

        warn!("MQTT publish to {} failed: {}", topic, e);
        if let Err(e) = self.recover().await {
            warn!("MQTT recovery failed: {}", e);
        }
        false
    }
}

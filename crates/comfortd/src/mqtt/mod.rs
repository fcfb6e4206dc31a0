//! MQTT side of the daemon: broker client, topic layout, Home Assistant
//! discovery and state payloads.

mod bridge;
mod client;
mod discovery;
mod state;
mod topic;

pub use bridge::Bridge;
#[cfg(test)]
pub use client::MockMqttClient;
pub use client::MqttClient;
pub use client::MqttMessage;
pub use client::RumqttcClient;
pub use discovery::discovery_events;
pub use discovery::DeviceInfo;
pub use discovery::DiscoveryEvent;
pub use state::StatePayload;
pub use topic::CommandTopic;
pub use topic::Topics;
pub use topic::STATUS_TOPIC;

use std::error::Error;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::AsyncClient;
use rumqttc::Event;
use rumqttc::MqttOptions;
use rumqttc::Packet;
use rumqttc::QoS;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::MqttConfig;

/// MQTT message received from a subscription
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl MqttMessage {
    /// Payload as text; invalid UTF-8 is replaced
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

fn not_connected() -> Box<dyn Error + Send> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        "MQTT client not connected. Call connect() first.",
    ))
}

/// Trait for MQTT client operations
///
/// This trait allows for mocking the MQTT client for testing purposes
#[async_trait]
pub trait MqttClient: Send + Sync {
    /// Connect to the MQTT broker
    async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>>;

    /// Drop the connection; a later `connect()` starts from scratch
    async fn disconnect(&mut self) -> Result<(), Box<dyn Error + Send>>;

    /// Whether the connection is believed to be usable
    fn is_connected(&self) -> bool;

    /// Subscribe to an MQTT topic
    async fn subscribe(&mut self, topic: &str) -> Result<(), Box<dyn Error + Send>>;

    /// Publish a message to an MQTT topic
    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Box<dyn Error + Send>>;

    /// Wait for the next message from subscribed topics
    ///
    /// Returns None once the connection has gone away
    async fn poll_message(&mut self) -> Option<MqttMessage>;
}

/// Mock MQTT client for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockMqttClient {
    pub messages: Vec<MqttMessage>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Vec<u8>, bool)>,
    pub is_connected: bool,
    pub connects: usize,
    pub disconnects: usize,
    /// Number of upcoming publishes that fail
    pub fail_publishes: usize,
}

#[cfg(test)]
#[async_trait]
impl MqttClient for MockMqttClient {
    async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>> {
        self.connects += 1;
        self.is_connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Box<dyn Error + Send>> {
        self.disconnects += 1;
        self.is_connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.is_connected
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), Box<dyn Error + Send>> {
        if !self.is_connected {
            return Err(not_connected());
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Box<dyn Error + Send>> {
        if self.fail_publishes > 0 {
            self.fail_publishes -= 1;
            self.is_connected = false;
            return Err(not_connected());
        }
        self.published
            .push((topic.to_string(), payload.to_vec(), retain));
        Ok(())
    }

    async fn poll_message(&mut self) -> Option<MqttMessage> {
        if !self.is_connected {
            return None;
        }
        match self.messages.pop() {
            Some(msg) => Some(msg),
            // A live connection without traffic just waits
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
impl MockMqttClient {
    /// Create a new mock MQTT client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the mock client's queue; the last one added is
    /// delivered first
    pub fn add_message(&mut self, topic: &str, payload: &str) {
        self.messages.push(MqttMessage {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
            retain: false,
        });
    }

    /// Payloads published to `topic`, oldest first
    pub fn published_to(&self, topic: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, payload, _)| String::from_utf8_lossy(payload).into_owned())
            .collect()
    }
}

/// Real MQTT client implementation using rumqttc
pub struct RumqttcClient {
    /// MQTT connection options (stored for lazy initialization)
    mqtt_options: MqttOptions,

    /// AsyncClient (created in connect())
    client: Option<AsyncClient>,

    /// Message receiver (created in connect())
    message_rx: Option<mpsc::UnboundedReceiver<MqttMessage>>,

    /// Background event loop task handle
    event_loop_task: Option<JoinHandle<()>>,

    /// Set by the event loop task when the broker connection fails
    connection_lost: Arc<AtomicBool>,
}

impl RumqttcClient {
    /// Create a new RumqttcClient from configuration
    pub fn new(config: &MqttConfig) -> Self {
        let mut mqtt_options =
            MqttOptions::new(config.client_id.clone(), config.broker.clone(), config.port);

        mqtt_options.set_keep_alive(Duration::from_secs(30));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            mqtt_options.set_credentials(username, password);
        }

        Self {
            mqtt_options,
            client: None,
            message_rx: None,
            event_loop_task: None,
            connection_lost: Arc::new(AtomicBool::new(false)),
        }
    }

    fn client(&self) -> Result<&AsyncClient, Box<dyn Error + Send>> {
        self.client.as_ref().ok_or_else(not_connected)
    }
}

#[async_trait]
impl MqttClient for RumqttcClient {
    async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>> {
        let (client, mut event_loop) = AsyncClient::new(self.mqtt_options.clone(), 10);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        let connection_lost = Arc::new(AtomicBool::new(false));
        let lost = connection_lost.clone();
        let broker = format!(
            "{}:{}",
            self.mqtt_options.broker_address().0,
            self.mqtt_options.broker_address().1
        );

        // The task ends on the first connection error; the owner reconnects
        // and restores subscriptions.
        let task = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let msg = MqttMessage {
                            topic: publish.topic.to_string(),
                            payload: publish.payload.to_vec(),
                            retain: publish.retain,
                        };

                        // Send to channel; if receiver dropped, exit
                        if message_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected to MQTT broker at {}", broker);
                    }
                    Ok(_) => {
                        // Ignore other events (suback, puback, etc.)
                    }
                    Err(e) => {
                        warn!("MQTT event loop error: {}", e);
                        lost.store(true, Ordering::SeqCst);
                        break;
                    }
                }
            }
            debug!("MQTT event loop task exiting");
        });

        self.client = Some(client);
        self.message_rx = Some(message_rx);
        self.event_loop_task = Some(task);
        self.connection_lost = connection_lost;

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Box<dyn Error + Send>> {
        let result = match self.client.take() {
            Some(client) => client
                .disconnect()
                .await
                .map_err(|e| Box::new(e) as Box<dyn Error + Send>),
            None => Ok(()),
        };

        if let Some(task) = self.event_loop_task.take() {
            task.abort();
        }
        self.message_rx = None;

        result
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && !self.connection_lost.load(Ordering::SeqCst)
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), Box<dyn Error + Send>> {
        self.client()?
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| Box::new(e) as Box<dyn Error + Send>)?;

        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Box<dyn Error + Send>> {
        self.client()?
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
            .map_err(|e| Box::new(e) as Box<dyn Error + Send>)?;

        Ok(())
    }

    async fn poll_message(&mut self) -> Option<MqttMessage> {
        match &mut self.message_rx {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }
}

impl Drop for RumqttcClient {
    fn drop(&mut self) {
        if let Some(task) = self.event_loop_task.take() {
            task.abort();
        }
    }
}

//! The reconciliation loop.
//!
//! A single task owns every [`Device`], the cloud session and the MQTT bridge.
//! Inbound commands and the periodic poll are serialised through one
//! `tokio::select!`, so devices are never touched concurrently.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::anyhow;
use comfortd_cloud::CloudError;
use comfortd_cloud::CloudSession;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::climate::Device;
use crate::mqtt::Bridge;
use crate::mqtt::MqttClient;
use crate::mqtt::MqttMessage;
use crate::mqtt::STATUS_TOPIC;

const TICK: Duration = Duration::from_secs(1);

/// Refresh interval for the first poll after login, so values are settled
/// before the next poll.
pub const INITIAL_REFRESH: Duration = Duration::from_secs(30);

pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Pause after an isolated cloud failure; the session is kept.
pub const SHORT_BACKOFF: Duration = Duration::from_secs(60);

/// Pause after repeated cloud failures; the session is recreated.
pub const LONG_BACKOFF: Duration = Duration::from_secs(10 * 60);

/// Consecutive failures that trigger [`LONG_BACKOFF`]
const ERROR_STREAK_LIMIT: u32 = 2;

/// Minimum delay between two bus reconnect attempts
const BUS_RETRY: Duration = Duration::from_secs(5);

/// Creates a fresh, logged-out cloud session
pub type SessionFactory<S> = Box<dyn Fn() -> S + Send + Sync>;

pub struct Service<S: CloudSession, C: MqttClient> {
    session: S,
    new_session: SessionFactory<S>,
    bus: Bridge<C>,
    /// Keyed by display id
    devices: BTreeMap<String, Device>,
    update_interval: Duration,
    error_streak: u32,
    next_discovery: Instant,
    bus_open: bool,
    next_bus_retry: Instant,
}

impl<S: CloudSession, C: MqttClient> Service<S, C> {
    pub fn new(new_session: SessionFactory<S>, bus: Bridge<C>, update_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            session: new_session(),
            new_session,
            bus,
            devices: BTreeMap::new(),
            update_interval,
            error_streak: 0,
            next_discovery: now,
            bus_open: false,
            next_bus_retry: now,
        }
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn bus(&self) -> &Bridge<C> {
        &self.bus
    }

    /// Run until `shutdown` fires.
    ///
    /// The bus is disconnected and the session logged out on the way out,
    /// whether or not the loop failed.
    pub async fn run(&mut self, mut shutdown: oneshot::Receiver<()>) -> anyhow::Result<()> {
        let result = self.run_loop(&mut shutdown).await;
        self.shutdown().await;
        result
    }

    async fn run_loop(&mut self, shutdown: &mut oneshot::Receiver<()>) -> anyhow::Result<()> {
        self.bus
            .connect()
            .await
            .map_err(|e| anyhow!("Failed to connect to MQTT broker: {}", e))?;
        self.bus_open = true;

        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut *shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                msg = self.bus.poll_message(), if self.bus_open => match msg {
                    Some(msg) => self.handle_message(&msg).await,
                    None => {
                        warn!("MQTT message stream closed");
                        self.bus_open = false;
                    }
                },

                _ = ticker.tick() => {
                    if let Some(pause) = self.tick().await {
                        info!("Pausing for {}s", pause.as_secs());
                        if sleep_or_shutdown(pause, shutdown).await {
                            info!("Shutdown requested");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// One pass of the loop. Returns how long to back off, if at all.
    async fn tick(&mut self) -> Option<Duration> {
        self.check_bus().await;

        if !self.session.is_token_valid() {
            if let Err(e) = self.connect_cloud().await {
                warn!("Failed to connect to Comfort Cloud: {}", e);
                self.error_streak += 1;
                self.session = (self.new_session)();
                return Some(LONG_BACKOFF);
            }
        }

        if let Err(e) = self.update_devices().await {
            return Some(self.record_failure(&e));
        }
        self.error_streak = 0;

        if Instant::now() >= self.next_discovery {
            self.announce().await;
        }

        None
    }

    fn record_failure(&mut self, error: &CloudError) -> Duration {
        self.error_streak += 1;
        warn!(
            "Comfort Cloud request failed ({} in a row): {}",
            self.error_streak, error
        );

        if self.error_streak >= ERROR_STREAK_LIMIT {
            warn!("Too many failures, recreating Comfort Cloud session");
            self.session = (self.new_session)();
            return LONG_BACKOFF;
        }

        if error.is_auth_expired() {
            info!("Comfort Cloud session expired, logging in again after back-off");
            self.session = (self.new_session)();
        }
        SHORT_BACKOFF
    }

    async fn check_bus(&mut self) {
        if self.bus.is_connected() {
            self.bus_open = true;
            return;
        }

        let now = Instant::now();
        if now < self.next_bus_retry {
            return;
        }
        self.next_bus_retry = now + BUS_RETRY;

        warn!("MQTT connection lost");
        match self.bus.recover().await {
            Ok(()) => self.bus_open = true,
            Err(e) => warn!("MQTT recovery failed: {}", e),
        }
    }

    /// Log in, rebuild every device and announce them
    async fn connect_cloud(&mut self) -> Result<(), CloudError> {
        info!("Logging in to Comfort Cloud");
        self.session.login().await?;

        let raw_devices = self.session.get_devices().await?;
        self.devices.clear();
        for raw in &raw_devices {
            match Device::new(raw) {
                Ok(device) => {
                    info!(
                        "[{}] Found {} ({}) in {}",
                        device.name(),
                        device.label(),
                        device.model(),
                        device.group()
                    );
                    self.devices.insert(device.name().to_string(), device);
                }
                Err(e) => warn!("Skipping device {:?}: {}", raw.name, e),
            }
        }

        for device in self.devices.values_mut() {
            device.update_state(&self.session, INITIAL_REFRESH).await?;
        }
        for device in self.devices.values() {
            self.bus.introduce(device).await;
        }
        self.announce().await;
        for device in self.devices.values() {
            self.bus.publish_state(device).await;
        }

        info!("Connected to Comfort Cloud, {} device(s)", self.devices.len());
        Ok(())
    }

    async fn update_devices(&mut self) -> Result<(), CloudError> {
        for device in self.devices.values_mut() {
            if device.update_state(&self.session, self.update_interval).await? {
                self.bus.publish_state(device).await;
            }
        }
        Ok(())
    }

    async fn announce(&mut self) {
        self.bus.announce(self.devices.values()).await;
        self.next_discovery = Instant::now() + DISCOVERY_INTERVAL;
    }

    async fn handle_message(&mut self, msg: &MqttMessage) {
        let payload = msg.payload_str();
        debug!("Received message ({}): {}", msg.topic, payload);

        if msg.topic == STATUS_TOPIC {
            match payload.as_str() {
                "online" => {
                    info!("Home Assistant is online, resending configuration");
                    self.bus.resend_discovery().await;
                }
                "offline" => info!("Home Assistant is offline"),
                other => info!("Unknown Home Assistant status: {}", other),
            }
            return;
        }

        let Some(target) = self.bus.topics().parse(&msg.topic) else {
            debug!("Ignoring message on {}", msg.topic);
            return;
        };

        let Some(device) = self.devices.get_mut(target.device) else {
            debug!("Ignoring command for unknown device {}", target.device);
            return;
        };

        if device.command(&self.session, target.command, &payload).await {
            self.bus.publish_state(device).await;
        }
    }

    async fn shutdown(&mut self) {
        info!("Shutting down");
        if let Err(e) = self.bus.disconnect().await {
            warn!("Failed to disconnect from MQTT: {}", e);
        }
        if self.session.is_token_valid() {
            info!("Logging out of Comfort Cloud");
            if let Err(e) = self.session.logout().await {
                warn!("Failed to log out: {}", e);
            }
        }
    }
}

/// Returns `true` if shutdown was requested before `duration` elapsed
async fn sleep_or_shutdown(duration: Duration, shutdown: &mut oneshot::Receiver<()>) -> bool {
    tokio::select! {
        biased;
        _ = shutdown => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

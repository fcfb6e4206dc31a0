use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use comfortd_cloud::constants::AirSwingLR;
use comfortd_cloud::constants::AirSwingUD;
use comfortd_cloud::constants::EcoMode;
use comfortd_cloud::constants::FanSpeed;
use comfortd_cloud::constants::NanoeMode;
use comfortd_cloud::constants::OperationMode;
use comfortd_cloud::constants::Power;
use comfortd_cloud::CloudError;
use comfortd_cloud::CloudSession;
use comfortd_cloud::RawDevice;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::command::Command;
use super::mappings::Vocabulary;
use super::state::State;

/// Home Assistant component every device is exposed as.
pub const COMPONENT: &str = "climate";

pub const MANUFACTURER: &str = "Panasonic";

/// Delay before re-polling a device after a push, so the cloud has settled.
pub const PUSH_SETTLE: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Device record is missing required field '{0}'")]
    MissingField(&'static str),
}

/// Whether the requested state still has to reach the cloud.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    /// The last push failed and is retried on the next update.
    Dirty,
}

/// Controller for one climate unit.
///
/// Tracks the state last confirmed by the cloud (`current`) and the state last
/// requested locally (`desired`), and reconciles the two.
#[derive(Debug)]
pub struct Device {
    id: String,
    name: String,
    label: String,
    group: String,
    model: String,
    current: State,
    desired: State,
    sync: SyncState,
    next_refresh: Instant,
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, DeviceError> {
    value.clone().ok_or(DeviceError::MissingField(field))
}

/// Stable identifier derived from the name the user gave the unit.
pub fn display_id(name: &str) -> String {
    format!("pcc_{}_ac", name.trim().to_lowercase().replace(' ', "_"))
}

impl Device {
    pub fn new(raw: &RawDevice) -> Result<Self, DeviceError> {
        let id = required(&raw.id, "id")?;
        let label = required(&raw.name, "name")?;
        let group = required(&raw.group, "group")?;
        let model = required(&raw.model, "model")?;

        Ok(Self {
            id,
            name: display_id(&label),
            label,
            group,
            model,
            current: State::default(),
            desired: State::default(),
            sync: SyncState::Idle,
            next_refresh: Instant::now(),
        })
    }

    /// Opaque cloud identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display id used in topics and entity ids.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as configured in the vendor app.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn component(&self) -> &'static str {
        COMPONENT
    }

    pub fn current(&self) -> &State {
        &self.current
    }

    pub fn desired(&self) -> &State {
        &self.desired
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync
    }

    pub fn is_dirty(&self) -> bool {
        self.sync == SyncState::Dirty
    }

    /// Reconcile with the cloud.
    ///
    /// Retries a pending push first, then polls if the refresh interval has
    /// elapsed. Returns `true` if a poll happened.
    pub async fn update_state<S: CloudSession + ?Sized>(
        &mut self,
        session: &S,
        interval: Duration,
    ) -> Result<bool, CloudError> {
        if self.sync == SyncState::Dirty {
            info!("[{}] Retrying failed update", self.name);
            self.sync = SyncState::Idle;
            self.send_update(session).await;
        }

        let now = Instant::now();
        if now < self.next_refresh {
            return Ok(false);
        }

        debug!("[{}] Polling cloud", self.name);
        let status = session.get_device(&self.id).await?;
        let polled = State::from_parameters(&status.parameters);

        if self.desired.is_default() && !polled.is_default() {
            info!("[{}] Seeding desired state from cloud", self.name);
            self.desired = polled.clone();
        }
        self.current.refresh_all(&self.name, &polled);
        self.next_refresh = now + interval;

        Ok(true)
    }

    /// Apply an inbound command.
    ///
    /// Returns `true` if the desired state changed and a push was attempted.
    /// Never fails; bad input is logged and dropped.
    pub async fn command<S: CloudSession + ?Sized>(
        &mut self,
        session: &S,
        command: &str,
        payload: &str,
    ) -> bool {
        let Ok(command) = Command::from_str(command) else {
            warn!("[{}] Unknown command '{}'", self.name, command);
            return false;
        };

        match command {
            Command::Power => self.set_power(session, payload).await,
            Command::Mode => self.set_mode(session, payload).await,
            Command::Temperature => self.set_temperature(session, payload).await,
            Command::Fan => {
                self.set_attribute::<FanSpeed, _>(session, "fan speed", payload, |s| {
                    &mut s.fan_speed
                })
                .await
            }
            Command::Swing => {
                self.set_attribute::<AirSwingUD, _>(session, "vertical swing", payload, |s| {
                    &mut s.air_swing_vertical
                })
                .await
            }
            Command::SwingHorizontal => {
                self.set_attribute::<AirSwingLR, _>(session, "horizontal swing", payload, |s| {
                    &mut s.air_swing_horizontal
                })
                .await
            }
            Command::Eco => {
                self.set_attribute::<EcoMode, _>(session, "eco mode", payload, |s| &mut s.eco)
                    .await
            }
            Command::Nanoe => {
                self.set_attribute::<NanoeMode, _>(session, "nanoe mode", payload, |s| {
                    &mut s.nanoe
                })
                .await
            }
            Command::Config | Command::State => false,
        }
    }

    /// Allow the next poll no earlier than `delay` from now.
    pub fn schedule_refresh(&mut self, delay: Duration) {
        self.next_refresh = Instant::now() + delay;
    }

    async fn set_power<S: CloudSession + ?Sized>(&mut self, session: &S, payload: &str) -> bool {
        let Some(power) = Power::from_literal(&payload.to_lowercase()) else {
            warn!("[{}] Invalid power '{}'", self.name, payload);
            return false;
        };
        self.apply_power(session, power).await
    }

    /// Idempotent against the power the device reports, not the one last
    /// requested; the unit may have been switched outside Home Assistant.
    async fn apply_power<S: CloudSession + ?Sized>(&mut self, session: &S, power: Power) -> bool {
        self.desired.power = power;
        if power == self.current.power {
            info!("[{}] Power already {}", self.name, power.to_literal());
            return false;
        }

        info!("[{}] Setting power {}", self.name, power.to_literal());
        self.send_update(session).await;
        true
    }

    async fn set_mode<S: CloudSession + ?Sized>(&mut self, session: &S, payload: &str) -> bool {
        // The climate card sends power literals through the mode topic
        if let Some(power) = Power::from_literal(&payload.to_lowercase()) {
            return self.apply_power(session, power).await;
        }

        let Some(mode) = OperationMode::from_literal(payload) else {
            warn!("[{}] Invalid mode '{}'", self.name, payload);
            return false;
        };

        let powered = self.desired.power == Power::On && self.current.power == Power::On;
        if mode == self.desired.mode && powered {
            info!("[{}] Mode already {}", self.name, payload);
            return false;
        }

        info!("[{}] Setting mode {}", self.name, payload);
        self.desired.mode = mode;
        self.desired.power = Power::On;
        self.send_update(session).await;
        true
    }

    async fn set_temperature<S: CloudSession + ?Sized>(
        &mut self,
        session: &S,
        payload: &str,
    ) -> bool {
        let temperature = match payload.trim().parse::<f64>() {
            Ok(t) if t.is_finite() => t,
            _ => {
                warn!("[{}] Invalid temperature '{}'", self.name, payload);
                return false;
            }
        };

        if temperature == self.desired.temperature {
            info!("[{}] Temperature already {}", self.name, temperature);
            return false;
        }

        info!("[{}] Setting temperature {}", self.name, temperature);
        self.desired.temperature = temperature;
        self.send_update(session).await;
        true
    }

    async fn set_attribute<T, S>(
        &mut self,
        session: &S,
        attribute: &str,
        payload: &str,
        field: fn(&mut State) -> &mut T,
    ) -> bool
    where
        T: Vocabulary + Debug,
        S: CloudSession + ?Sized,
    {
        let Some(value) = T::from_literal(payload) else {
            warn!("[{}] Invalid {} '{}'", self.name, attribute, payload);
            return false;
        };

        let slot = field(&mut self.desired);
        if *slot == value {
            info!("[{}] {} already {}", self.name, attribute, payload);
            return false;
        }

        info!("[{}] Setting {} {}", self.name, attribute, payload);
        *slot = value;
        self.send_update(session).await;
        true
    }

    /// Push the full desired state. Failures mark the device dirty.
    async fn send_update<S: CloudSession + ?Sized>(&mut self, session: &S) {
        let parameters = self.desired.control_parameters();
        match session.set_device(&self.id, &parameters).await {
            Ok(true) => {
                debug!("[{}] Update accepted", self.name);
                self.current.refresh(&self.name, &self.desired);
                self.sync = SyncState::Idle;
            }
            Ok(false) => {
                warn!("[{}] Update was not applied by the cloud", self.name);
                self.sync = SyncState::Dirty;
            }
            Err(e) => {
                warn!("[{}] Update failed: {}", self.name, e);
                self.sync = SyncState::Dirty;
            }
        }
        self.next_refresh = Instant::now() + PUSH_SETTLE;
    }
}

#[cfg(test)]
mod tests {
    use comfortd_cloud::DeviceParameters;

    use super::*;
    use crate::climate::testing::raw_device;
    use crate::climate::testing::MockSession;

    const INTERVAL: Duration = Duration::from_secs(60);

    fn parameters(temperature: f64) -> DeviceParameters {
        DeviceParameters {
            temperature: Some(temperature),
            temperature_inside: Some(20),
            temperature_outside: Some(5),
            power: Some(Power::On),
            mode: Some(OperationMode::Heat),
            fan_speed: Some(FanSpeed::Auto),
            air_swing_vertical: Some(AirSwingUD::Mid),
            air_swing_horizontal: Some(AirSwingLR::Auto),
            eco: Some(EcoMode::Auto),
            nanoe: Some(NanoeMode::On),
        }
    }

    fn setup(temperature: f64) -> (MockSession, Device) {
        let session = MockSession::with_device("CS-1", "Living Room", parameters(temperature));
        let device = Device::new(&raw_device("CS-1", "Living Room")).unwrap();
        (session, device)
    }

    async fn polled(temperature: f64) -> (MockSession, Device) {
        let (session, mut device) = setup(temperature);
        assert!(device.update_state(&session, INTERVAL).await.unwrap());
        (session, device)
    }

    #[test]
    fn test_new_derives_display_id() {
        let device = Device::new(&raw_device("CS-1", "Living Room")).unwrap();
        assert_eq!(device.id(), "CS-1");
        assert_eq!(device.name(), "pcc_living_room_ac");
        assert_eq!(device.label(), "Living Room");
        assert_eq!(device.group(), "Home");
        assert_eq!(device.component(), "climate");
        assert!(device.current().is_default());
        assert!(device.desired().is_default());
        assert_eq!(device.sync_state(), SyncState::Idle);
    }

    #[test]
    fn test_new_missing_field() {
        for (field, raw) in [
            ("id", RawDevice { id: None, ..raw_device("CS-1", "A") }),
            ("name", RawDevice { name: None, ..raw_device("CS-1", "A") }),
            ("group", RawDevice { group: None, ..raw_device("CS-1", "A") }),
            ("model", RawDevice { model: None, ..raw_device("CS-1", "A") }),
        ] {
            assert_eq!(Device::new(&raw).unwrap_err(), DeviceError::MissingField(field));
        }
    }

    #[tokio::test]
    async fn test_second_update_within_interval_is_noop() {
        let (session, mut device) = polled(22.0).await;
        let before = device.current().clone();

        assert!(!device.update_state(&session, INTERVAL).await.unwrap());
        assert_eq!(device.current(), &before);
        assert_eq!(session.cloud().polls.len(), 1);
    }

    #[tokio::test]
    async fn test_desired_seeded_once() {
        let (session, mut device) = polled(40.0).await;
        assert_eq!(device.desired().temperature, 40.0);
        assert_eq!(device.current().temperature, 40.0);

        session
            .cloud()
            .parameters
            .insert("CS-1".to_string(), parameters(45.0));
        device.schedule_refresh(Duration::ZERO);
        assert!(device.update_state(&session, INTERVAL).await.unwrap());

        assert_eq!(device.current().temperature, 45.0);
        assert_eq!(device.desired().temperature, 40.0);
    }

    #[tokio::test]
    async fn test_empty_poll_does_not_seed() {
        let session = MockSession::with_device("CS-1", "Den", DeviceParameters::default());
        let mut device = Device::new(&raw_device("CS-1", "Den")).unwrap();

        assert!(device.update_state(&session, INTERVAL).await.unwrap());
        assert!(device.desired().is_default());
    }

    #[tokio::test]
    async fn test_poll_error_propagates() {
        let (session, mut device) = setup(22.0);
        session.cloud().fail_polls = 1;

        assert!(device.update_state(&session, INTERVAL).await.is_err());
        assert!(device.current().is_default());
    }

    #[tokio::test]
    async fn test_last_updated_increases_on_poll() {
        let (session, mut device) = polled(22.0).await;
        let first = device.current().last_updated();

        device.schedule_refresh(Duration::ZERO);
        assert!(device.update_state(&session, INTERVAL).await.unwrap());
        assert!(device.current().last_updated() > first);
    }

    #[tokio::test]
    async fn test_duplicate_commands_are_noops() {
        let (session, mut device) = polled(22.0).await;
        let desired = device.desired().clone();

        for (command, payload) in [
            ("power_cmd", "on"),
            ("mode_cmd", "heat"),
            ("temp_cmd", "22"),
            ("fan_cmd", "auto"),
            ("swing_cmd", "Middle"),
            ("swing_h_cmd", "on"),
            ("s_eco_cmd", "Auto"),
            ("s_nanoe_cmd", "On"),
        ] {
            assert!(
                !device.command(&session, command, payload).await,
                "{command} {payload}"
            );
        }

        assert_eq!(device.desired(), &desired);
        assert!(session.cloud().pushes.is_empty());
    }

    #[tokio::test]
    async fn test_command_pushes_full_bundle() {
        let (session, mut device) = polled(22.0).await;

        assert!(device.command(&session, "fan_cmd", "Medium high").await);

        let cloud = session.cloud();
        assert_eq!(cloud.pushes.len(), 1);
        let (id, params) = &cloud.pushes[0];
        assert_eq!(id, "CS-1");
        assert_eq!(params.fan_speed, FanSpeed::HighMid);
        assert_eq!(params.temperature, 22.0);
        assert_eq!(params.mode, OperationMode::Heat);
        assert_eq!(params.air_swing_vertical, AirSwingUD::Mid);
        drop(cloud);

        assert_eq!(device.current().fan_speed, FanSpeed::HighMid);
        assert!(!device.is_dirty());
    }

    #[tokio::test]
    async fn test_push_schedules_short_repoll() {
        tokio::time::pause();
        let (session, mut device) = polled(22.0).await;

        assert!(device.command(&session, "temp_cmd", "23.5").await);
        assert!(!device.update_state(&session, INTERVAL).await.unwrap());

        tokio::time::advance(PUSH_SETTLE).await;
        assert!(device.update_state(&session, INTERVAL).await.unwrap());
    }

    #[tokio::test]
    async fn test_mode_turns_power_on() {
        let mut params = parameters(22.0);
        params.power = Some(Power::Off);
        let session = MockSession::with_device("CS-1", "Den", params);
        let mut device = Device::new(&raw_device("CS-1", "Den")).unwrap();
        device.update_state(&session, INTERVAL).await.unwrap();

        // Same mode, but powered down
        assert!(device.command(&session, "mode_cmd", "heat").await);
        assert_eq!(device.desired().power, Power::On);

        assert!(device.command(&session, "mode_cmd", "cool").await);
        assert_eq!(device.desired().mode, OperationMode::Cool);
        assert_eq!(device.desired().power, Power::On);
        assert_eq!(device.current().power, Power::On);

        let cloud = session.cloud();
        assert!(cloud.pushes.iter().all(|(_, p)| p.power == Power::On));
    }

    #[tokio::test]
    async fn test_mode_off_powers_down() {
        let (session, mut device) = polled(22.0).await;

        assert!(device.command(&session, "mode_cmd", "off").await);
        assert_eq!(device.desired().power, Power::Off);
        assert_eq!(device.desired().mode, OperationMode::Heat);
        assert_eq!(device.current().mode_literal(), "off");
    }

    #[tokio::test]
    async fn test_power_is_case_insensitive() {
        let (session, mut device) = polled(22.0).await;

        assert!(device.command(&session, "power_cmd", "OFF").await);
        assert_eq!(device.desired().power, Power::Off);
    }

    #[tokio::test]
    async fn test_power_matching_observed_state_is_not_pushed() {
        let (session, mut device) = polled(22.0).await;
        assert!(device.command(&session, "power_cmd", "off").await);
        assert_eq!(device.current().power, Power::Off);

        // Turning back on fails, so the device still reports off
        session.cloud().fail_pushes = 1;
        assert!(device.command(&session, "power_cmd", "on").await);
        assert!(device.is_dirty());
        assert_eq!(device.current().power, Power::Off);

        // Matches what the device reports, so nothing to push
        let pushes = session.cloud().pushes.len();
        assert!(!device.command(&session, "power_cmd", "off").await);
        assert_eq!(device.desired().power, Power::Off);
        assert_eq!(session.cloud().pushes.len(), pushes);
    }

    #[tokio::test]
    async fn test_unit_switched_off_elsewhere_can_be_turned_on() {
        tokio::time::pause();
        let (session, mut device) = polled(22.0).await;

        // Switched off from the vendor app
        session.cloud().parameters.get_mut("CS-1").unwrap().power = Some(Power::Off);
        device.schedule_refresh(Duration::ZERO);
        assert!(device.update_state(&session, INTERVAL).await.unwrap());
        assert_eq!(device.current().power, Power::Off);
        assert_eq!(device.desired().power, Power::On);

        assert!(device.command(&session, "mode_cmd", "heat").await);
        {
            let cloud = session.cloud();
            assert_eq!(cloud.pushes.len(), 1);
            assert_eq!(cloud.pushes[0].1.power, Power::On);
            assert_eq!(cloud.pushes[0].1.mode, OperationMode::Heat);
        }
        assert_eq!(device.current().power, Power::On);

        // And again through the power topic
        session.cloud().parameters.get_mut("CS-1").unwrap().power = Some(Power::Off);
        device.schedule_refresh(Duration::ZERO);
        device.update_state(&session, INTERVAL).await.unwrap();
        assert_eq!(device.current().power, Power::Off);

        assert!(device.command(&session, "power_cmd", "on").await);
        let cloud = session.cloud();
        assert_eq!(cloud.pushes.len(), 2);
        assert_eq!(cloud.pushes[1].1.power, Power::On);
    }

    #[tokio::test]
    async fn test_invalid_payloads_are_rejected() {
        let (session, mut device) = polled(22.0).await;
        let desired = device.desired().clone();

        for (command, payload) in [
            ("power_cmd", "maybe"),
            ("mode_cmd", "turbo"),
            ("temp_cmd", "warm"),
            ("temp_cmd", "NaN"),
            ("fan_cmd", "Medium"),
            ("swing_cmd", "sideways"),
            ("swing_h_cmd", "Up"),
            ("s_eco_cmd", "eco"),
            ("s_nanoe_cmd", "on"),
        ] {
            assert!(
                !device.command(&session, command, payload).await,
                "{command} {payload}"
            );
        }

        assert_eq!(device.desired(), &desired);
        assert!(session.cloud().pushes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_passive_commands() {
        let (session, mut device) = polled(22.0).await;
        let desired = device.desired().clone();

        assert!(!device.command(&session, "turbo_cmd", "on").await);
        assert!(!device.command(&session, "config", "{}").await);
        assert!(!device.command(&session, "state", "{}").await);

        assert_eq!(device.desired(), &desired);
        assert!(session.cloud().pushes.is_empty());
    }

    #[tokio::test]
    async fn test_failed_push_is_retried_once() {
        tokio::time::pause();
        let (session, mut device) = polled(22.0).await;

        session.cloud().fail_pushes = 1;
        assert!(device.command(&session, "temp_cmd", "25").await);
        assert!(device.is_dirty());
        assert_eq!(device.current().temperature, 22.0);
        assert_eq!(session.cloud().pushes.len(), 1);

        // Retry happens before the refresh check, which is still cooling down
        assert!(!device.update_state(&session, INTERVAL).await.unwrap());
        assert_eq!(session.cloud().pushes.len(), 2);
        assert_eq!(session.cloud().polls.len(), 1);
        assert!(!device.is_dirty());
        assert_eq!(device.current().temperature, 25.0);

        tokio::time::advance(PUSH_SETTLE).await;
        assert!(device.update_state(&session, INTERVAL).await.unwrap());
        assert_eq!(session.cloud().pushes.len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_push_marks_dirty() {
        let (session, mut device) = polled(22.0).await;

        session.cloud().reject_pushes = 2;
        assert!(device.command(&session, "s_eco_cmd", "Quiet").await);
        assert!(device.is_dirty());

        // Second failure sets it again
        device.update_state(&session, INTERVAL).await.unwrap();
        assert!(device.is_dirty());
        assert_eq!(session.cloud().pushes.len(), 2);

        device.update_state(&session, INTERVAL).await.unwrap();
        assert!(!device.is_dirty());
        assert_eq!(device.current().eco, EcoMode::Quiet);
    }
}

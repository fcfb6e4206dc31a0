//! Home Assistant MQTT discovery payloads.
//!
//! Each device is announced as one climate entity plus auxiliary sensors for
//! the temperature readings and selects for the eco and nanoe modes. All of
//! them read from the device's single JSON state topic.

use comfortd_cloud::constants::AirSwingLR;
use comfortd_cloud::constants::AirSwingUD;
use comfortd_cloud::constants::EcoMode;
use comfortd_cloud::constants::FanSpeed;
use comfortd_cloud::constants::NanoeMode;
use comfortd_cloud::constants::OperationMode;
use comfortd_cloud::constants::Power;
use serde::Serialize;

use super::topic::Topics;
use crate::climate::Command;
use crate::climate::Device;
use crate::climate::Vocabulary;
use crate::climate::MANUFACTURER;

const MIN_TEMP: f64 = 16.0;
const MAX_TEMP: f64 = 30.0;
const TEMP_STEP: f64 = 0.5;

/// A discovery message ready to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub topic: String,
    pub payload: String,
}

/// Device block shared by every entity of one unit
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
}

#[derive(Debug, Serialize)]
struct ClimateConfig {
    name: String,
    unique_id: String,
    icon: &'static str,
    temperature_unit: &'static str,
    min_temp: f64,
    max_temp: f64,
    temp_step: f64,
    precision: f64,
    modes: Vec<&'static str>,
    fan_modes: Vec<&'static str>,
    swing_modes: Vec<&'static str>,
    swing_horizontal_modes: Vec<&'static str>,
    power_command_topic: String,
    mode_command_topic: String,
    mode_state_topic: String,
    mode_state_template: &'static str,
    temperature_command_topic: String,
    temperature_state_topic: String,
    temperature_state_template: &'static str,
    current_temperature_topic: String,
    current_temperature_template: &'static str,
    fan_mode_command_topic: String,
    fan_mode_state_topic: String,
    fan_mode_state_template: &'static str,
    swing_mode_command_topic: String,
    swing_mode_state_topic: String,
    swing_mode_state_template: &'static str,
    swing_horizontal_mode_command_topic: String,
    swing_horizontal_mode_state_topic: String,
    swing_horizontal_mode_state_template: &'static str,
    device: DeviceInfo,
}

#[derive(Debug, Serialize)]
struct SensorConfig {
    name: String,
    unique_id: String,
    device_class: &'static str,
    unit_of_measurement: &'static str,
    icon: &'static str,
    state_topic: String,
    value_template: String,
    device: DeviceInfo,
}

#[derive(Debug, Serialize)]
struct SelectConfig {
    name: String,
    unique_id: String,
    icon: &'static str,
    command_topic: String,
    state_topic: String,
    value_template: String,
    options: Vec<&'static str>,
    device: DeviceInfo,
}

fn template(key: &str) -> String {
    format!("{{{{ value_json.{} }}}}", key)
}

fn device_info(device: &Device) -> DeviceInfo {
    DeviceInfo {
        identifiers: vec![device.id().to_string()],
        name: device.label().to_string(),
        model: device.model().to_string(),
        manufacturer: MANUFACTURER.to_string(),
    }
}

fn climate(topics: &Topics, device: &Device) -> ClimateConfig {
    let component = device.component();
    let name = device.name();
    let state = topics.state(component, name);
    let command = |c: Command| topics.command(component, name, c);

    let mut modes = vec![Power::Off.to_literal()];
    modes.extend(OperationMode::literals());

    ClimateConfig {
        name: name.to_string(),
        unique_id: name.to_string(),
        icon: "mdi:air-conditioner",
        temperature_unit: "C",
        min_temp: MIN_TEMP,
        max_temp: MAX_TEMP,
        temp_step: TEMP_STEP,
        precision: TEMP_STEP,
        modes,
        fan_modes: FanSpeed::literals(),
        swing_modes: AirSwingUD::literals(),
        swing_horizontal_modes: AirSwingLR::literals(),
        power_command_topic: command(Command::Power),
        mode_command_topic: command(Command::Mode),
        mode_state_topic: state.clone(),
        mode_state_template: "{{ value_json.mode }}",
        temperature_command_topic: command(Command::Temperature),
        temperature_state_topic: state.clone(),
        temperature_state_template: "{{ value_json.target_temperature }}",
        current_temperature_topic: state.clone(),
        current_temperature_template: "{{ value_json.inside_temperature }}",
        fan_mode_command_topic: command(Command::Fan),
        fan_mode_state_topic: state.clone(),
        fan_mode_state_template: "{{ value_json.fan_mode }}",
        swing_mode_command_topic: command(Command::Swing),
        swing_mode_state_topic: state.clone(),
        swing_mode_state_template: "{{ value_json.swing_mode }}",
        swing_horizontal_mode_command_topic: command(Command::SwingHorizontal),
        swing_horizontal_mode_state_topic: state,
        swing_horizontal_mode_state_template: "{{ value_json.swing_horizontal }}",
        device: device_info(device),
    }
}

/// `location` is `inside` or `outside`
fn temperature_sensor(topics: &Topics, device: &Device, location: &str) -> Entity<SensorConfig> {
    let suffix = format!("temperature_{}", location);
    let unique_id = format!("{}_{}", device.name(), suffix);

    Entity {
        topic: topics.entity_config("sensor", device.name(), &suffix),
        config: SensorConfig {
            name: unique_id.clone(),
            unique_id,
            device_class: "temperature",
            unit_of_measurement: "°C",
            icon: "mdi:thermometer",
            state_topic: topics.state(device.component(), device.name()),
            value_template: template(&format!("{}_temperature", location)),
            device: device_info(device),
        },
    }
}

fn select<T: Vocabulary>(
    topics: &Topics,
    device: &Device,
    suffix: &str,
    icon: &'static str,
    command: Command,
) -> Entity<SelectConfig> {
    let unique_id = format!("{}_{}", device.name(), suffix);

    Entity {
        topic: topics.entity_config("select", device.name(), suffix),
        config: SelectConfig {
            name: unique_id.clone(),
            unique_id,
            icon,
            command_topic: topics.command(device.component(), device.name(), command),
            state_topic: topics.state(device.component(), device.name()),
            value_template: template(&format!("s_{}", suffix)),
            options: T::literals(),
            device: device_info(device),
        },
    }
}

struct Entity<C> {
    topic: String,
    config: C,
}

impl<C: Serialize> Entity<C> {
    fn into_event(self) -> Result<DiscoveryEvent, serde_json::Error> {
        Ok(DiscoveryEvent {
            topic: self.topic,
            payload: serde_json::to_string(&self.config)?,
        })
    }
}

/// Every discovery message announcing `device`
pub fn discovery_events(
    topics: &Topics,
    device: &Device,
) -> Result<Vec<DiscoveryEvent>, serde_json::Error> {
    Ok(vec![
        Entity {
            topic: topics.config(device.component(), device.name()),
            config: climate(topics, device),
        }
        .into_event()?,
        temperature_sensor(topics, device, "inside").into_event()?,
        temperature_sensor(topics, device, "outside").into_event()?,
        select::<EcoMode>(topics, device, "eco", "mdi:leaf", Command::Eco).into_event()?,
        select::<NanoeMode>(topics, device, "nanoe", "mdi:air-purifier", Command::Nanoe)
            .into_event()?,
    ])
}

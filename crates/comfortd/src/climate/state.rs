use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use comfortd_cloud::constants::AirSwingLR;
use comfortd_cloud::constants::AirSwingUD;
use comfortd_cloud::constants::EcoMode;
use comfortd_cloud::constants::FanSpeed;
use comfortd_cloud::constants::NanoeMode;
use comfortd_cloud::constants::OperationMode;
use comfortd_cloud::constants::Power;
use comfortd_cloud::ControlParameters;
use comfortd_cloud::DeviceParameters;
use tracing::info;

use super::mappings::Vocabulary;

/// Snapshot of a climate unit's operating parameters.
///
/// Used for both the state confirmed by the cloud and the state requested
/// locally.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub temperature: f64,
    pub temperature_inside: i32,
    pub temperature_outside: i32,
    pub power: Power,
    pub mode: OperationMode,
    pub fan_speed: FanSpeed,
    pub air_swing_vertical: AirSwingUD,
    pub air_swing_horizontal: AirSwingLR,
    pub eco: EcoMode,
    pub nanoe: NanoeMode,
    is_default: bool,
    last_updated: SystemTime,
}

impl Default for State {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            temperature_inside: 0,
            temperature_outside: 0,
            power: Power::default(),
            mode: OperationMode::default(),
            fan_speed: FanSpeed::default(),
            air_swing_vertical: AirSwingUD::default(),
            air_swing_horizontal: AirSwingLR::default(),
            eco: EcoMode::default(),
            nanoe: NanoeMode::default(),
            is_default: true,
            last_updated: SystemTime::now(),
        }
    }
}

/// Log and adopt every listed field that differs between two states.
macro_rules! adopt {
    ($name:expr, $target:expr, $source:expr, $changed:ident; $($field:ident),+ $(,)?) => {
        $(
            if $target.$field != $source.$field {
                info!(
                    "[{}] {}: {:?} -> {:?}",
                    $name,
                    stringify!($field),
                    $target.$field,
                    $source.$field
                );
                $target.$field = $source.$field;
                $changed = true;
            }
        )+
    };
}

impl State {
    /// Build a state from a sparse parameter set; absent attributes keep
    /// their defaults.
    pub fn from_parameters(parameters: &DeviceParameters) -> Self {
        let defaults = Self::default();
        Self {
            temperature: parameters.temperature.unwrap_or(defaults.temperature),
            temperature_inside: parameters
                .temperature_inside
                .unwrap_or(defaults.temperature_inside),
            temperature_outside: parameters
                .temperature_outside
                .unwrap_or(defaults.temperature_outside),
            power: parameters.power.unwrap_or(defaults.power),
            mode: parameters.mode.unwrap_or(defaults.mode),
            fan_speed: parameters.fan_speed.unwrap_or(defaults.fan_speed),
            air_swing_vertical: parameters
                .air_swing_vertical
                .unwrap_or(defaults.air_swing_vertical),
            air_swing_horizontal: parameters
                .air_swing_horizontal
                .unwrap_or(defaults.air_swing_horizontal),
            eco: parameters.eco.unwrap_or(defaults.eco),
            nanoe: parameters.nanoe.unwrap_or(defaults.nanoe),
            is_default: parameters.is_empty(),
            last_updated: defaults.last_updated,
        }
    }

    /// `true` until real data has been merged in.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn last_updated(&self) -> SystemTime {
        self.last_updated
    }

    /// Seconds since the Unix epoch of the last merge.
    pub fn update_epoch(&self) -> f64 {
        self.last_updated
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default()
    }

    /// Adopt the controllable attributes of `other`, logging each change.
    ///
    /// Returns `true` if any attribute changed.
    pub fn refresh(&mut self, name: &str, other: &State) -> bool {
        let mut changed = false;
        adopt!(name, self, other, changed;
            temperature,
            power,
            mode,
            fan_speed,
            air_swing_vertical,
            air_swing_horizontal,
            eco,
            nanoe,
        );
        self.touch();
        changed
    }

    /// Like [`State::refresh`], but also adopts the read-only sensor metrics.
    pub fn refresh_all(&mut self, name: &str, other: &State) -> bool {
        let mut changed = self.refresh(name, other);
        adopt!(name, self, other, changed;
            temperature_inside,
            temperature_outside,
        );
        changed
    }

    /// Full bundle of controllable attributes, as pushed to the cloud.
    pub fn control_parameters(&self) -> ControlParameters {
        ControlParameters {
            power: self.power,
            mode: self.mode,
            temperature: self.temperature,
            fan_speed: self.fan_speed,
            air_swing_vertical: self.air_swing_vertical,
            air_swing_horizontal: self.air_swing_horizontal,
            eco: self.eco,
            nanoe: self.nanoe,
        }
    }

    /// Mode literal as shown by Home Assistant; `"off"` while powered down.
    pub fn mode_literal(&self) -> &'static str {
        match self.power {
            Power::Off => Power::Off.to_literal(),
            Power::On => self.mode.to_literal(),
        }
    }

    // Keep merge timestamps strictly increasing even on a coarse clock.
    fn touch(&mut self) {
        let now = SystemTime::now();
        self.last_updated = if now > self.last_updated {
            now
        } else {
            self.last_updated + Duration::from_micros(1)
        };
        self.is_default = false;
    }
}

use serde::Serialize;

use crate::climate::State;
use crate::climate::Vocabulary;

/// JSON body of a device's state topic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatePayload {
    pub mode: &'static str,
    pub power: &'static str,
    pub fan_mode: &'static str,
    pub swing_mode: &'static str,
    pub swing_horizontal: &'static str,
    pub target_temperature: f64,
    pub inside_temperature: i32,
    pub outside_temperature: i32,
    pub update_epoch: f64,
    pub s_eco: &'static str,
    pub s_nanoe: &'static str,
}

impl From<&State> for StatePayload {
    fn from(state: &State) -> Self {
        Self {
            mode: state.mode_literal(),
            power: state.power.to_literal(),
            fan_mode: state.fan_speed.to_literal(),
            swing_mode: state.air_swing_vertical.to_literal(),
            swing_horizontal: state.air_swing_horizontal.to_literal(),
            target_temperature: state.temperature,
            inside_temperature: state.temperature_inside,
            outside_temperature: state.temperature_outside,
            update_epoch: state.update_epoch(),
            s_eco: state.eco.to_literal(),
            s_nanoe: state.nanoe.to_literal(),
        }
    }
}

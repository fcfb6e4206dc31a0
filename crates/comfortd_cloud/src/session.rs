use async_trait::async_trait;

use crate::constants::AirSwingLR;
use crate::constants::AirSwingUD;
use crate::constants::EcoMode;
use crate::constants::FanSpeed;
use crate::constants::NanoeMode;
use crate::constants::OperationMode;
use crate::constants::Power;
use crate::error::Result;

/// Device record as listed by the cloud.
///
/// Fields are optional because the cloud does not guarantee them; consumers
/// decide which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDevice {
    pub id: Option<String>,
    pub name: Option<String>,
    pub group: Option<String>,
    pub model: Option<String>,
}

/// Sparse set of device parameters reported by the cloud.
///
/// Any attribute the cloud omitted (or reported with an unknown code) is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceParameters {
    pub temperature: Option<f64>,
    pub temperature_inside: Option<i32>,
    pub temperature_outside: Option<i32>,
    pub power: Option<Power>,
    pub mode: Option<OperationMode>,
    pub fan_speed: Option<FanSpeed>,
    pub air_swing_vertical: Option<AirSwingUD>,
    pub air_swing_horizontal: Option<AirSwingLR>,
    pub eco: Option<EcoMode>,
    pub nanoe: Option<NanoeMode>,
}

impl DeviceParameters {
    /// Returns `true` if no attribute is present at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of polling a single device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceStatus {
    pub parameters: DeviceParameters,
}

/// Full bundle of controllable attributes pushed to a device in one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlParameters {
    pub power: Power,
    pub mode: OperationMode,
    pub temperature: f64,
    pub fan_speed: FanSpeed,
    pub air_swing_vertical: AirSwingUD,
    pub air_swing_horizontal: AirSwingLR,
    pub eco: EcoMode,
    pub nanoe: NanoeMode,
}

/// Session with the Comfort Cloud.
///
/// This trait allows for mocking the cloud for testing purposes.
#[async_trait]
pub trait CloudSession: Send + Sync {
    /// Authenticate and obtain a fresh token.
    async fn login(&mut self) -> Result<()>;

    /// Invalidate the current token.
    async fn logout(&mut self) -> Result<()>;

    /// Whether the current token can still be used.
    fn is_token_valid(&self) -> bool;

    /// List every device on the account.
    async fn get_devices(&self) -> Result<Vec<RawDevice>>;

    /// Poll the current parameters of one device.
    async fn get_device(&self, id: &str) -> Result<DeviceStatus>;

    /// Push the full set of controllable parameters to one device.
    ///
    /// Returns `false` if the cloud accepted the request but reported that the
    /// update was not applied.
    async fn set_device(&self, id: &str, parameters: &ControlParameters) -> Result<bool>;
}

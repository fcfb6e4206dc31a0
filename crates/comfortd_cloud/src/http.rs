// Comfort Cloud HTTP session
//
// Thin adapter over the legacy token endpoints of the Comfort Cloud REST API.
// Translates between the cloud's raw parameter codes and the typed records of
// the `session` module; everything else is left to the caller.

use std::fmt::Debug;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;

use crate::constants::AirSwingAutoMode;
use crate::constants::AirSwingLR;
use crate::constants::AirSwingUD;
use crate::constants::RawCode;
use crate::error::CloudError;
use crate::error::Result;
use crate::session::CloudSession;
use crate::session::ControlParameters;
use crate::session::DeviceParameters;
use crate::session::DeviceStatus;
use crate::session::RawDevice;

const DEFAULT_BASE_URL: &str = "https://accsmart.panasonic.com";
const DEFAULT_APP_VERSION: &str = "1.20.0";
const USER_AGENT: &str = "G-RAC";

/// The cloud does not report an expiry for legacy tokens; assume a day.
const TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Temperature sensors report this value when they have no reading.
const NO_READING: f64 = 126.0;

/// Connection settings for [`HttpSession`].
#[derive(Debug, Clone)]
pub struct HttpSessionConfig {
    pub username: String,
    pub password: String,
    pub base_url: String,
    pub app_version: String,
}

impl HttpSessionConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
        }
    }
}

struct Token {
    value: String,
    expires_at: Instant,
}

/// [`CloudSession`] backed by the Comfort Cloud REST API.
pub struct HttpSession {
    http: reqwest::Client,
    config: HttpSessionConfig,
    token: Option<Token>,
    /// Set when the API rejects the token before it expires.
    revoked: AtomicBool,
}

impl HttpSession {
    pub fn new(config: HttpSessionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            config,
            token: None,
            revoked: AtomicBool::new(false),
        })
    }

    /// A logged-out session sharing this one's HTTP client and settings
    pub fn fresh(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            token: None,
            revoked: AtomicBool::new(false),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header("X-APP-TYPE", "1")
            .header("X-APP-VERSION", self.config.app_version.as_str())
            .header("Accept", "application/json; charset=utf-8");

        if let Some(token) = &self.token {
            builder = builder.header("X-User-Authorization", token.value.as_str());
        }
        builder
    }

    fn ensure_logged_in(&self) -> Result<()> {
        if self.token.is_none() {
            return Err(CloudError::NotLoggedIn);
        }
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.ensure_logged_in()?;
        debug!("GET {}", path);

        let resp = self.request(Method::GET, path).send().await?;
        self.parse_response(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        debug!("POST {}", path);

        let resp = self.request(Method::POST, path).json(body).send().await?;
        self.parse_response(resp).await
    }

    async fn parse_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            self.revoked.store(true, Ordering::Relaxed);
            return Err(CloudError::Authentication {
                message: "token rejected by the cloud".into(),
            });
        }

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(CloudError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| CloudError::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

#[async_trait]
impl CloudSession for HttpSession {
    async fn login(&mut self) -> Result<()> {
        self.token = None;
        let body = serde_json::json!({
            "language": 0,
            "loginId": self.config.username,
            "password": self.config.password,
        });

        let resp: LoginResponse = self.post("auth/login", &body).await.map_err(|e| match e {
            CloudError::Api { status, body } => CloudError::Authentication {
                message: format!("login failed (HTTP {}): {}", status, body),
            },
            e => e,
        })?;

        self.token = Some(Token {
            value: resp.u_token,
            expires_at: Instant::now() + TOKEN_LIFETIME,
        });
        self.revoked.store(false, Ordering::Relaxed);
        info!("Logged in to Comfort Cloud as {}", self.config.username);
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        if self.token.is_none() {
            return Ok(());
        }
        let result: Result<serde_json::Value> = self.post("auth/logout", &serde_json::json!({})).await;
        self.token = None;
        result.map(|_| ())
    }

    fn is_token_valid(&self) -> bool {
        match &self.token {
            Some(token) => {
                !self.revoked.load(Ordering::Relaxed) && Instant::now() < token.expires_at
            }
            None => false,
        }
    }

    async fn get_devices(&self) -> Result<Vec<RawDevice>> {
        let resp: GroupsResponse = self.get("device/group").await?;

        Ok(resp
            .group_list
            .into_iter()
            .flat_map(|group| {
                let group_name = group.group_name;
                group.device_list.into_iter().map(move |d| RawDevice {
                    id: d.device_guid,
                    name: d.device_name,
                    group: group_name.clone(),
                    model: d.device_module_number,
                })
            })
            .collect())
    }

    async fn get_device(&self, id: &str) -> Result<DeviceStatus> {
        let resp: StatusResponse = self.get(&format!("deviceStatus/now/{}", id)).await?;
        Ok(DeviceStatus {
            parameters: decode_parameters(&resp.parameters),
        })
    }

    async fn set_device(&self, id: &str, parameters: &ControlParameters) -> Result<bool> {
        self.ensure_logged_in()?;
        let body = ControlRequest {
            device_guid: id,
            parameters: encode_parameters(parameters),
        };
        let resp: ControlResponse = self.post("deviceStatus/control", &body).await?;
        Ok(resp.result == 0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    u_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupsResponse {
    #[serde(default)]
    group_list: Vec<Group>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Group {
    group_name: Option<String>,
    #[serde(default)]
    device_list: Vec<GroupDevice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupDevice {
    device_guid: Option<String>,
    device_name: Option<String>,
    device_module_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    parameters: RawParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ControlRequest<'a> {
    device_guid: &'a str,
    parameters: RawParameters,
}

#[derive(Debug, Deserialize)]
struct ControlResponse {
    result: i64,
}

/// Parameter block exactly as the cloud spells it.
#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    operate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation_mode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature_set: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fan_speed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fan_auto_mode: Option<i64>,
    #[serde(rename = "airSwingUD", skip_serializing_if = "Option::is_none")]
    air_swing_ud: Option<i64>,
    #[serde(rename = "airSwingLR", skip_serializing_if = "Option::is_none")]
    air_swing_lr: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eco_mode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nanoe: Option<i64>,
    #[serde(skip_serializing)]
    inside_temperature: Option<f64>,
    #[serde(skip_serializing)]
    out_temperature: Option<f64>,
}

fn decode<T: RawCode + Debug>(code: Option<i64>, field: &str) -> Option<T> {
    let code = code?;
    let value = T::from_code(code);
    if value.is_none() {
        debug!("Ignoring unknown {} code {}", field, code);
    }
    value
}

fn reading(value: Option<f64>) -> Option<i32> {
    value
        .filter(|v| *v != NO_READING)
        .map(|v| v.round() as i32)
}

fn decode_parameters(raw: &RawParameters) -> DeviceParameters {
    let mut params = DeviceParameters {
        temperature: raw.temperature_set,
        temperature_inside: reading(raw.inside_temperature),
        temperature_outside: reading(raw.out_temperature),
        power: decode(raw.operate, "operate"),
        mode: decode(raw.operation_mode, "operationMode"),
        fan_speed: decode(raw.fan_speed, "fanSpeed"),
        air_swing_vertical: decode(raw.air_swing_ud, "airSwingUD"),
        air_swing_horizontal: decode(raw.air_swing_lr, "airSwingLR"),
        eco: decode(raw.eco_mode, "ecoMode"),
        nanoe: decode(raw.nanoe, "nanoe"),
    };

    match decode::<AirSwingAutoMode>(raw.fan_auto_mode, "fanAutoMode") {
        Some(AirSwingAutoMode::Both) => {
            params.air_swing_vertical = Some(AirSwingUD::Auto);
            params.air_swing_horizontal = Some(AirSwingLR::Auto);
        }
        Some(AirSwingAutoMode::AirSwingLR) => params.air_swing_horizontal = Some(AirSwingLR::Auto),
        Some(AirSwingAutoMode::AirSwingUD) => params.air_swing_vertical = Some(AirSwingUD::Auto),
        Some(AirSwingAutoMode::Disabled) | None => {}
    }

    params
}

fn encode_parameters(p: &ControlParameters) -> RawParameters {
    let mut raw = RawParameters {
        operate: Some(p.power.code()),
        operation_mode: Some(p.mode.code()),
        temperature_set: Some(p.temperature),
        fan_speed: Some(p.fan_speed.code()),
        eco_mode: Some(p.eco.code()),
        nanoe: Some(p.nanoe.code()),
        ..RawParameters::default()
    };

    // Auto swing is expressed through fanAutoMode, never through the axis codes
    let auto_mode = match (p.air_swing_vertical, p.air_swing_horizontal) {
        (AirSwingUD::Auto, AirSwingLR::Auto) => AirSwingAutoMode::Both,
        (AirSwingUD::Auto, lr) => {
            raw.air_swing_lr = Some(lr.code());
            AirSwingAutoMode::AirSwingUD
        }
        (ud, AirSwingLR::Auto) => {
            raw.air_swing_ud = Some(ud.code());
            AirSwingAutoMode::AirSwingLR
        }
        (ud, lr) => {
            raw.air_swing_ud = Some(ud.code());
            raw.air_swing_lr = Some(lr.code());
            AirSwingAutoMode::Disabled
        }
    };
    raw.fan_auto_mode = Some(auto_mode.code());

    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EcoMode;
    use crate::constants::FanSpeed;
    use crate::constants::NanoeMode;
    use crate::constants::OperationMode;
    use crate::constants::Power;

    fn control(ud: AirSwingUD, lr: AirSwingLR) -> ControlParameters {
        ControlParameters {
            power: Power::On,
            mode: OperationMode::Heat,
            temperature: 21.5,
            fan_speed: FanSpeed::Mid,
            air_swing_vertical: ud,
            air_swing_horizontal: lr,
            eco: EcoMode::Auto,
            nanoe: NanoeMode::Off,
        }
    }

    #[test]
    fn test_decode_parameters() {
        let raw: RawParameters = serde_json::from_value(serde_json::json!({
            "operate": 1,
            "operationMode": 3,
            "temperatureSet": 22.0,
            "fanSpeed": 0,
            "fanAutoMode": 1,
            "airSwingLR": 2,
            "airSwingUD": 4,
            "ecoMode": 2,
            "nanoe": 1,
            "insideTemperature": 21,
            "outTemperature": -9
        }))
        .unwrap();

        let params = decode_parameters(&raw);
        assert_eq!(params.power, Some(Power::On));
        assert_eq!(params.mode, Some(OperationMode::Heat));
        assert_eq!(params.temperature, Some(22.0));
        assert_eq!(params.air_swing_horizontal, Some(AirSwingLR::Mid));
        assert_eq!(params.air_swing_vertical, Some(AirSwingUD::DownMid));
        assert_eq!(params.eco, Some(EcoMode::Quiet));
        assert_eq!(params.nanoe, Some(NanoeMode::Off));
        assert_eq!(params.temperature_inside, Some(21));
        assert_eq!(params.temperature_outside, Some(-9));
    }

    #[test]
    fn test_decode_auto_swing() {
        let raw = RawParameters {
            fan_auto_mode: Some(0),
            air_swing_lr: Some(2),
            air_swing_ud: Some(2),
            ..RawParameters::default()
        };
        let params = decode_parameters(&raw);
        assert_eq!(params.air_swing_vertical, Some(AirSwingUD::Auto));
        assert_eq!(params.air_swing_horizontal, Some(AirSwingLR::Auto));

        let raw = RawParameters {
            fan_auto_mode: Some(3),
            air_swing_lr: Some(2),
            air_swing_ud: Some(2),
            ..RawParameters::default()
        };
        let params = decode_parameters(&raw);
        assert_eq!(params.air_swing_vertical, Some(AirSwingUD::Mid));
        assert_eq!(params.air_swing_horizontal, Some(AirSwingLR::Auto));
    }

    #[test]
    fn test_decode_drops_unknown_and_missing_readings() {
        let raw = RawParameters {
            operation_mode: Some(42),
            inside_temperature: Some(126.0),
            ..RawParameters::default()
        };
        let params = decode_parameters(&raw);
        assert_eq!(params.mode, None);
        assert_eq!(params.temperature_inside, None);
        assert!(params.is_empty());
    }

    #[test]
    fn test_encode_swing_modes() {
        let raw = encode_parameters(&control(AirSwingUD::Auto, AirSwingLR::Auto));
        assert_eq!(raw.fan_auto_mode, Some(0));
        assert_eq!(raw.air_swing_ud, None);
        assert_eq!(raw.air_swing_lr, None);

        let raw = encode_parameters(&control(AirSwingUD::Auto, AirSwingLR::Left));
        assert_eq!(raw.fan_auto_mode, Some(2));
        assert_eq!(raw.air_swing_lr, Some(1));

        let raw = encode_parameters(&control(AirSwingUD::Up, AirSwingLR::Auto));
        assert_eq!(raw.fan_auto_mode, Some(3));
        assert_eq!(raw.air_swing_ud, Some(0));

        let raw = encode_parameters(&control(AirSwingUD::Down, AirSwingLR::Right));
        assert_eq!(raw.fan_auto_mode, Some(1));
        assert_eq!(raw.air_swing_ud, Some(1));
        assert_eq!(raw.air_swing_lr, Some(0));
    }

    #[test]
    fn test_encode_serializes_wire_names() {
        let raw = encode_parameters(&control(AirSwingUD::Up, AirSwingLR::Left));
        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json["operate"], 1);
        assert_eq!(json["operationMode"], 3);
        assert_eq!(json["temperatureSet"], 21.5);
        assert_eq!(json["airSwingUD"], 0);
        assert_eq!(json["airSwingLR"], 1);
        assert!(json.get("insideTemperature").is_none());
    }
}

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::error::{Result, SwitchBotError, GENERIC_API_ERROR};

/// `statusCode` value the vendor uses for a successful call.
pub const STATUS_OK: i64 = 100;

// ---------------------------------------------------------------------------
// Generic response envelope
//
// Every SwitchBot API response wraps its payload in the same outer object:
//
//   { "statusCode": 100, "message": "success", "body": <T> }
//
// Any `statusCode` other than 100 is an application-level failure, even when
// the HTTP status is 2xx. `body` is often `{}` for write calls and may be
// missing altogether on failure.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchBotResponse {
    pub status_code: Option<i64>,

    /// Human-readable status message; empty or absent on many responses.
    #[serde(default)]
    pub message: Option<String>,

    /// Payload; `null` when absent.
    #[serde(default)]
    pub body: Value,
}

impl SwitchBotResponse {
    /// Unwrap the envelope, mapping a non-100 `statusCode` to [`SwitchBotError::Api`].
    pub fn into_result(self) -> Result<Value> {
        if self.status_code == Some(STATUS_OK) {
            return Ok(self.body);
        }

        let message = self
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| GENERIC_API_ERROR.to_owned());

        Err(SwitchBotError::Api {
            status_code: self.status_code.unwrap_or(-1),
            message,
        })
    }
}

// ---------------------------------------------------------------------------
// Devices : GET /v1.1/devices
// ---------------------------------------------------------------------------

/// Device types whose status is worth polling.
///
/// Other physical types either have no meaningful status or reject the
/// status endpoint.
pub const POLLED_DEVICE_TYPES: &[&str] = &["Bot", "Curtain", "Meter", "Hub Mini", "Plug"];

/// A physical device (Bot, Curtain, Meter, Plug, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDevice {
    pub device_id: String,
    pub device_name: String,
    /// Empty when the device is hub-less.
    #[serde(default)]
    pub hub_device_id: String,
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub enable_cloud_service: bool,
}

/// A virtual device driven through an IR blaster hub.
///
/// Supports commands but never status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraredRemoteDevice {
    pub device_id: String,
    pub device_name: String,
    #[serde(default)]
    pub hub_device_id: String,
    pub remote_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

/// Any device returned by the device list.
///
/// Serialised in the flat vendor shape. The variant is decided once when
/// deserialising: objects carrying `remoteType` are infrared remotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Device {
    InfraredRemote(InfraredRemoteDevice),
    Physical(PhysicalDevice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Physical,
    InfraredRemote,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceKind::Physical => "physical",
            DeviceKind::InfraredRemote => "infrared_remote",
        })
    }
}

impl Device {
    pub fn device_id(&self) -> &str {
        match self {
            Device::Physical(d) => &d.device_id,
            Device::InfraredRemote(d) => &d.device_id,
        }
    }

    pub fn device_name(&self) -> &str {
        match self {
            Device::Physical(d) => &d.device_name,
            Device::InfraredRemote(d) => &d.device_name,
        }
    }

    pub fn hub_device_id(&self) -> &str {
        match self {
            Device::Physical(d) => &d.hub_device_id,
            Device::InfraredRemote(d) => &d.hub_device_id,
        }
    }

    /// Type used for UI dispatch. Infrared remotes without an explicit
    /// `deviceType` fall back to their `remoteType`.
    pub fn device_type(&self) -> &str {
        match self {
            Device::Physical(d) => &d.device_type,
            Device::InfraredRemote(d) => d.device_type.as_deref().unwrap_or(&d.remote_type),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Physical(_) => DeviceKind::Physical,
            Device::InfraredRemote(_) => DeviceKind::InfraredRemote,
        }
    }

    /// Whether the vendor status endpoint accepts this device at all.
    pub fn supports_status(&self) -> bool {
        self.kind() == DeviceKind::Physical
    }

    /// Whether status should be polled for this device.
    pub fn is_pollable(&self) -> bool {
        self.supports_status() && POLLED_DEVICE_TYPES.contains(&self.device_type())
    }
}

impl From<PhysicalDevice> for Device {
    fn from(d: PhysicalDevice) -> Self {
        Device::Physical(d)
    }
}

impl From<InfraredRemoteDevice> for Device {
    fn from(d: InfraredRemoteDevice) -> Self {
        Device::InfraredRemote(d)
    }
}

/// Body of a successful device list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListBody {
    #[serde(default)]
    pub device_list: Vec<PhysicalDevice>,
    #[serde(default)]
    pub infrared_remote_list: Vec<InfraredRemoteDevice>,
}

impl DeviceListBody {
    /// Physical devices first, then infrared remotes, each in vendor order.
    pub fn into_devices(self) -> Vec<Device> {
        self.device_list
            .into_iter()
            .map(Device::from)
            .chain(self.infrared_remote_list.into_iter().map(Device::from))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Device status : GET /v1.1/devices/{deviceId}/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PowerState::On => "on",
            PowerState::Off => "off",
        })
    }
}

impl FromStr for PowerState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(format!("invalid power state: {other:?}")),
        }
    }
}

/// Sparse status snapshot.
///
/// Which fields are present depends on `deviceType`. Well-known fields are
/// typed; everything else lands in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub hub_device_id: String,
    /// Percent, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// °C, may be negative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Percent, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Curtain position in percent, 0 = open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ---------------------------------------------------------------------------
// Commands : POST /v1.1/devices/{deviceId}/commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    #[default]
    Command,
    /// User-defined button on an infrared remote.
    Customize,
}

/// Wire body of the commands endpoint.
///
/// `parameter` is overloaded per `command`; prefer building one through
/// [`DeviceCommand`] rather than by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(default)]
    pub command_type: CommandType,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<Value>,
}

impl Command {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command_type: CommandType::Command,
            command: command.into(),
            parameter: None,
        }
    }

    pub fn with_parameter(mut self, parameter: impl Into<Value>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }
}

/// Air conditioner operating mode, numbered as the vendor expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AcMode {
    Auto = 1,
    Cool = 2,
    Dry = 3,
    Fan = 4,
    Heat = 5,
}

impl TryFrom<u8> for AcMode {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Auto),
            2 => Ok(Self::Cool),
            3 => Ok(Self::Dry),
            4 => Ok(Self::Fan),
            5 => Ok(Self::Heat),
            other => Err(format!("invalid air conditioner mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FanSpeed {
    Auto = 1,
    Low = 2,
    Medium = 3,
    High = 4,
}

impl TryFrom<u8> for FanSpeed {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Auto),
            2 => Ok(Self::Low),
            3 => Ok(Self::Medium),
            4 => Ok(Self::High),
            other => Err(format!("invalid fan speed: {other}")),
        }
    }
}

/// Parameters of the air conditioner `setAll` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcSettings {
    /// Target temperature in °C.
    pub temperature: i32,
    pub mode: AcMode,
    pub fan_speed: FanSpeed,
    pub power: PowerState,
}

impl AcSettings {
    /// Wire encoding: `"<temp>,<mode>,<fanSpeed>,<power>"`, e.g. `"25,2,1,on"`.
    pub fn encode(&self) -> String {
        format!(
            "{},{},{},{}",
            self.temperature, self.mode as u8, self.fan_speed as u8, self.power
        )
    }
}

impl FromStr for AcSettings {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [temp, mode, fan, power] = parts.as_slice() else {
            return Err(format!("setAll parameter must have 4 fields, got: {s:?}"));
        };

        let temperature = temp
            .parse::<i32>()
            .map_err(|_| format!("invalid temperature: {temp:?}"))?;
        let mode = AcMode::try_from(
            mode.parse::<u8>()
                .map_err(|_| format!("invalid air conditioner mode: {mode:?}"))?,
        )?;
        let fan_speed = FanSpeed::try_from(
            fan.parse::<u8>()
                .map_err(|_| format!("invalid fan speed: {fan:?}"))?,
        )?;

        Ok(Self {
            temperature,
            mode,
            fan_speed,
            power: power.parse::<PowerState>()?,
        })
    }
}

/// Typed commands, each knowing how to encode its own `parameter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    TurnOn,
    TurnOff,
    Press,
    /// Brightness in percent, 1–100.
    SetBrightness(u8),
    BrightnessUp,
    BrightnessDown,
    SetAll(AcSettings),
    /// A user-defined infrared button, by name.
    Customize(String),
}

/// Parameter sent with verbs that take none.
const DEFAULT_PARAMETER: &str = "default";

impl From<DeviceCommand> for Command {
    fn from(cmd: DeviceCommand) -> Self {
        match cmd {
            DeviceCommand::TurnOn => Command::new("turnOn").with_parameter(DEFAULT_PARAMETER),
            DeviceCommand::TurnOff => Command::new("turnOff").with_parameter(DEFAULT_PARAMETER),
            DeviceCommand::Press => Command::new("press").with_parameter(DEFAULT_PARAMETER),
            DeviceCommand::SetBrightness(level) => {
                Command::new("setBrightness").with_parameter(level.min(100))
            }
            DeviceCommand::BrightnessUp => {
                Command::new("brightnessUp").with_parameter(DEFAULT_PARAMETER)
            }
            DeviceCommand::BrightnessDown => {
                Command::new("brightnessDown").with_parameter(DEFAULT_PARAMETER)
            }
            DeviceCommand::SetAll(settings) => {
                Command::new("setAll").with_parameter(settings.encode())
            }
            DeviceCommand::Customize(name) => Command {
                command_type: CommandType::Customize,
                command: name,
                parameter: Some(Value::from(DEFAULT_PARAMETER)),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Scenes : GET /v1.1/scenes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub scene_id: String,
    pub scene_name: String,
}

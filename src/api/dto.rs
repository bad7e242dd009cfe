use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    status_cache::CachedStatus,
    switchbot::models::{Command, CommandType, Device, DeviceKind, PowerState, Scene},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceDto {
    pub device_id: String,
    pub device_name: String,
    /// Empty for hub-less devices.
    pub hub_device_id: String,
    /// Physical type, or the remote type for infrared remotes without one.
    pub device_type: String,
    pub kind: DeviceKind,
    pub remote_type: Option<String>,
    pub enable_cloud_service: Option<bool>,
    /// `false` for infrared remotes.
    pub status_supported: bool,
    /// Whether the device is selected for display on the panel.
    pub displayed: bool,
}

impl DeviceDto {
    pub fn from_device(device: &Device, displayed: bool) -> Self {
        let (remote_type, enable_cloud_service) = match device {
            Device::Physical(d) => (None, Some(d.enable_cloud_service)),
            Device::InfraredRemote(d) => (Some(d.remote_type.clone()), None),
        };
        Self {
            device_id: device.device_id().to_owned(),
            device_name: device.device_name().to_owned(),
            hub_device_id: device.hub_device_id().to_owned(),
            device_type: device.device_type().to_owned(),
            kind: device.kind(),
            remote_type,
            enable_cloud_service,
            status_supported: device.supports_status(),
            displayed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusDto {
    pub device_id: String,
    pub device_type: String,
    pub hub_device_id: String,
    pub battery: Option<f64>,
    pub version: Option<String>,
    /// °C.
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub slide_position: Option<f64>,
    pub power: Option<PowerState>,
    pub brightness: Option<f64>,
    /// Device-specific fields passed through untouched.
    #[schema(value_type = Object)]
    pub extra: BTreeMap<String, Value>,
    pub fetched_at: DateTime<Utc>,
}

impl From<CachedStatus> for StatusDto {
    fn from(c: CachedStatus) -> Self {
        let s = c.status;
        Self {
            device_id: s.device_id,
            device_type: s.device_type,
            hub_device_id: s.hub_device_id,
            battery: s.battery,
            version: s.version,
            temperature: s.temperature,
            humidity: s.humidity,
            slide_position: s.slide_position,
            power: s.power,
            brightness: s.brightness,
            extra: s.extra,
            fetched_at: c.fetched_at,
        }
    }
}

/// Request body for `POST /devices/{device_id}/commands`, in the vendor's shape.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    #[serde(default)]
    pub command_type: CommandType,
    pub command: String,
    /// String, number or object depending on `command`.
    #[schema(value_type = Option<Object>)]
    pub parameter: Option<Value>,
}

impl From<CommandRequest> for Command {
    fn from(r: CommandRequest) -> Self {
        Command {
            command_type: r.command_type,
            command: r.command,
            parameter: r.parameter,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommandResponseDto {
    /// Body returned by SwitchBot, usually `{}`.
    #[schema(value_type = Object)]
    pub response: Value,
    /// Whether a delayed status refresh was scheduled.
    pub refresh_scheduled: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SceneDto {
    pub scene_id: String,
    pub scene_name: String,
}

impl From<Scene> for SceneDto {
    fn from(s: Scene) -> Self {
        Self {
            scene_id: s.scene_id,
            scene_name: s.scene_name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SceneExecutionDto {
    pub scene_id: String,
    #[schema(value_type = Object)]
    pub response: Value,
}

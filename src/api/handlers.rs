use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;
use utoipa::OpenApi;

use super::{
    dto::{
        CommandRequest, CommandResponseDto, DeviceDto, SceneDto, SceneExecutionDto, StatusDto,
    },
    errors::{AppError, UnknownDevice},
    AppState,
};
use crate::switchbot::models::{Command, CommandType, Device, DeviceKind, PowerState};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Look a device up in the cached snapshot, re-listing once on a miss.
async fn resolve_device(state: &AppState, device_id: &str) -> Result<Device, AppError> {
    if let Some(device) = state.cache.device(device_id).await {
        return Ok(device);
    }

    let devices = state.client.list_devices().await?;
    state.cache.replace_devices(devices).await;
    state
        .cache
        .device(device_id)
        .await
        .ok_or_else(|| UnknownDevice(device_id.to_owned()).into())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List all devices, physical ones first, then infrared remotes.
#[utoipa::path(
    get,
    path = "/devices",
    responses(
        (status = 200, description = "All devices on the account", body = Vec<DeviceDto>),
        (status = 401, description = "Credentials not configured"),
        (status = 502, description = "SwitchBot API failure"),
    ),
    tag = "devices"
)]
pub async fn list_devices(State(state): State<AppState>) -> Result<Json<Vec<DeviceDto>>, AppError> {
    let devices = state.client.list_devices().await?;
    let dtos = devices
        .iter()
        .map(|d| DeviceDto::from_device(d, state.is_displayed(d.device_id())))
        .collect();
    state.cache.replace_devices(devices).await;
    Ok(Json(dtos))
}

/// Fetch a fresh status for one device. Infrared remotes are rejected
/// without contacting SwitchBot.
#[utoipa::path(
    get,
    path = "/devices/{device_id}/status",
    params(("device_id" = String, Path, description = "SwitchBot device ID")),
    responses(
        (status = 200, description = "Current device status", body = StatusDto),
        (status = 404, description = "Unknown device"),
        (status = 422, description = "Device does not support status"),
        (status = 502, description = "SwitchBot API failure"),
    ),
    tag = "devices"
)]
pub async fn get_device_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<StatusDto>, AppError> {
    let device = resolve_device(&state, &device_id).await?;
    let status = state.client.device_status(&device).await?;
    let cached = state.cache.update_status(&device_id, status).await;
    Ok(Json(cached.into()))
}

/// Latest status seen by the poller or a command refresh, without a round trip.
#[utoipa::path(
    get,
    path = "/devices/{device_id}/status/cached",
    params(("device_id" = String, Path, description = "SwitchBot device ID")),
    responses(
        (status = 200, description = "Cached status, or null if none yet", body = StatusDto),
    ),
    tag = "devices"
)]
pub async fn get_cached_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Json<Option<StatusDto>> {
    Json(state.cache.status(&device_id).await.map(Into::into))
}

/// Latest cached status of every displayed device, keyed by device id.
#[utoipa::path(
    get,
    path = "/status/cached",
    responses(
        (status = 200, description = "Cached statuses of displayed devices", body = BTreeMap<String, StatusDto>),
    ),
    tag = "devices"
)]
pub async fn list_cached_statuses(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, StatusDto>> {
    let statuses = state
        .cache
        .all_statuses()
        .await
        .into_iter()
        .filter(|(id, _)| state.is_displayed(id))
        .map(|(id, cached)| (id, cached.into()))
        .collect();
    Json(statuses)
}

/// Send a command; pollable devices get a delayed status refresh.
#[utoipa::path(
    post,
    path = "/devices/{device_id}/commands",
    params(("device_id" = String, Path, description = "SwitchBot device ID")),
    request_body = CommandRequest,
    responses(
        (status = 200, description = "Command accepted", body = CommandResponseDto),
        (status = 404, description = "Unknown device"),
        (status = 502, description = "SwitchBot API failure"),
    ),
    tag = "devices"
)]
pub async fn send_command(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponseDto>, AppError> {
    let device = resolve_device(&state, &device_id).await?;
    let command = Command::from(req);
    let outcome = state.commands.send(&device, &command).await?;

    Ok(Json(CommandResponseDto {
        response: outcome.response,
        refresh_scheduled: outcome.refresh.is_some(),
    }))
}

#[utoipa::path(
    get,
    path = "/scenes",
    responses(
        (status = 200, description = "All manual scenes", body = Vec<SceneDto>),
        (status = 502, description = "SwitchBot API failure"),
    ),
    tag = "scenes"
)]
pub async fn list_scenes(State(state): State<AppState>) -> Result<Json<Vec<SceneDto>>, AppError> {
    let scenes = state.client.list_scenes().await?;
    Ok(Json(scenes.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/scenes/{scene_id}/execute",
    params(("scene_id" = String, Path, description = "SwitchBot scene ID")),
    responses(
        (status = 200, description = "Scene executed", body = SceneExecutionDto),
        (status = 502, description = "SwitchBot API failure"),
    ),
    tag = "scenes"
)]
pub async fn execute_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<String>,
) -> Result<Json<SceneExecutionDto>, AppError> {
    let response = state.client.execute_scene(&scene_id).await?;
    info!(scene_id = %scene_id, "Scene executed");
    Ok(Json(SceneExecutionDto { scene_id, response }))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        list_devices,
        get_device_status,
        get_cached_status,
        list_cached_statuses,
        send_command,
        list_scenes,
        execute_scene,
        health
    ),
    components(schemas(
        DeviceDto,
        StatusDto,
        CommandRequest,
        CommandResponseDto,
        SceneDto,
        SceneExecutionDto,
        DeviceKind,
        PowerState,
        CommandType
    )),
    tags(
        (name = "devices", description = "Device listing, status and commands"),
        (name = "scenes",  description = "Scene listing and execution"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "SwitchBot Panel API",
        version = "0.1.0",
        description = "REST API for controlling SwitchBot devices and scenes"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

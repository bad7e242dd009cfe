pub mod dto;
pub mod errors;
pub mod handlers;

use std::{collections::HashSet, sync::Arc};

use axum::{routing::{get, post}, Router};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{
    config, control::CommandService, status_cache::StatusCache, switchbot::SwitchBotClient,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub client: SwitchBotClient,
    pub cache: StatusCache,
    pub commands: CommandService,
    /// Devices selected for display; empty means all.
    pub displayed: Arc<HashSet<String>>,
}

impl AppState {
    pub fn is_displayed(&self, device_id: &str) -> bool {
        config::is_displayed(&self.displayed, device_id)
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/devices", get(handlers::list_devices))
        .route("/devices/{device_id}/status", get(handlers::get_device_status))
        .route(
            "/devices/{device_id}/status/cached",
            get(handlers::get_cached_status),
        )
        .route("/status/cached", get(handlers::list_cached_statuses))
        .route("/devices/{device_id}/commands", post(handlers::send_command))
        .route("/scenes", get(handlers::list_scenes))
        .route("/scenes/{scene_id}/execute", post(handlers::execute_scene))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}

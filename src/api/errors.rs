use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::switchbot::SwitchBotError;

/// The requested device id is not in the account's device list.
#[derive(Debug, Error)]
#[error("unknown device: {0}")]
pub struct UnknownDevice(pub String);

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<UnknownDevice>().is_some() {
            return StatusCode::NOT_FOUND;
        }
        match self.0.downcast_ref::<SwitchBotError>() {
            Some(SwitchBotError::MissingCredentials) => StatusCode::UNAUTHORIZED,
            Some(SwitchBotError::UnsupportedOperation { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(SwitchBotError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Some(
                SwitchBotError::Transport(_)
                | SwitchBotError::Http { .. }
                | SwitchBotError::Api { .. }
                | SwitchBotError::Decode(_),
            ) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

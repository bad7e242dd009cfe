use std::time::Duration;

use thiserror::Error;

/// Fallback message used when a failed envelope carries no `message`.
pub const GENERIC_API_ERROR: &str = "SwitchBot API Error";

/// Everything that can go wrong while talking to the SwitchBot cloud API.
///
/// Local failures (`MissingCredentials`, `UnsupportedOperation`) are raised
/// before any network activity. `Transport`/`Timeout` mean no HTTP response
/// arrived, `Http` means a non-2xx response, and `Api` means a 2xx response
/// whose envelope reported a failure.
#[derive(Debug, Error)]
pub enum SwitchBotError {
    #[error("API token and secret are required")]
    MissingCredentials,

    #[error("request to SwitchBot API failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request to SwitchBot API timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("API request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    /// Display is the vendor message only, so callers can show it verbatim.
    #[error("{message}")]
    Api { status_code: i64, message: String },

    #[error("failed to decode SwitchBot response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{operation} is not supported for device {device_id}")]
    UnsupportedOperation {
        operation: &'static str,
        device_id: String,
    },

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("invalid request header: {0}")]
    InvalidHeader(String),
}

impl SwitchBotError {
    /// `true` when the error was raised locally without a network call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials
                | Self::UnsupportedOperation { .. }
                | Self::Signing(_)
                | Self::InvalidHeader(_)
        )
    }
}

pub type Result<T, E = SwitchBotError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_vendor_message_only() {
        let err = SwitchBotError::Api {
            status_code: 190,
            message: "boom".to_owned(),
        };
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn http_error_mentions_status_and_body() {
        let err = SwitchBotError::Http {
            status: 500,
            body: "server error".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("server error"));
    }

    #[test]
    fn timeout_reports_millis() {
        let err = SwitchBotError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "request to SwitchBot API timed out after 5000 ms");
    }

    #[test]
    fn local_errors_are_flagged() {
        assert!(SwitchBotError::MissingCredentials.is_local());
        assert!(SwitchBotError::UnsupportedOperation {
            operation: "status",
            device_id: "ir-1".to_owned(),
        }
        .is_local());
        assert!(!SwitchBotError::Http {
            status: 500,
            body: String::new()
        }
        .is_local());
    }
}

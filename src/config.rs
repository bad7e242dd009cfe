use std::{collections::HashSet, time::Duration};

use anyhow::{ensure, Context, Result};

use crate::switchbot::{ClientSettings, Credentials, DEFAULT_API_BASE_URL};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub switchbot_token: String,
    pub switchbot_secret: String,
    /// Optional forwarding prefix, e.g. `"https://my-proxy.example/"`.
    pub switchbot_proxy_url: String,
    pub switchbot_base_url: String,
    pub request_timeout_secs: u64,
    /// Devices shown on the panel and polled for status. Empty means all.
    /// Format: `"id1,id2"`.
    pub displayed_device_ids: HashSet<String>,
    pub server_host: String,
    pub server_port: u16,
    /// Status polling interval in seconds.
    pub poll_interval_secs: u64,
    /// Delay before re-reading status after a command, in milliseconds.
    pub command_refresh_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            switchbot_token: required("SWITCHBOT_TOKEN")?,
            switchbot_secret: required("SWITCHBOT_SECRET")?,
            switchbot_proxy_url: optional("SWITCHBOT_PROXY_URL", ""),
            switchbot_base_url: optional("SWITCHBOT_BASE_URL", DEFAULT_API_BASE_URL),
            request_timeout_secs: positive(
                "SWITCHBOT_TIMEOUT_SECS",
                &optional("SWITCHBOT_TIMEOUT_SECS", "5"),
            )?,
            displayed_device_ids: parse_device_ids(&optional("SWITCHBOT_DISPLAYED_DEVICES", "")),
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            poll_interval_secs: positive(
                "POLL_INTERVAL_SECS",
                &optional("POLL_INTERVAL_SECS", "30"),
            )?,
            command_refresh_delay_ms: optional("COMMAND_REFRESH_DELAY_MS", "1500")
                .parse()
                .context("COMMAND_REFRESH_DELAY_MS must be a non-negative integer")?,
        })
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            credentials: Credentials::new(&self.switchbot_token, &self.switchbot_secret),
            api_base_url: self.switchbot_base_url.clone(),
            proxy_base: self.switchbot_proxy_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn command_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.command_refresh_delay_ms)
    }
}

/// Parse `"id1, id2"` into a set of device ids, ignoring blanks.
fn parse_device_ids(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parse `raw` as a whole number of seconds greater than zero.
fn positive(key: &str, raw: &str) -> Result<u64> {
    let value: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer"))?;
    ensure!(value > 0, "{key} must be a positive integer, got 0");
    Ok(value)
}

/// Whether `device_id` belongs to the displayed selection.
///
/// An empty selection displays every device. The poller and the HTTP API
/// both go through this.
pub fn is_displayed(selection: &HashSet<String>, device_id: &str) -> bool {
    selection.is_empty() || selection.contains(device_id)
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

use std::time::Duration;

use serde_json::Value;
use tokio::{task::JoinHandle, time};
use tracing::{debug, info, warn};

use crate::{
    status_cache::StatusCache,
    switchbot::{
        models::{Command, Device},
        Result, SwitchBotClient,
    },
};

/// Result of a successful command.
#[derive(Debug)]
pub struct CommandOutcome {
    /// Body returned by the vendor, usually `{}`.
    pub response: Value,
    /// Background status refresh, when the device is pollable. Dropping the
    /// handle does not cancel it.
    pub refresh: Option<JoinHandle<()>>,
}

/// Sends commands and schedules a best-effort status read-back.
#[derive(Clone)]
pub struct CommandService {
    client: SwitchBotClient,
    cache: StatusCache,
    refresh_delay: Duration,
}

impl CommandService {
    pub fn new(client: SwitchBotClient, cache: StatusCache, refresh_delay: Duration) -> Self {
        Self {
            client,
            cache,
            refresh_delay,
        }
    }

    /// Sends `command` to `device`.
    ///
    /// On success a background task waits `refresh_delay` for the device to
    /// settle, then re-reads its status into the cache. That refresh only
    /// logs its failure; the command is already reported as successful.
    pub async fn send(&self, device: &Device, command: &Command) -> Result<CommandOutcome> {
        let response = self.client.send_command(device.device_id(), command).await?;
        info!(
            device_id = %device.device_id(),
            command = %command.command,
            "Command sent"
        );

        let refresh = device.is_pollable().then(|| self.spawn_refresh(device.clone()));
        Ok(CommandOutcome { response, refresh })
    }

    fn spawn_refresh(&self, device: Device) -> JoinHandle<()> {
        let client = self.client.clone();
        let cache = self.cache.clone();
        let delay = self.refresh_delay;

        tokio::spawn(async move {
            time::sleep(delay).await;
            let device_id = device.device_id();
            match client.device_status(&device).await {
                Ok(status) => {
                    debug!(device_id = %device_id, "Status refreshed after command");
                    cache.update_status(device_id, status).await;
                }
                Err(e) => {
                    warn!(device_id = %device_id, error = %e, "Failed to refresh status after command");
                }
            }
        })
    }
}

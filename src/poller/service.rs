use std::{collections::HashSet, time::Duration};

use anyhow::{Context, Result};
use tokio::{task::JoinSet, time};
use tracing::{error, info, warn};

use crate::{
    config,
    status_cache::StatusCache,
    switchbot::{models::Device, SwitchBotClient},
};

/// Keeps the device snapshot and the statuses of displayed devices fresh.
pub struct StatusPoller {
    client: SwitchBotClient,
    cache: StatusCache,
    displayed: HashSet<String>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(
        client: SwitchBotClient,
        cache: StatusCache,
        displayed: HashSet<String>,
        interval_secs: u64,
    ) -> Self {
        Self {
            client,
            cache,
            displayed,
            // `time::interval` panics on a zero period.
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    pub fn is_displayed(&self, device_id: &str) -> bool {
        config::is_displayed(&self.displayed, device_id)
    }

    /// Lists devices from the vendor and stores the snapshot.
    pub async fn refresh_devices(&self) -> Result<Vec<Device>> {
        let devices = self
            .client
            .list_devices()
            .await
            .context("Failed to list SwitchBot devices")?;
        info!(count = devices.len(), "Device list refreshed");
        self.cache.replace_devices(devices.clone()).await;
        Ok(devices)
    }

    /// Refreshes the device list, then fetches status for every displayed,
    /// pollable device concurrently. Returns how many statuses were stored.
    ///
    /// A failing device is logged and skipped; it never aborts the others.
    pub async fn poll_once(&self) -> Result<usize> {
        let devices = self.refresh_devices().await?;

        let mut tasks = JoinSet::new();
        for device in devices {
            if !device.is_pollable() || !self.is_displayed(device.device_id()) {
                continue;
            }
            let client = self.client.clone();
            let cache = self.cache.clone();
            tasks.spawn(async move {
                let device_id = device.device_id().to_owned();
                match client.device_status(&device).await {
                    Ok(status) => {
                        cache.update_status(&device_id, status).await;
                        true
                    }
                    Err(e) => {
                        error!(device_id = %device_id, error = %e, "Failed to fetch device status");
                        false
                    }
                }
            });
        }

        let mut polled = 0;
        while let Some(res) = tasks.join_next().await {
            match res {
                Ok(true) => polled += 1,
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Status polling task panicked"),
            }
        }

        info!(polled, "Status poll complete");
        Ok(polled)
    }

    /// Runs the polling loop indefinitely.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Status polling loop started");
        let mut ticker = time::interval(self.interval);

        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                error!(error = %e, "Status polling iteration failed");
            }
        }
    }
}

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::switchbot::models::{Device, DeviceStatus};

/// A status snapshot together with the time it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedStatus {
    pub status: DeviceStatus,
    pub fetched_at: DateTime<Utc>,
}

/// In-memory store of the latest device list and the latest status per device id.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
/// Uses `tokio::sync::RwLock` so concurrent readers never block each other.
#[derive(Clone, Default)]
pub struct StatusCache {
    devices: Arc<RwLock<Vec<Device>>>,
    statuses: Arc<RwLock<HashMap<String, CachedStatus>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the device snapshot with a freshly listed one.
    ///
    /// Statuses of devices missing from the new list are dropped.
    pub async fn replace_devices(&self, devices: Vec<Device>) {
        let ids: HashSet<&str> = devices.iter().map(Device::device_id).collect();
        self.statuses
            .write()
            .await
            .retain(|id, _| ids.contains(id.as_str()));
        *self.devices.write().await = devices;
    }

    /// Return the device snapshot in vendor order.
    pub async fn devices(&self) -> Vec<Device> {
        self.devices.read().await.clone()
    }

    pub async fn device(&self, device_id: &str) -> Option<Device> {
        self.devices
            .read()
            .await
            .iter()
            .find(|d| d.device_id() == device_id)
            .cloned()
    }

    /// Overwrite the cached status for `device_id`, returning the stored entry.
    pub async fn update_status(&self, device_id: &str, status: DeviceStatus) -> CachedStatus {
        let entry = CachedStatus {
            status,
            fetched_at: Utc::now(),
        };
        self.statuses
            .write()
            .await
            .insert(device_id.to_owned(), entry.clone());
        entry
    }

    /// Return the latest status for `device_id`, if one was ever fetched.
    pub async fn status(&self, device_id: &str) -> Option<CachedStatus> {
        self.statuses.read().await.get(device_id).cloned()
    }

    /// Return a snapshot of all cached statuses keyed by device id.
    pub async fn all_statuses(&self) -> HashMap<String, CachedStatus> {
        self.statuses.read().await.clone()
    }
}

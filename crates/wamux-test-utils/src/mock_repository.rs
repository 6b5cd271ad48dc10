// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`DeviceRepository`] and [`ApiKeyRepository`] with the same
//! contracts as the SQLite ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use wamux_core::{
    ApiKey, ApiKeyRepository, ApiKeyStatus, Device, DeviceFilter, DeviceRepository, DeviceStatus,
    WamuxError,
};

#[derive(Default)]
pub struct InMemoryDeviceRepository {
    devices: Mutex<Vec<Device>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, deleted ones included.
    pub async fn snapshot(&self) -> Vec<Device> {
        self.devices.lock().await.clone()
    }
}

fn matches(device: &Device, filter: &DeviceFilter) -> bool {
    let status_ok = match filter.status {
        Some(status) => device.status == status,
        None => device.status != DeviceStatus::Deleted,
    };
    let owner_ok = filter.owner.as_ref().is_none_or(|owner| &device.owner == owner);
    status_ok && owner_ok
}

/// A fresh active device record.
pub fn sample_device(name: &str, owner: &str) -> Device {
    let now = Utc::now();
    Device {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        owner: owner.to_string(),
        description: String::new(),
        status: DeviceStatus::Active,
        jid: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn create(&self, device: &Device) -> Result<(), WamuxError> {
        let mut devices = self.devices.lock().await;
        if devices.iter().any(|d| d.id == device.id) {
            return Err(WamuxError::conflict(format!("device id '{}' already exists", device.id)));
        }
        if devices
            .iter()
            .any(|d| d.name == device.name && d.status != DeviceStatus::Deleted)
        {
            return Err(WamuxError::conflict(format!(
                "device '{}' already exists",
                device.name
            )));
        }
        devices.push(device.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Device>, WamuxError> {
        Ok(self.devices.lock().await.iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Device>, WamuxError> {
        Ok(self
            .devices
            .lock()
            .await
            .iter()
            .find(|d| d.name == name && d.status != DeviceStatus::Deleted)
            .cloned())
    }

    async fn find_all(
        &self,
        filter: &DeviceFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Device>, WamuxError> {
        let mut found: Vec<Device> = self
            .devices
            .lock()
            .await
            .iter()
            .filter(|d| matches(d, filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found.into_iter().skip(skip).take(limit).collect())
    }

    async fn update(&self, device: &Device) -> Result<(), WamuxError> {
        let mut devices = self.devices.lock().await;
        let slot = devices
            .iter_mut()
            .find(|d| d.id == device.id)
            .ok_or_else(|| WamuxError::not_found(format!("device id '{}'", device.id)))?;
        *slot = Device {
            updated_at: Utc::now(),
            ..device.clone()
        };
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), WamuxError> {
        self.update_status(id, DeviceStatus::Deleted).await
    }

    async fn count(&self, filter: &DeviceFilter) -> Result<u64, WamuxError> {
        let devices = self.devices.lock().await;
        Ok(devices.iter().filter(|d| matches(d, filter)).count() as u64)
    }

    async fn update_jid(&self, id: &str, jid: &str) -> Result<(), WamuxError> {
        let mut devices = self.devices.lock().await;
        let device = devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| WamuxError::not_found(format!("device id '{id}'")))?;
        device.jid = Some(jid.to_string());
        device.updated_at = Utc::now();
        Ok(())
    }

    async fn update_status(&self, id: &str, status: DeviceStatus) -> Result<(), WamuxError> {
        let mut devices = self.devices.lock().await;
        let device = devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| WamuxError::not_found(format!("device id '{id}'")))?;
        device.status = status;
        device.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryApiKeyRepository {
    keys: Mutex<Vec<ApiKey>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<ApiKey> {
        self.keys.lock().await.clone()
    }

    /// Overwrites a stored record as-is, bypassing service rules.
    pub async fn put(&self, key: ApiKey) {
        let mut keys = self.keys.lock().await;
        keys.retain(|k| k.id != key.id);
        keys.push(key);
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn create(&self, key: &ApiKey) -> Result<(), WamuxError> {
        let mut keys = self.keys.lock().await;
        if keys.iter().any(|k| k.id == key.id || k.key_hash == key.key_hash) {
            return Err(WamuxError::conflict("API key already exists"));
        }
        keys.push(key.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ApiKey>, WamuxError> {
        Ok(self.keys.lock().await.iter().find(|k| k.id == id).cloned())
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, WamuxError> {
        Ok(self
            .keys
            .lock()
            .await
            .iter()
            .find(|k| k.key_hash == key_hash)
            .cloned())
    }

    async fn find_by_owner(
        &self,
        owner: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ApiKey>, WamuxError> {
        let mut found: Vec<ApiKey> = self
            .keys
            .lock()
            .await
            .iter()
            .filter(|k| k.owner == owner)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found.into_iter().skip(skip).take(limit).collect())
    }

    async fn count_by_owner(&self, owner: &str) -> Result<u64, WamuxError> {
        let keys = self.keys.lock().await;
        Ok(keys.iter().filter(|k| k.owner == owner).count() as u64)
    }

    async fn update(&self, key: &ApiKey) -> Result<(), WamuxError> {
        let mut keys = self.keys.lock().await;
        let slot = keys
            .iter_mut()
            .find(|k| k.id == key.id)
            .ok_or_else(|| WamuxError::not_found(format!("API key '{}'", key.id)))?;
        *slot = ApiKey {
            updated_at: Utc::now(),
            ..key.clone()
        };
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), WamuxError> {
        let mut keys = self.keys.lock().await;
        let before = keys.len();
        keys.retain(|k| k.id != id);
        if keys.len() == before {
            return Err(WamuxError::not_found(format!("API key '{id}'")));
        }
        Ok(())
    }

    async fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> Result<(), WamuxError> {
        let mut keys = self.keys.lock().await;
        let key = keys
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| WamuxError::not_found(format!("API key '{id}'")))?;
        key.last_used_at = Some(at);
        key.updated_at = at;
        Ok(())
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, WamuxError> {
        let mut keys = self.keys.lock().await;
        let mut changed = 0;
        for key in keys.iter_mut().filter(|k| {
            k.status == ApiKeyStatus::Active && k.expires_at.is_some_and(|at| at <= now)
        }) {
            key.status = ApiKeyStatus::Expired;
            key.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }
}

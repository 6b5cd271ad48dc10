// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device record use cases.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use wamux_core::validation::validate_device_name;
use wamux_core::{
    CreateDeviceRequest, Device, DeviceFilter, DeviceRepository, DeviceStatus, ErrorKind,
    UpdateDeviceRequest, WamuxError,
};
use wamux_session::{ConnectionChange, SessionManager};

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;

/// One page of a device listing.
#[derive(Debug, Clone, Serialize)]
pub struct DevicePage {
    pub devices: Vec<Device>,
    /// Matching records across all pages.
    pub total: u64,
    pub skip: usize,
    pub limit: usize,
}

pub struct DeviceService {
    repository: Arc<dyn DeviceRepository>,
    manager: Option<Arc<SessionManager>>,
}

impl DeviceService {
    pub fn new(repository: Arc<dyn DeviceRepository>) -> Self {
        Self {
            repository,
            manager: None,
        }
    }

    /// Removes live clients when their record is deleted.
    pub fn with_manager(mut self, manager: Arc<SessionManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub async fn create_device(&self, request: CreateDeviceRequest) -> Result<Device, WamuxError> {
        info!(device = %request.name, owner = %request.owner, "creating device");
        validate_device_name(&request.name)?;
        if request.owner.trim().is_empty() {
            return Err(WamuxError::validation("device owner is required"));
        }
        if self.repository.find_by_name(&request.name).await?.is_some() {
            return Err(WamuxError::conflict(format!(
                "device '{}' already exists",
                request.name
            )));
        }

        let now = Utc::now();
        let device = Device {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            owner: request.owner,
            description: request.description,
            status: DeviceStatus::Active,
            jid: None,
            created_at: now,
            updated_at: now,
        };
        self.repository.create(&device).await?;
        info!(device = %device.name, id = %device.id, "device created");
        Ok(device)
    }

    pub async fn get_device(&self, id: &str) -> Result<Device, WamuxError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| WamuxError::not_found(format!("device id '{id}'")))
    }

    pub async fn get_device_by_name(&self, name: &str) -> Result<Device, WamuxError> {
        self.repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| WamuxError::not_found(format!("device '{name}'")))
    }

    /// Lists records newest first. `limit` defaults to 20 and is clamped to
    /// 1..=100.
    pub async fn list_devices(
        &self,
        filter: &DeviceFilter,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<DevicePage, WamuxError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let total = self.repository.count(filter).await?;
        let devices = self.repository.find_all(filter, skip, limit).await?;
        debug!(count = devices.len(), total, skip, limit, "devices listed");
        Ok(DevicePage {
            devices,
            total,
            skip,
            limit,
        })
    }

    /// Applies the fields that are set. A new name is validated and must not
    /// belong to another live device.
    pub async fn update_device(
        &self,
        id: &str,
        request: UpdateDeviceRequest,
    ) -> Result<Device, WamuxError> {
        let mut device = self.get_device(id).await?;
        if device.status == DeviceStatus::Deleted {
            return Err(WamuxError::not_found(format!("device id '{id}'")));
        }

        if let Some(name) = request.name.filter(|name| *name != device.name) {
            validate_device_name(&name)?;
            if self.repository.find_by_name(&name).await?.is_some() {
                return Err(WamuxError::conflict(format!("device '{name}' already exists")));
            }
            device.name = name;
        }
        if let Some(description) = request.description {
            device.description = description;
        }
        if let Some(status) = request.status {
            if status == DeviceStatus::Deleted {
                return Err(WamuxError::validation("use delete to remove a device"));
            }
            device.status = status;
        }

        self.repository.update(&device).await?;
        info!(device = %device.name, id = %device.id, "device updated");
        self.get_device(id).await
    }

    /// Removes the live client (failures are logged), then soft-deletes.
    pub async fn delete_device(&self, id: &str) -> Result<(), WamuxError> {
        let device = self.get_device(id).await?;
        if device.status == DeviceStatus::Deleted {
            return Err(WamuxError::not_found(format!("device id '{id}'")));
        }

        if let Some(manager) = &self.manager {
            match manager.remove_client(&device.name).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(device = %device.name, error = %e, "failed to remove live client"),
            }
        }

        self.repository.delete(id).await?;
        info!(device = %device.name, id = %id, "device deleted");
        Ok(())
    }
}

/// Records the JID of a device whose connection was just established.
/// Devices without a record are ignored.
pub async fn sync_connection_change(
    repository: &dyn DeviceRepository,
    change: &ConnectionChange,
) -> Result<(), WamuxError> {
    let Some(jid) = change.jid.as_deref().filter(|_| change.connected) else {
        return Ok(());
    };
    let Some(device) = repository.find_by_name(&change.device_name).await? else {
        debug!(device = %change.device_name, "no device record to update");
        return Ok(());
    };
    if device.jid.as_deref() == Some(jid) {
        return Ok(());
    }
    repository.update_jid(&device.id, jid).await?;
    info!(device = %change.device_name, jid = %jid, "device JID recorded");
    Ok(())
}

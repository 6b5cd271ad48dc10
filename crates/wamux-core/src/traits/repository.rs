// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence ports for device records and API keys.

use async_trait::async_trait;

use chrono::{DateTime, Utc};

use crate::api_key::ApiKey;
use crate::error::WamuxError;
use crate::types::{Device, DeviceFilter, DeviceStatus};

/// CRUD contract over [`Device`] records.
///
/// Deletion is a soft delete that sets [`DeviceStatus::Deleted`]. Listings
/// and counts without a status filter exclude deleted records. Mutations on
/// an unknown id return [`WamuxError::NotFound`].
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn create(&self, device: &Device) -> Result<(), WamuxError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Device>, WamuxError>;

    /// Looks up a live (not deleted) device by its unique name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Device>, WamuxError>;

    /// Newest first.
    async fn find_all(
        &self,
        filter: &DeviceFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Device>, WamuxError>;

    async fn update(&self, device: &Device) -> Result<(), WamuxError>;

    async fn delete(&self, id: &str) -> Result<(), WamuxError>;

    async fn count(&self, filter: &DeviceFilter) -> Result<u64, WamuxError>;

    async fn update_jid(&self, id: &str, jid: &str) -> Result<(), WamuxError>;

    async fn update_status(&self, id: &str, status: DeviceStatus) -> Result<(), WamuxError>;
}

/// Storage contract over [`ApiKey`] records, looked up by id or by the
/// digest of the plaintext key. Mutations on an unknown id return
/// [`WamuxError::NotFound`]; a duplicate digest is a
/// [`WamuxError::Conflict`].
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn create(&self, key: &ApiKey) -> Result<(), WamuxError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ApiKey>, WamuxError>;

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, WamuxError>;

    /// Newest first.
    async fn find_by_owner(
        &self,
        owner: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ApiKey>, WamuxError>;

    async fn count_by_owner(&self, owner: &str) -> Result<u64, WamuxError>;

    async fn update(&self, key: &ApiKey) -> Result<(), WamuxError>;

    /// Hard delete.
    async fn delete(&self, id: &str) -> Result<(), WamuxError>;

    async fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> Result<(), WamuxError>;

    /// Marks every active key whose expiry is at or before `now` as expired.
    /// Returns how many keys changed.
    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, WamuxError>;
}

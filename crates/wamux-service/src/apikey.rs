// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key use cases: generation, listing, validation, revocation, and
//! partial updates.
//!
//! Keys are 64 random bytes, hex-encoded. Only their SHA-256 digest is
//! stored, so a key can be shown exactly once.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ring::digest::{SHA256, digest};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;
use tracing::{debug, info, warn};

use wamux_core::{
    ApiKey, ApiKeyPermission, ApiKeyRepository, ApiKeyStatus, CreateApiKeyRequest,
    GeneratedApiKey, UpdateApiKeyRequest, WamuxError,
};

/// Random bytes per key; the encoded key is twice as long.
pub const KEY_BYTES: usize = 64;
pub const DEFAULT_KEY_PAGE_LIMIT: usize = 50;
pub const MAX_KEY_PAGE_LIMIT: usize = 100;

const HINT_LEN: usize = 8;
const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 100;

/// One page of an owner's keys. Plaintext is never included.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyPage {
    pub keys: Vec<ApiKey>,
    pub total: u64,
    pub skip: usize,
    pub limit: usize,
}

/// Hex SHA-256 of a plaintext key, as stored by repositories.
pub fn hash_key(key: &str) -> String {
    hex::encode(digest(&SHA256, key.as_bytes()))
}

fn require_owner(owner: &str) -> Result<(), WamuxError> {
    if owner.trim().is_empty() {
        return Err(WamuxError::validation("owner is required"));
    }
    Ok(())
}

fn validate_key_name(name: &str) -> Result<(), WamuxError> {
    let len = name.trim().chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(WamuxError::validation(format!(
            "API key name must be {MIN_NAME_LEN} to {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub struct ApiKeyService {
    repository: Arc<dyn ApiKeyRepository>,
    rng: SystemRandom,
}

impl ApiKeyService {
    pub fn new(repository: Arc<dyn ApiKeyRepository>) -> Self {
        Self {
            repository,
            rng: SystemRandom::new(),
        }
    }

    fn random_key(&self) -> Result<String, WamuxError> {
        let mut bytes = [0u8; KEY_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| WamuxError::internal_msg("failed to generate API key"))?;
        Ok(hex::encode(bytes))
    }

    /// Creates an active key for `owner`. Without explicit permissions the
    /// key gets full access; a zero `expires_in_days` never expires.
    pub async fn generate_key(
        &self,
        owner: &str,
        request: CreateApiKeyRequest,
    ) -> Result<GeneratedApiKey, WamuxError> {
        require_owner(owner)?;
        validate_key_name(&request.name)?;

        let plaintext = self.random_key()?;
        let now = Utc::now();
        let permissions = if request.permissions.is_empty() {
            vec![ApiKeyPermission::full_access()]
        } else {
            request.permissions
        };
        let expires_at = (request.expires_in_days > 0)
            .then(|| now + Duration::days(i64::from(request.expires_in_days)));

        let record = ApiKey {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            owner: owner.to_string(),
            key_hash: hash_key(&plaintext),
            key_hint: plaintext[plaintext.len() - HINT_LEN..].to_string(),
            permissions,
            status: ApiKeyStatus::Active,
            rate_limit: request.rate_limit,
            last_used_at: None,
            expires_at,
            created_at: now,
            updated_at: now,
        };
        self.repository.create(&record).await?;
        info!(id = %record.id, name = %record.name, owner = %owner, "API key generated");

        Ok(GeneratedApiKey {
            key: plaintext,
            record,
        })
    }

    /// Lists `owner`'s keys newest first. `limit` defaults to 50 and is
    /// clamped to 1..=100.
    pub async fn list_keys(
        &self,
        owner: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<ApiKeyPage, WamuxError> {
        require_owner(owner)?;
        let limit = limit.unwrap_or(DEFAULT_KEY_PAGE_LIMIT).clamp(1, MAX_KEY_PAGE_LIMIT);
        let total = self.repository.count_by_owner(owner).await?;
        let keys = self.repository.find_by_owner(owner, skip, limit).await?;
        debug!(owner = %owner, count = keys.len(), total, skip, limit, "API keys listed");
        Ok(ApiKeyPage {
            keys,
            total,
            skip,
            limit,
        })
    }

    /// A key owned by someone else is reported as missing.
    pub async fn get_key(&self, id: &str, owner: &str) -> Result<ApiKey, WamuxError> {
        require_owner(owner)?;
        self.repository
            .find_by_id(id)
            .await?
            .filter(|key| key.owner == owner)
            .ok_or_else(|| WamuxError::not_found(format!("API key '{id}'")))
    }

    /// Resolves a presented plaintext key to its record and records the use.
    pub async fn validate_key(&self, key: &str) -> Result<ApiKey, WamuxError> {
        if key.trim().is_empty() {
            return Err(WamuxError::validation("API key is required"));
        }

        let Some(mut record) = self.repository.find_by_hash(&hash_key(key)).await? else {
            warn!("invalid API key presented");
            return Err(WamuxError::unauthorized("invalid API key"));
        };

        if !record.is_active() {
            warn!(id = %record.id, status = %record.status, "inactive API key presented");
            if record.status == ApiKeyStatus::Expired || record.is_expired() {
                return Err(WamuxError::unauthorized("API key has expired"));
            }
            return Err(WamuxError::unauthorized("API key is not active"));
        }

        let now = Utc::now();
        match self.repository.touch_last_used(&record.id, now).await {
            Ok(()) => record.last_used_at = Some(now),
            Err(e) => warn!(id = %record.id, error = %e, "failed to record API key use"),
        }
        debug!(id = %record.id, owner = %record.owner, "API key validated");
        Ok(record)
    }

    pub async fn validate_with_permission(
        &self,
        key: &str,
        resource: &str,
        action: &str,
    ) -> Result<ApiKey, WamuxError> {
        let record = self.validate_key(key).await?;
        if !record.has_permission(resource, action) {
            warn!(id = %record.id, resource, action, "API key lacks permission");
            return Err(WamuxError::unauthorized(
                "insufficient permissions for this operation",
            ));
        }
        Ok(record)
    }

    /// Deletes the key. Only its owner may revoke it.
    pub async fn revoke_key(&self, id: &str, owner: &str) -> Result<(), WamuxError> {
        let record = self.owned(id, owner, "revoke").await?;
        self.repository.delete(id).await?;
        info!(id = %id, name = %record.name, owner = %owner, "API key revoked");
        Ok(())
    }

    /// Applies the fields that are set. Expired keys cannot be modified and
    /// no key can be set to expired by hand.
    pub async fn update_key(
        &self,
        id: &str,
        owner: &str,
        request: UpdateApiKeyRequest,
    ) -> Result<ApiKey, WamuxError> {
        let mut record = self.owned(id, owner, "update").await?;
        if record.status == ApiKeyStatus::Expired || record.is_expired() {
            return Err(WamuxError::validation("cannot modify expired API key"));
        }

        if let Some(name) = request.name {
            validate_key_name(&name)?;
            record.name = name.trim().to_string();
        }
        if let Some(rate_limit) = request.rate_limit {
            record.rate_limit = rate_limit;
        }
        if let Some(permissions) = request.permissions {
            record.permissions = permissions;
        }
        if let Some(status) = request.status {
            if status == ApiKeyStatus::Expired {
                return Err(WamuxError::validation(
                    "cannot manually set key to expired status",
                ));
            }
            record.status = status;
        }

        self.repository.update(&record).await?;
        info!(id = %id, owner = %owner, "API key updated");
        self.get_key(id, owner).await
    }

    /// Moves lapsed active keys to [`ApiKeyStatus::Expired`].
    pub async fn cleanup_expired(&self) -> Result<u64, WamuxError> {
        let expired = self.repository.expire_stale(Utc::now()).await?;
        if expired > 0 {
            info!(expired, "expired API keys marked");
        }
        Ok(expired)
    }

    async fn owned(&self, id: &str, owner: &str, action: &str) -> Result<ApiKey, WamuxError> {
        if id.trim().is_empty() {
            return Err(WamuxError::validation("key ID is required"));
        }
        require_owner(owner)?;
        let record = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| WamuxError::not_found(format!("API key '{id}'")))?;
        if record.owner != owner {
            warn!(id = %id, owner = %owner, actual_owner = %record.owner, action, "API key owner mismatch");
            return Err(WamuxError::unauthorized(format!(
                "you are not authorized to {action} this API key"
            )));
        }
        Ok(record)
    }
}

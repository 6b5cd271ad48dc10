// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key records and their permission model.
//!
//! Only a SHA-256 digest of a key is persisted. The plaintext is handed to
//! the caller once, at generation, and listings show a short hint instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Wildcard accepted in both the resource and the action of a permission.
pub const WILDCARD: &str = "*";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApiKeyStatus {
    #[default]
    Active,
    Inactive,
    Revoked,
    /// Set by the expiry sweep; never assigned by callers.
    Expired,
}

/// Grants `actions` (such as `read` or `write`) on one resource
/// (such as `devices` or `messages`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyPermission {
    pub resource: String,
    pub actions: Vec<String>,
}

impl ApiKeyPermission {
    pub fn new(resource: impl Into<String>, actions: &[&str]) -> Self {
        Self {
            resource: resource.into(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Every action on every resource. Granted when a key is created
    /// without explicit permissions.
    pub fn full_access() -> Self {
        Self::new(WILDCARD, &[WILDCARD])
    }

    pub fn allows(&self, resource: &str, action: &str) -> bool {
        (self.resource == WILDCARD || self.resource == resource)
            && self.actions.iter().any(|a| a == WILDCARD || a == action)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    /// Username of the key's owner.
    pub owner: String,
    /// Hex SHA-256 of the plaintext key. Never serialized.
    #[serde(skip)]
    pub key_hash: String,
    /// Last characters of the plaintext, for display.
    pub key_hint: String,
    pub permissions: Vec<ApiKeyPermission>,
    pub status: ApiKeyStatus,
    /// Requests per minute; zero means unlimited.
    pub rate_limit: u32,
    pub last_used_at: Option<DateTime<Utc>>,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_active(&self) -> bool {
        self.status == ApiKeyStatus::Active && !self.is_expired()
    }

    /// A key with no permission entries may do anything.
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        self.permissions.is_empty() || self.permissions.iter().any(|p| p.allows(resource, action))
    }

    /// The hint as shown in listings, e.g. `...3f9a01bc`.
    pub fn masked_key(&self) -> String {
        format!("...{}", self.key_hint)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    /// Empty grants [`ApiKeyPermission::full_access`].
    #[serde(default)]
    pub permissions: Vec<ApiKeyPermission>,
    #[serde(default)]
    pub rate_limit: u32,
    /// Days until expiry; zero never expires.
    #[serde(default)]
    pub expires_in_days: u32,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub name: Option<String>,
    pub permissions: Option<Vec<ApiKeyPermission>>,
    pub rate_limit: Option<u32>,
    pub status: Option<ApiKeyStatus>,
}

/// A freshly generated key. `key` is the only copy of the plaintext.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedApiKey {
    pub key: String,
    #[serde(flatten)]
    pub record: ApiKey,
}

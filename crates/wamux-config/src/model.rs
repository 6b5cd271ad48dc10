// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for wamux.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level wamux configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WamuxConfig {
    /// Process identity, logging, and shutdown settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Session manager and device client settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Device record storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound on disconnecting all devices at shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_app_name() -> String {
    "wamux".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

/// Session manager configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Directory holding one `<device>_store.db` credential file per device.
    #[serde(default = "default_stores_dir")]
    pub stores_dir: String,

    /// Maximum inbound messages processed concurrently per device.
    /// A value of 1 gives strict per-device arrival order.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Inbound messages buffered per device before new arrivals are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long a QR request waits for a code, and how long a code stays cached.
    #[serde(default = "default_qr_timeout_secs")]
    pub qr_timeout_secs: u64,

    /// Attempts per group when fetching group metadata.
    #[serde(default = "default_group_info_retries")]
    pub group_info_retries: u32,

    /// Base of the linear backoff between group metadata attempts.
    #[serde(default = "default_group_retry_backoff_ms")]
    pub group_retry_backoff_ms: u64,

    /// Delete a device's credential file when its client is removed.
    #[serde(default = "default_true")]
    pub purge_session_on_remove: bool,

    /// Reconnect already-paired devices found in the stores directory at startup.
    #[serde(default = "default_true")]
    pub auto_connect: bool,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            stores_dir: default_stores_dir(),
            max_concurrency: default_max_concurrency(),
            queue_capacity: default_queue_capacity(),
            qr_timeout_secs: default_qr_timeout_secs(),
            group_info_retries: default_group_info_retries(),
            group_retry_backoff_ms: default_group_retry_backoff_ms(),
            purge_session_on_remove: true,
            auto_connect: true,
        }
    }
}

impl WhatsAppConfig {
    pub fn qr_timeout(&self) -> Duration {
        Duration::from_secs(self.qr_timeout_secs)
    }

    pub fn group_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.group_retry_backoff_ms)
    }
}

fn default_stores_dir() -> String {
    "./stores".to_string()
}

fn default_max_concurrency() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    256
}

fn default_qr_timeout_secs() -> u64 {
    30
}

fn default_group_info_retries() -> u32 {
    3
}

fn default_group_retry_backoff_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file holding device records.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("wamux").join("wamux.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("wamux.db"))
        .to_string_lossy()
        .into_owned()
}

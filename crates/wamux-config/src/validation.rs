// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths and bounded timeouts.

use crate::diagnostic::ConfigError;
use crate::model::WamuxConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Longest QR wait accepted; pairing codes rotate well before this.
const MAX_QR_TIMEOUT_SECS: u64 = 300;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WamuxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    let level = config.app.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        invalid(format!(
            "app.log_level `{}` must be one of: {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.app.shutdown_timeout_secs == 0 {
        invalid("app.shutdown_timeout_secs must be at least 1".to_string());
    }

    let whatsapp = &config.whatsapp;
    if whatsapp.stores_dir.trim().is_empty() {
        invalid("whatsapp.stores_dir must not be empty".to_string());
    }

    if whatsapp.max_concurrency == 0 {
        invalid("whatsapp.max_concurrency must be at least 1".to_string());
    }

    if whatsapp.queue_capacity == 0 {
        invalid("whatsapp.queue_capacity must be at least 1".to_string());
    }

    if !(1..=MAX_QR_TIMEOUT_SECS).contains(&whatsapp.qr_timeout_secs) {
        invalid(format!(
            "whatsapp.qr_timeout_secs must be between 1 and {MAX_QR_TIMEOUT_SECS}, got {}",
            whatsapp.qr_timeout_secs
        ));
    }

    if whatsapp.group_info_retries == 0 {
        invalid("whatsapp.group_info_retries must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

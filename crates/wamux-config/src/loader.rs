// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wamux.toml` > `~/.config/wamux/wamux.toml` > `/etc/wamux/wamux.toml`
//! with environment variable overrides via `WAMUX_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WamuxConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/wamux/wamux.toml";
pub(crate) const LOCAL_CONFIG: &str = "wamux.toml";

/// Top-level sections recognised in `WAMUX_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["app", "whatsapp", "storage"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wamux/wamux.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wamux/wamux.toml` (system-wide)
/// 3. `~/.config/wamux/wamux.toml` (user XDG config)
/// 4. `./wamux.toml` (local directory)
/// 5. `WAMUX_*` environment variables
pub fn load_config() -> Result<WamuxConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
pub fn load_config_from_str(toml_content: &str) -> Result<WamuxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WamuxConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WamuxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WamuxConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WamuxConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps `WAMUX_WHATSAPP_STORES_DIR` to `whatsapp.stores_dir`.
///
/// Only the leading section name is split off, so keys that themselves
/// contain underscores stay intact.
fn env_provider() -> Env {
    Env::prefixed("WAMUX_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    ENV_SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or(key)
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline admin commands: config check, session listing, device records,
//! and API keys.

use std::sync::Arc;

use wamux::{App, OfflineConnector};
use wamux_config::WamuxConfig;
use wamux_core::{
    ApiKey, CreateApiKeyRequest, CreateDeviceRequest, Device, DeviceFilter, DeviceStatus,
    WamuxError,
};
use wamux_session::SessionStore;

/// Prints the effective configuration in TOML form.
pub fn run_check(config: &WamuxConfig) -> Result<(), WamuxError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| WamuxError::internal("failed to render configuration", e))?;
    println!("config ok\n\n{rendered}");
    Ok(())
}

pub async fn run_sessions(config: &WamuxConfig) -> Result<(), WamuxError> {
    let store = SessionStore::new(&config.whatsapp.stores_dir);
    if !store.dir().is_dir() {
        println!("stores directory {} does not exist", store.dir().display());
        return Ok(());
    }
    let names = store.scan().await?;
    if names.is_empty() {
        println!("no sessions in {}", store.dir().display());
        return Ok(());
    }
    for name in names {
        println!("{name}\t{}", store.store_path(&name).display());
    }
    Ok(())
}

pub async fn run_devices_list(
    config: WamuxConfig,
    owner: Option<String>,
    status: Option<DeviceStatus>,
    skip: usize,
    limit: Option<usize>,
) -> Result<(), WamuxError> {
    let app = App::build(config, Arc::new(OfflineConnector)).await?;
    let filter = DeviceFilter { owner, status };
    let page = app.devices().list_devices(&filter, skip, limit).await?;

    for device in &page.devices {
        println!("{}", format_device(device));
    }
    println!(
        "{} of {} device(s) (skip {}, limit {})",
        page.devices.len(),
        page.total,
        page.skip,
        page.limit
    );
    Ok(())
}

pub async fn run_devices_create(
    config: WamuxConfig,
    name: String,
    owner: String,
    description: Option<String>,
) -> Result<(), WamuxError> {
    let app = App::build(config, Arc::new(OfflineConnector)).await?;
    let device = app
        .devices()
        .create_device(CreateDeviceRequest {
            name,
            owner,
            description: description.unwrap_or_default(),
        })
        .await?;
    println!("created {}", format_device(&device));
    Ok(())
}

pub async fn run_devices_delete(config: WamuxConfig, id: String) -> Result<(), WamuxError> {
    let app = App::build(config, Arc::new(OfflineConnector)).await?;
    app.devices().delete_device(&id).await?;
    println!("deleted {id}");
    Ok(())
}

pub async fn run_keys_generate(
    config: WamuxConfig,
    owner: String,
    request: CreateApiKeyRequest,
) -> Result<(), WamuxError> {
    let app = App::build(config, Arc::new(OfflineConnector)).await?;
    let generated = app.api_keys().generate_key(&owner, request).await?;
    println!("created {}", format_key(&generated.record));
    println!("key: {}", generated.key);
    println!("store this key now; it cannot be shown again");
    Ok(())
}

pub async fn run_keys_list(
    config: WamuxConfig,
    owner: String,
    skip: usize,
    limit: Option<usize>,
) -> Result<(), WamuxError> {
    let app = App::build(config, Arc::new(OfflineConnector)).await?;
    let page = app.api_keys().list_keys(&owner, skip, limit).await?;
    for key in &page.keys {
        println!("{}", format_key(key));
    }
    println!(
        "{} of {} key(s) (skip {}, limit {})",
        page.keys.len(),
        page.total,
        page.skip,
        page.limit
    );
    Ok(())
}

pub async fn run_keys_revoke(config: WamuxConfig, id: String, owner: String) -> Result<(), WamuxError> {
    let app = App::build(config, Arc::new(OfflineConnector)).await?;
    app.api_keys().revoke_key(&id, &owner).await?;
    println!("revoked {id}");
    Ok(())
}

fn format_key(key: &ApiKey) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        key.id,
        key.name,
        key.masked_key(),
        key.status,
        key.expires_at
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339()),
        key.last_used_at
            .map_or_else(|| "-".to_string(), |at| at.to_rfc3339()),
    )
}

fn format_device(device: &Device) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        device.id,
        device.name,
        device.owner,
        device.status,
        device.jid.as_deref().unwrap_or("-")
    )
}

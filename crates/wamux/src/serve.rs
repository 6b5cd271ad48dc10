// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wamux serve` command implementation.
//!
//! Builds the application container, loads existing sessions, and waits for
//! SIGINT/SIGTERM before disconnecting every device.

use std::sync::Arc;

use tracing::info;

use wamux::shutdown::install_signal_handler;
use wamux::{App, OfflineConnector};
use wamux_config::WamuxConfig;
use wamux_core::WamuxError;

pub async fn run_serve(config: WamuxConfig) -> Result<(), WamuxError> {
    info!("starting wamux serve");

    let app = App::build(config, Arc::new(OfflineConnector)).await?;
    let loaded = app.start().await;
    info!(
        loaded,
        connected = app.manager().connected_count().await,
        "wamux ready"
    );

    let token = install_signal_handler();
    token.cancelled().await;

    app.shutdown().await?;
    info!("wamux stopped");
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connector used when no wire-protocol driver is linked in.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use wamux_core::{ProtocolConnector, ProtocolSession, WamuxError};

/// Reports every open as a connection failure. Session files stay on disk
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineConnector;

#[async_trait]
impl ProtocolConnector for OfflineConnector {
    async fn open(
        &self,
        device_name: &str,
        store_path: &Path,
    ) -> Result<ProtocolSession, WamuxError> {
        debug!(device = %device_name, store = %store_path.display(), "offline connector refused open");
        Err(WamuxError::Connection {
            message: format!("no WhatsApp protocol driver available for device '{device_name}'"),
            source: None,
        })
    }
}

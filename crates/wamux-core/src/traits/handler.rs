// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receiver of device-client events.

use async_trait::async_trait;

use crate::error::WamuxError;
use crate::types::WhatsAppMessage;

/// Fan-out point for events raised by device clients.
///
/// Connection, QR, and error callbacks run synchronously on the client's
/// dispatcher in protocol-arrival order and must not block. Message handling
/// is asynchronous and runs on the client's inbound queue.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn on_connected(&self, device_name: &str, jid: &str);

    fn on_disconnected(&self, device_name: &str, reason: &str);

    fn on_qr_code(&self, device_name: &str, code: &str);

    async fn on_message(&self, device_name: &str, message: WhatsAppMessage);

    fn on_error(&self, device_name: &str, error: &WamuxError);
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default event handler: routes inbound messages through the processor
//! registry and fans connection changes out to registered callbacks.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use wamux_core::{EventHandler, IncomingMessage, WamuxError, WhatsAppMessage};

use crate::registry::ProcessorRegistry;

/// A device connected or disconnected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionChange {
    pub device_name: String,
    pub connected: bool,
    pub jid: Option<String>,
    pub reason: Option<String>,
}

pub type MessageCallback =
    Arc<dyn Fn(&str, &WhatsAppMessage) -> Result<(), WamuxError> + Send + Sync>;
pub type ConnectionCallback = Arc<dyn Fn(&ConnectionChange) + Send + Sync>;

pub struct DefaultEventHandler {
    registry: Arc<ProcessorRegistry>,
    message_handlers: Vec<MessageCallback>,
    connection_handlers: Vec<ConnectionCallback>,
}

impl DefaultEventHandler {
    pub fn new(registry: Arc<ProcessorRegistry>) -> Self {
        Self {
            registry,
            message_handlers: Vec::new(),
            connection_handlers: Vec::new(),
        }
    }

    /// Adds a callback invoked for every inbound message after the registry.
    pub fn with_message_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &WhatsAppMessage) -> Result<(), WamuxError> + Send + Sync + 'static,
    {
        self.message_handlers.push(Arc::new(handler));
        self
    }

    pub fn with_connection_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ConnectionChange) + Send + Sync + 'static,
    {
        self.connection_handlers.push(Arc::new(handler));
        self
    }

    pub fn registry(&self) -> &Arc<ProcessorRegistry> {
        &self.registry
    }

    fn notify_connection(&self, change: ConnectionChange) {
        for handler in &self.connection_handlers {
            handler(&change);
        }
    }
}

#[async_trait]
impl EventHandler for DefaultEventHandler {
    fn on_connected(&self, device_name: &str, jid: &str) {
        info!(device = %device_name, jid = %jid, "connection established");
        self.notify_connection(ConnectionChange {
            device_name: device_name.to_string(),
            connected: true,
            jid: Some(jid.to_string()),
            reason: None,
        });
    }

    fn on_disconnected(&self, device_name: &str, reason: &str) {
        info!(device = %device_name, reason = %reason, "connection lost");
        self.notify_connection(ConnectionChange {
            device_name: device_name.to_string(),
            connected: false,
            jid: None,
            reason: Some(reason.to_string()),
        });
    }

    fn on_qr_code(&self, device_name: &str, _code: &str) {
        debug!(device = %device_name, "QR code available");
    }

    async fn on_message(&self, device_name: &str, message: WhatsAppMessage) {
        let incoming = IncomingMessage::from_whatsapp(device_name, &message);
        if let Err(e) = self.registry.process(&incoming).await {
            warn!(device = %device_name, message_id = %message.id, error = %e, "message processing failed");
        }

        for handler in &self.message_handlers {
            if let Err(e) = handler(device_name, &message) {
                warn!(device = %device_name, message_id = %message.id, error = %e, "message handler failed");
            }
        }
    }

    fn on_error(&self, device_name: &str, error: &WamuxError) {
        warn!(device = %device_name, error = %error, kind = %error.kind(), "device error");
    }
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp device operations.
//!
//! Each operation resolves the device client through the
//! [`SessionManager`], validates input, and maps failures: caller mistakes
//! (validation, not-found, conflict) pass through unchanged, anything else
//! is wrapped in the kind the operation owns. Nothing here retries.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use wamux_core::validation::{validate_device_name, validate_jid_for};
use wamux_core::{
    ConnectionInfo, MessageType, QrCodeResponse, ReceiverType, SendMessageParams, WamuxError,
    WhatsAppContact, WhatsAppGroup,
};
use wamux_session::{Attachment, DeviceClient, SessionManager};

/// Keeps caller-mistake kinds, wraps everything else with `wrap`.
fn map_failure(
    error: WamuxError,
    wrap: impl FnOnce(WamuxError) -> WamuxError,
) -> WamuxError {
    if error.kind().is_caller_error() {
        error
    } else {
        wrap(error)
    }
}

fn as_whatsapp(message: &'static str) -> impl FnOnce(WamuxError) -> WamuxError {
    move |e| WamuxError::whatsapp(message, e)
}

pub struct WhatsAppService {
    manager: Arc<SessionManager>,
}

impl WhatsAppService {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    async fn resolve(&self, device_name: &str) -> Result<Arc<DeviceClient>, WamuxError> {
        self.manager
            .get_client(device_name)
            .await
            .ok_or_else(|| WamuxError::not_found(format!("device '{device_name}'")))
    }

    async fn resolve_or_create(&self, device_name: &str) -> Result<Arc<DeviceClient>, WamuxError> {
        validate_device_name(device_name)?;
        if let Some(client) = self.manager.get_client(device_name).await {
            return Ok(client);
        }
        self.manager.create_client(device_name).await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to create device client");
            WamuxError::internal("failed to create WhatsApp client", e)
        })
    }

    async fn resolve_connected(&self, device_name: &str) -> Result<Arc<DeviceClient>, WamuxError> {
        let client = self.resolve(device_name).await?;
        if !client.is_connected() {
            return Err(WamuxError::not_connected(device_name));
        }
        Ok(client)
    }

    /// Connects a device, creating its client when none is live yet.
    pub async fn connect_device(&self, device_name: &str) -> Result<(), WamuxError> {
        info!(device = %device_name, "connecting device");
        let client = self.resolve_or_create(device_name).await?;
        if client.is_connected() {
            warn!(device = %device_name, "device already connected");
            return Err(WamuxError::conflict(format!(
                "device '{device_name}' is already connected"
            )));
        }

        client.connect().await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to connect device");
            map_failure(e, |e| WamuxError::connection("failed to connect device", e))
        })?;
        info!(device = %device_name, "device connected");
        Ok(())
    }

    pub async fn disconnect_device(&self, device_name: &str) -> Result<(), WamuxError> {
        info!(device = %device_name, "disconnecting device");
        let client = self.resolve(device_name).await?;
        client.disconnect().await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to disconnect device");
            map_failure(e, |e| WamuxError::connection("failed to disconnect device", e))
        })?;
        info!(device = %device_name, "device disconnected");
        Ok(())
    }

    /// Returns a pairing code. The client is created on demand so a device
    /// that was never seen can be paired.
    pub async fn get_qr_code(
        &self,
        device_name: &str,
        cancel: &CancellationToken,
    ) -> Result<QrCodeResponse, WamuxError> {
        info!(device = %device_name, "generating QR code");
        let client = self.resolve_or_create(device_name).await?;
        if client.is_connected() {
            return Err(WamuxError::conflict(format!(
                "device '{device_name}' is already connected"
            )));
        }

        let qr = client.get_qr_code(cancel).await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to generate QR code");
            map_failure(e, as_whatsapp("failed to generate QR code"))
        })?;
        info!(device = %device_name, expires_at = %qr.expires_at, "QR code generated");
        Ok(qr)
    }

    pub async fn is_device_connected(&self, device_name: &str) -> Result<bool, WamuxError> {
        Ok(self.resolve(device_name).await?.is_connected())
    }

    pub async fn get_connection_info(&self, device_name: &str) -> Result<ConnectionInfo, WamuxError> {
        Ok(self.resolve(device_name).await?.connection_info())
    }

    pub async fn get_all_connection_info(&self) -> Vec<ConnectionInfo> {
        self.manager.get_all_connection_info().await
    }

    /// Sends any message kind. The recipient is validated before the device
    /// is looked up. Returns the protocol message id.
    pub async fn send_message(&self, params: SendMessageParams) -> Result<String, WamuxError> {
        let device_name = params.device_name.clone();
        info!(
            device = %device_name,
            to = %params.to,
            message_type = %params.message_type,
            "sending message"
        );

        validate_jid_for(&params.to, params.receiver_type)?;
        let client = self.resolve_connected(&device_name).await?;

        if params.typing {
            if let Err(e) = client.send_typing(&params.to, true).await {
                warn!(device = %device_name, error = %e, "failed to send typing indicator");
            }
        }

        let result = match params.message_type {
            MessageType::Text => {
                client
                    .send_text_message(&params.to, &params.message, params.receiver_type)
                    .await
            }
            _ => match attachment_from(&params).await {
                Ok(attachment) => {
                    client
                        .send_file_message(&params.to, params.receiver_type, attachment)
                        .await
                }
                Err(e) => Err(e),
            },
        };

        if params.typing {
            if let Err(e) = client.send_typing(&params.to, false).await {
                warn!(device = %device_name, error = %e, "failed to clear typing indicator");
            }
        }

        let id = result.map_err(|e| {
            warn!(device = %device_name, to = %params.to, error = %e, "failed to send message");
            map_failure(e, as_whatsapp("failed to send message"))
        })?;
        info!(device = %device_name, to = %params.to, message_id = %id, "message sent");
        Ok(id)
    }

    pub async fn send_text_message(
        &self,
        device_name: &str,
        to: &str,
        message: &str,
        receiver_type: ReceiverType,
    ) -> Result<String, WamuxError> {
        self.send_message(SendMessageParams {
            device_name: device_name.to_string(),
            to: to.to_string(),
            message: message.to_string(),
            receiver_type,
            message_type: MessageType::Text,
            ..SendMessageParams::default()
        })
        .await
    }

    /// Sends an attachment. A `Text` message type is treated as `File`.
    pub async fn send_file_message(&self, params: SendMessageParams) -> Result<String, WamuxError> {
        let message_type = if params.message_type.is_media() {
            params.message_type
        } else {
            MessageType::File
        };
        self.send_message(SendMessageParams {
            message_type,
            ..params
        })
        .await
    }

    pub async fn list_contacts(&self, device_name: &str) -> Result<Vec<WhatsAppContact>, WamuxError> {
        info!(device = %device_name, "listing contacts");
        let client = self.resolve_connected(device_name).await?;
        let contacts = client.contacts().await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to list contacts");
            map_failure(e, as_whatsapp("failed to list contacts"))
        })?;
        info!(device = %device_name, count = contacts.len(), "contacts listed");
        Ok(contacts)
    }

    pub async fn list_groups(&self, device_name: &str) -> Result<Vec<WhatsAppGroup>, WamuxError> {
        info!(device = %device_name, "listing groups");
        let client = self.resolve_connected(device_name).await?;
        let groups = client.groups().await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to list groups");
            map_failure(e, as_whatsapp("failed to list groups"))
        })?;
        info!(device = %device_name, count = groups.len(), "groups listed");
        Ok(groups)
    }

    /// Creates (or returns) the live client for a device name.
    pub async fn create_device(&self, device_name: &str) -> Result<ConnectionInfo, WamuxError> {
        info!(device = %device_name, "creating device client");
        validate_device_name(device_name)?;
        let client = self.manager.create_client(device_name).await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to create device client");
            map_failure(e, as_whatsapp("failed to create device"))
        })?;
        Ok(client.connection_info())
    }

    pub async fn remove_device(&self, device_name: &str) -> Result<(), WamuxError> {
        info!(device = %device_name, "removing device client");
        self.manager.remove_client(device_name).await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to remove device");
            map_failure(e, as_whatsapp("failed to remove device"))
        })?;
        info!(device = %device_name, "device client removed");
        Ok(())
    }

    /// Names of devices with a live client, sorted.
    pub async fn list_devices(&self) -> Vec<String> {
        self.manager.list_clients().await
    }

    pub async fn set_presence(&self, device_name: &str, available: bool) -> Result<(), WamuxError> {
        info!(device = %device_name, available, "setting presence");
        let client = self.resolve_connected(device_name).await?;
        client.set_presence(available).await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to set presence");
            map_failure(e, as_whatsapp("failed to set presence"))
        })
    }

    pub async fn send_typing(&self, device_name: &str, to: &str, typing: bool) -> Result<(), WamuxError> {
        info!(device = %device_name, to = %to, typing, "sending typing indicator");
        let client = self.resolve_connected(device_name).await?;
        client.send_typing(to, typing).await.map_err(|e| {
            warn!(device = %device_name, error = %e, "failed to send typing indicator");
            map_failure(e, as_whatsapp("failed to send typing indicator"))
        })
    }
}

/// Builds the outbound attachment, reading `media_path` when no bytes were
/// supplied.
async fn attachment_from(params: &SendMessageParams) -> Result<Attachment, WamuxError> {
    let data = match (&params.media_path, params.file_data.is_empty()) {
        (Some(path), true) => tokio::fs::read(path).await.map_err(|e| {
            WamuxError::validation(format!("cannot read media file {}: {e}", path.display()))
        })?,
        _ => params.file_data.clone(),
    };
    let file_name = params
        .file_name
        .clone()
        .or_else(|| {
            params
                .media_path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_default();

    Ok(Attachment {
        kind: params.message_type,
        data,
        file_name,
        mime_type: params.mime_type.clone(),
        caption: params.caption.clone().or_else(|| {
            Some(params.message.clone()).filter(|m| !m.trim().is_empty())
        }),
    })
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the session manager, repositories, and use cases.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Connection state of a single device client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Kind of chat a message is addressed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReceiverType {
    #[default]
    Individual,
    Group,
}

/// Payload kind of an outbound or inbound message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    File,
    Image,
    Video,
    Audio,
}

impl MessageType {
    /// Returns true for every type that carries an attachment.
    pub fn is_media(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Lifecycle status of a persisted device record. `Deleted` is a soft delete.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

/// A persisted device identity, independent of any live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub description: String,
    pub status: DeviceStatus,
    /// WhatsApp identifier, populated once the device has been paired.
    pub jid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDeviceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<DeviceStatus>,
}

/// Filter for device listings. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFilter {
    pub owner: Option<String>,
    pub status: Option<DeviceStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppContact {
    pub jid: String,
    pub name: String,
    pub business_name: Option<String>,
    pub is_group: bool,
    pub is_broadcast: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppGroup {
    pub jid: String,
    pub name: String,
    pub topic: String,
    pub owner_jid: Option<String>,
    pub participants: Vec<String>,
    pub is_announce: bool,
    pub is_locked: bool,
    pub is_ephemeral: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// An inbound message after conversion from the protocol payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatsAppMessage {
    pub id: String,
    /// Chat the message arrived in (the group JID for group messages).
    pub chat: String,
    pub from: String,
    pub from_name: Option<String>,
    pub to: String,
    pub message_type: MessageType,
    pub content: String,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub is_from_me: bool,
    pub receiver_type: ReceiverType,
}

/// Protocol-neutral message handed to message processors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    pub device_name: String,
    pub from: String,
    pub from_name: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_group: bool,
}

impl IncomingMessage {
    pub fn from_whatsapp(device_name: &str, message: &WhatsAppMessage) -> Self {
        Self {
            id: message.id.clone(),
            device_name: device_name.to_string(),
            from: message.from.clone(),
            from_name: message.from_name.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
            is_group: message.receiver_type == ReceiverType::Group,
        }
    }
}

/// Parameters for a send-message use case.
#[derive(Debug, Clone, Default)]
pub struct SendMessageParams {
    pub device_name: String,
    pub to: String,
    pub message: String,
    pub receiver_type: ReceiverType,
    pub message_type: MessageType,
    /// Attachment bytes for media messages.
    pub file_data: Vec<u8>,
    /// Read into `file_data` when no bytes were supplied.
    pub media_path: Option<PathBuf>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
    /// Wrap the send in a composing/paused typing indicator.
    pub typing: bool,
}

/// A pairing code issued for a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCodeResponse {
    pub device_name: String,
    pub qr_code: String,
    pub expires_at: DateTime<Utc>,
    /// Validity window in seconds.
    pub timeout: u64,
}

/// Snapshot of a device client's connection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub device_name: String,
    pub status: ConnectionStatus,
    pub jid: Option<String>,
    pub is_connected: bool,
    pub last_ping: Option<DateTime<Utc>>,
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract for the underlying WhatsApp Web protocol library.
//!
//! The wire protocol is opaque to wamux. A [`ProtocolConnector`] opens one
//! [`ProtocolSession`] per device, backed by that device's credential store,
//! and the session delivers inbound events as a typed [`ProtocolEvent`] stream.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::WamuxError;
use crate::types::{MessageType, WhatsAppContact, WhatsAppGroup};

/// Inbound event emitted by the protocol library for one device.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    Connected { jid: String },
    Disconnected { reason: String },
    QrIssued { code: String },
    MessageReceived(RawMessage),
    Error { message: String },
}

/// Item delivered on a pairing channel opened by [`ProtocolClient::qr_channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrEvent {
    Code(String),
    /// Pairing completed on the phone.
    Success,
    /// The library gave up issuing codes.
    Timeout,
    Error(String),
}

/// Message payload as reported by the protocol library.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub id: String,
    pub chat: String,
    pub sender: String,
    pub sender_name: Option<String>,
    pub is_from_me: bool,
    pub is_group: bool,
    pub kind: MessageType,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub media_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RawMessage {
    /// Text body, falling back to a media caption. Blank bodies yield `None`.
    pub fn body(&self) -> Option<&str> {
        [self.text.as_deref(), self.caption.as_deref()]
            .into_iter()
            .flatten()
            .find(|body| !body.trim().is_empty())
    }
}

/// Outbound payload handed to [`ProtocolClient::send_message`].
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    Text(String),
    Media {
        kind: MessageType,
        data: Vec<u8>,
        file_name: String,
        mime_type: String,
        caption: Option<String>,
    },
}

/// Per-chat presence state used for typing indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPresence {
    Composing,
    Paused,
}

impl From<bool> for ChatPresence {
    fn from(typing: bool) -> Self {
        if typing { Self::Composing } else { Self::Paused }
    }
}

/// One live protocol connection.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn connect(&self) -> Result<(), WamuxError>;

    async fn disconnect(&self) -> Result<(), WamuxError>;

    /// Live-socket check.
    fn is_connected(&self) -> bool;

    /// Whether the credential store holds a paired identity.
    fn is_logged_in(&self) -> bool;

    fn jid(&self) -> Option<String>;

    /// Opens a pairing channel. Must be called before `connect` on an
    /// unpaired device.
    async fn qr_channel(&self) -> Result<mpsc::Receiver<QrEvent>, WamuxError>;

    /// Sends a message and returns its protocol message id.
    async fn send_message(&self, to: &str, message: OutgoingMessage)
    -> Result<String, WamuxError>;

    async fn contacts(&self) -> Result<Vec<WhatsAppContact>, WamuxError>;

    /// JIDs of all joined groups.
    async fn joined_groups(&self) -> Result<Vec<String>, WamuxError>;

    async fn group_info(&self, jid: &str) -> Result<WhatsAppGroup, WamuxError>;

    async fn send_presence(&self, available: bool) -> Result<(), WamuxError>;

    async fn send_chat_presence(&self, to: &str, presence: ChatPresence)
    -> Result<(), WamuxError>;
}

/// A protocol client paired with its inbound event stream.
pub struct ProtocolSession {
    pub client: Arc<dyn ProtocolClient>,
    pub events: mpsc::Receiver<ProtocolEvent>,
}

/// Factory that opens protocol sessions backed by per-device credential files.
#[async_trait]
pub trait ProtocolConnector: Send + Sync {
    async fn open(&self, device_name: &str, store_path: &Path)
    -> Result<ProtocolSession, WamuxError>;
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the wamux multi-device WhatsApp session manager.
//!
//! This crate provides the error taxonomy, domain types, input validation,
//! and the collaborator traits (protocol client, event handler, message
//! processor, device and API key repositories) used throughout the workspace.

pub mod api_key;
pub mod error;
pub mod traits;
pub mod types;
pub mod validation;

// Re-export key items at crate root for ergonomic imports.
pub use api_key::{
    ApiKey, ApiKeyPermission, ApiKeyStatus, CreateApiKeyRequest, GeneratedApiKey,
    UpdateApiKeyRequest,
};
pub use error::{BoxError, ErrorKind, WamuxError};
pub use types::{
    ConnectionInfo, ConnectionStatus, CreateDeviceRequest, Device, DeviceFilter, DeviceStatus,
    IncomingMessage, MessageType, QrCodeResponse, ReceiverType, SendMessageParams,
    UpdateDeviceRequest, WhatsAppContact, WhatsAppGroup, WhatsAppMessage,
};

pub use traits::{
    ApiKeyRepository, ChatPresence, DeviceRepository, EventHandler, MessageProcessor, OutgoingMessage,
    ProtocolClient, ProtocolConnector, ProtocolEvent, ProtocolSession, QrEvent, RawMessage,
};

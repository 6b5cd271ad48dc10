// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for wamux.
//!
//! Provides a scriptable protocol connector, in-memory device and API key
//! repositories, and a recording message processor so session and service tests run
//! without a real WhatsApp connection or database.

pub mod mock_protocol;
pub mod mock_repository;
pub mod recording_processor;

pub use mock_protocol::{DisconnectBehavior, MockConnector, MockProtocolClient};
pub use mock_repository::{InMemoryApiKeyRepository, InMemoryDeviceRepository, sample_device};
pub use recording_processor::RecordingProcessor;

use chrono::Utc;
use wamux_core::{MessageType, RawMessage};

/// An inbound individual text message from `sender`.
pub fn raw_text(id: &str, sender: &str, text: &str) -> RawMessage {
    RawMessage {
        id: id.to_string(),
        chat: sender.to_string(),
        sender: sender.to_string(),
        sender_name: None,
        is_from_me: false,
        is_group: false,
        kind: MessageType::Text,
        text: Some(text.to_string()),
        caption: None,
        media_url: None,
        timestamp: Utc::now(),
    }
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the seams of the session manager.
//!
//! All async traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod handler;
pub mod processor;
pub mod protocol;
pub mod repository;

pub use handler::EventHandler;
pub use processor::MessageProcessor;
pub use protocol::{
    ChatPresence, OutgoingMessage, ProtocolClient, ProtocolConnector, ProtocolEvent,
    ProtocolSession, QrEvent, RawMessage,
};
pub use repository::{ApiKeyRepository, DeviceRepository};

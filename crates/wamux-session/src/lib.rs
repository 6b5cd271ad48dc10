// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-device session management for wamux.
//!
//! A [`SessionManager`] owns one [`DeviceClient`] per device name. Each client
//! drives its own protocol session, caches pairing codes, and forwards
//! inbound events to a shared [`EventHandler`](wamux_core::EventHandler),
//! normally a [`DefaultEventHandler`] that routes messages through the
//! [`ProcessorRegistry`].

pub mod client;
pub mod handler;
pub mod manager;
pub mod queue;
pub mod registry;
pub mod store;

pub use client::{Attachment, ClientSettings, DeviceClient};
pub use handler::{ConnectionCallback, ConnectionChange, DefaultEventHandler, MessageCallback};
pub use manager::SessionManager;
pub use queue::{InboundQueue, Rejected};
pub use registry::ProcessorRegistry;
pub use store::SessionStore;

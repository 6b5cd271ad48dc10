// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pluggable message processor contract.

use async_trait::async_trait;

use crate::error::WamuxError;
use crate::types::IncomingMessage;

/// A handler that inspects inbound messages and optionally acts on them.
///
/// Processors are registered once at startup and dispatched in descending
/// [`priority`](MessageProcessor::priority) order.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    fn name(&self) -> &str;

    /// Higher runs first.
    fn priority(&self) -> i32;

    fn can_process(&self, message: &IncomingMessage) -> bool;

    async fn process(&self, message: &IncomingMessage) -> Result<(), WamuxError>;
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Priority-ordered registry of message processors.

use std::cmp::Reverse;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use wamux_core::{IncomingMessage, MessageProcessor, WamuxError};

/// Holds processors sorted by descending priority. Processors with equal
/// priority keep their registration order.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: RwLock<Vec<Arc<dyn MessageProcessor>>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, processor: Arc<dyn MessageProcessor>) {
        let mut processors = self.processors.write().await;
        info!(
            processor = %processor.name(),
            priority = processor.priority(),
            "message processor registered"
        );
        processors.push(processor);
        // `sort_by_key` is stable.
        processors.sort_by_key(|p| Reverse(p.priority()));
    }

    /// Snapshot of the registered processors in dispatch order.
    pub async fn processors(&self) -> Vec<Arc<dyn MessageProcessor>> {
        self.processors.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.processors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.processors.read().await.is_empty()
    }

    /// Runs every processor that claims the message, in priority order.
    ///
    /// All claiming processors run even if an earlier one fails; the first
    /// error is returned.
    pub async fn process(&self, message: &IncomingMessage) -> Result<(), WamuxError> {
        let snapshot = self.processors().await;
        let mut handled = false;
        let mut first_error = None;

        for processor in snapshot.iter().filter(|p| p.can_process(message)) {
            handled = true;
            debug!(processor = %processor.name(), message_id = %message.id, "processing message");
            if let Err(e) = processor.process(message).await {
                warn!(
                    processor = %processor.name(),
                    message_id = %message.id,
                    error = %e,
                    "message processor failed"
                );
                first_error.get_or_insert(e);
            }
        }

        if !handled {
            debug!(message_id = %message.id, device = %message.device_name, "no processor claimed message");
        }
        first_error.map_or(Ok(()), Err)
    }
}

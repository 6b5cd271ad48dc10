// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded per-device inbound message queue.
//!
//! The protocol dispatcher pushes with [`InboundQueue::try_push`], which never
//! waits. A single worker drains the queue and runs at most `concurrency`
//! handler invocations at once. With a concurrency of one, messages are
//! handled strictly in arrival order. When the queue is full the newest
//! message is dropped and counted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use wamux_core::{EventHandler, WhatsAppMessage};

/// Why a message was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    Full,
    Closed,
}

pub struct InboundQueue {
    device_name: String,
    tx: mpsc::Sender<WhatsAppMessage>,
    dropped: AtomicU64,
    worker: JoinHandle<()>,
}

impl InboundQueue {
    /// Spawns the drain worker on the current runtime.
    pub fn spawn(
        device_name: &str,
        capacity: usize,
        concurrency: usize,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        let worker = tokio::spawn(drain(device_name.to_string(), rx, permits, handler));
        Self {
            device_name: device_name.to_string(),
            tx,
            dropped: AtomicU64::new(0),
            worker,
        }
    }

    pub fn try_push(&self, message: WhatsAppMessage) -> Result<(), Rejected> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(message)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    device = %self.device_name,
                    message_id = %message.id,
                    dropped,
                    "inbound queue full, dropping message"
                );
                Err(Rejected::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Rejected::Closed),
        }
    }

    /// Messages shed because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Messages waiting to be picked up by the worker.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl Drop for InboundQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn drain(
    device_name: String,
    mut rx: mpsc::Receiver<WhatsAppMessage>,
    permits: Arc<Semaphore>,
    handler: Arc<dyn EventHandler>,
) {
    while let Some(message) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let handler = handler.clone();
        let device_name = device_name.clone();
        tokio::spawn(async move {
            let _permit = permit;
            handler.on_message(&device_name, message).await;
        });
    }
    debug!(device = %device_name, "inbound queue closed");
}

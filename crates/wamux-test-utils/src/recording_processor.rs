// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message processor that records what it was given.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use wamux_core::{IncomingMessage, MessageProcessor, WamuxError};

pub struct RecordingProcessor {
    name: String,
    priority: i32,
    keyword: Option<String>,
    fail: bool,
    seen: Mutex<Vec<IncomingMessage>>,
    notify: Arc<Notify>,
}

impl RecordingProcessor {
    /// Claims every message.
    pub fn new(name: &str, priority: i32) -> Self {
        Self {
            name: name.to_string(),
            priority,
            keyword: None,
            fail: false,
            seen: Mutex::new(Vec::new()),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Only claim messages containing `keyword`.
    pub fn claiming(mut self, keyword: &str) -> Self {
        self.keyword = Some(keyword.to_string());
        self
    }

    /// Fail every processed message.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn seen(&self) -> Vec<IncomingMessage> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Waits until at least `count` messages have been processed.
    pub async fn wait_for(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.seen().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl MessageProcessor for RecordingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_process(&self, message: &IncomingMessage) -> bool {
        self.keyword
            .as_deref()
            .is_none_or(|keyword| message.content.contains(keyword))
    }

    async fn process(&self, message: &IncomingMessage) -> Result<(), WamuxError> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        self.notify.notify_waiters();
        if self.fail {
            Err(WamuxError::internal_msg(format!("{} rejected message {}", self.name, message.id)))
        } else {
            Ok(())
        }
    }
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`MessageProcessor`] that extracts and stores quick-response reports.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use wamux_core::{IncomingMessage, MessageProcessor, WamuxError};

use crate::parser::{is_valid, looks_like_report, parse_report};
use crate::repository::QuickResponseRepository;

pub const PROCESSOR_NAME: &str = "QuickResponseProcessor";
pub const PROCESSOR_PRIORITY: i32 = 100;

pub struct QuickResponseProcessor {
    repository: Arc<dyn QuickResponseRepository>,
}

impl QuickResponseProcessor {
    pub fn new(repository: Arc<dyn QuickResponseRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl MessageProcessor for QuickResponseProcessor {
    fn name(&self) -> &str {
        PROCESSOR_NAME
    }

    fn priority(&self) -> i32 {
        PROCESSOR_PRIORITY
    }

    fn can_process(&self, message: &IncomingMessage) -> bool {
        looks_like_report(&message.content)
    }

    async fn process(&self, message: &IncomingMessage) -> Result<(), WamuxError> {
        info!(device = %message.device_name, from = %message.from, "processing quick response report");
        let report = parse_report(
            &message.content,
            &message.device_name,
            &message.from,
            message.timestamp,
        );

        if !is_valid(&report) {
            warn!(device = %message.device_name, message_id = %message.id, "report skipped: no officer data");
            return Ok(());
        }

        self.repository
            .save(&report)
            .await
            .map_err(|e| WamuxError::database("failed to save quick response", e))?;

        info!(
            device = %message.device_name,
            officer = %report.officer.name,
            id = %report.id,
            "quick response saved"
        );
        Ok(())
    }
}

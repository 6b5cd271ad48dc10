// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use wamux_core::WamuxError;

use crate::model::QuickResponse;

/// Persistence port for quick-response reports.
#[async_trait]
pub trait QuickResponseRepository: Send + Sync {
    async fn save(&self, report: &QuickResponse) -> Result<(), WamuxError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<QuickResponse>, WamuxError>;

    /// Newest first.
    async fn find_all(&self, skip: usize, limit: usize) -> Result<Vec<QuickResponse>, WamuxError>;

    async fn count(&self) -> Result<u64, WamuxError>;

    /// Removes a report permanently. Unknown ids are NotFound.
    async fn delete(&self, id: &str) -> Result<(), WamuxError>;
}

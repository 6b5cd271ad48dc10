// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A field work report from an irrigation officer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickResponse {
    pub id: String,
    /// Device that received the report.
    pub device_name: String,
    /// Sender JID.
    pub sender: String,
    pub officer: OfficerInfo,
    pub activity: ActivityInfo,
    pub output: OutputInfo,
    pub created_at: DateTime<Utc>,
}

/// "Data Petugas" section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerInfo {
    pub name: String,
    pub position: String,
    /// Irrigation area the officer is assigned to.
    pub assignment: String,
}

impl OfficerInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.position.is_empty() && self.assignment.is_empty()
    }
}

/// "Identifikasi Kegiatan Q.R" section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInfo {
    pub method: String,
    pub activity_type: String,
    pub irrigation_area: String,
    pub channel: String,
    pub building_route: String,
    /// Village / district / regency.
    pub location: String,
    pub watershed_unit: String,
}

/// "Output Kegiatan QR" section. Values are kept as written (units included).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub area_size: String,
    pub channel_length: String,
    pub leaks_closed: String,
    pub sediment_removed: String,
    pub trash_cleared: String,
    pub trees_removed: String,
}

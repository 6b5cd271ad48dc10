// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quick-response report persistence.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use wamux_core::WamuxError;
use wamux_quickresponse::{QuickResponse, QuickResponseRepository};

use crate::database::{Database, format_timestamp, json_column, map_tr_err, parse_timestamp};

const COLUMNS: &str = "id, device_name, sender, officer, activity, output, created_at";

pub struct SqliteQuickResponseRepository {
    db: Database,
}

impl SqliteQuickResponseRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_to_report(row: &rusqlite::Row<'_>) -> Result<QuickResponse, rusqlite::Error> {
    let officer: String = row.get(3)?;
    let activity: String = row.get(4)?;
    let output: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(QuickResponse {
        id: row.get(0)?,
        device_name: row.get(1)?,
        sender: row.get(2)?,
        officer: json_column(3, &officer)?,
        activity: json_column(4, &activity)?,
        output: json_column(5, &output)?,
        created_at: parse_timestamp(6, &created_at)?,
    })
}

#[async_trait]
impl QuickResponseRepository for SqliteQuickResponseRepository {
    async fn save(&self, report: &QuickResponse) -> Result<(), WamuxError> {
        let encode = |value: Result<String, serde_json::Error>| {
            value.map_err(|e| WamuxError::internal("failed to encode quick response", e))
        };
        let officer = encode(serde_json::to_string(&report.officer))?;
        let activity = encode(serde_json::to_string(&report.activity))?;
        let output = encode(serde_json::to_string(&report.output))?;
        let report = report.clone();
        let id = report.id.clone();

        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO quick_responses
                     (id, device_name, sender, officer_name, officer, activity, output, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        report.id,
                        report.device_name,
                        report.sender,
                        report.officer.name,
                        officer,
                        activity,
                        output,
                        format_timestamp(&report.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(id = %id, "quick response stored");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<QuickResponse>, WamuxError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {COLUMNS} FROM quick_responses WHERE id = ?1"),
                    params![id],
                    row_to_report,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn find_all(&self, skip: usize, limit: usize) -> Result<Vec<QuickResponse>, WamuxError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM quick_responses ORDER BY created_at DESC, id LIMIT ?1 OFFSET ?2"
                ))?;
                let rows = stmt.query_map(params![limit, skip], row_to_report)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn count(&self) -> Result<u64, WamuxError> {
        let count: i64 = self
            .db
            .connection()
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM quick_responses", [], |row| row.get(0)))
            .await
            .map_err(map_tr_err)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn delete(&self, id: &str) -> Result<(), WamuxError> {
        let owned = id.to_string();
        let changed = self
            .db
            .connection()
            .call(move |conn| conn.execute("DELETE FROM quick_responses WHERE id = ?1", params![owned]))
            .await
            .map_err(map_tr_err)?;
        if changed == 0 {
            return Err(WamuxError::not_found(format!("quick response '{id}'")));
        }
        Ok(())
    }
}

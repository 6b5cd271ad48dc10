// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::info;

use wamux_core::{ApiKey, ApiKeyRepository, ApiKeyStatus, WamuxError};

use crate::database::{
    Database, format_timestamp, is_constraint_violation, json_column, map_tr_err, parse_timestamp,
};

const COLUMNS: &str = "id, name, owner, key_hash, key_hint, permissions, status, rate_limit, \
                       last_used_at, expires_at, created_at, updated_at";

pub struct SqliteApiKeyRepository {
    db: Database,
}

impl SqliteApiKeyRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &'static str, value: String) -> Result<Option<ApiKey>, WamuxError> {
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {COLUMNS} FROM api_keys WHERE {column} = ?1"),
                    params![value],
                    row_to_key,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }
}

fn optional_timestamp(idx: usize, raw: Option<String>) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    raw.map(|raw| parse_timestamp(idx, &raw)).transpose()
}

fn row_to_key(row: &rusqlite::Row<'_>) -> Result<ApiKey, rusqlite::Error> {
    let permissions: String = row.get(5)?;
    let status: String = row.get(6)?;
    let status = status.parse::<ApiKeyStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;
    Ok(ApiKey {
        id: row.get(0)?,
        name: row.get(1)?,
        owner: row.get(2)?,
        key_hash: row.get(3)?,
        key_hint: row.get(4)?,
        permissions: json_column(5, &permissions)?,
        status,
        rate_limit: row.get(7)?,
        last_used_at: optional_timestamp(8, row.get(8)?)?,
        expires_at: optional_timestamp(9, row.get(9)?)?,
        created_at: parse_timestamp(10, &created_at)?,
        updated_at: parse_timestamp(11, &updated_at)?,
    })
}

fn encode_permissions(key: &ApiKey) -> Result<String, WamuxError> {
    serde_json::to_string(&key.permissions)
        .map_err(|e| WamuxError::internal("failed to encode API key permissions", e))
}

#[async_trait]
impl ApiKeyRepository for SqliteApiKeyRepository {
    async fn create(&self, key: &ApiKey) -> Result<(), WamuxError> {
        let permissions = encode_permissions(key)?;
        let key = key.clone();
        let inserted = self
            .db
            .connection()
            .call(move |conn| {
                let result = conn.execute(
                    &format!(
                        "INSERT INTO api_keys ({COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                    ),
                    params![
                        key.id,
                        key.name,
                        key.owner,
                        key.key_hash,
                        key.key_hint,
                        permissions,
                        key.status.to_string(),
                        key.rate_limit,
                        key.last_used_at.as_ref().map(format_timestamp),
                        key.expires_at.as_ref().map(format_timestamp),
                        format_timestamp(&key.created_at),
                        format_timestamp(&key.updated_at),
                    ],
                );
                match result {
                    Ok(_) => Ok(true),
                    Err(e) if is_constraint_violation(&e) => Ok(false),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)?;

        if !inserted {
            return Err(WamuxError::conflict("API key already exists"));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ApiKey>, WamuxError> {
        self.find_one("id", id.to_string()).await
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, WamuxError> {
        self.find_one("key_hash", key_hash.to_string()).await
    }

    async fn find_by_owner(
        &self,
        owner: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ApiKey>, WamuxError> {
        let values = vec![
            Value::Text(owner.to_string()),
            Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)),
            Value::Integer(i64::try_from(skip).unwrap_or(i64::MAX)),
        ];
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM api_keys WHERE owner = ?
                     ORDER BY created_at DESC, id LIMIT ? OFFSET ?"
                ))?;
                let rows = stmt.query_map(params_from_iter(values), row_to_key)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn count_by_owner(&self, owner: &str) -> Result<u64, WamuxError> {
        let owner = owner.to_string();
        let count: i64 = self
            .db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM api_keys WHERE owner = ?1",
                    params![owner],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn update(&self, key: &ApiKey) -> Result<(), WamuxError> {
        let permissions = encode_permissions(key)?;
        let id = key.id.clone();
        let key = key.clone();
        let changed = self
            .db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE api_keys SET name = ?2, permissions = ?3, status = ?4, rate_limit = ?5,
                     expires_at = ?6, updated_at = ?7 WHERE id = ?1",
                    params![
                        key.id,
                        key.name,
                        permissions,
                        key.status.to_string(),
                        key.rate_limit,
                        key.expires_at.as_ref().map(format_timestamp),
                        format_timestamp(&Utc::now()),
                    ],
                )
            })
            .await
            .map_err(map_tr_err)?;
        if changed == 0 {
            return Err(WamuxError::not_found(format!("API key '{id}'")));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), WamuxError> {
        let owned = id.to_string();
        let changed = self
            .db
            .connection()
            .call(move |conn| conn.execute("DELETE FROM api_keys WHERE id = ?1", params![owned]))
            .await
            .map_err(map_tr_err)?;
        if changed == 0 {
            return Err(WamuxError::not_found(format!("API key '{id}'")));
        }
        Ok(())
    }

    async fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> Result<(), WamuxError> {
        let owned = id.to_string();
        let changed = self
            .db
            .connection()
            .call(move |conn| {
                let ts = format_timestamp(&at);
                conn.execute(
                    "UPDATE api_keys SET last_used_at = ?2, updated_at = ?2 WHERE id = ?1",
                    params![owned, ts],
                )
            })
            .await
            .map_err(map_tr_err)?;
        if changed == 0 {
            return Err(WamuxError::not_found(format!("API key '{id}'")));
        }
        Ok(())
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, WamuxError> {
        let changed = self
            .db
            .connection()
            .call(move |conn| {
                let ts = format_timestamp(&now);
                conn.execute(
                    "UPDATE api_keys SET status = 'expired', updated_at = ?1
                     WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at <= ?1",
                    params![ts],
                )
            })
            .await
            .map_err(map_tr_err)?;
        if changed > 0 {
            info!(count = changed, "expired API keys swept");
        }
        Ok(changed as u64)
    }
}

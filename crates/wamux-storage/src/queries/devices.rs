// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device record persistence.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};

use wamux_core::{Device, DeviceFilter, DeviceRepository, DeviceStatus, WamuxError};

use crate::database::{
    Database, format_timestamp, is_constraint_violation, map_tr_err, parse_timestamp,
};

const COLUMNS: &str = "id, name, owner, description, status, jid, created_at, updated_at";

pub struct SqliteDeviceRepository {
    db: Database,
}

impl SqliteDeviceRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn execute_update(
        &self,
        id: &str,
        sql: &'static str,
        values: Vec<Value>,
    ) -> Result<(), WamuxError> {
        let changed = self
            .db
            .connection()
            .call(move |conn| conn.execute(sql, params_from_iter(values)))
            .await
            .map_err(map_tr_err)?;
        if changed == 0 {
            return Err(WamuxError::not_found(format!("device id '{id}'")));
        }
        Ok(())
    }
}

fn row_to_device(row: &rusqlite::Row<'_>) -> Result<Device, rusqlite::Error> {
    let status: String = row.get(4)?;
    let status = status.parse::<DeviceStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        owner: row.get(2)?,
        description: row.get(3)?,
        status,
        jid: row.get(5)?,
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
    })
}

/// WHERE clause and bound values for a filter. Without a status filter,
/// deleted rows are excluded.
fn filter_clause(filter: &DeviceFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    match filter.status {
        Some(status) => {
            conditions.push("status = ?");
            values.push(Value::Text(status.to_string()));
        }
        None => conditions.push("status != 'deleted'"),
    }
    if let Some(owner) = &filter.owner {
        conditions.push("owner = ?");
        values.push(Value::Text(owner.clone()));
    }
    (format!("WHERE {}", conditions.join(" AND ")), values)
}

#[async_trait]
impl DeviceRepository for SqliteDeviceRepository {
    async fn create(&self, device: &Device) -> Result<(), WamuxError> {
        let device = device.clone();
        let name = device.name.clone();
        let inserted = self
            .db
            .connection()
            .call(move |conn| {
                let result = conn.execute(
                    &format!("INSERT INTO devices ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                    params![
                        device.id,
                        device.name,
                        device.owner,
                        device.description,
                        device.status.to_string(),
                        device.jid,
                        format_timestamp(&device.created_at),
                        format_timestamp(&device.updated_at),
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
            return Err(WamuxError::conflict(format!("device '{name}' already exists")));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Device>, WamuxError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {COLUMNS} FROM devices WHERE id = ?1"),
                    params![id],
                    row_to_device,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Device>, WamuxError> {
        let name = name.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {COLUMNS} FROM devices WHERE name = ?1 AND status != 'deleted'"),
                    params![name],
                    row_to_device,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn find_all(
        &self,
        filter: &DeviceFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Device>, WamuxError> {
        let (clause, mut values) = filter_clause(filter);
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        values.push(Value::Integer(i64::try_from(skip).unwrap_or(i64::MAX)));
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM devices {clause} ORDER BY created_at DESC, id LIMIT ? OFFSET ?"
                ))?;
                let rows = stmt.query_map(params_from_iter(values), row_to_device)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn update(&self, device: &Device) -> Result<(), WamuxError> {
        let name = device.name.clone();
        let id = device.id.clone();
        let device = device.clone();
        let outcome = self
            .db
            .connection()
            .call(move |conn| {
                let result = conn.execute(
                    "UPDATE devices SET name = ?2, owner = ?3, description = ?4, status = ?5,
                     jid = ?6, updated_at = ?7 WHERE id = ?1",
                    params![
                        device.id,
                        device.name,
                        device.owner,
                        device.description,
                        device.status.to_string(),
                        device.jid,
                        format_timestamp(&Utc::now()),
                    ],
                );
                match result {
                    Ok(changed) => Ok(Some(changed)),
                    Err(e) if is_constraint_violation(&e) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)?;

        match outcome {
            None => Err(WamuxError::conflict(format!("device '{name}' already exists"))),
            Some(0) => Err(WamuxError::not_found(format!("device id '{id}'"))),
            Some(_) => Ok(()),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), WamuxError> {
        self.update_status(id, DeviceStatus::Deleted).await
    }

    async fn count(&self, filter: &DeviceFilter) -> Result<u64, WamuxError> {
        let (clause, values) = filter_clause(filter);
        let count: i64 = self
            .db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT COUNT(*) FROM devices {clause}"),
                    params_from_iter(values),
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn update_jid(&self, id: &str, jid: &str) -> Result<(), WamuxError> {
        self.execute_update(
            id,
            "UPDATE devices SET jid = ?2, updated_at = ?3 WHERE id = ?1",
            vec![
                Value::Text(id.to_string()),
                Value::Text(jid.to_string()),
                Value::Text(format_timestamp(&Utc::now())),
            ],
        )
        .await
    }

    async fn update_status(&self, id: &str, status: DeviceStatus) -> Result<(), WamuxError> {
        self.execute_update(
            id,
            "UPDATE devices SET status = ?2, updated_at = ?3 WHERE id = ?1",
            vec![
                Value::Text(id.to_string()),
                Value::Text(status.to_string()),
                Value::Text(format_timestamp(&Utc::now())),
            ],
        )
        .await
    }
}

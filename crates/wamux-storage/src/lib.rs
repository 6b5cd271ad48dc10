// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for wamux.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-connection concurrency model via `tokio-rusqlite`, plus the
//! device, quick-response, and API key repositories built on it.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
pub use queries::api_keys::SqliteApiKeyRepository;
pub use queries::devices::SqliteDeviceRepository;
pub use queries::quick_responses::SqliteQuickResponseRepository;

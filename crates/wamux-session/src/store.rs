// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk session store: one protocol credential file per device.
//!
//! The file contents are opaque; only existence and the
//! `<stores_dir>/<device>_store.db` naming convention matter here.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use wamux_core::WamuxError;

const STORE_SUFFIX: &str = "_store.db";

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the credential file for `device_name`.
    pub fn store_path(&self, device_name: &str) -> PathBuf {
        self.dir.join(format!("{device_name}{STORE_SUFFIX}"))
    }

    /// Creates the stores directory if it does not exist.
    pub async fn ensure_dir(&self) -> Result<(), WamuxError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            WamuxError::internal(
                format!("failed to create stores directory {}", self.dir.display()),
                e,
            )
        })
    }

    pub async fn exists(&self, device_name: &str) -> bool {
        tokio::fs::try_exists(self.store_path(device_name))
            .await
            .unwrap_or(false)
    }

    /// Device names derived from `*_store.db` files, sorted.
    pub async fn scan(&self) -> Result<Vec<String>, WamuxError> {
        let scan_err = |e: std::io::Error| {
            WamuxError::internal(
                format!("failed to scan stores directory {}", self.dir.display()),
                e,
            )
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(scan_err)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(STORE_SUFFIX)
                && !name.is_empty()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes the credential file. A missing file is not an error.
    ///
    /// Returns whether a file was removed.
    pub async fn purge(&self, device_name: &str) -> Result<bool, WamuxError> {
        let path = self.store_path(device_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(WamuxError::database(
                format!("failed to delete session file {}", path.display()),
                e,
            )),
        }
    }
}

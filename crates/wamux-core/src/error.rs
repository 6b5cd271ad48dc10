// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy shared by every wamux layer.
//!
//! Each variant corresponds to exactly one [`ErrorKind`], so callers can map
//! a failure to a user-visible status without inspecting error text.

use strum::{Display, EnumString};
use thiserror::Error;

/// Boxed underlying cause carried by infrastructure errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type returned by device clients, the session manager,
/// repositories, and the use-case layer.
#[derive(Debug, Error)]
pub enum WamuxError {
    /// Malformed input such as a bad recipient JID or device name.
    #[error("validation error: {0}")]
    Validation(String),

    /// The device is unknown to the manager or the repository.
    #[error("not found: {0}")]
    NotFound(String),

    /// The device is already connected, already paired, or already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing, unknown, expired, or insufficiently privileged credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The device is not connected, or the transport failed.
    #[error("connection error: {message}")]
    Connection {
        message: String,
        source: Option<BoxError>,
    },

    /// Protocol-level failure reported by the WhatsApp client library.
    #[error("whatsapp error: {message}")]
    WhatsApp {
        message: String,
        source: Option<BoxError>,
    },

    /// Repository or session-store failure.
    #[error("database error: {message}")]
    Database {
        message: String,
        source: Option<BoxError>,
    },

    /// Unexpected or unclassified failure.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        source: Option<BoxError>,
    },
}

/// Classification tag for a [`WamuxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Connection,
    #[strum(serialize = "whatsapp")]
    WhatsApp,
    Database,
    Internal,
}

impl ErrorKind {
    /// Returns true for mistakes the caller can correct by changing the request.
    pub fn is_caller_error(self) -> bool {
        matches!(
            self,
            Self::Validation | Self::NotFound | Self::Conflict | Self::Unauthorized
        )
    }
}

impl WamuxError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn connection(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn not_connected(device_name: &str) -> Self {
        Self::Connection {
            message: format!("device '{device_name}' is not connected"),
            source: None,
        }
    }

    pub fn whatsapp(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::WhatsApp {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// A protocol failure with no underlying cause, such as a QR timeout.
    pub fn whatsapp_msg(message: impl Into<String>) -> Self {
        Self::WhatsApp {
            message: message.into(),
            source: None,
        }
    }

    pub fn database(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn internal(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn internal_msg(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the taxonomy tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::WhatsApp { .. } => ErrorKind::WhatsApp,
            Self::Database { .. } => ErrorKind::Database,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// The HTTP status a consuming transport layer should report.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Connection | ErrorKind::WhatsApp => 503,
            ErrorKind::Database | ErrorKind::Internal => 500,
        }
    }

    /// Transient infrastructure failures that the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connection | ErrorKind::WhatsApp | ErrorKind::Database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::str::FromStr;

    #[test]
    fn every_variant_maps_to_its_kind() {
        let cases = [
            (WamuxError::validation("bad"), ErrorKind::Validation, 400),
            (WamuxError::not_found("shop1"), ErrorKind::NotFound, 404),
            (WamuxError::conflict("taken"), ErrorKind::Conflict, 409),
            (WamuxError::unauthorized("revoked"), ErrorKind::Unauthorized, 401),
            (WamuxError::not_connected("shop1"), ErrorKind::Connection, 503),
            (WamuxError::whatsapp_msg("timeout"), ErrorKind::WhatsApp, 503),
            (
                WamuxError::database("insert failed", std::io::Error::other("disk")),
                ErrorKind::Database,
                500,
            ),
            (WamuxError::internal_msg("bug"), ErrorKind::Internal, 500),
        ];

        for (err, kind, status) in cases {
            assert_eq!(err.kind(), kind, "{err}");
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn retryable_kinds_are_infrastructure_failures() {
        assert!(WamuxError::not_connected("a").is_retryable());
        assert!(WamuxError::whatsapp_msg("b").is_retryable());
        assert!(!WamuxError::validation("c").is_retryable());
        assert!(!WamuxError::internal_msg("d").is_retryable());
        assert!(ErrorKind::Conflict.is_caller_error());
        assert!(!ErrorKind::Database.is_caller_error());
    }

    #[test]
    fn source_is_preserved() {
        let err = WamuxError::connection("dial failed", std::io::Error::other("refused"));
        assert_eq!(err.to_string(), "connection error: dial failed");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("refused"));
    }

    #[test]
    fn error_kind_display_round_trips() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::Unauthorized,
            ErrorKind::Connection,
            ErrorKind::WhatsApp,
            ErrorKind::Database,
            ErrorKind::Internal,
        ] {
            let parsed = ErrorKind::from_str(&kind.to_string()).expect("should parse back");
            assert_eq!(parsed, kind);
        }
        assert_eq!(ErrorKind::WhatsApp.to_string(), "whatsapp");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}

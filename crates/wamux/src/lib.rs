// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application wiring for the wamux binary.
//!
//! [`App`] owns storage, the processor registry, the session manager, and
//! the services built on them. The binary drives it from the CLI.

pub mod app;
pub mod connector;
pub mod shutdown;
pub mod telemetry;

pub use app::App;
pub use connector::OfflineConnector;
pub use telemetry::init_tracing;

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quick-response field reports.
//!
//! Irrigation officers send a structured WhatsApp message with three
//! headed sections of `key: value` lines. This crate parses such messages
//! into a [`QuickResponse`] and persists them through a
//! [`QuickResponseRepository`] from a [`MessageProcessor`](wamux_core::MessageProcessor).

pub mod model;
pub mod parser;
pub mod processor;
pub mod repository;

pub use model::{ActivityInfo, OfficerInfo, OutputInfo, QuickResponse};
pub use parser::{is_valid, looks_like_report, parse_report};
pub use processor::QuickResponseProcessor;
pub use repository::QuickResponseRepository;

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository implementations over [`Database`](crate::Database).

pub mod api_keys;
pub mod devices;
pub mod quick_responses;

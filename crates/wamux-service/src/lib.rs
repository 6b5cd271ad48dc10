// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Use-case layer for wamux.
//!
//! [`WhatsAppService`] orchestrates the session manager for every externally
//! visible device operation. [`DeviceService`] manages persisted device
//! records and [`ApiKeyService`] manages API keys. All of them validate
//! input, log each operation, and map failures onto the
//! [`WamuxError`](wamux_core::WamuxError) taxonomy.

pub mod apikey;
pub mod device;
pub mod qr;
pub mod whatsapp;

pub use apikey::{ApiKeyPage, ApiKeyService, hash_key};
pub use device::{DEFAULT_PAGE_LIMIT, DevicePage, DeviceService, MAX_PAGE_LIMIT, sync_connection_change};
pub use qr::render_qr_svg;
pub use whatsapp::WhatsAppService;

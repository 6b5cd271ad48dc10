// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input validation for recipient JIDs and device names.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::WamuxError;
use crate::types::ReceiverType;

static INDIVIDUAL_JID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+@s\.whatsapp\.net$").expect("individual JID pattern"));

static GROUP_JID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(-\d+)?@g\.us$").expect("group JID pattern"));

static DEVICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("device name pattern"));

pub const DEVICE_NAME_MIN_LEN: usize = 3;
pub const DEVICE_NAME_MAX_LEN: usize = 50;

/// Returns the receiver type implied by a well-formed JID.
pub fn jid_receiver_type(jid: &str) -> Option<ReceiverType> {
    if INDIVIDUAL_JID.is_match(jid) {
        Some(ReceiverType::Individual)
    } else if GROUP_JID.is_match(jid) {
        Some(ReceiverType::Group)
    } else {
        None
    }
}

/// Validates an individual (`<digits>@s.whatsapp.net`) or group
/// (`<digits>[-<digits>]@g.us`) JID.
pub fn validate_jid(jid: &str) -> Result<ReceiverType, WamuxError> {
    if jid.is_empty() {
        return Err(WamuxError::validation("recipient JID is required"));
    }
    jid_receiver_type(jid)
        .ok_or_else(|| WamuxError::validation(format!("invalid JID format: '{jid}'")))
}

/// Validates a JID and checks that it addresses the expected kind of chat.
pub fn validate_jid_for(jid: &str, receiver_type: ReceiverType) -> Result<(), WamuxError> {
    let actual = validate_jid(jid)?;
    if actual != receiver_type {
        return Err(WamuxError::validation(format!(
            "JID '{jid}' is a {actual} address but receiver type is {receiver_type}"
        )));
    }
    Ok(())
}

/// Device names are 3-50 characters of `[A-Za-z0-9_-]`.
pub fn validate_device_name(name: &str) -> Result<(), WamuxError> {
    if name.is_empty() {
        return Err(WamuxError::validation("device name is required"));
    }
    let len = name.chars().count();
    if !(DEVICE_NAME_MIN_LEN..=DEVICE_NAME_MAX_LEN).contains(&len) {
        return Err(WamuxError::validation(format!(
            "device name must be between {DEVICE_NAME_MIN_LEN} and {DEVICE_NAME_MAX_LEN} characters"
        )));
    }
    if !DEVICE_NAME.is_match(name) {
        return Err(WamuxError::validation(format!(
            "device name '{name}' may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use qrcode::QrCode;
use qrcode::render::svg;

use wamux_core::{QrCodeResponse, WamuxError};

/// Renders the pairing code as a scannable SVG image.
pub fn render_qr_svg(qr: &QrCodeResponse) -> Result<String, WamuxError> {
    let code = QrCode::new(qr.qr_code.as_bytes())
        .map_err(|e| WamuxError::internal("failed to encode QR code", e))?;
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

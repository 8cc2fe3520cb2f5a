// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR code rendering for ticket tokens.
//
// Rendering is deterministic: the same token always yields the same pixels,
// so a reprinted ticket scans identically.

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use ticketwerk_core::error::TicketwerkError;
use tracing::{debug, instrument};

/// Default minimum edge length in pixels. Matches the 200 px codes the
/// ticket scanners were calibrated against.
pub const DEFAULT_QR_SIZE: u32 = 200;

/// Render `token` as a black-on-white QR code with a quiet zone.
pub fn render_qr(token: &str) -> Result<GrayImage, TicketwerkError> {
    render_qr_sized(token, DEFAULT_QR_SIZE)
}

/// Render `token` with each edge at least `min_size` pixels.
#[instrument(skip(token), fields(token_len = token.len()))]
pub fn render_qr_sized(token: &str, min_size: u32) -> Result<GrayImage, TicketwerkError> {
    let code = QrCode::with_error_correction_level(token.as_bytes(), EcLevel::M)
        .map_err(|err| TicketwerkError::ImageError(format!("QR encoding failed: {err}")))?;

    let image = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .min_dimensions(min_size, min_size)
        .build();

    debug!(version = ?code.version(), width = image.width(), "QR rendered");
    Ok(image)
}

/// Render `token` as PNG bytes.
pub fn render_qr_png(token: &str) -> Result<Vec<u8>, TicketwerkError> {
    let image = DynamicImage::ImageLuma8(render_qr(token)?);
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| TicketwerkError::ImageError(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}

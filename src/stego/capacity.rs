// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Payload capacity arithmetic.
//!
//! Every pixel after the header carries `stride` payload bytes, so an image
//! holds
//!
//! ```text
//! (width * height - header_pixels) * stride
//! ```
//!
//! bytes. For the current 7-pixel RGBA layout an 8×8 image holds
//! `(64 - 7) * 4 = 228` bytes.

use crate::raster::error::RasterError;

use super::error::StegoError;
use super::header::HeaderVersion;

/// Maximum payload bytes a single `width`×`height` image can hold.
///
/// # Errors
/// - [`StegoError::ImageTooSmall`] if `width * height` does not exceed the
///   header pixel count (no room for any payload).
/// - [`StegoError::Raster`] with [`RasterError::InvalidDimensions`] if the
///   byte capacity does not fit in `usize`.
pub fn compute_capacity(width: u32, height: u32, version: HeaderVersion) -> Result<usize, StegoError> {
    let too_large = || StegoError::Raster(RasterError::InvalidDimensions { width, height });
    let pixels = (width as usize).checked_mul(height as usize).ok_or_else(too_large)?;
    let header = version.header_pixels();
    if pixels <= header {
        return Err(StegoError::ImageTooSmall);
    }
    (pixels - header).checked_mul(version.stride()).ok_or_else(too_large)
}

/// Number of images needed for `payload_len` bytes at `capacity` bytes each.
///
/// An empty payload still occupies one image.
pub fn chunk_count(payload_len: usize, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    payload_len.div_ceil(capacity).max(1)
}

/// Logical pixels spanned by `payload_len` body bytes (last one possibly partial).
pub fn body_pixels(payload_len: usize, version: HeaderVersion) -> usize {
    payload_len.div_ceil(version.stride())
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Reverse-scan addressing and byte/pixel packing.
//!
//! A byte stream is laid over consecutive logical pixels, `stride` bytes per
//! pixel (one per channel, channel 0 first). Logical pixel `i` is stored at
//! physical pixel `total - 1 - i`, so stream position 0 always lands in the
//! first channel of the buffer's last pixel.
//!
//! ```text
//! stream:   b0 b1 b2 b3 | b4 b5 b6 b7 | b8 f  f  f
//! logical:  pixel 0     | pixel 1     | pixel 2 (padded with filler f)
//! physical: total-1     | total-2     | total-3
//! ```

use super::error::{RasterError, Result};
use super::PixelBuffer;

/// Channel values of one pixel. Layouts with fewer than four channels
/// leave the trailing slots unused.
pub type Pixel = [u8; 4];

/// Map a logical (reverse scan) pixel index to its physical row-major index.
pub fn physical_index(total: usize, logical: usize) -> Result<usize> {
    if logical >= total {
        return Err(RasterError::PixelOutOfRange { index: logical, total });
    }
    Ok(total - 1 - logical)
}

fn check_stride(stride: usize) -> Result<()> {
    if (1..=4).contains(&stride) {
        Ok(())
    } else {
        Err(RasterError::InvalidStride(stride))
    }
}

/// Pack `bytes` into pixels, `stride` bytes per pixel.
///
/// The final pixel is padded with `filler` when `bytes.len()` is not a
/// multiple of `stride`; unused channel slots beyond `stride` also carry
/// `filler`. Pixels are returned in logical order.
pub fn bytes_to_pixels(bytes: &[u8], stride: usize, filler: u8) -> Result<Vec<Pixel>> {
    check_stride(stride)?;
    Ok(bytes
        .chunks(stride)
        .map(|group| {
            let mut px = [filler; 4];
            px[..group.len()].copy_from_slice(group);
            px
        })
        .collect())
}

/// Unpack logical-order pixels back into at most `declared_len` bytes.
///
/// Bytes beyond `declared_len` (padding in the last pixel) are discarded.
pub fn pixels_to_bytes(pixels: &[Pixel], stride: usize, declared_len: usize) -> Result<Vec<u8>> {
    check_stride(stride)?;
    let mut out = Vec::with_capacity(declared_len.min(pixels.len() * stride));
    for px in pixels {
        let take = stride.min(declared_len - out.len());
        out.extend_from_slice(&px[..take]);
        if out.len() == declared_len {
            break;
        }
    }
    Ok(out)
}

/// Write logical-order pixels into `buf` starting at logical pixel `first`.
///
/// Only the first `stride` channels of each target pixel are written; any
/// remaining channels keep their previous value.
pub fn write_pixels(buf: &mut PixelBuffer, first: usize, pixels: &[Pixel], stride: usize) -> Result<()> {
    buf.require_channels(stride)?;
    for (offset, px) in pixels.iter().enumerate() {
        let target = buf.logical_mut(first + offset)?;
        target[..stride].copy_from_slice(&px[..stride]);
    }
    Ok(())
}

/// Read `count` logical pixels starting at logical pixel `first`.
pub fn read_pixels(buf: &PixelBuffer, first: usize, count: usize, stride: usize) -> Result<Vec<Pixel>> {
    buf.require_channels(stride)?;
    let mut pixels = Vec::with_capacity(count);
    for logical in first..first + count {
        let src = buf.logical(logical)?;
        let mut px = [0u8; 4];
        px[..stride].copy_from_slice(&src[..stride]);
        pixels.push(px);
    }
    Ok(pixels)
}

/// Append the stream bytes held by logical pixels `first..first + count` to
/// `out`, stopping after `limit` bytes.
///
/// Returns the number of bytes appended. This is the streaming counterpart of
/// [`read_pixels`] + [`pixels_to_bytes`] and avoids materialising pixels.
pub fn append_bytes(
    buf: &PixelBuffer,
    first: usize,
    count: usize,
    stride: usize,
    limit: usize,
    out: &mut Vec<u8>,
) -> Result<usize> {
    buf.require_channels(stride)?;
    let mut appended = 0;
    for logical in first..first + count {
        if appended == limit {
            break;
        }
        let src = buf.logical(logical)?;
        let take = stride.min(limit - appended);
        out.extend_from_slice(&src[..take]);
        appended += take;
    }
    Ok(appended)
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Raw pixel buffers (zero external dependencies).
//!
//! A [`PixelBuffer`] is a flat array of 8-bit channel values plus a declared
//! width, height and channel count. No image file format is involved: PNG or
//! texture import/export is the host's concern.
//!
//! Every codec in this crate addresses pixels in *reverse scan order*: logical
//! pixel `0` is the last pixel of the buffer, logical pixel `1` the one before
//! it, and so on. [`PixelBuffer::logical`] and [`PixelBuffer::logical_mut`]
//! apply that mapping; [`scan`] packs byte streams into logical pixels.

pub mod error;
pub mod scan;

use error::{RasterError, Result};

/// Opaque white, the default background for unused pixels.
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// A rectangular grid of 3- or 4-channel pixels stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer with every channel of every pixel set to zero.
    pub fn new(width: u32, height: u32, channels: u8) -> Result<Self> {
        let len = Self::byte_len(width, height, channels)?;
        Ok(Self { width, height, channels, data: vec![0; len] })
    }

    /// Create a buffer where every pixel is `background`.
    ///
    /// Only the first `channels` values of `background` are used.
    pub fn filled(width: u32, height: u32, channels: u8, background: [u8; 4]) -> Result<Self> {
        let len = Self::byte_len(width, height, channels)?;
        let c = channels as usize;
        let mut data = Vec::with_capacity(len);
        for _ in 0..len / c {
            data.extend_from_slice(&background[..c]);
        }
        Ok(Self { width, height, channels, data })
    }

    /// Wrap raw channel bytes captured by the host.
    ///
    /// `data.len()` must equal `width * height * channels`.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height, channels)?;
        if data.len() != expected {
            return Err(RasterError::DataLengthMismatch { expected, actual: data.len() });
        }
        Ok(Self { width, height, channels, data })
    }

    fn byte_len(width: u32, height: u32, channels: u8) -> Result<usize> {
        if channels != 3 && channels != 4 {
            return Err(RasterError::UnsupportedChannelCount(channels));
        }
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions { width, height });
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|p| p.checked_mul(channels as usize))
            .ok_or(RasterError::InvalidDimensions { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channels per pixel (3 or 4).
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Total number of pixels (`width * height`).
    pub fn pixel_count(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    /// Raw row-major channel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its raw bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Channels of the pixel at physical (row-major) index `index`.
    pub fn pixel(&self, index: usize) -> Result<&[u8]> {
        let total = self.pixel_count();
        if index >= total {
            return Err(RasterError::PixelOutOfRange { index, total });
        }
        let c = self.channels as usize;
        Ok(&self.data[index * c..(index + 1) * c])
    }

    /// Mutable channels of the pixel at physical index `index`.
    pub fn pixel_mut(&mut self, index: usize) -> Result<&mut [u8]> {
        let total = self.pixel_count();
        if index >= total {
            return Err(RasterError::PixelOutOfRange { index, total });
        }
        let c = self.channels as usize;
        Ok(&mut self.data[index * c..(index + 1) * c])
    }

    /// Channels of the pixel at logical (reverse scan) index `logical`.
    pub fn logical(&self, logical: usize) -> Result<&[u8]> {
        let index = scan::physical_index(self.pixel_count(), logical)?;
        self.pixel(index)
    }

    /// Mutable channels of the pixel at logical index `logical`.
    pub fn logical_mut(&mut self, logical: usize) -> Result<&mut [u8]> {
        let index = scan::physical_index(self.pixel_count(), logical)?;
        self.pixel_mut(index)
    }

    /// Fail unless every pixel carries at least `required` channels.
    pub fn require_channels(&self, required: usize) -> Result<()> {
        if (self.channels as usize) < required {
            return Err(RasterError::ChannelShortfall {
                required,
                available: self.channels as usize,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_uses_background() {
        let buf = PixelBuffer::filled(3, 2, 4, [1, 2, 3, 4]).unwrap();
        assert_eq!(buf.pixel_count(), 6);
        for i in 0..6 {
            assert_eq!(buf.pixel(i).unwrap(), &[1, 2, 3, 4]);
        }
    }

    #[test]
    fn filled_rgb_drops_alpha() {
        let buf = PixelBuffer::filled(2, 2, 3, WHITE).unwrap();
        assert_eq!(buf.as_bytes().len(), 12);
        assert!(buf.as_bytes().iter().all(|&b| b == 255));
    }

    #[test]
    fn from_raw_checks_length() {
        let err = PixelBuffer::from_raw(2, 2, 4, vec![0; 15]).unwrap_err();
        assert_eq!(err, RasterError::DataLengthMismatch { expected: 16, actual: 15 });
        assert!(PixelBuffer::from_raw(2, 2, 4, vec![0; 16]).is_ok());
    }

    #[test]
    fn rejects_bad_shapes() {
        assert_eq!(
            PixelBuffer::new(0, 4, 4).unwrap_err(),
            RasterError::InvalidDimensions { width: 0, height: 4 }
        );
        assert_eq!(PixelBuffer::new(4, 4, 2).unwrap_err(), RasterError::UnsupportedChannelCount(2));
    }

    #[test]
    fn logical_zero_is_last_pixel() {
        let mut buf = PixelBuffer::new(4, 2, 4).unwrap();
        buf.logical_mut(0).unwrap().copy_from_slice(&[9, 8, 7, 6]);
        assert_eq!(buf.pixel(7).unwrap(), &[9, 8, 7, 6]);
        assert_eq!(buf.logical(7).unwrap(), buf.pixel(0).unwrap());
    }

    #[test]
    fn logical_out_of_range() {
        let buf = PixelBuffer::new(2, 2, 3).unwrap();
        assert_eq!(buf.logical(4).unwrap_err(), RasterError::PixelOutOfRange { index: 4, total: 4 });
    }

    #[test]
    fn require_channels() {
        let rgb = PixelBuffer::new(1, 1, 3).unwrap();
        assert!(rgb.require_channels(3).is_ok());
        assert_eq!(
            rgb.require_channels(4).unwrap_err(),
            RasterError::ChannelShortfall { required: 4, available: 3 }
        );
    }
}

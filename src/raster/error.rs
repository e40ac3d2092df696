// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Error types for pixel buffer construction and addressing.

use std::fmt;

/// Errors that can occur when building or addressing a [`PixelBuffer`](super::PixelBuffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// Width or height is zero, or `width * height` overflows.
    InvalidDimensions { width: u32, height: u32 },
    /// Only 3-channel (RGB) and 4-channel (RGBA) layouts are supported.
    UnsupportedChannelCount(u8),
    /// The raw byte slice does not match `width * height * channels`.
    DataLengthMismatch { expected: usize, actual: usize },
    /// A logical or physical pixel index lies outside the buffer.
    PixelOutOfRange { index: usize, total: usize },
    /// The layout needs more channels per pixel than the buffer carries.
    ChannelShortfall { required: usize, available: usize },
    /// Bytes per pixel must be between 1 and 4.
    InvalidStride(usize),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid pixel buffer dimensions: {width}x{height}")
            }
            Self::UnsupportedChannelCount(c) => write!(f, "unsupported channel count: {c}"),
            Self::DataLengthMismatch { expected, actual } => {
                write!(f, "pixel data is {actual} bytes, expected {expected}")
            }
            Self::PixelOutOfRange { index, total } => {
                write!(f, "pixel index {index} out of range (buffer holds {total})")
            }
            Self::ChannelShortfall { required, available } => {
                write!(f, "layout needs {required} channels per pixel, buffer has {available}")
            }
            Self::InvalidStride(stride) => write!(f, "invalid stride {stride}, expected 1 to 4 bytes per pixel"),
        }
    }
}

impl std::error::Error for RasterError {}

pub type Result<T> = std::result::Result<T, RasterError>;

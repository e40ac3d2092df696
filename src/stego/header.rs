// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Image header construction and parsing.
//!
//! The header occupies the first logical pixels of every image (the last
//! pixels of the raw buffer, see [`crate::raster::scan`]). Three layouts
//! exist; which one a buffer uses is a caller decision, never guessed from
//! the bytes:
//!
//! ```text
//! V3Current (RGBA, 7 pixels)
//!   pixel 0    payload length, 32-bit big-endian across ch0..ch3
//!   pixel 1-4  next chain target (16 bytes)
//!   pixel 5    reserved, all zero
//!   pixel 6    [data mode, major, minor, encoder origin]
//!
//! V2Legacy (RGBA, 5 pixels)
//!   pixel 0    payload length, 32-bit big-endian
//!   pixel 1-4  next chain target (16 bytes)
//!
//! V1Legacy (RGB, 1 pixel)
//!   pixel 0    payload length, 24-bit big-endian across ch0..ch2
//! ```
//!
//! The payload length never includes the header itself. A chain target of
//! all `0xFF` bytes ([`ChainTarget::END`]) marks the last image.

use crate::raster::scan::{self, Pixel};
use crate::raster::PixelBuffer;

use super::capacity::compute_capacity;
use super::error::StegoError;
use super::ident::{ChainTarget, ID_LEN};
use super::text::DataMode;

/// Major format version written by this encoder and required by the V3 decoder.
pub const CURRENT_MAJOR: u8 = 3;
/// Minor format version written by this encoder. Any minor is accepted on decode.
pub const CURRENT_MINOR: u8 = 0;

/// Header layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HeaderVersion {
    /// 1 RGB pixel: 24-bit length, no chaining, no metadata.
    V1Legacy,
    /// 5 RGBA pixels: 32-bit length and chain target, no metadata.
    V2Legacy,
    /// 7 RGBA pixels: length, chain target, reserved marker, metadata.
    #[default]
    V3Current,
}

impl HeaderVersion {
    /// Number of logical pixels taken by the header.
    pub fn header_pixels(self) -> usize {
        match self {
            Self::V1Legacy => 1,
            Self::V2Legacy => 5,
            Self::V3Current => 7,
        }
    }

    /// Channels carrying data in every pixel (header and body).
    pub fn stride(self) -> usize {
        match self {
            Self::V1Legacy => 3,
            Self::V2Legacy | Self::V3Current => 4,
        }
    }

    /// Largest value the length field can hold.
    pub fn max_length(self) -> usize {
        match self {
            Self::V1Legacy => 0x00FF_FFFF,
            Self::V2Legacy | Self::V3Current => u32::MAX as usize,
        }
    }

    /// Whether the layout carries a chain target.
    pub fn supports_chaining(self) -> bool {
        !matches!(self, Self::V1Legacy)
    }

    /// Whether the layout carries [`FormatMeta`].
    pub fn has_metadata(self) -> bool {
        matches!(self, Self::V3Current)
    }
}

/// Tag identifying which tool produced an image. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncoderOrigin(pub u8);

impl EncoderOrigin {
    /// The editor-integrated encoder.
    pub const EDITOR: Self = Self(0);
    /// The standalone script encoder.
    pub const SCRIPT: Self = Self(1);
    /// This crate.
    pub const NATIVE: Self = Self(2);
}

/// V3 format metadata (header pixel 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMeta {
    pub data_mode: DataMode,
    pub major: u8,
    pub minor: u8,
    pub origin: EncoderOrigin,
}

impl FormatMeta {
    /// Metadata for the current version, written by this crate.
    pub fn current(data_mode: DataMode) -> Self {
        Self { data_mode, major: CURRENT_MAJOR, minor: CURRENT_MINOR, origin: EncoderOrigin::NATIVE }
    }
}

/// Decoded header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload bytes stored in this image, excluding the header.
    pub payload_len: usize,
    /// Where the next chunk lives, or [`ChainTarget::END`].
    pub next: ChainTarget,
    /// Present for [`HeaderVersion::V3Current`] only.
    pub meta: Option<FormatMeta>,
}

impl Header {
    /// True if no further chunk follows.
    pub fn is_last(&self) -> bool {
        self.next.is_end()
    }

    /// The data mode announced by the header, or `default` for layouts
    /// without metadata.
    pub fn data_mode_or(&self, default: DataMode) -> DataMode {
        self.meta.map_or(default, |m| m.data_mode)
    }
}

/// Serialize header fields into `version.header_pixels()` logical pixels.
///
/// # Errors
/// - [`StegoError::InvalidHeaderField`] if the length does not fit the
///   length field, a V1 header is asked to chain, or metadata presence does
///   not match the layout.
/// - [`StegoError::UnsupportedDataMode`] if the metadata names a data mode
///   without an implementation.
pub fn encode_header(version: HeaderVersion, header: &Header) -> Result<Vec<Pixel>, StegoError> {
    if header.payload_len > version.max_length() {
        return Err(StegoError::InvalidHeaderField("payload length exceeds the length field"));
    }
    if !version.supports_chaining() && !header.is_last() {
        return Err(StegoError::InvalidHeaderField("V1 headers cannot name a next chunk"));
    }
    if version.has_metadata() != header.meta.is_some() {
        return Err(StegoError::InvalidHeaderField("format metadata does not match the header version"));
    }

    let mut pixels = Vec::with_capacity(version.header_pixels());
    let len = header.payload_len as u32;
    match version {
        HeaderVersion::V1Legacy => {
            let [_, a, b, c] = len.to_be_bytes();
            pixels.push([a, b, c, 0]);
        }
        HeaderVersion::V2Legacy | HeaderVersion::V3Current => {
            pixels.push(len.to_be_bytes());
            pixels.extend(scan::bytes_to_pixels(header.next.as_bytes(), 4, 0)?);
        }
    }

    if let Some(meta) = header.meta {
        if !meta.data_mode.is_supported() {
            return Err(StegoError::UnsupportedDataMode(meta.data_mode));
        }
        pixels.push([0; 4]);
        pixels.push([meta.data_mode.to_byte(), meta.major, meta.minor, meta.origin.0]);
    }

    debug_assert_eq!(pixels.len(), version.header_pixels());
    Ok(pixels)
}

/// Parse the leading logical pixels of an image.
///
/// `pixels` must hold at least `version.header_pixels()` entries; extra
/// entries are ignored.
///
/// # Errors
/// - [`StegoError::InvalidHeaderField`] if too few pixels are supplied or the
///   V3 reserved pixel is not zero.
/// - [`StegoError::UnsupportedHeaderVersion`] if V3 metadata names another
///   major version or an unimplemented data mode.
pub fn decode_header(version: HeaderVersion, pixels: &[Pixel]) -> Result<Header, StegoError> {
    if pixels.len() < version.header_pixels() {
        return Err(StegoError::InvalidHeaderField("header truncated"));
    }

    let p0 = pixels[0];
    let (payload_len, next) = match version {
        HeaderVersion::V1Legacy => {
            let len = u32::from_be_bytes([0, p0[0], p0[1], p0[2]]);
            (len as usize, ChainTarget::END)
        }
        HeaderVersion::V2Legacy | HeaderVersion::V3Current => {
            let id = scan::pixels_to_bytes(&pixels[1..5], 4, ID_LEN)?;
            let mut bytes = [0u8; ID_LEN];
            bytes.copy_from_slice(&id);
            (u32::from_be_bytes(p0) as usize, ChainTarget::from_bytes(bytes))
        }
    };

    let meta = if version.has_metadata() {
        if pixels[5] != [0; 4] {
            return Err(StegoError::InvalidHeaderField("reserved header pixel is not zero"));
        }
        let [mode, major, minor, origin] = pixels[6];
        let data_mode = DataMode::from_byte(mode).filter(|m| m.is_supported());
        match data_mode {
            Some(data_mode) if major == CURRENT_MAJOR => {
                Some(FormatMeta { data_mode, major, minor, origin: EncoderOrigin(origin) })
            }
            _ => return Err(StegoError::UnsupportedHeaderVersion { major, minor, data_mode: mode }),
        }
    } else {
        None
    };

    Ok(Header { payload_len, next, meta })
}

/// Write `header` into the leading logical pixels of `buf`.
///
/// Also checks the declared length against the buffer's capacity.
pub fn write_header(version: HeaderVersion, buf: &mut PixelBuffer, header: &Header) -> Result<(), StegoError> {
    let capacity = compute_capacity(buf.width(), buf.height(), version)?;
    if header.payload_len > capacity {
        return Err(StegoError::InvalidHeaderField("payload length exceeds image capacity"));
    }
    let pixels = encode_header(version, header)?;
    scan::write_pixels(buf, 0, &pixels, version.stride())?;
    Ok(())
}

/// Read and parse the header of `buf`.
pub fn read_header(version: HeaderVersion, buf: &PixelBuffer) -> Result<Header, StegoError> {
    let n = version.header_pixels();
    if buf.pixel_count() <= n {
        return Err(StegoError::ImageTooSmall);
    }
    let pixels = scan::read_pixels(buf, 0, n, version.stride())?;
    decode_header(version, &pixels)
}

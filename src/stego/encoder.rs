// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Payload → image chain encoder.
//!
//! The payload bytes are cut into chunks of at most one image's capacity.
//! Chunk `i` gets a header naming chunk `i + 1`'s chain target (the last one
//! gets [`ChainTarget::END`]), its bytes are packed one per channel after the
//! header, the partial last pixel is padded with [`FILLER_BYTE`], and every
//! remaining pixel keeps the background colour.
//!
//! The first chunk's own identifier is not part of the input: it is whatever
//! asset the host publishes the first image under. `chain_targets[0]` is the
//! identifier of chunk 2, `chain_targets[1]` of chunk 3, and so on.
//!
//! All validation happens before any pixel is written; encoding either
//! returns every image or none.

use std::collections::HashSet;

use crate::raster::{scan, PixelBuffer, WHITE};

use super::capacity::{chunk_count, compute_capacity};
use super::error::StegoError;
use super::header::{self, EncoderOrigin, FormatMeta, Header, HeaderVersion, CURRENT_MAJOR, CURRENT_MINOR};
use super::ident::ChainTarget;
use super::text::{self, DataMode};

/// Padding byte for the unused channels of the last payload pixel.
pub const FILLER_BYTE: u8 = 0x10;

/// Colour of pixels beyond the payload.
pub const DEFAULT_BACKGROUND: [u8; 4] = WHITE;

/// Default image width, the [`Platform::Android`] preset.
pub const DEFAULT_WIDTH: u32 = 128;

/// Default image height, the [`Platform::Android`] preset.
pub const DEFAULT_HEIGHT: u32 = 96;

/// Image size presets of the hosts that display the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Platform {
    /// 128×96, loadable on every platform.
    #[default]
    Android,
    /// 1200×900, desktop hosts only.
    Pc,
}

impl Platform {
    /// `(width, height)` of the preset.
    pub fn resolution(self) -> (u32, u32) {
        match self {
            Self::Android => (DEFAULT_WIDTH, DEFAULT_HEIGHT),
            Self::Pc => (1200, 900),
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    pub width: u32,
    pub height: u32,
    /// Header layout to write. Legacy layouts are supported for
    /// compatibility testing; V1 cannot chain.
    pub version: HeaderVersion,
    /// Colour of pixels not covered by header or payload.
    pub background: [u8; 4],
    /// Origin tag written into V3 metadata.
    pub origin: EncoderOrigin,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            version: HeaderVersion::V3Current,
            background: DEFAULT_BACKGROUND,
            origin: EncoderOrigin::NATIVE,
        }
    }
}

impl EncodeOptions {
    /// Current-format options for `width`×`height` images.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, ..Self::default() }
    }

    /// Current-format options at a platform's preset resolution.
    pub fn for_platform(platform: Platform) -> Self {
        let (width, height) = platform.resolution();
        Self::new(width, height)
    }

    /// Payload bytes one image can hold, bounded by the length field.
    pub fn chunk_capacity(&self) -> Result<usize, StegoError> {
        let capacity = compute_capacity(self.width, self.height, self.version)?;
        Ok(capacity.min(self.version.max_length()))
    }
}

/// Encode `payload` text as one or more images.
///
/// # Errors
/// - [`StegoError::UnsupportedDataMode`] for ASCII or Binary.
/// - [`StegoError::ImageTooSmall`] if the dimensions leave no payload room.
/// - [`StegoError::InsufficientChainTargets`] if more chunks are needed than
///   `chain_targets.len() + 1`.
/// - [`StegoError::PayloadTooLarge`] if the layout cannot chain and the
///   payload exceeds one image.
/// - [`StegoError::InvalidIdentifierFormat`] if a used chain target is the
///   end-of-chain sentinel or appears twice.
pub fn encode_text(
    payload: &str,
    mode: DataMode,
    chain_targets: &[ChainTarget],
    options: &EncodeOptions,
) -> Result<Vec<PixelBuffer>, StegoError> {
    let bytes = text::encode_text(payload, mode)?;
    encode_bytes(&bytes, mode, chain_targets, options)
}

/// Like [`encode_text`], with chain targets given in their `avtr_…` string form.
///
/// Every identifier is validated before any encoding work starts.
pub fn encode_with_avatar_ids<S: AsRef<str>>(
    payload: &str,
    mode: DataMode,
    chain_targets: &[S],
    options: &EncodeOptions,
) -> Result<Vec<PixelBuffer>, StegoError> {
    let targets = chain_targets
        .iter()
        .map(|s| ChainTarget::parse(s.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    encode_text(payload, mode, &targets, options)
}

/// Encode pre-converted payload bytes, tagging them with `mode`.
///
/// `mode` must be a supported mode; it only affects the metadata written to
/// V3 headers.
pub fn encode_bytes(
    bytes: &[u8],
    mode: DataMode,
    chain_targets: &[ChainTarget],
    options: &EncodeOptions,
) -> Result<Vec<PixelBuffer>, StegoError> {
    if !mode.is_supported() {
        return Err(StegoError::UnsupportedDataMode(mode));
    }
    let capacity = options.chunk_capacity()?;
    let needed = plan_chunks(bytes.len(), capacity, options.version, chain_targets)?;

    log::debug!(
        "encoding {} bytes as {} image(s) of {}x{} ({} bytes each, {:?})",
        bytes.len(),
        needed,
        options.width,
        options.height,
        capacity,
        options.version
    );

    let render = |index: usize| -> Result<PixelBuffer, StegoError> {
        let start = (index * capacity).min(bytes.len());
        let end = (start + capacity).min(bytes.len());
        let next = if index + 1 == needed { ChainTarget::END } else { chain_targets[index] };
        render_chunk(&bytes[start..end], next, mode, options)
    };

    #[cfg(feature = "parallel")]
    let images = {
        use rayon::prelude::*;
        (0..needed).into_par_iter().map(render).collect::<Result<Vec<_>, _>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let images = (0..needed).map(render).collect::<Result<Vec<_>, _>>()?;

    Ok(images)
}

/// Validate the chain and return the number of images needed.
fn plan_chunks(
    len: usize,
    capacity: usize,
    version: HeaderVersion,
    chain_targets: &[ChainTarget],
) -> Result<usize, StegoError> {
    let needed = chunk_count(len, capacity);
    if needed > 1 && !version.supports_chaining() {
        return Err(StegoError::PayloadTooLarge { len, max: capacity });
    }
    if needed > chain_targets.len() + 1 {
        return Err(StegoError::InsufficientChainTargets { needed, available: chain_targets.len() });
    }
    let used = &chain_targets[..needed - 1];
    if let Some(end) = used.iter().find(|t| t.is_end()) {
        return Err(StegoError::InvalidIdentifierFormat(end.to_string()));
    }
    let mut seen = HashSet::with_capacity(used.len());
    if let Some(repeated) = used.iter().find(|t| !seen.insert(**t)) {
        log::warn!("chain target {repeated} used for more than one chunk");
        return Err(StegoError::InvalidIdentifierFormat(repeated.to_string()));
    }
    if chain_targets.len() + 1 > needed {
        log::debug!("{} chain target(s) left unused", chain_targets.len() + 1 - needed);
    }
    Ok(needed)
}

/// Build one self-describing image for a single chunk.
fn render_chunk(
    chunk: &[u8],
    next: ChainTarget,
    mode: DataMode,
    options: &EncodeOptions,
) -> Result<PixelBuffer, StegoError> {
    let version = options.version;
    let stride = version.stride();
    let mut buf = PixelBuffer::filled(options.width, options.height, stride as u8, options.background)?;

    let meta = version.has_metadata().then_some(FormatMeta {
        data_mode: mode,
        major: CURRENT_MAJOR,
        minor: CURRENT_MINOR,
        origin: options.origin,
    });
    let header = Header { payload_len: chunk.len(), next, meta };
    header::write_header(version, &mut buf, &header)?;

    let body = scan::bytes_to_pixels(chunk, stride, FILLER_BYTE)?;
    scan::write_pixels(&mut buf, version.header_pixels(), &body, stride)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::scan::read_pixels;

    fn targets(n: usize) -> Vec<ChainTarget> {
        (0..n).map(|i| ChainTarget::from_bytes([i as u8 + 1; 16])).collect()
    }

    #[test]
    fn hi_fits_one_image() {
        let images = encode_text("hi", DataMode::Utf8, &[], &EncodeOptions::new(8, 8)).unwrap();
        assert_eq!(images.len(), 1);
        let header = header::read_header(HeaderVersion::V3Current, &images[0]).unwrap();
        assert_eq!(header.payload_len, 2);
        assert!(header.is_last());
        assert_eq!(header.meta.unwrap().data_mode, DataMode::Utf8);
        assert_eq!(header.meta.unwrap().origin, EncoderOrigin::NATIVE);
        // Body starts right after the 7 header pixels, padded with filler.
        assert_eq!(images[0].logical(7).unwrap(), &[b'h', b'i', FILLER_BYTE, FILLER_BYTE]);
        // Everything after the body is background.
        assert_eq!(images[0].logical(8).unwrap(), &WHITE);
        assert_eq!(images[0].pixel(0).unwrap(), &WHITE);
    }

    #[test]
    fn three_hundred_bytes_two_images() {
        let text = "a".repeat(300);
        let images = encode_text(&text, DataMode::Utf8, &targets(1), &EncodeOptions::new(8, 8)).unwrap();
        assert_eq!(images.len(), 2);
        let h0 = header::read_header(HeaderVersion::V3Current, &images[0]).unwrap();
        let h1 = header::read_header(HeaderVersion::V3Current, &images[1]).unwrap();
        assert_eq!(h0.payload_len, 228);
        assert_eq!(h0.next, targets(1)[0]);
        assert_eq!(h1.payload_len, 72);
        assert!(h1.is_last());
    }

    #[test]
    fn exact_capacity_is_one_image() {
        let opts = EncodeOptions::new(8, 8);
        let images = encode_bytes(&[7u8; 228], DataMode::Utf8, &[], &opts).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(
            encode_bytes(&[7u8; 229], DataMode::Utf8, &[], &opts).unwrap_err(),
            StegoError::InsufficientChainTargets { needed: 2, available: 0 }
        );
        assert_eq!(encode_bytes(&[7u8; 229], DataMode::Utf8, &targets(1), &opts).unwrap().len(), 2);
    }

    #[test]
    fn empty_payload_still_one_image() {
        let images = encode_text("", DataMode::Utf16, &targets(3), &EncodeOptions::new(8, 8)).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(header::read_header(HeaderVersion::V3Current, &images[0]).unwrap().payload_len, 0);
    }

    #[test]
    fn utf16_doubles_bytes() {
        // 150 chars → 300 bytes in UTF-16 → 2 chunks.
        let text = "b".repeat(150);
        let images = encode_text(&text, DataMode::Utf16, &targets(1), &EncodeOptions::new(8, 8)).unwrap();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn invalid_avatar_id_rejected_before_encoding() {
        let err = encode_with_avatar_ids("x", DataMode::Utf8, &["avtr_nope"], &EncodeOptions::new(8, 8)).unwrap_err();
        assert_eq!(err, StegoError::InvalidIdentifierFormat("avtr_nope".into()));
    }

    #[test]
    fn sentinel_as_chain_target_rejected() {
        let err = encode_bytes(&[0u8; 300], DataMode::Utf8, &[ChainTarget::END], &EncodeOptions::new(8, 8)).unwrap_err();
        assert!(matches!(err, StegoError::InvalidIdentifierFormat(_)));
    }

    #[test]
    fn repeated_chain_target_rejected() {
        let a = ChainTarget::from_bytes([0xA1; 16]);
        let err = encode_bytes(&[0u8; 500], DataMode::Utf8, &[a, a], &EncodeOptions::new(8, 8)).unwrap_err();
        assert_eq!(err, StegoError::InvalidIdentifierFormat(a.to_string()));

        // Only targets that end up in a header count.
        let images = encode_bytes(&[0u8; 300], DataMode::Utf8, &[a, a], &EncodeOptions::new(8, 8)).unwrap();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn huge_dimensions_fail_without_panicking() {
        let err = encode_text("x", DataMode::Utf8, &[], &EncodeOptions::new(u32::MAX, u32::MAX)).unwrap_err();
        assert!(matches!(err, StegoError::Raster(crate::raster::error::RasterError::InvalidDimensions { .. })));
    }

    #[test]
    fn platform_presets() {
        assert_eq!(EncodeOptions::for_platform(Platform::Android), EncodeOptions::default());
        let pc = EncodeOptions::for_platform(Platform::Pc);
        assert_eq!((pc.width, pc.height), (1200, 900));
        assert_eq!(pc.chunk_capacity().unwrap(), (1200 * 900 - 7) * 4);
    }

    #[test]
    fn binary_mode_is_a_seam_only() {
        assert_eq!(
            encode_bytes(&[1, 2, 3], DataMode::Binary, &[], &EncodeOptions::new(8, 8)).unwrap_err(),
            StegoError::UnsupportedDataMode(DataMode::Binary)
        );
    }

    #[test]
    fn image_too_small() {
        assert_eq!(
            encode_text("x", DataMode::Utf8, &[], &EncodeOptions::new(7, 1)).unwrap_err(),
            StegoError::ImageTooSmall
        );
    }

    #[test]
    fn v1_cannot_chain() {
        let opts = EncodeOptions { version: HeaderVersion::V1Legacy, ..EncodeOptions::new(4, 4) };
        // (16 - 1) * 3 = 45 bytes per image.
        let images = encode_bytes(&[1u8; 45], DataMode::Utf16, &[], &opts).unwrap();
        assert_eq!(images[0].channels(), 3);
        assert_eq!(
            encode_bytes(&[1u8; 46], DataMode::Utf16, &targets(5), &opts).unwrap_err(),
            StegoError::PayloadTooLarge { len: 46, max: 45 }
        );
    }

    #[test]
    fn custom_background() {
        let opts = EncodeOptions { background: [0, 0, 0, 255], ..EncodeOptions::new(8, 8) };
        let images = encode_text("hi", DataMode::Utf8, &[], &opts).unwrap();
        let tail = read_pixels(&images[0], 8, 56, 4).unwrap();
        assert!(tail.iter().all(|px| *px == [0, 0, 0, 255]));
    }
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the pixel-stream codec.
//!
//! [`StegoError`] covers every failure from capacity arithmetic through
//! header parsing, chain following and text decoding. Encode-time errors are
//! returned before any image is produced; decode-time errors are terminal for
//! the [`DecodeSession`](super::session::DecodeSession) that raised them.

use core::fmt;

use super::ident::ChainTarget;
use super::text::DataMode;

/// Errors that can occur during encoding or decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StegoError {
    /// A pixel buffer was malformed or addressed out of range.
    Raster(crate::raster::error::RasterError),
    /// `width * height` leaves no room after the header pixels.
    ImageTooSmall,
    /// The payload cannot be stored even with every available chain link.
    PayloadTooLarge { len: usize, max: usize },
    /// More chunks are needed than chain targets were supplied for.
    InsufficientChainTargets { needed: usize, available: usize },
    /// A chain target string is not of the form `avtr_xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
    InvalidIdentifierFormat(String),
    /// A header field is out of range or structurally invalid.
    InvalidHeaderField(&'static str),
    /// The header announces a format version or data mode this codec does not implement.
    UnsupportedHeaderVersion { major: u8, minor: u8, data_mode: u8 },
    /// The requested data mode is declared but has no implementation.
    UnsupportedDataMode(DataMode),
    /// A buffer arrived for a chain target other than the one requested.
    UnexpectedChunk { expected: ChainTarget, received: ChainTarget },
    /// The next chunk did not become available within the retry budget.
    Timeout { attempts: u32 },
    /// Strict text decoding hit an invalid sequence at the given byte offset.
    MalformedText { offset: usize },
    /// The session is finished or failed and accepts no further input.
    SessionClosed,
    /// The call is not valid in the session's current phase. Not fatal.
    InvalidState(&'static str),
    /// The operation was cancelled by the caller.
    Cancelled,
}

impl fmt::Display for StegoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raster(e) => write!(f, "invalid pixel buffer: {e}"),
            Self::ImageTooSmall => write!(f, "image too small to hold the header"),
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload of {len} bytes exceeds the {max} bytes this chain can hold")
            }
            Self::InsufficientChainTargets { needed, available } => write!(
                f,
                "payload needs {needed} chunks but only {available} chain targets were supplied"
            ),
            Self::InvalidIdentifierFormat(id) => write!(f, "invalid chain identifier: {id:?}"),
            Self::InvalidHeaderField(what) => write!(f, "invalid header field: {what}"),
            Self::UnsupportedHeaderVersion { major, minor, data_mode } => write!(
                f,
                "unsupported header V{major}.{minor} (data mode {data_mode})"
            ),
            Self::UnsupportedDataMode(mode) => write!(f, "data mode {mode:?} is not supported yet"),
            Self::UnexpectedChunk { expected, received } => {
                write!(f, "expected chunk for {expected}, received {received}")
            }
            Self::Timeout { attempts } => {
                write!(f, "next chunk not available after {attempts} attempts")
            }
            Self::MalformedText { offset } => write!(f, "malformed text at byte {offset}"),
            Self::SessionClosed => write!(f, "decode session is closed"),
            Self::InvalidState(what) => write!(f, "invalid session state: {what}"),
            Self::Cancelled => write!(f, "operation cancelled by user"),
        }
    }
}

impl std::error::Error for StegoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Raster(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::raster::error::RasterError> for StegoError {
    fn from(e: crate::raster::error::RasterError) -> Self {
        Self::Raster(e)
    }
}

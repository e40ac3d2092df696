// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! # chainpix-core
//!
//! Hides text inside the raw pixels of one or more images. Payload bytes are
//! written directly into pixel channels (not in least-significant bits), so
//! the images look like noise and are not meant to be inconspicuous. Long
//! payloads are split across a chain of images, each naming the next.
//!
//! The pixel layer (`raster` module) is zero-dependency (std only) and knows
//! nothing about file formats; loading and saving images is the host's job.
//! The codec layer (`stego` module) builds headers, chains and the
//! incremental decoder on top of it.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use chainpix_core::{decode_chain, encode_text, ChainTarget, DataMode};
//! use chainpix_core::{DecodeOptions, EncodeOptions, MemorySource, RetryPolicy};
//!
//! let root: ChainTarget = "avtr_00000000-0000-0000-0000-000000000001".parse().unwrap();
//! let next: ChainTarget = "avtr_00000000-0000-0000-0000-000000000002".parse().unwrap();
//!
//! let images = encode_text("a long message", DataMode::Utf8, &[next], &EncodeOptions::default()).unwrap();
//! let mut source = MemorySource::from_chain(root, &[next], images);
//! let options = DecodeOptions { retry: RetryPolicy::immediate(3), ..Default::default() };
//! let decoded = decode_chain(&mut source, root, options).unwrap();
//! assert_eq!(decoded.text, "a long message");
//! ```

pub mod raster;
pub mod stego;

pub use raster::error::{RasterError, Result as RasterResult};
pub use raster::PixelBuffer;
pub use stego::{encode_bytes, encode_text, encode_with_avatar_ids, EncodeOptions, Platform};
pub use stego::{decode_chain, DecodeOptions, DecodeSession, DecodedPayload, StepOutcome};
pub use stego::{ChainTarget, DataMode, Header, HeaderVersion, StegoError};
pub use stego::{MemorySource, PixelSource, RetryPolicy};
pub use stego::progress;

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Chained text-in-pixels encoding and decoding.
//!
//! A payload is converted to bytes ([`text`]), split into chunks sized to
//! the image capacity ([`capacity`]), and each chunk is written into its own
//! image behind a small header ([`header`]) that records the chunk length and
//! the identifier of the image holding the next chunk ([`ident`]).
//!
//! - **Encode** ([`encode_text`]): one call, returns every image of the chain.
//! - **Decode** ([`DecodeSession`]): incremental and resumable, fed one image
//!   at a time, with bounded work per step. [`decode_chain`] drives a session
//!   to completion against a [`PixelSource`].

pub mod error;
pub mod ident;
pub mod header;
pub mod capacity;
pub mod text;
pub mod encoder;
pub mod session;
pub mod source;
pub mod progress;

pub use error::StegoError;
pub use ident::ChainTarget;
pub use header::{EncoderOrigin, FormatMeta, Header, HeaderVersion};
pub use capacity::{chunk_count, compute_capacity};
pub use text::{DataMode, TextPolicy};
pub use encoder::{encode_bytes, encode_text, encode_with_avatar_ids, EncodeOptions, Platform};
pub use session::{
    Checkpoint, DecodeOptions, DecodeSession, DecodedPayload, LengthOverflow, Phase, StepOutcome,
};
pub use source::{decode_chain, MemorySource, PixelSource, PollOutcome, RetryPolicy};
pub use progress::Progress;

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Where chain images come from.
//!
//! A host loads the image for a chain target asynchronously (download,
//! texture upload, …). The decoder only needs two things from it: a way to
//! ask for a target and a way to check whether the pixels have arrived.

use std::collections::HashMap;
use std::time::Duration;

use crate::raster::PixelBuffer;

use super::error::StegoError;
use super::header::Header;
use super::ident::ChainTarget;
use super::session::{DecodeOptions, DecodeSession, DecodedPayload, StepOutcome};

/// Supplier of pixel buffers for chain targets.
pub trait PixelSource {
    /// Start loading the image for `target`.
    fn request(&mut self, target: &ChainTarget);

    /// The buffer for `target`, if it is available yet.
    fn poll(&mut self, target: &ChainTarget) -> Option<PixelBuffer>;
}

impl<S: PixelSource + ?Sized> PixelSource for &mut S {
    fn request(&mut self, target: &ChainTarget) {
        (**self).request(target)
    }

    fn poll(&mut self, target: &ChainTarget) -> Option<PixelBuffer> {
        (**self).poll(target)
    }
}

/// How long to wait for the next chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed polls before the session times out.
    pub max_attempts: u32,
    /// Delay between requesting a target and the first poll.
    pub initial_delay: Duration,
    /// Delay between polls.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            interval: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// No delays; for in-memory sources and tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts, initial_delay: Duration::ZERO, interval: Duration::ZERO }
    }
}

/// Result of [`DecodeSession::poll_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The buffer arrived and its header was read.
    Ready(Header),
    /// Not yet; poll again after `retry_after`.
    Pending { attempt: u32, retry_after: Duration },
}

/// CRC-32 over dimensions and pixel data.
///
/// Used to tell whether the host still presents the previous chunk's image.
pub fn fingerprint(buf: &PixelBuffer) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&buf.width().to_le_bytes());
    hasher.update(&buf.height().to_le_bytes());
    hasher.update(&[buf.channels()]);
    hasher.update(buf.as_bytes());
    hasher.finalize()
}

/// Buffers held in memory, keyed by chain target.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    images: HashMap<ChainTarget, PixelBuffer>,
    requests: Vec<ChainTarget>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair encoder output with the identifiers it was chained under:
    /// `images[0]` under `root`, `images[i]` under `targets[i - 1]`.
    pub fn from_chain(root: ChainTarget, targets: &[ChainTarget], images: Vec<PixelBuffer>) -> Self {
        let mut source = Self::new();
        let ids = core::iter::once(root).chain(targets.iter().copied());
        for (id, image) in ids.zip(images) {
            source.insert(id, image);
        }
        source
    }

    pub fn insert(&mut self, target: ChainTarget, image: PixelBuffer) -> Option<PixelBuffer> {
        self.images.insert(target, image)
    }

    pub fn remove(&mut self, target: &ChainTarget) -> Option<PixelBuffer> {
        self.images.remove(target)
    }

    /// Targets requested so far, in order.
    pub fn requests(&self) -> &[ChainTarget] {
        &self.requests
    }
}

impl PixelSource for MemorySource {
    fn request(&mut self, target: &ChainTarget) {
        self.requests.push(*target);
    }

    fn poll(&mut self, target: &ChainTarget) -> Option<PixelBuffer> {
        self.images.get(target).cloned()
    }
}

/// Decode a whole chain starting at `root`, blocking between polls.
///
/// Sleeps for the delays of `options.retry`; pass
/// [`RetryPolicy::immediate`] for sources that never make the caller wait.
pub fn decode_chain<S: PixelSource + ?Sized>(
    source: &mut S,
    root: ChainTarget,
    options: DecodeOptions,
) -> Result<DecodedPayload, StegoError> {
    let mut session = DecodeSession::anchored(root, options);
    loop {
        match session.poll_next(source)? {
            PollOutcome::Ready(_) => {}
            PollOutcome::Pending { retry_after, .. } => {
                if !retry_after.is_zero() {
                    std::thread::sleep(retry_after);
                }
                continue;
            }
        }
        session.drain_chunk()?;
        match session.step()? {
            StepOutcome::Done => return session.finish(),
            StepOutcome::NeedChunk(_) => {}
            other => return Err(StegoError::InvalidState(unexpected(other))),
        }
    }
}

fn unexpected(outcome: StepOutcome) -> &'static str {
    match outcome {
        StepOutcome::Progress(_) | StepOutcome::ChunkComplete(_) => "chunk not fully drained",
        StepOutcome::NeedChunk(_) | StepOutcome::Done => "unexpected step outcome",
    }
}

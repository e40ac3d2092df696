// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Shared helpers for integration tests.

#![allow(dead_code)]

use chainpix_core::stego::{DecodeOptions, DecodeSession, DecodedPayload, StepOutcome};
use chainpix_core::{ChainTarget, PixelBuffer};

/// Route `log` output through the test harness. Set `RUST_LOG=debug` to see it.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn target(n: u8) -> ChainTarget {
    ChainTarget::from_bytes([n; 16])
}

/// `count` distinct non-sentinel targets, starting at 2.
pub fn targets(count: usize) -> Vec<ChainTarget> {
    (0..count).map(|i| ChainTarget::from_bytes([(i + 2) as u8; 16])).collect()
}

/// Feed `images` in chain order through a session anchored at `target(1)`,
/// stepping by hand.
///
/// Returns the payload and the number of `step` calls made.
pub fn decode_images(images: &[PixelBuffer], options: DecodeOptions) -> (DecodedPayload, usize) {
    let mut next = target(1);
    let mut session = DecodeSession::anchored(next, options);
    let mut steps = 0;
    for (i, image) in images.iter().enumerate() {
        session.supply(next, image.clone()).unwrap();
        loop {
            steps += 1;
            match session.step().unwrap() {
                StepOutcome::Progress(_) | StepOutcome::ChunkComplete(_) => {}
                StepOutcome::NeedChunk(t) => {
                    assert!(i + 1 < images.len(), "chain longer than supplied images");
                    next = t;
                    break;
                }
                StepOutcome::Done => {
                    assert_eq!(i + 1, images.len(), "chain ended early");
                    return (session.finish().unwrap(), steps);
                }
            }
        }
    }
    panic!("chain did not end");
}

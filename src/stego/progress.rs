// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Decode progress tracking and cancellation.
//!
//! Each [`DecodeSession`](super::session::DecodeSession) owns one
//! [`Progress`] handle. The handle is a cheap `Arc` clone backed by atomics,
//! so a UI thread can poll [`Progress::get`] or call [`Progress::cancel`]
//! while another thread drives the session. Handles are never shared between
//! sessions.
//!
//! Units are payload bytes. The total grows as each chunk header is read,
//! since the length of later chunks is unknown until they arrive.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::error::StegoError;

#[derive(Debug, Default)]
struct Inner {
    step: AtomicU64,
    total: AtomicU64,
    cancelled: AtomicBool,
}

/// Shareable progress and cancellation state for one decode session.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    inner: Arc<Inner>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset progress to 0 and clear the cancellation flag.
    pub fn init(&self, total: u64) {
        self.inner.cancelled.store(false, Ordering::Relaxed);
        self.inner.step.store(0, Ordering::Relaxed);
        self.inner.total.store(total, Ordering::Relaxed);
    }

    /// Raise the total by `more` without touching the current step.
    pub fn extend_total(&self, more: u64) {
        self.inner.total.fetch_add(more, Ordering::Relaxed);
    }

    /// Advance by `n` bytes. The step never passes the total.
    pub fn advance(&self, n: u64) {
        let total = self.inner.total.load(Ordering::Relaxed);
        let _ = self.inner.step.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
            Some(s.saturating_add(n).min(total))
        });
    }

    /// Current `(step, total)`.
    pub fn get(&self) -> (u64, u64) {
        (self.inner.step.load(Ordering::Relaxed), self.inner.total.load(Ordering::Relaxed))
    }

    /// Mark progress as complete (step = total).
    pub fn finish(&self) {
        let t = self.inner.total.load(Ordering::Relaxed);
        self.inner.step.store(t, Ordering::Relaxed);
    }

    /// Request cancellation. The session observes it at its next call.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Relaxed)
    }

    /// Return [`StegoError::Cancelled`] if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<(), StegoError> {
        if self.is_cancelled() {
            Err(StegoError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_is_capped() {
        let p = Progress::new();
        p.init(10);
        p.advance(4);
        assert_eq!(p.get(), (4, 10));
        p.advance(100);
        assert_eq!(p.get(), (10, 10));
        p.extend_total(5);
        p.advance(1);
        assert_eq!(p.get(), (11, 15));
        p.finish();
        assert_eq!(p.get(), (15, 15));
    }

    #[test]
    fn cancel_visible_through_clone() {
        let p = Progress::new();
        let ui = p.clone();
        assert!(p.check_cancelled().is_ok());
        ui.cancel();
        assert_eq!(p.check_cancelled().unwrap_err(), StegoError::Cancelled);
        p.init(0);
        assert!(!ui.is_cancelled());
    }

    #[test]
    fn usable_across_threads() {
        let p = Progress::new();
        p.init(1000);
        let worker = p.clone();
        std::thread::spawn(move || {
            for _ in 0..100 {
                worker.advance(5);
            }
        })
        .join()
        .unwrap();
        assert_eq!(p.get(), (500, 1000));
    }
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Incremental, resumable decoding of an image chain.
//!
//! A [`DecodeSession`] owns all state of one decode: the accumulated payload
//! bytes, the text decoder, the scan cursor into the current image and the
//! chain target it is waiting for. It moves through these phases:
//!
//! ```text
//! Idle ──supply──▶ HeaderRead ──step──▶ Draining ──step──▶ … ──▶ ChunkComplete
//!                                                                   │ step
//!                      ┌──────────── not the last chunk ◀───────────┤
//!                      ▼                                            ▼
//!              AwaitingNextChunk ──supply──▶ HeaderRead …          Done
//!
//! any phase ──error / abort──▶ Error (terminal)
//! ```
//!
//! Each [`step`](DecodeSession::step) copies at most
//! [`DecodeOptions::step_budget`] pixels, so a cooperative host can spread a
//! large payload over many frames. The budget changes how many calls are
//! needed, never the result. Hosts without that constraint can drive the
//! session to completion in a loop, or use [`decode_chain`](super::source::decode_chain).

use crate::raster::{scan, PixelBuffer};

use super::capacity::{body_pixels, compute_capacity};
use super::error::StegoError;
use super::header::{self, Header, HeaderVersion};
use super::ident::ChainTarget;
use super::progress::Progress;
use super::source::{fingerprint, PixelSource, PollOutcome, RetryPolicy};
use super::text::{DataMode, TextDecoder, TextPolicy};

/// Pixels copied per [`DecodeSession::step`] call by default.
pub const DEFAULT_STEP_BUDGET: usize = 2500;

/// What to do when a header declares more bytes than the image can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthOverflow {
    /// Fail with [`StegoError::InvalidHeaderField`].
    #[default]
    Reject,
    /// Log a warning and read only as many bytes as fit.
    Clamp,
}

/// Decoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Header layout of every image in the chain. Pinned by the caller.
    pub version: HeaderVersion,
    /// Data mode for layouts whose header carries none (V1, V2).
    pub default_data_mode: DataMode,
    /// Maximum pixels copied per step. Zero is treated as one.
    pub step_budget: usize,
    pub text_policy: TextPolicy,
    pub length_overflow: LengthOverflow,
    pub retry: RetryPolicy,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            version: HeaderVersion::V3Current,
            default_data_mode: DataMode::Utf8,
            step_budget: DEFAULT_STEP_BUDGET,
            text_policy: TextPolicy::Lenient,
            length_overflow: LengthOverflow::Reject,
            retry: RetryPolicy::default(),
        }
    }
}

/// Externally visible session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    HeaderRead,
    Draining,
    ChunkComplete,
    AwaitingNextChunk,
    Done,
    Error,
}

/// Snapshot of decode progress after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    /// Zero-based index of the chunk being drained.
    pub chunk: usize,
    /// Bytes of this chunk decoded so far.
    pub chunk_bytes: usize,
    /// Declared (possibly clamped) length of this chunk.
    pub chunk_len: usize,
    /// Bytes decoded across the whole chain so far.
    pub total_bytes: usize,
}

impl Checkpoint {
    pub fn chunk_done(&self) -> bool {
        self.chunk_bytes == self.chunk_len
    }
}

/// Result of one [`DecodeSession::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// More bytes of the current chunk remain.
    Progress(Checkpoint),
    /// The current chunk is fully drained; the next step resolves the chain.
    ChunkComplete(Checkpoint),
    /// Supply the buffer for this target next.
    NeedChunk(ChainTarget),
    /// The chain ended; call [`DecodeSession::finish`].
    Done,
}

/// The fully decoded payload of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub text: String,
    /// Raw payload bytes, concatenated in chain order.
    pub bytes: Vec<u8>,
    pub data_mode: DataMode,
    /// Headers of every chunk, in chain order.
    pub headers: Vec<Header>,
}

impl DecodedPayload {
    pub fn chunks(&self) -> usize {
        self.headers.len()
    }
}

#[derive(Debug)]
struct Chunk {
    buffer: PixelBuffer,
    header: Header,
    /// Bytes to read from this chunk.
    len: usize,
    /// Next body pixel to read, relative to the end of the header.
    cursor: usize,
    read: usize,
}

#[derive(Debug, Clone, Copy)]
struct Waiting {
    expected: Option<ChainTarget>,
    requested: bool,
    attempts: u32,
}

impl Waiting {
    fn new(expected: Option<ChainTarget>) -> Self {
        Self { expected, requested: false, attempts: 0 }
    }
}

#[derive(Debug)]
enum State {
    Idle(Waiting),
    HeaderRead(Chunk),
    Draining(Chunk),
    ChunkComplete(Header),
    Awaiting(Waiting),
    Done(String),
    Failed(StegoError),
}

/// One decode of one image chain. Not shared between chains.
#[derive(Debug)]
pub struct DecodeSession {
    options: DecodeOptions,
    state: State,
    bytes: Vec<u8>,
    text: Option<TextDecoder>,
    data_mode: Option<DataMode>,
    headers: Vec<Header>,
    last_fingerprint: Option<u32>,
    progress: Progress,
}

impl DecodeSession {
    /// Start a session that accepts the first chunk under any identifier.
    ///
    /// Nothing ties the first buffer to the start of a chain, so a middle
    /// chunk supplied first is decoded as if it were the root. Only later
    /// chunks are checked against the header that named them. Use
    /// [`anchored`](Self::anchored) when the root identifier is known.
    pub fn new(options: DecodeOptions) -> Self {
        Self::with_state(options, Waiting::new(None))
    }

    /// Start a session whose first chunk must be supplied under `root`.
    pub fn anchored(root: ChainTarget, options: DecodeOptions) -> Self {
        Self::with_state(options, Waiting::new(Some(root)))
    }

    fn with_state(options: DecodeOptions, waiting: Waiting) -> Self {
        let progress = Progress::new();
        progress.init(0);
        Self {
            options,
            state: State::Idle(waiting),
            bytes: Vec::new(),
            text: None,
            data_mode: None,
            headers: Vec::new(),
            last_fingerprint: None,
            progress,
        }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle(_) => Phase::Idle,
            State::HeaderRead(_) => Phase::HeaderRead,
            State::Draining(_) => Phase::Draining,
            State::ChunkComplete(_) => Phase::ChunkComplete,
            State::Awaiting(_) => Phase::AwaitingNextChunk,
            State::Done(_) => Phase::Done,
            State::Failed(_) => Phase::Error,
        }
    }

    /// Handle for polling progress or cancelling from another thread.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    /// The chain target the session is waiting for, if any.
    pub fn awaiting(&self) -> Option<ChainTarget> {
        match &self.state {
            State::Idle(w) | State::Awaiting(w) => w.expected,
            _ => None,
        }
    }

    /// The terminal error, if the session failed.
    pub fn error(&self) -> Option<&StegoError> {
        match &self.state {
            State::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Payload bytes accumulated so far.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Text decoded so far.
    pub fn text(&self) -> &str {
        match (&self.state, &self.text) {
            (State::Done(text), _) => text.as_str(),
            (_, Some(decoder)) => decoder.text(),
            _ => "",
        }
    }

    /// Headers of the chunks read so far.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Feed the buffer for chain target `id`.
    ///
    /// Valid while `Idle` or `AwaitingNextChunk`. The header is parsed
    /// immediately and returned.
    ///
    /// # Errors
    /// Fatal for the session:
    /// - [`StegoError::UnexpectedChunk`] if `id` is not the awaited target.
    /// - [`StegoError::UnsupportedHeaderVersion`] / [`StegoError::InvalidHeaderField`]
    ///   from header parsing or chain consistency checks.
    ///
    /// Not fatal: [`StegoError::InvalidState`] while a chunk is being drained.
    pub fn supply(&mut self, id: ChainTarget, buffer: PixelBuffer) -> Result<Header, StegoError> {
        self.check_open()?;
        let waiting = match &self.state {
            State::Idle(w) | State::Awaiting(w) => *w,
            _ => return Err(StegoError::InvalidState("a chunk is already being decoded")),
        };
        if let Err(e) = self.progress.check_cancelled() {
            return Err(self.fail(e));
        }
        if let Some(expected) = waiting.expected {
            if expected != id {
                return Err(self.fail(StegoError::UnexpectedChunk { expected, received: id }));
            }
        }
        match self.begin_chunk(buffer) {
            Ok(header) => Ok(header),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn begin_chunk(&mut self, buffer: PixelBuffer) -> Result<Header, StegoError> {
        let version = self.options.version;
        let header = header::read_header(version, &buffer)?;

        let mode = header.data_mode_or(self.options.default_data_mode);
        match self.data_mode {
            None => {
                self.text = Some(TextDecoder::new(mode, self.options.text_policy)?);
                self.data_mode = Some(mode);
            }
            Some(previous) if previous != mode => {
                return Err(StegoError::InvalidHeaderField("data mode changed within the chain"));
            }
            Some(_) => {}
        }

        let capacity = compute_capacity(buffer.width(), buffer.height(), version)?;
        let len = if header.payload_len > capacity {
            match self.options.length_overflow {
                LengthOverflow::Reject => {
                    return Err(StegoError::InvalidHeaderField("payload length exceeds image capacity"));
                }
                LengthOverflow::Clamp => {
                    log::warn!(
                        "encoded data length is {} bytes, only {} bytes will be read",
                        header.payload_len,
                        capacity
                    );
                    capacity
                }
            }
        } else {
            header.payload_len
        };

        let index = self.headers.len();
        match header.meta {
            Some(meta) => log::debug!(
                "chunk {index}: {}x{}, {len} bytes, V{}.{} origin {} mode {:?}, next {}",
                buffer.width(),
                buffer.height(),
                meta.major,
                meta.minor,
                meta.origin.0,
                meta.data_mode,
                header.next
            ),
            None => log::debug!(
                "chunk {index}: {}x{}, {len} bytes ({version:?}), next {}",
                buffer.width(),
                buffer.height(),
                header.next
            ),
        }

        self.last_fingerprint = Some(fingerprint(&buffer));
        self.headers.push(header);
        self.progress.extend_total(len as u64);
        self.state = State::HeaderRead(Chunk { buffer, header, len, cursor: 0, read: 0 });
        Ok(header)
    }

    /// Advance the state machine by one bounded unit of work.
    ///
    /// # Errors
    /// Returns the session's terminal error once it has failed, and
    /// [`StegoError::InvalidState`] (not fatal) while `Idle`.
    pub fn step(&mut self) -> Result<StepOutcome, StegoError> {
        match &self.state {
            State::Failed(e) => return Err(e.clone()),
            State::Done(_) => return Ok(StepOutcome::Done),
            State::Idle(_) => return Err(StegoError::InvalidState("no chunk supplied yet")),
            State::Awaiting(w) => {
                if let Some(target) = w.expected {
                    return Ok(StepOutcome::NeedChunk(target));
                }
            }
            _ => {}
        }
        if let Err(e) = self.progress.check_cancelled() {
            return Err(self.fail(e));
        }

        match std::mem::replace(&mut self.state, State::Failed(StegoError::SessionClosed)) {
            State::HeaderRead(chunk) | State::Draining(chunk) => self.drain(chunk),
            State::ChunkComplete(header) => self.resolve(header),
            other => {
                self.state = other;
                Err(StegoError::InvalidState("nothing to step"))
            }
        }
    }

    fn drain(&mut self, mut chunk: Chunk) -> Result<StepOutcome, StegoError> {
        let version = self.options.version;
        let budget = self.options.step_budget.max(1);
        let remaining_pixels = body_pixels(chunk.len, version) - chunk.cursor;
        let count = budget.min(remaining_pixels);

        let before = self.bytes.len();
        let appended = scan::append_bytes(
            &chunk.buffer,
            version.header_pixels() + chunk.cursor,
            count,
            version.stride(),
            chunk.len - chunk.read,
            &mut self.bytes,
        );
        let appended = match appended {
            Ok(n) => n,
            Err(e) => return Err(self.fail(e.into())),
        };
        chunk.cursor += count;
        chunk.read += appended;
        self.progress.advance(appended as u64);

        if let Some(decoder) = self.text.as_mut() {
            if let Err(e) = decoder.feed(&self.bytes[before..]) {
                return Err(self.fail(e));
            }
        }

        let checkpoint = Checkpoint {
            chunk: self.headers.len() - 1,
            chunk_bytes: chunk.read,
            chunk_len: chunk.len,
            total_bytes: self.bytes.len(),
        };
        log::trace!(
            "chunk {} step: pixel {} of {}, {} of {} bytes",
            checkpoint.chunk,
            chunk.cursor,
            body_pixels(chunk.len, version),
            chunk.read,
            chunk.len
        );

        if chunk.read == chunk.len {
            self.state = State::ChunkComplete(chunk.header);
            Ok(StepOutcome::ChunkComplete(checkpoint))
        } else {
            self.state = State::Draining(chunk);
            Ok(StepOutcome::Progress(checkpoint))
        }
    }

    fn resolve(&mut self, header: Header) -> Result<StepOutcome, StegoError> {
        if !header.is_last() {
            log::debug!("next chunk in header: {}", header.next);
            self.state = State::Awaiting(Waiting::new(Some(header.next)));
            return Ok(StepOutcome::NeedChunk(header.next));
        }

        let text = match self.text.take().map(TextDecoder::finish).transpose() {
            Ok(text) => text.unwrap_or_default(),
            Err(e) => return Err(self.fail(e)),
        };
        log::info!(
            "decode finished: {} chunk(s), {} bytes, {} chars",
            self.headers.len(),
            self.bytes.len(),
            text.chars().count()
        );
        self.progress.finish();
        self.state = State::Done(text);
        Ok(StepOutcome::Done)
    }

    /// Iterate over the remaining checkpoints of the current chunk.
    ///
    /// Each item is one [`step`](Self::step). The iterator ends after the
    /// chunk completes or an error is yielded; it yields nothing unless the
    /// session is in `HeaderRead` or `Draining`.
    pub fn checkpoints(&mut self) -> Checkpoints<'_> {
        Checkpoints { session: self, finished: false }
    }

    /// Drain the current chunk in a tight loop and return its last checkpoint.
    pub fn drain_chunk(&mut self) -> Result<Checkpoint, StegoError> {
        let mut last = None;
        for checkpoint in self.checkpoints() {
            last = Some(checkpoint?);
        }
        last.ok_or(StegoError::InvalidState("no chunk is being drained"))
    }

    /// Make one attempt to obtain the awaited buffer from `source`.
    ///
    /// The first call after a chunk is requested asks `source` to start
    /// loading it and returns `Pending` with the policy's initial delay.
    /// Each later call polls once; a missing buffer, or one identical to the
    /// previous chunk's (the host has not switched images yet), counts as a
    /// failed attempt. Once [`RetryPolicy::max_attempts`] attempts failed the
    /// session ends with [`StegoError::Timeout`].
    pub fn poll_next<S: PixelSource + ?Sized>(&mut self, source: &mut S) -> Result<PollOutcome, StegoError> {
        self.check_open()?;
        let mut waiting = match &self.state {
            State::Idle(w) | State::Awaiting(w) => *w,
            _ => return Err(StegoError::InvalidState("not waiting for a chunk")),
        };
        let target = waiting
            .expected
            .ok_or(StegoError::InvalidState("first chunk identifier unknown; use supply"))?;
        if let Err(e) = self.progress.check_cancelled() {
            return Err(self.fail(e));
        }
        let retry = self.options.retry;

        if !waiting.requested {
            source.request(&target);
            waiting.requested = true;
            self.set_waiting(waiting);
            log::debug!("requested {target}");
            return Ok(PollOutcome::Pending { attempt: 0, retry_after: retry.initial_delay });
        }

        match source.poll(&target) {
            Some(buffer) if Some(fingerprint(&buffer)) != self.last_fingerprint => {
                let header = self.supply(target, buffer)?;
                return Ok(PollOutcome::Ready(header));
            }
            Some(_) => log::warn!("buffer for {target} unchanged from previous chunk, will try again"),
            None => log::debug!("buffer for {target} not ready, will try again"),
        }

        waiting.attempts += 1;
        if waiting.attempts >= retry.max_attempts {
            log::warn!("failed to load {target} after {} attempts, aborting read", waiting.attempts);
            return Err(self.fail(StegoError::Timeout { attempts: waiting.attempts }));
        }
        self.set_waiting(waiting);
        Ok(PollOutcome::Pending { attempt: waiting.attempts, retry_after: retry.interval })
    }

    fn set_waiting(&mut self, waiting: Waiting) {
        match &mut self.state {
            State::Idle(w) | State::Awaiting(w) => *w = waiting,
            _ => {}
        }
    }

    /// Consume a finished session and return the payload.
    pub fn finish(self) -> Result<DecodedPayload, StegoError> {
        match self.state {
            State::Done(text) => Ok(DecodedPayload {
                text,
                bytes: self.bytes,
                data_mode: self.data_mode.unwrap_or(self.options.default_data_mode),
                headers: self.headers,
            }),
            State::Failed(e) => Err(e),
            _ => Err(StegoError::InvalidState("decode not finished")),
        }
    }

    /// Abandon the session, releasing everything it accumulated.
    pub fn abort(&mut self) {
        if !matches!(self.state, State::Done(_) | State::Failed(_)) {
            log::debug!("decode aborted in phase {:?}", self.phase());
        }
        self.fail(StegoError::Cancelled);
    }

    fn check_open(&self) -> Result<(), StegoError> {
        match &self.state {
            State::Failed(e) => Err(e.clone()),
            State::Done(_) => Err(StegoError::SessionClosed),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, e: StegoError) -> StegoError {
        if !matches!(e, StegoError::Cancelled) {
            log::warn!("decode failed: {e}");
        }
        self.bytes = Vec::new();
        self.text = None;
        self.state = State::Failed(e.clone());
        e
    }
}

/// Iterator returned by [`DecodeSession::checkpoints`].
pub struct Checkpoints<'a> {
    session: &'a mut DecodeSession,
    finished: bool,
}

impl Iterator for Checkpoints<'_> {
    type Item = Result<Checkpoint, StegoError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || !matches!(self.session.phase(), Phase::HeaderRead | Phase::Draining) {
            return None;
        }
        match self.session.step() {
            Ok(StepOutcome::Progress(cp)) => Some(Ok(cp)),
            Ok(StepOutcome::ChunkComplete(cp)) => {
                self.finished = true;
                Some(Ok(cp))
            }
            Ok(_) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stego::encoder::{encode_text, EncodeOptions};

    fn id(n: u8) -> ChainTarget {
        ChainTarget::from_bytes([n; 16])
    }

    fn small_opts(budget: usize) -> DecodeOptions {
        DecodeOptions { step_budget: budget, ..DecodeOptions::default() }
    }

    #[test]
    fn phases_of_single_chunk() {
        let images = encode_text("hello world", DataMode::Utf8, &[], &EncodeOptions::new(8, 8)).unwrap();
        let mut s = DecodeSession::new(small_opts(1));
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.step().unwrap_err(), StegoError::InvalidState("no chunk supplied yet"));

        let header = s.supply(id(1), images[0].clone()).unwrap();
        assert_eq!(header.payload_len, 11);
        assert_eq!(s.phase(), Phase::HeaderRead);

        // 11 bytes = 3 pixels at one pixel per step.
        assert!(matches!(s.step().unwrap(), StepOutcome::Progress(cp) if cp.chunk_bytes == 4));
        assert_eq!(s.phase(), Phase::Draining);
        assert_eq!(s.text(), "hell");
        assert!(matches!(s.step().unwrap(), StepOutcome::Progress(cp) if cp.chunk_bytes == 8));
        match s.step().unwrap() {
            StepOutcome::ChunkComplete(cp) => {
                assert!(cp.chunk_done());
                assert_eq!(cp.total_bytes, 11);
            }
            other => panic!("expected ChunkComplete, got {other:?}"),
        }
        assert_eq!(s.phase(), Phase::ChunkComplete);
        assert_eq!(s.step().unwrap(), StepOutcome::Done);
        assert_eq!(s.phase(), Phase::Done);
        assert_eq!(s.step().unwrap(), StepOutcome::Done);
        assert_eq!(s.progress().get(), (11, 11));

        let out = s.finish().unwrap();
        assert_eq!(out.text, "hello world");
        assert_eq!(out.bytes, b"hello world");
        assert_eq!(out.chunks(), 1);
    }

    #[test]
    fn budget_only_changes_step_count() {
        let text = "Ünïcödé 🎉 ".repeat(20); // 340 bytes, split mid-character
        let images = encode_text(&text, DataMode::Utf8, &[id(2)], &EncodeOptions::new(8, 8)).unwrap();
        for budget in [0, 1, 3, 7, 57, 10_000] {
            let mut s = DecodeSession::new(small_opts(budget));
            s.supply(id(1), images[0].clone()).unwrap();
            s.drain_chunk().unwrap();
            assert_eq!(s.step().unwrap(), StepOutcome::NeedChunk(id(2)));
            s.supply(id(2), images[1].clone()).unwrap();
            s.drain_chunk().unwrap();
            assert_eq!(s.step().unwrap(), StepOutcome::Done);
            assert_eq!(s.finish().unwrap().text, text, "budget {budget}");
        }
    }

    #[test]
    fn checkpoint_iterator_counts_steps() {
        let text = "x".repeat(200); // 50 body pixels
        let images = encode_text(&text, DataMode::Utf8, &[], &EncodeOptions::new(8, 8)).unwrap();
        let mut s = DecodeSession::new(small_opts(8));
        s.supply(id(1), images[0].clone()).unwrap();
        let cps: Vec<_> = s.checkpoints().collect::<Result<_, _>>().unwrap();
        assert_eq!(cps.len(), 7);
        assert_eq!(cps[0].chunk_bytes, 32);
        assert!(cps.last().unwrap().chunk_done());
        assert!(s.checkpoints().next().is_none());
    }

    #[test]
    fn wrong_target_is_fatal() {
        let images = encode_text(&"y".repeat(300), DataMode::Utf8, &[id(2)], &EncodeOptions::new(8, 8)).unwrap();
        let mut s = DecodeSession::new(DecodeOptions::default());
        s.supply(id(1), images[0].clone()).unwrap();
        s.drain_chunk().unwrap();
        assert_eq!(s.step().unwrap(), StepOutcome::NeedChunk(id(2)));
        assert_eq!(s.awaiting(), Some(id(2)));

        let err = s.supply(id(3), images[1].clone()).unwrap_err();
        assert_eq!(err, StegoError::UnexpectedChunk { expected: id(2), received: id(3) });
        assert_eq!(s.phase(), Phase::Error);
        assert!(s.bytes().is_empty());
        // Terminal: the right buffer is now refused too.
        assert_eq!(s.supply(id(2), images[1].clone()).unwrap_err(), err);
        assert_eq!(s.step().unwrap_err(), err);
        assert_eq!(s.finish().unwrap_err(), err);
    }

    #[test]
    fn supply_while_draining_is_not_fatal() {
        let images = encode_text(&"z".repeat(100), DataMode::Utf8, &[], &EncodeOptions::new(8, 8)).unwrap();
        let mut s = DecodeSession::new(small_opts(2));
        s.supply(id(1), images[0].clone()).unwrap();
        s.step().unwrap();
        assert!(matches!(s.supply(id(1), images[0].clone()), Err(StegoError::InvalidState(_))));
        assert_eq!(s.phase(), Phase::Draining);
        s.drain_chunk().unwrap();
        s.step().unwrap();
        assert_eq!(s.finish().unwrap().text, "z".repeat(100));
    }

    #[test]
    fn unsupported_version_fails_session() {
        let mut images = encode_text("hi", DataMode::Utf8, &[], &EncodeOptions::new(8, 8)).unwrap();
        images[0].logical_mut(6).unwrap()[1] = 9;
        let mut s = DecodeSession::new(DecodeOptions::default());
        assert!(matches!(
            s.supply(id(1), images.remove(0)),
            Err(StegoError::UnsupportedHeaderVersion { major: 9, .. })
        ));
        assert_eq!(s.phase(), Phase::Error);
    }

    #[test]
    fn oversized_length_reject_or_clamp() {
        let mut image = encode_text("abcd", DataMode::Utf8, &[], &EncodeOptions::new(8, 8))
            .unwrap()
            .remove(0);
        image.logical_mut(0).unwrap().copy_from_slice(&1000u32.to_be_bytes());

        let mut strict = DecodeSession::new(DecodeOptions::default());
        assert!(matches!(strict.supply(id(1), image.clone()), Err(StegoError::InvalidHeaderField(_))));

        let mut clamped = DecodeSession::new(DecodeOptions {
            length_overflow: LengthOverflow::Clamp,
            ..DecodeOptions::default()
        });
        clamped.supply(id(1), image).unwrap();
        let cp = clamped.drain_chunk().unwrap();
        assert_eq!(cp.chunk_len, 228);
        assert_eq!(clamped.bytes().len(), 228);
        assert_eq!(&clamped.bytes()[..4], b"abcd");
    }

    #[test]
    fn cancel_from_progress_handle() {
        let images = encode_text(&"c".repeat(200), DataMode::Utf8, &[], &EncodeOptions::new(8, 8)).unwrap();
        let mut s = DecodeSession::new(small_opts(4));
        let handle = s.progress();
        s.supply(id(1), images[0].clone()).unwrap();
        s.step().unwrap();
        handle.cancel();
        assert_eq!(s.step().unwrap_err(), StegoError::Cancelled);
        assert_eq!(s.phase(), Phase::Error);
    }

    #[test]
    fn abort_releases_state() {
        let images = encode_text("abandon me", DataMode::Utf16, &[], &EncodeOptions::new(8, 8)).unwrap();
        let mut s = DecodeSession::new(small_opts(1));
        s.supply(id(1), images[0].clone()).unwrap();
        s.step().unwrap();
        assert!(!s.bytes().is_empty());
        s.abort();
        assert!(s.bytes().is_empty());
        assert_eq!(s.text(), "");
        assert_eq!(s.error(), Some(&StegoError::Cancelled));
    }

    #[test]
    fn anchored_root_must_match() {
        let images = encode_text("root", DataMode::Utf8, &[], &EncodeOptions::new(8, 8)).unwrap();
        let mut s = DecodeSession::anchored(id(1), DecodeOptions::default());
        assert_eq!(s.awaiting(), Some(id(1)));
        assert_eq!(
            s.supply(id(9), images[0].clone()).unwrap_err(),
            StegoError::UnexpectedChunk { expected: id(1), received: id(9) }
        );
    }

    #[test]
    fn empty_chunk_completes_on_first_step() {
        let images = encode_text("", DataMode::Utf8, &[], &EncodeOptions::new(8, 8)).unwrap();
        let mut s = DecodeSession::new(DecodeOptions::default());
        s.supply(id(1), images[0].clone()).unwrap();
        assert!(matches!(s.step().unwrap(), StepOutcome::ChunkComplete(cp) if cp.chunk_len == 0));
        assert_eq!(s.step().unwrap(), StepOutcome::Done);
        assert_eq!(s.finish().unwrap().text, "");
    }

    #[test]
    fn strict_text_policy_fails_session() {
        let bytes = [b'o', b'k', 0x80];
        let images = crate::stego::encoder::encode_bytes(&bytes, DataMode::Utf8, &[], &EncodeOptions::new(8, 8)).unwrap();

        let mut lenient = DecodeSession::new(DecodeOptions::default());
        lenient.supply(id(1), images[0].clone()).unwrap();
        lenient.drain_chunk().unwrap();
        lenient.step().unwrap();
        assert_eq!(lenient.finish().unwrap().text, "ok");

        let mut strict = DecodeSession::new(DecodeOptions { text_policy: TextPolicy::Strict, ..DecodeOptions::default() });
        strict.supply(id(1), images[0].clone()).unwrap();
        assert_eq!(strict.drain_chunk().unwrap_err(), StegoError::MalformedText { offset: 2 });
        assert_eq!(strict.phase(), Phase::Error);
    }
}

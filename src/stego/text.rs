// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Payload text encodings.
//!
//! The payload body is a plain byte stream; the header's data mode says how
//! to turn it back into text:
//!
//! - **UTF-16**: 2 bytes per code unit, little-endian (`low | high << 8`).
//!   A dangling odd byte at the end of the payload is dropped.
//! - **UTF-8**: raw UTF-8, decoded by a continuation-counting state machine.
//!
//! Both decoders are incremental: bytes may be fed in arbitrary slices (one
//! drain step, one chunk) and multi-byte sequences split across feeds are
//! reassembled. Under [`TextPolicy::Lenient`] anomalous bytes are skipped and
//! decoding continues; [`TextPolicy::Strict`] reports them as
//! [`StegoError::MalformedText`].

use super::error::StegoError;

/// Wire value of the data-mode byte in the V3 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataMode {
    Utf16 = 0,
    Utf8 = 1,
    /// Declared by the format, not implemented.
    Ascii = 2,
    /// Declared by the format, not implemented.
    Binary = 3,
}

impl DataMode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Utf16),
            1 => Some(Self::Utf8),
            2 => Some(Self::Ascii),
            3 => Some(Self::Binary),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Whether this codec can encode and decode the mode.
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Utf16 | Self::Utf8)
    }
}

/// How text decoders treat invalid byte sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPolicy {
    /// Skip the anomalous byte (or unpaired surrogate) and keep going.
    #[default]
    Lenient,
    /// Fail with [`StegoError::MalformedText`].
    Strict,
}

/// Convert text to payload bytes for the given mode.
pub fn encode_text(text: &str, mode: DataMode) -> Result<Vec<u8>, StegoError> {
    match mode {
        DataMode::Utf16 => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        DataMode::Utf8 => Ok(text.as_bytes().to_vec()),
        DataMode::Ascii | DataMode::Binary => Err(StegoError::UnsupportedDataMode(mode)),
    }
}

/// Decode a complete payload in one call.
pub fn decode_text(bytes: &[u8], mode: DataMode, policy: TextPolicy) -> Result<String, StegoError> {
    let mut decoder = TextDecoder::new(mode, policy)?;
    decoder.feed(bytes)?;
    decoder.finish()
}

/// Incremental text decoder for one of the supported data modes.
#[derive(Debug, Clone)]
pub enum TextDecoder {
    Utf16(Utf16Decoder),
    Utf8(Utf8Decoder),
}

impl TextDecoder {
    pub fn new(mode: DataMode, policy: TextPolicy) -> Result<Self, StegoError> {
        match mode {
            DataMode::Utf16 => Ok(Self::Utf16(Utf16Decoder::new(policy))),
            DataMode::Utf8 => Ok(Self::Utf8(Utf8Decoder::new(policy))),
            DataMode::Ascii | DataMode::Binary => Err(StegoError::UnsupportedDataMode(mode)),
        }
    }

    pub fn mode(&self) -> DataMode {
        match self {
            Self::Utf16(_) => DataMode::Utf16,
            Self::Utf8(_) => DataMode::Utf8,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), StegoError> {
        match self {
            Self::Utf16(d) => d.feed(bytes),
            Self::Utf8(d) => d.feed(bytes),
        }
    }

    /// Text decoded so far (excludes any incomplete trailing sequence).
    pub fn text(&self) -> &str {
        match self {
            Self::Utf16(d) => &d.out,
            Self::Utf8(d) => &d.out,
        }
    }

    pub fn finish(self) -> Result<String, StegoError> {
        match self {
            Self::Utf16(d) => d.finish(),
            Self::Utf8(d) => d.finish(),
        }
    }
}

/// Little-endian UTF-16 decoder.
#[derive(Debug, Clone)]
pub struct Utf16Decoder {
    policy: TextPolicy,
    out: String,
    /// Low byte of a code unit whose high byte has not arrived yet.
    low: Option<u8>,
    /// Leading surrogate waiting for its trailing half, with its byte offset.
    high: Option<(u16, usize)>,
    offset: usize,
}

impl Utf16Decoder {
    pub fn new(policy: TextPolicy) -> Self {
        Self { policy, out: String::new(), low: None, high: None, offset: 0 }
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), StegoError> {
        for &b in bytes {
            match self.low.take() {
                None => self.low = Some(b),
                Some(low) => {
                    let unit = u16::from(low) | (u16::from(b) << 8);
                    self.unit(unit, self.offset - 1)?;
                }
            }
            self.offset += 1;
        }
        Ok(())
    }

    fn unit(&mut self, unit: u16, at: usize) -> Result<(), StegoError> {
        match unit {
            0xD800..=0xDBFF => {
                if let Some((_, prev)) = self.high.take() {
                    self.unpaired(prev)?;
                }
                self.high = Some((unit, at));
            }
            0xDC00..=0xDFFF => match self.high.take() {
                Some((high, _)) => {
                    let cp = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(unit) - 0xDC00);
                    // Always a valid scalar: 0x10000..=0x10FFFF.
                    if let Some(c) = char::from_u32(cp) {
                        self.out.push(c);
                    }
                }
                None => self.unpaired(at)?,
            },
            _ => {
                if let Some((_, prev)) = self.high.take() {
                    self.unpaired(prev)?;
                }
                if let Some(c) = char::from_u32(u32::from(unit)) {
                    self.out.push(c);
                }
            }
        }
        Ok(())
    }

    fn unpaired(&mut self, at: usize) -> Result<(), StegoError> {
        match self.policy {
            TextPolicy::Lenient => {
                self.out.push(char::REPLACEMENT_CHARACTER);
                Ok(())
            }
            TextPolicy::Strict => Err(StegoError::MalformedText { offset: at }),
        }
    }

    /// Flush the decoder. A dangling odd byte is dropped under either policy.
    pub fn finish(mut self) -> Result<String, StegoError> {
        if self.low.take().is_some() {
            log::debug!("dropping odd trailing UTF-16 byte at offset {}", self.offset - 1);
        }
        if let Some((_, at)) = self.high.take() {
            self.unpaired(at)?;
        }
        Ok(self.out)
    }
}

/// UTF-8 decoder that counts continuation bytes.
#[derive(Debug, Clone)]
pub struct Utf8Decoder {
    policy: TextPolicy,
    out: String,
    code_point: u32,
    remaining: u8,
    /// Total length of the sequence being assembled (for overlong checks).
    seq_len: u8,
    seq_start: usize,
    offset: usize,
}

impl Utf8Decoder {
    pub fn new(policy: TextPolicy) -> Self {
        Self {
            policy,
            out: String::new(),
            code_point: 0,
            remaining: 0,
            seq_len: 0,
            seq_start: 0,
            offset: 0,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), StegoError> {
        for &b in bytes {
            self.byte(b)?;
            self.offset += 1;
        }
        Ok(())
    }

    fn byte(&mut self, b: u8) -> Result<(), StegoError> {
        if b & 0xC0 == 0x80 {
            if self.remaining == 0 {
                return self.anomaly(self.offset);
            }
            self.code_point = (self.code_point << 6) | u32::from(b & 0x3F);
            self.remaining -= 1;
            if self.remaining == 0 {
                return self.emit();
            }
            return Ok(());
        }

        // Any non-continuation byte abandons an unfinished sequence.
        if self.remaining > 0 {
            self.remaining = 0;
            self.anomaly(self.seq_start)?;
        }

        let (len, bits) = match b {
            0x00..=0x7F => {
                self.out.push(char::from(b));
                return Ok(());
            }
            _ if b & 0xE0 == 0xC0 => (2, b & 0x1F),
            _ if b & 0xF0 == 0xE0 => (3, b & 0x0F),
            _ if b & 0xF8 == 0xF0 => (4, b & 0x07),
            _ => return self.anomaly(self.offset),
        };
        self.code_point = u32::from(bits);
        self.remaining = len - 1;
        self.seq_len = len;
        self.seq_start = self.offset;
        Ok(())
    }

    fn emit(&mut self) -> Result<(), StegoError> {
        let overlong = match self.seq_len {
            2 => self.code_point < 0x80,
            3 => self.code_point < 0x800,
            _ => self.code_point < 0x10000,
        };
        if overlong && self.policy == TextPolicy::Strict {
            return Err(StegoError::MalformedText { offset: self.seq_start });
        }
        match char::from_u32(self.code_point) {
            Some(c) => {
                self.out.push(c);
                Ok(())
            }
            None => self.anomaly(self.seq_start),
        }
    }

    fn anomaly(&self, at: usize) -> Result<(), StegoError> {
        match self.policy {
            TextPolicy::Lenient => Ok(()),
            TextPolicy::Strict => Err(StegoError::MalformedText { offset: at }),
        }
    }

    /// Flush the decoder. An unfinished trailing sequence is dropped
    /// (lenient) or reported (strict).
    pub fn finish(mut self) -> Result<String, StegoError> {
        if self.remaining > 0 {
            self.remaining = 0;
            self.anomaly(self.seq_start)?;
        }
        Ok(self.out)
    }
}

// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Chain target identifiers.
//!
//! Each image's header names the asset that holds the *next* chunk. The
//! codec treats that name as an opaque 16-byte value; its external string
//! form is a fixed literal prefix followed by 8-4-4-4-12 lowercase hex groups:
//!
//! ```text
//! avtr_2a6ba4c8-866a-4636-bdff-de429861df43
//! ```
//!
//! The all-`0xFF` value ([`ChainTarget::END`]) marks the last chunk and renders
//! as `avtr_ffffffff-ffff-ffff-ffff-ffffffffffff`.

use core::fmt;
use core::str::FromStr;

use super::error::StegoError;

/// Size of an identifier in bytes.
pub const ID_LEN: usize = 16;

/// Literal prefix of the string form.
pub const ID_PREFIX: &str = "avtr_";

/// Hex digits per dash-separated group.
const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// Length of the full string form: prefix + 32 hex digits + 4 dashes.
pub const ID_STR_LEN: usize = 5 + 32 + 4;

/// A 16-byte chain target identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainTarget([u8; ID_LEN]);

impl ChainTarget {
    /// Sentinel meaning "no more chunks".
    pub const END: ChainTarget = ChainTarget([0xFF; ID_LEN]);

    pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// True for the end-of-chain sentinel.
    pub fn is_end(&self) -> bool {
        self.0 == [0xFF; ID_LEN]
    }

    /// Parse the `avtr_xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` string form.
    ///
    /// Hex digits may be upper or lower case; group lengths, dash positions
    /// and the prefix must match exactly.
    pub fn parse(s: &str) -> Result<Self, StegoError> {
        let invalid = || StegoError::InvalidIdentifierFormat(s.to_string());

        let body = s.strip_prefix(ID_PREFIX).ok_or_else(invalid)?;
        if s.len() != ID_STR_LEN {
            return Err(invalid());
        }

        let mut digits = [0u8; 2 * ID_LEN];
        let mut n = 0;
        let mut parts = body.split('-');
        for &group_len in &GROUPS {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != group_len {
                return Err(invalid());
            }
            for c in part.bytes() {
                digits[n] = hex_value(c).ok_or_else(invalid)?;
                n += 1;
            }
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        let mut bytes = [0u8; ID_LEN];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (digits[2 * i] << 4) | digits[2 * i + 1];
        }
        Ok(Self(bytes))
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for ChainTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ID_PREFIX)?;
        let mut byte = 0;
        for (g, &group_len) in GROUPS.iter().enumerate() {
            if g > 0 {
                f.write_str("-")?;
            }
            for _ in 0..group_len / 2 {
                write!(f, "{:02x}", self.0[byte])?;
                byte += 1;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChainTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainTarget({self})")
    }
}

impl FromStr for ChainTarget {
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; ID_LEN]> for ChainTarget {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }
}

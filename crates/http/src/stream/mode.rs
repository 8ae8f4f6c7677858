//! fopen-style access mode parsing.
//!
//! A [`ByteStream`](super::ByteStream) derives its readable and writable
//! capabilities once, from the mode string the handle was opened with:
//!
//! | mode              | readable | writable |
//! |-------------------|----------|----------|
//! | `r`               | yes      | no       |
//! | `w` `a` `x` `c`   | no       | yes      |
//! | any of them + `+` | yes      | yes      |
//!
//! The flags `b`, `t`, `e` and `n` may follow the base character and are
//! carried through unchanged.

use std::fmt;
use std::str::FromStr;

use crate::ensure;
use crate::protocol::InvalidArgument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessMode {
    raw: String,
    readable: bool,
    writable: bool,
}

impl AccessMode {
    pub fn parse(mode: &str) -> Result<Self, InvalidArgument> {
        let mut chars = mode.chars();
        let base = chars.next().ok_or_else(|| InvalidArgument::StreamMode(mode.to_string()))?;
        ensure!(matches!(base, 'r' | 'w' | 'a' | 'x' | 'c'), InvalidArgument::StreamMode(mode.to_string()));

        let mut plus = false;
        for c in chars {
            match c {
                '+' if !plus => plus = true,
                'b' | 't' | 'e' | 'n' => {}
                _ => return Err(InvalidArgument::StreamMode(mode.to_string())),
            }
        }

        Ok(Self { raw: mode.to_string(), readable: base == 'r' || plus, writable: base != 'r' || plus })
    }

    /// Read-write mode over an in-memory or scratch handle.
    pub(crate) fn read_write(raw: &str) -> Self {
        Self { raw: raw.to_string(), readable: true, writable: true }
    }

    pub(crate) fn read_only(raw: &str) -> Self {
        Self { raw: raw.to_string(), readable: true, writable: false }
    }

    #[inline]
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for AccessMode {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

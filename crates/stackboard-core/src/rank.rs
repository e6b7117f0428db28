//! Fractional stack ranks.
//!
//! A [`Rank`] is an opaque string token drawn from a dense order: for any two
//! distinct ranks there is a rank strictly between them, and a rank can always
//! be produced below the smallest or above the largest existing one. Siblings
//! are ordered by comparing their ranks, so moving one item never renumbers
//! the others.
//!
//! # Encoding
//!
//! Ranks are base-62 digit strings over `0-9A-Za-z`. The alphabet is listed in
//! ASCII order, so plain byte-wise string comparison (Rust `Ord` on `str`,
//! SQLite `BINARY` collation) agrees with digit-wise comparison. A rank reads
//! as the fraction `0.d1d2d3...`, which is why a trailing `0` is rejected:
//! `"V"` and `"V0"` denote the same fraction but sort differently, and no
//! string exists between them.
//!
//! # Allocation policy
//!
//! | call               | result                                   |
//! |--------------------|------------------------------------------|
//! | `initial()`        | `"V"`, the middle digit                  |
//! | `r.before()`       | a rank `< r`                             |
//! | `r.after()`        | a rank `> r`                             |
//! | `between(a, b)`    | a rank strictly between `a` and `b`      |
//! | `between(a, a)`    | `a.after()` (equal-neighbour fallback)   |
//! | `between(b, a)`    | operands are swapped first               |
//!
//! The rank space is never compacted. Repeated insertion at the same spot
//! lengthens ranks by roughly one digit every few inserts.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: u8 = 62;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error returned when a string is not a well-formed rank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankError {
    #[error("rank must not be empty")]
    Empty,
    #[error("rank '{rank}' contains '{symbol}', expected only 0-9, A-Z, a-z")]
    InvalidSymbol { rank: String, symbol: char },
    #[error("rank '{0}' must not end in '0'")]
    TrailingZero(String),
}

// ---------------------------------------------------------------------------
// Rank
// ---------------------------------------------------------------------------

/// A validated fractional rank.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rank(String);

impl Rank {
    /// Parse and validate a rank string.
    ///
    /// # Errors
    ///
    /// Returns [`RankError`] when the string is empty, contains a symbol
    /// outside the alphabet, or ends in `0`.
    pub fn parse(input: &str) -> Result<Self, RankError> {
        if input.is_empty() {
            return Err(RankError::Empty);
        }
        if let Some(symbol) = input.chars().find(|c| digit_value(*c).is_none()) {
            return Err(RankError::InvalidSymbol {
                rank: input.to_string(),
                symbol,
            });
        }
        if input.ends_with('0') {
            return Err(RankError::TrailingZero(input.to_string()));
        }
        Ok(Self(input.to_string()))
    }

    /// The canonical rank for the first item of an empty partition.
    #[must_use]
    pub fn initial() -> Self {
        Self::from_digits(&midpoint(&[], None))
    }

    /// A rank strictly less than `self`.
    #[must_use]
    pub fn before(&self) -> Self {
        Self::from_digits(&midpoint(&[], Some(&self.digits())))
    }

    /// A rank strictly greater than `self`.
    #[must_use]
    pub fn after(&self) -> Self {
        Self::from_digits(&midpoint(&self.digits(), None))
    }

    /// A rank strictly between `low` and `high`.
    ///
    /// Equal operands fall back to `low.after()`, which trades exact
    /// placement for forward progress. Reversed operands are swapped.
    #[must_use]
    pub fn between(low: &Self, high: &Self) -> Self {
        match low.cmp(high) {
            Ordering::Less => Self::from_digits(&midpoint(&low.digits(), Some(&high.digits()))),
            Ordering::Greater => Self::from_digits(&midpoint(&high.digits(), Some(&low.digits()))),
            Ordering::Equal => {
                warn!(rank = %low, "neighbour ranks are equal, placing after");
                low.after()
            }
        }
    }

    /// Borrow the rank as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digits(&self) -> Vec<u8> {
        self.0.chars().filter_map(digit_value).collect()
    }

    fn from_digits(digits: &[u8]) -> Self {
        Self(digits.iter().map(|d| char::from(DIGITS[usize::from(*d)])).collect())
    }
}

/// Lexicographic rank comparison, used for every sort.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Rank {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Rank {
    type Error = RankError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Rank> for String {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl AsRef<str> for Rank {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Digit arithmetic
// ---------------------------------------------------------------------------

fn digit_value(c: char) -> Option<u8> {
    let b = u8::try_from(c).ok()?;
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'Z' => Some(b - b'A' + 10),
        b'a'..=b'z' => Some(b - b'a' + 36),
        _ => None,
    }
}

/// Digits of a fraction strictly between `lo` and `hi`.
///
/// `lo` is padded with zeros, a missing `hi` stands for `1.0`. Requires
/// `lo < hi` and no trailing zero in either operand; the result never ends
/// in zero either. Runs in one pass over the operands, whatever their length.
fn midpoint(lo: &[u8], hi: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::with_capacity(lo.len().max(hi.map_or(0, <[u8]>::len)) + 1);
    let mut lo = lo;
    let mut hi = hi;

    if let Some(h) = hi {
        let shared = h
            .iter()
            .enumerate()
            .take_while(|(i, d)| lo.get(*i).copied().unwrap_or(0) == **d)
            .count();
        out.extend_from_slice(&h[..shared]);
        lo = lo.get(shared..).unwrap_or(&[]);
        hi = Some(&h[shared..]);
    }

    loop {
        let lo_digit = lo.first().copied().unwrap_or(0);
        let hi_digit = hi.and_then(|h| h.first().copied()).unwrap_or(BASE);

        if hi_digit.saturating_sub(lo_digit) > 1 {
            out.push((lo_digit + hi_digit) / 2);
            return out;
        }

        // Adjacent leading digits.
        if let Some(h) = hi
            && h.len() > 1
        {
            out.push(h[0]);
            return out;
        }

        // Keep `lo`'s digit and look for room above the rest of it.
        out.push(lo_digit);
        lo = lo.get(1..).unwrap_or(&[]);
        hi = None;
    }
}

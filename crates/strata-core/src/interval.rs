//! Closed-open char ranges.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::AlignError;

/// A closed-open `[start, end)` range of char offsets.
///
/// The invariant `start <= end` is checked on construction, so every
/// `Interval` in circulation is well-formed. Bounds against a particular
/// text are checked by the operation that receives it.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "Range<usize>", into = "Range<usize>")]
pub struct Interval {
    start: usize,
    end: usize,
}

impl Interval {
    /// Create an interval. Fails with `InvalidRange` if `start > end`.
    pub fn new(start: usize, end: usize) -> Result<Self, AlignError> {
        if start > end {
            return Err(AlignError::InvalidRange {
                start,
                end,
                len: None,
            });
        }
        Ok(Self { start, end })
    }

    /// Zero-length interval at `at`.
    pub const fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Build from a start and a length; cannot be inverted.
    ///
    /// Callers guarantee `start + len` fits; outside the crate use `new`.
    pub(crate) const fn with_len(start: usize, len: usize) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn end(&self) -> usize {
        self.end
    }

    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `start <= pos < end`.
    pub const fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Whether both intervals share at least one position.
    ///
    /// Empty intervals contain no position and so overlap nothing.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether this interval fits inside a text of `len` chars.
    pub const fn fits(&self, len: usize) -> bool {
        self.end <= len
    }

    /// Same length, moved to start at `start`.
    pub(crate) const fn moved_to(&self, start: usize) -> Self {
        Self::with_len(start, self.len())
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl TryFrom<Range<usize>> for Interval {
    type Error = AlignError;

    fn try_from(range: Range<usize>) -> Result<Self, Self::Error> {
        Self::new(range.start, range.end)
    }
}

impl From<Interval> for Range<usize> {
    fn from(interval: Interval) -> Self {
        interval.to_range()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

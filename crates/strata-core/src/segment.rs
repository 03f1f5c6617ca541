//! Segments: the units of a derived layer's address space.

use std::fmt;

use smol_str::{SmolStr, ToSmolStr, format_smolstr};

use crate::interval::Interval;

/// What a segment's chars correspond to in the underlying layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// Char-for-char copy of `[anchor, anchor + len)` in the underlying layer.
    Verbatim,
    /// Literal text with no 1:1 correspondence, attached at `anchor`.
    Oblique { text: SmolStr },
}

/// A run of chars in a derived layer together with its underlying anchor.
///
/// For a verbatim segment the anchor is the first underlying char it mirrors.
/// For an oblique segment it is the underlying point the text was inserted
/// at, i.e. the position right after the last underlying char still present
/// before it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub(crate) span: Interval,
    pub(crate) anchor: usize,
    pub(crate) kind: SegmentKind,
}

impl Segment {
    pub(crate) fn verbatim(span: Interval, anchor: usize) -> Self {
        Self {
            span,
            anchor,
            kind: SegmentKind::Verbatim,
        }
    }

    pub(crate) fn oblique(start: usize, anchor: usize, text: SmolStr) -> Self {
        let len = text.chars().count();
        Self {
            span: Interval::with_len(start, len),
            anchor,
            kind: SegmentKind::Oblique { text },
        }
    }

    /// Range covered in this layer's own address space.
    pub fn span(&self) -> Interval {
        self.span
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    pub fn is_verbatim(&self) -> bool {
        matches!(self.kind, SegmentKind::Verbatim)
    }

    pub fn is_oblique(&self) -> bool {
        !self.is_verbatim()
    }

    /// Literal text of an oblique segment.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            SegmentKind::Verbatim => None,
            SegmentKind::Oblique { text } => Some(text.as_str()),
        }
    }

    /// End of the underlying range this segment covers.
    ///
    /// Oblique segments cover only their anchor point.
    pub fn anchor_end(&self) -> usize {
        match self.kind {
            SegmentKind::Verbatim => self.anchor + self.span.len(),
            SegmentKind::Oblique { .. } => self.anchor,
        }
    }

    /// Underlying range for a verbatim segment.
    pub fn underlying(&self) -> Option<Interval> {
        self.is_verbatim()
            .then(|| Interval::with_len(self.anchor, self.span.len()))
    }

    /// Split at `pos`, which must lie strictly inside the span.
    ///
    /// Verbatim halves partition the underlying range. Oblique halves keep
    /// the same anchor, since inserted text has no inner correspondence.
    pub(crate) fn split(self, pos: usize) -> (Self, Self) {
        debug_assert!(
            self.span.start() < pos && pos < self.span.end(),
            "split point {pos} outside {}",
            self.span
        );
        let offset = pos - self.span.start();
        let left_span = Interval::with_len(self.span.start(), offset);
        let right_span = Interval::with_len(pos, self.span.len() - offset);
        match self.kind {
            SegmentKind::Verbatim => (
                Self::verbatim(left_span, self.anchor),
                Self::verbatim(right_span, self.anchor + offset),
            ),
            SegmentKind::Oblique { text } => {
                let cut = byte_offset(&text, offset);
                (
                    Self::oblique(left_span.start(), self.anchor, text[..cut].to_smolstr()),
                    Self::oblique(right_span.start(), self.anchor, text[cut..].to_smolstr()),
                )
            }
        }
    }

    /// Whether `next`, directly following this segment, can be folded into it.
    pub(crate) fn can_merge(&self, next: &Self) -> bool {
        match (&self.kind, &next.kind) {
            (SegmentKind::Verbatim, SegmentKind::Verbatim) => self.anchor_end() == next.anchor,
            (SegmentKind::Oblique { .. }, SegmentKind::Oblique { .. }) => {
                self.anchor == next.anchor
            }
            _ => false,
        }
    }

    /// Fold `next` into this segment. Caller checks `can_merge` first.
    pub(crate) fn merge(&mut self, next: Self) {
        self.span = Interval::with_len(self.span.start(), self.span.len() + next.span.len());
        if let (SegmentKind::Oblique { text }, SegmentKind::Oblique { text: tail }) =
            (&mut self.kind, next.kind)
        {
            *text = format_smolstr!("{text}{tail}");
        }
    }

    /// Chars `range` (relative to the span start) of an oblique segment.
    pub(crate) fn oblique_slice(&self, range: Interval) -> &str {
        match &self.kind {
            SegmentKind::Verbatim => "",
            SegmentKind::Oblique { text } => {
                let from = byte_offset(text, range.start());
                let to = byte_offset(text, range.end());
                &text[from..to]
            }
        }
    }
}

/// Byte offset of char `chars` in `text`, clamped to the end.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SegmentKind::Verbatim => write!(f, "{} verbatim @{}", self.span, self.anchor),
            SegmentKind::Oblique { text } => {
                write!(f, "{} oblique @{} {:?}", self.span, self.anchor, text.as_str())
            }
        }
    }
}

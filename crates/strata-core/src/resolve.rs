//! Offset mapping between a derived layer and its base.
//!
//! Both directions share one boundary policy: a start edge that has no
//! correspondence snaps forward, an end edge snaps backward, so material
//! that only exists on one side is left out of the mapped range.

use crate::interval::Interval;
use crate::segment::Segment;

/// Which way an edge moves when it lands where nothing corresponds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

/// Nearest segment accepted by `accept`, searching `segments[from..]`
/// forward or `segments[..from]` backward.
fn snap<'a>(
    segments: &'a [Segment],
    from: usize,
    direction: Direction,
    accept: impl Fn(&Segment) -> bool,
) -> Option<&'a Segment> {
    match direction {
        Direction::Forward => segments[from..].iter().find(|s| accept(s)),
        Direction::Backward => segments[..from].iter().rev().find(|s| accept(s)),
    }
}

/// Map `interval` from the derived layer down to its base.
pub(crate) fn resolve(segments: &[Segment], interval: Interval, base_len: usize) -> Interval {
    let start = resolve_edge(segments, interval.start(), Direction::Forward, base_len);
    let end = resolve_edge(segments, interval.end(), Direction::Backward, base_len);
    ordered(start, end)
}

/// Map `interval` from the base up into the derived layer.
pub(crate) fn inverse_resolve(segments: &[Segment], interval: Interval, len: usize) -> Interval {
    let start = inverse_edge(segments, interval.start(), Direction::Forward, len);
    let end = inverse_edge(segments, interval.end(), Direction::Backward, len);
    ordered(start, end)
}

fn ordered(start: usize, end: usize) -> Interval {
    if start > end {
        tracing::trace!(start, end, "edges crossed, collapsing");
        Interval::empty(start)
    } else {
        Interval::with_len(start, end - start)
    }
}

/// A start edge belongs to the segment whose span holds `pos`; an end edge
/// to the segment whose span ends at or after it, starting before it.
fn resolve_edge(segments: &[Segment], pos: usize, direction: Direction, base_len: usize) -> usize {
    let idx = match direction {
        Direction::Forward => segments.partition_point(|s| s.span.end() <= pos),
        Direction::Backward => segments.partition_point(|s| s.span.end() < pos),
    };
    match segments.get(idx) {
        Some(seg) if seg.is_verbatim() && owns_edge(seg.span, pos, direction) => {
            seg.anchor + (pos - seg.span.start())
        }
        _ => match snap(segments, idx, direction, Segment::is_verbatim) {
            Some(seg) => match direction {
                Direction::Forward => seg.anchor,
                Direction::Backward => seg.anchor_end(),
            },
            None => match direction {
                Direction::Forward => base_len,
                Direction::Backward => 0,
            },
        },
    }
}

fn owns_edge(span: Interval, pos: usize, direction: Direction) -> bool {
    match direction {
        Direction::Forward => span.start() <= pos && pos < span.end(),
        Direction::Backward => span.start() < pos && pos <= span.end(),
    }
}

/// Underlying `pos` maps directly when a verbatim segment mirrors it.
/// Otherwise a start edge snaps to the first segment attached at or after
/// `pos`, an end edge to the last segment whose underlying extent ends at or
/// before it. Oblique segments count here, so replacement text is covered.
fn inverse_edge(segments: &[Segment], pos: usize, direction: Direction, len: usize) -> usize {
    let direct = match direction {
        Direction::Forward => segments.partition_point(|s| s.anchor_end() <= pos),
        Direction::Backward => segments.partition_point(|s| s.anchor_end() < pos),
    };
    if let Some(under) = segments.get(direct).and_then(Segment::underlying) {
        if owns_edge(under, pos, direction) {
            return segments[direct].span.start() + (pos - under.start());
        }
    }

    match direction {
        Direction::Forward => {
            let from = segments.partition_point(|s| s.anchor < pos);
            snap(segments, from, direction, |_| true).map_or(len, |s| s.span.start())
        }
        Direction::Backward => {
            let from = segments.partition_point(|s| s.anchor_end() <= pos);
            snap(segments, from, direction, |_| true).map_or(0, |s| s.span.end())
        }
    }
}

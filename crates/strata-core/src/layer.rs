//! Layer storage and edit application.
//!
//! A root layer owns its text in a rope. A derived layer owns only a segment
//! list over its base; its verbatim chars are always read through the base.

use ropey::Rope;
use smol_str::SmolStr;

use crate::interval::Interval;
use crate::segment::Segment;
use crate::stack::LayerId;

/// One primitive change to a layer, in that layer's own coordinates.
///
/// `range` was replaced by `inserted` new chars, leaving the layer
/// `len_after` chars long.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Change {
    pub range: Interval,
    pub inserted: usize,
    pub len_after: usize,
}

#[derive(Clone, Debug)]
pub(crate) enum Layer {
    Root(Rope),
    Derived(Derived),
}

impl Layer {
    pub fn len(&self) -> usize {
        match self {
            Layer::Root(rope) => rope.len_chars(),
            Layer::Derived(derived) => derived.len,
        }
    }

    pub fn base(&self) -> Option<LayerId> {
        match self {
            Layer::Root(_) => None,
            Layer::Derived(derived) => Some(derived.base),
        }
    }

    /// Replace `range` with `text`. The range must already be validated.
    pub fn edit(&mut self, range: Interval, text: &str) -> Change {
        match self {
            Layer::Root(rope) => {
                rope.remove(range.to_range());
                rope.insert(range.start(), text);
                Change {
                    range,
                    inserted: text.chars().count(),
                    len_after: rope.len_chars(),
                }
            }
            Layer::Derived(derived) => derived.edit(range, text),
        }
    }
}

/// Segment list of a layer derived from `base`.
#[derive(Clone, Debug)]
pub(crate) struct Derived {
    pub base: LayerId,
    pub segments: Vec<Segment>,
    pub len: usize,
}

impl Derived {
    /// A layer mirroring its base 1:1.
    pub fn mirror(base: LayerId, base_len: usize) -> Self {
        let segments = if base_len == 0 {
            Vec::new()
        } else {
            vec![Segment::verbatim(Interval::with_len(0, base_len), 0)]
        };
        Self {
            base,
            segments,
            len: base_len,
        }
    }

    /// Index of the segment whose span contains `pos`, or `segments.len()`
    /// when `pos` is at the end.
    pub fn locate(&self, pos: usize) -> usize {
        self.segments.partition_point(|s| s.span.end() <= pos)
    }

    /// Make `pos` a segment boundary and return the index of the first
    /// segment starting at or after it.
    fn split_at(&mut self, pos: usize) -> usize {
        let idx = self.locate(pos);
        match self.segments.get(idx) {
            Some(seg) if seg.span.start() < pos => {
                let (left, right) = seg.clone().split(pos);
                tracing::trace!(%left, %right, "split segment");
                self.segments[idx] = left;
                self.segments.insert(idx + 1, right);
                idx + 1
            }
            _ => idx,
        }
    }

    /// Remove `range` and put `replacement` (if any) in its place, shifting
    /// the spans of everything after it. Anchors are left alone.
    ///
    /// Returns the index the replacement landed at.
    fn splice(&mut self, range: Interval, replacement: Option<Segment>) -> usize {
        let lo = self.split_at(range.start());
        let hi = self.split_at(range.end());
        self.segments.drain(lo..hi);

        let inserted = replacement.as_ref().map_or(0, |s| s.span.len());
        let mut tail = lo;
        if let Some(seg) = replacement {
            self.segments.insert(lo, seg);
            tail += 1;
        }
        for seg in &mut self.segments[tail..] {
            let start = seg.span.start() + inserted - range.len();
            seg.span = seg.span.moved_to(start);
        }
        self.len = self.len + inserted - range.len();
        lo
    }

    /// Fold every adjacent pair that shares kind and has contiguous anchors.
    fn coalesce(&mut self) {
        if self.segments.len() < 2 {
            return;
        }
        let mut merged: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for seg in self.segments.drain(..) {
            match merged.last_mut() {
                Some(last) if last.can_merge(&seg) => {
                    tracing::trace!(%last, next = %seg, "merging segments");
                    last.merge(seg);
                }
                _ => merged.push(seg),
            }
        }
        self.segments = merged;
    }

    /// Apply an edit made directly to this layer.
    ///
    /// The replaced range stops mirroring the base; new text becomes one
    /// oblique segment attached at the underlying end of whatever precedes it.
    pub fn edit(&mut self, range: Interval, text: &str) -> Change {
        let replacement = (!text.is_empty()).then(|| {
            // Boundaries are set first so the predecessor is final.
            let lo = self.split_at(range.start());
            let anchor = lo
                .checked_sub(1)
                .map_or(0, |prev| self.segments[prev].anchor_end());
            Segment::oblique(range.start(), anchor, SmolStr::new(text))
        });
        let inserted = replacement.as_ref().map_or(0, |s| s.span.len());
        self.splice(range, replacement);
        self.coalesce();
        Change {
            range,
            inserted,
            len_after: self.len,
        }
    }

    /// Follow a change made to the base layer.
    ///
    /// Returns the changes this causes in this layer, in application order,
    /// so they can be pushed on to layers derived from this one.
    pub fn absorb(&mut self, change: Change) -> Vec<Change> {
        let mut changes = Vec::new();
        let mut hidden = false;
        if !change.range.is_empty() {
            self.absorb_removal(change.range, &mut changes);
            // Replacing base text this layer no longer mirrors stays out of it.
            hidden = changes.is_empty();
        }
        if change.inserted > 0 {
            let base_len_before = change.len_after - change.inserted;
            let p = change.range.start();
            if let Some(own) = self.absorb_insertion(p, change.inserted, base_len_before, hidden) {
                changes.push(own);
            }
        }
        self.coalesce();
        changes
    }

    /// The base lost `[b, e)`: drop every char mirroring it and pull anchors
    /// past it back.
    fn absorb_removal(&mut self, removed: Interval, changes: &mut Vec<Change>) {
        let (b, e) = (removed.start(), removed.end());
        let hits: Vec<Interval> = self
            .segments
            .iter()
            .filter_map(|seg| {
                let under = seg.underlying()?;
                let lo = under.start().max(b);
                let hi = under.end().min(e);
                (lo < hi).then(|| {
                    let start = seg.span.start() + (lo - under.start());
                    Interval::with_len(start, hi - lo)
                })
            })
            .collect();

        // Right to left, so earlier hits keep their coordinates.
        for hit in hits.into_iter().rev() {
            self.splice(hit, None);
            changes.push(Change {
                range: hit,
                inserted: 0,
                len_after: self.len,
            });
        }

        for seg in &mut self.segments {
            if seg.anchor >= e {
                seg.anchor -= removed.len();
            } else if seg.anchor > b {
                seg.anchor = b;
            }
        }
    }

    /// The base gained `k` chars at `p`.
    ///
    /// The new chars show up as a verbatim segment unless `p` lies strictly
    /// inside a range this layer already edited away, or `hidden` is set.
    fn absorb_insertion(
        &mut self,
        p: usize,
        k: usize,
        base_len_before: usize,
        hidden: bool,
    ) -> Option<Change> {
        // A verbatim segment straddling `p` is cut so the new chars can go between.
        let idx = self.segments.partition_point(|s| s.anchor_end() <= p);
        if let Some(seg) = self.segments.get(idx) {
            if seg.is_verbatim() && seg.anchor < p {
                let pos = seg.span.start() + (p - seg.anchor);
                self.split_at(pos);
            }
        }

        let next = self
            .segments
            .iter()
            .position(|s| s.is_verbatim() && s.anchor >= p);
        let prev = self
            .segments
            .iter()
            .rposition(|s| s.is_verbatim() && s.anchor_end() <= p);
        let at = match (prev, next) {
            _ if hidden => None,
            (_, Some(n)) if self.segments[n].anchor == p => Some(n),
            (Some(pv), _) if self.segments[pv].anchor_end() == p => Some(pv + 1),
            (_, None) if p == base_len_before => Some(self.segments.len()),
            (None, _) if p == 0 => Some(0),
            _ => None,
        };

        let Some(at) = at else {
            tracing::trace!(p, k, "insertion falls inside an edited range");
            // Verbatim text at `p` starts after the new chars; inserted text
            // attached at `p` stays in front of them.
            for seg in &mut self.segments {
                if seg.anchor > p || (seg.anchor == p && seg.is_verbatim()) {
                    seg.anchor += k;
                }
            }
            return None;
        };

        for seg in &mut self.segments[at..] {
            if seg.anchor >= p {
                seg.anchor += k;
            }
        }
        let pos = at
            .checked_sub(1)
            .map_or(0, |prev| self.segments[prev].span.end());
        let range = Interval::empty(pos);
        self.splice(range, Some(Segment::verbatim(Interval::with_len(pos, k), p)));
        Some(Change {
            range,
            inserted: k,
            len_after: self.len,
        })
    }

    /// Describe the first broken invariant, if any.
    pub fn violation(&self, base_len: usize) -> Option<String> {
        let mut expected_start = 0;
        let mut last_anchor = 0;
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.span.start() != expected_start {
                return Some(format!("segment {i} {seg} does not start at {expected_start}"));
            }
            if seg.span.is_empty() {
                return Some(format!("segment {i} {seg} is empty"));
            }
            if seg.anchor < last_anchor {
                return Some(format!("segment {i} {seg} anchor goes back from {last_anchor}"));
            }
            if seg.anchor_end() > base_len {
                return Some(format!("segment {i} {seg} reaches past base length {base_len}"));
            }
            if let Some(text) = seg.text() {
                if text.chars().count() != seg.span.len() {
                    return Some(format!("segment {i} {seg} text length differs from span"));
                }
            }
            if i > 0 && self.segments[i - 1].can_merge(seg) {
                return Some(format!("segment {i} {seg} should have merged"));
            }
            expected_start = seg.span.end();
            last_anchor = seg.anchor;
        }
        (expected_start != self.len)
            .then(|| format!("segments end at {expected_start}, length is {}", self.len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Interval {
        Interval::new(start, end).unwrap()
    }

    fn mirror(len: usize) -> Derived {
        Derived::mirror(LayerId::from_index(0), len)
    }

    #[test]
    fn insert_into_verbatim_splits_it() {
        let mut layer = mirror(12);
        let change = layer.edit(Interval::empty(2), "such ");
        assert_eq!(change.inserted, 5);
        assert_eq!(change.len_after, 17);
        assert_eq!(
            layer.segments,
            vec![
                Segment::verbatim(span(0, 2), 0),
                Segment::oblique(2, 2, "such ".into()),
                Segment::verbatim(span(7, 17), 2),
            ]
        );
        assert_eq!(layer.violation(12), None);
    }

    #[test]
    fn delete_leaves_anchor_gap() {
        let mut layer = mirror(12);
        layer.edit(span(4, 7), "");
        assert_eq!(
            layer.segments,
            vec![
                Segment::verbatim(span(0, 4), 0),
                Segment::verbatim(span(4, 9), 7),
            ]
        );
    }

    #[test]
    fn replace_matches_delete_then_insert() {
        let mut single = mirror(12);
        single.edit(span(2, 4), "was");

        let mut decomposed = mirror(12);
        decomposed.edit(span(2, 4), "");
        decomposed.edit(Interval::empty(2), "was");

        assert_eq!(single.segments, decomposed.segments);
        assert_eq!(single.segments[1], Segment::oblique(2, 2, "was".into()));
    }

    #[test]
    fn typing_inside_oblique_text_merges_back() {
        let mut layer = mirror(4);
        layer.edit(Interval::empty(2), "ac");
        layer.edit(Interval::empty(3), "b");
        assert_eq!(layer.segments.len(), 3);
        assert_eq!(layer.segments[1].text(), Some("abc"));
        layer.edit(span(2, 5), "");
        assert_eq!(layer.segments, vec![Segment::verbatim(span(0, 4), 0)]);
    }

    #[test]
    fn absorbs_base_deletion() {
        let mut layer = mirror(12);
        let changes = layer.absorb(Change {
            range: span(2, 5),
            inserted: 0,
            len_after: 9,
        });
        assert_eq!(layer.segments, vec![Segment::verbatim(span(0, 9), 0)]);
        assert_eq!(
            changes,
            vec![Change {
                range: span(2, 5),
                inserted: 0,
                len_after: 9,
            }]
        );
    }

    #[test]
    fn base_insertion_into_replaced_range_stays_hidden() {
        let mut layer = mirror(10);
        // Replace underlying [2, 6) with "Q".
        layer.edit(span(2, 6), "Q");
        let changes = layer.absorb(Change {
            range: Interval::empty(4),
            inserted: 3,
            len_after: 13,
        });
        assert!(changes.is_empty());
        assert_eq!(
            layer.segments,
            vec![
                Segment::verbatim(span(0, 2), 0),
                Segment::oblique(2, 2, "Q".into()),
                Segment::verbatim(span(3, 7), 9),
            ]
        );
        assert_eq!(layer.violation(13), None);
    }

    #[test]
    fn base_insertion_lands_after_own_insertion() {
        let mut layer = mirror(12);
        layer.edit(Interval::empty(2), "such ");
        let changes = layer.absorb(Change {
            range: Interval::empty(2),
            inserted: 1,
            len_after: 13,
        });
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].range, Interval::empty(7));
        assert_eq!(
            layer.segments,
            vec![
                Segment::verbatim(span(0, 2), 0),
                Segment::oblique(2, 2, "such ".into()),
                Segment::verbatim(span(7, 18), 2),
            ]
        );
    }

    #[test]
    fn base_removal_spanning_own_insertion() {
        let mut layer = mirror(10);
        layer.edit(Interval::empty(5), "XY");
        // Base drops [3, 8): two separate runs disappear around "XY".
        let changes = layer.absorb(Change {
            range: span(3, 8),
            inserted: 0,
            len_after: 5,
        });
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].range, span(7, 10));
        assert_eq!(changes[1].range, span(3, 5));
        assert_eq!(
            layer.segments,
            vec![
                Segment::verbatim(span(0, 3), 0),
                Segment::oblique(3, 3, "XY".into()),
                Segment::verbatim(span(5, 7), 3),
            ]
        );
        assert_eq!(layer.violation(5), None);
    }

    #[test]
    fn base_replacement_of_replaced_range_stays_hidden() {
        let mut layer = mirror(12);
        layer.edit(span(7, 11), "exam");
        let changes = layer.absorb(Change {
            range: span(7, 11),
            inserted: 4,
            len_after: 12,
        });
        assert!(changes.is_empty());
        assert_eq!(
            layer.segments,
            vec![
                Segment::verbatim(span(0, 7), 0),
                Segment::oblique(7, 7, "exam".into()),
                Segment::verbatim(span(11, 12), 11),
            ]
        );
        assert_eq!(layer.violation(12), None);
    }

    #[test]
    fn base_replacement_of_mirrored_range_shows_through() {
        let mut layer = mirror(12);
        let changes = layer.absorb(Change {
            range: span(2, 4),
            inserted: 3,
            len_after: 13,
        });
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].range, Interval::empty(2));
        assert_eq!(layer.segments, vec![Segment::verbatim(span(0, 13), 0)]);
    }
}

//! The layer arena.
//!
//! Layers live in one `Vec` and refer to their base by index, so a base can
//! be edited while layers derived from it exist. Every edit is pushed up to
//! the layers derived from the edited one before the call returns.

use std::fmt;

use ropey::Rope;

use crate::error::{AlignError, Result};
use crate::interval::Interval;
use crate::layer::{Change, Derived, Layer};
use crate::resolve;
use crate::segment::Segment;

/// Handle to one layer of a [`LayerStack`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(usize);

impl LayerId {
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Position of the layer in creation order.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// A set of text layers, each either a root holding text or a layer derived
/// from another one in the same stack.
///
/// All offsets are in chars (Unicode scalar values), not bytes.
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

// === Construction ===

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack holding a single root layer with `text`.
    pub fn from_text(text: &str) -> (Self, LayerId) {
        let mut stack = Self::new();
        let root = stack.push_root(text);
        (stack, root)
    }

    /// Add a root layer. Resolution on a root is the identity.
    pub fn push_root(&mut self, text: &str) -> LayerId {
        let id = LayerId(self.layers.len());
        self.layers.push(Layer::Root(Rope::from_str(text)));
        tracing::debug!(layer = %id, len = self.layers[id.0].len(), "created root layer");
        id
    }

    /// Add a layer mirroring `base` 1:1.
    ///
    /// The new layer reads through `base`, so later edits to `base` show up
    /// in it everywhere it has not been edited itself.
    pub fn derive(&mut self, base: LayerId) -> Result<LayerId> {
        let base_len = self.layer(base)?.len();
        let id = LayerId(self.layers.len());
        self.layers
            .push(Layer::Derived(Derived::mirror(base, base_len)));
        tracing::debug!(layer = %id, %base, len = base_len, "derived layer");
        Ok(id)
    }
}

// === Read access ===

impl LayerStack {
    fn layer(&self, id: LayerId) -> Result<&Layer> {
        self.layers.get(id.0).ok_or(AlignError::UnknownLayer(id))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Handle for the layer at `index` in creation order.
    pub fn layer_id(&self, index: usize) -> Result<LayerId> {
        let id = LayerId(index);
        self.layer(id).map(|_| id)
    }

    /// Length in chars.
    pub fn len(&self, id: LayerId) -> Result<usize> {
        Ok(self.layer(id)?.len())
    }

    pub fn is_empty(&self, id: LayerId) -> Result<bool> {
        Ok(self.len(id)? == 0)
    }

    /// The layer `id` was derived from, `None` for a root.
    pub fn base(&self, id: LayerId) -> Result<Option<LayerId>> {
        Ok(self.layer(id)?.base())
    }

    /// Segment list of a derived layer; empty for a root.
    pub fn segments(&self, id: LayerId) -> Result<&[Segment]> {
        match self.layer(id)? {
            Layer::Root(_) => Ok(&[]),
            Layer::Derived(derived) => Ok(&derived.segments),
        }
    }

    /// Whole text of the layer.
    pub fn text(&self, id: LayerId) -> Result<String> {
        let len = self.len(id)?;
        self.text_range(id, Interval::with_len(0, len))
    }

    /// Text of `range`. Only segments overlapping the range are visited.
    pub fn text_range(&self, id: LayerId, range: Interval) -> Result<String> {
        check_bounds(range, self.len(id)?)?;
        let mut out = String::with_capacity(range.len());
        self.write_range(id, range, &mut out)?;
        Ok(out)
    }

    fn write_range(&self, id: LayerId, range: Interval, out: &mut String) -> Result<()> {
        if range.is_empty() {
            return Ok(());
        }
        match self.layer(id)? {
            Layer::Root(rope) => {
                for chunk in rope.slice(range.to_range()).chunks() {
                    out.push_str(chunk);
                }
            }
            Layer::Derived(derived) => {
                let first = derived.locate(range.start());
                for seg in derived.segments[first..]
                    .iter()
                    .take_while(|s| s.span.start() < range.end())
                {
                    let from = range.start().max(seg.span.start()) - seg.span.start();
                    let to = range.end().min(seg.span.end()) - seg.span.start();
                    match seg.underlying() {
                        Some(under) => {
                            let below = Interval::with_len(under.start() + from, to - from);
                            self.write_range(derived.base, below, out)?;
                        }
                        None => out.push_str(seg.oblique_slice(Interval::with_len(from, to - from))),
                    }
                }
            }
        }
        Ok(())
    }

    /// One line per segment, for logs and tests.
    ///
    /// Root layers have no segments and print as `root [0, len)`.
    pub fn dump_segments(&self, id: LayerId) -> Result<String> {
        Ok(match self.layer(id)? {
            Layer::Root(rope) => format!("root {}", Interval::with_len(0, rope.len_chars())),
            Layer::Derived(derived) => derived
                .segments
                .iter()
                .map(Segment::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }

    /// First broken structural invariant of the layer, if any.
    pub fn invariant_violation(&self, id: LayerId) -> Result<Option<String>> {
        match self.layer(id)? {
            Layer::Root(_) => Ok(None),
            Layer::Derived(derived) => {
                let base_len = self.len(derived.base)?;
                Ok(derived.violation(base_len))
            }
        }
    }
}

// === Mutation ===

impl LayerStack {
    /// Insert `text` at char offset `pos`.
    pub fn insert(&mut self, id: LayerId, pos: usize, text: &str) -> Result<()> {
        self.replace(id, Interval::empty(pos), text)
    }

    /// Delete `range`.
    pub fn delete(&mut self, id: LayerId, range: Interval) -> Result<()> {
        self.replace(id, range, "")
    }

    /// Replace `range` with `text` in one step.
    ///
    /// Nothing is touched if the range is out of bounds.
    pub fn replace(&mut self, id: LayerId, range: Interval, text: &str) -> Result<()> {
        let len = self.len(id)?;
        check_bounds(range, len)?;
        if range.is_empty() && text.is_empty() {
            return Ok(());
        }

        let change = self.layers[id.0].edit(range, text);
        tracing::debug!(
            layer = %id,
            start = range.start(),
            end = range.end(),
            inserted = change.inserted,
            "applied edit"
        );
        debug_assert_eq!(self.invariant_violation(id), Ok(None));
        self.propagate(id, vec![change]);
        Ok(())
    }

    /// Push `changes` made to `source` into every layer derived from it,
    /// and on up through their own dependents.
    fn propagate(&mut self, source: LayerId, changes: Vec<Change>) {
        let mut pending = vec![(source, changes)];
        while let Some((source, changes)) = pending.pop() {
            // Bases are always created before the layers derived from them.
            for index in source.0 + 1..self.layers.len() {
                let Layer::Derived(derived) = &mut self.layers[index] else {
                    continue;
                };
                if derived.base != source {
                    continue;
                }
                let mut own = Vec::new();
                for change in &changes {
                    tracing::debug!(
                        target: "strata::propagate",
                        from = %source,
                        to = index,
                        start = change.range.start(),
                        end = change.range.end(),
                        inserted = change.inserted,
                        "absorbing base change"
                    );
                    own.extend(derived.absorb(*change));
                }
                let id = LayerId(index);
                debug_assert_eq!(self.invariant_violation(id), Ok(None));
                if !own.is_empty() {
                    pending.push((id, own));
                }
            }
        }
    }
}

// === Offset mapping ===

impl LayerStack {
    /// Map `interval` from layer `id` to its base.
    ///
    /// Identity on a root. Never fails for an in-bounds interval: edges in
    /// text without a base counterpart snap outwards from it, and a range
    /// lying entirely in such text collapses to an empty interval.
    pub fn resolve(&self, id: LayerId, interval: Interval) -> Result<Interval> {
        let layer = self.layer(id)?;
        check_bounds(interval, layer.len())?;
        match layer {
            Layer::Root(_) => Ok(interval),
            Layer::Derived(derived) => {
                let base_len = self.len(derived.base)?;
                Ok(resolve::resolve(&derived.segments, interval, base_len))
            }
        }
    }

    /// Map `interval`, given in the base's coordinates, up into layer `id`.
    ///
    /// Identity on a root. Edges in base text this layer removed snap
    /// inwards; a range that was replaced maps onto the replacement.
    pub fn inverse_resolve(&self, id: LayerId, interval: Interval) -> Result<Interval> {
        match self.layer(id)? {
            Layer::Root(rope) => {
                check_bounds(interval, rope.len_chars())?;
                Ok(interval)
            }
            Layer::Derived(derived) => {
                check_bounds(interval, self.len(derived.base)?)?;
                Ok(resolve::inverse_resolve(
                    &derived.segments,
                    interval,
                    derived.len,
                ))
            }
        }
    }

    /// Base links from `from` down to (and excluding) `to`.
    fn chain(&self, from: LayerId, to: LayerId) -> Result<Vec<LayerId>> {
        let mut chain = Vec::new();
        let mut current = from;
        while current != to {
            chain.push(current);
            current = self
                .base(current)?
                .ok_or(AlignError::UnrelatedLayers { from, to })?;
        }
        self.layer(to)?;
        Ok(chain)
    }

    /// Map `interval` from `from` down to its ancestor `to`, one
    /// [`resolve`](Self::resolve) per layer in between.
    pub fn project_down(&self, from: LayerId, to: LayerId, interval: Interval) -> Result<Interval> {
        check_bounds(interval, self.len(from)?)?;
        self.chain(from, to)?
            .into_iter()
            .try_fold(interval, |acc, id| self.resolve(id, acc))
    }

    /// Map `interval` from `from` up to its descendant `to`, one
    /// [`inverse_resolve`](Self::inverse_resolve) per layer in between.
    pub fn project_up(&self, from: LayerId, to: LayerId, interval: Interval) -> Result<Interval> {
        check_bounds(interval, self.len(from)?)?;
        let chain = self.chain(to, from).map_err(|err| match err {
            AlignError::UnrelatedLayers { .. } => AlignError::UnrelatedLayers { from, to },
            other => other,
        })?;
        chain
            .into_iter()
            .rev()
            .try_fold(interval, |acc, id| self.inverse_resolve(id, acc))
    }
}

fn check_bounds(interval: Interval, len: usize) -> Result<()> {
    if interval.fits(len) {
        Ok(())
    } else {
        Err(AlignError::out_of_bounds(interval, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn root_is_identity() {
        let (stack, root) = LayerStack::from_text("I am a test.");
        assert_eq!(stack.resolve(root, span(2, 4)).unwrap(), span(2, 4));
        assert_eq!(stack.inverse_resolve(root, span(0, 12)).unwrap(), span(0, 12));
        assert_eq!(stack.dump_segments(root).unwrap(), "root [0, 12)");
    }

    #[test]
    fn text_range_reads_through_layers() {
        let (mut stack, root) = LayerStack::from_text("I am a test.");
        let mid = stack.derive(root).unwrap();
        stack.replace(mid, span(2, 4), "was").unwrap();
        let top = stack.derive(mid).unwrap();
        stack.insert(top, 0, "> ").unwrap();

        assert_eq!(stack.text(top).unwrap(), "> I was a test.");
        assert_eq!(stack.text_range(top, span(3, 7)).unwrap(), " was");
        assert_eq!(stack.text_range(top, span(5, 5)).unwrap(), "");
    }

    #[test]
    fn out_of_bounds_is_rejected_without_change() {
        let (mut stack, root) = LayerStack::from_text("abc");
        let top = stack.derive(root).unwrap();
        let before = stack.dump_segments(top).unwrap();

        let err = stack.delete(top, span(1, 9)).unwrap_err();
        assert_eq!(
            err,
            AlignError::InvalidRange {
                start: 1,
                end: 9,
                len: Some(3)
            }
        );
        assert!(stack.insert(top, 4, "x").is_err());
        assert!(stack.resolve(top, span(0, 4)).is_err());
        assert_eq!(stack.dump_segments(top).unwrap(), before);
    }

    #[test]
    fn unknown_layer() {
        let (stack, _) = LayerStack::from_text("abc");
        let stranger = LayerId(7);
        assert_eq!(stack.len(stranger), Err(AlignError::UnknownLayer(stranger)));
        assert_eq!(stack.layer_id(7), Err(AlignError::UnknownLayer(stranger)));
        assert_eq!(stack.layer_id(0).unwrap().index(), 0);
    }

    #[test]
    fn projection_across_three_layers() {
        let (mut stack, root) = LayerStack::from_text("the colour of teh sky");
        let spelling = stack.derive(root).unwrap();
        stack.replace(spelling, span(14, 17), "the").unwrap();
        stack.replace(spelling, span(4, 10), "color").unwrap();
        let casing = stack.derive(spelling).unwrap();
        stack.replace(casing, span(0, 1), "T").unwrap();
        assert_eq!(stack.text(casing).unwrap(), "The color of the sky");

        // "sky" in the original.
        let sky = stack.project_up(root, casing, span(18, 21)).unwrap();
        assert_eq!(stack.text_range(casing, sky).unwrap(), "sky");
        assert_eq!(stack.project_down(casing, root, sky).unwrap(), span(18, 21));

        // "colour" lands on its replacement.
        let colour = stack.project_up(root, casing, span(4, 10)).unwrap();
        assert_eq!(stack.text_range(casing, colour).unwrap(), "color");

        assert_eq!(
            stack.project_down(root, casing, span(0, 1)),
            Err(AlignError::UnrelatedLayers {
                from: root,
                to: casing
            })
        );
    }

    #[test]
    fn edits_reach_grandchildren() {
        let (mut stack, root) = LayerStack::from_text("hello world");
        let mid = stack.derive(root).unwrap();
        let top = stack.derive(mid).unwrap();
        stack.insert(top, 5, ",").unwrap();

        stack.replace(root, span(6, 11), "there").unwrap();
        assert_eq!(stack.text(mid).unwrap(), "hello there");
        assert_eq!(stack.text(top).unwrap(), "hello, there");
        for id in [mid, top] {
            assert_eq!(stack.invariant_violation(id).unwrap(), None);
        }
    }
}

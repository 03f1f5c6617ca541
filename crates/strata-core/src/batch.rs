//! Batches of edits addressed against one snapshot of a layer.

use smol_str::SmolStr;

use crate::error::{AlignError, Result};
use crate::interval::Interval;
use crate::stack::{LayerId, LayerStack};

/// One pending replacement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub range: Interval,
    pub text: SmolStr,
}

/// A set of edits whose ranges all refer to the layer's text as it is
/// before the batch is applied.
///
/// Edits may not overlap, and no two may start at the same position (the
/// order of two insertions at one point would be ambiguous). Edits that
/// neither remove nor insert anything are ignored. The batch is checked as a
/// whole before anything is applied.
#[derive(Clone, Debug, Default)]
pub struct EditBatch {
    edits: Vec<Edit>,
}

impl EditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pos: usize, text: impl Into<SmolStr>) -> &mut Self {
        self.replace(Interval::empty(pos), text)
    }

    pub fn delete(&mut self, range: Interval) -> &mut Self {
        self.replace(range, SmolStr::default())
    }

    pub fn replace(&mut self, range: Interval, text: impl Into<SmolStr>) -> &mut Self {
        self.edits.push(Edit {
            range,
            text: text.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Sort the edits and reject out-of-bounds or conflicting ones.
    ///
    /// Empty edits touch nothing, so they are dropped before the conflict check.
    fn validated(mut self, len: usize) -> Result<Vec<Edit>> {
        for edit in &self.edits {
            if !edit.range.fits(len) {
                return Err(AlignError::out_of_bounds(edit.range, len));
            }
        }
        self.edits.retain(|e| !(e.range.is_empty() && e.text.is_empty()));
        self.edits.sort_by_key(|e| (e.range.start(), e.range.end()));
        for pair in self.edits.windows(2) {
            let (first, second) = (pair[0].range, pair[1].range);
            if second.start() < first.end() || second.start() == first.start() {
                return Err(AlignError::ConflictingEdit { first, second });
            }
        }
        Ok(self.edits)
    }

    /// Apply every edit to `layer`. Returns the number of edits applied.
    ///
    /// On error nothing has been applied.
    pub fn apply(self, stack: &mut LayerStack, layer: LayerId) -> Result<usize> {
        let len = stack.len(layer)?;
        let edits = self.validated(len)?;
        let count = edits.len();
        // Right to left, so every range is still valid when its turn comes.
        for edit in edits.into_iter().rev() {
            stack.replace(layer, edit.range, &edit.text)?;
        }
        tracing::debug!(layer = %layer, count, "applied edit batch");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn applies_against_original_offsets() {
        let (mut stack, root) = LayerStack::from_text("I am a test.");
        let top = stack.derive(root).unwrap();
        let mut batch = EditBatch::new();
        batch
            .replace(span(2, 4), "was")
            .delete(span(4, 6))
            .insert(12, "!")
            .insert(0, "So ");
        assert_eq!(batch.apply(&mut stack, top).unwrap(), 4);
        assert_eq!(stack.text(top).unwrap(), "So I was test.!");
    }

    #[test]
    fn overlapping_edits_conflict() {
        let (mut stack, root) = LayerStack::from_text("I am a test.");
        let before = stack.dump_segments(root).unwrap();
        let mut batch = EditBatch::new();
        batch.delete(span(2, 6)).replace(span(5, 7), "x");
        assert_eq!(
            batch.apply(&mut stack, root),
            Err(AlignError::ConflictingEdit {
                first: span(2, 6),
                second: span(5, 7),
            })
        );
        assert_eq!(stack.text(root).unwrap(), "I am a test.");
        assert_eq!(stack.dump_segments(root).unwrap(), before);
    }

    #[test]
    fn same_point_conflicts() {
        let (mut stack, root) = LayerStack::from_text("abc");
        let mut batch = EditBatch::new();
        batch.insert(1, "x").insert(1, "y");
        assert!(matches!(
            batch.apply(&mut stack, root),
            Err(AlignError::ConflictingEdit { .. })
        ));

        let mut batch = EditBatch::new();
        batch.insert(1, "x").delete(span(1, 2));
        assert!(batch.apply(&mut stack, root).is_err());
    }

    #[test]
    fn empty_edits_never_conflict() {
        let (mut stack, root) = LayerStack::from_text("abcdef");
        let mut batch = EditBatch::new();
        batch
            .delete(Interval::empty(2))
            .replace(span(2, 4), "X")
            .insert(2, "");
        assert_eq!(batch.apply(&mut stack, root).unwrap(), 1);
        assert_eq!(stack.text(root).unwrap(), "abXef");
    }

    #[test]
    fn touching_edits_are_fine() {
        let (mut stack, root) = LayerStack::from_text("abcdef");
        let mut batch = EditBatch::new();
        batch
            .replace(span(0, 2), "X")
            .replace(span(2, 4), "Y")
            .insert(4, "-");
        batch.apply(&mut stack, root).unwrap();
        assert_eq!(stack.text(root).unwrap(), "XY-ef");
    }

    #[test]
    fn out_of_bounds_edit_rejected_first() {
        let (mut stack, root) = LayerStack::from_text("abc");
        let mut batch = EditBatch::new();
        batch.insert(0, "x").delete(span(2, 5));
        assert_eq!(
            batch.apply(&mut stack, root),
            Err(AlignError::InvalidRange {
                start: 2,
                end: 5,
                len: Some(3)
            })
        );
        assert_eq!(stack.text(root).unwrap(), "abc");
    }
}

//! Token normalization on top of a layer.
//!
//! What to change is up to the [`Normalizer`]; this module only turns its
//! answers into one [`EditBatch`], so every token offset refers to the text
//! as it was before normalization.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::batch::EditBatch;
use crate::error::Result;
use crate::interval::Interval;
use crate::stack::{LayerId, LayerStack};

/// Decides the replacement for a token, if it needs one.
pub trait Normalizer {
    /// `None` (or the token itself) leaves the token alone.
    fn normalize(&self, token: &str) -> Option<SmolStr>;
}

impl<F> Normalizer for F
where
    F: Fn(&str) -> Option<SmolStr>,
{
    fn normalize(&self, token: &str) -> Option<SmolStr> {
        self(token)
    }
}

/// Exact-match replacement table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplacementTable {
    rules: HashMap<SmolStr, SmolStr>,
}

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, returning the replacement it displaced.
    pub fn insert(&mut self, from: impl Into<SmolStr>, to: impl Into<SmolStr>) -> Option<SmolStr> {
        self.rules.insert(from.into(), to.into())
    }

    pub fn get(&self, token: &str) -> Option<&SmolStr> {
        self.rules.get(token)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<K: Into<SmolStr>, V: Into<SmolStr>> FromIterator<(K, V)> for ReplacementTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            rules: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Normalizer for ReplacementTable {
    fn normalize(&self, token: &str) -> Option<SmolStr> {
        self.get(token).cloned()
    }
}

/// Char intervals of the whitespace-separated tokens of `text`.
pub fn whitespace_tokens(text: &str) -> Vec<Interval> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut count = 0;
    for (pos, c) in text.chars().enumerate() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push(Interval::with_len(s, pos - s));
                start = None;
            }
            (false, None) => start = Some(pos),
            _ => {}
        }
        count = pos + 1;
    }
    if let Some(s) = start {
        tokens.push(Interval::with_len(s, count - s));
    }
    tokens
}

/// Replace every token of `layer` the normalizer has an answer for.
///
/// `tokens` are intervals in the layer's current text. Returns the number of
/// tokens replaced; on error the layer is unchanged.
pub fn normalize_tokens<N>(
    stack: &mut LayerStack,
    layer: LayerId,
    tokens: &[Interval],
    normalizer: &N,
) -> Result<usize>
where
    N: Normalizer + ?Sized,
{
    let mut batch = EditBatch::new();
    for &token in tokens {
        let current = stack.text_range(layer, token)?;
        match normalizer.normalize(&current) {
            Some(replacement) if replacement != current => {
                tracing::trace!(%token, from = %current, to = %replacement, "normalizing token");
                batch.replace(token, replacement);
            }
            _ => {}
        }
    }
    batch.apply(stack, layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_char_offsets() {
        let tokens = whitespace_tokens("  naïve  café\tau lait ");
        let spans: Vec<_> = tokens.iter().map(|t| (t.start(), t.end())).collect();
        assert_eq!(spans, vec![(2, 7), (9, 13), (14, 16), (17, 21)]);
        assert!(whitespace_tokens("   ").is_empty());
    }

    #[test]
    fn table_normalizes_and_reanchors() {
        let (mut stack, root) = LayerStack::from_text("teh colour of teh sea");
        let top = stack.derive(root).unwrap();
        let table: ReplacementTable = [("teh", "the"), ("colour", "color")].into_iter().collect();

        let tokens = whitespace_tokens(&stack.text(top).unwrap());
        let replaced = normalize_tokens(&mut stack, top, &tokens, &table).unwrap();
        assert_eq!(replaced, 3);
        assert_eq!(stack.text(top).unwrap(), "the color of the sea");

        let mapped: Vec<String> = tokens
            .iter()
            .map(|&t| {
                let up = stack.inverse_resolve(top, t).unwrap();
                stack.text_range(top, up).unwrap()
            })
            .collect();
        assert_eq!(mapped, ["the", "color", "of", "the", "sea"]);
    }

    #[test]
    fn closures_are_normalizers() {
        let (mut stack, root) = LayerStack::from_text("Hello World");
        let top = stack.derive(root).unwrap();
        let lower = |t: &str| Some(SmolStr::new(t.to_lowercase()));
        let tokens = whitespace_tokens("Hello World");
        assert_eq!(normalize_tokens(&mut stack, top, &tokens, &lower).unwrap(), 2);
        assert_eq!(stack.text(top).unwrap(), "hello world");
        // A token the normalizer leaves identical is not an edit.
        assert_eq!(normalize_tokens(&mut stack, top, &tokens, &lower).unwrap(), 0);
    }
}

//! The `normalize` command: apply a rule table to the whitespace tokens of a
//! document and report where every original token ended up.

use serde::Serialize;
use strata_core::{Interval, LayerStack, ReplacementTable, normalize_tokens, whitespace_tokens};

use crate::error::CliError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenSpan {
    pub original: Interval,
    pub normalized: Interval,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub text: String,
    pub replaced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<TokenSpan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<String>>,
}

impl Report {
    pub fn render(&self) -> String {
        let mut lines = vec![self.text.clone()];
        for span in self.spans.iter().flatten() {
            lines.push(format!("{} -> {} {:?}", span.original, span.normalized, span.text));
        }
        lines.extend(self.segments.iter().flatten().cloned());
        lines.join("\n")
    }
}

pub fn normalize(
    input: &str,
    rules: &ReplacementTable,
    with_spans: bool,
    with_segments: bool,
) -> Result<Report, CliError> {
    let (mut stack, root) = LayerStack::from_text(input);
    let layer = stack.derive(root)?;
    let tokens = whitespace_tokens(input);
    let replaced = normalize_tokens(&mut stack, layer, &tokens, rules)?;
    tracing::info!(tokens = tokens.len(), replaced, "normalized input");

    let spans = with_spans
        .then(|| {
            tokens
                .iter()
                .map(|&original| -> strata_core::Result<TokenSpan> {
                    let normalized = stack.inverse_resolve(layer, original)?;
                    Ok(TokenSpan {
                        original,
                        normalized,
                        text: stack.text_range(layer, normalized)?,
                    })
                })
                .collect::<strata_core::Result<Vec<_>>>()
        })
        .transpose()?;
    let segments = with_segments
        .then(|| stack.dump_segments(layer))
        .transpose()?
        .map(|dump| dump.lines().map(str::to_string).collect());

    Ok(Report {
        text: stack.text(layer)?,
        replaced,
        spans,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ReplacementTable {
        [("colour", "color"), ("teh", "the")].into_iter().collect()
    }

    #[test]
    fn report_with_spans() {
        let report = normalize("teh colour  of it", &rules(), true, false).unwrap();
        assert_eq!(report.replaced, 2);
        insta::assert_snapshot!(report.render(), @r#"
        the color  of it
        [0, 3) -> [0, 3) "the"
        [4, 10) -> [4, 9) "color"
        [12, 14) -> [11, 13) "of"
        [15, 17) -> [14, 16) "it"
        "#);
    }

    #[test]
    fn segments_only_when_asked() {
        let plain = normalize("teh end", &rules(), false, false).unwrap();
        assert_eq!(plain.render(), "the end");
        assert_eq!(plain.spans, None);

        let dumped = normalize("teh end", &rules(), false, true).unwrap();
        insta::assert_snapshot!(dumped.render(), @r#"
        the end
        [0, 3) oblique @0 "the"
        [3, 7) verbatim @3
        "#);
    }

    #[test]
    fn json_shape() {
        let report = normalize("teh", &rules(), true, false).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"text":"the","replaced":1,"spans":[{"original":{"start":0,"end":3},"normalized":{"start":0,"end":3},"text":"the"}]}"#
        );
    }
}

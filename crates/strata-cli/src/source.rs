//! Input files and the KDL plumbing shared by scripts, rule sets and config.

use std::path::Path;

use kdl::{KdlDocument, KdlNode, KdlValue};
use miette::{NamedSource, SourceSpan};

use crate::error::CliError;

/// A file's name and contents, kept together for diagnostics.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.display().to_string(), text))
    }

    fn named(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.text.clone())
    }

    pub fn parse_kdl(&self) -> Result<KdlDocument, CliError> {
        self.text.parse::<KdlDocument>().map_err(|err| CliError::Kdl {
            name: self.name.clone(),
            src: self.named(),
            // kdl reports through an older miette; only the offsets carry over.
            span: (err.span.offset(), err.span.len()).into(),
            label: err.label.unwrap_or("here").to_string(),
            help: err.help.map(str::to_string),
        })
    }

    pub fn invalid(&self, span: SourceSpan, message: impl Into<String>) -> CliError {
        CliError::Invalid {
            message: message.into(),
            src: self.named(),
            span,
        }
    }

    pub fn step_failed(&self, span: SourceSpan, cause: strata_core::AlignError) -> CliError {
        CliError::Step {
            cause,
            src: self.named(),
            span,
        }
    }
}

pub fn node_span(node: &KdlNode) -> SourceSpan {
    let span = node.span();
    (span.offset(), span.len()).into()
}

/// Positional arguments of one node, with errors pointing at the node.
pub struct Args<'a> {
    node: &'a KdlNode,
    source: &'a SourceFile,
    values: Vec<&'a KdlValue>,
}

impl<'a> Args<'a> {
    pub fn new(node: &'a KdlNode, source: &'a SourceFile) -> Self {
        let values = node
            .entries()
            .iter()
            .filter(|e| e.name().is_none())
            .map(|e| e.value())
            .collect();
        Self {
            node,
            source,
            values,
        }
    }

    pub fn name(&self) -> &str {
        self.node.name().value()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn error(&self, message: impl Into<String>) -> CliError {
        self.source.invalid(node_span(self.node), message)
    }

    /// Fail unless the node has one of the `allowed` argument counts.
    pub fn expect_count(&self, allowed: &[usize]) -> Result<(), CliError> {
        if allowed.contains(&self.len()) {
            return Ok(());
        }
        let wanted = allowed
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(self.error(format!(
            "`{}` takes {wanted} argument(s), got {}",
            self.name(),
            self.len()
        )))
    }

    pub fn offset(&self, idx: usize) -> Result<usize, CliError> {
        self.values
            .get(idx)
            .and_then(|v| v.as_i64())
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| {
                self.error(format!(
                    "argument {} of `{}` must be a non-negative integer",
                    idx + 1,
                    self.name()
                ))
            })
    }

    pub fn string(&self, idx: usize) -> Result<&'a str, CliError> {
        self.values
            .get(idx)
            .copied()
            .and_then(KdlValue::as_string)
            .ok_or_else(|| {
                self.error(format!(
                    "argument {} of `{}` must be a string",
                    idx + 1,
                    self.name()
                ))
            })
    }

    pub fn boolean(&self, idx: usize) -> Result<bool, CliError> {
        self.values
            .get(idx)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| {
                self.error(format!(
                    "argument {} of `{}` must be true or false",
                    idx + 1,
                    self.name()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_keeps_location() {
        let source = SourceFile::new("broken.kdl", "insert 1 \"unterminated\n");
        let err = source.parse_kdl().unwrap_err();
        assert!(matches!(err, CliError::Kdl { ref name, .. } if name == "broken.kdl"));
    }

    #[test]
    fn positional_arguments() {
        let source = SourceFile::new("s.kdl", "replace 2 4 \"was\" note=\"ignored\"\n");
        let doc = source.parse_kdl().unwrap();
        let node = &doc.nodes()[0];
        let args = Args::new(node, &source);
        assert_eq!(args.name(), "replace");
        assert_eq!(args.len(), 3);
        assert_eq!(args.offset(0).unwrap(), 2);
        assert_eq!(args.string(2).unwrap(), "was");
        assert!(args.offset(2).is_err());
        assert!(args.expect_count(&[2]).is_err());
    }
}

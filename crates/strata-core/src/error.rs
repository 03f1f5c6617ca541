//! Error types for strata-core.

use miette::Diagnostic;

use crate::interval::Interval;
use crate::stack::LayerId;

/// Main error type for layer operations.
///
/// Resolution never produces an error for a valid interval; deleted and
/// inserted regions are handled by snapping, not by failing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum AlignError {
    /// Inverted range, or a range reaching past the end of the text.
    ///
    /// `len` is the length the range was checked against, if any.
    #[error("invalid range [{start}, {end}){}", bound_suffix(.len))]
    #[diagnostic(
        code(strata::invalid_range),
        help("ranges are char offsets with start <= end <= length")
    )]
    InvalidRange {
        start: usize,
        end: usize,
        len: Option<usize>,
    },

    /// Two edits of one batch target overlapping ranges or the same point.
    #[error("edit at {second} conflicts with edit at {first}")]
    #[diagnostic(code(strata::conflicting_edit))]
    ConflictingEdit { first: Interval, second: Interval },

    /// The id was not handed out by this stack.
    #[error("unknown layer {0}")]
    #[diagnostic(code(strata::unknown_layer))]
    UnknownLayer(LayerId),

    /// A projection between two layers that do not sit on one base chain.
    #[error("{to} is not reachable from {from} through base links")]
    #[diagnostic(code(strata::unrelated_layers))]
    UnrelatedLayers { from: LayerId, to: LayerId },
}

impl AlignError {
    pub(crate) fn out_of_bounds(interval: Interval, len: usize) -> Self {
        Self::InvalidRange {
            start: interval.start(),
            end: interval.end(),
            len: Some(len),
        }
    }
}

fn bound_suffix(len: &Option<usize>) -> String {
    match len {
        Some(len) => format!(" for length {len}"),
        None => String::new(),
    }
}

pub type Result<T, E = AlignError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_range_messages() {
        let inverted = AlignError::InvalidRange {
            start: 5,
            end: 3,
            len: None,
        };
        assert_eq!(inverted.to_string(), "invalid range [5, 3)");

        let past_end = AlignError::out_of_bounds(Interval::new(2, 9).unwrap(), 4);
        assert_eq!(past_end.to_string(), "invalid range [2, 9) for length 4");
    }
}

//! strata-core: editable text layers that stay aligned with the text they
//! were derived from.
//!
//! This crate provides:
//! - `LayerStack` - an arena of root and derived layers with live propagation
//!   of base edits
//! - `resolve` / `inverse_resolve` - offset mapping between a layer and its base,
//!   and `project_down` / `project_up` across several layers
//! - `EditBatch` - non-overlapping edits addressed against one snapshot
//! - `Normalizer` - token-level normalization on top of a batch
//!
//! All offsets are char offsets.

pub mod batch;
pub mod error;
pub mod interval;
mod layer;
pub mod normalize;
mod resolve;
pub mod segment;
pub mod stack;

pub use batch::{Edit, EditBatch};
pub use error::{AlignError, Result};
pub use interval::Interval;
pub use normalize::{Normalizer, ReplacementTable, normalize_tokens, whitespace_tokens};
pub use segment::{Segment, SegmentKind};
pub use smol_str::SmolStr;
pub use stack::{LayerId, LayerStack};

//! Error types for the strata CLI.

use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use strata_core::AlignError;

/// Everything the CLI can fail with.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("could not read {}", path.display())]
    #[diagnostic(code(strata::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid KDL.
    #[error("failed to parse {name} as KDL")]
    #[diagnostic(code(strata::kdl))]
    Kdl {
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("{label}")]
        span: SourceSpan,
        label: String,
        #[help]
        help: Option<String>,
    },

    /// Valid KDL that does not make sense as a script, rule set or config.
    #[error("{message}")]
    #[diagnostic(code(strata::invalid))]
    Invalid {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    /// A script step the layer stack rejected.
    #[error("{cause}")]
    #[diagnostic(code(strata::step))]
    Step {
        cause: AlignError,
        #[source_code]
        src: NamedSource<String>,
        #[label("while running this step")]
        span: SourceSpan,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Align(#[from] AlignError),

    #[error("could not write JSON output")]
    #[diagnostic(code(strata::json))]
    Json(#[from] serde_json::Error),
}

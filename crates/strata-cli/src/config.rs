//! User configuration, read from a KDL file.
//!
//! ```kdl
//! format "json"
//! show-segments true
//! rules {
//!     rule "colour" "color"
//! }
//! ```

use std::path::{Path, PathBuf};

use kdl::KdlNode;
use serde::Serialize;
use strata_core::ReplacementTable;

use crate::error::CliError;
use crate::source::{Args, SourceFile, node_span};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub format: OutputFormat,
    pub show_segments: bool,
    pub rules: ReplacementTable,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("strata").join("config.kdl"))
}

impl Config {
    /// Load from `explicit` if given, else from the default location.
    ///
    /// A missing default file means defaults; a missing explicit one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    tracing::debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        tracing::debug!(path = %path.display(), "loading config");
        Self::parse(&SourceFile::read(&path)?)
    }

    pub fn parse(source: &SourceFile) -> Result<Self, CliError> {
        let doc = source.parse_kdl()?;
        let mut config = Self::default();
        for node in doc.nodes() {
            let args = Args::new(node, source);
            match args.name() {
                "format" => {
                    args.expect_count(&[1])?;
                    config.format = match args.string(0)? {
                        "text" => OutputFormat::Text,
                        "json" => OutputFormat::Json,
                        other => {
                            return Err(args.error(format!(
                                "unknown format `{other}`, expected \"text\" or \"json\""
                            )));
                        }
                    };
                }
                "show-segments" => {
                    args.expect_count(&[1])?;
                    config.show_segments = args.boolean(0)?;
                }
                "rules" => {
                    let nodes = node.children().map(|d| d.nodes()).unwrap_or(&[]);
                    config.rules = parse_rules(nodes, source)?;
                }
                other => {
                    tracing::warn!(node = other, "ignoring unknown config node");
                }
            }
        }
        Ok(config)
    }
}

/// `rule "from" "to"` nodes into a table.
pub fn parse_rules(nodes: &[KdlNode], source: &SourceFile) -> Result<ReplacementTable, CliError> {
    let mut table = ReplacementTable::new();
    for node in nodes {
        let args = Args::new(node, source);
        if args.name() != "rule" {
            return Err(source.invalid(
                node_span(node),
                format!("expected `rule`, found `{}`", args.name()),
            ));
        }
        args.expect_count(&[2])?;
        let from = args.string(0)?;
        if from.is_empty() || from.chars().any(char::is_whitespace) {
            return Err(args.error("a rule must match a single non-empty token"));
        }
        table.insert(from, args.string(1)?);
    }
    Ok(table)
}

/// A standalone rules file holds `rule` nodes at the top level.
pub fn load_rules(path: &Path) -> Result<ReplacementTable, CliError> {
    let source = SourceFile::read(path)?;
    let doc = source.parse_kdl()?;
    parse_rules(doc.nodes(), &source)
}

//! Edit scripts: a KDL document of steps run against a layer stack.
//!
//! ```kdl
//! derive
//! replace 2 4 "was"
//! get
//! resolve 2 5
//! ```
//!
//! Every step acts on the current layer, which starts as the root holding
//! the input text. `derive` creates a layer on top of the current one and
//! makes it current; `layer N` switches to an existing one.

use miette::SourceSpan;
use serde::Serialize;
use strata_core::{Interval, LayerId, LayerStack};

use crate::error::CliError;
use crate::source::{Args, SourceFile, node_span};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Derive,
    Layer(usize),
    Insert { pos: usize, text: String },
    Delete(Interval),
    Replace(Interval, String),
    Get(Option<Interval>),
    Resolve(Interval),
    Inverse(Interval),
    Dump,
}

/// What a reading step printed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Output {
    Text {
        layer: usize,
        text: String,
    },
    Mapped {
        layer: usize,
        direction: &'static str,
        from: Interval,
        to: Interval,
    },
    Segments {
        layer: usize,
        segments: Vec<String>,
    },
}

impl Output {
    /// Plain-text rendering; one line except for segment dumps.
    pub fn render(&self) -> String {
        match self {
            Output::Text { text, .. } => text.clone(),
            Output::Mapped { to, .. } => to.to_string(),
            Output::Segments { segments, .. } => segments.join("\n"),
        }
    }
}

pub struct Script {
    source: SourceFile,
    steps: Vec<(Step, SourceSpan)>,
}

impl Script {
    pub fn parse(source: SourceFile) -> Result<Self, CliError> {
        let doc = source.parse_kdl()?;
        let steps = doc
            .nodes()
            .iter()
            .map(|node| {
                let args = Args::new(node, &source);
                parse_step(&args).map(|step| (step, node_span(node)))
            })
            .collect::<Result<Vec<_>, CliError>>()?;
        Ok(Self { source, steps })
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().map(|(step, _)| step)
    }

    /// Run every step against `stack`, starting on `layer`.
    pub fn run(&self, stack: &mut LayerStack, mut layer: LayerId) -> Result<Vec<Output>, CliError> {
        let mut outputs = Vec::new();
        for (step, span) in &self.steps {
            let _span = tracing::debug_span!("step", ?step, %layer).entered();
            let output = run_step(stack, &mut layer, step)
                .map_err(|cause| self.source.step_failed(*span, cause))?;
            outputs.extend(output);
        }
        Ok(outputs)
    }
}

fn interval(args: &Args<'_>, first: usize) -> Result<Interval, CliError> {
    let (start, end) = (args.offset(first)?, args.offset(first + 1)?);
    Interval::new(start, end).map_err(|err| args.error(err.to_string()))
}

fn parse_step(args: &Args<'_>) -> Result<Step, CliError> {
    let step = match args.name() {
        "derive" => {
            args.expect_count(&[0])?;
            Step::Derive
        }
        "layer" => {
            args.expect_count(&[1])?;
            Step::Layer(args.offset(0)?)
        }
        "insert" => {
            args.expect_count(&[2])?;
            Step::Insert {
                pos: args.offset(0)?,
                text: args.string(1)?.to_string(),
            }
        }
        "delete" => {
            args.expect_count(&[2])?;
            Step::Delete(interval(args, 0)?)
        }
        "replace" => {
            args.expect_count(&[3])?;
            Step::Replace(interval(args, 0)?, args.string(2)?.to_string())
        }
        "get" => {
            args.expect_count(&[0, 2])?;
            if args.len() == 2 {
                Step::Get(Some(interval(args, 0)?))
            } else {
                Step::Get(None)
            }
        }
        "resolve" => {
            args.expect_count(&[2])?;
            Step::Resolve(interval(args, 0)?)
        }
        "inverse" => {
            args.expect_count(&[2])?;
            Step::Inverse(interval(args, 0)?)
        }
        "dump" => {
            args.expect_count(&[0])?;
            Step::Dump
        }
        other => return Err(args.error(format!("unknown step `{other}`"))),
    };
    Ok(step)
}

fn run_step(
    stack: &mut LayerStack,
    layer: &mut LayerId,
    step: &Step,
) -> strata_core::Result<Option<Output>> {
    let index = layer.index();
    let output = match step {
        Step::Derive => {
            *layer = stack.derive(*layer)?;
            None
        }
        Step::Layer(n) => {
            *layer = stack.layer_id(*n)?;
            None
        }
        Step::Insert { pos, text } => {
            stack.insert(*layer, *pos, text)?;
            None
        }
        Step::Delete(range) => {
            stack.delete(*layer, *range)?;
            None
        }
        Step::Replace(range, text) => {
            stack.replace(*layer, *range, text)?;
            None
        }
        Step::Get(range) => {
            let text = match range {
                Some(range) => stack.text_range(*layer, *range)?,
                None => stack.text(*layer)?,
            };
            Some(Output::Text { layer: index, text })
        }
        Step::Resolve(from) => Some(Output::Mapped {
            layer: index,
            direction: "resolve",
            from: *from,
            to: stack.resolve(*layer, *from)?,
        }),
        Step::Inverse(from) => Some(Output::Mapped {
            layer: index,
            direction: "inverse",
            from: *from,
            to: stack.inverse_resolve(*layer, *from)?,
        }),
        Step::Dump => Some(Output::Segments {
            layer: index,
            segments: stack
                .dump_segments(*layer)?
                .lines()
                .map(str::to_string)
                .collect(),
        }),
    };
    Ok(output)
}

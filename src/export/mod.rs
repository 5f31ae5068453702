//! Workflow Export Module
//!
//! Turns a validated pipeline into source text for a target workflow
//! language.
//!
//! # Architecture
//!
//! - [`cwl`]: Common Workflow Language document
//! - [`nextflow`]: Nextflow DSL2 processes and workflow block
//! - [`snakemake`]: Snakemake rules with a synthesized `rule all`
//! - [`facade`]: resolve → validate → sequence → build → emit pipeline

pub mod cwl;
pub mod facade;
pub mod nextflow;
pub mod snakemake;

pub use cwl::CwlEmitter;
pub use facade::{export, ExportFormat, ExportResult, Exporter};
pub use nextflow::NextflowEmitter;
pub use snakemake::SnakemakeEmitter;

use crate::error::Result;
use crate::workflow::model::WorkflowMetadata;
use crate::workflow::script::PipelineScript;

/// Renders a [`PipelineScript`] as text in one target language.
///
/// Implementations are pure: the same script and options always produce
/// byte-identical output, and every step and binding in the script appears
/// in the result.
pub trait Emitter {
    fn format(&self) -> ExportFormat;

    fn emit(&self, script: &PipelineScript, options: &WorkflowMetadata) -> Result<String>;
}

/// Header lines describing the workflow, without comment markers.
pub(crate) fn header_lines(options: &WorkflowMetadata) -> Vec<String> {
    let mut lines = vec![format!(
        "{} v{}",
        single_line(&options.name),
        single_line(&options.version)
    )];
    if !options.author.trim().is_empty() {
        lines.push(format!("Author: {}", single_line(&options.author)));
    }
    lines.push(format!("Generated by {}", crate::APP_NAME));
    lines
}

/// Collapses line breaks so user text cannot escape a comment line.
pub(crate) fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Export Facade
//!
//! Single entry point for callers: resolve tools, validate, sequence, build
//! the pipeline script and emit it in the requested format.
//!
//! Either every stage succeeds and a complete [`ExportResult`] comes back,
//! or nothing is emitted. Validation problems surface together as
//! [`ExportError::Invalid`].

use std::fmt;
use std::str::FromStr;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use super::{CwlEmitter, Emitter, NextflowEmitter, SnakemakeEmitter};
use crate::error::{ExportError, Result};
use crate::workflow::catalog::ToolCatalog;
use crate::workflow::model::{WorkflowDefinition, WorkflowMetadata};
use crate::workflow::script::{build, PipelineScript};
use crate::workflow::sequencer::sequence;
use crate::workflow::validator::validate;

/// Target workflow language.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Cwl,
    Nextflow,
    Snakemake,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [Self::Cwl, Self::Nextflow, Self::Snakemake];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cwl => "cwl",
            Self::Nextflow => "nextflow",
            Self::Snakemake => "snakemake",
        }
    }

    pub fn emitter(&self) -> &'static dyn Emitter {
        match self {
            Self::Cwl => &CwlEmitter,
            Self::Nextflow => &NextflowEmitter,
            Self::Snakemake => &SnakemakeEmitter,
        }
    }

    /// Conventional file name for a workflow exported in this format.
    ///
    /// Snakemake looks for `Snakefile` by default, so the workflow name is
    /// not used there.
    pub fn suggested_filename(&self, workflow_name: &str) -> String {
        match self {
            Self::Cwl => format!("{}.cwl", slug(workflow_name)),
            Self::Nextflow => format!("{}.nf", slug(workflow_name)),
            Self::Snakemake => "Snakefile".to_string(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cwl" => Ok(Self::Cwl),
            "nextflow" | "nf" => Ok(Self::Nextflow),
            "snakemake" | "smk" => Ok(Self::Snakemake),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Lowercase ASCII words of `name` joined by `-`; `workflow` if none remain.
pub fn slug(name: &str) -> String {
    let words: Vec<String> = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if words.is_empty() {
        "workflow".to_string()
    } else {
        words.join("-")
    }
}

/// Generated workflow text plus where it would conventionally be saved.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub content: String,
    pub suggested_filename: String,
}

/// Runs exports against a tool catalog.
///
/// # Example
///
/// ```
/// use pipewright::export::{ExportFormat, Exporter};
/// use pipewright::workflow::catalog::ToolCatalog;
/// use pipewright::workflow::model::{NodeDefinition, WorkflowDefinition};
///
/// let definition = WorkflowDefinition::default()
///     .with_node(NodeDefinition::input(1, "reads", "fastq"))
///     .with_node(NodeDefinition::tool(2, "fastqc"))
///     .with_node(NodeDefinition::output(3, "report", "html"))
///     .connect(1, "reads", 2, "reads")
///     .connect(2, "report", 3, "report");
///
/// let catalog = ToolCatalog::builtin();
/// let result = Exporter::new(&catalog)
///     .export(&definition, ExportFormat::Snakemake)
///     .unwrap();
///
/// assert_eq!(result.suggested_filename, "Snakefile");
/// assert!(result.content.contains("rule all:"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Exporter<'c> {
    catalog: &'c ToolCatalog,
}

impl<'c> Exporter<'c> {
    pub fn new(catalog: &'c ToolCatalog) -> Self {
        Self { catalog }
    }

    /// Resolves, validates, sequences and builds the pipeline script.
    pub fn prepare(&self, definition: &WorkflowDefinition) -> Result<PipelineScript> {
        let graph = self.catalog.resolve(definition).map_err(|e| {
            error!("{}", e);
            e
        })?;

        let validated = validate(graph).map_err(|errors| {
            info!(
                "Workflow '{}' rejected with {} problem(s)",
                definition.metadata.name,
                errors.len()
            );
            ExportError::Invalid(errors)
        })?;

        Ok(build(&sequence(validated)))
    }

    /// Exports the workflow in one format.
    pub fn export(
        &self,
        definition: &WorkflowDefinition,
        format: ExportFormat,
    ) -> Result<ExportResult> {
        let script = self.prepare(definition)?;
        emit(&script, &definition.metadata, format)
    }

    /// Like [`Exporter::export`] with the format given by name.
    pub fn export_str(
        &self,
        definition: &WorkflowDefinition,
        format: &str,
    ) -> Result<ExportResult> {
        let format = format.parse::<ExportFormat>().map_err(|e| {
            error!("{}", e);
            e
        })?;
        self.export(definition, format)
    }

    /// Exports the workflow in every supported format from one script.
    pub fn export_all(&self, definition: &WorkflowDefinition) -> Result<Vec<ExportResult>> {
        let script = self.prepare(definition)?;
        ExportFormat::ALL
            .iter()
            .map(|&format| emit(&script, &definition.metadata, format))
            .collect()
    }
}

/// Exports `definition` in `format` using `catalog`.
pub fn export(
    definition: &WorkflowDefinition,
    catalog: &ToolCatalog,
    format: ExportFormat,
) -> Result<ExportResult> {
    Exporter::new(catalog).export(definition, format)
}

/// Emits an already built pipeline script.
pub fn emit(
    script: &PipelineScript,
    metadata: &WorkflowMetadata,
    format: ExportFormat,
) -> Result<ExportResult> {
    let content = format.emitter().emit(script, metadata)?;
    let suggested_filename = format.suggested_filename(&metadata.name);

    debug!(
        "Emitted {} ({} bytes) as {}",
        format,
        content.len(),
        suggested_filename
    );

    Ok(ExportResult {
        format,
        content,
        suggested_filename,
    })
}

//! Workflow Loader
//!
//! Reads workflow definitions and tool catalogs from YAML or JSON files and
//! writes export results to disk.
//!
//! The format is picked from the file extension: `.json` is parsed as JSON,
//! anything else as YAML.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::catalog::ToolCatalog;
use super::model::{ToolDefinition, WorkflowDefinition};
use crate::error::{ExportError, Result};
use crate::export::ExportResult;

/// Serialization format of a definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

fn read_file(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        ExportError::Parse {
            path: path.display().to_string(),
            message: format!(
                "failed to read {} file: {}. Check that the file exists and is readable.",
                what, e
            ),
        }
    })
}

fn parse_document<T: serde::de::DeserializeOwned>(
    content: &str,
    format: DocumentFormat,
    path: &str,
) -> Result<T> {
    let parsed = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| ExportError::Parse {
        path: path.to_string(),
        message: format!("{}. Check the file format.", message),
    })
}

/// Parses a workflow definition from text.
pub fn parse_definition(content: &str, format: DocumentFormat) -> Result<WorkflowDefinition> {
    parse_document(content, format, "<input>")
}

/// Loads a workflow definition from a YAML or JSON file.
///
/// # Arguments
///
/// * `path` - Path to the workflow file
///
/// # Example
///
/// ```rust,no_run
/// use pipewright::workflow::load_definition;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let definition = load_definition("qc.yaml")?;
///     println!("Loaded {} nodes", definition.nodes.len());
///     Ok(())
/// }
/// ```
pub fn load_definition(path: impl AsRef<Path>) -> Result<WorkflowDefinition> {
    let path = path.as_ref();
    info!("Loading workflow from: {}", path.display());

    let content = read_file(path, "workflow")?;
    debug!("Workflow content loaded ({} bytes)", content.len());

    let definition: WorkflowDefinition = parse_document(
        &content,
        DocumentFormat::from_path(path),
        &path.display().to_string(),
    )?;

    info!(
        "Parsed workflow '{}': {} nodes, {} edges",
        definition.metadata.name,
        definition.nodes.len(),
        definition.edges.len()
    );

    Ok(definition)
}

/// Loads a tool catalog: a list of tool definitions.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<ToolCatalog> {
    let path = path.as_ref();
    info!("Loading tool catalog from: {}", path.display());

    let content = read_file(path, "catalog")?;
    let tools: Vec<ToolDefinition> = parse_document(
        &content,
        DocumentFormat::from_path(path),
        &path.display().to_string(),
    )?;

    let catalog = ToolCatalog::from_tools(tools)?;
    info!("Catalog contains {} tools", catalog.len());
    Ok(catalog)
}

/// Saves a workflow definition as YAML.
pub fn save_definition(definition: &WorkflowDefinition, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = match DocumentFormat::from_path(path) {
        DocumentFormat::Yaml => serde_yaml::to_string(definition)?,
        DocumentFormat::Json => serde_json::to_string_pretty(definition).map_err(|e| {
            ExportError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?,
    };
    fs::write(path, content)?;
    info!("Workflow saved to: {}", path.display());
    Ok(())
}

/// Writes an export result into `dir` under its suggested file name.
pub fn write_export(result: &ExportResult, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(&result.suggested_filename);
    fs::write(&path, &result.content)?;
    info!("Wrote {} export to: {}", result.format, path.display());

    Ok(path)
}

//! Tool Catalog
//!
//! Read-only registry mapping tool identifiers to their port specifications
//! and command templates, plus the resolution pass that turns the loose
//! `tool_id` strings of a [`WorkflowDefinition`] into shared
//! [`ToolDefinition`] references.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, error, info};
use once_cell::sync::Lazy;

use super::model::{
    Node, NodeDefinitionKind, NodeKind, PortSpec, ToolDefinition, WorkflowDefinition,
    WorkflowGraph,
};
use super::validator::is_port_key;
use crate::error::{ExportError, Result};

/// Tools shipped with the exporter.
pub static BUILTIN_CATALOG: Lazy<ToolCatalog> = Lazy::new(|| {
    let mut catalog = ToolCatalog::new();
    for tool in builtin_tools() {
        // Builtin ids are distinct and their keys are identifiers
        if let Err(e) = catalog.register(tool) {
            error!("Skipping builtin tool: {}", e);
        }
    }
    catalog
});

fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "fastqc",
            "FastQC",
            "fastqc {reads} --outdir . && mv *_fastqc.html {report}",
        )
        .with_category("Quality control")
        .with_input(PortSpec::required("reads", "fastq"))
        .with_output(PortSpec::required("report", "html")),
        ToolDefinition::new(
            "cutadapt",
            "Cutadapt",
            "cutadapt -a file:{adapters} -o {trimmed} {reads}",
        )
        .with_category("Preprocessing")
        .with_input(PortSpec::required("reads", "fastq"))
        .with_input(PortSpec::optional("adapters", "fasta"))
        .with_output(PortSpec::required("trimmed", "fastq")),
        ToolDefinition::new("bwa_mem", "BWA-MEM", "bwa mem {reference} {reads} > {alignment}")
            .with_category("Alignment")
            .with_input(PortSpec::required("reference", "fasta"))
            .with_input(PortSpec::required("reads", "fastq"))
            .with_output(PortSpec::required("alignment", "sam")),
        ToolDefinition::new(
            "samtools_sort",
            "samtools sort",
            "samtools sort -o {sorted} {alignment}",
        )
        .with_category("Alignment")
        .with_input(PortSpec::required("alignment", "sam"))
        .with_output(PortSpec::required("sorted", "bam")),
        ToolDefinition::new("samtools_index", "samtools index", "samtools index {bam} {index}")
            .with_category("Alignment")
            .with_input(PortSpec::required("bam", "bam"))
            .with_output(PortSpec::required("index", "bai")),
        ToolDefinition::new("multiqc", "MultiQC", "multiqc {qc_report} --filename {summary}")
            .with_category("Reporting")
            .with_input(PortSpec::required("qc_report", "html"))
            .with_output(PortSpec::required("summary", "html")),
    ]
}

/// Registry of tool definitions keyed by tool id.
///
/// Treated as immutable while an export is running; definitions are shared
/// with resolved graphs through `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, Arc<ToolDefinition>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the built-in catalog.
    pub fn builtin() -> Self {
        BUILTIN_CATALOG.clone()
    }

    /// Builds a catalog from a list, rejecting duplicates and bad port keys.
    ///
    /// Port keys must be identifiers and must not be reserved words in any
    /// of the emitted languages.
    pub fn from_tools(tools: Vec<ToolDefinition>) -> Result<Self> {
        let mut catalog = Self::new();
        for tool in tools {
            catalog.register(tool)?;
        }
        Ok(catalog)
    }

    /// Adds a tool to the catalog.
    pub fn register(&mut self, tool: ToolDefinition) -> Result<()> {
        if self.tools.contains_key(&tool.tool_id) {
            return Err(ExportError::DuplicateTool(tool.tool_id));
        }

        if let Some(port) = tool
            .inputs
            .iter()
            .chain(tool.outputs.iter())
            .find(|p| !is_port_key(&p.key))
        {
            return Err(ExportError::InvalidToolPort {
                tool_id: tool.tool_id.clone(),
                port_key: port.key.clone(),
            });
        }

        debug!("Registered tool '{}' ({})", tool.tool_id, tool.name);
        self.tools.insert(tool.tool_id.clone(), Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, tool_id: &str) -> Option<&Arc<ToolDefinition>> {
        self.tools.get(tool_id)
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.tools.contains_key(tool_id)
    }

    /// Tool ids in ascending order.
    pub fn tool_ids(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolves every tool node of `definition` against this catalog.
    ///
    /// Fails on the first tool id absent from the catalog; that is a caller
    /// defect rather than a graph problem the user can fix.
    pub fn resolve(&self, definition: &WorkflowDefinition) -> Result<WorkflowGraph> {
        let mut nodes = Vec::with_capacity(definition.nodes.len());

        for node in &definition.nodes {
            let kind = match &node.kind {
                NodeDefinitionKind::Input {
                    port_key,
                    data_type,
                } => NodeKind::Input {
                    port_key: port_key.clone(),
                    data_type: data_type.clone(),
                },
                NodeDefinitionKind::Tool { tool_id } => {
                    let tool = self.get(tool_id).ok_or_else(|| ExportError::CatalogLookup {
                        node_id: node.id,
                        tool_id: tool_id.clone(),
                    })?;
                    NodeKind::Tool {
                        tool: Arc::clone(tool),
                    }
                }
                NodeDefinitionKind::Output {
                    port_key,
                    data_type,
                } => NodeKind::Output {
                    port_key: port_key.clone(),
                    data_type: data_type.clone(),
                },
            };

            nodes.push(Node {
                id: node.id,
                label: node.label.clone(),
                kind,
            });
        }

        info!(
            "Resolved workflow '{}': {} nodes, {} edges",
            definition.metadata.name,
            nodes.len(),
            definition.edges.len()
        );

        Ok(WorkflowGraph {
            metadata: definition.metadata.clone(),
            nodes,
            edges: definition.edges.clone(),
        })
    }
}

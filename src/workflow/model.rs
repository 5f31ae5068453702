//! Workflow Graph Model
//!
//! Core data structures describing a user-authored pipeline graph: data
//! sources, analysis tools, outputs and the edges wiring their ports.
//!
//! Graphs arrive in two shapes:
//!
//! - [`WorkflowDefinition`]: what the editor or a saved file supplies. Tool
//!   nodes carry only a `tool_id` string.
//! - [`WorkflowGraph`]: the same graph after catalog resolution, where every
//!   tool node holds a shared reference to its [`ToolDefinition`].
//!
//! # Example YAML Format
//!
//! ```yaml
//! metadata:
//!   name: qc-pipeline
//!   version: 1.0.0
//!   author: Jane Doe
//! nodes:
//!   - id: 1
//!     type: input
//!     port_key: reads
//!     data_type: fastq
//!   - id: 2
//!     type: tool
//!     tool_id: fastqc
//!     label: Quality control
//!   - id: 3
//!     type: output
//!     port_key: report
//!     data_type: html
//! edges:
//!   - id: e1
//!     source_node_id: 1
//!     source_port_key: reads
//!     target_node_id: 2
//!     target_port_key: reads
//!   - id: e2
//!     source_node_id: 2
//!     source_port_key: report
//!     target_node_id: 3
//!     target_port_key: report
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Graph-unique node identifier.
///
/// Ids are assigned by the editor in creation order, so ordering by id is
/// ordering by creation time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A named input or output slot on a tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub key: String,

    /// Free-form data type (e.g. "fastq", "bam", "int")
    pub data_type: String,

    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl PortSpec {
    /// Creates a port that must be connected.
    pub fn required(key: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            key: key.into().trim().to_string(),
            data_type: data_type.into().trim().to_string(),
            required: true,
        }
    }

    /// Creates a port that may be left unconnected.
    pub fn optional(key: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(key, data_type)
        }
    }

    pub fn kind(&self) -> DataKind {
        DataKind::from_data_type(&self.data_type)
    }
}

/// How a data type is carried by the target languages.
///
/// Everything that is not a recognised scalar or directory is a file, and
/// the data type itself doubles as the file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataKind {
    File { extension: Option<String> },
    Directory,
    String,
    Int,
    Float,
    Boolean,
}

impl DataKind {
    pub fn from_data_type(data_type: &str) -> Self {
        let normalized = data_type.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" | "str" | "text" => Self::String,
            "int" | "integer" | "long" => Self::Int,
            "float" | "double" | "number" => Self::Float,
            "bool" | "boolean" => Self::Boolean,
            "directory" | "dir" | "folder" => Self::Directory,
            "" | "file" | "any" => Self::File { extension: None },
            other => {
                let extension: String = other
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
                    .collect();
                let extension = extension.trim_matches('.').to_string();
                Self::File {
                    extension: (!extension.is_empty()).then_some(extension),
                }
            }
        }
    }

    /// Returns true for scalar values passed as parameters rather than files.
    pub fn is_value(&self) -> bool {
        matches!(self, Self::String | Self::Int | Self::Float | Self::Boolean)
    }

    /// File name used when a port of this kind is materialised on disk.
    pub fn file_name(&self, key: &str) -> String {
        match self {
            Self::File {
                extension: Some(ext),
            } => format!("{}.{}", key, ext),
            Self::File { extension: None } | Self::Directory => key.to_string(),
            _ => format!("{}.txt", key),
        }
    }
}

/// A catalog entry describing an analysis tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub tool_id: String,

    /// Human-readable name (e.g. "FastQC")
    pub name: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub inputs: Vec<PortSpec>,

    #[serde(default)]
    pub outputs: Vec<PortSpec>,

    /// Command template with `{port_key}` placeholders for inputs and outputs
    pub command_template: String,
}

impl ToolDefinition {
    /// Creates a tool with no ports.
    ///
    /// # Example
    ///
    /// ```
    /// use pipewright::workflow::{PortSpec, ToolDefinition};
    ///
    /// let tool = ToolDefinition::new("fastqc", "FastQC", "fastqc {reads} -o {report}")
    ///     .with_category("Quality control")
    ///     .with_input(PortSpec::required("reads", "fastq"))
    ///     .with_output(PortSpec::required("report", "html"));
    ///
    /// assert_eq!(tool.inputs.len(), 1);
    /// ```
    pub fn new(
        tool_id: impl Into<String>,
        name: impl Into<String>,
        command_template: impl Into<String>,
    ) -> Self {
        Self {
            tool_id: tool_id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            category: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            command_template: command_template.into().trim().to_string(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn input(&self, key: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.key == key)
    }

    pub fn output(&self, key: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.key == key)
    }
}

/// Descriptive workflow metadata carried into every exported file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkflowMetadata {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub author: String,
}

fn default_name() -> String {
    "workflow".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl WorkflowMetadata {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            author: author.into(),
        }
    }
}

impl Default for WorkflowMetadata {
    fn default() -> Self {
        Self::new(default_name(), default_version(), "")
    }
}

/// Directed connection from a source node's output port to a target
/// node's input port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: String,
    pub source_node_id: NodeId,
    pub source_port_key: String,
    pub target_node_id: NodeId,
    pub target_port_key: String,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<NodeId>,
        source_port: impl Into<String>,
        target: impl Into<NodeId>,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source.into(),
            source_port_key: source_port.into(),
            target_node_id: target.into(),
            target_port_key: target_port.into(),
        }
    }
}

/// Node payload before catalog resolution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDefinitionKind {
    Input { port_key: String, data_type: String },
    Tool { tool_id: String },
    Output { port_key: String, data_type: String },
}

/// A node as supplied by the editor or a stored workflow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NodeDefinition {
    pub id: NodeId,

    /// Display label; never used to derive identifiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(flatten)]
    pub kind: NodeDefinitionKind,
}

impl NodeDefinition {
    pub fn input(
        id: impl Into<NodeId>,
        port_key: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: None,
            kind: NodeDefinitionKind::Input {
                port_key: port_key.into(),
                data_type: data_type.into(),
            },
        }
    }

    pub fn tool(id: impl Into<NodeId>, tool_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            kind: NodeDefinitionKind::Tool {
                tool_id: tool_id.into(),
            },
        }
    }

    pub fn output(
        id: impl Into<NodeId>,
        port_key: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: None,
            kind: NodeDefinitionKind::Output {
                port_key: port_key.into(),
                data_type: data_type.into(),
            },
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Unresolved workflow snapshot handed over by the editor or loaded from disk.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub metadata: WorkflowMetadata,

    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl WorkflowDefinition {
    pub fn new(metadata: WorkflowMetadata) -> Self {
        Self {
            metadata,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: NodeDefinition) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Convenience for wiring `source.port -> target.port` with a fresh edge id.
    pub fn connect(
        self,
        source: impl Into<NodeId>,
        source_port: impl Into<String>,
        target: impl Into<NodeId>,
        target_port: impl Into<String>,
    ) -> Self {
        let id = format!("e{}", self.edges.len() + 1);
        self.with_edge(Edge::new(id, source, source_port, target, target_port))
    }
}

/// Node payload after catalog resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Input { port_key: String, data_type: String },
    Tool { tool: Arc<ToolDefinition> },
    Output { port_key: String, data_type: String },
}

/// A resolved graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub label: Option<String>,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_input(&self) -> bool {
        matches!(self.kind, NodeKind::Input { .. })
    }

    pub fn is_tool(&self) -> bool {
        matches!(self.kind, NodeKind::Tool { .. })
    }

    pub fn is_output(&self) -> bool {
        matches!(self.kind, NodeKind::Output { .. })
    }

    pub fn tool(&self) -> Option<&Arc<ToolDefinition>> {
        match &self.kind {
            NodeKind::Tool { tool } => Some(tool),
            _ => None,
        }
    }

    /// Ports that may receive an edge.
    ///
    /// An Output node exposes one required port named by its `port_key`.
    pub fn input_ports(&self) -> Vec<PortSpec> {
        match &self.kind {
            NodeKind::Input { .. } => Vec::new(),
            NodeKind::Tool { tool } => tool.inputs.clone(),
            NodeKind::Output {
                port_key,
                data_type,
            } => vec![PortSpec::required(port_key.as_str(), data_type.as_str())],
        }
    }

    /// Ports that may emit an edge.
    ///
    /// An Input node exposes one port named by its `port_key`.
    pub fn output_ports(&self) -> Vec<PortSpec> {
        match &self.kind {
            NodeKind::Input {
                port_key,
                data_type,
            } => vec![PortSpec::required(port_key.as_str(), data_type.as_str())],
            NodeKind::Tool { tool } => tool.outputs.clone(),
            NodeKind::Output { .. } => Vec::new(),
        }
    }

    pub fn input_port(&self, key: &str) -> Option<PortSpec> {
        self.input_ports().into_iter().find(|p| p.key == key)
    }

    pub fn output_port(&self, key: &str) -> Option<PortSpec> {
        self.output_ports().into_iter().find(|p| p.key == key)
    }

    /// Short description used in log messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            NodeKind::Input { port_key, .. } => format!("input '{}' (node {})", port_key, self.id),
            NodeKind::Tool { tool } => format!("tool '{}' (node {})", tool.tool_id, self.id),
            NodeKind::Output { port_key, .. } => {
                format!("output '{}' (node {})", port_key, self.id)
            }
        }
    }
}

/// A workflow whose tool nodes have been resolved against a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGraph {
    pub metadata: WorkflowMetadata,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl WorkflowGraph {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn incoming_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.target_node_id == id)
    }

    pub fn outgoing_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source_node_id == id)
    }

    /// Returns the single edge feeding `port_key` on node `id`, if any.
    pub fn producer_of(&self, id: NodeId, port_key: &str) -> Option<&Edge> {
        self.incoming_edges(id).find(|e| e.target_port_key == port_key)
    }

    pub fn tool_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_tool()).count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

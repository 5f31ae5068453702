//! Workflow Validation
//!
//! Structural and data-flow checks over a resolved [`WorkflowGraph`]:
//! - Id uniqueness and edge reference integrity
//! - Workflow interface port keys (Input/Output nodes)
//! - Port arity (one producer per port, required ports bound)
//! - Cycle detection with full cycle paths
//! - Reachability (inputs and outputs actually touch a tool)
//!
//! Every check runs regardless of what the others found, so callers get the
//! complete list of problems in one pass.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use super::model::{NodeId, NodeKind, WorkflowGraph};

/// Prefix reserved for generated step symbols.
pub const RESERVED_PREFIX: &str = "step_";

/// Names that cannot be port keys because an emitted document uses them as
/// bare names: Python keywords (Snakemake), Groovy keywords and Nextflow
/// process/script implicits.
pub const RESERVED_WORDS: &[&str] = &[
    "False", "None", "True", "abstract", "and", "as", "assert", "async", "await", "boolean",
    "break", "byte", "case", "catch", "char", "class", "const", "continue", "def", "default",
    "del", "do", "double", "elif", "else", "enum", "except", "extends", "false", "final",
    "finally", "float", "for", "from", "global", "goto", "if", "implements", "import", "in",
    "input", "instanceof", "int", "interface", "is", "lambda", "long", "native", "new",
    "nonlocal", "not", "null", "or", "output", "package", "params", "pass", "private",
    "process", "protected", "public", "raise", "return", "short", "static", "strictfp", "super",
    "switch", "synchronized", "task", "this", "threadsafe", "throw", "throws", "trait",
    "transient", "true", "try", "var", "void", "volatile", "while", "with", "workflow", "yield",
];

/// Broad class of a validation problem.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Dangling references, cycles, disconnected graphs
    Structural,
    /// Missing or duplicated producers on a port
    PortBinding,
}

/// A user-correctable problem in a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Node id {node_id} is used by more than one node")]
    DuplicateNodeId { node_id: NodeId },

    #[error("Edge id '{edge_id}' is used by more than one edge")]
    DuplicateEdgeId { edge_id: String },

    #[error("Edge '{edge_id}' references unknown node {node_id}")]
    UnknownNode { edge_id: String, node_id: NodeId },

    #[error("Edge '{edge_id}' references unknown port '{port_key}' on node {node_id}")]
    UnknownPort {
        edge_id: String,
        node_id: NodeId,
        port_key: String,
    },

    #[error("Input node {node_id} cannot receive edge '{edge_id}'")]
    InputHasIncomingEdge { edge_id: String, node_id: NodeId },

    #[error("Output node {node_id} cannot emit edge '{edge_id}'")]
    OutputHasOutgoingEdge { edge_id: String, node_id: NodeId },

    #[error("Workflow contains a cycle: {}", format_path(.path))]
    Cycle { path: Vec<NodeId> },

    #[error("Workflow has no input node")]
    NoInputNode,

    #[error("Workflow has no output node")]
    NoOutputNode,

    #[error("Workflow has no tool node")]
    NoToolNode,

    #[error("No input node is connected to a tool")]
    InputsNotConnected { node_ids: Vec<NodeId> },

    #[error("No output node is fed by a tool")]
    OutputsNotConnected { node_ids: Vec<NodeId> },

    #[error("Workflow port key '{port_key}' is used by more than one input/output node")]
    DuplicatePortKey {
        port_key: String,
        node_ids: Vec<NodeId>,
    },

    #[error(
        "Workflow port key '{port_key}' on node {node_id} must be an identifier \
         that is not a reserved word and does not start with 'step_'"
    )]
    InvalidPortKey { node_id: NodeId, port_key: String },

    #[error("Port '{port_key}' on node {node_id} has {} producers", .edge_ids.len())]
    DuplicateProducer {
        node_id: NodeId,
        port_key: String,
        edge_ids: Vec<String>,
    },

    #[error("Required input '{port_key}' on node {node_id} is not connected")]
    MissingRequiredInput { node_id: NodeId, port_key: String },
}

fn format_path(path: &[NodeId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl ValidationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicateProducer { .. } | Self::MissingRequiredInput { .. } => {
                ErrorCategory::PortBinding
            }
            _ => ErrorCategory::Structural,
        }
    }

    /// Stable machine-readable name of the problem.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateNodeId { .. } => "duplicate_node_id",
            Self::DuplicateEdgeId { .. } => "duplicate_edge_id",
            Self::UnknownNode { .. } => "unknown_node",
            Self::UnknownPort { .. } => "unknown_port",
            Self::InputHasIncomingEdge { .. } => "input_has_incoming_edge",
            Self::OutputHasOutgoingEdge { .. } => "output_has_outgoing_edge",
            Self::Cycle { .. } => "cycle",
            Self::NoInputNode => "no_input_node",
            Self::NoOutputNode => "no_output_node",
            Self::NoToolNode => "no_tool_node",
            Self::InputsNotConnected { .. } => "inputs_not_connected",
            Self::OutputsNotConnected { .. } => "outputs_not_connected",
            Self::DuplicatePortKey { .. } => "duplicate_port_key",
            Self::InvalidPortKey { .. } => "invalid_port_key",
            Self::DuplicateProducer { .. } => "duplicate_producer",
            Self::MissingRequiredInput { .. } => "missing_required_input",
        }
    }

    /// Nodes to highlight for this problem.
    pub fn node_ids(&self) -> Vec<NodeId> {
        match self {
            Self::DuplicateNodeId { node_id }
            | Self::UnknownNode { node_id, .. }
            | Self::UnknownPort { node_id, .. }
            | Self::InputHasIncomingEdge { node_id, .. }
            | Self::OutputHasOutgoingEdge { node_id, .. }
            | Self::InvalidPortKey { node_id, .. }
            | Self::DuplicateProducer { node_id, .. }
            | Self::MissingRequiredInput { node_id, .. } => vec![*node_id],
            Self::Cycle { path } => {
                let unique: BTreeSet<NodeId> = path.iter().copied().collect();
                unique.into_iter().collect()
            }
            Self::InputsNotConnected { node_ids }
            | Self::OutputsNotConnected { node_ids }
            | Self::DuplicatePortKey { node_ids, .. } => node_ids.clone(),
            Self::DuplicateEdgeId { .. }
            | Self::NoInputNode
            | Self::NoOutputNode
            | Self::NoToolNode => Vec::new(),
        }
    }

    /// Edges to highlight for this problem.
    pub fn edge_ids(&self) -> Vec<String> {
        match self {
            Self::DuplicateEdgeId { edge_id }
            | Self::UnknownNode { edge_id, .. }
            | Self::UnknownPort { edge_id, .. }
            | Self::InputHasIncomingEdge { edge_id, .. }
            | Self::OutputHasOutgoingEdge { edge_id, .. } => vec![edge_id.clone()],
            Self::DuplicateProducer { edge_ids, .. } => edge_ids.clone(),
            _ => Vec::new(),
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        Diagnostic {
            kind: self.kind().to_string(),
            category: self.category(),
            node_ids: self.node_ids(),
            edge_ids: self.edge_ids(),
            message: self.to_string(),
        }
    }
}

/// Flat record of a validation problem, suitable for UI highlighting.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: String,
    pub category: ErrorCategory,
    pub node_ids: Vec<NodeId>,
    pub edge_ids: Vec<String>,
    pub message: String,
}

/// A graph that passed every check in [`validate`].
///
/// Only `validate` can construct one, so downstream stages never see an
/// invalid graph.
#[derive(Debug, Clone)]
pub struct ValidatedGraph {
    graph: WorkflowGraph,
}

impl ValidatedGraph {
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn into_inner(self) -> WorkflowGraph {
        self.graph
    }
}

/// Returns true for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns true if `value` is a keyword in one of the emitted languages.
pub fn is_reserved_word(value: &str) -> bool {
    RESERVED_WORDS.contains(&value)
}

/// Returns true if `value` can be emitted as a bare name in every format.
pub fn is_port_key(value: &str) -> bool {
    is_identifier(value) && !is_reserved_word(value)
}

/// Validates the entire workflow graph.
///
/// Performs the following checks, collecting every violation:
/// 1. Node and edge ids are unique
/// 2. Every edge resolves to existing nodes and ports
/// 3. Input/Output port keys are unique identifiers
/// 4. No port has two producers; required ports have one
/// 5. No cycles
/// 6. Inputs and outputs are connected to at least one tool
pub fn validate(graph: WorkflowGraph) -> Result<ValidatedGraph, Vec<ValidationError>> {
    info!(
        "Validating workflow '{}' with {} nodes, {} edges",
        graph.metadata.name,
        graph.nodes.len(),
        graph.edges.len()
    );

    let mut errors = Vec::new();

    check_unique_ids(&graph, &mut errors);
    check_edge_references(&graph, &mut errors);
    check_interface_ports(&graph, &mut errors);
    check_port_arity(&graph, &mut errors);
    check_cycles(&graph, &mut errors);
    check_reachability(&graph, &mut errors);

    if !errors.is_empty() {
        for error in &errors {
            debug!("Validation problem [{}]: {}", error.kind(), error);
        }
        info!("Workflow rejected with {} problem(s)", errors.len());
        return Err(errors);
    }

    for node in graph.nodes.iter().filter(|n| n.is_input()) {
        if graph.outgoing_edges(node.id).next().is_none() {
            warn!("{} is not connected to anything", node.describe());
        }
    }

    info!(
        "Workflow validated: {} nodes, {} tools",
        graph.nodes.len(),
        graph.tool_count()
    );
    Ok(ValidatedGraph { graph })
}

fn check_unique_ids(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id) {
            duplicates.insert(node.id);
        }
    }
    errors.extend(
        duplicates
            .into_iter()
            .map(|node_id| ValidationError::DuplicateNodeId { node_id }),
    );

    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for edge in &graph.edges {
        if !seen.insert(edge.id.as_str()) {
            duplicates.insert(edge.id.as_str());
        }
    }
    errors.extend(duplicates.into_iter().map(|edge_id| ValidationError::DuplicateEdgeId {
        edge_id: edge_id.to_string(),
    }));
}

fn check_edge_references(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    for edge in &graph.edges {
        let source = graph.node(edge.source_node_id);
        let target = graph.node(edge.target_node_id);

        let source_port = match source {
            None => {
                errors.push(ValidationError::UnknownNode {
                    edge_id: edge.id.clone(),
                    node_id: edge.source_node_id,
                });
                None
            }
            Some(node) if node.is_output() => {
                errors.push(ValidationError::OutputHasOutgoingEdge {
                    edge_id: edge.id.clone(),
                    node_id: node.id,
                });
                None
            }
            Some(node) => {
                let port = node.output_port(&edge.source_port_key);
                if port.is_none() {
                    errors.push(ValidationError::UnknownPort {
                        edge_id: edge.id.clone(),
                        node_id: node.id,
                        port_key: edge.source_port_key.clone(),
                    });
                }
                port
            }
        };

        let target_port = match target {
            None => {
                errors.push(ValidationError::UnknownNode {
                    edge_id: edge.id.clone(),
                    node_id: edge.target_node_id,
                });
                None
            }
            Some(node) if node.is_input() => {
                errors.push(ValidationError::InputHasIncomingEdge {
                    edge_id: edge.id.clone(),
                    node_id: node.id,
                });
                None
            }
            Some(node) => {
                let port = node.input_port(&edge.target_port_key);
                if port.is_none() {
                    errors.push(ValidationError::UnknownPort {
                        edge_id: edge.id.clone(),
                        node_id: node.id,
                        port_key: edge.target_port_key.clone(),
                    });
                }
                port
            }
        };

        if let (Some(from), Some(to)) = (source_port, target_port) {
            if !from.data_type.eq_ignore_ascii_case(&to.data_type) {
                warn!(
                    "Edge '{}' connects {} output to {} input",
                    edge.id, from.data_type, to.data_type
                );
            }
        }
    }
}

fn check_interface_ports(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    let mut owners: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();

    for node in &graph.nodes {
        let port_key = match &node.kind {
            NodeKind::Input { port_key, .. } | NodeKind::Output { port_key, .. } => port_key,
            NodeKind::Tool { .. } => continue,
        };

        if !is_port_key(port_key) || port_key.starts_with(RESERVED_PREFIX) {
            errors.push(ValidationError::InvalidPortKey {
                node_id: node.id,
                port_key: port_key.clone(),
            });
        }

        owners.entry(port_key.as_str()).or_default().push(node.id);
    }

    for (port_key, mut node_ids) in owners {
        if node_ids.len() > 1 {
            node_ids.sort();
            errors.push(ValidationError::DuplicatePortKey {
                port_key: port_key.to_string(),
                node_ids,
            });
        }
    }
}

fn check_port_arity(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    // (target node, target port) -> edge ids, only for ports that exist
    let mut producers: BTreeMap<(NodeId, &str), Vec<String>> = BTreeMap::new();

    for edge in &graph.edges {
        let Some(target) = graph.node(edge.target_node_id) else {
            continue;
        };
        if target.input_port(&edge.target_port_key).is_none() {
            continue;
        }
        producers
            .entry((edge.target_node_id, edge.target_port_key.as_str()))
            .or_default()
            .push(edge.id.clone());
    }

    for (&(node_id, port_key), edge_ids) in producers.iter().filter(|(_, ids)| ids.len() > 1) {
        let mut edge_ids = edge_ids.clone();
        edge_ids.sort();
        errors.push(ValidationError::DuplicateProducer {
            node_id,
            port_key: port_key.to_string(),
            edge_ids,
        });
    }

    let mut nodes: Vec<_> = graph.nodes.iter().collect();
    nodes.sort_by_key(|n| n.id);
    nodes.dedup_by_key(|n| n.id);

    for node in nodes {
        for port in node.input_ports().iter().filter(|p| p.required) {
            if !producers.contains_key(&(node.id, port.key.as_str())) {
                errors.push(ValidationError::MissingRequiredInput {
                    node_id: node.id,
                    port_key: port.key.clone(),
                });
            }
        }
    }
}

/// DFS marking state.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not visited yet
    White,
    /// On the current DFS path
    Gray,
    /// Fully explored
    Black,
}

/// Detects cycles with a three-color DFS, reporting each back edge with the
/// full path of the cycle it closes.
fn check_cycles(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    let mut successors: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for node in &graph.nodes {
        successors.entry(node.id).or_default();
    }
    for edge in &graph.edges {
        if successors.contains_key(&edge.target_node_id) {
            if let Some(next) = successors.get_mut(&edge.source_node_id) {
                next.insert(edge.target_node_id);
            }
        }
    }

    let mut colors: BTreeMap<NodeId, Color> =
        successors.keys().map(|&id| (id, Color::White)).collect();

    for &root in successors.keys() {
        if colors.get(&root) == Some(&Color::White) {
            visit(root, &successors, &mut colors, errors);
        }
    }
}

/// Explores everything reachable from `root` without recursion.
///
/// Each stack frame holds a node and the successors it has yet to look at;
/// the frames on the stack are exactly the gray path from `root`.
fn visit(
    root: NodeId,
    successors: &BTreeMap<NodeId, BTreeSet<NodeId>>,
    colors: &mut BTreeMap<NodeId, Color>,
    errors: &mut Vec<ValidationError>,
) {
    let empty = BTreeSet::new();
    let children = |id: NodeId| successors.get(&id).unwrap_or(&empty).iter();

    colors.insert(root, Color::Gray);
    let mut stack = vec![(root, children(root))];

    while let Some((node, pending)) = stack.last_mut() {
        let node = *node;
        let Some(&successor) = pending.next() else {
            colors.insert(node, Color::Black);
            stack.pop();
            continue;
        };

        match colors.get(&successor).copied() {
            Some(Color::White) => {
                colors.insert(successor, Color::Gray);
                stack.push((successor, children(successor)));
            }
            Some(Color::Gray) => {
                // Back edge: the cycle runs from `successor` down to `node`
                let start = stack.iter().position(|(id, _)| *id == successor).unwrap_or(0);
                let mut cycle: Vec<NodeId> = stack[start..].iter().map(|(id, _)| *id).collect();
                cycle.push(successor);
                errors.push(ValidationError::Cycle { path: cycle });
            }
            _ => {}
        }
    }
}

fn check_reachability(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    let inputs: Vec<NodeId> = graph.nodes.iter().filter(|n| n.is_input()).map(|n| n.id).collect();
    let outputs: Vec<NodeId> = graph.nodes.iter().filter(|n| n.is_output()).map(|n| n.id).collect();
    let tool_count = graph.tool_count();

    if inputs.is_empty() {
        errors.push(ValidationError::NoInputNode);
    }
    if outputs.is_empty() {
        errors.push(ValidationError::NoOutputNode);
    }
    if tool_count == 0 {
        errors.push(ValidationError::NoToolNode);
        return;
    }

    let is_tool = |id: NodeId| graph.node(id).is_some_and(|n| n.is_tool());

    let input_feeds_tool = inputs
        .iter()
        .any(|&id| graph.outgoing_edges(id).any(|e| is_tool(e.target_node_id)));
    if !inputs.is_empty() && !input_feeds_tool {
        let mut node_ids = inputs.clone();
        node_ids.sort();
        errors.push(ValidationError::InputsNotConnected { node_ids });
    }

    let tool_feeds_output = outputs
        .iter()
        .any(|&id| graph.incoming_edges(id).any(|e| is_tool(e.source_node_id)));
    if !outputs.is_empty() && !tool_feeds_output {
        let mut node_ids = outputs.clone();
        node_ids.sort();
        errors.push(ValidationError::OutputsNotConnected { node_ids });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::catalog::ToolCatalog;
    use crate::workflow::model::{NodeDefinition, WorkflowDefinition};

    fn resolve(definition: WorkflowDefinition) -> WorkflowGraph {
        ToolCatalog::builtin().resolve(&definition).unwrap()
    }

    fn minimal_chain() -> WorkflowDefinition {
        WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "reads", "fastq"))
            .with_node(NodeDefinition::tool(2, "fastqc"))
            .with_node(NodeDefinition::output(3, "report", "html"))
            .connect(1, "reads", 2, "reads")
            .connect(2, "report", 3, "report")
    }

    fn errors_of(definition: WorkflowDefinition) -> Vec<ValidationError> {
        validate(resolve(definition)).unwrap_err()
    }

    #[test]
    fn test_valid_minimal_chain() {
        let validated = validate(resolve(minimal_chain())).unwrap();
        assert_eq!(validated.graph().len(), 3);
    }

    #[test]
    fn test_cycle_between_tools() {
        // A -> B -> A using samtools_sort (sam -> bam) and a tool fed by bam
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::tool(10, "samtools_sort"))
            .with_node(NodeDefinition::tool(11, "samtools_sort"))
            .connect(10, "sorted", 11, "alignment")
            .connect(11, "sorted", 10, "alignment");

        let errors = errors_of(definition);
        let cycle = errors
            .iter()
            .find(|e| matches!(e, ValidationError::Cycle { .. }))
            .expect("cycle should be reported");

        assert_eq!(cycle.category(), ErrorCategory::Structural);
        assert_eq!(cycle.node_ids(), vec![NodeId(10), NodeId(11)]);
        match cycle {
            ValidationError::Cycle { path } => {
                assert_eq!(path, &vec![NodeId(10), NodeId(11), NodeId(10)]);
            }
            _ => unreachable!(),
        }
        assert!(cycle.to_string().contains("10 -> 11 -> 10"));
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let definition = minimal_chain()
            .with_node(NodeDefinition::tool(4, "samtools_sort"))
            .connect(4, "sorted", 4, "alignment");

        let errors = errors_of(definition);
        assert!(errors.contains(&ValidationError::Cycle {
            path: vec![NodeId(4), NodeId(4)]
        }));
    }

    #[test]
    fn test_missing_required_input() {
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "reads", "fastq"))
            .with_node(NodeDefinition::tool(2, "bwa_mem"))
            .with_node(NodeDefinition::output(3, "alignment", "sam"))
            .connect(1, "reads", 2, "reads")
            .connect(2, "alignment", 3, "alignment");

        let errors = errors_of(definition);
        assert_eq!(
            errors,
            vec![ValidationError::MissingRequiredInput {
                node_id: NodeId(2),
                port_key: "reference".to_string(),
            }]
        );
        assert_eq!(errors[0].category(), ErrorCategory::PortBinding);
    }

    #[test]
    fn test_optional_input_may_be_unbound() {
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "reads", "fastq"))
            .with_node(NodeDefinition::tool(2, "cutadapt"))
            .with_node(NodeDefinition::output(3, "trimmed", "fastq"))
            .connect(1, "reads", 2, "reads")
            .connect(2, "trimmed", 3, "trimmed");

        assert!(validate(resolve(definition)).is_ok());
    }

    #[test]
    fn test_duplicate_producer() {
        let definition = minimal_chain()
            .with_node(NodeDefinition::input(4, "more_reads", "fastq"))
            .connect(4, "more_reads", 2, "reads");

        let errors = errors_of(definition);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateProducer {
                node_id: NodeId(2),
                port_key: "reads".to_string(),
                edge_ids: vec!["e1".to_string(), "e3".to_string()],
            }]
        );
        assert_eq!(errors[0].edge_ids().len(), 2);
    }

    #[test]
    fn test_unbound_output_node() {
        let definition = minimal_chain().with_node(NodeDefinition::output(4, "extra", "html"));

        let errors = errors_of(definition);
        assert_eq!(
            errors,
            vec![ValidationError::MissingRequiredInput {
                node_id: NodeId(4),
                port_key: "extra".to_string(),
            }]
        );
    }

    #[test]
    fn test_dangling_references() {
        let definition = minimal_chain()
            .connect(99, "reads", 2, "reads")
            .connect(1, "reads", 2, "no_such_port");

        let errors = errors_of(definition);
        assert!(errors.contains(&ValidationError::UnknownNode {
            edge_id: "e3".to_string(),
            node_id: NodeId(99),
        }));
        assert!(errors.contains(&ValidationError::UnknownPort {
            edge_id: "e4".to_string(),
            node_id: NodeId(2),
            port_key: "no_such_port".to_string(),
        }));
    }

    #[test]
    fn test_edges_into_input_and_out_of_output() {
        let definition = minimal_chain()
            .connect(2, "report", 1, "reads")
            .connect(3, "report", 2, "reads");

        let errors = errors_of(definition);
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InputHasIncomingEdge { node_id: NodeId(1), .. }
        )));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::OutputHasOutgoingEdge { node_id: NodeId(3), .. }
        )));
    }

    #[test]
    fn test_duplicate_ids() {
        let definition = minimal_chain()
            .with_node(NodeDefinition::input(1, "other", "fastq"))
            .with_edge(crate::workflow::model::Edge::new("e1", 1, "reads", 2, "reads"));

        let errors = errors_of(definition);
        assert!(errors.contains(&ValidationError::DuplicateNodeId { node_id: NodeId(1) }));
        assert!(errors.contains(&ValidationError::DuplicateEdgeId {
            edge_id: "e1".to_string()
        }));
    }

    #[test]
    fn test_interface_port_keys() {
        let definition = minimal_chain()
            .with_node(NodeDefinition::input(4, "report", "txt"))
            .with_node(NodeDefinition::input(5, "step_9", "txt"))
            .with_node(NodeDefinition::input(6, "bad key", "txt"));

        let errors = errors_of(definition);
        assert!(errors.contains(&ValidationError::DuplicatePortKey {
            port_key: "report".to_string(),
            node_ids: vec![NodeId(3), NodeId(4)],
        }));
        assert!(errors.contains(&ValidationError::InvalidPortKey {
            node_id: NodeId(5),
            port_key: "step_9".to_string(),
        }));
        assert!(errors.contains(&ValidationError::InvalidPortKey {
            node_id: NodeId(6),
            port_key: "bad key".to_string(),
        }));
    }

    #[test]
    fn test_reserved_words_rejected_as_interface_keys() {
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "class", "fastq"))
            .with_node(NodeDefinition::tool(2, "fastqc"))
            .with_node(NodeDefinition::output(3, "lambda", "html"))
            .connect(1, "class", 2, "reads")
            .connect(2, "report", 3, "lambda");

        let errors = errors_of(definition);
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidPortKey {
                    node_id: NodeId(1),
                    port_key: "class".to_string(),
                },
                ValidationError::InvalidPortKey {
                    node_id: NodeId(3),
                    port_key: "lambda".to_string(),
                },
            ]
        );
        assert!(errors[0].to_string().contains("reserved word"));
    }

    #[test]
    fn test_reserved_words() {
        for word in ["in", "for", "def", "class", "lambda", "None", "params", "task"] {
            assert!(is_reserved_word(word), "{} should be reserved", word);
            assert!(!is_port_key(word));
        }
        assert!(is_port_key("reads"));
        assert!(is_port_key("input_reads"));
        assert!(is_port_key("none"));
    }

    #[test]
    fn test_long_chain_validates() {
        let length: u64 = 5_000;
        let mut definition =
            WorkflowDefinition::default().with_node(NodeDefinition::input(0, "reads", "fastq"));
        for id in 1..=length {
            definition = definition.with_node(NodeDefinition::tool(id, "cutadapt"));
        }
        definition = definition
            .with_node(NodeDefinition::output(length + 1, "trimmed", "fastq"))
            .connect(0, "reads", 1, "reads");
        for id in 1..length {
            definition = definition.connect(id, "trimmed", id + 1, "reads");
        }
        definition = definition.connect(length, "trimmed", length + 1, "trimmed");

        let validated = validate(resolve(definition)).unwrap();
        assert_eq!(validated.graph().len(), length as usize + 2);
    }

    #[test]
    fn test_long_cycle_reports_full_path() {
        let length: u64 = 5_000;
        let mut definition = WorkflowDefinition::default();
        for id in 1..=length {
            definition = definition.with_node(NodeDefinition::tool(id, "cutadapt"));
        }
        for id in 1..length {
            definition = definition.connect(id, "trimmed", id + 1, "reads");
        }
        definition = definition.connect(length, "trimmed", 1, "reads");

        let errors = errors_of(definition);
        let path = errors
            .iter()
            .find_map(|e| match e {
                ValidationError::Cycle { path } => Some(path),
                _ => None,
            })
            .expect("cycle should be reported");
        assert_eq!(path.len(), length as usize + 1);
        assert_eq!(path.first(), Some(&NodeId(1)));
        assert_eq!(path.last(), Some(&NodeId(1)));
    }

    #[test]
    fn test_disconnected_input_output_pair_rejected() {
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "reads", "fastq"))
            .with_node(NodeDefinition::output(2, "copy", "fastq"))
            .connect(1, "reads", 2, "copy");

        let errors = errors_of(definition);
        assert_eq!(errors, vec![ValidationError::NoToolNode]);
    }

    #[test]
    fn test_tool_not_connected_to_interface() {
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "reads", "fastq"))
            .with_node(NodeDefinition::output(2, "copy", "fastq"))
            .with_node(NodeDefinition::input(3, "alignment", "sam"))
            .with_node(NodeDefinition::tool(4, "samtools_sort"))
            .connect(1, "reads", 2, "copy")
            .connect(3, "alignment", 4, "alignment");

        let errors = errors_of(definition);
        assert_eq!(
            errors,
            vec![ValidationError::OutputsNotConnected {
                node_ids: vec![NodeId(2)]
            }]
        );
    }

    #[test]
    fn test_empty_graph_reports_everything_missing() {
        let errors = errors_of(WorkflowDefinition::default());
        assert_eq!(
            errors,
            vec![
                ValidationError::NoInputNode,
                ValidationError::NoOutputNode,
                ValidationError::NoToolNode,
            ]
        );
    }

    #[test]
    fn test_errors_are_collected_not_fail_fast() {
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::tool(1, "bwa_mem"))
            .connect(7, "x", 1, "reads");

        let errors = errors_of(definition);
        let kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        assert!(kinds.contains(&"unknown_node"));
        assert!(kinds.contains(&"missing_required_input"));
        assert!(kinds.contains(&"no_input_node"));
        assert!(kinds.contains(&"no_output_node"));
    }

    #[test]
    fn test_diagnostic_record() {
        let error = ValidationError::MissingRequiredInput {
            node_id: NodeId(2),
            port_key: "reference".to_string(),
        };
        let diagnostic = error.diagnostic();
        assert_eq!(diagnostic.kind, "missing_required_input");
        assert_eq!(diagnostic.category, ErrorCategory::PortBinding);
        assert_eq!(diagnostic.node_ids, vec![NodeId(2)]);
        assert!(diagnostic.message.contains("reference"));

        let json = serde_json::to_string(&diagnostic).unwrap();
        assert!(json.contains("\"category\":\"port_binding\""));
        assert!(json.contains("\"node_ids\":[2]"));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("reads"));
        assert!(is_identifier("_r1"));
        assert!(!is_identifier("1reads"));
        assert!(!is_identifier("read-s"));
        assert!(!is_identifier(""));
    }
}

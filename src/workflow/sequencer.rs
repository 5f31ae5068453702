//! Topological Sequencer
//!
//! Orders a validated graph with Kahn's algorithm and assigns each node a
//! generated symbol (`step_<n>`). Ties between ready nodes are broken by
//! ascending [`NodeId`], never by map iteration order, so the same logical
//! graph always yields the same order regardless of how its edges were
//! inserted.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, error};

use super::model::{Node, NodeId, WorkflowGraph};
use super::validator::{ValidatedGraph, RESERVED_PREFIX};

/// Returns the symbol for the node at `position` (zero-based) in the order.
pub fn symbol_for(position: usize) -> String {
    format!("{}{}", RESERVED_PREFIX, position + 1)
}

/// A validated graph with a total order and a unique symbol per node.
#[derive(Debug, Clone)]
pub struct SequencedGraph {
    graph: ValidatedGraph,
    order: Vec<NodeId>,
    symbols: BTreeMap<NodeId, String>,
}

impl SequencedGraph {
    pub fn graph(&self) -> &WorkflowGraph {
        self.graph.graph()
    }

    /// Node ids in execution order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn symbol(&self, id: NodeId) -> Option<&str> {
        self.symbols.get(&id).map(String::as_str)
    }

    /// Iterates `(symbol, node)` pairs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        let graph = self.graph.graph();
        self.order.iter().filter_map(move |&id| {
            let node = graph.node(id)?;
            let symbol = self.symbols.get(&id)?;
            Some((symbol.as_str(), node))
        })
    }
}

/// Orders the nodes of a validated graph.
///
/// Uses Kahn's algorithm: repeatedly take the smallest-id node whose
/// producers have all been placed.
pub fn sequence(validated: ValidatedGraph) -> SequencedGraph {
    let graph = validated.graph();

    let mut in_degree: BTreeMap<NodeId, usize> = graph.nodes.iter().map(|n| (n.id, 0)).collect();
    let mut successors: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for edge in &graph.edges {
        *in_degree.entry(edge.target_node_id).or_insert(0) += 1;
        successors
            .entry(edge.source_node_id)
            .or_default()
            .push(edge.target_node_id);
    }

    let mut ready: BTreeSet<NodeId> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(current) = ready.pop_first() {
        order.push(current);

        for successor in successors.get(&current).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(successor) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*successor);
                }
            }
        }
    }

    if order.len() != in_degree.len() {
        // Unreachable for validated graphs; keep every node rather than drop one
        error!(
            "Sequencer placed {} of {} nodes; appending the rest by id",
            order.len(),
            in_degree.len()
        );
        let placed: BTreeSet<NodeId> = order.iter().copied().collect();
        order.extend(in_degree.keys().filter(|id| !placed.contains(*id)));
    }

    let symbols: BTreeMap<NodeId, String> = order
        .iter()
        .enumerate()
        .map(|(position, &id)| (id, symbol_for(position)))
        .collect();

    debug!(
        "Execution order: {:?}",
        order
            .iter()
            .map(|id| format!("{}={}", symbols[id], id))
            .collect::<Vec<_>>()
    );

    SequencedGraph {
        graph: validated,
        order,
        symbols,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::catalog::ToolCatalog;
    use crate::workflow::model::{Edge, NodeDefinition, WorkflowDefinition};
    use crate::workflow::validator::validate;

    fn sequenced(definition: WorkflowDefinition) -> SequencedGraph {
        let graph = ToolCatalog::builtin().resolve(&definition).unwrap();
        sequence(validate(graph).unwrap())
    }

    fn alignment_nodes() -> WorkflowDefinition {
        WorkflowDefinition::default()
            .with_node(NodeDefinition::tool(5, "samtools_sort"))
            .with_node(NodeDefinition::input(2, "reads", "fastq"))
            .with_node(NodeDefinition::output(6, "sorted", "bam"))
            .with_node(NodeDefinition::tool(4, "bwa_mem"))
            .with_node(NodeDefinition::input(1, "reference", "fasta"))
    }

    fn alignment_edges() -> Vec<Edge> {
        vec![
            Edge::new("a", 1, "reference", 4, "reference"),
            Edge::new("b", 2, "reads", 4, "reads"),
            Edge::new("c", 4, "alignment", 5, "alignment"),
            Edge::new("d", 5, "sorted", 6, "sorted"),
        ]
    }

    #[test]
    fn test_symbol_for() {
        assert_eq!(symbol_for(0), "step_1");
        assert_eq!(symbol_for(9), "step_10");
    }

    #[test]
    fn test_sequence_linear_chain() {
        let mut definition = alignment_nodes();
        definition.edges = alignment_edges();

        let sequenced = sequenced(definition);
        let order: Vec<u64> = sequenced.order().iter().map(|id| id.0).collect();
        assert_eq!(order, vec![1, 2, 4, 5, 6]);

        assert_eq!(sequenced.symbol(NodeId(1)), Some("step_1"));
        assert_eq!(sequenced.symbol(NodeId(4)), Some("step_3"));
        assert_eq!(sequenced.symbol(NodeId(6)), Some("step_5"));
    }

    #[test]
    fn test_ready_ties_broken_by_node_id() {
        // Node 3 becomes ready before 2 is placed but 2 has the smaller id
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "reads", "fastq"))
            .with_node(NodeDefinition::tool(3, "fastqc"))
            .with_node(NodeDefinition::input(2, "raw", "fastq"))
            .with_node(NodeDefinition::tool(7, "fastqc"))
            .with_node(NodeDefinition::output(8, "report", "html"))
            .with_node(NodeDefinition::output(9, "raw_report", "html"))
            .connect(1, "reads", 3, "reads")
            .connect(2, "raw", 7, "reads")
            .connect(3, "report", 8, "report")
            .connect(7, "report", 9, "raw_report");

        let sequenced = sequenced(definition);
        let order: Vec<u64> = sequenced.order().iter().map(|id| id.0).collect();
        assert_eq!(order, vec![1, 2, 3, 7, 8, 9]);
    }

    #[test]
    fn test_order_independent_of_edge_insertion() {
        let mut forward = alignment_nodes();
        forward.edges = alignment_edges();

        let mut reversed = alignment_nodes();
        reversed.edges = alignment_edges().into_iter().rev().collect();

        let a = sequenced(forward);
        let b = sequenced(reversed);
        assert_eq!(a.order(), b.order());
        for id in a.order() {
            assert_eq!(a.symbol(*id), b.symbol(*id));
        }
    }

    #[test]
    fn test_iter_pairs_symbols_with_nodes() {
        let mut definition = alignment_nodes();
        definition.edges = alignment_edges();

        let sequenced = sequenced(definition);
        let pairs: Vec<(String, NodeId)> = sequenced
            .iter()
            .map(|(symbol, node)| (symbol.to_string(), node.id))
            .collect();

        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0], ("step_1".to_string(), NodeId(1)));
        assert_eq!(pairs[2], ("step_3".to_string(), NodeId(4)));
    }

    #[test]
    fn test_every_edge_points_forward() {
        let mut definition = alignment_nodes();
        definition.edges = alignment_edges();

        let sequenced = sequenced(definition);
        let position = |id: NodeId| sequenced.order().iter().position(|&o| o == id).unwrap();
        for edge in &sequenced.graph().edges {
            assert!(position(edge.source_node_id) < position(edge.target_node_id));
        }
    }
}

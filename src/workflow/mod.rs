//! Workflow Graph Module
//!
//! Provides the graph model, tool catalog and the stages that turn an
//! editor snapshot into an ordered pipeline description.
//!
//! # Structure
//!
//! - [`model`]: Nodes, ports, edges and tool definitions
//! - [`catalog`]: Tool lookup and built-in tools
//! - [`validator`]: Structural and port binding checks
//! - [`sequencer`]: Deterministic topological order and step symbols
//! - [`script`]: Target-agnostic pipeline script
//! - [`loader`]: YAML/JSON loading and saving

pub mod catalog;
pub mod loader;
pub mod model;
pub mod script;
pub mod sequencer;
pub mod validator;

pub use catalog::{ToolCatalog, BUILTIN_CATALOG};
pub use loader::{load_catalog, load_definition, save_definition, write_export};
pub use model::{
    DataKind, Edge, Node, NodeDefinition, NodeDefinitionKind, NodeId, NodeKind, PortSpec,
    ToolDefinition, WorkflowDefinition, WorkflowGraph, WorkflowMetadata,
};
pub use script::{build, PipelineScript, Step};
pub use sequencer::{sequence, SequencedGraph};
pub use validator::{validate, Diagnostic, ErrorCategory, ValidatedGraph, ValidationError};

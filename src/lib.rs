//! Pipewright - Workflow Export Engine
//!
//! Converts a bioinformatics pipeline graph, as built in a visual node
//! editor, into source text for CWL, Nextflow and Snakemake.
//!
//! # Architecture
//!
//! The library is organized into three modules:
//!
//! - [`workflow`]: Graph model, tool catalog, validation, sequencing and the
//!   intermediate pipeline script
//! - [`export`]: Format emitters and the export facade
//! - [`error`]: Error types shared by every stage
//!
//! # Example
//!
//! ```rust,no_run
//! use pipewright::{export, load_definition, ExportFormat, ToolCatalog};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a workflow snapshot from YAML
//!     let definition = load_definition("qc.yaml")?;
//!
//!     // Export it against the built-in tools
//!     let result = export(&definition, &ToolCatalog::builtin(), ExportFormat::Nextflow)?;
//!     println!("{}", result.content);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod export;
pub mod workflow;

// Re-export commonly used types
pub use error::{ExportError, Result};
pub use export::{export, ExportFormat, ExportResult, Exporter};
pub use workflow::catalog::ToolCatalog;
pub use workflow::loader::load_definition;
pub use workflow::model::{WorkflowDefinition, WorkflowMetadata};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Pipewright";

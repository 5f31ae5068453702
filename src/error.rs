//! Export Errors
//!
//! Two families of failure leave the export engine:
//!
//! - [`ExportError::Invalid`] carries every user-correctable problem found by
//!   the validator, so an editor can highlight them all at once.
//! - Everything else signals a caller or operator defect (unknown tool id,
//!   unknown format, unreadable file) and is never turned into partial output.

use thiserror::Error;

use crate::workflow::model::NodeId;
use crate::workflow::validator::{Diagnostic, ValidationError};

/// Result type alias using ExportError
pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("workflow is invalid ({} problem(s) found)", .0.len())]
    Invalid(Vec<ValidationError>),

    #[error("node {node_id} references unknown tool '{tool_id}'")]
    CatalogLookup { node_id: NodeId, tool_id: String },

    #[error("unsupported export format '{0}' (expected cwl, nextflow or snakemake)")]
    UnsupportedFormat(String),

    #[error("tool '{0}' is already registered in the catalog")]
    DuplicateTool(String),

    #[error("tool '{tool_id}' has port key '{port_key}', which is not a usable identifier")]
    InvalidToolPort { tool_id: String, port_key: String },

    #[error("failed to render document: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("failed to format output: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("failed to parse '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// True when the user can fix the problem by editing the graph.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Diagnostic records for UI highlighting; empty for non-validation errors.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Invalid(errors) => errors.iter().map(ValidationError::diagnostic).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_is_user_correctable() {
        let err = ExportError::Invalid(vec![ValidationError::NoToolNode]);
        assert!(err.is_user_correctable());
        assert_eq!(err.diagnostics().len(), 1);
        assert!(err.to_string().contains("1 problem"));
    }

    #[test]
    fn test_catalog_lookup_is_programmer_facing() {
        let err = ExportError::CatalogLookup {
            node_id: NodeId(7),
            tool_id: "ghost".to_string(),
        };
        assert!(!err.is_user_correctable());
        assert!(err.diagnostics().is_empty());
        assert!(err.to_string().contains("ghost"));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = ExportError::UnsupportedFormat("wdl".to_string());
        assert!(err.to_string().contains("'wdl'"));
    }
}

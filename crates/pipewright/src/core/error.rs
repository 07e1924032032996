//! Core error types for the editor pipeline
//!
//! Only the Orchestrator boundary turns failures into errors. The inner stages
//! (selector, graph builder, surgeon) report sentinel values instead.

use thiserror::Error;

/// Core error types for configuration editing
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Unparsable markup: {message} at line {line}, column {column}")]
    Unparsable {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("No diagram: {reason}")]
    NoDiagram { reason: String },

    #[error("Unknown adapter: {name}")]
    UnknownAdapter { name: String },

    #[error("Invalid reference data: {message}")]
    InvalidReferenceData { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl EditorError {
    /// Create a new unparsable-markup error
    pub fn unparsable(message: String, line: usize, column: usize) -> Self {
        Self::Unparsable {
            message,
            line,
            column,
        }
    }

    /// Create a new structural mismatch error
    pub fn no_diagram(reason: impl Into<String>) -> Self {
        Self::NoDiagram {
            reason: reason.into(),
        }
    }

    /// Create a new unknown-adapter error
    pub fn unknown_adapter(name: impl Into<String>) -> Self {
        Self::UnknownAdapter { name: name.into() }
    }

    /// Create a new reference data error
    pub fn invalid_reference_data(message: impl Into<String>) -> Self {
        Self::InvalidReferenceData {
            message: message.into(),
        }
    }

    /// True for failures that leave the diagram cleared (parse or structure)
    pub fn clears_diagram(&self) -> bool {
        matches!(self, Self::Unparsable { .. } | Self::NoDiagram { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparsable_error() {
        let error = EditorError::unparsable("unexpected '<'".to_string(), 5, 10);
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Unparsable markup"));
        assert!(error_msg.contains("unexpected '<'"));
        assert!(error_msg.contains("line 5"));
        assert!(error_msg.contains("column 10"));
        assert!(error.clears_diagram());
    }

    #[test]
    fn test_no_diagram_error() {
        let error = EditorError::no_diagram("adapter has no pipeline");
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("No diagram"));
        assert!(error_msg.contains("adapter has no pipeline"));
        assert!(error.clears_diagram());
    }

    #[test]
    fn test_unknown_adapter_error() {
        let error = EditorError::unknown_adapter("Orders");
        assert_eq!(error.to_string(), "Unknown adapter: Orders");
        assert!(!error.clears_diagram());
    }

    #[test]
    fn test_reference_data_error() {
        let error = EditorError::invalid_reference_data("catalog is not a list");
        assert!(error.to_string().contains("catalog is not a list"));
    }

    #[test]
    fn test_io_error_conversion() {
        use std::io;
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: EditorError = io_err.into();
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("IO error"));
        assert!(error_msg.contains("File not found"));
    }
}

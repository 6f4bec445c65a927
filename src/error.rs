// ==============================================================================
// error.rs - Pipeline Error Taxonomy
// ==============================================================================
// Description: Unified error type for loading, merging, classifying and rendering
// Author: Matt Barham
// Created: 2026-10-03
// Modified: 2026-10-14
// Version: 1.1.0
// ==============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the plotting pipeline.
///
/// Every variant carries a human-readable message; callers at the presentation
/// boundary only ever see the `Display` text.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// One or both required uploads were not supplied
    #[error("{message}")]
    MissingInput { message: String },

    /// Unparseable table, missing header, or missing required column
    #[error("Malformed input in {source_name}: {message}")]
    MalformedInput {
        source_name: String,
        message: String,
    },

    /// Treatment value outside the fixed Mock/ABA ordering
    #[error("Unknown treatment category '{value}' (expected one of: Mock, ABA)")]
    UnknownCategory { value: String },

    /// Duplicate accession key in an allele table under the strict policy
    #[error("Accession '{accession_id}' appears {count} times in {source_name}")]
    MergeAmbiguity {
        accession_id: String,
        source_name: String,
        count: usize,
    },

    /// Plotting backend failure
    #[error("Failed to render {artifact}: {message}")]
    Render { artifact: String, message: String },

    /// Input rejected by the upload validator (size, row ceiling, extension)
    #[error("Input rejected: {message}")]
    Rejected { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::MissingInput {
            message: message.into(),
        }
    }

    pub fn malformed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn render(artifact: impl Into<String>, message: impl ToString) -> Self {
        Self::Render {
            artifact: artifact.into(),
            message: message.to_string(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly kind, used in batch reports
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingInput { .. } => "missing_input",
            PipelineError::MalformedInput { .. } => "malformed_input",
            PipelineError::UnknownCategory { .. } => "unknown_category",
            PipelineError::MergeAmbiguity { .. } => "merge_ambiguity",
            PipelineError::Render { .. } => "render",
            PipelineError::Rejected { .. } => "rejected",
            PipelineError::Config { .. } => "config",
            PipelineError::Io { .. } => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = PipelineError::malformed("snp1.csv", "missing header row");
        assert_eq!(
            err.to_string(),
            "Malformed input in snp1.csv: missing header row"
        );

        let err = PipelineError::UnknownCategory {
            value: "Heat".to_string(),
        };
        assert!(err.to_string().contains("'Heat'"));
        assert_eq!(err.kind(), "unknown_category");
    }
}

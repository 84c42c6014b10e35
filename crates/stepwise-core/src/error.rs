//! Unified error types for the stepwise toolkit.

use std::path::PathBuf;
use thiserror::Error;

use crate::script::ScriptError;

/// All errors that can occur while segmenting, executing or rendering a template.
#[derive(Error, Debug)]
pub enum StepwiseError {
    // --- Configuration ---

    /// The configuration file (`stepwise.config.json`) could not be read.
    #[error("config file not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file exists but contains invalid JSON.
    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON data file passed as render context is invalid.
    #[error("failed to parse template data at {path}")]
    DataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // --- Segmentation ---

    /// A code block was opened but the text ended before its close marker.
    #[error("code block opened on line {line} is never closed")]
    UnterminatedBlock { line: usize },

    /// A close marker appeared with no open fence to close.
    #[error("close marker on line {line} has no matching open fence")]
    UnmatchedFence { line: usize },

    // --- Execution ---

    /// A code block failed while executing against the namespace.
    #[error("code block #{block} (line {line}) failed")]
    BlockExecution {
        block: usize,
        line: usize,
        #[source]
        source: ScriptError,
    },

    /// A request arrived after an earlier block failure aborted the session.
    #[error("evaluation session aborted by an earlier block failure")]
    SessionAborted,

    /// The renderer issued a different number of requests than the text announced.
    #[error("template made {actual} value requests, but its text contains {expected} references")]
    ReferenceCountMismatch { expected: u64, actual: u64 },

    // --- Templates ---

    /// Handlebars template rendering failed (invalid template or missing variables).
    #[error("template rendering failed: {0}")]
    TemplateRender(String),

    // --- General ---

    /// A filesystem I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A catch-all for errors from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Alias for `Result<T, StepwiseError>`.
pub type Result<T> = std::result::Result<T, StepwiseError>;

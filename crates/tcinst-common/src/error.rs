//! Unified error type for the tcinst workspace.
//!
//! The compiler is pure and deterministic, so none of these errors is
//! retried internally. Each variant carries the parameter, path, or slot
//! needed to diagnose it without inspecting internals.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A required instance parameter is missing or invalid.
    #[error("invalid parameter `{parameter}`: {message}")]
    Validation {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// The resource graph violates one of its structural invariants.
    #[error("resource graph error at {path}: {message}")]
    Graph {
        /// Path or logical name of the node involved.
        path: String,
        /// Description of the violated invariant.
        message: String,
    },

    /// The server descriptor template cannot be rendered.
    #[error("template error in slot `{slot}`: {message}")]
    Render {
        /// Substitution slot that is missing or unknown.
        slot: String,
        /// Description of the failure.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl ProvisionError {
    /// Builds a [`ProvisionError::Validation`] for `parameter`.
    pub fn validation(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            parameter,
            message: message.into(),
        }
    }

    /// Builds a [`ProvisionError::Graph`] for the node at `path`.
    pub fn graph(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Graph {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Builds a [`ProvisionError::Render`] for `slot`.
    pub fn render(slot: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            slot: slot.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ProvisionError>;

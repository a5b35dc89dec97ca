//! CLI error types with exit code handling
//!
//! Every failure of a command ends up as a [`CliError`], which knows the
//! exit code the process should terminate with.

use miette::Diagnostic;
use packify_processor::ProcessError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// A manifest could not be decoded or converted
    #[error("Invalid input: {message}")]
    #[diagnostic(code(packify::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The generated pack failed to render
    #[error("Template error: {message}")]
    #[diagnostic(
        code(packify::cli::template),
        help("this is a bug in packify, please report it with the input manifests")
    )]
    Template { message: String },

    /// Values collision or output conflict
    #[error("Pack error: {message}")]
    #[diagnostic(code(packify::cli::pack))]
    Pack {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid command-line options
    #[error("{message}")]
    #[diagnostic(code(packify::cli::usage))]
    Usage { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(packify::cli::io))]
    Io { message: String },

    /// Interrupted before the pack was produced
    #[error("Cancelled, nothing was written")]
    #[diagnostic(code(packify::cli::cancelled))]
    Cancelled,

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(packify::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Pack { .. } => exit_codes::PACK_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Cancelled => exit_codes::CANCELLED,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<ProcessError> for CliError {
    fn from(err: ProcessError) -> Self {
        let message = err.to_string();
        match root_cause(&err) {
            ProcessError::OutputExists(_) => CliError::Pack {
                message,
                help: Some("pass --force to overwrite it".to_string()),
            },
            ProcessError::Values(_) => CliError::Pack {
                message,
                help: Some(
                    "two resources store different values under the same key".to_string(),
                ),
            },
            ProcessError::Render { .. } | ProcessError::InvalidOutput { .. } => {
                CliError::Template { message }
            }
            ProcessError::InvalidOption(_) => CliError::Usage { message },
            ProcessError::Io(_) => CliError::Io { message },
            ProcessError::MalformedImage { .. } => CliError::Input {
                message,
                help: Some("images need an explicit tag, e.g. nginx:1.27".to_string()),
            },
            _ => CliError::Input {
                message,
                help: None,
            },
        }
    }
}

/// Innermost error below any resource context
fn root_cause(err: &ProcessError) -> &ProcessError {
    match err {
        ProcessError::Resource { source, .. } => root_cause(source),
        other => other,
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

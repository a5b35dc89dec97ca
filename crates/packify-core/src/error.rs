//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid resource: {message}")]
    InvalidResource { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Values(#[from] ValuesError),
}

/// Failure to address a field inside a resource tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("field '{path}' not found")]
    NotFound { path: String },

    #[error("field '{path}' is a {found}, expected a {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors raised while building the values document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValuesError {
    #[error("value path already set: {path}")]
    Collision { path: String },

    #[error("value path must not be empty")]
    EmptyPath,
}

pub type Result<T> = std::result::Result<T, CoreError>;

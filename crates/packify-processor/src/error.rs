//! Error types for template processing and pack assembly

use std::path::PathBuf;
use thiserror::Error;

use packify_core::{CoreError, PathError, Resource, ValuesError};

/// Processing error
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{kind} '{name}': {source}")]
    Resource {
        kind: String,
        name: String,
        #[source]
        source: Box<ProcessError>,
    },

    #[error("wrong image format '{image}': expected <repository>:<tag>")]
    MalformedImage { image: String },

    #[error("unexpected resource shape: {0}")]
    Shape(#[from] PathError),

    #[error(transparent)]
    Values(#[from] ValuesError),

    #[error("failed to render {template}: {source}")]
    Render {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("rendered {template} is not valid YAML: {source}")]
    InvalidOutput {
        template: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output directory already exists: {0}")]
    OutputExists(PathBuf),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ProcessError {
    /// Attach the kind and name of the resource being processed
    pub fn for_resource(self, resource: &Resource) -> Self {
        match self {
            already @ ProcessError::Resource { .. } => already,
            other => ProcessError::Resource {
                kind: resource.kind().to_string(),
                name: resource.name().to_string(),
                source: Box::new(other),
            },
        }
    }

    pub fn render(template: impl Into<String>, source: minijinja::Error) -> Self {
        ProcessError::Render {
            template: template.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

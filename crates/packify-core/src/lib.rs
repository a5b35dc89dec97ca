//! Packify Core - Core types for turning Kubernetes manifests into Sherpack packs
//!
//! This crate provides the foundational types used throughout packify:
//! - `Resource`: A decoded manifest with its group/version/kind signature
//! - `AppMetadata`: The pack-wide naming service (trimmed and templated names)
//! - `Values`: The collision-checked values document
//! - `Pack`: The Pack.yaml model written alongside generated templates

pub mod error;
pub mod expr;
pub mod metadata;
pub mod pack;
pub mod path;
pub mod resource;
pub mod values;

pub use error::{CoreError, PathError, Result, ValuesError};
pub use metadata::{AppMetadata, AppMetadataBuilder, canonical_name, lower_camel};
pub use pack::{Pack, PackKind, PackMetadata};
pub use path::FieldPath;
pub use resource::{GroupVersionKind, Resource};
pub use values::Values;

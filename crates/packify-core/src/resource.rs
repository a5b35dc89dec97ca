//! Decoded Kubernetes resources

use serde_yaml::{Mapping, Value};
use std::fmt;

use crate::error::{CoreError, PathError, Result};
use crate::path;

/// Group/version/kind signature of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Build from an `apiVersion` string (`apps/v1`, or `v1` for the core group)
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// A single decoded manifest
///
/// The field tree is never mutated after decoding. Processors clone the
/// parts they rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    gvk: GroupVersionKind,
    name: String,
    namespace: Option<String>,
    tree: Value,
}

impl Resource {
    /// Decode a resource from a parsed YAML document
    pub fn from_value(tree: Value) -> Result<Self> {
        if !tree.is_mapping() {
            return Err(CoreError::InvalidResource {
                message: format!("expected a mapping, found a {}", path::type_name(&tree)),
            });
        }

        let api_version = required_str(&tree, &["apiVersion"])?;
        let kind = required_str(&tree, &["kind"])?;
        let name = required_str(&tree, &["metadata", "name"])?;
        let namespace = path::get_str(&tree, &["metadata", "namespace"])?.map(str::to_string);

        Ok(Self {
            gvk: GroupVersionKind::from_api_version(&api_version, &kind),
            name,
            namespace,
            tree,
        })
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let tree: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(tree)
    }

    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    pub fn kind(&self) -> &str {
        &self.gvk.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn labels(&self) -> std::result::Result<Option<&Mapping>, PathError> {
        path::get_mapping(&self.tree, &["metadata", "labels"])
    }

    pub fn annotations(&self) -> std::result::Result<Option<&Mapping>, PathError> {
        path::get_mapping(&self.tree, &["metadata", "annotations"])
    }

    /// The whole field tree
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Look up an optional nested field
    pub fn field(&self, path: &[&str]) -> std::result::Result<Option<&Value>, PathError> {
        path::get_opt(&self.tree, path)
    }
}

fn required_str(tree: &Value, path: &[&str]) -> Result<String> {
    match path::get_str(tree, path)? {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(CoreError::InvalidResource {
            message: format!("missing required field '{}'", path.join(".")),
        }),
    }
}

//! Values document accumulated while templating resources
//!
//! Processors move configurable fields out of manifests and into this tree,
//! getting back the expression that reads them. Writes never overwrite: a
//! path holding a different value is a [`ValuesError::Collision`], a path
//! holding the same value is left alone.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ValuesError;
use crate::expr;

/// Values key holding the cluster domain
pub const CLUSTER_DOMAIN_KEY: &str = "kubernetesClusterDomain";

/// Values key grouping persistent volume claim settings
pub const PVC_KEY: &str = "pvc";

/// Top-level keys read by the helpers or shared across resources
///
/// No resource may claim one of these as its own values key.
pub const RESERVED_KEYS: &[&str] = &[
    "nameOverride",
    "fullnameOverride",
    CLUSTER_DOMAIN_KEY,
    PVC_KEY,
];

/// Values container with collision-checked writes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Insert `value` at `path` and return the expression that reads it back
    ///
    /// Strings are quoted on render, collections are rendered as inline JSON,
    /// everything else is rendered as-is.
    pub fn add<S: AsRef<str>>(
        &mut self,
        value: impl Into<JsonValue>,
        path: &[S],
    ) -> Result<String, ValuesError> {
        let value = value.into();
        let reference = expr::values_ref(path);
        let expression = match &value {
            JsonValue::String(_) => format!("{{{{ {} | quote }}}}", reference),
            JsonValue::Array(_) | JsonValue::Object(_) => {
                format!("{{{{ {} | tojson }}}}", reference)
            }
            _ => format!("{{{{ {} }}}}", reference),
        };

        let segments: Vec<&str> = path.iter().map(AsRef::as_ref).collect();
        insert_checked(&mut self.0, &segments, value)?;
        Ok(expression)
    }

    /// Merge another values document into this one
    ///
    /// Fails on the first path both sides define differently. Paths both
    /// sides define identically are accepted.
    pub fn merge(&mut self, other: Values) -> Result<(), ValuesError> {
        let mut trail = Vec::new();
        merge_checked(&mut self.0, other.0, &mut trail)
    }

    /// Get a value by path segments
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&JsonValue> {
        path.iter()
            .try_fold(&self.0, |node, key| node.as_object()?.get(key.as_ref()))
    }

    /// Dotted paths of every leaf (scalars, sequences and empty mappings)
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaves(&self.0, &mut Vec::new(), &mut out);
        out
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }

    /// Serialize as a YAML document
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        if self.is_empty() {
            return Ok("{}\n".to_string());
        }
        serde_yaml::to_string(&self.0)
    }
}

fn insert_checked(root: &mut JsonValue, path: &[&str], value: JsonValue) -> Result<(), ValuesError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(ValuesError::EmptyPath);
    };

    if root.is_null() {
        *root = JsonValue::Object(serde_json::Map::new());
    }

    let mut current = root;
    for (depth, key) in parents.iter().enumerate() {
        let Some(map) = current.as_object_mut() else {
            return Err(collision(&path[..depth]));
        };
        current = map
            .entry(key.to_string())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
    }

    let Some(map) = current.as_object_mut() else {
        return Err(collision(parents));
    };

    match map.get(*last) {
        Some(existing) if *existing == value => Ok(()),
        Some(_) => Err(collision(path)),
        None => {
            map.insert(last.to_string(), value);
            Ok(())
        }
    }
}

fn merge_checked(
    base: &mut JsonValue,
    overlay: JsonValue,
    trail: &mut Vec<String>,
) -> Result<(), ValuesError> {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                trail.push(key.clone());
                match base_map.get_mut(&key) {
                    Some(base_value) => merge_checked(base_value, overlay_value, trail)?,
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
                trail.pop();
            }
            Ok(())
        }
        (base, overlay) if *base == overlay => Ok(()),
        (base, overlay) if base.is_null() && trail.is_empty() => {
            *base = overlay;
            Ok(())
        }
        _ => Err(ValuesError::Collision {
            path: trail.join("."),
        }),
    }
}

fn collect_leaves(node: &JsonValue, trail: &mut Vec<String>, out: &mut Vec<String>) {
    match node {
        JsonValue::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                trail.push(key.clone());
                collect_leaves(child, trail, out);
                trail.pop();
            }
        }
        _ if trail.is_empty() => {}
        _ => out.push(trail.join(".")),
    }
}

fn collision(path: &[&str]) -> ValuesError {
    ValuesError::Collision {
        path: path.join("."),
    }
}

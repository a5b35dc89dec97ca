//! Multi-document manifest decoding
//!
//! Documents are separated by `---`. Empty documents are skipped and
//! `kind: List` wrappers (as printed by `kubectl get -o yaml`) are expanded
//! into their items.

use packify_core::{CoreError, Resource};
use serde::Deserialize;
use serde_yaml::Value;
use std::io::Read;
use std::path::Path;

/// Read the whole input, from `path` or stdin when absent or `-`
pub fn read_input(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// Decode every resource in `text`, in document order
pub fn decode(text: &str) -> impl Iterator<Item = packify_core::Result<Resource>> + '_ {
    serde_yaml::Deserializer::from_str(text).flat_map(|document| {
        match Value::deserialize(document) {
            Ok(Value::Null) => Vec::new(),
            Ok(value) => expand(value),
            Err(e) => vec![Err(CoreError::from(e))],
        }
    })
}

fn expand(value: Value) -> Vec<packify_core::Result<Resource>> {
    if !is_list(&value) {
        return vec![Resource::from_value(value)];
    }
    match value.get("items") {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .cloned()
            .map(Resource::from_value)
            .collect(),
        _ => Vec::new(),
    }
}

fn is_list(value: &Value) -> bool {
    value.get("kind").and_then(Value::as_str) == Some("List")
        && value.get("apiVersion").and_then(Value::as_str) == Some("v1")
}

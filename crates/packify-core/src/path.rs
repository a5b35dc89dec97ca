//! Path-addressed access to resource field trees
//!
//! Two flavours of addressing are supported:
//!
//! - plain key slices (`&["spec", "template"]`) for reading and writing a
//!   single field, failing with a typed [`PathError`] instead of defaulting;
//! - [`FieldPath`], a `/`-separated path where a `[]` suffix fans out over
//!   every element of a sequence (`spec/subjects[]/name`), used to rewrite all
//!   string fields at a location in one pass.

use std::fmt;

use serde_yaml::{Mapping, Value};

use crate::error::PathError;
use crate::expr;

/// Human-readable name of a YAML node type, used in error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn joined(path: &[&str]) -> String {
    path.join(".")
}

/// Get a nested field, failing if any segment is missing
pub fn get<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value, PathError> {
    get_opt(root, path)?.ok_or_else(|| PathError::NotFound {
        path: joined(path),
    })
}

/// Get a nested field; missing segments yield `None`, non-mapping parents fail
pub fn get_opt<'a>(root: &'a Value, path: &[&str]) -> Result<Option<&'a Value>, PathError> {
    let mut current = root;
    for (depth, key) in path.iter().enumerate() {
        match current {
            Value::Mapping(map) => match map.get(*key) {
                Some(next) => current = next,
                None => return Ok(None),
            },
            Value::Null => return Ok(None),
            other => {
                return Err(PathError::TypeMismatch {
                    path: joined(&path[..depth]),
                    expected: "mapping",
                    found: type_name(other),
                });
            }
        }
    }
    Ok(Some(current))
}

/// Get a nested mapping, `None` when absent
pub fn get_mapping<'a>(root: &'a Value, path: &[&str]) -> Result<Option<&'a Mapping>, PathError> {
    match get_opt(root, path)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(map)) => Ok(Some(map)),
        Some(other) => Err(PathError::TypeMismatch {
            path: joined(path),
            expected: "mapping",
            found: type_name(other),
        }),
    }
}

/// Get a nested string, `None` when absent
pub fn get_str<'a>(root: &'a Value, path: &[&str]) -> Result<Option<&'a str>, PathError> {
    match get_opt(root, path)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(PathError::TypeMismatch {
            path: joined(path),
            expected: "string",
            found: type_name(other),
        }),
    }
}

/// Mutable access to a nested field, failing if any segment is missing
pub fn get_mut<'a>(root: &'a mut Value, path: &[&str]) -> Result<&'a mut Value, PathError> {
    let mut current = root;
    for (depth, key) in path.iter().enumerate() {
        let found = type_name(current);
        current = match current {
            Value::Mapping(map) => map.get_mut(*key).ok_or_else(|| PathError::NotFound {
                path: joined(&path[..=depth]),
            })?,
            _ => {
                return Err(PathError::TypeMismatch {
                    path: joined(&path[..depth]),
                    expected: "mapping",
                    found,
                });
            }
        };
    }
    Ok(current)
}

/// Set a nested field, creating intermediate mappings as needed
pub fn set(root: &mut Value, path: &[&str], value: Value) -> Result<(), PathError> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for (depth, key) in parents.iter().enumerate() {
        if current.is_null() {
            *current = Value::Mapping(Mapping::new());
        }
        let found = type_name(current);
        let Value::Mapping(map) = current else {
            return Err(PathError::TypeMismatch {
                path: joined(&path[..depth]),
                expected: "mapping",
                found,
            });
        };
        let key = Value::String((*key).to_string());
        if !map.contains_key(&key) {
            map.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        current = map.get_mut(&key).ok_or_else(|| PathError::NotFound {
            path: joined(&path[..=depth]),
        })?;
    }

    if current.is_null() {
        *current = Value::Mapping(Mapping::new());
    }
    let found = type_name(current);
    match current {
        Value::Mapping(map) => {
            map.insert(Value::String((*last).to_string()), value);
            Ok(())
        }
        _ => Err(PathError::TypeMismatch {
            path: joined(parents),
            expected: "mapping",
            found,
        }),
    }
}

/// Remove a nested field, returning it if it existed
pub fn remove(root: &mut Value, path: &[&str]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    match get_mut(root, parents).ok()? {
        Value::Mapping(map) => map.remove(*last),
        _ => None,
    }
}

/// One step of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A mapping key
    Field(String),
    /// A mapping key holding a sequence; the rest of the path applies to every element
    Array(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(field) => write!(f, "{field}"),
            Segment::Array(field) => write!(f, "{field}[]"),
        }
    }
}

/// A `/`-separated path that can fan out over sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        let segments = s
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.strip_suffix("[]") {
                Some(field) => Segment::Array(field.to_string()),
                None => Segment::Field(segment.to_string()),
            })
            .collect();
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("/"))
    }
}

impl FieldPath {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Offer every string found at this path to `f`; `Some` replaces the node
    ///
    /// Absent fields are skipped: a path describes where a reference *may*
    /// live. Expression nodes were rewritten already and are skipped too. A
    /// field of the wrong type is an error. Returns the number of strings
    /// visited.
    pub fn rewrite_strings<F>(&self, root: &mut Value, f: &mut F) -> Result<usize, PathError>
    where
        F: FnMut(&str) -> Option<Value>,
    {
        rewrite_at(root, &self.segments, f, &self.to_string())
    }
}

fn rewrite_at<F>(
    node: &mut Value,
    segments: &[Segment],
    f: &mut F,
    display: &str,
) -> Result<usize, PathError>
where
    F: FnMut(&str) -> Option<Value>,
{
    let Some((head, rest)) = segments.split_first() else {
        return match node {
            Value::String(s) => {
                if let Some(rewritten) = f(s.as_str()) {
                    *node = rewritten;
                }
                Ok(1)
            }
            Value::Null => Ok(0),
            other if expr::as_expression(other).is_some() => Ok(0),
            other => Err(PathError::TypeMismatch {
                path: display.to_string(),
                expected: "string",
                found: type_name(other),
            }),
        };
    };

    let found = type_name(node);
    let map = match node {
        Value::Mapping(map) => map,
        Value::Null => return Ok(0),
        _ => {
            return Err(PathError::TypeMismatch {
                path: display.to_string(),
                expected: "mapping",
                found,
            });
        }
    };

    match head {
        Segment::Field(key) => match map.get_mut(key.as_str()) {
            Some(child) => rewrite_at(child, rest, f, display),
            None => Ok(0),
        },
        Segment::Array(key) => match map.get_mut(key.as_str()) {
            Some(Value::Sequence(items)) => {
                let mut count = 0;
                for item in items {
                    count += rewrite_at(item, rest, f, display)?;
                }
                Ok(count)
            }
            Some(Value::Null) | None => Ok(0),
            Some(other) => Err(PathError::TypeMismatch {
                path: display.to_string(),
                expected: "sequence",
                found: type_name(other),
            }),
        },
    }
}

//! The filters generated templates and helpers call, for previews
//!
//! Sherpack ships a much larger set. Only what packify itself emits is
//! registered, so a preview fails loudly if generation ever starts using
//! something else.

use minijinja::{Environment, Error, ErrorKind, Value};

use crate::yaml::indent_lines;

/// Register every filter on `env`
pub fn register(env: &mut Environment<'_>) {
    env.add_filter("quote", quote);
    env.add_filter("tojson", tojson);
    env.add_filter("nindent", nindent);
    env.add_filter("trunc", trunc);
    env.add_filter("trimsuffix", trimsuffix);
}

fn invalid(e: serde_json::Error) -> Error {
    Error::new(ErrorKind::InvalidOperation, e.to_string())
}

/// A double-quoted scalar; non-strings are quoted in their display form
///
/// JSON string syntax is valid double-quoted YAML, control characters
/// included.
fn quote(value: Value) -> Result<String, Error> {
    let text = match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    };
    serde_json::to_string(&text).map_err(invalid)
}

/// Inline JSON, which YAML reads as a flow collection
fn tojson(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value).map_err(invalid)
}

/// A newline followed by `value` indented by `spaces`
fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent_lines(&value, spaces))
}

fn trunc(value: String, length: usize) -> String {
    match value.char_indices().nth(length) {
        Some((end, _)) => value[..end].to_string(),
        None => value,
    }
}

fn trimsuffix(value: String, suffix: String) -> String {
    match value.strip_suffix(suffix.as_str()) {
        Some(trimmed) => trimmed.to_string(),
        None => value,
    }
}

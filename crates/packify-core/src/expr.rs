//! Sherpack (Jinja2) expression builders
//!
//! Every placeholder written into a generated template comes from here, so
//! the syntax lives in one place.
//!
//! Expressions placed into a YAML tree are wrapped with [`node`] so the
//! serializer can tell them apart from literal strings that merely look
//! like template syntax.

use serde_yaml::Value;
use serde_yaml::value::{Tag, TaggedValue};

/// File holding the helper macros inside `templates/`
pub const HELPERS_FILE: &str = "_helpers.j2";

/// Helper macro names
pub const MACRO_NAME: &str = "name";
pub const MACRO_FULLNAME: &str = "fullname";
pub const MACRO_LABELS: &str = "labels";
pub const MACRO_SELECTOR_LABELS: &str = "selectorLabels";

/// Expression for the namespace a release is installed into
pub const RELEASE_NAMESPACE: &str = "{{ release.namespace }}";

/// Tag carried by expression nodes; never written to a template
pub const EXPRESSION_TAG: &str = "packify-expression";

/// YAML node standing for a template expression
pub fn node(expression: impl Into<String>) -> Value {
    Value::Tagged(Box::new(TaggedValue {
        tag: Tag::new(EXPRESSION_TAG),
        value: Value::String(expression.into()),
    }))
}

/// The expression held by `value`, if it is an expression node
pub fn as_expression(value: &Value) -> Option<&str> {
    match value {
        Value::Tagged(tagged) if tagged.tag == EXPRESSION_TAG => tagged.value.as_str(),
        _ => None,
    }
}

/// Whether `segment` can be written as `.segment` in an attribute chain
pub fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Accessor for a path inside the values document: `values.a.b["c.d"]`
pub fn values_ref<S: AsRef<str>>(path: &[S]) -> String {
    let mut out = String::from("values");
    for segment in path {
        let segment = segment.as_ref();
        if is_identifier(segment) {
            out.push('.');
            out.push_str(segment);
        } else {
            out.push_str("[\"");
            out.push_str(&escape(segment));
            out.push_str("\"]");
        }
    }
    out
}

/// `{{ fullname("suffix") }}`
pub fn fullname(suffix: &str) -> String {
    format!("{{{{ {}(\"{}\") }}}}", MACRO_FULLNAME, escape(suffix))
}

/// A macro call spliced into a block at `indent` columns: `{{- labels() | nindent(4) }}`
pub fn nindent_macro(name: &str, indent: usize) -> String {
    format!("{{{{- {}() | nindent({}) }}}}", name, indent)
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

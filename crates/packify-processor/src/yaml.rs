//! YAML fragments spliced into template skeletons
//!
//! Expression nodes (see [`expr::node`]) are written verbatim and unquoted
//! so they render to the typed value they stand for. Every other string is
//! literal text: template delimiters inside it are wrapped in raw blocks and
//! come out of rendering unchanged.

use packify_core::expr;
use serde_yaml::{Mapping, Value};
use std::borrow::Cow;

use crate::error::Result;

/// Sequences that open a template tag
const DELIMITERS: [&str; 3] = ["{{", "{%", "{#"];

const PLACEHOLDER_PREFIX: &str = "__packify_expression";

/// Serialize `value` as a block indented by `indent` spaces
pub fn to_block<T: Clone + Into<Value>>(value: &T, indent: usize) -> Result<String> {
    let mut value: Value = value.clone().into();

    let prefix = placeholder_prefix(&value);
    let mut expressions = Vec::new();
    prepare(&mut value, &prefix, &mut expressions);

    let mut yaml = serde_yaml::to_string(&value)?;
    for (index, expression) in expressions.iter().enumerate() {
        yaml = yaml.replace(&placeholder(&prefix, index), expression);
    }
    Ok(indent_lines(yaml.trim_end(), indent))
}

/// Literal text with every template delimiter wrapped in a raw block
///
/// The raw markers contain no quote characters, so the result survives any
/// YAML scalar style.
pub fn escape_delimiters(text: &str) -> Cow<'_, str> {
    if !DELIMITERS.iter().any(|delimiter| text.contains(delimiter)) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 32);
    let mut rest = text;
    while let Some(pos) = rest.find('{') {
        let tail = &rest[pos..];
        match DELIMITERS.iter().find(|delimiter| tail.starts_with(**delimiter)) {
            Some(delimiter) => {
                out.push_str(&rest[..pos]);
                out.push_str("{% raw %}");
                out.push_str(delimiter);
                out.push_str("{% endraw %}");
                rest = &tail[delimiter.len()..];
            }
            None => {
                out.push_str(&rest[..=pos]);
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Prefix `indent` spaces to every non-empty line
pub fn indent_lines(text: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn placeholder(prefix: &str, index: usize) -> String {
    format!("{prefix}{index}__")
}

/// A placeholder prefix no literal string in `value` contains
fn placeholder_prefix(value: &Value) -> String {
    let mut prefix = PLACEHOLDER_PREFIX.to_string();
    while contains_text(value, &prefix) {
        prefix.push('_');
    }
    prefix
}

fn contains_text(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.contains(needle),
        Value::Sequence(items) => items.iter().any(|item| contains_text(item, needle)),
        Value::Mapping(map) => map
            .iter()
            .any(|(key, item)| contains_text(key, needle) || contains_text(item, needle)),
        Value::Tagged(tagged) => contains_text(&tagged.value, needle),
        _ => false,
    }
}

/// Swap expression nodes for placeholders and escape literal strings
fn prepare(value: &mut Value, prefix: &str, expressions: &mut Vec<String>) {
    if let Some(expression) = expr::as_expression(value) {
        expressions.push(expression.to_string());
        *value = Value::String(placeholder(prefix, expressions.len() - 1));
        return;
    }

    match value {
        Value::String(s) => {
            let escaped = match escape_delimiters(s) {
                Cow::Owned(escaped) => Some(escaped),
                Cow::Borrowed(_) => None,
            };
            if let Some(escaped) = escaped {
                *s = escaped;
            }
        }
        Value::Sequence(items) => {
            for item in items {
                prepare(item, prefix, expressions);
            }
        }
        Value::Mapping(map) => {
            let entries = std::mem::take(map);
            let mut rebuilt = Mapping::with_capacity(entries.len());
            for (mut key, mut item) in entries {
                prepare(&mut key, prefix, expressions);
                prepare(&mut item, prefix, expressions);
                rebuilt.insert(key, item);
            }
            *map = rebuilt;
        }
        Value::Tagged(tagged) => prepare(&mut tagged.value, prefix, expressions),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_block_indents() {
        let mut map = Mapping::new();
        map.insert("a".into(), Value::from(1));
        map.insert("b".into(), Value::Sequence(vec!["x".into()]));

        assert_eq!(to_block(&map, 2).unwrap(), "  a: 1\n  b:\n  - x");
    }

    #[test]
    fn test_expression_nodes_are_unquoted() {
        let mut map = Mapping::new();
        map.insert("name".into(), expr::node(r#"{{ fullname("web") }}"#));
        map.insert("cpu".into(), expr::node("{{ values.web.cpu | quote }}"));
        map.insert(
            "host".into(),
            expr::node(r#"{{ fullname("svc") }}.{{ release.namespace }}.svc"#),
        );

        assert_eq!(
            to_block(&map, 0).unwrap(),
            r#"name: {{ fullname("web") }}
cpu: {{ values.web.cpu | quote }}
host: {{ fullname("svc") }}.{{ release.namespace }}.svc"#
        );
    }

    #[test]
    fn test_literal_delimiters_are_escaped() {
        let mut map = Mapping::new();
        map.insert("tmpl".into(), "{{ greeting }}".into());
        map.insert("{# key #}".into(), "{% if x %}".into());

        let block = to_block(&map, 0).unwrap();
        assert!(block.contains("{% raw %}{{{% endraw %} greeting }}"));
        assert!(block.contains("{% raw %}{#{% endraw %} key #}"));
        assert!(block.contains("{% raw %}{%{% endraw %} if x %}"));
        assert!(!block.contains("'{{ greeting }}'"));
    }

    #[test]
    fn test_escape_delimiters() {
        assert!(matches!(escape_delimiters("plain {text}"), Cow::Borrowed(_)));
        assert_eq!(
            escape_delimiters("{{{ a }}"),
            "{% raw %}{{{% endraw %}{ a }}"
        );
        assert_eq!(
            escape_delimiters("a: {{ $labels.instance }} down"),
            "a: {% raw %}{{{% endraw %} $labels.instance }} down"
        );
    }

    #[test]
    fn test_plain_strings_keep_quoting() {
        let mut map = Mapping::new();
        map.insert("a".into(), "true".into());
        map.insert("b".into(), "123".into());

        assert_eq!(to_block(&map, 0).unwrap(), "a: 'true'\nb: '123'");
    }

    #[test]
    fn test_placeholder_text_in_literals() {
        let mut map = Mapping::new();
        map.insert("literal".into(), "__packify_expression0__".into());
        map.insert("expr".into(), expr::node("{{ values.a }}"));

        assert_eq!(
            to_block(&map, 0).unwrap(),
            "literal: __packify_expression0__\nexpr: {{ values.a }}"
        );
    }
}

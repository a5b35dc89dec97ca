//! Helper macros shipped with every generated pack

use regex::Regex;

use packify_core::expr::{MACRO_FULLNAME, MACRO_LABELS, MACRO_NAME, MACRO_SELECTOR_LABELS};

/// Content of `templates/_helpers.j2`
pub const HELPERS: &str = r#"{#- Naming and labelling helpers -#}

{#- Pack name, overridable with values.nameOverride -#}
{%- macro name() -%}
{{ (values.nameOverride if values.nameOverride is defined and values.nameOverride else pack.name) | trunc(63) | trimsuffix("-") }}
{%- endmacro %}

{#- Release-scoped name with an optional suffix, at most 63 characters -#}
{%- macro fullname(suffix="") -%}
{%- set base = values.fullnameOverride if values.fullnameOverride is defined and values.fullnameOverride else (release.name if pack.name in release.name else release.name ~ "-" ~ pack.name) -%}
{{ ((base ~ "-" ~ suffix) if suffix else base) | trunc(63) | trimsuffix("-") }}
{%- endmacro %}

{%- macro selectorLabels() -%}
app.kubernetes.io/name: {{ name() }}
app.kubernetes.io/instance: {{ release.name }}
{%- endmacro %}

{%- macro labels() -%}
{{ selectorLabels() }}
{%- if pack.appVersion %}
app.kubernetes.io/version: {{ pack.appVersion | quote }}
{%- endif %}
app.kubernetes.io/managed-by: {{ release.service }}
{%- endmacro %}
"#;

/// Every macro defined in [`HELPERS`]
pub const MACROS: &[&str] = &[MACRO_NAME, MACRO_FULLNAME, MACRO_SELECTOR_LABELS, MACRO_LABELS];

/// Helper macros called from `content`, sorted
pub fn used_macros(content: &str) -> Vec<&'static str> {
    let mut used: Vec<&'static str> = MACROS
        .iter()
        .copied()
        .filter(|name| {
            Regex::new(&format!(r"\b{}\s*\(", regex::escape(name)))
                .map(|re| re.is_match(content))
                .unwrap_or(false)
        })
        .collect();
    used.sort_unstable();
    used
}

/// Import line for the macros `content` uses, if any
pub fn import_header(content: &str, helpers_file: &str) -> Option<String> {
    let used = used_macros(content);
    if used.is_empty() {
        return None;
    }
    Some(format!(
        "{{%- from \"{}\" import {} -%}}\n",
        helpers_file,
        used.join(", ")
    ))
}

//! Secrets move their payload into values
//!
//! `data` entries keep their base64 encoding and `stringData` entries stay
//! plain text. Both land under the secret's values key, one value per entry
//! named after the camel-cased entry key.

use minijinja::context;
use packify_core::path::type_name;
use packify_core::{
    AppMetadata, GroupVersionKind, PathError, Resource, Values, ValuesError, expr, lower_camel,
};
use serde_yaml::Value;

use crate::dispatch::Processor;
use crate::error::Result;
use crate::meta::{ObjectMeta, body_fields};
use crate::template::{Body, META_AND_BODY, Template};
use crate::yaml;

const PAYLOAD_SECTIONS: &[&str] = &["data", "stringData"];

#[derive(Debug, Clone, Copy, Default)]
pub struct SecretProcessor;

impl Processor for SecretProcessor {
    fn name(&self) -> &'static str {
        "secret"
    }

    fn matches(&self, gvk: &GroupVersionKind) -> bool {
        gvk.group.is_empty() && gvk.kind == "Secret"
    }

    fn process(&self, meta: &AppMetadata, resource: &Resource) -> Result<Template> {
        let object_meta = ObjectMeta::from_resource(meta, resource)?.render()?;
        let key = meta.values_key(resource.name())?;
        let mut values = Values::new();

        let mut fields = body_fields(resource);
        for section in PAYLOAD_SECTIONS {
            let entries = match fields.get_mut(*section) {
                None | Some(Value::Null) => continue,
                Some(Value::Mapping(entries)) => entries,
                Some(other) => {
                    return Err(PathError::TypeMismatch {
                        path: section.to_string(),
                        expected: "mapping",
                        found: type_name(other),
                    }
                    .into());
                }
            };

            for (entry, payload) in entries.iter_mut() {
                let Some(entry) = entry.as_str() else {
                    return Err(PathError::TypeMismatch {
                        path: section.to_string(),
                        expected: "string key",
                        found: type_name(entry),
                    }
                    .into());
                };
                let text = match payload {
                    Value::String(text) => text.clone(),
                    Value::Null => String::new(),
                    other => {
                        return Err(PathError::TypeMismatch {
                            path: format!("{section}.{entry}"),
                            expected: "string",
                            found: type_name(other),
                        }
                        .into());
                    }
                };

                let entry_key = lower_camel(entry);
                if entry_key.is_empty() {
                    return Err(ValuesError::EmptyPath.into());
                }
                let expression = values.add(text, &[key.as_str(), entry_key.as_str()])?;
                *payload = expr::node(expression);
            }
        }

        let body = if fields.is_empty() {
            String::new()
        } else {
            yaml::to_block(&fields, 0)?
        };

        Ok(Template::new(
            "secret.yaml",
            values,
            Body::new(META_AND_BODY, context! { meta => object_meta, body => body }),
        ))
    }
}

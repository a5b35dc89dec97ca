//! Persistent volume claims
//!
//! The storage class and the requested size are the two fields worth
//! changing per install; both move to `pvc.<claim>` in values.

use minijinja::context;
use packify_core::path::{self, type_name};
use packify_core::values::PVC_KEY;
use packify_core::{AppMetadata, GroupVersionKind, PathError, Resource, Values, expr};
use serde_yaml::Value;

use crate::dispatch::Processor;
use crate::error::Result;
use crate::meta::{ObjectMeta, body_fields};
use crate::template::{Body, META_AND_BODY, Template};
use crate::yaml;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimProcessor;

impl Processor for ClaimProcessor {
    fn name(&self) -> &'static str {
        "pvc"
    }

    fn matches(&self, gvk: &GroupVersionKind) -> bool {
        gvk.group.is_empty() && gvk.kind == "PersistentVolumeClaim"
    }

    fn process(&self, meta: &AppMetadata, resource: &Resource) -> Result<Template> {
        let object_meta = ObjectMeta::from_resource(meta, resource)?.render()?;
        let key = meta.values_key(resource.name())?;
        let mut values = Values::new();

        let mut tree = Value::Mapping(body_fields(resource));
        if let Some(class) = path::get_str(&tree, &["spec", "storageClassName"])? {
            let expression = values.add(class, &[PVC_KEY, key.as_str(), "storageClass"])?;
            path::set(&mut tree, &["spec", "storageClassName"], expr::node(expression))?;
        }

        let request: &[&str] = &["spec", "resources", "requests", "storage"];
        match path::get_opt(&tree, request)? {
            None | Some(Value::Null) => {}
            Some(size @ (Value::String(_) | Value::Number(_))) => {
                let size = serde_json::to_value(size)?;
                let expression = values.add(size, &[PVC_KEY, key.as_str(), "storageRequest"])?;
                path::set(&mut tree, request, expr::node(expression))?;
            }
            Some(other) => {
                return Err(PathError::TypeMismatch {
                    path: request.join("."),
                    expected: "quantity",
                    found: type_name(other),
                }
                .into());
            }
        }

        let body = match &tree {
            Value::Mapping(fields) if !fields.is_empty() => yaml::to_block(fields, 0)?,
            _ => String::new(),
        };

        Ok(Template::new(
            "pvc.yaml",
            values,
            Body::new(META_AND_BODY, context! { meta => object_meta, body => body }),
        ))
    }
}

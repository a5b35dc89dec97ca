//! Fallback processor for kinds without a dedicated one

use minijinja::context;
use packify_core::{AppMetadata, GroupVersionKind, Resource, Values};

use crate::dispatch::Processor;
use crate::error::Result;
use crate::meta::{ObjectMeta, body_fields};
use crate::template::{Body, META_AND_BODY, Template};
use crate::yaml;

/// Re-emits the object with templated metadata and no values
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessor;

impl Processor for DefaultProcessor {
    fn name(&self) -> &'static str {
        "default"
    }

    fn matches(&self, _gvk: &GroupVersionKind) -> bool {
        true
    }

    fn process(&self, meta: &AppMetadata, resource: &Resource) -> Result<Template> {
        let object_meta = ObjectMeta::from_resource(meta, resource)?.render()?;
        let fields = body_fields(resource);
        let body = if fields.is_empty() {
            String::new()
        } else {
            yaml::to_block(&fields, 0)?
        };

        Ok(Template::new(
            format!("{}.yaml", resource.kind().to_lowercase()),
            Values::new(),
            Body::new(META_AND_BODY, context! { meta => object_meta, body => body }),
        ))
    }
}

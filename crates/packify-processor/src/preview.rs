//! Rendering a generated pack the way Sherpack would install it

use indexmap::IndexMap;
use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value, context};
use packify_core::expr::HELPERS_FILE;
use serde::Deserialize;

use crate::error::{ProcessError, Result};
use crate::filters;
use crate::helpers::HELPERS;
use crate::output::PackOutput;

/// Release service reported to templates
const RELEASE_SERVICE: &str = "Sherpack";

fn create_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    filters::register(&mut env);

    env
}

impl PackOutput {
    /// Render every template for a release with the default values
    ///
    /// Returns file name → rendered manifests, in template order.
    pub fn preview(&self, release: &str, namespace: &str) -> Result<IndexMap<String, String>> {
        let mut env = create_environment();
        env.add_template_owned(HELPERS_FILE.to_string(), HELPERS.to_string())
            .map_err(|e| ProcessError::render(HELPERS_FILE, e))?;
        for (filename, source) in self.templates() {
            env.add_template_owned(filename.clone(), source.clone())
                .map_err(|e| ProcessError::render(filename.as_str(), e))?;
        }

        let metadata = &self.pack().metadata;
        let values = Value::from_serialize(self.values());
        let release = context! {
            name => release,
            namespace => namespace,
            service => RELEASE_SERVICE,
        };
        let pack = Value::from_serialize(serde_json::json!({
            "name": metadata.name,
            "version": metadata.version.to_string(),
            "appVersion": metadata.app_version,
        }));

        // Helpers run in their own module scope
        env.add_global("values", values.clone());
        env.add_global("release", release.clone());
        env.add_global("pack", pack.clone());
        let ctx = context! { values => values, release => release, pack => pack };

        let mut rendered = IndexMap::new();
        for filename in self.templates().keys() {
            let text = env
                .get_template(filename)
                .and_then(|tmpl| tmpl.render(&ctx))
                .map_err(|e| ProcessError::render(filename.as_str(), e))?;
            rendered.insert(filename.clone(), text);
        }
        Ok(rendered)
    }

    /// Render the pack and parse every document, returning the document count
    pub fn check(&self, release: &str, namespace: &str) -> Result<usize> {
        let mut documents = 0;
        for (filename, text) in self.preview(release, namespace)? {
            for document in serde_yaml::Deserializer::from_str(&text) {
                let value = serde_yaml::Value::deserialize(document).map_err(|source| {
                    ProcessError::InvalidOutput {
                        template: filename.clone(),
                        source,
                    }
                })?;
                if !value.is_null() {
                    documents += 1;
                }
            }
        }
        Ok(documents)
    }
}

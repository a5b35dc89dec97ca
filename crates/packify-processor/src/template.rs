//! Template artifacts produced by processors

use minijinja::Environment;
use packify_core::Values;
use std::sync::LazyLock;

use crate::error::{ProcessError, Result};

/// Environment used to fill processor skeletons
///
/// Bound data is inserted as-is, so the Sherpack expressions it carries
/// survive into the generated template untouched.
static SKELETONS: LazyLock<Environment<'static>> = LazyLock::new(Environment::new);

/// Skeleton shared by processors that emit the object metadata followed by
/// the rest of the object
pub const META_AND_BODY: &str = "{{ meta }}
{%- if body %}
{{ body }}
{%- endif %}";

/// A skeleton and the data filling it
#[derive(Debug, Clone)]
pub struct Body {
    skeleton: &'static str,
    data: minijinja::Value,
}

impl Body {
    pub fn new(skeleton: &'static str, data: minijinja::Value) -> Self {
        Self { skeleton, data }
    }

    /// Fill the skeleton; `name` only labels errors
    pub fn render(&self, name: &str) -> Result<String> {
        SKELETONS
            .render_str(self.skeleton, &self.data)
            .map(|text| format!("{}\n", text.trim_end()))
            .map_err(|e| ProcessError::render(name, e))
    }
}

/// One generated template file and the values it reads
#[derive(Debug, Clone)]
pub struct Template {
    filename: String,
    values: Values,
    body: Body,
}

impl Template {
    pub fn new(filename: impl Into<String>, values: Values, body: Body) -> Self {
        Self {
            filename: filename.into(),
            values,
            body,
        }
    }

    /// File name under `templates/`
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Values fragment extracted from the resource
    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn render(&self) -> Result<String> {
        self.body.render(&self.filename)
    }

    pub fn into_parts(self) -> (String, Values, Body) {
        (self.filename, self.values, self.body)
    }
}

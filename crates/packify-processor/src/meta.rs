//! Object metadata and the shared fragments built from it

use packify_core::expr::{self, MACRO_LABELS, MACRO_SELECTOR_LABELS};
use packify_core::path::{self, type_name};
use packify_core::{AppMetadata, PathError, Resource};
use serde_yaml::{Mapping, Value};

use crate::error::Result;
use crate::{refs, yaml};

/// Metadata populated by the API server, never written into templates
pub const SERVER_FIELDS: &[&str] = &[
    "uid",
    "resourceVersion",
    "creationTimestamp",
    "deletionTimestamp",
    "deletionGracePeriodSeconds",
    "generation",
    "managedFields",
    "ownerReferences",
    "selfLink",
];

/// Annotations written by client tooling or controllers
const TOOLING_ANNOTATIONS: &[&str] = &[
    "kubectl.kubernetes.io/last-applied-configuration",
    "deployment.kubernetes.io/revision",
];

/// Metadata block of a templated object
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    api_version: String,
    kind: String,
    name: Value,
    labels: Mapping,
    annotations: Mapping,
    extra: Mapping,
}

impl ObjectMeta {
    /// Templated metadata for `resource`
    ///
    /// The name goes through the naming service, the namespace is dropped
    /// (objects are installed into the release namespace) and so is
    /// everything the server fills in.
    pub fn from_resource(meta: &AppMetadata, resource: &Resource) -> Result<Self> {
        let labels = resource.labels()?.cloned().unwrap_or_default();
        let mut annotations = resource.annotations()?.cloned().unwrap_or_default();
        for key in TOOLING_ANNOTATIONS {
            annotations.remove(*key);
        }

        let mut extra = path::get_mapping(resource.tree(), &["metadata"])?
            .cloned()
            .unwrap_or_default();
        for key in ["name", "namespace", "labels", "annotations"]
            .iter()
            .chain(SERVER_FIELDS)
        {
            extra.remove(*key);
        }

        Ok(Self {
            api_version: resource.gvk().api_version(),
            kind: resource.kind().to_string(),
            name: refs::templated_node(resource.name(), meta.templated_name(resource.name())),
            labels,
            annotations,
            extra,
        })
    }

    pub fn annotations_mut(&mut self) -> &mut Mapping {
        &mut self.annotations
    }

    /// Render `apiVersion`, `kind` and `metadata` with the pack labels added
    pub fn render(&self) -> Result<String> {
        let mut head = Mapping::new();
        head.insert("apiVersion".into(), self.api_version.clone().into());
        head.insert("kind".into(), self.kind.clone().into());

        let mut name = Mapping::new();
        name.insert("name".into(), self.name.clone());

        let mut out = yaml::to_block(&head, 0)?;
        out.push_str("\nmetadata:\n");
        out.push_str(&yaml::to_block(&name, 2)?);
        out.push_str("\n  labels:\n");
        out.push_str(&labels_block(&self.labels, MACRO_LABELS, 4)?);
        if !self.annotations.is_empty() {
            out.push_str("\n  annotations:\n");
            out.push_str(&yaml::to_block(&self.annotations, 4)?);
        }
        if !self.extra.is_empty() {
            out.push('\n');
            out.push_str(&yaml::to_block(&self.extra, 2)?);
        }
        Ok(out)
    }
}

/// Top-level fields other than `apiVersion`, `kind`, `metadata` and `status`
pub fn body_fields(resource: &Resource) -> Mapping {
    let mut fields = resource.tree().as_mapping().cloned().unwrap_or_default();
    for key in ["apiVersion", "kind", "metadata", "status"] {
        fields.remove(key);
    }
    fields
}

/// Labels at `indent` followed by a helper macro spliced in at the same depth
pub fn labels_block(labels: &Mapping, macro_name: &str, indent: usize) -> Result<String> {
    let call = format!("{}{}", " ".repeat(indent), expr::nindent_macro(macro_name, indent));
    if labels.is_empty() {
        return Ok(call);
    }
    Ok(format!("{}\n{}", yaml::to_block(labels, indent)?, call))
}

/// Label selector with the pack's selector labels merged into `matchLabels`
///
/// `indent` is the depth of the selector's own keys.
pub fn selector_block(selector: Option<&Value>, indent: usize) -> Result<String> {
    let mut selector = match selector {
        None | Some(Value::Null) => Mapping::new(),
        Some(Value::Mapping(map)) => map.clone(),
        Some(other) => {
            return Err(PathError::TypeMismatch {
                path: "spec.selector".to_string(),
                expected: "mapping",
                found: type_name(other),
            }
            .into());
        }
    };

    let match_labels = match selector.remove("matchLabels") {
        None | Some(Value::Null) => Mapping::new(),
        Some(Value::Mapping(map)) => map,
        Some(other) => {
            return Err(PathError::TypeMismatch {
                path: "spec.selector.matchLabels".to_string(),
                expected: "mapping",
                found: type_name(&other),
            }
            .into());
        }
    };

    let pad = " ".repeat(indent);
    let mut out = format!("{pad}matchLabels:\n");
    out.push_str(&labels_block(&match_labels, MACRO_SELECTOR_LABELS, indent + 2)?);
    if !selector.is_empty() {
        out.push('\n');
        out.push_str(&yaml::to_block(&selector, indent)?);
    }
    Ok(out)
}

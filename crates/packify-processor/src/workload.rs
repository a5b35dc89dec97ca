//! Deployment, StatefulSet and DaemonSet processing

use minijinja::context;
use packify_core::path::{self, type_name};
use packify_core::{AppMetadata, GroupVersionKind, PathError, Resource, Values};
use serde_yaml::{Mapping, Value};

use crate::dispatch::Processor;
use crate::error::Result;
use crate::meta::{ObjectMeta, selector_block};
use crate::pod::Pod;
use crate::refs;
use crate::template::{Body, Template};
use crate::yaml;

const WORKLOAD_SKELETON: &str = "{{ meta }}
spec:
{%- if replicas %}
{{ replicas }}
{%- endif %}
  selector:
{{ selector }}
{%- if extra %}
{{ extra }}
{%- endif %}
  template:
    metadata:
      labels:
{{ pod_labels }}
{%- if pod_annotations %}
{{ pod_annotations }}
{%- endif %}
    spec:
{{ spec }}";

/// Spec fields rendered by the skeleton itself
const SKELETON_FIELDS: &[&str] = &["replicas", "selector", "template"];

/// Workload kinds sharing the pod template layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        }
    }

    fn has_replicas(&self) -> bool {
        !matches!(self, WorkloadKind::DaemonSet)
    }

    fn filename(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment.yaml",
            WorkloadKind::StatefulSet => "statefulset.yaml",
            WorkloadKind::DaemonSet => "daemonset.yaml",
        }
    }
}

/// Processor for `apps/v1` workloads
#[derive(Debug, Clone)]
pub struct Workload {
    kind: WorkloadKind,
    gvk: GroupVersionKind,
}

impl Workload {
    pub fn new(kind: WorkloadKind) -> Self {
        Self {
            kind,
            gvk: GroupVersionKind::new("apps", "v1", kind.kind()),
        }
    }

    pub fn deployment() -> Self {
        Self::new(WorkloadKind::Deployment)
    }

    pub fn stateful_set() -> Self {
        Self::new(WorkloadKind::StatefulSet)
    }

    pub fn daemon_set() -> Self {
        Self::new(WorkloadKind::DaemonSet)
    }

    fn replicas(&self, spec: &Value, key: &str, values: &mut Values) -> Result<String> {
        if !self.kind.has_replicas() {
            return Ok(String::new());
        }
        match path::get_opt(spec, &["replicas"])? {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => match n.as_i64() {
                Some(count) => {
                    let expression = values.add(count, &[key, "replicas"])?;
                    Ok(format!("  replicas: {expression}"))
                }
                None => Err(PathError::TypeMismatch {
                    path: "spec.replicas".to_string(),
                    expected: "integer that fits in 64 bits",
                    found: "number",
                }
                .into()),
            },
            Some(other) => Err(PathError::TypeMismatch {
                path: "spec.replicas".to_string(),
                expected: "integer",
                found: type_name(other),
            }
            .into()),
        }
    }

    /// Spec fields other than replicas, selector and template
    fn extra(&self, meta: &AppMetadata, spec: &Value) -> Result<String> {
        let mut extra = spec.as_mapping().cloned().unwrap_or_else(Mapping::new);
        for field in SKELETON_FIELDS {
            extra.remove(*field);
        }
        if extra.is_empty() {
            return Ok(String::new());
        }

        let mut extra = Value::Mapping(extra);
        if self.kind == WorkloadKind::StatefulSet {
            refs::template_names(&mut extra, &["serviceName"], meta)?;
        }
        yaml::to_block(&extra, 2)
    }
}

impl Processor for Workload {
    fn name(&self) -> &'static str {
        match self.kind {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::StatefulSet => "statefulset",
            WorkloadKind::DaemonSet => "daemonset",
        }
    }

    fn matches(&self, gvk: &GroupVersionKind) -> bool {
        *gvk == self.gvk
    }

    fn process(&self, meta: &AppMetadata, resource: &Resource) -> Result<Template> {
        let spec = resource.field(&["spec"])?.ok_or_else(|| PathError::NotFound {
            path: "spec".to_string(),
        })?;
        if !spec.is_mapping() {
            return Err(PathError::TypeMismatch {
                path: "spec".to_string(),
                expected: "mapping",
                found: type_name(spec),
            }
            .into());
        }

        let key = meta.values_key(resource.name())?;
        let mut values = Values::new();

        let object_meta = ObjectMeta::from_resource(meta, resource)?.render()?;
        let replicas = self.replicas(spec, &key, &mut values)?;
        let selector = selector_block(path::get_opt(spec, &["selector"])?, 4)?;
        let extra = self.extra(meta, spec)?;

        let template = path::get(spec, &["template"])?;
        if !template.is_mapping() {
            return Err(PathError::TypeMismatch {
                path: "spec.template".to_string(),
                expected: "mapping",
                found: type_name(template),
            }
            .into());
        }
        let pod = Pod::new(meta, &key);
        let (pod_labels, pod_annotations) = pod.object_meta(template)?;
        let pod_spec = path::get(template, &["spec"]).map_err(|_| PathError::NotFound {
            path: "spec.template.spec".to_string(),
        })?;
        let pod_spec = pod.process_spec(pod_spec, &mut values)?;

        let body = Body::new(
            WORKLOAD_SKELETON,
            context! {
                meta => object_meta,
                replicas => replicas,
                selector => selector,
                extra => extra,
                pod_labels => pod_labels,
                pod_annotations => pod_annotations,
                spec => yaml::to_block(&pod_spec, 6)?,
            },
        );

        Ok(Template::new(self.kind.filename(), values, body))
    }
}

//! Pod template processing shared by the workload kinds
//!
//! Container images and resource quantities move into values, references
//! to other pack resources (config maps, secrets, claims, service accounts)
//! go through the naming service, and every container learns the cluster
//! domain through an environment variable.

use packify_core::expr::{self, MACRO_SELECTOR_LABELS};
use packify_core::path::{self, type_name};
use packify_core::{AppMetadata, PathError, Values, lower_camel};
use serde_yaml::{Mapping, Value};

use crate::error::{ProcessError, Result};
use crate::meta::labels_block;
use crate::refs;
use crate::yaml;

/// Environment variable carrying the cluster domain into every container
pub const CLUSTER_DOMAIN_ENV: &str = "KUBERNETES_CLUSTER_DOMAIN";

pub use packify_core::values::CLUSTER_DOMAIN_KEY;

pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";

const POD_NAME_REFS: &[&str] = &[
    "serviceAccountName",
    "serviceAccount",
    "imagePullSecrets[]/name",
    "volumes[]/configMap/name",
    "volumes[]/secret/secretName",
    "volumes[]/projected/sources[]/configMap/name",
    "volumes[]/projected/sources[]/secret/name",
    "volumes[]/persistentVolumeClaim/claimName",
];

const CONTAINER_NAME_REFS: &[&str] = &[
    "env[]/valueFrom/secretKeyRef/name",
    "env[]/valueFrom/configMapKeyRef/name",
    "envFrom[]/secretRef/name",
    "envFrom[]/configMapRef/name",
];

const RESOURCE_SECTIONS: &[&str] = &["requests", "limits"];

/// Pod template of one workload
pub struct Pod<'a> {
    meta: &'a AppMetadata,
    /// Values key of the owning workload
    key: &'a str,
}

impl<'a> Pod<'a> {
    pub fn new(meta: &'a AppMetadata, key: &'a str) -> Self {
        Self { meta, key }
    }

    /// Labels and annotations of the pod template, at the template's depth
    ///
    /// Returns the labels block (with the selector labels spliced in) and
    /// the annotations section, which is empty when there are none.
    pub fn object_meta(&self, template: &Value) -> Result<(String, String)> {
        let labels = path::get_mapping(template, &["metadata", "labels"])?
            .cloned()
            .unwrap_or_default();
        let labels = labels_block(&labels, MACRO_SELECTOR_LABELS, 8)?;

        let annotations = match path::get_mapping(template, &["metadata", "annotations"])? {
            Some(map) if !map.is_empty() => {
                format!("      annotations:\n{}", yaml::to_block(map, 8)?)
            }
            _ => String::new(),
        };

        Ok((labels, annotations))
    }

    /// Rewritten copy of the pod spec
    pub fn process_spec(&self, spec: &Value, values: &mut Values) -> Result<Value> {
        if !spec.is_mapping() {
            return Err(PathError::TypeMismatch {
                path: "spec.template.spec".to_string(),
                expected: "mapping",
                found: type_name(spec),
            }
            .into());
        }
        let mut spec = spec.clone();

        self.process_containers(&mut spec, "containers", true, values)?;
        self.process_containers(&mut spec, "initContainers", false, values)?;
        refs::template_names(&mut spec, POD_NAME_REFS, self.meta)?;

        Ok(spec)
    }

    fn process_containers(
        &self,
        spec: &mut Value,
        field: &str,
        required: bool,
        values: &mut Values,
    ) -> Result<()> {
        match spec.get_mut(field) {
            None | Some(Value::Null) if required => Err(PathError::NotFound {
                path: format!("spec.template.spec.{field}"),
            }
            .into()),
            None | Some(Value::Null) => Ok(()),
            Some(Value::Sequence(containers)) => {
                for container in containers {
                    self.process_container(container, values)?;
                }
                Ok(())
            }
            Some(other) => Err(PathError::TypeMismatch {
                path: format!("spec.template.spec.{field}"),
                expected: "sequence",
                found: type_name(other),
            }
            .into()),
        }
    }

    fn process_container(&self, container: &mut Value, values: &mut Values) -> Result<()> {
        if !container.is_mapping() {
            return Err(PathError::TypeMismatch {
                path: "container".to_string(),
                expected: "mapping",
                found: type_name(container),
            }
            .into());
        }

        let name = path::get_str(container, &["name"])?
            .ok_or_else(|| PathError::NotFound {
                path: "container.name".to_string(),
            })?
            .to_string();
        let container_key = lower_camel(&name);

        let image = path::get_str(container, &["image"])?
            .ok_or_else(|| PathError::NotFound {
                path: format!("container '{name}'.image"),
            })?
            .to_string();
        let image = self.process_image(&image, &container_key, values)?;
        path::set(container, &["image"], expr::node(image))?;

        self.process_resources(container, &container_key, values)?;
        refs::template_names(container, CONTAINER_NAME_REFS, self.meta)?;
        add_cluster_domain(container, values)?;
        Ok(())
    }

    fn process_image(&self, image: &str, container_key: &str, values: &mut Values) -> Result<String> {
        let (repository, tag) = split_image(image)?;
        let repository_path = [self.key, container_key, "image", "repository"];
        let tag_path = [self.key, container_key, "image", "tag"];

        values.add(repository, &repository_path)?;
        values.add(tag, &tag_path)?;

        Ok(format!(
            "{{{{ {} }}}}:{{{{ {} or pack.appVersion }}}}",
            expr::values_ref(&repository_path),
            expr::values_ref(&tag_path)
        ))
    }

    fn process_resources(&self, container: &mut Value, container_key: &str, values: &mut Values) -> Result<()> {
        let resources = match container.get_mut("resources") {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Mapping(resources)) => resources,
            Some(other) => {
                return Err(PathError::TypeMismatch {
                    path: "resources".to_string(),
                    expected: "mapping",
                    found: type_name(other),
                }
                .into());
            }
        };

        for section in RESOURCE_SECTIONS {
            let quantities = match resources.get_mut(*section) {
                None | Some(Value::Null) => continue,
                Some(Value::Mapping(quantities)) => quantities,
                Some(other) => {
                    return Err(PathError::TypeMismatch {
                        path: format!("resources.{section}"),
                        expected: "mapping",
                        found: type_name(other),
                    }
                    .into());
                }
            };

            for (resource, quantity) in quantities.iter_mut() {
                let Some(resource) = resource.as_str() else {
                    return Err(PathError::TypeMismatch {
                        path: format!("resources.{section}"),
                        expected: "string key",
                        found: type_name(resource),
                    }
                    .into());
                };
                let value = serde_json::to_value(&*quantity)?;
                let expression = values.add(
                    value,
                    &[self.key, container_key, "resources", *section, resource],
                )?;
                *quantity = expr::node(expression);
            }
        }
        Ok(())
    }
}

/// Split an image reference into repository and tag at the last `:`
///
/// An untagged reference behind a registry port (`localhost:5000/app`)
/// splits at the port. Joining the halves with `:` always gives the
/// original reference back, which is what the template does.
pub fn split_image(image: &str) -> Result<(&str, &str)> {
    let malformed = || ProcessError::MalformedImage {
        image: image.to_string(),
    };

    let separator = image.rfind(':').ok_or_else(malformed)?;
    let (repository, tag) = (&image[..separator], &image[separator + 1..]);
    if repository.is_empty() || tag.is_empty() {
        return Err(malformed());
    }
    Ok((repository, tag))
}

fn add_cluster_domain(container: &mut Value, values: &mut Values) -> Result<()> {
    let expression = values.add(DEFAULT_CLUSTER_DOMAIN, &[CLUSTER_DOMAIN_KEY])?;

    if matches!(container.get("env"), None | Some(Value::Null)) {
        path::set(container, &["env"], Value::Sequence(Vec::new()))?;
    }
    let env = match container.get_mut("env") {
        Some(Value::Sequence(env)) => env,
        None => return Ok(()),
        Some(other) => {
            return Err(PathError::TypeMismatch {
                path: "env".to_string(),
                expected: "sequence",
                found: type_name(other),
            }
            .into());
        }
    };

    let present = env
        .iter()
        .any(|var| var.get("name").and_then(Value::as_str) == Some(CLUSTER_DOMAIN_ENV));
    if !present {
        let mut var = Mapping::new();
        var.insert("name".into(), CLUSTER_DOMAIN_ENV.into());
        var.insert("value".into(), expr::node(expression));
        env.push(Value::Mapping(var));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use packify_core::{AppMetadataBuilder, Resource, ValuesError};

    fn meta() -> AppMetadata {
        let mut builder = AppMetadataBuilder::new("my-operator");
        for (kind, name) in [
            ("ConfigMap", "my-operator-config"),
            ("Secret", "my-operator-credentials"),
            ("ServiceAccount", "my-operator-controller-manager"),
        ] {
            builder.load(
                &Resource::from_yaml(&format!(
                    "apiVersion: v1\nkind: {kind}\nmetadata:\n  name: {name}\n"
                ))
                .unwrap(),
            );
        }
        builder.build()
    }

    fn spec(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_split_image() {
        assert_eq!(split_image("repo/name:v1.2.3").unwrap(), ("repo/name", "v1.2.3"));
        assert_eq!(split_image("nginx:1.25").unwrap(), ("nginx", "1.25"));
        assert_eq!(
            split_image("localhost:5000/team/app:2.0").unwrap(),
            ("localhost:5000/team/app", "2.0")
        );
    }

    #[test]
    fn test_split_image_at_registry_port() {
        let image = "localhost:5000/app";
        let (repository, tag) = split_image(image).unwrap();
        assert_eq!((repository, tag), ("localhost", "5000/app"));
        assert_eq!(format!("{repository}:{tag}"), image);
    }

    #[test]
    fn test_split_image_without_tag() {
        for image in ["repo/name", "app:", ":tag"] {
            let err = split_image(image).unwrap_err();
            assert!(
                matches!(err, ProcessError::MalformedImage { .. }),
                "{image} should be rejected"
            );
        }
    }

    #[test]
    fn test_process_spec_images_and_resources() {
        let meta = meta();
        let mut values = Values::new();
        let pod = Pod::new(&meta, "controllerManager");

        let processed = pod
            .process_spec(
                &spec(
                    r#"
containers:
- name: manager
  image: controller:latest
  resources:
    limits:
      cpu: 500m
      memory: 128Mi
    requests:
      cpu: 10m
      nvidia.com/gpu: 1
"#,
                ),
                &mut values,
            )
            .unwrap();

        let container = &processed["containers"][0];
        assert_eq!(
            container["image"],
            "{{ values.controllerManager.manager.image.repository }}:{{ values.controllerManager.manager.image.tag or pack.appVersion }}"
        );
        assert_eq!(
            container["resources"]["limits"]["cpu"],
            "{{ values.controllerManager.manager.resources.limits.cpu | quote }}"
        );
        assert_eq!(
            container["resources"]["requests"]["nvidia.com/gpu"],
            r#"{{ values.controllerManager.manager.resources.requests["nvidia.com/gpu"] }}"#
        );

        let repo = values.get(&["controllerManager", "manager", "image", "repository"]);
        assert_eq!(repo.unwrap(), "controller");
        let tag = values.get(&["controllerManager", "manager", "image", "tag"]);
        assert_eq!(tag.unwrap(), "latest");
        let memory = values.get(&["controllerManager", "manager", "resources", "limits", "memory"]);
        assert_eq!(memory.unwrap(), "128Mi");
        assert_eq!(values.get(&[CLUSTER_DOMAIN_KEY]).unwrap(), DEFAULT_CLUSTER_DOMAIN);
    }

    #[test]
    fn test_process_spec_rewrites_references() {
        let meta = meta();
        let mut values = Values::new();
        let processed = Pod::new(&meta, "api")
            .process_spec(
                &spec(
                    r#"
serviceAccountName: my-operator-controller-manager
containers:
- name: api
  image: api:1.0
  env:
  - name: PASSWORD
    valueFrom:
      secretKeyRef:
        name: my-operator-credentials
        key: password
  envFrom:
  - configMapRef:
      name: my-operator-config
volumes:
- name: config
  configMap:
    name: my-operator-config
- name: external
  secret:
    secretName: not-in-pack
"#,
                ),
                &mut values,
            )
            .unwrap();

        assert_eq!(
            processed["serviceAccountName"],
            r#"{{ fullname("controller-manager") }}"#
        );
        let container = &processed["containers"][0];
        assert_eq!(
            container["env"][0]["valueFrom"]["secretKeyRef"]["name"],
            r#"{{ fullname("credentials") }}"#
        );
        assert_eq!(
            container["envFrom"][0]["configMapRef"]["name"],
            r#"{{ fullname("config") }}"#
        );
        assert_eq!(processed["volumes"][0]["configMap"]["name"], r#"{{ fullname("config") }}"#);
        assert_eq!(processed["volumes"][1]["secret"]["secretName"], "not-in-pack");
    }

    #[test]
    fn test_cluster_domain_env_appended_once() {
        let meta = meta();
        let mut values = Values::new();
        let pod_spec = spec(
            "containers:\n- name: a\n  image: a:1\n  env:\n  - name: KUBERNETES_CLUSTER_DOMAIN\n    value: example.org\n- name: b\n  image: b:1\n",
        );
        let processed = Pod::new(&meta, "app").process_spec(&pod_spec, &mut values).unwrap();

        let first = processed["containers"][0]["env"].as_sequence().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["value"], "example.org");

        let second = processed["containers"][1]["env"].as_sequence().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0]["name"], CLUSTER_DOMAIN_ENV);
        assert_eq!(second[0]["value"], "{{ values.kubernetesClusterDomain | quote }}");
    }

    #[test]
    fn test_init_containers_are_processed() {
        let meta = meta();
        let mut values = Values::new();
        let pod_spec = spec(
            "containers:\n- name: app\n  image: app:1\ninitContainers:\n- name: migrate\n  image: migrate:2\n",
        );
        Pod::new(&meta, "web").process_spec(&pod_spec, &mut values).unwrap();
        assert_eq!(values.get(&["web", "migrate", "image", "tag"]).unwrap(), "2");
    }

    #[test]
    fn test_original_spec_untouched() {
        let meta = meta();
        let mut values = Values::new();
        let pod_spec = spec("containers:\n- name: app\n  image: app:1\n");
        let before = pod_spec.clone();
        Pod::new(&meta, "web").process_spec(&pod_spec, &mut values).unwrap();
        assert_eq!(pod_spec, before);
    }

    #[test]
    fn test_missing_containers() {
        let meta = meta();
        let err = Pod::new(&meta, "web")
            .process_spec(&spec("volumes: []\n"), &mut Values::new())
            .unwrap_err();
        assert!(matches!(err, ProcessError::Shape(PathError::NotFound { .. })));
    }

    #[test]
    fn test_container_name_collision() {
        let meta = meta();
        let err = Pod::new(&meta, "web")
            .process_spec(
                &spec("containers:\n- name: app\n  image: app:1\n- name: app\n  image: app:2\n"),
                &mut Values::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ProcessError::Values(ValuesError::Collision { .. })));
    }

    #[test]
    fn test_pod_object_meta() {
        let meta = meta();
        let template = spec("metadata:\n  labels:\n    app: web\n  annotations:\n    prometheus.io/scrape: \"true\"\n");
        let (labels, annotations) = Pod::new(&meta, "web").object_meta(&template).unwrap();

        assert_eq!(labels, "        app: web\n        {{- selectorLabels() | nindent(8) }}");
        assert_eq!(annotations, "      annotations:\n        prometheus.io/scrape: 'true'");
    }
}

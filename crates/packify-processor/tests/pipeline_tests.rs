//! End-to-end conversion of manifest bundles

use packify_core::Resource;
use packify_processor::{CancelFlag, Dispatcher, GenerateOptions, Outcome, PackOutput, Pipeline};
use serde::Deserialize;
use std::path::PathBuf;

fn fixtures_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures"))
}

fn load(name: &str) -> Vec<packify_core::Result<Resource>> {
    let text = std::fs::read_to_string(fixtures_path().join(name)).unwrap();
    serde_yaml::Deserializer::from_str(&text)
        .map(|doc| serde_yaml::Value::deserialize(doc).unwrap())
        .filter(|value| !value.is_null())
        .map(Resource::from_value)
        .collect()
}

fn parse(docs: &[&str]) -> Vec<packify_core::Result<Resource>> {
    docs.iter().map(|doc| Resource::from_yaml(doc)).collect()
}

fn run(resources: Vec<packify_core::Result<Resource>>, pack_name: &str) -> PackOutput {
    let pipeline = Pipeline::new(GenerateOptions {
        pack_name: pack_name.to_string(),
        app_version: "1.0.0".to_string(),
        ..Default::default()
    })
    .unwrap();

    match pipeline.run(resources, &CancelFlag::new()).unwrap() {
        Outcome::Completed(output) => output,
        Outcome::Cancelled => panic!("pipeline was cancelled"),
    }
}

fn generate(fixture: &str, pack_name: &str) -> PackOutput {
    run(load(fixture), pack_name)
}

mod two_containers {
    use super::*;

    #[test]
    fn test_values_hold_configurable_fields() {
        let output = generate("two-containers.yaml", "shop");
        let values = output.values();

        assert_eq!(values.get(&["api", "replicas"]).unwrap(), 3);
        assert_eq!(
            values.get(&["api", "api", "image", "repository"]).unwrap(),
            "ghcr.io/x/api"
        );
        assert_eq!(values.get(&["api", "api", "image", "tag"]).unwrap(), "1.0");
        assert_eq!(
            values.get(&["api", "sidecar", "image", "repository"]).unwrap(),
            "ghcr.io/x/sidecar"
        );
        assert_eq!(values.get(&["api", "sidecar", "image", "tag"]).unwrap(), "2.0");
        assert_eq!(
            values
                .get(&["api", "api", "resources", "limits", "cpu"])
                .unwrap(),
            "500m"
        );
        assert_eq!(values.get(&["kubernetesClusterDomain"]).unwrap(), "cluster.local");
    }

    #[test]
    fn test_body_has_no_literal_configuration() {
        let output = generate("two-containers.yaml", "shop");
        let body = output.template("deployment.yaml").unwrap();

        assert!(!body.contains("ghcr.io"));
        assert!(!body.contains("500m"));
        assert!(!body.contains("replicas: 3"));
        assert!(body.contains("replicas: {{ values.api.replicas }}"));
        assert!(body.contains("cpu: {{ values.api.api.resources.limits.cpu | quote }}"));
        assert!(body.contains(
            "image: {{ values.api.api.image.repository }}:{{ values.api.api.image.tag or pack.appVersion }}"
        ));
        assert!(body.contains(
            "image: {{ values.api.sidecar.image.repository }}:{{ values.api.sidecar.image.tag or pack.appVersion }}"
        ));
    }

    #[test]
    fn test_rendered_with_defaults_matches_input() {
        let output = generate("two-containers.yaml", "shop");
        let rendered = output.preview("rel", "prod").unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&rendered["deployment.yaml"]).unwrap();

        assert_eq!(doc["metadata"]["name"], "rel-shop-api");
        assert!(doc["metadata"].get("namespace").is_none());
        assert_eq!(doc["spec"]["replicas"], 3);

        let containers = &doc["spec"]["template"]["spec"]["containers"];
        assert_eq!(containers[0]["image"], "ghcr.io/x/api:1.0");
        assert_eq!(containers[1]["image"], "ghcr.io/x/sidecar:2.0");
        assert_eq!(containers[0]["resources"]["limits"]["cpu"], "500m");

        let selector = &doc["spec"]["selector"]["matchLabels"];
        let pod_labels = &doc["spec"]["template"]["metadata"]["labels"];
        for key in ["app", "app.kubernetes.io/name", "app.kubernetes.io/instance"] {
            assert_eq!(selector[key], pod_labels[key], "{key} differs");
        }
    }
}

mod operator_bundle {
    use super::*;

    #[test]
    fn test_every_kind_has_a_template() {
        let output = generate("operator.yaml", "my-operator");
        let files: Vec<&str> = output.templates().keys().map(String::as_str).collect();

        for expected in [
            "serviceaccount.yaml",
            "role.yaml",
            "clusterrole.yaml",
            "rolebinding.yaml",
            "clusterrolebinding.yaml",
            "configmap.yaml",
            "secret.yaml",
            "service.yaml",
            "deployment.yaml",
            "issuer.yaml",
            "certificate.yaml",
            "validatingwebhookconfiguration.yaml",
        ] {
            assert!(files.contains(&expected), "missing {expected}");
        }
        assert!(!files.contains(&"namespace.yaml"));
    }

    #[test]
    fn test_shared_name_renders_identically() {
        let output = generate("operator.yaml", "my-operator");
        let expression = "{{ fullname(\"webhook-cert\") }}";

        for file in ["deployment.yaml", "certificate.yaml", "secret.yaml", "clusterrole.yaml"] {
            assert!(
                output.template(file).unwrap().contains(expression),
                "{file} does not reference the secret through the naming service"
            );
        }
        for source in output.templates().values() {
            assert!(!source.contains("my-operator-webhook-cert"));
        }
    }

    #[test]
    fn test_namespaces_follow_the_release() {
        let output = generate("operator.yaml", "my-operator");
        for (file, source) in output.templates() {
            assert!(!source.contains("my-operator-system"), "{file} keeps the namespace");
        }
    }

    #[test]
    fn test_values_are_disjoint_per_container() {
        let output = generate("operator.yaml", "my-operator");
        let values = output.values();

        assert_eq!(
            values
                .get(&["controllerManager", "kubeRbacProxy", "image", "repository"])
                .unwrap(),
            "gcr.io/kubebuilder/kube-rbac-proxy"
        );
        assert_eq!(
            values
                .get(&["controllerManager", "manager", "image", "tag"])
                .unwrap(),
            "latest"
        );
        for container in ["kubeRbacProxy", "manager"] {
            assert_eq!(
                values
                    .get(&["controllerManager", container, "resources", "limits", "cpu"])
                    .unwrap(),
                "500m"
            );
        }
    }

    #[test]
    fn test_renders_to_valid_manifests() {
        let output = generate("operator.yaml", "my-operator");
        assert_eq!(output.check("rel", "prod").unwrap(), 13);

        let rendered = output.preview("rel", "prod").unwrap();
        let cert: serde_yaml::Value = serde_yaml::from_str(&rendered["certificate.yaml"]).unwrap();
        assert_eq!(cert["spec"]["secretName"], "rel-my-operator-webhook-cert");
        assert_eq!(
            cert["spec"]["dnsNames"][0],
            "rel-my-operator-webhook-service.prod.svc"
        );
        assert_eq!(cert["spec"]["issuerRef"]["name"], "rel-my-operator-selfsigned-issuer");

        let webhook: serde_yaml::Value =
            serde_yaml::from_str(&rendered["validatingwebhookconfiguration.yaml"]).unwrap();
        assert_eq!(
            webhook["metadata"]["annotations"]["cert-manager.io/inject-ca-from"],
            "prod/rel-my-operator-serving-cert"
        );
        assert_eq!(
            webhook["webhooks"][0]["clientConfig"]["service"]["name"],
            "rel-my-operator-webhook-service"
        );
    }

    #[test]
    fn test_secret_payload_in_values() {
        let output = generate("operator.yaml", "my-operator");
        assert_eq!(output.values().get(&["webhookCert", "caCrt"]).unwrap(), "");

        let rendered = output.preview("rel", "prod").unwrap();
        let secret: serde_yaml::Value = serde_yaml::from_str(&rendered["secret.yaml"]).unwrap();
        assert_eq!(secret["stringData"]["ca.crt"], "");
    }

    #[test]
    fn test_runs_are_deterministic() {
        let first = generate("operator.yaml", "my-operator");
        let second = generate("operator.yaml", "my-operator");

        assert_eq!(first.templates(), second.templates());
        assert_eq!(first.values(), second.values());
    }

    #[test]
    fn test_fallback_only_dispatcher() {
        let pipeline = Pipeline::new(GenerateOptions {
            pack_name: "my-operator".to_string(),
            ..Default::default()
        })
        .unwrap()
        .with_dispatcher(Dispatcher::new());

        let Outcome::Completed(output) = pipeline
            .run(load("operator.yaml"), &CancelFlag::new())
            .unwrap()
        else {
            panic!("pipeline was cancelled");
        };

        assert!(output.values().is_empty());
        let deployment = output.template("deployment.yaml").unwrap();
        assert!(deployment.contains("gcr.io/kubebuilder/kube-rbac-proxy:v0.13.1"));
        assert!(deployment.contains("name: {{ fullname(\"controller-manager\") }}"));
    }
}

mod literal_text {
    use super::*;

    #[test]
    fn test_template_syntax_in_data_survives_rendering() {
        let output = run(
            parse(&[r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: alerts-rules
data:
  rule: 'summary: {{ $labels.instance }} down'
  tmpl: '{{ greeting }}'
  block: |
    {% if enabled %}on{% endif %}
    {# note #} {{{ braces
"#]),
            "alerts",
        );

        assert_eq!(output.check("rel", "prod").unwrap(), 1);

        let rendered = output.preview("rel", "prod").unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&rendered["configmap.yaml"]).unwrap();
        assert_eq!(doc["data"]["rule"], "summary: {{ $labels.instance }} down");
        assert_eq!(doc["data"]["tmpl"], "{{ greeting }}");
        assert_eq!(
            doc["data"]["block"],
            "{% if enabled %}on{% endif %}\n{# note #} {{{ braces\n"
        );
    }

    #[test]
    fn test_template_syntax_in_annotations_survives_rendering() {
        let output = run(
            parse(&[r#"
apiVersion: v1
kind: Service
metadata:
  name: web
  annotations:
    docs: "{{ not a value }}"
spec:
  ports:
  - port: 80
"#]),
            "web",
        );

        let rendered = output.preview("rel", "prod").unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&rendered["service.yaml"]).unwrap();
        assert_eq!(doc["metadata"]["annotations"]["docs"], "{{ not a value }}");
    }
}

mod images {
    use super::*;

    fn deployment(image: &str) -> String {
        format!(
            r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
      - name: web
        image: {image}
"#
        )
    }

    #[test]
    fn test_images_render_back_unchanged() {
        for image in [
            "registry.local:5000/team/web",
            "registry.local:5000/team/web:1.4",
            "nginx:1.25",
        ] {
            let output = run(parse(&[deployment(image).as_str()]), "web");
            let rendered = output.preview("rel", "prod").unwrap();
            let doc: serde_yaml::Value =
                serde_yaml::from_str(&rendered["deployment.yaml"]).unwrap();
            assert_eq!(
                doc["spec"]["template"]["spec"]["containers"][0]["image"],
                image,
                "{image}"
            );
        }
    }
}

//! Processors for kinds that only need their references templated
//!
//! Nothing is moved into values. Each processor is a table of the fields
//! holding names of other pack resources, namespaces, or in-cluster host
//! names.

use minijinja::context;
use packify_core::expr::MACRO_SELECTOR_LABELS;
use packify_core::path::type_name;
use packify_core::{AppMetadata, GroupVersionKind, PathError, Resource, Values};
use serde_yaml::{Mapping, Value};

use crate::dispatch::Processor;
use crate::error::Result;
use crate::meta::{ObjectMeta, body_fields, labels_block};
use crate::refs;
use crate::template::{Body, META_AND_BODY, Template};
use crate::yaml;

const CORE: &str = "";
const RBAC: &str = "rbac.authorization.k8s.io";
const CERT_MANAGER: &str = "cert-manager.io";
const ADMISSION: &str = "admissionregistration.k8s.io";
const NETWORKING: &str = "networking.k8s.io";

/// Annotation asking cert-manager to inject a CA bundle from a certificate
pub const INJECT_CA_FROM: &str = "cert-manager.io/inject-ca-from";

/// Table-driven pass-through processor
#[derive(Debug, Clone)]
pub struct Simple {
    name: &'static str,
    group: &'static str,
    kind: &'static str,
    filename: &'static str,
    /// Fields holding names of other resources
    names: &'static [&'static str],
    /// Fields holding namespaces
    namespaces: &'static [&'static str],
    /// Fields holding `<service>.<namespace>.svc` host names
    hosts: &'static [&'static str],
    /// `spec.selector` is a label map selecting the pack's pods
    pod_selector: bool,
    /// Drop the server-assigned cluster IPs of non-headless services
    strip_cluster_ip: bool,
    /// Rewrite the cert-manager CA injection annotation
    inject_ca: bool,
}

impl Simple {
    const fn base(
        name: &'static str,
        group: &'static str,
        kind: &'static str,
        filename: &'static str,
    ) -> Self {
        Self {
            name,
            group,
            kind,
            filename,
            names: &[],
            namespaces: &[],
            hosts: &[],
            pod_selector: false,
            strip_cluster_ip: false,
            inject_ca: false,
        }
    }

    pub fn service() -> Self {
        Self {
            pod_selector: true,
            strip_cluster_ip: true,
            ..Self::base("service", CORE, "Service", "service.yaml")
        }
    }

    pub fn service_account() -> Self {
        Self {
            names: &["secrets[]/name", "imagePullSecrets[]/name"],
            ..Self::base("serviceaccount", CORE, "ServiceAccount", "serviceaccount.yaml")
        }
    }

    pub fn ingress() -> Self {
        Self {
            names: &[
                "spec/defaultBackend/service/name",
                "spec/rules[]/http/paths[]/backend/service/name",
                "spec/tls[]/secretName",
            ],
            ..Self::base("ingress", NETWORKING, "Ingress", "ingress.yaml")
        }
    }

    pub fn cluster_role() -> Self {
        Self {
            names: &["rules[]/resourceNames[]"],
            ..Self::base("clusterrole", RBAC, "ClusterRole", "clusterrole.yaml")
        }
    }

    pub fn role() -> Self {
        Self {
            names: &["rules[]/resourceNames[]"],
            ..Self::base("role", RBAC, "Role", "role.yaml")
        }
    }

    pub fn cluster_role_binding() -> Self {
        Self {
            names: &["roleRef/name", "subjects[]/name"],
            namespaces: &["subjects[]/namespace"],
            ..Self::base(
                "clusterrolebinding",
                RBAC,
                "ClusterRoleBinding",
                "clusterrolebinding.yaml",
            )
        }
    }

    pub fn role_binding() -> Self {
        Self {
            names: &["roleRef/name", "subjects[]/name"],
            namespaces: &["subjects[]/namespace"],
            ..Self::base("rolebinding", RBAC, "RoleBinding", "rolebinding.yaml")
        }
    }

    pub fn issuer() -> Self {
        Self {
            names: &["spec/ca/secretName"],
            ..Self::base("issuer", CERT_MANAGER, "Issuer", "issuer.yaml")
        }
    }

    pub fn certificate() -> Self {
        Self {
            names: &["spec/issuerRef/name", "spec/secretName"],
            hosts: &["spec/dnsNames[]"],
            ..Self::base("certificate", CERT_MANAGER, "Certificate", "certificate.yaml")
        }
    }

    pub fn validating_webhook() -> Self {
        Self {
            names: &["webhooks[]/clientConfig/service/name"],
            namespaces: &["webhooks[]/clientConfig/service/namespace"],
            inject_ca: true,
            ..Self::base(
                "validatingwebhook",
                ADMISSION,
                "ValidatingWebhookConfiguration",
                "validatingwebhookconfiguration.yaml",
            )
        }
    }

    pub fn mutating_webhook() -> Self {
        Self {
            names: &["webhooks[]/clientConfig/service/name"],
            namespaces: &["webhooks[]/clientConfig/service/namespace"],
            inject_ca: true,
            ..Self::base(
                "mutatingwebhook",
                ADMISSION,
                "MutatingWebhookConfiguration",
                "mutatingwebhookconfiguration.yaml",
            )
        }
    }
}

impl Processor for Simple {
    fn name(&self) -> &'static str {
        self.name
    }

    /// Any version of the group and kind
    fn matches(&self, gvk: &GroupVersionKind) -> bool {
        gvk.group == self.group && gvk.kind == self.kind
    }

    fn process(&self, meta: &AppMetadata, resource: &Resource) -> Result<Template> {
        let mut object_meta = ObjectMeta::from_resource(meta, resource)?;
        if self.inject_ca {
            let annotations = object_meta.annotations_mut();
            if let Some(Value::String(reference)) = annotations.get(INJECT_CA_FROM) {
                let templated =
                    refs::templated_node(reference, refs::templated_object_ref(reference, meta));
                annotations.insert(INJECT_CA_FROM.into(), templated);
            }
        }

        let mut tree = Value::Mapping(body_fields(resource));
        refs::template_names(&mut tree, self.names, meta)?;
        refs::template_namespaces(&mut tree, self.namespaces, meta)?;
        refs::template_hosts(&mut tree, self.hosts, meta)?;
        if self.strip_cluster_ip {
            strip_cluster_ip(&mut tree);
        }

        let fields = match tree {
            Value::Mapping(fields) => fields,
            _ => Mapping::new(),
        };
        let body = if self.pod_selector && has_selector(&fields) {
            with_pod_selector(fields)?
        } else if fields.is_empty() {
            String::new()
        } else {
            yaml::to_block(&fields, 0)?
        };

        Ok(Template::new(
            self.filename,
            Values::new(),
            Body::new(
                META_AND_BODY,
                context! {
                    meta => object_meta.render()?,
                    body => body,
                },
            ),
        ))
    }
}

fn strip_cluster_ip(tree: &mut Value) {
    if let Some(Value::Mapping(spec)) = tree.get_mut("spec") {
        let headless = spec.get("clusterIP").and_then(Value::as_str) == Some("None");
        if !headless {
            spec.remove("clusterIP");
            spec.remove("clusterIPs");
        }
    }
}

fn has_selector(fields: &Mapping) -> bool {
    fields
        .get("spec")
        .and_then(|spec| spec.get("selector"))
        .is_some_and(|selector| !selector.is_null())
}

/// Body with `spec.selector` extended by the pack's selector labels
fn with_pod_selector(mut fields: Mapping) -> Result<String> {
    let mut spec = match fields.remove("spec") {
        Some(Value::Mapping(spec)) => spec,
        Some(other) => {
            return Err(PathError::TypeMismatch {
                path: "spec".to_string(),
                expected: "mapping",
                found: type_name(&other),
            }
            .into());
        }
        None => Mapping::new(),
    };
    let selector = match spec.remove("selector") {
        Some(Value::Mapping(selector)) => selector,
        None | Some(Value::Null) => Mapping::new(),
        Some(other) => {
            return Err(PathError::TypeMismatch {
                path: "spec.selector".to_string(),
                expected: "mapping",
                found: type_name(&other),
            }
            .into());
        }
    };

    let mut out = String::new();
    if !fields.is_empty() {
        out.push_str(&yaml::to_block(&fields, 0)?);
        out.push('\n');
    }
    out.push_str("spec:\n");
    if !spec.is_empty() {
        out.push_str(&yaml::to_block(&spec, 2)?);
        out.push('\n');
    }
    out.push_str("  selector:\n");
    out.push_str(&labels_block(&selector, MACRO_SELECTOR_LABELS, 4)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use packify_core::AppMetadataBuilder;

    fn load(yamls: &[&str]) -> (AppMetadata, Vec<Resource>) {
        let resources: Vec<Resource> = yamls
            .iter()
            .map(|y| Resource::from_yaml(y).unwrap())
            .collect();
        let mut builder = AppMetadataBuilder::new("my-operator");
        for res in &resources {
            builder.load(res);
        }
        (builder.build(), resources)
    }

    #[test]
    fn test_service_selector_and_cluster_ip() {
        let (meta, resources) = load(&[r#"
apiVersion: v1
kind: Service
metadata:
  name: my-operator-metrics
  namespace: my-operator-system
spec:
  clusterIP: 10.96.0.12
  clusterIPs: [10.96.0.12]
  ports:
  - name: https
    port: 8443
    targetPort: https
  selector:
    control-plane: controller-manager
"#]);
        let template = Simple::service().process(&meta, &resources[0]).unwrap();
        let body = template.render().unwrap();

        assert_eq!(template.filename(), "service.yaml");
        assert!(template.values().is_empty());
        assert!(!body.contains("clusterIP"));
        assert!(body.ends_with(
            "  selector:\n    control-plane: controller-manager\n    {{- selectorLabels() | nindent(4) }}\n"
        ));
        assert!(body.contains("spec:\n  ports:\n  - name: https"));
    }

    #[test]
    fn test_headless_service_keeps_cluster_ip() {
        let (meta, resources) = load(&[
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: db\nspec:\n  clusterIP: None\n  ports:\n  - port: 5432\n",
        ]);
        let body = Simple::service()
            .process(&meta, &resources[0])
            .unwrap()
            .render()
            .unwrap();

        assert!(body.contains("clusterIP: None"));
        assert!(!body.contains("selectorLabels"));
    }

    #[test]
    fn test_role_binding_references() {
        let (meta, resources) = load(&[
            r#"
apiVersion: rbac.authorization.k8s.io/v1
kind: RoleBinding
metadata:
  name: my-operator-leader-election-rolebinding
  namespace: my-operator-system
roleRef:
  apiGroup: rbac.authorization.k8s.io
  kind: Role
  name: my-operator-leader-election-role
subjects:
- kind: ServiceAccount
  name: my-operator-controller-manager
  namespace: my-operator-system
"#,
            "apiVersion: rbac.authorization.k8s.io/v1\nkind: Role\nmetadata:\n  name: my-operator-leader-election-role\n",
            "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: my-operator-controller-manager\n",
        ]);
        let body = Simple::role_binding()
            .process(&meta, &resources[0])
            .unwrap()
            .render()
            .unwrap();

        assert!(body.contains(r#"  name: {{ fullname("leader-election-role") }}"#));
        assert!(body.contains(r#"  name: {{ fullname("controller-manager") }}"#));
        assert!(body.contains("  namespace: {{ release.namespace }}"));
    }

    #[test]
    fn test_certificate_hosts_and_issuer() {
        let (meta, resources) = load(&[
            r#"
apiVersion: cert-manager.io/v1
kind: Certificate
metadata:
  name: my-operator-serving-cert
  namespace: my-operator-system
spec:
  dnsNames:
  - my-operator-webhook-service.my-operator-system.svc
  - my-operator-webhook-service.my-operator-system.svc.cluster.local
  issuerRef:
    kind: Issuer
    name: my-operator-selfsigned-issuer
  secretName: webhook-server-cert
"#,
            "apiVersion: cert-manager.io/v1\nkind: Issuer\nmetadata:\n  name: my-operator-selfsigned-issuer\nspec:\n  selfSigned: {}\n",
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: my-operator-webhook-service\n",
        ]);
        let body = Simple::certificate()
            .process(&meta, &resources[0])
            .unwrap()
            .render()
            .unwrap();

        assert!(body.contains(
            r#"  - {{ fullname("webhook-service") }}.{{ release.namespace }}.svc"#
        ));
        assert!(body.contains(r#"    name: {{ fullname("selfsigned-issuer") }}"#));
        // the secret is created by cert-manager, not by the pack
        assert!(body.contains("  secretName: webhook-server-cert"));
    }

    #[test]
    fn test_webhook_ca_injection() {
        let (meta, resources) = load(&[
            r#"
apiVersion: admissionregistration.k8s.io/v1
kind: ValidatingWebhookConfiguration
metadata:
  name: my-operator-validating-webhook-configuration
  annotations:
    cert-manager.io/inject-ca-from: my-operator-system/my-operator-serving-cert
webhooks:
- name: vwidget.kb.io
  admissionReviewVersions: [v1]
  clientConfig:
    service:
      name: my-operator-webhook-service
      namespace: my-operator-system
      path: /validate
  sideEffects: None
"#,
            "apiVersion: cert-manager.io/v1\nkind: Certificate\nmetadata:\n  name: my-operator-serving-cert\n  namespace: my-operator-system\n",
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: my-operator-webhook-service\n  namespace: my-operator-system\n",
        ]);
        let body = Simple::validating_webhook()
            .process(&meta, &resources[0])
            .unwrap()
            .render()
            .unwrap();

        assert!(body.contains(
            r#"cert-manager.io/inject-ca-from: {{ release.namespace }}/{{ fullname("serving-cert") }}"#
        ));
        assert!(body.contains(r#"      name: {{ fullname("webhook-service") }}"#));
        assert!(body.contains("      namespace: {{ release.namespace }}"));
    }

    #[test]
    fn test_ingress_backends_and_tls() {
        let (meta, resources) = load(&[
            r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: my-operator-dashboard
spec:
  ingressClassName: nginx
  defaultBackend:
    service:
      name: my-operator-dashboard
      port:
        number: 80
  rules:
  - host: dashboard.example.com
    http:
      paths:
      - path: /
        pathType: Prefix
        backend:
          service:
            name: my-operator-dashboard
            port:
              number: 80
      - path: /auth
        pathType: Prefix
        backend:
          service:
            name: oauth-proxy
            port:
              number: 4180
  tls:
  - hosts: [dashboard.example.com]
    secretName: my-operator-dashboard-tls
"#,
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: my-operator-dashboard\n",
            "apiVersion: v1\nkind: Secret\nmetadata:\n  name: my-operator-dashboard-tls\n",
        ]);
        let template = Simple::ingress().process(&meta, &resources[0]).unwrap();
        let body = template.render().unwrap();

        assert_eq!(template.filename(), "ingress.yaml");
        assert!(body.contains(r#"      name: {{ fullname("dashboard") }}"#));
        assert!(body.contains(r#"            name: {{ fullname("dashboard") }}"#));
        assert!(body.contains("            name: oauth-proxy"));
        assert!(body.contains(r#"    secretName: {{ fullname("dashboard-tls") }}"#));
        assert!(body.contains("  - host: dashboard.example.com"));
    }

    #[test]
    fn test_matches_any_version() {
        let issuer = Simple::issuer();
        assert!(issuer.matches(&GroupVersionKind::new("cert-manager.io", "v1", "Issuer")));
        assert!(issuer.matches(&GroupVersionKind::new("cert-manager.io", "v1alpha2", "Issuer")));
        assert!(!issuer.matches(&GroupVersionKind::new("cert-manager.io", "v1", "ClusterIssuer")));
    }
}

//! Rewriting references between resources of the same pack

use packify_core::{AppMetadata, FieldPath, PathError, expr};
use serde_yaml::Value;

/// Template every resource name found at `paths`
pub fn template_names(tree: &mut Value, paths: &[&str], meta: &AppMetadata) -> Result<usize, PathError> {
    let mut rewrite = |name: &str| meta.templated_name(name);
    rewrite_all(tree, paths, &mut rewrite)
}

/// Template every namespace found at `paths`
pub fn template_namespaces(
    tree: &mut Value,
    paths: &[&str],
    meta: &AppMetadata,
) -> Result<usize, PathError> {
    let mut rewrite = |ns: &str| meta.templated_namespace(ns);
    rewrite_all(tree, paths, &mut rewrite)
}

/// Template in-cluster DNS names (`<service>.<namespace>.svc...`) found at `paths`
pub fn template_hosts(tree: &mut Value, paths: &[&str], meta: &AppMetadata) -> Result<usize, PathError> {
    let mut rewrite = |host: &str| templated_host(host, meta);
    rewrite_all(tree, paths, &mut rewrite)
}

/// `<service>.<namespace>[.rest]` with both leading labels templated
pub fn templated_host(host: &str, meta: &AppMetadata) -> String {
    let mut labels = host.splitn(3, '.');
    let service = labels.next().unwrap_or_default();
    let Some(namespace) = labels.next() else {
        return meta.templated_name(host);
    };

    let mut out = format!(
        "{}.{}",
        meta.templated_name(service),
        meta.templated_namespace(namespace)
    );
    if let Some(rest) = labels.next() {
        out.push('.');
        out.push_str(rest);
    }
    out
}

/// `<namespace>/<name>` reference as used by cert-manager's CA injector
pub fn templated_object_ref(reference: &str, meta: &AppMetadata) -> String {
    match reference.split_once('/') {
        Some((namespace, name)) => format!(
            "{}/{}",
            meta.templated_namespace(namespace),
            meta.templated_name(name)
        ),
        None => meta.templated_name(reference),
    }
}

/// Node for a rewritten string: an expression when templating changed it
pub fn templated_node(original: &str, rewritten: String) -> Value {
    if rewritten == original {
        Value::String(rewritten)
    } else {
        expr::node(rewritten)
    }
}

fn rewrite_all<F>(tree: &mut Value, paths: &[&str], rewrite: &mut F) -> Result<usize, PathError>
where
    F: FnMut(&str) -> String,
{
    let mut offer = |current: &str| {
        let rewritten = rewrite(current);
        (rewritten != current).then(|| expr::node(rewritten))
    };
    let mut count = 0;
    for path in paths {
        count += FieldPath::from(*path).rewrite_strings(tree, &mut offer)?;
    }
    Ok(count)
}

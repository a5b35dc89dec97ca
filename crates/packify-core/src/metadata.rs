//! Pack-wide naming service
//!
//! Built in two phases. [`AppMetadataBuilder`] sees every input resource
//! first and records the names and namespaces the pack will own; freezing it
//! yields [`AppMetadata`], which processors share for the rest of the run.
//! Since the set of known names cannot change after freezing, memoized
//! expressions never depend on the order resources are processed in.

use dashmap::DashMap;
use std::collections::HashSet;

use crate::error::ValuesError;
use crate::expr;
use crate::resource::Resource;
use crate::values::RESERVED_KEYS;

/// Maximum length of a Kubernetes name segment (DNS-1123 label)
pub const MAX_NAME_LEN: usize = 63;

/// Characters stripped between the pack prefix and the resource-local name
const NAME_SEPARATORS: &[char] = &['-', '.', '/', '_', ' '];

/// Collects names and namespaces before processing starts
#[derive(Debug, Clone)]
pub struct AppMetadataBuilder {
    pack_name: String,
    names: HashSet<String>,
    namespaces: HashSet<String>,
}

impl AppMetadataBuilder {
    pub fn new(display_name: &str) -> Self {
        Self {
            pack_name: canonical_name(display_name),
            names: HashSet::new(),
            namespaces: HashSet::new(),
        }
    }

    /// Record a resource the pack will contain
    pub fn load(&mut self, resource: &Resource) {
        self.names.insert(resource.name().to_string());
        if let Some(ns) = resource.namespace() {
            self.namespaces.insert(ns.to_string());
        }
        // A Namespace object is the namespace the pack is installed into
        if resource.gvk().group.is_empty() && resource.kind() == "Namespace" {
            self.namespaces.insert(resource.name().to_string());
        }
    }

    /// Freeze the collected state
    pub fn build(self) -> AppMetadata {
        AppMetadata {
            pack_name: self.pack_name,
            names: self.names,
            namespaces: self.namespaces,
            templated: DashMap::new(),
        }
    }
}

/// Naming convention shared by every processor for one run
#[derive(Debug)]
pub struct AppMetadata {
    pack_name: String,
    names: HashSet<String>,
    namespaces: HashSet<String>,
    templated: DashMap<String, String>,
}

impl AppMetadata {
    /// Metadata with no known resources, mostly useful in tests
    pub fn new(display_name: &str) -> Self {
        AppMetadataBuilder::new(display_name).build()
    }

    /// Canonical pack identifier
    pub fn pack_name(&self) -> &str {
        &self.pack_name
    }

    /// Whether a resource with this name is part of the input
    pub fn is_known(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Strip the pack-name prefix from a resource name
    ///
    /// `myapp-controller` becomes `controller` under pack `myapp`. Names
    /// without the prefix, or made only of it, are returned unchanged.
    pub fn trim_name(&self, name: &str) -> String {
        if self.pack_name.is_empty() {
            return name.to_string();
        }
        match name.strip_prefix(self.pack_name.as_str()) {
            Some(rest) => {
                let trimmed = rest.trim_start_matches(NAME_SEPARATORS);
                if trimmed.is_empty() {
                    name.to_string()
                } else {
                    trimmed.to_string()
                }
            }
            None => name.to_string(),
        }
    }

    /// Expression rendering the installed name of a resource
    ///
    /// Only names of resources in the input are templated; anything else
    /// refers to an object the pack does not create and is kept literally.
    /// Results are memoized so every reference to the same name renders
    /// byte-identically.
    pub fn templated_name(&self, name: &str) -> String {
        if name.is_empty() || !self.is_known(name) {
            return name.to_string();
        }
        self.templated
            .entry(name.to_string())
            .or_insert_with(|| expr::fullname(&self.trim_name(name)))
            .value()
            .clone()
    }

    /// Top-level values key owned by the resource called `name`
    ///
    /// The pack prefix is trimmed and the rest camel-cased. A key the helpers
    /// already read (`nameOverride`, ...) collides, as does a name with no
    /// usable characters.
    pub fn values_key(&self, name: &str) -> Result<String, ValuesError> {
        let key = lower_camel(&self.trim_name(name));
        if key.is_empty() {
            return Err(ValuesError::EmptyPath);
        }
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(ValuesError::Collision { path: key });
        }
        Ok(key)
    }

    /// Expression for a namespace: input namespaces follow the release
    pub fn templated_namespace(&self, namespace: &str) -> String {
        if self.namespaces.contains(namespace) {
            expr::RELEASE_NAMESPACE.to_string()
        } else {
            namespace.to_string()
        }
    }

    /// Whether `namespace` was seen on any input resource
    pub fn is_known_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }
}

/// Normalize a display name into a DNS-1123 label
///
/// Lowercases, folds runs of other characters into single dashes, trims
/// dashes from both ends and caps the length at [`MAX_NAME_LEN`].
pub fn canonical_name(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    let mut pending_dash = false;

    for c in display_name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    if out.len() > MAX_NAME_LEN {
        out.truncate(MAX_NAME_LEN);
    }
    out.trim_end_matches('-').to_string()
}

/// Convert a name to lowerCamelCase for use as a values key
///
/// `controller-manager` → `controllerManager`, `my_app.v2` → `myAppV2`.
pub fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for (i, word) in name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let all_upper = word.chars().all(|c| !c.is_ascii_lowercase());
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            continue;
        };

        if i == 0 {
            out.push(first.to_ascii_lowercase());
        } else {
            out.push(first.to_ascii_uppercase());
        }
        if all_upper {
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
        } else {
            out.extend(chars);
        }
    }

    out
}

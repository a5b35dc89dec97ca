//! Capability-based processor dispatch

use packify_core::{AppMetadata, GroupVersionKind, Resource};
use tracing::debug;

use crate::default::DefaultProcessor;
use crate::error::Result;
use crate::secret::SecretProcessor;
use crate::simple::Simple;
use crate::storage::ClaimProcessor;
use crate::template::Template;
use crate::workload::Workload;

/// Turns one kind of resource into a template
pub trait Processor: Send + Sync {
    /// Short identifier used in logs and `packify kinds`
    fn name(&self) -> &'static str;

    /// Whether this processor handles objects with this signature
    fn matches(&self, gvk: &GroupVersionKind) -> bool;

    fn process(&self, meta: &AppMetadata, resource: &Resource) -> Result<Template>;
}

/// Result of a dispatch: which processor ran and what it produced
#[derive(Debug)]
pub struct Dispatched {
    pub processor: &'static str,
    pub template: Template,
}

/// Ordered processor list with a fallback
///
/// The first matching processor wins. Objects nobody claims go to the
/// default processor, so every dispatch that returns `Ok` was handled.
pub struct Dispatcher {
    processors: Vec<Box<dyn Processor>>,
    fallback: Box<dyn Processor>,
}

impl Dispatcher {
    /// Dispatcher with only the default processor
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
            fallback: Box::new(DefaultProcessor),
        }
    }

    /// Dispatcher with every built-in processor
    pub fn builtin() -> Self {
        Self::new()
            .with_processor(Workload::deployment())
            .with_processor(Workload::stateful_set())
            .with_processor(Workload::daemon_set())
            .with_processor(Simple::service())
            .with_processor(Simple::service_account())
            .with_processor(SecretProcessor)
            .with_processor(ClaimProcessor)
            .with_processor(Simple::ingress())
            .with_processor(Simple::cluster_role())
            .with_processor(Simple::role())
            .with_processor(Simple::cluster_role_binding())
            .with_processor(Simple::role_binding())
            .with_processor(Simple::issuer())
            .with_processor(Simple::certificate())
            .with_processor(Simple::validating_webhook())
            .with_processor(Simple::mutating_webhook())
    }

    /// Append a processor; it is consulted after every one already registered
    pub fn with_processor(mut self, processor: impl Processor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Processor names in dispatch order, the fallback last
    pub fn processors(&self) -> Vec<&'static str> {
        self.processors
            .iter()
            .map(|p| p.name())
            .chain(std::iter::once(self.fallback.name()))
            .collect()
    }

    /// Run the first processor that matches `resource`
    pub fn dispatch(&self, meta: &AppMetadata, resource: &Resource) -> Result<Dispatched> {
        let processor = self
            .processors
            .iter()
            .find(|p| p.matches(resource.gvk()))
            .unwrap_or(&self.fallback);

        debug!(
            processor = processor.name(),
            gvk = %resource.gvk(),
            name = resource.name(),
            "Dispatching resource"
        );

        let template = processor
            .process(meta, resource)
            .map_err(|e| e.for_resource(resource))?;

        Ok(Dispatched {
            processor: processor.name(),
            template,
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::builtin()
    }
}

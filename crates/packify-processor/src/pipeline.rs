//! End-to-end conversion of decoded resources into a pack

use packify_core::{AppMetadataBuilder, Pack, Resource, canonical_name};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::error::{ProcessError, Result};
use crate::output::PackOutput;

/// Cooperative cancellation shared with a signal handler
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for generating a pack
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Display name of the pack; normalized before use
    pub pack_name: String,

    /// Version written to Pack.yaml (SemVer)
    pub pack_version: String,

    /// Application version, the fallback for every image tag
    pub app_version: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            pack_name: "chart".to_string(),
            pack_version: "0.1.0".to_string(),
            app_version: "0.1.0".to_string(),
        }
    }
}

impl GenerateOptions {
    pub fn validate(&self) -> Result<()> {
        if canonical_name(&self.pack_name).is_empty() {
            return Err(ProcessError::InvalidOption(format!(
                "pack name '{}' has no usable characters",
                self.pack_name
            )));
        }
        semver::Version::parse(&self.pack_version).map_err(|e| {
            ProcessError::InvalidOption(format!(
                "pack version '{}' is not SemVer: {e}",
                self.pack_version
            ))
        })?;
        Ok(())
    }
}

/// How a run ended
#[derive(Debug)]
pub enum Outcome {
    Completed(PackOutput),
    /// Cancelled before completion; nothing was produced
    Cancelled,
}

/// Drives metadata collection, dispatch and assembly
pub struct Pipeline {
    options: GenerateOptions,
    dispatcher: Dispatcher,
}

impl Pipeline {
    /// Pipeline with the built-in processors
    pub fn new(options: GenerateOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            dispatcher: Dispatcher::builtin(),
        })
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Convert `resources` into a pack
    ///
    /// Every resource is loaded into the naming service before the first
    /// one is processed. The cancel flag is checked between resources in
    /// both passes.
    pub fn run<I>(&self, resources: I, cancel: &CancelFlag) -> Result<Outcome>
    where
        I: IntoIterator<Item = packify_core::Result<Resource>>,
    {
        let mut builder = AppMetadataBuilder::new(&self.options.pack_name);
        let mut loaded = Vec::new();
        for resource in resources {
            if cancel.is_cancelled() {
                info!("Cancelled while reading resources");
                return Ok(Outcome::Cancelled);
            }
            let resource = resource?;
            builder.load(&resource);
            loaded.push(resource);
        }

        let meta = builder.build();
        let pack = Pack::application(
            meta.pack_name(),
            &self.options.pack_version,
            &self.options.app_version,
        )?;

        let mut templates = Vec::with_capacity(loaded.len());
        for resource in &loaded {
            if cancel.is_cancelled() {
                info!("Cancelled while processing resources");
                return Ok(Outcome::Cancelled);
            }
            if is_namespace(resource) {
                info!(name = resource.name(), "Skipping Namespace, packs install into the release namespace");
                continue;
            }
            let dispatched = self.dispatcher.dispatch(&meta, resource)?;
            debug!(
                processor = dispatched.processor,
                file = dispatched.template.filename(),
                "Processed {}",
                resource.name()
            );
            templates.push(dispatched.template);
        }

        let output = PackOutput::assemble(pack, templates)?;
        info!(
            resources = loaded.len(),
            templates = output.templates().len(),
            "Generated pack '{}'",
            meta.pack_name()
        );
        Ok(Outcome::Completed(output))
    }
}

fn is_namespace(resource: &Resource) -> bool {
    resource.gvk().group.is_empty() && resource.kind() == "Namespace"
}

//! Packify Processor - Turns Kubernetes resources into Sherpack templates
//!
//! Each resource is routed to the first [`Processor`] claiming its kind.
//! Processors template names through the shared naming service, move
//! configurable fields into a values fragment and return a [`Template`].
//! [`PackOutput`] merges everything into a pack that Sherpack can install.
//!
//! # Example
//!
//! ```no_run
//! use packify_core::Resource;
//! use packify_processor::{CancelFlag, GenerateOptions, Outcome, Pipeline, WriteOptions};
//! use std::path::Path;
//!
//! let manifest = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: demo-config\n";
//! let pipeline = Pipeline::new(GenerateOptions {
//!     pack_name: "demo".into(),
//!     ..Default::default()
//! })?;
//!
//! if let Outcome::Completed(pack) = pipeline.run([Resource::from_yaml(manifest)], &CancelFlag::new())? {
//!     pack.write(Path::new("demo"), &WriteOptions::default())?;
//! }
//! # Ok::<(), packify_processor::ProcessError>(())
//! ```

pub mod default;
pub mod dispatch;
pub mod error;
mod filters;
pub mod helpers;
pub mod meta;
pub mod output;
pub mod pipeline;
pub mod pod;
mod preview;
pub mod refs;
pub mod secret;
pub mod simple;
pub mod storage;
pub mod template;
pub mod workload;
pub mod yaml;

pub use default::DefaultProcessor;
pub use dispatch::{Dispatched, Dispatcher, Processor};
pub use error::{ProcessError, Result};
pub use output::{PackOutput, WriteOptions};
pub use pipeline::{CancelFlag, GenerateOptions, Outcome, Pipeline};
pub use secret::SecretProcessor;
pub use simple::Simple;
pub use storage::ClaimProcessor;
pub use template::{Body, Template};
pub use workload::{Workload, WorkloadKind};

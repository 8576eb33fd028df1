//! # Modflow
//!
//! A per-module static-site build pipeline.
//!
//! A module (its pages, widgets, stylesheets and static assets) is built by
//! an ordered list of stages:
//!
//! - **Full builds**: collect sources into a staging tree, scan templates,
//!   gate on CSS lint, post-process stylesheets and translate server includes
//! - **Incremental updates**: rebuild only changed pages into the live
//!   preview tree, or remove deleted ones
//! - **Reference map**: a persisted page to asset record merged on every run
//! - **Events**: stage and module lifecycle events through pluggable sinks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modflow::prelude::*;
//!
//! let ctx = ModuleBuildContext::load("/work/mall", "/work/mall/shop", StageArgs::full())?;
//! let report = build_module(&ctx).await?;
//! println!("{} stages, {} files", report.records.len(), report.written_paths().len());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod css;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod reference_map;
pub mod resolver;
pub mod stages;
pub mod stream;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AppConfig, ModuleConfig};
    pub use crate::context::{BuildType, ModuleBuildContext, ModuleLayout, StageArgs};
    pub use crate::core::{ArtifactKind, BuildEvent, StageArtifact, StageOutput, StageStatus};
    pub use crate::errors::{BuildError, LintFailure, PipelineValidationError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{build_module, presets, BuildReport, ModulePipeline, PipelineBuilder};
    pub use crate::reference_map::ReferenceMap;
    pub use crate::resolver::{MateResolver, TemplateResolver};
    pub use crate::stages::Stage;
    pub use crate::stream::{FileTransform, VirtualFile};
}

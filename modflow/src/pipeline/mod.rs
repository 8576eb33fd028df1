//! Pipeline building and execution.
//!
//! This module provides:
//! - A validating builder for ordered stage lists
//! - The sequential, fail-fast module runner
//! - Build reports
//! - The standard full and incremental pipelines

mod builder;
pub mod presets;
mod report;
mod runner;

pub use builder::PipelineBuilder;
pub use report::{BuildReport, StageRecord};
pub use runner::ModulePipeline;

use crate::context::ModuleBuildContext;
use crate::errors::BuildError;
use crate::resolver::{MateResolver, TemplateResolver};
use std::sync::Arc;

/// Builds a module with the default resolver, choosing the pipeline from the stage arguments.
///
/// # Errors
///
/// Returns the first stage failure.
pub async fn build_module(ctx: &ModuleBuildContext) -> Result<BuildReport, BuildError> {
    let resolver: Arc<dyn TemplateResolver> = Arc::new(MateResolver::new());
    presets::for_args(&ctx.stage_args, &resolver)?.run(ctx).await
}

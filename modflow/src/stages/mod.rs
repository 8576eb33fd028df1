//! Stage trait and the module build stages.
//!
//! A stage is constructed once with its collaborators and invoked per run
//! with a [`ModuleBuildContext`]. It resolves to exactly one result: an
//! [`StageOutput`] on success or skip, a [`BuildError`] on failure.

mod collect;
mod csslint;
mod inject_server;
mod serve_page;
mod styles;
mod templates;

pub use collect::CollectStage;
pub use csslint::{CssLintStage, LintGate};
pub use inject_server::InjectServerStage;
pub use serve_page::{BasenameMapping, CssMapping, ServePageStage};
pub use styles::{style_chain, StylesStage};
pub use templates::TemplatesStage;

use crate::context::ModuleBuildContext;
use crate::core::{StageArtifact, StageOutput};
use crate::errors::BuildError;
use crate::resolver::{ReplaceOptions, ResolverOptions};
use crate::stream::VirtualFile;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for module build stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Executes the stage.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining stages of the module build.
    async fn execute(&self, ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError>;
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&ModuleBuildContext) -> Result<StageOutput, BuildError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&ModuleBuildContext) -> Result<StageOutput, BuildError> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&ModuleBuildContext) -> Result<StageOutput, BuildError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&ModuleBuildContext) -> Result<StageOutput, BuildError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        (self.func)(ctx)
    }
}

/// A stage that does nothing.
#[derive(Debug, Clone)]
pub struct NoOpStage {
    name: String,
}

impl NoOpStage {
    /// Creates a new no-op stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Stage for NoOpStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        Ok(StageOutput::ok_empty())
    }
}

fn written(files: &[VirtualFile]) -> Vec<StageArtifact> {
    files.iter().map(StageArtifact::written).collect()
}

fn resolver_options(ctx: &ModuleBuildContext) -> ResolverOptions {
    ResolverOptions::new(&ctx.app_path, &ctx.module_name)
}

fn replace_options(ctx: &ModuleBuildContext, serve: bool) -> ReplaceOptions {
    ReplaceOptions {
        base: resolver_options(ctx),
        app: ctx.app().app.clone(),
        publish_prefix: ctx.app().publish_prefix.clone(),
        serve,
    }
}

//! Full template build: scan pages into `dist/output` and publish static assets.

use super::{resolver_options, written, Stage};
use crate::context::ModuleBuildContext;
use crate::core::StageOutput;
use crate::errors::BuildError;
use crate::resolver::{ConcatOptions, ScanOptions, TemplateResolver};
use crate::stream::{dest, flatten, pattern, pipe, src, Plumbing};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Scans every staged page, or the single page named by `page`.
///
/// After the scan the reference map is updated for every scanned page, the
/// staged static assets other than stylesheets are published to
/// `dist/_static` and `module-conf.json` is copied into `dist` when present.
/// Stylesheets are published by the lint gate.
#[derive(Debug, Clone)]
pub struct TemplatesStage {
    resolver: Arc<dyn TemplateResolver>,
}

impl TemplatesStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(resolver: Arc<dyn TemplateResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Stage for TemplatesStage {
    fn name(&self) -> &str {
        "templates"
    }

    async fn execute(&self, ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        let layout = ctx.layout();
        let pages_dir = layout.staging_pages();
        let glob = match &ctx.stage_args.page {
            Some(page) => format!("**/{page}.html"),
            None => "**/*.html".to_string(),
        };

        let pages = src(&[pattern(&pages_dir, &glob)], Some(&pages_dir)).await?;
        let scan = self.resolver.scan(ScanOptions {
            base: resolver_options(ctx),
            serve: ctx.stage_args.is_serve,
            use_include: ctx.use_include(),
            widget_dir: layout.staging_widgets(),
        });
        let pages = pipe(pages, scan.as_ref(), Plumbing::Strict)?;
        let pages = dest(flatten(pages), &layout.output()).await?;
        info!(module = %ctx.module_name, stage = "templates", pages = pages.len(), "Scanned pages");

        let map = self
            .resolver
            .concat(ConcatOptions {
                base: resolver_options(ctx),
                page_files: None,
                bundles: BTreeMap::new(),
                map: layout.map_file(),
            })
            .await?;
        debug!(module = %ctx.module_name, stage = "templates", pages = map.pages.len(), "Updated reference map");

        let staged_static = layout.staging().join("static");
        let assets = src(
            &[
                pattern(&staged_static, "**/*"),
                format!("!{}", pattern(&staged_static, "**/*.css")),
            ],
            Some(&staged_static),
        )
        .await?;
        let assets = dest(assets, &layout.static_dir()).await?;

        let mut artifacts = written(&pages);
        artifacts.extend(written(&assets));

        let conf = layout.module_conf();
        let copied = src(&[conf.to_string_lossy().into_owned()], Some(layout.module_path())).await?;
        artifacts.extend(written(&dest(copied, &layout.dist()).await?));

        Ok(StageOutput::ok(artifacts))
    }
}

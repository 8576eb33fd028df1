//! Incremental updates of the live preview tree.
//!
//! A "changed" run rebuilds only the listed pages and the stylesheets named
//! after them, then re-syncs the whole static tree because a sprite sheet
//! shared by other pages may have moved. A "deleted" run removes the pages
//! from the serve tree and nothing else.

use super::{replace_options, resolver_options, written, Stage};
use crate::context::{BuildType, ModuleBuildContext};
use crate::core::{StageArtifact, StageOutput};
use crate::css::{ProcessorChain, SpriteOptions, SpriteSheet, VendorPrefixer};
use crate::errors::BuildError;
use crate::resolver::{ConcatOptions, ScanOptions, TemplateResolver};
use crate::stream::{dest, flatten, pattern, pipe, pipe_blocking, src, src_paths, Plumbing};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Maps a page file to the name of the stylesheet bundle it owns.
pub trait CssMapping: Send + Sync + fmt::Debug {
    /// Returns the stylesheet file name for a page, or `None` if it has none.
    fn stylesheet_for(&self, page: &Path) -> Option<String>;
}

/// `<basename>.html` owns `<basename>.css`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasenameMapping;

impl CssMapping for BasenameMapping {
    fn stylesheet_for(&self, page: &Path) -> Option<String> {
        page.file_stem()
            .and_then(|s| s.to_str())
            .map(|stem| format!("{stem}.css"))
    }
}

/// Updates the serve tree for changed or deleted pages.
#[derive(Debug, Clone)]
pub struct ServePageStage {
    resolver: Arc<dyn TemplateResolver>,
    mapping: Arc<dyn CssMapping>,
}

impl ServePageStage {
    /// Creates the stage with the basename stylesheet mapping.
    #[must_use]
    pub fn new(resolver: Arc<dyn TemplateResolver>) -> Self {
        Self {
            resolver,
            mapping: Arc::new(BasenameMapping),
        }
    }

    /// Replaces the page to stylesheet mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: Arc<dyn CssMapping>) -> Self {
        self.mapping = mapping;
        self
    }

    fn serve_chain(ctx: &ModuleBuildContext) -> ProcessorChain {
        let layout = ctx.layout();
        let chain = ProcessorChain::new().with(VendorPrefixer::new(ctx.config().browsers(&ctx.app().platform)));
        match ctx.config().csssprite() {
            Some(sprite) => {
                let mut options = SpriteOptions::new(layout.static_images())
                    .with_retina(sprite.retina)
                    .with_rootvalue(sprite.rootvalue)
                    .with_padding(sprite.padding);
                options.stylesheet_path = Some(layout.static_css());
                chain.with(SpriteSheet::new(options))
            }
            None => chain,
        }
    }

    async fn changed(&self, ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        let layout = ctx.layout();
        let serve_root = layout.serve_root();
        let page_files = ctx.page_files();

        let pages = flatten(src_paths(&page_files, None).await?);
        let scan = self.resolver.scan(ScanOptions {
            base: resolver_options(ctx),
            serve: true,
            use_include: ctx.use_include(),
            widget_dir: layout.staging_widgets(),
        });
        let pages = pipe(pages, scan.as_ref(), Plumbing::Strict)?;
        let pages = pipe(flatten(pages), self.resolver.inject(resolver_options(ctx)).as_ref(), Plumbing::Strict)?;
        let pages = pipe(pages, self.resolver.replace(replace_options(ctx, true)).as_ref(), Plumbing::Strict)?;
        let pages = dest(pages, &serve_root).await?;
        info!(module = %ctx.module_name, stage = "serve_page", pages = pages.len(), "Served changed pages");

        let css_dir = layout.static_css();
        let mut bundles: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut css_files: Vec<PathBuf> = Vec::new();
        for page in &page_files {
            let (Some(stem), Some(sheet)) = (
                page.file_stem().and_then(|s| s.to_str()),
                self.mapping.stylesheet_for(page),
            ) else {
                continue;
            };
            bundles
                .entry(stem.to_string())
                .or_default()
                .push(format!("css/{sheet}"));
            css_files.push(css_dir.join(sheet));
        }

        self.resolver
            .concat(ConcatOptions {
                base: resolver_options(ctx),
                page_files: Some(page_files.clone()),
                bundles,
                map: layout.map_file(),
            })
            .await?;

        let sheets = src_paths(&css_files, Some(&css_dir)).await?;
        let sheets = pipe_blocking(sheets, Arc::new(Self::serve_chain(ctx)), Plumbing::Plumbed).await?;
        let sheets = dest(sheets, &css_dir).await?;
        debug!(module = %ctx.module_name, stage = "serve_page", stylesheets = sheets.len(), "Processed page stylesheets");

        let static_dir = layout.static_dir();
        let assets = src(&[pattern(&static_dir, "**/*")], Some(&static_dir)).await?;
        let assets = pipe(assets, self.resolver.replace(replace_options(ctx, true)).as_ref(), Plumbing::Strict)?;
        let assets = dest(assets, &serve_root).await?;
        info!(module = %ctx.module_name, stage = "serve_page", assets = assets.len(), "Re-synced static assets");

        let mut artifacts = written(&pages);
        artifacts.extend(written(&sheets));
        artifacts.extend(written(&assets));
        Ok(StageOutput::ok(artifacts))
    }

    async fn deleted(ctx: &ModuleBuildContext) -> StageOutput {
        let serve_root = ctx.layout().serve_root();
        let targets: Vec<PathBuf> = ctx
            .stage_args
            .page_files
            .iter()
            .filter_map(|page| page.file_name().map(|name| serve_root.join(name)))
            .collect();

        // All removals are issued together; the stage completes once, after every one has settled.
        let removals = targets.iter().map(|target| async move {
            let result = match tokio::fs::metadata(target).await {
                Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(target).await,
                Ok(_) => tokio::fs::remove_file(target).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                debug!(path = %target.display(), error = %e, "Nothing removed");
            }
        });
        join_all(removals).await;

        info!(module = %ctx.module_name, stage = "serve_page", pages = targets.len(), "Removed deleted pages");
        StageOutput::ok(targets.into_iter().map(StageArtifact::removed).collect())
    }
}

#[async_trait]
impl Stage for ServePageStage {
    fn name(&self) -> &str {
        "serve_page"
    }

    async fn execute(&self, ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        match ctx.stage_args.build_type {
            Some(BuildType::Changed) => self.changed(ctx).await,
            Some(BuildType::Deleted) => Ok(Self::deleted(ctx).await),
            None => Ok(StageOutput::skip("not an incremental update")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CssSpriteConfig, ModuleConfig};
    use crate::context::StageArgs;
    use crate::reference_map::ReferenceMap;
    use crate::resolver::MateResolver;
    use crate::testing::ModuleFixture;
    use pretty_assertions::assert_eq;

    const HOME: &str = "<link rel=\"stylesheet\" href=\"../../static/css/home.css\">\n<img src=\"../../static/images/logo.png\">";
    const CART: &str = "<link rel=\"stylesheet\" href=\"../../static/css/cart.css\">";

    fn shop() -> ModuleFixture {
        ModuleFixture::new()
            .with_file("dist/_/page/home/home.html", HOME)
            .with_file("dist/_/page/cart/cart.html", CART)
            .with_file("dist/_static/css/home.css", ".home { transform: none; }")
            .with_file("dist/_static/css/cart.css", ".cart { transform: none; }")
            .with_file("dist/_static/images/logo.png", "png")
    }

    fn stage() -> ServePageStage {
        ServePageStage::new(Arc::new(MateResolver::new()))
    }

    #[test]
    fn test_basename_mapping() {
        assert_eq!(
            BasenameMapping.stylesheet_for(Path::new("dist/_/page/home/home.html")),
            Some("home.css".to_string())
        );
    }

    #[tokio::test]
    async fn test_changed_page_touches_only_its_stylesheet() {
        let fixture = shop();
        let ctx = fixture.context_with(StageArgs::changed(vec![PathBuf::from("dist/_/page/home/home.html")]));
        let css_dir = fixture.layout().static_css();

        stage().execute(&ctx).await.unwrap();

        assert!(fixture.read(&css_dir.join("home.css")).contains("-webkit-transform: none;"));
        assert_eq!(fixture.read(&css_dir.join("cart.css")), ".cart { transform: none; }");

        let serve_root = fixture.layout().serve_root();
        let served = fixture.read(&serve_root.join("home.html"));
        assert!(served.contains("href=\"/shop/css/home.css\""));
        assert!(served.contains("src=\"/shop/images/logo.png\""));
        assert!(!serve_root.join("cart.html").exists());
        assert!(serve_root.join("css/cart.css").is_file());
        assert!(serve_root.join("images/logo.png").is_file());
    }

    #[tokio::test]
    async fn test_changed_page_with_glob_characters_in_its_path() {
        let fixture = shop()
            .with_file("dist/_/page/a[1]/a[1].html", CART)
            .with_file("dist/_static/css/a[1].css", ".a { transform: none; }");
        let ctx = fixture.context_with(StageArgs::changed(vec![PathBuf::from("dist/_/page/a[1]/a[1].html")]));

        stage().execute(&ctx).await.unwrap();

        assert!(fixture.layout().serve_root().join("a[1].html").is_file());
        let css = fixture.read(&fixture.layout().static_css().join("a[1].css"));
        assert!(css.contains("-webkit-transform: none;"));
    }

    #[tokio::test]
    async fn test_changed_page_updates_only_its_map_entry() {
        let fixture = shop();
        let mut existing = ReferenceMap::new("shop");
        existing.merge_page("cart", vec!["css/cart.css".to_string()]);
        existing.save(&fixture.layout().map_file()).await.unwrap();

        let ctx = fixture.context_with(StageArgs::changed(vec![PathBuf::from("dist/_/page/home/home.html")]));
        stage().execute(&ctx).await.unwrap();

        let map = ReferenceMap::load(&fixture.layout().map_file(), "shop").await.unwrap();
        assert_eq!(
            map.assets("home"),
            Some(["css/home.css".to_string(), "images/logo.png".to_string()].as_slice())
        );
        assert_eq!(map.assets("cart"), Some(["css/cart.css".to_string()].as_slice()));
    }

    #[tokio::test]
    async fn test_changed_page_with_sprites() {
        let fixture = shop()
            .with_module_config(ModuleConfig::new("shop").with_csssprite(CssSpriteConfig::default()))
            .with_png("dist/_static/images/icon.png", 4, 4)
            .with_file(
                "dist/_static/css/home.css",
                ".icon { background: url(../images/icon.png?__sprite); }",
            );
        let ctx = fixture.context_with(StageArgs::changed(vec![PathBuf::from("dist/_/page/home/home.html")]));

        stage().execute(&ctx).await.unwrap();

        let css = fixture.read(&fixture.layout().static_css().join("home.css"));
        assert!(css.contains("url(../images/sprite_home.png)"));
        let served = fixture.read(&fixture.layout().serve_root().join("css/home.css"));
        assert!(served.contains("url(/shop/images/sprite_home.png)"));
        assert!(fixture.layout().serve_root().join("images/sprite_home.png").is_file());
    }

    #[tokio::test]
    async fn test_deleted_pages_are_removed_from_serve_tree() {
        let fixture = shop()
            .with_app_file(".temp/mall/shop/home.html", "old")
            .with_app_file(".temp/mall/shop/cart.html", "keep");
        let ctx = fixture.context_with(StageArgs::deleted(vec![
            PathBuf::from("dist/_/page/home/home.html"),
            PathBuf::from("dist/_/page/gone/gone.html"),
        ]));

        let output = stage().execute(&ctx).await.unwrap();

        let serve_root = fixture.layout().serve_root();
        assert!(!serve_root.join("home.html").exists());
        assert!(!serve_root.join("gone.html").exists());
        assert!(serve_root.join("cart.html").exists());
        assert_eq!(output.removed_paths().len(), 2);
    }

    #[tokio::test]
    async fn test_full_build_is_skipped() {
        let fixture = shop();
        let output = stage().execute(&fixture.context()).await.unwrap();
        assert!(output.is_skip());
        assert!(!fixture.layout().serve_root().exists());
    }
}

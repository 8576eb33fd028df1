//! Vendor prefixing and unit conversion of the module's static stylesheets.

use super::{written, Stage};
use crate::context::ModuleBuildContext;
use crate::core::StageOutput;
use crate::css::{ProcessorChain, PxToRem, VendorPrefixer};
use crate::errors::BuildError;
use crate::stream::{dest, pattern, pipe_blocking, src, Plumbing};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Builds the post-processing chain for a module.
///
/// Prefixing always runs before unit conversion.
#[must_use]
pub fn style_chain(ctx: &ModuleBuildContext) -> ProcessorChain {
    let config = ctx.config();
    let mut chain = ProcessorChain::new().with(VendorPrefixer::new(config.browsers(&ctx.app().platform)));
    if let Some(options) = config.px2rem() {
        chain = chain.with(PxToRem::new(options.clone()));
    }
    chain
}

/// Post-processes every non-minified stylesheet in `dist/_static/css`, in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct StylesStage;

#[async_trait]
impl Stage for StylesStage {
    fn name(&self) -> &str {
        "styles"
    }

    async fn execute(&self, ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        let css_dir = ctx.layout().static_css();
        let files = src(
            &[
                pattern(&css_dir, "*.css"),
                format!("!{}", pattern(&css_dir, "*.min.css")),
            ],
            Some(&css_dir),
        )
        .await?;
        if files.is_empty() {
            return Ok(StageOutput::skip("no stylesheets to process"));
        }

        let chain = style_chain(ctx);
        info!(
            module = %ctx.module_name,
            stage = "styles",
            files = files.len(),
            processors = ?chain.names(),
            "Processing stylesheets"
        );
        let files = pipe_blocking(files, Arc::new(chain), Plumbing::Plumbed).await?;
        let files = dest(files, &css_dir).await?;
        Ok(StageOutput::ok(written(&files)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModuleConfig, Px2RemConfig};
    use crate::css::PxToRemOptions;
    use crate::testing::ModuleFixture;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chain_order() {
        let fixture = ModuleFixture::new().with_module_config(
            ModuleConfig::new("shop").with_px2rem(Px2RemConfig::default()),
        );
        assert_eq!(style_chain(&fixture.context()).names(), vec!["autoprefixer", "pxtorem"]);

        let fixture = ModuleFixture::new();
        assert_eq!(style_chain(&fixture.context()).names(), vec!["autoprefixer"]);
    }

    #[tokio::test]
    async fn test_styles_rewrite_in_place_and_skip_minified() {
        let config = ModuleConfig::new("shop").with_px2rem(Px2RemConfig {
            enable: true,
            options: PxToRemOptions {
                prop_white_list: Vec::new(),
                ..PxToRemOptions::default()
            },
        });
        let fixture = ModuleFixture::new()
            .with_module_config(config)
            .with_file("dist/_static/css/home.css", ".a { width: 32px; }")
            .with_file("dist/_static/css/vendor.min.css", ".a{width:32px}");

        let output = StylesStage.execute(&fixture.context()).await.unwrap();

        let css_dir = fixture.layout().static_css();
        assert_eq!(output.artifacts.len(), 1);
        assert_eq!(fixture.read(&css_dir.join("home.css")), ".a {\n  width: 2rem;\n}\n");
        assert_eq!(fixture.read(&css_dir.join("vendor.min.css")), ".a{width:32px}");
    }

    #[tokio::test]
    async fn test_broken_stylesheet_passes_through() {
        let fixture = ModuleFixture::new()
            .with_file("dist/_static/css/broken.css", ".a { color: red;")
            .with_file("dist/_static/css/ok.css", ".b { transition: none; }");

        StylesStage.execute(&fixture.context()).await.unwrap();

        let css_dir = fixture.layout().static_css();
        assert_eq!(fixture.read(&css_dir.join("broken.css")), ".a { color: red;");
        assert!(fixture.read(&css_dir.join("ok.css")).contains("-webkit-transition: none;"));
    }

    #[tokio::test]
    async fn test_second_run_is_byte_identical() {
        let fixture = ModuleFixture::new()
            .with_file("dist/_static/css/home.css", ".a{display:flex;font-size:14px}");
        let ctx = fixture.context();

        StylesStage.execute(&ctx).await.unwrap();
        let first = fixture.tree(&fixture.layout().static_dir());
        StylesStage.execute(&ctx).await.unwrap();
        assert_eq!(fixture.tree(&fixture.layout().static_dir()), first);
    }

    #[tokio::test]
    async fn test_no_stylesheets_is_skip() {
        let fixture = ModuleFixture::new();
        assert!(StylesStage.execute(&fixture.context()).await.unwrap().is_skip());
    }
}

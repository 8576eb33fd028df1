//! Server-side include translation for extracted template fragments.

use super::{resolver_options, written, Stage};
use crate::context::ModuleBuildContext;
use crate::core::StageOutput;
use crate::errors::BuildError;
use crate::resolver::TemplateResolver;
use crate::stream::{dest, flatten, pattern, pipe, src, Plumbing};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Rewrites include directives in `dist/output/tpl` for the target runtime.
#[derive(Debug, Clone)]
pub struct InjectServerStage {
    resolver: Arc<dyn TemplateResolver>,
}

impl InjectServerStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(resolver: Arc<dyn TemplateResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Stage for InjectServerStage {
    fn name(&self) -> &str {
        "inject_server"
    }

    async fn execute(&self, ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        let tpl = ctx.layout().tpl();
        let files = flatten(src(&[pattern(&tpl, "*.{html,php,vm,ejs}")], Some(&tpl)).await?);
        let transform = self.resolver.inject_server(resolver_options(ctx));
        let files = pipe(files, transform.as_ref(), Plumbing::Strict)?;
        let files = dest(files, &tpl).await?;

        info!(module = %ctx.module_name, stage = "inject_server", files = files.len(), "Injected server includes");
        Ok(StageOutput::ok(written(&files)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MateResolver;
    use crate::testing::ModuleFixture;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_fragments_are_rewritten_in_place() {
        let directive = "<!-- include \"widget/nav/nav.html\" -->";
        let fixture = ModuleFixture::new()
            .with_file("dist/output/tpl/head.php", directive)
            .with_file("dist/output/tpl/foot.vm", directive)
            .with_file("dist/output/tpl/notes.txt", directive);
        let stage = InjectServerStage::new(Arc::new(MateResolver::new()));

        let output = stage.execute(&fixture.context()).await.unwrap();

        let tpl = fixture.layout().tpl();
        assert_eq!(output.artifacts.len(), 2);
        assert_eq!(fixture.read(&tpl.join("head.php")), "<?php include \"widget/nav/nav.html\"; ?>");
        assert_eq!(fixture.read(&tpl.join("foot.vm")), "#parse(\"widget/nav/nav.html\")");
        assert_eq!(fixture.read(&tpl.join("notes.txt")), directive);
    }
}

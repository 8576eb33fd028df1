//! Copies a module's sources into the staging tree.

use super::{written, Stage};
use crate::context::ModuleBuildContext;
use crate::core::StageOutput;
use crate::errors::BuildError;
use crate::stream::{dest, pattern, src};
use async_trait::async_trait;
use tracing::info;

/// Copies `page`, `widget`, `static` and `data` verbatim into `dist/_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectStage;

#[async_trait]
impl Stage for CollectStage {
    fn name(&self) -> &str {
        "collect"
    }

    async fn execute(&self, ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        let module_path = ctx.module_path();
        let files = src(
            &[pattern(module_path, "{page,widget,static,data}/**/*")],
            Some(module_path),
        )
        .await?;
        let files = dest(files, &ctx.layout().staging()).await?;

        info!(module = %ctx.module_name, stage = "collect", files = files.len(), "Collected module sources");
        Ok(StageOutput::ok(written(&files)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ModuleFixture;

    #[tokio::test]
    async fn test_collect_copies_source_categories() {
        let fixture = ModuleFixture::new()
            .with_file("page/home/home.html", "<p>home</p>")
            .with_file("static/css/home.css", ".a { color: red; }")
            .with_file("data/mock.json", "{}")
            .with_file("notes/readme.txt", "not collected");

        let output = CollectStage.execute(&fixture.context()).await.unwrap();

        let staging = fixture.layout().staging();
        assert_eq!(output.artifacts.len(), 3);
        assert_eq!(fixture.read(&staging.join("page/home/home.html")), "<p>home</p>");
        assert!(staging.join("static/css/home.css").is_file());
        assert!(staging.join("data/mock.json").is_file());
        assert!(!staging.join("notes").exists());
    }
}

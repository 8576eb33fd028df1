//! Standard pipelines.

use super::{ModulePipeline, PipelineBuilder};
use crate::context::StageArgs;
use crate::errors::PipelineValidationError;
use crate::resolver::TemplateResolver;
use crate::stages::{CollectStage, CssLintStage, InjectServerStage, ServePageStage, StylesStage, TemplatesStage};
use std::sync::Arc;

/// collect, templates, csslint, styles, inject_server.
pub fn full_build(resolver: &Arc<dyn TemplateResolver>) -> Result<ModulePipeline, PipelineValidationError> {
    PipelineBuilder::new("full_build")
        .stage(CollectStage)
        .stage(TemplatesStage::new(Arc::clone(resolver)))
        .stage(CssLintStage::default())
        .stage(StylesStage)
        .stage(InjectServerStage::new(Arc::clone(resolver)))
        .build()
}

/// The incremental serve stage alone.
pub fn serve_update(resolver: &Arc<dyn TemplateResolver>) -> Result<ModulePipeline, PipelineValidationError> {
    PipelineBuilder::new("serve_update")
        .stage(ServePageStage::new(Arc::clone(resolver)))
        .build()
}

/// Picks the pipeline for a run: incremental when `type` is set, full otherwise.
pub fn for_args(
    args: &StageArgs,
    resolver: &Arc<dyn TemplateResolver>,
) -> Result<ModulePipeline, PipelineValidationError> {
    if args.is_incremental() {
        serve_update(resolver)
    } else {
        full_build(resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MateResolver;
    use std::path::PathBuf;

    fn resolver() -> Arc<dyn TemplateResolver> {
        Arc::new(MateResolver::new())
    }

    #[test]
    fn test_full_build_order() {
        let pipeline = full_build(&resolver()).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["collect", "templates", "csslint", "styles", "inject_server"]
        );
    }

    #[test]
    fn test_for_args_picks_by_type() {
        let resolver = resolver();
        let full = for_args(&StageArgs::full(), &resolver).unwrap();
        assert_eq!(full.name(), "full_build");

        let changed = for_args(&StageArgs::changed(vec![PathBuf::from("a.html")]), &resolver).unwrap();
        assert_eq!(changed.stage_names(), vec!["serve_page"]);
        let deleted = for_args(&StageArgs::deleted(vec![PathBuf::from("a.html")]), &resolver).unwrap();
        assert_eq!(deleted.name(), "serve_update");
    }
}

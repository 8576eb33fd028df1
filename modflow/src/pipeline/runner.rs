//! Sequential, fail-fast execution of a module pipeline.

use super::{BuildReport, StageRecord};
use crate::context::ModuleBuildContext;
use crate::core::BuildEvent;
use crate::errors::BuildError;
use crate::events::{get_event_sink, EventSink};
use crate::stages::Stage;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// An ordered list of stages for one module.
pub struct ModulePipeline {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl fmt::Debug for ModulePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModulePipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

impl ModulePipeline {
    pub(super) fn new(name: String, stages: Vec<Arc<dyn Stage>>, sink: Option<Arc<dyn EventSink>>) -> Self {
        Self { name, stages, sink }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    fn sink(&self) -> Arc<dyn EventSink> {
        self.sink.clone().unwrap_or_else(get_event_sink)
    }

    /// Runs every stage in order.
    ///
    /// Each stage's output is fully written before the next starts. The first
    /// failing stage aborts the build.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::StageFailed`] naming the module and stage.
    pub async fn run(&self, ctx: &ModuleBuildContext) -> Result<BuildReport, BuildError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("module_build", module = %ctx.module_name, pipeline = %self.name, %run_id);
        self.run_stages(ctx, run_id).instrument(span).await
    }

    async fn run_stages(&self, ctx: &ModuleBuildContext, run_id: Uuid) -> Result<BuildReport, BuildError> {
        let sink = self.sink();
        let module = ctx.module_name.as_str();
        let run = run_id.to_string();
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(module, build_type = ?ctx.stage_args.build_type, stages = self.stages.len(), "Module build started");

        let mut records = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let name = stage.name();
            sink.emit(&BuildEvent::stage_started(module, name)).await;
            let stage_started = Utc::now();
            let stage_clock = Instant::now();

            let output = match stage.execute(ctx).await {
                Ok(output) => output,
                Err(err) => {
                    let message = err.to_string();
                    error!(module, stage = name, content_defect = err.is_content_defect(), error = %message, "Module build failed");
                    sink.emit(&BuildEvent::stage_failed(module, name, &message)).await;
                    sink.emit(&BuildEvent::module_failed(module, &run, name, &message)).await;
                    return Err(BuildError::stage_failed(module, name, err));
                }
            };

            let duration_ms = stage_clock.elapsed().as_secs_f64() * 1000.0;
            if output.is_skip() {
                let reason = output.skip_reason.as_deref().unwrap_or_default();
                info!(module, stage = name, reason, "Stage skipped");
                sink.emit(&BuildEvent::stage_skipped(module, name, reason)).await;
            } else {
                info!(module, stage = name, duration_ms, artifacts = output.artifacts.len(), "Stage completed");
                sink.emit(&BuildEvent::stage_completed(module, name, duration_ms, output.artifacts.len()))
                    .await;
            }

            records.push(StageRecord {
                name: name.to_string(),
                status: output.status,
                started_at: stage_started,
                ended_at: Utc::now(),
                duration_ms,
                artifacts: output.artifacts,
                skip_reason: output.skip_reason,
            });
        }

        let duration_ms = clock.elapsed().as_secs_f64() * 1000.0;
        info!(module, duration_ms, "Module build completed");
        sink.emit(&BuildEvent::module_completed(module, &run, duration_ms)).await;

        Ok(BuildReport {
            run_id,
            pipeline: self.name.clone(),
            module: module.to_string(),
            build_type: ctx.stage_args.build_type,
            started_at,
            ended_at: Utc::now(),
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::PipelineBuilder;
    use crate::core::{StageArtifact, StageOutput};
    use crate::events::CollectingEventSink;
    use crate::testing::{FailingStage, ModuleFixture, RecordingStage};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stages_run_in_order_and_are_recorded() {
        let fixture = ModuleFixture::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = PipelineBuilder::new("full")
            .stage(RecordingStage::new("collect", &log).with_output(StageOutput::ok(vec![StageArtifact::removed("/x")])))
            .stage(RecordingStage::new("styles", &log).with_output(StageOutput::skip("nothing")))
            .with_event_sink(sink.clone())
            .build()
            .unwrap();

        let report = pipeline.run(&fixture.context()).await.unwrap();

        assert_eq!(*log.lock(), vec!["collect", "styles"]);
        assert_eq!(report.module, "shop");
        assert_eq!(report.stage_names(), vec!["collect", "styles"]);
        assert_eq!(report.artifacts().count(), 1);
        assert_eq!(report.stage("styles").unwrap().skip_reason.as_deref(), Some("nothing"));
        assert_eq!(
            sink.event_types(),
            vec![
                "stage.started",
                "stage.completed",
                "stage.started",
                "stage.skipped",
                "module.completed"
            ]
        );
    }

    #[tokio::test]
    async fn test_first_failure_aborts_remaining_stages() {
        let fixture = ModuleFixture::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = PipelineBuilder::new("full")
            .stage(RecordingStage::new("collect", &log))
            .stage(FailingStage::lint("csslint"))
            .stage(RecordingStage::new("styles", &log))
            .with_event_sink(sink.clone())
            .build()
            .unwrap();

        let err = pipeline.run(&fixture.context()).await.unwrap_err();

        assert_eq!(*log.lock(), vec!["collect"]);
        assert!(err.is_content_defect());
        assert!(err.to_string().starts_with("Module 'shop' stage 'csslint' failed"));
        let failed = sink.events_of_type("module.failed");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].str_field("stage"), Some("csslint"));
    }

    #[tokio::test]
    async fn test_system_fault_is_not_content_defect() {
        let fixture = ModuleFixture::new();
        let pipeline = PipelineBuilder::new("full")
            .stage(FailingStage::new("collect"))
            .with_event_sink(Arc::new(CollectingEventSink::new()))
            .build()
            .unwrap();

        let err = pipeline.run(&fixture.context()).await.unwrap_err();
        assert!(!err.is_content_defect());
    }
}

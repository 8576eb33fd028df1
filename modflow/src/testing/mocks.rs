//! Scripted stages for pipeline tests.

use crate::context::ModuleBuildContext;
use crate::core::StageOutput;
use crate::errors::{BuildError, LintFailure};
use crate::stages::Stage;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// A stage that appends its name to a shared log and returns a fixed output.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    output: StageOutput,
}

impl RecordingStage {
    /// Creates a stage that succeeds with no artifacts.
    pub fn new(name: impl Into<String>, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log: Arc::clone(log),
            output: StageOutput::ok_empty(),
        }
    }

    /// Sets the output.
    #[must_use]
    pub fn with_output(mut self, output: StageOutput) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        self.log.lock().push(self.name.clone());
        Ok(self.output.clone())
    }
}

/// A stage that always fails.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
    lint: bool,
}

impl FailingStage {
    /// Fails with a configuration error.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lint: false,
        }
    }

    /// Fails with an empty lint failure.
    pub fn lint(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lint: true,
        }
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &ModuleBuildContext) -> Result<StageOutput, BuildError> {
        if self.lint {
            Err(BuildError::Lint(LintFailure {
                files: Vec::new(),
                forwarded: Vec::new(),
            }))
        } else {
            Err(BuildError::Config(format!("{} failed", self.name)))
        }
    }
}

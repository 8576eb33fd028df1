//! Stage output type with factory methods.

use super::{ArtifactKind, StageArtifact, StageStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The successful outcome of a stage.
///
/// Failures travel on the `Err` side of a stage's result, so an output is
/// either `Ok` or `Skip`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageOutput {
    /// The status of the stage execution.
    pub status: StageStatus,

    /// Files the stage wrote or removed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<StageArtifact>,

    /// Skip reason (for skipped executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl StageOutput {
    /// Creates a successful output with no artifacts.
    #[must_use]
    pub fn ok_empty() -> Self {
        Self::default()
    }

    /// Creates a successful output with artifacts.
    #[must_use]
    pub fn ok(artifacts: Vec<StageArtifact>) -> Self {
        Self {
            status: StageStatus::Ok,
            artifacts,
            skip_reason: None,
        }
    }

    /// Creates a skip output with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skip,
            artifacts: Vec::new(),
            skip_reason: Some(reason.into()),
        }
    }

    /// Appends artifacts to the output.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: impl IntoIterator<Item = StageArtifact>) -> Self {
        self.artifacts.extend(artifacts);
        self
    }

    /// Returns true if the stage was skipped.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.status == StageStatus::Skip
    }

    /// Returns the paths the stage wrote, in order.
    #[must_use]
    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.paths(ArtifactKind::Written)
    }

    /// Returns the paths the stage removed, in order.
    #[must_use]
    pub fn removed_paths(&self) -> Vec<PathBuf> {
        self.paths(ArtifactKind::Removed)
    }

    fn paths(&self, kind: ArtifactKind) -> Vec<PathBuf> {
        self.artifacts
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.path.clone())
            .collect()
    }
}

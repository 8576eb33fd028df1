//! The record of one module build.

use crate::context::BuildType;
use crate::core::{StageArtifact, StageStatus};
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// What happened to one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage name.
    pub name: String,
    /// Outcome.
    pub status: StageStatus,
    /// Start time.
    pub started_at: Timestamp,
    /// End time.
    pub ended_at: Timestamp,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
    /// Files written or removed.
    #[serde(default)]
    pub artifacts: Vec<StageArtifact>,
    /// Why the stage skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

/// The result of a successful module build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// Pipeline name.
    pub pipeline: String,
    /// Module built.
    pub module: String,
    /// Incremental update kind, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_type: Option<BuildType>,
    /// Start time.
    pub started_at: Timestamp,
    /// End time.
    pub ended_at: Timestamp,
    /// One record per stage, in execution order.
    pub records: Vec<StageRecord>,
}

impl BuildReport {
    /// Returns the record of a stage.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Returns every artifact of the run.
    pub fn artifacts(&self) -> impl Iterator<Item = &StageArtifact> {
        self.records.iter().flat_map(|r| r.artifacts.iter())
    }

    /// Returns the paths written by the run.
    #[must_use]
    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.records
            .iter()
            .flat_map(|r| r.artifacts.iter())
            .filter(|a| a.kind == crate::core::ArtifactKind::Written)
            .map(|a| a.path.clone())
            .collect()
    }

    /// Returns the wall time of the run in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let micros = (self.ended_at - self.started_at).num_microseconds().unwrap_or(0) as f64;
        micros / 1000.0
    }

    /// Returns true if every stage skipped.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.records.iter().all(|r| r.status == StageStatus::Skip)
    }
}

//! Core domain model types for module builds.
//!
//! This module contains the values stages hand back to the orchestrator:
//! - Stage status enum
//! - Stage output with factory methods
//! - Artifacts (files a stage wrote or removed) and build events

mod artifact;
mod event;
mod output;
mod status;

pub use artifact::{ArtifactKind, StageArtifact};
pub use event::BuildEvent;
pub use output::StageOutput;
pub use status::StageStatus;

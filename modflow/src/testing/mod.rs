//! Test support: on-disk module fixtures and scripted stages.

mod fixtures;
mod mocks;

pub use fixtures::ModuleFixture;
pub use mocks::{FailingStage, RecordingStage};

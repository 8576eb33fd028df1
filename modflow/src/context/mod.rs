//! Per-invocation build context.
//!
//! This module provides:
//! - Stage arguments describing a full or incremental run
//! - The immutable context handed to every stage of a module build
//! - Path derivation for a module's staging, output and serve trees

mod args;
mod build;
mod layout;

pub use args::{BuildType, StageArgs};
pub use build::ModuleBuildContext;
pub use layout::ModuleLayout;

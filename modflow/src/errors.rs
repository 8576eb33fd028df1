//! Error types for module builds.
//!
//! Stage failures fall into two families: system faults (I/O, malformed
//! configuration, bad glob patterns) and content defects (a stylesheet that
//! fails the lint gate). Both travel through [`BuildError`] so the pipeline
//! can abort uniformly, but lint failures keep their structured detail.

use crate::css::LintMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for module builds.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A file could not be read, written or removed.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A glob pattern could not be compiled.
    #[error("Invalid glob pattern '{pattern}': {message}")]
    Glob {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        /// The JSON file.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// An image could not be decoded or encoded.
    #[error("Image error at {}: {message}", .path.display())]
    Image {
        /// The image path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A per-file transform rejected its input.
    #[error("Transform '{transform}' failed on {}: {message}", .path.display())]
    Transform {
        /// Name of the transform.
        transform: String,
        /// The file being transformed.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The CSS lint gate found error-severity messages.
    #[error("{0}")]
    Lint(#[from] LintFailure),

    /// A stage failed while building a module.
    #[error("Module '{module}' stage '{stage}' failed: {source}")]
    StageFailed {
        /// The module being built.
        module: String,
        /// The stage that failed.
        stage: String,
        /// The stage's own error.
        source: Box<BuildError>,
    },

    /// The pipeline itself is malformed.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A blocking task panicked or was aborted.
    #[error("Task join error: {0}")]
    Join(String),
}

impl BuildError {
    /// Creates an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a JSON error with path context.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Creates a transform error.
    pub fn transform(
        transform: impl Into<String>,
        path: impl Into<PathBuf>,
        message: impl ToString,
    ) -> Self {
        Self::Transform {
            transform: transform.into(),
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Creates an image error.
    pub fn image(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Image {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Wraps a stage error with the module and stage that produced it.
    pub fn stage_failed(module: impl Into<String>, stage: impl Into<String>, source: Self) -> Self {
        Self::StageFailed {
            module: module.into(),
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Returns the lint failure, looking through stage wrappers.
    #[must_use]
    pub fn lint_failure(&self) -> Option<&LintFailure> {
        match self {
            Self::Lint(failure) => Some(failure),
            Self::StageFailed { source, .. } => source.lint_failure(),
            _ => None,
        }
    }

    /// Returns true if this is a content defect rather than a system fault.
    #[must_use]
    pub fn is_content_defect(&self) -> bool {
        self.lint_failure().is_some()
    }
}

/// Lint messages for one stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    /// The stylesheet, relative to the staging tree.
    pub file: PathBuf,
    /// Messages of error severity.
    pub messages: Vec<LintMessage>,
}

/// The lint gate rejected the module's stylesheets.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("CSS lint failed: {} file(s) with errors: {}", .files.len(), list_files(.files))]
pub struct LintFailure {
    /// Every file that carried at least one error.
    pub files: Vec<LintReport>,
    /// Files that passed the gate before the first error was seen.
    pub forwarded: Vec<PathBuf>,
}

impl LintFailure {
    /// Returns the total number of error messages.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.files.iter().map(|f| f.messages.len()).sum()
    }

    /// Returns true if the given stylesheet failed.
    #[must_use]
    pub fn contains(&self, file: &Path) -> bool {
        self.files.iter().any(|f| f.file == file)
    }
}

fn list_files(files: &[LintReport]) -> String {
    files
        .iter()
        .map(|f| f.file.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error raised when a pipeline cannot be assembled.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("stages".to_string(), serde_json::json!(self.stages));
        map
    }
}

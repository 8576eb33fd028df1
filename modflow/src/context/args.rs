//! Per-run stage arguments.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The kind of incremental update requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Pages were added or edited.
    Changed,
    /// Pages were removed.
    Deleted,
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed => write!(f, "changed"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "changed" => Ok(Self::Changed),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("Unknown build type '{other}'")),
        }
    }
}

// Unrecognized types behave like a full build rather than failing to parse.
fn lenient_build_type<'de, D>(deserializer: D) -> Result<Option<BuildType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Arguments for one invocation of a module's stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageArgs {
    /// Restrict page processing to this page name.
    #[serde(default)]
    pub page: Option<String>,
    /// Build for the live preview server.
    #[serde(default)]
    pub is_serve: bool,
    /// Incremental update kind; `None` means a full build.
    #[serde(default, rename = "type", deserialize_with = "lenient_build_type")]
    pub build_type: Option<BuildType>,
    /// Pages affected by an incremental update, in order.
    #[serde(default)]
    pub page_files: Vec<PathBuf>,
    /// Include-directive toggles.
    #[serde(default)]
    pub use_include: HashMap<String, bool>,
}

impl StageArgs {
    /// Creates arguments for a full build.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    /// Creates arguments for a "changed" update.
    #[must_use]
    pub fn changed(page_files: Vec<PathBuf>) -> Self {
        Self {
            is_serve: true,
            build_type: Some(BuildType::Changed),
            page_files,
            ..Self::default()
        }
    }

    /// Creates arguments for a "deleted" update.
    #[must_use]
    pub fn deleted(page_files: Vec<PathBuf>) -> Self {
        Self {
            is_serve: true,
            build_type: Some(BuildType::Deleted),
            page_files,
            ..Self::default()
        }
    }

    /// Restricts the build to one page.
    #[must_use]
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Sets serve mode.
    #[must_use]
    pub fn with_serve(mut self, is_serve: bool) -> Self {
        self.is_serve = is_serve;
        self
    }

    /// Returns true for an incremental update.
    #[must_use]
    pub fn is_incremental(&self) -> bool {
        self.build_type.is_some()
    }

    /// Returns the page files with relative paths resolved against `module_path`.
    #[must_use]
    pub fn resolved_page_files(&self, module_path: &Path) -> Vec<PathBuf> {
        self.page_files
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { module_path.join(p) })
            .collect()
    }
}

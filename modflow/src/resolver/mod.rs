//! The template resolver seam.
//!
//! Stages never look inside templates themselves. They ask a
//! [`TemplateResolver`] for per-file transforms (scan, inject, replace and
//! server injection) and for the reference-map update that follows a scan.

mod mate;
pub mod refs;

pub use mate::MateResolver;

use crate::errors::BuildError;
use crate::reference_map::ReferenceMap;
use crate::stream::FileTransform;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Options shared by every resolver operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Application root.
    pub cwd: PathBuf,
    /// Module name.
    pub module: String,
}

impl ResolverOptions {
    /// Creates options.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>, module: impl Into<String>) -> Self {
        Self {
            cwd: cwd.into(),
            module: module.into(),
        }
    }
}

/// Options for [`TemplateResolver::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Application root and module.
    pub base: ResolverOptions,
    /// Scanning for the preview server.
    pub serve: bool,
    /// Include-directive toggles.
    pub use_include: HashMap<String, bool>,
    /// Directory holding `<name>/<name>.html` widget templates.
    pub widget_dir: PathBuf,
}

/// Options for [`TemplateResolver::replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Application root and module.
    pub base: ResolverOptions,
    /// Application name, part of production URLs.
    pub app: String,
    /// Prefix of production URLs.
    pub publish_prefix: String,
    /// Rewrite for the preview server rather than production.
    pub serve: bool,
}

/// Options for [`TemplateResolver::concat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatOptions {
    /// Application root and module.
    pub base: ResolverOptions,
    /// Restrict the update to these pages; `None` merges every scanned page.
    pub page_files: Option<Vec<PathBuf>>,
    /// Extra assets per page, such as derived stylesheet bundles.
    pub bundles: BTreeMap<String, Vec<String>>,
    /// The reference map file.
    pub map: PathBuf,
}

/// Resolves asset references in templates.
#[async_trait]
pub trait TemplateResolver: Send + Sync + fmt::Debug {
    /// Records each page's asset references and expands widget directives.
    fn scan(&self, options: ScanOptions) -> Arc<dyn FileTransform>;

    /// Normalizes relative asset references.
    fn inject(&self, options: ResolverOptions) -> Arc<dyn FileTransform>;

    /// Rewrites asset references for serve or production.
    fn replace(&self, options: ReplaceOptions) -> Arc<dyn FileTransform>;

    /// Translates generic include directives into the template's runtime syntax.
    fn inject_server(&self, options: ResolverOptions) -> Arc<dyn FileTransform>;

    /// Merges scanned references into the reference map and returns the saved map.
    async fn concat(&self, options: ConcatOptions) -> Result<ReferenceMap, BuildError>;
}

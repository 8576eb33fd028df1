//! The context handed to each stage.

use super::{ModuleLayout, StageArgs};
use crate::config::{AppConfig, ModuleConfig};
use crate::errors::BuildError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a stage needs to know about the module it is building.
///
/// Created once per invocation and shared by reference with every stage;
/// stages never mutate it.
#[derive(Debug, Clone)]
pub struct ModuleBuildContext {
    /// Module name.
    pub module_name: String,
    /// Module source directory.
    pub module_path: PathBuf,
    /// Application root.
    pub app_path: PathBuf,
    /// Per-run arguments.
    pub stage_args: StageArgs,
    app: Arc<AppConfig>,
    module: Arc<ModuleConfig>,
    layout: ModuleLayout,
}

impl ModuleBuildContext {
    /// Creates a context; the module name comes from the module configuration.
    #[must_use]
    pub fn new(
        app: Arc<AppConfig>,
        module: Arc<ModuleConfig>,
        module_path: impl Into<PathBuf>,
        app_path: impl Into<PathBuf>,
        stage_args: StageArgs,
    ) -> Self {
        let module_path = module_path.into();
        let app_path = app_path.into();
        let layout = ModuleLayout::new(&module_path, &app_path, &app.app, &module.module);
        Self {
            module_name: module.module.clone(),
            module_path,
            app_path,
            stage_args,
            app,
            module,
            layout,
        }
    }

    /// Loads `app-conf.json` from the application root and `module-conf.json`
    /// from the module directory.
    pub fn load(
        app_path: impl Into<PathBuf>,
        module_path: impl Into<PathBuf>,
        stage_args: StageArgs,
    ) -> Result<Self, BuildError> {
        let app_path = app_path.into();
        let module_path = module_path.into();
        let app = AppConfig::from_json_file(&app_path.join("app-conf.json"))?;
        let module = ModuleConfig::from_json_file(&module_path.join("module-conf.json"))?;
        Ok(Self::new(Arc::new(app), Arc::new(module), module_path, app_path, stage_args))
    }

    /// Returns a copy with different stage arguments.
    #[must_use]
    pub fn with_args(&self, stage_args: StageArgs) -> Self {
        Self {
            stage_args,
            ..self.clone()
        }
    }

    /// The application configuration.
    #[must_use]
    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// The module configuration.
    #[must_use]
    pub fn config(&self) -> &ModuleConfig {
        &self.module
    }

    /// The module's filesystem layout.
    #[must_use]
    pub fn layout(&self) -> &ModuleLayout {
        &self.layout
    }

    /// Include toggles for this run: the app's, overridden by the stage arguments.
    #[must_use]
    pub fn use_include(&self) -> std::collections::HashMap<String, bool> {
        let mut merged = self.app.use_include.clone();
        merged.extend(self.stage_args.use_include.iter().map(|(k, v)| (k.clone(), *v)));
        merged
    }

    /// Page files of an incremental run, resolved against the module path.
    #[must_use]
    pub fn page_files(&self) -> Vec<PathBuf> {
        self.stage_args.resolved_page_files(&self.module_path)
    }

    /// The module path.
    #[must_use]
    pub fn module_path(&self) -> &Path {
        &self.module_path
    }
}

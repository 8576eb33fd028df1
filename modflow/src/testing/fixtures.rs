//! A throwaway application tree holding one module.

use crate::config::{AppConfig, ModuleConfig};
use crate::context::{ModuleBuildContext, ModuleLayout, StageArgs};
use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Builds module `shop` of application `mall` in a temporary directory.
///
/// Paths passed to `with_file` are relative to the module directory, those
/// passed to `with_app_file` to the application root.
#[derive(Debug)]
pub struct ModuleFixture {
    root: TempDir,
    app: AppConfig,
    module: ModuleConfig,
}

impl Default for ModuleFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleFixture {
    /// Creates an empty module with every optional feature off.
    pub fn new() -> Self {
        let root = TempDir::new().expect("temp dir");
        std::fs::create_dir_all(root.path().join("shop")).expect("module dir");
        Self {
            root,
            app: AppConfig::new("mall"),
            module: ModuleConfig::new("shop"),
        }
    }

    /// The application root.
    pub fn app_path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// The module directory.
    pub fn module_path(&self) -> PathBuf {
        self.root.path().join("shop")
    }

    /// Writes a file under the module directory.
    #[must_use]
    pub fn with_file(self, rel: &str, body: impl AsRef<[u8]>) -> Self {
        write(&self.module_path().join(rel), body.as_ref());
        self
    }

    /// Writes a file under the application root.
    #[must_use]
    pub fn with_app_file(self, rel: &str, body: impl AsRef<[u8]>) -> Self {
        write(&self.app_path().join(rel), body.as_ref());
        self
    }

    /// Writes a solid PNG under the module directory.
    #[must_use]
    pub fn with_png(self, rel: &str, width: u32, height: u32) -> Self {
        let path = self.module_path().join(rel);
        write(&path, b"");
        RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]))
            .save(&path)
            .expect("png written");
        self
    }

    /// Replaces the application configuration.
    #[must_use]
    pub fn with_app_config(mut self, app: AppConfig) -> Self {
        self.app = app;
        self
    }

    /// Replaces the module configuration.
    #[must_use]
    pub fn with_module_config(mut self, module: ModuleConfig) -> Self {
        self.module = module;
        self
    }

    /// A full-build context.
    pub fn context(&self) -> ModuleBuildContext {
        self.context_with(StageArgs::full())
    }

    /// A context with the given arguments.
    pub fn context_with(&self, args: StageArgs) -> ModuleBuildContext {
        ModuleBuildContext::new(
            Arc::new(self.app.clone()),
            Arc::new(self.module.clone()),
            self.module_path(),
            self.app_path(),
            args,
        )
    }

    /// The module's layout.
    pub fn layout(&self) -> ModuleLayout {
        ModuleLayout::new(self.module_path(), self.app_path(), &self.app.app, &self.module.module)
    }

    /// Reads a file as text.
    pub fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
    }

    /// Snapshots every file below `dir`, keyed by relative path.
    pub fn tree(&self, dir: &Path) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect(dir, dir, &mut files);
        files
    }
}

fn write(path: &Path, body: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("parent dir");
    }
    std::fs::write(path, body).expect("fixture file written");
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, files);
        } else if let Ok(rel) = path.strip_prefix(root) {
            let body = std::fs::read(&path).expect("fixture file readable");
            files.insert(rel.to_string_lossy().replace('\\', "/"), body);
        }
    }
}

//! Filesystem layout of a module build.

use std::path::{Path, PathBuf};

/// Every directory a module build reads from or writes to.
///
/// ```text
/// <module>/dist/_            staging tree
/// <module>/dist/output       resolved templates
/// <module>/dist/output/tpl   server-side fragments
/// <module>/dist/_static      static assets
/// <module>/dist/map.json     reference map
/// <app>/.temp/<app>/<module> serve tree
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    module_path: PathBuf,
    app_path: PathBuf,
    app_name: String,
    module_name: String,
}

impl ModuleLayout {
    /// Creates a layout.
    #[must_use]
    pub fn new(
        module_path: impl Into<PathBuf>,
        app_path: impl Into<PathBuf>,
        app_name: impl Into<String>,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            module_path: module_path.into(),
            app_path: app_path.into(),
            app_name: app_name.into(),
            module_name: module_name.into(),
        }
    }

    /// The module source directory.
    #[must_use]
    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    /// The application root.
    #[must_use]
    pub fn app_path(&self) -> &Path {
        &self.app_path
    }

    /// `<module>/dist`.
    #[must_use]
    pub fn dist(&self) -> PathBuf {
        self.module_path.join("dist")
    }

    /// `<module>/dist/_`.
    #[must_use]
    pub fn staging(&self) -> PathBuf {
        self.dist().join("_")
    }

    /// `<module>/dist/_/page`.
    #[must_use]
    pub fn staging_pages(&self) -> PathBuf {
        self.staging().join("page")
    }

    /// `<module>/dist/_/widget`.
    #[must_use]
    pub fn staging_widgets(&self) -> PathBuf {
        self.staging().join("widget")
    }

    /// `<module>/dist/output`.
    #[must_use]
    pub fn output(&self) -> PathBuf {
        self.dist().join("output")
    }

    /// `<module>/dist/output/tpl`.
    #[must_use]
    pub fn tpl(&self) -> PathBuf {
        self.output().join("tpl")
    }

    /// `<module>/dist/_static`.
    #[must_use]
    pub fn static_dir(&self) -> PathBuf {
        self.dist().join("_static")
    }

    /// `<module>/dist/_static/css`.
    #[must_use]
    pub fn static_css(&self) -> PathBuf {
        self.static_dir().join("css")
    }

    /// `<module>/dist/_static/images`.
    #[must_use]
    pub fn static_images(&self) -> PathBuf {
        self.static_dir().join("images")
    }

    /// `<module>/dist/map.json`.
    #[must_use]
    pub fn map_file(&self) -> PathBuf {
        self.dist().join("map.json")
    }

    /// `<module>/module-conf.json`.
    #[must_use]
    pub fn module_conf(&self) -> PathBuf {
        self.module_path.join("module-conf.json")
    }

    /// `<app>/.temp/<app>/<module>`.
    #[must_use]
    pub fn serve_root(&self) -> PathBuf {
        self.app_path
            .join(".temp")
            .join(&self.app_name)
            .join(&self.module_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = ModuleLayout::new("/work/mall/shop", "/work/mall", "mall", "shop");

        assert_eq!(layout.staging(), PathBuf::from("/work/mall/shop/dist/_"));
        assert_eq!(layout.tpl(), PathBuf::from("/work/mall/shop/dist/output/tpl"));
        assert_eq!(layout.static_css(), PathBuf::from("/work/mall/shop/dist/_static/css"));
        assert_eq!(layout.map_file(), PathBuf::from("/work/mall/shop/dist/map.json"));
        assert_eq!(layout.serve_root(), PathBuf::from("/work/mall/.temp/mall/shop"));
    }
}

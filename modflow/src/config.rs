//! Application and module configuration.
//!
//! Both documents are JSON (`app-conf.json` at the application root,
//! `module-conf.json` in each module). Optional features in the module's
//! `support` block are off when the block is missing and on when it is
//! present, unless it says `"enable": false`.

use crate::css::{PxToRemOptions, DEFAULT_BROWSERS};
use crate::errors::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

fn default_platform() -> String {
    "mobile".to_string()
}

fn default_enable() -> bool {
    true
}

fn default_publish_prefix() -> String {
    "/".to_string()
}

/// Application-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Application name; names the serve tree directory.
    pub app: String,
    /// Target platform, used to pick the vendor-prefix browser list.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Include-directive toggles, e.g. `{"widget": true}`.
    #[serde(default)]
    pub use_include: HashMap<String, bool>,
    /// Prefix for production asset URLs.
    #[serde(default = "default_publish_prefix")]
    pub publish_prefix: String,
}

impl AppConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            platform: default_platform(),
            use_include: HashMap::new(),
            publish_prefix: default_publish_prefix(),
        }
    }

    /// Sets the platform.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Sets an include toggle.
    #[must_use]
    pub fn with_include(mut self, key: impl Into<String>, enabled: bool) -> Self {
        self.use_include.insert(key.into(), enabled);
        self
    }

    /// Sets the production URL prefix.
    #[must_use]
    pub fn with_publish_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.publish_prefix = prefix.into();
        self
    }

    /// Loads from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, BuildError> {
        load_json(path)
    }
}

/// A feature toggle block with nothing but `enable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    /// Whether the feature runs.
    #[serde(default = "default_enable")]
    pub enable: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self { enable: true }
    }
}

/// Sprite sheet settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CssSpriteConfig {
    /// Whether sprites are generated.
    #[serde(default = "default_enable")]
    pub enable: bool,
    /// Source images are 2x.
    #[serde(default)]
    pub retina: bool,
    /// Express positions in rem with this root size.
    #[serde(default)]
    pub rootvalue: Option<f64>,
    /// Pixels between images.
    #[serde(default)]
    pub padding: u32,
}

impl Default for CssSpriteConfig {
    fn default() -> Self {
        Self {
            enable: true,
            retina: false,
            rootvalue: None,
            padding: 0,
        }
    }
}

/// Pixel to rem settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Px2RemConfig {
    /// Whether conversion runs.
    #[serde(default = "default_enable")]
    pub enable: bool,
    /// Conversion options.
    #[serde(flatten)]
    pub options: PxToRemOptions,
}

impl Default for Px2RemConfig {
    fn default() -> Self {
        Self {
            enable: true,
            options: PxToRemOptions::default(),
        }
    }
}

/// Optional build features of a module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Support {
    /// CSS lint gate.
    #[serde(default)]
    pub csslint: Option<Toggle>,
    /// Sprite sheet generation.
    #[serde(default)]
    pub csssprite: Option<CssSpriteConfig>,
    /// Pixel to rem conversion.
    #[serde(default)]
    pub px2rem: Option<Px2RemConfig>,
    /// Browser lists keyed by platform.
    #[serde(default)]
    pub autoprefixer: Option<HashMap<String, Vec<String>>>,
}

/// Per-module configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module name.
    pub module: String,
    /// Optional features.
    #[serde(default)]
    pub support: Support,
}

impl ModuleConfig {
    /// Creates a configuration with every optional feature off.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            support: Support::default(),
        }
    }

    /// Sets the lint toggle.
    #[must_use]
    pub fn with_csslint(mut self, enable: bool) -> Self {
        self.support.csslint = Some(Toggle { enable });
        self
    }

    /// Sets the sprite settings.
    #[must_use]
    pub fn with_csssprite(mut self, sprite: CssSpriteConfig) -> Self {
        self.support.csssprite = Some(sprite);
        self
    }

    /// Sets the pixel to rem settings.
    #[must_use]
    pub fn with_px2rem(mut self, px2rem: Px2RemConfig) -> Self {
        self.support.px2rem = Some(px2rem);
        self
    }

    /// Sets the browser list for one platform.
    #[must_use]
    pub fn with_browsers(mut self, platform: impl Into<String>, browsers: Vec<String>) -> Self {
        self.support
            .autoprefixer
            .get_or_insert_with(HashMap::new)
            .insert(platform.into(), browsers);
        self
    }

    /// Loads from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, BuildError> {
        load_json(path)
    }

    /// Returns true if the lint gate runs.
    #[must_use]
    pub fn csslint_enabled(&self) -> bool {
        self.support.csslint.is_some_and(|t| t.enable)
    }

    /// Returns the sprite settings if sprites are enabled.
    #[must_use]
    pub fn csssprite(&self) -> Option<&CssSpriteConfig> {
        self.support.csssprite.as_ref().filter(|s| s.enable)
    }

    /// Returns the conversion options if pixel to rem is enabled.
    #[must_use]
    pub fn px2rem(&self) -> Option<&PxToRemOptions> {
        self.support
            .px2rem
            .as_ref()
            .filter(|p| p.enable)
            .map(|p| &p.options)
    }

    /// Returns the vendor-prefix browser list for a platform.
    ///
    /// Falls back to [`DEFAULT_BROWSERS`] when nothing is configured for it.
    #[must_use]
    pub fn browsers(&self, platform: &str) -> Vec<String> {
        self.support
            .autoprefixer
            .as_ref()
            .and_then(|lists| lists.get(platform))
            .cloned()
            .unwrap_or_else(|| DEFAULT_BROWSERS.iter().map(|s| (*s).to_string()).collect())
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, BuildError> {
    let text = std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| BuildError::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_app_config_defaults() {
        let conf: AppConfig = serde_json::from_str(r#"{"app": "mall"}"#).unwrap();
        assert_eq!(conf, AppConfig::new("mall"));
        assert_eq!(conf.platform, "mobile");
    }

    #[test]
    fn test_app_config_camel_case() {
        let conf: AppConfig =
            serde_json::from_str(r#"{"app": "mall", "platform": "pc", "useInclude": {"widget": true}}"#).unwrap();
        assert_eq!(conf.use_include.get("widget"), Some(&true));
        assert_eq!(conf.platform, "pc");
    }

    #[test]
    fn test_missing_blocks_disable_features() {
        let conf: ModuleConfig = serde_json::from_str(r#"{"module": "shop"}"#).unwrap();
        assert!(!conf.csslint_enabled());
        assert!(conf.csssprite().is_none());
        assert!(conf.px2rem().is_none());
    }

    #[test]
    fn test_present_blocks_enable_unless_disabled() {
        let conf: ModuleConfig = serde_json::from_str(
            r#"{
                "module": "shop",
                "support": {
                    "csslint": {},
                    "csssprite": {"enable": false, "retina": true},
                    "px2rem": {"root_value": 40, "replace": false}
                }
            }"#,
        )
        .unwrap();

        assert!(conf.csslint_enabled());
        assert!(conf.csssprite().is_none());
        let px = conf.px2rem().unwrap();
        assert!((px.root_value - 40.0).abs() < f64::EPSILON);
        assert!(!px.replace);
        assert_eq!(px.unit_precision, 5);
    }

    #[test]
    fn test_browsers_by_platform() {
        let conf = ModuleConfig::new("shop").with_browsers("mobile", vec!["iOS >= 7".to_string()]);
        assert_eq!(conf.browsers("mobile"), vec!["iOS >= 7".to_string()]);
        assert_eq!(conf.browsers("pc").len(), DEFAULT_BROWSERS.len());
        assert_eq!(ModuleConfig::new("x").browsers("mobile")[0], "> 1%");
    }

    #[test]
    fn test_from_json_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("module-conf.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = ModuleConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, BuildError::Json { .. }));

        let err = ModuleConfig::from_json_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }
}

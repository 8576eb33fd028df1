//! The persisted page to asset reference map.
//!
//! One JSON document per module at `dist/map.json`. Each build merges the
//! pages it processed into the map; pages it did not touch keep their
//! entries, so a single-page incremental run never loses the rest.

use crate::errors::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Page identity to referenced asset paths, in first-reference order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMap {
    /// Owning module.
    pub module: String,
    /// Assets referenced by each page.
    #[serde(default)]
    pub pages: BTreeMap<String, Vec<String>>,
}

impl ReferenceMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            pages: BTreeMap::new(),
        }
    }

    /// Loads the map, or returns an empty one if the file does not exist.
    pub async fn load(path: &Path, module: &str) -> Result<Self, BuildError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| BuildError::json(path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new(module)),
            Err(e) => Err(BuildError::io(path, e)),
        }
    }

    /// Writes the map as pretty JSON via a sibling temp file and a rename.
    pub async fn save(&self, path: &Path) -> Result<(), BuildError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BuildError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| BuildError::json(path, e))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| BuildError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| BuildError::io(path, e))?;
        debug!(path = %path.display(), pages = self.pages.len(), "Saved reference map");
        Ok(())
    }

    /// Replaces one page's entry. Duplicates are dropped, first occurrence wins.
    pub fn merge_page(&mut self, page: impl Into<String>, assets: impl IntoIterator<Item = String>) {
        let mut unique: Vec<String> = Vec::new();
        for asset in assets {
            if !unique.contains(&asset) {
                unique.push(asset);
            }
        }
        self.pages.insert(page.into(), unique);
    }

    /// Returns the assets recorded for a page.
    #[must_use]
    pub fn assets(&self, page: &str) -> Option<&[String]> {
        self.pages.get(page).map(Vec::as_slice)
    }

    /// Returns every page that references an asset.
    #[must_use]
    pub fn pages_referencing(&self, asset: &str) -> Vec<&str> {
        self.pages
            .iter()
            .filter(|(_, assets)| assets.iter().any(|a| a == asset))
            .map(|(page, _)| page.as_str())
            .collect()
    }
}

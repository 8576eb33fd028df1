//! Stage artifact type for recording filesystem effects.

use crate::stream::VirtualFile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a stage did to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The file was written.
    Written,
    /// The path was removed.
    Removed,
}

/// A filesystem effect produced by a stage.
///
/// Build reports collect these so callers can tell exactly which outputs a
/// run touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageArtifact {
    /// What happened to the path.
    pub kind: ArtifactKind,

    /// The affected path.
    pub path: PathBuf,

    /// SHA-256 of the written contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// When the artifact was recorded (ISO 8601).
    pub created_at: String,
}

impl StageArtifact {
    /// Records a written file.
    #[must_use]
    pub fn written(file: &VirtualFile) -> Self {
        Self {
            kind: ArtifactKind::Written,
            path: file.path.clone(),
            digest: Some(file.digest()),
            created_at: crate::utils::iso_timestamp(),
        }
    }

    /// Records a removed path.
    #[must_use]
    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ArtifactKind::Removed,
            path: path.into(),
            digest: None,
            created_at: crate::utils::iso_timestamp(),
        }
    }

    /// Returns true if the artifact lives under `dir`.
    #[must_use]
    pub fn is_under(&self, dir: &Path) -> bool {
        self.path.starts_with(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_artifact_carries_digest() {
        let file = VirtualFile::new("/m/dist/_/static/css/home.css", "/m/dist/_", "a{}");
        let artifact = StageArtifact::written(&file);

        assert_eq!(artifact.kind, ArtifactKind::Written);
        assert_eq!(artifact.digest.as_deref(), Some(file.digest().as_str()));
        assert!(artifact.is_under(Path::new("/m/dist/_/static")));
    }

    #[test]
    fn test_removed_artifact_serialization() {
        let artifact = StageArtifact::removed("/tmp/serve/home.html");
        let json = serde_json::to_value(&artifact).unwrap();

        assert_eq!(json["kind"], "removed");
        assert!(json.get("digest").is_none());

        let back: StageArtifact = serde_json::from_value(json).unwrap();
        assert_eq!(back, artifact);
    }
}

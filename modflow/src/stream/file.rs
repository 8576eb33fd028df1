//! In-memory representation of a file flowing through a stage.

use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// A file read from disk, carried between transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Base directory; `dest` writes the file at `dir/relative()`.
    pub base: PathBuf,
    /// Raw file contents.
    pub contents: Vec<u8>,
    /// Asset references attached by the template scanner.
    pub refs: Vec<String>,
}

impl VirtualFile {
    /// Creates a new virtual file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: contents.into(),
            refs: Vec::new(),
        }
    }

    /// Returns the path relative to the base.
    ///
    /// Falls back to the file name when the path does not live under the base.
    #[must_use]
    pub fn relative(&self) -> PathBuf {
        match self.path.strip_prefix(&self.base) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => self.path.file_name().map(PathBuf::from).unwrap_or_default(),
        }
    }

    /// Returns the file stem (`home` for `page/home/home.html`).
    #[must_use]
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }

    /// Returns the file extension.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|s| s.to_str())
    }

    /// Returns true if the file has the given extension.
    #[must_use]
    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Returns the contents as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }

    /// Replaces the contents with text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.contents = text.into().into_bytes();
    }

    /// Rebases the file on its parent directory so only the file name remains.
    #[must_use]
    pub fn flattened(mut self) -> Self {
        if let Some(parent) = self.path.parent() {
            self.base = parent.to_path_buf();
        }
        self
    }

    /// Returns the same file relocated under a new base.
    #[must_use]
    pub fn rebased(mut self, dir: &Path) -> Self {
        self.path = dir.join(self.relative());
        self.base = dir.to_path_buf();
        self
    }

    /// Returns the hex SHA-256 digest of the contents.
    #[must_use]
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.contents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_under_base() {
        let file = VirtualFile::new("/m/dist/_/page/home/home.html", "/m/dist/_", "x");
        assert_eq!(file.relative(), PathBuf::from("page/home/home.html"));
        assert_eq!(file.stem(), Some("home"));
        assert!(file.has_extension("HTML"));
    }

    #[test]
    fn test_relative_outside_base_uses_file_name() {
        let file = VirtualFile::new("/other/a.css", "/m/dist", "x");
        assert_eq!(file.relative(), PathBuf::from("a.css"));
    }

    #[test]
    fn test_flatten_and_rebase() {
        let file = VirtualFile::new("/m/dist/_/page/home/home.html", "/m/dist/_", "x")
            .flattened()
            .rebased(Path::new("/serve/shop"));

        assert_eq!(file.path, PathBuf::from("/serve/shop/home.html"));
        assert_eq!(file.relative(), PathBuf::from("home.html"));
    }

    #[test]
    fn test_digest_is_stable() {
        let a = VirtualFile::new("/a", "/", "body {}");
        let b = VirtualFile::new("/b", "/", "body {}");
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}

//! Per-file transforms and the policies for applying them.

use super::VirtualFile;
use crate::errors::BuildError;
use std::sync::Arc;
use tracing::warn;

/// A transform applied to each file of a stream.
pub trait FileTransform: Send + Sync {
    /// Returns the transform name used in logs and errors.
    fn name(&self) -> &str;

    /// Transforms one file.
    fn transform(&self, file: VirtualFile) -> Result<VirtualFile, BuildError>;
}

/// How a stream reacts to a failing transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plumbing {
    /// The first error aborts the stream.
    #[default]
    Strict,
    /// Errors are logged and the untouched file continues downstream.
    Plumbed,
}

/// Applies a transform to every file, preserving order.
pub fn pipe(
    files: Vec<VirtualFile>,
    transform: &dyn FileTransform,
    plumbing: Plumbing,
) -> Result<Vec<VirtualFile>, BuildError> {
    let mut out = Vec::with_capacity(files.len());
    for file in files {
        let original = (plumbing == Plumbing::Plumbed).then(|| file.clone());
        match transform.transform(file) {
            Ok(file) => out.push(file),
            Err(err) => match original {
                Some(original) => {
                    warn!(
                        transform = transform.name(),
                        path = %original.path.display(),
                        error = %err,
                        "Transform failed, passing file through"
                    );
                    out.push(original);
                }
                None => return Err(err),
            },
        }
    }
    Ok(out)
}

/// Runs [`pipe`] on the blocking pool.
///
/// Used for transforms that do heavy CPU work or synchronous file access.
pub async fn pipe_blocking(
    files: Vec<VirtualFile>,
    transform: Arc<dyn FileTransform>,
    plumbing: Plumbing,
) -> Result<Vec<VirtualFile>, BuildError> {
    tokio::task::spawn_blocking(move || pipe(files, transform.as_ref(), plumbing))
        .await
        .map_err(|e| BuildError::Join(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl FileTransform for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn transform(&self, mut file: VirtualFile) -> Result<VirtualFile, BuildError> {
            if file.text().contains("bad") {
                return Err(BuildError::transform("upper", &file.path, "bad input"));
            }
            let text = file.text().to_uppercase();
            file.set_text(text);
            Ok(file)
        }
    }

    fn files() -> Vec<VirtualFile> {
        vec![
            VirtualFile::new("/a.css", "/", "a"),
            VirtualFile::new("/b.css", "/", "bad"),
            VirtualFile::new("/c.css", "/", "c"),
        ]
    }

    #[test]
    fn test_strict_pipe_stops_on_error() {
        let err = pipe(files(), &Upper, Plumbing::Strict).unwrap_err();
        assert!(err.to_string().contains("bad input"));
    }

    #[test]
    fn test_plumbed_pipe_passes_failed_file_through() {
        let out = pipe(files(), &Upper, Plumbing::Plumbed).unwrap();
        let texts: Vec<String> = out.iter().map(|f| f.text().into_owned()).collect();
        assert_eq!(texts, vec!["A", "bad", "C"]);
    }

    #[tokio::test]
    async fn test_pipe_blocking() {
        let out = pipe_blocking(
            vec![VirtualFile::new("/a.css", "/", "a")],
            Arc::new(Upper),
            Plumbing::Strict,
        )
        .await
        .unwrap();
        assert_eq!(out[0].text(), "A");
    }
}

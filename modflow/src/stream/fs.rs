//! Reading and writing file trees.

use super::VirtualFile;
use crate::errors::BuildError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Joins a directory and a glob into a pattern string.
#[must_use]
pub fn pattern(dir: &Path, glob: &str) -> String {
    dir.join(glob).to_string_lossy().into_owned()
}

/// Expands `{a,b}` groups into one pattern per alternative.
///
/// Groups may nest. An unmatched `{` is left as a literal.
#[must_use]
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut close = None;
    for (i, c) in pattern.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let inner = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];

    let mut alternatives = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                alternatives.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    alternatives.push(&inner[start..]);

    alternatives
        .into_iter()
        .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
        .collect()
}

fn is_wild(segment: &str) -> bool {
    segment.chars().any(|c| matches!(c, '*' | '?' | '[' | '{'))
}

/// Returns the static directory prefix of a glob.
///
/// For a pattern without wildcards this is the parent directory.
#[must_use]
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let mut wild = false;
    for component in Path::new(pattern).components() {
        if is_wild(&component.as_os_str().to_string_lossy()) {
            wild = true;
            break;
        }
        base.push(component);
    }
    if !wild {
        base.pop();
    }
    base
}

fn glob_error(pattern: &str, err: impl ToString) -> BuildError {
    BuildError::Glob {
        pattern: pattern.to_string(),
        message: err.to_string(),
    }
}

fn matching_paths(pattern: &str) -> Result<Vec<PathBuf>, BuildError> {
    if !is_wild(pattern) {
        let path = PathBuf::from(pattern);
        if path.is_file() {
            return Ok(vec![path]);
        }
        debug!(pattern = %pattern, "Singular pattern matched no file");
        return Ok(Vec::new());
    }

    let entries = glob::glob(pattern).map_err(|e| glob_error(pattern, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => {
                // Unreadable entries are skipped, not fatal
                warn!(pattern = %pattern, error = %e, "Error reading path during glob");
            }
        }
    }
    Ok(paths)
}

/// Reads every file matching `patterns`.
///
/// Patterns prefixed with `!` exclude matches. Files keep the order in which
/// the patterns produced them, without duplicates. When `base` is `None` the
/// glob base of the first positive pattern is used.
pub async fn src(patterns: &[String], base: Option<&Path>) -> Result<Vec<VirtualFile>, BuildError> {
    let (negated, positive): (Vec<&String>, Vec<&String>) =
        patterns.iter().partition(|p| p.starts_with('!'));

    let mut excludes = Vec::new();
    for raw in negated {
        for expanded in expand_braces(&raw[1..]) {
            excludes.push(glob::Pattern::new(&expanded).map_err(|e| glob_error(&expanded, e))?);
        }
    }

    let base = match base {
        Some(dir) => dir.to_path_buf(),
        None => positive.first().map(|p| glob_base(p)).unwrap_or_default(),
    };

    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    for raw in positive {
        for expanded in expand_braces(raw) {
            for path in matching_paths(&expanded)? {
                if excludes.iter().any(|ex| ex.matches_path(&path)) {
                    continue;
                }
                if seen.insert(path.clone()) {
                    paths.push(path);
                }
            }
        }
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let contents = tokio::fs::read(&path)
            .await
            .map_err(|e| BuildError::io(&path, e))?;
        files.push(VirtualFile::new(path, base.clone(), contents));
    }
    Ok(files)
}

/// Reads files by exact path; glob metacharacters in the paths are literal.
///
/// Missing paths are skipped and duplicates dropped. When `base` is `None`
/// each file is based on its own parent directory.
pub async fn src_paths(paths: &[PathBuf], base: Option<&Path>) -> Result<Vec<VirtualFile>, BuildError> {
    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        if !seen.insert(path.clone()) {
            continue;
        }
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Path matched no file");
                continue;
            }
            Err(e) => return Err(BuildError::io(path, e)),
        };
        let base = match base {
            Some(dir) => dir.to_path_buf(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        files.push(VirtualFile::new(path.clone(), base, contents));
    }
    Ok(files)
}

/// Writes files under `dir`, each at its path relative to its base.
///
/// Returns the files relocated to their written paths.
pub async fn dest(files: Vec<VirtualFile>, dir: &Path) -> Result<Vec<VirtualFile>, BuildError> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let file = file.rebased(dir);
        if let Some(parent) = file.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BuildError::io(parent, e))?;
        }
        tokio::fs::write(&file.path, &file.contents)
            .await
            .map_err(|e| BuildError::io(&file.path, e))?;
        written.push(file);
    }
    Ok(written)
}

/// Drops directory structure so each file is written by name only.
#[must_use]
pub fn flatten(files: Vec<VirtualFile>) -> Vec<VirtualFile> {
    files.into_iter().map(VirtualFile::flattened).collect()
}

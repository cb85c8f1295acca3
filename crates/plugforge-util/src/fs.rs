//! Filesystem utilities for plugforge.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Copy `src` to `dest`, creating parent directories as needed.
///
/// # Errors
/// Returns an error if the copy fails.
pub fn copy_file(src: &Path, dest: &Path) -> Result<(), UtilError> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    std::fs::copy(src, dest).map_err(|source| UtilError::Io {
        path: dest.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Collect all files matching `pattern` inside `dir`, sorted by path.
///
/// The `pattern` is a glob expression relative to `dir` (e.g. `"build/libs/*.jar"`).
///
/// # Errors
/// Returns an error if the glob pattern is invalid.
pub fn collect_matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, UtilError> {
    let full_pattern = dir.join(pattern);
    let full_pattern_str = full_pattern.display().to_string();

    let mut paths: Vec<_> = glob::glob(&full_pattern_str)
        .map_err(|e| UtilError::GlobPattern {
            pattern: full_pattern_str.clone(),
            message: e.to_string(),
        })?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();

    paths.sort();
    Ok(paths)
}

/// Collect every file under `dir`, recursively, as paths relative to `dir`
/// with `/` separators, sorted. Returns an empty list if `dir` is absent.
///
/// # Errors
/// Returns an error if a directory cannot be read.
pub fn relative_files(dir: &Path) -> Result<Vec<String>, UtilError> {
    let mut out = Vec::new();
    if dir.is_dir() {
        relative_files_recursive(dir, dir, &mut out)?;
    }
    out.sort();
    Ok(out)
}

fn relative_files_recursive(
    base: &Path,
    dir: &Path,
    out: &mut Vec<String>,
) -> Result<(), UtilError> {
    let entries = std::fs::read_dir(dir).map_err(|source| UtilError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            relative_files_recursive(base, &path, out)?;
        } else {
            let relative = path.strip_prefix(base).unwrap_or(&path);
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(name);
        }
    }

    Ok(())
}

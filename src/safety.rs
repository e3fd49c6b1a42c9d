//! Safety checks before writing into the output directory.
//!
//! Album directories are created and overwritten freely, so the output root
//! must never overlap the download cache: a stray album directory there would
//! be picked up as a cached download on the next run.

use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn lexically_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve symlinks as far as `path` exists on disk, then re-append the
/// missing tail, so directories that will be created later still compare.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(real) = path.canonicalize() {
        return real;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => resolve(parent).join(name),
        _ => path.to_path_buf(),
    }
}

fn normalize(path: &Path) -> PathBuf {
    resolve(&lexically_clean(&absolute(path)))
}

/// Validates that `output` is safe to write albums into.
///
/// Fails when the output root is the cache directory, lies inside it, or
/// contains it.
pub fn validate_output_dir(output: &Path, cache_dir: &Path) -> Result<()> {
    let output = normalize(output);
    let cache = normalize(cache_dir);

    if output == cache {
        bail!(
            "Safety check failed: output directory '{}' is the download cache",
            output.display()
        );
    }
    if output.starts_with(&cache) {
        bail!(
            "Safety check failed: output directory '{}' is inside the download cache '{}'",
            output.display(),
            cache.display()
        );
    }
    if cache.starts_with(&output) {
        bail!(
            "Safety check failed: download cache '{}' is inside output directory '{}'",
            cache.display(),
            output.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separate_dirs_ok() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("music");
        let cache = root.path().join("cache");
        assert!(validate_output_dir(&out, &cache).is_ok());
    }

    #[test]
    fn test_same_dir_rejected() {
        let root = tempfile::tempdir().unwrap();
        assert!(validate_output_dir(root.path(), root.path()).is_err());
    }

    #[test]
    fn test_output_inside_cache_rejected() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("cache").join("albums");
        let err = validate_output_dir(&out, &root.path().join("cache")).unwrap_err();
        assert!(err.to_string().contains("inside the download cache"));
    }

    #[test]
    fn test_cache_inside_output_rejected() {
        let root = tempfile::tempdir().unwrap();
        let cache = root.path().join(".cache");
        assert!(validate_output_dir(root.path(), &cache).is_err());
    }

    #[test]
    fn test_dot_dot_is_resolved() {
        let root = tempfile::tempdir().unwrap();
        let cache = root.path().join("cache");
        let sneaky = root.path().join("music").join("..").join("cache").join("x");
        assert!(validate_output_dir(&sneaky, &cache).is_err());
    }

    #[test]
    fn test_sibling_with_common_prefix_ok() {
        let root = tempfile::tempdir().unwrap();
        let cache = root.path().join("cache");
        let out = root.path().join("cache-out");
        assert!(validate_output_dir(&out, &cache).is_ok());
    }
}

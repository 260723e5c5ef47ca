use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const ARCHIVE_FILENAME: &str = "archive.tar.gz";

/// Why `component` can't be used as a single path segment, in a file path
/// or in a registry URL. None if it can.
pub fn path_component_problem(component: &str) -> Option<String> {
    if component.is_empty() {
        return Some("cannot be empty".to_string());
    }

    if component == "." || component == ".." {
        return Some(format!("cannot be '{}'", component));
    }

    if component.contains('/') || component.contains('\\') {
        return Some("cannot contain path separators".to_string());
    }

    if component.contains('\0') {
        return Some("cannot contain null bytes".to_string());
    }

    // Reserved in URLs: would end the path or be decoded by the router
    if let Some(c) = component
        .chars()
        .find(|c| matches!(c, '?' | '#' | '%') || c.is_control())
    {
        return Some(format!("cannot contain {:?}", c));
    }

    None
}

/// Validate a path component to prevent directory traversal attacks
fn validate_path_component(component: &str) -> Result<()> {
    match path_component_problem(component) {
        Some(problem) => Err(Error::validation(format!("path component {problem}"))),
        None => Ok(()),
    }
}

/// Validate that a constructed path is within the base directory
fn validate_path_within_base(base: &Path, path: &Path) -> Result<()> {
    // Nothing can escape a base that doesn't exist yet
    if !base.exists() {
        return Ok(());
    }
    let canonical_base = base.canonicalize()?;

    // Walk up to the deepest existing ancestor; symlinks there are what matter
    let mut existing = path;
    while !existing.exists() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return Ok(()),
        }
    }

    if !existing.canonicalize()?.starts_with(&canonical_base) {
        return Err(Error::validation("path traversal detected"));
    }

    Ok(())
}

/// Read-only view of the blob store holding package archives.
/// Structure: {data_path}/packages/{name}/{version}/archive.tar.gz
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    base_path: PathBuf,
}

impl ArchiveStore {
    pub fn new(data_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: data_path.as_ref().join("packages"),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Create the archive root if it is missing
    pub async fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    /// Get the path for a package version's archive
    pub fn archive_path(&self, name: &str, version: &str) -> Result<PathBuf> {
        validate_path_component(name)?;
        validate_path_component(version)?;

        let path = self
            .base_path
            .join(name)
            .join(version)
            .join(ARCHIVE_FILENAME);

        validate_path_within_base(&self.base_path, &path)?;

        Ok(path)
    }

    /// Read an archive, or None if the blob store has nothing for this version
    pub async fn read_archive(&self, name: &str, version: &str) -> Result<Option<Vec<u8>>> {
        let path = self.archive_path(name, version)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_traversal_components() {
        let store = ArchiveStore::new("/tmp/cpm-registry-test");
        assert!(store.archive_path("..", "1.0.0").is_err());
        assert!(store.archive_path("pkg", ".").is_err());
        assert!(store.archive_path("a/b", "1.0.0").is_err());
        assert!(store.archive_path("pkg", "1.0\\0").is_err());
        assert!(store.archive_path("pkg", "").is_err());
        assert!(store.archive_path("pkg?x", "1.0.0").is_err());
        assert!(store.archive_path("pkg", "1.0#frag").is_err());
    }

    #[test]
    fn test_archive_path_layout() {
        let store = ArchiveStore::new("/srv/registry");
        let path = store.archive_path("libmath", "1.1.0").unwrap();
        assert_eq!(
            path,
            PathBuf::from("/srv/registry/packages/libmath/1.1.0/archive.tar.gz")
        );
    }

    #[tokio::test]
    async fn test_read_archive() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ArchiveStore::new(dir.path());
        store.ensure_layout().await.unwrap();

        assert!(store.read_archive("pkg", "1.0.0").await.unwrap().is_none());

        let path = store.archive_path("pkg", "1.0.0").unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"archive-bytes").unwrap();

        let data = store.read_archive("pkg", "1.0.0").await.unwrap();
        assert_eq!(data.as_deref(), Some(&b"archive-bytes"[..]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rejects_symlink_escape() {
        let dir = tempfile::TempDir::new().unwrap();
        let outside = tempfile::TempDir::new().unwrap();
        let store = ArchiveStore::new(dir.path());
        store.ensure_layout().await.unwrap();

        std::os::unix::fs::symlink(outside.path(), store.base_path().join("evil")).unwrap();

        let result = store.archive_path("evil", "1.0.0");
        assert!(matches!(result, Err(Error::Validation { .. })));
    }
}

//! Scratch directory owned by one pipeline run

use lobup_errors::{Error, PackageError};
use std::path::{Path, PathBuf};

/// A freshly created, uniquely named directory for extracted files
///
/// [`ScratchDir::remove`] deletes it explicitly; a dir that was never removed
/// is cleaned up on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: Option<PathBuf>,
}

impl ScratchDir {
    /// Create a new scratch directory under `root`
    ///
    /// # Errors
    ///
    /// Returns `PackageError::ScratchDir` if the directory cannot be created.
    pub async fn create(root: &Path) -> Result<Self, Error> {
        let path = root.join(format!("lobup-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| PackageError::ScratchDir {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), "created scratch directory");
        Ok(Self { path: Some(path) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Delete the directory and everything in it
    ///
    /// # Errors
    ///
    /// Returns `PackageError::ScratchDir` if removal fails. The directory is
    /// not retried on drop afterwards.
    pub async fn remove(mut self) -> Result<(), Error> {
        let Some(path) = self.path.take() else {
            return Ok(());
        };
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed scratch directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PackageError::ScratchDir {
                path: path.display().to_string(),
                message: e.to_string(),
            }
            .into()),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_dir_all(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_remove() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path()).await.unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path.starts_with(root.path()));

        tokio::fs::write(path.join("f"), b"x").await.unwrap();
        scratch.remove().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::create(root.path()).await.unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unique_names() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchDir::create(root.path()).await.unwrap();
        let b = ScratchDir::create(root.path()).await.unwrap();
        assert_ne!(a.path(), b.path());
    }
}

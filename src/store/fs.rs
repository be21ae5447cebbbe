//! Directory-backed object store.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::event::key_to_relative_path;

use super::ObjectStore;

/// Object store rooted at a local directory.
///
/// Container `c` is the directory `root/c`, and key `k` in it is the file
/// `root/c/k`. Handy for local runs and tests; uploads overwrite in place.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path of `container/key`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidKey`] if either part would leave the root.
    pub fn object_path(&self, container: &str, key: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join(key_to_relative_path(container)?)
            .join(key_to_relative_path(key)?))
    }
}

impl ObjectStore for FsObjectStore {
    fn download(&self, container: &str, key: &str, dest: &Path) -> Result<()> {
        let src = self.object_path(container, key)?;
        if !src.is_file() {
            return Err(Error::ObjectNotFound {
                container: container.to_string(),
                key: key.to_string(),
            });
        }
        std::fs::copy(&src, dest).map_err(|e| Error::StorageRead {
            container: container.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn upload(&self, src: &Path, container: &str, key: &str) -> Result<()> {
        let mut input = File::open(src)?;
        let dest = self.object_path(container, key)?;

        let write_err = |e: io::Error| Error::StorageWrite {
            container: container.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut output = File::create(&dest).map_err(write_err)?;
        io::copy(&mut input, &mut output).map_err(write_err)?;
        output.sync_all().map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_missing_object_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(root.path());
        let dest = root.path().join("dest.png");

        let err = store.download("uploads", "nope.png", &dest).unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectNotFound { ref container, ref key } if container == "uploads" && key == "nope.png"
        ));
        assert!(!dest.exists());
    }

    #[test]
    fn upload_overwrites_existing_object() {
        let root = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(root.path());
        let src = root.path().join("local.bin");

        std::fs::write(&src, b"first").unwrap();
        store.upload(&src, "uploads", "a/b.bin").unwrap();
        std::fs::write(&src, b"second").unwrap();
        store.upload(&src, "uploads", "a/b.bin").unwrap();

        let stored = store.object_path("uploads", "a/b.bin").unwrap();
        assert_eq!(std::fs::read(stored).unwrap(), b"second");
    }

    #[test]
    fn upload_of_missing_local_file_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(root.path());

        let err = store
            .upload(&root.path().join("missing.png"), "uploads", "x.png")
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn upload_into_unwritable_location_is_storage_write() {
        let root = tempfile::tempdir().unwrap();
        // A file where the container directory should be.
        std::fs::write(root.path().join("uploads"), b"").unwrap();
        let src = root.path().join("local.bin");
        std::fs::write(&src, b"x").unwrap();

        let store = FsObjectStore::new(root.path());
        let err = store.upload(&src, "uploads", "x.bin").unwrap_err();
        assert!(matches!(err, Error::StorageWrite { .. }));
    }
}

//! Moving objects between an object store and local scratch space.
//!
//! [`ObjectStore`] is the seam to the storage service. [`TransferShim`] owns a
//! backend plus a scratch directory and maps object keys onto scratch paths.
//!
//! Backends:
//! - [`FsObjectStore`]: a directory tree, one subdirectory per container.
//! - `S3ObjectStore` (feature `s3`): any S3-compatible service.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::event::key_to_relative_path;

mod fs;
#[cfg(feature = "s3")]
mod s3;

pub use fs::FsObjectStore;
#[cfg(feature = "s3")]
pub use s3::{S3ObjectStore, S3Options};

/// A remote object store that can copy objects to and from local files.
pub trait ObjectStore {
    /// Copy `container/key` into the local file `dest`, replacing it.
    ///
    /// The parent directory of `dest` already exists.
    ///
    /// # Errors
    ///
    /// [`Error::ObjectNotFound`](crate::Error::ObjectNotFound) if the key does
    /// not exist, [`Error::StorageRead`](crate::Error::StorageRead) or
    /// [`Error::Io`](crate::Error::Io) for other failures.
    fn download(&self, container: &str, key: &str, dest: &Path) -> Result<()>;

    /// Upload the local file `src` to `container/key`, overwriting any
    /// existing object.
    ///
    /// # Errors
    ///
    /// [`Error::StorageWrite`](crate::Error::StorageWrite) on transport or
    /// permission failures, [`Error::Io`](crate::Error::Io) if `src` cannot be
    /// read.
    fn upload(&self, src: &Path, container: &str, key: &str) -> Result<()>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn download(&self, container: &str, key: &str, dest: &Path) -> Result<()> {
        (**self).download(container, key, dest)
    }

    fn upload(&self, src: &Path, container: &str, key: &str) -> Result<()> {
        (**self).upload(src, container, key)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn download(&self, container: &str, key: &str, dest: &Path) -> Result<()> {
        (**self).download(container, key, dest)
    }

    fn upload(&self, src: &Path, container: &str, key: &str) -> Result<()> {
        (**self).upload(src, container, key)
    }
}

/// Stages objects in a scratch directory.
#[derive(Debug)]
pub struct TransferShim<S> {
    backend: S,
    scratch_dir: PathBuf,
}

impl<S: ObjectStore> TransferShim<S> {
    /// Create a shim that stages files under `scratch_dir`.
    pub fn new(backend: S, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Directory objects are staged in.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Local path `key` is staged at.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidKey`](crate::Error::InvalidKey) if the key cannot be
    /// mapped under the scratch directory.
    pub fn scratch_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.scratch_dir.join(key_to_relative_path(key)?))
    }

    /// Download `container/key` to `scratch/{key}` and return that path.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::download`]; also fails on invalid keys or if the
    /// scratch directories cannot be created.
    pub fn fetch(&self, container: &str, key: &str) -> Result<PathBuf> {
        let local = self.scratch_path(key)?;
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.backend.download(container, key, &local)?;
        debug!(bucket = container, key, path = %local.display(), "fetched object");
        Ok(local)
    }

    /// Upload `local_path` to `container/key`.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::upload`].
    pub fn store(&self, local_path: &Path, container: &str, key: &str) -> Result<()> {
        self.backend.upload(local_path, container, key)?;
        debug!(bucket = container, key, path = %local_path.display(), "stored object");
        Ok(())
    }
}

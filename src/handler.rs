//! Trigger handler: one object-created event, end to end.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::compositor::{Compositor, WATERMARK_FILE};
use crate::error::{Error, Result};
use crate::event::{is_supported_image, output_key, scratch_output_path, ObjectCreatedEvent};
use crate::store::{ObjectStore, TransferShim};

/// Settings for a [`Handler`].
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Watermark asset applied to every image.
    pub watermark_path: PathBuf,
    /// Directory objects are staged in while being processed.
    pub scratch_dir: PathBuf,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            watermark_path: PathBuf::from(WATERMARK_FILE),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

/// What the handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The watermarked copy was uploaded to `key`.
    Uploaded {
        /// Destination key of the watermarked copy.
        key: String,
    },
    /// The object is not a supported image; nothing was downloaded.
    Skipped,
    /// The watermark asset is missing; the object was downloaded but nothing
    /// was uploaded.
    AssetMissing,
}

/// Processes object-created events against an injected object store.
#[derive(Debug)]
pub struct Handler<S> {
    transfer: TransferShim<S>,
    compositor: Compositor,
}

impl<S: ObjectStore> Handler<S> {
    /// Create a handler for `store` with the given settings.
    pub fn new(store: S, config: HandlerConfig) -> Self {
        Self {
            transfer: TransferShim::new(store, config.scratch_dir),
            compositor: Compositor::new(config.watermark_path),
        }
    }

    /// The transfer shim, for inspecting scratch paths or the backend.
    pub fn transfer(&self) -> &TransferShim<S> {
        &self.transfer
    }

    /// Handle one object-created event.
    ///
    /// Non-image keys are skipped. Images are downloaded to `scratch/{key}`,
    /// watermarked into the sibling `watermarked-` file, and uploaded to
    /// `watermarked/{key}` in the same container. A missing watermark asset
    /// cancels the upload and yields [`Outcome::AssetMissing`].
    ///
    /// # Errors
    ///
    /// Any fetch, decode, encode, or upload failure; scratch files are left in
    /// place.
    pub fn on_object_created(&self, event: &ObjectCreatedEvent) -> Result<Outcome> {
        let bucket = event.bucket.as_str();
        let key = event.name.as_str();

        if !is_supported_image(key) {
            info!(bucket, key, "skipping non-image file");
            return Ok(Outcome::Skipped);
        }

        let local_input = self.transfer.fetch(bucket, key)?;
        info!(bucket, key, path = %local_input.display(), "downloaded object");

        let local_output = scratch_output_path(&local_input);
        match self.compositor.apply(&local_input, &local_output) {
            Ok(()) => {}
            Err(Error::AssetMissing(path)) => {
                warn!(
                    bucket,
                    key,
                    watermark = %path.display(),
                    "watermark asset missing, not uploading"
                );
                return Ok(Outcome::AssetMissing);
            }
            Err(e) => return Err(e),
        }
        info!(path = %local_output.display(), "watermark added");

        let destination = output_key(key);
        self.transfer.store(&local_output, bucket, &destination)?;
        info!(bucket, key = %destination, "uploaded watermarked image");

        Ok(Outcome::Uploaded { key: destination })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsObjectStore;

    #[test]
    fn default_config_uses_watermark_png() {
        let config = HandlerConfig::default();
        assert_eq!(config.watermark_path, PathBuf::from("watermark.png"));
    }

    #[test]
    fn skips_non_images_without_touching_the_store() {
        let remote = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let handler = Handler::new(
            FsObjectStore::new(remote.path()),
            HandlerConfig {
                watermark_path: PathBuf::from("unused.png"),
                scratch_dir: scratch.path().to_path_buf(),
            },
        );

        // The object doesn't even exist; a fetch would fail.
        let outcome = handler
            .on_object_created(&ObjectCreatedEvent::new("uploads", "document.pdf"))
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(handler.transfer().scratch_dir(), scratch.path());
    }

    #[test]
    fn missing_source_object_propagates() {
        let remote = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let handler = Handler::new(
            FsObjectStore::new(remote.path()),
            HandlerConfig {
                watermark_path: PathBuf::from("unused.png"),
                scratch_dir: scratch.path().to_path_buf(),
            },
        );

        let err = handler
            .on_object_created(&ObjectCreatedEvent::new("uploads", "ghost.jpg"))
            .unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    }
}

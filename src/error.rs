//! Error types for the upload-watermark crate.

use std::path::PathBuf;

/// Errors that can occur while transferring and watermarking an object.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source object does not exist in the container.
    #[error("object not found: {container}/{key}")]
    ObjectNotFound {
        /// Container (bucket) that was searched.
        container: String,
        /// Key that was requested.
        key: String,
    },

    /// The watermark asset is not present at the configured path.
    #[error("watermark file '{}' not found", .0.display())]
    AssetMissing(PathBuf),

    /// An input file is not a valid raster image.
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    /// The composited image could not be encoded to the output format.
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),

    /// The output extension does not name a format this crate writes.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Downloading from the object store failed for a reason other than a
    /// missing key.
    #[error("failed to read {container}/{key}: {reason}")]
    StorageRead {
        /// Source container.
        container: String,
        /// Source key.
        key: String,
        /// Backend-specific failure description.
        reason: String,
    },

    /// Uploading to the object store failed (transport or permission).
    #[error("failed to write {container}/{key}: {reason}")]
    StorageWrite {
        /// Destination container.
        container: String,
        /// Destination key.
        key: String,
        /// Backend-specific failure description.
        reason: String,
    },

    /// The object key cannot be mapped onto a local scratch path.
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),

    /// The trigger event payload is malformed.
    #[error("invalid trigger event: {0}")]
    InvalidEvent(#[from] serde_json::Error),

    /// An I/O error occurred while reading or writing local files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

//! Object-created trigger events and the key conventions derived from them.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Prefix under which watermarked copies are stored.
pub const OUTPUT_PREFIX: &str = "watermarked/";

/// Prefix added to the file name of the local watermarked scratch file.
pub const SCRATCH_OUTPUT_PREFIX: &str = "watermarked-";

/// Extensions (lowercase, without the dot) the handler will process.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Metadata delivered by the storage trigger when an object is created.
///
/// Only `bucket` and `name` are read; any other fields in the envelope are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectCreatedEvent {
    /// Container the object was written to.
    pub bucket: String,
    /// Key of the new object.
    pub name: String,
}

impl ObjectCreatedEvent {
    /// Build an event by hand.
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
        }
    }

    /// Parse the JSON envelope sent by the trigger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEvent`] if the payload is not JSON or lacks
    /// `bucket` / `name`.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Check if an object key has one of the [`SUPPORTED_EXTENSIONS`],
/// ignoring case.
#[must_use]
pub fn is_supported_image(key: &str) -> bool {
    match Path::new(key).extension().and_then(|e| e.to_str()) {
        Some(ext) => SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Destination key for the watermarked copy of `key`.
#[must_use]
pub fn output_key(key: &str) -> String {
    format!("{OUTPUT_PREFIX}{key}")
}

/// Map an object key onto a path relative to a scratch directory.
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] unless every `/`-separated segment of the
/// key is a plain file or directory name. Empty keys, absolute keys, keys
/// ending in `/` and keys with empty, `.` or `..` segments are rejected.
pub fn key_to_relative_path(key: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for segment in key.split('/') {
        let mut parts = Path::new(segment).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(part)), None) if part == OsStr::new(segment) => {
                relative.push(part);
            }
            _ => return Err(Error::InvalidKey(key.to_string())),
        }
    }
    Ok(relative)
}

/// Scratch path for the watermarked version of the file staged at `input`.
///
/// The prefix applies to the file name: `scratch/a/b.jpg` becomes
/// `scratch/a/watermarked-b.jpg`.
#[must_use]
pub fn scratch_output_path(input: &Path) -> PathBuf {
    let name = input.file_name().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{SCRATCH_OUTPUT_PREFIX}{name}"))
}

//! Overlay a translucent, centered watermark on images uploaded to an object
//! store.
//!
//! When an image lands in a container, the [`Handler`] downloads it to a
//! scratch directory, blends the watermark asset over its center at half the
//! asset's opacity, and uploads the result as `watermarked/{key}` in the same
//! container.
//!
//! The watermark is resized to a quarter of the image on each axis, so it
//! always covers the same relative area regardless of the asset's own size.
//!
//! # Quick Start
//!
//! ```no_run
//! use upload_watermark::{Handler, HandlerConfig, FsObjectStore, ObjectCreatedEvent};
//!
//! let handler = Handler::new(FsObjectStore::new("/srv/buckets"), HandlerConfig::default());
//! let event = ObjectCreatedEvent::new("uploads", "photo.jpg");
//! let outcome = handler.on_object_created(&event).expect("watermarking failed");
//! println!("{outcome:?}");
//! ```
//!
//! # Compositing only
//!
//! ```no_run
//! use std::path::Path;
//!
//! upload_watermark::apply_watermark(
//!     Path::new("photo.jpg"),
//!     Path::new("watermark.png"),
//!     Path::new("watermarked-photo.jpg"),
//! )
//! .expect("watermarking failed");
//! ```

#![deny(missing_docs)]

pub mod blending;
mod compositor;
pub mod error;
pub mod event;
mod handler;
pub mod store;

pub use compositor::{
    apply_watermark, composite, default_output_path, prepare_watermark, save_image,
    watermark_size, Compositor, JPEG_QUALITY, SIZE_DIVISOR, WATERMARK_FILE,
};
pub use error::{Error, Result};
pub use event::ObjectCreatedEvent;
pub use handler::{Handler, HandlerConfig, Outcome};
pub use store::{FsObjectStore, ObjectStore, TransferShim};

//! Core watermark compositing: load, resize, blend, save.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::error::{UnsupportedError, UnsupportedErrorKind};
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat, RgbaImage};
use tracing::{debug, error};

use crate::blending;
use crate::error::{Error, Result};

/// Default location of the watermark asset, relative to the working directory.
pub const WATERMARK_FILE: &str = "watermark.png";

/// The watermark is scaled to `1 / SIZE_DIVISOR` of the source on each axis.
pub const SIZE_DIVISOR: u32 = 4;

/// Quality used when the output is written as JPEG.
pub const JPEG_QUALITY: u8 = 75;

/// Size the watermark is resized to for a source of `width` x `height`.
///
/// Floor division on each axis independently; either side may be 0 for
/// sources narrower or shorter than [`SIZE_DIVISOR`] pixels.
#[must_use]
pub const fn watermark_size(width: u32, height: u32) -> (u32, u32) {
    (width / SIZE_DIVISOR, height / SIZE_DIVISOR)
}

/// Resize the watermark asset for a `width` x `height` source and make it
/// translucent.
///
/// The aspect ratio of the asset is not preserved. Resampling is bicubic.
#[must_use]
pub fn prepare_watermark(asset: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let (wm_w, wm_h) = watermark_size(width, height);
    if wm_w == 0 || wm_h == 0 {
        return RgbaImage::new(wm_w, wm_h);
    }

    let mut watermark = imageops::resize(&asset.to_rgba8(), wm_w, wm_h, FilterType::CatmullRom);
    blending::make_translucent(&mut watermark);
    watermark
}

/// Composite the watermark asset onto `base`, centered, in-place.
///
/// The base keeps its dimensions. Sources under 4 pixels on either axis get
/// an empty watermark and are left unchanged.
pub fn composite(base: &mut DynamicImage, asset: &DynamicImage) {
    let (width, height) = base.dimensions();
    let watermark = prepare_watermark(asset, width, height);
    if watermark.width() == 0 || watermark.height() == 0 {
        debug!(width, height, "source too small for a watermark, leaving unchanged");
        return;
    }

    let (x, y) = blending::center_offset(width, height, watermark.width(), watermark.height());
    blending::blend_onto(base, &watermark, x, y);
}

/// Applies a fixed watermark asset to image files.
///
/// Holds only the asset path; the asset is read on every [`Compositor::apply`]
/// call so a deployment can swap the file without rebuilding the value.
#[derive(Debug, Clone)]
pub struct Compositor {
    watermark_path: PathBuf,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(WATERMARK_FILE)
    }
}

impl Compositor {
    /// Create a compositor that reads its watermark from `watermark_path`.
    pub fn new(watermark_path: impl Into<PathBuf>) -> Self {
        Self {
            watermark_path: watermark_path.into(),
        }
    }

    /// Path of the watermark asset.
    #[must_use]
    pub fn watermark_path(&self) -> &Path {
        &self.watermark_path
    }

    /// Watermark `source` and write the result to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetMissing`] without touching `output` if the
    /// watermark asset does not exist. Otherwise see [`apply_watermark`].
    pub fn apply(&self, source: &Path, output: &Path) -> Result<()> {
        apply_watermark(source, &self.watermark_path, output)
    }
}

/// Load `source`, overlay the translucent, centered watermark from
/// `watermark_path`, and save to `output`.
///
/// The output format follows the extension of `output`.
///
/// # Errors
///
/// - [`Error::AssetMissing`] if `watermark_path` does not exist; `output` is
///   not written.
/// - [`Error::Decode`] if either input is not a valid image.
/// - [`Error::Encode`] / [`Error::UnsupportedFormat`] if the result cannot be
///   written in the format named by `output`.
/// - [`Error::Io`] on local file failures.
pub fn apply_watermark(source: &Path, watermark_path: &Path, output: &Path) -> Result<()> {
    if !watermark_path.exists() {
        error!(path = %watermark_path.display(), "watermark file not found");
        return Err(Error::AssetMissing(watermark_path.to_path_buf()));
    }

    let mut img = open_image(source)?;
    let asset = open_image(watermark_path)?;

    composite(&mut img, &asset);

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    save_image(&img, output)
}

/// Decode an image file, keeping I/O failures apart from decode failures.
fn open_image(path: &Path) -> Result<DynamicImage> {
    image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(Error::Decode)
}

/// Save an image in the format named by the path's extension.
///
/// JPEG is written at [`JPEG_QUALITY`]. PNG is written as-is.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for extensions other than PNG/JPEG,
/// [`Error::Encode`] if encoding fails or the image has an alpha channel and
/// the path names a JPEG (nothing is written in that case), and [`Error::Io`] if the file cannot
/// be created.
pub fn save_image(img: &DynamicImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            if img.color().has_alpha() {
                return Err(Error::Encode(ImageError::Unsupported(
                    UnsupportedError::from_format_and_kind(
                        ImageFormat::Jpeg.into(),
                        UnsupportedErrorKind::Color(img.color().into()),
                    ),
                )));
            }
            let mut writer = BufWriter::new(File::create(path)?);
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
            img.write_with_encoder(encoder).map_err(Error::Encode)?;
            writer.flush()?;
        }
        ImageFormat::Png => {
            img.save_with_format(path, ImageFormat::Png)
                .map_err(Error::Encode)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Output path used by the CLI when none is given.
///
/// Example: `"photos/cat.jpg"` becomes `"photos/watermarked-cat.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let name = input.file_name().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("watermarked-{name}"))
}

//! Codec and metadata collaborators.
//!
//! The pipeline itself works on decoded [`RasterImage`]s. Turning bytes into
//! pixels and reading the EXIF orientation tag are delegated to the two
//! traits here, with adapters backed by the `image` and `kamadak-exif`
//! crates.

pub mod orientation;

pub use orientation::{ExifOrientationReader, OrientationReader, StaticOrientation};

use std::io::Cursor;

use image::{ImageFormat, ImageOutputFormat};
use tracing::debug;

use crate::chain::OperationChain;
use crate::error::{ChainError, Result};
use crate::raster::{PixelLayout, RasterImage};
use crate::transform::ExifOrientation;

/// Encodings the codec can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    /// JPEG with quality 1-100.
    Jpeg { quality: u8 },
    Gif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg { .. } => "jpg",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg { .. } => "image/jpeg",
            OutputFormat::Gif => "image/gif",
        }
    }
}

/// Decode bytes into pixels and encode pixels back into bytes.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage>;

    fn encode(&self, image: &RasterImage, format: OutputFormat) -> Result<Vec<u8>>;
}

/// [`ImageCodec`] backed by the `image` crate.
///
/// Decodes PNG, JPEG, GIF and WebP; encodes PNG, JPEG and GIF.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec;

impl ImageCrateCodec {
    pub fn new() -> Self {
        Self
    }

    /// Guess the container format from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }
}

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage> {
        if bytes.is_empty() {
            return Err(ChainError::processing("cannot decode empty input"));
        }
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ChainError::processing(format!("Failed to decode image: {}", e)))?;
        let image = RasterImage::from_dynamic(decoded);
        debug!(
            format = ?Self::sniff(bytes),
            width = image.width(),
            height = image.height(),
            layout = image.layout().as_str(),
            "Decoded image"
        );
        Ok(image)
    }

    fn encode(&self, image: &RasterImage, format: OutputFormat) -> Result<Vec<u8>> {
        let output = match format {
            OutputFormat::Png => ImageOutputFormat::Png,
            OutputFormat::Gif => ImageOutputFormat::Gif,
            OutputFormat::Jpeg { quality } => {
                if !(1..=100).contains(&quality) {
                    return Err(ChainError::invalid_param(
                        "quality",
                        format!("JPEG quality must be 1-100, got {}", quality),
                    ));
                }
                ImageOutputFormat::Jpeg(quality)
            }
        };

        // JPEG has no alpha channel
        let dynamic = match (format, image.layout()) {
            (OutputFormat::Jpeg { .. }, PixelLayout::Rgba8) => {
                image::DynamicImage::ImageRgb8(image.to_dynamic().into_rgb8())
            }
            _ => image.to_dynamic(),
        };

        let mut buffer = Cursor::new(Vec::new());
        dynamic
            .write_to(&mut buffer, output)
            .map_err(|e| ChainError::processing(format!("Failed to encode image: {}", e)))?;
        Ok(buffer.into_inner())
    }
}

/// Decode `bytes` and start a chain whose first step corrects the EXIF orientation.
pub fn load_oriented(
    codec: &dyn ImageCodec,
    reader: &dyn OrientationReader,
    bytes: &[u8],
) -> Result<OperationChain> {
    let image = codec.decode(bytes)?;
    let orientation: ExifOrientation = reader.read_orientation(bytes)?;
    debug!(orientation = orientation.tag(), "Read source orientation");
    OperationChain::new(image)?.auto_orient(orientation)
}

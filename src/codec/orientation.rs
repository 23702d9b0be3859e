//! EXIF orientation lookup.

use std::io::Cursor;

use exif::{In, Tag};
use tracing::warn;

use crate::error::Result;
use crate::transform::ExifOrientation;

/// Read the orientation tag of an encoded image.
pub trait OrientationReader: Send + Sync {
    fn read_orientation(&self, bytes: &[u8]) -> Result<ExifOrientation>;
}

/// [`OrientationReader`] backed by `kamadak-exif`.
///
/// Images without EXIF data, or without an orientation tag, are `Normal`.
/// Out-of-range tag values are logged and treated as `Normal`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifOrientationReader;

impl OrientationReader for ExifOrientationReader {
    fn read_orientation(&self, bytes: &[u8]) -> Result<ExifOrientation> {
        let mut cursor = Cursor::new(bytes);
        let exif = match exif::Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(_) => return Ok(ExifOrientation::Normal),
        };

        let tag = exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0));

        Ok(match tag {
            Some(value) => ExifOrientation::from_tag(value).unwrap_or_else(|_| {
                warn!(value, "Ignoring out-of-range EXIF orientation");
                ExifOrientation::Normal
            }),
            None => ExifOrientation::Normal,
        })
    }
}

/// Fixed orientation, for callers that already parsed the tag elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticOrientation(pub ExifOrientation);

impl OrientationReader for StaticOrientation {
    fn read_orientation(&self, _bytes: &[u8]) -> Result<ExifOrientation> {
        Ok(self.0)
    }
}

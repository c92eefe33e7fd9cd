//! Frame sources
//!
//! A [`FrameReader`] hands out decoded [`ColorImage`]s. [`CameraReader`] owns a live
//! capture device; [`UrlReader`] fetches a fixed image once, typically the panel
//! reference layout at startup.

pub mod camera;
pub mod url;

pub use camera::CameraReader;
pub use url::UrlReader;

use crate::error::{ImageError, ReaderError};
use crate::image::{ColorImage, Image};
use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;

/// Source of raw frames.
pub trait FrameReader: Send {
    /// Identifier of the bound device or location, used in diagnostics.
    fn source_id(&self) -> &str;

    /// Return the current frame.
    fn read(&mut self) -> Result<ColorImage, ReaderError>;
}

impl<R: FrameReader + ?Sized> FrameReader for Box<R> {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    fn read(&mut self) -> Result<ColorImage, ReaderError> {
        (**self).read()
    }
}

/// Parse a `N` or `/dev/videoN` style device string into a capture index.
pub fn parse_device_index(device: &str) -> Option<i32> {
    if let Ok(index) = device.parse::<i32>() {
        return Some(index);
    }
    let stripped = device.strip_prefix("/dev/video")?;
    if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
        return stripped.parse::<i32>().ok();
    }
    None
}

/// Normalize a decoded buffer to 3-channel BGR and wrap it.
pub(crate) fn into_color_image(frame: Mat) -> Result<ColorImage, ImageError> {
    let code = match frame.channels() {
        1 => Some(imgproc::COLOR_GRAY2BGR),
        4 => Some(imgproc::COLOR_BGRA2BGR),
        _ => None,
    };
    match code {
        Some(code) if !frame.empty() => {
            let mut converted = Mat::default();
            imgproc::cvt_color_def(&frame, &mut converted, code)?;
            ColorImage::from_mat(converted)
        }
        _ => ColorImage::from_mat(frame),
    }
}

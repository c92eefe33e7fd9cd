//! Channel-typed image values
//!
//! An [`Image`] owns an OpenCV pixel buffer whose channel count is fixed by its
//! variant: [`ColorImage`] holds 3-channel BGR data, [`GrayImage`] single-channel
//! data. The channel count is checked once, when the value is built, and every
//! transform preserves it.
//!
//! Transforms consume the value and hand back the transformed one, so a buffer
//! always has exactly one owner and no stage can observe a half-mutated image.
//! Use [`Image::copy`] to fork an independent value.

pub mod color;
pub mod gray;
pub mod homography;

pub use color::ColorImage;
pub use gray::{GrayImage, Morphology};
pub use homography::Homography;
pub use opencv::core::Point;

use crate::error::ImageError;
use opencv::core::{Mat, Point2f, Rect, Scalar, Size, BORDER_CONSTANT};
use opencv::imgproc;
use opencv::prelude::*;

/// BGR drawing color for diagnostic overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { b, g, r }
    }

    fn to_scalar(self) -> Scalar {
        Scalar::new(self.b as f64, self.g as f64, self.r as f64, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Reject buffers whose channel count does not match the variant being built.
/// Axis-aligned rectangle between two corners given in any order.
fn rect_between(p1: Point, p2: Point) -> Rect {
    Rect::new(
        p1.x.min(p2.x),
        p1.y.min(p2.y),
        (p2.x - p1.x).abs(),
        (p2.y - p1.y).abs(),
    )
}

pub(crate) fn check_channels(
    mat: &Mat,
    variant: &'static str,
    expected: i32,
) -> Result<(), ImageError> {
    if mat.empty() {
        return Err(ImageError::invalid("buffer", format!("{variant} image buffer is empty")));
    }
    let actual = mat.channels();
    if actual != expected {
        return Err(ImageError::ChannelMismatch {
            variant,
            expected,
            actual,
        });
    }
    tracing::debug!(
        channels = actual,
        rows = mat.rows(),
        cols = mat.cols(),
        "new {} image",
        variant
    );
    Ok(())
}

/// Capabilities shared by both pixel layouts.
pub trait Image: Sized {
    /// Channel count every buffer of this variant carries.
    const CHANNELS: i32;

    /// Human-readable variant name used in diagnostics.
    const VARIANT: &'static str;

    /// Wrap a buffer, failing with [`ImageError::ChannelMismatch`] when its channel
    /// count differs from [`Image::CHANNELS`].
    fn from_mat(mat: Mat) -> Result<Self, ImageError>;

    fn mat(&self) -> &Mat;

    fn mat_mut(&mut self) -> &mut Mat;

    fn into_mat(self) -> Mat;

    /// Convert to the single-channel variant. Identity on [`GrayImage`].
    fn to_gray(self) -> Result<GrayImage, ImageError>;

    fn rows(&self) -> i32 {
        self.mat().rows()
    }

    fn cols(&self) -> i32 {
        self.mat().cols()
    }

    fn channels(&self) -> i32 {
        self.mat().channels()
    }

    /// Deep copy with its own buffer.
    fn copy(&self) -> Result<Self, ImageError> {
        Self::from_mat(self.mat().try_clone()?)
    }

    /// Row-major pixel bytes, interleaved per channel.
    fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        let mat = self.mat();
        if mat.is_continuous() {
            return Ok(mat.data_bytes()?.to_vec());
        }
        let owned = mat.try_clone()?;
        Ok(owned.data_bytes()?.to_vec())
    }

    /// Crop to the rectangle between `p1` and `p2`.
    ///
    /// Points are `(x, y)` with the origin at the top-left corner. The corners
    /// may come in either order: the smaller coordinates are inclusive, the
    /// larger exclusive. A rectangle reaching outside the buffer is an error;
    /// nothing is clamped.
    fn trim(self, p1: Point, p2: Point) -> Result<Self, ImageError> {
        let (width, height) = (self.cols(), self.rows());
        let rect = rect_between(p1, p2);
        if rect.width == 0 || rect.height == 0 {
            return Err(ImageError::invalid(
                "p2",
                format!(
                    "({}, {}) spans an empty rectangle with p1 ({}, {})",
                    p2.x, p2.y, p1.x, p1.y
                ),
            ));
        }
        if rect.x < 0 || rect.y < 0 || rect.x + rect.width > width || rect.y + rect.height > height {
            return Err(ImageError::OutOfBounds {
                x1: rect.x,
                y1: rect.y,
                x2: rect.x + rect.width,
                y2: rect.y + rect.height,
                width,
                height,
            });
        }

        let cropped = Mat::roi(self.mat(), rect)?.try_clone()?;
        Self::from_mat(cropped)
    }

    /// Uniform scale with bicubic interpolation.
    fn resize(self, scale: f64) -> Result<Self, ImageError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ImageError::invalid("scale", format!("must be positive, got {scale}")));
        }
        let mut output = Mat::default();
        imgproc::resize(
            self.mat(),
            &mut output,
            Size::default(),
            scale,
            scale,
            imgproc::INTER_CUBIC,
        )?;
        Self::from_mat(output)
    }

    /// Perspective-map the buffer into a `width` x `height` canvas.
    ///
    /// `None` or an identity homography onto a same-sized canvas leaves the buffer
    /// untouched.
    fn warp(
        self,
        homography: Option<&Homography>,
        width: i32,
        height: i32,
    ) -> Result<Self, ImageError> {
        let Some(homography) = homography else {
            return Ok(self);
        };
        if width <= 0 || height <= 0 {
            return Err(ImageError::invalid(
                "size",
                format!("canvas must be non-empty, got {width}x{height}"),
            ));
        }
        if homography.is_identity() && width == self.cols() && height == self.rows() {
            return Ok(self);
        }

        let mut output = Mat::default();
        imgproc::warp_perspective(
            self.mat(),
            &mut output,
            &homography.to_mat()?,
            Size::new(width, height),
            imgproc::INTER_LINEAR,
            BORDER_CONSTANT,
            Scalar::all(0.0),
        )?;
        Self::from_mat(output)
    }

    /// Rotate about the buffer center by `degree` (counter-clockwise), keeping the size.
    fn rotate(self, degree: f64) -> Result<Self, ImageError> {
        if !degree.is_finite() {
            return Err(ImageError::invalid("degree", "must be finite"));
        }
        let size = Size::new(self.cols(), self.rows());
        let center = Point2f::new(size.width as f32 / 2.0, size.height as f32 / 2.0);
        let matrix = imgproc::get_rotation_matrix_2d(center, degree, 1.0)?;

        let mut output = Mat::default();
        imgproc::warp_affine(
            self.mat(),
            &mut output,
            &matrix,
            size,
            imgproc::INTER_CUBIC,
            BORDER_CONSTANT,
            Scalar::all(0.0),
        )?;
        Self::from_mat(output)
    }

    /// Draw `text` with its baseline starting at `position`.
    fn put_text(mut self, text: &str, position: Point, color: Color) -> Result<Self, ImageError> {
        imgproc::put_text(
            self.mat_mut(),
            text,
            position,
            imgproc::FONT_HERSHEY_PLAIN,
            1.0,
            color.to_scalar(),
            1,
            imgproc::LINE_AA,
            false,
        )?;
        Ok(self)
    }

    /// Draw the outline of the rectangle between `p1` and `p2`, same corner
    /// rules as [`Image::trim`].
    fn put_box(mut self, p1: Point, p2: Point, color: Color) -> Result<Self, ImageError> {
        let rect = rect_between(p1, p2);
        imgproc::rectangle(self.mat_mut(), rect, color.to_scalar(), 1, imgproc::LINE_8, 0)?;
        Ok(self)
    }

    /// Rectangle outline with a label at its top-left corner.
    fn put_text_box(self, text: &str, p1: Point, p2: Point, color: Color) -> Result<Self, ImageError> {
        self.put_box(p1, p2, color)?.put_text(text, p1, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{CV_8UC1, CV_8UC3};

    fn color_canvas(width: i32, height: i32) -> ColorImage {
        let mat =
            Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(40.0)).unwrap();
        ColorImage::from_mat(mat).unwrap()
    }

    #[test]
    fn test_trim_inside_bounds() {
        let image = color_canvas(64, 48);
        let trimmed = image.trim(Point::new(10, 5), Point::new(30, 25)).unwrap();
        assert_eq!(trimmed.cols(), 20);
        assert_eq!(trimmed.rows(), 20);
        assert_eq!(trimmed.channels(), 3);
    }

    #[test]
    fn test_trim_rejects_rectangle_past_extents() {
        let image = color_canvas(64, 48);
        let err = image.trim(Point::new(40, 10), Point::new(65, 20)).unwrap_err();
        assert!(matches!(
            err,
            ImageError::OutOfBounds {
                x2: 65,
                width: 64,
                ..
            }
        ));

        let image = color_canvas(64, 48);
        let err = image.trim(Point::new(-1, 0), Point::new(10, 10)).unwrap_err();
        assert!(matches!(err, ImageError::OutOfBounds { .. }));
    }

    #[test]
    fn test_trim_accepts_corners_in_any_order() {
        let ordered = color_canvas(64, 48)
            .put_box(Point::new(12, 8), Point::new(20, 16), Color::RED)
            .unwrap()
            .trim(Point::new(10, 5), Point::new(30, 25))
            .unwrap();
        let reversed = color_canvas(64, 48)
            .put_box(Point::new(20, 16), Point::new(12, 8), Color::RED)
            .unwrap()
            .trim(Point::new(30, 5), Point::new(10, 25))
            .unwrap();

        assert_eq!((reversed.cols(), reversed.rows()), (20, 20));
        assert_eq!(reversed.to_bytes().unwrap(), ordered.to_bytes().unwrap());
    }

    #[test]
    fn test_trim_rejects_empty_rectangle() {
        let image = color_canvas(64, 48);
        let err = image.trim(Point::new(30, 10), Point::new(30, 40)).unwrap_err();
        assert!(matches!(err, ImageError::InvalidParameter { name: "p2", .. }));
    }

    #[test]
    fn test_resize_scales_both_axes() {
        let image = color_canvas(40, 20).resize(2.0).unwrap();
        assert_eq!((image.cols(), image.rows()), (80, 40));

        let err = color_canvas(40, 20).resize(0.0).unwrap_err();
        assert!(matches!(err, ImageError::InvalidParameter { name: "scale", .. }));
    }

    #[test]
    fn test_warp_without_homography_is_unchanged() {
        let image = color_canvas(32, 32).put_box(Point::new(4, 4), Point::new(20, 20), Color::GREEN).unwrap();
        let before = image.to_bytes().unwrap();

        let unchanged = image.warp(None, 16, 16).unwrap();
        assert_eq!(unchanged.to_bytes().unwrap(), before);

        let identity = Homography::identity();
        let unchanged = unchanged.warp(Some(&identity), 32, 32).unwrap();
        assert_eq!(unchanged.to_bytes().unwrap(), before);
    }

    #[test]
    fn test_warp_translation_moves_content() {
        let mut mat = Mat::new_rows_cols_with_default(20, 20, CV_8UC1, Scalar::all(0.0)).unwrap();
        *mat.at_2d_mut::<u8>(5, 5).unwrap() = 255;
        let image = GrayImage::from_mat(mat).unwrap();

        let shift = Homography::from_matrix([[1.0, 0.0, 3.0], [0.0, 1.0, 2.0], [0.0, 0.0, 1.0]]);
        let warped = image.warp(Some(&shift), 20, 20).unwrap();
        assert_eq!(*warped.mat().at_2d::<u8>(7, 8).unwrap(), 255);
        assert_eq!(*warped.mat().at_2d::<u8>(5, 5).unwrap(), 0);
    }

    #[test]
    fn test_rotate_keeps_size() {
        let image = color_canvas(50, 30).rotate(15.0).unwrap();
        assert_eq!((image.cols(), image.rows()), (50, 30));
    }

    #[test]
    fn test_copy_is_independent() {
        let original = color_canvas(16, 16);
        let before = original.to_bytes().unwrap();
        let copy = original.copy().unwrap();

        let drawn = copy.put_box(Point::new(2, 2), Point::new(10, 10), Color::RED).unwrap();
        assert_ne!(drawn.to_bytes().unwrap(), before);
        assert_eq!(original.to_bytes().unwrap(), before);
    }

    #[test]
    fn test_annotation_chains() {
        let image = color_canvas(120, 60)
            .put_text_box("24", Point::new(10, 10), Point::new(60, 50), Color::GREEN)
            .unwrap();
        assert_eq!((image.cols(), image.rows()), (120, 60));
        assert_ne!(image.to_bytes().unwrap(), color_canvas(120, 60).to_bytes().unwrap());
    }
}

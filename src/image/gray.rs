use super::{check_channels, Image};
use crate::error::ImageError;
use opencv::core::{self, Mat, Point, Size, BORDER_CONSTANT};
use opencv::imgproc;
use opencv::prelude::*;

/// Structural operations available to [`GrayImage::morphology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Morphology {
    Erode,
    Dilate,
    Open,
    Close,
}

impl Morphology {
    fn op(self) -> i32 {
        match self {
            Morphology::Erode => imgproc::MORPH_ERODE,
            Morphology::Dilate => imgproc::MORPH_DILATE,
            Morphology::Open => imgproc::MORPH_OPEN,
            Morphology::Close => imgproc::MORPH_CLOSE,
        }
    }
}

/// Single-channel image. Hosts the enhancement filters used before recognition.
#[derive(Debug)]
pub struct GrayImage {
    data: Mat,
}

impl Image for GrayImage {
    const CHANNELS: i32 = 1;
    const VARIANT: &'static str = "gray";

    fn from_mat(mat: Mat) -> Result<Self, ImageError> {
        check_channels(&mat, Self::VARIANT, Self::CHANNELS)?;
        Ok(Self { data: mat })
    }

    fn mat(&self) -> &Mat {
        &self.data
    }

    fn mat_mut(&mut self) -> &mut Mat {
        &mut self.data
    }

    fn into_mat(self) -> Mat {
        self.data
    }

    fn to_gray(self) -> Result<GrayImage, ImageError> {
        Ok(self)
    }
}

impl GrayImage {
    pub fn from_luma(image: &::image::GrayImage) -> Result<Self, ImageError> {
        Self::from_mat(crate::utils::luma_to_mat(image)?)
    }

    pub fn to_luma(&self) -> Result<::image::GrayImage, ImageError> {
        crate::utils::mat_to_luma(&self.data)
    }

    /// Mean gray level over the whole buffer.
    pub fn mean_intensity(&self) -> Result<f64, ImageError> {
        let mean = core::mean(&self.data, &core::no_array())?;
        Ok(mean[0])
    }

    /// Gaussian-weighted adaptive threshold to a two-level (0/255) image.
    ///
    /// `block_size` is the odd side of the neighbourhood each threshold is computed
    /// over; `offset` is subtracted from the weighted mean.
    pub fn binarize(self, block_size: i32, offset: f64) -> Result<Self, ImageError> {
        if block_size < 3 || block_size % 2 == 0 {
            return Err(ImageError::invalid(
                "block_size",
                format!("must be odd and at least 3, got {block_size}"),
            ));
        }
        if !offset.is_finite() {
            return Err(ImageError::invalid("offset", "must be finite"));
        }

        let mut output = Mat::default();
        imgproc::adaptive_threshold(
            &self.data,
            &mut output,
            255.0,
            imgproc::ADAPTIVE_THRESH_GAUSSIAN_C,
            imgproc::THRESH_BINARY,
            block_size,
            offset,
        )?;
        Self::from_mat(output)
    }

    /// Apply `op` with a square `kernel_size` x `kernel_size` structuring element.
    pub fn morphology(self, op: Morphology, kernel_size: i32) -> Result<Self, ImageError> {
        if kernel_size < 1 {
            return Err(ImageError::invalid(
                "kernel_size",
                format!("must be at least 1, got {kernel_size}"),
            ));
        }

        let anchor = Point::new(-1, -1);
        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_RECT,
            Size::new(kernel_size, kernel_size),
            anchor,
        )?;
        let mut output = Mat::default();
        imgproc::morphology_ex(
            &self.data,
            &mut output,
            op.op(),
            &kernel,
            anchor,
            1,
            BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;
        Self::from_mat(output)
    }

    pub fn erode(self, kernel_size: i32) -> Result<Self, ImageError> {
        self.morphology(Morphology::Erode, kernel_size)
    }

    pub fn dilate(self, kernel_size: i32) -> Result<Self, ImageError> {
        self.morphology(Morphology::Dilate, kernel_size)
    }

    pub fn open(self, kernel_size: i32) -> Result<Self, ImageError> {
        self.morphology(Morphology::Open, kernel_size)
    }

    pub fn close(self, kernel_size: i32) -> Result<Self, ImageError> {
        self.morphology(Morphology::Close, kernel_size)
    }

    /// Median filter. `kernel_size` must be odd.
    pub fn denoise(self, kernel_size: i32) -> Result<Self, ImageError> {
        if kernel_size < 1 || kernel_size % 2 == 0 {
            return Err(ImageError::invalid(
                "kernel_size",
                format!("median kernel must be a positive odd number, got {kernel_size}"),
            ));
        }

        let mut output = Mat::default();
        imgproc::median_blur(&self.data, &mut output, kernel_size)?;
        Self::from_mat(output)
    }

    /// Contrast-limited adaptive histogram equalization over a
    /// `grid_size` x `grid_size` tile grid.
    pub fn normalize_clahe(self, clip_limit: f64, grid_size: i32) -> Result<Self, ImageError> {
        if !clip_limit.is_finite() || clip_limit <= 0.0 {
            return Err(ImageError::invalid(
                "clip_limit",
                format!("must be positive, got {clip_limit}"),
            ));
        }
        if grid_size < 1 {
            return Err(ImageError::invalid(
                "grid_size",
                format!("must be at least 1, got {grid_size}"),
            ));
        }

        let mut clahe = imgproc::create_clahe(clip_limit, Size::new(grid_size, grid_size))?;
        let mut output = Mat::default();
        clahe.apply(&self.data, &mut output)?;
        Self::from_mat(output)
    }
}

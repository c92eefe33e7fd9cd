use super::{check_channels, GrayImage, Image};
use crate::error::ImageError;
use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;

/// Three-channel BGR image, as delivered by cameras and image decoders.
#[derive(Debug)]
pub struct ColorImage {
    data: Mat,
}

impl Image for ColorImage {
    const CHANNELS: i32 = 3;
    const VARIANT: &'static str = "color";

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
        let mut gray = Mat::default();
        imgproc::cvt_color_def(&self.data, &mut gray, imgproc::COLOR_BGR2GRAY)?;
        GrayImage::from_mat(gray)
    }
}

impl ColorImage {
    pub fn from_rgb(image: &::image::RgbImage) -> Result<Self, ImageError> {
        Self::from_mat(crate::utils::rgb_to_mat(image)?)
    }

    pub fn to_rgb(&self) -> Result<::image::RgbImage, ImageError> {
        crate::utils::mat_to_rgb(&self.data)
    }
}

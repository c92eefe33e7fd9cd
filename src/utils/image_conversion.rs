use crate::error::ImageError;
use opencv::core::{Mat, Scalar, Vec3b, VecN, CV_8UC1, CV_8UC3};
use opencv::prelude::*;

/// Convert an `image` crate luma buffer to a single-channel OpenCV Mat
pub fn luma_to_mat(image: &::image::GrayImage) -> Result<Mat, ImageError> {
    let (width, height) = image.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC1, Scalar::all(0.0))?;

    for (x, y, pixel) in image.enumerate_pixels() {
        *mat.at_2d_mut::<u8>(y as i32, x as i32)? = pixel[0];
    }

    Ok(mat)
}

/// Convert a single-channel 8-bit Mat to an `image` crate luma buffer
pub fn mat_to_luma(mat: &Mat) -> Result<::image::GrayImage, ImageError> {
    if mat.typ() != CV_8UC1 {
        return Err(ImageError::invalid("mat", "expected an 8-bit single-channel buffer"));
    }
    let rows = mat.rows();
    let cols = mat.cols();

    let mut data = Vec::with_capacity((rows * cols) as usize);
    for y in 0..rows {
        for x in 0..cols {
            data.push(*mat.at_2d::<u8>(y, x)?);
        }
    }

    ::image::GrayImage::from_raw(cols as u32, rows as u32, data)
        .ok_or_else(|| ImageError::invalid("mat", "pixel count does not match dimensions"))
}

/// Convert an RGB buffer to a BGR OpenCV Mat
pub fn rgb_to_mat(image: &::image::RgbImage) -> Result<Mat, ImageError> {
    let (width, height) = image.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.0))?;

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        *mat.at_2d_mut::<Vec3b>(y as i32, x as i32)? = VecN([b, g, r]);
    }

    Ok(mat)
}

/// Convert a BGR 8-bit Mat to an RGB buffer
pub fn mat_to_rgb(mat: &Mat) -> Result<::image::RgbImage, ImageError> {
    if mat.typ() != CV_8UC3 {
        return Err(ImageError::invalid("mat", "expected an 8-bit three-channel buffer"));
    }
    let rows = mat.rows();
    let cols = mat.cols();

    let mut data = Vec::with_capacity((rows * cols * 3) as usize);
    for y in 0..rows {
        for x in 0..cols {
            let bgr = mat.at_2d::<Vec3b>(y, x)?;
            data.extend_from_slice(&[bgr[2], bgr[1], bgr[0]]);
        }
    }

    ::image::RgbImage::from_raw(cols as u32, rows as u32, data)
        .ok_or_else(|| ImageError::invalid("mat", "pixel count does not match dimensions"))
}

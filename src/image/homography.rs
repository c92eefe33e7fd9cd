use crate::error::ImageError;
use opencv::core::{Mat, Scalar, CV_64F};
use opencv::prelude::*;

const EPS: f64 = 1e-9;

/// 3x3 projective transform mapping source pixel coordinates `(x, y)` onto a
/// destination canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: [[f64; 3]; 3],
}

impl Homography {
    pub fn identity() -> Self {
        Self::from_matrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    pub fn from_matrix(matrix: [[f64; 3]; 3]) -> Self {
        Self { matrix }
    }

    /// Read a 3x3 `CV_64F` matrix, as returned by `find_homography`.
    pub fn from_mat(mat: &Mat) -> Result<Self, ImageError> {
        if mat.rows() != 3 || mat.cols() != 3 || mat.typ() != CV_64F {
            return Err(ImageError::invalid(
                "homography",
                format!("expected a 3x3 CV_64F matrix, got {}x{}", mat.rows(), mat.cols()),
            ));
        }
        let mut matrix = [[0.0; 3]; 3];
        for (r, row) in matrix.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = *mat.at_2d::<f64>(r as i32, c as i32)?;
            }
        }
        Ok(Self { matrix })
    }

    pub fn to_mat(&self) -> Result<Mat, ImageError> {
        let mut mat = Mat::new_rows_cols_with_default(3, 3, CV_64F, Scalar::all(0.0))?;
        for (r, row) in self.matrix.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                *mat.at_2d_mut::<f64>(r as i32, c as i32)? = *value;
            }
        }
        Ok(mat)
    }

    pub fn matrix(&self) -> &[[f64; 3]; 3] {
        &self.matrix
    }

    pub fn is_identity(&self) -> bool {
        let identity = Self::identity();
        self.matrix
            .iter()
            .flatten()
            .zip(identity.matrix.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= EPS)
    }

    /// Determinant of the full matrix.
    pub fn determinant(&self) -> f64 {
        let m = &self.matrix;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Project a point, or `None` when it maps to infinity.
    pub fn map_point(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.matrix;
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        if !w.is_finite() || w.abs() <= EPS {
            return None;
        }
        let px = (m[0][0] * x + m[0][1] * y + m[0][2]) / w;
        let py = (m[1][0] * x + m[1][1] * y + m[1][2]) / w;
        (px.is_finite() && py.is_finite()).then_some((px, py))
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mat_round_trip_preserves_entries() {
        let h = Homography::from_matrix([[1.1, 0.02, 5.0], [-0.03, 0.98, -2.5], [1e-4, 2e-4, 1.0]]);
        let back = Homography::from_mat(&h.to_mat().unwrap()).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn test_map_point_translation() {
        let h = Homography::from_matrix([[1.0, 0.0, 10.0], [0.0, 1.0, -4.0], [0.0, 0.0, 1.0]]);
        assert_eq!(h.map_point(2.0, 3.0), Some((12.0, -1.0)));
        assert!(!h.is_identity());
        assert!(Homography::identity().is_identity());
    }

    #[test]
    fn test_degenerate_projection() {
        let h = Homography::from_matrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        assert_eq!(h.map_point(0.0, 5.0), None);
        assert_eq!(h.determinant(), 0.0);
    }

    #[test]
    fn test_from_mat_rejects_wrong_shape() {
        let mat = Mat::new_rows_cols_with_default(2, 3, CV_64F, Scalar::all(0.0)).unwrap();
        assert!(Homography::from_mat(&mat).is_err());
    }
}

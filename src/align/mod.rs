//! Geometric alignment of live frames onto the reference layout
//!
//! ORB keypoints are extracted from the reference once. Each live frame is matched
//! against them with a cross-checked Hamming brute-force matcher, a homography is
//! fitted with RANSAC, and the frame is warped into reference coordinates. The
//! transform belongs to the call that computed it and is never reused.

use crate::config::{AlignmentConfig, Region};
use crate::error::AlignError;
use crate::image::{ColorImage, GrayImage, Homography, Image};
use opencv::calib3d;
use opencv::core::{self as cv, no_array, DMatch, KeyPoint, Mat, Point2f, Ptr, Vector};
use opencv::features2d::{BFMatcher, ORB_ScoreType, ORB};
use opencv::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Minimum correspondences needed to fit a homography.
const MIN_HOMOGRAPHY_POINTS: usize = 4;

/// Determinants at or below this are treated as a collapsed mapping.
const MIN_DETERMINANT: f64 = 1e-6;

fn create_detector(config: &AlignmentConfig) -> Result<Ptr<ORB>, AlignError> {
    let detector = ORB::create(
        config.max_features,
        config.scale_factor,
        config.n_levels,
        config.edge_threshold,
        0,
        2,
        ORB_ScoreType::HARRIS_SCORE,
        config.patch_size,
        config.fast_threshold,
    )?;
    Ok(detector)
}

fn detect_and_compute(
    detector: &mut Ptr<ORB>,
    image: &GrayImage,
) -> Result<(Vector<KeyPoint>, Mat), AlignError> {
    let mut keypoints = Vector::<KeyPoint>::new();
    let mut descriptors = Mat::default();
    detector.detect_and_compute(
        image.mat(),
        &no_array(),
        &mut keypoints,
        &mut descriptors,
        false,
    )?;
    Ok((keypoints, descriptors))
}

/// Reference panel image with its precomputed features. Immutable once built.
pub struct ReferenceLayout {
    image: ColorImage,
    keypoints: Vector<KeyPoint>,
    descriptors: Mat,
}

// SAFETY: the OpenCV buffers are written only during construction; afterwards
// every access goes through `&self` and is read-only.
unsafe impl Send for ReferenceLayout {}
unsafe impl Sync for ReferenceLayout {}

impl ReferenceLayout {
    pub fn new(image: ColorImage, config: &AlignmentConfig) -> Result<Self, AlignError> {
        let mut detector = create_detector(config)?;
        let gray = image.copy()?.to_gray()?;
        let (keypoints, descriptors) = detect_and_compute(&mut detector, &gray)?;

        if keypoints.len() < MIN_HOMOGRAPHY_POINTS {
            return Err(AlignError::NoMatch {
                reason: format!(
                    "reference layout yields only {} keypoints",
                    keypoints.len()
                ),
            });
        }

        tracing::info!(
            keypoints = keypoints.len(),
            width = image.cols(),
            height = image.rows(),
            "reference layout prepared"
        );

        Ok(Self {
            image,
            keypoints,
            descriptors,
        })
    }

    pub fn image(&self) -> &ColorImage {
        &self.image
    }

    pub fn width(&self) -> i32 {
        self.image.cols()
    }

    pub fn height(&self) -> i32 {
        self.image.rows()
    }

    pub fn keypoint_count(&self) -> usize {
        self.keypoints.len()
    }
}

/// Per-frame mapping from live-frame pixels onto reference pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentTransform {
    pub homography: Homography,
    /// Inliers over filtered matches, in [0, 1].
    pub confidence: f64,
    pub inliers: usize,
    pub matches: usize,
}

/// Maps live frames onto the canonical panel frame.
pub struct PanelAligner {
    reference: Arc<ReferenceLayout>,
    detector: Mutex<Ptr<ORB>>,
    config: AlignmentConfig,
}

// SAFETY: the detector is only used under its mutex; the reference is read-only.
unsafe impl Send for PanelAligner {}
unsafe impl Sync for PanelAligner {}

impl PanelAligner {
    pub fn new(reference: Arc<ReferenceLayout>, config: &AlignmentConfig) -> Result<Self, AlignError> {
        if let Some(panel_box) = config.panel_box {
            check_panel_box(&panel_box, &reference)?;
        }
        let detector = create_detector(config)?;
        Ok(Self {
            reference,
            detector: Mutex::new(detector),
            config: config.clone(),
        })
    }

    /// Build the reference layout from `image` and an aligner over it.
    pub fn from_reference_image(image: ColorImage, config: &AlignmentConfig) -> Result<Self, AlignError> {
        let reference = Arc::new(ReferenceLayout::new(image, config)?);
        Self::new(reference, config)
    }

    pub fn reference(&self) -> &Arc<ReferenceLayout> {
        &self.reference
    }

    /// Width and height of the canonical panel images `align` produces.
    pub fn canonical_size(&self) -> (i32, i32) {
        match self.config.panel_box {
            Some(panel_box) => (panel_box.width(), panel_box.height()),
            None => (self.reference.width(), self.reference.height()),
        }
    }

    /// Warp `frame` into the canonical panel frame.
    pub fn align(&self, frame: ColorImage) -> Result<ColorImage, AlignError> {
        let transform = self.estimate(&frame)?;
        let warped = frame.warp(
            Some(&transform.homography),
            self.reference.width(),
            self.reference.height(),
        )?;

        match self.config.panel_box {
            Some(panel_box) => Ok(warped.trim(panel_box.top_left(), panel_box.bottom_right())?),
            None => Ok(warped),
        }
    }

    /// Fit the live-to-reference homography for `frame` and score it.
    pub fn estimate(&self, frame: &ColorImage) -> Result<AlignmentTransform, AlignError> {
        let start = Instant::now();
        let gray = frame.copy()?.to_gray()?;
        let (keypoints, descriptors) = {
            let mut detector = self.detector.lock();
            detect_and_compute(&mut detector, &gray)?
        };

        if keypoints.is_empty() || descriptors.rows() == 0 {
            return Err(AlignError::NoMatch {
                reason: "live frame has no detectable features".to_string(),
            });
        }

        let matches = self.match_features(&descriptors)?;
        tracing::debug!(
            keypoints = keypoints.len(),
            matches = matches.len(),
            "live features matched"
        );
        if matches.len() < MIN_HOMOGRAPHY_POINTS {
            return Err(AlignError::NoMatch {
                reason: format!(
                    "{} matches within Hamming distance {}, need at least {}",
                    matches.len(),
                    self.config.distance_threshold,
                    MIN_HOMOGRAPHY_POINTS
                ),
            });
        }

        let mut live_points = Vector::<Point2f>::new();
        let mut reference_points = Vector::<Point2f>::new();
        for m in &matches {
            live_points.push(keypoints.get(m.query_idx as usize)?.pt());
            reference_points.push(self.reference.keypoints.get(m.train_idx as usize)?.pt());
        }

        let mut mask = Mat::default();
        let fitted = calib3d::find_homography(
            &live_points,
            &reference_points,
            &mut mask,
            calib3d::RANSAC,
            self.config.ransac_reproj_threshold,
        )?;
        if fitted.empty() {
            return Err(AlignError::NoMatch {
                reason: "no consistent homography among matches".to_string(),
            });
        }

        let homography = Homography::from_mat(&fitted)?;
        let determinant = homography.determinant();
        if !homography.matrix().iter().flatten().all(|v| v.is_finite())
            || determinant <= MIN_DETERMINANT
        {
            return Err(AlignError::NoMatch {
                reason: format!("degenerate homography (determinant {determinant:.3e})"),
            });
        }

        let inliers = if mask.empty() {
            0
        } else {
            cv::count_non_zero(&mask)? as usize
        };
        let transform = AlignmentTransform {
            homography,
            confidence: inliers as f64 / matches.len() as f64,
            inliers,
            matches: matches.len(),
        };

        tracing::debug!(
            inliers = transform.inliers,
            matches = transform.matches,
            confidence = transform.confidence,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "homography estimated"
        );

        if transform.inliers < self.config.min_inliers
            || transform.confidence < self.config.min_confidence
        {
            return Err(AlignError::LowConfidence {
                score: transform.confidence,
                threshold: self.config.min_confidence,
            });
        }

        Ok(transform)
    }

    fn match_features(&self, descriptors: &Mat) -> Result<Vec<DMatch>, AlignError> {
        if self.reference.descriptors.rows() == 0 {
            return Ok(Vec::new());
        }

        let matcher = BFMatcher::create(cv::NORM_HAMMING, true)?;
        let mut matches = Vector::<DMatch>::new();
        matcher.train_match(descriptors, &self.reference.descriptors, &mut matches, &no_array())?;

        let mut good_matches: Vec<DMatch> = matches
            .into_iter()
            .filter(|m| m.distance < self.config.distance_threshold)
            .collect();
        good_matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(good_matches)
    }
}

fn check_panel_box(panel_box: &Region, reference: &ReferenceLayout) -> Result<(), AlignError> {
    let inside = !panel_box.is_empty()
        && panel_box.p1[0] >= 0
        && panel_box.p1[1] >= 0
        && panel_box.p2[0] <= reference.width()
        && panel_box.p2[1] <= reference.height();
    if inside {
        Ok(())
    } else {
        Err(AlignError::Image(crate::error::ImageError::OutOfBounds {
            x1: panel_box.p1[0],
            y1: panel_box.p1[1],
            x2: panel_box.p2[0],
            y2: panel_box.p2[1],
            width: reference.width(),
            height: reference.height(),
        }))
    }
}

#![allow(dead_code)]

use opencv::core::{Mat, Point, Rect, Scalar, CV_8UC3};
use opencv::imgproc;
use panel_recognition::config::Config;
use panel_recognition::error::{OcrError, ReaderError};
use panel_recognition::image::{ColorImage, GrayImage, Homography, Image};
use panel_recognition::ocr::{CharsetProfile, OcrBackend, Recognizer};
use panel_recognition::reader::FrameReader;
use panel_recognition::{PanelAligner, PanelCamera};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;

pub const WIDTH: i32 = 640;
pub const HEIGHT: i32 = 480;

/// Random filled rectangles over a dark background, fixed by `seed`.
fn textured(seed: u64) -> Mat {
    let mut mat =
        Mat::new_rows_cols_with_default(HEIGHT, WIDTH, CV_8UC3, Scalar::all(30.0)).unwrap();

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..160 {
        let x = rng.gen_range(0..WIDTH - 20);
        let y = rng.gen_range(0..HEIGHT - 20);
        let w = rng.gen_range(8..60);
        let h = rng.gen_range(8..60);
        let color = Scalar::new(
            rng.gen_range(40.0..240.0),
            rng.gen_range(40.0..240.0),
            rng.gen_range(40.0..240.0),
            0.0,
        );
        imgproc::rectangle(&mut mat, Rect::new(x, y, w, h), color, -1, imgproc::LINE_8, 0)
            .unwrap();
    }
    mat
}

/// Synthetic control panel: seeded texture, a display window and optional digits.
///
/// Every call with the same arguments yields the same pixels.
pub fn panel_frame(display_lit: bool, digits: Option<&str>) -> ColorImage {
    let mut mat = textured(7);

    let display = Rect::new(400, 220, 200, 130);
    let fill = if display_lit {
        Scalar::new(200.0, 235.0, 210.0, 0.0)
    } else {
        Scalar::all(22.0)
    };
    imgproc::rectangle(&mut mat, display, fill, -1, imgproc::LINE_8, 0).unwrap();

    if let Some(digits) = digits {
        imgproc::put_text(
            &mut mat,
            digits,
            Point::new(474, 315),
            imgproc::FONT_HERSHEY_SIMPLEX,
            2.0,
            Scalar::all(15.0),
            5,
            imgproc::LINE_8,
            false,
        )
        .unwrap();
    }

    ColorImage::from_mat(mat).unwrap()
}

pub fn reference() -> ColorImage {
    panel_frame(true, Some("24"))
}

/// Same panel seen from a slightly different viewpoint.
pub fn moved(frame: ColorImage, degree: f64, dx: f64, dy: f64) -> ColorImage {
    let shift = Homography::from_matrix([[1.0, 0.0, dx], [0.0, 1.0, dy], [0.0, 0.0, 1.0]]);
    frame
        .rotate(degree)
        .unwrap()
        .warp(Some(&shift), WIDTH, HEIGHT)
        .unwrap()
}

/// Busy scene built from the same kind of shapes as the panel but laid out
/// differently, so it has plenty of features and no true correspondence.
pub fn unrelated_scene(seed: u64) -> ColorImage {
    ColorImage::from_mat(textured(seed)).unwrap()
}

pub fn uniform_frame(level: f64) -> ColorImage {
    let mat =
        Mat::new_rows_cols_with_default(HEIGHT, WIDTH, CV_8UC3, Scalar::all(level)).unwrap();
    ColorImage::from_mat(mat).unwrap()
}

pub fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> f64 {
    let a = a.to_bytes().unwrap();
    let b = b.to_bytes().unwrap();
    assert_eq!(a.len(), b.len());
    let total: u64 = a
        .iter()
        .zip(&b)
        .map(|(x, y)| (*x as i32 - *y as i32).unsigned_abs() as u64)
        .sum();
    total as f64 / a.len() as f64
}

/// Frame reader replaying a fixed script, then failing as a disconnected device.
pub struct ScriptedReader {
    frames: VecDeque<Result<ColorImage, ReaderError>>,
}

impl ScriptedReader {
    pub const SOURCE: &'static str = "scripted://bench";

    pub fn new(frames: Vec<ColorImage>) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
        }
    }
}

impl FrameReader for ScriptedReader {
    fn source_id(&self) -> &str {
        Self::SOURCE
    }

    fn read(&mut self) -> Result<ColorImage, ReaderError> {
        self.frames.pop_front().unwrap_or_else(|| {
            Err(ReaderError::Capture {
                source_id: Self::SOURCE.to_string(),
                reason: "device disconnected".to_string(),
            })
        })
    }
}

/// OCR backend answering with fixed text and remembering each region size.
#[derive(Clone)]
pub struct ScriptedOcr {
    answer: Result<String, String>,
    seen: Arc<Mutex<Vec<(i32, i32)>>>,
}

impl ScriptedOcr {
    pub fn answering(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<(i32, i32)> {
        self.seen.lock().clone()
    }
}

impl OcrBackend for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, image: &GrayImage, _profile: &CharsetProfile) -> Result<String, OcrError> {
        self.seen.lock().push((image.cols(), image.rows()));
        self.answer.clone().map_err(|message| OcrError::Backend {
            backend: "scripted".to_string(),
            message,
        })
    }
}

pub fn camera_with(frames: Vec<ColorImage>, ocr: ScriptedOcr, config: &Config) -> PanelCamera {
    let aligner = PanelAligner::from_reference_image(reference(), &config.alignment).unwrap();
    let recognizer = Recognizer::new(Box::new(ocr), CharsetProfile::from(&config.ocr));
    PanelCamera::new(Box::new(ScriptedReader::new(frames)), aligner, recognizer, config).unwrap()
}

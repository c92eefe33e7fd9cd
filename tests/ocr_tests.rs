use opencv::core::{Mat, Point, Scalar, CV_8UC1};
use opencv::imgproc;
use panel_recognition::config::OcrConfig;
use panel_recognition::image::{GrayImage, Image};
use panel_recognition::ocr::{CharsetProfile, Recognizer, TesseractCli};

/// Dark digits on a white card, sized well above Tesseract's minimum glyph height.
fn rendered_digits(text: &str) -> GrayImage {
    let mut mat = Mat::new_rows_cols_with_default(140, 320, CV_8UC1, Scalar::all(255.0)).unwrap();
    imgproc::put_text(
        &mut mat,
        text,
        Point::new(60, 105),
        imgproc::FONT_HERSHEY_SIMPLEX,
        3.0,
        Scalar::all(0.0),
        6,
        imgproc::LINE_AA,
        false,
    )
    .unwrap();
    GrayImage::from_mat(mat).unwrap()
}

// The stock `eng` data ships with every Tesseract install; `letsgodigital`
// usually has to be added by hand.
fn stock_profile() -> CharsetProfile {
    CharsetProfile {
        language: "eng".to_string(),
        ..CharsetProfile::seven_segment_digits()
    }
}

#[test]
#[ignore = "needs the tesseract executable with eng data"]
fn test_tesseract_reads_rendered_digits() {
    let recognizer = Recognizer::new(Box::new(TesseractCli::default()), stock_profile());

    for digits in ["24", "18", "37"] {
        let text = recognizer.image_to_text(&rendered_digits(digits)).unwrap();
        assert_eq!(text, digits);
    }
}

#[test]
#[ignore = "needs the tesseract executable with eng data"]
fn test_tesseract_output_is_trimmed_text_only() {
    let config = OcrConfig {
        language: "eng".to_string(),
        ..OcrConfig::default()
    };
    let recognizer = Recognizer::from_config(&config);
    assert_eq!(recognizer.backend_name(), "tesseract");

    let text = recognizer.image_to_text(&rendered_digits("24")).unwrap();
    assert!(!text.contains('\n') && !text.contains('\u{c}'), "{text:?}");
    assert!(text.chars().all(|c| c.is_ascii_digit()), "{text:?}");
}

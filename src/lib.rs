pub mod align;
pub mod camera;
pub mod config;
pub mod error;
pub mod image;
pub mod logging;
pub mod ocr;
pub mod reader;
pub mod utils;

pub use align::{AlignmentTransform, PanelAligner, ReferenceLayout};
pub use camera::{parse_temperature, PanelCamera};
pub use config::Config;
pub use error::{Diagnostic, RecognitionError, Stage};
pub use image::{ColorImage, GrayImage, Image};
pub use ocr::{CharsetProfile, OcrBackend, Recognizer};
pub use reader::FrameReader;

pub type Result<T> = anyhow::Result<T>;

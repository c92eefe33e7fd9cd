//! Pixels-to-text recognition
//!
//! A [`Recognizer`] binds an [`OcrBackend`] to the [`CharsetProfile`] of the panel's
//! seven-segment display. It does no numeric interpretation: text that does not
//! parse is returned as-is and judged by the caller.

pub mod tesseract;

pub use tesseract::TesseractCli;

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::image::GrayImage;
use std::sync::Arc;

/// Font and character restrictions handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharsetProfile {
    /// Trained data name, e.g. `letsgodigital` for segment displays.
    pub language: String,
    /// Characters the backend may emit.
    pub whitelist: String,
    /// Tesseract page segmentation mode; 7 treats the image as one text line.
    pub page_segmentation_mode: u8,
}

impl CharsetProfile {
    pub fn seven_segment_digits() -> Self {
        Self::from(&OcrConfig::default())
    }
}

impl From<&OcrConfig> for CharsetProfile {
    fn from(config: &OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
            whitelist: config.whitelist.clone(),
            page_segmentation_mode: config.page_segmentation_mode,
        }
    }
}

/// Engine turning a prepared single-channel region into text.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Raw text for `image`. Fails only when the engine itself fails.
    fn recognize(&self, image: &GrayImage, profile: &CharsetProfile) -> Result<String, OcrError>;
}

impl<B: OcrBackend + ?Sized> OcrBackend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image: &GrayImage, profile: &CharsetProfile) -> Result<String, OcrError> {
        (**self).recognize(image, profile)
    }
}

impl<B: OcrBackend + ?Sized> OcrBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image: &GrayImage, profile: &CharsetProfile) -> Result<String, OcrError> {
        (**self).recognize(image, profile)
    }
}

pub struct Recognizer {
    backend: Box<dyn OcrBackend>,
    profile: CharsetProfile,
}

impl Recognizer {
    pub fn new(backend: Box<dyn OcrBackend>, profile: CharsetProfile) -> Self {
        Self { backend, profile }
    }

    /// Recognizer over the `tesseract` executable configured in `config`.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            Box::new(TesseractCli::new(config.command.clone())),
            CharsetProfile::from(config),
        )
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn profile(&self) -> &CharsetProfile {
        &self.profile
    }

    /// Text on `image` with surrounding whitespace removed.
    pub fn image_to_text(&self, image: &GrayImage) -> Result<String, OcrError> {
        let raw = self.backend.recognize(image, &self.profile)?;
        let text = raw.trim().to_string();
        tracing::debug!(backend = self.backend.name(), text = %text, "text recognized");
        Ok(text)
    }
}

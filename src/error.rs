//! Error types for every pipeline stage
//!
//! Each stage owns a typed error. The facade collapses all of them into a single
//! [`RecognitionError`] carrying the stage that failed and a diagnostic payload.

use std::fmt;
use thiserror::Error;

/// Failures raised by the image value types.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot build {variant} image: expected {expected} channel(s), buffer has {actual}")]
    ChannelMismatch {
        variant: &'static str,
        expected: i32,
        actual: i32,
    },

    #[error("rectangle ({x1}, {y1})-({x2}, {y2}) exceeds image extents {width}x{height}")]
    OutOfBounds {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        width: i32,
        height: i32,
    },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    OpenCv(#[from] opencv::Error),
}

impl ImageError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Failures raised by frame readers.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open capture source {source_id:?}")]
    Open { source_id: String },

    #[error("capture from {source_id:?} failed: {reason}")]
    Capture { source_id: String, reason: String },

    #[error("fetching {source_id:?} failed: {reason}")]
    Fetch { source_id: String, reason: String },

    #[error("decoding image from {source_id:?} failed: {reason}")]
    Decode { source_id: String, reason: String },
}

impl ReaderError {
    pub fn source_id(&self) -> &str {
        match self {
            Self::Open { source_id }
            | Self::Capture { source_id, .. }
            | Self::Fetch { source_id, .. }
            | Self::Decode { source_id, .. } => source_id,
        }
    }

    fn reason(&self) -> String {
        match self {
            Self::Open { .. } => "device unavailable".to_string(),
            Self::Capture { reason, .. } | Self::Fetch { reason, .. } | Self::Decode { reason, .. } => {
                reason.clone()
            }
        }
    }
}

/// Failures raised while aligning a live frame to the reference layout.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("no usable correspondence with the reference layout: {reason}")]
    NoMatch { reason: String },

    #[error("correspondence confidence {score:.3} below threshold {threshold:.3}")]
    LowConfidence { score: f64, threshold: f64 },

    #[error(transparent)]
    Image(#[from] ImageError),
}

impl From<opencv::Error> for AlignError {
    fn from(err: opencv::Error) -> Self {
        Self::Image(ImageError::OpenCv(err))
    }
}

/// Failures raised by an OCR backend. Nonsense text is not a backend failure.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend `{backend}` failed: {message}")]
    Backend { backend: String, message: String },

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Pipeline stage a [`RecognitionError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Capture,
    Alignment,
    Enhancement,
    OcrBackend,
    OcrParse,
    RangeValidation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Capture => "capture",
            Stage::Alignment => "alignment",
            Stage::Enhancement => "enhancement",
            Stage::OcrBackend => "ocr_backend",
            Stage::OcrParse => "ocr_parse",
            Stage::RangeValidation => "range_validation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-specific payload attached to a [`RecognitionError`].
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Capture source identifier and what went wrong with it.
    Source { source: String, reason: String },
    /// Correspondence was found but scored below the threshold.
    Confidence { score: f64, threshold: f64 },
    /// No correspondence at all.
    NoMatch { reason: String },
    /// Message reported by the OCR backend.
    Backend(String),
    /// Recognized text that did not parse.
    RawText(String),
    /// Parsed value that failed range validation.
    Value(i64),
    /// Image operation failure between alignment and recognition.
    Image(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Source { source, reason } => write!(f, "source {source:?}: {reason}"),
            Diagnostic::Confidence { score, threshold } => {
                write!(f, "confidence {score:.3} (threshold {threshold:.3})")
            }
            Diagnostic::NoMatch { reason } => write!(f, "no match: {reason}"),
            Diagnostic::Backend(message) => f.write_str(message),
            Diagnostic::RawText(text) => write!(f, "got {text:?}"),
            Diagnostic::Value(value) => write!(f, "got {value}"),
            Diagnostic::Image(message) => f.write_str(message),
        }
    }
}

/// The only error type crossing the recognition facade.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("recognition failed at {stage}: {diagnostic}")]
pub struct RecognitionError {
    pub stage: Stage,
    pub diagnostic: Diagnostic,
}

impl RecognitionError {
    pub fn new(stage: Stage, diagnostic: Diagnostic) -> Self {
        Self { stage, diagnostic }
    }

    pub fn parse(raw: impl Into<String>) -> Self {
        Self::new(Stage::OcrParse, Diagnostic::RawText(raw.into()))
    }

    pub fn out_of_range(value: i64) -> Self {
        Self::new(Stage::RangeValidation, Diagnostic::Value(value))
    }

    pub fn enhancement(err: ImageError) -> Self {
        Self::new(Stage::Enhancement, Diagnostic::Image(err.to_string()))
    }
}

impl From<ReaderError> for RecognitionError {
    fn from(err: ReaderError) -> Self {
        Self::new(
            Stage::Capture,
            Diagnostic::Source {
                source: err.source_id().to_string(),
                reason: err.reason(),
            },
        )
    }
}

impl From<AlignError> for RecognitionError {
    fn from(err: AlignError) -> Self {
        let diagnostic = match err {
            AlignError::NoMatch { reason } => Diagnostic::NoMatch { reason },
            AlignError::LowConfidence { score, threshold } => {
                Diagnostic::Confidence { score, threshold }
            }
            AlignError::Image(inner) => Diagnostic::NoMatch {
                reason: inner.to_string(),
            },
        };
        Self::new(Stage::Alignment, diagnostic)
    }
}

impl From<OcrError> for RecognitionError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::Backend { message, .. } => {
                Self::new(Stage::OcrBackend, Diagnostic::Backend(message))
            }
            OcrError::Image(inner) => Self::new(Stage::OcrBackend, Diagnostic::Backend(inner.to_string())),
        }
    }
}

//! Static image source: http(s) URL, `file://` URL or plain path.

use super::{into_color_image, FrameReader};
use crate::error::ReaderError;
use crate::image::ColorImage;
use opencv::core::Vector;
use opencv::imgcodecs;
use opencv::prelude::*;
use std::path::Path;
use std::time::Duration;

/// Reader bound to one fixed image location.
pub struct UrlReader {
    source: String,
    timeout: Duration,
}

impl UrlReader {
    pub fn new(source: impl Into<String>, timeout: Duration) -> Self {
        Self {
            source: source.into(),
            timeout,
        }
    }

    fn fetch_error(&self, reason: impl ToString) -> ReaderError {
        ReaderError::Fetch {
            source_id: self.source.clone(),
            reason: reason.to_string(),
        }
    }

    fn fetch_bytes(&self) -> Result<Vec<u8>, ReaderError> {
        if self.source.starts_with("http://") || self.source.starts_with("https://") {
            let client = reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| self.fetch_error(e))?;
            let response = client
                .get(&self.source)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| self.fetch_error(e))?;
            let body = response.bytes().map_err(|e| self.fetch_error(e))?;
            return Ok(body.to_vec());
        }

        let path = self.source.strip_prefix("file://").unwrap_or(&self.source);
        std::fs::read(Path::new(path)).map_err(|e| self.fetch_error(e))
    }
}

impl FrameReader for UrlReader {
    fn source_id(&self) -> &str {
        &self.source
    }

    fn read(&mut self) -> Result<ColorImage, ReaderError> {
        let bytes = self.fetch_bytes()?;
        tracing::debug!(source = %self.source, bytes = bytes.len(), "image fetched");

        let decode_error = |reason: String| ReaderError::Decode {
            source_id: self.source.clone(),
            reason,
        };
        let buffer = Vector::<u8>::from_slice(&bytes);
        let decoded = imgcodecs::imdecode(&buffer, imgcodecs::IMREAD_COLOR)
            .map_err(|e| decode_error(e.to_string()))?;
        if decoded.empty() {
            return Err(decode_error("data is not a supported image format".to_string()));
        }

        into_color_image(decoded).map_err(|e| decode_error(e.to_string()))
    }
}

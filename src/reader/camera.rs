//! OpenCV-backed live capture.

use super::{into_color_image, parse_device_index, FrameReader};
use crate::config::CameraConfig;
use crate::error::ReaderError;
use crate::image::ColorImage;
use opencv::core::{Mat, Vector};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

/// Reader bound to one capture device for its whole lifetime.
pub struct CameraReader {
    capture: VideoCapture,
    source_id: String,
}

impl CameraReader {
    /// Open the configured device, apply the requested resolution and discard
    /// `warmup_frames` frames while exposure settles.
    ///
    /// `open_timeout_ms` and `read_timeout_ms` bound how long a stalled device
    /// can block. Backends that ignore them keep their own built-in limits.
    pub fn open(config: &CameraConfig) -> Result<Self, ReaderError> {
        let source_id = config.device.clone();
        let mut capture = open_video_capture(&source_id, &timeout_params(config))?;

        set_property(
            &mut capture,
            &source_id,
            "read timeout",
            videoio::CAP_PROP_READ_TIMEOUT_MSEC,
            config.read_timeout_ms as f64,
        );
        if let Some((width, height)) = config.frame_size() {
            set_property(&mut capture, &source_id, "frame width", videoio::CAP_PROP_FRAME_WIDTH, width as f64);
            set_property(&mut capture, &source_id, "frame height", videoio::CAP_PROP_FRAME_HEIGHT, height as f64);
        }

        for _ in 0..config.warmup_frames {
            let grabbed = capture.grab().map_err(|e| ReaderError::Capture {
                source_id: source_id.clone(),
                reason: e.to_string(),
            })?;
            if !grabbed {
                tracing::warn!(device = %source_id, "warm-up frame could not be grabbed");
                break;
            }
        }

        tracing::info!(
            device = %source_id,
            open_timeout_ms = config.open_timeout_ms,
            read_timeout_ms = config.read_timeout_ms,
            "capture device opened"
        );
        Ok(Self { capture, source_id })
    }
}

impl FrameReader for CameraReader {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn read(&mut self) -> Result<ColorImage, ReaderError> {
        let capture_error = |reason: String| ReaderError::Capture {
            source_id: self.source_id.clone(),
            reason,
        };

        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .map_err(|e| capture_error(e.to_string()))?;
        if !ok || frame.empty() {
            return Err(capture_error("device returned no frame".to_string()));
        }

        let image = into_color_image(frame).map_err(|e| capture_error(e.to_string()))?;
        tracing::debug!(device = %self.source_id, "frame captured");
        Ok(image)
    }
}

/// Open-time parameters carrying both capture timeouts.
fn timeout_params(config: &CameraConfig) -> Vector<i32> {
    let millis = |value: u32| i32::try_from(value).unwrap_or(i32::MAX);
    Vector::from_slice(&[
        videoio::CAP_PROP_OPEN_TIMEOUT_MSEC,
        millis(config.open_timeout_ms),
        videoio::CAP_PROP_READ_TIMEOUT_MSEC,
        millis(config.read_timeout_ms),
    ])
}

fn set_property(capture: &mut VideoCapture, device: &str, name: &str, property: i32, value: f64) {
    match capture.set(property, value) {
        Ok(true) => {}
        Ok(false) => tracing::warn!(device, property = name, value, "backend ignored capture property"),
        Err(err) => tracing::warn!(device, property = name, value, error = %err, "failed to set capture property"),
    }
}

/// Open a capture either by device index or by URI.
///
/// Each candidate is tried with the timeout parameters first. Backends that
/// reject them at open time are retried without.
fn open_video_capture(device: &str, params: &Vector<i32>) -> Result<VideoCapture, ReaderError> {
    if let Some(index) = parse_device_index(device) {
        for backend in [videoio::CAP_V4L2, videoio::CAP_ANY] {
            for with_timeouts in [true, false] {
                let opened = if with_timeouts {
                    VideoCapture::new_with_params(index, backend, params)
                } else {
                    VideoCapture::new(index, backend)
                };
                match opened {
                    Ok(cap) if cap.is_opened().unwrap_or(false) => {
                        if !with_timeouts {
                            tracing::warn!(index, backend, "device opened without open timeout");
                        }
                        return Ok(cap);
                    }
                    Ok(_) => tracing::debug!(index, backend, with_timeouts, "device not opened"),
                    Err(err) => tracing::warn!(index, backend, error = %err, "failed to open device"),
                }
            }
        }
    } else {
        for with_timeouts in [true, false] {
            let opened = if with_timeouts {
                VideoCapture::from_file_with_params(device, videoio::CAP_ANY, params)
            } else {
                VideoCapture::from_file(device, videoio::CAP_ANY)
            };
            match opened {
                Ok(cap) if cap.is_opened().unwrap_or(false) => {
                    if !with_timeouts {
                        tracing::warn!(uri = device, "capture source opened without open timeout");
                    }
                    return Ok(cap);
                }
                Ok(_) => tracing::debug!(uri = device, with_timeouts, "capture source not opened"),
                Err(err) => tracing::warn!(uri = device, error = %err, "failed to open capture source"),
            }
        }
    }

    Err(ReaderError::Open {
        source_id: device.to_string(),
    })
}

//! Backend driving the `tesseract` command-line tool
//!
//! The region is PNG-encoded and piped through stdin; recognized text is read
//! from stdout.

use super::{CharsetProfile, OcrBackend};
use crate::error::{ImageError, OcrError};
use crate::image::{GrayImage, Image};
use opencv::core::Vector;
use opencv::imgcodecs;
use std::io::Write;
use std::process::{Command, Stdio};

const BACKEND_NAME: &str = "tesseract";

pub struct TesseractCli {
    command: String,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn backend_error(&self, message: impl Into<String>) -> OcrError {
        OcrError::Backend {
            backend: BACKEND_NAME.to_string(),
            message: message.into(),
        }
    }

    /// Arguments for one recognition run reading stdin and writing stdout.
    pub fn arguments(profile: &CharsetProfile) -> Vec<String> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            profile.language.clone(),
            "--psm".to_string(),
            profile.page_segmentation_mode.to_string(),
        ];
        if !profile.whitelist.is_empty() {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={}", profile.whitelist));
        }
        args
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new(BACKEND_NAME)
    }
}

fn encode_png(image: &GrayImage) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vector::<u8>::new();
    imgcodecs::imencode(".png", image.mat(), &mut buffer, &Vector::<i32>::new())?;
    Ok(buffer.to_vec())
}

impl OcrBackend for TesseractCli {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn recognize(&self, image: &GrayImage, profile: &CharsetProfile) -> Result<String, OcrError> {
        let png = encode_png(image)?;

        let mut child = Command::new(&self.command)
            .args(Self::arguments(profile))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.backend_error(format!("cannot start `{}`: {e}", self.command)))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| self.backend_error("stdin not captured"))?;
            stdin
                .write_all(&png)
                .map_err(|e| self.backend_error(format!("cannot write image: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| self.backend_error(format!("process failed: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.backend_error(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

//! Logging configuration
//!
//! Per-component log levels, output destinations and file layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    pub global_level: String,

    /// Level for the alignment stage
    pub alignment_level: String,

    /// Level for the recognition facade and OCR
    pub recognition_level: String,

    /// Enable console output
    pub console_output: bool,

    /// Emit console output as JSON lines
    pub json_console: bool,

    /// Directory for daily-rolled JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// Include file location in logs
    pub include_file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "info".to_string(),
            alignment_level: "info".to_string(),
            recognition_level: "info".to_string(),
            console_output: true,
            json_console: false,
            log_directory: None,
            include_file_location: false,
        }
    }
}

impl LoggingConfig {
    /// Verbose configuration for bench work on the camera mount
    pub fn development() -> Self {
        Self {
            global_level: "debug".to_string(),
            alignment_level: "trace".to_string(),
            recognition_level: "debug".to_string(),
            include_file_location: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("global_level", &self.global_level),
            ("alignment_level", &self.alignment_level),
            ("recognition_level", &self.recognition_level),
        ] {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid {}: {}. Must be one of: {:?}",
                    name, level, VALID_LEVELS
                ));
            }
        }

        if let Some(ref log_dir) = self.log_directory {
            if let Some(parent) = log_dir.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(format!("Log directory parent does not exist: {:?}", parent));
                }
            }
        }

        Ok(())
    }

    /// Filter directive string: global level plus per-module overrides
    pub fn filter_directives(&self) -> String {
        let krate = env!("CARGO_PKG_NAME").replace('-', "_");
        format!(
            "{krate}={global},{krate}::align={alignment},{krate}::camera={recognition},{krate}::ocr={recognition}",
            global = self.global_level,
            alignment = self.alignment_level,
            recognition = self.recognition_level,
        )
    }

    /// Map CLI verbosity (-v count) onto the global level
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        if verbose > 0 {
            let level = match verbose {
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            self.global_level = level.to_string();
            self.alignment_level = level.to_string();
            self.recognition_level = level.to_string();
        }
        self
    }
}

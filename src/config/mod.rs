use crate::logging::LoggingConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub reference: ReferenceConfig,
    pub alignment: AlignmentConfig,
    pub regions: RegionConfig,
    pub enhancement: EnhancementConfig,
    pub ocr: OcrConfig,
    pub power: PowerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index, `/dev/videoN` path or stream URI
    pub device: String,
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub warmup_frames: u32,
    /// Upper bound on opening the device, in milliseconds
    pub open_timeout_ms: u32,
    /// Upper bound on waiting for a single frame, in milliseconds
    pub read_timeout_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// http(s) URL, `file://` URL or plain path of the front-facing panel photo
    pub source: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub max_features: i32,
    pub scale_factor: f32,
    pub n_levels: i32,
    pub edge_threshold: i32,
    pub patch_size: i32,
    pub fast_threshold: i32,
    /// Maximum Hamming distance for a descriptor match to be kept
    pub distance_threshold: f32,
    pub ransac_reproj_threshold: f64,
    pub min_inliers: usize,
    /// Minimum inlier ratio among filtered matches
    pub min_confidence: f64,
    /// Panel bounding box in reference coordinates; whole reference when absent
    pub panel_box: Option<Region>,
}

/// Axis-aligned rectangle given by its top-left (inclusive) and bottom-right
/// (exclusive) corners as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub p1: [i32; 2],
    pub p2: [i32; 2],
}

impl Region {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            p1: [x1, y1],
            p2: [x2, y2],
        }
    }

    pub fn top_left(&self) -> crate::image::Point {
        crate::image::Point::new(self.p1[0], self.p1[1])
    }

    pub fn bottom_right(&self) -> crate::image::Point {
        crate::image::Point::new(self.p2[0], self.p2[1])
    }

    pub fn width(&self) -> i32 {
        self.p2[0] - self.p1[0]
    }

    pub fn height(&self) -> i32 {
        self.p2[1] - self.p1[1]
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0 || self.p1[0] < 0 || self.p1[1] < 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Temperature digits, relative to the canonical panel
    pub temperature: Region,
    /// Display area sampled for power detection
    pub display: Region,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    pub denoise_kernel: i32,
    pub clahe_clip_limit: f64,
    pub clahe_grid_size: i32,
    pub binarize: Option<BinarizeConfig>,
    pub close_kernel: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinarizeConfig {
    pub block_size: i32,
    pub offset: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub command: String,
    /// Tesseract traineddata name for the display font
    pub language: String,
    pub whitelist: String,
    pub page_segmentation_mode: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    /// Display mean over panel mean at or above which the display counts as lit
    pub brightness_ratio: f64,
}

impl CameraConfig {
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.frame_width.zip(self.frame_height)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            frame_width: None,
            frame_height: None,
            warmup_frames: 5,
            open_timeout_ms: 10_000,
            read_timeout_ms: 5_000,
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            source: "reference.png".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_features: 2000,
            scale_factor: 1.2,
            n_levels: 8,
            edge_threshold: 31,
            patch_size: 31,
            fast_threshold: 20,
            distance_threshold: 64.0,
            ransac_reproj_threshold: 3.0,
            min_inliers: 15,
            min_confidence: 0.25,
            panel_box: None,
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            temperature: Region::new(470, 240, 545, 330),
            display: Region::new(400, 220, 600, 350),
        }
    }
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            denoise_kernel: 3,
            clahe_clip_limit: 2.0,
            clahe_grid_size: 8,
            binarize: None,
            close_kernel: None,
        }
    }
}

impl Default for BinarizeConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 2.0,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: "tesseract".to_string(),
            language: "letsgodigital".to_string(),
            whitelist: "0123456789".to_string(),
            page_segmentation_mode: 7,
        }
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            brightness_ratio: 1.25,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;

        if content.trim_start().starts_with('{') {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> anyhow::Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.camera.device.trim().is_empty() {
            errors.push("camera device must not be empty".to_string());
        }
        for (name, value) in [
            ("open_timeout_ms", self.camera.open_timeout_ms),
            ("read_timeout_ms", self.camera.read_timeout_ms),
        ] {
            if value == 0 || value > i32::MAX as u32 {
                errors.push(format!("camera {name} must be between 1 and {}", i32::MAX));
            }
        }

        if self.reference.source.trim().is_empty() {
            errors.push("reference source must not be empty".to_string());
        }

        let alignment = &self.alignment;
        if alignment.max_features <= 0 {
            errors.push("ORB max_features must be positive".to_string());
        }
        if alignment.scale_factor <= 1.0 {
            errors.push("ORB scale_factor must be greater than 1.0".to_string());
        }
        if alignment.min_inliers < 4 {
            errors.push("alignment min_inliers must be at least 4".to_string());
        }
        if !(0.0..=1.0).contains(&alignment.min_confidence) {
            errors.push("alignment min_confidence must lie in [0, 1]".to_string());
        }
        if alignment.ransac_reproj_threshold <= 0.0 {
            errors.push("RANSAC reprojection threshold must be positive".to_string());
        }
        if let Some(panel_box) = alignment.panel_box {
            if panel_box.is_empty() {
                errors.push("alignment panel_box must be a non-empty rectangle".to_string());
            }
        }

        if self.regions.temperature.is_empty() {
            errors.push("temperature region must be a non-empty rectangle".to_string());
        }
        if self.regions.display.is_empty() {
            errors.push("display region must be a non-empty rectangle".to_string());
        }

        let enhancement = &self.enhancement;
        if enhancement.denoise_kernel < 1 || enhancement.denoise_kernel % 2 == 0 {
            errors.push("denoise_kernel must be a positive odd number".to_string());
        }
        if enhancement.clahe_clip_limit <= 0.0 {
            errors.push("clahe_clip_limit must be positive".to_string());
        }
        if enhancement.clahe_grid_size < 1 {
            errors.push("clahe_grid_size must be at least 1".to_string());
        }
        if let Some(binarize) = &enhancement.binarize {
            if binarize.block_size < 3 || binarize.block_size % 2 == 0 {
                errors.push("binarize block_size must be odd and at least 3".to_string());
            }
        }
        if let Some(kernel) = enhancement.close_kernel {
            if kernel < 1 {
                errors.push("close_kernel must be at least 1".to_string());
            }
        }

        if self.ocr.command.trim().is_empty() {
            errors.push("OCR command must not be empty".to_string());
        }
        if self.ocr.page_segmentation_mode > 13 {
            errors.push("OCR page_segmentation_mode must be between 0 and 13".to_string());
        }

        if self.power.brightness_ratio <= 0.0 {
            errors.push("power brightness_ratio must be positive".to_string());
        }

        if let Err(message) = self.logging.validate() {
            errors.push(message);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// JSON for a `.json` extension, TOML otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Configuration from `config_path`, or the built-in defaults when no path is
/// given. A path that cannot be read or parsed is an error, never a silent
/// fallback. Validation is left to the caller.
pub fn load_config_or_default(config_path: Option<&Path>) -> anyhow::Result<Config> {
    match config_path {
        Some(path) => {
            let config = Config::load_from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

//! Recognition facade
//!
//! [`PanelCamera`] runs one complete pass of capture, alignment, region
//! enhancement and recognition per call. Nothing is cached between calls and
//! nothing is retried; every stage failure surfaces as a [`RecognitionError`]
//! tagged with the stage it came from.

use crate::align::PanelAligner;
use crate::config::{Config, EnhancementConfig, PowerConfig, Region, RegionConfig};
use crate::error::{RecognitionError, Stage};
use crate::image::{Color, ColorImage, GrayImage, Image, Morphology};
use crate::logging::RecognitionSpan;
use crate::ocr::Recognizer;
use crate::reader::{CameraReader, FrameReader, UrlReader};
use anyhow::{bail, Context};
use parking_lot::Mutex;
use std::time::Duration;

fn check_config(config: &Config) -> crate::Result<()> {
    if let Err(errors) = config.validate() {
        bail!("invalid configuration: {}", errors.join("; "));
    }
    Ok(())
}

/// Temperatures are plausible strictly between these bounds.
pub const TEMPERATURE_MIN_EXCLUSIVE: i64 = 10;
pub const TEMPERATURE_MAX_EXCLUSIVE: i64 = 40;

/// Parse recognized text as a set temperature and range-check it.
pub fn parse_temperature(text: &str) -> Result<i64, RecognitionError> {
    let value: i64 = text
        .trim()
        .parse()
        .map_err(|_| RecognitionError::parse(text))?;
    if value <= TEMPERATURE_MIN_EXCLUSIVE || value >= TEMPERATURE_MAX_EXCLUSIVE {
        return Err(RecognitionError::out_of_range(value));
    }
    Ok(value)
}

pub struct PanelCamera {
    reader: Mutex<Box<dyn FrameReader>>,
    aligner: PanelAligner,
    recognizer: Recognizer,
    regions: RegionConfig,
    enhancement: EnhancementConfig,
    power: PowerConfig,
}

impl PanelCamera {
    /// Assemble the facade from already-built stages.
    ///
    /// Fails when `config` does not validate, or when a configured region does
    /// not fit the canonical panel produced by `aligner`.
    pub fn new(
        reader: Box<dyn FrameReader>,
        aligner: PanelAligner,
        recognizer: Recognizer,
        config: &Config,
    ) -> crate::Result<Self> {
        check_config(config)?;

        let (width, height) = aligner.canonical_size();
        for (name, region) in [
            ("temperature", &config.regions.temperature),
            ("display", &config.regions.display),
        ] {
            if !fits(region, width, height) {
                bail!(
                    "{} region ({}, {})-({}, {}) does not fit the {}x{} canonical panel",
                    name,
                    region.p1[0],
                    region.p1[1],
                    region.p2[0],
                    region.p2[1],
                    width,
                    height
                );
            }
        }

        tracing::info!(
            source = reader.source_id(),
            backend = recognizer.backend_name(),
            width,
            height,
            "panel camera ready"
        );

        Ok(Self {
            reader: Mutex::new(reader),
            aligner,
            recognizer,
            regions: config.regions.clone(),
            enhancement: config.enhancement.clone(),
            power: config.power.clone(),
        })
    }

    /// Open the configured capture device, fetch the reference layout and bind
    /// the OCR backend. Any failure here aborts initialization.
    pub fn open(config: &Config) -> crate::Result<Self> {
        check_config(config)?;
        let reader = CameraReader::open(&config.camera)
            .with_context(|| format!("opening capture device {}", config.camera.device))?;

        let mut reference_reader = UrlReader::new(
            config.reference.source.clone(),
            Duration::from_secs(config.reference.timeout_secs),
        );
        let reference = reference_reader
            .read()
            .with_context(|| format!("loading reference layout from {}", config.reference.source))?;
        let aligner = PanelAligner::from_reference_image(reference, &config.alignment)
            .context("extracting reference layout features")?;

        let recognizer = Recognizer::from_config(&config.ocr);
        Self::new(Box::new(reader), aligner, recognizer, config)
    }

    /// Current set temperature in degrees.
    pub fn get_temperature(&self) -> Result<i64, RecognitionError> {
        let mut span = RecognitionSpan::new("get_temperature");
        let outcome = {
            let entered_span = span.span().clone();
            let _entered = entered_span.enter();
            self.read_temperature(&mut span)
        };
        span.finish(&outcome);
        outcome
    }

    /// Whether the appliance is on, judged by display brightness.
    ///
    /// The display region's mean gray level is compared with the mean of the
    /// whole canonical panel; a lit display stands out by at least
    /// `power.brightness_ratio`.
    pub fn is_power_on(&self) -> Result<bool, RecognitionError> {
        let mut span = RecognitionSpan::new("is_power_on");
        let outcome = {
            let entered_span = span.span().clone();
            let _entered = entered_span.enter();
            self.read_power(&mut span)
        };
        span.finish(&outcome);
        outcome
    }

    /// Live frame warped into the canonical panel frame.
    pub fn panel_image(&self) -> Result<ColorImage, RecognitionError> {
        let frame = self.capture()?;
        Ok(self.aligner.align(frame)?)
    }

    /// Enhanced temperature region exactly as handed to the OCR backend.
    pub fn temperature_image(&self) -> Result<GrayImage, RecognitionError> {
        let panel = self.panel_image()?;
        self.prepare_temperature(panel)
    }

    /// Canonical panel with the configured regions outlined.
    pub fn annotated_panel(&self) -> Result<ColorImage, RecognitionError> {
        let panel = self.panel_image()?;
        let temperature = &self.regions.temperature;
        let display = &self.regions.display;
        panel
            .put_text_box("display", display.top_left(), display.bottom_right(), Color::GREEN)
            .and_then(|image| {
                image.put_text_box(
                    "temperature",
                    temperature.top_left(),
                    temperature.bottom_right(),
                    Color::RED,
                )
            })
            .map_err(RecognitionError::enhancement)
    }

    fn capture(&self) -> Result<ColorImage, RecognitionError> {
        let mut reader = self.reader.lock();
        Ok(reader.read()?)
    }

    fn read_temperature(&self, span: &mut RecognitionSpan) -> Result<i64, RecognitionError> {
        let frame = self.capture()?;
        span.record_stage(Stage::Capture.as_str());

        let panel = self.aligner.align(frame)?;
        span.record_stage(Stage::Alignment.as_str());

        let region = self.prepare_temperature(panel)?;
        span.record_stage(Stage::Enhancement.as_str());

        let text = self.recognizer.image_to_text(&region)?;
        span.record_stage(Stage::OcrBackend.as_str());

        parse_temperature(&text)
    }

    fn read_power(&self, span: &mut RecognitionSpan) -> Result<bool, RecognitionError> {
        let frame = self.capture()?;
        span.record_stage(Stage::Capture.as_str());

        let panel = self.aligner.align(frame)?;
        span.record_stage(Stage::Alignment.as_str());

        let (display_mean, panel_mean) = self
            .display_brightness(panel)
            .map_err(RecognitionError::enhancement)?;
        span.record_stage(Stage::Enhancement.as_str());

        let ratio = if panel_mean > f64::EPSILON {
            display_mean / panel_mean
        } else {
            0.0
        };
        tracing::debug!(
            display_mean,
            panel_mean,
            ratio,
            threshold = self.power.brightness_ratio,
            "display brightness measured"
        );
        Ok(ratio >= self.power.brightness_ratio)
    }

    fn prepare_temperature(&self, panel: ColorImage) -> Result<GrayImage, RecognitionError> {
        let region = &self.regions.temperature;
        let enhancement = &self.enhancement;
        let prepared = panel
            .trim(region.top_left(), region.bottom_right())
            .and_then(Image::to_gray)
            .and_then(|gray| gray.denoise(enhancement.denoise_kernel))
            .and_then(|gray| {
                gray.normalize_clahe(enhancement.clahe_clip_limit, enhancement.clahe_grid_size)
            })
            .and_then(|gray| match &enhancement.binarize {
                Some(binarize) => gray.binarize(binarize.block_size, binarize.offset),
                None => Ok(gray),
            })
            .and_then(|gray| match enhancement.close_kernel {
                Some(kernel) => gray.morphology(Morphology::Close, kernel),
                None => Ok(gray),
            })
            .map_err(RecognitionError::enhancement)?;
        Ok(prepared)
    }

    fn display_brightness(&self, panel: ColorImage) -> Result<(f64, f64), crate::error::ImageError> {
        let panel = panel.to_gray()?.denoise(self.enhancement.denoise_kernel)?;
        let panel_mean = panel.mean_intensity()?;

        let display = &self.regions.display;
        let display_mean = panel
            .trim(display.top_left(), display.bottom_right())?
            .mean_intensity()?;
        Ok((display_mean, panel_mean))
    }
}

fn fits(region: &Region, width: i32, height: i32) -> bool {
    !region.is_empty()
        && region.p1[0] >= 0
        && region.p1[1] >= 0
        && region.p2[0] <= width
        && region.p2[1] <= height
}

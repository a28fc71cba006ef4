//! Overlays time-coded object-detection boxes onto a video.
//!
//! Annotations sampled at one rate are placed on the playback timeline of a
//! video at another rate, then burned into every decoded frame in order.

pub mod annotations;
pub mod capture;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod render;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use annotations::{AnnotationIndex, AnnotationRecord, BoundingBox, RateConversion, RawAnnotation};
pub use capture::{Frame, FrameSource, PixelFormat, VideoInfo};
pub use error::{OverlayError, Result};
pub use output::FrameSink;
pub use pipeline::{CancellationToken, PipelineReport, PipelineState, SyncPipeline};
pub use render::{Color, ColorResolver, FrameRenderer, MalformedBoxPolicy, UnknownCategoryPolicy};

/// System configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub annotations: AnnotationConfig,
    pub input: InputConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Only rows whose `videoName` matches are loaded
    pub video_name: String,
    /// Sampling rate of the label source
    pub source_fps: f64,
    /// Frame rate of the video the labels are mapped onto
    pub target_fps: f64,
    /// Explicit `target / source` multiplier; overrides both rates
    pub rate_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Frame rate assumed for image-sequence directories
    pub sequence_fps: f64,
    /// Rescale decoded frames to the output resolution
    pub scale_to_output: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub stroke_width: u32,
    pub unknown_category: UnknownCategoryPolicy,
    pub malformed_box: MalformedBoxPolicy,
    /// Category to B,G,R; replaces the whole default table when set
    pub colors: HashMap<String, Color>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Four-character codec id, e.g. `mp4v` or `avc1`
    pub codec: String,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames decoded ahead on a separate thread; 0 keeps decoding inline
    pub prefetch_depth: usize,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            video_name: "026c7465-309f6d33".to_string(),
            source_fps: 5.0,
            target_fps: 59.5, // 11.9 playback frames per label frame
            rate_ratio: None,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sequence_fps: 59.94,
            scale_to_output: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            stroke_width: render::DEFAULT_STROKE_WIDTH,
            unknown_category: UnknownCategoryPolicy::Skip,
            malformed_box: MalformedBoxPolicy::Normalize,
            colors: render::default_palette(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            codec: "mp4v".to_string(),
            fps: 59.94,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { prefetch_depth: 8 }
    }
}

impl AnnotationConfig {
    pub fn rate_conversion(&self) -> Result<RateConversion> {
        match self.rate_ratio {
            Some(ratio) => RateConversion::from_ratio(ratio),
            None => RateConversion::new(self.source_fps, self.target_fps),
        }
    }
}

impl Config {
    /// Layer an optional TOML file and `VIDMARK_*` environment variables
    /// over the defaults.
    ///
    /// Without an explicit path, `vidmark.toml` in the working directory is
    /// used if present. Nested keys use `__`, e.g. `VIDMARK_OUTPUT__FPS=30`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("vidmark").required(false),
        };

        let config: Config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("VIDMARK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.annotations.rate_conversion()?;

        let invalid = |msg: &str| Err(OverlayError::InvalidConfig(msg.to_string()));
        if !(self.output.fps.is_finite() && self.output.fps > 0.0) {
            return invalid("output.fps must be positive");
        }
        if !(self.input.sequence_fps.is_finite() && self.input.sequence_fps > 0.0) {
            return invalid("input.sequence_fps must be positive");
        }
        if self.output.width == 0 || self.output.height == 0 {
            return invalid("output.width and output.height must be non-zero");
        }
        if self.render.stroke_width == 0 {
            return invalid("render.stroke_width must be at least 1");
        }
        if self.output.codec.is_empty() {
            return invalid("output.codec must be set");
        }
        Ok(())
    }
}

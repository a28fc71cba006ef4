//! Error types shared by the overlay engine and its media collaborators.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OverlayError>;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// A source or target frame rate was zero, negative or not finite.
    #[error("invalid frame rate: source {source_fps}, target {target_fps}")]
    InvalidRate { source_fps: f64, target_fps: f64 },

    #[error("no color configured for category {0:?}")]
    UnknownCategory(String),

    #[error("malformed box for {category:?}: ({x1}, {y1}) -> ({x2}, {y2})")]
    MalformedBox {
        category: String,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },

    #[error("frame is {actual_width}x{actual_height}, sink expects {expected_width}x{expected_height}")]
    FrameSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("run cancelled after {frames_written} frames")]
    Cancelled { frames_written: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("media backend: {0}")]
    Media(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl OverlayError {
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }
}

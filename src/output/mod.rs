pub mod codec;
pub mod image_seq;
pub mod sink;

#[cfg(feature = "gstreamer-pipeline")]
pub mod gst_encoder;

pub use image_seq::{save_png, ImageSequenceSink};
pub use sink::{check_frame_size, FrameSink, MemorySink};

#[cfg(feature = "gstreamer-pipeline")]
pub use gst_encoder::GstEncoderSink;

use std::path::Path;

use crate::error::Result;
use crate::OutputConfig;

/// Open `path` as a frame sink: a path without an extension becomes an
/// image-sequence directory, anything else an encoded video file.
pub fn open_sink(path: &Path, config: &OutputConfig) -> Result<Box<dyn FrameSink + Send>> {
    if path.extension().is_none() || path.is_dir() {
        return Ok(Box::new(ImageSequenceSink::create(path, config.width, config.height)?));
    }
    open_encoder(path, config)
}

#[cfg(feature = "gstreamer-pipeline")]
fn open_encoder(path: &Path, config: &OutputConfig) -> Result<Box<dyn FrameSink + Send>> {
    Ok(Box::new(GstEncoderSink::create(path, config)?))
}

#[cfg(not(feature = "gstreamer-pipeline"))]
fn open_encoder(path: &Path, config: &OutputConfig) -> Result<Box<dyn FrameSink + Send>> {
    // Validate the request so a bad codec id is reported before the feature hint
    codec::encoder_element(&config.codec)?;
    codec::muxer_element(path)?;
    Err(crate::error::OverlayError::media(format!(
        "encoding {} needs the gstreamer-pipeline feature",
        path.display()
    )))
}

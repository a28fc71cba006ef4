pub mod frame;
pub mod image_seq;
pub mod source;

#[cfg(feature = "gstreamer-pipeline")]
pub mod gst_capture;

pub use frame::{Frame, FrameMetadata, PixelFormat, VideoInfo};
pub use image_seq::ImageSequenceSource;
pub use source::{FrameSource, MemorySource};

#[cfg(feature = "gstreamer-pipeline")]
pub use gst_capture::GstFileSource;

use std::path::Path;

use crate::error::Result;

/// Open `path` as a frame source: a directory is read as an image
/// sequence at `sequence_fps`, anything else is decoded as a video
/// container. Frames are rescaled when `scale_to` is given.
pub fn open_source(
    path: &Path,
    sequence_fps: f64,
    scale_to: Option<(u32, u32)>,
) -> Result<Box<dyn FrameSource + Send>> {
    if path.is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(path, sequence_fps, scale_to)?));
    }
    open_video(path, scale_to)
}

#[cfg(feature = "gstreamer-pipeline")]
fn open_video(path: &Path, scale_to: Option<(u32, u32)>) -> Result<Box<dyn FrameSource + Send>> {
    Ok(Box::new(GstFileSource::open(path, scale_to)?))
}

#[cfg(not(feature = "gstreamer-pipeline"))]
fn open_video(path: &Path, _scale_to: Option<(u32, u32)>) -> Result<Box<dyn FrameSource + Send>> {
    Err(crate::error::OverlayError::media(format!(
        "{} is not a frame directory and video decoding needs the gstreamer-pipeline feature",
        path.display()
    )))
}

//! Directory-of-stills frame source

use std::path::{Path, PathBuf};

use bytes::BytesMut;
use image::imageops::FilterType;
use tracing::{debug, info};

use super::frame::{Frame, PixelFormat, VideoInfo};
use super::source::FrameSource;
use crate::error::{OverlayError, Result};

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Reads `*.png` / `*.jpg` files from a directory in file-name order.
///
/// Stills carry no timing, so the frame rate comes from configuration.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    info: VideoInfo,
    resize_to: Option<(u32, u32)>,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, frame_rate: f64, resize_to: Option<(u32, u32)>) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();

        let (width, height) = match (resize_to, paths.first()) {
            (Some(dims), _) => dims,
            (None, Some(first)) => image::image_dimensions(first)?,
            (None, None) => (0, 0),
        };

        info!(
            "Image sequence {}: {} frames, {}x{}",
            dir.display(),
            paths.len(),
            width,
            height
        );

        Ok(Self {
            info: VideoInfo {
                frame_rate,
                frame_count: Some(paths.len() as u64),
                width,
                height,
            },
            paths,
            cursor: 0,
            resize_to,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        debug!("Decoding {}", path.display());

        let mut rgb = image::open(path)?.to_rgb8();
        if let Some((w, h)) = self.resize_to {
            if rgb.dimensions() != (w, h) {
                rgb = image::imageops::resize(&rgb, w, h, FilterType::Triangle);
            }
        }

        let (width, height) = rgb.dimensions();
        let sequence = self.cursor as u64;
        self.cursor += 1;

        Frame::new(
            sequence,
            width,
            height,
            PixelFormat::Rgb24,
            BytesMut::from(rgb.as_raw().as_slice()),
        )
        .map(Some)
        .ok_or_else(|| OverlayError::media(format!("short pixel buffer in {}", path.display())))
    }
}

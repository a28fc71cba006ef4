//! Directory-of-stills frame sink

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, info};

use super::sink::{check_frame_size, FrameSink};
use crate::capture::Frame;
use crate::error::{OverlayError, Result};

/// Writes `frame_000000.png`, `frame_000001.png`, ... in arrival order
pub struct ImageSequenceSink {
    dir: PathBuf,
    width: u32,
    height: u32,
    written: u64,
}

impl ImageSequenceSink {
    pub fn create(dir: &Path, width: u32, height: u32) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        info!("Writing frames to {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            width,
            height,
            written: 0,
        })
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for ImageSequenceSink {
    fn write(&mut self, frame: Frame) -> Result<()> {
        check_frame_size(&frame, self.width, self.height)?;
        let path = self.frame_path(self.written);
        save_png(&frame, &path)?;
        debug!("Wrote {}", path.display());
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        info!("Image sequence closed after {} frames", self.written);
        Ok(())
    }
}

/// Save one frame as an RGB PNG
pub fn save_png(frame: &Frame, path: &Path) -> Result<()> {
    let img = RgbImage::from_raw(frame.width(), frame.height(), frame.to_rgb_bytes())
        .ok_or_else(|| OverlayError::media("frame buffer does not match its dimensions"))?;
    img.save(path)?;
    Ok(())
}

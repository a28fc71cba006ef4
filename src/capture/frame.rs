use bytes::BytesMut;
use serde::{Deserialize, Serialize};

/// One decoded frame, exclusively owned by whoever holds it.
///
/// The pipeline mutates `data` in place while drawing and then moves the
/// frame into the sink, so no frame outlives one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packed pixel rows, `height * width * format.bytes_per_pixel()` bytes
    pub data: BytesMut,

    /// Frame metadata
    pub meta: FrameMetadata,
}

/// Frame metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    /// Zero-based decode order
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
        }
    }
}

impl Frame {
    /// Wrap packed pixel data. Returns `None` if the buffer length does not
    /// match the dimensions.
    pub fn new(sequence: u64, width: u32, height: u32, format: PixelFormat, data: BytesMut) -> Option<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return None;
        }
        Some(Self {
            data,
            meta: FrameMetadata {
                sequence,
                width,
                height,
                format,
            },
        })
    }

    /// A frame filled with a single BGR value
    pub fn solid(sequence: u64, width: u32, height: u32, format: PixelFormat, bgr: [u8; 3]) -> Self {
        let px = match format {
            PixelFormat::Bgr24 => bgr,
            PixelFormat::Rgb24 => [bgr[2], bgr[1], bgr[0]],
        };
        let count = width as usize * height as usize;
        let mut data = BytesMut::with_capacity(count * 3);
        for _ in 0..count {
            data.extend_from_slice(&px);
        }
        Self {
            data,
            meta: FrameMetadata {
                sequence,
                width,
                height,
                format,
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    pub fn sequence(&self) -> u64 {
        self.meta.sequence
    }

    /// Pixel at `(x, y)` in B,G,R order regardless of storage layout
    pub fn pixel_bgr(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.meta.width || y >= self.meta.height {
            return None;
        }
        let bpp = self.meta.format.bytes_per_pixel();
        let idx = (y as usize * self.meta.width as usize + x as usize) * bpp;
        let px = &self.data[idx..idx + 3];
        Some(match self.meta.format {
            PixelFormat::Bgr24 => [px[0], px[1], px[2]],
            PixelFormat::Rgb24 => [px[2], px[1], px[0]],
        })
    }

    /// Repack the pixels as RGB24, e.g. for the `image` crate
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        match self.meta.format {
            PixelFormat::Rgb24 => self.data.to_vec(),
            PixelFormat::Bgr24 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
        }
    }

    /// Repack the pixels as BGR24, the layout the video encoder expects
    pub fn into_bgr(self) -> Self {
        match self.meta.format {
            PixelFormat::Bgr24 => self,
            PixelFormat::Rgb24 => {
                let mut data = self.data;
                for px in data.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
                Self {
                    data,
                    meta: FrameMetadata {
                        format: PixelFormat::Bgr24,
                        ..self.meta
                    },
                }
            }
        }
    }
}

/// Stream-level properties of a frame source
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoInfo {
    pub frame_rate: f64,
    /// Container-reported count; informational only, playback is driven by
    /// decoder exhaustion.
    pub frame_count: Option<u64>,
    pub width: u32,
    pub height: u32,
}

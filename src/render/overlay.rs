//! Burns annotation boxes into frame buffers

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::color::{Color, ColorResolver};
use crate::annotations::{AnnotationRecord, BoundingBox};
use crate::capture::{Frame, PixelFormat};
use crate::error::{OverlayError, Result};
use crate::RenderConfig;

pub const DEFAULT_STROKE_WIDTH: u32 = 3;

/// What to do with a record whose category has no color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Leave the box out and keep going
    #[default]
    Skip,
    /// Fail the frame, which aborts the run
    Abort,
}

/// What to do with a box whose corners are not strictly ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedBoxPolicy {
    /// Swap inverted corners; zero-area boxes draw as lines
    #[default]
    Normalize,
    Skip,
    /// Fail with [`OverlayError::MalformedBox`]
    Reject,
}

/// Per-frame drawing tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    pub skipped_unknown: usize,
    pub skipped_malformed: usize,
}

impl RenderStats {
    pub fn merge(&mut self, other: RenderStats) {
        self.drawn += other.drawn;
        self.skipped_unknown += other.skipped_unknown;
        self.skipped_malformed += other.skipped_malformed;
    }
}

/// Draws unfilled rectangles in iteration order; later boxes win where
/// strokes overlap. No text is drawn.
pub struct FrameRenderer {
    colors: ColorResolver,
    stroke_width: u32,
    unknown_category: UnknownCategoryPolicy,
    malformed_box: MalformedBoxPolicy,
    warned: HashSet<String>,
}

impl FrameRenderer {
    pub fn new(colors: ColorResolver) -> Self {
        Self {
            colors,
            stroke_width: DEFAULT_STROKE_WIDTH,
            unknown_category: UnknownCategoryPolicy::default(),
            malformed_box: MalformedBoxPolicy::default(),
            warned: HashSet::new(),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(ColorResolver::new(config.colors.clone()))
            .with_stroke_width(config.stroke_width)
            .with_unknown_category(config.unknown_category)
            .with_malformed_box(config.malformed_box)
    }

    /// Stroke width in pixels, clamped to at least 1
    pub fn with_stroke_width(mut self, width: u32) -> Self {
        self.stroke_width = width.max(1);
        self
    }

    pub fn with_unknown_category(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_category = policy;
        self
    }

    pub fn with_malformed_box(mut self, policy: MalformedBoxPolicy) -> Self {
        self.malformed_box = policy;
        self
    }

    /// Draw every record onto `frame` and hand the same buffer back
    pub fn render(&mut self, mut frame: Frame, records: &[AnnotationRecord]) -> Result<Frame> {
        self.draw(&mut frame, records)?;
        Ok(frame)
    }

    /// Draw every record onto `frame` in place
    pub fn draw(&mut self, frame: &mut Frame, records: &[AnnotationRecord]) -> Result<RenderStats> {
        let mut stats = RenderStats::default();

        for record in records {
            let color = match self.colors.resolve(&record.category) {
                Ok(color) => color,
                Err(e) => match self.unknown_category {
                    UnknownCategoryPolicy::Abort => return Err(e),
                    UnknownCategoryPolicy::Skip => {
                        if self.warned.insert(record.category.clone()) {
                            warn!("No color for category {:?}; its boxes will be skipped", record.category);
                        }
                        stats.skipped_unknown += 1;
                        continue;
                    }
                },
            };

            let Some(bbox) = self.accept_box(record)? else {
                stats.skipped_malformed += 1;
                continue;
            };

            draw_rectangle(frame, &bbox, color, self.stroke_width);
            stats.drawn += 1;
        }

        metrics::counter!("vidmark_boxes_drawn").increment(stats.drawn as u64);
        metrics::counter!("vidmark_boxes_skipped")
            .increment((stats.skipped_unknown + stats.skipped_malformed) as u64);
        Ok(stats)
    }

    fn accept_box(&self, record: &AnnotationRecord) -> Result<Option<BoundingBox>> {
        let b = record.bbox;
        if b.is_well_formed() {
            return Ok(Some(b));
        }
        match self.malformed_box {
            MalformedBoxPolicy::Reject => Err(OverlayError::MalformedBox {
                category: record.category.clone(),
                x1: b.x1,
                y1: b.y1,
                x2: b.x2,
                y2: b.y2,
            }),
            MalformedBoxPolicy::Normalize if b.is_finite() => Ok(Some(b.normalized())),
            MalformedBoxPolicy::Normalize | MalformedBoxPolicy::Skip => Ok(None),
        }
    }
}

/// Outline `bbox` with a stroke centred on its edges, clipped to the frame
fn draw_rectangle(frame: &mut Frame, bbox: &BoundingBox, color: Color, thickness: u32) {
    let t = thickness as i64;
    let lo = (t - 1) / 2;
    let hi = t - 1 - lo;

    // Anything past a stroke width outside the frame clips the same way
    let (max_x, max_y) = (frame.width() as i64 + t, frame.height() as i64 + t);
    let (x1, y1, x2, y2) = bbox.to_pixels();
    let (x1, x2) = (x1.clamp(-t, max_x), x2.clamp(-t, max_x));
    let (y1, y2) = (y1.clamp(-t, max_y), y2.clamp(-t, max_y));

    fill_rect(frame, x1 - lo, y1 - lo, x2 + hi, y1 + hi, color);
    fill_rect(frame, x1 - lo, y2 - lo, x2 + hi, y2 + hi, color);
    fill_rect(frame, x1 - lo, y1 - lo, x1 + hi, y2 + hi, color);
    fill_rect(frame, x2 - lo, y1 - lo, x2 + hi, y2 + hi, color);
}

/// Fill the inclusive span `[x0, x1] x [y0, y1]`
fn fill_rect(frame: &mut Frame, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
    let width = frame.width() as i64;
    let height = frame.height() as i64;
    let (x0, x1) = (x0.max(0), x1.min(width - 1));
    let (y0, y1) = (y0.max(0), y1.min(height - 1));
    if x0 > x1 || y0 > y1 {
        return;
    }

    let px = match frame.meta.format {
        PixelFormat::Bgr24 => color.to_bgr(),
        PixelFormat::Rgb24 => color.to_rgb(),
    };
    let bpp = frame.meta.format.bytes_per_pixel();
    let row_stride = width as usize * bpp;

    for y in y0..=y1 {
        let start = y as usize * row_stride + x0 as usize * bpp;
        let end = y as usize * row_stride + (x1 as usize + 1) * bpp;
        for dst in frame.data[start..end].chunks_exact_mut(bpp) {
            dst.copy_from_slice(&px);
        }
    }
}

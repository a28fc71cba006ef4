/// Box corners in pixel coordinates of the output video.
///
/// Coordinates are kept as parsed; corner ordering is not guaranteed and is
/// resolved by the renderer's malformed-box policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// Corners are strictly ordered on both axes
    pub fn is_well_formed(&self) -> bool {
        self.is_finite() && self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Swap inverted corners so that `x1 <= x2` and `y1 <= y2`
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    /// Integer pixel corners, truncating toward zero
    pub fn to_pixels(&self) -> (i64, i64, i64, i64) {
        (
            self.x1 as i64,
            self.y1 as i64,
            self.x2 as i64,
            self.y2 as i64,
        )
    }
}

/// One labelled box, already mapped onto the playback timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    /// Frame number in the annotation source's own sampling rate
    pub source_frame_index: u64,
    pub category: String,
    pub bbox: BoundingBox,
    /// `round_ties_even(source_frame_index * ratio)`, fixed at index build time
    pub playback_frame: u64,
}

/// An annotation row before it is placed on the playback timeline
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnotation {
    pub source_frame_index: u64,
    pub category: String,
    pub bbox: BoundingBox,
}

impl RawAnnotation {
    pub fn new(source_frame_index: u64, category: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            source_frame_index,
            category: category.into(),
            bbox,
        }
    }
}

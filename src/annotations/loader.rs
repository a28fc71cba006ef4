//! Tabular annotation loading (BDD-style MOT label exports)

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::record::{BoundingBox, RawAnnotation};
use crate::error::Result;

/// Only the columns the overlay consumes; everything else is ignored
#[derive(Debug, Deserialize)]
struct LabelRow {
    #[serde(rename = "videoName")]
    video_name: String,
    #[serde(rename = "frameIndex")]
    frame_index: u64,
    category: String,
    #[serde(rename = "box2d.x1")]
    x1: Option<f64>,
    #[serde(rename = "box2d.y1")]
    y1: Option<f64>,
    #[serde(rename = "box2d.x2")]
    x2: Option<f64>,
    #[serde(rename = "box2d.y2")]
    y2: Option<f64>,
}

/// Rows kept for the target video plus how many were passed over
#[derive(Debug, Default)]
pub struct LoadedLabels {
    pub records: Vec<RawAnnotation>,
    pub other_videos: usize,
    pub missing_box: usize,
}

#[instrument(skip_all, fields(path = %path.display(), video = video_name))]
pub fn load_labels(path: &Path, video_name: &str) -> Result<LoadedLabels> {
    let file = std::fs::File::open(path)?;
    let loaded = load_labels_from_reader(file, video_name)?;
    info!(
        "Loaded {} records for {} ({} rows for other videos, {} without a box)",
        loaded.records.len(),
        video_name,
        loaded.other_videos,
        loaded.missing_box
    );
    Ok(loaded)
}

pub fn load_labels_from_reader<R: Read>(reader: R, video_name: &str) -> Result<LoadedLabels> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut loaded = LoadedLabels::default();
    for row in csv_reader.deserialize::<LabelRow>() {
        let row = row?;
        if row.video_name != video_name {
            loaded.other_videos += 1;
            continue;
        }
        let (Some(x1), Some(y1), Some(x2), Some(y2)) = (row.x1, row.y1, row.x2, row.y2) else {
            debug!("Skipping {} at frame {}: no box", row.category, row.frame_index);
            loaded.missing_box += 1;
            continue;
        };
        loaded.records.push(RawAnnotation::new(
            row.frame_index,
            row.category,
            BoundingBox::new(x1, y1, x2, y2),
        ));
    }
    Ok(loaded)
}

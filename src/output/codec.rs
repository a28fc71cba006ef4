//! Codec ids, container muxers and frame-rate fractions for the encoder

use std::path::Path;

use crate::error::{OverlayError, Result};

/// GStreamer encoder element for a four-character codec id
pub fn encoder_element(codec: &str) -> Result<&'static str> {
    let element = match codec.to_ascii_lowercase().as_str() {
        "mp4v" | "fmp4" | "xvid" | "divx" => "avenc_mpeg4",
        "avc1" | "h264" | "x264" => "x264enc",
        "hvc1" | "hevc" | "h265" => "x265enc",
        "mjpg" => "jpegenc",
        "vp80" | "vp8" => "vp8enc",
        "vp90" | "vp9" => "vp9enc",
        _ => {
            return Err(OverlayError::InvalidConfig(format!(
                "unsupported codec id {codec:?}"
            )))
        }
    };
    Ok(element)
}

/// GStreamer muxer element for the output file's extension
pub fn muxer_element(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let element = match ext.as_str() {
        "mp4" | "m4v" => "mp4mux",
        "mov" => "qtmux",
        "mkv" => "matroskamux",
        "webm" => "webmmux",
        "avi" => "avimux",
        _ => {
            return Err(OverlayError::InvalidConfig(format!(
                "no muxer for output {}",
                path.display()
            )))
        }
    };
    Ok(element)
}

/// Express `fps` as `numerator / denominator`.
///
/// NTSC-style rates (29.97, 59.94, ...) map to their exact `N*1000/1001`
/// form; anything else is taken to three decimal places.
pub fn frame_rate_fraction(fps: f64) -> Result<(i32, i32)> {
    if !fps.is_finite() || fps <= 0.0 || fps > 1_000_000.0 {
        return Err(OverlayError::InvalidRate {
            source_fps: fps,
            target_fps: fps,
        });
    }

    let ntsc = fps * 1001.0 / 1000.0;
    if (ntsc - ntsc.round()).abs() < 1e-3 && (fps - fps.round()).abs() > 1e-3 {
        return Ok((ntsc.round() as i32 * 1000, 1001));
    }

    let mut num = (fps * 1000.0).round() as i64;
    let mut den = 1000i64;
    let g = gcd(num, den);
    num /= g;
    den /= g;
    Ok((num as i32, den as i32))
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

/// Presentation timestamp of frame `index` in nanoseconds
pub fn frame_pts_ns(index: u64, (num, den): (i32, i32)) -> u64 {
    (index as u128 * 1_000_000_000 * den as u128 / num.max(1) as u128) as u64
}

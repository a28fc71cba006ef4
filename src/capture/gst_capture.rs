//! GStreamer-based video file decoding

use std::path::Path;

use bytes::BytesMut;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use tracing::{debug, info, warn};

use super::frame::{Frame, PixelFormat, VideoInfo};
use super::source::FrameSource;
use crate::error::{OverlayError, Result};

/// Decodes any container GStreamer can demux into BGR frames, optionally
/// scaled to a fixed resolution.
pub struct GstFileSource {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    info: VideoInfo,
    sequence: u64,
}

impl GstFileSource {
    /// Open `path` and preroll far enough to learn the stream properties
    pub fn open(path: &Path, scale_to: Option<(u32, u32)>) -> Result<Self> {
        gst::init().map_err(|e| OverlayError::media(format!("Failed to initialize GStreamer: {e}")))?;

        let pipeline_str = Self::build_pipeline_string(scale_to);
        info!("Decode pipeline: {}", pipeline_str);

        let pipeline = gst::parse::launch(&pipeline_str)
            .map_err(|e| OverlayError::media(format!("Failed to parse pipeline: {e}")))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| OverlayError::media("Failed to create pipeline"))?;

        let filesrc = pipeline
            .by_name("source")
            .ok_or_else(|| OverlayError::media("Failed to find filesrc element"))?;
        filesrc.set_property("location", path.to_string_lossy().to_string());

        let appsink = pipeline
            .by_name("appsink")
            .ok_or_else(|| OverlayError::media("Failed to find appsink element"))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| OverlayError::media("Failed to cast to AppSink"))?;

        // Every decoded frame must reach the overlay, so no dropping and no clock sync
        appsink.set_property("emit-signals", false);
        appsink.set_property("max-buffers", 4u32);
        appsink.set_property("drop", false);
        appsink.set_property("sync", false);

        pipeline
            .set_state(gst::State::Paused)
            .map_err(|e| OverlayError::media(format!("Failed to preroll {}: {e:?}", path.display())))?;
        let (state_change, _, _) = pipeline.state(Some(gst::ClockTime::from_seconds(10)));
        state_change.map_err(|e| OverlayError::media(format!("Preroll failed: {e:?}")))?;

        let preroll = appsink
            .pull_preroll()
            .map_err(|_| OverlayError::media("Failed to pull preroll sample"))?;
        let caps = preroll
            .caps()
            .ok_or_else(|| OverlayError::media("Preroll sample has no caps"))?;
        let video_info = gst_video::VideoInfo::from_caps(caps)
            .map_err(|_| OverlayError::media("Failed to parse video info from caps"))?;

        let fps = video_info.fps();
        let frame_rate = if fps.denom() == 0 {
            0.0
        } else {
            fps.numer() as f64 / fps.denom() as f64
        };
        let frame_count = pipeline
            .query_duration::<gst::ClockTime>()
            .map(|d| (d.nseconds() as f64 * frame_rate / 1e9).round() as u64);

        if frame_count.is_none() {
            warn!("Container did not report a duration for {}", path.display());
        }

        let info = VideoInfo {
            frame_rate,
            frame_count,
            width: video_info.width(),
            height: video_info.height(),
        };
        info!("Opened {}: {:?}", path.display(), info);

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| OverlayError::media(format!("Failed to start pipeline: {e:?}")))?;

        Ok(Self {
            pipeline,
            appsink,
            info,
            sequence: 0,
        })
    }

    fn build_pipeline_string(scale_to: Option<(u32, u32)>) -> String {
        let caps = match scale_to {
            Some((width, height)) => format!("video/x-raw,format=BGR,width={},height={}", width, height),
            None => "video/x-raw,format=BGR".to_string(),
        };
        format!(
            "filesrc name=source ! \
             decodebin ! \
             videoconvert ! \
             videoscale ! \
             {} ! \
             appsink name=appsink",
            caps
        )
    }

    /// Surface an asynchronous pipeline error, if one was posted
    fn check_bus(&self) -> Result<()> {
        let Some(bus) = self.pipeline.bus() else {
            return Ok(());
        };
        if let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error]) {
            if let gst::MessageView::Error(err) = msg.view() {
                return Err(OverlayError::media(format!(
                    "Decoder error: {} ({:?})",
                    err.error(),
                    err.debug()
                )));
            }
        }
        Ok(())
    }

    pub fn stop_stream(&mut self) -> Result<()> {
        debug!("Stopping decode pipeline");
        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| OverlayError::media(format!("Failed to stop pipeline: {e:?}")))?;
        Ok(())
    }
}

impl FrameSource for GstFileSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.appsink.is_eos() {
            return Ok(None);
        }

        let sample = match self.appsink.pull_sample() {
            Ok(sample) => sample,
            Err(_) if self.appsink.is_eos() => return Ok(None),
            Err(_) => {
                self.check_bus()?;
                return Err(OverlayError::media("Failed to pull sample from pipeline"));
            }
        };

        let buffer = sample
            .buffer()
            .ok_or_else(|| OverlayError::media("Sample contains no buffer"))?;
        let caps = sample
            .caps()
            .ok_or_else(|| OverlayError::media("Sample has no caps"))?;
        let video_info = gst_video::VideoInfo::from_caps(caps)
            .map_err(|_| OverlayError::media("Failed to parse video info from caps"))?;
        let map = buffer
            .map_readable()
            .map_err(|_| OverlayError::media("Failed to map buffer"))?;

        // Rows may be padded to the plane stride; repack them tightly
        let width = video_info.width();
        let height = video_info.height();
        let row_bytes = width as usize * PixelFormat::Bgr24.bytes_per_pixel();
        let stride = video_info.stride()[0] as usize;
        let offset = video_info.offset()[0];
        let src = map.as_slice();
        let mut data = BytesMut::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = offset + row * stride;
            let line = src
                .get(start..start + row_bytes)
                .ok_or_else(|| OverlayError::media("Decoded buffer shorter than its caps"))?;
            data.extend_from_slice(line);
        }

        let sequence = self.sequence;
        self.sequence += 1;

        Frame::new(sequence, width, height, PixelFormat::Bgr24, data)
            .map(Some)
            .ok_or_else(|| OverlayError::media("Decoded frame has inconsistent size"))
    }
}

impl Drop for GstFileSource {
    fn drop(&mut self) {
        let _ = self.stop_stream();
    }
}

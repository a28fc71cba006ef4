//! GStreamer-based video file encoding

use std::path::Path;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use tracing::{info, warn};

use super::codec::{encoder_element, frame_pts_ns, frame_rate_fraction, muxer_element};
use super::sink::{check_frame_size, FrameSink};
use crate::capture::Frame;
use crate::error::{OverlayError, Result};
use crate::OutputConfig;

/// Encodes BGR frames pushed from Rust into a container file.
///
/// Frames are timestamped by arrival order at the configured rate, so
/// the output timeline is exactly the write order.
pub struct GstEncoderSink {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    width: u32,
    height: u32,
    rate: (i32, i32),
    written: u64,
    finished: bool,
}

impl GstEncoderSink {
    pub fn create(path: &Path, config: &OutputConfig) -> Result<Self> {
        gst::init().map_err(|e| OverlayError::media(format!("Failed to initialize GStreamer: {e}")))?;

        let rate = frame_rate_fraction(config.fps)?;
        let pipeline_str = Self::build_pipeline_string(path, config, rate)?;
        info!("Encode pipeline: {}", pipeline_str);

        let pipeline = gst::parse::launch(&pipeline_str)
            .map_err(|e| OverlayError::media(format!("Failed to parse pipeline: {e}")))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| OverlayError::media("Failed to create pipeline"))?;

        let filesink = pipeline
            .by_name("filesink")
            .ok_or_else(|| OverlayError::media("Failed to find filesink"))?;
        filesink.set_property("location", path.to_string_lossy().to_string());

        let appsrc = pipeline
            .by_name("appsrc")
            .ok_or_else(|| OverlayError::media("Failed to find appsrc"))?
            .downcast::<gst_app::AppSrc>()
            .map_err(|_| OverlayError::media("Failed to cast to AppSrc"))?;

        // Block on a full queue instead of dropping: every frame must land
        appsrc.set_property("is-live", false);
        appsrc.set_property("block", true);
        appsrc.set_property("format", gst::Format::Time);

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| OverlayError::media(format!("Failed to start pipeline: {e:?}")))?;

        Ok(Self {
            pipeline,
            appsrc,
            width: config.width,
            height: config.height,
            rate,
            written: 0,
            finished: false,
        })
    }

    fn build_pipeline_string(path: &Path, config: &OutputConfig, (num, den): (i32, i32)) -> Result<String> {
        let encoder = encoder_element(&config.codec)?;
        let muxer = muxer_element(path)?;

        if gst::ElementFactory::find(encoder).is_none() {
            warn!("Encoder element {} is not installed", encoder);
        }

        Ok(format!(
            "appsrc name=appsrc caps=video/x-raw,format=BGR,width={},height={},framerate={}/{} ! \
             queue ! \
             videoconvert ! \
             {} ! \
             {} ! \
             filesink name=filesink",
            config.width, config.height, num, den, encoder, muxer
        ))
    }

    fn pipeline_error(&self) -> Option<OverlayError> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => Some(OverlayError::media(format!(
                "Encoder error from {:?}: {} ({:?})",
                err.src().map(|s| s.path_string()),
                err.error(),
                err.debug()
            ))),
            _ => None,
        }
    }

    /// Wait for the muxer to finalise the file
    fn drain(&mut self) -> Result<()> {
        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| OverlayError::media("Pipeline has no bus"))?;

        for msg in bus.iter_timed(gst::ClockTime::NONE) {
            use gst::MessageView;

            match msg.view() {
                MessageView::Eos(..) => {
                    info!("Encoder reached end of stream");
                    break;
                }
                MessageView::Error(err) => {
                    return Err(OverlayError::media(format!(
                        "Error from {:?}: {} ({:?})",
                        err.src().map(|s| s.path_string()),
                        err.error(),
                        err.debug()
                    )));
                }
                MessageView::Warning(warning) => {
                    warn!(
                        "Warning from {:?}: {} ({:?})",
                        warning.src().map(|s| s.path_string()),
                        warning.error(),
                        warning.debug()
                    );
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| OverlayError::media(format!("Failed to stop pipeline: {e:?}")))?;
        Ok(())
    }
}

impl FrameSink for GstEncoderSink {
    fn write(&mut self, frame: Frame) -> Result<()> {
        if self.finished {
            return Err(OverlayError::media("write after finish"));
        }
        check_frame_size(&frame, self.width, self.height)?;

        let frame = frame.into_bgr();
        let pts = frame_pts_ns(self.written, self.rate);
        let next = frame_pts_ns(self.written + 1, self.rate);

        let mut buffer = gst::Buffer::from_mut_slice(frame.data);
        {
            let buffer_ref = buffer
                .get_mut()
                .ok_or_else(|| OverlayError::media("Frame buffer is shared"))?;
            buffer_ref.set_pts(gst::ClockTime::from_nseconds(pts));
            buffer_ref.set_duration(gst::ClockTime::from_nseconds(next - pts));
        }

        if self.appsrc.push_buffer(buffer).is_err() {
            return Err(self
                .pipeline_error()
                .unwrap_or_else(|| OverlayError::media("Failed to push buffer")));
        }
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        self.appsrc
            .end_of_stream()
            .map_err(|e| OverlayError::media(format!("Failed to signal end of stream: {e:?}")))?;
        let drained = self.drain();
        self.stop()?;
        drained?;

        info!("Encoded {} frames", self.written);
        Ok(())
    }
}

impl Drop for GstEncoderSink {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

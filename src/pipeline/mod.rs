//! Synchronized playback: decode, look up, draw, encode, one frame at a time

pub mod cancel;
pub mod prefetch;
pub mod snapshot;

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::annotations::AnnotationIndex;
use crate::capture::FrameSource;
use crate::error::{OverlayError, Result};
use crate::output::FrameSink;
use crate::render::{FrameRenderer, RenderStats};

pub use cancel::CancellationToken;
pub use prefetch::PrefetchSource;
pub use snapshot::render_snapshot;

const PROGRESS_EVERY: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Streaming,
    Done,
}

/// Totals for one completed run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub frames_written: u64,
    /// Frames that had a non-empty active group
    pub annotated_frames: u64,
    pub boxes: RenderStats,
    pub elapsed: Duration,
}

/// Drives one source through the renderer into one sink.
///
/// Playback frame `F` is the zero-based count of frames pulled so far; the
/// run ends only when the source is exhausted, is cancelled, or fails.
pub struct SyncPipeline<'a> {
    index: &'a AnnotationIndex,
    renderer: FrameRenderer,
    cancel: CancellationToken,
    state: PipelineState,
}

impl<'a> SyncPipeline<'a> {
    pub fn new(index: &'a AnnotationIndex, renderer: FrameRenderer) -> Self {
        Self {
            index,
            renderer,
            cancel: CancellationToken::new(),
            state: PipelineState::Done,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Stream every frame of `source` into `sink`.
    ///
    /// Both handles are owned for the duration of the call and dropped on
    /// return, whether the run completed, was cancelled or failed. The sink
    /// is only finished after a complete run.
    #[instrument(skip_all)]
    pub fn run<S, K>(&mut self, mut source: S, mut sink: K) -> Result<PipelineReport>
    where
        S: FrameSource,
        K: FrameSink,
    {
        let info = source.info();
        info!(
            "Streaming {}x{} @ {:.2} fps ({} frames reported, {} annotation groups)",
            info.width,
            info.height,
            info.frame_rate,
            info.frame_count.map_or_else(|| "?".to_string(), |n| n.to_string()),
            self.index.group_count()
        );

        self.state = PipelineState::Streaming;
        let result = self.stream(&mut source, &mut sink);
        self.state = PipelineState::Done;

        match &result {
            Ok(report) => info!(
                "Wrote {} frames ({} annotated, {} boxes) in {:.2?}",
                report.frames_written, report.annotated_frames, report.boxes.drawn, report.elapsed
            ),
            Err(e) => warn!("Run aborted: {}", e),
        }
        result
    }

    fn stream<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<PipelineReport>
    where
        S: FrameSource,
        K: FrameSink,
    {
        let started = Instant::now();
        let mut report = PipelineReport::default();

        loop {
            if self.cancel.is_cancelled() {
                return Err(OverlayError::Cancelled {
                    frames_written: report.frames_written,
                });
            }

            let Some(mut frame) = source.next_frame()? else {
                break;
            };

            let playback_frame = report.frames_written;
            let active = self.index.active_group(playback_frame);

            let render_start = Instant::now();
            let stats = self.renderer.draw(&mut frame, active)?;
            metrics::histogram!("vidmark_render_time_us")
                .record(render_start.elapsed().as_micros() as f64);

            sink.write(frame)?;
            metrics::counter!("vidmark_frames_written").increment(1);

            if !active.is_empty() {
                report.annotated_frames += 1;
            }
            report.boxes.merge(stats);
            report.frames_written += 1;

            if report.frames_written % PROGRESS_EVERY == 0 {
                debug!("{} frames written", report.frames_written);
            }
        }

        sink.finish()?;
        report.elapsed = started.elapsed();
        Ok(report)
    }
}

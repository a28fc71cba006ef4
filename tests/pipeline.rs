//! End-to-end runs of the synchronized overlay pipeline over in-memory
//! sources and sinks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use vidmark::capture::{Frame, FrameSource, MemorySource, PixelFormat, VideoInfo};
use vidmark::output::{FrameSink, MemorySink};
use vidmark::pipeline::{CancellationToken, PipelineState, PrefetchSource, SyncPipeline};
use vidmark::render::{ColorResolver, FrameRenderer, UnknownCategoryPolicy};
use vidmark::{AnnotationIndex, BoundingBox, OverlayError, RawAnnotation};

const W: u32 = 64;
const H: u32 = 48;
const RED: [u8; 3] = [0, 0, 255];
const GREEN: [u8; 3] = [0, 255, 0];
const BLACK: [u8; 3] = [0, 0, 0];

fn blank_frames(n: u64) -> Vec<Frame> {
    (0..n)
        .map(|i| Frame::solid(i, W, H, PixelFormat::Bgr24, BLACK))
        .collect()
}

fn source(n: u64) -> MemorySource {
    MemorySource::new(59.94, W, H, blank_frames(n))
}

fn renderer() -> FrameRenderer {
    FrameRenderer::new(ColorResolver::default())
}

/// car at label frame 0, bicycle at label frame 1; ratio 11.9 puts them
/// on playback frames 0 and 12
fn two_batch_index() -> AnnotationIndex {
    AnnotationIndex::build(
        vec![
            RawAnnotation::new(0, "car", BoundingBox::new(10.0, 10.0, 30.0, 30.0)),
            RawAnnotation::new(1, "bicycle", BoundingBox::new(10.0, 10.0, 30.0, 30.0)),
        ],
        1.0,
        11.9,
    )
    .unwrap()
}

#[test]
fn frames_reach_the_sink_in_decode_order() {
    let index = two_batch_index();
    let mut sink = MemorySink::with_size(W, H);
    let mut pipeline = SyncPipeline::new(&index, renderer());

    let report = pipeline.run(source(40), &mut sink).unwrap();

    assert_eq!(report.frames_written, 40);
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert!(sink.is_finished());
    let seqs: Vec<_> = sink.frames().iter().map(Frame::sequence).collect();
    assert_eq!(seqs, (0..40).collect::<Vec<_>>());
}

#[test]
fn annotations_are_held_until_superseded() {
    let index = two_batch_index();
    let mut sink = MemorySink::new();
    SyncPipeline::new(&index, renderer())
        .run(source(30), &mut sink)
        .unwrap();

    for (i, frame) in sink.frames().iter().enumerate() {
        let expected = if i < 12 { RED } else { GREEN };
        assert_eq!(frame.pixel_bgr(10, 10), Some(expected), "frame {i}");
        assert_eq!(frame.pixel_bgr(20, 20), Some(BLACK), "frame {i}");
    }
}

#[test]
fn frames_before_first_batch_are_untouched() {
    let index = AnnotationIndex::build(
        vec![RawAnnotation::new(2, "car", BoundingBox::new(5.0, 5.0, 15.0, 15.0))],
        1.0,
        11.9,
    )
    .unwrap();
    let mut sink = MemorySink::new();
    let report = SyncPipeline::new(&index, renderer())
        .run(source(30), &mut sink)
        .unwrap();

    // 2 * 11.9 = 23.8 -> 24
    assert_eq!(report.annotated_frames, 6);
    assert_eq!(sink.frames()[23], Frame::solid(23, W, H, PixelFormat::Bgr24, BLACK));
    assert_eq!(sink.frames()[24].pixel_bgr(5, 5), Some(RED));
}

#[test]
fn empty_video_produces_empty_output() {
    let index = two_batch_index();
    let mut sink = MemorySink::new();
    let report = SyncPipeline::new(&index, renderer())
        .run(source(0), &mut sink)
        .unwrap();
    assert_eq!(report.frames_written, 0);
    assert!(sink.frames().is_empty());
    assert!(sink.is_finished());
}

#[test]
fn unknown_category_is_skipped_by_default() {
    let index = AnnotationIndex::build(
        vec![RawAnnotation::new(0, "spaceship", BoundingBox::new(1.0, 1.0, 20.0, 20.0))],
        1.0,
        11.9,
    )
    .unwrap();
    let mut sink = MemorySink::new();
    let report = SyncPipeline::new(&index, renderer())
        .run(source(5), &mut sink)
        .unwrap();

    assert_eq!(report.frames_written, 5);
    assert_eq!(report.boxes.drawn, 0);
    assert_eq!(report.boxes.skipped_unknown, 5);
    assert_eq!(sink.into_frames(), blank_frames(5));
}

#[test]
fn unknown_category_abort_stops_the_run() {
    let index = AnnotationIndex::build(
        vec![RawAnnotation::new(1, "spaceship", BoundingBox::new(1.0, 1.0, 20.0, 20.0))],
        1.0,
        2.0,
    )
    .unwrap();
    let mut sink = MemorySink::new();
    let err = SyncPipeline::new(
        &index,
        renderer().with_unknown_category(UnknownCategoryPolicy::Abort),
    )
    .run(source(10), &mut sink)
    .unwrap_err();

    assert!(matches!(err, OverlayError::UnknownCategory(_)));
    assert_eq!(sink.frames().len(), 2);
    assert!(!sink.is_finished());
}

#[test]
fn repeated_runs_place_boxes_identically() {
    let index = two_batch_index();
    let mut first = MemorySink::new();
    let mut second = MemorySink::new();
    SyncPipeline::new(&index, renderer()).run(source(25), &mut first).unwrap();
    SyncPipeline::new(&index, renderer()).run(source(25), &mut second).unwrap();
    assert_eq!(first.into_frames(), second.into_frames());
}

#[test]
fn decode_ahead_matches_inline_decoding() {
    let index = two_batch_index();
    let mut inline = MemorySink::new();
    let mut prefetched = MemorySink::new();

    SyncPipeline::new(&index, renderer()).run(source(50), &mut inline).unwrap();
    let ahead = PrefetchSource::spawn(source(50), 4).unwrap();
    SyncPipeline::new(&index, renderer()).run(ahead, &mut prefetched).unwrap();

    assert_eq!(inline.into_frames(), prefetched.into_frames());
}

/// Cancels the shared token once `trip_after` frames have been handed out
struct TrippingSource {
    inner: MemorySource,
    token: CancellationToken,
    trip_after: u64,
    served: u64,
    dropped: Arc<AtomicBool>,
}

impl FrameSource for TrippingSource {
    fn info(&self) -> VideoInfo {
        self.inner.info()
    }

    fn next_frame(&mut self) -> vidmark::Result<Option<Frame>> {
        if self.served == self.trip_after {
            self.token.cancel();
        }
        self.served += 1;
        self.inner.next_frame()
    }
}

impl Drop for TrippingSource {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

/// Records whether it was finished and dropped
struct TrackingSink {
    written: u64,
    finished: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

impl FrameSink for TrackingSink {
    fn write(&mut self, _frame: Frame) -> vidmark::Result<()> {
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> vidmark::Result<()> {
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for TrackingSink {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[test]
fn cancellation_aborts_and_releases_both_handles() {
    let index = two_batch_index();
    let token = CancellationToken::new();
    let source_dropped = Arc::new(AtomicBool::new(false));
    let sink_dropped = Arc::new(AtomicBool::new(false));
    let sink_finished = Arc::new(AtomicBool::new(false));

    let source = TrippingSource {
        inner: source(100),
        token: token.clone(),
        trip_after: 10,
        served: 0,
        dropped: source_dropped.clone(),
    };
    let sink = TrackingSink {
        written: 0,
        finished: sink_finished.clone(),
        dropped: sink_dropped.clone(),
    };

    let mut pipeline = SyncPipeline::new(&index, renderer()).with_cancellation(token);
    let err = pipeline.run(source, sink).unwrap_err();

    // The tripping pull still delivers its frame; the check happens next iteration
    assert!(matches!(err, OverlayError::Cancelled { frames_written: 11 }));
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert!(source_dropped.load(Ordering::SeqCst));
    assert!(sink_dropped.load(Ordering::SeqCst));
    assert!(!sink_finished.load(Ordering::SeqCst));
}

struct FailingSource {
    remaining: u64,
}

impl FrameSource for FailingSource {
    fn info(&self) -> VideoInfo {
        VideoInfo {
            frame_rate: 30.0,
            frame_count: None,
            width: W,
            height: H,
        }
    }

    fn next_frame(&mut self) -> vidmark::Result<Option<Frame>> {
        if self.remaining == 0 {
            return Err(OverlayError::media("corrupt packet"));
        }
        self.remaining -= 1;
        Ok(Some(Frame::solid(0, W, H, PixelFormat::Bgr24, BLACK)))
    }
}

#[test]
fn decoder_errors_propagate_unchanged() {
    let index = two_batch_index();
    let mut sink = MemorySink::new();
    let err = SyncPipeline::new(&index, renderer())
        .run(FailingSource { remaining: 3 }, &mut sink)
        .unwrap_err();
    assert!(matches!(err, OverlayError::Media(ref m) if m == "corrupt packet"));
    assert_eq!(sink.frames().len(), 3);
}

#[test]
fn decoder_errors_cross_the_prefetch_thread() {
    let index = two_batch_index();
    let mut sink = MemorySink::new();
    let source = PrefetchSource::spawn(FailingSource { remaining: 2 }, 2).unwrap();
    let err = SyncPipeline::new(&index, renderer())
        .run(source, &mut sink)
        .unwrap_err();
    assert!(matches!(err, OverlayError::Media(_)));
    assert_eq!(sink.frames().len(), 2);
}

#[test]
fn sink_resolution_mismatch_is_fatal() {
    let index = two_batch_index();
    let mut sink = MemorySink::with_size(1280, 720);
    let err = SyncPipeline::new(&index, renderer())
        .run(source(3), &mut sink)
        .unwrap_err();
    assert!(matches!(err, OverlayError::FrameSizeMismatch { .. }));
}
